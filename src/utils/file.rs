use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use log::{debug, info};
use crate::config::defs::{PipelineError, FASTQ_EXT, FILTERED_TAG, GZIP_EXT};


pub fn is_gzipped(path: &Path) -> io::Result<bool> {
    let mut file = File::open(path)?;
    let mut buffer = [0u8; 2];
    match file.read_exact(&mut buffer) {
        Ok(()) => Ok(buffer == [0x1F, 0x8B]), // Gzip magic bytes
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e),
    }
}

/// Enum to hold either an uncompressed or gzipped file reader
pub enum FileReader {
    Uncompressed(File),
    Gzipped(GzDecoder<File>),
}

impl Read for FileReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            FileReader::Uncompressed(r) => r.read(buf),
            FileReader::Gzipped(r) => r.read(buf),
        }
    }
}

/// Opens a file for buffered line reading, decompressing on the fly when the
/// file starts with the gzip magic bytes. The extension is not consulted.
pub fn open_reader(path: &Path) -> Result<BufReader<FileReader>, PipelineError> {
    let gz = is_gzipped(path).map_err(PipelineError::filesystem(path))?;
    let file = File::open(path).map_err(PipelineError::filesystem(path))?;
    let reader = if gz {
        FileReader::Gzipped(GzDecoder::new(file))
    } else {
        FileReader::Uncompressed(file)
    };
    Ok(BufReader::new(reader))
}

pub fn create_writer(path: &Path) -> Result<BufWriter<File>, PipelineError> {
    let file = File::create(path).map_err(PipelineError::filesystem(path))?;
    Ok(BufWriter::new(file))
}

pub fn ensure_dir(path: &Path) -> Result<(), PipelineError> {
    fs::create_dir_all(path).map_err(PipelineError::filesystem(path))
}

/// Deletes `path` if it is a regular file. Directories and missing paths are left alone.
pub fn remove_file_if_exists(path: &Path) -> Result<bool, PipelineError> {
    if !path.is_file() {
        return Ok(false);
    }
    fs::remove_file(path).map_err(PipelineError::filesystem(path))?;
    Ok(true)
}


/// Builds the filtered output name for an input sequence file.
/// `reads/barcode01.fastq` -> `barcode01_filtered.fastq`
///
/// # Arguments
/// * `input` - Path to the input sequence file.
///
/// # Returns
/// File name (no directory) for the filtered output.
pub fn filtered_file_name(input: &Path) -> String {
    format!("{}_{}{}", file_stem(input), FILTERED_TAG, FASTQ_EXT)
}

/// File name with the sequence extension (and any `.gz`) removed, falling
/// back to the plain stem for anything else.
pub fn file_stem(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let unzipped = name.strip_suffix(GZIP_EXT).unwrap_or(&name);
    match unzipped.strip_suffix(FASTQ_EXT) {
        Some(stem) => stem.to_string(),
        None => path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| name.clone()),
    }
}


/// Recursively lists directories under `root` (root first, parents before
/// children) and the files whose names end in `suffix`. Anything under
/// `exclude` is skipped. Entries are sorted so runs are reproducible.
///
/// # Arguments
/// * `root` - Directory to walk.
/// * `suffix` - File name suffix to match, e.g. ".fastq".
/// * `exclude` - Optional subtree to skip.
///
/// # Returns
/// (directories, matching files)
pub fn walk_dir(
    root: &Path,
    suffix: &str,
    exclude: Option<&Path>,
) -> Result<(Vec<PathBuf>, Vec<PathBuf>), PipelineError> {
    let mut dirs = Vec::new();
    let mut files = Vec::new();
    let mut stack = vec![root.to_path_buf()];

    while let Some(dir) = stack.pop() {
        if exclude.is_some_and(|ex| dir.starts_with(ex)) {
            debug!("Skipping excluded directory {}", dir.display());
            continue;
        }
        let mut entries = fs::read_dir(&dir)
            .map_err(PipelineError::filesystem(&dir))?
            .map(|entry| entry.and_then(|e| Ok((e.path(), e.file_type()?))))
            .collect::<io::Result<Vec<_>>>()
            .map_err(PipelineError::filesystem(&dir))?;
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        let mut subdirs = Vec::new();
        for (path, file_type) in entries {
            // Symlinked directories are listed but never descended into
            if file_type.is_symlink() && path.is_dir() {
                debug!("Not following directory symlink {}", path.display());
            } else if file_type.is_dir() {
                subdirs.push(path);
            } else if path
                .file_name()
                .is_some_and(|n| n.to_string_lossy().ends_with(suffix))
            {
                files.push(path);
            }
        }
        dirs.push(dir);
        // Reverse so the stack pops in sorted order
        stack.extend(subdirs.into_iter().rev());
    }

    Ok((dirs, files))
}


/// Gzips a single file next to itself (`x.fastq` -> `x.fastq.gz`).
///
/// # Returns
/// Path to the compressed file.
pub fn gzip_file(path: &Path, keep_uncompressed: bool) -> Result<PathBuf, PipelineError> {
    let mut gz_name = path.as_os_str().to_owned();
    gz_name.push(GZIP_EXT);
    let gz_path = PathBuf::from(gz_name);

    {
        let mut input = File::open(path).map_err(PipelineError::filesystem(path))?;
        let output = File::create(&gz_path).map_err(PipelineError::filesystem(&gz_path))?;
        let mut encoder = GzEncoder::new(BufWriter::new(output), Compression::default());
        io::copy(&mut input, &mut encoder).map_err(PipelineError::filesystem(&gz_path))?;
        encoder
            .finish()
            .and_then(|mut w| w.flush())
            .map_err(PipelineError::filesystem(&gz_path))?;
    }

    if !keep_uncompressed {
        fs::remove_file(path).map_err(PipelineError::filesystem(path))?;
    }
    info!("Compressed: {} -> {}", path.display(), gz_path.display());
    Ok(gz_path)
}

/// Gzips every `.fastq` file under `root`.
///
/// # Arguments
/// * `root` - Directory to search recursively.
/// * `keep_uncompressed` - Leave the original files in place.
///
/// # Returns
/// Paths of the compressed files.
pub fn gzip_fastqs(root: &Path, keep_uncompressed: bool) -> Result<Vec<PathBuf>, PipelineError> {
    let (_, files) = walk_dir(root, FASTQ_EXT, None)?;
    files
        .iter()
        .map(|path| gzip_file(path, keep_uncompressed))
        .collect()
}


/// Removes empty directories under `root`, deepest first, so a directory
/// emptied by its children's removal is removed too. `root` itself is kept.
///
/// # Returns
/// Removed directories.
pub fn prune_empty_dirs(root: &Path) -> Result<Vec<PathBuf>, PipelineError> {
    let (dirs, _) = walk_dir(root, "", None)?;
    let mut removed = Vec::new();
    for dir in dirs.iter().rev() {
        if dir == root {
            continue;
        }
        let mut entries = fs::read_dir(dir).map_err(PipelineError::filesystem(dir))?;
        if entries.next().is_none() {
            fs::remove_dir(dir).map_err(PipelineError::filesystem(dir))?;
            info!("Deleted empty directory: {}", dir.display());
            removed.push(dir.clone());
        }
    }
    Ok(removed)
}


/// Moves every file in `dir` ending with `extension` into its own
/// subdirectory named after the file stem, with `prefix` stripped.
/// `SQK-RBK114-96_barcode01.fastq` -> `barcode01/SQK-RBK114-96_barcode01.fastq`
///
/// # Returns
/// New locations of the moved files.
pub fn nest_files(dir: &Path, prefix: &str, extension: &str) -> Result<Vec<PathBuf>, PipelineError> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .map_err(PipelineError::filesystem(dir))?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_file())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .filter(|name| name.ends_with(extension))
        .collect();
    names.sort();

    let mut moved = Vec::new();
    for name in names {
        let stem = name.strip_suffix(extension).unwrap_or(&name);
        let folder = match stem.split_once(prefix) {
            Some((_, rest)) if !prefix.is_empty() && !rest.is_empty() => rest,
            _ => stem,
        };
        let folder_path = dir.join(folder);
        ensure_dir(&folder_path)?;

        let source = dir.join(&name);
        let destination = folder_path.join(&name);
        fs::rename(&source, &destination).map_err(PipelineError::filesystem(&source))?;
        info!("Moved {} to {}", name, folder_path.display());
        moved.push(destination);
    }
    Ok(moved)
}
