use std::io;
use std::path::{Path, PathBuf};
use log::LevelFilter;
use thiserror::Error;
use crate::cli::Arguments;
use crate::cli::args::QualityMetric;

// File naming
pub const FASTQ_EXT: &str = ".fastq";
pub const GZIP_EXT: &str = ".gz";
pub const HISTOGRAM_EXT: &str = ".txt";
pub const FILTERED_TAG: &str = "filtered";
pub const HISTOGRAM_DIR: &str = "histograms";
pub const READ_LENGTH_LABEL: &str = "Read Length";
pub const QUALITY_SCORE_LABEL: &str = "Quality Score";
pub const SUMMARY_FILE: &str = "read_summary_statistics.txt";
pub const SUMMARY_HEADER: &str =
    "Sample\tHistogram File\tTotal Counts\tMean Count\tMedian Count\tRange of Edges\tWeighted Mean";

// Static Parameters
pub const PHRED_OFFSET: u8 = 33;
pub const DEFAULT_MIN_LENGTH: usize = 500;
pub const DEFAULT_MIN_MEAN_QUALITY: f64 = 12.0;
pub const LENGTH_BIN_WIDTH: u64 = 1;
pub const QUALITY_BIN_WIDTH: u64 = 1;
pub const PEAK_DISTANCE_DIVISOR: f64 = 20.0;
pub const DEFAULT_NEST_PREFIX: &str = "SQK-RBK114-96_";


#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Truncated record at line {line}: expected 4 lines, found {lines_read}")]
    MalformedRecord { line: usize, lines_read: usize },

    #[error("No observations to build a {0} histogram from")]
    EmptySample(String),

    #[error("No peak found in a histogram of {bins} bins")]
    NoPeakFound { bins: usize },

    #[error("Filesystem error at {path}: {source}")]
    Filesystem {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid histogram report {path} at line {line}: {msg}")]
    InvalidHistogramReport { path: PathBuf, line: usize, msg: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Plotting failed: {0}")]
    Plot(String),
}

impl PipelineError {
    /// Wraps an io::Error with the path it happened on.
    /// Usage: `File::create(&path).map_err(PipelineError::filesystem(&path))?`
    pub fn filesystem(path: &Path) -> impl FnOnce(io::Error) -> PipelineError + use<> {
        let path = path.to_path_buf();
        move |source| PipelineError::Filesystem { path, source }
    }
}


/// Thresholds and switches for filtering a single sequence file.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterConfig {
    pub min_length: usize,
    pub min_mean_quality: f64,
    pub quality_metric: QualityMetric,
    pub render_visuals: bool,
}

impl Default for FilterConfig {
    fn default() -> Self {
        FilterConfig {
            min_length: DEFAULT_MIN_LENGTH,
            min_mean_quality: DEFAULT_MIN_MEAN_QUALITY,
            quality_metric: QualityMetric::Mean,
            render_visuals: true,
        }
    }
}


/// Everything the batch driver needs to walk, filter, compress and summarize a tree.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub input_dir: PathBuf,
    pub output_dir: Option<PathBuf>,
    pub output_directory_name: Option<String>,
    pub filter: FilterConfig,
    pub compress: bool,
    pub keep_uncompressed: bool,
    pub summarize: bool,
    pub fail_fast: bool,
}

impl BatchConfig {
    pub fn new(input_dir: impl Into<PathBuf>) -> Self {
        BatchConfig {
            input_dir: input_dir.into(),
            output_dir: None,
            output_directory_name: None,
            filter: FilterConfig::default(),
            compress: true,
            keep_uncompressed: false,
            summarize: true,
            fail_fast: false,
        }
    }

    /// Builds a batch configuration from parsed arguments.
    /// Relative paths are resolved against `cwd`.
    ///
    /// # Arguments
    /// * `args` - The parsed command-line arguments.
    /// * `cwd` - The current working directory.
    ///
    /// # Returns
    /// BatchConfig or InvalidConfig if the input directory is missing or thresholds are nonsense.
    pub fn from_args(args: &Arguments, cwd: &Path) -> Result<Self, PipelineError> {
        let input_dir = match &args.input_dir {
            Some(dir) => absolutize(PathBuf::from(dir), cwd),
            None => return Err(PipelineError::InvalidConfig("Input directory required (-i)".to_string())),
        };
        if !args.min_mean_quality.is_finite() || args.min_mean_quality < 0.0 {
            return Err(PipelineError::InvalidConfig(format!(
                "Minimum mean quality must be a non-negative number, got {}",
                args.min_mean_quality
            )));
        }

        // A bare name is a sibling of the input root; anything with a path component is an explicit location.
        let (output_dir, output_directory_name) = match &args.out {
            Some(out) => {
                let out_path = PathBuf::from(out);
                if out_path.components().count() > 1 || out_path.is_absolute() {
                    (Some(absolutize(out_path, cwd)), None)
                } else {
                    (None, Some(out.clone()))
                }
            }
            None => (None, None),
        };

        Ok(BatchConfig {
            input_dir,
            output_dir,
            output_directory_name,
            filter: FilterConfig {
                min_length: args.min_length,
                min_mean_quality: args.min_mean_quality,
                quality_metric: args.quality_metric.clone(),
                render_visuals: !args.no_plots,
            },
            compress: !args.no_compress,
            keep_uncompressed: args.keep_uncompressed,
            summarize: !args.no_summary,
            fail_fast: args.fail_fast,
        })
    }

    /// Output root: explicit directory, else a sibling of the input root named
    /// `output_directory_name`, else `<input name>_filtered`.
    pub fn output_root(&self) -> PathBuf {
        if let Some(dir) = &self.output_dir {
            return dir.clone();
        }
        let name = match &self.output_directory_name {
            Some(name) => name.clone(),
            None => {
                let base = self
                    .input_dir
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "input".to_string());
                format!("{}_{}", base, FILTERED_TAG)
            }
        };
        match self.input_dir.parent() {
            Some(parent) => parent.join(name),
            None => PathBuf::from(name),
        }
    }
}


pub struct RunConfig {
    pub cwd: PathBuf,
    pub args: Arguments,
    pub log_level: LevelFilter,
}


fn absolutize(path: PathBuf, cwd: &Path) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        cwd.join(path)
    }
}
