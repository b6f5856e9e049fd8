use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use log::{debug, error, info, warn};
use crate::config::defs::{
    BatchConfig, FilterConfig, PipelineError, FASTQ_EXT, GZIP_EXT, HISTOGRAM_DIR, QUALITY_SCORE_LABEL,
    READ_LENGTH_LABEL,
};
use crate::pipelines::filter::{filter_fastq, FilterReport};
use crate::pipelines::summary::extract_histogram_stats;
use crate::utils::file::{ensure_dir, file_stem, filtered_file_name, gzip_file, remove_file_if_exists, walk_dir};
use crate::utils::histogram::{plot_path, report_path};


/// What happened to one input file.
#[derive(Debug, Clone, PartialEq)]
pub enum FileOutcome {
    Estimated { construct_length: f64, report: FilterReport },
    /// Filtered, but no construct length could be called (no reads, or no peak).
    NoEstimate { report: Option<FilterReport>, reason: String },
    /// Not processed to completion.
    Failed { input: PathBuf, reason: String },
}

impl FileOutcome {
    pub fn construct_length(&self) -> Option<f64> {
        match self {
            FileOutcome::Estimated { construct_length, .. } => Some(*construct_length),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub output_root: PathBuf,
    /// Keyed by the filtered output file path as written, before compression.
    pub outcomes: BTreeMap<PathBuf, FileOutcome>,
    pub compressed: Vec<PathBuf>,
    pub summary_path: Option<PathBuf>,
}

impl BatchReport {
    /// Output file -> estimated construct length, None where absent.
    pub fn estimates(&self) -> BTreeMap<PathBuf, Option<f64>> {
        self.outcomes
            .iter()
            .map(|(path, outcome)| (path.clone(), outcome.construct_length()))
            .collect()
    }

    pub fn failed_files(&self) -> Vec<&Path> {
        self.outcomes
            .values()
            .filter_map(|outcome| match outcome {
                FileOutcome::Failed { input, .. } => Some(input.as_path()),
                _ => None,
            })
            .collect()
    }
}


/// Filters every `.fastq` file under the input root into a mirrored output
/// tree, then gzips the outputs and writes the histogram summary.
///
/// A file that cannot be processed is recorded as `Failed` and the batch moves
/// on, unless `fail_fast` is set. Only problems with the roots themselves
/// fail the whole batch.
///
/// # Arguments
///
/// * `config` - Roots, thresholds and post-processing switches.
///
/// # Returns
/// BatchReport with one outcome per discovered file.
pub fn process_directory(config: &BatchConfig) -> Result<BatchReport, PipelineError> {
    let input_root = config.input_dir.as_path();
    if !input_root.is_dir() {
        return Err(PipelineError::InvalidConfig(format!(
            "Input directory {} does not exist",
            input_root.display()
        )));
    }
    let output_root = config.output_root();
    ensure_dir(&output_root)?;
    info!("Filtering {} -> {}", input_root.display(), output_root.display());

    let exclude = output_root.starts_with(input_root).then_some(output_root.as_path());
    let (dirs, files) = walk_dir(input_root, FASTQ_EXT, exclude)?;
    debug!("Found {} sequence file(s) in {} directories", files.len(), dirs.len());

    for dir in &dirs {
        let mirrored = mirror_path(input_root, &output_root, dir);
        if let Err(e) = ensure_dir(&mirrored) {
            warn!("Could not mirror {}: {}", dir.display(), e);
        }
    }

    let mut report = BatchReport {
        output_root: output_root.clone(),
        ..Default::default()
    };

    for input in &files {
        let out_dir = match input.parent() {
            Some(parent) => mirror_path(input_root, &output_root, parent),
            None => output_root.clone(),
        };
        let output = out_dir.join(filtered_file_name(input));

        let outcome = match process_file(input, &output, &out_dir, &config.filter) {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Failed to process {}: {}", input.display(), e);
                discard_outputs(input, &output, &out_dir);
                if config.fail_fast {
                    return Err(e);
                }
                FileOutcome::Failed { input: input.clone(), reason: e.to_string() }
            }
        };
        report.outcomes.insert(output, outcome);
    }

    if config.compress {
        // Only this run's completed outputs
        for (path, outcome) in &report.outcomes {
            if matches!(outcome, FileOutcome::Failed { .. }) || !path.is_file() {
                continue;
            }
            match gzip_file(path, config.keep_uncompressed) {
                Ok(gz) => report.compressed.push(gz),
                Err(e) => warn!("Could not compress {}: {}", path.display(), e),
            }
        }
    }

    if config.summarize {
        match extract_histogram_stats(&output_root) {
            Ok(path) => report.summary_path = Some(path),
            Err(e) => error!("Could not write histogram summary: {}", e),
        }
    }

    let failed = report.failed_files();
    if failed.is_empty() {
        info!("Processed {} file(s) without failures", report.outcomes.len());
    } else {
        warn!(
            "{} of {} file(s) failed: {:?}",
            failed.len(),
            report.outcomes.len(),
            failed
        );
    }

    Ok(report)
}


/// Runs the filter on one file and folds the expected "no estimate" cases
/// into the outcome. Everything else is returned as an error.
fn process_file(
    input: &Path,
    output: &Path,
    out_dir: &Path,
    filter: &FilterConfig,
) -> Result<FileOutcome, PipelineError> {
    let hist_dir = out_dir.join(HISTOGRAM_DIR);
    ensure_dir(&hist_dir)?;
    // Reports left by an earlier run would otherwise reach the summary
    for path in histogram_artifacts(&hist_dir, input) {
        if remove_file_if_exists(&path)? {
            debug!("Removed stale {}", path.display());
        }
    }

    match filter_fastq(input, output, &hist_dir, filter) {
        Ok(outcome) => match outcome.construct_length() {
            Ok(construct_length) => {
                info!("{}: estimated construct length {:.1} bp", input.display(), construct_length);
                Ok(FileOutcome::Estimated { construct_length, report: outcome.report })
            }
            Err(e) => {
                warn!("{}: {}", input.display(), e);
                Ok(FileOutcome::NoEstimate { report: Some(outcome.report), reason: e.to_string() })
            }
        },
        Err(e @ PipelineError::EmptySample(_)) => {
            warn!("{}: {}", input.display(), e);
            Ok(FileOutcome::NoEstimate { report: None, reason: e.to_string() })
        }
        Err(e) => Err(e),
    }
}

fn histogram_artifacts(hist_dir: &Path, input: &Path) -> Vec<PathBuf> {
    let stem = file_stem(input);
    [READ_LENGTH_LABEL, QUALITY_SCORE_LABEL]
        .iter()
        .flat_map(|label| [report_path(hist_dir, &stem, label), plot_path(hist_dir, &stem, label)])
        .collect()
}

/// Removes whatever a failed file left behind: a partial filtered file, its
/// compressed copy from an earlier run, and any histogram reports or plots.
fn discard_outputs(input: &Path, output: &Path, out_dir: &Path) {
    let mut gz_name = output.as_os_str().to_owned();
    gz_name.push(GZIP_EXT);
    let mut leftovers = vec![output.to_path_buf(), PathBuf::from(gz_name)];
    leftovers.extend(histogram_artifacts(&out_dir.join(HISTOGRAM_DIR), input));

    for path in leftovers {
        match remove_file_if_exists(&path) {
            Ok(true) => debug!("Discarded {}", path.display()),
            Ok(false) => {}
            Err(e) => warn!("Could not discard {}: {}", path.display(), e),
        }
    }
}

fn mirror_path(input_root: &Path, output_root: &Path, path: &Path) -> PathBuf {
    match path.strip_prefix(input_root) {
        Ok(rel) => output_root.join(rel),
        Err(_) => output_root.to_path_buf(),
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn record(id: &str, length: usize) -> String {
        format!("@{}\n{}\n+\n{}\n", id, "C".repeat(length), "I".repeat(length))
    }

    #[test]
    fn test_mirror_path() {
        assert_eq!(
            mirror_path(Path::new("/in"), Path::new("/out"), Path::new("/in/a/b")),
            PathBuf::from("/out/a/b")
        );
        assert_eq!(mirror_path(Path::new("/in"), Path::new("/out"), Path::new("/in")), PathBuf::from("/out"));
    }

    #[test]
    fn test_output_inside_input_is_not_reprocessed() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let input = dir.path().join("reads");
        fs::create_dir_all(input.join("s1"))?;
        fs::write(input.join("s1/a.fastq"), record("r", 600))?;

        let mut config = BatchConfig::new(&input);
        config.output_dir = Some(input.join("filtered"));
        config.filter.render_visuals = false;

        let first = process_directory(&config)?;
        assert_eq!(first.outcomes.len(), 1);
        let second = process_directory(&config)?;
        assert_eq!(second.outcomes.len(), 1);
        assert!(input.join("filtered/s1/a_filtered.fastq.gz").exists());
        Ok(())
    }

    #[test]
    fn test_missing_input_root() {
        let config = BatchConfig::new("/definitely/not/here");
        assert!(matches!(process_directory(&config), Err(PipelineError::InvalidConfig(_))));
    }

    #[test]
    fn test_fail_fast() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let input = dir.path().join("reads");
        fs::create_dir_all(&input)?;
        fs::write(input.join("real.fastq"), record("r", 600))?;
        // Make the matching output path a directory so the filtered file cannot be created
        let out = dir.path().join("out");
        fs::create_dir_all(out.join("real_filtered.fastq"))?;

        let mut config = BatchConfig::new(&input);
        config.output_dir = Some(out.clone());
        config.filter.render_visuals = false;
        config.compress = false;

        let report = process_directory(&config)?;
        assert_eq!(report.failed_files(), vec![input.join("real.fastq").as_path()]);

        config.fail_fast = true;
        assert!(matches!(process_directory(&config), Err(PipelineError::Filesystem { .. })));
        Ok(())
    }

    #[test]
    fn test_failed_file_leaves_no_partial_output() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let input = dir.path().join("reads");
        fs::create_dir_all(&input)?;
        fs::write(input.join("real.fastq"), record("r", 600))?;
        // The filtered reads get written, then the quality report cannot be
        let out = dir.path().join("out");
        fs::create_dir_all(out.join("histograms/real_quality_scores.txt"))?;

        let mut config = BatchConfig::new(&input);
        config.output_dir = Some(out.clone());
        config.filter.render_visuals = false;

        let report = process_directory(&config)?;
        assert_eq!(report.failed_files(), vec![input.join("real.fastq").as_path()]);
        assert!(report.compressed.is_empty());
        assert!(!out.join("real_filtered.fastq").exists());
        assert!(!out.join("real_filtered.fastq.gz").exists());
        assert!(!out.join("histograms/real_read_lengths.txt").exists());
        Ok(())
    }

    #[test]
    fn test_rerun_drops_stale_reports() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let input = dir.path().join("reads");
        fs::create_dir_all(input.join("s1"))?;
        fs::write(input.join("s1/a.fastq"), record("r", 600))?;

        let mut config = BatchConfig::new(&input);
        config.filter.render_visuals = false;
        process_directory(&config)?;
        let reports = config.output_root().join("s1/histograms");
        assert!(reports.join("a_read_lengths.txt").exists());

        // Same sample, now without reads
        fs::write(input.join("s1/a.fastq"), "")?;
        let report = process_directory(&config)?;
        assert!(!reports.join("a_read_lengths.txt").exists());
        assert!(!reports.join("a_quality_scores.txt").exists());

        let summary = fs::read_to_string(report.summary_path.expect("summary written"))?;
        assert_eq!(summary.lines().count(), 1);
        Ok(())
    }
}
