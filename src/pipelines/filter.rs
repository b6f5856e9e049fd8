use std::io::Write;
use std::path::{Path, PathBuf};
use log::{debug, info, warn};
use crate::config::defs::{
    FilterConfig, PipelineError, LENGTH_BIN_WIDTH, QUALITY_BIN_WIDTH, QUALITY_SCORE_LABEL, READ_LENGTH_LABEL,
};
use crate::utils::fastq::fastq_records;
use crate::utils::file::{create_writer, file_stem};
use crate::utils::histogram::{plot_path, report_path, BinWidth, Histogram};
use crate::utils::peaks::{construct_length, detect_peaks, Peak};
use crate::utils::plotting::{plot_histogram, Annotation};
use crate::utils::quality::read_quality;


/// Per-file tallies. The two single-metric counts are independent of each
/// other; `passed_both` is what was written.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterReport {
    pub total: usize,
    pub passed_length: usize,
    pub passed_quality: usize,
    pub passed_both: usize,
    pub dropped_partial: usize,
}

#[derive(Debug, Clone)]
pub struct FilterOutcome {
    pub report: FilterReport,
    pub length_histogram: Histogram,
    pub quality_histogram: Histogram,
    pub length_peaks: Vec<Peak>,
    pub quality_peaks: Vec<Peak>,
    pub reports: Vec<PathBuf>,
}

impl FilterOutcome {
    /// Midpoint of the last read-length peak.
    pub fn construct_length(&self) -> Result<f64, PipelineError> {
        construct_length(&self.length_peaks, &self.length_histogram)
    }
}


/// Filters one sequence file on read length and read quality, writes the
/// passing reads, and writes length and quality histograms into `hist_dir`.
///
/// Every parsed read contributes to both histograms, passing or not. A
/// truncated final record is dropped with a warning.
///
/// # Arguments
///
/// * `input` - Sequence file, plain or gzipped.
/// * `output` - Filtered sequence file; created or overwritten.
/// * `hist_dir` - Existing directory for histogram reports and plots.
/// * `config` - Thresholds and switches.
///
/// # Returns
/// FilterOutcome, or EmptySample when the input has no records.
pub fn filter_fastq(
    input: &Path,
    output: &Path,
    hist_dir: &Path,
    config: &FilterConfig,
) -> Result<FilterOutcome, PipelineError> {
    info!("Processing: {} -> {}", input.display(), output.display());

    let mut read_lengths: Vec<f64> = Vec::new();
    let mut quality_scores: Vec<f64> = Vec::new();
    let mut report = FilterReport::default();

    {
        let records = fastq_records(input)?;
        let mut writer = create_writer(output)?;

        for result in records {
            let record = match result {
                Ok(record) => record,
                Err(PipelineError::MalformedRecord { line, lines_read }) => {
                    warn!(
                        "{}: dropping truncated record at line {} ({} of 4 lines)",
                        input.display(),
                        line,
                        lines_read
                    );
                    report.dropped_partial += 1;
                    break;
                }
                Err(PipelineError::Io(source)) => {
                    return Err(PipelineError::Filesystem { path: input.to_path_buf(), source });
                }
                Err(e) => return Err(e),
            };

            let read_length = record.len();
            let quality = read_quality(&record.quality, &config.quality_metric);
            read_lengths.push(read_length as f64);
            quality_scores.push(quality);
            report.total += 1;

            let length_ok = read_length >= config.min_length;
            let quality_ok = quality >= config.min_mean_quality;
            if length_ok {
                report.passed_length += 1;
            }
            if quality_ok {
                report.passed_quality += 1;
            }
            if length_ok && quality_ok {
                report.passed_both += 1;
                record.write_to(&mut writer).map_err(PipelineError::filesystem(output))?;
            }
        }
        writer.flush().map_err(PipelineError::filesystem(output))?;
    }

    info!(
        "{}: {} reads, {} >= {} bp, {} >= Q{}, {} written",
        input.display(),
        report.total,
        report.passed_length,
        config.min_length,
        report.passed_quality,
        config.min_mean_quality,
        report.passed_both
    );

    let length_histogram = Histogram::build(&read_lengths, BinWidth::Integer(LENGTH_BIN_WIDTH), READ_LENGTH_LABEL)?;
    let quality_histogram =
        Histogram::build(&quality_scores, BinWidth::Integer(QUALITY_BIN_WIDTH), QUALITY_SCORE_LABEL)?;
    let length_peaks = detect_peaks(&length_histogram);
    let quality_peaks = detect_peaks(&quality_histogram);

    let stem = file_stem(input);
    let mut reports = Vec::new();
    for (hist, label) in [(&length_histogram, READ_LENGTH_LABEL), (&quality_histogram, QUALITY_SCORE_LABEL)] {
        let path = report_path(hist_dir, &stem, label);
        hist.write_report(&path)?;
        reports.push(path);
    }

    if config.render_visuals {
        let plots = [
            (&length_histogram, &length_peaks, READ_LENGTH_LABEL, config.min_length as f64, report.passed_length),
            (&quality_histogram, &quality_peaks, QUALITY_SCORE_LABEL, config.min_mean_quality, report.passed_quality),
        ];
        for (hist, peaks, label, threshold, passing) in plots {
            let annotation = Annotation { label, threshold, passing, total: report.total };
            let path = plot_path(hist_dir, &stem, label);
            // A missing font or backend must not cost the filtered reads
            match plot_histogram(hist, peaks, &annotation, &path) {
                Ok(()) => debug!("{} histogram PNG saved to: {}", label, path.display()),
                Err(e) => warn!("Skipping {} plot for {}: {}", label, input.display(), e),
            }
        }
    }

    Ok(FilterOutcome {
        report,
        length_histogram,
        quality_histogram,
        length_peaks,
        quality_peaks,
        reports,
    })
}
