use std::io::Write;
use std::path::{Path, PathBuf};
use log::{info, warn};
use crate::config::defs::{PipelineError, HISTOGRAM_DIR, HISTOGRAM_EXT, SUMMARY_FILE, SUMMARY_HEADER};
use crate::utils::file::{create_writer, walk_dir};
use crate::utils::histogram::{read_report, HistogramRow};
use crate::utils::stats::{mean, median, weighted_mean};


#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRow {
    pub sample: String,
    pub histogram_file: String,
    pub total_counts: f64,
    pub mean_count: f64,
    pub median_count: f64,
    pub range_of_edges: f64,
    pub weighted_mean: f64,
}

impl SummaryRow {
    /// Statistics over one parsed report. None for a report without rows or
    /// with all-zero counts.
    pub fn from_rows(sample: &str, histogram_file: &str, rows: &[HistogramRow]) -> Option<Self> {
        let (first, last) = (rows.first()?, rows.last()?);
        let counts: Vec<f64> = rows.iter().map(|r| r.count as f64).collect();
        let midpoints: Vec<f64> = rows.iter().map(|r| (r.start + r.end) / 2.0).collect();

        Some(SummaryRow {
            sample: sample.to_string(),
            histogram_file: histogram_file.to_string(),
            total_counts: counts.iter().sum(),
            mean_count: mean(&counts)?,
            median_count: median(&counts)?,
            range_of_edges: last.end - first.start,
            weighted_mean: weighted_mean(&midpoints, &counts)?,
        })
    }

    fn to_line(&self) -> String {
        format!(
            "{}\t{}\t{:.2}\t{:.2}\t{:.2}\t{:.2}\t{:.2}",
            self.sample,
            self.histogram_file,
            self.total_counts,
            self.mean_count,
            self.median_count,
            self.range_of_edges,
            self.weighted_mean
        )
    }
}


/// Collects one row per histogram report found in any `histograms`
/// directory under `root`. The sample name is the name of the directory
/// holding `histograms`. Unreadable or empty reports are skipped with a
/// warning. Rows are sorted by sample, then file name.
pub fn collect_summary(root: &Path) -> Result<Vec<SummaryRow>, PipelineError> {
    let (_, files) = walk_dir(root, HISTOGRAM_EXT, None)?;
    let mut summary = Vec::new();

    for path in files {
        let Some(hist_dir) = path.parent() else { continue };
        if hist_dir.file_name().is_none_or(|name| name != HISTOGRAM_DIR) {
            continue;
        }
        let sample = hist_dir
            .parent()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let rows = match read_report(&path) {
            Ok(rows) => rows,
            Err(e) => {
                warn!("Skipping unreadable histogram {}: {}", path.display(), e);
                continue;
            }
        };
        match SummaryRow::from_rows(&sample, &file_name, &rows) {
            Some(row) => summary.push(row),
            None => warn!("Skipping empty histogram {}", path.display()),
        }
    }

    summary.sort_by(|a, b| a.sample.cmp(&b.sample).then_with(|| a.histogram_file.cmp(&b.histogram_file)));
    Ok(summary)
}

pub fn write_summary(rows: &[SummaryRow], path: &Path) -> Result<(), PipelineError> {
    let mut writer = create_writer(path)?;
    let mut write_all = || -> std::io::Result<()> {
        writeln!(writer, "{}", SUMMARY_HEADER)?;
        for row in rows {
            writeln!(writer, "{}", row.to_line())?;
        }
        writer.flush()
    };
    write_all().map_err(PipelineError::filesystem(path))
}

/// Writes `read_summary_statistics.txt` at `root` covering every histogram
/// report beneath it.
///
/// # Returns
/// Path of the summary file.
pub fn extract_histogram_stats(root: &Path) -> Result<PathBuf, PipelineError> {
    let rows = collect_summary(root)?;
    let output = root.join(SUMMARY_FILE);
    write_summary(&rows, &output)?;
    info!("Summary of {} histogram(s) written to {}", rows.len(), output.display());
    Ok(output)
}
