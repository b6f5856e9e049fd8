use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use log::info;
use crate::config::defs::{PipelineError, HISTOGRAM_EXT};
use crate::utils::file::{create_writer, open_reader};


#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BinWidth {
    Integer(u64),
    Float(f64),
}

impl BinWidth {
    pub fn value(&self) -> f64 {
        match self {
            BinWidth::Integer(w) => *w as f64,
            BinWidth::Float(w) => *w,
        }
    }
}

/// One `start\tend\tcount` line of a histogram report.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistogramRow {
    pub start: f64,
    pub end: f64,
    pub count: u64,
}


/// Fixed-width histogram over a numeric sample.
///
/// Bins are half-open, `[edges[i], edges[i + 1])`, and the last edge is the
/// first one strictly above the sample maximum, so every observation lands in
/// exactly one bin. With an integer width the first edge is the floor of the
/// sample minimum, keeping all edges integral.
///
/// For integral samples (read lengths) the first edge is exactly the minimum.
/// For fractional samples (per-read quality) it is not: a minimum of 12.4 with
/// width 1 bins as `[12, 13)`, not `[12.4, 13.4)`. Use `BinWidth::Float` to
/// start at the raw minimum.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    pub edges: Vec<f64>,
    pub counts: Vec<u64>,
    pub bin_width: BinWidth,
    pub min_value: f64,
    pub max_value: f64,
}

impl Histogram {
    /// Bins a sample.
    ///
    /// # Arguments
    ///
    /// * `sample` - Observations, any order.
    /// * `bin_width` - Positive bin width.
    /// * `label` - What the sample measures; only used in errors.
    ///
    /// # Returns
    /// Histogram, EmptySample for an empty sample, InvalidConfig for a bad width or non-finite value.
    pub fn build(sample: &[f64], bin_width: BinWidth, label: &str) -> Result<Self, PipelineError> {
        let width = bin_width.value();
        if !(width.is_finite() && width > 0.0) {
            return Err(PipelineError::InvalidConfig(format!("Bin width must be positive, got {}", width)));
        }
        if sample.is_empty() {
            return Err(PipelineError::EmptySample(label.to_string()));
        }
        if let Some(bad) = sample.iter().find(|v| !v.is_finite()) {
            return Err(PipelineError::InvalidConfig(format!("Non-finite {} value: {}", label, bad)));
        }

        let min_value = sample.iter().copied().fold(f64::INFINITY, f64::min);
        let max_value = sample.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let start = match bin_width {
            BinWidth::Integer(_) => min_value.floor(),
            BinWidth::Float(_) => min_value,
        };

        let n_bins = ((max_value - start) / width).floor() as usize + 1;
        let edges: Vec<f64> = (0..=n_bins).map(|i| start + i as f64 * width).collect();
        let mut counts = vec![0u64; n_bins];
        for &value in sample {
            let index = (((value - start) / width).floor() as usize).min(n_bins - 1);
            counts[index] += 1;
        }

        Ok(Histogram {
            edges,
            counts,
            bin_width,
            min_value,
            max_value,
        })
    }

    pub fn num_bins(&self) -> usize {
        self.counts.len()
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    pub fn max_count(&self) -> u64 {
        self.counts.iter().copied().max().unwrap_or(0)
    }

    /// Spread of the observed values, `max - min`.
    pub fn value_range(&self) -> f64 {
        self.max_value - self.min_value
    }

    pub fn midpoint(&self, bin_index: usize) -> f64 {
        (self.edges[bin_index] + self.edges[bin_index + 1]) / 2.0
    }

    /// Non-empty bins as report rows.
    pub fn rows(&self) -> Vec<HistogramRow> {
        self.counts
            .iter()
            .enumerate()
            .filter(|(_, count)| **count > 0)
            .map(|(i, &count)| HistogramRow {
                start: self.edges[i],
                end: self.edges[i + 1],
                count,
            })
            .collect()
    }

    pub fn write_report_to<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        for row in self.rows() {
            match self.bin_width {
                BinWidth::Integer(_) => {
                    writeln!(writer, "{}\t{}\t{}", row.start as i64, row.end as i64, row.count)?
                }
                BinWidth::Float(_) => writeln!(writer, "{:.6}\t{:.6}\t{}", row.start, row.end, row.count)?,
            }
        }
        Ok(())
    }

    /// Writes the tab-separated report, one line per non-empty bin.
    pub fn write_report(&self, path: &Path) -> Result<(), PipelineError> {
        let mut writer = create_writer(path)?;
        self.write_report_to(&mut writer)
            .and_then(|_| writer.flush())
            .map_err(PipelineError::filesystem(path))?;
        info!("Histogram saved to: {}", path.display());
        Ok(())
    }
}


/// `<stem>_read_lengths.txt` for label "Read Length".
pub fn report_path(dir: &Path, stem: &str, label: &str) -> PathBuf {
    dir.join(format!("{}_{}s{}", stem, label_slug(label), HISTOGRAM_EXT))
}

/// `<stem>_read_length_histogram.png` for label "Read Length".
pub fn plot_path(dir: &Path, stem: &str, label: &str) -> PathBuf {
    dir.join(format!("{}_{}_histogram.png", stem, label_slug(label)))
}

fn label_slug(label: &str) -> String {
    label.to_lowercase().replace(' ', "_")
}


/// Parses a histogram report back into rows. Columns may be separated by any
/// whitespace; blank lines are ignored.
pub fn read_report(path: &Path) -> Result<Vec<HistogramRow>, PipelineError> {
    let reader = open_reader(path)?;
    let mut rows = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line.map_err(PipelineError::filesystem(path))?;
        if line.trim().is_empty() {
            continue;
        }
        let invalid = |msg: String| PipelineError::InvalidHistogramReport {
            path: path.to_path_buf(),
            line: i + 1,
            msg,
        };
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 3 {
            return Err(invalid(format!("expected 3 columns, found {}", fields.len())));
        }
        let start = fields[0].parse::<f64>().map_err(|e| invalid(format!("start '{}': {}", fields[0], e)))?;
        let end = fields[1].parse::<f64>().map_err(|e| invalid(format!("end '{}': {}", fields[1], e)))?;
        // Counts may have been written as floats by other tools
        let count = match fields[2].parse::<u64>() {
            Ok(c) => c,
            Err(_) => match fields[2].parse::<f64>() {
                Ok(c) if c >= 0.0 && c.fract() == 0.0 => c as u64,
                _ => return Err(invalid(format!("count '{}' is not a non-negative integer", fields[2]))),
            },
        };
        rows.push(HistogramRow { start, end, count });
    }
    Ok(rows)
}
