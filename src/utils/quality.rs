//! Phred+33 quality decoding and per-read aggregation.
use crate::cli::args::QualityMetric;
use crate::config::defs::PHRED_OFFSET;


/// Per-base score for one quality character. Characters below the offset
/// decode to negative scores rather than being rejected.
pub fn phred_score(ascii: u8) -> i32 {
    ascii as i32 - PHRED_OFFSET as i32
}

/// Arithmetic mean of the per-base Phred scores. 0.0 for an empty string.
pub fn mean_quality(quality: &[u8]) -> f64 {
    if quality.is_empty() {
        return 0.0;
    }
    let sum: i64 = quality.iter().map(|&q| phred_score(q) as i64).sum();
    sum as f64 / quality.len() as f64
}

/// Median of the per-base Phred scores; the mean of the middle pair for even lengths.
pub fn median_quality(quality: &[u8]) -> f64 {
    if quality.is_empty() {
        return 0.0;
    }
    let mut scores: Vec<i32> = quality.iter().map(|&q| phred_score(q)).collect();
    scores.sort_unstable();
    let mid = scores.len() / 2;
    if scores.len() % 2 == 0 {
        (scores[mid - 1] + scores[mid]) as f64 / 2.0
    } else {
        scores[mid] as f64
    }
}

/// Phred value of the mean per-base error probability, -10 * log10(mean(10^(-Q/10))).
/// Lower than the arithmetic mean whenever scores vary, since a few bad bases dominate.
pub fn error_corrected_quality(quality: &[u8]) -> f64 {
    if quality.is_empty() {
        return 0.0;
    }
    let total_error: f64 = quality
        .iter()
        .map(|&q| 10f64.powf(phred_score(q) as f64 / -10.0))
        .sum();
    let mean_error = total_error / quality.len() as f64;
    -10.0 * mean_error.log10()
}

pub fn read_quality(quality: &[u8], metric: &QualityMetric) -> f64 {
    match metric {
        QualityMetric::Mean => mean_quality(quality),
        QualityMetric::Median => median_quality(quality),
        QualityMetric::ErrorCorrected => error_corrected_quality(quality),
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_quality() {
        assert_eq!(mean_quality(b""), 0.0);
        assert_eq!(mean_quality(b"!"), 0.0);
        assert_eq!(mean_quality(b"I"), 40.0);
        assert_eq!(mean_quality(b"!I"), 20.0);
        assert_eq!(mean_quality(b"+++"), 10.0);
    }

    #[test]
    fn test_median_quality() {
        assert_eq!(median_quality(b""), 0.0);
        assert_eq!(median_quality(b"!+I"), 10.0);
        assert_eq!(median_quality(b"!+5I"), 15.0);
    }

    #[test]
    fn test_error_corrected_quality() {
        assert_eq!(error_corrected_quality(b""), 0.0);
        assert!((error_corrected_quality(b"IIII") - 40.0).abs() < 1e-9);
        // Q0 and Q40: mean error ~0.50005, far below the arithmetic mean of 20
        let q = error_corrected_quality(b"!I");
        assert!((q - 3.0099).abs() < 1e-3, "got {}", q);
    }

    #[test]
    fn test_read_quality_dispatch() {
        assert_eq!(read_quality(b"!+I", &QualityMetric::Mean), mean_quality(b"!+I"));
        assert_eq!(read_quality(b"!+I", &QualityMetric::Median), 10.0);
    }
}
