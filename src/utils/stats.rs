//! Small descriptive statistics over count series.


/// Arithmetic mean.
///
/// # Arguments
///
/// - `values`: Series to average.
///
/// # Returns
///
/// Mean, or None for an empty series.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Median, averaging the middle pair for even lengths.
///
/// # Arguments
///
/// - `values`: Series in any order. NaNs sort last.
///
/// # Returns
///
/// Median, or None for an empty series.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Mean of `positions` weighted by `weights`.
///
/// # Arguments
///
/// - `positions`: Values to average, e.g. bin midpoints.
/// - `weights`: Same length as `positions`, e.g. bin counts.
///
/// # Returns
///
/// Weighted mean, or None when the lengths differ or the weights sum to zero.
pub fn weighted_mean(positions: &[f64], weights: &[f64]) -> Option<f64> {
    if positions.len() != weights.len() {
        return None;
    }
    let total: f64 = weights.iter().sum();
    if total == 0.0 {
        return None;
    }
    let weighted: f64 = positions.iter().zip(weights).map(|(p, w)| p * w).sum();
    Some(weighted / total)
}
