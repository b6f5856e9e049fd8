use log::debug;
use crate::config::defs::{PipelineError, PEAK_DISTANCE_DIVISOR};
use crate::utils::histogram::Histogram;


#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Peak {
    pub bin_index: usize,
    pub height: u64,
    pub prominence: u64,
    pub midpoint: f64,
}

/// Constraints a local maximum must meet to count as a peak.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeakCriteria {
    pub min_height: f64,
    pub min_prominence: f64,
    /// Minimum separation in bins between accepted peaks.
    pub distance: usize,
}

impl PeakCriteria {
    /// Half the tallest bin for both height and prominence, and a
    /// separation of one twentieth of the value range (at least one bin).
    pub fn for_histogram(hist: &Histogram) -> Self {
        let threshold = hist.max_count() as f64 / 2.0;
        let distance = (hist.value_range() / PEAK_DISTANCE_DIVISOR).floor().max(1.0) as usize;
        PeakCriteria {
            min_height: threshold,
            min_prominence: threshold,
            distance,
        }
    }
}


/// Indices strictly greater than both neighbours. The first and last bins
/// have only one neighbour and are never maxima.
pub fn local_maxima(counts: &[u64]) -> Vec<usize> {
    if counts.len() < 3 {
        return Vec::new();
    }
    (1..counts.len() - 1)
        .filter(|&i| counts[i] > counts[i - 1] && counts[i] > counts[i + 1])
        .collect()
}

/// Height of `peak` above the higher of its two bases. Each base is the
/// lowest bin seen walking outwards until a strictly taller bin or the edge.
pub fn prominence(counts: &[u64], peak: usize) -> u64 {
    let height = counts[peak];

    let mut left_min = height;
    for &count in counts[..=peak].iter().rev() {
        if count > height {
            break;
        }
        left_min = left_min.min(count);
    }

    let mut right_min = height;
    for &count in &counts[peak..] {
        if count > height {
            break;
        }
        right_min = right_min.min(count);
    }

    height - left_min.max(right_min)
}

/// Thins `candidates` (ascending indices) so no two survivors are closer than
/// `distance` bins. Taller candidates win; equal heights favour the higher index.
pub fn select_by_distance(counts: &[u64], candidates: &[usize], distance: usize) -> Vec<usize> {
    let mut keep = vec![true; candidates.len()];
    let mut order: Vec<usize> = (0..candidates.len()).collect();
    order.sort_by(|&a, &b| {
        counts[candidates[b]]
            .cmp(&counts[candidates[a]])
            .then(candidates[b].cmp(&candidates[a]))
    });

    for &i in &order {
        if !keep[i] {
            continue;
        }
        let mut j = i;
        while j > 0 && candidates[i] - candidates[j - 1] < distance {
            j -= 1;
            keep[j] = false;
        }
        let mut k = i + 1;
        while k < candidates.len() && candidates[k] - candidates[i] < distance {
            keep[k] = false;
            k += 1;
        }
    }

    candidates
        .iter()
        .zip(keep)
        .filter_map(|(&c, kept)| kept.then_some(c))
        .collect()
}

/// Local maxima filtered by height, then prominence, then distance.
pub fn find_peaks(counts: &[u64], criteria: &PeakCriteria) -> Vec<usize> {
    let candidates: Vec<usize> = local_maxima(counts)
        .into_iter()
        .filter(|&i| counts[i] as f64 >= criteria.min_height)
        .filter(|&i| prominence(counts, i) as f64 >= criteria.min_prominence)
        .collect();
    select_by_distance(counts, &candidates, criteria.distance)
}

/// Peaks of a histogram, ascending by bin index.
pub fn detect_peaks(hist: &Histogram) -> Vec<Peak> {
    let criteria = PeakCriteria::for_histogram(hist);
    let peaks: Vec<Peak> = find_peaks(&hist.counts, &criteria)
        .into_iter()
        .map(|i| Peak {
            bin_index: i,
            height: hist.counts[i],
            prominence: prominence(&hist.counts, i),
            midpoint: hist.midpoint(i),
        })
        .collect();
    debug!(
        "{} peak(s) over {} bins (height >= {}, distance {}): {:?}",
        peaks.len(),
        hist.num_bins(),
        criteria.min_height,
        criteria.distance,
        peaks.iter().map(|p| p.midpoint).collect::<Vec<_>>()
    );
    peaks
}

/// Midpoint of the highest-length peak: short fragments form the lower modes,
/// the intact construct the last one.
///
/// # Arguments
///
/// * `peaks` - Peaks of `hist`, ascending by bin index (see `detect_peaks`).
/// * `hist` - Read-length histogram.
///
/// # Returns
/// Estimated construct length, or NoPeakFound.
pub fn construct_length(peaks: &[Peak], hist: &Histogram) -> Result<f64, PipelineError> {
    peaks
        .last()
        .map(|peak| peak.midpoint)
        .ok_or(PipelineError::NoPeakFound { bins: hist.num_bins() })
}
