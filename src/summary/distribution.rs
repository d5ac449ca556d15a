use chrono::NaiveDateTime;

use crate::models::{GlycemicRanges, Sample, BAND_COUNT};

/// Band of `value`: index of the first boundary strictly above it, or
/// `ranges.len()` when the value is at or above every boundary.
pub fn classify(ranges: &[f64], value: f64) -> usize {
    ranges
        .iter()
        .position(|&boundary| value < boundary)
        .unwrap_or(ranges.len())
}

/// Fraction of the window `[start, last sample]` spent in each band.
///
/// The gap between the previous sample (or `start`) and a sample is credited
/// to that sample's band. Time after the last sample is not counted, so a
/// non-empty window sums to 1.
///
/// Returns `None` when there are no samples. A window of zero length yields
/// an all-zero distribution.
pub fn time_weighted_distribution(
    ranges: &GlycemicRanges,
    start: &NaiveDateTime,
    samples: &[Sample],
) -> Option<[f64; BAND_COUNT]> {
    let last = samples.last()?;
    let mut dist = [0.0; BAND_COUNT];

    let total = seconds_between(start, &last.recorded_at);
    if total <= 0.0 {
        return Some(dist);
    }

    let mut cursor = *start;
    for sample in samples {
        let dt = seconds_between(&cursor, &sample.recorded_at);
        dist[classify(ranges.boundaries(), sample.value)] += dt / total;
        cursor = sample.recorded_at;
    }
    Some(dist)
}

fn seconds_between(from: &NaiveDateTime, to: &NaiveDateTime) -> f64 {
    (*to - *from).num_milliseconds() as f64 / 1000.0
}
