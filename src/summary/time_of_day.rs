use chrono::{NaiveDateTime, Timelike};

use crate::models::{Sample, SLOTS_PER_DAY};

/// Fifteen-minute slot of the day a timestamp falls in (0..96).
pub fn slot_of(t: &NaiveDateTime) -> usize {
    (t.hour() * 4 + t.minute() / 15) as usize
}

/// Mean value per time-of-day slot across every day of the samples.
/// Slots without a sample are `None`.
///
/// The mean is kept as a running value scaled by the count, so it stays
/// finite for any finite inputs and survives the JSON round trip of the cache.
pub fn time_of_day_means(samples: &[Sample]) -> Vec<Option<f64>> {
    let mut means = [0.0_f64; SLOTS_PER_DAY];
    let mut counts = [0_u32; SLOTS_PER_DAY];

    for sample in samples {
        let slot = slot_of(&sample.recorded_at);
        counts[slot] += 1;
        let n = f64::from(counts[slot]);
        means[slot] += sample.value / n - means[slot] / n;
    }

    means
        .iter()
        .zip(counts.iter())
        .map(|(&mean, &count)| (count > 0).then_some(mean))
        .collect()
}
