use std::collections::BTreeSet;

use crate::models::{GlycemicTargets, BAND_COUNT};

/// Indices of the targets a distribution violates.
///
/// - 0: severe hypo time above target
/// - 1: total hypo time (bands 0+1) above target
/// - 2: time in range *below* target
/// - 3: total hyper time (bands 3+4) above target
/// - 4: severe hyper time above target
pub fn evaluate_problems(dist: &[f64; BAND_COUNT], targets: &GlycemicTargets) -> BTreeSet<usize> {
    let t = targets.fractions();
    let checks = [
        dist[0] > t[0],
        dist[0] + dist[1] > t[1],
        dist[2] < t[2],
        dist[3] + dist[4] > t[3],
        dist[4] > t[4],
    ];

    checks
        .iter()
        .enumerate()
        .filter_map(|(i, &hit)| hit.then_some(i))
        .collect()
}
