use serde::{Deserialize, Serialize};

use crate::config::{DEFAULT_GLYCEMIC_RANGES, DEFAULT_GLYCEMIC_TARGETS};

/// Number of range boundaries. Four boundaries split the value axis into
/// [`BAND_COUNT`] bands: severe hypo, hypo, in range, hyper, severe hyper.
pub const BOUNDARY_COUNT: usize = 4;
pub const BAND_COUNT: usize = BOUNDARY_COUNT + 1;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParameterError {
    #[error("Invalid glycemic ranges")]
    InvalidRanges,
    #[error("Invalid glycemic targets")]
    InvalidTargets,
}

/// Strictly increasing, positive band boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct GlycemicRanges([f64; BOUNDARY_COUNT]);

impl GlycemicRanges {
    pub fn new(values: [f64; BOUNDARY_COUNT]) -> Result<Self, ParameterError> {
        let mut last = 0.0;
        for v in values {
            if !v.is_finite() || v <= last {
                return Err(ParameterError::InvalidRanges);
            }
            last = v;
        }
        Ok(Self(values))
    }

    pub fn boundaries(&self) -> &[f64; BOUNDARY_COUNT] {
        &self.0
    }
}

impl Default for GlycemicRanges {
    fn default() -> Self {
        Self(DEFAULT_GLYCEMIC_RANGES)
    }
}

impl TryFrom<Vec<f64>> for GlycemicRanges {
    type Error = ParameterError;

    fn try_from(values: Vec<f64>) -> Result<Self, Self::Error> {
        let arr: [f64; BOUNDARY_COUNT] = values
            .try_into()
            .map_err(|_| ParameterError::InvalidRanges)?;
        Self::new(arr)
    }
}

impl From<GlycemicRanges> for Vec<f64> {
    fn from(r: GlycemicRanges) -> Self {
        r.0.to_vec()
    }
}

/// Per-band acceptable time fractions.
///
/// Index 0 caps severe hypo time, 1 caps total hypo time (bands 0+1),
/// 2 is the *minimum* time in range, 3 caps total hyper time (bands 3+4),
/// 4 caps severe hyper time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct GlycemicTargets([f64; BAND_COUNT]);

impl GlycemicTargets {
    pub fn new(values: [f64; BAND_COUNT]) -> Result<Self, ParameterError> {
        if values.iter().all(|v| (0.0..=1.0).contains(v)) {
            Ok(Self(values))
        } else {
            Err(ParameterError::InvalidTargets)
        }
    }

    pub fn fractions(&self) -> &[f64; BAND_COUNT] {
        &self.0
    }
}

impl Default for GlycemicTargets {
    fn default() -> Self {
        Self(DEFAULT_GLYCEMIC_TARGETS)
    }
}

impl TryFrom<Vec<f64>> for GlycemicTargets {
    type Error = ParameterError;

    fn try_from(values: Vec<f64>) -> Result<Self, Self::Error> {
        let arr: [f64; BAND_COUNT] = values
            .try_into()
            .map_err(|_| ParameterError::InvalidTargets)?;
        Self::new(arr)
    }
}

impl From<GlycemicTargets> for Vec<f64> {
    fn from(t: GlycemicTargets) -> Self {
        t.0.to_vec()
    }
}
