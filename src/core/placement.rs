//! Spacing policies and the per-edge placement generator

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::error::{Error, Result};

/// Default gap between two vehicles with fixed spacing, in meters
pub const DEFAULT_DISTANCE: f64 = 50.0;

/// Default bounds of a random step, in meters
pub const DEFAULT_MIN_STEP: u32 = 10;
pub const DEFAULT_MAX_STEP: u32 = 14;

/// Where the first entity goes on an edge that inherits no spillover
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartOffset {
    /// Fixed distance from the start of the edge
    At(f64),
    /// Middle of the edge
    HalfLength,
}

impl StartOffset {
    pub fn resolve(&self, length: f64) -> f64 {
        match *self {
            StartOffset::At(offset) => offset,
            StartOffset::HalfLength => length / 2.0,
        }
    }
}

impl Default for StartOffset {
    fn default() -> Self {
        StartOffset::At(1.0)
    }
}

/// Distance between consecutive entities
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Spacing {
    /// Constant gap; leftover budget carries over along the traversal
    Fixed { distance: f64 },
    /// Integer gap drawn uniformly from `[min_step, max_step]` per entity
    Uniform { min_step: u32, max_step: u32 },
}

impl Default for Spacing {
    fn default() -> Self {
        Spacing::Fixed {
            distance: DEFAULT_DISTANCE,
        }
    }
}

/// Spacing plus start convention, passed explicitly into every run
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpacingPolicy {
    pub spacing: Spacing,
    pub start: StartOffset,
}

impl SpacingPolicy {
    pub fn fixed(distance: f64, start: StartOffset) -> Self {
        Self {
            spacing: Spacing::Fixed { distance },
            start,
        }
    }

    pub fn uniform(min_step: u32, max_step: u32) -> Self {
        Self {
            spacing: Spacing::Uniform { min_step, max_step },
            start: StartOffset::At(1.0),
        }
    }

    /// Reject policies that would never advance along an edge
    pub fn validate(&self) -> Result<()> {
        match self.spacing {
            Spacing::Fixed { distance } if !(distance.is_finite() && distance > 0.0) => {
                return Err(Error::InvalidInput(format!(
                    "spacing distance must be a positive number, got {distance}"
                )));
            }
            Spacing::Uniform { min_step, max_step } if min_step == 0 || min_step > max_step => {
                return Err(Error::InvalidInput(format!(
                    "random step range [{min_step}, {max_step}] must be non-empty and start at 1 or more"
                )));
            }
            _ => {}
        }
        if let StartOffset::At(offset) = self.start {
            if !(offset.is_finite() && offset >= 0.0) {
                return Err(Error::InvalidInput(format!(
                    "start offset must be a non-negative number, got {offset}"
                )));
            }
        }
        Ok(())
    }
}

/// Offsets produced on one edge
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub offsets: Vec<f64>,
    /// How far the first rejected offset lies past the end of the edge
    pub overshoot: f64,
}

/// Offsets `start, start + d, start + 2d, ...` strictly below `length`
pub fn place_fixed(start: f64, length: f64, distance: f64) -> Placement {
    let mut offsets = Vec::new();
    let mut pos = start;
    while pos < length {
        offsets.push(pos);
        pos += distance;
    }
    Placement {
        offsets,
        overshoot: pos - length,
    }
}

/// Offsets advancing by a random integer step in `[min_step, max_step]`.
///
/// Placement stops once fewer than `min_step` meters remain, so the last
/// entity always keeps at least one minimal gap to the end of the edge.
pub fn place_uniform<R: Rng + ?Sized>(
    start: f64,
    length: f64,
    min_step: u32,
    max_step: u32,
    rng: &mut R,
) -> Placement {
    let horizon = length - f64::from(min_step);
    let mut offsets = Vec::new();
    let mut pos = start;
    while pos < horizon {
        offsets.push(pos);
        pos += f64::from(rng.gen_range(min_step..=max_step));
    }
    Placement {
        offsets,
        overshoot: pos - length,
    }
}
