//! Edge eligibility for placement

use serde::{Deserialize, Serialize};

use crate::core::error::{validate_vehicle_class, Result};
use crate::core::network::RoadNetwork;

/// Roads must be longer than an average car
pub const DEFAULT_MIN_LENGTH: f64 = 4.0;

/// About 50 km/h
pub const DEFAULT_MIN_SPEED: f64 = 13.0;

/// Classes whose presence makes an edge usable for vehicles
pub const DEFAULT_ACCEPTED_CLASSES: &[&str] = &["custom1", "custom2", "passenger", "private"];

/// Checks applied to decide whether an edge can host placements.
///
/// Checks run in a fixed order and stop at the first rejection: fringe,
/// length, speed (only when `min_speed` is set), vehicle class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeasibilityPolicy {
    /// Edges whose truncated length is at most this value are rejected
    pub min_length: f64,
    /// Reject edges slower than this, when set
    pub min_speed: Option<f64>,
    /// At least one of these classes must be allowed on the edge
    pub accepted_classes: Vec<String>,
}

impl Default for FeasibilityPolicy {
    fn default() -> Self {
        Self {
            min_length: DEFAULT_MIN_LENGTH,
            min_speed: None,
            accepted_classes: DEFAULT_ACCEPTED_CLASSES
                .iter()
                .map(|c| c.to_string())
                .collect(),
        }
    }
}

impl FeasibilityPolicy {
    /// Default policy with the speed check enabled
    pub fn with_speed_check() -> Self {
        Self {
            min_speed: Some(DEFAULT_MIN_SPEED),
            ..Self::default()
        }
    }

    /// Reject vehicle classes SUMO does not know about
    pub fn validate(&self) -> Result<()> {
        for class in &self.accepted_classes {
            validate_vehicle_class(class)?;
        }
        Ok(())
    }

    pub fn is_feasible(&self, network: &RoadNetwork, idx: usize) -> bool {
        let edge = network.edge(idx);

        if network.is_fringe(idx) {
            log::trace!("Edge {} rejected: fringe", edge.id);
            return false;
        }

        if edge.length().trunc() <= self.min_length {
            log::trace!("Edge {} rejected: length {:.2}", edge.id, edge.length());
            return false;
        }

        if let Some(min_speed) = self.min_speed {
            if edge.speed() < min_speed {
                log::trace!("Edge {} rejected: speed {:.2}", edge.id, edge.speed());
                return false;
            }
        }

        self.accepted_classes.iter().any(|c| edge.allows(c))
    }
}
