//! Error types for butterfly-place library
//!
//! Provides typed errors for network loading, placement and export operations.

use strsim::normalized_levenshtein;
use thiserror::Error;

/// Vehicle classes known to SUMO (`allow`/`disallow` vocabulary)
pub const SUMO_VEHICLE_CLASSES: &[&str] = &[
    "ignoring",
    "private",
    "emergency",
    "authority",
    "army",
    "vip",
    "pedestrian",
    "passenger",
    "hov",
    "taxi",
    "bus",
    "coach",
    "delivery",
    "truck",
    "trailer",
    "tram",
    "rail_urban",
    "rail",
    "rail_electric",
    "rail_fast",
    "motorcycle",
    "moped",
    "bicycle",
    "evehicle",
    "ship",
    "custom1",
    "custom2",
];

/// Suggest the closest known vehicle class for a misspelled one
pub fn suggest_vehicle_class(class: &str) -> Option<String> {
    let class_lower = class.to_lowercase();
    let mut best: Option<(&str, f64)> = None;

    for &known in SUMO_VEHICLE_CLASSES {
        let score = normalized_levenshtein(&class_lower, known);
        if score >= 0.6 && best.map_or(true, |(_, s)| score > s) {
            best = Some((known, score));
        }
    }

    best.map(|(known, _)| known.to_string())
}

/// Check a vehicle class against the SUMO vocabulary
pub fn validate_vehicle_class(class: &str) -> Result<()> {
    if SUMO_VEHICLE_CLASSES.contains(&class) {
        return Ok(());
    }
    Err(Error::UnknownVehicleClass {
        class: class.to_string(),
        suggestion: suggest_vehicle_class(class),
    })
}

fn did_you_mean(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(s) => format!(" (did you mean '{s}'?)"),
        None => String::new(),
    }
}

/// Main error type for butterfly-place operations
#[derive(Debug, Error)]
pub enum Error {
    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Input file is not well-formed XML
    #[error("XML error: {0}")]
    Xml(#[from] roxmltree::Error),

    /// Configuration file could not be decoded
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Network file is well-formed but structurally unusable
    #[error("Invalid network: {0}")]
    InvalidNetwork(String),

    /// Invalid configuration or parameters
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Vehicle class not part of the SUMO vocabulary
    #[error("Unknown vehicle class '{class}'{}", did_you_mean(.suggestion))]
    UnknownVehicleClass {
        class: String,
        suggestion: Option<String>,
    },

    /// Traversal stack grew past the configured allowance
    #[error("Traversal depth exceeded: {depth} nested edges reached at edge '{edge}'")]
    DepthExceeded { depth: usize, edge: String },

    /// OSM buildings and polygon buildings cannot be paired
    #[error("Different number of buildings: {osm} in OSM file and {poly} in polygon file")]
    BuildingMismatch { osm: usize, poly: usize },
}

/// Convenience result type for butterfly-place operations
pub type Result<T> = std::result::Result<T, Error>;
