//! # Butterfly-place Library
//!
//! Places entities (vehicles, sensors, buildings) over SUMO road networks and
//! writes the files SUMO and ns-3 consume.
//!
//! ## Features
//!
//! - **Fixed spacing**: depth-first walk that carries leftover spacing from one
//!   edge onto the edges entered next
//! - **Random spacing**: flat pass with uniformly drawn integer steps
//! - **Direction dedup**: at most one of `X` and `-X` receives placements
//! - **Progress tracking**: optional progress callbacks for custom UIs
//! - **ns-3 helpers**: traffic-light sensors, polygon pruning and enrichment,
//!   building export
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use butterfly_place::{PlacementConfig, TraversalOptions};
//! use std::path::Path;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PlacementConfig::default();
//!     let outcome = butterfly_place::generate_trips(
//!         Path::new("map.net.xml"),
//!         Path::new("map.trips.xml"),
//!         &config,
//!         &TraversalOptions::default(),
//!     )?;
//!     println!("{} vehicles", outcome.records.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Working on an in-memory network
//!
//! ```rust
//! use butterfly_place::{traverse, FeasibilityPolicy, SpacingPolicy, StartOffset, SumoNetwork, TraversalOptions};
//!
//! let net = SumoNetwork::parse(r#"<net>
//!     <edge id="a" from="n0" to="n1"><lane id="a_0" speed="13.89" length="120"/></edge>
//!     <edge id="b" from="n1" to="n0"><lane id="b_0" speed="13.89" length="120"/></edge>
//!     <connection from="a" to="b"/>
//!     <connection from="b" to="a"/>
//! </net>"#).unwrap();
//!
//! let outcome = traverse(
//!     &net.roads,
//!     &FeasibilityPolicy::default(),
//!     &SpacingPolicy::fixed(50.0, StartOffset::At(1.0)),
//!     &TraversalOptions::default(),
//! ).unwrap();
//! assert_eq!(outcome.records.len(), 5);
//! ```

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;

pub use crate::core::buildings::{pair_buildings, sanitize_name, Building, BuildingBox};
pub use crate::core::config::PlacementConfig;
pub use crate::core::emit::{write_ns2_mobility, write_trips, Position3};
pub use crate::core::error::{Error, Result};
pub use crate::core::feasibility::FeasibilityPolicy;
pub use crate::core::network::{opposite_of, Edge, EdgeId, Lane, NodeId, Permissions, RoadNetwork};
pub use crate::core::placement::{
    place_fixed, place_uniform, Placement, Spacing, SpacingPolicy, StartOffset, DEFAULT_DISTANCE,
    DEFAULT_MAX_STEP, DEFAULT_MIN_STEP,
};
pub use crate::core::poly::{mean_height, EnrichStats, HeightDefaults, PruneStats};
pub use crate::core::sensors::{traffic_light_sensors, DEFAULT_SENSOR_HEIGHT};
pub use crate::core::sumo::{SumoNetwork, TrafficLight};
pub use crate::core::traversal::{
    generate, scatter, traverse, Color, PlacementRecord, ProgressCallback, TraversalOptions,
    TraversalOutcome,
};

// Internal modules
mod core;

/// Seed for random spacing: the configured one, else the clock in microseconds
pub fn resolve_seed(config: &PlacementConfig) -> u64 {
    config.seed.unwrap_or_else(|| {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_micros() as u64)
            .unwrap_or_default()
    })
}

fn create_output(dest: &Path) -> Result<BufWriter<File>> {
    Ok(BufWriter::new(File::create(dest)?))
}

/// Place vehicles over a SUMO network and write them as a trips file
///
/// # Arguments
/// * `net` - SUMO `.net.xml` to read
/// * `dest` - trips file to write
/// * `config` - spacing, feasibility and seed
/// * `options` - depth limit and progress callback
pub fn generate_trips(
    net: &Path,
    dest: &Path,
    config: &PlacementConfig,
    options: &TraversalOptions,
) -> Result<TraversalOutcome> {
    let network = SumoNetwork::load(net)?;
    let seed = resolve_seed(config);
    let mut rng = StdRng::seed_from_u64(seed);
    if matches!(config.spacing.spacing, Spacing::Uniform { .. }) {
        info!("Random spacing seed: {seed}");
    }

    let outcome = generate(&network.roads, config, options, &mut rng)?;

    let mut out = create_output(dest)?;
    write_trips(&mut out, &outcome.records)?;
    out.flush()?;
    Ok(outcome)
}

/// Write one ns-2 node per traffic-light controlled edge
///
/// Returns the number of sensors written.
pub fn generate_sensors(net: &Path, dest: &Path, height: f64, first_id: u64) -> Result<usize> {
    let network = SumoNetwork::load(net)?;
    let sensors = traffic_light_sensors(&network, height);

    let mut out = create_output(dest)?;
    write_ns2_mobility(&mut out, &sensors, first_id)?;
    out.flush()?;
    Ok(sensors.len())
}

/// Prune a polygon file, see [`PruneStats`]
pub fn prune_poly_file(src: &Path, dest: &Path) -> Result<PruneStats> {
    let raw = std::fs::read_to_string(src)?;
    let mut out = create_output(dest)?;
    let stats = core::poly::prune_polygons(&raw, &mut out)?;
    out.flush()?;
    info!("Pruned {}: kept {}, removed {}", src.display(), stats.kept, stats.removed);
    Ok(stats)
}

/// Add OSM-derived heights to a polygon file
///
/// Returns the enrichment counts and the mean of all heights found in the
/// OSM file.
pub fn enrich_poly_file(
    osm: &Path,
    poly: &Path,
    dest: &Path,
    defaults: HeightDefaults,
) -> Result<(EnrichStats, Option<f64>)> {
    let heights: HashMap<String, f64> =
        core::poly::read_osm_heights(&std::fs::read_to_string(osm)?, defaults)?;
    info!("Read {} heights from {}", heights.len(), osm.display());

    let raw = std::fs::read_to_string(poly)?;
    let mut out = create_output(dest)?;
    let stats = core::poly::enrich_polygons(&raw, &heights, &mut out)?;
    out.flush()?;
    Ok((stats, mean_height(&heights)))
}

/// Export OSM buildings as ns-3 code, to `dest` or stdout
///
/// Returns the number of buildings written.
pub fn export_buildings(osm: &Path, poly: &Path, dest: Option<&Path>) -> Result<usize> {
    let buildings = pair_buildings(
        &std::fs::read_to_string(osm)?,
        &std::fs::read_to_string(poly)?,
    )?;

    match dest {
        Some(path) => {
            let mut out = create_output(path)?;
            core::buildings::write_ns3_buildings(&mut out, &buildings)?;
            out.flush()?;
        }
        None => {
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            core::buildings::write_ns3_buildings(&mut out, &buildings)?;
            out.flush()?;
        }
    }
    Ok(buildings.len())
}
