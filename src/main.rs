//! # Butterfly-place CLI
//!
//! Command-line interface for the butterfly-place library.
//! Generates SUMO trip files and ns-3 inputs from SUMO road networks.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use butterfly_place::{
    FeasibilityPolicy, HeightDefaults, PlacementConfig, Spacing, StartOffset, TraversalOptions,
    DEFAULT_DISTANCE, DEFAULT_MAX_STEP, DEFAULT_MIN_STEP, DEFAULT_SENSOR_HEIGHT,
};
use clap::{Parser, Subcommand, ValueEnum};
use log::error;

mod cli;

/// Command-line interface for butterfly-place
#[derive(Parser)]
#[command(name = "butterfly-place")]
#[command(about = "Fixed and randomized entity placement over SUMO road networks")]
#[command(long_about = "Places vehicles and sensors over SUMO networks and prepares ns-3 inputs:
  butterfly-place trips -n map.net.xml                     # One vehicle every 50m
  butterfly-place trips -n map.net.xml -d 25 --start half  # Every 25m, from mid-edge
  butterfly-place trips -n map.net.xml --mode random       # Random 10-14m steps
  butterfly-place sensors -n map.net.xml -o sensors.ns2    # Sensors at traffic lights
  butterfly-place prune-poly poly.xml -o pruned.xml        # Drop unusable shapes
  butterfly-place enrich-poly --osm map.osm                # Add building heights
  butterfly-place buildings --osm map.osm --poly poly.xml  # ns-3 Building code

Logging goes to stderr; RUST_LOG is honoured, --verbose enables debug output.")]
#[command(version = env!("BUTTERFLY_VERSION"))]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Spacing strategy for trips
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Depth-first walk with fixed distance and spillover
    Fixed,
    /// Flat pass with random integer steps
    Random,
}

/// Where placement starts on an edge without inherited spillover
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Start {
    /// One meter from the edge start
    One,
    /// Middle of the edge
    Half,
}

impl From<Start> for StartOffset {
    fn from(start: Start) -> Self {
        match start {
            Start::One => StartOffset::At(1.0),
            Start::Half => StartOffset::HalfLength,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Place vehicles over a network and write a SUMO trips file
    Trips {
        /// SUMO network file
        #[arg(short, long)]
        net: PathBuf,
        /// Output trips file
        #[arg(short, long, default_value = "trips.trips.xml")]
        output: PathBuf,
        /// Spacing strategy (default fixed)
        #[arg(short, long, value_enum)]
        mode: Option<Mode>,
        /// Distance between vehicles in fixed mode (default 50)
        #[arg(short, long)]
        distance: Option<f64>,
        /// Start offset on edges without spillover
        #[arg(long, value_enum)]
        start: Option<Start>,
        /// Smallest random step (default 10)
        #[arg(long)]
        min_step: Option<u32>,
        /// Largest random step (default 14)
        #[arg(long)]
        max_step: Option<u32>,
        /// Random seed (default: clock)
        #[arg(long)]
        seed: Option<u64>,
        /// Reject edges slower than 13 m/s
        #[arg(long, conflicts_with = "no_speed_check")]
        speed_check: bool,
        /// Accept edges regardless of speed
        #[arg(long)]
        no_speed_check: bool,
        /// Accepted vehicle classes, comma separated
        #[arg(long, value_delimiter = ',')]
        classes: Option<Vec<String>>,
        /// Fail when the depth-first walk nests deeper than this
        #[arg(long)]
        max_depth: Option<usize>,
        /// JSON placement configuration; flags override its values
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Write ns-2 mobility nodes at the stop line of traffic-light edges
    Sensors {
        /// SUMO network file
        #[arg(short, long)]
        net: PathBuf,
        /// Output ns-2 mobility file
        #[arg(short, long)]
        output: PathBuf,
        /// Sensor height in meters
        #[arg(short = 'z', long, default_value_t = DEFAULT_SENSOR_HEIGHT)]
        height: f64,
        /// Id of the first sensor node
        #[arg(short = 'i', long, default_value_t = 0)]
        first_id: u64,
    },
    /// Remove split, off-ground and water shapes from a polygon file
    PrunePoly {
        /// Polygon file
        input: PathBuf,
        /// Output polygon file
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Add OSM building heights to a polygon file
    EnrichPoly {
        /// OSM file the polygons were converted from
        #[arg(short = 'i', long)]
        osm: PathBuf,
        /// Polygon file
        #[arg(short, long, default_value = "poly.xml")]
        poly: PathBuf,
        /// Output polygon file
        #[arg(short, long, default_value = "3Dpoly.xml")]
        output: PathBuf,
        /// Height of one building level
        #[arg(short, long, default_value_t = 2.7)]
        floor: f64,
        /// Height of one roof level
        #[arg(short, long, default_value_t = 2.1)]
        roof: f64,
    },
    /// Export OSM buildings as ns-3 Building creation code
    Buildings {
        /// OSM file
        #[arg(short = 'i', long)]
        osm: PathBuf,
        /// Polygon file converted from the same OSM file
        #[arg(short, long)]
        poly: PathBuf,
        /// Output C++ file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() {
    if let Err(e) = run() {
        error!("❌ Error: {e:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging to stderr
    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .target(env_logger::Target::Stderr)
        .init();

    if cli.verbose {
        eprintln!("🦋 Butterfly-place v{} starting...", env!("BUTTERFLY_VERSION"));
    }

    match cli.command {
        Commands::Trips {
            net,
            output,
            mode,
            distance,
            start,
            min_step,
            max_step,
            seed,
            speed_check,
            no_speed_check,
            classes,
            max_depth,
            config,
        } => {
            let base = match config {
                Some(path) => PlacementConfig::from_json_file(&path)
                    .with_context(|| format!("failed to load config {}", path.display()))?,
                None if mode == Some(Mode::Random) => PlacementConfig::random(),
                None => PlacementConfig::default(),
            };
            let overrides = TripOverrides {
                mode,
                distance,
                start,
                min_step,
                max_step,
                seed,
                speed_check: speed_check.then_some(true).or(no_speed_check.then_some(false)),
                classes,
                max_depth,
            };
            let config = overrides.apply(base);
            run_trips(&net, &output, &config)
        }
        Commands::Sensors {
            net,
            output,
            height,
            first_id,
        } => {
            eprintln!("📡 Placing sensors at traffic lights of {}", net.display());
            let count = butterfly_place::generate_sensors(&net, &output, height, first_id)
                .with_context(|| format!("failed to write sensors from {}", net.display()))?;
            eprintln!("✅ {count} sensors written to {}", output.display());
            Ok(())
        }
        Commands::PrunePoly { input, output } => {
            let stats = butterfly_place::prune_poly_file(&input, &output)
                .with_context(|| format!("failed to prune {}", input.display()))?;
            eprintln!(
                "✅ Kept {} shapes, removed {} ({})",
                stats.kept,
                stats.removed,
                output.display()
            );
            Ok(())
        }
        Commands::EnrichPoly {
            osm,
            poly,
            output,
            floor,
            roof,
        } => {
            let defaults = HeightDefaults { floor, roof };
            let (stats, mean) = butterfly_place::enrich_poly_file(&osm, &poly, &output, defaults)
                .with_context(|| format!("failed to enrich {}", poly.display()))?;
            eprintln!(
                "🏢 {} of {} polygons enriched ({:.1}%)",
                stats.enriched,
                stats.total,
                stats.percent()
            );
            if let Some(mean) = mean {
                eprintln!("📏 Mean building height: {mean:.2}m");
            }
            eprintln!("✅ Saved to {}", output.display());
            Ok(())
        }
        Commands::Buildings { osm, poly, output } => {
            let count = butterfly_place::export_buildings(&osm, &poly, output.as_deref())
                .with_context(|| {
                    format!("failed to export buildings from {}", osm.display())
                })?;
            eprintln!("🏢 {count} buildings exported");
            Ok(())
        }
    }
}

/// Command-line values layered over a base configuration
#[derive(Debug, Default)]
struct TripOverrides {
    mode: Option<Mode>,
    distance: Option<f64>,
    start: Option<Start>,
    min_step: Option<u32>,
    max_step: Option<u32>,
    seed: Option<u64>,
    speed_check: Option<bool>,
    classes: Option<Vec<String>>,
    max_depth: Option<usize>,
}

impl TripOverrides {
    fn apply(self, mut config: PlacementConfig) -> PlacementConfig {
        let mode = self.mode.unwrap_or(match config.spacing.spacing {
            Spacing::Fixed { .. } => Mode::Fixed,
            Spacing::Uniform { .. } => Mode::Random,
        });
        match mode {
            Mode::Fixed => {
                let current = match config.spacing.spacing {
                    Spacing::Fixed { distance } => distance,
                    Spacing::Uniform { .. } => DEFAULT_DISTANCE,
                };
                config.spacing.spacing = Spacing::Fixed {
                    distance: self.distance.unwrap_or(current),
                };
            }
            Mode::Random => {
                let (min, max) = match config.spacing.spacing {
                    Spacing::Uniform { min_step, max_step } => (min_step, max_step),
                    Spacing::Fixed { .. } => (DEFAULT_MIN_STEP, DEFAULT_MAX_STEP),
                };
                config.spacing.spacing = Spacing::Uniform {
                    min_step: self.min_step.unwrap_or(min),
                    max_step: self.max_step.unwrap_or(max),
                };
            }
        }
        // random spacing checks speed unless told otherwise or already set
        if mode == Mode::Random
            && config.feasibility.min_speed.is_none()
            && self.speed_check != Some(false)
        {
            config.feasibility.min_speed = FeasibilityPolicy::with_speed_check().min_speed;
        }
        if let Some(start) = self.start {
            config.spacing.start = start.into();
        }
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        match self.speed_check {
            Some(true) => {
                config.feasibility.min_speed = FeasibilityPolicy::with_speed_check().min_speed
            }
            Some(false) => config.feasibility.min_speed = None,
            None => {}
        }
        if let Some(classes) = self.classes {
            config.feasibility.accepted_classes = classes;
        }
        if let Some(depth) = self.max_depth {
            config.max_depth = Some(depth);
        }
        config
    }
}

fn run_trips(net: &Path, output: &Path, config: &PlacementConfig) -> Result<()> {
    eprintln!("🚗 Placing vehicles over {}", net.display());
    eprintln!("📁 Saving to: {}", output.display());

    let progress_manager = cli::ProgressManager::new(0, "🛣️  Walking network");
    let options = TraversalOptions {
        progress: Some(progress_manager.callback()),
        ..Default::default()
    };

    let outcome = butterfly_place::generate_trips(net, output, config, &options)
        .with_context(|| format!("failed to place vehicles over {}", net.display()))?;
    progress_manager.pb.finish_and_clear();

    eprintln!(
        "✅ {} vehicles on {} edges",
        outcome.records.len(),
        outcome.covered_edge_count()
    );
    Ok(())
}
