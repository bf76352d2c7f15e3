//! Placement over a whole network
//!
//! Fixed spacing walks the network depth-first along outgoing connections so
//! that leftover spacing at the end of one edge becomes the starting offset of
//! the edges entered next. The walk uses an explicit stack of frames instead
//! of recursion; a frame is popped (and its edge colored done) once all of its
//! outgoing edges have been tried.
//!
//! Random spacing has no carry-over and is a flat pass over the edges in load
//! order.

use std::collections::HashSet;
use std::sync::Arc;

use log::{debug, info, warn};
use rand::Rng;
use serde::Serialize;

use crate::core::config::PlacementConfig;
use crate::core::error::{Error, Result};
use crate::core::feasibility::FeasibilityPolicy;
use crate::core::network::{EdgeId, RoadNetwork};
use crate::core::placement::{place_fixed, place_uniform, Spacing, SpacingPolicy, StartOffset};

/// Progress callback: (edges finished, total edges)
pub type ProgressCallback = Arc<dyn Fn(u64, u64) + Send + Sync>;

/// DFS visitation state of an edge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Unvisited,
    InProgress,
    Done,
}

/// One entity placed on an edge
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacementRecord {
    /// Zero-based, strictly increasing in emission order
    pub id: usize,
    pub edge: EdgeId,
    /// Distance from the start of the edge
    pub offset: f64,
}

impl PlacementRecord {
    /// Every entity departs at simulation start
    pub const DEPART: f64 = 0.0;
}

/// Options for a placement run
#[derive(Clone, Default)]
pub struct TraversalOptions {
    /// Maximum number of nested edges on the DFS stack (unbounded if None)
    pub max_depth: Option<usize>,
    /// Optional progress callback, called each time an edge is finished
    pub progress: Option<ProgressCallback>,
}

/// Result of a placement run
#[derive(Debug, Clone)]
pub struct TraversalOutcome {
    pub records: Vec<PlacementRecord>,
    /// Edges that received placement, in the order they were covered
    pub placed_edges: Vec<EdgeId>,
    /// Final color of every edge, indexed like the network's edges
    pub colors: Vec<Color>,
}

impl TraversalOutcome {
    /// Number of distinct edges carrying at least one record
    pub fn covered_edge_count(&self) -> usize {
        let mut seen = HashSet::new();
        self.records.iter().filter(|r| seen.insert(&r.edge)).count()
    }
}

struct Frame {
    edge: usize,
    spillover: Option<f64>,
    next_child: usize,
}

/// Mutable state of one fixed-spacing walk
struct Traversal<'a> {
    network: &'a RoadNetwork,
    feasibility: &'a FeasibilityPolicy,
    distance: f64,
    start: StartOffset,
    options: &'a TraversalOptions,
    colors: Vec<Color>,
    /// Edges that received placement, by index
    placed: Vec<bool>,
    placed_order: Vec<EdgeId>,
    records: Vec<PlacementRecord>,
    finished: u64,
}

impl<'a> Traversal<'a> {
    fn new(
        network: &'a RoadNetwork,
        feasibility: &'a FeasibilityPolicy,
        distance: f64,
        start: StartOffset,
        options: &'a TraversalOptions,
    ) -> Self {
        Self {
            network,
            feasibility,
            distance,
            start,
            options,
            colors: vec![Color::Unvisited; network.edge_count()],
            placed: vec![false; network.edge_count()],
            placed_order: Vec::new(),
            records: Vec::new(),
            finished: 0,
        }
    }

    fn run(mut self) -> Result<TraversalOutcome> {
        for root in 0..self.network.edge_count() {
            if self.colors[root] == Color::Unvisited {
                self.visit(root)?;
            }
        }
        Ok(TraversalOutcome {
            records: self.records,
            placed_edges: self.placed_order,
            colors: self.colors,
        })
    }

    fn visit(&mut self, root: usize) -> Result<()> {
        let network = self.network;

        self.check_depth(1, root)?;
        let mut stack = vec![self.enter(root, None)];

        while let Some(frame) = stack.last_mut() {
            let outgoing = network.outgoing(frame.edge);
            if frame.next_child < outgoing.len() {
                let child = outgoing[frame.next_child];
                frame.next_child += 1;
                let spillover = frame.spillover;

                // in-progress children are back edges of a cycle
                if self.colors[child] != Color::Unvisited {
                    continue;
                }
                self.check_depth(stack.len() + 1, child)?;
                let next = self.enter(child, spillover);
                stack.push(next);
            } else {
                let edge = frame.edge;
                stack.pop();
                self.finish(edge);
            }
        }
        Ok(())
    }

    fn check_depth(&self, depth: usize, idx: usize) -> Result<()> {
        match self.options.max_depth {
            Some(max) if depth > max => Err(Error::DepthExceeded {
                depth,
                edge: self.network.edge(idx).id.to_string(),
            }),
            _ => Ok(()),
        }
    }

    /// Color the edge in progress and place on it if it qualifies
    fn enter(&mut self, idx: usize, inherited: Option<f64>) -> Frame {
        self.colors[idx] = Color::InProgress;

        let mut spillover = None;
        if self.feasibility.is_feasible(self.network, idx) {
            let edge = self.network.edge(idx);
            if opposite_placed(self.network, &self.placed, idx) {
                debug!("Edge {} skipped: {} already covered", edge.id, edge.id.opposite());
            } else {
                self.placed[idx] = true;
                self.placed_order.push(edge.id.clone());

                let length = edge.length().trunc();
                let start = inherited.unwrap_or_else(|| self.start.resolve(length));
                let placement = place_fixed(start, length, self.distance);
                debug!(
                    "Edge {}: {} placements from {:.2}, spillover {:.2}",
                    edge.id,
                    placement.offsets.len(),
                    start,
                    placement.overshoot
                );
                push_records(&mut self.records, &edge.id, placement.offsets);
                spillover = Some(placement.overshoot);
            }
        }

        Frame {
            edge: idx,
            spillover,
            next_child: 0,
        }
    }

    fn finish(&mut self, idx: usize) {
        self.colors[idx] = Color::Done;
        self.finished += 1;
        if let Some(ref progress) = self.options.progress {
            progress(self.finished, self.network.edge_count() as u64);
        }
    }
}

/// Whether the reverse direction of `idx` exists and already carries placements
fn opposite_placed(network: &RoadNetwork, placed: &[bool], idx: usize) -> bool {
    network.opposite(idx).is_some_and(|o| placed[o])
}

fn push_records(records: &mut Vec<PlacementRecord>, edge: &EdgeId, offsets: Vec<f64>) {
    for offset in offsets {
        records.push(PlacementRecord {
            id: records.len(),
            edge: edge.clone(),
            offset,
        });
    }
}

/// Depth-first placement with fixed spacing and spillover carry-over
pub fn traverse(
    network: &RoadNetwork,
    feasibility: &FeasibilityPolicy,
    policy: &SpacingPolicy,
    options: &TraversalOptions,
) -> Result<TraversalOutcome> {
    let Spacing::Fixed { distance } = policy.spacing else {
        return Err(Error::InvalidInput(
            "depth-first traversal requires fixed spacing".to_string(),
        ));
    };
    policy.validate()?;

    Traversal::new(network, feasibility, distance, policy.start, options).run()
}

/// Flat pass with random spacing: every feasible edge restarts from the
/// policy's start offset and no spillover is carried
pub fn scatter<R: Rng + ?Sized>(
    network: &RoadNetwork,
    feasibility: &FeasibilityPolicy,
    policy: &SpacingPolicy,
    options: &TraversalOptions,
    rng: &mut R,
) -> Result<TraversalOutcome> {
    let Spacing::Uniform { min_step, max_step } = policy.spacing else {
        return Err(Error::InvalidInput(
            "flat scatter requires random spacing".to_string(),
        ));
    };
    policy.validate()?;

    let total = network.edge_count() as u64;
    let mut placed = vec![false; network.edge_count()];
    let mut placed_order = Vec::new();
    let mut records = Vec::new();

    for (idx, edge) in network.edges().iter().enumerate() {
        if feasibility.is_feasible(network, idx) && !opposite_placed(network, &placed, idx) {
            placed[idx] = true;
            placed_order.push(edge.id.clone());

            let length = edge.length().trunc();
            let start = policy.start.resolve(length);
            let placement = place_uniform(start, length, min_step, max_step, rng);
            debug!("Edge {}: {} placements", edge.id, placement.offsets.len());
            push_records(&mut records, &edge.id, placement.offsets);
        }

        if let Some(ref progress) = options.progress {
            progress(idx as u64 + 1, total);
        }
    }

    Ok(TraversalOutcome {
        records,
        placed_edges: placed_order,
        colors: vec![Color::Done; network.edge_count()],
    })
}

/// Run the placement strategy matching the configured spacing
pub fn generate<R: Rng + ?Sized>(
    network: &RoadNetwork,
    config: &PlacementConfig,
    options: &TraversalOptions,
    rng: &mut R,
) -> Result<TraversalOutcome> {
    config.validate()?;
    let options = TraversalOptions {
        max_depth: options.max_depth.or(config.max_depth),
        progress: options.progress.clone(),
    };

    if network.is_empty() {
        warn!("Network has no edges, nothing to place");
    }
    info!(
        "Placing over {} edges with {:?}",
        network.edge_count(),
        config.spacing.spacing
    );
    let outcome = match config.spacing.spacing {
        Spacing::Fixed { .. } => {
            traverse(network, &config.feasibility, &config.spacing, &options)?
        }
        Spacing::Uniform { .. } => {
            scatter(network, &config.feasibility, &config.spacing, &options, rng)?
        }
    };
    info!(
        "Placed {} entities on {} edges",
        outcome.records.len(),
        outcome.covered_edge_count()
    );
    Ok(outcome)
}
