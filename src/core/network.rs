//! In-memory road network
//!
//! Edges are stored in load order and addressed by dense indices; outgoing
//! adjacency is kept as index lists in connection order. The network is
//! read-only once built.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a directed edge, as written in the network file
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeId(pub String);

impl EdgeId {
    pub fn new(id: impl Into<String>) -> Self {
        EdgeId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Id of the antiparallel edge under the `-` prefix naming convention
    pub fn opposite(&self) -> EdgeId {
        EdgeId(opposite_of(&self.0))
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a junction
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub String);

/// Map an edge id to the id its reverse direction would carry.
///
/// SUMO networks imported from OSM name the two directions of a way `123`
/// and `-123`. This is purely a naming convention: the result may not exist
/// in the network, in which case callers treat it as "no counterpart".
pub fn opposite_of(id: &str) -> String {
    match id.strip_prefix('-') {
        Some(forward) => forward.to_string(),
        None => format!("-{id}"),
    }
}

/// Vehicle permissions of a single lane
#[derive(Debug, Clone, PartialEq)]
pub enum Permissions {
    /// No `allow`/`disallow` attribute, or `allow="all"`
    All,
    /// Only the listed classes may use the lane
    Only(Vec<String>),
    /// Every class except the listed ones may use the lane
    Except(Vec<String>),
}

impl Permissions {
    /// Build from the raw `allow` / `disallow` attribute values
    pub fn from_attributes(allow: Option<&str>, disallow: Option<&str>) -> Self {
        if let Some(allow) = allow {
            let classes: Vec<String> = allow.split_whitespace().map(str::to_string).collect();
            if classes.iter().any(|c| c == "all") {
                return Permissions::All;
            }
            return Permissions::Only(classes);
        }
        if let Some(disallow) = disallow {
            let classes: Vec<String> = disallow.split_whitespace().map(str::to_string).collect();
            if classes.iter().any(|c| c == "all") {
                return Permissions::Only(Vec::new());
            }
            return Permissions::Except(classes);
        }
        Permissions::All
    }

    pub fn allows(&self, class: &str) -> bool {
        match self {
            Permissions::All => true,
            Permissions::Only(classes) => classes.iter().any(|c| c == class),
            Permissions::Except(classes) => !classes.iter().any(|c| c == class),
        }
    }
}

/// A lane of an edge
#[derive(Debug, Clone)]
pub struct Lane {
    pub index: usize,
    pub length: f64,
    pub speed: f64,
    pub permissions: Permissions,
    pub shape: Vec<(f64, f64)>,
}

/// A directed road segment
#[derive(Debug, Clone)]
pub struct Edge {
    pub id: EdgeId,
    pub from: NodeId,
    pub to: NodeId,
    pub lanes: Vec<Lane>,
    /// Explicit edge geometry, when the network file carries one
    pub shape: Option<Vec<(f64, f64)>>,
}

impl Edge {
    pub fn new(id: impl Into<String>, from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            id: EdgeId::new(id),
            from: NodeId(from.into()),
            to: NodeId(to.into()),
            lanes: Vec::new(),
            shape: None,
        }
    }

    /// Length of the edge, taken from its last lane
    pub fn length(&self) -> f64 {
        self.lanes.last().map_or(0.0, |l| l.length)
    }

    /// Speed limit of the edge, taken from its last lane
    pub fn speed(&self) -> f64 {
        self.lanes.last().map_or(0.0, |l| l.speed)
    }

    /// Whether at least one lane admits the vehicle class
    pub fn allows(&self, class: &str) -> bool {
        self.lanes.iter().any(|l| l.permissions.allows(class))
    }

    /// Geometry of the edge: its own shape, or the lane shapes averaged
    /// point by point when they line up, or the first lane's shape
    pub fn shape(&self) -> Vec<(f64, f64)> {
        if let Some(shape) = &self.shape {
            return shape.clone();
        }
        let Some(first) = self.lanes.first() else {
            return Vec::new();
        };
        if self.lanes.iter().any(|l| l.shape.len() != first.shape.len()) {
            return first.shape.clone();
        }
        let n = self.lanes.len() as f64;
        (0..first.shape.len())
            .map(|i| {
                let (sx, sy) = self
                    .lanes
                    .iter()
                    .fold((0.0, 0.0), |(x, y), l| (x + l.shape[i].0, y + l.shape[i].1));
                (sx / n, sy / n)
            })
            .collect()
    }
}

/// Directed road network with connection-derived adjacency
#[derive(Debug, Default)]
pub struct RoadNetwork {
    edges: Vec<Edge>,
    index: HashMap<EdgeId, usize>,
    outgoing: Vec<Vec<usize>>,
    incoming: Vec<Vec<usize>>,
}

impl RoadNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an edge; returns its index. A duplicate id replaces nothing and
    /// returns the index of the edge already present.
    pub fn add_edge(&mut self, edge: Edge) -> usize {
        if let Some(&idx) = self.index.get(&edge.id) {
            log::debug!("Duplicate edge id '{}' ignored", edge.id);
            return idx;
        }
        let idx = self.edges.len();
        self.index.insert(edge.id.clone(), idx);
        self.edges.push(edge);
        self.outgoing.push(Vec::new());
        self.incoming.push(Vec::new());
        idx
    }

    /// Record that traffic can continue from `from` onto `to`.
    ///
    /// Repeated connections between the same pair (one per lane) collapse to
    /// a single adjacency entry in first-seen order. Returns false if either
    /// edge is unknown.
    pub fn connect(&mut self, from: &str, to: &str) -> bool {
        let (Some(&f), Some(&t)) = (
            self.index.get(&EdgeId::new(from)),
            self.index.get(&EdgeId::new(to)),
        ) else {
            return false;
        };
        if !self.outgoing[f].contains(&t) {
            self.outgoing[f].push(t);
            self.incoming[t].push(f);
        }
        true
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn edge(&self, idx: usize) -> &Edge {
        &self.edges[idx]
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index.get(&EdgeId::new(id)).copied()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index_of(id).is_some()
    }

    /// Outgoing edges of `idx`, in connection order
    pub fn outgoing(&self, idx: usize) -> &[usize] {
        &self.outgoing[idx]
    }

    /// Edges leading into `idx`
    pub fn incoming(&self, idx: usize) -> &[usize] {
        &self.incoming[idx]
    }

    /// An edge is on the fringe when nothing leads into it or nothing leaves it
    pub fn is_fringe(&self, idx: usize) -> bool {
        self.incoming(idx).is_empty() || self.outgoing(idx).is_empty()
    }

    /// Index of the antiparallel edge, if the network has one
    pub fn opposite(&self, idx: usize) -> Option<usize> {
        self.index_of(&opposite_of(self.edges[idx].id.as_str()))
    }
}
