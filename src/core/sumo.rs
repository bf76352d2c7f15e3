//! SUMO network reader
//!
//! Reference: <https://sumo.dlr.de/docs/Networks/SUMO_Road_Networks.html>
//!
//! Only what placement and sensor export need is read: plain edges with
//! their lanes, connections (adjacency and traffic-light control) and edge
//! geometry. Internal junction edges are skipped.

use std::collections::HashMap;
use std::path::Path;

use log::{debug, info};

use crate::core::error::{Error, Result};
use crate::core::network::{Edge, Lane, Permissions, RoadNetwork};

/// A traffic light and the edges whose connections it controls
#[derive(Debug, Clone, PartialEq)]
pub struct TrafficLight {
    pub id: String,
    /// Indices into the road network, in first-reference order
    pub controlled_edges: Vec<usize>,
}

/// A loaded `.net.xml`
#[derive(Debug, Default)]
pub struct SumoNetwork {
    pub roads: RoadNetwork,
    /// Traffic lights in `<tlLogic>` order, then any only referenced by
    /// connections in first-reference order
    pub traffic_lights: Vec<TrafficLight>,
}

impl SumoNetwork {
    pub fn load(path: &Path) -> Result<SumoNetwork> {
        let raw = std::fs::read_to_string(path)?;
        let network = Self::parse(&raw)?;
        info!(
            "Read {}: {} edges, {} traffic lights",
            path.display(),
            network.roads.edge_count(),
            network.traffic_lights.len()
        );
        Ok(network)
    }

    pub fn parse(raw: &str) -> Result<SumoNetwork> {
        let tree = roxmltree::Document::parse(raw)?;
        let root = tree.root_element();
        if root.tag_name().name() != "net" {
            return Err(Error::InvalidNetwork(format!(
                "expected <net> root element, found <{}>",
                root.tag_name().name()
            )));
        }

        let mut network = SumoNetwork::default();

        // edges first so connections resolve regardless of document order
        for obj in root.children().filter(|n| n.is_element()) {
            if obj.tag_name().name() == "edge" {
                if let Some(edge) = parse_edge(obj)? {
                    network.roads.add_edge(edge);
                }
            }
        }

        // traffic lights are numbered in <tlLogic> order; one id may carry
        // several programs
        let mut tls_index: HashMap<String, usize> = HashMap::new();
        for obj in root.children().filter(|n| n.has_tag_name("tlLogic")) {
            let id = required(obj, "id")?;
            if !tls_index.contains_key(id) {
                tls_index.insert(id.to_string(), network.traffic_lights.len());
                network.traffic_lights.push(TrafficLight {
                    id: id.to_string(),
                    controlled_edges: Vec::new(),
                });
            }
        }

        for obj in root.children().filter(|n| n.is_element()) {
            if obj.tag_name().name() != "connection" {
                continue;
            }
            let (Some(from), Some(to)) = (obj.attribute("from"), obj.attribute("to")) else {
                return Err(Error::InvalidNetwork(
                    "connection without from/to".to_string(),
                ));
            };
            if !network.roads.connect(from, to) {
                debug!("Connection {from} -> {to} ignored: unknown or internal edge");
                continue;
            }
            if let Some(tl) = obj.attribute("tl") {
                let Some(from_idx) = network.roads.index_of(from) else {
                    continue;
                };
                let slot = *tls_index.entry(tl.to_string()).or_insert_with(|| {
                    network.traffic_lights.push(TrafficLight {
                        id: tl.to_string(),
                        controlled_edges: Vec::new(),
                    });
                    network.traffic_lights.len() - 1
                });
                let controlled = &mut network.traffic_lights[slot].controlled_edges;
                if !controlled.contains(&from_idx) {
                    controlled.push(from_idx);
                }
            }
        }

        Ok(network)
    }
}

fn is_internal(function: Option<&str>) -> bool {
    matches!(function, Some("internal" | "crossing" | "walkingarea"))
}

fn parse_edge(node: roxmltree::Node) -> Result<Option<Edge>> {
    if is_internal(node.attribute("function")) {
        return Ok(None);
    }
    let id = required(node, "id")?;
    let mut edge = Edge::new(id, required(node, "from")?, required(node, "to")?);
    edge.shape = node.attribute("shape").map(parse_shape).transpose()?;

    for child in node.children() {
        if !child.is_element() || child.tag_name().name() != "lane" {
            continue;
        }
        edge.lanes.push(parse_lane(child)?);
    }
    if edge.lanes.is_empty() {
        debug!("Edge {id} has no lanes");
    }
    Ok(Some(edge))
}

fn parse_lane(node: roxmltree::Node) -> Result<Lane> {
    Ok(Lane {
        index: node
            .attribute("index")
            .and_then(|x| x.parse::<usize>().ok())
            .unwrap_or(0),
        length: parse_number(node, "length")?,
        speed: parse_number(node, "speed")?,
        permissions: Permissions::from_attributes(node.attribute("allow"), node.attribute("disallow")),
        shape: node
            .attribute("shape")
            .map(parse_shape)
            .transpose()?
            .unwrap_or_default(),
    })
}

fn required<'a>(node: roxmltree::Node<'a, '_>, name: &str) -> Result<&'a str> {
    node.attribute(name).ok_or_else(|| {
        Error::InvalidNetwork(format!(
            "<{}> without '{}' attribute",
            node.tag_name().name(),
            name
        ))
    })
}

fn parse_number(node: roxmltree::Node, name: &str) -> Result<f64> {
    let raw = required(node, name)?;
    raw.parse::<f64>().map_err(|_| {
        Error::InvalidNetwork(format!(
            "<{}> attribute {}=\"{}\" is not a number",
            node.tag_name().name(),
            name,
            raw
        ))
    })
}

/// Parse `x,y[,z] x,y[,z] ...`, ignoring the Z coordinate
pub fn parse_shape(raw: &str) -> Result<Vec<(f64, f64)>> {
    raw.split_whitespace()
        .map(|pt| {
            let mut parts = pt.split(',').map(str::parse::<f64>);
            match (parts.next(), parts.next()) {
                (Some(Ok(x)), Some(Ok(y))) => Ok((x, y)),
                _ => Err(Error::InvalidNetwork(format!("bad shape point '{pt}'"))),
            }
        })
        .collect()
}
