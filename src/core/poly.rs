//! SUMO polygon file post-processing
//!
//! Two passes over `polyconvert` output: pruning shapes the obstacle model
//! cannot use, and enriching building polygons with heights taken from the
//! OSM ways they were generated from.

use std::collections::HashMap;
use std::io::Write;

use log::debug;

use crate::core::emit::{escape_attr, format_float, write_xml_header};
use crate::core::error::Result;

/// Default height of one building level, in meters
pub const DEFAULT_FLOOR_HEIGHT: f64 = 2.7;

/// Default height of one roof level, in meters
pub const DEFAULT_ROOF_HEIGHT: f64 = 2.1;

/// Only shapes on this layer are kept by pruning
pub const GROUND_LAYER: &str = "-1.00";

const ADDITIONAL_OPEN: &str = r#"<additional xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:noNamespaceSchemaLocation="http://sumo.dlr.de/xsd/additional_file.xsd">"#;

fn attributes_of(node: roxmltree::Node) -> Vec<(String, String)> {
    node.attributes()
        .map(|a| (a.name().to_string(), a.value().to_string()))
        .collect()
}

/// Serialize an element with the given attributes, then its element
/// children verbatim
fn write_element<W: Write>(
    out: &mut W,
    node: roxmltree::Node,
    depth: usize,
    attrs: &[(String, String)],
) -> Result<()> {
    let indent = "\t".repeat(depth);
    write!(out, "{indent}<{}", node.tag_name().name())?;
    for (name, value) in attrs {
        write!(out, " {}=\"{}\"", name, escape_attr(value))?;
    }

    let children: Vec<_> = node.children().filter(|c| c.is_element()).collect();
    if children.is_empty() {
        writeln!(out, "/>")?;
    } else {
        writeln!(out, ">")?;
        for child in children {
            write_element(out, child, depth + 1, &attributes_of(child))?;
        }
        writeln!(out, "{indent}</{}>", node.tag_name().name())?;
    }
    Ok(())
}

/// Outcome of a pruning pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PruneStats {
    pub kept: usize,
    pub removed: usize,
}

fn should_prune(node: roxmltree::Node) -> bool {
    if node.attribute("id").is_some_and(|id| id.contains('#')) {
        return true;
    }
    if node.attribute("layer").is_some_and(|layer| layer != GROUND_LAYER) {
        return true;
    }
    node.attribute("type") == Some("water")
}

/// Drop shapes that are split parts (`#` in the id), off the ground layer,
/// or water. Remaining shapes get a trailing space appended to `shape`.
pub fn prune_polygons<W: Write>(raw: &str, out: &mut W) -> Result<PruneStats> {
    let tree = roxmltree::Document::parse(raw)?;
    let mut stats = PruneStats { kept: 0, removed: 0 };

    write_xml_header(out)?;
    writeln!(out, "{ADDITIONAL_OPEN}")?;
    for el in tree.root_element().children().filter(|n| n.is_element()) {
        if should_prune(el) {
            debug!("Pruned <{}> {:?}", el.tag_name().name(), el.attribute("id"));
            stats.removed += 1;
            continue;
        }
        stats.kept += 1;

        let mut attrs = attributes_of(el);
        for (name, value) in attrs.iter_mut() {
            if name == "shape" {
                value.push(' ');
            }
        }
        write_element(out, el, 1, &attrs)?;
    }
    writeln!(out, "</additional>")?;
    Ok(stats)
}

/// Per-level height parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeightDefaults {
    pub floor: f64,
    pub roof: f64,
}

impl Default for HeightDefaults {
    fn default() -> Self {
        Self {
            floor: DEFAULT_FLOOR_HEIGHT,
            roof: DEFAULT_ROOF_HEIGHT,
        }
    }
}

/// Sum of the explicit height and the level-derived heights present
pub fn estimate_height(
    height: Option<f64>,
    levels: Option<f64>,
    roof_levels: Option<f64>,
    defaults: HeightDefaults,
) -> f64 {
    height.unwrap_or(0.0)
        + levels.map_or(0.0, |l| l * defaults.floor)
        + roof_levels.map_or(0.0, |l| l * defaults.roof)
}

fn tag_number(way: roxmltree::Node, key: &str) -> Option<f64> {
    let value = way
        .children()
        .filter(|t| t.is_element() && t.tag_name().name() == "tag")
        .filter(|t| t.attribute("k") == Some(key))
        .filter_map(|t| t.attribute("v"))
        .last()?;
    match value.trim().parse::<f64>() {
        Ok(v) => Some(v),
        Err(_) => {
            debug!("Ignoring non-numeric {key}={value:?}");
            None
        }
    }
}

/// Height of every OSM way carrying `height`, `building:levels` or `roof:levels`
pub fn read_osm_heights(raw: &str, defaults: HeightDefaults) -> Result<HashMap<String, f64>> {
    let tree = roxmltree::Document::parse(raw)?;
    let mut heights = HashMap::new();

    for way in tree.root_element().children().filter(|n| n.has_tag_name("way")) {
        let Some(id) = way.attribute("id") else {
            continue;
        };
        let height = tag_number(way, "height");
        let levels = tag_number(way, "building:levels");
        let roof_levels = tag_number(way, "roof:levels");
        if height.is_some() || levels.is_some() || roof_levels.is_some() {
            heights.insert(
                id.to_string(),
                estimate_height(height, levels, roof_levels, defaults),
            );
        }
    }
    Ok(heights)
}

/// Mean of the known heights, if any
pub fn mean_height(heights: &HashMap<String, f64>) -> Option<f64> {
    if heights.is_empty() {
        return None;
    }
    Some(heights.values().sum::<f64>() / heights.len() as f64)
}

/// Outcome of an enrichment pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnrichStats {
    pub total: usize,
    pub enriched: usize,
}

impl EnrichStats {
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.enriched as f64 / self.total as f64 * 100.0
        }
    }
}

/// Copy every `<poly>`, adding `height` before the last attribute of those
/// whose id has a known height
pub fn enrich_polygons<W: Write>(
    raw: &str,
    heights: &HashMap<String, f64>,
    out: &mut W,
) -> Result<EnrichStats> {
    let tree = roxmltree::Document::parse(raw)?;
    let mut stats = EnrichStats {
        total: 0,
        enriched: 0,
    };

    write_xml_header(out)?;
    writeln!(out, "{ADDITIONAL_OPEN}")?;
    for poly in tree.descendants().filter(|n| n.has_tag_name("poly")) {
        stats.total += 1;
        let mut attrs = attributes_of(poly);
        if let Some(h) = poly.attribute("id").and_then(|id| heights.get(id)) {
            let at = attrs.len().saturating_sub(1);
            attrs.insert(at, ("height".to_string(), format_float(*h)));
            stats.enriched += 1;
        }
        write_element(out, poly, 1, &attrs)?;
    }
    writeln!(out, "</additional>")?;
    Ok(stats)
}
