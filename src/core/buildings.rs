//! OSM buildings to ns-3 `Building` objects
//!
//! Buildings are matched between the OSM export (tags: name, height,
//! levels) and the SUMO polygon file (projected footprint) by document
//! order, so both files must list the same buildings in the same order.

use std::io::Write;

use log::debug;

use crate::core::emit::format_float;
use crate::core::error::{Error, Result};
use crate::core::poly::DEFAULT_FLOOR_HEIGHT;
use crate::core::sumo::parse_shape;

/// Axis-aligned bounds in ns-3 order (x, y is up, z)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BuildingBox {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
    pub z_min: f64,
    pub z_max: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Building {
    /// C++ identifier for the building variable
    pub name: String,
    pub height: f64,
    pub min_height: f64,
    pub floors: u32,
    pub bounds: BuildingBox,
}

/// Keep ASCII letters only, so the name is a valid C++ identifier
pub fn sanitize_name(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_alphabetic()).collect()
}

fn last_tag<'a>(way: roxmltree::Node<'a, '_>, key: &str) -> Option<&'a str> {
    way.children()
        .filter(|t| t.has_tag_name("tag") && t.attribute("k") == Some(key))
        .filter_map(|t| t.attribute("v"))
        .last()
}

fn tag_f64(way: roxmltree::Node, key: &str) -> f64 {
    match last_tag(way, key).map(|v| v.trim().parse::<f64>()) {
        Some(Ok(v)) => v,
        Some(Err(_)) => {
            debug!("Way {:?}: ignoring non-numeric {key}", way.attribute("id"));
            0.0
        }
        None => 0.0,
    }
}

fn is_osm_building(way: roxmltree::Node) -> bool {
    way.children()
        .filter(|t| t.has_tag_name("tag"))
        .any(|t| t.attributes().any(|a| a.value() == "building"))
}

fn is_poly_building(poly: roxmltree::Node) -> bool {
    poly.attributes().any(|a| a.value().contains("building"))
}

/// Bounds from a footprint and vertical extent.
///
/// Without an explicit height the building is `floors` levels of
/// `DEFAULT_FLOOR_HEIGHT`; the roof sits `min_height` above that.
pub fn building_box(
    footprint: &[(f64, f64)],
    height: f64,
    min_height: f64,
    floors: u32,
) -> Option<BuildingBox> {
    if footprint.is_empty() {
        return None;
    }
    let xs = footprint.iter().map(|p| p.0);
    let zs = footprint.iter().map(|p| p.1);
    let extent = if height != 0.0 {
        height
    } else {
        f64::from(floors) * DEFAULT_FLOOR_HEIGHT
    };
    Some(BuildingBox {
        x_min: xs.clone().fold(f64::INFINITY, f64::min),
        x_max: xs.fold(f64::NEG_INFINITY, f64::max),
        y_min: min_height,
        y_max: extent + min_height,
        z_min: zs.clone().fold(f64::INFINITY, f64::min),
        z_max: zs.fold(f64::NEG_INFINITY, f64::max),
    })
}

/// Pair OSM building ways with building polygons in document order
pub fn pair_buildings(osm_raw: &str, poly_raw: &str) -> Result<Vec<Building>> {
    let osm = roxmltree::Document::parse(osm_raw)?;
    let poly = roxmltree::Document::parse(poly_raw)?;

    let ways: Vec<_> = osm
        .descendants()
        .filter(|n| n.has_tag_name("way") && is_osm_building(*n))
        .collect();
    let polys: Vec<_> = poly
        .descendants()
        .filter(|n| n.has_tag_name("poly") && is_poly_building(*n))
        .collect();

    if ways.len() != polys.len() {
        return Err(Error::BuildingMismatch {
            osm: ways.len(),
            poly: polys.len(),
        });
    }

    ways.iter()
        .zip(&polys)
        .enumerate()
        .map(|(i, (way, poly))| {
            let mut name = sanitize_name(last_tag(*way, "name").unwrap_or_default());
            if name.is_empty() {
                name = format!("building{i}");
            }
            let height = tag_f64(*way, "height");
            let min_height = tag_f64(*way, "min_height");
            let floors = tag_f64(*way, "building:levels").max(0.0) as u32;

            let shape = poly.attribute("shape").ok_or_else(|| {
                Error::InvalidInput(format!("polygon {:?} has no shape", poly.attribute("id")))
            })?;
            let footprint = parse_shape(shape)
                .map_err(|e| Error::InvalidInput(format!("polygon {:?}: {e}", poly.attribute("id"))))?;
            let bounds = building_box(&footprint, height, min_height, floors).ok_or_else(|| {
                Error::InvalidInput(format!("polygon {:?} has an empty shape", poly.attribute("id")))
            })?;

            Ok(Building {
                name,
                height,
                min_height,
                floors,
                bounds,
            })
        })
        .collect()
}

/// ns-3 code creating one building, in its own block scope
pub fn format_ns3_building(b: &Building) -> String {
    let BuildingBox {
        x_min,
        x_max,
        y_min,
        y_max,
        z_min,
        z_max,
    } = b.bounds;
    let [x_min, x_max, y_min, y_max, z_min, z_max] =
        [x_min, x_max, y_min, y_max, z_min, z_max].map(format_float);
    let var = &b.name;
    format!(
        "{{\n\
         \tdouble x_min = {x_min};\n\
         \tdouble x_max = {x_max};\n\
         \tdouble y_min = {y_min};\n\
         \tdouble y_max = {y_max};\n\
         \tdouble z_min = {z_min};\n\
         \tdouble z_max = {z_max};\n\
         \tPtr<Building> {var} = CreateObject <Building> ();\n\
         \t{var}->SetBoundaries (Box (x_min, x_max, y_min, y_max, z_min, z_max));\n\
         \t{var}->SetNFloors ({floors});\n\
         }}\n",
        floors = b.floors
    )
}

pub fn write_ns3_buildings<W: Write>(out: &mut W, buildings: &[Building]) -> Result<()> {
    for b in buildings {
        writeln!(out, "{}", format_ns3_building(b))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const OSM: &str = r#"<osm>
    <way id="1">
        <tag k="building" v="yes"/>
        <tag k="name" v="Torre #1 Est"/>
        <tag k="height" v="20"/>
        <tag k="min_height" v="2"/>
        <tag k="building:levels" v="6"/>
    </way>
    <way id="2">
        <tag k="highway" v="residential"/>
    </way>
    <way id="3">
        <tag k="amenity" v="building"/>
        <tag k="building:levels" v="2"/>
    </way>
</osm>"#;

    const POLY: &str = r#"<additional>
    <poly id="1" type="building" shape="0,0 10,0 10,5 0,5"/>
    <poly id="road" type="highway.residential" shape="0,0 1,1"/>
    <poly id="3" type="building.yes" shape="20,20 30,25"/>
</additional>"#;

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("Torre #1 Est"), "TorreEst");
        assert_eq!(sanitize_name("l'été 2"), "lt");
        assert_eq!(sanitize_name("123"), "");
    }

    #[test]
    fn test_pair_buildings() {
        let buildings = pair_buildings(OSM, POLY).unwrap();
        assert_eq!(buildings.len(), 2);

        let first = &buildings[0];
        assert_eq!(first.name, "TorreEst");
        assert_eq!(first.floors, 6);
        assert_eq!(
            first.bounds,
            BuildingBox {
                x_min: 0.0,
                x_max: 10.0,
                y_min: 2.0,
                y_max: 22.0,
                z_min: 0.0,
                z_max: 5.0,
            }
        );

        let second = &buildings[1];
        assert_eq!(second.name, "building1");
        assert!((second.bounds.y_max - 5.4).abs() < 1e-9);
        assert_eq!(second.bounds.x_min, 20.0);
        assert_eq!(second.bounds.z_max, 25.0);
    }

    #[test]
    fn test_count_mismatch() {
        let poly = r#"<additional><poly id="1" type="building" shape="0,0 1,1"/></additional>"#;
        match pair_buildings(OSM, poly) {
            Err(Error::BuildingMismatch { osm, poly }) => {
                assert_eq!((osm, poly), (2, 1));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_format_ns3_building() {
        let b = Building {
            name: "Hall".to_string(),
            height: 10.0,
            min_height: 0.0,
            floors: 3,
            bounds: BuildingBox {
                x_min: 0.0,
                x_max: 1.5,
                y_min: 0.0,
                y_max: 10.0,
                z_min: -2.0,
                z_max: 2.0,
            },
        };
        let code = format_ns3_building(&b);
        assert!(code.starts_with("{\n\tdouble x_min = 0.0;\n\tdouble x_max = 1.5;\n"));
        assert!(code.contains("\tPtr<Building> Hall = CreateObject <Building> ();\n"));
        assert!(code.contains("\tHall->SetBoundaries (Box (x_min, x_max, y_min, y_max, z_min, z_max));\n"));
        assert!(code.ends_with("\tHall->SetNFloors (3);\n}\n"));
    }

    #[test]
    fn test_multi_level_box_rounded() {
        let osm = r#"<osm><way id="1"><tag k="building" v="yes"/><tag k="name" v="Flats"/><tag k="building:levels" v="3"/></way></osm>"#;
        let poly = r#"<additional><poly id="1" type="building" shape="0.1,0.2 0.3,0.4"/></additional>"#;
        let buildings = pair_buildings(osm, poly).unwrap();
        let code = format_ns3_building(&buildings[0]);
        assert!(code.contains("\tdouble y_max = 8.1;\n"), "{code}");
        assert!(code.contains("\tdouble x_max = 0.3;\n"));
    }

    #[test]
    fn test_building_box_empty() {
        assert_eq!(building_box(&[], 1.0, 0.0, 1), None);
    }
}
