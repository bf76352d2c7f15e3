//! Output writers: SUMO trip files and ns-2 mobility traces

use std::io::Write;

use crate::core::error::Result;
use crate::core::traversal::PlacementRecord;

/// Vehicle type every generated trip refers to
pub const CAR_VTYPE: &str =
    r#"<vType id="car" accel="0.8" decel="4.5" sigma="0.5" length="4" maxSpeed="50"/>"#;

/// Escape a value for use inside a double-quoted XML attribute
pub fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// Decimal text of a float rounded to 12 significant digits, always with a
/// fractional part (`8.1`, `10.0`, `-0.5`)
pub fn format_float(value: f64) -> String {
    if !value.is_finite() {
        return format!("{value}");
    }
    if value == 0.0 {
        return "0.0".to_string();
    }
    let exponent = value.abs().log10().floor() as i32;
    if !(-4..12).contains(&exponent) {
        return format!("{value:e}");
    }
    let decimals = (11 - exponent).max(0) as usize;
    let text = format!("{value:.decimals$}");
    let text = if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.')
    } else {
        text.as_str()
    };
    if text.contains('.') {
        text.to_string()
    } else {
        format!("{text}.0")
    }
}

/// Header shared by every XML file this crate writes
pub fn write_xml_header<W: Write>(out: &mut W) -> Result<()> {
    writeln!(out, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
    writeln!(
        out,
        "<!-- generated by butterfly-place v{} -->",
        env!("BUTTERFLY_VERSION")
    )?;
    writeln!(out)?;
    Ok(())
}

/// One `<trip>` element departing and arriving on the record's edge
pub fn format_trip(record: &PlacementRecord) -> String {
    let edge = escape_attr(record.edge.as_str());
    format!(
        r#"<trip id="{}" depart="{:.2}" departPos="{}" from="{}" to="{}" type="car"/>"#,
        record.id,
        PlacementRecord::DEPART,
        record.offset.trunc() as i64,
        edge,
        edge
    )
}

/// Write a complete SUMO routes file with one trip per record
pub fn write_trips<W: Write>(out: &mut W, records: &[PlacementRecord]) -> Result<()> {
    write_xml_header(out)?;
    writeln!(
        out,
        r#"<routes xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:noNamespaceSchemaLocation="http://sumo.dlr.de/xsd/routes_file.xsd">"#
    )?;
    writeln!(out, "\t{CAR_VTYPE}")?;
    writeln!(out)?;
    for record in records {
        writeln!(out, "\t{}", format_trip(record))?;
    }
    writeln!(out, "</routes>")?;
    Ok(())
}

/// A static node position
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// ns-2 mobility block placing node `id` at `pos` from time 0
pub fn format_ns2_node(id: u64, pos: &Position3) -> String {
    let (x, y, z) = (format_float(pos.x), format_float(pos.y), format_float(pos.z));
    format!(
        "$node_({id}) set X_ {x}\n\
         $node_({id}) set Y_ {y}\n\
         $node_({id}) set Z_ {z}\n\
         $ns_ at 0.0 \"$node_({id}) setdest {x} {y} {z}\"\n"
    )
}

/// Write positions as an ns-2 mobility trace, numbering nodes from `first_id`
pub fn write_ns2_mobility<W: Write>(
    out: &mut W,
    positions: &[Position3],
    first_id: u64,
) -> Result<()> {
    for (i, pos) in positions.iter().enumerate() {
        out.write_all(format_ns2_node(first_id + i as u64, pos).as_bytes())?;
    }
    Ok(())
}
