//! KML document generation.
//!
//! Every feature becomes a `Placemark` referencing one shared `#parcel`
//! style, grouped under a single `Folder`. Placemarks carry a pop-up
//! table of the service attributes.

use std::fmt::Write;

use serde_json::Value;

use crate::models::{Feature, Position, RgbColor, Ring, Style};

/// Renders features as a KML document.
///
/// The output is deterministic: features and their attributes are written
/// in input order, and an empty slice yields a valid document with an
/// empty folder.
#[must_use]
pub fn export_kml(features: &[Feature], folder_name: &str, style: &Style) -> String {
    let fill = RgbColor::from_hex_or_white(&style.fill).to_kml(style.clamped_opacity());
    let outline = RgbColor::from_hex_or_white(&style.outline).to_kml(1.0);
    let folder_name = escape_xml(folder_name);

    let mut out = String::new();
    let _ = writeln!(out, r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    let _ = writeln!(out, r#"<kml xmlns="http://www.opengis.net/kml/2.2">"#);
    let _ = writeln!(out, "  <Document>");
    let _ = writeln!(out, "    <name>{folder_name}</name>");
    let _ = writeln!(out, r#"    <Style id="parcel">"#);
    let _ = writeln!(
        out,
        "      <LineStyle><color>{outline}</color><width>{}</width></LineStyle>",
        style.clamped_weight()
    );
    let _ = writeln!(out, "      <PolyStyle><color>{fill}</color></PolyStyle>");
    let _ = writeln!(out, "    </Style>");
    let _ = writeln!(out, "    <Folder>");
    let _ = writeln!(out, "      <name>{folder_name}</name>");

    for feature in features {
        write_placemark(&mut out, feature);
    }

    let _ = writeln!(out, "    </Folder>");
    let _ = writeln!(out, "  </Document>");
    let _ = writeln!(out, "</kml>");
    out
}

fn write_placemark(out: &mut String, feature: &Feature) {
    let _ = writeln!(out, "      <Placemark>");
    let _ = writeln!(out, "        <name>{}</name>", escape_xml(&feature.display_name()));
    let _ = writeln!(out, "        <styleUrl>#parcel</styleUrl>");
    let _ = writeln!(
        out,
        "        <description><![CDATA[{}]]></description>",
        describe(feature)
    );

    let polygons = feature
        .geometry
        .as_ref()
        .map(|g| g.polygons())
        .unwrap_or_default();
    let multi = polygons.len() > 1;

    if multi {
        let _ = writeln!(out, "        <MultiGeometry>");
    }
    for rings in polygons {
        write_polygon(out, rings);
    }
    if multi {
        let _ = writeln!(out, "        </MultiGeometry>");
    }

    let _ = writeln!(out, "      </Placemark>");
}

fn write_polygon(out: &mut String, rings: &[Ring]) {
    let mut rings = rings.iter().filter(|r| !r.is_empty());
    let Some(outer) = rings.next() else {
        return;
    };

    let _ = writeln!(out, "          <Polygon>");
    let _ = writeln!(out, "            <outerBoundaryIs><LinearRing>");
    write_ring(out, outer);
    let _ = writeln!(out, "            </LinearRing></outerBoundaryIs>");
    for hole in rings {
        let _ = writeln!(out, "            <innerBoundaryIs><LinearRing>");
        write_ring(out, hole);
        let _ = writeln!(out, "            </LinearRing></innerBoundaryIs>");
    }
    let _ = writeln!(out, "          </Polygon>");
}

/// Writes a ring's coordinates, repeating the first vertex if the ring is open.
fn write_ring(out: &mut String, ring: &[Position]) {
    let _ = writeln!(out, "              <coordinates>");
    let points: Vec<(f64, f64)> = ring
        .iter()
        .filter(|p| p.len() >= 2)
        .map(|p| (p[0], p[1]))
        .collect();
    for (x, y) in &points {
        let _ = writeln!(out, "                {x},{y},0");
    }
    if let (Some(first), Some(last)) = (points.first(), points.last()) {
        if first != last {
            let _ = writeln!(out, "                {},{},0", first.0, first.1);
        }
    }
    let _ = writeln!(out, "              </coordinates>");
}

/// HTML table of the non-empty attributes, shown in the placemark balloon.
fn describe(feature: &Feature) -> String {
    let mut table = String::from("<table>");
    for (key, value) in &feature.properties {
        let text = match value {
            Value::Null => continue,
            Value::String(s) if s.is_empty() => continue,
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        let _ = write!(
            table,
            "<tr><th>{}</th><td>{}</td></tr>",
            escape_xml(key),
            escape_xml(&text)
        );
    }
    table.push_str("</table>");
    table
}

/// Escapes text for XML element content and attribute values.
pub(crate) fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
