//! ESRI Shapefile encoding (polygon `.shp`, `.shx` index, dBase `.dbf`).
//!
//! Each feature with polygon geometry becomes one polygon record and one
//! attribute row. Features without polygon geometry are left out of both
//! tables so shapes and rows stay aligned.

use std::io::Cursor;

use chrono::{Datelike, NaiveDate};
use shapefile::dbase::{FieldName, FieldValue, Record, TableWriterBuilder};
use shapefile::{Point, Polygon, PolygonRing, ShapeWriter, Writer};
use tracing::warn;

use super::ExportError;
use crate::constants::WGS84_PRJ;
use crate::models::{Feature, Position};

/// Attribute columns: name and width of each character field.
const DBF_FIELDS: [(&str, u8); 3] = [("LOT", 10), ("SEC", 10), ("PLAN", 15)];

/// Encoded shapefile components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapefileParts {
    /// Geometry records.
    pub shp: Vec<u8>,
    /// Record offsets into `shp`.
    pub shx: Vec<u8>,
    /// Attribute table.
    pub dbf: Vec<u8>,
    /// Projection definition (WGS 84).
    pub prj: String,
}

/// Encodes features as shapefile components.
///
/// `date` is stamped into the `.dbf` header as its last-update date.
pub fn write_shapefile(features: &[Feature], date: NaiveDate) -> Result<ShapefileParts, ExportError> {
    let mut shp = Cursor::new(Vec::new());
    let mut shx = Cursor::new(Vec::new());
    let mut dbf = Cursor::new(Vec::new());

    let mut table = TableWriterBuilder::new();
    for (name, width) in DBF_FIELDS {
        let field = FieldName::try_from(name)
            .map_err(|e| ExportError::InvalidColumn(format!("{name}: {e:?}")))?;
        table = table.add_character_field(field, width);
    }

    // Both writers finalize their headers on drop.
    let mut writer = Writer::new(
        ShapeWriter::with_shx(&mut shp, &mut shx),
        table.build_with_dest(&mut dbf),
    );
    for (index, feature) in features.iter().enumerate() {
        let Some(polygon) = polygon_of(feature) else {
            warn!(index, "Feature has no polygon geometry, left out of shapefile");
            continue;
        };
        writer.write_shape_and_record(&polygon, &record_of(feature))?;
    }
    drop(writer);

    let mut dbf = dbf.into_inner();
    stamp_update_date(&mut dbf, date);

    Ok(ShapefileParts {
        shp: shp.into_inner(),
        shx: shx.into_inner(),
        dbf,
        prj: WGS84_PRJ.to_string(),
    })
}

/// Polygon for a feature: every ring of every polygon becomes one part.
///
/// Outer rings are wound clockwise and holes counter-clockwise (GeoJSON uses
/// the opposite convention).
fn polygon_of(feature: &Feature) -> Option<Polygon> {
    let geometry = feature.geometry.as_ref()?;
    let mut rings = Vec::new();
    for polygon in geometry.polygons() {
        for (i, ring) in polygon.iter().enumerate() {
            let Some(mut points) = closed_ring(ring) else {
                continue;
            };
            let is_outer = i == 0;
            if (signed_area(&points) < 0.0) != is_outer {
                points.reverse();
            }
            rings.push(if is_outer {
                PolygonRing::Outer(points)
            } else {
                PolygonRing::Inner(points)
            });
        }
    }
    (!rings.is_empty()).then(|| Polygon::with_rings(rings))
}

/// Drops malformed positions and repeats the first vertex if needed.
///
/// Rings with fewer than three distinct vertices are discarded.
fn closed_ring(ring: &[Position]) -> Option<Vec<Point>> {
    let mut points: Vec<Point> = ring
        .iter()
        .filter(|p| p.len() >= 2)
        .map(|p| Point::new(p[0], p[1]))
        .collect();
    let first = *points.first()?;
    if points.last() != Some(&first) {
        points.push(first);
    }
    (points.len() >= 4).then_some(points)
}

/// Shoelace area; positive for counter-clockwise rings.
fn signed_area(ring: &[Point]) -> f64 {
    ring.windows(2)
        .map(|w| w[0].x * w[1].y - w[1].x * w[0].y)
        .sum::<f64>()
        / 2.0
}

/// Attribute row: lot, section and plan, cut to their column widths.
fn record_of(feature: &Feature) -> Record {
    let values = [feature.lot(), feature.section(), feature.plan()];
    let mut record = Record::default();
    for ((name, width), value) in DBF_FIELDS.into_iter().zip(values) {
        let value = value.unwrap_or_default();
        let text = truncate_to_bytes(&value, usize::from(width)).to_string();
        record.insert(name.to_string(), FieldValue::Character(Some(text)));
    }
    record
}

/// Overwrites the YY MM DD bytes of a dBase header.
fn stamp_update_date(dbf: &mut [u8], date: NaiveDate) {
    let stamp = [
        u8::try_from(date.year() - 1900).unwrap_or(0),
        u8::try_from(date.month()).unwrap_or(0),
        u8::try_from(date.day()).unwrap_or(0),
    ];
    if let Some(header) = dbf.get_mut(1..4) {
        header.copy_from_slice(&stamp);
    }
}

/// Longest prefix of `value` that fits in `max` bytes without splitting a character.
fn truncate_to_bytes(value: &str, max: usize) -> &str {
    if value.len() <= max {
        return value;
    }
    let mut end = max;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    &value[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Geometry;
    use serde_json::{json, Map, Value};

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 14).unwrap()
    }

    fn be_i32(buf: &[u8], at: usize) -> i32 {
        i32::from_be_bytes(buf[at..at + 4].try_into().unwrap())
    }

    fn le_i32(buf: &[u8], at: usize) -> i32 {
        i32::from_le_bytes(buf[at..at + 4].try_into().unwrap())
    }

    fn le_f64(buf: &[u8], at: usize) -> f64 {
        f64::from_le_bytes(buf[at..at + 8].try_into().unwrap())
    }

    fn parcel(lot: &str, plan: &str, geometry: Option<Geometry>) -> Feature {
        let Value::Object(map) = json!({"lot": lot, "plan": plan}) else { unreachable!() };
        Feature::new(geometry, map)
    }

    /// Counter-clockwise unit square, GeoJSON style.
    fn ccw_square() -> Geometry {
        Geometry::Polygon {
            coordinates: vec![vec![
                vec![0.0, 0.0],
                vec![1.0, 0.0],
                vec![1.0, 1.0],
                vec![0.0, 1.0],
                vec![0.0, 0.0],
            ]],
        }
    }

    #[test]
    fn test_empty_feature_list_encodes() {
        let parts = write_shapefile(&[], date()).unwrap();
        assert!(parts.prj.starts_with("GEOGCS[\"WGS 84\""));
    }

    #[test]
    fn test_polygon_file_layout() {
        let parts = write_shapefile(&[parcel("3", "RP123456", Some(ccw_square()))], date()).unwrap();
        assert_eq!(be_i32(&parts.shp, 0), 9994);
        assert_eq!(be_i32(&parts.shp, 24) as usize * 2, parts.shp.len());
        assert_eq!(le_i32(&parts.shp, 32), 5);
        // first record: number 1, polygon shape
        assert_eq!(be_i32(&parts.shp, 100), 1);
        assert_eq!(le_i32(&parts.shp, 108), 5);
        assert!((le_f64(&parts.shp, 36 + 16) - 1.0).abs() < f64::EPSILON);

        assert_eq!(parts.shx.len(), 108);
        assert_eq!(be_i32(&parts.shx, 100), 50);
    }

    #[test]
    fn test_outer_ring_wound_clockwise() {
        let parts = write_shapefile(&[parcel("3", "RP1", Some(ccw_square()))], date()).unwrap();
        // points start after record header(8) + type(4) + bbox(32) + counts(8) + parts(4)
        let points_at = 100 + 8 + 4 + 32 + 8 + 4;
        let ring: Vec<Point> = (0..5)
            .map(|i| Point::new(le_f64(&parts.shp, points_at + i * 16), le_f64(&parts.shp, points_at + i * 16 + 8)))
            .collect();
        assert!(signed_area(&ring) < 0.0);
    }

    #[test]
    fn test_features_without_polygons_are_left_out() {
        let point = Geometry::Point { coordinates: vec![153.0, -27.0] };
        let features = [
            parcel("1", "RP1", None),
            parcel("2", "RP2", Some(ccw_square())),
            parcel("3", "RP3", Some(point)),
        ];
        let parts = write_shapefile(&features, date()).unwrap();
        assert_eq!(parts.shx.len(), 108);
        assert_eq!(u32::from_le_bytes(parts.dbf[4..8].try_into().unwrap()), 1);

        let body = String::from_utf8_lossy(&parts.dbf);
        assert!(body.contains("RP2"));
        assert!(!body.contains("RP1"));
        assert!(!body.contains("RP3"));
    }

    #[test]
    fn test_dbf_header_and_columns() {
        let parts = write_shapefile(&[parcel("3", "RP123456", Some(ccw_square()))], date()).unwrap();
        let dbf = &parts.dbf;
        assert_eq!(&dbf[1..4], &[126, 3, 14]);
        assert_eq!(u32::from_le_bytes(dbf[4..8].try_into().unwrap()), 1);
        // 1 deletion flag + 10 + 10 + 15
        assert_eq!(u16::from_le_bytes([dbf[10], dbf[11]]), 36);
        assert_eq!(&dbf[32..35], b"LOT");
        assert_eq!(dbf[32 + 11], b'C');
        assert_eq!(dbf[32 + 16], 10);
        assert_eq!(&dbf[64..67], b"SEC");
        assert_eq!(&dbf[96..100], b"PLAN");
        assert_eq!(dbf[96 + 16], 15);
        assert!(String::from_utf8_lossy(dbf).contains("RP123456"));
    }

    #[test]
    fn test_nsw_attributes() {
        let Value::Object(map) = json!({"lotnumber": "43", "sectionnumber": "1", "planlabel": "DP12345"}) else {
            unreachable!()
        };
        let record = record_of(&Feature::new(Some(ccw_square()), map));
        assert_eq!(record.get("LOT"), Some(&FieldValue::Character(Some("43".to_string()))));
        assert_eq!(record.get("SEC"), Some(&FieldValue::Character(Some("1".to_string()))));
        assert_eq!(record.get("PLAN"), Some(&FieldValue::Character(Some("DP12345".to_string()))));
    }

    #[test]
    fn test_long_values_cut_to_column_width() {
        let record = record_of(&parcel("3", "SP1234567890123456789", None));
        assert_eq!(
            record.get("PLAN"),
            Some(&FieldValue::Character(Some("SP1234567890123".to_string())))
        );
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate_to_bytes("abc", 10), "abc");
        assert_eq!(truncate_to_bytes("abcdef", 4), "abcd");
        assert_eq!(truncate_to_bytes("aé", 2), "a");
    }

    #[test]
    fn test_hole_kept_counter_clockwise() {
        let geometry = Geometry::Polygon {
            coordinates: vec![
                vec![vec![0.0, 0.0], vec![4.0, 0.0], vec![4.0, 4.0], vec![0.0, 4.0], vec![0.0, 0.0]],
                // clockwise hole in GeoJSON
                vec![vec![1.0, 1.0], vec![1.0, 2.0], vec![2.0, 2.0], vec![2.0, 1.0], vec![1.0, 1.0]],
            ],
        };
        let polygon = polygon_of(&Feature::new(Some(geometry), Map::new())).unwrap();
        let rings = polygon.rings();
        assert_eq!(rings.len(), 2);
        assert!(matches!(rings[0], PolygonRing::Outer(_)));
        assert!(signed_area(rings[0].points()) < 0.0);
        assert!(matches!(rings[1], PolygonRing::Inner(_)));
        assert!(signed_area(rings[1].points()) > 0.0);
    }

    #[test]
    fn test_degenerate_rings_dropped() {
        let geometry = Geometry::Polygon {
            coordinates: vec![vec![vec![0.0, 0.0], vec![1.0, 1.0]]],
        };
        assert!(polygon_of(&Feature::new(Some(geometry), Map::new())).is_none());
    }
}
