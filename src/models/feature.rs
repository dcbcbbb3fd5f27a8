//! GeoJSON features as returned by the cadastre services.
//!
//! Only the parts the exporters read are typed (geometry); `properties` stay
//! a JSON map because the two services name their attributes differently.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::lot_plan::Jurisdiction;

/// A single coordinate (`[x, y]` or `[x, y, z]`).
pub type Position = Vec<f64>;

/// A closed or open ring of positions.
pub type Ring = Vec<Position>;

/// GeoJSON geometry object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    /// Single point.
    Point {
        /// Coordinates of the point.
        coordinates: Position,
    },
    /// Several points.
    MultiPoint {
        /// Coordinates of the points.
        coordinates: Vec<Position>,
    },
    /// Single line.
    LineString {
        /// Vertices of the line.
        coordinates: Vec<Position>,
    },
    /// Several lines.
    MultiLineString {
        /// Vertices of each line.
        coordinates: Vec<Vec<Position>>,
    },
    /// Outer ring followed by holes.
    Polygon {
        /// Rings of the polygon.
        coordinates: Vec<Ring>,
    },
    /// Several polygons.
    MultiPolygon {
        /// Rings of each polygon.
        coordinates: Vec<Vec<Ring>>,
    },
    /// Heterogeneous geometries.
    GeometryCollection {
        /// Member geometries.
        geometries: Vec<Geometry>,
    },
}

impl Geometry {
    /// Returns the polygons of this geometry, each as outer ring + holes.
    ///
    /// Non-areal geometries yield nothing.
    #[must_use]
    pub fn polygons(&self) -> Vec<&[Ring]> {
        match self {
            Self::Polygon { coordinates } => vec![coordinates.as_slice()],
            Self::MultiPolygon { coordinates } => {
                coordinates.iter().map(Vec::as_slice).collect()
            }
            Self::GeometryCollection { geometries } => {
                geometries.iter().flat_map(Self::polygons).collect()
            }
            _ => Vec::new(),
        }
    }
}

/// A GeoJSON feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    /// Always `"Feature"`.
    #[serde(rename = "type", default = "feature_type")]
    pub kind: String,
    /// Optional feature id assigned by the service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    /// Parcel boundary, if the service returned one.
    #[serde(default)]
    pub geometry: Option<Geometry>,
    /// Service attributes.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub properties: Map<String, Value>,
}

fn feature_type() -> String {
    "Feature".to_string()
}

/// GeoJSON allows `"properties": null`.
fn null_as_empty<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Map<String, Value>>::deserialize(deserializer)?.unwrap_or_default())
}

impl Feature {
    /// Creates a feature from a geometry and properties.
    #[must_use]
    pub fn new(geometry: Option<Geometry>, properties: Map<String, Value>) -> Self {
        Self {
            kind: feature_type(),
            id: None,
            geometry,
            properties,
        }
    }

    /// Text value of a property, if present and non-null.
    #[must_use]
    pub fn property_text(&self, key: &str) -> Option<String> {
        match self.properties.get(key)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    fn first_property(&self, keys: &[&str]) -> Option<String> {
        keys.iter().find_map(|key| self.property_text(key))
    }

    /// Normalized lot: `lot` (QLD) or `lotnumber` (NSW).
    #[must_use]
    pub fn lot(&self) -> Option<String> {
        self.first_property(&["lot", "lotnumber"])
    }

    /// Normalized plan: `plan` (QLD) or `planlabel` (NSW).
    #[must_use]
    pub fn plan(&self) -> Option<String> {
        self.first_property(&["plan", "planlabel"])
    }

    /// NSW section number, blank treated as absent.
    #[must_use]
    pub fn section(&self) -> Option<String> {
        self.property_text("sectionnumber").filter(|s| !s.is_empty())
    }

    /// Registry that produced this feature.
    ///
    /// QLD parcels carry a `lot` attribute; NSW parcels use `lotnumber`.
    #[must_use]
    pub fn jurisdiction(&self) -> Jurisdiction {
        if self.properties.contains_key("lot") {
            Jurisdiction::Qld
        } else {
            Jurisdiction::Nsw
        }
    }

    /// Human-readable parcel label.
    ///
    /// `Lot 3 Plan RP123456` for QLD, `Lot 43 Section 1 DP12345` for NSW.
    #[must_use]
    pub fn display_name(&self) -> String {
        let lot = self.lot().unwrap_or_default();
        let plan = self.plan().unwrap_or_default();
        match self.jurisdiction() {
            Jurisdiction::Qld => format!("Lot {lot} Plan {plan}"),
            Jurisdiction::Nsw => match self.section() {
                Some(section) => format!("Lot {lot} Section {section} {plan}"),
                None => format!("Lot {lot} {plan}"),
            },
        }
    }
}

/// A GeoJSON feature collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    /// Always `"FeatureCollection"`.
    #[serde(rename = "type", default = "collection_type")]
    pub kind: String,
    /// Member features, in service order.
    #[serde(default)]
    pub features: Vec<Feature>,
}

fn collection_type() -> String {
    "FeatureCollection".to_string()
}

impl FeatureCollection {
    /// Wraps features in a collection.
    #[must_use]
    pub fn new(features: Vec<Feature>) -> Self {
        Self {
            kind: collection_type(),
            features,
        }
    }

    /// Number of features.
    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Whether the collection holds no features.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

impl Default for FeatureCollection {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}
