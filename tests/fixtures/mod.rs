//! Shared test fixtures: sample parcels and in-process stand-ins for the
//! cadastre services, the backend and the map widget.
#![allow(dead_code)] // Not every test binary uses every fixture

use std::collections::HashMap;
use std::io;
use std::sync::Mutex;

use chrono::NaiveDate;
use serde_json::{json, Map, Value};

use parcelview::client::{ApiFuture, ClientError, Download, ParcelApi};
use parcelview::export::{self, ExportFormat, ExportRequest};
use parcelview::lookup::{FeatureSource, LookupError, QueryFuture, SearchOutcome};
use parcelview::map::{DisplayOptions, MapRenderer};
use parcelview::models::{Feature, FeatureCollection, Geometry, Jurisdiction, LotPlan};

/// Fixed export date so shapefile bytes are deterministic.
pub fn export_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 14).unwrap()
}

fn props(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => unreachable!("fixture properties must be an object"),
    }
}

/// Unit square with its south-west corner at (x, y), counter-clockwise.
pub fn square(x: f64, y: f64) -> Geometry {
    Geometry::Polygon {
        coordinates: vec![vec![
            vec![x, y],
            vec![x + 0.001, y],
            vec![x + 0.001, y + 0.001],
            vec![x, y + 0.001],
            vec![x, y],
        ]],
    }
}

/// A QLD parcel as the QLD service returns it.
pub fn qld_feature(lot: &str, plan: &str) -> Feature {
    Feature::new(
        Some(square(153.02, -27.47)),
        props(json!({"lot": lot, "plan": plan, "lotplan": format!("{lot}{plan}")})),
    )
}

/// An NSW parcel as the NSW service returns it.
pub fn nsw_feature(lot: &str, section: Option<&str>, plan: &str) -> Feature {
    Feature::new(
        Some(square(151.2, -33.86)),
        props(json!({
            "lotnumber": lot,
            "sectionnumber": section,
            "planlabel": plan,
        })),
    )
}

// ============================================================================
// Cadastre service stand-in
// ============================================================================

/// Feature source answering from a table keyed by identifier.
#[derive(Default)]
pub struct MockSource {
    parcels: HashMap<String, Vec<Feature>>,
    fail: bool,
    pub calls: Mutex<Vec<(Jurisdiction, String)>>,
}

impl MockSource {
    /// Source knowing `3RP123456` (QLD) and `4/DP765432` (NSW).
    pub fn with_parcels() -> Self {
        Self::default()
            .with("3RP123456", vec![qld_feature("3", "RP123456")])
            .with("4/DP765432", vec![nsw_feature("4", None, "DP765432")])
    }

    /// Adds the features returned for `identifier`.
    pub fn with(mut self, identifier: &str, features: Vec<Feature>) -> Self {
        let clause = LotPlan::parse(identifier)
            .and_then(|lp| lp.where_clause())
            .expect("fixture identifier must be valid");
        self.parcels.insert(clause, features);
        self
    }

    /// Source whose every query fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }
}

impl FeatureSource for MockSource {
    fn query<'a>(&'a self, jurisdiction: Jurisdiction, where_clause: &'a str) -> QueryFuture<'a> {
        Box::pin(async move {
            self.calls
                .lock()
                .unwrap()
                .push((jurisdiction, where_clause.to_string()));
            if self.fail {
                return Err(LookupError::Service {
                    jurisdiction,
                    code: 500,
                    message: "Unable to complete operation".to_string(),
                });
            }
            Ok(self.parcels.get(where_clause).cloned().unwrap_or_default())
        })
    }
}

// ============================================================================
// Backend stand-in
// ============================================================================

/// In-process backend: searches a [`MockSource`] and exports with the real
/// encoders, unless told to fail with a status.
pub struct MockApi {
    lookup: parcelview::lookup::ParcelLookup,
    pub search_status: Option<u16>,
    pub download_status: Option<u16>,
    pub downloads: Mutex<Vec<(ExportFormat, ExportRequest)>>,
}

impl MockApi {
    pub fn new(source: MockSource) -> Self {
        Self {
            lookup: parcelview::lookup::ParcelLookup::new(std::sync::Arc::new(source)),
            search_status: None,
            download_status: None,
            downloads: Mutex::new(Vec::new()),
        }
    }

    pub fn with_parcels() -> Self {
        Self::new(MockSource::with_parcels())
    }
}

impl ParcelApi for MockApi {
    fn search<'a>(&'a self, inputs: &'a [String]) -> ApiFuture<'a, SearchOutcome> {
        Box::pin(async move {
            if let Some(status) = self.search_status {
                return Err(ClientError::Status { status, detail: None });
            }
            self.lookup.search(inputs).await.map_err(|e| ClientError::Status {
                status: 502,
                detail: Some(e.to_string()),
            })
        })
    }

    fn download<'a>(&'a self, format: ExportFormat, request: &'a ExportRequest) -> ApiFuture<'a, Download> {
        Box::pin(async move {
            self.downloads.lock().unwrap().push((format, request.clone()));
            if let Some(status) = self.download_status {
                return Err(ClientError::Status {
                    status,
                    detail: Some("Internal Server Error".to_string()),
                });
            }
            let file = export::export(format, request, export_date()).map_err(|e| ClientError::Status {
                status: 500,
                detail: Some(e.to_string()),
            })?;
            Ok(Download {
                file_name: file.file_name,
                bytes: file.bytes,
            })
        })
    }
}

// ============================================================================
// Map widget stand-in
// ============================================================================

/// Records every push it receives.
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    pub pushes: Vec<(FeatureCollection, DisplayOptions)>,
}

impl MapRenderer for RecordingRenderer {
    fn render_features(&mut self, features: &FeatureCollection, options: &DisplayOptions) -> io::Result<()> {
        self.pushes.push((features.clone(), *options));
        Ok(())
    }
}
