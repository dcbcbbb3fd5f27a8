//! Parcel lookup: routes lot/plan identifiers to the state cadastre services.
//!
//! Identifiers are processed in input order. Per-identifier problems (an
//! unparseable code, or a code the service has no parcel for) are collected
//! in [`SearchOutcome::failed`] and do not stop the batch. A transport or
//! service failure aborts the whole search with a single [`LookupError`].

pub mod arcgis;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn, Instrument};
use uuid::Uuid;

use crate::models::{Feature, FeatureCollection, IdentifierError, Jurisdiction, LotPlan};

pub use arcgis::ArcGisSource;

/// Boxed future returned by [`FeatureSource::query`].
pub type QueryFuture<'a> = Pin<Box<dyn Future<Output = Result<Vec<Feature>, LookupError>> + Send + 'a>>;

/// Errors that abort a whole search.
#[derive(Debug, Error)]
pub enum LookupError {
    /// Transport failure or non-success status from a service.
    #[error("parcel service request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The service answered with an ArcGIS error object.
    #[error("{jurisdiction} parcel service error {code}: {message}")]
    Service {
        /// Service that failed.
        jurisdiction: Jurisdiction,
        /// ArcGIS error code.
        code: i64,
        /// ArcGIS error message.
        message: String,
    },
}

/// A backend that can answer cadastre `where` queries.
///
/// [`ArcGisSource`] is the live implementation; tests substitute an
/// in-memory one.
pub trait FeatureSource: Send + Sync {
    /// Returns the features matching `where_clause` in the given registry.
    fn query<'a>(&'a self, jurisdiction: Jurisdiction, where_clause: &'a str) -> QueryFuture<'a>;
}

/// An identifier that produced no feature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedIdentifier {
    /// Identifier as the user typed it.
    pub input: String,
    /// Why it was skipped.
    pub reason: String,
}

/// Result of a search batch.
///
/// `features`, `regions` and `identifiers` are parallel: entry `i` of each
/// describes the same parcel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchOutcome {
    /// Matched parcels, one per successful identifier, in input order.
    pub features: Vec<Feature>,
    /// Registry of each feature.
    pub regions: Vec<Jurisdiction>,
    /// Normalized identifier each feature was found for.
    pub identifiers: Vec<String>,
    /// Identifiers skipped, with reasons.
    pub failed: Vec<FailedIdentifier>,
}

impl SearchOutcome {
    /// The matched features as a GeoJSON collection.
    #[must_use]
    pub fn collection(&self) -> FeatureCollection {
        FeatureCollection::new(self.features.clone())
    }
}

/// Lookup client shared by the web handlers and the CLI.
#[derive(Clone)]
pub struct ParcelLookup {
    source: Arc<dyn FeatureSource>,
}

impl ParcelLookup {
    /// Creates a lookup client over a feature source.
    pub fn new(source: Arc<dyn FeatureSource>) -> Self {
        Self { source }
    }

    /// Looks up every identifier in order.
    ///
    /// Each identifier contributes at most one feature, so the outcome never
    /// holds more features than there were inputs.
    pub async fn search(&self, inputs: &[String]) -> Result<SearchOutcome, LookupError> {
        let search_id = Uuid::new_v4();
        let span = tracing::info_span!("search", %search_id, inputs = inputs.len());
        self.search_inner(inputs).instrument(span).await
    }

    async fn search_inner(&self, inputs: &[String]) -> Result<SearchOutcome, LookupError> {
        let mut outcome = SearchOutcome::default();

        for raw in inputs {
            let (lot_plan, where_clause) = match prepare(raw) {
                Ok(prepared) => prepared,
                Err(e) => {
                    debug!(input = %raw, error = %e, "Skipping identifier");
                    outcome.failed.push(FailedIdentifier {
                        input: raw.clone(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            let mut features = self
                .source
                .query(lot_plan.jurisdiction, &where_clause)
                .await?
                .into_iter();

            let Some(feature) = features.next() else {
                debug!(identifier = %lot_plan, "No parcel found");
                outcome.failed.push(FailedIdentifier {
                    input: raw.clone(),
                    reason: format!("no {} parcel found for {lot_plan}", lot_plan.jurisdiction),
                });
                continue;
            };

            let extra = features.count();
            if extra > 0 {
                warn!(identifier = %lot_plan, extra, "Service returned more than one parcel; keeping the first");
            }

            outcome.features.push(feature);
            outcome.regions.push(lot_plan.jurisdiction);
            outcome.identifiers.push(lot_plan.to_string());
        }

        info!(
            found = outcome.features.len(),
            failed = outcome.failed.len(),
            "Search complete"
        );
        Ok(outcome)
    }
}

/// Parses an identifier and builds its service query.
fn prepare(raw: &str) -> Result<(LotPlan, String), IdentifierError> {
    let lot_plan = LotPlan::parse(raw)?;
    let where_clause = lot_plan.where_clause()?;
    Ok((lot_plan, where_clause))
}
