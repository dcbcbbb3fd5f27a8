//! ArcGIS REST `query` endpoints of the state cadastre services.

use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use super::{FeatureSource, LookupError, QueryFuture};
use crate::config::ServiceConfig;
use crate::models::{Feature, Jurisdiction};

/// Body of an ArcGIS `f=geoJSON` query response.
///
/// The services report query failures with HTTP 200 and an `error` object
/// instead of `features`.
#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    features: Vec<Feature>,
    #[serde(default)]
    error: Option<ServiceErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ServiceErrorBody {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

/// Live lookup against the QLD and NSW ArcGIS services.
#[derive(Debug, Clone)]
pub struct ArcGisSource {
    client: reqwest::Client,
    qld_url: String,
    nsw_url: String,
}

impl ArcGisSource {
    /// Builds a source using the configured endpoints and timeout.
    pub fn new(config: &ServiceConfig) -> Result<Self, LookupError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("parcelview/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            qld_url: config.qld_url.clone(),
            nsw_url: config.nsw_url.clone(),
        })
    }

    fn url_for(&self, jurisdiction: Jurisdiction) -> &str {
        match jurisdiction {
            Jurisdiction::Qld => &self.qld_url,
            Jurisdiction::Nsw => &self.nsw_url,
        }
    }

    async fn fetch(&self, jurisdiction: Jurisdiction, where_clause: &str) -> Result<Vec<Feature>, LookupError> {
        let url = self.url_for(jurisdiction);
        debug!(%jurisdiction, where_clause, "Querying cadastre service");

        let body: QueryResponse = self
            .client
            .get(url)
            .query(&[
                ("where", where_clause),
                ("outFields", "*"),
                ("outSR", "4326"),
                ("f", "geoJSON"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(error) = body.error {
            return Err(LookupError::Service {
                jurisdiction,
                code: error.code,
                message: error.message,
            });
        }

        Ok(body.features)
    }
}

impl FeatureSource for ArcGisSource {
    fn query<'a>(&'a self, jurisdiction: Jurisdiction, where_clause: &'a str) -> QueryFuture<'a> {
        Box::pin(self.fetch(jurisdiction, where_clause))
    }
}
