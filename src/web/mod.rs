//! Web API module for ParcelView.
//!
//! This module provides the REST API behind the parcel search frontend: it
//! proxies lot/plan lookups to the state cadastre services and encodes
//! selected parcels as KML or zipped Shapefile downloads.
//!
//! # Endpoints
//!
//! - `GET /ping` - Liveness probe
//! - `GET /health` - Health check with version
//! - `GET /client-config` - Startup settings for the frontend
//! - `POST /search` - Look up lot/plan identifiers
//! - `POST /download/kml` - Export features as KML
//! - `POST /download/shp` - Export features as a zipped Shapefile
//! - anything else - Embedded frontend with SPA fallback

pub mod static_files;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::Config;
use crate::export::{self, ExportFormat, ExportRequest};
use crate::lookup::{ArcGisSource, FeatureSource, ParcelLookup, SearchOutcome};

// ============================================================================
// Application State
// ============================================================================

/// Shared application state for the web API.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    config: Arc<Config>,
    /// Lookup client over the cadastre services
    lookup: ParcelLookup,
}

impl AppState {
    /// Creates application state backed by the live ArcGIS services.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let source = ArcGisSource::new(&config.services)?;
        Ok(Self::with_source(config, Arc::new(source)))
    }

    /// Creates application state over an arbitrary feature source.
    #[must_use]
    pub fn with_source(config: Config, source: Arc<dyn FeatureSource>) -> Self {
        Self {
            config: Arc::new(config),
            lookup: ParcelLookup::new(source),
        }
    }

    /// Returns the configuration the server was started with.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Liveness response.
#[derive(Debug, Serialize)]
pub struct PingResponse {
    /// Always true.
    pub pong: bool,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Crate version.
    pub version: String,
}

/// Frontend startup settings.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfigResponse {
    /// Base URL of the API; empty for same origin.
    pub api_base_url: String,
    /// Map widget access token.
    pub map_token: Option<String>,
}

/// Search request body.
///
/// `query` is accepted as an older name for `inputs`.
#[derive(Debug, Default, Deserialize)]
pub struct SearchRequest {
    /// Identifiers to look up.
    #[serde(default)]
    pub inputs: Option<Vec<String>>,
    /// Legacy alias for `inputs`.
    #[serde(default)]
    pub query: Option<Vec<String>>,
}

impl SearchRequest {
    /// Trimmed, non-empty identifiers, preferring `inputs` over `query`.
    #[must_use]
    pub fn identifiers(&self) -> Vec<String> {
        self.inputs
            .as_ref()
            .or(self.query.as_ref())
            .map(|items| {
                items
                    .iter()
                    .map(|s| s.trim())
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// API error response.
#[derive(Debug, Serialize)]
pub struct ApiError {
    /// Error message.
    pub error: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    fn with_details(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: Some(details.into()),
        }
    }
}

type ApiResult<T> = Result<T, (StatusCode, Json<ApiError>)>;

// ============================================================================
// Route Handlers
// ============================================================================

/// GET /ping - Liveness probe.
async fn ping() -> Json<PingResponse> {
    Json(PingResponse { pong: true })
}

/// GET /health - Health check endpoint.
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /client-config - Settings the frontend reads once at startup.
async fn client_config(State(state): State<AppState>) -> Json<ClientConfigResponse> {
    Json(ClientConfigResponse {
        api_base_url: state.config.client.api_base_url.clone(),
        map_token: state.config.client.map_token.clone(),
    })
}

/// POST /search - Look up parcels for each identifier.
async fn search(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> ApiResult<Json<SearchOutcome>> {
    let identifiers = request.identifiers();
    if identifiers.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ApiError::new("No inputs provided")),
        ));
    }

    let outcome = state.lookup.search(&identifiers).await.map_err(|e| {
        warn!(error = %e, "Search failed");
        (
            StatusCode::BAD_GATEWAY,
            Json(ApiError::with_details("Parcel lookup failed", e.to_string())),
        )
    })?;

    Ok(Json(outcome))
}

/// POST /download/kml - Export features as a KML document.
async fn download_kml(Json(request): Json<ExportRequest>) -> ApiResult<Response> {
    download(ExportFormat::Kml, &request)
}

/// POST /download/shp - Export features as a zipped Shapefile.
async fn download_shp(Json(request): Json<ExportRequest>) -> ApiResult<Response> {
    download(ExportFormat::Shapefile, &request)
}

fn download(format: ExportFormat, request: &ExportRequest) -> ApiResult<Response> {
    let today = chrono::Local::now().date_naive();
    let file = export::export(format, request, today).map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiError::with_details("Export failed", e.to_string())),
        )
    })?;

    info!(
        format = format.endpoint(),
        features = request.features.len(),
        bytes = file.bytes.len(),
        file = %file.file_name,
        "Export complete"
    );

    let disposition = HeaderValue::from_str(&file.content_disposition()).map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            Json(ApiError::with_details(
                "Invalid file name",
                file.file_name.clone(),
            )),
        )
    })?;

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(file.content_type)),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        file.bytes,
    )
        .into_response())
}

// ============================================================================
// Router Setup
// ============================================================================

/// Builds the CORS layer.
///
/// Only the configured frontend origin is allowed; with none configured any
/// origin is.
fn cors_layer(config: &Config) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    match config.server.frontend_origin.as_deref() {
        Some(origin) => match HeaderValue::from_str(origin) {
            Ok(value) => cors.allow_origin(value),
            Err(_) => {
                warn!(origin, "Ignoring unusable frontend origin; allowing any origin");
                cors.allow_origin(Any)
            }
        },
        None => cors.allow_origin(Any),
    }
}

/// Creates the API router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    Router::new()
        // Health checks
        .route("/ping", get(ping))
        .route("/health", get(health_check))
        .route("/client-config", get(client_config))
        // Lookup
        .route("/search", post(search))
        // Downloads
        .route("/download/kml", post(download_kml))
        .route("/download/shp", post(download_shp))
        // Frontend bundle
        .fallback(static_files::serve_static)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Runs the web server.
///
/// # Errors
///
/// Returns an error if the lookup client cannot be built or the server
/// fails to start.
pub async fn run_server(config: Config, addr: SocketAddr) -> anyhow::Result<()> {
    let state = AppState::new(config)?;
    let app = create_router(state);

    if !static_files::has_embedded_assets() {
        warn!("No frontend bundle embedded; only the API is served");
    }

    info!("Starting ParcelView server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifiers_prefer_inputs() {
        let request = SearchRequest {
            inputs: Some(vec![" 3RP123456 ".to_string(), String::new()]),
            query: Some(vec!["ignored".to_string()]),
        };
        assert_eq!(request.identifiers(), vec!["3RP123456"]);
    }

    #[test]
    fn test_identifiers_legacy_query() {
        let request: SearchRequest = serde_json::from_str(r#"{"query": ["4/DP765432"]}"#).unwrap();
        assert_eq!(request.identifiers(), vec!["4/DP765432"]);
    }

    #[test]
    fn test_identifiers_missing() {
        let request: SearchRequest = serde_json::from_str("{}").unwrap();
        assert!(request.identifiers().is_empty());
    }
}
