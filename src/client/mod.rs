//! HTTP client for the ParcelView backend.
//!
//! [`ParcelApi`] is what the query panel talks to. [`BackendClient`] is the
//! reqwest-backed implementation; tests substitute an in-process one.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use reqwest::header::CONTENT_DISPOSITION;
use thiserror::Error;
use tracing::debug;

use crate::constants::{DEFAULT_KML_FILE_NAME, DEFAULT_SHAPEFILE_BASE};
use crate::export::{ExportFormat, ExportRequest};
use crate::lookup::SearchOutcome;

/// Boxed future returned by [`ParcelApi`] methods.
pub type ApiFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ClientError>> + Send + 'a>>;

/// Errors talking to the backend.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Connection, timeout or body decoding failure.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The backend answered with a non-success status.
    #[error("server responded with status {status}{}", detail_suffix(.detail))]
    Status {
        /// HTTP status code.
        status: u16,
        /// Error text from the response body, if any.
        detail: Option<String>,
    },
}

fn detail_suffix(detail: &Option<String>) -> String {
    detail.as_ref().map(|d| format!(": {d}")).unwrap_or_default()
}

impl ClientError {
    /// HTTP status of a [`ClientError::Status`] error.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Http(_) => None,
        }
    }
}

/// A downloaded export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    /// File name offered by the server.
    pub file_name: String,
    /// File body.
    pub bytes: Vec<u8>,
}

/// Backend operations used by the query panel.
pub trait ParcelApi: Send + Sync {
    /// `POST /search`.
    fn search<'a>(&'a self, inputs: &'a [String]) -> ApiFuture<'a, SearchOutcome>;

    /// `POST /download/{kml,shp}`.
    fn download<'a>(&'a self, format: ExportFormat, request: &'a ExportRequest) -> ApiFuture<'a, Download>;
}

/// reqwest client bound to one backend base URL.
#[derive(Debug, Clone)]
pub struct BackendClient {
    client: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    /// Creates a client for `base_url` (e.g. `http://127.0.0.1:8000`).
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("parcelview/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Base URL requests are sent to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    async fn post_search(&self, inputs: &[String]) -> Result<SearchOutcome, ClientError> {
        let response = self
            .client
            .post(self.url("search"))
            .json(&serde_json::json!({ "inputs": inputs }))
            .send()
            .await?;
        let response = check_status(response).await?;
        Ok(response.json().await?)
    }

    async fn post_download(&self, format: ExportFormat, request: &ExportRequest) -> Result<Download, ClientError> {
        let url = self.url(&format!("download/{}", format.endpoint()));
        debug!(%url, features = request.features.len(), "Requesting export");

        let response = self.client.post(url).json(request).send().await?;
        let response = check_status(response).await?;

        let file_name = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(attachment_file_name)
            .unwrap_or_else(|| default_file_name(format));
        let bytes = response.bytes().await?.to_vec();

        Ok(Download { file_name, bytes })
    }
}

impl ParcelApi for BackendClient {
    fn search<'a>(&'a self, inputs: &'a [String]) -> ApiFuture<'a, SearchOutcome> {
        Box::pin(self.post_search(inputs))
    }

    fn download<'a>(&'a self, format: ExportFormat, request: &'a ExportRequest) -> ApiFuture<'a, Download> {
        Box::pin(self.post_download(format, request))
    }
}

/// Turns a non-success response into [`ClientError::Status`], keeping the
/// `error` text of a JSON error body.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let detail = response
        .json::<serde_json::Value>()
        .await
        .ok()
        .and_then(|body| body.get("error").and_then(|e| e.as_str()).map(str::to_string));

    Err(ClientError::Status {
        status: status.as_u16(),
        detail,
    })
}

fn default_file_name(format: ExportFormat) -> String {
    match format {
        ExportFormat::Kml => DEFAULT_KML_FILE_NAME.to_string(),
        ExportFormat::Shapefile => format!("{DEFAULT_SHAPEFILE_BASE}.zip"),
    }
}

/// Extracts `filename` from an `attachment` disposition header.
fn attachment_file_name(header: &str) -> Option<String> {
    header.split(';').map(str::trim).find_map(|part| {
        let value = part.strip_prefix("filename=")?;
        let value = value.trim_matches('"');
        let name = value.rsplit(['/', '\\']).next().unwrap_or(value);
        (!name.is_empty()).then(|| name.to_string())
    })
}
