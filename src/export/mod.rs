//! Export of parcel features to downloadable files.
//!
//! Two formats are supported: a KML document (styled placemarks in a named
//! folder) and a zipped ESRI Shapefile component set. Both are pure
//! transforms of the request; only the shapefile's `.dbf` header carries
//! the export date.

pub mod archive;
pub mod kml;
pub mod shp;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{DEFAULT_FOLDER_NAME, DEFAULT_KML_FILE_NAME, DEFAULT_SHAPEFILE_BASE};
use crate::models::{Feature, Style};

pub use archive::zip_shapefile;
pub use kml::export_kml;
pub use shp::{write_shapefile, ShapefileParts};

/// MIME type of KML downloads.
pub const KML_CONTENT_TYPE: &str = "application/vnd.google-earth.kml+xml";

/// MIME type of zipped shapefile downloads.
pub const ZIP_CONTENT_TYPE: &str = "application/zip";

/// Errors raised while encoding an export.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Zip packaging failed.
    #[error("failed to build zip archive: {0}")]
    Zip(#[from] zip::result::ZipError),
    /// Writing into the archive failed.
    #[error("failed to write archive entry: {0}")]
    Io(#[from] std::io::Error),
    /// Shapefile encoding failed.
    #[error("failed to encode shapefile: {0}")]
    Shapefile(#[from] shapefile::Error),
    /// An attribute column could not be declared.
    #[error("invalid attribute column: {0}")]
    InvalidColumn(String),
    /// A component name would escape the archive root.
    #[error("invalid archive entry name: {0}")]
    InvalidEntryName(String),
}

/// Download format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// KML document.
    Kml,
    /// Zipped shapefile.
    #[serde(rename = "shp")]
    #[value(name = "shp")]
    Shapefile,
}

impl ExportFormat {
    /// Path segment of the download endpoint (`kml` / `shp`).
    #[must_use]
    pub const fn endpoint(self) -> &'static str {
        match self {
            Self::Kml => "kml",
            Self::Shapefile => "shp",
        }
    }
}

/// Body of a download request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRequest {
    /// Features to export, in output order.
    pub features: Vec<Feature>,
    /// KML folder label, or shapefile component base name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_name: Option<String>,
    /// Download file name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    /// KML styling; ignored for shapefiles.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<Style>,
}

/// An encoded download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFile {
    /// Name offered to the browser.
    pub file_name: String,
    /// MIME type.
    pub content_type: &'static str,
    /// File body.
    pub bytes: Vec<u8>,
}

impl ExportedFile {
    /// `Content-Disposition` header value for this file.
    #[must_use]
    pub fn content_disposition(&self) -> String {
        format!("attachment; filename=\"{}\"", self.file_name.replace('"', "_"))
    }
}

/// Encodes a request in the given format.
///
/// `date` is only used by the shapefile `.dbf` header.
pub fn export(format: ExportFormat, request: &ExportRequest, date: NaiveDate) -> Result<ExportedFile, ExportError> {
    match format {
        ExportFormat::Kml => {
            let folder = non_blank(request.folder_name.as_deref()).unwrap_or(DEFAULT_FOLDER_NAME);
            let style = request.style.clone().unwrap_or_default();
            let document = export_kml(&request.features, folder, &style);
            Ok(ExportedFile {
                file_name: kml_file_name(request.file_name.as_deref()),
                content_type: KML_CONTENT_TYPE,
                bytes: document.into_bytes(),
            })
        }
        ExportFormat::Shapefile => {
            let base = shapefile_base_name(request.folder_name.as_deref());
            let parts = write_shapefile(&request.features, date)?;
            Ok(ExportedFile {
                file_name: zip_file_name(request.file_name.as_deref(), &base),
                content_type: ZIP_CONTENT_TYPE,
                bytes: zip_shapefile(&base, &parts)?,
            })
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Replaces path separators so a user-supplied name stays a single file name.
fn sanitize(name: &str) -> String {
    name.replace(['/', '\\'], "_")
}

/// KML download name: defaults to `parcels.kml`, `.kml` appended if missing.
///
/// ```
/// use parcelview::export::kml_file_name;
///
/// assert_eq!(kml_file_name(None), "parcels.kml");
/// assert_eq!(kml_file_name(Some("lots")), "lots.kml");
/// assert_eq!(kml_file_name(Some("a/b.KML")), "a_b.KML");
/// ```
#[must_use]
pub fn kml_file_name(requested: Option<&str>) -> String {
    let name = sanitize(non_blank(requested).unwrap_or(DEFAULT_KML_FILE_NAME));
    if name.to_lowercase().ends_with(".kml") {
        name
    } else {
        format!("{name}.kml")
    }
}

/// Shapefile component base name: path separators and spaces become `_`,
/// leading dots are dropped.
#[must_use]
pub fn shapefile_base_name(requested: Option<&str>) -> String {
    let base = sanitize(non_blank(requested).unwrap_or(DEFAULT_SHAPEFILE_BASE)).replace(' ', "_");
    let base = base.trim_start_matches('.');
    if base.chars().all(|c| c == '_') {
        DEFAULT_SHAPEFILE_BASE.to_string()
    } else {
        base.to_string()
    }
}

/// Archive download name with the extension forced to `.zip`.
///
/// Whatever extension the user typed is replaced; a name without one gets
/// `.zip` appended.
///
/// ```
/// use parcelview::export::zip_file_name;
///
/// assert_eq!(zip_file_name(None, "parcels"), "parcels.zip");
/// assert_eq!(zip_file_name(Some("lots.kml"), "parcels"), "lots.zip");
/// assert_eq!(zip_file_name(Some("lots"), "parcels"), "lots.zip");
/// ```
#[must_use]
pub fn zip_file_name(requested: Option<&str>, base_name: &str) -> String {
    let name = sanitize(non_blank(requested).unwrap_or(base_name));
    let stem = match name.rfind('.') {
        Some(dot) if dot > 0 => &name[..dot],
        _ => name.as_str(),
    };
    format!("{stem}.zip")
}
