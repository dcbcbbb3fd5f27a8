//! Offline export of a GeoJSON file to KML or a zipped Shapefile.

use std::fs;
use std::path::PathBuf;

use clap::Args;

use crate::cli::common::{CliError, CliResult};
use crate::export::{self, ExportFormat, ExportRequest};
use crate::models::{Feature, FeatureCollection, Style};

/// Export a GeoJSON file without a running server
#[derive(Debug, Clone, Args)]
pub struct ExportArgs {
    /// GeoJSON FeatureCollection (or array of features) to export
    #[arg(short, long, value_name = "FILE")]
    pub input: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value = "kml")]
    pub format: ExportFormat,

    /// Output path (defaults to the export's file name in the current directory)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// KML folder name / shapefile component base name
    #[arg(long, value_name = "NAME")]
    pub folder_name: Option<String>,

    /// Fill colour (#rrggbb)
    #[arg(long, value_name = "HEX")]
    pub fill: Option<String>,

    /// Outline colour (#rrggbb)
    #[arg(long, value_name = "HEX")]
    pub outline: Option<String>,

    /// Fill opacity (0-1)
    #[arg(long)]
    pub opacity: Option<f64>,

    /// Outline weight (0-10)
    #[arg(long)]
    pub weight: Option<f64>,
}

impl ExportArgs {
    /// Execute the export command
    pub fn execute(&self) -> CliResult<()> {
        let text = fs::read_to_string(&self.input)
            .map_err(|e| CliError::io(format!("Failed to read {}: {e}", self.input.display())))?;
        let features = parse_features(&text)?;

        let request = ExportRequest {
            features,
            folder_name: self.folder_name.clone(),
            file_name: self
                .output
                .as_ref()
                .and_then(|p| p.file_name())
                .map(|n| n.to_string_lossy().into_owned()),
            style: Some(self.style()),
        };

        let today = chrono::Local::now().date_naive();
        let file = export::export(self.format, &request, today)
            .map_err(|e| CliError::io(format!("Export failed: {e}")))?;

        let output_path = match &self.output {
            Some(path) => path.with_file_name(&file.file_name),
            None => PathBuf::from(&file.file_name),
        };

        fs::write(&output_path, &file.bytes)
            .map_err(|e| CliError::io(format!("Failed to write output file: {e}")))?;

        println!(
            "✓ Exported {} parcel(s) to: {}",
            request.features.len(),
            output_path.display()
        );
        Ok(())
    }

    fn style(&self) -> Style {
        let defaults = Style::default();
        Style {
            fill: self.fill.clone().unwrap_or(defaults.fill),
            outline: self.outline.clone().unwrap_or(defaults.outline),
            opacity: self.opacity.unwrap_or(defaults.opacity),
            weight: self.weight.unwrap_or(defaults.weight),
        }
    }
}

/// Accepts a FeatureCollection, a bare feature array, or a `/search` response.
fn parse_features(text: &str) -> CliResult<Vec<Feature>> {
    if let Ok(collection) = serde_json::from_str::<FeatureCollection>(text) {
        return Ok(collection.features);
    }
    serde_json::from_str::<Vec<Feature>>(text)
        .map_err(|e| CliError::validation(format!("Input is not GeoJSON features: {e}")))
}
