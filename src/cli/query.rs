//! `query` command: drive the query panel against a running backend.

use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use serde::Serialize;

use crate::cli::common::{CliError, CliResult};
use crate::client::BackendClient;
use crate::config::Config;
use crate::constants::APP_BINARY_NAME;
use crate::export::ExportFormat;
use crate::lookup::FailedIdentifier;
use crate::map::{GeoJsonFileRenderer, MapRenderer, NullRenderer};
use crate::panel::{QueryPanel, Severity};

/// Search lot/plan identifiers through a backend and optionally export them
#[derive(Debug, Clone, Args)]
pub struct QueryArgs {
    /// Identifiers, e.g. 3RP123456 or 4/DP765432
    #[arg(value_name = "ID")]
    pub identifiers: Vec<String>,

    /// Read identifiers from a file, one per line
    #[arg(long, value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Backend base URL (defaults to client.api_base_url, then the local server)
    #[arg(long, value_name = "URL")]
    pub backend: Option<String>,

    /// Result rows to select before exporting (0-based)
    #[arg(long, value_delimiter = ',', value_name = "INDEX")]
    pub select: Vec<usize>,

    /// Export formats to download
    #[arg(long, value_enum, value_delimiter = ',')]
    pub export: Vec<ExportFormat>,

    /// Directory downloads are saved into
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub out_dir: PathBuf,

    /// Write the result collection to this GeoJSON file for a map viewer
    #[arg(long, value_name = "FILE")]
    pub map_out: Option<PathBuf>,

    /// KML folder name / shapefile base name
    #[arg(long, value_name = "NAME")]
    pub folder_name: Option<String>,

    /// Download file name
    #[arg(long, value_name = "NAME")]
    pub file_name: Option<String>,

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

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct QueryOutput<'a> {
    rows: Vec<RowOutput>,
    failed: &'a [FailedIdentifier],
    saved: Vec<String>,
}

#[derive(Serialize)]
struct RowOutput {
    index: usize,
    lot: String,
    plan: String,
    selected: bool,
}

impl QueryArgs {
    /// Backend URL from flags, then config, then the configured listener.
    #[must_use]
    pub fn backend_url(&self, config: &Config) -> String {
        if let Some(url) = &self.backend {
            return url.clone();
        }
        if !config.client.api_base_url.is_empty() {
            return config.client.api_base_url.clone();
        }
        format!("http://{}:{}", config.server.host, config.server.port)
    }

    /// Rows to select, each once.
    #[must_use]
    pub fn selected_rows(&self) -> BTreeSet<usize> {
        self.select.iter().copied().collect()
    }

    fn input_text(&self) -> CliResult<String> {
        let mut lines = self.identifiers.clone();
        if let Some(path) = &self.file {
            let text = fs::read_to_string(path)
                .map_err(|e| CliError::io(format!("Failed to read {}: {e}", path.display())))?;
            lines.extend(text.lines().map(str::to_string));
        }
        Ok(lines.join("\n"))
    }

    /// Execute the query command
    pub async fn execute(&self, config: &Config) -> CliResult<()> {
        let client = BackendClient::new(
            &self.backend_url(config),
            Duration::from_secs(config.services.timeout_secs.saturating_mul(3)),
        )
        .map_err(|e| CliError::remote(format!("Failed to create HTTP client: {e}")))?;

        match &self.map_out {
            Some(path) => self.run(QueryPanel::new(client, GeoJsonFileRenderer::new(path), &self.out_dir)).await,
            None => self.run(QueryPanel::new(client, NullRenderer, &self.out_dir)).await,
        }
    }

    async fn run<R: MapRenderer>(&self, mut panel: QueryPanel<BackendClient, R>) -> CliResult<()> {
        panel.set_input(self.input_text()?);
        if !panel.can_search() {
            return Err(CliError::validation(format!(
                "No identifiers given (e.g. `{APP_BINARY_NAME} query 3RP123456 4/DP765432`)"
            )));
        }

        panel.search().await;
        if let Some(blocking) = panel
            .notifications()
            .iter()
            .find(|n| n.severity == Severity::Blocking)
        {
            return Err(CliError::remote(blocking.message.clone()));
        }

        for index in self.selected_rows() {
            if index >= panel.rows().len() {
                return Err(CliError::validation(format!(
                    "Row {index} does not exist ({} result(s))",
                    panel.rows().len()
                )));
            }
            panel.toggle(index);
        }

        if let Some(fill) = &self.fill {
            panel
                .set_fill_color(fill)
                .map_err(|e| CliError::validation(e.to_string()))?;
        }
        if let Some(outline) = &self.outline {
            panel
                .set_outline_color(outline)
                .map_err(|e| CliError::validation(e.to_string()))?;
        }
        if let Some(opacity) = self.opacity {
            panel.set_opacity(opacity);
        }
        if let Some(weight) = self.weight {
            panel.set_weight(weight);
        }
        if let Some(name) = &self.folder_name {
            panel.set_folder_name(name.clone());
        }
        if let Some(name) = &self.file_name {
            panel.set_file_name(name.clone());
        }

        let mut saved = Vec::new();
        for &format in &self.export {
            if let Some(path) = panel.export(format).await {
                saved.push(path.display().to_string());
            }
        }

        self.print(&panel, saved)?;

        match panel
            .notifications()
            .iter()
            .find(|n| n.severity == Severity::Blocking)
        {
            Some(blocking) => Err(CliError::remote(blocking.message.clone())),
            None => Ok(()),
        }
    }

    fn print<R: MapRenderer>(&self, panel: &QueryPanel<BackendClient, R>, saved: Vec<String>) -> CliResult<()> {
        let rows: Vec<RowOutput> = panel
            .rows()
            .into_iter()
            .map(|row| RowOutput {
                index: row.index,
                lot: row.lot,
                plan: row.plan,
                selected: row.selected,
            })
            .collect();

        if self.json {
            let output = QueryOutput {
                rows,
                failed: panel.session().failed(),
                saved,
            };
            let text = serde_json::to_string_pretty(&output)
                .map_err(|e| CliError::io(format!("Failed to serialize output: {e}")))?;
            println!("{text}");
            return Ok(());
        }

        println!("{:>3}  {:<10} {:<15} SELECTED", "#", "LOT", "PLAN");
        for row in &rows {
            println!(
                "{:>3}  {:<10} {:<15} {}",
                row.index,
                row.lot,
                row.plan,
                if row.selected { "x" } else { "" }
            );
        }
        for failed in panel.session().failed() {
            println!("  skipped {}: {}", failed.input, failed.reason);
        }
        for path in &saved {
            println!("✓ Saved {path}");
        }
        for notification in panel.notifications() {
            if notification.severity == Severity::Blocking {
                eprintln!("Error: {notification}");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Wrapper {
        #[command(flatten)]
        args: QueryArgs,
    }

    #[test]
    fn test_backend_url_precedence() {
        let mut config = Config::new();
        let args = Wrapper::parse_from(["q", "3RP123456"]).args;
        assert_eq!(args.backend_url(&config), "http://127.0.0.1:8000");

        config.client.api_base_url = "https://api.example".to_string();
        assert_eq!(args.backend_url(&config), "https://api.example");

        let args = Wrapper::parse_from(["q", "--backend", "http://x:1", "3RP123456"]).args;
        assert_eq!(args.backend_url(&config), "http://x:1");
    }

    #[test]
    fn test_list_flags_parse() {
        let args = Wrapper::parse_from(["q", "a", "b", "--select", "0,2", "--export", "kml,shp"]).args;
        assert_eq!(args.identifiers, vec!["a", "b"]);
        assert_eq!(args.select, vec![0, 2]);
        assert_eq!(args.export, vec![ExportFormat::Kml, ExportFormat::Shapefile]);
    }

    #[test]
    fn test_repeated_select_selects_once() {
        let args = Wrapper::parse_from(["q", "a", "--select", "2,0,0", "--select", "2"]).args;
        assert_eq!(args.selected_rows().into_iter().collect::<Vec<_>>(), vec![0, 2]);
    }
}
