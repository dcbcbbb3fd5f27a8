//! Headless query panel.
//!
//! Mirrors the search sidebar of the map frontend: a multi-line identifier
//! box, a results table with selection checkboxes, style controls and the
//! two export buttons. Events arrive as method calls; user-facing messages
//! are queued as [`Notification`]s.

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::client::{ClientError, ParcelApi};
use crate::export::ExportFormat;
use crate::lookup::SearchOutcome;
use crate::map::{push_features, MapRenderer};
use crate::models::{RgbColor, StyleUpdate, MAX_OUTLINE_WEIGHT};
use crate::session::{Action, Change, ResultRow, SearchSession};

/// Notification severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Informational.
    Info,
    /// Needs acknowledgement before continuing.
    Blocking,
}

/// A message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Severity.
    pub severity: Severity,
    /// Message text.
    pub message: String,
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// The search sidebar, driven without a UI.
pub struct QueryPanel<A, R> {
    api: A,
    renderer: R,
    session: SearchSession,
    input: String,
    output_dir: PathBuf,
    notifications: Vec<Notification>,
}

impl<A: ParcelApi, R: MapRenderer> QueryPanel<A, R> {
    /// Creates a panel that saves downloads into `output_dir`.
    pub fn new(api: A, renderer: R, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            api,
            renderer,
            session: SearchSession::new(),
            input: String::new(),
            output_dir: output_dir.into(),
            notifications: Vec::new(),
        }
    }

    // ------------------------------------------------------------------------
    // Input
    // ------------------------------------------------------------------------

    /// Replaces the contents of the identifier box.
    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    /// Identifier box contents.
    #[must_use]
    pub fn input(&self) -> &str {
        &self.input
    }

    /// Trimmed, non-empty lines of the identifier box.
    #[must_use]
    pub fn identifiers(&self) -> Vec<String> {
        self.input
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Whether the search button is enabled.
    #[must_use]
    pub fn can_search(&self) -> bool {
        !self.session.is_searching() && !self.identifiers().is_empty()
    }

    // ------------------------------------------------------------------------
    // Search
    // ------------------------------------------------------------------------

    /// Presses the search button and waits for the result.
    pub async fn search(&mut self) {
        let Some(inputs) = self.begin_search() else {
            return;
        };
        let result = self.api.search(&inputs).await;
        self.finish_search(result);
    }

    /// Marks a search as in flight and returns its identifiers.
    ///
    /// Returns `None` when the button is disabled.
    pub fn begin_search(&mut self) -> Option<Vec<String>> {
        if !self.can_search() {
            return None;
        }
        self.session.apply(Action::SearchStarted);
        Some(self.identifiers())
    }

    /// Applies the result of a search started with [`Self::begin_search`].
    pub fn finish_search(&mut self, result: Result<SearchOutcome, ClientError>) {
        match result {
            Ok(outcome) => {
                let skipped: Vec<String> = outcome.failed.iter().map(|f| f.input.clone()).collect();
                info!(found = outcome.features.len(), skipped = skipped.len(), "Search finished");

                if self.session.apply(Action::SearchCompleted(outcome)) == Change::Features {
                    self.refresh_map();
                }
                if !skipped.is_empty() {
                    self.notify(
                        Severity::Info,
                        format!("No parcel found for: {}", skipped.join(", ")),
                    );
                }
            }
            Err(e) => {
                warn!(error = %e, "Search failed");
                self.session.apply(Action::SearchFailed);
                self.notify(Severity::Blocking, format!("Search failed: {e}"));
            }
        }
    }

    fn refresh_map(&mut self) {
        let collection = self.session.collection();
        if let Err(e) = push_features(&mut self.renderer, &collection) {
            warn!(error = %e, "Map update failed");
            self.notify(Severity::Info, format!("Map update failed: {e}"));
        }
    }

    // ------------------------------------------------------------------------
    // Results table
    // ------------------------------------------------------------------------

    /// Results table rows.
    #[must_use]
    pub fn rows(&self) -> Vec<ResultRow> {
        self.session.rows()
    }

    /// Clicks the checkbox of row `index`.
    pub fn toggle(&mut self, index: usize) {
        self.session.apply(Action::Toggle(index));
    }

    // ------------------------------------------------------------------------
    // Style and names
    // ------------------------------------------------------------------------

    /// Sets the fill colour from a `#rrggbb` value.
    pub fn set_fill_color(&mut self, hex: &str) -> anyhow::Result<()> {
        let color = RgbColor::from_hex(hex)?;
        self.update_style(StyleUpdate {
            fill: Some(color.to_hex()),
            ..StyleUpdate::default()
        });
        Ok(())
    }

    /// Sets the outline colour from a `#rrggbb` value.
    pub fn set_outline_color(&mut self, hex: &str) -> anyhow::Result<()> {
        let color = RgbColor::from_hex(hex)?;
        self.update_style(StyleUpdate {
            outline: Some(color.to_hex()),
            ..StyleUpdate::default()
        });
        Ok(())
    }

    /// Moves the opacity slider: clamped to 0-1 in steps of 0.01.
    pub fn set_opacity(&mut self, opacity: f64) {
        let opacity = if opacity.is_nan() { 0.0 } else { opacity.clamp(0.0, 1.0) };
        self.update_style(StyleUpdate {
            opacity: Some((opacity * 100.0).round() / 100.0),
            ..StyleUpdate::default()
        });
    }

    /// Sets the outline weight, clamped to 0-10.
    pub fn set_weight(&mut self, weight: f64) {
        let weight = if weight.is_nan() { 0.0 } else { weight.clamp(0.0, MAX_OUTLINE_WEIGHT) };
        self.update_style(StyleUpdate {
            weight: Some(weight),
            ..StyleUpdate::default()
        });
    }

    fn update_style(&mut self, update: StyleUpdate) {
        self.session.apply(Action::UpdateStyle(update));
    }

    /// Sets the KML folder / shapefile base name.
    pub fn set_folder_name(&mut self, name: impl Into<String>) {
        self.session.apply(Action::SetFolderName(name.into()));
    }

    /// Sets the download file name.
    pub fn set_file_name(&mut self, name: impl Into<String>) {
        self.session.apply(Action::SetFileName(name.into()));
    }

    // ------------------------------------------------------------------------
    // Export
    // ------------------------------------------------------------------------

    /// Presses an export button.
    ///
    /// On success the file is saved into the output directory and its path
    /// returned. Failures produce a notification and no file.
    pub async fn export(&mut self, format: ExportFormat) -> Option<PathBuf> {
        let request = self.session.export_request(format);

        let download = match self.api.download(format, &request).await {
            Ok(download) => download,
            Err(e) => {
                warn!(error = %e, format = format.endpoint(), "Download failed");
                let message = match e.status() {
                    Some(status) => format!("Download failed with status {status}"),
                    None => format!("Download failed: {e}"),
                };
                self.notify(Severity::Blocking, message);
                return None;
            }
        };

        let path = self.output_dir.join(&download.file_name);
        if let Err(e) = std::fs::write(&path, &download.bytes) {
            warn!(error = %e, path = %path.display(), "Could not save download");
            self.notify(
                Severity::Blocking,
                format!("Could not save {}: {e}", path.display()),
            );
            return None;
        }

        info!(path = %path.display(), bytes = download.bytes.len(), "Download saved");
        self.notify(Severity::Info, format!("Saved {}", path.display()));
        Some(path)
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    fn notify(&mut self, severity: Severity, message: String) {
        self.notifications.push(Notification { severity, message });
    }

    /// Pending notifications, oldest first.
    #[must_use]
    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    /// Removes and returns pending notifications.
    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    /// Underlying session state.
    #[must_use]
    pub const fn session(&self) -> &SearchSession {
        &self.session
    }

    /// Map renderer.
    #[must_use]
    pub const fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Directory downloads are saved into.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}
