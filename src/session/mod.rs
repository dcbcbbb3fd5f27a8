//! Search, selection and style state shared by the query panel and the map.
//!
//! All changes go through [`SearchSession::apply`] with an [`Action`]. The
//! session is single-owner and holds nothing durable.

mod selection;

pub use selection::Selection;

use crate::constants::{DEFAULT_FOLDER_NAME, DEFAULT_SHAPEFILE_BASE};
use crate::export::{ExportFormat, ExportRequest};
use crate::lookup::{FailedIdentifier, SearchOutcome};
use crate::models::{Feature, FeatureCollection, Style, StyleUpdate};

/// State transitions.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// A search request was sent.
    SearchStarted,
    /// A search finished; its features replace the current list.
    SearchCompleted(SearchOutcome),
    /// A search failed; the current list is kept.
    SearchFailed,
    /// Flip the selection flag of one feature.
    Toggle(usize),
    /// Merge a partial style update.
    UpdateStyle(StyleUpdate),
    /// Set the KML folder / shapefile base name.
    SetFolderName(String),
    /// Set the download file name.
    SetFileName(String),
}

/// What an applied action changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    /// The feature list was replaced.
    Features,
    /// Selection, style, names or search progress changed.
    State,
    /// Nothing changed.
    None,
}

/// One row of the results table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultRow {
    /// Index into the feature list.
    pub index: usize,
    /// Normalized lot number.
    pub lot: String,
    /// Normalized plan label.
    pub plan: String,
    /// Selection checkbox state.
    pub selected: bool,
}

/// Current search result, selection and export settings.
#[derive(Debug, Clone)]
pub struct SearchSession {
    features: Vec<Feature>,
    failed: Vec<FailedIdentifier>,
    selection: Selection,
    style: Style,
    folder_name: String,
    file_name: String,
    in_flight: usize,
}

impl Default for SearchSession {
    fn default() -> Self {
        Self {
            features: Vec::new(),
            failed: Vec::new(),
            selection: Selection::default(),
            style: Style::default(),
            folder_name: DEFAULT_FOLDER_NAME.to_string(),
            file_name: DEFAULT_SHAPEFILE_BASE.to_string(),
            in_flight: 0,
        }
    }
}

impl SearchSession {
    /// Creates an empty session with default style and names.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one transition.
    ///
    /// Searches may overlap; whichever completes last supplies the features.
    pub fn apply(&mut self, action: Action) -> Change {
        match action {
            Action::SearchStarted => {
                self.in_flight += 1;
                Change::State
            }
            Action::SearchCompleted(outcome) => {
                self.in_flight = self.in_flight.saturating_sub(1);
                self.selection.reset(outcome.features.len());
                self.features = outcome.features;
                self.failed = outcome.failed;
                Change::Features
            }
            Action::SearchFailed => {
                self.in_flight = self.in_flight.saturating_sub(1);
                Change::State
            }
            Action::Toggle(index) => match self.selection.toggle(index) {
                Some(_) => Change::State,
                None => Change::None,
            },
            Action::UpdateStyle(update) => {
                let before = self.style.clone();
                self.style.merge(update);
                if self.style == before {
                    Change::None
                } else {
                    Change::State
                }
            }
            Action::SetFolderName(name) => {
                self.folder_name = name;
                Change::State
            }
            Action::SetFileName(name) => {
                self.file_name = name;
                Change::State
            }
        }
    }

    /// Features of the last completed search.
    #[must_use]
    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    /// Identifiers the last completed search skipped.
    #[must_use]
    pub fn failed(&self) -> &[FailedIdentifier] {
        &self.failed
    }

    /// Current feature list as a GeoJSON collection.
    #[must_use]
    pub fn collection(&self) -> FeatureCollection {
        FeatureCollection::new(self.features.clone())
    }

    /// Selection flags.
    #[must_use]
    pub const fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Current style.
    #[must_use]
    pub const fn style(&self) -> &Style {
        &self.style
    }

    /// KML folder / shapefile base name.
    #[must_use]
    pub fn folder_name(&self) -> &str {
        &self.folder_name
    }

    /// Download file name.
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// True while at least one search is outstanding.
    #[must_use]
    pub const fn is_searching(&self) -> bool {
        self.in_flight > 0
    }

    /// Results table rows, one per feature.
    #[must_use]
    pub fn rows(&self) -> Vec<ResultRow> {
        self.features
            .iter()
            .enumerate()
            .map(|(index, feature)| ResultRow {
                index,
                lot: feature.lot().unwrap_or_default(),
                plan: feature.plan().unwrap_or_default(),
                selected: self.selection.is_selected(index),
            })
            .collect()
    }

    /// Features an export covers: the selected ones, or every feature when
    /// nothing is selected.
    #[must_use]
    pub fn export_features(&self) -> Vec<Feature> {
        if self.selection.is_empty() {
            return self.features.clone();
        }
        self.selection
            .indices()
            .filter_map(|i| self.features.get(i).cloned())
            .collect()
    }

    /// Builds the download request for `format` from the current state.
    #[must_use]
    pub fn export_request(&self, format: ExportFormat) -> ExportRequest {
        ExportRequest {
            features: self.export_features(),
            folder_name: Some(self.folder_name.clone()),
            file_name: Some(self.file_name.clone()),
            style: match format {
                ExportFormat::Kml => Some(self.style.clone()),
                ExportFormat::Shapefile => None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map, Value};

    fn feature(lot: &str, plan: &str) -> Feature {
        let Value::Object(props) = json!({"lot": lot, "plan": plan}) else {
            unreachable!()
        };
        Feature::new(None, props)
    }

    fn outcome(features: Vec<Feature>) -> SearchOutcome {
        SearchOutcome {
            features,
            ..SearchOutcome::default()
        }
    }

    #[test]
    fn test_new_search_resets_selection() {
        let mut session = SearchSession::new();
        session.apply(Action::SearchCompleted(outcome(vec![
            feature("1", "RP1"),
            feature("2", "RP2"),
        ])));
        session.apply(Action::Toggle(0));
        session.apply(Action::Toggle(1));
        assert_eq!(session.selection().count(), 2);

        let change = session.apply(Action::SearchCompleted(outcome(vec![feature("3", "RP3")])));
        assert_eq!(change, Change::Features);
        assert!(session.selection().is_empty());
        assert_eq!(session.features().len(), 1);
    }

    #[test]
    fn test_failed_search_keeps_features() {
        let mut session = SearchSession::new();
        session.apply(Action::SearchCompleted(outcome(vec![feature("1", "RP1")])));
        session.apply(Action::Toggle(0));
        session.apply(Action::SearchStarted);
        assert!(session.is_searching());

        session.apply(Action::SearchFailed);
        assert!(!session.is_searching());
        assert_eq!(session.features().len(), 1);
        assert!(session.selection().is_selected(0));
    }

    #[test]
    fn test_last_completed_search_wins() {
        let mut session = SearchSession::new();
        session.apply(Action::SearchStarted);
        session.apply(Action::SearchStarted);

        session.apply(Action::SearchCompleted(outcome(vec![feature("9", "SP9")])));
        assert!(session.is_searching());
        session.apply(Action::SearchCompleted(outcome(vec![feature("1", "RP1")])));
        assert!(!session.is_searching());
        assert_eq!(session.rows()[0].plan, "RP1");
    }

    #[test]
    fn test_style_merge_only_touches_given_fields() {
        let mut session = SearchSession::new();
        let before = session.style().clone();
        session.apply(Action::UpdateStyle(StyleUpdate {
            opacity: Some(0.7),
            ..StyleUpdate::default()
        }));
        let after = session.style();
        assert!((after.opacity - 0.7).abs() < f64::EPSILON);
        assert_eq!(after.fill, before.fill);
        assert_eq!(after.outline, before.outline);
        assert!((after.weight - before.weight).abs() < f64::EPSILON);
    }

    #[test]
    fn test_toggle_out_of_range() {
        let mut session = SearchSession::new();
        assert_eq!(session.apply(Action::Toggle(0)), Change::None);
    }

    #[test]
    fn test_export_request_uses_selection() {
        let mut session = SearchSession::new();
        session.apply(Action::SearchCompleted(outcome(vec![
            feature("1", "RP1"),
            feature("2", "RP2"),
            feature("3", "RP3"),
        ])));

        assert_eq!(session.export_features().len(), 3);

        session.apply(Action::Toggle(2));
        session.apply(Action::Toggle(0));
        session.apply(Action::SetFolderName("Lots".to_string()));
        let request = session.export_request(ExportFormat::Kml);
        let lots: Vec<_> = request.features.iter().filter_map(Feature::lot).collect();
        assert_eq!(lots, vec!["1", "3"]);
        assert_eq!(request.folder_name.as_deref(), Some("Lots"));
        assert!(request.style.is_some());
        assert!(session.export_request(ExportFormat::Shapefile).style.is_none());
    }

    #[test]
    fn test_rows_normalize_nsw_keys() {
        let mut props = Map::new();
        props.insert("lotnumber".to_string(), json!("4"));
        props.insert("planlabel".to_string(), json!("DP765432"));
        let mut session = SearchSession::new();
        session.apply(Action::SearchCompleted(outcome(vec![Feature::new(None, props)])));
        let rows = session.rows();
        assert_eq!(rows[0].lot, "4");
        assert_eq!(rows[0].plan, "DP765432");
        assert!(!rows[0].selected);
    }
}
