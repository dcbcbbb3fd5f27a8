//! Bridge from the search session to a map widget.
//!
//! The session never renders anything itself. It pushes the current
//! collection through [`MapRenderer`] whenever the feature list changes.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::models::FeatureCollection;

/// Display options passed with each push.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayOptions {
    /// Fit the view to the features.
    pub center_map: bool,
    /// Disallow editing of the drawn shapes.
    pub read_only: bool,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self {
            center_map: true,
            read_only: true,
        }
    }
}

/// A map widget's data-loading entry point.
pub trait MapRenderer {
    /// Replaces the displayed data with `features`.
    fn render_features(&mut self, features: &FeatureCollection, options: &DisplayOptions) -> io::Result<()>;
}

/// Pushes `features` to the renderer unless the collection is empty.
///
/// Returns whether a push happened.
pub fn push_features<R: MapRenderer + ?Sized>(renderer: &mut R, features: &FeatureCollection) -> io::Result<bool> {
    if features.is_empty() {
        return Ok(false);
    }
    renderer.render_features(features, &DisplayOptions::default())?;
    Ok(true)
}

/// Writes each pushed collection to a GeoJSON file, overwriting the last.
///
/// Lets a desktop GIS or browser map watch the file during headless runs.
#[derive(Debug, Clone)]
pub struct GeoJsonFileRenderer {
    path: PathBuf,
}

impl GeoJsonFileRenderer {
    /// Creates a renderer writing to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// File the collection is written to.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MapRenderer for GeoJsonFileRenderer {
    fn render_features(&mut self, features: &FeatureCollection, _options: &DisplayOptions) -> io::Result<()> {
        let mut writer = BufWriter::new(File::create(&self.path)?);
        serde_json::to_writer_pretty(&mut writer, features)?;
        writer.flush()
    }
}

/// Renderer that discards every push.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullRenderer;

impl MapRenderer for NullRenderer {
    fn render_features(&mut self, _features: &FeatureCollection, _options: &DisplayOptions) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Feature;
    use serde_json::Map;
    use tempfile::TempDir;

    #[derive(Default)]
    struct Recorder {
        pushes: Vec<(usize, DisplayOptions)>,
    }

    impl MapRenderer for Recorder {
        fn render_features(&mut self, features: &FeatureCollection, options: &DisplayOptions) -> io::Result<()> {
            self.pushes.push((features.len(), *options));
            Ok(())
        }
    }

    #[test]
    fn test_empty_collection_not_pushed() {
        let mut recorder = Recorder::default();
        assert!(!push_features(&mut recorder, &FeatureCollection::default()).unwrap());
        assert!(recorder.pushes.is_empty());
    }

    #[test]
    fn test_push_uses_centered_read_only() {
        let mut recorder = Recorder::default();
        let features = FeatureCollection::new(vec![Feature::new(None, Map::new())]);
        assert!(push_features(&mut recorder, &features).unwrap());
        assert_eq!(
            recorder.pushes,
            vec![(1, DisplayOptions { center_map: true, read_only: true })]
        );
    }

    #[test]
    fn test_file_renderer_writes_geojson() {
        let dir = TempDir::new().unwrap();
        let mut renderer = GeoJsonFileRenderer::new(dir.path().join("map.geojson"));
        let features = FeatureCollection::new(vec![Feature::new(None, Map::new())]);
        push_features(&mut renderer, &features).unwrap();

        let text = std::fs::read_to_string(renderer.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["type"], "FeatureCollection");
        assert_eq!(value["features"].as_array().unwrap().len(), 1);
    }
}
