//! Polygon styling carried from the style controls to the KML exporter.

use serde::{Deserialize, Serialize};

/// Upper bound the style controls place on outline weight.
pub const MAX_OUTLINE_WEIGHT: f64 = 10.0;

/// Fill and outline styling for exported parcels.
///
/// Colours stay as the hex strings the colour pickers produce; they are only
/// parsed when written to KML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Style {
    /// Fill colour (`#rrggbb`).
    pub fill: String,
    /// Outline colour (`#rrggbb`).
    pub outline: String,
    /// Fill opacity, 0.0-1.0.
    pub opacity: f64,
    /// Outline width.
    pub weight: f64,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            fill: "#ff0000".to_string(),
            outline: "#000000".to_string(),
            opacity: 0.5,
            weight: 2.0,
        }
    }
}

impl Style {
    /// Merges a partial update; fields absent from `update` are kept.
    pub fn merge(&mut self, update: StyleUpdate) {
        if let Some(fill) = update.fill {
            self.fill = fill;
        }
        if let Some(outline) = update.outline {
            self.outline = outline;
        }
        if let Some(opacity) = update.opacity {
            self.opacity = opacity;
        }
        if let Some(weight) = update.weight {
            self.weight = weight;
        }
    }

    /// Opacity limited to `0.0..=1.0`.
    #[must_use]
    pub fn clamped_opacity(&self) -> f64 {
        if self.opacity.is_nan() {
            0.0
        } else {
            self.opacity.clamp(0.0, 1.0)
        }
    }

    /// Outline weight with negative or NaN values treated as zero.
    #[must_use]
    pub fn clamped_weight(&self) -> f64 {
        if self.weight.is_nan() {
            0.0
        } else {
            self.weight.max(0.0)
        }
    }
}

/// Partial style change; `None` leaves the current value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleUpdate {
    /// New fill colour.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill: Option<String>,
    /// New outline colour.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outline: Option<String>,
    /// New fill opacity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
    /// New outline width.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let style = Style::default();
        assert_eq!(style.fill, "#ff0000");
        assert_eq!(style.outline, "#000000");
        assert!((style.opacity - 0.5).abs() < f64::EPSILON);
        assert!((style.weight - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_merge_opacity_only() {
        let mut style = Style {
            fill: "#00ff00".to_string(),
            outline: "#0000ff".to_string(),
            opacity: 0.4,
            weight: 3.0,
        };
        style.merge(StyleUpdate {
            opacity: Some(0.7),
            ..StyleUpdate::default()
        });
        assert_eq!(style.fill, "#00ff00");
        assert_eq!(style.outline, "#0000ff");
        assert!((style.opacity - 0.7).abs() < f64::EPSILON);
        assert!((style.weight - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let style: Style = serde_json::from_value(json!({"fill": "#123456"})).unwrap();
        assert_eq!(style.fill, "#123456");
        assert_eq!(style.outline, "#000000");
    }

    #[test]
    fn test_clamping() {
        let style = Style {
            opacity: 1.5,
            weight: -1.0,
            ..Style::default()
        };
        assert!((style.clamped_opacity() - 1.0).abs() < f64::EPSILON);
        assert!(style.clamped_weight().abs() < f64::EPSILON);
    }
}
