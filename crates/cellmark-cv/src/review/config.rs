//! Review configuration

use crate::utils::OverlayStyle;
use crate::Result;
use anyhow::Context;
use cellmark_core::{ColumnMap, ResultsStore};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main review configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewConfig {
    /// File name looked up inside every model folder
    pub csv_file_name: String,
    pub columns: ColumnMap,
    pub suppression: SuppressionConfig,
    pub overlay: OverlayStyle,
    pub drawing: DrawingConfig,
}

/// Overlap suppression settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuppressionConfig {
    /// Candidates overlapping a kept box by more than this are dropped
    pub iou_threshold: f64,
    /// Refuse thresholds outside [0, 1] instead of using them as given
    pub validate_threshold: bool,
}

/// Hand-drawn rectangle settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrawingConfig {
    /// Rectangles with a shorter side are discarded
    pub min_box_side: f64,
}

impl Default for SuppressionConfig {
    fn default() -> Self {
        Self {
            iou_threshold: 0.5,
            validate_threshold: false,
        }
    }
}

impl Default for DrawingConfig {
    fn default() -> Self {
        Self { min_box_side: 5.0 }
    }
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            csv_file_name: ResultsStore::DEFAULT_CSV_NAME.to_string(),
            columns: ColumnMap::default(),
            suppression: SuppressionConfig::default(),
            overlay: OverlayStyle::default(),
            drawing: DrawingConfig::default(),
        }
    }
}

impl ReviewConfig {
    /// Drop any positive overlap, with the threshold checked
    pub fn strict() -> Self {
        Self {
            suppression: SuppressionConfig {
                iou_threshold: 0.0,
                validate_threshold: true,
            },
            ..Default::default()
        }
    }

    /// Only drop near-duplicates
    pub fn lenient() -> Self {
        Self {
            suppression: SuppressionConfig {
                iou_threshold: 0.9,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Read a JSON config file. Missing fields take their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {:?}", path))?;

        serde_json::from_str(&text).with_context(|| format!("Failed to parse config: {:?}", path))
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(path, json).with_context(|| format!("Failed to write config: {:?}", path))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: ReviewConfig =
            serde_json::from_str(r#"{ "suppression": { "iou_threshold": 0.3 } }"#).unwrap();
        assert_eq!(config.suppression.iou_threshold, 0.3);
        assert!(!config.suppression.validate_threshold);
        assert_eq!(config.csv_file_name, "detected_regions_on_all_images.csv");
        assert_eq!(config.columns.file_name, "File Name");
        assert_eq!(config.drawing.min_box_side, 5.0);
    }

    #[test]
    fn test_json_round_trip() {
        let mut config = ReviewConfig::strict();
        config.columns.x_min = "BX".into();
        let json = serde_json::to_string(&config).unwrap();
        let back: ReviewConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_presets() {
        assert_eq!(ReviewConfig::strict().suppression.iou_threshold, 0.0);
        assert!(ReviewConfig::strict().suppression.validate_threshold);
        assert_eq!(ReviewConfig::lenient().suppression.iou_threshold, 0.9);
    }
}
