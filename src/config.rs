//! Configuration management for chewsense
//!
//! Window size and threshold are not universal: the change rate is measured in
//! display pixels, so its scale depends on the resolution the landmarks are
//! mapped to. Two presets reproduce the deployments the detector was tuned for.

use crate::error::ChewError;
use crate::landmarks::{MOUTH_CENTER, NOSE_TIP};
use crate::types::Dimensions;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default moving-average window (samples)
pub const DEFAULT_WINDOW_SIZE: usize = 5;

/// Default cycle interval (100ms, ~10Hz)
pub const DEFAULT_INTERVAL_MS: u64 = 100;

/// Default page scroll step on chewing (CSS pixels)
pub const DEFAULT_SCROLL_STEP_PX: i32 = 50;

/// Threshold tuned for the standalone page at native video resolution
pub const STANDALONE_THRESHOLD: f64 = 1.2;

/// Threshold tuned for the 270x210 picture-in-picture widget
pub const EXTENSION_THRESHOLD: f64 = 0.35;

/// Full session configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChewConfig {
    /// Smoothing and decision parameters
    pub engine: EngineConfig,

    /// Landmark indices used for the distance signal
    #[serde(default)]
    pub landmarks: LandmarkConfig,

    /// Detector model configuration
    #[serde(default)]
    pub model: ModelConfig,

    /// Capture and scheduling configuration
    #[serde(default)]
    pub capture: CaptureConfig,

    /// Side effect on chewing
    #[serde(default)]
    pub action: ActionConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Smoothing and decision parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Moving average window size (samples)
    #[serde(default = "default_window_size")]
    pub window_size: usize,

    /// Change-rate threshold; must be stated explicitly
    pub threshold: f64,
}

/// Landmark indices within the 68-point scheme
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandmarkConfig {
    pub nose_tip: usize,
    pub mouth_center: usize,
}

/// Detector model configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Base location the detector loads its weights from
    pub weights_base: String,
}

/// Capture and scheduling configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Camera device identifier (None = system default)
    pub camera_id: Option<String>,

    /// Display size landmarks are mapped to before measuring (None = capture size)
    pub display: Option<Dimensions>,

    /// Cycle interval in milliseconds
    pub interval_ms: u64,
}

/// What to do when chewing is detected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Scroll the host page
    Scroll,
    /// Increment and render a counter
    Counter,
}

/// Action sink configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionConfig {
    pub kind: ActionKind,

    /// Scroll step in CSS pixels (scroll action only)
    pub scroll_step_px: i32,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "chewsense=debug,warn")
    pub level: String,

    /// Whether to output structured JSON logs
    pub json: bool,
}

fn default_window_size() -> usize {
    DEFAULT_WINDOW_SIZE
}

impl Default for LandmarkConfig {
    fn default() -> Self {
        Self {
            nose_tip: NOSE_TIP,
            mouth_center: MOUTH_CENTER,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            weights_base: "./weights".to_string(),
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            camera_id: None,
            display: None,
            interval_ms: DEFAULT_INTERVAL_MS,
        }
    }
}

impl Default for ActionConfig {
    fn default() -> Self {
        Self {
            kind: ActionKind::Counter,
            scroll_step_px: DEFAULT_SCROLL_STEP_PX,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl ChewConfig {
    /// Create a configuration with the given engine parameters and defaults elsewhere
    pub fn with_engine(window_size: usize, threshold: f64) -> Self {
        Self {
            engine: EngineConfig {
                window_size,
                threshold,
            },
            landmarks: LandmarkConfig::default(),
            model: ModelConfig::default(),
            capture: CaptureConfig::default(),
            action: ActionConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    /// Standalone page: native video resolution, on-screen counter
    pub fn standalone() -> Self {
        Self::with_engine(DEFAULT_WINDOW_SIZE, STANDALONE_THRESHOLD)
    }

    /// Browser extension: 270x210 widget, scrolls the host page
    pub fn extension() -> Self {
        let mut config = Self::with_engine(DEFAULT_WINDOW_SIZE, EXTENSION_THRESHOLD);
        config.model.weights_base = "/javascript/weights".to_string();
        config.capture.display = Some(Dimensions::new(270, 210));
        config.action.kind = ActionKind::Scroll;
        config
    }

    /// Look up a named preset
    pub fn preset(name: &str) -> Result<Self, ChewError> {
        match name.to_lowercase().as_str() {
            "standalone" => Ok(Self::standalone()),
            "extension" => Ok(Self::extension()),
            other => Err(ChewError::InvalidConfig(format!("Unknown preset: {other}"))),
        }
    }

    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ChewError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parse configuration from JSON
    pub fn from_json(json: &str) -> Result<Self, ChewError> {
        serde_json::from_str(json)
            .map_err(|e| ChewError::InvalidConfig(format!("Failed to parse config: {e}")))
    }

    /// Save configuration to a JSON file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ChewError> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ChewError> {
        if self.engine.window_size == 0 {
            return Err(ChewError::InvalidConfig(
                "Window size must be greater than 0".to_string(),
            ));
        }
        if !self.engine.threshold.is_finite() || self.engine.threshold < 0.0 {
            return Err(ChewError::InvalidConfig(
                "Threshold must be a finite non-negative number".to_string(),
            ));
        }
        if self.landmarks.nose_tip == self.landmarks.mouth_center {
            return Err(ChewError::InvalidConfig(
                "Nose and mouth landmarks must differ".to_string(),
            ));
        }
        if self.capture.interval_ms == 0 {
            return Err(ChewError::InvalidConfig(
                "Cycle interval must be greater than 0".to_string(),
            ));
        }
        if let Some(display) = self.capture.display {
            if display.width == 0 || display.height == 0 {
                return Err(ChewError::InvalidConfig(
                    "Display size must be non-zero".to_string(),
                ));
            }
        }
        if self.model.weights_base.trim().is_empty() {
            return Err(ChewError::InvalidConfig(
                "Weights base location must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_presets_validate() {
        assert!(ChewConfig::standalone().validate().is_ok());
        assert!(ChewConfig::extension().validate().is_ok());
    }

    #[test]
    fn test_extension_preset() {
        let config = ChewConfig::preset("Extension").unwrap();
        assert_eq!(config.engine.threshold, EXTENSION_THRESHOLD);
        assert_eq!(config.engine.window_size, 5);
        assert_eq!(config.action.kind, ActionKind::Scroll);
        assert_eq!(config.capture.display, Some(Dimensions::new(270, 210)));
    }

    #[test]
    fn test_unknown_preset() {
        assert!(ChewConfig::preset("kiosk").is_err());
    }

    #[test]
    fn test_threshold_is_required() {
        let result = ChewConfig::from_json(r#"{ "engine": { "window_size": 5 } }"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_minimal_config_fills_defaults() {
        let config = ChewConfig::from_json(r#"{ "engine": { "threshold": 0.5 } }"#).unwrap();
        assert_eq!(config.engine.window_size, DEFAULT_WINDOW_SIZE);
        assert_eq!(config.landmarks, LandmarkConfig::default());
        assert_eq!(config.capture.interval_ms, DEFAULT_INTERVAL_MS);
        assert_eq!(config.action.kind, ActionKind::Counter);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = ChewConfig::standalone();
        config.engine.window_size = 0;
        assert!(config.validate().is_err());

        let mut config = ChewConfig::standalone();
        config.engine.threshold = -1.0;
        assert!(config.validate().is_err());

        let mut config = ChewConfig::standalone();
        config.landmarks.mouth_center = config.landmarks.nose_tip;
        assert!(config.validate().is_err());

        let mut config = ChewConfig::standalone();
        config.capture.interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_file_round_trip() {
        let path = std::env::temp_dir().join(format!("chewsense-{}.json", uuid::Uuid::new_v4()));
        let config = ChewConfig::extension();
        config.to_file(&path).unwrap();

        let loaded = ChewConfig::from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded, config);
    }
}
