//! Configuration system
//!
//! Root settings are plain serde structs loadable from `.toml` or `.ron`
//! through the [`Config`] trait.

use crate::events::{EventKind, EventKinds};
pub use serde::{Deserialize, Serialize};

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        Self::from_str_with_format(&contents, path)
    }

    /// Parse configuration text; the format is picked from `path`'s extension
    fn from_str_with_format(contents: &str, path: &str) -> Result<Self, ConfigError> {
        if path.ends_with(".toml") {
            toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else if path.ends_with(".ron") {
            ron::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else {
            Err(ConfigError::UnsupportedFormat(path.to_string()))
        }
    }

    /// Save configuration to file
    fn save_to_file(&self, path: &str) -> Result<(), ConfigError> {
        let contents = if path.ends_with(".toml") {
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else if path.ends_with(".ron") {
            ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else {
            return Err(ConfigError::UnsupportedFormat(path.to_string()));
        };

        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Values parsed but make no sense together
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Initial viewport size in logical pixels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewportConfig {
    /// Width
    pub width: u32,
    /// Height
    pub height: u32,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

/// Initial camera
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// World position
    pub position: [f32; 3],
    /// Look-at target
    pub target: [f32; 3],
    /// Vertical field of view in degrees
    pub fov: f32,
    /// Near plane
    pub near: f32,
    /// Far plane
    pub far: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: [0.0, 0.0, 5.0],
            target: [0.0, 0.0, 0.0],
            fov: 75.0,
            near: 0.1,
            far: 1000.0,
        }
    }
}

/// Performance budget
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    /// Budget while degraded, in (0, 1]
    pub min: f32,
    /// Frames a regression lasts
    pub debounce_frames: u32,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            min: 0.5,
            debounce_frames: 12,
        }
    }
}

/// Settings of one mounted root
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RootConfig {
    /// Initial viewport
    pub viewport: ViewportConfig,
    /// Requested device pixel ratio
    pub dpr: f32,
    /// Allowed device pixel ratio range `[min, max]`
    pub dpr_range: [f32; 2],
    /// Initial camera
    pub camera: CameraConfig,
    /// Performance budget
    pub performance: PerformanceConfig,
    /// Platform event kinds to listen to
    pub events: Vec<EventKind>,
}

impl Default for RootConfig {
    fn default() -> Self {
        Self {
            viewport: ViewportConfig::default(),
            dpr: 1.0,
            dpr_range: [1.0, 2.0],
            camera: CameraConfig::default(),
            performance: PerformanceConfig::default(),
            events: EventKind::ALL
                .into_iter()
                .filter(|kind| EventKinds::default().contains(kind.flag()))
                .collect(),
        }
    }
}

impl Config for RootConfig {}

impl RootConfig {
    /// Subscribed kinds as a bit set
    pub fn event_kinds(&self) -> EventKinds {
        self.events.iter().copied().collect()
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        let [low, high] = self.dpr_range;
        if !(low > 0.0 && low <= high) {
            return Err(ConfigError::Invalid(format!(
                "dpr_range [{low}, {high}] must be positive and ordered"
            )));
        }
        if !(self.performance.min > 0.0 && self.performance.min <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "performance.min {} must be in (0, 1]",
                self.performance.min
            )));
        }
        if self.camera.near <= 0.0 || self.camera.far <= self.camera.near {
            return Err(ConfigError::Invalid(
                "camera planes must satisfy 0 < near < far".to_string(),
            ));
        }
        if self.viewport.width == 0 || self.viewport.height == 0 {
            return Err(ConfigError::Invalid("viewport must not be empty".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = RootConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.event_kinds(), EventKinds::default());
    }

    #[test]
    fn test_parse_toml() {
        let text = r#"
            dpr = 3.0
            dpr_range = [1.0, 1.5]
            events = ["click", "pointer-move"]

            [viewport]
            width = 800
            height = 600

            [camera]
            fov = 50.0
        "#;
        let config = RootConfig::from_str_with_format(text, "root.toml").unwrap();

        assert_eq!(config.viewport.width, 800);
        assert_eq!(config.camera.fov, 50.0);
        assert_eq!(config.camera.near, 0.1);
        assert_eq!(
            config.event_kinds(),
            EventKinds::CLICK | EventKinds::POINTER_MOVE
        );
    }

    #[test]
    fn test_parse_ron() {
        let text = r#"(dpr: 2.0, performance: (min: 0.25, debounce_frames: 4))"#;
        let config = RootConfig::from_str_with_format(text, "root.ron").unwrap();
        assert_eq!(config.performance.debounce_frames, 4);
        assert_eq!(config.viewport, ViewportConfig::default());
    }

    #[test]
    fn test_unsupported_format() {
        let err = RootConfig::from_str_with_format("", "root.json").unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_invalid_ranges() {
        let mut config = RootConfig::default();
        config.dpr_range = [2.0, 1.0];
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }
}
