//! Configuration composition: file and environment over shipped defaults

use camera_pipeline::CameraConfig;
use config::{Config, ConfigError, Environment, File};
use keypad::KeypadConfig;
use removable_media::MediaConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level configuration for the appliance binary
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplianceConfig {
    pub keypad: KeypadConfig,
    pub media: MediaConfig,
    pub camera: CameraConfig,
}

impl ApplianceConfig {
    /// Load from an optional TOML file with `MICROPISCOPE_*` environment
    /// overrides; anything not given falls back to the shipped defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        builder
            .add_source(Environment::with_prefix("MICROPISCOPE").separator("__"))
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_without_sources() {
        let config = ApplianceConfig::load(None).unwrap();
        assert_eq!(config.camera.device_index, 0);
        assert_eq!(config.keypad.power_hold_ms, 2000);
        assert_eq!(config.media.mount_marker, "/media/");
    }

    #[test]
    fn test_file_overrides_defaults() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        writeln!(
            file,
            "[camera]\nstill_width = 1920\nstill_height = 1080\n\n[keypad]\npower = 21\n"
        )
        .unwrap();

        let config = ApplianceConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.camera.still_width, 1920);
        assert_eq!(config.camera.still_height, 1080);
        assert_eq!(config.keypad.power, 21);
        // Untouched sections keep their defaults.
        assert_eq!(config.camera.viewfinder_width, 640);
        assert_eq!(config.media.capture_subdir, "micropiscope");
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(ApplianceConfig::load(Some(Path::new("/nonexistent/config.toml"))).is_err());
    }
}
