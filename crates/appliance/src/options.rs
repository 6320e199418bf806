//! Command-line options for the appliance binary

use crate::settings::ApplianceConfig;
use clap::Parser;
use std::path::PathBuf;

/// GPIO-button microscope appliance: live preview and still capture to
/// removable media.
#[derive(Debug, Parser)]
#[command(name = "micropiscope", version, about)]
pub struct Options {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace and configuration dump)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// V4L2 device index
    #[arg(long)]
    pub device: Option<usize>,

    /// Still capture width
    #[arg(long)]
    pub width: Option<u32>,

    /// Still capture height
    #[arg(long)]
    pub height: Option<u32>,

    /// JPEG quality for saved stills (1-100)
    #[arg(long)]
    pub quality: Option<u8>,
}

impl Options {
    /// Fold command-line overrides into the loaded configuration.
    pub fn apply(&self, mut config: ApplianceConfig) -> ApplianceConfig {
        if let Some(device) = self.device {
            config.camera.device_index = device;
        }
        if let Some(width) = self.width {
            config.camera.still_width = width;
        }
        if let Some(height) = self.height {
            config.camera.still_height = height;
        }
        if let Some(quality) = self.quality {
            config.camera.jpeg_quality = quality;
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_apply_on_top_of_config() {
        let options = Options::parse_from([
            "micropiscope",
            "--device",
            "2",
            "--width",
            "1920",
            "--quality",
            "85",
        ]);
        let config = options.apply(ApplianceConfig::default());
        assert_eq!(config.camera.device_index, 2);
        assert_eq!(config.camera.still_width, 1920);
        assert_eq!(config.camera.jpeg_quality, 85);
        // Height was not given and keeps the default.
        assert_eq!(config.camera.still_height, 2464);
    }

    #[test]
    fn test_bare_invocation_changes_nothing() {
        let options = Options::parse_from(["micropiscope"]);
        let config = options.apply(ApplianceConfig::default());
        assert_eq!(config.camera.device_index, 0);
        assert_eq!(options.verbose, 0);
    }

    #[test]
    fn test_verbosity_counts() {
        let options = Options::parse_from(["micropiscope", "-vv"]);
        assert_eq!(options.verbose, 2);
    }
}
