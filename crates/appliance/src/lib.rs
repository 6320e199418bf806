//! Application Glue for the Micropiscope Appliance
//!
//! Owns the viewfinder/still-capture state machine, the system power seam,
//! CLI options, and configuration composition over the hardware crates.

pub mod event_loop;
pub mod options;
pub mod settings;
pub mod system;

pub use event_loop::{Appliance, CapturePhase, LoopExit};
pub use settings::ApplianceConfig;
pub use system::{SysControl, SystemControl};

use thiserror::Error;

/// Appliance error types
#[derive(Debug, Error)]
pub enum ApplianceError {
    /// GPIO keypad could not be brought up
    #[error("keypad failure: {0}")]
    Keypad(#[from] keypad::KeypadError),

    /// The capture pipeline failed in a way the loop cannot recover from
    #[error("camera pipeline failure: {0}")]
    Pipeline(#[from] camera_pipeline::PipelineError),
}
