//! Capture Pipeline Abstraction
//!
//! The camera stack is an external collaborator; this crate pins down the
//! surface the event loop drives (open/configure/start/stop/teardown, a
//! blocking wait for typed messages, preview pacing, and still encoding)
//! plus a V4L2-backed implementation and a scripted mock for tests.

mod convert;
mod encode;
pub mod v4l2;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use v4l2::V4l2Pipeline;

use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Pipeline error types
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The capture device could not be opened
    #[error("failed to open camera {device}: {source}")]
    Open { device: String, source: io::Error },

    /// Stream format negotiation or worker setup failed
    #[error("failed to configure stream: {0}")]
    Configure(io::Error),

    /// An operation needed a negotiated stream configuration
    #[error("camera is not configured")]
    NotConfigured,

    /// An operation needed a running capture stream
    #[error("camera is not running")]
    NotRunning,

    /// The capture worker vanished mid-stream; the message protocol is broken
    #[error("capture worker disconnected unexpectedly")]
    Disconnected,

    /// A still could not be written
    #[error("failed to save {path}: {source}")]
    Save {
        path: PathBuf,
        source: image::ImageError,
    },
}

/// Stream pixel layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelFormat {
    Yuyv,
    Mjpeg,
    Rgb24,
}

/// Negotiated stream geometry
#[derive(Debug, Clone, Copy)]
pub struct StreamInfo {
    pub width: u32,
    pub height: u32,
    /// Bytes per line as reported by the driver
    pub stride: u32,
    pub pixel_format: PixelFormat,
}

/// A captured frame handed from the stream to the event loop
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    pub data: Vec<u8>,
    pub sequence: u32,
    /// Driver capture timestamp (microseconds)
    pub timestamp_us: i64,
}

/// Message yielded by [`CameraPipeline::wait`]
#[derive(Debug)]
pub enum CameraMessage {
    /// The device produced nothing within the frame deadline
    Timeout,
    /// The platform asked the loop to end
    Quit,
    /// A frame completed
    FrameReady(FrameBuffer),
}

/// Still-encode knobs
#[derive(Debug, Clone, Copy)]
pub struct EncodeOptions {
    /// JPEG quality, 1-100
    pub quality: u8,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self { quality: 93 }
    }
}

/// The capture framework surface as the event loop sees it.
///
/// Implementations own their device state; the loop only ever drives this
/// trait, which is what lets tests replay a canned message script.
pub trait CameraPipeline {
    fn open(&mut self) -> Result<(), PipelineError>;

    /// Negotiate the low-latency preview stream.
    fn configure_viewfinder(&mut self) -> Result<(), PipelineError>;

    /// Negotiate the full-resolution still stream.
    fn configure_still(&mut self) -> Result<(), PipelineError>;

    fn start(&mut self) -> Result<(), PipelineError>;

    fn stop(&mut self) -> Result<(), PipelineError>;

    /// Release stream resources; the next start needs a fresh configure.
    fn teardown(&mut self);

    /// Block for the next pipeline message.
    ///
    /// An error here means the message protocol was violated and the caller
    /// should abort rather than continue.
    fn wait(&mut self) -> Result<CameraMessage, PipelineError>;

    /// Present a viewfinder frame.
    fn render_preview(&mut self, frame: &FrameBuffer);

    /// Geometry of the currently configured stream.
    fn stream_info(&self) -> Result<StreamInfo, PipelineError>;

    /// Human-readable model of the open camera.
    fn camera_model(&self) -> &str;

    /// Encode a captured frame to `path`.
    fn save_jpeg(
        &mut self,
        frame: &FrameBuffer,
        info: &StreamInfo,
        path: &Path,
        options: &EncodeOptions,
    ) -> Result<(), PipelineError>;
}

/// Camera configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// V4L2 device index (/dev/video<n>)
    pub device_index: usize,
    /// Preview width
    pub viewfinder_width: u32,
    /// Preview height
    pub viewfinder_height: u32,
    /// Still capture width
    pub still_width: u32,
    /// Still capture height
    pub still_height: u32,
    /// Memory-mapped capture buffers
    pub buffer_count: u32,
    /// How long `wait` blocks before reporting a device timeout (ms)
    pub frame_timeout_ms: u64,
    /// JPEG quality for saved stills, 1-100
    pub jpeg_quality: u8,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device_index: 0,
            viewfinder_width: 640,
            viewfinder_height: 480,
            still_width: 3280,
            still_height: 2464,
            buffer_count: 4,
            frame_timeout_ms: 2000,
            jpeg_quality: 93,
        }
    }
}

impl CameraConfig {
    pub fn frame_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.frame_timeout_ms)
    }

    pub fn encode_options(&self) -> EncodeOptions {
        EncodeOptions {
            quality: self.jpeg_quality,
        }
    }
}
