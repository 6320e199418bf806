//! V4L2-backed capture pipeline.
//!
//! `configure_*` negotiates a format with the device. `start` hands a fresh
//! device handle to a worker thread that owns the memory-mapped stream and
//! feeds frames over a bounded channel; a full channel drops preview frames
//! rather than stalling the driver. `wait` turns channel timeouts into
//! Timeout messages and the platform quit flag (SIGINT) into Quit.

use crate::{
    encode, CameraConfig, CameraMessage, CameraPipeline, EncodeOptions, FrameBuffer, PipelineError,
    PixelFormat, StreamInfo,
};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread;
use tracing::{debug, error, info, trace, warn};
use v4l::buffer::Type;
use v4l::io::mmap::Stream as MmapStream;
use v4l::io::traits::CaptureStream;
use v4l::video::Capture;
use v4l::{Device, Format, FourCC};

/// Stream role being negotiated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamRole {
    Viewfinder,
    Still,
}

struct Worker {
    frames: Receiver<FrameBuffer>,
    stop: Arc<AtomicBool>,
    handle: thread::JoinHandle<()>,
}

/// Capture pipeline over a V4L2 device
pub struct V4l2Pipeline {
    config: CameraConfig,
    quit: Arc<AtomicBool>,
    model: String,
    configured: Option<StreamInfo>,
    worker: Option<Worker>,
    previewed: u64,
}

impl V4l2Pipeline {
    /// `quit` is the platform shutdown flag; once set, `wait` yields Quit.
    pub fn new(config: CameraConfig, quit: Arc<AtomicBool>) -> Self {
        Self {
            config,
            quit,
            model: String::new(),
            configured: None,
            worker: None,
            previewed: 0,
        }
    }

    fn device(&self) -> Result<Device, PipelineError> {
        Device::new(self.config.device_index).map_err(|source| PipelineError::Open {
            device: format!("/dev/video{}", self.config.device_index),
            source,
        })
    }

    fn negotiate(&mut self, role: StreamRole) -> Result<(), PipelineError> {
        let device = self.device()?;
        let (width, height) = match role {
            StreamRole::Viewfinder => (self.config.viewfinder_width, self.config.viewfinder_height),
            StreamRole::Still => (self.config.still_width, self.config.still_height),
        };
        let wanted = Format::new(width, height, FourCC::new(b"YUYV"));
        let actual = device.set_format(&wanted).map_err(PipelineError::Configure)?;

        let pixel_format = match &actual.fourcc.repr {
            b"YUYV" => PixelFormat::Yuyv,
            b"MJPG" => PixelFormat::Mjpeg,
            b"RGB3" => PixelFormat::Rgb24,
            other => {
                warn!(
                    "driver negotiated unsupported fourcc {:?}, treating as YUYV",
                    std::str::from_utf8(other).unwrap_or("????")
                );
                PixelFormat::Yuyv
            }
        };

        let negotiated = StreamInfo {
            width: actual.width,
            height: actual.height,
            stride: actual.stride,
            pixel_format,
        };
        info!(
            "configured {:?} stream: {}x{} {:?}",
            role, negotiated.width, negotiated.height, negotiated.pixel_format
        );
        self.configured = Some(negotiated);
        Ok(())
    }
}

impl CameraPipeline for V4l2Pipeline {
    fn open(&mut self) -> Result<(), PipelineError> {
        let device = self.device()?;
        let caps = device.query_caps().map_err(PipelineError::Configure)?;
        info!("opened camera: {} ({})", caps.card, caps.driver);
        self.model = caps.card;
        Ok(())
    }

    fn configure_viewfinder(&mut self) -> Result<(), PipelineError> {
        self.negotiate(StreamRole::Viewfinder)
    }

    fn configure_still(&mut self) -> Result<(), PipelineError> {
        self.negotiate(StreamRole::Still)
    }

    fn start(&mut self) -> Result<(), PipelineError> {
        let info = self.configured.ok_or(PipelineError::NotConfigured)?;
        let device = self.device()?;
        // Re-apply the negotiated format; another process may have changed it
        // since configure ran.
        let fourcc = match info.pixel_format {
            PixelFormat::Yuyv => FourCC::new(b"YUYV"),
            PixelFormat::Mjpeg => FourCC::new(b"MJPG"),
            PixelFormat::Rgb24 => FourCC::new(b"RGB3"),
        };
        device
            .set_format(&Format::new(info.width, info.height, fourcc))
            .map_err(PipelineError::Configure)?;

        let stop = Arc::new(AtomicBool::new(false));
        let (tx, rx) = mpsc::sync_channel(self.config.buffer_count as usize);
        let worker_stop = Arc::clone(&stop);
        let buffer_count = self.config.buffer_count;
        let handle = thread::Builder::new()
            .name("capture".to_string())
            .spawn(move || capture_loop(device, buffer_count, worker_stop, tx))
            .map_err(PipelineError::Configure)?;

        self.worker = Some(Worker {
            frames: rx,
            stop,
            handle,
        });
        info!("camera started ({}x{})", info.width, info.height);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), PipelineError> {
        if let Some(Worker {
            frames,
            stop,
            handle,
        }) = self.worker.take()
        {
            stop.store(true, Ordering::Release);
            // Dropping the receiver unblocks a worker waiting on a full
            // channel; the stop flag covers the rest.
            drop(frames);
            if handle.join().is_err() {
                warn!("capture worker panicked during stop");
            }
            info!("camera stopped");
        }
        Ok(())
    }

    fn teardown(&mut self) {
        if self.worker.is_some() {
            let _ = self.stop();
        }
        self.configured = None;
        debug!("pipeline torn down");
    }

    fn wait(&mut self) -> Result<CameraMessage, PipelineError> {
        if self.quit.load(Ordering::Acquire) {
            return Ok(CameraMessage::Quit);
        }
        let worker = self.worker.as_ref().ok_or(PipelineError::NotRunning)?;
        match worker.frames.recv_timeout(self.config.frame_timeout()) {
            Ok(frame) => Ok(CameraMessage::FrameReady(frame)),
            Err(RecvTimeoutError::Timeout) => {
                if self.quit.load(Ordering::Acquire) {
                    Ok(CameraMessage::Quit)
                } else {
                    Ok(CameraMessage::Timeout)
                }
            }
            Err(RecvTimeoutError::Disconnected) => Err(PipelineError::Disconnected),
        }
    }

    fn render_preview(&mut self, frame: &FrameBuffer) {
        // Display compositing is owned by the platform layer; pace the
        // stream and leave a trace so stalls show up in the logs.
        self.previewed += 1;
        trace!("viewfinder frame seq {}", frame.sequence);
        if self.previewed % 300 == 0 {
            debug!("viewfinder alive, {} frames presented", self.previewed);
        }
    }

    fn stream_info(&self) -> Result<StreamInfo, PipelineError> {
        self.configured.ok_or(PipelineError::NotConfigured)
    }

    fn camera_model(&self) -> &str {
        &self.model
    }

    fn save_jpeg(
        &mut self,
        frame: &FrameBuffer,
        info: &StreamInfo,
        path: &Path,
        options: &EncodeOptions,
    ) -> Result<(), PipelineError> {
        encode::save_jpeg(frame, info, path, options)
    }
}

/// Owns the device and its memory-mapped buffers for one streaming session.
fn capture_loop(
    device: Device,
    buffer_count: u32,
    stop: Arc<AtomicBool>,
    frames: SyncSender<FrameBuffer>,
) {
    let mut stream = match MmapStream::with_buffers(&device, Type::VideoCapture, buffer_count) {
        Ok(stream) => stream,
        Err(err) => {
            error!("failed to map capture buffers: {}", err);
            return;
        }
    };

    while !stop.load(Ordering::Acquire) {
        match stream.next() {
            Ok((data, meta)) => {
                let frame = FrameBuffer {
                    data: data.to_vec(),
                    sequence: meta.sequence,
                    timestamp_us: meta.timestamp.sec as i64 * 1_000_000
                        + meta.timestamp.usec as i64,
                };
                match frames.try_send(frame) {
                    Ok(()) => {}
                    // Consumer is busy (for example mid-unmount); preview
                    // frames are disposable.
                    Err(TrySendError::Full(_)) => {}
                    Err(TrySendError::Disconnected(_)) => break,
                }
            }
            Err(err) => {
                error!("capture stream error: {}", err);
                break;
            }
        }
    }
}
