//! Scripted pipeline for driving the event loop in tests

use crate::{
    CameraMessage, CameraPipeline, EncodeOptions, FrameBuffer, PipelineError, PixelFormat,
    StreamInfo,
};
use std::collections::VecDeque;
use std::io;
use std::path::{Path, PathBuf};

/// Everything the event loop did to the pipeline, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineCall {
    Open,
    ConfigureViewfinder,
    ConfigureStill,
    Start,
    Stop,
    Teardown,
    RenderPreview,
    SaveJpeg(PathBuf),
}

/// Replays a canned message script and records every call.
///
/// `wait` yields the scripted messages in order and Quit once the script is
/// exhausted, so every test run terminates.
#[derive(Debug, Default)]
pub struct ScriptedPipeline {
    script: VecDeque<Result<CameraMessage, PipelineError>>,
    pub calls: Vec<PipelineCall>,
    /// Make every save fail, for the failed-save recovery path
    pub fail_saves: bool,
}

impl ScriptedPipeline {
    pub fn new(script: Vec<Result<CameraMessage, PipelineError>>) -> Self {
        Self {
            script: script.into(),
            calls: Vec::new(),
            fail_saves: false,
        }
    }

    /// A frame with recognizable contents
    pub fn frame(sequence: u32) -> FrameBuffer {
        FrameBuffer {
            data: vec![128u8; 640 * 480 * 2],
            sequence,
            timestamp_us: sequence as i64 * 33_333,
        }
    }

    pub fn saved_paths(&self) -> Vec<&Path> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                PipelineCall::SaveJpeg(path) => Some(path.as_path()),
                _ => None,
            })
            .collect()
    }
}

impl CameraPipeline for ScriptedPipeline {
    fn open(&mut self) -> Result<(), PipelineError> {
        self.calls.push(PipelineCall::Open);
        Ok(())
    }

    fn configure_viewfinder(&mut self) -> Result<(), PipelineError> {
        self.calls.push(PipelineCall::ConfigureViewfinder);
        Ok(())
    }

    fn configure_still(&mut self) -> Result<(), PipelineError> {
        self.calls.push(PipelineCall::ConfigureStill);
        Ok(())
    }

    fn start(&mut self) -> Result<(), PipelineError> {
        self.calls.push(PipelineCall::Start);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), PipelineError> {
        self.calls.push(PipelineCall::Stop);
        Ok(())
    }

    fn teardown(&mut self) {
        self.calls.push(PipelineCall::Teardown);
    }

    fn wait(&mut self) -> Result<CameraMessage, PipelineError> {
        self.script.pop_front().unwrap_or(Ok(CameraMessage::Quit))
    }

    fn render_preview(&mut self, _frame: &FrameBuffer) {
        self.calls.push(PipelineCall::RenderPreview);
    }

    fn stream_info(&self) -> Result<StreamInfo, PipelineError> {
        Ok(StreamInfo {
            width: 640,
            height: 480,
            stride: 1280,
            pixel_format: PixelFormat::Yuyv,
        })
    }

    fn camera_model(&self) -> &str {
        "scripted"
    }

    fn save_jpeg(
        &mut self,
        _frame: &FrameBuffer,
        _info: &StreamInfo,
        path: &Path,
        _options: &EncodeOptions,
    ) -> Result<(), PipelineError> {
        self.calls.push(PipelineCall::SaveJpeg(path.to_path_buf()));
        if self.fail_saves {
            return Err(PipelineError::Save {
                path: path.to_path_buf(),
                source: image::ImageError::IoError(io::Error::new(
                    io::ErrorKind::Other,
                    "scripted save failure",
                )),
            });
        }
        Ok(())
    }
}
