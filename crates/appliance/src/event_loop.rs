//! The viewfinder / still-capture state machine

use crate::system::SystemControl;
use crate::ApplianceError;
use camera_pipeline::{CameraMessage, CameraPipeline, EncodeOptions, FrameBuffer};
use keypad::PendingActions;
use removable_media::{MediaStore, MountOps, SafeUnmounter};
use std::sync::Arc;
use tracing::{error, info};

/// Which stream the camera is configured for; mirrors the pipeline setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapturePhase {
    Viewfinder,
    StillCapture,
}

/// Why the loop returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// The platform asked us to quit
    Quit,
    /// A confirmed power-hold ran the shutdown sequence
    PowerOff,
}

/// Event loop state and collaborators.
///
/// Pipeline messages and the pending-action flags are the only inputs; every
/// transition happens on this thread, so the interrupt path never blocks on
/// camera or mount I/O.
pub struct Appliance<P, O, S>
where
    P: CameraPipeline,
    O: MountOps,
    S: SystemControl,
{
    pipeline: P,
    actions: Arc<PendingActions>,
    media: MediaStore,
    unmounter: SafeUnmounter<O>,
    system: S,
    encode: EncodeOptions,
    phase: CapturePhase,
}

impl<P, O, S> Appliance<P, O, S>
where
    P: CameraPipeline,
    O: MountOps,
    S: SystemControl,
{
    pub fn new(
        pipeline: P,
        actions: Arc<PendingActions>,
        media: MediaStore,
        unmounter: SafeUnmounter<O>,
        system: S,
        encode: EncodeOptions,
    ) -> Self {
        Self {
            pipeline,
            actions,
            media,
            unmounter,
            system,
            encode,
            phase: CapturePhase::Viewfinder,
        }
    }

    pub fn phase(&self) -> CapturePhase {
        self.phase
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    /// Open and start the camera, then consume pipeline messages until quit,
    /// shutdown, or a fatal pipeline fault.
    pub fn run(&mut self) -> Result<LoopExit, ApplianceError> {
        self.pipeline.open()?;
        self.pipeline.configure_viewfinder()?;
        self.pipeline.start()?;

        loop {
            match self.pipeline.wait()? {
                CameraMessage::Timeout => {
                    error!("device timeout detected, attempting a restart");
                    self.pipeline.stop()?;
                    self.pipeline.start()?;
                }
                CameraMessage::Quit => {
                    info!("quit requested, leaving event loop");
                    return Ok(LoopExit::Quit);
                }
                CameraMessage::FrameReady(frame) => match self.phase {
                    CapturePhase::Viewfinder => {
                        if let Some(exit) = self.on_viewfinder_frame(frame)? {
                            return Ok(exit);
                        }
                    }
                    CapturePhase::StillCapture => self.on_still_frame(frame)?,
                },
            }
        }
    }

    fn on_viewfinder_frame(
        &mut self,
        frame: FrameBuffer,
    ) -> Result<Option<LoopExit>, ApplianceError> {
        if self.actions.take_capture() {
            info!("switching to still capture");
            self.pipeline.stop()?;
            self.pipeline.teardown();
            self.pipeline.configure_still()?;
            self.pipeline.start()?;
            self.phase = CapturePhase::StillCapture;
        } else if self.actions.take_shutdown() {
            self.pipeline.stop()?;
            self.pipeline.teardown();
            info!("shutting down");
            self.system.sync_disks();
            if let Err(err) = self.system.power_off() {
                error!("power-off request failed: {}", err);
            }
            return Ok(Some(LoopExit::PowerOff));
        } else if self.actions.take_eject() {
            self.eject();
        } else {
            self.pipeline.render_preview(&frame);
        }
        Ok(None)
    }

    /// Still frame arrived: save it (best effort), then return to preview.
    fn on_still_frame(&mut self, frame: FrameBuffer) -> Result<(), ApplianceError> {
        self.pipeline.stop()?;
        info!(
            "still capture image received from {}",
            self.pipeline.camera_model()
        );

        match self.media.image_path() {
            Ok(path) => {
                let info = self.pipeline.stream_info()?;
                if let Err(err) = self.pipeline.save_jpeg(&frame, &info, &path, &self.encode) {
                    error!("failed to save still: {}", err);
                }
            }
            Err(err) => error!("cannot save image, no mounted drive: {}", err),
        }

        // Back to preview regardless of the save outcome.
        self.pipeline.teardown();
        self.pipeline.configure_viewfinder()?;
        self.pipeline.start()?;
        self.phase = CapturePhase::Viewfinder;
        Ok(())
    }

    /// Detach the removable volume. Runs on the loop thread so interrupt
    /// delivery never waits on unmount I/O.
    fn eject(&self) {
        match self.media.locate() {
            Some(mount) => {
                if let Err(err) = self.unmounter.unmount(&mount) {
                    error!("failed to unmount {}: {}", mount.display(), err);
                }
            }
            None => error!("cannot eject, no removable volume mounted"),
        }
    }
}
