//! Timestamped capture paths on the mounted volume

use crate::mounts::MediaStore;
use crate::MediaError;
use chrono::{DateTime, Local};
use std::fs;
use std::path::PathBuf;
use tracing::info;

impl MediaStore {
    /// Output path for the next still, creating the capture directory on the
    /// volume if it is absent.
    ///
    /// Second-resolution timestamps mean two captures within the same second
    /// share a path; captures are user-gated, so the later one wins.
    pub fn image_path(&self) -> Result<PathBuf, MediaError> {
        self.image_path_at(Local::now())
    }

    /// Deterministic variant of [`MediaStore::image_path`].
    pub fn image_path_at(&self, at: DateTime<Local>) -> Result<PathBuf, MediaError> {
        let mount = self.locate().ok_or(MediaError::NoRemovableMedia)?;
        let dir = mount.join(&self.subdir);
        if !dir.is_dir() {
            fs::create_dir(&dir).map_err(|source| MediaError::CreateDir {
                path: dir.clone(),
                source,
            })?;
        }
        let path = dir.join(format!("{}.jpg", at.format("%Y-%m-%d-%H-%M-%S")));
        info!("saving image at {}", path.display());
        Ok(path)
    }
}
