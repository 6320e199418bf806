//! Removable Media Lifecycle
//!
//! The appliance writes stills to whatever removable volume is currently
//! mounted. This crate locates that volume in the live mount table, derives
//! timestamped capture paths on it, and detaches it safely (sync, bounded
//! retries, forced fallback) when the user asks for an eject.

mod mounts;
mod naming;
mod unmount;

pub use mounts::MediaStore;
pub use unmount::{MountOps, SafeUnmounter, SysMountOps, UnmountPolicy};

use serde::{Deserialize, Serialize};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Media error types
#[derive(Debug, Error)]
pub enum MediaError {
    /// No mount-table entry matched the removable marker
    #[error("no removable volume is mounted")]
    NoRemovableMedia,

    /// The capture subdirectory could not be created on the volume
    #[error("failed to create capture directory {path}: {source}")]
    CreateDir { path: PathBuf, source: io::Error },

    /// The forced unmount fallback also failed
    #[error("forced unmount of {path} failed: {source}")]
    ForcedUnmount { path: PathBuf, source: io::Error },
}

/// Removable media configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Mount table to inspect
    pub mount_table: String,
    /// Marker segment identifying removable mountpoints
    pub mount_marker: String,
    /// Subdirectory for captured stills
    pub capture_subdir: String,
    /// Delay between unmount retries (ms)
    pub unmount_retry_ms: u64,
    /// Cumulative time before escalating to a forced unmount (ms)
    pub unmount_timeout_ms: u64,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            mount_table: "/proc/mounts".to_string(),
            mount_marker: "/media/".to_string(),
            capture_subdir: "micropiscope".to_string(),
            unmount_retry_ms: 1000,
            unmount_timeout_ms: 5000,
        }
    }
}

impl MediaConfig {
    /// Timing policy for the safe unmount service
    pub fn policy(&self) -> UnmountPolicy {
        UnmountPolicy {
            retry_backoff: std::time::Duration::from_millis(self.unmount_retry_ms),
            give_up_after: std::time::Duration::from_millis(self.unmount_timeout_ms),
        }
    }
}
