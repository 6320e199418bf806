//! Safe unmount with bounded retries and forced fallback

use crate::MediaError;
use std::ffi::CString;
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Raw mount-table operations, injectable so tests run without root.
pub trait MountOps {
    /// Flush buffered writes for all filesystems.
    fn sync_disks(&self);

    /// Clean unmount.
    fn unmount(&self, target: &Path) -> io::Result<()>;

    /// Unmount ignoring outstanding references. Risks in-flight writes.
    fn unmount_forced(&self, target: &Path) -> io::Result<()>;
}

/// Timing knobs for the retry loop
#[derive(Debug, Clone, Copy)]
pub struct UnmountPolicy {
    /// Delay between clean unmount attempts
    pub retry_backoff: Duration,
    /// Cumulative elapsed time after which the next attempt is forced
    pub give_up_after: Duration,
}

impl Default for UnmountPolicy {
    fn default() -> Self {
        Self {
            retry_backoff: Duration::from_secs(1),
            give_up_after: Duration::from_secs(5),
        }
    }
}

/// Detaches a volume without tearing data: sync first, retry the clean
/// unmount with fixed backoff, and once the deadline passes escalate to a
/// single forced unmount.
///
/// Blocks the calling thread for up to the deadline plus one forced attempt;
/// call it from the main loop, never from interrupt delivery.
pub struct SafeUnmounter<O: MountOps> {
    ops: O,
    policy: UnmountPolicy,
}

impl<O: MountOps> SafeUnmounter<O> {
    pub fn new(ops: O, policy: UnmountPolicy) -> Self {
        Self { ops, policy }
    }

    /// Unmount `target`, escalating to a forced unmount after the deadline.
    pub fn unmount(&self, target: &Path) -> Result<(), MediaError> {
        // A clean unmount right after physical writes can race unflushed
        // cache data; flush everything first.
        self.ops.sync_disks();

        let start = Instant::now();
        loop {
            if start.elapsed() > self.policy.give_up_after {
                warn!("attempting to force unmount {}", target.display());
                return match self.ops.unmount_forced(target) {
                    Ok(()) => {
                        info!("force-unmounted {}", target.display());
                        Ok(())
                    }
                    Err(source) => Err(MediaError::ForcedUnmount {
                        path: target.to_path_buf(),
                        source,
                    }),
                };
            }

            match self.ops.unmount(target) {
                Ok(()) => {
                    info!("unmounted {}", target.display());
                    return Ok(());
                }
                Err(err) => {
                    warn!("re-attempting to unmount device: {}", err);
                    thread::sleep(self.policy.retry_backoff);
                }
            }
        }
    }
}

/// Kernel-backed mount operations
#[derive(Debug, Default, Clone, Copy)]
pub struct SysMountOps;

impl SysMountOps {
    fn target_cstr(target: &Path) -> io::Result<CString> {
        CString::new(target.as_os_str().as_bytes())
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "mount path contains NUL"))
    }
}

impl MountOps for SysMountOps {
    fn sync_disks(&self) {
        // SAFETY: sync(2) takes no arguments and cannot fail.
        unsafe { libc::sync() };
    }

    fn unmount(&self, target: &Path) -> io::Result<()> {
        let path = Self::target_cstr(target)?;
        // SAFETY: path is a valid NUL-terminated string for the duration of
        // the call.
        let rc = unsafe { libc::umount(path.as_ptr()) };
        if rc < 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(())
        }
    }

    fn unmount_forced(&self, target: &Path) -> io::Result<()> {
        let path = Self::target_cstr(target)?;
        // SAFETY: as above. MNT_FORCE detaches even with open references.
        let rc = unsafe { libc::umount2(path.as_ptr(), libc::MNT_FORCE) };
        if rc < 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::path::PathBuf;

    /// Fails clean unmounts with EBUSY a configurable number of times.
    struct BusyOps {
        clean_failures: u32,
        forced_fails: bool,
        clean_attempts: Cell<u32>,
        forced_attempts: Cell<u32>,
        synced: Cell<bool>,
    }

    impl BusyOps {
        fn new(clean_failures: u32, forced_fails: bool) -> Self {
            Self {
                clean_failures,
                forced_fails,
                clean_attempts: Cell::new(0),
                forced_attempts: Cell::new(0),
                synced: Cell::new(false),
            }
        }

        fn busy() -> io::Error {
            io::Error::from_raw_os_error(libc::EBUSY)
        }
    }

    impl MountOps for &BusyOps {
        fn sync_disks(&self) {
            self.synced.set(true);
        }

        fn unmount(&self, _target: &Path) -> io::Result<()> {
            let attempt = self.clean_attempts.get() + 1;
            self.clean_attempts.set(attempt);
            if attempt <= self.clean_failures {
                Err(BusyOps::busy())
            } else {
                Ok(())
            }
        }

        fn unmount_forced(&self, _target: &Path) -> io::Result<()> {
            self.forced_attempts.set(self.forced_attempts.get() + 1);
            if self.forced_fails {
                Err(BusyOps::busy())
            } else {
                Ok(())
            }
        }
    }

    fn quick_policy() -> UnmountPolicy {
        UnmountPolicy {
            retry_backoff: Duration::from_millis(200),
            give_up_after: Duration::from_millis(450),
        }
    }

    fn target() -> PathBuf {
        PathBuf::from("/media/usb0")
    }

    #[test]
    fn test_first_attempt_succeeds_without_retry() {
        let ops = BusyOps::new(0, false);
        let unmounter = SafeUnmounter::new(&ops, quick_policy());
        unmounter.unmount(&target()).unwrap();
        assert_eq!(ops.clean_attempts.get(), 1);
        assert_eq!(ops.forced_attempts.get(), 0);
        assert!(ops.synced.get());
    }

    #[test]
    fn test_busy_device_retries_then_succeeds() {
        let ops = BusyOps::new(1, false);
        let unmounter = SafeUnmounter::new(&ops, quick_policy());
        unmounter.unmount(&target()).unwrap();
        assert_eq!(ops.clean_attempts.get(), 2);
        assert_eq!(ops.forced_attempts.get(), 0);
    }

    #[test]
    fn test_deadline_escalates_to_single_forced_unmount() {
        // Clean attempts land at ~0ms, ~200ms, ~400ms; the next wakeup is
        // past the 450ms deadline and becomes the one forced attempt.
        let ops = BusyOps::new(u32::MAX, false);
        let unmounter = SafeUnmounter::new(&ops, quick_policy());
        unmounter.unmount(&target()).unwrap();
        assert_eq!(ops.clean_attempts.get(), 3);
        assert_eq!(ops.forced_attempts.get(), 1);
    }

    #[test]
    fn test_failed_forced_unmount_is_reported() {
        let ops = BusyOps::new(u32::MAX, true);
        let unmounter = SafeUnmounter::new(&ops, quick_policy());
        let err = unmounter.unmount(&target()).unwrap_err();
        assert!(matches!(err, MediaError::ForcedUnmount { .. }));
        assert_eq!(ops.forced_attempts.get(), 1);
    }
}
