//! System-level controls behind an injectable seam

use std::io;
use tracing::info;

/// Host power and disk-cache operations the event loop needs.
pub trait SystemControl {
    /// Flush buffered filesystem writes for every volume.
    fn sync_disks(&self);

    /// Ask the kernel to power the machine off. Does not return on success.
    fn power_off(&self) -> io::Result<()>;
}

/// Kernel-backed implementation
#[derive(Debug, Default, Clone, Copy)]
pub struct SysControl;

impl SystemControl for SysControl {
    fn sync_disks(&self) {
        // SAFETY: sync(2) takes no arguments and cannot fail.
        unsafe { libc::sync() };
    }

    fn power_off(&self) -> io::Result<()> {
        info!("issuing power-off request");
        // SAFETY: no pointers involved; the kernel validates the command.
        let rc = unsafe { libc::reboot(libc::LINUX_REBOOT_CMD_POWER_OFF) };
        if rc < 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(())
        }
    }
}
