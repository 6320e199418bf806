//! Live mount table inspection

use crate::MediaConfig;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

/// Read-side view of the removable volume.
///
/// Nothing is cached: the volume may appear or vanish between calls, so the
/// mount table is re-read on every lookup.
pub struct MediaStore {
    pub(crate) mount_table: PathBuf,
    pub(crate) marker: String,
    pub(crate) subdir: String,
}

impl MediaStore {
    pub fn new(config: &MediaConfig) -> Self {
        Self {
            mount_table: PathBuf::from(&config.mount_table),
            marker: config.mount_marker.clone(),
            subdir: config.capture_subdir.clone(),
        }
    }

    /// Mountpoint of the active removable volume, if any.
    ///
    /// When several volumes match, the last-listed entry wins: the most
    /// recently mounted one is taken to be the active target. An unreadable
    /// table reads as "nothing mounted".
    pub fn locate(&self) -> Option<PathBuf> {
        let table = fs::read_to_string(&self.mount_table).ok()?;
        let found = last_marked_mountpoint(&table, &self.marker);
        debug!("removable mount lookup: {:?}", found);
        found
    }
}

/// Mountpoint of the last "device mountpoint fstype opts ..." record whose
/// mountpoint contains `marker`.
fn last_marked_mountpoint(table: &str, marker: &str) -> Option<PathBuf> {
    let mut found = None;
    for line in table.lines() {
        let mut fields = line.split_whitespace();
        let _device = fields.next();
        if let Some(mountpoint) = fields.next() {
            if mountpoint.contains(marker) {
                found = Some(PathBuf::from(mountpoint));
            }
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Write;

    #[test]
    fn test_empty_table_has_no_mount() {
        assert_eq!(last_marked_mountpoint("", "/media/"), None);
    }

    #[test]
    fn test_no_matching_entry() {
        let table = "proc /proc proc rw,nosuid 0 0\n\
                     /dev/mmcblk0p2 / ext4 rw,noatime 0 0\n";
        assert_eq!(last_marked_mountpoint(table, "/media/"), None);
    }

    #[test]
    fn test_single_match() {
        let table = "/dev/mmcblk0p2 / ext4 rw,noatime 0 0\n\
                     /dev/sda1 /media/usb0 vfat rw,relatime 0 0\n";
        assert_eq!(
            last_marked_mountpoint(table, "/media/"),
            Some(PathBuf::from("/media/usb0"))
        );
    }

    #[test]
    fn test_last_match_wins() {
        let table = "/dev/sda1 /media/usb0 vfat rw 0 0\n\
                     /dev/sdb1 /media/usb1 vfat rw 0 0\n\
                     proc /proc proc rw 0 0\n";
        assert_eq!(
            last_marked_mountpoint(table, "/media/"),
            Some(PathBuf::from("/media/usb1"))
        );
    }

    #[test]
    fn test_marker_in_device_field_is_ignored() {
        let table = "/media/loop.img /mnt/loop ext4 rw 0 0\n";
        assert_eq!(last_marked_mountpoint(table, "/media/"), None);
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let table = "garbage\n\n/dev/sda1 /media/usb0 vfat rw 0 0\n";
        assert_eq!(
            last_marked_mountpoint(table, "/media/"),
            Some(PathBuf::from("/media/usb0"))
        );
    }

    #[test]
    fn test_unreadable_table_reads_as_unmounted() {
        let store = MediaStore::new(&MediaConfig {
            mount_table: "/nonexistent/mounts".to_string(),
            ..MediaConfig::default()
        });
        assert_eq!(store.locate(), None);
    }

    #[test]
    fn test_locate_reads_table_from_disk() {
        let mut table = tempfile::NamedTempFile::new().unwrap();
        writeln!(table, "/dev/sda1 /media/usb0 vfat rw,relatime 0 0").unwrap();
        let store = MediaStore::new(&MediaConfig {
            mount_table: table.path().display().to_string(),
            ..MediaConfig::default()
        });
        assert_eq!(store.locate(), Some(PathBuf::from("/media/usb0")));
    }

    proptest! {
        /// Tables whose mountpoints never carry the marker never locate.
        #[test]
        fn prop_unmarked_tables_never_locate(
            lines in prop::collection::vec("[a-z0-9/_.]{1,20} /(mnt|proc|sys|run)/[a-z0-9]{1,12} [a-z4]{3,5} rw 0 0", 0..16)
        ) {
            let table = lines.join("\n");
            prop_assert_eq!(last_marked_mountpoint(&table, "/media/"), None);
        }

        /// Appending a marked entry always makes it the result.
        #[test]
        fn prop_trailing_marked_entry_wins(
            lines in prop::collection::vec("[a-z0-9/_.]{1,20} /[a-z0-9/]{1,20} [a-z4]{3,5} rw 0 0", 0..16),
            name in "[a-z0-9]{1,10}"
        ) {
            let mountpoint = format!("/media/{}", name);
            let mut table = lines.join("\n");
            table.push_str(&format!("\n/dev/sda1 {} vfat rw 0 0", mountpoint));
            prop_assert_eq!(
                last_marked_mountpoint(&table, "/media/"),
                Some(PathBuf::from(mountpoint))
            );
        }
    }
}
