//! Mount table inspection
//!
//! Resolves the filesystem type of the mount containing a path by matching
//! device ids against the system mount table, the way `getmntent` walks
//! `/proc/mounts`. Only used to validate SD card storage before handing it
//! to the daemon as a data root.

use std::fs;
use std::io;
use std::os::unix::fs::MetadataExt;
use std::path::Path;

/// Filesystem type of the mount holding `path`, or `None` when no mount
/// table entry shares the path's device.
pub fn filesystem_of_path(path: &Path, mount_table: &Path) -> io::Result<Option<String>> {
    let device = fs::metadata(path)?.dev();
    let table = fs::read_to_string(mount_table)?;

    for line in table.lines() {
        let mut fields = line.split_whitespace();
        let (Some(_source), Some(mount_dir), Some(fs_type)) =
            (fields.next(), fields.next(), fields.next())
        else {
            continue;
        };

        // Mount points may be gone by the time we stat them.
        let Ok(meta) = fs::metadata(unescape(mount_dir)) else {
            continue;
        };
        if meta.dev() == device {
            return Ok(Some(fs_type.to_string()));
        }
    }

    Ok(None)
}

/// Undo the octal escaping the kernel applies to whitespace in mount paths
/// (`\040` for space, `\011` tab, `\012` newline, `\134` backslash).
fn unescape(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut chars = field.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let digits: String = chars.by_ref().take(3).collect();
        match u8::from_str_radix(&digits, 8) {
            Ok(byte) => out.push(byte as char),
            Err(_) => {
                out.push(c);
                out.push_str(&digits);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn unescape_decodes_kernel_octal_escapes() {
        assert_eq!(unescape(r"/mnt/sd\040card"), "/mnt/sd card");
        assert_eq!(unescape(r"/plain/path"), "/plain/path");
        assert_eq!(unescape(r"/odd\x"), r"/odd\x");
    }

    #[test]
    fn resolves_type_from_a_matching_mount_entry() {
        // The temp dir lives on the same device as itself, so an entry
        // naming it as a mount point matches by device id.
        let dir = tempfile::tempdir().unwrap();
        let mut table = NamedTempFile::new().unwrap();
        writeln!(table, "/dev/mmcblk0p1 {} ext4 rw,relatime 0 0", dir.path().display()).unwrap();

        let fs_type = filesystem_of_path(dir.path(), table.path()).unwrap();
        assert_eq!(fs_type.as_deref(), Some("ext4"));
    }

    #[test]
    fn unmatched_device_yields_none() {
        let dir = tempfile::tempdir().unwrap();
        let mut table = NamedTempFile::new().unwrap();
        // No entry shares a device with the temp dir.
        writeln!(table, "/dev/null /nonexistent-mount-dir vfat rw 0 0").unwrap();

        let fs_type = filesystem_of_path(dir.path(), table.path()).unwrap();
        assert_eq!(fs_type, None);
    }

    #[test]
    fn missing_path_is_an_error() {
        let table = NamedTempFile::new().unwrap();
        assert!(filesystem_of_path(Path::new("/no/such/path"), table.path()).is_err());
    }
}
