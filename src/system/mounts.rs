//! The mount table
//!
//! Each line of `/proc/mounts` is `source target fstype options freq passno`,
//! separated by whitespace. Whitespace and backslashes within a field are
//! written as 3 digit octal escapes, such as `\040` for a space.
//!
//! Lines that don't look like a mount are skipped, never an error.
use crate::{error::DeviceError, HostPaths};
use log::debug;
use std::{fs, path::PathBuf};

pub type Result<T, E = DeviceError> = std::result::Result<T, E>;

/// A single mount table record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountEntry {
    /// Mount source, usually a device path such as `/dev/sda1`
    pub source: String,

    /// Where it's mounted
    pub target: PathBuf,

    /// Filesystem type
    pub fstype: String,

    /// Mount options, empty if the line had none
    pub options: String,
}

impl MountEntry {
    /// Parse one mount table line.
    ///
    /// Returns [`None`] if the line has fewer than 3 fields, which covers
    /// blank lines, comments and other noise.
    pub fn parse(line: &str) -> Option<Self> {
        if line.trim_start().starts_with('#') {
            return None;
        }
        let mut fields = line.split_whitespace();
        let source = fields.next()?;
        let target = fields.next()?;
        let fstype = fields.next()?;
        let options = fields.next().unwrap_or_default();
        Some(Self {
            source: unescape(source),
            target: unescape(target).into(),
            fstype: unescape(fstype),
            options: options.into(),
        })
    }

    /// Whether this mount is backed by device `name`.
    ///
    /// Matches on the source containing `name`, so a disk also matches its
    /// partitions. `sda` matches `/dev/sda1`.
    pub fn is_backed_by(&self, name: &str) -> bool {
        !name.is_empty() && self.source.contains(name)
    }
}

/// Decode the octal escapes the kernel uses for mount table fields.
///
/// Anything that isn't a backslash followed by exactly 3 octal digits is left
/// alone.
pub fn unescape(field: &str) -> String {
    let bytes = field.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 3 < bytes.len() {
            let digits = &bytes[i + 1..i + 4];
            if digits.iter().all(|d| (b'0'..=b'7').contains(d)) {
                let v = digits
                    .iter()
                    .fold(0u32, |acc, d| acc * 8 + u32::from(d - b'0'));
                if let Ok(b) = u8::try_from(v) {
                    out.push(b);
                    i += 4;
                    continue;
                }
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Parse mount table `text`, skipping malformed lines.
pub fn parse_table(text: &str) -> Vec<MountEntry> {
    text.lines()
        .filter_map(|line| {
            let entry = MountEntry::parse(line);
            if entry.is_none() && !line.trim().is_empty() {
                debug!("Skipping mount table line {:?}", line);
            }
            entry
        })
        .collect()
}

/// Entries of mount table `text` backed by device `name`, in table order.
pub fn mount_points_in(text: &str, name: &str) -> Vec<MountEntry> {
    parse_table(text)
        .into_iter()
        .filter(|m| m.is_backed_by(name))
        .collect()
}

/// Mounts backed by device `name`, from the mount table in [`HostPaths`].
///
/// # Errors
///
/// - If the mount table can't be read
pub fn mount_points(paths: &HostPaths, name: &str) -> Result<Vec<MountEntry>> {
    let text = fs::read_to_string(&paths.mounts)
        .map_err(|e| DeviceError::from_io(paths.mounts.display().to_string(), e))?;
    Ok(mount_points_in(&text, name))
}
