//! Device metadata from the udev database.
//!
//! udev keeps one record per device in `/run/udev/data`, named after the
//! device type and number, `b8:0` for the block device `8:0`. Property lines
//! look like `E:KEY=VALUE`, other lines are links, tags and such.
//!
//! # Note
//!
//! The database format is internal to systemd and undocumented, though it has
//! been stable for a long time.
//!
//! Every property is optional. Missing records, or missing keys, are
//! reported as unknown, never as an error.
use crate::HostPaths;
use log::debug;
use std::{collections::HashMap, fs, io, path::Path};

/// Parse the properties of a udev database record.
///
/// Lines without the `E:` prefix, or without a `=`, are ignored.
pub fn parse_record(text: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in text.split_terminator('\n') {
        let line = match line.strip_prefix("E:") {
            Some(l) => l,
            None => continue,
        };
        if let Some((key, val)) = line.split_once('=') {
            map.insert(key.into(), val.into());
        }
    }
    map
}

/// Read the udev properties of block device `major:minor`.
///
/// # Errors
///
/// - If I/O does, except for a missing record, which is empty.
pub fn read_properties(
    paths: &HostPaths,
    major: u64,
    minor: u64,
) -> io::Result<HashMap<String, String>> {
    read_record(&paths.udev_data.join(format!("b{}:{}", major, minor)))
}

fn read_record(path: &Path) -> io::Result<HashMap<String, String>> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(parse_record(&text)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("No udev record at {}", path.display());
            Ok(HashMap::new())
        }
        Err(e) => Err(e),
    }
}

/// Whether the properties describe a whole disk that should be presented to
/// users.
///
/// This excludes optical drives, loop devices without udev data, and anything
/// udisks was told to hide.
pub fn is_presentable_disk(props: &HashMap<String, String>) -> bool {
    props.get("ID_TYPE").map(String::as_str) == Some("disk")
        && props.get("UDISKS_PRESENTATION_NOPOLICY").map(String::as_str) != Some("1")
}

/// Descriptive metadata about a device
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Vendor, with underscores replaced by spaces
    pub vendor: Option<String>,

    /// Model, as udev reports it
    pub model: Option<String>,

    /// Short serial if known, otherwise the full serial
    pub serial: Option<String>,

    /// Bus, upper-cased, e.g. `ATA` or `USB`
    pub bus: Option<String>,

    /// Firmware revision, upper-cased
    pub firmware_version: Option<String>,

    /// Partition table type, upper-cased, e.g. `GPT` or `DOS`
    pub table_type: Option<String>,
}

impl DeviceInfo {
    /// Build from udev properties. Empty values count as missing.
    pub fn from_properties(props: &HashMap<String, String>) -> Self {
        let get = |key: &str| props.get(key).filter(|v| !v.is_empty()).cloned();
        Self {
            vendor: get("ID_VENDOR").map(|v| v.replace('_', " ")),
            model: get("ID_MODEL"),
            serial: get("ID_SERIAL_SHORT").or_else(|| get("ID_SERIAL")),
            bus: get("ID_BUS").map(|v| v.to_uppercase()),
            firmware_version: get("ID_REVISION").map(|v| v.to_uppercase()),
            table_type: get("ID_PART_TABLE_TYPE").map(|v| v.to_uppercase()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::test_host;
    use anyhow::Result;

    #[test]
    fn record() {
        let props = parse_record("S:disk/by-id/ata-X\nE:ID_BUS=ata\nE:ID_FS_LABEL=a=b\nI:123\nE:BROKEN\n");
        assert_eq!(props.len(), 2);
        assert_eq!(props["ID_BUS"], "ata");
        assert_eq!(props["ID_FS_LABEL"], "a=b");
    }

    #[test]
    fn info() -> Result<()> {
        let props = read_properties(&test_host(), 8, 0)?;
        assert!(is_presentable_disk(&props));
        let info = DeviceInfo::from_properties(&props);
        assert_eq!(
            info,
            DeviceInfo {
                vendor: Some("Western Digital".into()),
                model: Some("WDC_WD10EZEX-08WN4A0".into()),
                serial: Some("WD-WCC6Y0123456".into()),
                bus: Some("ATA".into()),
                firmware_version: Some("01.01A01".into()),
                table_type: Some("GPT".into()),
            }
        );
        Ok(())
    }

    #[test]
    fn serial_fallback() -> Result<()> {
        let info = DeviceInfo::from_properties(&read_properties(&test_host(), 8, 16)?);
        assert_eq!(info.serial.as_deref(), Some("Generic_Flash_Disk_1234"));
        assert_eq!(info.vendor, None);
        assert_eq!(info.table_type, None);
        Ok(())
    }

    #[test]
    fn missing_record() -> Result<()> {
        let props = read_properties(&test_host(), 7, 0)?;
        assert!(props.is_empty());
        assert!(!is_presentable_disk(&props));
        assert_eq!(DeviceInfo::from_properties(&props), DeviceInfo::default());
        Ok(())
    }

    #[test]
    fn not_a_disk() -> Result<()> {
        assert!(!is_presentable_disk(&read_properties(&test_host(), 11, 0)?));

        let mut props = HashMap::new();
        props.insert("ID_TYPE".to_owned(), "disk".to_owned());
        assert!(is_presentable_disk(&props));
        props.insert("UDISKS_PRESENTATION_NOPOLICY".to_owned(), "1".to_owned());
        assert!(!is_presentable_disk(&props));
        Ok(())
    }
}
