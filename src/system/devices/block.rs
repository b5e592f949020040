//! Interfaces common to Block devices
//!
//! See [stable/sysfs-block][1] and [testing/sysfs-block][2]
//!
//! [1]: https://www.kernel.org/doc/Documentation/ABI/stable/sysfs-block
//! [2]: https://www.kernel.org/doc/Documentation/ABI/testing/sysfs-block
use crate::{error::DeviceError, util::SECTOR_SIZE, HostPaths};
use log::warn;
use std::{
    fs,
    fs::DirEntry,
    path::{Path, PathBuf},
};

pub type Result<T, E = DeviceError> = std::result::Result<T, E>;

/// Read a sysfs attribute, classifying failures against `path`.
fn read_attr(path: &Path, attr: &str) -> Result<String> {
    let path = path.join(attr);
    fs::read_to_string(&path).map_err(|e| DeviceError::from_io(path.display().to_string(), e))
}

/// Parse the undocumented `dev` device attribute.
///
/// This seems to be formatted as `major:minor\n`
///
/// # Errors
///
/// - I/O
/// - Unexpected format
fn parse_dev(path: &Path) -> Result<(u64, u64)> {
    let i = read_attr(path, "dev")?;
    let invalid = || DeviceError::Invalid(format!("{}/dev: {:?}", path.display(), i.trim()));
    let mut it = i.trim().split(':');
    //
    let major = it.next().ok_or_else(invalid)?;
    let minor = it.next().ok_or_else(invalid)?;
    //
    let major = major.parse::<u64>().map_err(|_| invalid())?;
    let minor = minor.parse::<u64>().map_err(|_| invalid())?;
    //
    Ok((major, minor))
}

fn dev_size(path: &Path) -> Result<u64> {
    let size = read_attr(path, "size")?;
    size.trim()
        .parse::<u64>()
        .ok()
        // Per [this][1] forgotten 2015 patch, this is in 512 byte sectors.
        // [1]: https://lore.kernel.org/lkml/1451154995-4686-1-git-send-email-peter@lekensteyn.nl/
        .and_then(|b| b.checked_mul(SECTOR_SIZE))
        .ok_or_else(|| DeviceError::Invalid(format!("{}/size: {:?}", path.display(), size.trim())))
}

fn kernel_name(path: &Path) -> Result<String> {
    path.file_name()
        .and_then(|s| s.to_str())
        .map(Into::into)
        .ok_or_else(|| DeviceError::Invalid(path.display().to_string()))
}

/// Size of block device `name`, in bytes.
///
/// Read from the `size` attribute in sysfs, which is always in 512 byte
/// sectors regardless of the devices logical block size.
///
/// # Errors
///
/// - [`DeviceError::NotFound`] if the device doesn't exist, or was removed.
/// - [`DeviceError::PermissionDenied`]
/// - [`DeviceError::Invalid`] if the attribute isn't an integer.
pub fn block_device_size_bytes(paths: &HostPaths, name: &str) -> Result<u64> {
    dev_size(&paths.sysfs.join("block").join(name))
}

/// A Block Device
#[derive(Debug, Clone)]
pub struct Block {
    /// Kernel name
    name: String,

    /// Full path to the device in sysfs.
    path: PathBuf,

    /// Major device number. Read from the undocumented `dev` file.
    major: u64,

    /// Minor device number. Read from the undocumented `dev` file.
    minor: u64,
}

// Public
impl Block {
    /// Get connected Block Devices, sorted by name.
    ///
    /// For devices with partitions, their partitions are **not** returned by
    /// this method. You can get partitions using [`Block::partitions`]
    ///
    /// A device that disappears while listing, or whose `dev` attribute is
    /// unreadable, is logged and left out.
    ///
    /// # Errors
    ///
    /// - If the block device directories can't be listed
    pub fn get_connected(paths: &HostPaths) -> Result<Vec<Self>> {
        let sysfs = &paths.sysfs;
        let mut devices = Vec::new();
        // Per linux sysfs-rules, if /sys/subsystem exists, class should be ignored.
        // If it doesn't exist, both places need scanning.
        let mut dirs = vec![sysfs.join("subsystem/block/devices")];
        if !dirs[0].exists() {
            dirs = vec![sysfs.join("class/block"), sysfs.join("block")];
        }
        for dir in dirs {
            if !dir.exists() {
                continue;
            }
            let entries = dir
                .read_dir()
                .map_err(|e| DeviceError::from_io(dir.display().to_string(), e))?;
            for dev in entries {
                let dev: DirEntry = dev.map_err(DeviceError::Io)?;
                let path = dev.path();
                // Skip partitions. Note that this attribute is undocumented.
                if !path.is_dir() || path.join("partition").exists() {
                    continue;
                }
                match Self::new(path) {
                    Ok(block) => devices.push(block),
                    Err(e) => warn!("Skipping block device {}: {}", dev.file_name().to_string_lossy(), e),
                }
            }
        }
        devices.sort_unstable_by(|a, b| a.name.cmp(&b.name));
        devices.dedup_by(|a, b| a.name == b.name);
        Ok(devices)
    }

    /// Open block device `name` from sysfs
    ///
    /// # Errors
    ///
    /// - [`DeviceError::NotFound`] if it doesn't exist
    /// - [`DeviceError::Invalid`] if it's a partition or has no `dev`
    ///   attribute.
    pub fn from_name(paths: &HostPaths, name: &str) -> Result<Self> {
        let path = paths.sysfs.join("block").join(name);
        if !path.exists() {
            return Err(DeviceError::NotFound(name.into()));
        }
        if path.join("partition").exists() {
            return Err(DeviceError::Invalid(format!("{} is a partition", name)));
        }
        Self::new(path)
    }

    /// Kernel name, e.g. `sda`
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path to the block device in sysfs.
    ///
    /// You normally shouldn't need this, but it could be useful if
    /// you want to manually access information not exposed by this crate.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get this devices partitions, if any, sorted by name.
    ///
    /// # Errors
    ///
    /// - If I/O does
    pub fn partitions(&self) -> Result<Vec<Partition>> {
        let mut devices = Vec::new();
        let entries = fs::read_dir(&self.path).map_err(|e| DeviceError::from_io(&self.name, e))?;
        for dir in entries {
            let dir: DirEntry = dir.map_err(DeviceError::Io)?;
            let path = dir.path();
            if !path.is_dir() || !path.join("partition").exists() {
                continue;
            }
            devices.push(Partition::new(path)?);
        }
        devices.sort_unstable_by(|a, b| a.name.cmp(&b.name));
        Ok(devices)
    }

    /// Open the device special file in [`HostPaths::dev`] associated with
    /// this block device.
    ///
    /// The device file is opened read-only, which is enough for queries.
    ///
    /// # Errors
    ///
    /// - [`DeviceError::NotFound`] if it doesn't exist
    /// - [`DeviceError::PermissionDenied`]
    pub fn open(&self, paths: &HostPaths) -> Result<fs::File> {
        let path = paths.dev.join(&self.name);
        fs::File::open(&path).map_err(|e| DeviceError::from_io(path.display().to_string(), e))
    }

    /// Device major number
    pub fn major(&self) -> u64 {
        self.major
    }

    /// Device minor number
    pub fn minor(&self) -> u64 {
        self.minor
    }

    /// Get the byte size of the device, if possible.
    pub fn size(&self) -> Result<u64> {
        dev_size(&self.path)
    }
}

// Private
impl Block {
    fn new(path: PathBuf) -> Result<Self> {
        let (major, minor) = parse_dev(&path)?;
        Ok(Self {
            name: kernel_name(&path)?,
            path,
            major,
            minor,
        })
    }
}

/// A partition of a [`Block`] device
#[derive(Debug, Clone)]
pub struct Partition {
    name: String,
    path: PathBuf,
}

impl Partition {
    fn new(path: PathBuf) -> Result<Self> {
        Ok(Self {
            name: kernel_name(&path)?,
            path,
        })
    }

    /// Kernel name, e.g. `sda1`
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Size of the partition, in bytes.
    pub fn size(&self) -> Result<u64> {
        dev_size(&self.path)
    }
}
