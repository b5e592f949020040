//! Querying devices for everything this crate knows about them.
//!
//! A failure on one device never stops the others. Each [`DeviceReport`]
//! carries its own errors, so a device with no identity data can be told
//! apart from one that couldn't be queried.
//!
//! # Examples
//!
//! ```rust,no_run
//! # use diskinfo::{query::{scan, ScanOptions}, system::capacity::Statvfs, HostPaths};
//!
//! for dev in scan(&HostPaths::default(), Statvfs, &ScanOptions::default()).unwrap() {
//!     match &dev.capacity {
//!         Ok(c) => println!("{}: {} bytes, {:?} free", dev.name, c.total_bytes, c.free_bytes),
//!         Err(e) => println!("{}: {}", dev.name, e),
//!     }
//! }
//! ```
use crate::{
    error::{DeviceError, IdentityError},
    extensions::BlockFileExt,
    identity::IdentityRecord,
    system::{
        capacity::{CapacityReport, CapacityReporter, FsStats},
        devices::block::{Block, Partition},
        udev::{is_presentable_disk, read_properties, DeviceInfo},
    },
    HostPaths,
};
use log::{debug, warn};

pub type Result<T, E = DeviceError> = std::result::Result<T, E>;

/// What [`scan`] and [`query`] do
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ScanOptions {
    /// Query the ATA identity record.
    ///
    /// This opens the device and usually requires root.
    pub identity: bool,

    /// Only report devices udev calls disks, see
    /// [`is_presentable_disk`]. Ignored by [`query`].
    pub disks_only: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            identity: false,
            disks_only: true,
        }
    }
}

/// Everything known about a single device
#[derive(Debug)]
pub struct DeviceReport {
    /// Kernel name, e.g. `sda`
    pub name: String,

    /// udev metadata. Unknown fields are [`None`].
    pub info: DeviceInfo,

    pub capacity: Result<CapacityReport>,

    /// Partitions, sorted by name. Empty if they couldn't be listed.
    pub partitions: Vec<Partition>,

    /// [`None`] if not requested.
    pub identity: Option<Result<IdentityRecord>>,
}

impl DeviceReport {
    /// Errors this device had, if any.
    pub fn errors(&self) -> impl Iterator<Item = &DeviceError> {
        self.capacity
            .as_ref()
            .err()
            .into_iter()
            .chain(self.identity.as_ref().and_then(|i| i.as_ref().err()))
    }
}

fn read_identity(paths: &HostPaths, block: &Block) -> Result<IdentityRecord> {
    let file = block.open(paths)?;
    let raw = file.identity().map_err(IdentityError::from)?;
    Ok(raw.decode())
}

fn report_for<S: FsStats>(
    paths: &HostPaths,
    reporter: &CapacityReporter<S>,
    block: &Block,
    info: DeviceInfo,
    options: &ScanOptions,
) -> DeviceReport {
    let name = block.name();
    let capacity = reporter.report(name);
    if let Err(e) = &capacity {
        warn!("Couldn't get capacity of {}: {}", name, e);
    }
    let partitions = block.partitions().unwrap_or_else(|e| {
        warn!("Couldn't list partitions of {}: {}", name, e);
        Vec::new()
    });
    let identity = options.identity.then(|| {
        let id = read_identity(paths, block);
        if let Err(e) = &id {
            warn!("Couldn't get identity of {}: {}", name, e);
        }
        id
    });
    DeviceReport {
        name: name.into(),
        info,
        capacity,
        partitions,
        identity,
    }
}

fn device_info(paths: &HostPaths, block: &Block) -> (DeviceInfo, bool) {
    match read_properties(paths, block.major(), block.minor()) {
        Ok(props) => (DeviceInfo::from_properties(&props), is_presentable_disk(&props)),
        Err(e) => {
            warn!("Couldn't read udev data for {}: {}", block.name(), e);
            (DeviceInfo::default(), false)
        }
    }
}

/// Query a single block device by name, such as `sda`.
///
/// # Errors
///
/// - If `name` is not a block device. Anything that goes wrong after that is
///   in the [`DeviceReport`].
pub fn query<S: FsStats>(
    paths: &HostPaths,
    stats: S,
    name: &str,
    options: &ScanOptions,
) -> Result<DeviceReport> {
    let block = Block::from_name(paths, name)?;
    let (info, _) = device_info(paths, &block);
    let reporter = CapacityReporter::new(paths, stats);
    Ok(report_for(paths, &reporter, &block, info, options))
}

/// Query every connected block device, sorted by name.
///
/// Partitions are not reported separately, they are listed in [`DeviceReport::partitions`].
///
/// # Errors
///
/// - If the devices can't be listed. Per-device failures are in each
///   [`DeviceReport`].
pub fn scan<S: FsStats>(
    paths: &HostPaths,
    stats: S,
    options: &ScanOptions,
) -> Result<Vec<DeviceReport>> {
    let reporter = CapacityReporter::new(paths, stats);
    let mut reports = Vec::new();
    for block in Block::get_connected(paths)? {
        let (info, disk) = device_info(paths, &block);
        if options.disks_only && !disk {
            debug!("Skipping {}, not a disk", block.name());
            continue;
        }
        reports.push(report_for(paths, &reporter, &block, info, options));
    }
    Ok(reports)
}
