//! Capacity of block devices.
//!
//! The total size of a device comes from sysfs, see
//! [`block_device_size_bytes`]. Free space can only be known for mounted
//! filesystems, and comes from `statvfs(3)` on each mount backed by the
//! device.
//!
//! Everything is computed in bytes, using integers. Conversion to fractional
//! units is left to whoever displays it.
use crate::{
    error::DeviceError,
    system::{
        devices::block::block_device_size_bytes,
        mounts::{mount_points, MountEntry},
    },
    HostPaths,
};
use log::{debug, warn};
use nix::sys::statvfs::statvfs;
use std::{collections::HashSet, io, path::Path};

pub type Result<T, E = DeviceError> = std::result::Result<T, E>;

/// Filesystem statistics, in blocks of `block_size` bytes.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct FsStat {
    pub block_size: u64,

    pub blocks: u64,

    /// Free blocks, including those reserved for root
    pub blocks_free: u64,

    /// Free blocks available to unprivileged users
    pub blocks_available: u64,
}

/// Byte counts saturate at [`u64::MAX`] instead of overflowing.
impl FsStat {
    /// Filesystem size, in bytes
    pub fn total_bytes(&self) -> u64 {
        self.block_size.saturating_mul(self.blocks)
    }

    /// Free bytes, including those reserved for root
    pub fn free_bytes(&self) -> u64 {
        self.block_size.saturating_mul(self.blocks_free)
    }

    /// Free bytes available to unprivileged users
    pub fn available_bytes(&self) -> u64 {
        self.block_size.saturating_mul(self.blocks_available)
    }

    /// Bytes not available to unprivileged users, which includes reserved
    /// blocks.
    pub fn used_bytes(&self) -> u64 {
        self.block_size
            .saturating_mul(self.blocks.saturating_sub(self.blocks_available))
    }
}

/// Source of filesystem statistics
pub trait FsStats {
    /// Statistics of the filesystem mounted at `path`
    fn stat(&self, path: &Path) -> io::Result<FsStat>;
}

impl<T: FsStats + ?Sized> FsStats for &T {
    fn stat(&self, path: &Path) -> io::Result<FsStat> {
        (**self).stat(path)
    }
}

/// Filesystem statistics from `statvfs(3)`
#[derive(Debug, Copy, Clone, Default)]
pub struct Statvfs;

impl FsStats for Statvfs {
    #[allow(clippy::unnecessary_cast)]
    fn stat(&self, path: &Path) -> io::Result<FsStat> {
        let s = statvfs(path)?;
        // Block counts are in units of the fragment size, not `f_bsize`.
        // They're the same on Linux for every filesystem that matters.
        Ok(FsStat {
            block_size: s.fragment_size() as u64,
            blocks: s.blocks() as u64,
            blocks_free: s.blocks_free() as u64,
            blocks_available: s.blocks_available() as u64,
        })
    }
}

/// Usage of one mounted filesystem
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountUsage {
    pub mount: MountEntry,
    pub stat: FsStat,
}

/// Capacity of a block device, in bytes.
///
/// When the device has mounted filesystems,
/// `used_bytes + free_bytes == total_bytes`. Space in unmounted regions,
/// such as swap or unallocated space, counts as used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapacityReport {
    /// Size of the whole device, from sysfs.
    pub total_bytes: u64,

    /// `total_bytes - free_bytes`, or [`None`] if nothing is mounted.
    pub used_bytes: Option<u64>,

    /// Free bytes across every mounted filesystem, including root reserved
    /// blocks. [`None`] if nothing is mounted.
    pub free_bytes: Option<u64>,

    /// Free bytes available to unprivileged users across every mounted
    /// filesystem. [`None`] if nothing is mounted.
    pub available_bytes: Option<u64>,

    /// Each mount that contributed, in mount table order.
    pub mounts: Vec<MountUsage>,
}

impl CapacityReport {
    /// Build a report from the device size and the usage of its mounts.
    ///
    /// A source mounted more than once, such as with bind mounts, only counts
    /// once towards free space.
    pub fn new(total_bytes: u64, mounts: Vec<MountUsage>) -> Self {
        if mounts.is_empty() {
            return Self {
                total_bytes,
                used_bytes: None,
                free_bytes: None,
                available_bytes: None,
                mounts,
            };
        }
        let (free, available) = {
            let mut seen = HashSet::new();
            mounts
                .iter()
                .filter(|m| seen.insert(m.mount.source.as_str()))
                .fold((0u64, 0u64), |(free, available), m| {
                    (
                        free.saturating_add(m.stat.free_bytes()),
                        available.saturating_add(m.stat.available_bytes()),
                    )
                })
        };
        // Can only exceed the total if sysfs and the filesystems disagree.
        let free = free.min(total_bytes);
        Self {
            total_bytes,
            used_bytes: Some(total_bytes - free),
            free_bytes: Some(free),
            available_bytes: Some(available.min(free)),
            mounts,
        }
    }
}

/// Computes [`CapacityReport`]s
#[derive(Debug, Clone)]
pub struct CapacityReporter<'a, S> {
    paths: &'a HostPaths,
    stats: S,
}

impl<'a, S: FsStats> CapacityReporter<'a, S> {
    pub fn new(paths: &'a HostPaths, stats: S) -> Self {
        Self { paths, stats }
    }

    /// Mounts backed by device `name`. See [`mount_points`].
    pub fn mount_points(&self, name: &str) -> Result<Vec<MountEntry>> {
        mount_points(self.paths, name)
    }

    /// Size of device `name`. See [`block_device_size_bytes`].
    pub fn block_device_size_bytes(&self, name: &str) -> Result<u64> {
        block_device_size_bytes(self.paths, name)
    }

    /// Capacity of device `name`, such as `sda`.
    ///
    /// Mounts whose statistics can't be read are left out, and logged.
    ///
    /// # Errors
    ///
    /// - If the device size can't be read, such as when the device was
    ///   removed.
    /// - If the mount table can't be read.
    pub fn report(&self, name: &str) -> Result<CapacityReport> {
        let total = self.block_device_size_bytes(name)?;
        let mut mounts = Vec::new();
        for mount in self.mount_points(name)? {
            match self.stats.stat(&mount.target) {
                Ok(stat) => mounts.push(MountUsage { mount, stat }),
                Err(e) => warn!(
                    "Couldn't stat {} for {}: {}",
                    mount.target.display(),
                    name,
                    e
                ),
            }
        }
        let report = CapacityReport::new(total, mounts);
        debug!(
            "{}: total {} used {:?} free {:?}",
            name, report.total_bytes, report.used_bytes, report.free_bytes
        );
        Ok(report)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::util::test_host;
    use anyhow::Result;
    use std::{collections::HashMap, path::PathBuf};

    /// Statistics for fixed paths, anything else is not found.
    #[derive(Debug, Clone, Default)]
    pub(crate) struct FakeStats(pub HashMap<PathBuf, FsStat>);

    impl FsStats for FakeStats {
        fn stat(&self, path: &Path) -> io::Result<FsStat> {
            self.0
                .get(path)
                .copied()
                .ok_or_else(|| io::ErrorKind::NotFound.into())
        }
    }

    fn stat(blocks: u64, free: u64, available: u64) -> FsStat {
        FsStat {
            block_size: 4096,
            blocks,
            blocks_free: free,
            blocks_available: available,
        }
    }

    /// Statistics matching the mounts in `testdata`
    pub(crate) fn host_stats() -> FakeStats {
        let mut map = HashMap::new();
        map.insert("/".into(), stat(50_000, 20_000, 18_000));
        map.insert("/mnt/my disk".into(), stat(40_000, 30_000, 29_000));
        map.insert("/srv/bind".into(), stat(50_000, 20_000, 18_000));
        FakeStats(map)
    }

    #[test]
    fn fs_stat() {
        let s = stat(100, 30, 20);
        assert_eq!(s.total_bytes(), 409_600);
        assert_eq!(s.free_bytes(), 122_880);
        assert_eq!(s.available_bytes(), 81_920);
        assert_eq!(s.used_bytes(), 327_680);
        assert_eq!(s.used_bytes() + s.available_bytes(), s.total_bytes());
    }

    #[test]
    fn report() -> Result<()> {
        let host = test_host();
        let r = CapacityReporter::new(&host, host_stats()).report("sda")?;
        assert_eq!(r.total_bytes, 512_000_000);
        // The bind mount of sda1 is only counted once.
        assert_eq!(r.mounts.len(), 3);
        assert_eq!(r.free_bytes, Some(4096 * (20_000 + 30_000)));
        assert_eq!(r.available_bytes, Some(4096 * (18_000 + 29_000)));
        assert_eq!(r.used_bytes, Some(512_000_000 - 204_800_000));
        assert_eq!(r.used_bytes.zip(r.free_bytes).map(|(u, f)| u + f), Some(r.total_bytes));
        Ok(())
    }

    #[test]
    fn unmounted() -> Result<()> {
        let host = test_host();
        let r = CapacityReporter::new(&host, host_stats()).report("sdb")?;
        assert_eq!(r.total_bytes, 1_048_576);
        assert_eq!(r.used_bytes, None);
        assert_eq!(r.free_bytes, None);
        assert!(r.mounts.is_empty());
        Ok(())
    }

    #[test]
    fn stat_failure_skipped() -> Result<()> {
        let host = test_host();
        let mut stats = host_stats();
        stats.0.remove(Path::new("/mnt/my disk"));
        let r = CapacityReporter::new(&host, stats).report("sda")?;
        assert_eq!(r.mounts.len(), 2);
        assert_eq!(r.free_bytes, Some(4096 * 20_000));
        Ok(())
    }

    #[test]
    fn missing_device() {
        let host = test_host();
        let e = CapacityReporter::new(&host, host_stats())
            .report("sdz")
            .unwrap_err();
        assert!(matches!(e, DeviceError::NotFound(_)), "{:?}", e);
    }

    #[test]
    fn missing_mount_table() {
        let mut host = test_host();
        host.mounts = host.mounts.with_file_name("nonexistent");
        let e = CapacityReporter::new(&host, host_stats())
            .report("sda")
            .unwrap_err();
        assert!(matches!(e, DeviceError::NotFound(_)), "{:?}", e);
    }

    #[test]
    fn free_clamped() {
        let mount = MountEntry::parse("/dev/sdc1 /big ext4 rw").unwrap();
        let r = CapacityReport::new(
            1024,
            vec![MountUsage {
                mount,
                stat: stat(10, 10, 10),
            }],
        );
        assert_eq!(r.free_bytes, Some(1024));
        assert_eq!(r.used_bytes, Some(0));
    }

    #[test]
    fn huge_filesystems_saturate() {
        let huge = FsStat {
            block_size: 1 << 20,
            blocks: u64::MAX,
            blocks_free: u64::MAX,
            blocks_available: u64::MAX / 2,
        };
        assert_eq!(huge.total_bytes(), u64::MAX);
        assert_eq!(huge.free_bytes(), u64::MAX);
        assert_eq!(huge.available_bytes(), u64::MAX);

        let usage = |src: &str| MountUsage {
            mount: MountEntry::parse(&format!("{} /mnt ext4 rw", src)).unwrap(),
            stat: huge,
        };
        let r = CapacityReport::new(u64::MAX, vec![usage("/dev/sdc1"), usage("/dev/sdc2")]);
        assert_eq!(r.free_bytes, Some(u64::MAX));
        assert_eq!(r.available_bytes, Some(u64::MAX));
        assert_eq!(r.used_bytes, Some(0));
    }
}
