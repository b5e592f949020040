//! Utility functions
use std::path::{Path, PathBuf};

/// Technically Linux requires sysfs to be at `/sys`, calling it a system
/// configuration error otherwise.
///
/// But our upcoming distro is planning to experiment with filesystem layout
/// changes, including of `/sys`, so do this to allow easily changing it.
pub const SYSFS_PATH: &str = "/sys";

/// Device file location. Same reasons as [`SYSFS_PATH`].
pub const DEV_PATH: &str = "/dev";

/// Mount table location.
///
/// `/etc/mtab` is a symlink to this on any modern system.
pub const MOUNTS_PATH: &str = "/proc/mounts";

/// udev database location.
pub const UDEV_DATA_PATH: &str = "/run/udev/data";

/// Unit of the sysfs `size` attribute, regardless of the devices actual
/// logical block size.
pub const SECTOR_SIZE: u64 = 512;

/// Where to find the host interfaces this crate reads.
///
/// [`Default`] is the real host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostPaths {
    /// sysfs root, normally `/sys`
    pub sysfs: PathBuf,

    /// Device files, normally `/dev`
    pub dev: PathBuf,

    /// The mount table, normally `/proc/mounts`
    pub mounts: PathBuf,

    /// udev database, normally `/run/udev/data`
    pub udev_data: PathBuf,
}

impl HostPaths {
    /// Host paths rooted under `root`, for chroots and testing.
    pub fn with_root<P: AsRef<Path>>(root: P) -> Self {
        let root = root.as_ref();
        let under = |p: &str| root.join(p.trim_start_matches('/'));
        Self {
            sysfs: under(SYSFS_PATH),
            dev: under(DEV_PATH),
            mounts: under(MOUNTS_PATH),
            udev_data: under(UDEV_DATA_PATH),
        }
    }
}

impl Default for HostPaths {
    fn default() -> Self {
        Self {
            sysfs: SYSFS_PATH.into(),
            dev: DEV_PATH.into(),
            mounts: MOUNTS_PATH.into(),
            udev_data: UDEV_DATA_PATH.into(),
        }
    }
}

/// Fake host tree used by tests.
#[cfg(test)]
pub(crate) fn test_host() -> HostPaths {
    HostPaths::with_root(Path::new(env!("CARGO_MANIFEST_DIR")).join("testdata"))
}

/// Fake host with a device missing its `dev` attribute, and one whose size
/// doesn't fit in bytes.
#[cfg(test)]
pub(crate) fn broken_host() -> HostPaths {
    HostPaths::with_root(Path::new(env!("CARGO_MANIFEST_DIR")).join("testdata/broken"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rooted() {
        let p = HostPaths::with_root("/mnt/target");
        assert_eq!(p.sysfs, Path::new("/mnt/target/sys"));
        assert_eq!(p.mounts, Path::new("/mnt/target/proc/mounts"));
        assert_eq!(p.udev_data, Path::new("/mnt/target/run/udev/data"));
        assert_eq!(HostPaths::with_root("/"), HostPaths::default());
    }
}
