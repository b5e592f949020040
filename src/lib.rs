//! Identity and capacity information for Linux block devices
//!
//! # Implementation details
//!
//! Identity information comes from the `HDIO_GET_IDENTITY` ioctl, which
//! returns the 512 byte `struct hd_driveid` from `<linux/hdreg.h>`.
//! See [`identity`] for how that record is decoded.
//!
//! Capacity information comes from files in `/sys` and `/proc`, and
//! `statvfs(3)` on any mounted filesystem, so this library requires them to
//! exist.
//!
//! Device metadata, such as vendor and bus, is read from the udev database in
//! `/run/udev/data`. Missing metadata is reported as unknown, never as an
//! error.
//!
//! Most of these interfaces are undocumented, and some may change between
//! kernel versions. Every function that reads the host takes a [`HostPaths`],
//! so they can be pointed somewhere else entirely.
#![doc(html_root_url = "https://docs.rs/diskinfo/0.1.0")]

pub mod error;
pub mod extensions;
pub mod identity;
pub mod query;

pub mod system;
mod util;

pub use util::{HostPaths, SECTOR_SIZE};
