//! This module provides ways to get information about a running Linux system
//!
//! Everything here reads the host through a [`crate::HostPaths`], and keeps no
//! state between calls.

pub mod capacity;
pub mod devices;
pub mod mounts;
pub mod udev;
