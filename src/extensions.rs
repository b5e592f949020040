//! Linux-specific extensions to std types
use std::{
    fs::File,
    io,
    os::unix::{fs::FileTypeExt, io::AsRawFd},
};

use crate::identity::{layout::IDENTITY_SIZE, RawIdentity};

/// Internal ioctl stuff
mod _impl {
    use nix::ioctl_read_bad;

    use crate::identity::layout::IDENTITY_SIZE;

    ioctl_read_bad!(
        /// The `HDIO_GET_IDENTITY` ioctl, defined in
        /// <linux/hdreg.h>
        ///
        /// Not defined with `_IOR`, the number is a bare legacy constant.
        hdio_get_identity,
        0x030d,
        [u8; IDENTITY_SIZE]
    );
}

/// Internal implementation details
mod imp {
    use rustix::fd::AsFd;
    use std::fs::File;

    pub trait FileExtSeal: AsFd {}

    impl FileExtSeal for File {}
}

/// Extends [`File`] with block device queries
///
/// This trait is sealed
pub trait BlockFileExt: imp::FileExtSeal {
    /// Read the raw ATA identity record of the device.
    ///
    /// Decode it with [`crate::identity::decode`] or [`RawIdentity::decode`].
    ///
    /// # Implementation
    ///
    /// This uses the `HDIO_GET_IDENTITY` ioctl, which usually requires
    /// `CAP_SYS_ADMIN`. Opening the device read-only is enough.
    ///
    /// # Errors
    ///
    /// - If `self` is not a block device
    /// - If the underlying ioctl does, for example because the device is not
    ///   ATA or ATAPI.
    fn identity(&self) -> io::Result<RawIdentity>;
}

impl BlockFileExt for File {
    fn identity(&self) -> io::Result<RawIdentity> {
        if !self.metadata()?.file_type().is_block_device() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "File was not a block device",
            ));
        }
        let mut buf = [0u8; IDENTITY_SIZE];
        match unsafe { _impl::hdio_get_identity(self.as_raw_fd(), &mut buf) } {
            Ok(_) => Ok(RawIdentity::new(buf)),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_block_device() -> anyhow::Result<()> {
        let f = File::open(env!("CARGO_MANIFEST_DIR").to_owned() + "/Cargo.toml")?;
        let e = f.identity().unwrap_err();
        assert_eq!(e.kind(), io::ErrorKind::InvalidInput);
        Ok(())
    }
}
