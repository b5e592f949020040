//! Decoding of the ATA identity record.
//!
//! # Examples
//!
//! Read the model of a disk
//!
//! ```rust,no_run
//! # use diskinfo::{extensions::BlockFileExt, identity};
//! # use std::fs::File;
//!
//! let raw = File::open("/dev/sda").unwrap().identity().unwrap();
//! let id = identity::decode(raw.as_bytes()).unwrap();
//! println!("Model: {}, capabilities: {:?}", id.model(), id.capability_labels());
//! ```
//!
//! # Implementation
//!
//! The record is `struct hd_driveid` from `<linux/hdreg.h>`, read at the fixed
//! offsets of [`layout::LAYOUT`]. Integers are in host byte order, as the
//! kernel hands them over. Strings have already been byte swapped into
//! reading order by the kernel.
//!
//! Checksum and signature words are not validated.
use crate::error::IdentityError;
use std::fmt;

pub mod layout;
pub mod modes;

use self::{
    layout::{Field, IDENTITY_SIZE},
    modes::{Capability, DmaModes, InterfaceVersion, PioModes},
};

pub type Result<T, E = IdentityError> = std::result::Result<T, E>;

/// The raw identity record, exactly [`IDENTITY_SIZE`] bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct RawIdentity([u8; IDENTITY_SIZE]);

impl RawIdentity {
    pub fn new(bytes: [u8; IDENTITY_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; IDENTITY_SIZE] {
        &self.0
    }

    /// Decode this record. See [`decode`].
    pub fn decode(&self) -> IdentityRecord {
        IdentityRecord::from_raw(self)
    }
}

impl TryFrom<&[u8]> for RawIdentity {
    type Error = IdentityError;

    /// # Errors
    ///
    /// - [`IdentityError::InvalidBufferSize`] unless `buf` is exactly
    ///   [`IDENTITY_SIZE`] bytes.
    fn try_from(buf: &[u8]) -> Result<Self> {
        <[u8; IDENTITY_SIZE]>::try_from(buf)
            .map(Self)
            .map_err(|_| IdentityError::InvalidBufferSize(buf.len()))
    }
}

impl fmt::Debug for RawIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RawIdentity {{ ... }}")
    }
}

/// A decoded identity record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityRecord {
    serial: String,
    firmware: String,
    model: String,
    capability: u16,
    dma_modes: u16,
    pio_modes: u16,
    interface_version: u16,
    lba_sectors: u32,
    lba48_sectors: u64,
}

// Public
impl IdentityRecord {
    /// Serial number, without padding.
    pub fn serial(&self) -> &str {
        &self.serial
    }

    /// Firmware revision, without padding.
    pub fn firmware(&self) -> &str {
        &self.firmware
    }

    /// Model number, without padding.
    ///
    /// Spaces inside the model are kept.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Raw capability word. Unknown bits *are* preserved.
    pub fn capability(&self) -> u16 {
        self.capability
    }

    /// Raw multiword DMA mode word.
    pub fn dma_modes(&self) -> u16 {
        self.dma_modes
    }

    /// Raw advanced PIO mode word.
    pub fn pio_modes(&self) -> u16 {
        self.pio_modes
    }

    /// Raw interface version word.
    pub fn interface_version(&self) -> u16 {
        self.interface_version
    }

    /// Total addressable sectors, as reported for 28-bit commands.
    pub fn lba_sectors(&self) -> u32 {
        self.lba_sectors
    }

    /// Total addressable sectors, as reported for 48-bit commands.
    pub fn lba48_sectors(&self) -> u64 {
        self.lba48_sectors
    }

    pub fn capabilities(&self) -> Capability {
        Capability::from_word(self.capability)
    }

    /// Capability labels, e.g. `["DMA", "LBA"]`
    pub fn capability_labels(&self) -> Vec<&'static str> {
        self.capabilities().labels()
    }

    /// DMA mode labels, e.g. `["mdma0", "mdma1"]`
    pub fn dma_mode_labels(&self) -> Vec<&'static str> {
        DmaModes::from_word(self.dma_modes).labels()
    }

    /// PIO mode labels. Always starts with `["pio0", "pio1", "pio2"]`.
    pub fn pio_mode_labels(&self) -> Vec<&'static str> {
        PioModes::from_word(self.pio_modes).labels()
    }

    pub fn interface(&self) -> InterfaceVersion {
        InterfaceVersion::from_word(self.interface_version)
    }
}

// Private
impl IdentityRecord {
    fn from_raw(raw: &RawIdentity) -> Self {
        let buf = raw.as_bytes();
        // Scalar fields are no wider than their target types, see `layout`.
        Self {
            serial: text(&layout::SERIAL, buf),
            firmware: text(&layout::FIRMWARE, buf),
            model: text(&layout::MODEL, buf),
            capability: layout::CAPABILITY.scalar(buf) as u16,
            dma_modes: layout::DMA_MODES.scalar(buf) as u16,
            pio_modes: layout::PIO_MODES.scalar(buf) as u16,
            interface_version: layout::INTERFACE_VERSION.scalar(buf) as u16,
            lba_sectors: layout::LBA_CAPACITY.scalar(buf) as u32,
            lba48_sectors: layout::LBA_CAPACITY_2.scalar(buf),
        }
    }
}

impl From<&RawIdentity> for IdentityRecord {
    fn from(raw: &RawIdentity) -> Self {
        Self::from_raw(raw)
    }
}

/// Padding around identity strings.
///
/// Drives pad with spaces, unset fields are all zeros.
fn is_padding(b: &u8) -> bool {
    b.is_ascii_whitespace() || *b == 0
}

/// Decode a text field, stripping leading and trailing padding only.
fn text(field: &Field, buf: &[u8; IDENTITY_SIZE]) -> String {
    let bytes = field.bytes(buf);
    let start = bytes.iter().position(|b| !is_padding(b));
    let end = bytes.iter().rposition(|b| !is_padding(b));
    match (start, end) {
        (Some(start), Some(end)) => String::from_utf8_lossy(&bytes[start..=end]).into_owned(),
        _ => String::new(),
    }
}

/// Decode an identity record.
///
/// This is a pure function of `buf`.
///
/// # Errors
///
/// - [`IdentityError::InvalidBufferSize`] unless `buf` is exactly
///   [`IDENTITY_SIZE`] bytes. Nothing is decoded in that case.
pub fn decode(buf: &[u8]) -> Result<IdentityRecord> {
    RawIdentity::try_from(buf).map(|raw| raw.decode())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Identity record with the given fields set, everything else zero.
    fn record(
        serial: &str,
        model: &str,
        capability: u8,
        dma: u16,
        pio: u16,
        interface: u16,
    ) -> [u8; IDENTITY_SIZE] {
        let mut buf = [0u8; IDENTITY_SIZE];
        let mut put_text = |field: Field, s: &str| {
            let dst = &mut buf[field.offset..field.end()];
            dst.fill(b' ');
            dst[..s.len()].copy_from_slice(s.as_bytes());
        };
        put_text(layout::SERIAL, serial);
        put_text(layout::MODEL, model);
        put_text(layout::FIRMWARE, "1.0");
        buf[layout::CAPABILITY.offset] = capability;
        buf[126..128].copy_from_slice(&dma.to_ne_bytes());
        buf[128..130].copy_from_slice(&pio.to_ne_bytes());
        buf[162..164].copy_from_slice(&interface.to_ne_bytes());
        buf
    }

    #[test]
    fn decode_record() -> anyhow::Result<()> {
        let mut buf = record("WD-WCC6Y0123456", "WDC WD10EZEX-08WN4A0", 0xB, 0x7, 0x3, 0x7E);
        buf[120..124].copy_from_slice(&268_435_455u32.to_ne_bytes());
        buf[200..208].copy_from_slice(&1_953_525_168u64.to_ne_bytes());

        let id = decode(&buf)?;
        assert_eq!(id.serial(), "WD-WCC6Y0123456");
        assert_eq!(id.model(), "WDC WD10EZEX-08WN4A0");
        assert_eq!(id.firmware(), "1.0");
        assert_eq!(id.capability(), 0xB);
        assert_eq!(id.capability_labels(), ["DMA", "LBA", "IORDYsup"]);
        assert_eq!(id.dma_mode_labels(), ["mdma0", "mdma1", "mdma2"]);
        assert_eq!(id.pio_mode_labels(), ["pio0", "pio1", "pio2", "pio3", "pio4"]);
        assert_eq!(id.interface(), InterfaceVersion::Ata4Atapi);
        assert_eq!(id.lba_sectors(), 268_435_455);
        assert_eq!(id.lba48_sectors(), 1_953_525_168);
        Ok(())
    }

    #[test]
    fn wrong_size() {
        for len in [0, 1, 256, 511, 513, 1024] {
            let buf = vec![b' '; len];
            match decode(&buf) {
                Err(IdentityError::InvalidBufferSize(n)) => assert_eq!(n, len),
                other => panic!("length {} decoded to {:?}", len, other),
            }
        }
    }

    #[test]
    fn padding() -> anyhow::Result<()> {
        let id = decode(&record("", "  Model X  ", 0, 0, 0, 0))?;
        assert_eq!(id.model(), "Model X");
        assert_eq!(id.serial(), "");

        let id = decode(&record("", "Model  X", 0, 0, 0, 0))?;
        assert_eq!(id.model(), "Model  X");
        Ok(())
    }

    #[test]
    fn zeroed() -> anyhow::Result<()> {
        let id = decode(&[0; IDENTITY_SIZE])?;
        assert_eq!(id.model(), "");
        assert!(id.capability_labels().is_empty());
        assert!(id.dma_mode_labels().is_empty());
        assert_eq!(id.pio_mode_labels(), ["pio0", "pio1", "pio2"]);
        assert_eq!(id.interface().to_string(), "ATA-4");
        Ok(())
    }

    #[test]
    fn deterministic() -> anyhow::Result<()> {
        let buf = record("S1", "M1", 0x3, 0x2, 0x0, 0x0);
        let a = decode(&buf)?;
        let b = decode(&buf)?;
        assert_eq!(a, b);
        assert_eq!(a.capability_labels(), ["DMA", "LBA"]);
        assert_eq!(a.dma_mode_labels(), ["mdma1"]);
        Ok(())
    }
}
