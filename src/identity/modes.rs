//! Capability and transfer mode bitmasks of the identity record.
//!
//! Labels are always produced in the fixed order of the tables here, so
//! decoding the same word twice gives the same output.
//!
//! Unknown bits are never an error, they just have no label.
use bitflags::bitflags;
use displaydoc::Display;

bitflags! {
    /// Flags corresponding to [`IdentityRecord::capability`].
    ///
    /// [`IdentityRecord::capability`]: super::IdentityRecord::capability
    pub struct Capability: u16 {
        /// DMA supported
        const DMA = 0x1;

        /// LBA supported
        const LBA = 0x2;

        /// IORDY can be disabled
        const IORDY_SW = 0x4;

        /// IORDY supported
        const IORDY_SUP = 0x8;
    }
}

bitflags! {
    /// Flags corresponding to [`IdentityRecord::dma_modes`].
    ///
    /// [`IdentityRecord::dma_modes`]: super::IdentityRecord::dma_modes
    pub struct DmaModes: u16 {
        const MDMA0 = 0x1;
        const MDMA1 = 0x2;
        const MDMA2 = 0x4;
    }
}

bitflags! {
    /// Flags corresponding to [`IdentityRecord::pio_modes`].
    ///
    /// Modes 0 through 2 have no flag, every device supports them.
    ///
    /// [`IdentityRecord::pio_modes`]: super::IdentityRecord::pio_modes
    pub struct PioModes: u16 {
        const PIO3 = 0x1;
        const PIO4 = 0x2;
    }
}

/// Labelled [`Capability`] flags, in output order.
///
/// [`Capability::IORDY_SW`] is intentionally absent.
pub const CAPABILITY_LABELS: &[(Capability, &str)] = &[
    (Capability::DMA, "DMA"),
    (Capability::LBA, "LBA"),
    (Capability::IORDY_SUP, "IORDYsup"),
];

/// Labelled [`DmaModes`] flags, in output order.
pub const DMA_LABELS: &[(DmaModes, &str)] = &[
    (DmaModes::MDMA0, "mdma0"),
    (DmaModes::MDMA1, "mdma1"),
    (DmaModes::MDMA2, "mdma2"),
];

/// PIO modes every device supports.
pub const BASE_PIO_LABELS: &[&str] = &["pio0", "pio1", "pio2"];

/// Labelled [`PioModes`] flags, in output order, after [`BASE_PIO_LABELS`].
pub const PIO_LABELS: &[(PioModes, &str)] = &[(PioModes::PIO3, "pio3"), (PioModes::PIO4, "pio4")];

fn labels<T: Copy>(table: &[(T, &'static str)], set: impl Fn(T) -> bool) -> Vec<&'static str> {
    table
        .iter()
        .filter(|(flag, _)| set(*flag))
        .map(|(_, label)| *label)
        .collect()
}

impl Capability {
    /// Capability word with unknown bits dropped
    pub const fn from_word(word: u16) -> Self {
        Self::from_bits_truncate(word)
    }

    /// Labels of the set flags, in [`CAPABILITY_LABELS`] order.
    pub fn labels(self) -> Vec<&'static str> {
        labels(CAPABILITY_LABELS, |f| self.contains(f))
    }
}

impl DmaModes {
    /// DMA mode word with unknown bits dropped
    pub const fn from_word(word: u16) -> Self {
        Self::from_bits_truncate(word)
    }

    /// Labels of the set flags, in [`DMA_LABELS`] order.
    pub fn labels(self) -> Vec<&'static str> {
        labels(DMA_LABELS, |f| self.contains(f))
    }
}

impl PioModes {
    /// PIO mode word with unknown bits dropped
    pub const fn from_word(word: u16) -> Self {
        Self::from_bits_truncate(word)
    }

    /// [`BASE_PIO_LABELS`], followed by the labels of the set flags.
    pub fn labels(self) -> Vec<&'static str> {
        let mut v = BASE_PIO_LABELS.to_vec();
        v.extend(labels(PIO_LABELS, |f| self.contains(f)));
        v
    }
}

/// Primary interface generation.
///
/// Nothing older or newer is distinguished.
#[derive(Debug, Display, Copy, Clone, PartialEq, Eq)]
pub enum InterfaceVersion {
    /// ATA-4
    Ata4,

    /// ATA-4/ATAPI+
    Ata4Atapi,
}

impl InterfaceVersion {
    /// Bits that mark a newer interface.
    pub const NEWER_MASK: u16 = 0xFC;

    pub const fn from_word(word: u16) -> Self {
        if word & Self::NEWER_MASK != 0 {
            Self::Ata4Atapi
        } else {
            Self::Ata4
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capability() {
        assert_eq!(Capability::from_word(0x3).labels(), ["DMA", "LBA"]);
        assert_eq!(Capability::from_word(0xF).labels(), ["DMA", "LBA", "IORDYsup"]);
        assert_eq!(Capability::from_word(0x8).labels(), ["IORDYsup"]);
        assert!(Capability::from_word(0x0).labels().is_empty());
    }

    #[test]
    fn capability_mask_is_invisible() {
        // Masking with 0xB only hides IORDY_SW, which has no label.
        for word in 0..=0xFFu16 {
            assert_eq!(
                Capability::from_word(word).labels(),
                Capability::from_word(word & 0xB).labels()
            );
        }
    }

    #[test]
    fn capability_stable() {
        let word = 0xB;
        let a = Capability::from_word(word).labels();
        let b = Capability::from_word(word).labels();
        assert_eq!(a, b);
        assert_eq!(a, ["DMA", "LBA", "IORDYsup"]);
    }

    #[test]
    fn unknown_bits_ignored() {
        assert_eq!(Capability::from_word(0xF0 | 0x1).labels(), ["DMA"]);
        assert_eq!(DmaModes::from_word(0xFF00 | 0x4).labels(), ["mdma2"]);
        assert_eq!(PioModes::from_word(0xFFFC).labels(), ["pio0", "pio1", "pio2"]);
    }

    #[test]
    fn dma() {
        assert_eq!(DmaModes::from_word(0x7).labels(), ["mdma0", "mdma1", "mdma2"]);
        assert_eq!(DmaModes::from_word(0x5).labels(), ["mdma0", "mdma2"]);
        assert!(DmaModes::from_word(0).labels().is_empty());
    }

    #[test]
    fn pio() {
        assert_eq!(
            PioModes::from_word(0x3).labels(),
            ["pio0", "pio1", "pio2", "pio3", "pio4"]
        );
        assert_eq!(PioModes::from_word(0x2).labels(), ["pio0", "pio1", "pio2", "pio4"]);
        assert_eq!(PioModes::from_word(0x0).labels(), ["pio0", "pio1", "pio2"]);
    }

    #[test]
    fn interface() {
        assert_eq!(InterfaceVersion::from_word(0x04), InterfaceVersion::Ata4Atapi);
        assert_eq!(InterfaceVersion::from_word(0x00), InterfaceVersion::Ata4);
        assert_eq!(InterfaceVersion::from_word(0x03), InterfaceVersion::Ata4);
        assert_eq!(InterfaceVersion::from_word(0x80).to_string(), "ATA-4/ATAPI+");
        assert_eq!(InterfaceVersion::Ata4.to_string(), "ATA-4");
    }
}
