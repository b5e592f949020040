//! Byte layout of the identity record.
//!
//! This is `struct hd_driveid` from `<linux/hdreg.h>`, as returned by
//! `HDIO_GET_IDENTITY`, written out as an ordered table of fields.
//!
//! Only the fields this crate decodes are named individually, the rest are
//! kept as runs so the table still covers every byte. [`check`] verifies at
//! compile time that the table is contiguous, naturally aligned, and exactly
//! [`IDENTITY_SIZE`] bytes. The kernel struct is packed only by virtue of its
//! field order, so any gap here would mean the table is wrong.
use static_assertions::const_assert;

/// Size of `struct hd_driveid`, in bytes.
pub const IDENTITY_SIZE: usize = 512;

/// Kind of a [`Field`]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Kind {
    /// Unsigned 8 bit integer
    Byte,

    /// Unsigned 16 bit integer, host byte order
    Word,

    /// Unsigned 32 bit integer, host byte order
    DWord,

    /// Unsigned 64 bit integer, host byte order
    QWord,

    /// Fixed length ASCII string, padded
    Text(usize),
}

impl Kind {
    /// Width of one element of this kind, in bytes.
    pub const fn width(self) -> usize {
        match self {
            Kind::Byte => 1,
            Kind::Word => 2,
            Kind::DWord => 4,
            Kind::QWord => 8,
            Kind::Text(len) => len,
        }
    }
}

/// One entry of the [`LAYOUT`] table.
///
/// `count` elements of `kind` starting at byte `offset`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub offset: usize,
    pub count: usize,
    pub kind: Kind,
}

impl Field {
    const fn new(name: &'static str, offset: usize, count: usize, kind: Kind) -> Self {
        Self {
            name,
            offset,
            count,
            kind,
        }
    }

    /// Total width of this field, in bytes.
    pub const fn width(&self) -> usize {
        self.count * self.kind.width()
    }

    /// Offset one past the last byte of this field.
    pub const fn end(&self) -> usize {
        self.offset + self.width()
    }

    /// Raw bytes of this field within `buf`.
    pub fn bytes<'a>(&self, buf: &'a [u8; IDENTITY_SIZE]) -> &'a [u8] {
        &buf[self.offset..self.end()]
    }

    /// Value of the first element of a scalar field, widened to [`u64`].
    ///
    /// # Panics
    ///
    /// - If this is a [`Kind::Text`] field.
    pub(crate) fn scalar(&self, buf: &[u8; IDENTITY_SIZE]) -> u64 {
        let b = &buf[self.offset..];
        match self.kind {
            Kind::Byte => b[0].into(),
            Kind::Word => u16::from_ne_bytes([b[0], b[1]]).into(),
            Kind::DWord => u32::from_ne_bytes([b[0], b[1], b[2], b[3]]).into(),
            Kind::QWord => {
                let mut q = [0; 8];
                q.copy_from_slice(&b[..8]);
                u64::from_ne_bytes(q)
            }
            Kind::Text(_) => unreachable!("{} is not a scalar field", self.name),
        }
    }
}

/// Serial number, word 10
pub const SERIAL: Field = Field::new("serial_no", 20, 1, Kind::Text(20));

/// Firmware revision, word 23
pub const FIRMWARE: Field = Field::new("fw_rev", 46, 1, Kind::Text(8));

/// Model number, word 27
pub const MODEL: Field = Field::new("model", 54, 1, Kind::Text(40));

/// Capability byte, the upper byte of word 49
pub const CAPABILITY: Field = Field::new("capability", 99, 1, Kind::Byte);

/// Total addressable sectors, words 60-61
pub const LBA_CAPACITY: Field = Field::new("lba_capacity", 120, 1, Kind::DWord);

/// Multiword DMA modes, word 63
pub const DMA_MODES: Field = Field::new("dma_mword", 126, 1, Kind::Word);

/// Advanced PIO modes, word 64
pub const PIO_MODES: Field = Field::new("eide_pio_modes", 128, 1, Kind::Word);

/// Interface version, word 81
pub const INTERFACE_VERSION: Field = Field::new("minor_rev_num", 162, 1, Kind::Word);

/// Total addressable sectors for 48-bit commands, words 100-103
pub const LBA_CAPACITY_2: Field = Field::new("lba_capacity_2", 200, 1, Kind::QWord);

/// The full record, in order.
pub const LAYOUT: &[Field] = &[
    Field::new("words0_9", 0, 10, Kind::Word),
    SERIAL,
    Field::new("words20_22", 40, 3, Kind::Word),
    FIRMWARE,
    MODEL,
    Field::new("max_multsect", 94, 2, Kind::Byte),
    Field::new("dword_io", 96, 1, Kind::Word),
    Field::new("vendor4", 98, 1, Kind::Byte),
    CAPABILITY,
    Field::new("reserved50", 100, 1, Kind::Word),
    Field::new("timing", 102, 4, Kind::Byte),
    Field::new("words53_58", 106, 6, Kind::Word),
    Field::new("multsect", 118, 2, Kind::Byte),
    LBA_CAPACITY,
    Field::new("dma_1word", 124, 1, Kind::Word),
    DMA_MODES,
    PIO_MODES,
    Field::new("words65_80", 130, 16, Kind::Word),
    INTERFACE_VERSION,
    Field::new("words82_97", 164, 16, Kind::Word),
    Field::new("spg", 196, 1, Kind::DWord),
    LBA_CAPACITY_2,
    Field::new("words104_255", 208, 152, Kind::Word),
];

/// Sum of every field width in `layout`.
pub const fn total_width(layout: &[Field]) -> usize {
    let mut total = 0;
    let mut i = 0;
    while i < layout.len() {
        total += layout[i].width();
        i += 1;
    }
    total
}

/// Whether `layout` describes exactly [`IDENTITY_SIZE`] bytes, with every
/// field starting where the previous one ended and every integer naturally
/// aligned.
pub const fn check(layout: &[Field]) -> bool {
    let mut end = 0;
    let mut i = 0;
    while i < layout.len() {
        let field = &layout[i];
        if field.offset != end {
            return false;
        }
        if !matches!(field.kind, Kind::Text(_)) && field.offset % field.kind.width() != 0 {
            return false;
        }
        end = field.end();
        i += 1;
    }
    end == IDENTITY_SIZE && total_width(layout) == IDENTITY_SIZE
}

const_assert!(check(LAYOUT));
