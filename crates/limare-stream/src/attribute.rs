//! Attribute tables (`SATT`).
//!
//! Same shape as the uniform table, with a 12-byte table start (no `space_needed`) and a
//! 16-byte data record (no `index`).

use core::fmt::Write as _;

use crate::error::StreamError;
use crate::reader::{ChunkLayout, StreamReader};
use crate::table::{checked_count, read_entries, DataRecord, Entry};
use crate::tag::Tag;

/// Size in bytes of the untagged attribute data record.
pub const ATTRIBUTE_DATA_LEN: usize = 0x10;

const ATTRIBUTE_TABLE_START_LEN: usize = 12;

/// The fixed-layout data record of an attribute entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AttributeData {
    /// Type code (0x00).
    pub ty: u8,
    /// Flags byte (0x01).
    pub flags: u8,
    /// Number of elements (0x02).
    pub element_count: u16,
    /// Size of one element in bytes (0x04).
    pub element_size: u16,
    /// Array length; `0` means a single entry (0x06).
    pub entry_count: u16,
    /// Stride between array entries (0x08).
    pub stride: u16,
    /// Unknown (0x0A).
    pub reserved_0a: u8,
    /// Precision qualifier (0x0B).
    pub precision: u8,
    /// Unknown (0x0C).
    pub reserved_0c: u16,
    /// Attribute offset as assigned by the compiler (0x0E).
    pub offset: u16,
}

impl AttributeData {
    /// Total byte size of one entry (`element_count * element_size`).
    pub fn byte_size(&self) -> u32 {
        u32::from(self.element_count) * u32::from(self.element_size)
    }
}

impl DataRecord for AttributeData {
    const LEN: usize = ATTRIBUTE_DATA_LEN;

    fn decode(r: &mut StreamReader<'_>) -> Result<Self, StreamError> {
        let record = r.read_bytes(Self::LEN, "attribute data record")?;
        let mut f = StreamReader::new(record);
        Ok(AttributeData {
            ty: f.read_u8("type")?,
            flags: f.read_u8("flags")?,
            element_count: f.read_u16_le("element_count")?,
            element_size: f.read_u16_le("element_size")?,
            entry_count: f.read_u16_le("entry_count")?,
            stride: f.read_u16_le("stride")?,
            reserved_0a: f.read_u8("reserved_0a")?,
            precision: f.read_u8("precision")?,
            reserved_0c: f.read_u16_le("reserved_0c")?,
            offset: f.read_u16_le("offset")?,
        })
    }
}

/// A raw attribute entry.
pub type AttributeEntry<'a> = Entry<'a, AttributeData>;

/// A parsed attribute table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeTable<'a> {
    /// Size field of the `SATT` chunk, kept verbatim.
    pub declared_size: i32,
    /// Number of attributes declared by the table start.
    pub count: u32,
    /// Entries, in stream order.
    pub entries: Vec<AttributeEntry<'a>>,
}

impl<'a> AttributeTable<'a> {
    /// Parses an attribute metadata stream. An empty stream yields `Ok(None)`.
    pub fn parse(stream: &'a [u8]) -> Result<Option<Self>, StreamError> {
        Self::parse_bounded(stream, usize::MAX)
    }

    /// Like [`AttributeTable::parse`], but rejects a table declaring more than `max_entries`
    /// attributes before any entry storage is allocated.
    pub fn parse_bounded(
        stream: &'a [u8],
        max_entries: usize,
    ) -> Result<Option<Self>, StreamError> {
        if stream.is_empty() {
            return Ok(None);
        }

        let mut r = StreamReader::new(stream);
        let start = r.expect_chunk(
            Tag::SATT,
            ChunkLayout::Fixed(ATTRIBUTE_TABLE_START_LEN),
            "attribute table start",
        )?;
        let count = start.body_reader().read_i32_le("attribute count")?;

        let count = checked_count::<AttributeData>(&r, Tag::SATT, count, max_entries)?;
        let entries = read_entries::<AttributeData>(&mut r, count, Tag::VATT)?;

        tracing::debug!(count, consumed = r.offset(), "parsed attribute table");

        Ok(Some(AttributeTable {
            declared_size: start.size,
            count: count as u32,
            entries,
        }))
    }

    /// Looks up an entry by name.
    pub fn get(&self, name: &str) -> Option<&AttributeEntry<'a>> {
        self.entries.iter().find(|entry| entry.name == name)
    }

    /// Returns a human-readable dump of the table and every entry.
    pub fn debug_summary(&self) -> String {
        let mut out = String::new();

        let _ = write!(&mut out, "SATT count={}", self.count);
        for (idx, entry) in self.entries.iter().enumerate() {
            let d = &entry.data;
            let _ = write!(
                &mut out,
                "\n  [{idx:02}] \"{}\" type={:#04x} flags={:#04x} elements={}x{} entries={} stride={:#x} precision={} reserved=({:#04x}, {:#06x}) offset={:#06x}",
                entry.name,
                d.ty,
                d.flags,
                d.element_count,
                d.element_size,
                d.entry_count,
                d.stride,
                d.precision,
                d.reserved_0a,
                d.reserved_0c,
                d.offset
            );
            if let Some(init) = &entry.initializer {
                let _ = write!(
                    &mut out,
                    " init(count={}, {} bytes)",
                    init.count,
                    init.data.len()
                );
            }
        }

        out
    }
}
