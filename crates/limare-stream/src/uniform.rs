//! Uniform tables (`SUNI`).
//!
//! Stream layout:
//!
//! ```text
//! SUNI  size:i32 count:i32 space_needed:i32
//! count × {
//!     VUNI  size:i32
//!     STRI  size:i32 name[size]
//!     data  20 bytes, untagged
//!     VINI  size:u32 count:u32 data[size - 4]     (optional)
//! }
//! ```

use core::fmt::Write as _;

use crate::error::StreamError;
use crate::reader::{ChunkLayout, StreamReader};
use crate::table::{checked_count, read_entries, DataRecord, Entry};
use crate::tag::Tag;

/// Size in bytes of the untagged uniform data record.
pub const UNIFORM_DATA_LEN: usize = 0x14;

const UNIFORM_TABLE_START_LEN: usize = 16;

/// The fixed-layout data record of a uniform entry.
///
/// Fields whose meaning is unknown are carried verbatim as `reserved_*`, named after their byte
/// offset within the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UniformData {
    /// Type code (0x00).
    pub ty: u8,
    /// Flags byte (0x01).
    pub flags: u8,
    /// Number of elements, e.g. 16 for a `mat4` (0x02).
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
    /// Unknown (0x0E).
    pub reserved_0e: u16,
    /// Offset into the uniform memory block (0x10).
    pub offset: u16,
    /// Index; commonly `0xFFFF` (0x12).
    pub index: u16,
}

impl UniformData {
    /// Total byte size of one entry (`element_count * element_size`).
    pub fn byte_size(&self) -> u32 {
        u32::from(self.element_count) * u32::from(self.element_size)
    }
}

impl DataRecord for UniformData {
    const LEN: usize = UNIFORM_DATA_LEN;

    fn decode(r: &mut StreamReader<'_>) -> Result<Self, StreamError> {
        let record = r.read_bytes(Self::LEN, "uniform data record")?;
        let mut f = StreamReader::new(record);
        Ok(UniformData {
            ty: f.read_u8("type")?,
            flags: f.read_u8("flags")?,
            element_count: f.read_u16_le("element_count")?,
            element_size: f.read_u16_le("element_size")?,
            entry_count: f.read_u16_le("entry_count")?,
            stride: f.read_u16_le("stride")?,
            reserved_0a: f.read_u8("reserved_0a")?,
            precision: f.read_u8("precision")?,
            reserved_0c: f.read_u16_le("reserved_0c")?,
            reserved_0e: f.read_u16_le("reserved_0e")?,
            offset: f.read_u16_le("offset")?,
            index: f.read_u16_le("index")?,
        })
    }
}

/// A raw uniform entry.
pub type UniformEntry<'a> = Entry<'a, UniformData>;

/// A parsed uniform table, borrowing names and initializers from the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformTable<'a> {
    /// Size field of the `SUNI` chunk, kept verbatim.
    pub declared_size: i32,
    /// Number of uniforms declared by the table start.
    pub count: u32,
    /// Bytes of uniform memory the program needs.
    pub space_needed: u32,
    /// Entries, in stream order.
    pub entries: Vec<UniformEntry<'a>>,
}

impl<'a> UniformTable<'a> {
    /// Parses a uniform metadata stream.
    ///
    /// An empty stream means the program has no uniforms and yields `Ok(None)`. Otherwise the
    /// stream must start with a `SUNI` chunk and contain every declared entry; any missing
    /// required chunk fails the whole parse.
    pub fn parse(stream: &'a [u8]) -> Result<Option<Self>, StreamError> {
        Self::parse_bounded(stream, usize::MAX)
    }

    /// Like [`UniformTable::parse`], but rejects a table declaring more than `max_entries`
    /// uniforms before any entry storage is allocated.
    pub fn parse_bounded(
        stream: &'a [u8],
        max_entries: usize,
    ) -> Result<Option<Self>, StreamError> {
        if stream.is_empty() {
            return Ok(None);
        }

        let mut r = StreamReader::new(stream);
        let start = r.expect_chunk(
            Tag::SUNI,
            ChunkLayout::Fixed(UNIFORM_TABLE_START_LEN),
            "uniform table start",
        )?;

        let mut fields = start.body_reader();
        let count = fields.read_i32_le("uniform count")?;
        let space_needed = fields.read_i32_le("uniform space_needed")?;
        let space_needed = u32::try_from(space_needed).map_err(|_| {
            StreamError::corrupt(
                start.offset,
                format!("uniform table declares negative space_needed {space_needed}"),
            )
        })?;

        let count = checked_count::<UniformData>(&r, Tag::SUNI, count, max_entries)?;
        let entries = read_entries::<UniformData>(&mut r, count, Tag::VUNI)?;

        tracing::debug!(
            count,
            space_needed,
            consumed = r.offset(),
            "parsed uniform table"
        );

        Ok(Some(UniformTable {
            declared_size: start.size,
            count: count as u32,
            space_needed,
            entries,
        }))
    }

    /// Looks up an entry by name.
    pub fn get(&self, name: &str) -> Option<&UniformEntry<'a>> {
        self.entries.iter().find(|entry| entry.name == name)
    }

    /// Returns a human-readable dump of the table and every entry.
    pub fn debug_summary(&self) -> String {
        let mut out = String::new();

        let _ = write!(
            &mut out,
            "SUNI count={} space_needed={:#x}",
            self.count, self.space_needed
        );
        for (idx, entry) in self.entries.iter().enumerate() {
            let d = &entry.data;
            let _ = write!(
                &mut out,
                "\n  [{idx:02}] \"{}\" type={:#04x} flags={:#04x} elements={}x{} entries={} stride={:#x} precision={} reserved=({:#04x}, {:#06x}, {:#06x}) offset={:#06x} index={:#06x}",
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
                d.reserved_0e,
                d.offset,
                d.index
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
