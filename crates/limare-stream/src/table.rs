//! Entry walking shared by the uniform and attribute table parsers.

use core::fmt;

use crate::error::StreamError;
use crate::reader::{ChunkLayout, Initializer, StreamReader, CHUNK_HEADER_LEN};
use crate::tag::Tag;

/// One raw table entry: entry-start chunk, name, fixed data record and optional initializer.
#[derive(Clone, PartialEq, Eq)]
pub struct Entry<'a, D> {
    /// Byte offset of the entry-start chunk within the stream.
    pub offset: usize,
    /// Size field of the entry-start chunk, kept verbatim.
    pub declared_size: i32,
    /// Entry name from the `STRI` chunk.
    pub name: &'a str,
    /// The decoded fixed-layout data record.
    pub data: D,
    /// The `VINI` block, when the compiler emitted one.
    pub initializer: Option<Initializer<'a>>,
}

impl<D: fmt::Debug> fmt::Debug for Entry<'_, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("offset", &self.offset)
            .field("name", &self.name)
            .field("data", &self.data)
            .field("initializer", &self.initializer)
            .finish()
    }
}

/// Decodes an untagged fixed-layout record.
pub(crate) trait DataRecord: Sized {
    /// Exact number of bytes the record occupies.
    const LEN: usize;

    fn decode(r: &mut StreamReader<'_>) -> Result<Self, StreamError>;
}

/// Converts a signed count field into an entry count that is known to fit in the stream and
/// stays within `max_entries`.
pub(crate) fn checked_count<D: DataRecord>(
    r: &StreamReader<'_>,
    table: Tag,
    count: i32,
    max_entries: usize,
) -> Result<usize, StreamError> {
    let count = usize::try_from(count).map_err(|_| {
        StreamError::corrupt(
            r.offset(),
            format!("{table} table declares negative count {count}"),
        )
    })?;

    if count > max_entries {
        return Err(StreamError::corrupt(
            r.offset(),
            format!("{table} table declares {count} entries, exceeding the maximum {max_entries}"),
        ));
    }

    // entry-start header + name header + data record; names and initializers only add bytes.
    let min_entry_len = CHUNK_HEADER_LEN + CHUNK_HEADER_LEN + D::LEN;
    let needed = count.checked_mul(min_entry_len).ok_or_else(|| {
        StreamError::corrupt(r.offset(), format!("{table} count {count} overflows"))
    })?;
    if needed > r.remaining() {
        let remaining = r.remaining();
        return Err(StreamError::corrupt(
            r.offset(),
            format!(
                "{table} table declares {count} entries (at least {needed} bytes), \
                 but only {remaining} bytes remain"
            ),
        ));
    }
    Ok(count)
}

/// Reads `count` entries in stream order.
pub(crate) fn read_entries<'a, D: DataRecord>(
    r: &mut StreamReader<'a>,
    count: usize,
    entry_tag: Tag,
) -> Result<Vec<Entry<'a, D>>, StreamError> {
    let mut entries = Vec::new();
    entries.try_reserve_exact(count).map_err(|_| {
        StreamError::allocation(format!("{entry_tag} entry count {count} is too large to allocate"))
    })?;

    for index in 0..count {
        let start = r
            .expect_chunk(entry_tag, ChunkLayout::Fixed(CHUNK_HEADER_LEN), "entry start")
            .map_err(|e| with_entry(e, index))?;
        let name = r.read_name().map_err(|e| with_entry(e, index))?;
        let data = D::decode(r).map_err(|e| with_entry(e, index))?;
        // it is legal to not have an init block
        let initializer = r.read_initializer().map_err(|e| with_entry(e, index))?;

        tracing::trace!(
            index,
            offset = start.offset,
            name,
            has_initializer = initializer.is_some(),
            "read {entry_tag} entry"
        );

        entries.push(Entry {
            offset: start.offset,
            declared_size: start.size,
            name,
            data,
            initializer,
        });
    }

    if !r.is_empty() {
        tracing::trace!(
            offset = r.offset(),
            remaining = r.remaining(),
            "ignoring trailing bytes after {entry_tag} entries"
        );
    }

    Ok(entries)
}

fn with_entry(err: StreamError, index: usize) -> StreamError {
    match err {
        StreamError::CorruptStream { offset, context } => StreamError::CorruptStream {
            offset,
            context: format!("entry {index}: {context}"),
        },
        other => other,
    }
}
