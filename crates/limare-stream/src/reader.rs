//! Bounds-checked cursor over a compiler metadata stream.

use core::fmt;

use crate::error::StreamError;
use crate::tag::Tag;

/// Length of a chunk header: a 4-byte tag followed by a 4-byte size field.
pub(crate) const CHUNK_HEADER_LEN: usize = 8;

/// How the total length of a tagged chunk is determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkLayout {
    /// The chunk always occupies this many bytes, header included. The size field is carried
    /// but does not drive the cursor.
    Fixed(usize),
    /// The chunk occupies the 8-byte header plus `size` payload bytes.
    Sized,
}

/// A tagged chunk located by [`StreamReader::peek_chunk`].
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct TaggedChunk<'a> {
    /// The chunk tag.
    pub tag: Tag,
    /// Byte offset of the chunk within its stream.
    pub offset: usize,
    /// The raw size field following the tag.
    pub size: i32,
    /// Every byte of the chunk, header included.
    pub bytes: &'a [u8],
}

impl<'a> TaggedChunk<'a> {
    /// Total number of bytes the chunk occupies; the amount the cursor must advance.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Always `false`: a located chunk holds at least its header.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The bytes following the 8-byte header.
    pub fn body(&self) -> &'a [u8] {
        self.bytes.get(CHUNK_HEADER_LEN..).unwrap_or(&[])
    }

    /// A reader positioned on the chunk body, reporting offsets relative to the outer stream.
    pub fn body_reader(&self) -> StreamReader<'a> {
        StreamReader {
            bytes: self.bytes,
            offset: CHUNK_HEADER_LEN.min(self.bytes.len()),
            base: self.offset,
        }
    }
}

impl fmt::Debug for TaggedChunk<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaggedChunk")
            .field("tag", &self.tag)
            .field("offset", &self.offset)
            .field("size", &self.size)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// The payload of a `VINI` chunk.
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct Initializer<'a> {
    /// Number of initial values declared by the compiler.
    pub count: u32,
    /// Raw initial data, as stored in the stream.
    pub data: &'a [u8],
}

impl<'a> Initializer<'a> {
    /// Decodes a `VINI` chunk: a `count` word followed by the initial data.
    pub(crate) fn from_chunk(chunk: &TaggedChunk<'a>) -> Result<Self, StreamError> {
        let mut r = chunk.body_reader();
        let count = r.read_u32_le("initializer count")?;
        let data = r.read_bytes(r.remaining(), "initializer data")?;
        Ok(Initializer { count, data })
    }
}

impl fmt::Debug for Initializer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Initializer")
            .field("count", &self.count)
            .field("data_len", &self.data.len())
            .finish()
    }
}

/// A forward-only cursor over a byte stream with explicit little-endian field readers.
///
/// Every read is bounds-checked and reports the absolute stream offset on failure.
#[derive(Debug, Clone)]
pub struct StreamReader<'a> {
    bytes: &'a [u8],
    offset: usize,
    // Offset of `bytes[0]` within the outermost stream, for error reporting.
    base: usize,
}

impl<'a> StreamReader<'a> {
    /// Creates a reader positioned at the start of `bytes`.
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            offset: 0,
            base: 0,
        }
    }

    /// Current position, relative to the start of the stream.
    pub fn offset(&self) -> usize {
        self.base + self.offset
    }

    /// Number of unread bytes.
    pub fn remaining(&self) -> usize {
        self.bytes.len().saturating_sub(self.offset)
    }

    /// Returns `true` when every byte has been consumed.
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Moves the cursor forward by `len` bytes.
    pub fn advance(&mut self, len: usize) -> Result<(), StreamError> {
        self.read_bytes(len, "chunk").map(|_| ())
    }

    /// Reads `len` raw bytes.
    pub fn read_bytes(&mut self, len: usize, what: &str) -> Result<&'a [u8], StreamError> {
        let start = self.offset;
        let end = start.checked_add(len).ok_or_else(|| {
            StreamError::corrupt(self.offset(), format!("{what} length {len} overflows"))
        })?;
        let slice = self.bytes.get(start..end).ok_or_else(|| {
            StreamError::corrupt(
                self.offset(),
                format!(
                    "need {len} bytes for {what}, but only {} remain",
                    self.remaining()
                ),
            )
        })?;
        self.offset = end;
        Ok(slice)
    }

    /// Reads a fixed-size array.
    pub fn read_array<const N: usize>(&mut self, what: &str) -> Result<[u8; N], StreamError> {
        let slice = self.read_bytes(N, what)?;
        let mut out = [0u8; N];
        out.copy_from_slice(slice);
        Ok(out)
    }

    /// Reads a single byte.
    pub fn read_u8(&mut self, what: &str) -> Result<u8, StreamError> {
        let [b] = self.read_array::<1>(what)?;
        Ok(b)
    }

    /// Reads a little-endian `u16`.
    pub fn read_u16_le(&mut self, what: &str) -> Result<u16, StreamError> {
        self.read_array::<2>(what).map(u16::from_le_bytes)
    }

    /// Reads a little-endian `u32`.
    pub fn read_u32_le(&mut self, what: &str) -> Result<u32, StreamError> {
        self.read_array::<4>(what).map(u32::from_le_bytes)
    }

    /// Reads a little-endian `i32`.
    pub fn read_i32_le(&mut self, what: &str) -> Result<i32, StreamError> {
        self.read_array::<4>(what).map(i32::from_le_bytes)
    }

    /// Returns the next 4 bytes as a tag without consuming them.
    pub fn peek_tag(&self) -> Option<Tag> {
        let end = self.offset.checked_add(4)?;
        let slice = self.bytes.get(self.offset..end)?;
        Some(Tag([slice[0], slice[1], slice[2], slice[3]]))
    }

    /// Looks for a chunk tagged `tag` at the cursor without advancing.
    ///
    /// Returns `Ok(None)` when the leading bytes carry a different tag (or fewer than four
    /// bytes remain): the chunk is absent and the caller decides whether that is an error. On a
    /// match the returned chunk spans header and payload, and its [`TaggedChunk::len`] is the
    /// number of bytes to [`advance`](Self::advance). A matching tag whose declared extent runs
    /// past the end of the stream is reported as corrupt.
    pub fn peek_chunk(
        &self,
        tag: Tag,
        layout: ChunkLayout,
    ) -> Result<Option<TaggedChunk<'a>>, StreamError> {
        if self.peek_tag() != Some(tag) {
            return Ok(None);
        }

        let mut header = self.clone();
        header.advance(4)?;
        let size = header.read_i32_le("chunk size").map_err(|e| {
            StreamError::corrupt(self.offset(), format!("{tag} chunk: {}", e.context()))
        })?;

        let len = match layout {
            ChunkLayout::Fixed(len) => len,
            ChunkLayout::Sized => {
                let payload = usize::try_from(size).map_err(|_| {
                    StreamError::corrupt(
                        self.offset(),
                        format!("{tag} chunk has negative size {size}"),
                    )
                })?;
                CHUNK_HEADER_LEN.checked_add(payload).ok_or_else(|| {
                    StreamError::corrupt(
                        self.offset(),
                        format!("{tag} chunk size {size} overflows"),
                    )
                })?
            }
        };

        let end = self.offset.checked_add(len);
        let bytes = end
            .and_then(|end| self.bytes.get(self.offset..end))
            .ok_or_else(|| {
                StreamError::corrupt(
                    self.offset(),
                    format!(
                        "{tag} chunk needs {len} bytes, but only {} remain",
                        self.remaining()
                    ),
                )
            })?;

        Ok(Some(TaggedChunk {
            tag,
            offset: self.offset(),
            size,
            bytes,
        }))
    }

    /// [`peek_chunk`](Self::peek_chunk) followed by advancing past the chunk when present.
    pub fn take_chunk(
        &mut self,
        tag: Tag,
        layout: ChunkLayout,
    ) -> Result<Option<TaggedChunk<'a>>, StreamError> {
        let chunk = self.peek_chunk(tag, layout)?;
        if let Some(chunk) = &chunk {
            self.advance(chunk.len())?;
        }
        Ok(chunk)
    }

    /// Like [`take_chunk`](Self::take_chunk), but an absent chunk is a corrupt stream.
    pub fn expect_chunk(
        &mut self,
        tag: Tag,
        layout: ChunkLayout,
        what: &str,
    ) -> Result<TaggedChunk<'a>, StreamError> {
        match self.take_chunk(tag, layout)? {
            Some(chunk) => Ok(chunk),
            None => Err(StreamError::corrupt(
                self.offset(),
                format!(
                    "missing {what} ({tag}), found {}",
                    self.peek_tag()
                        .map(|t| t.to_string())
                        .unwrap_or_else(|| "end of stream".to_owned())
                ),
            )),
        }
    }

    /// Reads a `STRI` name chunk and returns the name up to its first NUL.
    pub fn read_name(&mut self) -> Result<&'a str, StreamError> {
        let chunk = self.expect_chunk(Tag::STRI, ChunkLayout::Sized, "name string")?;
        let body = chunk.body();
        let end = body.iter().position(|&b| b == 0).unwrap_or(body.len());
        core::str::from_utf8(&body[..end])
            .map_err(|_| StreamError::corrupt(chunk.offset, "name string is not valid UTF-8"))
    }

    /// Reads an optional `VINI` initializer chunk.
    pub fn read_initializer(&mut self) -> Result<Option<Initializer<'a>>, StreamError> {
        match self.take_chunk(Tag::VINI, ChunkLayout::Sized)? {
            Some(chunk) => Initializer::from_chunk(&chunk).map(Some),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stri(name: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&Tag::STRI.0);
        out.extend_from_slice(&(name.len() as i32).to_le_bytes());
        out.extend_from_slice(name);
        out
    }

    #[test]
    fn peek_mismatch_reports_absent_without_advancing() {
        let bytes = stri(b"abc\0");
        let r = StreamReader::new(&bytes);
        assert_eq!(r.peek_chunk(Tag::VINI, ChunkLayout::Sized).unwrap(), None);
        assert_eq!(r.offset(), 0);
    }

    #[test]
    fn peek_reports_header_plus_payload_length() {
        let bytes = stri(b"mvp\0");
        let r = StreamReader::new(&bytes);
        let chunk = r
            .peek_chunk(Tag::STRI, ChunkLayout::Sized)
            .unwrap()
            .expect("STRI should be present");
        assert_eq!(chunk.len(), 8 + 4);
        assert_eq!(chunk.size, 4);
        assert_eq!(chunk.body(), b"mvp\0");
        assert_eq!(r.offset(), 0);
    }

    #[test]
    fn peek_on_short_stream_is_absent() {
        let r = StreamReader::new(b"ST");
        assert_eq!(r.peek_chunk(Tag::STRI, ChunkLayout::Sized).unwrap(), None);
    }

    #[test]
    fn fixed_layout_ignores_size_field() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&Tag::VUNI.0);
        bytes.extend_from_slice(&0x40i32.to_le_bytes());
        bytes.extend_from_slice(&[0xAA; 4]);
        let mut r = StreamReader::new(&bytes);
        let chunk = r
            .take_chunk(Tag::VUNI, ChunkLayout::Fixed(8))
            .unwrap()
            .unwrap();
        assert_eq!(chunk.len(), 8);
        assert_eq!(chunk.size, 0x40);
        assert_eq!(r.offset(), 8);
        assert_eq!(r.remaining(), 4);
    }

    #[test]
    fn truncated_payload_is_corrupt() {
        let mut bytes = stri(b"name\0");
        bytes.truncate(bytes.len() - 2);
        let r = StreamReader::new(&bytes);
        let err = r.peek_chunk(Tag::STRI, ChunkLayout::Sized).unwrap_err();
        assert!(err.is_corrupt());
        assert!(err.context().contains("STRI"), "{err}");
    }

    #[test]
    fn negative_size_is_corrupt() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&Tag::STRI.0);
        bytes.extend_from_slice(&(-4i32).to_le_bytes());
        let r = StreamReader::new(&bytes);
        let err = r.peek_chunk(Tag::STRI, ChunkLayout::Sized).unwrap_err();
        assert!(err.context().contains("negative"), "{err}");
    }

    #[test]
    fn read_name_stops_at_nul_padding() {
        let bytes = stri(b"in_vertex\0\0\0");
        let mut r = StreamReader::new(&bytes);
        assert_eq!(r.read_name().unwrap(), "in_vertex");
        assert!(r.is_empty());
    }

    #[test]
    fn read_name_rejects_invalid_utf8() {
        let bytes = stri(&[0xFF, 0xFE, 0]);
        let mut r = StreamReader::new(&bytes);
        assert!(r.read_name().unwrap_err().is_corrupt());
    }

    #[test]
    fn initializer_splits_count_from_data() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&Tag::VINI.0);
        bytes.extend_from_slice(&12u32.to_le_bytes());
        bytes.extend_from_slice(&2u32.to_le_bytes());
        bytes.extend_from_slice(&1.0f32.to_le_bytes());
        bytes.extend_from_slice(&2.0f32.to_le_bytes());
        let mut r = StreamReader::new(&bytes);
        let init = r.read_initializer().unwrap().expect("VINI should be present");
        assert_eq!(init.count, 2);
        assert_eq!(init.data.len(), 8);
        assert!(r.is_empty());
    }

    #[test]
    fn initializer_without_count_word_is_corrupt() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&Tag::VINI.0);
        bytes.extend_from_slice(&2u32.to_le_bytes());
        bytes.extend_from_slice(&[0, 0]);
        let mut r = StreamReader::new(&bytes);
        assert!(r.read_initializer().unwrap_err().is_corrupt());
    }

    #[test]
    fn errors_report_absolute_offsets() {
        let mut bytes = vec![0u8; 4];
        bytes.extend_from_slice(&Tag::VINI.0);
        bytes.extend_from_slice(&8u32.to_le_bytes());
        let mut r = StreamReader::new(&bytes);
        r.advance(4).unwrap();
        let err = r.read_initializer().unwrap_err();
        assert_eq!(
            err,
            StreamError::CorruptStream {
                offset: 4,
                context: "VINI chunk needs 16 bytes, but only 8 remain".to_owned(),
            }
        );
    }
}
