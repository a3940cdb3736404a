use core::fmt;

/// A four-character chunk identifier, stored in stream byte order.
///
/// The compiler writes tags as little-endian packed `u32`s, so `SUNI` is `0x494E5553` when read
/// as a word. Comparing the raw bytes is equivalent.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct Tag(pub [u8; 4]);

impl Tag {
    /// Name string (`STRI`).
    pub const STRI: Tag = Tag(*b"STRI");
    /// Uniform table start (`SUNI`).
    pub const SUNI: Tag = Tag(*b"SUNI");
    /// Uniform entry start (`VUNI`).
    pub const VUNI: Tag = Tag(*b"VUNI");
    /// Initializer block (`VINI`), shared by uniforms and attributes.
    pub const VINI: Tag = Tag(*b"VINI");
    /// Attribute table start (`SATT`).
    pub const SATT: Tag = Tag(*b"SATT");
    /// Attribute entry start (`VATT`).
    pub const VATT: Tag = Tag(*b"VATT");

    /// Returns the tag as the little-endian packed word the compiler stores.
    pub const fn as_u32(self) -> u32 {
        u32::from_le_bytes(self.0)
    }

    /// Builds a tag from a little-endian packed word.
    pub const fn from_u32(word: u32) -> Self {
        Tag(word.to_le_bytes())
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            if b.is_ascii_graphic() {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, "\\x{b:02x}")?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tag(\"{self}\")")
    }
}
