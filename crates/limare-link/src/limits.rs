//! Limits and switches applied while linking.
//!
//! Compiler output is treated as untrusted input. Stream and code sizes are checked before any
//! stream is parsed; the symbol cap is handed to the table parsers, which reject an oversized
//! declared count before allocating entry storage.

/// Default cap on the size of each metadata stream (uniform, attribute, varying).
pub const MAX_METADATA_STREAM_BYTES: usize = 1024 * 1024; // 1 MiB

/// Default cap on the machine-code segment.
///
/// The vertex processor instruction memory is far smaller than this; anything larger is not a
/// program the hardware could run.
pub const MAX_CODE_BYTES: usize = 256 * 1024; // 256 KiB

/// Default cap on the number of uniforms or attributes a table may declare.
pub const MAX_SYMBOLS: u32 = 1024;

/// Size caps applied to each compiler output before it is linked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkLimits {
    /// Largest accepted uniform, attribute or varying stream, in bytes.
    pub max_stream_bytes: usize,
    /// Largest accepted machine-code segment, in bytes.
    pub max_code_bytes: usize,
    /// Most entries a uniform or attribute table may declare.
    pub max_symbols: u32,
}

impl Default for LinkLimits {
    fn default() -> Self {
        Self {
            max_stream_bytes: MAX_METADATA_STREAM_BYTES,
            max_code_bytes: MAX_CODE_BYTES,
            max_symbols: MAX_SYMBOLS,
        }
    }
}

/// Which machine-code rewrite passes run for vertex shaders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkOptions {
    /// Remap the per-instruction attribute slot field.
    pub patch_attributes: bool,
    /// Remap both per-instruction varying slot fields.
    pub patch_varyings: bool,
}

impl Default for LinkOptions {
    fn default() -> Self {
        Self {
            patch_attributes: true,
            patch_varyings: true,
        }
    }
}
