//! A safe, zero-copy parser for the metadata streams emitted by the Mali shader compiler.
//!
//! The compiler describes the uniforms and attributes of a compiled program as a flat
//! concatenation of tagged chunks (`SUNI`, `VUNI`, `STRI`, `VINI`, `SATT`, `VATT`) mixed with
//! untagged fixed-size data records. This crate provides:
//!
//! - [`StreamReader`], a bounds-checked cursor with the "peek a tag, report the chunk length"
//!   primitive every table parser is built on,
//! - [`UniformTable`] and [`AttributeTable`], the parsed uniform (`SUNI`) and attribute
//!   (`SATT`) tables.
//!
//! Streams are treated as **untrusted**: no parser panics or reads out of bounds on malformed
//! input, and declared counts are validated against the bytes actually present before anything
//! is allocated.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

/// Parser for attribute tables (`SATT`).
pub mod attribute;
mod error;
mod reader;
mod table;
mod tag;
/// Parser for uniform tables (`SUNI`).
pub mod uniform;

/// Helpers for building synthetic compiler streams in tests.
///
/// This module is only available when compiling this crate's own tests, or when the
/// `test-utils` feature is enabled. It is **not** considered part of the stable parsing API.
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;


pub use crate::attribute::{AttributeData, AttributeEntry, AttributeTable, ATTRIBUTE_DATA_LEN};
pub use crate::error::StreamError;
pub use crate::reader::{ChunkLayout, Initializer, StreamReader, TaggedChunk};
pub use crate::table::Entry;
pub use crate::tag::Tag;
pub use crate::uniform::{UniformData, UniformEntry, UniformTable, UNIFORM_DATA_LEN};
