use crate::{AttributeData, Tag, UniformData};

/// Description of one uniform for [`build_uniform_stream`].
#[derive(Debug, Clone, Copy)]
pub struct UniformDesc<'a> {
    /// Uniform name.
    pub name: &'a str,
    /// Data record, written verbatim.
    pub data: UniformData,
    /// Optional `VINI` block as `(count, data)`.
    pub initializer: Option<(u32, &'a [u8])>,
}

/// Description of one attribute for [`build_attribute_stream`].
#[derive(Debug, Clone, Copy)]
pub struct AttributeDesc<'a> {
    /// Attribute name.
    pub name: &'a str,
    /// Data record, written verbatim.
    pub data: AttributeData,
    /// Optional `VINI` block as `(count, data)`.
    pub initializer: Option<(u32, &'a [u8])>,
}

/// A float uniform record with `element_count` 4-byte elements at `offset`.
pub fn float_uniform(element_count: u16, offset: u16) -> UniformData {
    UniformData {
        ty: 0x01,
        element_count,
        element_size: 4,
        stride: element_count * 4,
        precision: 3,
        offset,
        index: 0xFFFF,
        ..UniformData::default()
    }
}

/// A float attribute record with `element_count` 4-byte elements at `offset`.
pub fn float_attribute(element_count: u16, offset: u16) -> AttributeData {
    AttributeData {
        ty: 0x01,
        element_count,
        element_size: 4,
        stride: element_count * 4,
        precision: 3,
        offset,
        ..AttributeData::default()
    }
}

/// Encodes `values` as little-endian `f32`s.
pub fn f32_bytes(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Appends a chunk header (tag + size).
pub fn push_chunk_header(out: &mut Vec<u8>, tag: Tag, size: i32) {
    out.extend_from_slice(&tag.0);
    out.extend_from_slice(&size.to_le_bytes());
}

/// Appends a `STRI` chunk holding `name`, NUL-terminated and padded to 4 bytes.
pub fn push_name(out: &mut Vec<u8>, name: &str) {
    let padded = (name.len() + 1 + 3) & !3;
    let size = i32::try_from(padded).expect("test name too long");
    push_chunk_header(out, Tag::STRI, size);
    out.extend_from_slice(name.as_bytes());
    out.resize(out.len() + (padded - name.len()), 0);
}

/// Appends a `VINI` chunk.
pub fn push_initializer(out: &mut Vec<u8>, count: u32, data: &[u8]) {
    let size = i32::try_from(4 + data.len()).expect("test initializer too long");
    push_chunk_header(out, Tag::VINI, size);
    out.extend_from_slice(&count.to_le_bytes());
    out.extend_from_slice(data);
}

/// Appends a 20-byte uniform data record.
pub fn push_uniform_data(out: &mut Vec<u8>, d: &UniformData) {
    out.push(d.ty);
    out.push(d.flags);
    out.extend_from_slice(&d.element_count.to_le_bytes());
    out.extend_from_slice(&d.element_size.to_le_bytes());
    out.extend_from_slice(&d.entry_count.to_le_bytes());
    out.extend_from_slice(&d.stride.to_le_bytes());
    out.push(d.reserved_0a);
    out.push(d.precision);
    out.extend_from_slice(&d.reserved_0c.to_le_bytes());
    out.extend_from_slice(&d.reserved_0e.to_le_bytes());
    out.extend_from_slice(&d.offset.to_le_bytes());
    out.extend_from_slice(&d.index.to_le_bytes());
}

/// Appends a 16-byte attribute data record.
pub fn push_attribute_data(out: &mut Vec<u8>, d: &AttributeData) {
    out.push(d.ty);
    out.push(d.flags);
    out.extend_from_slice(&d.element_count.to_le_bytes());
    out.extend_from_slice(&d.element_size.to_le_bytes());
    out.extend_from_slice(&d.entry_count.to_le_bytes());
    out.extend_from_slice(&d.stride.to_le_bytes());
    out.push(d.reserved_0a);
    out.push(d.precision);
    out.extend_from_slice(&d.reserved_0c.to_le_bytes());
    out.extend_from_slice(&d.offset.to_le_bytes());
}

/// Builds a complete uniform metadata stream.
///
/// The `VUNI` size field is set to the number of entry bytes following its header, and the
/// `SUNI` size field to the number of stream bytes following its header.
pub fn build_uniform_stream(space_needed: u32, uniforms: &[UniformDesc<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for u in uniforms {
        let mut entry = Vec::new();
        push_name(&mut entry, u.name);
        push_uniform_data(&mut entry, &u.data);
        if let Some((count, data)) = u.initializer {
            push_initializer(&mut entry, count, data);
        }
        push_chunk_header(&mut body, Tag::VUNI, entry.len() as i32);
        body.extend_from_slice(&entry);
    }

    let mut out = Vec::with_capacity(16 + body.len());
    push_chunk_header(&mut out, Tag::SUNI, (8 + body.len()) as i32);
    out.extend_from_slice(&(uniforms.len() as i32).to_le_bytes());
    out.extend_from_slice(&space_needed.to_le_bytes());
    out.extend_from_slice(&body);
    out
}

/// Builds a complete attribute metadata stream.
pub fn build_attribute_stream(attributes: &[AttributeDesc<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for a in attributes {
        let mut entry = Vec::new();
        push_name(&mut entry, a.name);
        push_attribute_data(&mut entry, &a.data);
        if let Some((count, data)) = a.initializer {
            push_initializer(&mut entry, count, data);
        }
        push_chunk_header(&mut body, Tag::VATT, entry.len() as i32);
        body.extend_from_slice(&entry);
    }

    let mut out = Vec::with_capacity(12 + body.len());
    push_chunk_header(&mut out, Tag::SATT, (4 + body.len()) as i32);
    out.extend_from_slice(&(attributes.len() as i32).to_le_bytes());
    out.extend_from_slice(&body);
    out
}
