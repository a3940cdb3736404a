//! Resolved uniform and attribute symbols.
//!
//! A [`Symbol`] is what the command-stream builder consumes: the raw table entry reduced to a
//! name, a byte size, the compiler-assigned offset and an optional copy of the initial data.

use limare_stream::{AttributeData, AttributeTable, Entry, UniformData, UniformTable};

use crate::error::LinkError;

/// Which table a symbol came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    /// A `VUNI` entry.
    Uniform,
    /// A `VATT` entry.
    Attribute,
}

/// One uniform or attribute, owned independently of the stream it was parsed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    /// Name as declared in the shader source.
    pub name: String,
    /// Table the symbol came from.
    pub kind: SymbolKind,
    /// `element_count * element_size`, in bytes.
    pub size: u32,
    /// Components per entry.
    pub element_count: u16,
    /// Array length as stored by the compiler; `0` means one entry.
    pub entry_count: u16,
    /// Offset assigned by the compiler, copied verbatim.
    pub offset: u16,
    /// Initial data when the entry carried a `VINI` block. `Some(vec![])` is an empty
    /// initializer, not a missing one.
    pub initializer: Option<Vec<u8>>,
}

impl Symbol {
    /// Whether the entry carried initial data, possibly empty.
    pub fn has_initializer(&self) -> bool {
        self.initializer.is_some()
    }

    /// The initial data decoded as little-endian `f32`s. Trailing bytes that do not form a whole
    /// float are dropped.
    pub fn initializer_f32(&self) -> Option<Vec<f32>> {
        self.initializer.as_ref().map(|data| {
            data.chunks_exact(4)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .collect()
        })
    }
}

/// Field access shared by the uniform and attribute data records.
trait RawRecord {
    const KIND: SymbolKind;

    fn element_count(&self) -> u16;
    fn element_size(&self) -> u16;
    fn entry_count(&self) -> u16;
    fn offset(&self) -> u16;
}

impl RawRecord for UniformData {
    const KIND: SymbolKind = SymbolKind::Uniform;

    fn element_count(&self) -> u16 {
        self.element_count
    }
    fn element_size(&self) -> u16 {
        self.element_size
    }
    fn entry_count(&self) -> u16 {
        self.entry_count
    }
    fn offset(&self) -> u16 {
        self.offset
    }
}

impl RawRecord for AttributeData {
    const KIND: SymbolKind = SymbolKind::Attribute;

    fn element_count(&self) -> u16 {
        self.element_count
    }
    fn element_size(&self) -> u16 {
        self.element_size
    }
    fn entry_count(&self) -> u16 {
        self.entry_count
    }
    fn offset(&self) -> u16 {
        self.offset
    }
}

/// An ordered set of symbols of one kind, plus the uniform memory they need.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
    space_needed: u32,
}

impl SymbolTable {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds uniform symbols, one per entry, in table order.
    pub fn from_uniform_table(table: &UniformTable<'_>) -> Result<Self, LinkError> {
        let symbols = build_symbols(table.count, &table.entries)?;
        Ok(Self {
            symbols,
            space_needed: table.space_needed,
        })
    }

    /// Builds attribute symbols, one per entry, in table order.
    pub fn from_attribute_table(table: &AttributeTable<'_>) -> Result<Self, LinkError> {
        let symbols = build_symbols(table.count, &table.entries)?;
        Ok(Self {
            symbols,
            space_needed: 0,
        })
    }

    /// Number of symbols.
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Whether the table holds no symbols.
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Bytes of uniform memory the stage needs; always `0` for attributes.
    pub fn space_needed(&self) -> u32 {
        self.space_needed
    }

    /// The symbols in table order.
    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    /// Iterates the symbols in table order.
    pub fn iter(&self) -> impl Iterator<Item = &Symbol> + '_ {
        self.symbols.iter()
    }

    /// Looks up a symbol by name.
    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.symbols.iter().find(|s| s.name == name)
    }

    /// Index of the named symbol in table order.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.symbols.iter().position(|s| s.name == name)
    }

    /// Consumes the table, returning its symbols.
    pub fn into_vec(self) -> Vec<Symbol> {
        self.symbols
    }
}

impl<'a> IntoIterator for &'a SymbolTable {
    type Item = &'a Symbol;
    type IntoIter = core::slice::Iter<'a, Symbol>;

    fn into_iter(self) -> Self::IntoIter {
        self.symbols.iter()
    }
}

fn build_symbols<D: RawRecord>(
    declared_count: u32,
    entries: &[Entry<'_, D>],
) -> Result<Vec<Symbol>, LinkError> {
    if entries.len() != declared_count as usize {
        return Err(LinkError::corrupt(format!(
            "table declares {declared_count} {:?} entries but holds {}",
            D::KIND,
            entries.len()
        )));
    }

    // Any early return drops the symbols built so far.
    let mut symbols = Vec::new();
    symbols.try_reserve_exact(entries.len()).map_err(|_| {
        LinkError::allocation(format!("failed to allocate {} symbols", entries.len()))
    })?;

    for entry in entries {
        symbols.push(build_symbol(entry)?);
    }

    Ok(symbols)
}

fn build_symbol<D: RawRecord>(entry: &Entry<'_, D>) -> Result<Symbol, LinkError> {
    let d = &entry.data;

    let mut name = String::new();
    name.try_reserve_exact(entry.name.len())
        .map_err(|_| LinkError::allocation(format!("failed to create symbol {}", entry.name)))?;
    name.push_str(entry.name);

    let initializer = match &entry.initializer {
        Some(init) => {
            let mut data = Vec::new();
            data.try_reserve_exact(init.data.len()).map_err(|_| {
                LinkError::allocation(format!(
                    "failed to copy {} initializer bytes for symbol {}",
                    init.data.len(),
                    entry.name
                ))
            })?;
            data.extend_from_slice(init.data);
            Some(data)
        }
        None => None,
    };

    Ok(Symbol {
        name,
        kind: D::KIND,
        size: u32::from(d.element_count()) * u32::from(d.element_size()),
        element_count: d.element_count(),
        entry_count: d.entry_count(),
        offset: d.offset(),
        initializer,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use limare_stream::test_utils::{
        build_attribute_stream, build_uniform_stream, f32_bytes, float_attribute, float_uniform,
        AttributeDesc, UniformDesc,
    };
    use pretty_assertions::assert_eq;

    #[test]
    fn uniform_symbols_follow_table_order() {
        let color = f32_bytes(&[1.0, 0.0, 0.0, 1.0]);
        let bytes = build_uniform_stream(
            0x50,
            &[
                UniformDesc {
                    name: "mvp",
                    data: float_uniform(16, 0),
                    initializer: None,
                },
                UniformDesc {
                    name: "color",
                    data: float_uniform(4, 0x40),
                    initializer: Some((4, color.as_slice())),
                },
            ],
        );
        let table = UniformTable::parse(&bytes).unwrap().unwrap();
        let symbols = SymbolTable::from_uniform_table(&table).unwrap();

        assert_eq!(symbols.space_needed(), 0x50);
        assert_eq!(
            symbols.symbols(),
            &[
                Symbol {
                    name: "mvp".to_owned(),
                    kind: SymbolKind::Uniform,
                    size: 64,
                    element_count: 16,
                    entry_count: 0,
                    offset: 0,
                    initializer: None,
                },
                Symbol {
                    name: "color".to_owned(),
                    kind: SymbolKind::Uniform,
                    size: 16,
                    element_count: 4,
                    entry_count: 0,
                    offset: 0x40,
                    initializer: Some(color.clone()),
                },
            ][..]
        );
        assert_eq!(
            symbols.get("color").unwrap().initializer_f32(),
            Some(vec![1.0, 0.0, 0.0, 1.0])
        );
        assert_eq!(symbols.position("mvp"), Some(0));
        assert_eq!(symbols.position("missing"), None);
    }

    #[test]
    fn empty_initializer_is_not_missing() {
        let bytes = build_uniform_stream(
            4,
            &[UniformDesc {
                name: "zero",
                data: float_uniform(1, 0),
                initializer: Some((0, &[][..])),
            }],
        );
        let table = UniformTable::parse(&bytes).unwrap().unwrap();
        let symbols = SymbolTable::from_uniform_table(&table).unwrap();
        let zero = symbols.get("zero").unwrap();
        assert!(zero.has_initializer());
        assert_eq!(zero.initializer.as_deref(), Some(&[][..]));
    }

    #[test]
    fn attribute_symbols_have_no_space_needed() {
        let bytes = build_attribute_stream(&[
            AttributeDesc {
                name: "in_vertex",
                data: float_attribute(4, 0),
                initializer: None,
            },
            AttributeDesc {
                name: "in_coord",
                data: float_attribute(2, 1),
                initializer: None,
            },
        ]);
        let table = AttributeTable::parse(&bytes).unwrap().unwrap();
        let symbols = SymbolTable::from_attribute_table(&table).unwrap();

        assert_eq!(symbols.len(), 2);
        assert_eq!(symbols.space_needed(), 0);
        let sizes: Vec<_> = symbols.iter().map(|s| (s.kind, s.size, s.offset)).collect();
        assert_eq!(
            sizes,
            [
                (SymbolKind::Attribute, 16, 0),
                (SymbolKind::Attribute, 8, 1),
            ]
        );
    }

    #[test]
    fn count_mismatch_is_corrupt() {
        let bytes = build_uniform_stream(
            0,
            &[UniformDesc {
                name: "a",
                data: float_uniform(1, 0),
                initializer: None,
            }],
        );
        let mut table = UniformTable::parse(&bytes).unwrap().unwrap();
        table.count = 2;

        let err = SymbolTable::from_uniform_table(&table).unwrap_err();
        assert_eq!(err.kind(), crate::LinkErrorKind::CorruptStream);
    }

    #[test]
    fn size_does_not_overflow_u16() {
        let bytes = build_uniform_stream(
            0,
            &[UniformDesc {
                name: "big",
                data: UniformData {
                    element_count: 0xFFFF,
                    element_size: 0xFFFF,
                    ..float_uniform(1, 0)
                },
                initializer: None,
            }],
        );
        let table = UniformTable::parse(&bytes).unwrap().unwrap();
        let symbols = SymbolTable::from_uniform_table(&table).unwrap();
        assert_eq!(symbols.get("big").unwrap().size, 0xFFFF * 0xFFFF);
    }
}
