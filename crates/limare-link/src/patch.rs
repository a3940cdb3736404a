//! Slot remapping over vertex machine code.
//!
//! Every vertex instruction is 128 bits wide, stored as four little-endian words. Attribute
//! and varying references are 5-bit fields: bit 4 flags the reference as present, bits 0..3
//! hold the slot.
//!
//! The compiler numbers slots in its own order (slot 0 = color, slot 1 = position) while the
//! driver binds vertices to slot 0 and color to slot 1. Linking rewrites every present field
//! with [`remap_slot`]:
//!
//! | field | location |
//! |---|---|
//! | attribute | word 1, bits 26..30 |
//! | varying A | word 2, bits 26..30 |
//! | varying B | bit 0 in word 2 bit 31, bits 1..4 in word 3 bits 0..3 |
//!
//! Fields without the presence bit are left alone, and no other bit of an instruction is
//! touched.

use crate::error::LinkError;

/// Number of 32-bit words per vertex instruction.
pub const INSTRUCTION_WORDS: usize = 4;

const FIELD_PRESENT: u32 = 0x10;
const FIELD_SLOT_MASK: u32 = 0x0F;
const FIELD_MASK: u32 = 0x1F;

const ATTRIBUTE_WORD: usize = 1;
const ATTRIBUTE_SHIFT: u32 = 26;

const VARYING_A_WORD: usize = 2;
const VARYING_A_SHIFT: u32 = 26;

// Varying B straddles words 2 and 3.
const VARYING_B_LOW_WORD: usize = 2;
const VARYING_B_LOW_SHIFT: u32 = 31;
const VARYING_B_HIGH_WORD: usize = 3;
// Slot bits 1..3 live in word 3 bits 0..2; bit 3 of word 3 is the presence flag.
const VARYING_B_HIGH_SLOT_MASK: u32 = 0x07;

/// Maps a compiler slot to the driver's slot: `0 → 1`, anything else `→ 0`.
///
/// This is a one-step table, not an involution: slot 2 maps to 0, which maps back to 1.
pub fn remap_slot(slot: u32) -> u32 {
    if slot == 0 { 1 } else { 0 }
}

/// Returns the remapped slot for a present 5-bit field, `None` when the field is unused.
fn remap_field(field: u32) -> Option<u32> {
    if field & FIELD_PRESENT == 0 {
        return None;
    }
    Some(remap_slot(field & FIELD_SLOT_MASK))
}

/// Counters reported by the rewrite passes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatchReport {
    /// Whole instructions visited.
    pub instructions: usize,
    /// Attribute fields rewritten.
    pub attribute_fields: usize,
    /// Varying fields rewritten, A and B counted separately.
    pub varying_fields: usize,
}

impl PatchReport {
    fn merge(self, other: PatchReport) -> PatchReport {
        PatchReport {
            instructions: self.instructions.max(other.instructions),
            attribute_fields: self.attribute_fields + other.attribute_fields,
            varying_fields: self.varying_fields + other.varying_fields,
        }
    }
}

/// Rewrites the attribute slot field of every instruction.
pub fn patch_attribute_slots(code: &mut [u32]) -> PatchReport {
    let mut report = PatchReport::default();

    for instr in code.chunks_exact_mut(INSTRUCTION_WORDS) {
        report.instructions += 1;

        let word = &mut instr[ATTRIBUTE_WORD];
        let Some(slot) = remap_field((*word >> ATTRIBUTE_SHIFT) & FIELD_MASK) else {
            continue;
        };
        *word = (*word & !(FIELD_SLOT_MASK << ATTRIBUTE_SHIFT)) | (slot << ATTRIBUTE_SHIFT);
        report.attribute_fields += 1;
    }

    report
}

/// Rewrites both varying slot fields of every instruction.
///
/// The 3-bit varying entry fields that precede them are not understood yet and are left
/// untouched.
pub fn patch_varying_slots(code: &mut [u32]) -> PatchReport {
    let mut report = PatchReport::default();

    for instr in code.chunks_exact_mut(INSTRUCTION_WORDS) {
        report.instructions += 1;

        let word = instr[VARYING_A_WORD];
        if let Some(slot) = remap_field((word >> VARYING_A_SHIFT) & FIELD_MASK) {
            instr[VARYING_A_WORD] =
                (word & !(FIELD_SLOT_MASK << VARYING_A_SHIFT)) | (slot << VARYING_A_SHIFT);
            report.varying_fields += 1;
        }

        let low = instr[VARYING_B_LOW_WORD];
        let high = instr[VARYING_B_HIGH_WORD];
        let field = ((low >> VARYING_B_LOW_SHIFT) & 0x01) | ((high << 1) & 0x1E);
        if let Some(slot) = remap_field(field) {
            instr[VARYING_B_LOW_WORD] =
                (low & !(1 << VARYING_B_LOW_SHIFT)) | ((slot & 0x01) << VARYING_B_LOW_SHIFT);
            instr[VARYING_B_HIGH_WORD] =
                (high & !VARYING_B_HIGH_SLOT_MASK) | ((slot >> 1) & VARYING_B_HIGH_SLOT_MASK);
            report.varying_fields += 1;
        }
    }

    report
}

/// A machine-code segment as a flat array of 32-bit words.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MachineCode {
    words: Vec<u32>,
}

impl MachineCode {
    /// Decodes little-endian words. The segment length must be a whole number of words.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, LinkError> {
        if !bytes.len().is_multiple_of(4) {
            return Err(LinkError::corrupt(format!(
                "machine code length {} is not a multiple of 4",
                bytes.len()
            )));
        }

        let mut words = Vec::new();
        words.try_reserve_exact(bytes.len() / 4).map_err(|_| {
            LinkError::allocation(format!("failed to copy {} bytes of machine code", bytes.len()))
        })?;
        words.extend(
            bytes
                .chunks_exact(4)
                .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]])),
        );
        Ok(Self { words })
    }

    /// Wraps already-decoded words.
    pub fn from_words(words: Vec<u32>) -> Self {
        Self { words }
    }

    /// The segment as words.
    pub fn words(&self) -> &[u32] {
        &self.words
    }

    /// Mutable access to the words.
    pub fn words_mut(&mut self) -> &mut [u32] {
        &mut self.words
    }

    /// Number of whole 128-bit instructions. Trailing words are kept but never patched.
    pub fn instruction_count(&self) -> usize {
        self.words.len() / INSTRUCTION_WORDS
    }

    /// The `index`th instruction, if the segment holds it whole.
    pub fn instruction(&self, index: usize) -> Option<[u32; INSTRUCTION_WORDS]> {
        let start = index.checked_mul(INSTRUCTION_WORDS)?;
        let words = self.words.get(start..start.checked_add(INSTRUCTION_WORDS)?)?;
        Some([words[0], words[1], words[2], words[3]])
    }

    /// Segment length in bytes.
    pub fn len_bytes(&self) -> usize {
        self.words.len() * 4
    }

    /// Whether the segment holds no words.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Encodes the words back to little-endian bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.words.iter().flat_map(|w| w.to_le_bytes()).collect()
    }

    /// Runs the attribute and/or varying passes over the segment.
    pub fn patch_slots(&mut self, attributes: bool, varyings: bool) -> PatchReport {
        let mut report = PatchReport {
            instructions: self.instruction_count(),
            ..PatchReport::default()
        };
        if attributes {
            report = report.merge(patch_attribute_slots(&mut self.words));
        }
        if varyings {
            report = report.merge(patch_varying_slots(&mut self.words));
        }
        report
    }
}
