//! Huffman code-table entries as the encoder hardware stores them.
//!
//! Each entry packs a code length and a code into one word. The field
//! layout is a parameter: the default matches the encoder's
//! `len = code[19:16]`, `code = code[15:0]` split.

use crate::words::{width_mask, WordSequence};
use bert_common::{BertError, BertResult};
use serde::{Deserialize, Serialize};

/// Bit layout of a packed code-table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodePacking {
    /// Left shift applied to the code length.
    pub length_shift: u32,
    /// Width of the length field.
    pub length_bits: u32,
    /// Mask of the code field, applied unshifted.
    pub code_mask: u64,
}

impl Default for CodePacking {
    fn default() -> Self {
        Self {
            length_shift: 16,
            length_bits: 4,
            code_mask: 0xFFFF,
        }
    }
}

impl CodePacking {
    /// Bits needed to hold a packed entry.
    pub fn entry_bits(&self) -> u32 {
        let code_bits = 64 - self.code_mask.leading_zeros();
        code_bits.max(self.length_shift + self.length_bits)
    }

    /// True if the length and code fields do not overlap and fit in 64 bits.
    pub fn is_well_formed(&self) -> bool {
        if self.length_bits == 0 || self.length_shift + self.length_bits > 64 {
            return false;
        }
        let length_field = width_mask(self.length_bits) << self.length_shift;
        length_field & self.code_mask == 0
    }

    /// Packs one entry, rejecting fields that do not fit.
    ///
    /// The layout must be well formed; see [`CodePacking::is_well_formed`].
    pub fn pack(&self, length: u32, code: u64) -> BertResult<u64> {
        let length_mask = width_mask(self.length_bits);
        if u64::from(length) > length_mask {
            return Err(BertError::out_of_range(
                "code length",
                length,
                length_mask.saturating_add(1),
            ));
        }
        if code & !self.code_mask != 0 {
            return Err(BertError::out_of_range(
                "code",
                code,
                self.code_mask.saturating_add(1),
            ));
        }
        Ok(u64::from(length) << self.length_shift | code)
    }

    /// Splits a packed entry into `(length, code)`.
    pub fn unpack(&self, entry: u64) -> (u32, u64) {
        let length = entry.checked_shr(self.length_shift).unwrap_or(0) & width_mask(self.length_bits);
        (length as u32, entry & self.code_mask)
    }
}

/// A code length and code for one symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeAssignment {
    /// Code length in bits.
    pub length: u32,
    /// The code value.
    pub code: u64,
}

/// Computes per-symbol codes from a symbol histogram.
///
/// The code-length algorithm itself is supplied by the caller.
pub trait CodeAssigner {
    /// Returns one assignment per symbol, in symbol order.
    fn assign(&self, histogram: &[u64]) -> Vec<CodeAssignment>;
}

impl<F> CodeAssigner for F
where
    F: Fn(&[u64]) -> Vec<CodeAssignment>,
{
    fn assign(&self, histogram: &[u64]) -> Vec<CodeAssignment> {
        self(histogram)
    }
}

/// A table of `entries` words, entry `i` encoding `(length, i mod 256)`.
pub fn identity_code_table(
    packing: &CodePacking,
    entries: usize,
    length: u32,
    word_width: u32,
) -> BertResult<WordSequence> {
    let values = (0..entries as u64)
        .map(|i| packing.pack(length, i % 256))
        .collect::<BertResult<Vec<_>>>()?;
    WordSequence::new(word_width, values)
}

/// Builds a code table from a histogram with an external assigner.
///
/// Entries past the last assigned symbol are zero.
pub fn recompute_code_table(
    histogram: &WordSequence,
    assigner: &dyn CodeAssigner,
    packing: &CodePacking,
    entries: usize,
    word_width: u32,
) -> BertResult<WordSequence> {
    let assignments = assigner.assign(histogram.values());
    if assignments.len() > entries {
        return Err(BertError::size_mismatch(
            "code assignments",
            entries as u64,
            assignments.len() as u64,
        ));
    }
    let mut values = assignments
        .iter()
        .map(|a| packing.pack(a.length, a.code))
        .collect::<BertResult<Vec<_>>>()?;
    values.resize(entries, 0);
    WordSequence::new(word_width, values)
}
