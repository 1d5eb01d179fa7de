//! Fixed-width word sequences, the common currency of AXI and BERT reads.

use bert_common::{BertError, BertResult};
use serde::{Deserialize, Serialize};

/// Returns the mask covering the low `width` bits.
pub fn width_mask(width: u32) -> u64 {
    if width >= 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

/// One logical memory's content in ascending address order.
///
/// Every value fits in `word_width` bits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordSequence {
    word_width: u32,
    values: Vec<u64>,
}

impl WordSequence {
    /// Builds a sequence, rejecting widths outside `1..=64` and values that
    /// do not fit the width.
    pub fn new(word_width: u32, values: Vec<u64>) -> BertResult<Self> {
        if !(1..=64).contains(&word_width) {
            return Err(BertError::out_of_range("word width", word_width, 65u32));
        }
        let mask = width_mask(word_width);
        if let Some(&v) = values.iter().find(|&&v| v & !mask != 0) {
            return Err(BertError::size_mismatch(
                "word value bits",
                word_width,
                64 - v.leading_zeros(),
            ));
        }
        Ok(Self { word_width, values })
    }

    /// A sequence of `len` zero words.
    pub fn zeros(word_width: u32, len: usize) -> BertResult<Self> {
        Self::new(word_width, vec![0; len])
    }

    /// Width of each word in bits.
    pub fn word_width(&self) -> u32 {
        self.word_width
    }

    /// Number of words.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the sequence is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The word values.
    pub fn values(&self) -> &[u64] {
        &self.values
    }

    /// Total bits covered by the sequence.
    pub fn bit_len(&self) -> u64 {
        self.values.len() as u64 * u64::from(self.word_width)
    }

    /// Number of zero-valued words.
    pub fn zero_count(&self) -> usize {
        self.values.iter().filter(|&&v| v == 0).count()
    }
}

impl std::ops::Index<usize> for WordSequence {
    type Output = u64;

    fn index(&self, index: usize) -> &u64 {
        &self.values[index]
    }
}
