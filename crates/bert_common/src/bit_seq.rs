//! Packed two-state bit sequences for flat frame payload streams.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A sequence of bits packed 64 per `u64` word, LSB first.
///
/// This is the flat bit stream produced by the frame codec: payload bits
/// with all padding stripped, in frame-major, word, then LSB-first order.
/// Bit `i` lives in word `i / 64` at position `i % 64`.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BitSeq {
    len: usize,
    data: Vec<u64>,
}

/// Number of bits packed per storage word.
const BITS_PER_WORD: usize = 64;

impl BitSeq {
    /// Creates a sequence of `len` zero bits.
    pub fn zeros(len: usize) -> Self {
        Self {
            len,
            data: vec![0; storage_words(len)],
        }
    }

    /// Builds a sequence from 32-bit words, each contributing 32 bits LSB first.
    pub fn from_u32_words(words: &[u32]) -> Self {
        let mut seq = Self::zeros(words.len() * 32);
        for (i, &w) in words.iter().enumerate() {
            seq.write_bits(i * 32, 32, u64::from(w));
        }
        seq
    }

    /// Returns the sequence as 32-bit words. The length must be a multiple of 32.
    ///
    /// # Panics
    ///
    /// Panics if `self.len()` is not a multiple of 32.
    pub fn to_u32_words(&self) -> Vec<u32> {
        assert!(
            self.len % 32 == 0,
            "bit length {} is not a whole number of words",
            self.len
        );
        (0..self.len / 32)
            .map(|i| self.read_bits(i * 32, 32) as u32)
            .collect()
    }

    /// Returns the number of bits.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the sequence holds no bits.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Gets the bit at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.len()`.
    pub fn get(&self, index: usize) -> bool {
        assert!(
            index < self.len,
            "index {index} out of bounds for length {}",
            self.len
        );
        (self.data[index / BITS_PER_WORD] >> (index % BITS_PER_WORD)) & 1 != 0
    }

    /// Sets the bit at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.len()`.
    pub fn set(&mut self, index: usize, value: bool) {
        assert!(
            index < self.len,
            "index {index} out of bounds for length {}",
            self.len
        );
        let word = &mut self.data[index / BITS_PER_WORD];
        let mask = 1u64 << (index % BITS_PER_WORD);
        if value {
            *word |= mask;
        } else {
            *word &= !mask;
        }
    }

    /// Reads `width` bits (at most 64) starting at `start`, LSB first.
    ///
    /// # Panics
    ///
    /// Panics if `width > 64` or the range extends past the end.
    pub fn read_bits(&self, start: usize, width: u32) -> u64 {
        assert!(width <= 64, "cannot read {width} bits into a u64");
        assert!(
            start + width as usize <= self.len,
            "range {start}+{width} out of bounds for length {}",
            self.len
        );
        let mut value = 0u64;
        for j in 0..width as usize {
            if self.get(start + j) {
                value |= 1 << j;
            }
        }
        value
    }

    /// Writes the low `width` bits (at most 64) of `value` starting at `start`.
    ///
    /// # Panics
    ///
    /// Panics if `width > 64` or the range extends past the end.
    pub fn write_bits(&mut self, start: usize, width: u32, value: u64) {
        assert!(width <= 64, "cannot write {width} bits from a u64");
        assert!(
            start + width as usize <= self.len,
            "range {start}+{width} out of bounds for length {}",
            self.len
        );
        for j in 0..width as usize {
            self.set(start + j, (value >> j) & 1 != 0);
        }
    }

    /// Returns the number of set bits.
    pub fn count_ones(&self) -> usize {
        self.data.iter().map(|w| w.count_ones() as usize).sum()
    }
}

fn storage_words(len: usize) -> usize {
    len.div_ceil(BITS_PER_WORD)
}

impl fmt::Debug for BitSeq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BitSeq(len={}, ones={})", self.len, self.count_ones())
    }
}
