//! The memory-mapped cross-check path.
//!
//! The same logical memories that are extracted from configuration frames are
//! also visible on the AXI interconnect. [`read_window`] fetches them through
//! a [`MemoryBus`] so the two readings can be compared.

use crate::words::{width_mask, WordSequence};
use bert_common::{BertError, BertResult};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;

/// Bytes per bus word.
const BUS_WORD_BYTES: u64 = 4;

/// A 32-bit memory-mapped bus.
pub trait MemoryBus {
    /// Reads the 32-bit word at `addr`.
    fn read_word(&mut self, addr: u64) -> BertResult<u32>;

    /// Writes the 32-bit word at `addr`.
    fn write_word(&mut self, addr: u64, value: u32) -> BertResult<()>;
}

/// Where a logical memory appears on the bus.
///
/// Entry `i` starts at `base + i * stride`. Entries wider than 32 bits span
/// consecutive bus words, least significant word first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxiWindow {
    /// Byte address of entry 0.
    pub base: u64,
    /// Number of entries.
    pub entries: u32,
    /// Byte distance between consecutive entries.
    pub stride: u32,
}

impl AxiWindow {
    /// Bus words needed per entry of `word_width` bits.
    pub fn words_per_entry(word_width: u32) -> u32 {
        word_width.div_ceil(32)
    }

    /// Checks that entries of `word_width` bits do not overlap.
    pub fn validate(&self, word_width: u32) -> BertResult<()> {
        let needed = Self::words_per_entry(word_width) * BUS_WORD_BYTES as u32;
        if self.stride < needed {
            return Err(BertError::size_mismatch("axi stride", needed, self.stride));
        }
        Ok(())
    }

    fn entry_addr(&self, index: u32) -> u64 {
        self.base + u64::from(index) * u64::from(self.stride)
    }
}

/// Reads every entry of `window` as a `word_width`-bit value.
pub fn read_window(
    bus: &mut dyn MemoryBus,
    window: &AxiWindow,
    word_width: u32,
) -> BertResult<WordSequence> {
    window.validate(word_width)?;
    let chunks = AxiWindow::words_per_entry(word_width);
    let mut values = Vec::with_capacity(window.entries as usize);
    for i in 0..window.entries {
        let addr = window.entry_addr(i);
        let mut value = 0u64;
        for c in 0..chunks {
            let word = bus.read_word(addr + u64::from(c) * BUS_WORD_BYTES)?;
            value |= u64::from(word) << (32 * c);
        }
        values.push(value & width_mask(word_width));
    }
    WordSequence::new(word_width, values)
}

/// Writes `values` into `window`, one entry per value.
pub fn write_window(
    bus: &mut dyn MemoryBus,
    window: &AxiWindow,
    values: &WordSequence,
) -> BertResult<()> {
    window.validate(values.word_width())?;
    if values.len() != window.entries as usize {
        return Err(BertError::size_mismatch(
            "axi entries",
            window.entries,
            values.len() as u64,
        ));
    }
    let chunks = AxiWindow::words_per_entry(values.word_width());
    for (i, &value) in values.values().iter().enumerate() {
        let addr = window.entry_addr(i as u32);
        for c in 0..chunks {
            let word = (value >> (32 * c)) as u32;
            bus.write_word(addr + u64::from(c) * BUS_WORD_BYTES, word)?;
        }
    }
    Ok(())
}

/// An in-memory bus covering `[base, base + 4 * words.len())`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusImage {
    base: u64,
    words: Vec<u32>,
}

impl BusImage {
    /// Creates a zero-filled region of `len` words at `base`.
    pub fn zeroed(base: u64, len: usize) -> Self {
        Self {
            base,
            words: vec![0; len],
        }
    }

    /// Wraps existing words at `base`.
    pub fn from_words(base: u64, words: Vec<u32>) -> Self {
        Self { base, words }
    }

    /// Loads a region dump of little-endian words.
    pub fn load(path: &Path, base: u64) -> io::Result<Self> {
        let bytes = std::fs::read(path)?;
        if bytes.len() % 4 != 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("{}: length {} is not whole words", path.display(), bytes.len()),
            ));
        }
        let words = bytes
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        Ok(Self { base, words })
    }

    /// Writes the region back out as little-endian words.
    pub fn save(&self, path: &Path) -> io::Result<()> {
        let mut bytes = Vec::with_capacity(self.words.len() * 4);
        for &w in &self.words {
            bytes.extend_from_slice(&w.to_le_bytes());
        }
        std::fs::write(path, bytes)
    }

    /// Base address of the region.
    pub fn base(&self) -> u64 {
        self.base
    }

    /// All words of the region.
    pub fn words(&self) -> &[u32] {
        &self.words
    }

    fn index(&self, addr: u64) -> BertResult<usize> {
        let end = self.base + self.words.len() as u64 * BUS_WORD_BYTES;
        if addr < self.base || addr >= end {
            return Err(BertError::out_of_range("bus address", addr, end));
        }
        if (addr - self.base) % BUS_WORD_BYTES != 0 {
            return Err(BertError::padding("unaligned bus address", addr));
        }
        Ok(((addr - self.base) / BUS_WORD_BYTES) as usize)
    }
}

impl MemoryBus for BusImage {
    fn read_word(&mut self, addr: u64) -> BertResult<u32> {
        let i = self.index(addr)?;
        Ok(self.words[i])
    }

    fn write_word(&mut self, addr: u64, value: u32) -> BertResult<()> {
        let i = self.index(addr)?;
        self.words[i] = value;
        Ok(())
    }
}
