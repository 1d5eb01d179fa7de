//! Logical memories and the slot table that names them.
//!
//! A logical memory is an ordered list of block RAM primitives whose
//! capacities are concatenated into one bit address space. Logical bit `x`
//! lives in the first placement whose cumulative capacity exceeds `x`.

use crate::axi::AxiWindow;
use crate::geometry::Geometry;
use crate::translate::{BlockPlacement, FrameCoordinate};
use bert_common::{BertError, BertResult};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Maps a hierarchical memory name to its slot in a table.
pub trait SlotResolver {
    /// Resolves `path` to a slot index, or fails with `UnresolvedName`.
    fn resolve(&self, path: &str) -> BertResult<usize>;
}

/// One named on-chip memory and where its bits physically live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogicalMemory {
    /// Short name, e.g. `hist`.
    pub name: String,
    /// Hierarchical instance path of the memory in the design.
    pub path: String,
    /// Primitives holding the memory, lowest logical bits first.
    pub placements: Vec<BlockPlacement>,
    /// Total logical bits.
    pub bit_width: u32,
    /// Bits per logical word.
    pub word_width: u32,
    /// Bus window of the same memory, if it is AXI-visible.
    pub axi: Option<AxiWindow>,
}

impl LogicalMemory {
    /// Number of logical words. Zero when the word width is zero.
    pub fn depth(&self) -> u32 {
        self.bit_width.checked_div(self.word_width).unwrap_or(0)
    }

    /// Summed capacity of all placements.
    pub fn capacity(&self) -> u64 {
        self.placements.iter().map(|p| u64::from(p.capacity())).sum()
    }

    /// Checks widths and placements against the family geometry.
    pub fn validate(&self, geometry: &Geometry) -> BertResult<()> {
        if !(1..=64).contains(&self.word_width) {
            return Err(BertError::out_of_range("word width", self.word_width, 65u32));
        }
        if self.bit_width % self.word_width != 0 {
            return Err(BertError::size_mismatch(
                "whole words in bit width",
                u64::from(self.depth() + 1) * u64::from(self.word_width),
                self.bit_width,
            ));
        }
        if self.placements.is_empty() {
            return Err(BertError::size_mismatch("placements", 1u32, 0u32));
        }
        for placement in &self.placements {
            placement.validate(geometry)?;
        }
        if u64::from(self.bit_width) > self.capacity() {
            return Err(BertError::size_mismatch(
                "memory capacity",
                self.capacity(),
                self.bit_width,
            ));
        }
        if let Some(window) = &self.axi {
            window.validate(self.word_width)?;
            if window.entries != self.depth() {
                return Err(BertError::size_mismatch(
                    "axi entries",
                    self.depth(),
                    window.entries,
                ));
            }
        }
        Ok(())
    }

    /// The smallest frame run covering every placement's column.
    pub fn frame_span(&self, geometry: &Geometry) -> Range<u32> {
        let start = self
            .placements
            .iter()
            .map(|p| p.column_frame)
            .min()
            .unwrap_or(0);
        let end = self
            .placements
            .iter()
            .map(|p| p.frames(geometry).end)
            .max()
            .unwrap_or(start);
        start..end
    }

    /// Maps a logical bit to its frame coordinate.
    pub fn locate_bit(&self, geometry: &Geometry, bit: u32) -> BertResult<FrameCoordinate> {
        if bit >= self.bit_width {
            return Err(BertError::out_of_range("logical bit", bit, self.bit_width));
        }
        let mut offset = bit;
        for placement in &self.placements {
            if offset < placement.capacity() {
                return placement.locate(geometry, offset);
            }
            offset -= placement.capacity();
        }
        Err(BertError::out_of_range("logical bit", bit, self.capacity()))
    }

    /// Maps bit `bit` of logical word `index` to its frame coordinate.
    pub fn locate_word(
        &self,
        geometry: &Geometry,
        index: u32,
        bit: u32,
    ) -> BertResult<FrameCoordinate> {
        if index >= self.depth() {
            return Err(BertError::out_of_range("word index", index, self.depth()));
        }
        if bit >= self.word_width {
            return Err(BertError::out_of_range("word bit", bit, self.word_width));
        }
        self.locate_bit(geometry, index * self.word_width + bit)
    }

    /// Yields the frame coordinate of every logical bit in ascending order.
    pub fn coordinates<'a>(
        &'a self,
        geometry: &'a Geometry,
    ) -> impl Iterator<Item = BertResult<FrameCoordinate>> + 'a {
        let mut remaining = self.bit_width;
        self.placements.iter().flat_map(move |placement| {
            let take = remaining.min(placement.capacity());
            remaining -= take;
            (0..take).map(move |bit| placement.locate(geometry, bit))
        })
    }
}

/// The ordered set of logical memories known for a design.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryTable {
    memories: Vec<LogicalMemory>,
}

impl MemoryTable {
    /// Creates a table from memories in slot order.
    pub fn new(memories: Vec<LogicalMemory>) -> Self {
        Self { memories }
    }

    /// Appends a memory and returns its slot.
    pub fn push(&mut self, memory: LogicalMemory) -> usize {
        self.memories.push(memory);
        self.memories.len() - 1
    }

    /// The memory in `slot`.
    pub fn get(&self, slot: usize) -> BertResult<&LogicalMemory> {
        self.memories
            .get(slot)
            .ok_or_else(|| BertError::out_of_range("slot", slot as u64, self.memories.len() as u64))
    }

    /// Resolves `path` and returns the memory.
    pub fn lookup(&self, path: &str) -> BertResult<&LogicalMemory> {
        self.get(self.resolve(path)?)
    }

    /// Number of memories.
    pub fn len(&self) -> usize {
        self.memories.len()
    }

    /// Returns true if the table has no memories.
    pub fn is_empty(&self) -> bool {
        self.memories.is_empty()
    }

    /// Iterates memories in slot order.
    pub fn iter(&self) -> std::slice::Iter<'_, LogicalMemory> {
        self.memories.iter()
    }

    /// Validates every memory against the family geometry.
    pub fn validate(&self, geometry: &Geometry) -> BertResult<()> {
        self.memories.iter().try_for_each(|m| m.validate(geometry))
    }
}

impl SlotResolver for MemoryTable {
    fn resolve(&self, path: &str) -> BertResult<usize> {
        self.memories
            .iter()
            .position(|m| m.path == path)
            .or_else(|| self.memories.iter().position(|m| m.name == path))
            .ok_or_else(|| BertError::UnresolvedName(path.to_string()))
    }
}
