//! Frame address translation.
//!
//! Two levels of addressing meet here. [`StreamLayout`] maps bit offsets in a
//! raw readback stream (padding included) to frame coordinates and back.
//! [`BlockPlacement`] maps bit offsets inside one block RAM primitive to
//! frame coordinates and back, following the slice layout of the family's
//! [`Geometry`].
//!
//! Both translators reject rather than clamp: an offset past the end is
//! [`BertError::OutOfRange`], and an offset that lands on padding or on bits
//! owned by something else is [`BertError::PaddingAccess`].

use crate::geometry::{Geometry, BRAM18_DATA_BITS, BRAM36_DATA_BITS, WORD_BITS};
use bert_common::{BertError, BertResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

/// A physical bit position in configuration memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FrameCoordinate {
    /// Absolute device frame index.
    pub frame_index: u32,
    /// Word within the frame payload.
    pub word_index: u32,
    /// Bit within the word, LSB = 0.
    pub bit_index: u32,
}

impl FrameCoordinate {
    /// Builds a coordinate from a frame index and a bit offset within the frame.
    pub fn from_frame_bit(frame_index: u32, frame_bit: u32) -> Self {
        Self {
            frame_index,
            word_index: frame_bit / WORD_BITS,
            bit_index: frame_bit % WORD_BITS,
        }
    }

    /// Returns the bit offset within the frame payload.
    pub fn frame_bit(&self) -> u32 {
        self.word_index * WORD_BITS + self.bit_index
    }

    fn check_in_frame(&self, geometry: &Geometry) -> BertResult<()> {
        if self.word_index >= geometry.words_per_frame {
            return Err(BertError::out_of_range(
                "word",
                self.word_index,
                geometry.words_per_frame,
            ));
        }
        if self.bit_index >= WORD_BITS {
            return Err(BertError::out_of_range("bit", self.bit_index, WORD_BITS));
        }
        Ok(())
    }
}

impl fmt::Display for FrameCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "frame {} word {} bit {}",
            self.frame_index, self.word_index, self.bit_index
        )
    }
}

/// The readback stream layout of a contiguous run of frames.
#[derive(Debug, Clone, Copy)]
pub struct StreamLayout<'g> {
    geometry: &'g Geometry,
    first_frame: u32,
    frame_count: u32,
}

impl<'g> StreamLayout<'g> {
    /// Describes a readback of `frame_count` frames starting at `first_frame`.
    pub fn new(geometry: &'g Geometry, first_frame: u32, frame_count: u32) -> Self {
        Self {
            geometry,
            first_frame,
            frame_count,
        }
    }

    /// Total bits in the stream, padding included.
    pub fn total_bits(&self) -> u64 {
        self.geometry.readback_words(self.frame_count) as u64 * u64::from(WORD_BITS)
    }

    /// Maps a stream bit offset to the frame coordinate holding it.
    ///
    /// Offsets inside the prologue, an inter-frame gap or the epilogue fail
    /// with `PaddingAccess`. The first bit of every frame is data.
    pub fn locate(&self, stream_bit: u64) -> BertResult<FrameCoordinate> {
        let total = self.total_bits();
        if stream_bit >= total {
            return Err(BertError::out_of_range("stream bit", stream_bit, total));
        }
        let g = self.geometry;
        let word = (stream_bit / u64::from(WORD_BITS)) as usize;
        let bit = (stream_bit % u64::from(WORD_BITS)) as u32;

        let before = g.words_before_frames as usize;
        if word < before {
            return Err(BertError::padding("stream bit", stream_bit));
        }
        let rel = word - before;
        let frame = rel / g.frame_pitch_words();
        let word_in_frame = rel % g.frame_pitch_words();
        if frame >= self.frame_count as usize || word_in_frame >= g.words_per_frame as usize {
            return Err(BertError::padding("stream bit", stream_bit));
        }
        let frame_index = self
            .first_frame
            .checked_add(frame as u32)
            .ok_or_else(|| BertError::out_of_range("frame", stream_bit, total))?;
        Ok(FrameCoordinate {
            frame_index,
            word_index: word_in_frame as u32,
            bit_index: bit,
        })
    }

    /// Maps a frame coordinate back to its stream bit offset.
    pub fn linearize(&self, coord: FrameCoordinate) -> BertResult<u64> {
        let frames = self.frames();
        if !frames.contains(&coord.frame_index) {
            return Err(BertError::out_of_range(
                "frame",
                coord.frame_index,
                frames.end,
            ));
        }
        coord.check_in_frame(self.geometry)?;
        let word = self
            .geometry
            .frame_payload_offset(coord.frame_index - self.first_frame)
            + coord.word_index as usize;
        Ok(word as u64 * u64::from(WORD_BITS) + u64::from(coord.bit_index))
    }

    /// The frames covered by this stream.
    pub fn frames(&self) -> Range<u32> {
        self.first_frame..self.first_frame.saturating_add(self.frame_count)
    }
}

/// Block RAM primitive granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BramKind {
    /// An 18k primitive: one half of a BRAM36 row.
    Ramb18,
    /// A 36k primitive: both halves of a BRAM36 row, interleaved.
    Ramb36,
}

impl BramKind {
    /// Data bits held by one primitive of this kind.
    pub fn capacity(self) -> u32 {
        match self {
            BramKind::Ramb18 => BRAM18_DATA_BITS,
            BramKind::Ramb36 => BRAM36_DATA_BITS,
        }
    }
}

impl fmt::Display for BramKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BramKind::Ramb18 => write!(f, "RAMB18"),
            BramKind::Ramb36 => write!(f, "RAMB36"),
        }
    }
}

/// The physical location of one block RAM primitive.
///
/// For a `Ramb18` the row is a BRAM18 row (its parity picks the half of the
/// enclosing BRAM36). For a `Ramb36` the row is a BRAM36 row. A 36k block
/// stores its bits in lanes of one slice each: even lanes go to the lower
/// half and odd lanes to the upper half, so frame `f` of the column holds
/// lanes `2f` and `2f + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockPlacement {
    /// Primitive granularity.
    pub kind: BramKind,
    /// First frame of the BRAM content column holding the primitive.
    pub column_frame: u32,
    /// Row within the column, counted in units of `kind`.
    pub row: u32,
}

impl BlockPlacement {
    /// Data bits held by this primitive.
    pub fn capacity(&self) -> u32 {
        self.kind.capacity()
    }

    /// The frames of this primitive's column.
    pub fn frames(&self, geometry: &Geometry) -> Range<u32> {
        self.column_frame..self
            .column_frame
            .saturating_add(geometry.frames_per_bram_column)
    }

    /// Checks that the row exists in the family's column and that the
    /// column ends inside the frame address space.
    pub fn validate(&self, geometry: &Geometry) -> BertResult<()> {
        if self
            .column_frame
            .checked_add(geometry.frames_per_bram_column)
            .is_none()
        {
            return Err(BertError::out_of_range(
                "column frame",
                u64::from(self.column_frame) + u64::from(geometry.frames_per_bram_column),
                u32::MAX,
            ));
        }
        let rows = match self.kind {
            BramKind::Ramb18 => geometry.bram18_rows(),
            BramKind::Ramb36 => geometry.bram36_rows(),
        };
        if self.row >= rows {
            return Err(BertError::out_of_range("block row", self.row, rows));
        }
        Ok(())
    }

    /// Frame-bit starts of the slices this primitive owns, lower half first.
    fn slice_starts(&self, geometry: &Geometry) -> BertResult<&'static [u32]> {
        self.validate(geometry)?;
        let starts = geometry.bram18_starts;
        Ok(match self.kind {
            BramKind::Ramb18 => &starts[self.row as usize..=self.row as usize],
            BramKind::Ramb36 => &starts[2 * self.row as usize..2 * self.row as usize + 2],
        })
    }

    /// Maps a bit offset within this primitive to its frame coordinate.
    pub fn locate(&self, geometry: &Geometry, bit: u32) -> BertResult<FrameCoordinate> {
        let starts = self.slice_starts(geometry)?;
        if bit >= self.capacity() {
            return Err(BertError::out_of_range("block bit", bit, self.capacity()));
        }
        let slice = geometry.bram18_slice_bits();
        let lane = bit / slice;
        let halves = starts.len() as u32;
        let start = starts[(lane % halves) as usize];
        Ok(FrameCoordinate::from_frame_bit(
            self.column_frame + lane / halves,
            start + bit % slice,
        ))
    }

    /// Maps a frame coordinate back to a bit offset within this primitive.
    ///
    /// Coordinates inside the column that this primitive does not own (other
    /// rows, write-enable columns, the clock row) fail with `PaddingAccess`.
    pub fn linearize(&self, geometry: &Geometry, coord: FrameCoordinate) -> BertResult<u32> {
        let starts = self.slice_starts(geometry)?;
        let frames = self.frames(geometry);
        if !frames.contains(&coord.frame_index) {
            return Err(BertError::out_of_range(
                "frame",
                coord.frame_index,
                frames.end,
            ));
        }
        coord.check_in_frame(geometry)?;

        let slice = geometry.bram18_slice_bits();
        let frame_bit = coord.frame_bit();
        let halves = starts.len() as u32;
        let frame_rel = coord.frame_index - self.column_frame;
        for (half, &start) in starts.iter().enumerate() {
            if (start..start + slice).contains(&frame_bit) {
                let lane = frame_rel * halves + half as u32;
                return Ok(lane * slice + (frame_bit - start));
            }
        }
        Err(BertError::padding("frame bit", frame_bit))
    }
}

impl fmt::Display for BlockPlacement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} row {} @ frame {}",
            self.kind, self.row, self.column_frame
        )
    }
}

/// What a bit position inside a BRAM content frame is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum FrameBitRole {
    /// Data bit of BRAM18 row `row`, at `offset` within its slice.
    Slice {
        /// BRAM18 row.
        row: u32,
        /// Offset within the slice.
        offset: u32,
    },
    /// Write-enable column of BRAM36 row `row`.
    WriteEnable {
        /// BRAM36 row.
        row: u32,
    },
    /// Not owned by any row (clock row, inter-row spare bits).
    Unowned,
}

/// Classifies a frame bit against the family's slice layout.
pub fn classify_frame_bit(geometry: &Geometry, frame_bit: u32) -> FrameBitRole {
    let slice = geometry.bram18_slice_bits();
    if let Some(row) = geometry
        .bit_locations
        .iter()
        .position(|&loc| loc == frame_bit)
    {
        return FrameBitRole::WriteEnable { row: row as u32 };
    }
    // Starts are sorted: the owner, if any, is the last slice starting at or before the bit.
    let idx = geometry.bram18_starts.partition_point(|&s| s <= frame_bit);
    if idx > 0 {
        let start = geometry.bram18_starts[idx - 1];
        if frame_bit < start + slice {
            return FrameBitRole::Slice {
                row: idx as u32 - 1,
                offset: frame_bit - start,
            };
        }
    }
    FrameBitRole::Unowned
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{SERIES7, ULTRASCALE_PLUS};

    fn p18(row: u32) -> BlockPlacement {
        BlockPlacement {
            kind: BramKind::Ramb18,
            column_frame: 512,
            row,
        }
    }

    fn p36(row: u32) -> BlockPlacement {
        BlockPlacement {
            kind: BramKind::Ramb36,
            column_frame: 512,
            row,
        }
    }

    #[test]
    fn column_past_frame_space_rejected() {
        let g = &ULTRASCALE_PLUS;
        let p = BlockPlacement {
            column_frame: u32::MAX - 10,
            ..p18(0)
        };
        assert_eq!(
            p.validate(g).unwrap_err(),
            BertError::out_of_range("column frame", u64::from(u32::MAX) + 246, u32::MAX)
        );
        assert!(p.locate(g, 0).is_err());
        assert_eq!(p.frames(g), u32::MAX - 10..u32::MAX);
    }

    #[test]
    fn stream_near_frame_space_end_does_not_wrap() {
        let g = &SERIES7;
        let layout = StreamLayout::new(g, u32::MAX - 1, 4);
        assert_eq!(layout.frames(), u32::MAX - 1..u32::MAX);
        let third = g.frame_payload_offset(2) as u64 * 32;
        assert!(matches!(
            layout.locate(third),
            Err(BertError::OutOfRange { .. })
        ));
    }

    // -- Stream layout --

    #[test]
    fn stream_first_payload_bit() {
        let layout = StreamLayout::new(&ULTRASCALE_PLUS, 100, 3);
        let coord = layout.locate(196 * 32).unwrap();
        assert_eq!(
            coord,
            FrameCoordinate {
                frame_index: 100,
                word_index: 0,
                bit_index: 0
            }
        );
    }

    #[test]
    fn stream_prologue_is_padding() {
        let layout = StreamLayout::new(&ULTRASCALE_PLUS, 0, 2);
        for bit in [0, 31, 196 * 32 - 1] {
            assert!(matches!(
                layout.locate(bit),
                Err(BertError::PaddingAccess { .. })
            ));
        }
    }

    #[test]
    fn stream_gap_is_padding_and_boundary_is_data() {
        let g = &ULTRASCALE_PLUS;
        let layout = StreamLayout::new(g, 0, 2);
        let gap_start = (196 + 93) * 32;
        let next_frame = (196 + 93 + 7) * 32;
        assert!(matches!(
            layout.locate(gap_start),
            Err(BertError::PaddingAccess { .. })
        ));
        assert!(matches!(
            layout.locate(next_frame - 1),
            Err(BertError::PaddingAccess { .. })
        ));
        let coord = layout.locate(next_frame).unwrap();
        assert_eq!(coord.frame_index, 1);
        assert_eq!(coord.frame_bit(), 0);
        let last_data = layout.locate(gap_start - 1).unwrap();
        assert_eq!(last_data.frame_index, 0);
        assert_eq!(last_data.frame_bit(), g.frame_bits() - 1);
    }

    #[test]
    fn stream_epilogue_is_padding() {
        let layout = StreamLayout::new(&SERIES7, 0, 1);
        let epilogue = (196 + 101) * 32;
        assert!(matches!(
            layout.locate(epilogue),
            Err(BertError::PaddingAccess { .. })
        ));
        assert!(matches!(
            layout.locate(layout.total_bits() - 1),
            Err(BertError::PaddingAccess { .. })
        ));
    }

    #[test]
    fn stream_past_end_is_out_of_range() {
        let layout = StreamLayout::new(&SERIES7, 0, 1);
        assert!(matches!(
            layout.locate(layout.total_bits()),
            Err(BertError::OutOfRange { .. })
        ));
    }

    #[test]
    fn stream_roundtrip_every_bit() {
        for g in [&ULTRASCALE_PLUS, &SERIES7] {
            let layout = StreamLayout::new(g, 7, 3);
            let mut data_bits = 0u64;
            for x in 0..layout.total_bits() {
                match layout.locate(x) {
                    Ok(coord) => {
                        assert_eq!(layout.linearize(coord).unwrap(), x);
                        data_bits += 1;
                    }
                    Err(BertError::PaddingAccess { .. }) => {}
                    Err(e) => panic!("unexpected error at {x}: {e}"),
                }
            }
            assert_eq!(data_bits, 3 * u64::from(g.frame_bits()));
        }
    }

    #[test]
    fn stream_linearize_rejects_foreign_frame() {
        let layout = StreamLayout::new(&ULTRASCALE_PLUS, 10, 2);
        let coord = FrameCoordinate::from_frame_bit(12, 0);
        assert!(matches!(
            layout.linearize(coord),
            Err(BertError::OutOfRange { .. })
        ));
    }

    #[test]
    fn stream_linearize_rejects_word_past_frame() {
        let layout = StreamLayout::new(&ULTRASCALE_PLUS, 0, 1);
        let coord = FrameCoordinate {
            frame_index: 0,
            word_index: 93,
            bit_index: 0,
        };
        assert!(matches!(
            layout.linearize(coord),
            Err(BertError::OutOfRange { what: "word", .. })
        ));
    }

    // -- Block placement --

    #[test]
    fn ramb18_first_and_last_bit() {
        let g = &ULTRASCALE_PLUS;
        let first = p18(3).locate(g, 0).unwrap();
        assert_eq!(first.frame_index, 512);
        assert_eq!(first.frame_bit(), 360);
        let last = p18(3).locate(g, BRAM18_DATA_BITS - 1).unwrap();
        assert_eq!(last.frame_index, 512 + 255);
        assert_eq!(last.frame_bit(), 360 + 63);
    }

    #[test]
    fn ramb18_halves_use_their_own_start() {
        let g = &SERIES7;
        assert_eq!(p18(4).locate(g, 5).unwrap().frame_bit(), 640 + 5);
        assert_eq!(p18(5).locate(g, 5).unwrap().frame_bit(), 800 + 5);
    }

    #[test]
    fn ramb36_lanes_alternate_halves() {
        let g = &ULTRASCALE_PLUS;
        let p = p36(6);
        let lower = p.locate(g, 0).unwrap();
        let upper = p.locate(g, 64).unwrap();
        let next = p.locate(g, 128).unwrap();
        assert_eq!((lower.frame_index, lower.frame_bit()), (512, 1536));
        assert_eq!((upper.frame_index, upper.frame_bit()), (512, 1656));
        assert_eq!((next.frame_index, next.frame_bit()), (513, 1536));
    }

    #[test]
    fn block_bit_past_capacity_is_out_of_range() {
        let g = &SERIES7;
        assert!(matches!(
            p18(0).locate(g, BRAM18_DATA_BITS),
            Err(BertError::OutOfRange { what: "block bit", .. })
        ));
        assert!(matches!(
            p36(0).locate(g, BRAM36_DATA_BITS),
            Err(BertError::OutOfRange { .. })
        ));
    }

    #[test]
    fn block_row_past_column_is_out_of_range() {
        let g = &SERIES7;
        assert!(matches!(
            p18(20).locate(g, 0),
            Err(BertError::OutOfRange { what: "block row", .. })
        ));
        assert!(matches!(
            p36(10).locate(g, 0),
            Err(BertError::OutOfRange { .. })
        ));
    }

    #[test]
    fn block_roundtrip_all_bits() {
        for g in [&ULTRASCALE_PLUS, &SERIES7] {
            for p in [p18(0), p18(g.bram18_rows() - 1), p36(0), p36(g.bram36_rows() - 1)] {
                for x in 0..p.capacity() {
                    let coord = p.locate(g, x).unwrap();
                    assert_eq!(p.linearize(g, coord).unwrap(), x, "{p} bit {x}");
                }
            }
        }
    }

    #[test]
    fn write_enable_column_never_linearizes() {
        for g in [&ULTRASCALE_PLUS, &SERIES7] {
            for (row, &loc) in g.bit_locations.iter().enumerate() {
                let coord = FrameCoordinate::from_frame_bit(512, loc);
                assert!(matches!(
                    p36(row as u32).linearize(g, coord),
                    Err(BertError::PaddingAccess { .. })
                ));
            }
        }
    }

    #[test]
    fn clock_row_never_linearizes() {
        let g = &ULTRASCALE_PLUS;
        let coord = FrameCoordinate {
            frame_index: 600,
            word_index: 46,
            bit_index: 0,
        };
        for row in 0..g.bram36_rows() {
            assert!(matches!(
                p36(row).linearize(g, coord),
                Err(BertError::PaddingAccess { .. })
            ));
        }
    }

    #[test]
    fn other_row_is_not_owned() {
        let g = &SERIES7;
        let coord = p18(2).locate(g, 17).unwrap();
        assert!(matches!(
            p18(3).linearize(g, coord),
            Err(BertError::PaddingAccess { .. })
        ));
    }

    #[test]
    fn linearize_outside_column_is_out_of_range() {
        let g = &SERIES7;
        let coord = FrameCoordinate::from_frame_bit(512 + 128, 0);
        assert!(matches!(
            p18(0).linearize(g, coord),
            Err(BertError::OutOfRange { what: "frame", .. })
        ));
    }

    #[test]
    fn classify_bits() {
        let g = &SERIES7;
        assert_eq!(
            classify_frame_bit(g, 0),
            FrameBitRole::Slice { row: 0, offset: 0 }
        );
        assert_eq!(
            classify_frame_bit(g, 161),
            FrameBitRole::Slice { row: 1, offset: 1 }
        );
        assert_eq!(
            classify_frame_bit(g, 142),
            FrameBitRole::WriteEnable { row: 0 }
        );
        assert_eq!(classify_frame_bit(g, 1610), FrameBitRole::Unowned);
        assert_eq!(classify_frame_bit(g, 300), FrameBitRole::Unowned);
    }

    #[test]
    fn coordinate_display() {
        let c = FrameCoordinate::from_frame_bit(3, 70);
        assert_eq!(format!("{c}"), "frame 3 word 2 bit 6");
    }

    #[test]
    fn placement_serde_roundtrip() {
        let p = p36(4);
        let json = serde_json::to_string(&p).unwrap();
        assert!(json.contains("\"ramb36\""));
        let back: BlockPlacement = serde_json::from_str(&json).unwrap();
        assert_eq!(p, back);
    }
}
