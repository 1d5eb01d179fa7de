//! Per-family configuration frame geometry.
//!
//! A BRAM content column is a run of `frames_per_bram_column` consecutive
//! frames. Every frame of the column carries one slice of each BRAM18 stacked
//! in that column: BRAM18 row `r` owns `bram18_slice_bits()` bits starting at
//! frame bit `bram18_starts[r]`. Even rows are the lower half of a BRAM36,
//! odd rows the upper half. Each BRAM36 row also has a write-enable bit
//! column at `bit_locations[row]` which never carries data.
//!
//! The readback stream wraps the frames in padding words: a prologue of
//! `words_before_frames`, `words_between_frames` after every frame but the
//! last, and an epilogue of `words_after_frames + pad_words`.

use bert_common::{BertError, BertResult};
use serde::Serialize;

/// Data bits held by one BRAM18 primitive (parity excluded).
pub const BRAM18_DATA_BITS: u32 = 16 * 1024;

/// Data bits held by one BRAM36 primitive (parity excluded).
pub const BRAM36_DATA_BITS: u32 = 2 * BRAM18_DATA_BITS;

/// Width of a configuration word in bits.
pub const WORD_BITS: u32 = 32;

/// Fixed frame layout constants for one device family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Geometry {
    /// Family name, as used in configuration files.
    pub family: &'static str,
    /// Number of 32-bit words in one configuration frame.
    pub words_per_frame: u32,
    /// Number of frames in one BRAM content column.
    pub frames_per_bram_column: u32,
    /// Padding words between consecutive frames in a readback stream.
    pub words_between_frames: u32,
    /// Padding words preceding the first frame of a readback stream.
    pub words_before_frames: u32,
    /// Padding words following the last frame of a readback stream.
    pub words_after_frames: u32,
    /// Extra trailing pad words (7-series only).
    pub pad_words: u32,
    /// Frame-bit offset of each BRAM18 row's slice, bottom to top.
    pub bram18_starts: &'static [u32],
    /// Frame-bit position of each BRAM36 row's write-enable column.
    pub bit_locations: &'static [u32],
}

/// UltraScale+ geometry: 12 BRAM36 rows at a 240-bit pitch with a
/// three-word clock row at words 45..48.
pub const ULTRASCALE_PLUS: Geometry = Geometry {
    family: "ultrascale_plus",
    words_per_frame: 93,
    frames_per_bram_column: 256,
    words_between_frames: 7,
    words_before_frames: 196,
    words_after_frames: 54,
    pad_words: 0,
    bram18_starts: &[
        0, 120, 240, 360, 480, 600, 720, 840, 960, 1080, 1200, 1320, //
        1536, 1656, 1776, 1896, 2016, 2136, 2256, 2376, 2496, 2616, 2736, 2856,
    ],
    bit_locations: &[100, 340, 580, 820, 1060, 1300, 1636, 1876, 2116, 2356, 2596, 2836],
};

/// 7-series geometry: 10 BRAM36 rows at a 320-bit pitch with the clock
/// word at word 50.
pub const SERIES7: Geometry = Geometry {
    family: "series7",
    words_per_frame: 101,
    frames_per_bram_column: 128,
    words_between_frames: 7,
    words_before_frames: 196,
    words_after_frames: 54,
    pad_words: 25,
    bram18_starts: &[
        0, 160, 320, 480, 640, 800, 960, 1120, 1280, 1440, //
        1632, 1792, 1952, 2112, 2272, 2432, 2592, 2752, 2912, 3072,
    ],
    bit_locations: &[142, 462, 782, 1102, 1422, 1774, 2094, 2414, 2734, 3054],
};

impl Geometry {
    /// Number of payload bits in one frame.
    pub fn frame_bits(&self) -> u32 {
        self.words_per_frame * WORD_BITS
    }

    /// Bits one BRAM18 occupies in each frame of its column.
    pub fn bram18_slice_bits(&self) -> u32 {
        BRAM18_DATA_BITS / self.frames_per_bram_column
    }

    /// Number of BRAM18 rows stacked in one column.
    pub fn bram18_rows(&self) -> u32 {
        self.bram18_starts.len() as u32
    }

    /// Number of BRAM36 rows stacked in one column.
    pub fn bram36_rows(&self) -> u32 {
        self.bit_locations.len() as u32
    }

    /// Words per frame pitch in a readback stream (payload plus gap).
    pub fn frame_pitch_words(&self) -> usize {
        (self.words_per_frame + self.words_between_frames) as usize
    }

    /// Word offset of frame `i`'s payload within a readback stream.
    pub fn frame_payload_offset(&self, i: u32) -> usize {
        self.words_before_frames as usize + i as usize * self.frame_pitch_words()
    }

    /// Total words in a readback stream of `frame_count` frames.
    ///
    /// An empty run still carries its prologue and epilogue.
    pub fn readback_words(&self, frame_count: u32) -> usize {
        let trailer = (self.words_after_frames + self.pad_words) as usize;
        if frame_count == 0 {
            return self.words_before_frames as usize + trailer;
        }
        self.frame_payload_offset(frame_count - 1) + self.words_per_frame as usize + trailer
    }

    /// Total bytes in a readback stream of `frame_count` frames.
    pub fn readback_bytes(&self, frame_count: u32) -> usize {
        self.readback_words(frame_count) * 4
    }

    /// Checks the layout invariants of this table.
    ///
    /// Offset lists must be non-decreasing and inside the frame, slices must
    /// not overlap each other or any write-enable column, and there must be
    /// exactly one write-enable column per BRAM36 row.
    pub fn validate(&self) -> BertResult<()> {
        let invalid = |msg: String| Err(BertError::InvalidGeometry(msg));

        if self.words_per_frame == 0 || self.frames_per_bram_column == 0 {
            return invalid(format!("{}: empty frame or column", self.family));
        }
        if BRAM18_DATA_BITS % self.frames_per_bram_column != 0 {
            return invalid(format!(
                "{}: {} frames do not evenly divide a BRAM18",
                self.family, self.frames_per_bram_column
            ));
        }
        if self.bram18_starts.len() != 2 * self.bit_locations.len() {
            return invalid(format!(
                "{}: {} BRAM18 rows but {} write-enable columns",
                self.family,
                self.bram18_starts.len(),
                self.bit_locations.len()
            ));
        }

        let slice = self.bram18_slice_bits();
        let frame_bits = self.frame_bits();
        for pair in self.bram18_starts.windows(2) {
            if pair[0] + slice > pair[1] {
                return invalid(format!(
                    "{}: slice at {} overlaps slice at {}",
                    self.family, pair[0], pair[1]
                ));
            }
        }
        if let Some(&last) = self.bram18_starts.last() {
            if last + slice > frame_bits {
                return invalid(format!(
                    "{}: slice at {last} runs past frame end {frame_bits}",
                    self.family
                ));
            }
        }

        for pair in self.bit_locations.windows(2) {
            if pair[0] > pair[1] {
                return invalid(format!(
                    "{}: bit locations not ordered at {}",
                    self.family, pair[1]
                ));
            }
        }
        for &loc in self.bit_locations {
            if loc >= frame_bits {
                return invalid(format!(
                    "{}: bit location {loc} outside frame",
                    self.family
                ));
            }
            if self
                .bram18_starts
                .iter()
                .any(|&start| (start..start + slice).contains(&loc))
            {
                return invalid(format!(
                    "{}: bit location {loc} falls inside a data slice",
                    self.family
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_tables_validate() {
        ULTRASCALE_PLUS.validate().unwrap();
        SERIES7.validate().unwrap();
    }

    #[test]
    fn slice_widths() {
        assert_eq!(ULTRASCALE_PLUS.bram18_slice_bits(), 64);
        assert_eq!(SERIES7.bram18_slice_bits(), 128);
    }

    #[test]
    fn row_counts() {
        assert_eq!(ULTRASCALE_PLUS.bram36_rows(), 12);
        assert_eq!(ULTRASCALE_PLUS.bram18_rows(), 24);
        assert_eq!(SERIES7.bram36_rows(), 10);
        assert_eq!(SERIES7.bram18_rows(), 20);
    }

    #[test]
    fn slices_cover_a_whole_block() {
        for g in [&ULTRASCALE_PLUS, &SERIES7] {
            assert_eq!(g.bram18_slice_bits() * g.frames_per_bram_column, BRAM18_DATA_BITS);
        }
    }

    #[test]
    fn series7_write_enable_columns_follow_rows() {
        // Upper rows sit one clock word above the lower rows.
        for (k, &loc) in SERIES7.bit_locations.iter().enumerate() {
            assert_eq!(loc, SERIES7.bram18_starts[2 * k] + 142);
        }
    }

    #[test]
    fn readback_words_single_frame() {
        assert_eq!(ULTRASCALE_PLUS.readback_words(1), 196 + 93 + 54);
        assert_eq!(SERIES7.readback_words(1), 196 + 101 + 54 + 25);
    }

    #[test]
    fn readback_words_column() {
        let g = &ULTRASCALE_PLUS;
        assert_eq!(g.readback_words(256), 196 + 256 * 93 + 255 * 7 + 54);
        assert_eq!(g.readback_bytes(256), g.readback_words(256) * 4);
    }

    #[test]
    fn readback_words_empty_run() {
        assert_eq!(SERIES7.readback_words(0), 196 + 54 + 25);
    }

    #[test]
    fn frame_payload_offsets() {
        let g = &SERIES7;
        assert_eq!(g.frame_payload_offset(0), 196);
        assert_eq!(g.frame_payload_offset(1), 196 + 108);
    }

    #[test]
    fn overlapping_slices_rejected() {
        let bad = Geometry {
            bram18_starts: &[0, 10],
            bit_locations: &[100],
            ..ULTRASCALE_PLUS
        };
        assert!(matches!(bad.validate(), Err(BertError::InvalidGeometry(_))));
    }

    #[test]
    fn bit_location_inside_slice_rejected() {
        let bad = Geometry {
            bram18_starts: &[0, 120],
            bit_locations: &[10],
            ..ULTRASCALE_PLUS
        };
        assert!(matches!(bad.validate(), Err(BertError::InvalidGeometry(_))));
    }

    #[test]
    fn slice_past_frame_end_rejected() {
        let bad = Geometry {
            bram18_starts: &[0, 2960],
            bit_locations: &[100],
            ..ULTRASCALE_PLUS
        };
        assert!(matches!(bad.validate(), Err(BertError::InvalidGeometry(_))));
    }

    #[test]
    fn row_count_mismatch_rejected() {
        let bad = Geometry {
            bram18_starts: &[0, 120, 240],
            bit_locations: &[100],
            ..ULTRASCALE_PLUS
        };
        assert!(matches!(bad.validate(), Err(BertError::InvalidGeometry(_))));
    }

    #[test]
    fn serializes_to_json() {
        let json = serde_json::to_value(&SERIES7).unwrap();
        assert_eq!(json["words_per_frame"], 101);
        assert_eq!(json["bit_locations"][0], 142);
    }
}
