//! Owned raw readback buffers.
//!
//! A [`FrameBuffer`] holds the readback stream for a contiguous run of frames
//! exactly as the transport delivers it, padding words included. The payload
//! is changed only through the codec and the patcher. Padding is carried
//! through untouched so a buffer can go back out as one transport write.

use crate::geometry::{Geometry, WORD_BITS};
use crate::translate::{FrameCoordinate, StreamLayout};
use bert_common::{BertError, BertResult, ContentHash};
use std::ops::Range;

/// The raw readback stream of `frame_count` frames starting at `first_frame`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    first_frame: u32,
    frame_count: u32,
    words: Vec<u32>,
}

impl FrameBuffer {
    /// Wraps readback words, checking the length against the family layout.
    pub fn from_words(
        geometry: &Geometry,
        first_frame: u32,
        frame_count: u32,
        words: Vec<u32>,
    ) -> BertResult<Self> {
        if first_frame.checked_add(frame_count).is_none() {
            return Err(BertError::out_of_range(
                "frame",
                u64::from(first_frame) + u64::from(frame_count),
                u32::MAX,
            ));
        }
        let expected = geometry.readback_words(frame_count);
        if words.len() != expected {
            return Err(BertError::size_mismatch(
                "readback words",
                expected as u64,
                words.len() as u64,
            ));
        }
        Ok(Self {
            first_frame,
            frame_count,
            words,
        })
    }

    /// Decodes transport bytes: 32-bit little-endian words, frame-major.
    pub fn from_bytes(
        geometry: &Geometry,
        first_frame: u32,
        frame_count: u32,
        bytes: &[u8],
    ) -> BertResult<Self> {
        let expected = geometry.readback_bytes(frame_count);
        if bytes.len() != expected {
            return Err(BertError::size_mismatch(
                "readback bytes",
                expected as u64,
                bytes.len() as u64,
            ));
        }
        let words = bytes
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        Self::from_words(geometry, first_frame, frame_count, words)
    }

    /// Creates an all-zero buffer for the given frame run.
    pub fn zeroed(geometry: &Geometry, first_frame: u32, frame_count: u32) -> Self {
        Self {
            first_frame,
            frame_count,
            words: vec![0; geometry.readback_words(frame_count)],
        }
    }

    /// Serializes the buffer back into transport byte order.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(self.words.len() * 4);
        for &w in &self.words {
            data.extend_from_slice(&w.to_le_bytes());
        }
        data
    }

    /// First frame held by this buffer.
    pub fn first_frame(&self) -> u32 {
        self.first_frame
    }

    /// Number of frames held by this buffer.
    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }

    /// The frames held by this buffer.
    pub fn frames(&self) -> Range<u32> {
        self.first_frame..self.first_frame.saturating_add(self.frame_count)
    }

    /// All raw words, padding included.
    pub fn words(&self) -> &[u32] {
        &self.words
    }

    /// The stream layout of this buffer.
    pub fn layout<'g>(&self, geometry: &'g Geometry) -> StreamLayout<'g> {
        StreamLayout::new(geometry, self.first_frame, self.frame_count)
    }

    /// Checks that `[start_frame, start_frame + frame_count)` lies inside the buffer.
    pub fn check_span(&self, start_frame: u32, frame_count: u32) -> BertResult<()> {
        let end = u64::from(start_frame) + u64::from(frame_count);
        let frames = self.frames();
        if start_frame < frames.start {
            return Err(BertError::out_of_range("frame", start_frame, frames.end));
        }
        if end > u64::from(frames.end) {
            return Err(BertError::out_of_range("frame", end, frames.end));
        }
        Ok(())
    }

    /// Checks that the buffer was laid out for `geometry`.
    pub fn check_geometry(&self, geometry: &Geometry) -> BertResult<()> {
        let expected = geometry.readback_words(self.frame_count);
        if self.words.len() != expected {
            return Err(BertError::size_mismatch(
                "readback words",
                expected as u64,
                self.words.len() as u64,
            ));
        }
        Ok(())
    }

    fn payload_range(&self, geometry: &Geometry, frame: u32) -> BertResult<Range<usize>> {
        self.check_geometry(geometry)?;
        self.check_span(frame, 1)?;
        let start = geometry.frame_payload_offset(frame - self.first_frame);
        Ok(start..start + geometry.words_per_frame as usize)
    }

    /// The payload words of one frame.
    pub fn frame_payload(&self, geometry: &Geometry, frame: u32) -> BertResult<&[u32]> {
        let range = self.payload_range(geometry, frame)?;
        Ok(&self.words[range])
    }

    pub(crate) fn frame_payload_mut(
        &mut self,
        geometry: &Geometry,
        frame: u32,
    ) -> BertResult<&mut [u32]> {
        let range = self.payload_range(geometry, frame)?;
        Ok(&mut self.words[range])
    }

    /// Reads a single configuration bit.
    pub fn bit(&self, geometry: &Geometry, coord: FrameCoordinate) -> BertResult<bool> {
        self.check_geometry(geometry)?;
        let stream_bit = self.layout(geometry).linearize(coord)?;
        let word = self.words[(stream_bit / u64::from(WORD_BITS)) as usize];
        Ok((word >> coord.bit_index) & 1 != 0)
    }

    /// Fingerprint of the payload words only, ignoring padding.
    pub fn payload_fingerprint(&self, geometry: &Geometry) -> BertResult<ContentHash> {
        self.check_geometry(geometry)?;
        let mut payload = Vec::with_capacity((self.frame_count * geometry.words_per_frame) as usize);
        for i in 0..self.frame_count {
            let start = geometry.frame_payload_offset(i);
            payload.extend_from_slice(&self.words[start..start + geometry.words_per_frame as usize]);
        }
        Ok(ContentHash::from_words(&payload))
    }
}
