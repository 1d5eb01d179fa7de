//! Logical memory extraction and patching.
//!
//! Both directions decode the memory's whole frame span once, then work on
//! the flat bit sequence. A patch overlays only the memory's own bits, so
//! neighbouring rows, write-enable columns and padding survive unchanged.

use crate::codec::{self, flat_index};
use crate::frame_buffer::FrameBuffer;
use crate::geometry::Geometry;
use crate::memory::LogicalMemory;
use crate::words::WordSequence;
use bert_common::{BertError, BertResult};

/// Flat codec index of every logical bit, relative to the memory's frame span.
fn flat_indices(geometry: &Geometry, memory: &LogicalMemory) -> BertResult<Vec<usize>> {
    let span = memory.frame_span(geometry);
    memory
        .coordinates(geometry)
        .map(|c| c.map(|c| flat_index(geometry, span.start, c.frame_index, c.frame_bit())))
        .collect()
}

/// Reads `memory` out of `buffer` as words in ascending address order.
pub fn extract(
    buffer: &FrameBuffer,
    geometry: &Geometry,
    memory: &LogicalMemory,
) -> BertResult<WordSequence> {
    memory.validate(geometry)?;
    let span = memory.frame_span(geometry);
    let bits = codec::decode(buffer, geometry, span.start, span.end - span.start)?;
    let indices = flat_indices(geometry, memory)?;

    let width = memory.word_width as usize;
    let values = indices
        .chunks(width)
        .map(|word| {
            word.iter()
                .enumerate()
                .filter(|&(_, &i)| bits.get(i))
                .fold(0u64, |acc, (j, _)| acc | 1u64 << j)
        })
        .collect();
    WordSequence::new(memory.word_width, values)
}

/// Overlays `values` onto `memory`'s bits in `buffer`.
///
/// Fails if `memory` does not validate against `geometry`, and with
/// `SizeMismatch` if the word width differs or the total bits do not equal
/// the memory's bit width. On any failure the buffer is untouched.
pub fn patch(
    buffer: &mut FrameBuffer,
    geometry: &Geometry,
    memory: &LogicalMemory,
    values: &WordSequence,
) -> BertResult<()> {
    memory.validate(geometry)?;
    if values.word_width() != memory.word_width {
        return Err(BertError::size_mismatch(
            "patch word width",
            memory.word_width,
            values.word_width(),
        ));
    }
    if values.bit_len() != u64::from(memory.bit_width) {
        return Err(BertError::size_mismatch(
            "patch bits",
            memory.bit_width,
            values.bit_len(),
        ));
    }

    let span = memory.frame_span(geometry);
    let frame_count = span.end - span.start;
    let mut bits = codec::decode(buffer, geometry, span.start, frame_count)?;
    let indices = flat_indices(geometry, memory)?;

    let width = memory.word_width as usize;
    for (word, &value) in indices.chunks(width).zip(values.values()) {
        for (j, &i) in word.iter().enumerate() {
            bits.set(i, (value >> j) & 1 != 0);
        }
    }
    codec::encode(&bits, geometry, span.start, frame_count, buffer)
}
