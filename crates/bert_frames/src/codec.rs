//! Raw frame codec: readback stream <-> flat payload bits.
//!
//! Payload bits are numbered frame-major, then by word, then LSB first
//! within a word, so bit `(f - start) * frame_bits + w * 32 + b` of the flat
//! sequence is bit `b` of word `w` of frame `f`. Padding words never appear
//! in the flat sequence and are never written.

use crate::frame_buffer::FrameBuffer;
use crate::geometry::Geometry;
use bert_common::{BertError, BertResult, BitSeq};

/// Index of a frame-relative payload bit in a decoded span.
pub fn flat_index(geometry: &Geometry, span_start: u32, frame: u32, frame_bit: u32) -> usize {
    (frame - span_start) as usize * geometry.frame_bits() as usize + frame_bit as usize
}

/// Extracts the payload bits of `frame_count` frames starting at `start_frame`.
pub fn decode(
    buffer: &FrameBuffer,
    geometry: &Geometry,
    start_frame: u32,
    frame_count: u32,
) -> BertResult<BitSeq> {
    buffer.check_span(start_frame, frame_count)?;
    let mut words = Vec::with_capacity((frame_count * geometry.words_per_frame) as usize);
    for frame in start_frame..start_frame + frame_count {
        words.extend_from_slice(buffer.frame_payload(geometry, frame)?);
    }
    Ok(BitSeq::from_u32_words(&words))
}

/// Writes payload bits back into `buffer` for the given frame span.
///
/// `bits` must exactly fill the span. Only payload words of frames in the
/// span are written; padding and every other frame keep their prior values.
pub fn encode(
    bits: &BitSeq,
    geometry: &Geometry,
    start_frame: u32,
    frame_count: u32,
    buffer: &mut FrameBuffer,
) -> BertResult<()> {
    buffer.check_span(start_frame, frame_count)?;
    let expected = frame_count as usize * geometry.frame_bits() as usize;
    if bits.len() != expected {
        return Err(BertError::size_mismatch(
            "encoded bits",
            expected as u64,
            bits.len() as u64,
        ));
    }
    let words = bits.to_u32_words();
    for (i, chunk) in words
        .chunks_exact(geometry.words_per_frame as usize)
        .enumerate()
    {
        let payload = buffer.frame_payload_mut(geometry, start_frame + i as u32)?;
        payload.copy_from_slice(chunk);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{SERIES7, ULTRASCALE_PLUS};

    const SENTINEL: u32 = 0xA5A5_5A5A;

    fn sentinel_buffer(geometry: &Geometry, first: u32, count: u32) -> FrameBuffer {
        FrameBuffer::from_words(
            geometry,
            first,
            count,
            vec![SENTINEL; geometry.readback_words(count)],
        )
        .unwrap()
    }

    fn pattern(len: usize) -> BitSeq {
        let mut bits = BitSeq::zeros(len);
        for i in (0..len).filter(|i| i % 3 == 0 || i % 7 == 1) {
            bits.set(i, true);
        }
        bits
    }

    #[test]
    fn decode_strips_padding() {
        let g = &SERIES7;
        let buf = sentinel_buffer(g, 0, 2);
        let bits = decode(&buf, g, 0, 2).unwrap();
        assert_eq!(bits.len(), 2 * 101 * 32);
        assert_eq!(bits.to_u32_words(), vec![SENTINEL; 202]);
    }

    #[test]
    fn decode_preserves_frame_and_word_order() {
        let g = &ULTRASCALE_PLUS;
        let mut words = vec![0u32; g.readback_words(2)];
        words[g.frame_payload_offset(0)] = 1;
        words[g.frame_payload_offset(1) + 1] = 1 << 31;
        let buf = FrameBuffer::from_words(g, 40, 2, words).unwrap();
        let bits = decode(&buf, g, 40, 2).unwrap();
        assert!(bits.get(0));
        assert!(bits.get(flat_index(g, 40, 41, 63)));
        assert_eq!(bits.count_ones(), 2);
    }

    #[test]
    fn codec_roundtrip() {
        for g in [&ULTRASCALE_PLUS, &SERIES7] {
            let mut buf = sentinel_buffer(g, 100, 4);
            let bits = pattern(3 * g.frame_bits() as usize);
            encode(&bits, g, 101, 3, &mut buf).unwrap();
            assert_eq!(decode(&buf, g, 101, 3).unwrap(), bits);
        }
    }

    #[test]
    fn encode_leaves_padding_untouched() {
        let g = &SERIES7;
        let mut buf = sentinel_buffer(g, 0, 3);
        let bits = BitSeq::zeros(3 * g.frame_bits() as usize);
        encode(&bits, g, 0, 3, &mut buf).unwrap();

        let layout = buf.layout(g);
        for (w, &word) in buf.words().iter().enumerate() {
            let is_data = layout.locate(w as u64 * 32).is_ok();
            if is_data {
                assert_eq!(word, 0, "payload word {w} not written");
            } else {
                assert_eq!(word, SENTINEL, "padding word {w} was modified");
            }
        }
    }

    #[test]
    fn encode_leaves_other_frames_untouched() {
        let g = &ULTRASCALE_PLUS;
        let mut buf = sentinel_buffer(g, 0, 3);
        encode(&BitSeq::zeros(g.frame_bits() as usize), g, 1, 1, &mut buf).unwrap();
        assert_eq!(buf.frame_payload(g, 0).unwrap(), &[SENTINEL; 93][..]);
        assert_eq!(buf.frame_payload(g, 1).unwrap(), &[0; 93][..]);
        assert_eq!(buf.frame_payload(g, 2).unwrap(), &[SENTINEL; 93][..]);
    }

    #[test]
    fn encode_rejects_wrong_size() {
        let g = &ULTRASCALE_PLUS;
        let mut buf = sentinel_buffer(g, 0, 2);
        let before = buf.clone();
        let err = encode(&BitSeq::zeros(100), g, 0, 2, &mut buf).unwrap_err();
        assert!(matches!(err, BertError::SizeMismatch { .. }));
        assert_eq!(buf, before);
    }

    #[test]
    fn span_outside_buffer_rejected() {
        let g = &SERIES7;
        let mut buf = sentinel_buffer(g, 10, 2);
        assert!(matches!(
            decode(&buf, g, 11, 2),
            Err(BertError::OutOfRange { .. })
        ));
        let bits = BitSeq::zeros(g.frame_bits() as usize);
        assert!(matches!(
            encode(&bits, g, 9, 1, &mut buf),
            Err(BertError::OutOfRange { .. })
        ));
    }
}
