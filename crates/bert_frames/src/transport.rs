//! Configuration readback transport.
//!
//! The hardware path (PCAP/ICAP on a running device) lives outside this
//! crate behind [`FrameTransport`]. A transport request either completes,
//! reports [`TransportError::Busy`] to be polled again, or fails outright.
//! [`RetryPolicy`] bounds the polling.

use crate::geometry::Geometry;
use bert_common::{BertError, BertResult};
use std::io;
use std::path::Path;

/// Outcome of a transport request that did not complete.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Not complete yet; poll again.
    #[error("transport busy")]
    Busy,
    /// The request failed and will not succeed by polling.
    #[error("{0}")]
    Failed(String),
}

/// Reads and writes contiguous runs of configuration frames.
///
/// Reads return the full readback stream of the requested run, padding
/// included, as little-endian 32-bit words. Writes take the same layout.
pub trait FrameTransport {
    /// Reads `count` frames starting at `start`.
    fn read_frames(&mut self, start: u32, count: u32) -> Result<Vec<u8>, TransportError>;

    /// Writes `count` frames starting at `start` in one request.
    fn write_frames(&mut self, start: u32, count: u32, data: &[u8]) -> Result<(), TransportError>;
}

/// Polling ceiling for transport requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts, the first one included.
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 16 }
    }
}

impl RetryPolicy {
    /// Runs `op` until it completes, fails, or the ceiling is reached.
    pub fn run<T>(&self, mut op: impl FnMut() -> Result<T, TransportError>) -> BertResult<T> {
        for attempt in 1..=self.max_attempts {
            match op() {
                Ok(value) => return Ok(value),
                Err(TransportError::Busy) => {
                    log::debug!("transport busy (attempt {attempt}/{})", self.max_attempts);
                }
                Err(TransportError::Failed(msg)) => return Err(BertError::TransportFailed(msg)),
            }
        }
        log::warn!("transport gave up after {} attempts", self.max_attempts);
        Err(BertError::TransportTimeout {
            attempts: self.max_attempts,
        })
    }
}

/// An in-memory device holding a flat image of frame payloads.
///
/// Reads synthesize the readback layout with zero padding; writes strip it.
/// The device can be told to answer `Busy` a fixed number of times before
/// each request completes.
#[derive(Debug, Clone)]
pub struct ImageTransport {
    geometry: &'static Geometry,
    frames: Vec<u32>,
    busy_polls: u32,
    pending_busy: u32,
    writes: usize,
}

impl ImageTransport {
    /// A device of `frame_count` all-zero frames.
    pub fn zeroed(geometry: &'static Geometry, frame_count: u32) -> Self {
        Self::with_frames(
            geometry,
            vec![0; (frame_count * geometry.words_per_frame) as usize],
        )
    }

    /// A device over existing payload words, `words_per_frame` per frame.
    pub fn from_words(geometry: &'static Geometry, words: Vec<u32>) -> BertResult<Self> {
        let wpf = geometry.words_per_frame as usize;
        if words.len() % wpf != 0 {
            return Err(BertError::size_mismatch(
                "image words",
                ((words.len() / wpf + 1) * wpf) as u64,
                words.len() as u64,
            ));
        }
        Ok(Self::with_frames(geometry, words))
    }

    fn with_frames(geometry: &'static Geometry, frames: Vec<u32>) -> Self {
        Self {
            geometry,
            frames,
            busy_polls: 0,
            pending_busy: 0,
            writes: 0,
        }
    }

    /// Loads a frame image of little-endian words.
    pub fn load(geometry: &'static Geometry, path: &Path) -> io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let frame_bytes = geometry.words_per_frame as usize * 4;
        if bytes.len() % frame_bytes != 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "{}: {} bytes is not a whole number of {frame_bytes}-byte frames",
                    path.display(),
                    bytes.len()
                ),
            ));
        }
        let words = bytes
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        Ok(Self::with_frames(geometry, words))
    }

    /// Saves the frame image as little-endian words.
    pub fn save(&self, path: &Path) -> io::Result<()> {
        let mut bytes = Vec::with_capacity(self.frames.len() * 4);
        for &w in &self.frames {
            bytes.extend_from_slice(&w.to_le_bytes());
        }
        std::fs::write(path, bytes)
    }

    /// Answers `Busy` `polls` times before every request completes.
    pub fn with_busy_polls(mut self, polls: u32) -> Self {
        self.busy_polls = polls;
        self.pending_busy = polls;
        self
    }

    /// Number of frames in the image.
    pub fn frame_count(&self) -> u32 {
        (self.frames.len() / self.geometry.words_per_frame as usize) as u32
    }

    /// Number of completed write requests.
    pub fn write_count(&self) -> usize {
        self.writes
    }

    /// Payload words of one frame, if it exists.
    pub fn frame(&self, frame: u32) -> Option<&[u32]> {
        let wpf = self.geometry.words_per_frame as usize;
        let start = frame as usize * wpf;
        self.frames.get(start..start + wpf)
    }

    /// Mutable payload words of one frame, if it exists.
    pub fn frame_mut(&mut self, frame: u32) -> Option<&mut [u32]> {
        let wpf = self.geometry.words_per_frame as usize;
        let start = frame as usize * wpf;
        self.frames.get_mut(start..start + wpf)
    }

    fn poll(&mut self) -> Result<(), TransportError> {
        if self.pending_busy > 0 {
            self.pending_busy -= 1;
            return Err(TransportError::Busy);
        }
        self.pending_busy = self.busy_polls;
        Ok(())
    }

    fn check_run(&self, start: u32, count: u32) -> Result<(), TransportError> {
        let end = u64::from(start) + u64::from(count);
        if end > u64::from(self.frame_count()) {
            return Err(TransportError::Failed(format!(
                "frames {start}..{end} outside image of {} frames",
                self.frame_count()
            )));
        }
        Ok(())
    }
}

impl FrameTransport for ImageTransport {
    fn read_frames(&mut self, start: u32, count: u32) -> Result<Vec<u8>, TransportError> {
        self.check_run(start, count)?;
        self.poll()?;
        let g = self.geometry;
        let wpf = g.words_per_frame as usize;
        let mut words = vec![0u32; g.readback_words(count)];
        for i in 0..count {
            let src = (start + i) as usize * wpf;
            let dst = g.frame_payload_offset(i);
            words[dst..dst + wpf].copy_from_slice(&self.frames[src..src + wpf]);
        }
        let mut bytes = Vec::with_capacity(words.len() * 4);
        for w in words {
            bytes.extend_from_slice(&w.to_le_bytes());
        }
        Ok(bytes)
    }

    fn write_frames(&mut self, start: u32, count: u32, data: &[u8]) -> Result<(), TransportError> {
        self.check_run(start, count)?;
        let g = self.geometry;
        if data.len() != g.readback_bytes(count) {
            return Err(TransportError::Failed(format!(
                "write of {count} frames expects {} bytes, got {}",
                g.readback_bytes(count),
                data.len()
            )));
        }
        self.poll()?;
        let wpf = g.words_per_frame as usize;
        for i in 0..count {
            let src = g.frame_payload_offset(i) * 4;
            let dst = (start + i) as usize * wpf;
            for (w, chunk) in data[src..src + wpf * 4].chunks_exact(4).enumerate() {
                self.frames[dst + w] = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            }
        }
        self.writes += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{SERIES7, ULTRASCALE_PLUS};

    #[test]
    fn retry_succeeds_before_ceiling() {
        let policy = RetryPolicy { max_attempts: 4 };
        let mut calls = 0;
        let value = policy
            .run(|| {
                calls += 1;
                if calls < 4 {
                    Err(TransportError::Busy)
                } else {
                    Ok(7)
                }
            })
            .unwrap();
        assert_eq!(value, 7);
        assert_eq!(calls, 4);
    }

    #[test]
    fn retry_times_out_at_ceiling() {
        let policy = RetryPolicy { max_attempts: 3 };
        let mut calls = 0;
        let err = policy
            .run(|| -> Result<(), _> {
                calls += 1;
                Err(TransportError::Busy)
            })
            .unwrap_err();
        assert_eq!(err, BertError::TransportTimeout { attempts: 3 });
        assert_eq!(calls, 3);
    }

    #[test]
    fn hard_failure_is_not_retried() {
        let policy = RetryPolicy::default();
        let mut calls = 0;
        let err = policy
            .run(|| -> Result<(), _> {
                calls += 1;
                Err(TransportError::Failed("pcap error".into()))
            })
            .unwrap_err();
        assert_eq!(err, BertError::TransportFailed("pcap error".into()));
        assert_eq!(calls, 1);
    }

    #[test]
    fn read_synthesizes_layout() {
        let g = &SERIES7;
        let mut dev = ImageTransport::zeroed(g, 8);
        dev.frame_mut(3).unwrap()[0] = 0xCAFE;
        let bytes = dev.read_frames(2, 2).unwrap();
        assert_eq!(bytes.len(), g.readback_bytes(2));
        let off = g.frame_payload_offset(1) * 4;
        assert_eq!(&bytes[off..off + 4], &0xCAFEu32.to_le_bytes());
    }

    #[test]
    fn write_strips_padding() {
        let g = &ULTRASCALE_PLUS;
        let mut dev = ImageTransport::zeroed(g, 4);
        let data = vec![0xFFu8; g.readback_bytes(2)];
        dev.write_frames(1, 2, &data).unwrap();
        assert_eq!(dev.frame(0).unwrap(), &[0; 93][..]);
        assert_eq!(dev.frame(1).unwrap(), &[0xFFFF_FFFF; 93][..]);
        assert_eq!(dev.frame(2).unwrap(), &[0xFFFF_FFFF; 93][..]);
        assert_eq!(dev.frame(3).unwrap(), &[0; 93][..]);
        assert_eq!(dev.write_count(), 1);
    }

    #[test]
    fn out_of_image_request_fails() {
        let mut dev = ImageTransport::zeroed(&ULTRASCALE_PLUS, 4);
        assert!(matches!(
            dev.read_frames(3, 2),
            Err(TransportError::Failed(_))
        ));
        assert!(matches!(
            dev.write_frames(0, 1, &[0; 4]),
            Err(TransportError::Failed(_))
        ));
    }

    #[test]
    fn busy_polls_then_completes() {
        let mut dev = ImageTransport::zeroed(&SERIES7, 2).with_busy_polls(2);
        assert_eq!(dev.read_frames(0, 1), Err(TransportError::Busy));
        assert_eq!(dev.read_frames(0, 1), Err(TransportError::Busy));
        assert!(dev.read_frames(0, 1).is_ok());
        assert_eq!(dev.read_frames(0, 1), Err(TransportError::Busy));
    }

    #[test]
    fn retry_policy_drives_busy_device() {
        let mut dev = ImageTransport::zeroed(&SERIES7, 2).with_busy_polls(2);
        let ok = RetryPolicy { max_attempts: 3 }.run(|| dev.read_frames(0, 2));
        assert!(ok.is_ok());
        let timeout = RetryPolicy { max_attempts: 2 }.run(|| dev.read_frames(0, 2));
        assert_eq!(timeout.unwrap_err(), BertError::TransportTimeout { attempts: 2 });
    }

    #[test]
    fn image_file_roundtrip() {
        let g = &ULTRASCALE_PLUS;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frames.bin");
        let mut dev = ImageTransport::zeroed(g, 3);
        dev.frame_mut(2).unwrap()[92] = 0x1234_5678;
        dev.save(&path).unwrap();
        let back = ImageTransport::load(g, &path).unwrap();
        assert_eq!(back.frame_count(), 3);
        assert_eq!(back.frame(2).unwrap()[92], 0x1234_5678);
    }

    #[test]
    fn ragged_image_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frames.bin");
        std::fs::write(&path, vec![0u8; 93 * 4 + 4]).unwrap();
        let err = ImageTransport::load(&ULTRASCALE_PLUS, &path).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert!(matches!(
            ImageTransport::from_words(&ULTRASCALE_PLUS, vec![0; 94]),
            Err(BertError::SizeMismatch { .. })
        ));
    }
}
