//! A readback session: one device, one transport, one memory table.
//!
//! Every memory access is a full read-extract or read-patch-write cycle on a
//! freshly read [`FrameBuffer`]. Nothing is cached between calls, and a write
//! is either one transport request or none at all.

use crate::device::DeviceFamily;
use crate::extract::{extract, patch};
use crate::frame_buffer::FrameBuffer;
use crate::geometry::Geometry;
use crate::memory::{MemoryTable, SlotResolver};
use crate::transport::{FrameTransport, RetryPolicy};
use crate::translate::FrameCoordinate;
use crate::words::WordSequence;
use bert_common::{BertError, BertResult};
use std::time::Instant;

/// Reads and writes logical memories through a [`FrameTransport`].
pub struct ReadbackSession<T: FrameTransport> {
    family: DeviceFamily,
    transport: T,
    retry: RetryPolicy,
    memories: MemoryTable,
    verify_writes: bool,
}

impl<T: FrameTransport> ReadbackSession<T> {
    /// Creates a session with the default retry policy and no write verification.
    pub fn new(family: DeviceFamily, transport: T, memories: MemoryTable) -> Self {
        Self {
            family,
            transport,
            retry: RetryPolicy::default(),
            memories,
            verify_writes: false,
        }
    }

    /// Replaces the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Re-reads and fingerprints every written span when enabled.
    pub fn with_write_verification(mut self, verify: bool) -> Self {
        self.verify_writes = verify;
        self
    }

    /// The device family.
    pub fn family(&self) -> DeviceFamily {
        self.family
    }

    /// The family's frame geometry.
    pub fn geometry(&self) -> &'static Geometry {
        self.family.geometry()
    }

    /// The memory table.
    pub fn memories(&self) -> &MemoryTable {
        &self.memories
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Consumes the session and returns the transport.
    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Resolves a memory name to its slot.
    pub fn resolve(&self, path: &str) -> BertResult<usize> {
        self.memories.resolve(path)
    }

    /// Reads `frame_count` frames starting at `start_frame`.
    pub fn read_span(&mut self, start_frame: u32, frame_count: u32) -> BertResult<FrameBuffer> {
        let started = Instant::now();
        let retry = self.retry;
        let transport = &mut self.transport;
        let bytes = retry.run(|| transport.read_frames(start_frame, frame_count))?;
        let buffer = FrameBuffer::from_bytes(self.geometry(), start_frame, frame_count, &bytes)?;
        log::debug!(
            "read frames {start_frame}..{} in {:.1} us",
            buffer.frames().end,
            started.elapsed().as_secs_f64() * 1e6
        );
        Ok(buffer)
    }

    /// Writes a whole buffer back in one transport request.
    pub fn write_span(&mut self, buffer: &FrameBuffer) -> BertResult<()> {
        let started = Instant::now();
        let bytes = buffer.to_bytes();
        let (start, count) = (buffer.first_frame(), buffer.frame_count());
        let retry = self.retry;
        let transport = &mut self.transport;
        retry.run(|| transport.write_frames(start, count, &bytes))?;
        log::debug!(
            "wrote frames {start}..{} in {:.1} us",
            buffer.frames().end,
            started.elapsed().as_secs_f64() * 1e6
        );

        if self.verify_writes {
            let geometry = self.geometry();
            let readback = self.read_span(start, count)?;
            if readback.payload_fingerprint(geometry)? != buffer.payload_fingerprint(geometry)? {
                return Err(BertError::WriteVerify {
                    start_frame: start,
                    frame_count: count,
                });
            }
            log::debug!("write-back of frames {start}..{} verified", buffer.frames().end);
        }
        Ok(())
    }

    /// Reads the memory in `slot`.
    pub fn read_memory(&mut self, slot: usize) -> BertResult<WordSequence> {
        let started = Instant::now();
        let geometry = self.geometry();
        let memory = self.memories.get(slot)?.clone();
        memory.validate(geometry)?;
        let span = memory.frame_span(geometry);
        let buffer = self.read_span(span.start, span.end - span.start)?;
        let words = extract(&buffer, geometry, &memory)?;
        log::info!(
            "{} read: {} words in {:.1} us",
            memory.name,
            words.len(),
            started.elapsed().as_secs_f64() * 1e6
        );
        Ok(words)
    }

    /// Replaces the contents of the memory in `slot`.
    ///
    /// The span is read, patched and written back. Validation happens before
    /// the write, so a rejected patch leaves the device untouched.
    pub fn write_memory(&mut self, slot: usize, values: &WordSequence) -> BertResult<()> {
        let started = Instant::now();
        let geometry = self.geometry();
        let memory = self.memories.get(slot)?.clone();
        memory.validate(geometry)?;
        let span = memory.frame_span(geometry);
        let mut buffer = self.read_span(span.start, span.end - span.start)?;
        patch(&mut buffer, geometry, &memory, values)?;
        self.write_span(&buffer)?;
        log::info!(
            "{} write: {} words in {:.1} us",
            memory.name,
            values.len(),
            started.elapsed().as_secs_f64() * 1e6
        );
        Ok(())
    }

    /// Physical location of bit `bit` of word `index` in the memory in `slot`.
    pub fn locate_word(&self, slot: usize, index: u32, bit: u32) -> BertResult<FrameCoordinate> {
        self.memories
            .get(slot)?
            .locate_word(self.geometry(), index, bit)
    }
}
