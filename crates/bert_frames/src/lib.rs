//! Configuration-frame addressing for block RAM readback and patching.
//!
//! This crate computes exactly which bits of a device's configuration frames
//! hold a named on-chip memory, for both extraction and write-back. It
//! provides per-family [`Geometry`] tables, the stream and block translators
//! in [`translate`], the raw frame [`codec`], and the logical-memory
//! [`extract()`]/[`patch()`] pair built on top of them.
//!
//! Around that core sit the pieces a verification round needs: the
//! [`FrameTransport`] and [`MemoryBus`] seams with in-memory implementations,
//! the AXI-vs-readback [`compare()`] report, code-table packing for the
//! Huffman encoder, and [`ReadbackSession`], which runs bounded,
//! all-or-nothing read/patch/write cycles.

#![warn(missing_docs)]

pub mod axi;
pub mod code_table;
pub mod codec;
pub mod compare;
pub mod device;
pub mod extract;
pub mod frame_buffer;
pub mod geometry;
pub mod memory;
pub mod session;
pub mod translate;
pub mod transport;
pub mod words;

pub use axi::{read_window, write_window, AxiWindow, BusImage, MemoryBus};
pub use code_table::{
    identity_code_table, recompute_code_table, CodeAssigner, CodeAssignment, CodePacking,
};
pub use compare::{compare, CompareReport, Mismatch, VerificationSummary};
pub use device::{identify_part, DeviceFamily};
pub use extract::{extract, patch};
pub use frame_buffer::FrameBuffer;
pub use geometry::{Geometry, SERIES7, ULTRASCALE_PLUS};
pub use memory::{LogicalMemory, MemoryTable, SlotResolver};
pub use session::ReadbackSession;
pub use translate::{BlockPlacement, BramKind, FrameCoordinate, StreamLayout};
pub use transport::{FrameTransport, ImageTransport, RetryPolicy, TransportError};
pub use words::WordSequence;
