//! Shared foundational types for the BERT readback toolchain.
//!
//! This crate provides the error taxonomy shared by every layer of the frame
//! translator, a packed two-state bit sequence used as the codec's flat bit
//! stream, and content fingerprints for verifying configuration write-back.

#![warn(missing_docs)]

pub mod bit_seq;
pub mod hash;
pub mod result;

pub use bit_seq::BitSeq;
pub use hash::ContentHash;
pub use result::{BertError, BertResult};
