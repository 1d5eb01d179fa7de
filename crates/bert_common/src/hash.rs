//! Content fingerprints for configuration write-back verification.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A 128-bit content hash computed using XXH3.
///
/// Two frame payloads with the same `ContentHash` are assumed to be identical.
/// Used after a write-back to confirm that a re-read of the written frames
/// returns the payload that was sent.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash([u8; 16]);

impl ContentHash {
    /// Computes a content hash from a byte slice using XXH3-128.
    pub fn from_bytes(data: &[u8]) -> Self {
        let hash = xxhash_rust::xxh3::xxh3_128(data);
        Self(hash.to_le_bytes())
    }

    /// Computes a content hash over 32-bit words in little-endian byte order.
    pub fn from_words(words: &[u32]) -> Self {
        let mut data = Vec::with_capacity(words.len() * 4);
        for &w in words {
            data.extend_from_slice(&w.to_le_bytes());
        }
        Self::from_bytes(&data)
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({:02x}{:02x}..)", self.0[0], self.0[1])
    }
}
