//! Common result and error types for the BERT toolchain.

/// The standard result type for frame translation, codec and readback operations.
pub type BertResult<T> = Result<T, BertError>;

/// A condition that aborts the current verification phase.
///
/// None of these are corrected in place. The translator, codec and extractor
/// surface them to the caller, and only [`BertError::TransportTimeout`] is the
/// product of a retry loop.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BertError {
    /// An offset or index lies beyond the declared extent it addresses.
    #[error("{what} {offset} is out of range (limit {limit})")]
    OutOfRange {
        /// What was being addressed (e.g. "block bit", "frame").
        what: &'static str,
        /// The offending offset.
        offset: u64,
        /// The exclusive upper bound that was exceeded.
        limit: u64,
    },

    /// An offset resolved to padding or to bits owned by something else.
    #[error("{what} {offset} addresses a non-data region")]
    PaddingAccess {
        /// What was being addressed (e.g. "stream bit", "frame bit").
        what: &'static str,
        /// The offending offset.
        offset: u64,
    },

    /// A word count, bit width or sequence length did not match.
    #[error("size mismatch in {what}: expected {expected}, got {actual}")]
    SizeMismatch {
        /// The quantity being checked.
        what: &'static str,
        /// The required size.
        expected: u64,
        /// The size that was supplied.
        actual: u64,
    },

    /// The transport stayed busy for the whole polling budget.
    #[error("transport did not complete after {attempts} attempts")]
    TransportTimeout {
        /// Number of polls performed before giving up.
        attempts: u32,
    },

    /// The transport reported a hard failure.
    #[error("transport failure: {0}")]
    TransportFailed(String),

    /// A hierarchical memory name did not resolve to a logical slot.
    #[error("unresolved memory name '{0}'")]
    UnresolvedName(String),

    /// The device ID code does not belong to a supported family.
    #[error("unsupported device family for idcode {idcode:#010x}")]
    UnsupportedFamily {
        /// The 32-bit JTAG ID code that was presented.
        idcode: u32,
    },

    /// A geometry table violates its layout invariants.
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    /// Frames read back after a write did not match what was written.
    #[error("write-back verification failed for {frame_count} frames from frame {start_frame}")]
    WriteVerify {
        /// First frame of the written span.
        start_frame: u32,
        /// Number of frames in the span.
        frame_count: u32,
    },
}

impl BertError {
    /// Creates an out-of-range error.
    pub fn out_of_range(what: &'static str, offset: impl Into<u64>, limit: impl Into<u64>) -> Self {
        Self::OutOfRange {
            what,
            offset: offset.into(),
            limit: limit.into(),
        }
    }

    /// Creates a padding-access error.
    pub fn padding(what: &'static str, offset: impl Into<u64>) -> Self {
        Self::PaddingAccess {
            what,
            offset: offset.into(),
        }
    }

    /// Creates a size-mismatch error.
    pub fn size_mismatch(
        what: &'static str,
        expected: impl Into<u64>,
        actual: impl Into<u64>,
    ) -> Self {
        Self::SizeMismatch {
            what,
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}
