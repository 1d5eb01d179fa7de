//! Cross-validation of AXI-sourced and frame-extracted word sequences.

use crate::words::WordSequence;
use bert_common::{BertError, BertResult};
use serde::Serialize;
use std::fmt;

/// One index where the two readings disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Mismatch {
    /// Word index.
    pub index: usize,
    /// Value from the reference reading.
    pub expected: u64,
    /// Value from the reading under test.
    pub actual: u64,
}

/// Result of comparing two equal-length sequences.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CompareReport {
    /// Disagreeing indices in ascending order.
    pub mismatches: Vec<Mismatch>,
    /// Indices where both readings are zero.
    pub zero_count: usize,
    /// Number of words compared.
    pub len: usize,
}

impl CompareReport {
    /// True when no index disagrees.
    ///
    /// A run where every word is zero still passes; `zero_count` exists to
    /// make that case visible.
    pub fn passed(&self) -> bool {
        self.mismatches.is_empty()
    }
}

/// Compares `expected` against `actual` index by index.
///
/// Unequal lengths are a precondition failure, not a data mismatch.
pub fn compare(expected: &WordSequence, actual: &WordSequence) -> BertResult<CompareReport> {
    if expected.len() != actual.len() {
        return Err(BertError::size_mismatch(
            "compared words",
            expected.len() as u64,
            actual.len() as u64,
        ));
    }
    let mut report = CompareReport {
        len: expected.len(),
        ..CompareReport::default()
    };
    for (index, (&e, &a)) in expected.values().iter().zip(actual.values()).enumerate() {
        if e != a {
            report.mismatches.push(Mismatch {
                index,
                expected: e,
                actual: a,
            });
        } else if e == 0 {
            report.zero_count += 1;
        }
    }
    Ok(report)
}

/// A named comparison inside a [`VerificationSummary`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemoryReport {
    /// Memory name.
    pub name: String,
    /// The comparison result.
    pub report: CompareReport,
}

/// Pass/fail roll-up across every memory checked in one verification round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationSummary {
    /// Per-memory results in the order they were checked.
    pub memories: Vec<MemoryReport>,
    /// Overall verdict.
    pub passed: bool,
}

impl VerificationSummary {
    /// Creates an empty summary, which passes.
    pub fn new() -> Self {
        Self {
            memories: Vec::new(),
            passed: true,
        }
    }

    /// Adds one memory's result.
    pub fn push(&mut self, name: impl Into<String>, report: CompareReport) {
        self.passed &= report.passed();
        self.memories.push(MemoryReport {
            name: name.into(),
            report,
        });
    }

    /// Total mismatches over all memories.
    pub fn error_count(&self) -> usize {
        self.memories.iter().map(|m| m.report.mismatches.len()).sum()
    }
}

impl Default for VerificationSummary {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for VerificationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for m in &self.memories {
            for mm in &m.report.mismatches {
                writeln!(
                    f,
                    "{} mismatch at {} axi={:x} bert={:x}",
                    m.name, mm.index, mm.expected, mm.actual
                )?;
            }
        }
        if self.passed {
            writeln!(f, "SUCCESS: axi and bert match")?;
            for m in &self.memories {
                writeln!(
                    f,
                    "SUCCESS: {} entries that are zero: {}",
                    m.name, m.report.zero_count
                )?;
            }
        } else {
            let counts: Vec<String> = self
                .memories
                .iter()
                .map(|m| format!("{} {} errors", m.report.mismatches.len(), m.name))
                .collect();
            writeln!(f, "FAIL: {}", counts.join(" and "))?;
        }
        Ok(())
    }
}
