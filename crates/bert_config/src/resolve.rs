//! Resolution of a parsed configuration into frame-model types.

use crate::error::ConfigError;
use crate::types::{BertConfig, MemoryConfig};
use bert_frames::{
    identify_part, AxiWindow, BlockPlacement, CodePacking, DeviceFamily, LogicalMemory,
    MemoryTable, RetryPolicy,
};
use std::path::{Path, PathBuf};

/// An AXI bus image and its base address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAxi {
    /// Absolute path of the bus dump.
    pub image: PathBuf,
    /// Bus address of the first word of the dump.
    pub base: u64,
}

/// A configuration resolved against the device's frame geometry.
///
/// Every memory in `memories` has been validated against the family's
/// geometry, so slot lookups and extraction can proceed without further
/// layout checks.
#[derive(Debug, Clone)]
pub struct ResolvedBench {
    /// Device family, from the ID code or the override.
    pub family: DeviceFamily,
    /// Part name, when the ID code is a known part.
    pub part: Option<&'static str>,
    /// Logical memories in name order.
    pub memories: MemoryTable,
    /// Transport polling ceiling.
    pub retry: RetryPolicy,
    /// Re-read and fingerprint every written span.
    pub verify_writes: bool,
    /// Code-table entry layout.
    pub packing: CodePacking,
    /// Absolute path of the frame image, if configured.
    pub frame_image: Option<PathBuf>,
    /// AXI bus image, if configured.
    pub axi: Option<ResolvedAxi>,
}

/// Resolves `config`, interpreting relative paths against `base_dir`.
pub fn resolve_bench(config: &BertConfig, base_dir: &Path) -> Result<ResolvedBench, ConfigError> {
    let part = identify_part(config.device.idcode).map(|(part, _)| part);
    let family = match &config.device.family {
        Some(name) => name
            .parse::<DeviceFamily>()
            .map_err(ConfigError::ValidationError)?,
        None => DeviceFamily::from_idcode(config.device.idcode)?,
    };

    let geometry = family.geometry();
    let mut memories = MemoryTable::default();
    for (name, entry) in &config.memories {
        let memory = resolve_memory(name, entry);
        memory.validate(geometry)?;
        memories.push(memory);
    }

    Ok(ResolvedBench {
        family,
        part,
        memories,
        retry: RetryPolicy {
            max_attempts: config.transport.max_attempts,
        },
        verify_writes: config.transport.verify_writes,
        packing: CodePacking {
            length_shift: config.packing.length_shift,
            length_bits: config.packing.length_bits,
            code_mask: config.packing.code_mask,
        },
        frame_image: config.transport.image.as_ref().map(|p| base_dir.join(p)),
        axi: config.axi.as_ref().map(|axi| ResolvedAxi {
            image: base_dir.join(&axi.image),
            base: axi.base,
        }),
    })
}

fn resolve_memory(name: &str, entry: &MemoryConfig) -> LogicalMemory {
    let entry_bytes = AxiWindow::words_per_entry(entry.word_width) * 4;
    LogicalMemory {
        name: name.to_string(),
        path: entry.path.clone(),
        placements: entry
            .blocks
            .iter()
            .map(|b| BlockPlacement {
                kind: b.kind,
                column_frame: b.column_frame,
                row: b.row,
            })
            .collect(),
        bit_width: entry.depth * entry.word_width,
        word_width: entry.word_width,
        axi: entry.axi_base.map(|base| AxiWindow {
            base,
            entries: entry.depth,
            stride: entry.axi_stride.unwrap_or(entry_bytes),
        }),
    }
}
