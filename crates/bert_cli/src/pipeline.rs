//! Shared pipeline helpers for CLI commands.
//!
//! Contains the bench-root lookup, configuration loading and resolution,
//! opening the frame and bus images, and the values-file format shared by
//! `dump` and `patch`.

use std::path::{Path, PathBuf};

use bert_config::{parse_int, ResolvedBench, CONFIG_FILE};
use bert_frames::{BusImage, ImageTransport, ReadbackSession, WordSequence};

use crate::GlobalArgs;

/// Walks up from `start` looking for the nearest directory containing `bert.toml`.
///
/// Returns the directory containing `bert.toml`, or an error if none is found.
pub fn find_bench_root(start: &Path) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(CONFIG_FILE).exists() {
            return Ok(current);
        }
        if !current.pop() {
            return Err(format!(
                "could not find {CONFIG_FILE} in {} or any parent directory",
                start.display()
            )
            .into());
        }
    }
}

/// Resolves the configuration file path from global CLI args.
///
/// If `--config` is specified, uses that path (file → itself, dir → its
/// `bert.toml`). Otherwise walks up from the current directory.
pub fn resolve_config_path(global: &GlobalArgs) -> Result<PathBuf, Box<dyn std::error::Error>> {
    if let Some(ref config_path) = global.config {
        let p = PathBuf::from(config_path);
        if p.is_dir() {
            Ok(p.join(CONFIG_FILE))
        } else {
            Ok(p)
        }
    } else {
        Ok(find_bench_root(&std::env::current_dir()?)?.join(CONFIG_FILE))
    }
}

/// Loads, validates and resolves the bench configuration.
pub fn load_bench(global: &GlobalArgs) -> Result<ResolvedBench, Box<dyn std::error::Error>> {
    let path = resolve_config_path(global)?;
    let config = bert_config::load_config_file(&path)?;
    let base_dir = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let bench = bert_config::resolve_bench(&config, &base_dir)?;
    log::debug!(
        "loaded {} ({} family, {} memories)",
        path.display(),
        bench.family,
        bench.memories.len()
    );
    Ok(bench)
}

/// Opens a readback session over the configured frame image.
pub fn open_session(
    bench: &ResolvedBench,
) -> Result<ReadbackSession<ImageTransport>, Box<dyn std::error::Error>> {
    let image = bench
        .frame_image
        .as_ref()
        .ok_or("no frame image configured (set transport.image)")?;
    let transport = ImageTransport::load(bench.family.geometry(), image)
        .map_err(|e| format!("{}: {e}", image.display()))?;
    log::debug!(
        "opened frame image {} ({} frames)",
        image.display(),
        transport.frame_count()
    );
    Ok(
        ReadbackSession::new(bench.family, transport, bench.memories.clone())
            .with_retry(bench.retry)
            .with_write_verification(bench.verify_writes),
    )
}

/// Writes the session's frame image back to disk.
pub fn save_session(
    bench: &ResolvedBench,
    session: ReadbackSession<ImageTransport>,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(image) = &bench.frame_image {
        session
            .into_transport()
            .save(image)
            .map_err(|e| format!("{}: {e}", image.display()))?;
    }
    Ok(())
}

/// Opens the configured AXI bus image.
pub fn open_bus(bench: &ResolvedBench) -> Result<BusImage, Box<dyn std::error::Error>> {
    let axi = bench
        .axi
        .as_ref()
        .ok_or("no AXI image configured (add an [axi] section)")?;
    let bus = BusImage::load(&axi.image, axi.base)
        .map_err(|e| format!("{}: {e}", axi.image.display()))?;
    Ok(bus)
}

/// Parses a values file: one word per line, `#` starts a comment.
pub fn parse_values(text: &str, word_width: u32) -> Result<WordSequence, Box<dyn std::error::Error>> {
    let mut values = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        let line = line.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        let value = parse_int(line)
            .ok_or_else(|| format!("line {}: invalid value '{line}'", lineno + 1))?;
        values.push(value);
    }
    Ok(WordSequence::new(word_width, values)?)
}

/// Renders words in the values-file format.
pub fn format_values(words: &WordSequence) -> String {
    let digits = words.word_width().div_ceil(4) as usize;
    let mut out = String::new();
    for &v in words.values() {
        out.push_str(&format!("0x{v:0digits$x}\n"));
    }
    out
}
