//! `bert verify`: cross-check readback against the AXI view.
//!
//! Each selected memory is read twice, once from the AXI bus image and once
//! through configuration readback, and the two readings are compared word
//! by word. Exits 1 if any memory disagrees.

use bert_frames::{compare, read_window, LogicalMemory, VerificationSummary};

use crate::pipeline::{load_bench, open_bus, open_session};
use crate::{GlobalArgs, ReportFormat, VerifyArgs};

/// Runs the `bert verify` command.
pub fn run(args: &VerifyArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let bench = load_bench(global)?;
    let mut session = open_session(&bench)?;
    let mut bus = open_bus(&bench)?;

    let selected: Vec<&LogicalMemory> = if args.memories.is_empty() {
        bench.memories.iter().filter(|m| m.axi.is_some()).collect()
    } else {
        args.memories
            .iter()
            .map(|name| bench.memories.lookup(name))
            .collect::<Result<_, _>>()?
    };
    if selected.is_empty() {
        return Err("no AXI-visible memories to verify".into());
    }

    let mut summary = VerificationSummary::new();
    for memory in selected {
        let window = memory
            .axi
            .ok_or_else(|| format!("memory '{}' has no AXI window", memory.name))?;
        let axi = read_window(&mut bus, &window, memory.word_width)?;
        let slot = session.resolve(&memory.path)?;
        let bert = session.read_memory(slot)?;
        let report = compare(&axi, &bert)?;
        log::info!(
            "{}: {} words, {} mismatches, {} zero",
            memory.name,
            report.len,
            report.mismatches.len(),
            report.zero_count
        );
        summary.push(memory.name.clone(), report);
    }

    match global.format {
        ReportFormat::Text => print!("{summary}"),
        ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
    }
    Ok(if summary.passed { 0 } else { 1 })
}
