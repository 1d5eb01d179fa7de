//! `bert patch`: rewrite a logical memory through configuration readback.
//!
//! The memory's frame span is read, patched and written back as one
//! transport request, then the frame image is saved.

use bert_frames::identity_code_table;

use crate::pipeline::{load_bench, open_session, parse_values, save_session};
use crate::{GlobalArgs, PatchArgs};

/// Runs the `bert patch` command.
pub fn run(args: &PatchArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let bench = load_bench(global)?;
    let mut session = open_session(&bench)?;
    let slot = session.resolve(&args.memory)?;
    let memory = session.memories().get(slot)?.clone();

    let values = match &args.values {
        Some(path) => parse_values(&std::fs::read_to_string(path)?, memory.word_width)?,
        None => identity_code_table(
            &bench.packing,
            memory.depth() as usize,
            args.length,
            memory.word_width,
        )?,
    };

    session.write_memory(slot, &values)?;
    save_session(&bench, session)?;

    if !global.quiet {
        eprintln!(
            "   Patched {} ({} words of {} bits)",
            memory.name,
            values.len(),
            memory.word_width
        );
    }
    Ok(0)
}
