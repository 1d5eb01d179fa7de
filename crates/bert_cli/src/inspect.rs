//! `bert geometry` and `bert locate`: frame layout inspection.

use bert_frames::{DeviceFamily, Geometry, StreamLayout};

use crate::pipeline::load_bench;
use crate::{GeometryArgs, GlobalArgs, LocateArgs, ReportFormat};

/// Runs the `bert geometry` command.
///
/// Uses `--family` when given, otherwise the configured device.
pub fn run_geometry(args: &GeometryArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let family = match &args.family {
        Some(name) => name.parse::<DeviceFamily>()?,
        None => load_bench(global)?.family,
    };
    let geometry = family.geometry();
    geometry.validate()?;

    match global.format {
        ReportFormat::Text => print!("{}", render_geometry(family, geometry)),
        ReportFormat::Json => println!("{}", serde_json::to_string_pretty(geometry)?),
    }
    Ok(0)
}

fn render_geometry(family: DeviceFamily, g: &Geometry) -> String {
    let mut out = format!("{family} ({})\n", g.family);
    out.push_str(&format!("  words per frame:        {}\n", g.words_per_frame));
    out.push_str(&format!("  frames per BRAM column: {}\n", g.frames_per_bram_column));
    out.push_str(&format!("  BRAM18 slice bits:      {}\n", g.bram18_slice_bits()));
    out.push_str(&format!(
        "  padding words:          {} before, {} between, {} after, {} pad\n",
        g.words_before_frames, g.words_between_frames, g.words_after_frames, g.pad_words
    ));
    out.push_str(&format!(
        "  column readback:        {} words\n",
        g.readback_words(g.frames_per_bram_column)
    ));
    out.push_str("  row  lower  upper  bit location\n");
    for (row, &loc) in g.bit_locations.iter().enumerate() {
        out.push_str(&format!(
            "  {row:>3}  {:>5}  {:>5}  {loc:>12}\n",
            g.bram18_starts[2 * row],
            g.bram18_starts[2 * row + 1]
        ));
    }
    out
}

/// Runs the `bert locate` command.
///
/// Prints the frame coordinate of one bit of a logical memory and its offset
/// in the readback stream of the memory's frame span.
pub fn run_locate(args: &LocateArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let bench = load_bench(global)?;
    let geometry = bench.family.geometry();
    let memory = bench.memories.lookup(&args.memory)?;
    let coord = memory.locate_word(geometry, args.index, args.bit)?;
    let span = memory.frame_span(geometry);
    let layout = StreamLayout::new(geometry, span.start, span.end - span.start);
    let stream_bit = layout.linearize(coord)?;

    match global.format {
        ReportFormat::Text => println!(
            "{}[{}] bit {}: {coord} (stream bit {stream_bit} of frames {}..{})",
            memory.name, args.index, args.bit, span.start, span.end
        ),
        ReportFormat::Json => {
            let value = serde_json::json!({
                "memory": memory.name,
                "index": args.index,
                "bit": args.bit,
                "coordinate": coord,
                "span": { "start": span.start, "end": span.end },
                "stream_bit": stream_bit,
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
    }
    Ok(0)
}
