//! `bert dump`: read a logical memory through configuration readback.

use crate::pipeline::{format_values, load_bench, open_session};
use crate::{DumpArgs, GlobalArgs, ReportFormat};

/// Runs the `bert dump` command.
///
/// With `--output` the words go to a values file that `bert patch --values`
/// accepts; otherwise they are printed.
pub fn run(args: &DumpArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let bench = load_bench(global)?;
    let mut session = open_session(&bench)?;
    let slot = session.resolve(&args.memory)?;
    let words = session.read_memory(slot)?;

    if let Some(output) = &args.output {
        std::fs::write(output, format_values(&words))?;
        if !global.quiet {
            eprintln!("   Wrote {} words to {output}", words.len());
        }
        return Ok(0);
    }

    match global.format {
        ReportFormat::Text => {
            for (i, line) in format_values(&words).lines().enumerate() {
                println!("{i:>6}  {line}");
            }
            if !global.quiet {
                eprintln!(
                    "   {} words, {} zero",
                    words.len(),
                    words.zero_count()
                );
            }
        }
        ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&words)?),
    }
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::parse_values;
    use crate::pipeline::tests::{bench_dir, global_for};

    #[test]
    fn dump_to_values_file() {
        let dir = bench_dir();
        let out = dir.path().join("hist.txt");
        let args = DumpArgs {
            memory: "hist".into(),
            output: Some(out.display().to_string()),
        };
        assert_eq!(run(&args, &global_for(dir.path())).unwrap(), 0);
        let words = parse_values(&std::fs::read_to_string(&out).unwrap(), 64).unwrap();
        assert_eq!(words.len(), 256);
        assert_eq!(words.zero_count(), 256);
    }

    #[test]
    fn dump_unknown_memory_fails() {
        let dir = bench_dir();
        let args = DumpArgs {
            memory: "missing".into(),
            output: None,
        };
        assert!(run(&args, &global_for(dir.path())).is_err());
    }
}
