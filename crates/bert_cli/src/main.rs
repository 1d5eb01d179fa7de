//! BERT CLI: configuration-readback inspection and verification.
//!
//! Provides `bert geometry` and `bert locate` for inspecting where memory bits
//! live in configuration frames, `bert dump` and `bert patch` for reading and
//! rewriting a logical memory through readback, and `bert verify` for
//! cross-checking readback against the AXI view of the same memories.

#![warn(missing_docs)]

mod dump;
mod inspect;
mod patch;
mod pipeline;
mod verify;

use std::process;

use clap::{Parser, Subcommand, ValueEnum};

/// BERT: block RAM extraction and readback toolkit.
#[derive(Parser, Debug)]
#[command(name = "bert", version, about = "BERT configuration readback toolkit")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to a custom `bert.toml` configuration file.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Output format for results.
    #[arg(long, global = true, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the frame geometry of a device family.
    Geometry(GeometryArgs),
    /// Show where a bit of a logical memory lives.
    Locate(LocateArgs),
    /// Read a logical memory through configuration readback.
    Dump(DumpArgs),
    /// Rewrite a logical memory through configuration readback.
    Patch(PatchArgs),
    /// Cross-check readback against the AXI view.
    Verify(VerifyArgs),
}

/// Arguments for the `bert geometry` subcommand.
#[derive(Parser, Debug)]
pub struct GeometryArgs {
    /// Device family (`ultrascale_plus` or `series7`). Defaults to the
    /// configured device.
    #[arg(long)]
    pub family: Option<String>,
}

/// Arguments for the `bert locate` subcommand.
#[derive(Parser, Debug)]
pub struct LocateArgs {
    /// Memory name or hierarchical path.
    pub memory: String,

    /// Word index within the memory.
    pub index: u32,

    /// Bit within the word.
    #[arg(long, default_value_t = 0)]
    pub bit: u32,
}

/// Arguments for the `bert dump` subcommand.
#[derive(Parser, Debug)]
pub struct DumpArgs {
    /// Memory name or hierarchical path.
    pub memory: String,

    /// Write the words to a values file instead of stdout.
    #[arg(short, long)]
    pub output: Option<String>,
}

/// Arguments for the `bert patch` subcommand.
#[derive(Parser, Debug)]
pub struct PatchArgs {
    /// Memory name or hierarchical path.
    pub memory: String,

    /// Values file with one word per line (hex with `0x` or decimal).
    #[arg(long, conflicts_with = "identity", required_unless_present = "identity")]
    pub values: Option<String>,

    /// Write an identity code table: entry `i` encodes `(length, i mod 256)`.
    #[arg(long)]
    pub identity: bool,

    /// Code length used by `--identity`.
    #[arg(long, default_value_t = 8)]
    pub length: u32,
}

/// Arguments for the `bert verify` subcommand.
#[derive(Parser, Debug)]
pub struct VerifyArgs {
    /// Memories to check. Defaults to every AXI-visible memory.
    pub memories: Vec<String>,
}

/// Result output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable terminal output.
    Text,
    /// Machine-readable JSON output.
    Json,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to print verbose/debug information.
    pub verbose: bool,
    /// Optional path to a custom config file.
    pub config: Option<String>,
    /// Output format for results.
    pub format: ReportFormat,
}

impl GlobalArgs {
    /// Default log filter for these flags; `RUST_LOG` overrides it.
    fn log_filter(&self) -> &'static str {
        if self.quiet {
            "error"
        } else if self.verbose {
            "debug"
        } else {
            "warn"
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        config: cli.config,
        format: cli.format,
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(global.log_filter()))
        .format_timestamp(None)
        .init();

    let result = match cli.command {
        Command::Geometry(ref args) => inspect::run_geometry(args, &global),
        Command::Locate(ref args) => inspect::run_locate(args, &global),
        Command::Dump(ref args) => dump::run(args, &global),
        Command::Patch(ref args) => patch::run(args, &global),
        Command::Verify(ref args) => verify::run(args, &global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}
