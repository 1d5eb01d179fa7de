//! Parsing and validation of `bert.toml` bench configuration files.
//!
//! This crate reads the bench configuration and produces a strongly-typed
//! [`BertConfig`], then resolves it against the device's frame geometry into
//! a [`ResolvedBench`] with a validated memory table.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod resolve;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_file, load_config_from_str, CONFIG_FILE};
pub use resolve::{resolve_bench, ResolvedAxi, ResolvedBench};
pub use types::*;
