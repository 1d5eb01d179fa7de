//! Error types for configuration loading and validation.

use bert_common::BertError;

/// Errors that can occur when loading, validating or resolving a `bert.toml`.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An I/O error occurred while reading the configuration file.
    #[error("failed to read configuration: {0}")]
    IoError(#[from] std::io::Error),

    /// The TOML content could not be parsed.
    #[error("failed to parse configuration: {0}")]
    ParseError(String),

    /// A required field is missing from the configuration.
    #[error("missing required field: {0}")]
    MissingField(String),

    /// A configuration value failed validation.
    #[error("validation error: {0}")]
    ValidationError(String),

    /// The configuration names a device or memory layout the frame model rejects.
    #[error("cannot resolve configuration: {0}")]
    Resolve(#[from] BertError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_missing_field() {
        let err = ConfigError::MissingField("memories.hist.path".to_string());
        assert_eq!(format!("{err}"), "missing required field: memories.hist.path");
    }

    #[test]
    fn display_parse_error() {
        let err = ConfigError::ParseError("expected '=' at line 3".to_string());
        assert_eq!(
            format!("{err}"),
            "failed to parse configuration: expected '=' at line 3"
        );
    }

    #[test]
    fn display_validation_error() {
        let err = ConfigError::ValidationError("word_width must be 1..=64".to_string());
        assert_eq!(format!("{err}"), "validation error: word_width must be 1..=64");
    }

    #[test]
    fn display_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = ConfigError::IoError(io_err);
        let display = format!("{err}");
        assert!(display.starts_with("failed to read configuration:"));
    }

    #[test]
    fn resolve_wraps_frame_errors() {
        let err: ConfigError = BertError::UnsupportedFamily { idcode: 0x1234_5678 }.into();
        assert_eq!(
            format!("{err}"),
            "cannot resolve configuration: unsupported device family for idcode 0x12345678"
        );
    }
}
