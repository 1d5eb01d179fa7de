//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::BertConfig;
use bert_frames::{CodePacking, DeviceFamily};
use std::path::Path;

/// File name of the configuration inside a bench directory.
pub const CONFIG_FILE: &str = "bert.toml";

/// Loads and validates a `bert.toml` configuration from a bench directory.
///
/// Reads `<dir>/bert.toml`, parses it, and validates required fields.
pub fn load_config(dir: &Path) -> Result<BertConfig, ConfigError> {
    load_config_file(&dir.join(CONFIG_FILE))
}

/// Loads and validates a configuration from an explicit file path.
pub fn load_config_file(path: &Path) -> Result<BertConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    load_config_from_str(&content)
}

/// Parses and validates a `bert.toml` configuration from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<BertConfig, ConfigError> {
    let config: BertConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Validates that required fields are present and values are consistent.
fn validate_config(config: &BertConfig) -> Result<(), ConfigError> {
    if let Some(family) = &config.device.family {
        family
            .parse::<DeviceFamily>()
            .map_err(ConfigError::ValidationError)?;
    }
    if config.transport.max_attempts == 0 {
        return Err(ConfigError::ValidationError(
            "transport.max_attempts must be at least 1".to_string(),
        ));
    }
    if let Some(axi) = &config.axi {
        if axi.image.is_empty() {
            return Err(ConfigError::MissingField("axi.image".to_string()));
        }
    }

    let packing = &config.packing;
    let layout = CodePacking {
        length_shift: packing.length_shift,
        length_bits: packing.length_bits,
        code_mask: packing.code_mask,
    };
    if !layout.is_well_formed() {
        return Err(ConfigError::ValidationError(format!(
            "packing: length field ({} bits at {}) overlaps code mask {:#x}",
            packing.length_bits, packing.length_shift, packing.code_mask
        )));
    }

    for (name, memory) in &config.memories {
        if memory.path.is_empty() {
            return Err(ConfigError::MissingField(format!("memories.{name}.path")));
        }
        if memory.blocks.is_empty() {
            return Err(ConfigError::MissingField(format!("memories.{name}.blocks")));
        }
        if !(1..=64).contains(&memory.word_width) {
            return Err(ConfigError::ValidationError(format!(
                "memories.{name}.word_width must be between 1 and 64, got {}",
                memory.word_width
            )));
        }
        if memory.depth == 0 {
            return Err(ConfigError::ValidationError(format!(
                "memories.{name}.depth must be non-zero"
            )));
        }
        if memory.depth.checked_mul(memory.word_width).is_none() {
            return Err(ConfigError::ValidationError(format!(
                "memories.{name}: depth * word_width overflows"
            )));
        }
        if memory.axi_stride.is_some() && memory.axi_base.is_none() {
            return Err(ConfigError::MissingField(format!("memories.{name}.axi_base")));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ULTRA96: &str = r#"
[device]
idcode = "0x04A42093"

[transport]
image = "frames.bin"
max_attempts = 8
verify_writes = true

[axi]
image = "axi.bin"
base = "0xA0000000"

[memories.hist]
path = "design_1_i/huffman_0/inst/hist/ram"
word_width = 64
depth = 256
blocks = [{ kind = "ramb18", column_frame = 512, row = 6 }]
axi_base = "0xA0002000"
axi_stride = 8

[memories.huff]
path = "design_1_i/huffman_0/inst/huff/ram"
word_width = 32
depth = 512
blocks = [{ kind = "ramb18", column_frame = 512, row = 7 }]
axi_base = 0xA0003000
"#;

    #[test]
    fn parse_full_config() {
        let config = load_config_from_str(ULTRA96).unwrap();
        assert_eq!(config.device.idcode, 0x04A4_2093);
        assert_eq!(config.transport.max_attempts, 8);
        assert!(config.transport.verify_writes);
        assert_eq!(config.axi.as_ref().unwrap().base, 0xA000_0000);
        assert_eq!(config.memories.len(), 2);
        assert_eq!(config.memories["hist"].axi_stride, Some(8));
        assert_eq!(config.memories["huff"].axi_base, Some(0xA000_3000));
    }

    #[test]
    fn parse_minimal_config() {
        let config = load_config_from_str("[device]\nidcode = 0x03727093\n").unwrap();
        assert_eq!(config.device.idcode, 0x0372_7093);
        assert!(config.memories.is_empty());
        assert!(config.axi.is_none());
        assert_eq!(config.packing.length_shift, 16);
    }

    #[test]
    fn missing_device_errors() {
        let err = load_config_from_str("[transport]\nmax_attempts = 3\n").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn invalid_toml_errors() {
        let err = load_config_from_str("this is not valid toml {{{}}}").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn unknown_family_override_errors() {
        let toml = "[device]\nidcode = 0\nfamily = \"virtex2\"\n";
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn zero_attempts_errors() {
        let toml = "[device]\nidcode = 0\n[transport]\nmax_attempts = 0\n";
        assert!(matches!(
            load_config_from_str(toml).unwrap_err(),
            ConfigError::ValidationError(_)
        ));
    }

    #[test]
    fn overlapping_packing_errors() {
        let toml = "[device]\nidcode = 0\n[packing]\nlength_shift = 15\nlength_bits = 4\n";
        assert!(matches!(
            load_config_from_str(toml).unwrap_err(),
            ConfigError::ValidationError(_)
        ));
    }

    #[test]
    fn memory_without_blocks_errors() {
        let toml = r#"
[device]
idcode = 0
[memories.m]
path = "top/m"
word_width = 8
depth = 4
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField(ref f) if f == "memories.m.blocks"));
    }

    #[test]
    fn bad_word_width_errors() {
        let toml = r#"
[device]
idcode = 0
[memories.m]
path = "top/m"
word_width = 65
depth = 4
blocks = [{ kind = "ramb18", column_frame = 0, row = 0 }]
"#;
        assert!(matches!(
            load_config_from_str(toml).unwrap_err(),
            ConfigError::ValidationError(_)
        ));
    }

    #[test]
    fn stride_without_base_errors() {
        let toml = r#"
[device]
idcode = 0
[memories.m]
path = "top/m"
word_width = 8
depth = 4
blocks = [{ kind = "ramb18", column_frame = 0, row = 0 }]
axi_stride = 4
"#;
        assert!(matches!(
            load_config_from_str(toml).unwrap_err(),
            ConfigError::MissingField(_)
        ));
    }

    #[test]
    fn load_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), ULTRA96).unwrap();
        let config = load_config(dir.path()).unwrap();
        assert_eq!(config.memories["hist"].depth, 256);
    }

    #[test]
    fn io_error_from_nonexistent_dir() {
        let err = load_config(Path::new("/nonexistent/dir")).unwrap_err();
        assert!(matches!(err, ConfigError::IoError(_)));
    }
}
