//! Configuration types deserialized from `bert.toml`.

use bert_frames::BramKind;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;

/// The top-level configuration parsed from `bert.toml`.
///
/// Describes the device under test, how to reach its configuration memory
/// and AXI bus, and the logical memories to verify.
#[derive(Debug, Deserialize)]
pub struct BertConfig {
    /// The device under test.
    pub device: DeviceConfig,
    /// Readback transport settings.
    #[serde(default)]
    pub transport: TransportConfig,
    /// AXI bus image for cross-checking, if any.
    #[serde(default)]
    pub axi: Option<AxiConfig>,
    /// Code-table entry layout.
    #[serde(default)]
    pub packing: PackingConfig,
    /// Logical memories keyed by short name.
    #[serde(default)]
    pub memories: BTreeMap<String, MemoryConfig>,
}

/// Device identification.
#[derive(Debug, Deserialize)]
pub struct DeviceConfig {
    /// 32-bit JTAG ID code, as an integer or a `0x` hex string.
    #[serde(deserialize_with = "deserialize_hex_u32")]
    pub idcode: u32,
    /// Family override (`ultrascale_plus` or `series7`).
    #[serde(default)]
    pub family: Option<String>,
}

/// Readback transport settings.
#[derive(Debug, Deserialize)]
pub struct TransportConfig {
    /// Frame image file standing in for the device.
    #[serde(default)]
    pub image: Option<String>,
    /// Polling ceiling per transport request.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Re-read and fingerprint every written span.
    #[serde(default)]
    pub verify_writes: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            image: None,
            max_attempts: default_max_attempts(),
            verify_writes: false,
        }
    }
}

fn default_max_attempts() -> u32 {
    16
}

/// AXI bus image settings.
#[derive(Debug, Deserialize)]
pub struct AxiConfig {
    /// Bus dump file of little-endian words.
    pub image: String,
    /// Bus address of the first word of the dump.
    #[serde(deserialize_with = "deserialize_hex_u64")]
    pub base: u64,
}

/// Code-table entry layout: `length << length_shift | code & code_mask`.
#[derive(Debug, Deserialize)]
pub struct PackingConfig {
    /// Left shift of the length field.
    #[serde(default = "default_length_shift")]
    pub length_shift: u32,
    /// Width of the length field.
    #[serde(default = "default_length_bits")]
    pub length_bits: u32,
    /// Mask of the code field.
    #[serde(default = "default_code_mask", deserialize_with = "deserialize_hex_u64")]
    pub code_mask: u64,
}

impl Default for PackingConfig {
    fn default() -> Self {
        Self {
            length_shift: default_length_shift(),
            length_bits: default_length_bits(),
            code_mask: default_code_mask(),
        }
    }
}

fn default_length_shift() -> u32 {
    16
}

fn default_length_bits() -> u32 {
    4
}

fn default_code_mask() -> u64 {
    0xFFFF
}

/// One logical memory.
#[derive(Debug, Deserialize)]
pub struct MemoryConfig {
    /// Hierarchical instance path in the design.
    pub path: String,
    /// Bits per word.
    pub word_width: u32,
    /// Number of words.
    pub depth: u32,
    /// Primitives holding the memory, lowest logical bits first.
    #[serde(default)]
    pub blocks: Vec<BlockConfig>,
    /// Bus address of entry 0, if the memory is AXI-visible.
    #[serde(default, deserialize_with = "deserialize_opt_hex_u64")]
    pub axi_base: Option<u64>,
    /// Byte distance between bus entries. Defaults to the entry size.
    #[serde(default)]
    pub axi_stride: Option<u32>,
}

/// One block RAM primitive.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct BlockConfig {
    /// `ramb18` or `ramb36`.
    pub kind: BramKind,
    /// First frame of the content column.
    #[serde(deserialize_with = "deserialize_hex_u32")]
    pub column_frame: u32,
    /// Row within the column, in units of `kind`.
    pub row: u32,
}

/// Parses `0x`-prefixed hex or plain decimal, ignoring `_` separators.
pub fn parse_int(text: &str) -> Option<u64> {
    let cleaned: String = text.trim().chars().filter(|&c| c != '_').collect();
    match cleaned
        .strip_prefix("0x")
        .or_else(|| cleaned.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => cleaned.parse().ok(),
    }
}

/// An unsigned integer written either as a TOML integer or as a string.
struct HexU64(u64);

impl<'de> Deserialize<'de> for HexU64 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct HexOrInt;

        impl<'de> Visitor<'de> for HexOrInt {
            type Value = HexU64;

            fn expecting(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                formatter.write_str("an unsigned integer or a hex string such as \"0x04A42093\"")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                Ok(HexU64(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                u64::try_from(v)
                    .map(HexU64)
                    .map_err(|_| E::invalid_value(de::Unexpected::Signed(v), &self))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                parse_int(v)
                    .map(HexU64)
                    .ok_or_else(|| E::invalid_value(de::Unexpected::Str(v), &self))
            }
        }

        deserializer.deserialize_any(HexOrInt)
    }
}

fn deserialize_hex_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    HexU64::deserialize(deserializer).map(|h| h.0)
}

fn deserialize_opt_hex_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<HexU64>::deserialize(deserializer).map(|h| h.map(|h| h.0))
}

fn deserialize_hex_u32<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = deserialize_hex_u64(deserializer)?;
    u32::try_from(value).map_err(|_| {
        de::Error::invalid_value(de::Unexpected::Unsigned(value), &"a 32-bit value")
    })
}
