//! Device families and ID-code identification.

use crate::geometry::{Geometry, SERIES7, ULTRASCALE_PLUS};
use bert_common::{BertError, BertResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Mask removing the 4-bit silicon revision from a JTAG ID code.
const IDCODE_REVISION_MASK: u32 = 0x0FFF_FFFF;

/// Known parts, keyed by revision-masked ID code.
const KNOWN_PARTS: &[(u32, &str, DeviceFamily)] = &[
    (0x04A4_2093, "xczu3eg", DeviceFamily::UltraScalePlus),
    (0x0473_8093, "xczu9eg", DeviceFamily::UltraScalePlus),
    (0x0372_2093, "xc7z010", DeviceFamily::Series7),
    (0x0372_7093, "xc7z020", DeviceFamily::Series7),
    (0x0362_D093, "xc7a35t", DeviceFamily::Series7),
];

/// A silicon family whose configuration frame layout is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceFamily {
    /// Zynq UltraScale+ class parts (93-word frames).
    #[serde(rename = "ultrascale_plus")]
    UltraScalePlus,
    /// 7-series class parts (101-word frames).
    #[serde(rename = "series7")]
    Series7,
}

impl DeviceFamily {
    /// Selects the family for a 32-bit JTAG ID code.
    ///
    /// The revision nibble is ignored. Unknown parts are a fatal
    /// configuration error.
    pub fn from_idcode(idcode: u32) -> BertResult<Self> {
        identify_part(idcode)
            .map(|(_, family)| family)
            .ok_or(BertError::UnsupportedFamily { idcode })
    }

    /// Returns the frame geometry for this family.
    pub fn geometry(self) -> &'static Geometry {
        match self {
            DeviceFamily::UltraScalePlus => &ULTRASCALE_PLUS,
            DeviceFamily::Series7 => &SERIES7,
        }
    }

    /// Returns the configuration name of this family.
    pub fn name(self) -> &'static str {
        match self {
            DeviceFamily::UltraScalePlus => "ultrascale_plus",
            DeviceFamily::Series7 => "series7",
        }
    }
}

/// Looks up the part name and family for an ID code, ignoring the revision.
pub fn identify_part(idcode: u32) -> Option<(&'static str, DeviceFamily)> {
    let masked = idcode & IDCODE_REVISION_MASK;
    KNOWN_PARTS
        .iter()
        .find(|(code, _, _)| *code == masked)
        .map(|&(_, part, family)| (part, family))
}

impl fmt::Display for DeviceFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceFamily::UltraScalePlus => write!(f, "UltraScale+"),
            DeviceFamily::Series7 => write!(f, "7-series"),
        }
    }
}

impl FromStr for DeviceFamily {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ultrascale_plus" | "ultrascale+" | "zynqmp" => Ok(DeviceFamily::UltraScalePlus),
            "series7" | "7series" | "zynq7" => Ok(DeviceFamily::Series7),
            other => Err(format!("unknown device family '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ultra96_idcode() {
        assert_eq!(
            DeviceFamily::from_idcode(0x04A4_2093).unwrap(),
            DeviceFamily::UltraScalePlus
        );
    }

    #[test]
    fn revision_nibble_ignored() {
        assert_eq!(
            DeviceFamily::from_idcode(0x2372_7093).unwrap(),
            DeviceFamily::Series7
        );
        assert_eq!(identify_part(0x1362_D093).map(|p| p.0), Some("xc7a35t"));
    }

    #[test]
    fn unknown_idcode_rejected() {
        let err = DeviceFamily::from_idcode(0x0BAD_0093).unwrap_err();
        assert_eq!(err, BertError::UnsupportedFamily { idcode: 0x0BAD_0093 });
    }

    #[test]
    fn geometry_selection() {
        assert_eq!(DeviceFamily::UltraScalePlus.geometry().words_per_frame, 93);
        assert_eq!(DeviceFamily::Series7.geometry().words_per_frame, 101);
    }

    #[test]
    fn parse_names() {
        assert_eq!(
            "ultrascale_plus".parse::<DeviceFamily>().unwrap(),
            DeviceFamily::UltraScalePlus
        );
        assert_eq!("Series7".parse::<DeviceFamily>().unwrap(), DeviceFamily::Series7);
        assert!("virtex2".parse::<DeviceFamily>().is_err());
    }

    #[test]
    fn name_roundtrips_through_from_str() {
        for family in [DeviceFamily::UltraScalePlus, DeviceFamily::Series7] {
            assert_eq!(family.name().parse::<DeviceFamily>().unwrap(), family);
        }
    }

    #[test]
    fn serde_uses_config_names() {
        let json = serde_json::to_string(&DeviceFamily::UltraScalePlus).unwrap();
        assert_eq!(json, "\"ultrascale_plus\"");
        let back: DeviceFamily = serde_json::from_str(&json).unwrap();
        assert_eq!(back, DeviceFamily::UltraScalePlus);
    }
}
