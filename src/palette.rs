//! Tank appearance
//!
//! Colours arrive from the customise panel as `#rrggbb` strings and are parsed
//! once here, so the renderer never has to guess at missing fields.

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};

/// Turret silhouette
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurretShape {
    #[default]
    Rounded,
    Square,
}

/// Barrel muzzle decoration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BarrelTip {
    #[default]
    Standard,
    Wide,
    Spike,
}

/// Packed 0xRRGGBB colour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rgb(pub u32);

impl Rgb {
    /// Parse `#rrggbb` (leading `#` optional)
    pub fn parse(s: &str) -> Option<Self> {
        let hex = s.trim().strip_prefix('#').unwrap_or(s.trim());
        if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        u32::from_str_radix(hex, 16).ok().map(Rgb)
    }

    pub fn to_hex(self) -> String {
        format!("#{:06x}", self.0)
    }
}

/// Complete tank palette
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Palette {
    pub body: Rgb,
    pub barrel: Rgb,
    pub wheels: Rgb,
    pub outline: Rgb,
    pub turret: TurretShape,
    pub barrel_tip: BarrelTip,
}

impl Default for Palette {
    fn default() -> Self {
        Self::PLAYER
    }
}

impl Palette {
    pub const PLAYER: Self = Self {
        body: Rgb(0x3adb76),
        barrel: Rgb(0xa8ffd7),
        wheels: Rgb(0x1f5138),
        outline: Rgb(0x88ffd1),
        turret: TurretShape::Rounded,
        barrel_tip: BarrelTip::Standard,
    };

    pub const ENEMY: Self = Self {
        body: Rgb(0xe74c3c),
        barrel: Rgb(0xf8b4a6),
        wheels: Rgb(0x5c1c17),
        outline: Rgb(0xf3a8a0),
        turret: TurretShape::Rounded,
        barrel_tip: BarrelTip::Standard,
    };

    pub const REMOTE: Self = Self {
        body: Rgb(0x4ecdc4),
        barrel: Rgb(0xb9fff5),
        wheels: Rgb(0x1b8a7a),
        outline: Rgb(0x8ff1e9),
        turret: TurretShape::Rounded,
        barrel_tip: BarrelTip::Standard,
    };

    /// Build from colour strings, failing on the first unparseable one
    pub fn from_hex(
        body: &str,
        barrel: &str,
        wheels: &str,
        outline: &str,
        turret: TurretShape,
        barrel_tip: BarrelTip,
    ) -> Result<Self> {
        let parse = |part: &'static str, value: &str| {
            Rgb::parse(value).ok_or_else(|| GameError::InvalidColor {
                part,
                value: value.to_string(),
            })
        };
        Ok(Self {
            body: parse("body", body)?,
            barrel: parse("barrel", barrel)?,
            wheels: parse("wheels", wheels)?,
            outline: parse("outline", outline)?,
            turret,
            barrel_tip,
        })
    }
}
