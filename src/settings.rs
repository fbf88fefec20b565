//! Player preferences
//!
//! Persisted separately from the leaderboard in LocalStorage.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::palette::{BarrelTip, Palette, TurretShape};
use crate::tuning::MapStyle;

/// Input layout the host should present
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ControlScheme {
    /// Keyboard movement, mouse aim
    #[default]
    Desktop,
    /// Virtual joystick and on-screen buttons
    Mobile,
}

impl ControlScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            ControlScheme::Desktop => "Desktop",
            ControlScheme::Mobile => "Mobile",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "desktop" | "pc" => Some(ControlScheme::Desktop),
            "mobile" | "touch" => Some(ControlScheme::Mobile),
            _ => None,
        }
    }
}

/// Game settings/preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Display name shown to other players and on the leaderboard
    pub name: String,
    pub map: MapStyle,
    pub control: ControlScheme,

    // === Tank customisation ===
    pub body_color: String,
    pub barrel_color: String,
    pub wheel_color: String,
    pub outline_color: String,
    pub turret: TurretShape,
    pub barrel_tip: BarrelTip,

    // === Effects ===
    /// Impact and wreck particles
    pub particles: bool,
}

impl Default for Settings {
    fn default() -> Self {
        let palette = Palette::PLAYER;
        Self {
            name: "Player".to_string(),
            map: MapStyle::City,
            control: ControlScheme::Desktop,

            body_color: palette.body.to_hex(),
            barrel_color: palette.barrel.to_hex(),
            wheel_color: palette.wheels.to_hex(),
            outline_color: palette.outline.to_hex(),
            turret: palette.turret,
            barrel_tip: palette.barrel_tip,

            particles: true,
        }
    }
}

impl Settings {
    /// Longest display name kept
    pub const MAX_NAME_LEN: usize = 16;

    /// Trimmed, length-limited name; blank names fall back to the default
    pub fn display_name(&self) -> String {
        let trimmed = self.name.trim();
        if trimmed.is_empty() {
            return Self::default().name;
        }
        trimmed.chars().take(Self::MAX_NAME_LEN).collect()
    }

    /// Validated palette for the local tank
    pub fn palette(&self) -> Result<Palette> {
        Palette::from_hex(
            &self.body_color,
            &self.barrel_color,
            &self.wheel_color,
            &self.outline_color,
            self.turret,
            self.barrel_tip,
        )
    }

    /// LocalStorage key
    #[allow(dead_code)]
    const STORAGE_KEY: &'static str = "steel_dash_settings";

    /// Load settings from LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(Some(json)) = storage.get_item(Self::STORAGE_KEY) {
                match serde_json::from_str::<Settings>(&json) {
                    Ok(settings) => {
                        log::info!("Loaded settings from LocalStorage");
                        return settings;
                    }
                    Err(err) => log::warn!("Discarding unreadable settings: {}", err),
                }
            }
        }

        log::info!("Using default settings");
        Self::default()
    }

    /// Save settings to LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn save(&self) {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(json) = serde_json::to_string(self) {
                let _ = storage.set_item(Self::STORAGE_KEY, &json);
                log::info!("Settings saved");
            }
        }
    }

    /// Native stubs
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        Self::default()
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn save(&self) {
        // No-op for native
    }
}
