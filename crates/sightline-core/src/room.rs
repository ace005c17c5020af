//! Room Configuration
//!
//! Room-level settings shared by everyone in the scene: the label and color
//! shown for each count of clear corners, and how solid character tokens are.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::types::Metadata;

pub const METADATA_KEY_CORNER_CONFIGS: &str = "com.sightline/cornerConfigs";
pub const METADATA_KEY_CHARACTER_SOLIDITY: &str = "com.sightline/characterSolidity";

/// Entries in the corner table, indices 0 through 6
pub const CORNER_CONFIG_COUNT: usize = 7;

/// Label and color for one clear-corner count
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CornerCountConfig {
    pub label: String,
    /// `#rrggbb`
    pub color: String,
}

impl CornerCountConfig {
    pub fn new(label: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            color: color.into(),
        }
    }
}

/// Validated room configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomMetadata {
    pub corner_configs: [CornerCountConfig; CORNER_CONFIG_COUNT],
    /// Solidity of character tokens as obstacles, 0 disables them
    pub character_solidity: f64,
}

impl Default for RoomMetadata {
    fn default() -> Self {
        Self {
            corner_configs: default_corner_configs(),
            character_solidity: 0.0,
        }
    }
}

fn default_corner_configs() -> [CornerCountConfig; CORNER_CONFIG_COUNT] {
    [
        CornerCountConfig::new("Total Cover", "#ff0000"),
        CornerCountConfig::new("Three-Quarters Cover", "#ff7f00"),
        CornerCountConfig::new("Half Cover", "#ffd400"),
        CornerCountConfig::new("Half Cover", "#ffd400"),
        CornerCountConfig::new("No Cover", "#00e676"),
        CornerCountConfig::new("No Cover", "#00e676"),
        CornerCountConfig::new("No Cover", "#00e676"),
    ]
}

impl RoomMetadata {
    /// Read from a room metadata map, replacing malformed values by defaults
    pub fn from_metadata(metadata: &Metadata) -> Self {
        let defaults = Self::default();

        let corner_configs = match metadata.get(METADATA_KEY_CORNER_CONFIGS) {
            None => defaults.corner_configs,
            Some(value) => parse_corner_configs(value).unwrap_or_else(|| {
                warn!("Ignoring malformed corner configs: {}", value);
                defaults.corner_configs
            }),
        };

        let character_solidity = match metadata.get(METADATA_KEY_CHARACTER_SOLIDITY) {
            None => defaults.character_solidity,
            Some(value) => match value.as_f64() {
                Some(solidity) if solidity.is_finite() && (0.0..=1.0).contains(&solidity) => {
                    solidity
                }
                _ => {
                    warn!("Ignoring malformed character solidity: {}", value);
                    defaults.character_solidity
                }
            },
        };

        Self {
            corner_configs,
            character_solidity,
        }
    }

    /// Serialize into room metadata entries
    pub fn to_metadata(&self) -> Metadata {
        let mut metadata = Metadata::new();
        let configs = self
            .corner_configs
            .iter()
            .map(|c| serde_json::json!({ "label": c.label, "color": c.color }))
            .collect();
        metadata.insert(METADATA_KEY_CORNER_CONFIGS.to_string(), Value::Array(configs));
        metadata.insert(
            METADATA_KEY_CHARACTER_SOLIDITY.to_string(),
            Value::from(self.character_solidity),
        );
        metadata
    }

    /// Entry for a clear-corner count, clamped to the table
    pub fn corner_config(&self, clear_corners: usize) -> &CornerCountConfig {
        &self.corner_configs[clear_corners.min(CORNER_CONFIG_COUNT - 1)]
    }

    pub fn characters_block(&self) -> bool {
        self.character_solidity > 0.0
    }
}

fn parse_corner_configs(value: &Value) -> Option<[CornerCountConfig; CORNER_CONFIG_COUNT]> {
    let configs: Vec<CornerCountConfig> = serde_json::from_value(value.clone()).ok()?;
    if !configs.iter().all(|c| is_hex_color(&c.color)) {
        return None;
    }
    configs.try_into().ok()
}

/// Whether `s` is a `#rrggbb` color
pub fn is_hex_color(s: &str) -> bool {
    s.len() == 7 && s.starts_with('#') && s[1..].chars().all(|c| c.is_ascii_hexdigit())
}

/// Indicator color for a solidity: white to yellow to red
pub fn partial_cover_color(solidity: f64) -> String {
    let s = if solidity.is_finite() {
        solidity.clamp(0.0, 1.0)
    } else {
        1.0
    };
    let (r, g, b) = if s <= 0.5 {
        let t = s / 0.5;
        (1.0, 1.0, 1.0 - t)
    } else {
        let t = (s - 0.5) / 0.5;
        (1.0, 1.0 - t, 0.0)
    };
    let byte = |c: f64| (c * 255.0).round() as u8;
    format!("#{:02x}{:02x}{:02x}", byte(r), byte(g), byte(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_when_missing() {
        let room = RoomMetadata::from_metadata(&Metadata::new());
        assert_eq!(room, RoomMetadata::default());
        assert!(!room.characters_block());
    }

    #[test]
    fn test_round_trip_through_metadata() {
        let mut room = RoomMetadata::default();
        room.character_solidity = 0.4;
        room.corner_configs[4] = CornerCountConfig::new("Clear", "#123abc");
        assert_eq!(RoomMetadata::from_metadata(&room.to_metadata()), room);
    }

    #[test]
    fn test_malformed_values_fall_back() {
        let mut metadata = Metadata::new();
        metadata.insert(
            METADATA_KEY_CORNER_CONFIGS.to_string(),
            json!([{ "label": "only one", "color": "#ffffff" }]),
        );
        metadata.insert(METADATA_KEY_CHARACTER_SOLIDITY.to_string(), json!(3.0));
        assert_eq!(RoomMetadata::from_metadata(&metadata), RoomMetadata::default());

        let bad_color: Vec<Value> = (0..7)
            .map(|_| json!({ "label": "x", "color": "red" }))
            .collect();
        metadata.insert(METADATA_KEY_CORNER_CONFIGS.to_string(), Value::Array(bad_color));
        metadata.insert(METADATA_KEY_CHARACTER_SOLIDITY.to_string(), json!("solid"));
        assert_eq!(RoomMetadata::from_metadata(&metadata), RoomMetadata::default());
    }

    #[test]
    fn test_corner_config_clamps() {
        let room = RoomMetadata::default();
        assert_eq!(room.corner_config(0).label, "Total Cover");
        assert_eq!(room.corner_config(42).label, "No Cover");
    }

    #[test]
    fn test_partial_cover_color() {
        assert_eq!(partial_cover_color(0.0), "#ffffff");
        assert_eq!(partial_cover_color(0.5), "#ffff00");
        assert_eq!(partial_cover_color(1.0), "#ff0000");
        assert_eq!(partial_cover_color(f64::NAN), "#ff0000");
        assert!(is_hex_color(&partial_cover_color(0.3)));
    }
}
