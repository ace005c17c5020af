//! Player settings
//!
//! Per-player preferences for the sight line tool. Room-wide settings live
//! in [`sightline_core::RoomMetadata`].

mod manager;

pub use manager::{SettingsError, SettingsManager, SharedSettings, create_shared_settings};

use serde::{Deserialize, Serialize};

/// Where the origin of a sight line is placed
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum SnapOrigin {
    /// Use the pointer position as is
    Disabled,
    /// Snap to the center of the cell under the pointer
    #[default]
    Center,
    /// Try every corner of the origin cell and keep the best one
    Corners,
}

/// What the sight lines are cast to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum MeasureTo {
    /// Every corner of the destination cell
    #[default]
    Corners,
    /// Only the destination cell center
    Center,
}

/// Player preferences
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolSettings {
    /// Configuration format version
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub snap_origin: SnapOrigin,
    #[serde(default)]
    pub measure_to: MeasureTo,
    /// Remove the indicator when the drag ends instead of keeping it
    #[serde(default)]
    pub hide_on_drag_stop: bool,
    /// Keep indicator items in the local store, invisible to other players
    #[serde(default)]
    pub private: bool,
}

impl ToolSettings {
    /// Current settings version
    pub const CURRENT_VERSION: u32 = 1;
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            snap_origin: SnapOrigin::default(),
            measure_to: MeasureTo::default(),
            hide_on_drag_stop: false,
            private: false,
        }
    }
}
