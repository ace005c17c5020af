//! Interactive line-of-sight tool
//!
//! Drives [`sightline_core`] from pointer gestures: pins the endpoints,
//! casts to the destination cell and keeps indicator items in the host's
//! item stores in step with the drag.

pub mod cancel;
pub mod cast;
pub mod control_items;
pub mod drag;
pub mod error;
pub mod host;
pub mod memory;
pub mod mode_state;
pub mod pin;
pub mod scene_feed;
pub mod settings;

pub use cast::{CastResult, LineResult, cast_to_cell};
pub use control_items::ControlItems;
pub use drag::{DragTool, PointerEvent};
pub use error::{DragError, DragResult, HostError, HostResult};
pub use host::{Host, Interaction, ItemApi, StoreKind};
pub use memory::{MemoryHost, MemoryInteraction, MemoryItemStore};
pub use mode_state::{ModeKind, ModeState};
pub use pin::Pin;
pub use scene_feed::follow_scene;
pub use settings::{MeasureTo, SettingsManager, SharedSettings, SnapOrigin, ToolSettings};
