//! Line-of-sight and partial cover reasoning for grid-based scenes.
//!
//! This crate is the synchronous half of the system:
//! - Scene item model ([`types`])
//! - Classification of items as walls, cover candidates and obstructions ([`obstruction`])
//! - World-space geometry extraction ([`geometry`])
//! - Grid cell corner math ([`grid`])
//! - Single-edge raycasts and viewport visibility polygons ([`raycast`])
//! - Room-level configuration ([`room`])
//! - The derived state cache consumed by the raycaster ([`cache`])

pub mod cache;
pub mod geometry;
pub mod grid;
pub mod obstruction;
pub mod raycast;
pub mod room;
pub mod types;

pub use cache::{
    CacheReport, CharacterShape, CharacterShapes, CoverEntry, DerivedWalls, PartialCover,
    SceneCache, SceneSnapshot,
};
pub use geometry::{CircleTransform, GeometryError, GeometryResult, RaycastGeometry};
pub use grid::{GridInfo, GridType};
pub use obstruction::{Candidate, Obstruction};
pub use raycast::{EdgeResult, VisibilityLayer};
pub use room::{CornerCountConfig, RoomMetadata};
pub use types::*;
