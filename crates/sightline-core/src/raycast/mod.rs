//! Raycast Engine
//!
//! Two queries over a [`SceneSnapshot`](crate::cache::SceneSnapshot):
//! - [`raycast_edge`]: one segment against walls, cover and tokens
//! - [`compute_visibility`]: per-solidity visibility polygons inside a viewport

mod edge;
mod intersect;
mod visibility;

pub use edge::*;
pub use intersect::*;
pub use visibility::*;
