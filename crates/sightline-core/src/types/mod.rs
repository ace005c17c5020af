//! Core type definitions

mod bounds;
mod item;

pub use bounds::*;
pub use item::*;
