//! Grid cell geometry

use std::f64::consts::PI;

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::geometry::hexagon_points;

/// Grid layout of the scene
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GridType {
    #[default]
    Square,
    HexVertical,
    HexHorizontal,
    Isometric,
    Dimetric,
}

/// Active grid of the scene
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridInfo {
    pub grid_type: GridType,
    /// World units per cell
    pub dpi: f64,
}

impl Default for GridInfo {
    fn default() -> Self {
        Self {
            grid_type: GridType::Square,
            dpi: 150.0,
        }
    }
}

impl GridInfo {
    pub fn new(grid_type: GridType, dpi: f64) -> Self {
        Self { grid_type, dpi }
    }

    pub fn is_hex(&self) -> bool {
        matches!(self.grid_type, GridType::HexVertical | GridType::HexHorizontal)
    }

    /// Number of corners of one cell
    pub fn corner_count(&self) -> usize {
        if self.is_hex() { 6 } else { 4 }
    }

    /// Corners of the cell centered at `center`, as an open list
    pub fn corners(&self, center: DVec2) -> Vec<DVec2> {
        grid_corners(center, self)
    }
}

/// Corners of the cell centered at `center`
pub fn grid_corners(center: DVec2, grid: &GridInfo) -> Vec<DVec2> {
    let half = grid.dpi / 2.0;
    let offsets = match grid.grid_type {
        GridType::Square => vec![
            DVec2::new(-half, -half),
            DVec2::new(half, -half),
            DVec2::new(half, half),
            DVec2::new(-half, half),
        ],
        GridType::Isometric | GridType::Dimetric => {
            let x = if grid.grid_type == GridType::Isometric {
                half * 3f64.sqrt()
            } else {
                half * 2.0
            };
            vec![
                DVec2::new(0.0, -half),
                DVec2::new(x, 0.0),
                DVec2::new(0.0, half),
                DVec2::new(-x, 0.0),
            ]
        }
        GridType::HexVertical | GridType::HexHorizontal => {
            let offset = if grid.grid_type == GridType::HexHorizontal {
                0.0
            } else {
                PI / 6.0
            };
            hexagon_points(grid.dpi / 3f64.sqrt(), offset)
        }
    };
    offsets.into_iter().map(|o| center + o).collect()
}
