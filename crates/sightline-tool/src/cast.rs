//! Casting sight lines from an origin to a destination cell

use glam::DVec2;
use sightline_core::obstruction::SOLIDITY_FULL_COVER;
use sightline_core::raycast::{EdgeResult, raycast_edge};
use sightline_core::room::partial_cover_color;
use sightline_core::{ItemId, SceneSnapshot};

use crate::settings::MeasureTo;

/// Color of lines stopped by a wall
pub const BLOCKED_LINE_COLOR: &str = "#ff0000";

/// One cast line
#[derive(Debug, Clone, PartialEq)]
pub struct LineResult {
    /// Target, or the wall hit if the line was blocked
    pub end_position: DVec2,
    pub color: String,
    /// Not stopped by a wall and not behind full cover
    pub clear: bool,
}

/// Everything the indicator items display
#[derive(Debug, Clone, PartialEq)]
pub struct CastResult {
    pub start_position: DVec2,
    pub end_center: DVec2,
    pub label_text: String,
    pub highlight_color: String,
    pub lines: Vec<LineResult>,
}

impl CastResult {
    pub fn clear_count(&self) -> usize {
        self.lines.iter().filter(|l| l.clear).count()
    }
}

/// Points the lines are cast to
pub fn cast_targets(scene: &SceneSnapshot, end_center: DVec2, measure_to: MeasureTo) -> Vec<DVec2> {
    match measure_to {
        MeasureTo::Corners => scene.grid.corners(end_center),
        MeasureTo::Center => vec![end_center],
    }
}

fn cast_line(
    scene: &SceneSnapshot,
    start: DVec2,
    target: DVec2,
    origin_id: Option<ItemId>,
    destination_id: Option<ItemId>,
) -> LineResult {
    match raycast_edge(scene, start, target, origin_id, destination_id) {
        EdgeResult::Blocked(hit) => LineResult {
            end_position: hit,
            color: BLOCKED_LINE_COLOR.to_string(),
            clear: false,
        },
        EdgeResult::Solidity(solidity) => LineResult {
            end_position: target,
            color: partial_cover_color(solidity),
            clear: solidity < SOLIDITY_FULL_COVER,
        },
    }
}

/// Cast from the best of `origins` to the destination cell
///
/// The origin with the most clear lines wins; ties keep the earliest.
pub fn cast_to_cell(
    scene: &SceneSnapshot,
    origins: &[DVec2],
    end_center: DVec2,
    measure_to: MeasureTo,
    origin_id: Option<ItemId>,
    destination_id: Option<ItemId>,
) -> CastResult {
    let targets = cast_targets(scene, end_center, measure_to);

    let mut best: Option<(DVec2, Vec<LineResult>)> = None;
    for &start in origins {
        let lines: Vec<LineResult> = targets
            .iter()
            .map(|t| cast_line(scene, start, *t, origin_id, destination_id))
            .collect();
        let clear = lines.iter().filter(|l| l.clear).count();
        let better = match &best {
            None => true,
            Some((_, current)) => clear > current.iter().filter(|l| l.clear).count(),
        };
        if better {
            best = Some((start, lines));
        }
    }
    let (start_position, lines) = best.unwrap_or((end_center, Vec::new()));

    let clear = lines.iter().filter(|l| l.clear).count();
    let index = if lines.len() == 1 {
        if clear == 1 { scene.grid.corner_count() } else { 0 }
    } else {
        clear
    };
    let config = scene.room.corner_config(index);

    CastResult {
        start_position,
        end_center,
        label_text: config.label.clone(),
        highlight_color: config.color.clone(),
        lines,
    }
}
