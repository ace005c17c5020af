//! Indicator items drawn for a sight line
//!
//! A label over the destination cell, a highlight tracing the cell and one
//! dashed line per cast. All of them carry the control flag so they are
//! never mistaken for cover.

use glam::DVec2;
use serde_json::Value;
use sightline_core::obstruction::METADATA_KEY_IS_CONTROL;
use sightline_core::{GridInfo, ImageContent, ImageGrid, Item, ItemId, ItemKind, Layer, Style};

use crate::cast::CastResult;

const ICON_SIZE: f64 = 150.0;
const ICON_URL: &str = "/assets/eye-target.svg";

/// Tag an item as a tool indicator
pub fn mark_control(item: Item) -> Item {
    item.with_metadata(METADATA_KEY_IS_CONTROL, Value::Bool(true))
}

fn indicator(item: Item, name: &str, layer: Layer) -> Item {
    let mut item = mark_control(item.with_name(name).with_layer(layer));
    item.locked = true;
    item.disable_hit = true;
    item
}

/// Marker image placed on a pinned token
pub fn make_icon(position: DVec2) -> Item {
    let content = ImageContent {
        width: ICON_SIZE,
        height: ICON_SIZE,
        url: ICON_URL.to_string(),
    };
    let grid = ImageGrid {
        dpi: ICON_SIZE,
        offset: DVec2::splat(ICON_SIZE / 2.0),
    };
    indicator(Item::image(content, grid), "Sightline Icon", Layer::Control)
        .with_position(position)
        .with_scale(DVec2::splat(0.6))
}

fn sight_line() -> Item {
    let mut line = indicator(
        Item::line(DVec2::ZERO, DVec2::ZERO),
        "Sightline Visibility Line",
        Layer::Ruler,
    );
    if let Some(style) = line.style_mut() {
        *style = Style {
            stroke_width: 10.0,
            stroke_opacity: 0.6,
            stroke_dash: vec![1.0, 30.0],
            ..Style::default()
        };
    }
    line
}

/// The indicator items of one sight line
#[derive(Debug, Clone, PartialEq)]
pub struct ControlItems {
    pub label: Item,
    pub highlight: Item,
    pub lines: Vec<Item>,
}

impl ControlItems {
    /// Blank indicator items with `line_count` lines
    pub fn new(line_count: usize) -> Self {
        let label = indicator(Item::label(""), "Sightline Cover Label", Layer::Control);

        let mut highlight = indicator(
            Item::curve(Vec::new(), true),
            "Sightline Cell Highlight",
            Layer::Pointer,
        );
        if let Some(style) = highlight.style_mut() {
            style.fill_opacity = 0.2;
            style.stroke_opacity = 1.0;
            style.stroke_width = 5.0;
        }

        let lines = (0..line_count).map(|_| sight_line()).collect();

        Self {
            label,
            highlight,
            lines,
        }
    }

    /// Indicator items showing `result`
    pub fn build(result: &CastResult, grid: &GridInfo) -> Self {
        let mut items = Self::new(result.lines.len());
        items.fix(result, grid);
        items
    }

    /// Point the items at a new cast
    ///
    /// Lines are added or dropped so there is exactly one per cast.
    pub fn fix(&mut self, result: &CastResult, grid: &GridInfo) {
        let text = &result.label_text;
        self.label.scale = if text.is_empty() { DVec2::ZERO } else { DVec2::ONE };
        self.label.position = result.end_center + DVec2::new(0.0, -grid.dpi / 2.0);
        if let ItemKind::Label { text: current } = &mut self.label.kind {
            current.clone_from(text);
        }

        self.highlight.position = result.end_center;
        if let ItemKind::Curve { points, style, .. } = &mut self.highlight.kind {
            *points = grid.corners(DVec2::ZERO);
            style.fill_color.clone_from(&result.highlight_color);
            style.stroke_color.clone_from(&result.highlight_color);
        }

        self.lines.truncate(result.lines.len());
        while self.lines.len() < result.lines.len() {
            self.lines.push(sight_line());
        }
        for (line, cast) in self.lines.iter_mut().zip(&result.lines) {
            if let ItemKind::Line { start, end, style } = &mut line.kind {
                *start = result.start_position;
                *end = cast.end_position;
                style.stroke_color.clone_from(&cast.color);
            }
        }
    }

    pub fn ids(&self) -> Vec<ItemId> {
        self.iter().map(|item| item.id).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Item> {
        [&self.label, &self.highlight].into_iter().chain(self.lines.iter())
    }

    pub fn into_items(self) -> Vec<Item> {
        let mut items = Vec::with_capacity(self.lines.len() + 2);
        items.push(self.label);
        items.push(self.highlight);
        items.extend(self.lines);
        items
    }

    /// Rebuild from a flat list in `[label, highlight, lines..]` order
    pub fn from_items(items: Vec<Item>) -> Option<Self> {
        let mut iter = items.into_iter();
        let label = iter.next()?;
        let highlight = iter.next()?;
        Some(Self {
            label,
            highlight,
            lines: iter.collect(),
        })
    }
}
