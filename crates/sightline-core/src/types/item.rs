//! Scene Items
//!
//! The host scene is a flat list of items. Each item carries a transform
//! (position, rotation in degrees, scale), bookkeeping fields and a
//! kind-specific payload.

use glam::{DAffine2, DVec2};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Identifier of a scene item
pub type ItemId = Uuid;

/// Free-form item or room metadata, keyed by namespaced strings
pub type Metadata = Map<String, Value>;

/// Rendering layer an item lives on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Layer {
    Map,
    #[default]
    Drawing,
    Prop,
    Mount,
    Character,
    Attachment,
    Text,
    Ruler,
    Pointer,
    Control,
}

/// Basic shape variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShapeType {
    Rectangle,
    Circle,
    Triangle,
    Hexagon,
}

/// A single drawing command of a path item
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PathCommand {
    Move(DVec2),
    Line(DVec2),
    Quad {
        control: DVec2,
        to: DVec2,
    },
    Cubic {
        control1: DVec2,
        control2: DVec2,
        to: DVec2,
    },
    Close,
}

/// Stroke and fill styling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Style {
    pub stroke_color: String,
    pub stroke_opacity: f64,
    pub stroke_width: f64,
    pub stroke_dash: Vec<f64>,
    pub fill_color: String,
    pub fill_opacity: f64,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            stroke_color: "#ffffff".to_string(),
            stroke_opacity: 1.0,
            stroke_width: 5.0,
            stroke_dash: Vec::new(),
            fill_color: "#000000".to_string(),
            fill_opacity: 0.0,
        }
    }
}

/// Image pixel data reference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageContent {
    pub width: f64,
    pub height: f64,
    pub url: String,
}

/// How an image maps onto the scene grid
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImageGrid {
    /// Pixels per grid cell in image space
    pub dpi: f64,
    /// Image-space anchor point that sits at the item position
    pub offset: DVec2,
}

/// Kind-specific item payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ItemKind {
    /// Polyline or polygon through local points
    Curve {
        points: Vec<DVec2>,
        /// Zero for straight segments, anything else is a smoothed spline
        tension: f64,
        closed: bool,
        style: Style,
    },
    /// Single straight segment
    Line {
        start: DVec2,
        end: DVec2,
        style: Style,
    },
    /// Parametric shape anchored at the item origin
    Shape {
        shape_type: ShapeType,
        width: f64,
        height: f64,
        style: Style,
    },
    /// Vector path made of drawing commands
    Path {
        commands: Vec<PathCommand>,
        style: Style,
    },
    /// Raster image (tokens, maps, icons)
    Image {
        content: ImageContent,
        grid: ImageGrid,
    },
    /// Text label
    Label { text: String },
    /// Fog-layer wall polyline in local coordinates
    Wall { points: Vec<DVec2> },
}

impl ItemKind {
    /// Get a short name for this kind
    pub fn type_name(&self) -> &'static str {
        match self {
            ItemKind::Curve { .. } => "Curve",
            ItemKind::Line { .. } => "Line",
            ItemKind::Shape { .. } => "Shape",
            ItemKind::Path { .. } => "Path",
            ItemKind::Image { .. } => "Image",
            ItemKind::Label { .. } => "Label",
            ItemKind::Wall { .. } => "Wall",
        }
    }
}

/// A scene item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    pub layer: Layer,
    pub position: DVec2,
    /// Rotation in degrees
    pub rotation: f64,
    pub scale: DVec2,
    /// Monotonic modification stamp assigned by the host
    pub last_modified: u64,
    pub visible: bool,
    pub locked: bool,
    pub disable_hit: bool,
    pub attached_to: Option<ItemId>,
    pub metadata: Metadata,
    pub kind: ItemKind,
}

impl Item {
    /// Create an item with an identity transform and a fresh id
    pub fn new(kind: ItemKind) -> Self {
        let layer = match &kind {
            ItemKind::Wall { .. } => Layer::Map,
            ItemKind::Label { .. } => Layer::Text,
            ItemKind::Image { .. } => Layer::Character,
            _ => Layer::Drawing,
        };
        Self {
            id: Uuid::new_v4(),
            name: String::new(),
            layer,
            position: DVec2::ZERO,
            rotation: 0.0,
            scale: DVec2::ONE,
            last_modified: 0,
            visible: true,
            locked: false,
            disable_hit: false,
            attached_to: None,
            metadata: Metadata::new(),
            kind,
        }
    }

    /// Straight-segment polyline
    pub fn curve(points: Vec<DVec2>, closed: bool) -> Self {
        Self::new(ItemKind::Curve {
            points,
            tension: 0.0,
            closed,
            style: Style::default(),
        })
    }

    pub fn line(start: DVec2, end: DVec2) -> Self {
        Self::new(ItemKind::Line {
            start,
            end,
            style: Style::default(),
        })
    }

    pub fn shape(shape_type: ShapeType, width: f64, height: f64) -> Self {
        Self::new(ItemKind::Shape {
            shape_type,
            width,
            height,
            style: Style::default(),
        })
    }

    pub fn path(commands: Vec<PathCommand>) -> Self {
        Self::new(ItemKind::Path {
            commands,
            style: Style::default(),
        })
    }

    pub fn image(content: ImageContent, grid: ImageGrid) -> Self {
        Self::new(ItemKind::Image { content, grid })
    }

    pub fn label(text: impl Into<String>) -> Self {
        Self::new(ItemKind::Label { text: text.into() })
    }

    pub fn wall(points: Vec<DVec2>) -> Self {
        Self::new(ItemKind::Wall { points })
    }

    pub fn with_id(mut self, id: ItemId) -> Self {
        self.id = id;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_layer(mut self, layer: Layer) -> Self {
        self.layer = layer;
        self
    }

    pub fn with_position(mut self, position: DVec2) -> Self {
        self.position = position;
        self
    }

    pub fn with_rotation(mut self, degrees: f64) -> Self {
        self.rotation = degrees;
        self
    }

    pub fn with_scale(mut self, scale: DVec2) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_last_modified(mut self, stamp: u64) -> Self {
        self.last_modified = stamp;
        self
    }

    pub fn attached_to(mut self, parent: ItemId) -> Self {
        self.attached_to = Some(parent);
        self
    }

    pub fn with_metadata(mut self, key: &str, value: Value) -> Self {
        self.metadata.insert(key.to_string(), value);
        self
    }

    /// Local-to-world transform: translate, then rotate, then scale
    pub fn world_transform(&self) -> DAffine2 {
        DAffine2::from_scale_angle_translation(
            self.scale,
            self.rotation.to_radians(),
            self.position,
        )
    }

    /// Whether this item is a character token
    pub fn is_token(&self) -> bool {
        self.layer == Layer::Character && matches!(self.kind, ItemKind::Image { .. })
    }

    /// Style of drawable kinds
    pub fn style(&self) -> Option<&Style> {
        match &self.kind {
            ItemKind::Curve { style, .. }
            | ItemKind::Line { style, .. }
            | ItemKind::Shape { style, .. }
            | ItemKind::Path { style, .. } => Some(style),
            _ => None,
        }
    }

    pub fn style_mut(&mut self) -> Option<&mut Style> {
        match &mut self.kind {
            ItemKind::Curve { style, .. }
            | ItemKind::Line { style, .. }
            | ItemKind::Shape { style, .. }
            | ItemKind::Path { style, .. } => Some(style),
            _ => None,
        }
    }
}
