//! Geometry Extraction
//!
//! Converts items into world-space rings or exact circle descriptors for the
//! raycast engine.

mod path;

pub use path::*;

use std::f64::consts::PI;

use glam::{DAffine2, DMat3, DVec2};
use thiserror::Error;

use crate::types::{Item, ItemId, ItemKind, ShapeType};

/// Determinant below which a circle transform is treated as collapsed
const SINGULAR_EPSILON: f64 = 1e-12;

/// Geometry extraction errors
#[derive(Debug, Clone, Error, PartialEq)]
pub enum GeometryError {
    #[error("Wall {id} has {points} point(s), need at least 2")]
    DegenerateWall { id: ItemId, points: usize },

    #[error("Shape {id} has {points} point(s), need at least 2")]
    DegenerateShape { id: ItemId, points: usize },

    #[error("Item {id} of kind {kind} has no raycast geometry")]
    UnsupportedItem { id: ItemId, kind: &'static str },
}

pub type GeometryResult<T> = Result<T, GeometryError>;

/// Maps the unit circle onto an ellipse in world space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircleTransform {
    transform: DAffine2,
    inverse: DAffine2,
}

impl CircleTransform {
    /// Returns `None` when the transform cannot be inverted
    pub fn new(transform: DAffine2) -> Option<Self> {
        let det = transform.matrix2.determinant();
        if !det.is_finite() || det.abs() < SINGULAR_EPSILON {
            return None;
        }
        Some(Self {
            transform,
            inverse: transform.inverse(),
        })
    }

    /// Circle shape item: position, rotation and scale by half extents
    pub fn from_item(item: &Item, width: f64, height: f64) -> Option<Self> {
        let half = DAffine2::from_scale(DVec2::new(width / 2.0, height / 2.0));
        Self::new(item.world_transform() * half)
    }

    pub fn transform(&self) -> DAffine2 {
        self.transform
    }

    pub fn inverse(&self) -> DAffine2 {
        self.inverse
    }

    /// Homogeneous 3x3 form of the transform
    pub fn matrix(&self) -> DMat3 {
        DMat3::from(self.transform)
    }

    pub fn center(&self) -> DVec2 {
        self.transform.translation
    }

    pub fn to_local(&self, point: DVec2) -> DVec2 {
        self.inverse.transform_point2(point)
    }

    pub fn to_world(&self, point: DVec2) -> DVec2 {
        self.transform.transform_point2(point)
    }

    /// Inclusive point-in-ellipse test
    pub fn contains(&self, point: DVec2) -> bool {
        self.to_local(point).length_squared() <= 1.0
    }

    /// Closed N-gon approximation in world space
    pub fn tessellate(&self, segments: usize) -> Vec<DVec2> {
        let segments = segments.max(3);
        let mut ring: Vec<DVec2> = (0..segments)
            .map(|i| {
                let angle = 2.0 * PI * i as f64 / segments as f64;
                self.to_world(DVec2::new(angle.cos(), angle.sin()))
            })
            .collect();
        close_ring(&mut ring);
        ring
    }
}

/// World-space raycast geometry of one item
#[derive(Debug, Clone, PartialEq)]
pub enum RaycastGeometry {
    /// Polylines or closed polygons
    Rings(Vec<Vec<DVec2>>),
    /// Exact ellipse
    Circle(CircleTransform),
}

impl RaycastGeometry {
    /// Geometry that intersects nothing
    pub fn empty() -> Self {
        RaycastGeometry::Rings(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, RaycastGeometry::Rings(rings) if rings.is_empty())
    }

    /// Rings with circles approximated by `circle_segments`-gons
    pub fn to_rings(&self, circle_segments: usize) -> Vec<Vec<DVec2>> {
        match self {
            RaycastGeometry::Rings(rings) => rings.clone(),
            RaycastGeometry::Circle(circle) => vec![circle.tessellate(circle_segments)],
        }
    }
}

/// Append the first point if the ring is not already closed
pub fn close_ring(points: &mut Vec<DVec2>) {
    if let (Some(first), Some(last)) = (points.first().copied(), points.last())
        && first != *last
    {
        points.push(first);
    }
}

/// Regular hexagon around the origin
pub fn hexagon_points(radius: f64, angle_offset: f64) -> Vec<DVec2> {
    (0..6)
        .map(|i| {
            let angle = angle_offset + i as f64 * PI / 3.0;
            DVec2::new(radius * angle.cos(), radius * angle.sin())
        })
        .collect()
}

/// Local corner points of a non-circular shape, `None` for circles
pub fn shape_local_points(shape_type: ShapeType, width: f64, height: f64) -> Option<Vec<DVec2>> {
    match shape_type {
        ShapeType::Rectangle => Some(vec![
            DVec2::ZERO,
            DVec2::new(width, 0.0),
            DVec2::new(width, height),
            DVec2::new(0.0, height),
        ]),
        ShapeType::Triangle => Some(vec![
            DVec2::ZERO,
            DVec2::new(-height / 2.0, height),
            DVec2::new(height / 2.0, height),
        ]),
        ShapeType::Hexagon => Some(hexagon_points(width.max(height) / 2.0, PI / 6.0)),
        ShapeType::Circle => None,
    }
}

fn to_world(transform: DAffine2, points: &[DVec2]) -> Vec<DVec2> {
    points.iter().map(|p| transform.transform_point2(*p)).collect()
}

/// World points of a wall, rejecting walls with fewer than 2 points
pub fn wall_world_points(item: &Item) -> GeometryResult<Vec<DVec2>> {
    let ItemKind::Wall { points } = &item.kind else {
        return Err(GeometryError::UnsupportedItem {
            id: item.id,
            kind: item.kind.type_name(),
        });
    };
    if points.len() < 2 {
        return Err(GeometryError::DegenerateWall {
            id: item.id,
            points: points.len(),
        });
    }
    Ok(to_world(item.world_transform(), points))
}

/// Extract the world-space raycast geometry of a cover item
pub fn extract_world_geometry(item: &Item) -> GeometryResult<RaycastGeometry> {
    let transform = item.world_transform();
    let degenerate = |points: usize| GeometryError::DegenerateShape {
        id: item.id,
        points,
    };

    match &item.kind {
        ItemKind::Curve {
            points, tension, ..
        } if *tension == 0.0 => {
            if points.len() < 2 {
                return Err(degenerate(points.len()));
            }
            let mut ring = to_world(transform, points);
            close_ring(&mut ring);
            Ok(RaycastGeometry::Rings(vec![ring]))
        }
        ItemKind::Line { start, end, .. } => Ok(RaycastGeometry::Rings(vec![vec![
            transform.transform_point2(*start),
            transform.transform_point2(*end),
        ]])),
        ItemKind::Shape {
            shape_type,
            width,
            height,
            ..
        } => match shape_local_points(*shape_type, *width, *height) {
            Some(points) => {
                let mut ring = to_world(transform, &points);
                close_ring(&mut ring);
                Ok(RaycastGeometry::Rings(vec![ring]))
            }
            None => Ok(CircleTransform::from_item(item, *width, *height)
                .map(RaycastGeometry::Circle)
                .unwrap_or_else(RaycastGeometry::empty)),
        },
        ItemKind::Path { commands, .. } => {
            let rings: Vec<Vec<DVec2>> = flatten_path(commands)
                .into_iter()
                .map(|sub| simplify(&sub, PATH_SIMPLIFY_TOLERANCE))
                .filter(|sub| sub.len() >= 2)
                .map(|sub| {
                    let mut ring = to_world(transform, &sub);
                    close_ring(&mut ring);
                    ring
                })
                .collect();
            if rings.is_empty() {
                return Err(degenerate(0));
            }
            Ok(RaycastGeometry::Rings(rings))
        }
        kind => Err(GeometryError::UnsupportedItem {
            id: item.id,
            kind: kind.type_name(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PathCommand;
    use approx::assert_relative_eq;

    #[test]
    fn test_rectangle_polygon_closes() {
        let item = Item::curve(
            vec![
                DVec2::ZERO,
                DVec2::new(10.0, 0.0),
                DVec2::new(10.0, 5.0),
                DVec2::new(0.0, 5.0),
            ],
            true,
        )
        .with_position(DVec2::new(100.0, 100.0));

        let RaycastGeometry::Rings(rings) = extract_world_geometry(&item).unwrap() else {
            panic!("expected rings");
        };
        assert_eq!(rings.len(), 1);
        assert_eq!(rings[0].len(), 5);
        assert_eq!(rings[0][0], rings[0][4]);
        assert_eq!(rings[0][2], DVec2::new(110.0, 105.0));
    }

    #[test]
    fn test_line_is_two_points() {
        let item = Item::line(DVec2::ZERO, DVec2::new(0.0, 10.0)).with_rotation(90.0);
        let RaycastGeometry::Rings(rings) = extract_world_geometry(&item).unwrap() else {
            panic!("expected rings");
        };
        assert_eq!(rings[0].len(), 2);
        assert_relative_eq!(rings[0][1].x, -10.0, epsilon = 1e-9);
        assert_relative_eq!(rings[0][1].y, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_shape_points() {
        let hex = shape_local_points(ShapeType::Hexagon, 20.0, 10.0).unwrap();
        assert_eq!(hex.len(), 6);
        for p in &hex {
            assert_relative_eq!(p.length(), 10.0, epsilon = 1e-9);
        }
        assert_relative_eq!(hex[0].y, 5.0, epsilon = 1e-9);

        let tri = shape_local_points(ShapeType::Triangle, 99.0, 10.0).unwrap();
        assert_eq!(tri, vec![DVec2::ZERO, DVec2::new(-5.0, 10.0), DVec2::new(5.0, 10.0)]);

        assert!(shape_local_points(ShapeType::Circle, 1.0, 1.0).is_none());
    }

    #[test]
    fn test_circle_descriptor() {
        let item = Item::shape(ShapeType::Circle, 20.0, 10.0).with_position(DVec2::new(5.0, 5.0));
        let RaycastGeometry::Circle(circle) = extract_world_geometry(&item).unwrap() else {
            panic!("expected circle");
        };
        assert_eq!(circle.center(), DVec2::new(5.0, 5.0));
        assert!(circle.contains(DVec2::new(14.9, 5.0)));
        assert!(!circle.contains(DVec2::new(5.0, 10.1)));

        let local = circle.to_local(DVec2::new(15.0, 5.0));
        assert_relative_eq!(local.x, 1.0, epsilon = 1e-9);

        let ring = circle.tessellate(10);
        assert_eq!(ring.len(), 11);
        assert_eq!(ring[0], ring[10]);
    }

    #[test]
    fn test_collapsed_circle_is_skipped() {
        let item = Item::shape(ShapeType::Circle, 20.0, 20.0).with_scale(DVec2::new(0.0, 1.0));
        assert!(extract_world_geometry(&item).unwrap().is_empty());
    }

    #[test]
    fn test_path_subrings_close_in_world_space() {
        let item = Item::path(vec![
            PathCommand::Move(DVec2::new(0.0, 0.0)),
            PathCommand::Line(DVec2::new(100.0, 0.0)),
            PathCommand::Line(DVec2::new(100.0, 100.0)),
            PathCommand::Close,
            PathCommand::Move(DVec2::new(200.0, 0.0)),
            // Within tolerance locally, outside it once scaled
            PathCommand::Line(DVec2::new(250.0, 3.0)),
            PathCommand::Line(DVec2::new(300.0, 0.0)),
            PathCommand::Line(DVec2::new(300.0, 100.0)),
        ])
        .with_position(DVec2::new(1000.0, 500.0))
        .with_scale(DVec2::splat(2.0));

        let RaycastGeometry::Rings(rings) = extract_world_geometry(&item).unwrap() else {
            panic!("expected rings");
        };
        assert_eq!(rings.len(), 2);
        assert_eq!(
            rings[0],
            vec![
                DVec2::new(1000.0, 500.0),
                DVec2::new(1200.0, 500.0),
                DVec2::new(1200.0, 700.0),
                DVec2::new(1000.0, 500.0),
            ]
        );
        assert_eq!(
            rings[1],
            vec![
                DVec2::new(1400.0, 500.0),
                DVec2::new(1600.0, 500.0),
                DVec2::new(1600.0, 700.0),
                DVec2::new(1400.0, 500.0),
            ]
        );

        let stray = Item::path(vec![
            PathCommand::Move(DVec2::ZERO),
            PathCommand::Move(DVec2::ONE),
        ]);
        assert!(matches!(
            extract_world_geometry(&stray),
            Err(GeometryError::DegenerateShape { points: 0, .. })
        ));
    }

    #[test]
    fn test_degenerate_inputs() {
        let curve = Item::curve(vec![DVec2::ZERO], false);
        assert!(matches!(
            extract_world_geometry(&curve),
            Err(GeometryError::DegenerateShape { points: 1, .. })
        ));

        let wall = Item::wall(vec![DVec2::ZERO]);
        assert!(matches!(
            wall_world_points(&wall),
            Err(GeometryError::DegenerateWall { points: 1, .. })
        ));

        assert!(matches!(
            extract_world_geometry(&Item::label("x")),
            Err(GeometryError::UnsupportedItem { kind: "Label", .. })
        ));
    }
}
