//! Single-edge raycasts

use glam::DVec2;

use super::intersect::{Segment, geometry_intersections, ring_segments, segment_intersection};
use crate::cache::SceneSnapshot;
use crate::obstruction::SOLIDITY_NO_COVER;
use crate::types::ItemId;

/// Intersections this close to either endpoint are ignored for cover
pub const ENDPOINT_EPSILON: f64 = 1e-6;

/// Outcome of a single raycast
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EdgeResult {
    /// Stopped by a wall at this point, nearest to the start
    Blocked(DVec2),
    /// Passed all walls, crossing cover of this solidity
    Solidity(f64),
}

impl EdgeResult {
    pub fn is_blocked(&self) -> bool {
        matches!(self, EdgeResult::Blocked(_))
    }

    /// Solidity if the ray was not stopped by a wall
    pub fn solidity(&self) -> Option<f64> {
        match self {
            EdgeResult::Blocked(_) => None,
            EdgeResult::Solidity(s) => Some(*s),
        }
    }
}

/// Nearest wall hit to `ray.a`
fn nearest_wall_hit(scene: &SceneSnapshot, ray: Segment) -> Option<DVec2> {
    ring_segments(&scene.walls.rings)
        .filter_map(|wall| segment_intersection(ray, wall))
        .min_by(|a, b| {
            a.distance_squared(ray.a)
                .total_cmp(&b.distance_squared(ray.a))
        })
}

/// Whether any hit lies away from the ray's endpoints
fn crosses_interior(ray: Segment, hits: impl IntoIterator<Item = DVec2>) -> bool {
    hits.into_iter().any(|hit| {
        hit.distance(ray.a) > ENDPOINT_EPSILON && hit.distance(ray.b) > ENDPOINT_EPSILON
    })
}

/// Cast a ray from `start` to `end`
///
/// Walls short-circuit with the nearest hit. Otherwise the result is the
/// largest solidity among crossed cover and tokens, skipping anything owned
/// by the origin or destination.
pub fn raycast_edge(
    scene: &SceneSnapshot,
    start: DVec2,
    end: DVec2,
    origin_id: Option<ItemId>,
    destination_id: Option<ItemId>,
) -> EdgeResult {
    let ray = Segment::new(start, end);

    if let Some(hit) = nearest_wall_hit(scene, ray) {
        return EdgeResult::Blocked(hit);
    }

    let skip = |id: &ItemId| Some(*id) == origin_id || Some(*id) == destination_id;

    let mut solidity = SOLIDITY_NO_COVER;
    for (id, entry) in scene.partial_cover.iter() {
        if skip(id) || entry.solidity <= solidity {
            continue;
        }
        if crosses_interior(ray, geometry_intersections(ray, &entry.geometry)) {
            solidity = entry.solidity;
        }
    }

    let character_solidity = scene.room.character_solidity;
    if character_solidity > solidity {
        let blocked_by_token = scene.characters.shapes.iter().any(|shape| {
            !skip(&shape.id)
                && crosses_interior(
                    ray,
                    ring_segments(std::slice::from_ref(&shape.ring))
                        .filter_map(|s| segment_intersection(ray, s)),
                )
        });
        if blocked_by_token {
            solidity = character_solidity;
        }
    }

    EdgeResult::Solidity(solidity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CharacterShape, CharacterShapes, CoverEntry, DerivedWalls, PartialCover};
    use crate::geometry::{RaycastGeometry, extract_world_geometry};
    use crate::room::RoomMetadata;
    use crate::types::{Bounds, Item, ShapeType};
    use std::sync::Arc;
    use uuid::Uuid;

    fn square_above_origin() -> Vec<DVec2> {
        vec![
            DVec2::new(0.0, -150.0),
            DVec2::new(150.0, -150.0),
            DVec2::new(150.0, 0.0),
            DVec2::new(0.0, 0.0),
            DVec2::new(0.0, -150.0),
        ]
    }

    fn scene_with_cover(entries: Vec<(ItemId, CoverEntry)>) -> SceneSnapshot {
        let cover: PartialCover = entries.into_iter().collect();
        SceneSnapshot {
            partial_cover: Arc::new(cover),
            ..Default::default()
        }
    }

    fn square_scene(id: ItemId) -> SceneSnapshot {
        scene_with_cover(vec![(
            id,
            CoverEntry::new(0.5, RaycastGeometry::Rings(vec![square_above_origin()])),
        )])
    }

    fn circle_scene(item: Item) -> SceneSnapshot {
        let geometry = extract_world_geometry(&item).unwrap();
        scene_with_cover(vec![(item.id, CoverEntry::new(0.5, geometry))])
    }

    fn p(x: f64, y: f64) -> DVec2 {
        DVec2::new(x, y)
    }

    #[test]
    fn test_cover_crossing() {
        let scene = square_scene(Uuid::new_v4());
        let result = raycast_edge(&scene, p(-10.0, -75.0), p(200.0, -75.0), None, None);
        assert_eq!(result, EdgeResult::Solidity(0.5));
    }

    #[test]
    fn test_no_self_interference() {
        let id = Uuid::new_v4();
        let scene = square_scene(id);
        let result = raycast_edge(&scene, p(75.0, 75.0), p(200.0, 75.0), Some(id), None);
        assert_eq!(result, EdgeResult::Solidity(SOLIDITY_NO_COVER));

        let through = raycast_edge(&scene, p(75.0, -75.0), p(200.0, -75.0), Some(id), None);
        assert_eq!(through, EdgeResult::Solidity(SOLIDITY_NO_COVER));
    }

    #[test]
    fn test_destination_does_not_interfere() {
        let id = Uuid::new_v4();
        let scene = square_scene(id);
        let result = raycast_edge(&scene, p(-75.0, -75.0), p(75.0, -75.0), None, Some(id));
        assert_eq!(result, EdgeResult::Solidity(SOLIDITY_NO_COVER));
    }

    #[test]
    fn test_endpoint_adjacent_cover_is_ignored() {
        let scene = square_scene(Uuid::new_v4());
        let cases = [
            (p(0.0, 0.0), p(-10.0, 0.0)),
            (p(-75.0, -75.0), p(0.0, 0.0)),
            (p(0.0, 0.0), p(150.0, -150.0)),
        ];
        for (start, end) in cases {
            assert_eq!(
                raycast_edge(&scene, start, end, None, None),
                EdgeResult::Solidity(SOLIDITY_NO_COVER)
            );
        }
    }

    #[test]
    fn test_walls_block_before_end() {
        let scene = SceneSnapshot {
            walls: Arc::new(DerivedWalls::from_rings(vec![vec![
                p(0.0, 0.0),
                p(0.0, -300.0),
                p(300.0, -300.0),
                p(300.0, 0.0),
                p(0.0, 0.0),
            ]])),
            ..Default::default()
        };
        let start = p(-75.0, -225.0);
        for end in [
            p(150.0, -300.0),
            p(300.0, -300.0),
            p(300.0, -150.0),
            p(150.0, -150.0),
        ] {
            let EdgeResult::Blocked(hit) = raycast_edge(&scene, start, end, None, None) else {
                panic!("expected wall hit");
            };
            assert_ne!(hit, end);
            assert!(hit.x.abs() < 1e-9 || hit.y == -300.0);
        }
    }

    #[test]
    fn test_circle_cover() {
        let circle = Item::shape(ShapeType::Circle, 10.0, 10.0);
        let scene = circle_scene(circle);
        let result = raycast_edge(&scene, p(-20.0, 0.0), p(0.0, 0.0), None, None);
        assert_eq!(result, EdgeResult::Solidity(0.5));
    }

    #[test]
    fn test_ray_passes_over_ovals() {
        let scaled = Item::shape(ShapeType::Circle, 10.0, 10.0).with_scale(p(2.0, 1.0));
        let wide = Item::shape(ShapeType::Circle, 20.0, 10.0);
        for item in [scaled, wide] {
            let scene = circle_scene(item);
            assert_eq!(
                raycast_edge(&scene, p(-20.0, -7.0), p(20.0, -7.0), None, None),
                EdgeResult::Solidity(SOLIDITY_NO_COVER)
            );
            assert_eq!(
                raycast_edge(&scene, p(-20.0, -4.0), p(20.0, -4.0), None, None),
                EdgeResult::Solidity(0.5)
            );
        }
    }

    #[test]
    fn test_most_solid_wins() {
        let line = |x: f64, solidity: f64| {
            (
                Uuid::new_v4(),
                CoverEntry::new(
                    solidity,
                    RaycastGeometry::Rings(vec![vec![p(x, -10.0), p(x, 10.0)]]),
                ),
            )
        };
        let scene = scene_with_cover(vec![line(5.0, 0.2), line(10.0, 0.9)]);
        assert_eq!(
            raycast_edge(&scene, p(0.0, 0.0), p(20.0, 0.0), None, None),
            EdgeResult::Solidity(0.9)
        );

        let scene = scene_with_cover(vec![line(5.0, 0.3), line(5.0, 0.7)]);
        assert_eq!(
            raycast_edge(&scene, p(0.0, 0.0), p(20.0, 0.0), None, None),
            EdgeResult::Solidity(0.7)
        );
    }

    #[test]
    fn test_characters_as_cover() {
        let id = Uuid::new_v4();
        let ring = square_above_origin();
        let shape = CharacterShape {
            id,
            position: p(75.0, -75.0),
            bounds: Bounds::from_points(&ring).unwrap(),
            ring,
        };
        let mut room = RoomMetadata::default();
        room.character_solidity = 0.12345;
        let scene = SceneSnapshot {
            characters: Arc::new(CharacterShapes::from_shapes(vec![shape])),
            room: Arc::new(room),
            ..Default::default()
        };

        let (start, end) = (p(-10.0, -10.0), p(10.0, -10.0));
        assert_eq!(
            raycast_edge(&scene, start, end, None, None),
            EdgeResult::Solidity(0.12345)
        );
        assert_eq!(
            raycast_edge(&scene, start, end, None, Some(id)),
            EdgeResult::Solidity(SOLIDITY_NO_COVER)
        );
    }
}
