//! Viewport-clipped visibility polygons
//!
//! Obstacles are grouped into solidity tiers and each tier gets its own
//! rotational sweep: every unique segment endpoint spawns three rays (at its
//! angle and a hair to either side), each ray stops at the nearest segment,
//! and the hits sorted by angle form the polygon.

use std::collections::HashSet;

use glam::DVec2;
use tracing::debug;

use super::intersect::{Segment, line_params, ring_segments, segment_intersection};
use crate::cache::SceneSnapshot;
use crate::obstruction::{SOLIDITY_FULL_COVER, SOLIDITY_NO_COVER};
use crate::types::Bounds;

/// Sides used to approximate circular cover
pub const CIRCLE_SEGMENTS: usize = 10;

/// Angular offset of the side rays around each endpoint
const SWEEP_EPSILON: f64 = 1e-5;

/// Visible region for one solidity tier
#[derive(Debug, Clone, PartialEq)]
pub struct VisibilityLayer {
    pub solidity: f64,
    /// Closed polygon, empty when the viewpoint is outside the viewport
    pub polygon: Vec<DVec2>,
}

/// Visible regions from `viewpoint`, most solid tier first
pub fn compute_visibility(
    scene: &SceneSnapshot,
    viewpoint: DVec2,
    viewport: Bounds,
) -> Vec<VisibilityLayer> {
    let tiers = obstacle_tiers(scene);
    let inside = viewport.contains(viewpoint);
    debug!(
        "Computing visibility for {} tier(s) from ({}, {})",
        tiers.len(),
        viewpoint.x,
        viewpoint.y
    );

    tiers
        .into_iter()
        .map(|(solidity, segments)| VisibilityLayer {
            solidity,
            polygon: if inside {
                visibility_polygon(viewpoint, &segments, viewport)
            } else {
                Vec::new()
            },
        })
        .collect()
}

/// Segments of every blocking obstacle grouped by solidity, descending
pub fn obstacle_tiers(scene: &SceneSnapshot) -> Vec<(f64, Vec<Segment>)> {
    let mut tagged: Vec<(f64, Vec<Segment>)> = Vec::new();

    if !scene.walls.rings.is_empty() {
        tagged.push((SOLIDITY_FULL_COVER, ring_segments(&scene.walls.rings).collect()));
    }
    for entry in scene.partial_cover.values() {
        let rings = entry.geometry.to_rings(CIRCLE_SEGMENTS);
        tagged.push((entry.solidity, ring_segments(&rings).collect()));
    }
    if scene.room.characters_block() {
        for shape in &scene.characters.shapes {
            tagged.push((
                scene.room.character_solidity,
                ring_segments(std::slice::from_ref(&shape.ring)).collect(),
            ));
        }
    }

    tagged.retain(|(solidity, segments)| *solidity > SOLIDITY_NO_COVER && !segments.is_empty());
    tagged.sort_by(|a, b| b.0.total_cmp(&a.0));

    let mut tiers: Vec<(f64, Vec<Segment>)> = Vec::new();
    for (solidity, segments) in tagged {
        match tiers.last_mut() {
            Some((last, merged)) if *last == solidity => merged.extend(segments),
            _ => tiers.push((solidity, segments)),
        }
    }
    tiers
}

/// Liang-Barsky clip of a segment against a rectangle
pub fn clip_segment(segment: Segment, bounds: Bounds) -> Option<Segment> {
    let d = segment.direction();
    let (mut t0, mut t1) = (0.0_f64, 1.0_f64);
    let checks = [
        (-d.x, segment.a.x - bounds.min.x),
        (d.x, bounds.max.x - segment.a.x),
        (-d.y, segment.a.y - bounds.min.y),
        (d.y, bounds.max.y - segment.a.y),
    ];
    for (p, q) in checks {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            t0 = t0.max(r);
        } else {
            t1 = t1.min(r);
        }
        if t0 > t1 {
            return None;
        }
    }
    Some(Segment::new(segment.a + d * t0, segment.a + d * t1))
}

/// Split segments at every point where two of them cross
pub fn break_intersections(segments: &[Segment]) -> Vec<Segment> {
    let mut out = Vec::with_capacity(segments.len());
    for (i, segment) in segments.iter().enumerate() {
        let mut cuts: Vec<f64> = segments
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != i)
            .filter_map(|(_, other)| {
                segment_intersection(*segment, *other)?;
                let (t, _) = line_params(*segment, *other)?;
                (t > 0.0 && t < 1.0).then_some(t)
            })
            .collect();
        cuts.sort_by(f64::total_cmp);
        cuts.dedup();

        let mut from = segment.a;
        for t in cuts {
            let at = segment.a + segment.direction() * t;
            out.push(Segment::new(from, at));
            from = at;
        }
        out.push(Segment::new(from, segment.b));
    }
    out
}

/// Closed visibility polygon for one set of blocking segments
pub fn visibility_polygon(viewpoint: DVec2, segments: &[Segment], viewport: Bounds) -> Vec<DVec2> {
    let clipped: Vec<Segment> = segments
        .iter()
        .filter_map(|s| clip_segment(*s, viewport))
        .filter(|s| s.a != s.b)
        .collect();
    let mut all = break_intersections(&clipped);
    let [c0, c1, c2, c3] = viewport.corners();
    all.extend([
        Segment::new(c0, c1),
        Segment::new(c1, c2),
        Segment::new(c2, c3),
        Segment::new(c3, c0),
    ]);

    let mut seen = HashSet::new();
    let mut rays: Vec<(f64, DVec2)> = Vec::new();
    for endpoint in all.iter().flat_map(|s| [s.a, s.b]) {
        if !seen.insert((endpoint.x.to_bits(), endpoint.y.to_bits())) {
            continue;
        }
        let offset = endpoint - viewpoint;
        if offset.length_squared() == 0.0 {
            continue;
        }
        let angle = offset.y.atan2(offset.x);
        for a in [angle - SWEEP_EPSILON, angle, angle + SWEEP_EPSILON] {
            rays.push((a, DVec2::from_angle(a)));
        }
    }
    rays.sort_unstable_by(|a, b| a.0.total_cmp(&b.0));

    let mut polygon: Vec<DVec2> = Vec::with_capacity(rays.len() + 1);
    for (_, dir) in rays {
        if let Some(t) = nearest_hit(viewpoint, dir, &all) {
            let hit = viewpoint + dir * t;
            if polygon.last() != Some(&hit) {
                polygon.push(hit);
            }
        }
    }
    if let Some(first) = polygon.first().copied() {
        polygon.push(first);
    }
    polygon
}

/// Distance along `dir` to the closest segment
fn nearest_hit(origin: DVec2, dir: DVec2, segments: &[Segment]) -> Option<f64> {
    let mut min_t = f64::INFINITY;
    for segment in segments {
        let s = segment.direction();
        let denom = dir.perp_dot(s);
        if denom.abs() < 1e-12 {
            continue;
        }
        let d = segment.a - origin;
        let t = d.perp_dot(s) / denom;
        if t < 0.0 || t >= min_t {
            continue;
        }
        let u = d.perp_dot(dir) / denom;
        if (0.0..=1.0).contains(&u) {
            min_t = t;
        }
    }
    min_t.is_finite().then_some(min_t)
}

/// Shoelace area, positive regardless of winding
pub fn polygon_area(vertices: &[DVec2]) -> f64 {
    if vertices.len() < 3 {
        return 0.0;
    }
    let mut area = 0.0;
    for (i, a) in vertices.iter().enumerate() {
        let b = vertices[(i + 1) % vertices.len()];
        area += a.perp_dot(b);
    }
    area.abs() / 2.0
}

/// Even-odd point-in-polygon test
pub fn point_in_polygon(point: DVec2, vertices: &[DVec2]) -> bool {
    let n = vertices.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (vi, vj) = (vertices[i], vertices[j]);
        if (vi.y > point.y) != (vj.y > point.y) {
            let x = (vj.x - vi.x) * (point.y - vi.y) / (vj.y - vi.y) + vi.x;
            if point.x < x {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}
