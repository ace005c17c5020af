//! Segment intersection primitives

use glam::DVec2;

use crate::geometry::{CircleTransform, RaycastGeometry};

/// Cross products below this are treated as parallel
const PARALLEL_EPSILON: f64 = 1e-12;
/// Slack on segment parameters so hits on shared vertices are not lost
const PARAM_EPSILON: f64 = 1e-9;

/// A directed segment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub a: DVec2,
    pub b: DVec2,
}

impl Segment {
    pub fn new(a: DVec2, b: DVec2) -> Self {
        Self { a, b }
    }

    pub fn direction(&self) -> DVec2 {
        self.b - self.a
    }
}

/// Consecutive point pairs of every ring
pub fn ring_segments(rings: &[Vec<DVec2>]) -> impl Iterator<Item = Segment> + '_ {
    rings
        .iter()
        .flat_map(|ring| ring.windows(2).map(|w| Segment::new(w[0], w[1])))
}

/// Parameters `(t, u)` along `p` and `q` where the supporting lines cross
pub fn line_params(p: Segment, q: Segment) -> Option<(f64, f64)> {
    let r = p.direction();
    let s = q.direction();
    let denom = r.perp_dot(s);
    if denom.abs() < PARALLEL_EPSILON {
        return None;
    }
    let qp = q.a - p.a;
    Some((qp.perp_dot(s) / denom, qp.perp_dot(r) / denom))
}

/// Intersection point of two segments, parallel segments never intersect
pub fn segment_intersection(p: Segment, q: Segment) -> Option<DVec2> {
    let (t, u) = line_params(p, q)?;
    let range = -PARAM_EPSILON..=1.0 + PARAM_EPSILON;
    (range.contains(&t) && range.contains(&u)).then(|| p.a + p.direction() * t.clamp(0.0, 1.0))
}

/// Intersections of a segment with an ellipse outline
pub fn segment_circle_intersections(ray: Segment, circle: &CircleTransform) -> Vec<DVec2> {
    let p = circle.to_local(ray.a);
    let v = circle.to_local(ray.b) - p;

    let a = v.length_squared();
    if a < PARALLEL_EPSILON {
        return Vec::new();
    }
    let b = 2.0 * p.dot(v);
    let c = p.length_squared() - 1.0;
    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        return Vec::new();
    }
    let root = disc.sqrt();

    let mut hits = Vec::with_capacity(2);
    for u in [(-b - root) / (2.0 * a), (-b + root) / (2.0 * a)] {
        if (0.0..=1.0).contains(&u) {
            hits.push(circle.to_world(p + v * u));
        }
    }
    if root == 0.0 {
        hits.truncate(1);
    }
    hits
}

/// All intersections of a segment with some geometry
pub fn geometry_intersections(ray: Segment, geometry: &RaycastGeometry) -> Vec<DVec2> {
    match geometry {
        RaycastGeometry::Rings(rings) => ring_segments(rings)
            .filter_map(|s| segment_intersection(ray, s))
            .collect(),
        RaycastGeometry::Circle(circle) => segment_circle_intersections(ray, circle),
    }
}
