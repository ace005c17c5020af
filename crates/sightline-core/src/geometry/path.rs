//! Path flattening and polyline simplification

use glam::DVec2;

use crate::types::PathCommand;

/// Distance tolerance for simplifying path sub-rings, in world units
pub const PATH_SIMPLIFY_TOLERANCE: f64 = 5.0;

/// Samples per Bézier segment
const CURVE_STEPS: usize = 8;

/// Split a command stream into flattened subpaths
///
/// A new subpath starts at every `Move`. Bézier segments are sampled at a
/// fixed number of steps. Subpaths with fewer than 2 points are dropped.
pub fn flatten_path(commands: &[PathCommand]) -> Vec<Vec<DVec2>> {
    let mut subpaths = Vec::new();
    let mut current: Vec<DVec2> = Vec::new();

    for command in commands {
        let cursor = current.last().copied().unwrap_or(DVec2::ZERO);
        match *command {
            PathCommand::Move(to) => {
                if current.len() >= 2 {
                    subpaths.push(std::mem::take(&mut current));
                } else {
                    current.clear();
                }
                current.push(to);
            }
            PathCommand::Line(to) => current.push(to),
            PathCommand::Quad { control, to } => {
                current.extend((1..=CURVE_STEPS).map(|i| {
                    let t = i as f64 / CURVE_STEPS as f64;
                    let mt = 1.0 - t;
                    cursor * (mt * mt) + control * (2.0 * mt * t) + to * (t * t)
                }));
            }
            PathCommand::Cubic {
                control1,
                control2,
                to,
            } => {
                current.extend((1..=CURVE_STEPS).map(|i| {
                    let t = i as f64 / CURVE_STEPS as f64;
                    let mt = 1.0 - t;
                    cursor * (mt * mt * mt)
                        + control1 * (3.0 * mt * mt * t)
                        + control2 * (3.0 * mt * t * t)
                        + to * (t * t * t)
                }));
            }
            PathCommand::Close => {
                if let Some(first) = current.first().copied()
                    && current.last() != Some(&first)
                {
                    current.push(first);
                }
            }
        }
    }
    if current.len() >= 2 {
        subpaths.push(current);
    }
    subpaths
}

/// Radial-distance pass followed by Douglas-Peucker
pub fn simplify(points: &[DVec2], tolerance: f64) -> Vec<DVec2> {
    if points.len() <= 2 {
        return points.to_vec();
    }
    let sq_tolerance = tolerance * tolerance;
    let reduced = simplify_radial(points, sq_tolerance);
    simplify_douglas_peucker(&reduced, sq_tolerance)
}

fn simplify_radial(points: &[DVec2], sq_tolerance: f64) -> Vec<DVec2> {
    let mut prev = points[0];
    let mut out = vec![prev];
    for &point in &points[1..] {
        if point.distance_squared(prev) > sq_tolerance {
            out.push(point);
            prev = point;
        }
    }
    let last = points[points.len() - 1];
    if prev != last {
        out.push(last);
    }
    out
}

fn sq_segment_distance(p: DVec2, a: DVec2, b: DVec2) -> f64 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq == 0.0 {
        return p.distance_squared(a);
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    p.distance_squared(a + ab * t)
}

fn simplify_douglas_peucker(points: &[DVec2], sq_tolerance: f64) -> Vec<DVec2> {
    let last = points.len() - 1;
    let mut keep = vec![false; points.len()];
    keep[0] = true;
    keep[last] = true;

    let mut stack = vec![(0, last)];
    while let Some((first, end)) = stack.pop() {
        let mut max_sq = sq_tolerance;
        let mut index = None;
        for i in first + 1..end {
            let sq = sq_segment_distance(points[i], points[first], points[end]);
            if sq > max_sq {
                max_sq = sq;
                index = Some(i);
            }
        }
        if let Some(i) = index {
            keep[i] = true;
            stack.push((first, i));
            stack.push((i, end));
        }
    }

    points
        .iter()
        .zip(keep)
        .filter_map(|(p, k)| k.then_some(*p))
        .collect()
}
