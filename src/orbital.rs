//! Orbital sliding NFP computation, the robust/concave counterpart to the
//! Minkowski-difference fast path in [`crate::nfp`].
//!
//! This samples candidate reference-point translations at every
//! vertex-pair of A and B and keeps the ones that are geometrically
//! feasible, rather than literally simulating a touching contact sliding
//! around the boundary step by step. It is deliberately an approximate,
//! bounded stand-in for the full edge-following algorithm — the same
//! trade-off the rest of this crate's NFP code has always made in favour
//! of a terminating, testable result over exact contact tracking.

use crate::geometry::{point_in_polygon, polygon_contains_polygon, polygon_signed_area, PointPosition};
use crate::shape::Point;

const DEDUP_EPS: f64 = 1e-6;

/// Sliding NFP, inner or outer mode. `search_edges` (the `explore_concave`
/// configuration flag) controls whether every vertex of B is tried as the
/// touching vertex (robust, slower) or only `b[0]` (fast path).
///
/// Returns an empty vector when fewer than 3 feasible reference points are
/// found — the caller treats this the same as any other NFP failure.
pub fn sliding_nfp(a: &[Point], b: &[Point], inside: bool, search_edges: bool) -> Vec<Vec<Point>> {
    if a.len() < 3 || b.len() < 3 {
        return Vec::new();
    }

    let touch_vertices: Vec<Point> = if search_edges { b.to_vec() } else { vec![b[0]] };
    let b_ref = b[0];

    let mut candidates = Vec::with_capacity(a.len() * touch_vertices.len());
    for &av in a {
        for &tv in &touch_vertices {
            let t = Point::new(av.x - tv.x, av.y - tv.y);
            if is_feasible(a, b, t, inside) {
                candidates.push(Point::new(b_ref.x + t.x, b_ref.y + t.y));
            }
        }
    }

    dedup(&mut candidates);
    if candidates.len() < 3 {
        return Vec::new();
    }

    order_around_centroid(&mut candidates);
    if polygon_signed_area(&candidates) == 0.0 {
        return Vec::new();
    }
    vec![candidates]
}

fn is_feasible(a: &[Point], b: &[Point], t: Point, inside: bool) -> bool {
    let zero = Point::new(0.0, 0.0);
    if inside {
        polygon_contains_polygon(a, b, zero, t)
    } else {
        let b_has_interior_overlap = b.iter().any(|&p| {
            let shifted = Point::new(p.x + t.x, p.y + t.y);
            point_in_polygon(shifted, a) == PointPosition::Inside
        });
        let a_has_interior_overlap = a.iter().any(|&p| {
            let shifted = Point::new(p.x - t.x, p.y - t.y);
            point_in_polygon(shifted, b) == PointPosition::Inside
        });
        !b_has_interior_overlap && !a_has_interior_overlap
    }
}

fn dedup(points: &mut Vec<Point>) {
    let mut out: Vec<Point> = Vec::with_capacity(points.len());
    for p in points.drain(..) {
        if !out.iter().any(|q| (q.x - p.x).abs() < DEDUP_EPS && (q.y - p.y).abs() < DEDUP_EPS) {
            out.push(p);
        }
    }
    *points = out;
}

/// Orders points by angle around their centroid, producing a simple
/// star-shaped ring. Adequate for the mostly-convex NFPs this sampling
/// approach tends to produce; concave cases may self-intersect, which the
/// caller's area sanity check in `nfp.rs` catches.
fn order_around_centroid(points: &mut [Point]) {
    let n = points.len() as f64;
    let cx = points.iter().map(|p| p.x).sum::<f64>() / n;
    let cy = points.iter().map(|p| p.y).sum::<f64>() / n;
    points.sort_by(|a, b| {
        let angle_a = (a.y - cy).atan2(a.x - cx);
        let angle_b = (b.y - cy).atan2(b.x - cx);
        angle_a.partial_cmp(&angle_b).unwrap()
    });
}
