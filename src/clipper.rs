//! Adapter over the Clipper-based polygon booleans.
//!
//! `geo-clipper` only operates on integer coordinates; [`CLIPPER_SCALE`] is
//! the fixed-point scale applied on the way in and removed on the way out,
//! matching the reference implementation's use of ClipperLib.

use crate::geometry::{polygon_signed_area, EPSILON};
use crate::shape::Point;
use geo_clipper::Clipper;
use geo_types::{LineString as GeoLineString, MultiPolygon, Polygon as GeoPolygon};

pub const CLIPPER_SCALE: f64 = 1e7;

fn to_geo_polygon(points: &[Point]) -> GeoPolygon<f64> {
    let coords: Vec<(f64, f64)> = points.iter().map(|p| (p.x, p.y)).collect();
    GeoPolygon::new(GeoLineString::from(coords), vec![])
}

/// Extracts only the exterior ring of a Clipper result polygon. Interior
/// rings (holes) produced by a boolean op are dropped here, which makes
/// every caller of `offset`/`union_all`/`difference`/`minkowski_sum` -
/// and in turn the hole-reversal branch in `nfp::outer_nfp` - blind to
/// holes. Acceptable under this crate's holes Non-goal (see
/// `shape::Polygon::children`), but worth keeping in one place rather
/// than rediscovering it at each call site.
fn from_geo_polygon(poly: &GeoPolygon<f64>) -> Vec<Point> {
    poly.exterior().points().map(|c| Point::new(c.x(), c.y())).collect()
}

/// Offset every ring of `points` outward (positive `delta`) or inward
/// (negative) by `delta`, in source units. Used for spacing dilation and
/// container erosion.
pub fn offset(points: &[Point], delta: f64, curve_tolerance: f64) -> Vec<Vec<Point>> {
    if points.len() < 3 || delta == 0.0 {
        return vec![points.to_vec()];
    }
    let poly = to_geo_polygon(points);
    let result: MultiPolygon<f64> = poly.offset(
        delta,
        geo_clipper::JoinType::Round(curve_tolerance),
        geo_clipper::EndType::ClosedPolygon,
        CLIPPER_SCALE,
    );
    result.0.iter().map(from_geo_polygon).collect()
}

/// Removes near-duplicate consecutive vertices and vertices that are
/// collinear with their neighbours within `curve_tolerance`, per §4.2's
/// "collinear-vertex removal" contract.
///
/// This is a direct geometric pass rather than a delegation to
/// `offset(points, 0.0, ..)`: Clipper's polygon offset short-circuits on a
/// zero delta (see `offset` above) and returns the input untouched, so
/// routing through it here would silently perform no cleaning at all.
/// Self-intersection removal (the other half of a full Clipper "clean",
/// e.g. via `SimplifyPolygon`) is not implemented — `geo-clipper` exposes
/// no such primitive, only the boolean ops already used in `union_all`/
/// `difference`. A self-intersecting input ring is passed through with
/// only duplicate/collinear vertices stripped.
pub fn clean(points: &[Point], curve_tolerance: f64) -> Option<Vec<Point>> {
    if points.len() < 3 {
        return None;
    }
    let tol = curve_tolerance.max(EPSILON);
    let mut pts = points.to_vec();
    if pts.len() > 1 && points_close(pts[0], pts[pts.len() - 1], tol) {
        pts.pop();
    }

    let mut deduped: Vec<Point> = Vec::with_capacity(pts.len());
    for p in pts {
        if !deduped.last().is_some_and(|&q| points_close(p, q, tol)) {
            deduped.push(p);
        }
    }
    if deduped.len() > 1 && points_close(deduped[0], deduped[deduped.len() - 1], tol) {
        deduped.pop();
    }
    if deduped.len() < 3 {
        return None;
    }

    let n = deduped.len();
    let cleaned: Vec<Point> = (0..n)
        .filter(|&i| {
            let prev = deduped[(i + n - 1) % n];
            let curr = deduped[i];
            let next = deduped[(i + 1) % n];
            !is_collinear(prev, curr, next, tol)
        })
        .map(|i| deduped[i])
        .collect();

    if cleaned.len() < 3 {
        None
    } else {
        Some(cleaned)
    }
}

fn points_close(a: Point, b: Point, tol: f64) -> bool {
    (a.x - b.x).abs() < tol && (a.y - b.y).abs() < tol
}

/// True when `b`'s perpendicular distance from the line `a`-`c` is within
/// `tol`, i.e. `b` contributes no shape information between its neighbours.
fn is_collinear(a: Point, b: Point, c: Point, tol: f64) -> bool {
    let dx = c.x - a.x;
    let dy = c.y - a.y;
    let len = (dx * dx + dy * dy).sqrt();
    if len < EPSILON {
        return true;
    }
    let cross = (b.x - a.x) * dy - (b.y - a.y) * dx;
    (cross.abs() / len) <= tol
}

/// Boolean union of several polygons, merging overlapping rings into one
/// `MultiPolygon` worth of output rings. Used both directly (part
/// deduplication) and as the merge step of [`minkowski_sum`].
pub fn union_all(polys: &[Vec<Point>]) -> Vec<Vec<Point>> {
    if polys.is_empty() {
        return Vec::new();
    }
    let mut acc = MultiPolygon(vec![to_geo_polygon(&polys[0])]);
    for p in &polys[1..] {
        let next = to_geo_polygon(p);
        acc = acc.union(&next, CLIPPER_SCALE);
    }
    acc.0.iter().map(from_geo_polygon).collect()
}

/// Subtracts the union of `subtrahends` from `minuend`, returning the
/// residue rings. Used by the placement worker to carve already-placed
/// parts' outer-NFPs out of the container's inner-NFP.
pub fn difference(minuend: &[Point], subtrahends: &[Vec<Point>]) -> Vec<Vec<Point>> {
    if minuend.len() < 3 {
        return Vec::new();
    }
    if subtrahends.is_empty() {
        return vec![minuend.to_vec()];
    }
    let base = MultiPolygon(vec![to_geo_polygon(minuend)]);
    let cutter = MultiPolygon(subtrahends.iter().map(|p| to_geo_polygon(p)).collect());
    let result = base.difference(&cutter, CLIPPER_SCALE);
    result.0.iter().map(from_geo_polygon).collect()
}

/// General (concave-capable) Minkowski sum of `a` and `b`: for every pair
/// of edges (one from each ring) forms the quadrilateral of the four
/// vertex-sum combinations, then unions all such quads. This is the
/// standard edge-pair construction for the Minkowski sum of two simple
/// polygons; relying on it, rather than a library "minkowski" entry
/// point, keeps this crate's only dependency on Clipper the boolean
/// union it already needs elsewhere.
pub fn minkowski_sum(a: &[Point], b: &[Point]) -> Vec<Vec<Point>> {
    if a.len() < 3 || b.len() < 3 {
        return Vec::new();
    }
    let mut quads = Vec::with_capacity(a.len() * b.len());
    for i in 0..a.len() {
        let a1 = a[i];
        let a2 = a[(i + 1) % a.len()];
        for j in 0..b.len() {
            let b1 = b[j];
            let b2 = b[(j + 1) % b.len()];
            let quad = vec![
                Point::new(a1.x + b1.x, a1.y + b1.y),
                Point::new(a2.x + b1.x, a2.y + b1.y),
                Point::new(a2.x + b2.x, a2.y + b2.y),
                Point::new(a1.x + b2.x, a1.y + b2.y),
            ];
            quads.push(quad);
        }
    }
    union_all(&quads)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(size: f64) -> Vec<Point> {
        vec![
            Point::new(0.0, 0.0),
            Point::new(size, 0.0),
            Point::new(size, size),
            Point::new(0.0, size),
        ]
    }

    #[test]
    fn clean_removes_collinear_vertex() {
        let pts = vec![
            Point::new(0.0, 0.0),
            Point::new(5.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
        ];
        let cleaned = clean(&pts, 0.01).unwrap();
        assert_eq!(cleaned.len(), 4);
        assert!(!cleaned.contains(&Point::new(5.0, 0.0)));
    }

    #[test]
    fn clean_removes_near_duplicate_vertex() {
        let pts = vec![
            Point::new(0.0, 0.0),
            Point::new(0.0000001, 0.0000001),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
        ];
        let cleaned = clean(&pts, 0.3).unwrap();
        assert_eq!(cleaned.len(), 4);
    }

    #[test]
    fn clean_preserves_a_already_simplified_square() {
        let sq = square(10.0);
        let cleaned = clean(&sq, 0.3).unwrap();
        assert_eq!(cleaned.len(), 4);
        let area = polygon_signed_area(&cleaned).abs();
        assert!((area - 100.0).abs() < 1e-6);
    }

    #[test]
    fn offset_grows_bounds() {
        let sq = square(10.0);
        let grown = offset(&sq, 1.0, 0.3);
        assert_eq!(grown.len(), 1);
        let area = polygon_signed_area(&grown[0]).abs();
        assert!(area > 100.0);
    }

    #[test]
    fn minkowski_sum_of_squares_is_square() {
        let a = square(4.0);
        let b = square(2.0);
        let sum = minkowski_sum(&a, &b);
        assert_eq!(sum.len(), 1);
        let area = polygon_signed_area(&sum[0]).abs();
        assert!((area - 36.0).abs() < 1e-3, "area was {area}");
    }

    #[test]
    fn union_all_merges_overlapping_squares() {
        let a = square(2.0);
        let b = vec![
            Point::new(1.0, 1.0),
            Point::new(3.0, 1.0),
            Point::new(3.0, 3.0),
            Point::new(1.0, 3.0),
        ];
        let merged = union_all(&[a, b]);
        assert_eq!(merged.len(), 1);
        let area = polygon_signed_area(&merged[0]).abs();
        assert!((area - 7.0).abs() < 1e-3, "area was {area}");
    }
}
