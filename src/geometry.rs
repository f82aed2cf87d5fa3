//! Geometry primitives.
//!
//! Kept free of the clipping adapter and the NFP engine so it can be unit
//! tested in isolation.

use crate::shape::{Bounds, Point, Polygon};
use geo::{BoundingRect, LineString, Rotate, point};

/// Relative tolerance used by all geometric comparisons in this crate.
pub const EPSILON: f64 = 1e-9;

fn to_linestring(points: &[Point]) -> LineString<f64> {
    points.iter().map(|p| (p.x, p.y)).collect::<Vec<_>>().into()
}

/// Signed area of a ring via the shoelace formula. Positive for
/// counter-clockwise rings, negative for clockwise, matching the
/// convention `A = 1/2 * sum (x_i * y_i+1 - x_i+1 * y_i)`.
pub fn polygon_signed_area(points: &[Point]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut area = 0.0;
    let mut j = points.len() - 1;
    for i in 0..points.len() {
        area += (points[j].x + points[i].x) * (points[j].y - points[i].y);
        j = i;
    }
    0.5 * area
}

/// Reverses winding in place if the ring is not clockwise (signed area > 0).
pub fn ensure_clockwise(points: &mut Vec<Point>) {
    if polygon_signed_area(points) > 0.0 {
        points.reverse();
    }
}

/// Reverses winding in place if the ring is not counter-clockwise.
pub fn ensure_counter_clockwise(points: &mut Vec<Point>) {
    if polygon_signed_area(points) < 0.0 {
        points.reverse();
    }
}

/// Axis-aligned minimum bounding box. `None` for fewer than 3 points.
pub fn polygon_bounds(points: &[Point]) -> Option<Bounds> {
    if points.len() < 3 {
        return None;
    }
    let ls = to_linestring(points);
    let rect = ls.bounding_rect()?;
    Some(Bounds {
        x: rect.min().x,
        y: rect.min().y,
        width: rect.width(),
        height: rect.height(),
    })
}

/// Rotate a ring by `angle_deg` degrees about the origin.
pub fn rotate_polygon(points: &[Point], angle_deg: f64) -> Vec<Point> {
    if points.is_empty() || angle_deg == 0.0 {
        return points.to_vec();
    }
    let ls = to_linestring(points);
    let origin = point!(x: 0.0, y: 0.0);
    let rotated = ls.rotate_around_point(angle_deg, origin);
    rotated.points().map(|c| Point { x: c.x(), y: c.y() }).collect()
}

/// Bounds of `rotate_polygon(points, angle_deg)`, used by the GA's
/// rotation-fit filter to reject rotations that cannot fit the container.
pub fn rotated_bounds(points: &[Point], angle_deg: f64) -> Option<Bounds> {
    if angle_deg == 0.0 {
        return polygon_bounds(points);
    }
    polygon_bounds(&rotate_polygon(points, angle_deg))
}

/// True when every vertex lies on the bounding box within `tol` and the
/// ring (after dropping a duplicated closing vertex) has exactly 4
/// distinct points.
pub fn is_rectangle(points: &[Point], tol: f64) -> bool {
    let mut pts = points.to_vec();
    if pts.len() > 1 {
        let (first, last) = (pts[0], pts[pts.len() - 1]);
        if (first.x - last.x).abs() < EPSILON && (first.y - last.y).abs() < EPSILON {
            pts.pop();
        }
    }
    if pts.len() != 4 {
        return false;
    }
    let bounds = match polygon_bounds(&pts) {
        Some(b) => b,
        None => return false,
    };
    pts.iter().all(|p| {
        let on_x = (p.x - bounds.x).abs() < tol || (p.x - bounds.max_x()).abs() < tol;
        let on_y = (p.y - bounds.y).abs() < tol || (p.y - bounds.max_y()).abs() < tol;
        on_x && on_y
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointPosition {
    Inside,
    OnEdge,
    Outside,
}

/// Ray-casting point-in-polygon test with explicit edge-hit reporting.
/// Orientation-agnostic.
pub fn point_in_polygon(p: Point, poly: &[Point]) -> PointPosition {
    if poly.len() < 3 {
        return PointPosition::Outside;
    }
    let mut inside = false;
    let n = poly.len();
    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = (poly[i].x, poly[i].y);
        let (xj, yj) = (poly[j].x, poly[j].y);

        if point_on_segment(p, poly[i], poly[j]) {
            return PointPosition::OnEdge;
        }

        let intersects = (yi > p.y) != (yj > p.y) && p.x < (xj - xi) * (p.y - yi) / (yj - yi) + xi;
        if intersects {
            inside = !inside;
        }
        j = i;
    }
    if inside {
        PointPosition::Inside
    } else {
        PointPosition::Outside
    }
}

fn point_on_segment(p: Point, a: Point, b: Point) -> bool {
    let cross = (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x);
    if cross.abs() > EPSILON {
        return false;
    }
    let dot = (p.x - a.x) * (b.x - a.x) + (p.y - a.y) * (b.y - a.y);
    if dot < -EPSILON {
        return false;
    }
    let len_sq = (b.x - a.x).powi(2) + (b.y - a.y).powi(2);
    dot <= len_sq + EPSILON
}

fn segments_intersect(p1: Point, p2: Point, p3: Point, p4: Point) -> bool {
    fn cross(o: Point, a: Point, b: Point) -> f64 {
        (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
    }
    let d1 = cross(p3, p4, p1);
    let d2 = cross(p3, p4, p2);
    let d3 = cross(p1, p2, p3);
    let d4 = cross(p1, p2, p4);
    if ((d1 > 0.0) != (d2 > 0.0)) && ((d3 > 0.0) != (d4 > 0.0)) {
        return true;
    }
    (d1.abs() < EPSILON && point_on_segment(p1, p3, p4))
        || (d2.abs() < EPSILON && point_on_segment(p2, p3, p4))
        || (d3.abs() < EPSILON && point_on_segment(p3, p1, p2))
        || (d4.abs() < EPSILON && point_on_segment(p4, p1, p2))
}

/// True when ring `a` (translated by `a_offset`) and ring `b` (translated
/// by `b_offset`) have at least one pair of crossing edges. Used by the
/// placement worker's collision guard alongside the NFP reference-point
/// check.
pub fn polygons_intersect(a: &[Point], b: &[Point], a_offset: Point, b_offset: Point) -> bool {
    if a.len() < 2 || b.len() < 2 {
        return false;
    }
    for i in 0..a.len() {
        let a1 = Point::new(a[i].x + a_offset.x, a[i].y + a_offset.y);
        let an = a[(i + 1) % a.len()];
        let a2 = Point::new(an.x + a_offset.x, an.y + a_offset.y);
        for j in 0..b.len() {
            let b1 = Point::new(b[j].x + b_offset.x, b[j].y + b_offset.y);
            let bn = b[(j + 1) % b.len()];
            let b2 = Point::new(bn.x + b_offset.x, bn.y + b_offset.y);
            if segments_intersect(a1, a2, b1, b2) {
                return true;
            }
        }
    }
    false
}

/// True when every vertex of `poly` (translated by `poly_offset`) lies
/// inside or on `container` (translated by `container_offset`).
pub fn polygon_contains_polygon(
    container: &[Point],
    poly: &[Point],
    container_offset: Point,
    poly_offset: Point,
) -> bool {
    poly.iter().all(|p| {
        let shifted = Point::new(
            p.x + poly_offset.x - container_offset.x,
            p.y + poly_offset.y - container_offset.y,
        );
        point_in_polygon(shifted, container) != PointPosition::Outside
    })
}

/// Closed-form inner NFP when `a` is an axis-aligned rectangle: a single
/// rectangle whose dimensions are `a`'s minus `b`'s bounds, positioned so
/// `b`'s first point may slide across it.
pub fn nfp_rectangle(a: &[Point], b: &[Point]) -> Option<Vec<Polygon>> {
    let a_bounds = polygon_bounds(a)?;
    let b_bounds = polygon_bounds(b)?;
    let width = a_bounds.width - b_bounds.width;
    let height = a_bounds.height - b_bounds.height;
    if width < -EPSILON || height < -EPSILON {
        return None;
    }
    let width = width.max(0.0);
    let height = height.max(0.0);

    let ref_point = b[0];
    let dx = ref_point.x - b_bounds.x;
    let dy = ref_point.y - b_bounds.y;
    let x0 = a_bounds.x + dx;
    let y0 = a_bounds.y + dy;

    let mut pts = vec![
        Point::new(x0, y0),
        Point::new(x0 + width, y0),
        Point::new(x0 + width, y0 + height),
        Point::new(x0, y0 + height),
    ];
    ensure_clockwise(&mut pts);
    Some(vec![Polygon::new(0, pts)])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn area_of_square() {
        let pts = vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(0.0, 1.0),
        ];
        assert_eq!(polygon_signed_area(&pts), -1.0);
        let bounds = polygon_bounds(&pts).unwrap();
        assert_eq!(bounds.width, 1.0);
        assert_eq!(bounds.height, 1.0);
    }

    #[test]
    fn area_of_triangle_ccw() {
        let pts = vec![Point::new(0.0, 0.0), Point::new(1.0, 0.0), Point::new(0.0, 1.0)];
        assert!((polygon_signed_area(&pts) + 0.5).abs() < 1e-6);
    }

    #[test]
    fn rotate_idempotence() {
        let pts = vec![
            Point::new(0.0, 0.0),
            Point::new(2.0, 0.0),
            Point::new(2.0, 1.0),
            Point::new(0.0, 1.0),
        ];
        let rotated = rotate_polygon(&pts, 37.0);
        let back = rotate_polygon(&rotated, -37.0);
        for (p, q) in pts.iter().zip(back.iter()) {
            assert!((p.x - q.x).abs() < 1e-6, "{:?} vs {:?}", p, q);
            assert!((p.y - q.y).abs() < 1e-6, "{:?} vs {:?}", p, q);
        }
    }

    #[test]
    fn rotate_preserves_bounds_for_square() {
        let pts = vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(0.0, 1.0),
        ];
        let rotated = rotate_polygon(&pts, 90.0);
        let b = polygon_bounds(&rotated).unwrap();
        assert!((b.width - 1.0).abs() < 1e-6);
        assert!((b.height - 1.0).abs() < 1e-6);
    }

    #[test]
    fn degenerate_polygon_has_no_bounds() {
        let pts = vec![Point::new(0.0, 0.0), Point::new(1.0, 0.0)];
        assert_eq!(polygon_signed_area(&pts), 0.0);
        assert!(polygon_bounds(&pts).is_none());
    }

    #[test]
    fn rectangle_detection() {
        let pts = vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 5.0),
            Point::new(0.0, 5.0),
        ];
        assert!(is_rectangle(&pts, 1e-4));
        let l_shape = vec![
            Point::new(0.0, 0.0),
            Point::new(2.0, 0.0),
            Point::new(2.0, 1.0),
            Point::new(1.0, 1.0),
            Point::new(1.0, 2.0),
            Point::new(0.0, 2.0),
        ];
        assert!(!is_rectangle(&l_shape, 1e-4));
    }

    #[test]
    fn point_in_polygon_basic() {
        let square = vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
        ];
        assert_eq!(point_in_polygon(Point::new(5.0, 5.0), &square), PointPosition::Inside);
        assert_eq!(point_in_polygon(Point::new(20.0, 5.0), &square), PointPosition::Outside);
        assert_eq!(point_in_polygon(Point::new(0.0, 5.0), &square), PointPosition::OnEdge);
    }

    #[test]
    fn nfp_rectangle_simple() {
        let container = vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
        ];
        let part = vec![
            Point::new(0.0, 0.0),
            Point::new(2.0, 0.0),
            Point::new(2.0, 2.0),
            Point::new(0.0, 2.0),
        ];
        let nfp = nfp_rectangle(&container, &part).unwrap();
        assert_eq!(nfp.len(), 1);
        let area = polygon_signed_area(&nfp[0].points).abs();
        assert!((area - 64.0).abs() < 1e-6);
    }

    #[test]
    fn polygons_intersect_overlapping_squares() {
        let a = vec![
            Point::new(0.0, 0.0),
            Point::new(2.0, 0.0),
            Point::new(2.0, 2.0),
            Point::new(0.0, 2.0),
        ];
        let b = a.clone();
        assert!(polygons_intersect(&a, &b, Point::new(0.0, 0.0), Point::new(1.0, 1.0)));
        assert!(!polygons_intersect(&a, &b, Point::new(0.0, 0.0), Point::new(5.0, 5.0)));
    }
}
