//! Core data model: points, polygons and the immutable shape record.
//!
//! Winding invariant: every [`Polygon`] stored by this crate after ingestion
//! has non-positive signed area (clockwise), per the convention in
//! [`polygon_signed_area`](crate::geometry::polygon_signed_area).

use serde::{Deserialize, Serialize};

/// Sentinel id used for the container polygon.
pub const CONTAINER_ID: i64 = -1;

/// A single (x, y) coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned bounding box of a polygon.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    pub fn max_x(&self) -> f64 {
        self.x + self.width
    }

    pub fn max_y(&self) -> f64 {
        self.y + self.height
    }

    pub fn fits_within(&self, other: &Bounds) -> bool {
        self.width <= other.width && self.height <= other.height
    }
}

/// An ordered ring of points, optionally carrying inner rings (holes).
///
/// `id` identifies the shape this polygon was ingested from; holes share
/// their parent's id. The engine does not route NFPs through `children`,
/// but they are carried through rotation and offsetting so a future
/// hole-aware placement pass has the data it needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    pub id: i64,
    pub points: Vec<Point>,
    #[serde(default)]
    pub children: Vec<Polygon>,
}

impl Polygon {
    pub fn new(id: i64, points: Vec<Point>) -> Self {
        Self {
            id,
            points,
            children: Vec::new(),
        }
    }

    /// True when the ring, after removing a duplicated closing vertex,
    /// has fewer than 3 distinct points.
    pub fn is_degenerate(&self) -> bool {
        let mut pts = self.points.clone();
        if pts.len() > 1 && points_equal(pts[0], pts[pts.len() - 1]) {
            pts.pop();
        }
        pts.len() < 3
    }
}

fn points_equal(a: Point, b: Point) -> bool {
    (a.x - b.x).abs() < 1e-9 && (a.y - b.y).abs() < 1e-9
}

/// An immutable shape record: a polygon plus its absolute area.
///
/// Created once at ingestion (§3 Lifecycle) and never mutated; rotated
/// copies are produced on demand by the placement worker and GA, never
/// stored back onto the `Shape`.
#[derive(Debug, Clone)]
pub struct Shape {
    pub polygon: Polygon,
    pub area: f64,
}

impl Shape {
    pub fn id(&self) -> i64 {
        self.polygon.id
    }
}
