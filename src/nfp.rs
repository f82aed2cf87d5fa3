//! No-fit-polygon engine: inner and outer NFP computation, the
//! `NfpKey`/`NfpValue` memoisation types, and the winding/hole
//! post-processing pass.

use crate::clipper::minkowski_sum;
use crate::error::{NestError, Result};
use crate::geometry::{ensure_clockwise, is_rectangle, nfp_rectangle, point_in_polygon, polygon_signed_area, PointPosition};
use crate::orbital;
use crate::shape::Point;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NfpMode {
    Inner,
    Outer,
}

/// Memoisation key. Rotations are quantised to thousandths of a degree so
/// the key derives `Eq`/`Hash` without relying on float bit patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NfpKey {
    pub a_id: i64,
    pub b_id: i64,
    pub mode: NfpMode,
    pub a_rot: i64,
    pub b_rot: i64,
}

impl NfpKey {
    pub fn new(a_id: i64, b_id: i64, mode: NfpMode, a_rot_deg: f64, b_rot_deg: f64) -> Self {
        Self {
            a_id,
            b_id,
            mode,
            a_rot: quantize(a_rot_deg),
            b_rot: quantize(b_rot_deg),
        }
    }

    pub fn a_rotation_deg(&self) -> f64 {
        dequantize(self.a_rot)
    }

    pub fn b_rotation_deg(&self) -> f64 {
        dequantize(self.b_rot)
    }
}

pub fn quantize(angle_deg: f64) -> i64 {
    (angle_deg * 1000.0).round() as i64
}

pub fn dequantize(q: i64) -> f64 {
    q as f64 / 1000.0
}

/// One or more rings. For `NfpMode::Outer`, element 0 is the outer
/// boundary and any remaining rings are holes lying inside it.
#[derive(Debug, Clone)]
pub struct NfpValue(pub Vec<crate::shape::Polygon>);

impl NfpValue {
    pub fn outer_boundary(&self) -> &crate::shape::Polygon {
        &self.0[0]
    }
}

/// Inner-fit NFP: the locus of reference points where `b` fits inside `a`
/// without overlap.
pub fn inner_fit_polygon(a: &[Point], b: &[Point], explore_concave: bool) -> Result<NfpValue> {
    if is_rectangle(a, 1e-4) {
        if let Some(polys) = nfp_rectangle(a, b) {
            return Ok(NfpValue(polys));
        }
    }
    let rings = orbital::sliding_nfp(a, b, true, explore_concave);
    if rings.is_empty() {
        return Err(NestError::NFPUnavailable {
            key: NfpKey::new(0, 0, NfpMode::Inner, 0.0, 0.0),
        });
    }
    let polys = rings
        .into_iter()
        .map(|mut pts| {
            ensure_clockwise(&mut pts);
            crate::shape::Polygon::new(0, pts)
        })
        .collect();
    Ok(NfpValue(polys))
}

/// Outer-fit NFP: the locus of reference points where `b` sits outside
/// `a`, touching but not overlapping.
pub fn outer_nfp(a: &[Point], b: &[Point], explore_concave: bool) -> Result<NfpValue> {
    let mut rings = if explore_concave {
        orbital::sliding_nfp(a, b, false, true)
    } else {
        minkowski_outer(a, b)
    };

    if rings.is_empty() {
        return Err(NestError::NFPUnavailable {
            key: NfpKey::new(0, 0, NfpMode::Outer, 0.0, 0.0),
        });
    }

    ensure_clockwise(&mut rings[0]);
    if polygon_signed_area(&rings[0]).abs() < polygon_signed_area(a).abs() {
        return Err(NestError::NFPUnavailable {
            key: NfpKey::new(0, 0, NfpMode::Outer, 0.0, 0.0),
        });
    }

    let outer = rings[0].clone();
    let mut polys = vec![crate::shape::Polygon::new(0, rings.remove(0))];
    // `rings` is never more than one element long in practice today:
    // `minkowski_outer` keeps a single summand and `orbital::sliding_nfp`
    // always returns one ring, both downstream of `clipper::from_geo_polygon`
    // dropping interior rings from every boolean op. This loop is kept as
    // the hole-reversal contract §4.3 describes, ready for a future NFP
    // path (or a `from_geo_polygon` that keeps interiors) that does
    // produce holes.
    for mut ring in rings {
        let first = ring[0];
        let inside_outer = point_in_polygon(first, &outer) != PointPosition::Outside;
        if inside_outer && polygon_signed_area(&ring) < 0.0 {
            ring.reverse();
        }
        polys.push(crate::shape::Polygon::new(0, ring));
    }
    Ok(NfpValue(polys))
}

/// Derives the outer NFP from the Minkowski difference `a ⊕ (-b)`: negate
/// `b`, sum with `a`, keep the summand with the most negative signed area
/// (the largest, most "outer" clockwise ring), then translate back into
/// `b`'s reference frame.
fn minkowski_outer(a: &[Point], b: &[Point]) -> Vec<Vec<Point>> {
    let neg_b: Vec<Point> = b.iter().map(|p| Point::new(-p.x, -p.y)).collect();
    let sums = minkowski_sum(a, &neg_b);
    let best = sums
        .into_iter()
        .min_by(|x, y| polygon_signed_area(x).partial_cmp(&polygon_signed_area(y)).unwrap());
    match best {
        Some(ring) => {
            let shift = b[0];
            vec![ring.into_iter().map(|p| Point::new(p.x + shift.x, p.y + shift.y)).collect()]
        }
        None => Vec::new(),
    }
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
    fn inner_fit_rectangle_fast_path() {
        let container = square(10.0);
        let part = square(2.0);
        let nfp = inner_fit_polygon(&container, &part, false).unwrap();
        assert_eq!(nfp.0.len(), 1);
        assert!(polygon_signed_area(&nfp.0[0].points).abs() > 0.0);
    }

    #[test]
    fn outer_nfp_minkowski_path_nonempty() {
        let a = square(4.0);
        let b = square(2.0);
        let nfp = outer_nfp(&a, &b, false).unwrap();
        assert!(!nfp.0.is_empty());
    }

    #[test]
    fn nfp_key_distinguishes_mode_and_rotation() {
        let k1 = NfpKey::new(1, 2, NfpMode::Inner, 0.0, 90.0);
        let k2 = NfpKey::new(1, 2, NfpMode::Outer, 0.0, 90.0);
        let k3 = NfpKey::new(1, 2, NfpMode::Inner, 0.0, 90.0001);
        assert_ne!(k1, k2);
        assert_eq!(k1, k1);
        assert_ne!(k1, k3);
    }
}
