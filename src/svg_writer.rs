//! Renders a nested [`crate::placement::Solution`] back to SVG.
//!
//! One `<polygon>` per placed part, laid out left to right with a fixed
//! gutter between bins, wrapped in an `<svg>` whose `<rect>` outlines
//! each bin.

use crate::geometry::{polygon_bounds, rotate_polygon};
use crate::placement::Solution;
use crate::shape::Shape;

const BIN_GUTTER: f64 = 10.0;

/// Renders every bin in `solution` side by side, translating each part's
/// canonical points by its reported `(tx, ty)` after rotation.
pub fn solution_to_svg(solution: &Solution, shapes: &[Shape], container_height: f64) -> String {
    let mut body = String::new();
    let mut x_cursor = 0.0;
    let mut max_height: f64 = container_height;

    for bin in &solution.bins {
        body.push_str(&format!(
            "<rect x=\"{}\" y=\"0\" width=\"{}\" height=\"{}\" fill=\"none\" stroke=\"blue\"/>\n",
            x_cursor, bin.width, container_height
        ));
        for placement in &bin.placements {
            let Some(shape) = shapes.iter().find(|s| s.id() == placement.id) else {
                continue;
            };
            let rotated = rotate_polygon(&shape.polygon.points, placement.rotation);
            let points: Vec<String> = rotated
                .iter()
                .map(|p| format!("{},{}", p.x + placement.tx + x_cursor, p.y + placement.ty))
                .collect();
            body.push_str(&format!(
                "<polygon points=\"{}\" fill=\"none\" stroke=\"black\"/>\n",
                points.join(" ")
            ));
            if let Some(b) = polygon_bounds(&rotated) {
                max_height = max_height.max(b.max_y() + placement.ty);
            }
        }
        x_cursor += bin.width + BIN_GUTTER;
    }

    let total_width = (x_cursor - BIN_GUTTER).max(0.0);
    format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{}\" height=\"{}\">\n{}</svg>",
        total_width, max_height, body
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::placement::{BinPlacement, Placement};
    use crate::shape::Polygon;

    #[test]
    fn renders_one_bin_one_part() {
        let shapes = vec![Shape {
            polygon: Polygon::new(
                1,
                vec![
                    crate::shape::Point::new(0.0, 0.0),
                    crate::shape::Point::new(2.0, 0.0),
                    crate::shape::Point::new(2.0, 2.0),
                    crate::shape::Point::new(0.0, 2.0),
                ],
            ),
            area: 4.0,
        }];
        let solution = Solution {
            bins: vec![BinPlacement {
                placements: vec![Placement { id: 1, tx: 0.0, ty: 0.0, rotation: 0.0 }],
                width: 2.0,
            }],
            unplaced: vec![],
        };
        let svg = solution_to_svg(&solution, &shapes, 10.0);
        assert!(svg.contains("<svg"));
        assert!(svg.contains("<polygon"));
        assert!(svg.contains("</svg>"));
    }
}
