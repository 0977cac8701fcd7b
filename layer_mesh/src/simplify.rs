//! Tolerance-based contour decimation. Bounds polygon complexity before
//! triangulation and doubles as the distance-driven LOD knob: small
//! tolerances are imperceptible, large ones visibly coarsen the contour.

use cli_format::Point;

/// Greedy single-pass point decimation. Keeps the first finite point, then
/// every point whose squared distance to the last kept point exceeds
/// `tolerance²`. The final point is appended unless it sits within
/// tolerance of the first kept point, which would create a near-zero
/// closing edge. Never returns fewer than 3 points when the filtered input
/// has at least 3: if decimation collapses the contour, the filtered
/// (undecimated) points are returned instead.
pub fn simplify(points: &[Point], tolerance: f32) -> Vec<Point> {
    let filtered: Vec<Point> = points
        .iter()
        .filter(|point| point.x.is_finite() && point.y.is_finite())
        .copied()
        .collect();

    if filtered.len() <= 3 {
        return filtered;
    }

    let tolerance_sq = tolerance * tolerance;
    let mut kept = Vec::with_capacity(filtered.len());
    kept.push(filtered[0]);

    for &point in &filtered[1..filtered.len() - 1] {
        let last = kept[kept.len() - 1];
        if (point - last).norm_squared() > tolerance_sq {
            kept.push(point);
        }
    }

    let last = filtered[filtered.len() - 1];
    if (last - kept[0]).norm_squared() > tolerance_sq {
        kept.push(last);
    }

    if kept.len() >= 3 {
        kept
    } else {
        filtered
    }
}

#[cfg(test)]
mod tests {
    use cli_format::Point;

    use super::simplify;

    fn dense_circle(points: usize, radius: f32) -> Vec<Point> {
        (0..points)
            .map(|i| {
                let angle = std::f32::consts::TAU * i as f32 / points as f32;
                Point::new(radius * angle.cos(), radius * angle.sin())
            })
            .collect()
    }

    #[test]
    fn filters_non_finite_points() {
        let points = vec![
            Point::new(0.0, 0.0),
            Point::new(f32::NAN, 1.0),
            Point::new(1.0, f32::INFINITY),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
        ];
        let simplified = simplify(&points, 0.1);
        assert_eq!(
            simplified,
            vec![
                Point::new(0.0, 0.0),
                Point::new(10.0, 0.0),
                Point::new(10.0, 10.0)
            ]
        );
    }

    #[test]
    fn is_a_subsequence_starting_at_the_first_point() {
        let points = dense_circle(256, 50.0);
        let simplified = simplify(&points, 5.0);

        assert_eq!(simplified[0], points[0]);
        assert!(simplified.len() < points.len());

        let mut cursor = 0;
        for point in &simplified {
            let position = points[cursor..].iter().position(|p| p == point);
            let position = position.expect("output point not found in input order");
            cursor += position;
        }
    }

    #[test]
    fn never_collapses_below_a_triangle() {
        let points = dense_circle(64, 1.0);
        // Tolerance larger than the whole contour: decimation would keep
        // only the first point, so the filtered set comes back instead.
        let simplified = simplify(&points, 100.0);
        assert_eq!(simplified.len(), points.len());
    }

    #[test]
    fn drops_a_near_zero_closing_edge() {
        let points = vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
            Point::new(0.01, 0.01),
        ];
        let simplified = simplify(&points, 0.5);
        assert_eq!(simplified.len(), 4);
        assert_eq!(simplified.last(), Some(&Point::new(0.0, 10.0)));
    }

    #[test]
    fn keeps_everything_when_points_are_far_apart() {
        let points = vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
        ];
        assert_eq!(simplify(&points, 0.5), points);
    }
}
