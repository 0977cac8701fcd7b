//! Ear-clipping triangulation plus the winding/area utilities the layer
//! builder groups contours with. Holes are deliberately not supported: a CW
//! ring is classified as a hole and skipped rather than triangulated
//! against, since constrained triangulation of slicer output proved
//! unreliable and was removed.

use cli_format::Point;
use ordered_float::OrderedFloat;
use tracing::debug;

use crate::simplify::simplify;

/// Orientation of the ring by the Shoelace sum. A negative sum means
/// counter-clockwise in the slicer's coordinate system; the convention is
/// taken as given by the CLI/CNC output and not re-derived here.
pub fn is_counter_clockwise(points: &[Point]) -> bool {
    let mut sum = 0.0;
    for i in 0..points.len() {
        let a = points[i];
        let b = points[(i + 1) % points.len()];
        sum += (b.x - a.x) * (b.y + a.y);
    }
    sum < 0.0
}

/// Absolute polygon area by the Shoelace formula.
pub fn polygon_area(points: &[Point]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }

    let mut area = 0.0;
    for i in 0..points.len() {
        let a = points[i];
        let b = points[(i + 1) % points.len()];
        area += a.x as f64 * b.y as f64 - b.x as f64 * a.y as f64;
    }
    (area / 2.0).abs()
}

/// Barycentric sign test; points on an edge count as inside.
pub fn point_in_triangle(p: Point, a: Point, b: Point, c: Point) -> bool {
    fn sign(p: Point, a: Point, b: Point) -> f32 {
        (p.x - b.x) * (a.y - b.y) - (a.x - b.x) * (p.y - b.y)
    }

    let d1 = sign(p, a, b);
    let d2 = sign(p, b, c);
    let d3 = sign(p, c, a);

    let has_negative = d1 < 0.0 || d2 < 0.0 || d3 < 0.0;
    let has_positive = d1 > 0.0 || d2 > 0.0 || d3 > 0.0;

    !(has_negative && has_positive)
}

/// Ear-clipping triangulation of a simple polygon. Returns indices into
/// `points`, three per triangle.
///
/// Each pass scans the remaining ring for the first ear: a triple whose
/// orientation matches the polygon winding and whose triangle contains no
/// other remaining vertex. When no ear exists (degenerate or
/// self-intersecting input) or the iteration cap of `2 × n` is hit, the
/// remainder is fan-triangulated from its first vertex. The fallback can be
/// visually wrong but always terminates without panicking.
pub fn triangulate(points: &[Point]) -> Vec<u32> {
    let mut indices = Vec::new();
    if points.len() < 3 {
        return indices;
    }

    let mut remaining: Vec<u32> = (0..points.len() as u32).collect();
    let ccw = is_counter_clockwise(points);

    let max_iterations = points.len() * 2;
    let mut iteration = 0;

    while remaining.len() > 3 && iteration < max_iterations {
        iteration += 1;

        let ear = (0..remaining.len()).find(|&i| {
            let previous = remaining[(i + remaining.len() - 1) % remaining.len()];
            let current = remaining[i];
            let next = remaining[(i + 1) % remaining.len()];
            is_ear(points, &remaining, previous, current, next, ccw)
        });

        match ear {
            Some(i) => {
                let previous = remaining[(i + remaining.len() - 1) % remaining.len()];
                let next = remaining[(i + 1) % remaining.len()];
                indices.extend_from_slice(&[previous, remaining[i], next]);
                remaining.remove(i);
            }
            None => {
                debug!(
                    remaining = remaining.len(),
                    "no ear found, fan-triangulating remainder"
                );
                fan(&remaining, &mut indices);
                return indices;
            }
        }
    }

    if remaining.len() > 3 {
        debug!(
            remaining = remaining.len(),
            "ear clipping hit iteration cap, fan-triangulating remainder"
        );
        fan(&remaining, &mut indices);
        return indices;
    }

    indices.extend_from_slice(&remaining);
    indices
}

fn fan(remaining: &[u32], indices: &mut Vec<u32>) {
    for window in remaining[1..].windows(2) {
        indices.extend_from_slice(&[remaining[0], window[0], window[1]]);
    }
}

fn is_ear(points: &[Point], remaining: &[u32], previous: u32, current: u32, next: u32, ccw: bool) -> bool {
    let a = points[previous as usize];
    let b = points[current as usize];
    let c = points[next as usize];

    let cross = (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x);
    if (ccw && cross < 0.0) || (!ccw && cross > 0.0) {
        return false;
    }

    remaining.iter().all(|&index| {
        index == previous
            || index == current
            || index == next
            || !point_in_triangle(points[index as usize], a, b, c)
    })
}

/// Graham-scan convex hull. Only used where a single unified outer boundary
/// approximation is acceptable, e.g. collapsing thousands of contour
/// fragments into one ring.
pub fn convex_hull(points: &[Point]) -> Vec<Point> {
    if points.len() < 3 {
        return points.to_vec();
    }

    let pivot = *points
        .iter()
        .min_by_key(|p| (OrderedFloat(p.y), OrderedFloat(p.x)))
        .unwrap();

    let mut sorted = points.to_vec();
    sorted.sort_by_key(|p| {
        if *p == pivot {
            OrderedFloat(-std::f32::consts::PI)
        } else {
            OrderedFloat((p.y - pivot.y).atan2(p.x - pivot.x))
        }
    });

    let mut hull: Vec<Point> = Vec::with_capacity(sorted.len());
    for point in sorted {
        while hull.len() >= 2 && cross(hull[hull.len() - 2], hull[hull.len() - 1], point) <= 0.0 {
            hull.pop();
        }
        hull.push(point);
    }

    hull
}

fn cross(a: Point, b: Point, c: Point) -> f32 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

/// Builds one approximate outer boundary from many contour fragments by
/// hulling every simplified point. Lossy by construction; concavities are
/// filled in.
pub fn unified_convex_hull<'a>(
    polylines: impl IntoIterator<Item = &'a [Point]>,
    tolerance: f32,
) -> Option<Vec<Point>> {
    let mut all_points = Vec::new();
    for polyline in polylines {
        if polyline.len() < 2 {
            continue;
        }
        all_points.extend(simplify(polyline, tolerance));
    }

    (all_points.len() >= 3).then(|| convex_hull(&all_points))
}

/// Picks the counter-clockwise (outer) contour with the largest Shoelace
/// area among the candidates. Used when a part's wall extrusion needs
/// exactly one ring; clockwise rings are holes and never qualify.
pub fn largest_outer_contour<'a>(
    polylines: impl IntoIterator<Item = &'a [Point]>,
    tolerance: f32,
) -> Option<Vec<Point>> {
    let mut largest: Option<(f64, Vec<Point>)> = None;

    for polyline in polylines {
        if polyline.len() < 3 {
            continue;
        }

        let simplified = simplify(polyline, tolerance);
        if simplified.len() < 3 || !is_counter_clockwise(&simplified) {
            continue;
        }

        let area = polygon_area(&simplified);
        if largest.as_ref().map(|(max, _)| area > *max).unwrap_or(true) {
            largest = Some((area, simplified));
        }
    }

    largest.map(|(_, contour)| contour)
}
