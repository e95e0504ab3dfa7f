//! Measurement geometry: pure functions over content-space points.
//!
//! All inputs are image pixels (content space). Real-world values are
//! derived from pixel values through a pixels-per-foot `scale_ratio`; a
//! ratio that is zero, negative or non-finite yields `0.0` instead of
//! dividing by it.
//!
//! ## Boundary rule
//!
//! `point_in_polygon` is **inclusive**: a point on an edge or vertex
//! (within [`BOUNDARY_EPSILON`]) counts as inside. Two adjacent shapes
//! sharing an edge therefore both contain points on that edge, and the tie
//! is settled by z-order in `hit::resolve_topmost`.

use kurbo::{Point, Rect, Vec2};

/// Distance (content px) under which a point is treated as lying on an edge.
pub const BOUNDARY_EPSILON: f64 = 1e-9;

// ─── Pixel space ─────────────────────────────────────────────────────────

/// Shoelace area of a simple polygon. Winding order does not matter.
pub fn polygon_area(points: &[Point]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let n = points.len();
    let twice: f64 = (0..n)
        .map(|i| {
            let p = points[i];
            let q = points[(i + 1) % n];
            p.x * q.y - q.x * p.y
        })
        .sum();
    twice.abs() / 2.0
}

/// Area of `outer` minus the area of every hole, never below zero.
pub fn polygon_area_with_holes(outer: &[Point], holes: &[Vec<Point>]) -> f64 {
    let hole_area: f64 = holes.iter().map(|h| polygon_area(h)).sum();
    (polygon_area(outer) - hole_area).max(0.0)
}

/// Sum of edge lengths, closing edge included.
pub fn polygon_perimeter(points: &[Point]) -> f64 {
    match points.len() {
        0 | 1 => 0.0,
        n => (0..n)
            .map(|i| line_length(points[i], points[(i + 1) % n]))
            .sum(),
    }
}

/// Axis-aligned bounds of a point set, `None` when empty.
pub fn bounding_box(points: &[Point]) -> Option<Rect> {
    let (first, rest) = points.split_first()?;
    Some(
        rest.iter()
            .fold(Rect::from_points(*first, *first), |r, p| r.union_pt(*p)),
    )
}

/// Area-weighted centroid of a polygon ring.
///
/// Degenerate rings (collinear points, a single point) fall back to the
/// vertex mean so labels still get an anchor.
pub fn centroid(points: &[Point]) -> Option<Point> {
    if points.is_empty() {
        return None;
    }
    let n = points.len();
    let mut twice_area = 0.0;
    let mut cx = 0.0;
    let mut cy = 0.0;
    for i in 0..n {
        let p = points[i];
        let q = points[(i + 1) % n];
        let cross = p.x * q.y - q.x * p.y;
        twice_area += cross;
        cx += (p.x + q.x) * cross;
        cy += (p.y + q.y) * cross;
    }
    if twice_area.abs() <= BOUNDARY_EPSILON {
        let sum = points.iter().fold(Vec2::ZERO, |acc, p| acc + p.to_vec2());
        return Some((sum / n as f64).to_point());
    }
    Some(Point::new(cx / (3.0 * twice_area), cy / (3.0 * twice_area)))
}

/// Crossing-number point-in-polygon test with the inclusive boundary rule.
pub fn point_in_polygon(point: Point, ring: &[Point]) -> bool {
    if ring.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = ring.len() - 1;
    for i in 0..ring.len() {
        let a = ring[i];
        let b = ring[j];
        if distance_to_segment(point, a, b) <= BOUNDARY_EPSILON {
            return true;
        }
        if (a.y > point.y) != (b.y > point.y) {
            let x_cross = (b.x - a.x) * (point.y - a.y) / (b.y - a.y) + a.x;
            if point.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

pub fn line_length(a: Point, b: Point) -> f64 {
    a.distance(b)
}

/// Shortest distance from `p` to the segment `a`–`b`.
pub fn distance_to_segment(p: Point, a: Point, b: Point) -> f64 {
    let ab = b - a;
    let len_sq = ab.hypot2();
    if len_sq == 0.0 {
        return p.distance(a);
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    p.distance(a + ab * t)
}

/// Snap `raw` so the segment from `last` points along the nearest multiple
/// of `increment_deg`, keeping its length.
///
/// Segments shorter than `min_distance` are returned unchanged; their angle
/// is noise.
pub fn snap_to_angle(last: Point, raw: Point, increment_deg: f64, min_distance: f64) -> Point {
    let delta = raw - last;
    let d = delta.hypot();
    if d < min_distance || increment_deg <= 0.0 {
        return raw;
    }
    let step = increment_deg.to_radians();
    let snapped = (delta.atan2() / step).round() * step;
    last + Vec2::from_angle(snapped) * d
}

// ─── Real-world conversion ───────────────────────────────────────────────

/// True when `scale_ratio` can be divided by.
pub fn is_valid_ratio(scale_ratio: f64) -> bool {
    scale_ratio.is_finite() && scale_ratio > 0.0
}

/// Pixels → feet. Returns `0.0` for an unusable ratio.
pub fn pixel_to_real_feet(pixel_value: f64, scale_ratio: f64) -> f64 {
    if !is_valid_ratio(scale_ratio) {
        return 0.0;
    }
    pixel_value / scale_ratio
}

/// Square pixels → square feet (divides by the squared ratio).
pub fn pixel_area_to_square_feet(area_px: f64, scale_ratio: f64) -> f64 {
    if !is_valid_ratio(scale_ratio) {
        return 0.0;
    }
    area_px / (scale_ratio * scale_ratio)
}

/// Pixels-per-foot ratio from a calibration line of `pixel_distance` px
/// that is `real_feet` long. `None` unless both are positive and finite.
pub fn calibration_ratio(pixel_distance: f64, real_feet: f64) -> Option<f64> {
    let ratio = pixel_distance / real_feet;
    (pixel_distance > 0.0 && real_feet > 0.0 && is_valid_ratio(ratio)).then_some(ratio)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(side: f64) -> Vec<Point> {
        vec![
            Point::new(0.0, 0.0),
            Point::new(side, 0.0),
            Point::new(side, side),
            Point::new(0.0, side),
        ]
    }

    #[test]
    fn area_ignores_winding() {
        let quad = vec![
            Point::new(10.0, 5.0),
            Point::new(80.0, 12.0),
            Point::new(70.0, 60.0),
            Point::new(5.0, 40.0),
        ];
        let reversed = vec![quad[0], quad[3], quad[2], quad[1]];
        let a = polygon_area(&quad);
        assert!(a > 0.0);
        assert!((a - polygon_area(&reversed)).abs() < 1e-9);
    }

    #[test]
    fn holes_subtract_from_area() {
        let hole = vec![
            Point::new(10.0, 10.0),
            Point::new(20.0, 10.0),
            Point::new(20.0, 20.0),
            Point::new(10.0, 20.0),
        ];
        let area = polygon_area_with_holes(&square(100.0), &[hole]);
        assert!((area - 9_900.0).abs() < 1e-9);
    }

    #[test]
    fn perimeter_includes_closing_edge() {
        assert!((polygon_perimeter(&square(10.0)) - 40.0).abs() < 1e-9);
        assert_eq!(polygon_perimeter(&[Point::new(1.0, 1.0)]), 0.0);
    }

    #[test]
    fn bbox_of_points() {
        let r = bounding_box(&[Point::new(3.0, 9.0), Point::new(-1.0, 4.0), Point::new(7.0, 2.0)])
            .unwrap();
        assert_eq!(r, Rect::new(-1.0, 2.0, 7.0, 9.0));
        assert!(bounding_box(&[]).is_none());
    }

    #[test]
    fn centroid_of_square_and_degenerate() {
        let c = centroid(&square(10.0)).unwrap();
        assert!((c.x - 5.0).abs() < 1e-9 && (c.y - 5.0).abs() < 1e-9);

        let collinear = [Point::new(0.0, 0.0), Point::new(2.0, 0.0), Point::new(4.0, 0.0)];
        let c = centroid(&collinear).unwrap();
        assert!((c.x - 2.0).abs() < 1e-9 && c.y.abs() < 1e-9);
    }

    #[test]
    fn point_in_polygon_interior_exterior_boundary() {
        let sq = square(100.0);
        assert!(point_in_polygon(Point::new(50.0, 50.0), &sq));
        assert!(!point_in_polygon(Point::new(150.0, 50.0), &sq));
        // Inclusive boundary, on every side and on a vertex.
        assert!(point_in_polygon(Point::new(0.0, 50.0), &sq));
        assert!(point_in_polygon(Point::new(100.0, 50.0), &sq));
        assert!(point_in_polygon(Point::new(50.0, 100.0), &sq));
        assert!(point_in_polygon(Point::new(100.0, 100.0), &sq));
    }

    #[test]
    fn point_in_concave_polygon() {
        // U shape: the notch between the arms is outside.
        let u = vec![
            Point::new(0.0, 0.0),
            Point::new(30.0, 0.0),
            Point::new(30.0, 30.0),
            Point::new(20.0, 30.0),
            Point::new(20.0, 10.0),
            Point::new(10.0, 10.0),
            Point::new(10.0, 30.0),
            Point::new(0.0, 30.0),
        ];
        assert!(point_in_polygon(Point::new(5.0, 20.0), &u));
        assert!(!point_in_polygon(Point::new(15.0, 20.0), &u));
    }

    #[test]
    fn segment_distance() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(10.0, 0.0);
        assert!((distance_to_segment(Point::new(5.0, 3.0), a, b) - 3.0).abs() < 1e-9);
        assert!((distance_to_segment(Point::new(13.0, 4.0), a, b) - 5.0).abs() < 1e-9);
        assert!((distance_to_segment(Point::new(3.0, 4.0), a, a) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn snap_rounds_to_nearest_increment() {
        let last = Point::new(0.0, 0.0);
        let snapped = snap_to_angle(last, Point::new(100.0, 40.0), 45.0, 5.0);
        let d = (100.0_f64 * 100.0 + 40.0 * 40.0).sqrt();
        assert!(snapped.y.abs() < 1e-9, "21.8° rounds down to 0°");
        assert!((snapped.x - d).abs() < 1e-9, "length is preserved");

        let diag = snap_to_angle(last, Point::new(100.0, 90.0), 45.0, 5.0);
        assert!((diag.x - diag.y).abs() < 1e-9, "42° rounds to 45°");
    }

    #[test]
    fn snap_skips_short_segments() {
        let raw = Point::new(3.0, 1.0);
        assert_eq!(snap_to_angle(Point::ORIGIN, raw, 45.0, 5.0), raw);
    }

    #[test]
    fn real_world_conversion_guards_ratio() {
        assert_eq!(pixel_to_real_feet(64.0, 64.0), 1.0);
        assert_eq!(pixel_to_real_feet(64.0, 0.0), 0.0);
        assert_eq!(pixel_to_real_feet(64.0, -3.0), 0.0);
        assert_eq!(pixel_to_real_feet(64.0, f64::NAN), 0.0);
        assert!((pixel_area_to_square_feet(30_000.0, 64.0) - 7.32421875).abs() < 1e-12);
        assert_eq!(pixel_area_to_square_feet(30_000.0, 0.0), 0.0);
    }

    #[test]
    fn calibration_ratio_from_known_length() {
        assert_eq!(calibration_ratio(500.0, 10.0), Some(50.0));
        assert_eq!(calibration_ratio(500.0, 0.0), None);
        assert_eq!(calibration_ratio(0.0, 10.0), None);
        assert_eq!(calibration_ratio(500.0, f64::INFINITY), None);
    }
}
