//! Polygon orientation and containment tests.
//!
//! Coordinates are treated in a y-up frame: a positive signed area means the
//! vertices run counter-clockwise.

use crate::model::Vec2;

/// Shoelace signed area. Positive for counter-clockwise polygons.
pub fn signed_area(polygon: &[Vec2]) -> f32 {
    if polygon.len() < 3 {
        return 0.0;
    }
    let n = polygon.len();
    let mut acc = 0.0f64;
    for i in 0..n {
        let p1 = polygon[i];
        let p2 = polygon[(i + 1) % n];
        acc += (p1.x as f64) * (p2.y as f64) - (p2.x as f64) * (p1.y as f64);
    }
    (acc * 0.5) as f32
}

#[inline]
pub fn is_counter_clockwise(polygon: &[Vec2]) -> bool {
    signed_area(polygon) > 0.0
}

/// Whether the horizontal ray from `p` towards +x crosses segment `a..b`.
///
/// Half-open on y so a ray through a shared vertex is counted once.
#[inline]
pub fn ray_crosses(p: Vec2, a: Vec2, b: Vec2) -> bool {
    if (a.y > p.y) == (b.y > p.y) {
        return false;
    }
    let x_at = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
    p.x < x_at
}

/// Even-odd containment over an arbitrary bag of segments.
///
/// Sectors own the edges of their holes too, so running this over every
/// boundary edge of a sector handles holes without building loops first.
pub fn point_in_segments_evenodd(p: Vec2, segments: impl IntoIterator<Item = (Vec2, Vec2)>) -> bool {
    let mut inside = false;
    for (a, b) in segments {
        if ray_crosses(p, a, b) {
            inside = !inside;
        }
    }
    inside
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x0: f32, y0: f32, s: f32) -> Vec<Vec2> {
        vec![
            Vec2::new(x0, y0),
            Vec2::new(x0 + s, y0),
            Vec2::new(x0 + s, y0 + s),
            Vec2::new(x0, y0 + s),
        ]
    }

    #[test]
    fn orientation() {
        let mut sq = square(0.0, 0.0, 10.0);
        assert!((signed_area(&sq) - 100.0).abs() < 1e-3);
        assert!(is_counter_clockwise(&sq));
        sq.reverse();
        assert!(!is_counter_clockwise(&sq));
    }

    #[test]
    fn containment_with_hole() {
        let outer = square(0.0, 0.0, 10.0);
        let hole = square(3.0, 3.0, 4.0);
        let segs: Vec<(Vec2, Vec2)> = [&outer, &hole]
            .iter()
            .flat_map(|poly| (0..poly.len()).map(move |i| (poly[i], poly[(i + 1) % poly.len()])))
            .collect();
        assert!(point_in_segments_evenodd(Vec2::new(1.0, 1.0), segs.iter().copied()));
        assert!(!point_in_segments_evenodd(Vec2::new(5.0, 5.0), segs.iter().copied()));
        assert!(!point_in_segments_evenodd(Vec2::new(15.0, 5.0), segs.iter().copied()));
    }
}
