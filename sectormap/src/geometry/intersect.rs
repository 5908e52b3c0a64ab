// Robust segment-segment intersection using f64 with tolerances.
// Classifies proper crossings, endpoint touches and collinear overlaps.

use crate::model::Vec2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SegIntersection {
    None,
    // Interior crossing on both segments
    Proper { t: f64, u: f64, x: f64, y: f64 },
    // At least one segment is hit at one of its endpoints
    Touch { t: f64, u: f64, x: f64, y: f64 },
    // Collinear overlap: parameter span on AB, ordered
    CollinearOverlap { t0: f64, t1: f64 },
}

#[derive(Clone, Copy)]
struct P { x: f64, y: f64 }

impl From<Vec2> for P {
    fn from(v: Vec2) -> P { P { x: v.x as f64, y: v.y as f64 } }
}

#[inline]
fn orient(a: P, b: P, c: P) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

#[inline]
fn within_eps(x: f64, eps: f64) -> bool { x.abs() <= eps }

#[inline]
fn straddles(o1: f64, o2: f64, eps: f64) -> bool {
    (o1 > 0.0 && o2 < 0.0) || (o1 < 0.0 && o2 > 0.0) || within_eps(o1, eps) || within_eps(o2, eps)
}

// Overlap of collinear AB and CD, measured on the dominant axis of AB.
fn collinear_overlap(a: P, b: P, c: P, d: P, eps: f64) -> SegIntersection {
    let use_x = (b.x - a.x).abs() >= (b.y - a.y).abs();
    let pick = |p: P| if use_x { p.x } else { p.y };
    let len_ab = pick(b) - pick(a);
    if within_eps(len_ab, eps) {
        return SegIntersection::None;
    }
    let tc = (pick(c) - pick(a)) / len_ab;
    let td = (pick(d) - pick(a)) / len_ab;
    let lo = tc.min(td).max(0.0);
    let hi = tc.max(td).min(1.0);
    if hi < lo - eps {
        return SegIntersection::None;
    }
    SegIntersection::CollinearOverlap { t0: lo.min(hi), t1: hi.max(lo) }
}

pub fn intersect_segments(a: Vec2, b: Vec2, c: Vec2, d: Vec2,
                          eps_pos: f32, eps_denom: f32) -> SegIntersection {
    let (a, b, c, d) = (P::from(a), P::from(b), P::from(c), P::from(d));
    let eps = eps_pos as f64;

    let o1 = orient(a, b, c);
    let o2 = orient(a, b, d);
    let o3 = orient(c, d, a);
    let o4 = orient(c, d, b);

    if within_eps(o1, eps) && within_eps(o2, eps) && within_eps(o3, eps) && within_eps(o4, eps) {
        return collinear_overlap(a, b, c, d, eps);
    }
    if !(straddles(o1, o2, eps) && straddles(o3, o4, eps)) {
        return SegIntersection::None;
    }

    let r_x = b.x - a.x; let r_y = b.y - a.y;
    let s_x = d.x - c.x; let s_y = d.y - c.y;
    let rxs = r_x * s_y - r_y * s_x;
    if within_eps(rxs, eps_denom as f64) {
        return SegIntersection::None;
    }
    let q_x = c.x - a.x; let q_y = c.y - a.y;
    let t = (q_x * s_y - q_y * s_x) / rxs;
    let u = (q_x * r_y - q_y * r_x) / rxs;
    if t < -eps || t > 1.0 + eps || u < -eps || u > 1.0 + eps {
        return SegIntersection::None;
    }
    let x = a.x + t * r_x;
    let y = a.y + t * r_y;
    let at_end = |k: f64| within_eps(k, eps) || within_eps(1.0 - k, eps);
    if at_end(t) || at_end(u) {
        SegIntersection::Touch { t: t.clamp(0.0, 1.0), u: u.clamp(0.0, 1.0), x, y }
    } else {
        SegIntersection::Proper { t, u, x, y }
    }
}

/// Point where two segments meet, ignoring contact that happens only at an
/// endpoint of both (edges sharing a vertex). T-junctions and collinear
/// overlaps of positive length count as intersections.
pub fn crossing_point(a: Vec2, b: Vec2, c: Vec2, d: Vec2, eps_pos: f32, eps_denom: f32) -> Option<Vec2> {
    let eps = eps_pos as f64;
    let at_end = |k: f64| k <= eps || k >= 1.0 - eps;
    match intersect_segments(a, b, c, d, eps_pos, eps_denom) {
        SegIntersection::None => None,
        SegIntersection::Proper { x, y, .. } => Some(Vec2::new(x as f32, y as f32)),
        SegIntersection::Touch { t, u, x, y } => {
            if at_end(t) && at_end(u) { None } else { Some(Vec2::new(x as f32, y as f32)) }
        }
        SegIntersection::CollinearOverlap { t0, t1 } => {
            let len = a.dist(b) as f64;
            if (t1 - t0) * len <= eps {
                return None;
            }
            let tm = ((t0 + t1) * 0.5) as f32;
            Some(Vec2::new(a.x + (b.x - a.x) * tm, a.y + (b.y - a.y) * tm))
        }
    }
}
