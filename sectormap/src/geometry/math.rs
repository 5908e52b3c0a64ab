use super::tolerance::clamp01;
use crate::model::Vec2;
use std::f32::consts::TAU;

/// Closest point to `p` on segment `a..b` and its parameter along the segment.
pub fn closest_point_on_segment(p: Vec2, a: Vec2, b: Vec2) -> (Vec2, f32) {
    let vx = b.x - a.x; let vy = b.y - a.y;
    let wx = p.x - a.x; let wy = p.y - a.y;
    let vv = vx*vx + vy*vy;
    let t = if vv > 0.0 { clamp01((wx*vx + wy*vy) / vv) } else { 0.0 };
    (Vec2::new(a.x + t * vx, a.y + t * vy), t)
}

pub fn dist_point_to_seg_sq(p: Vec2, a: Vec2, b: Vec2) -> f32 {
    let (q, _) = closest_point_on_segment(p, a, b);
    p.dist_sq(q)
}

/// Counter-clockwise sweep from angle `a1` to angle `a2`, in `[0, TAU)`.
#[inline]
pub fn ccw_diff(a1: f32, a2: f32) -> f32 {
    let d = (a2 - a1).rem_euclid(TAU);
    if d >= TAU { 0.0 } else { d }
}
