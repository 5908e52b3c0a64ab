//! Spatial queries over the geometry store.
//!
//! All radii are world-space; callers that work in screen space divide by
//! the current zoom before calling in.

use crate::algorithms::winding::point_in_segments_evenodd;
use crate::geometry::intersect::crossing_point;
use crate::geometry::math::{closest_point_on_segment, dist_point_to_seg_sq};
use crate::geometry::tolerance::{EPS_DENOM, EPS_POS};
use crate::model::{EdgeId, SectorId, Vec2, VertexId};
use crate::AreaMap;
use serde::{Deserialize, Serialize};

#[inline]
fn in_bbox(p: Vec2, bb: (f32, f32, f32, f32)) -> bool {
    p.x >= bb.0 && p.y >= bb.1 && p.x <= bb.2 && p.y <= bb.3
}

/// Whether `p` lies inside sector `s`, holes excluded.
pub fn sector_contains(map: &AreaMap, s: SectorId, p: Vec2) -> bool {
    let Some(sec) = map.sector(s) else { return false };
    if let Some(bb) = sec.bbox {
        if !in_bbox(p, bb) {
            return false;
        }
    }
    point_in_segments_evenodd(p, sec.edges.iter().filter_map(|&e| map.edge_points(e)))
}

/// Sector containing `p`; `None` means the void.
pub fn point_in_sector(map: &AreaMap, p: Vec2) -> Option<SectorId> {
    map.sector_ids().find(|&s| sector_contains(map, s, p))
}

/// Closest vertex within `radius`. Ties go to the vertex created first.
pub fn nearest_vertex_within(map: &AreaMap, p: Vec2, radius: f32) -> Option<VertexId> {
    nearest_vertex_except(map, p, radius, None)
}

pub fn nearest_vertex_except(
    map: &AreaMap,
    p: Vec2,
    radius: f32,
    except: Option<VertexId>,
) -> Option<VertexId> {
    let r2 = radius * radius;
    let mut best: Option<(VertexId, f32)> = None;
    for v in map.vertex_ids() {
        if Some(v) == except {
            continue;
        }
        let Some(pos) = map.vertex_pos(v) else { continue };
        let d2 = p.dist_sq(pos);
        if d2 <= r2 && best.map_or(true, |(_, bd)| d2 < bd) {
            best = Some((v, d2));
        }
    }
    best.map(|(v, _)| v)
}

/// First edge (in id order) passing within `radius` of `p`.
///
/// With `after`, only edges that come after that id are looked at, so calling
/// again with the previous answer walks every edge under the point.
pub fn nearest_edge_under_point(
    map: &AreaMap,
    p: Vec2,
    radius: f32,
    after: Option<EdgeId>,
) -> Option<EdgeId> {
    let r2 = radius * radius;
    map.edge_ids()
        .filter(|&e| after.map_or(true, |a| e > a))
        .find(|&e| {
            map.edge_points(e)
                .map_or(false, |(a, b)| dist_point_to_seg_sq(p, a, b) <= r2)
        })
}

/// Crossing point of two segments. Segments meeting only at a shared
/// endpoint do not intersect.
pub fn segments_intersect(a1: Vec2, a2: Vec2, b1: Vec2, b2: Vec2) -> Option<Vec2> {
    crossing_point(a1, a2, b1, b2, EPS_POS, EPS_DENOM)
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapMode {
    #[default]
    Grid,
    Vertices,
    Edges,
    Nothing,
}

/// Snaps a cursor point according to `mode`.
///
/// `threshold` is world-space. `ignore` is a vertex that must not attract the
/// point (the one being dragged).
pub fn snap_point(
    map: &AreaMap,
    p: Vec2,
    mode: SnapMode,
    grid_interval: f32,
    threshold: f32,
    ignore: Option<VertexId>,
) -> Vec2 {
    match mode {
        SnapMode::Grid if grid_interval > 0.0 => Vec2::new(
            (p.x / grid_interval).round() * grid_interval,
            (p.y / grid_interval).round() * grid_interval,
        ),
        SnapMode::Grid | SnapMode::Nothing => p,
        SnapMode::Vertices => nearest_vertex_except(map, p, threshold, ignore)
            .and_then(|v| map.vertex_pos(v))
            .unwrap_or(p),
        SnapMode::Edges => {
            let r2 = threshold * threshold;
            let mut best: Option<(Vec2, f32)> = None;
            for e in map.edge_ids() {
                let Some(edge) = map.edge(e) else { continue };
                if ignore.map_or(false, |v| edge.has_vertex(v)) {
                    continue;
                }
                let Some((a, b)) = map.edge_points(e) else { continue };
                let (q, _) = closest_point_on_segment(p, a, b);
                let d2 = p.dist_sq(q);
                if d2 <= r2 && best.map_or(true, |(_, bd)| d2 < bd) {
                    best = Some((q, d2));
                }
            }
            best.map(|(q, _)| q).unwrap_or(p)
        }
    }
}
