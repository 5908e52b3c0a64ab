//! Local topology edits: edge split, vertex merge, edge deletion with
//! sector merging, vertex moves.

use crate::algorithms::picking::{nearest_edge_under_point, nearest_vertex_except, segments_intersect};
use crate::error::{degenerate, EditError, EditResult};
use crate::geometry::math::closest_point_on_segment;
use crate::geometry::tolerance::EPS_POS;
use crate::model::{EdgeId, SectorId, Vec2, VertexId};
use crate::AreaMap;
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Splits `e` at the point closest to `at`.
///
/// The new edge runs from the new vertex to `e`'s old second endpoint and
/// inherits `e`'s sectors. Returns the new vertex and the new edge.
pub fn split_edge(map: &mut AreaMap, e: EdgeId, at: Vec2) -> EditResult<(VertexId, EdgeId)> {
    let (a, b) = map
        .edge_points(e)
        .ok_or(EditError::InvalidId { kind: "edge", id: e.0 })?;
    let (p, _) = closest_point_on_segment(at, a, b);
    if p.dist(a) <= EPS_POS || p.dist(b) <= EPS_POS {
        return Err(degenerate("split point falls on an endpoint of the edge"));
    }
    let old = map
        .edge(e)
        .cloned()
        .ok_or(EditError::InvalidId { kind: "edge", id: e.0 })?;
    let nv = map.add_vertex(p);
    let ne = map.add_edge(nv, old.vertices[1])?;
    for side in 0..2 {
        map.connect_edge_to_sector(ne, side, old.sectors[side])?;
    }
    map.connect_edge_to_vertex(e, 1, nv)?;
    debug!(edge = e.0, new_vertex = nv.0, new_edge = ne.0, "split edge");
    Ok((nv, ne))
}

/// Folds `src` into `dst`. Returns the live sectors that were touched.
pub fn merge_vertices(map: &mut AreaMap, src: VertexId, dst: VertexId) -> EditResult<BTreeSet<SectorId>> {
    if src == dst {
        return Err(degenerate("cannot merge a vertex into itself"));
    }
    let src_edges = map
        .vertex(src)
        .ok_or(EditError::InvalidId { kind: "vertex", id: src.0 })?
        .edges
        .clone();
    if map.vertex(dst).is_none() {
        return Err(EditError::InvalidId { kind: "vertex", id: dst.0 });
    }
    let mut touched: BTreeSet<SectorId> = BTreeSet::new();

    for e in src_edges {
        let Some(edge) = map.edge(e).cloned() else { continue };
        touched.extend(edge.sectors.iter().flatten().copied());
        let other = edge.other_vertex(src);

        if other == dst {
            // Collapsed to a point.
            map.unlink_edge(e);
            continue;
        }

        if let Some(de) = map.edge_between(other, dst) {
            // Parallel edges become one; the survivor takes the sector the
            // doomed edge had beyond the shared one.
            let survivor = map
                .edge(de)
                .cloned()
                .ok_or(EditError::InvalidId { kind: "edge", id: de.0 })?;
            touched.extend(survivor.sectors.iter().flatten().copied());
            let (ds, es) = (survivor.sectors, edge.sectors);
            if es[0] == ds[0] {
                map.connect_edge_to_sector(de, 0, es[1])?;
            } else if es[0] == ds[1] {
                map.connect_edge_to_sector(de, 1, es[1])?;
            } else if es[1] == ds[0] {
                map.connect_edge_to_sector(de, 0, es[0])?;
            } else if es[1] == ds[1] {
                map.connect_edge_to_sector(de, 1, es[0])?;
            }
            map.unlink_edge(e);
            continue;
        }

        let end = if edge.vertices[0] == src { 0 } else { 1 };
        map.connect_edge_to_vertex(e, end, dst)?;
    }

    map.remove_vertex_slot(src);

    let dst_edges = map.vertex(dst).map(|v| v.edges.clone()).unwrap_or_default();
    for e in dst_edges {
        if map.edge(e).map_or(false, |ed| ed.sectors[0] == ed.sectors[1]) {
            map.unlink_edge(e);
        }
    }
    map.prune_orphans();

    touched.retain(|&s| map.sector(s).is_some());
    for &s in &touched {
        map.update_sector_bbox(s);
    }
    debug!(src = src.0, dst = dst.0, sectors = touched.len(), "merged vertices");
    Ok(touched)
}

#[inline]
fn bbox_area(map: &AreaMap, s: SectorId) -> f32 {
    map.sector_bbox(s)
        .map_or(0.0, |(x0, y0, x1, y1)| (x1 - x0) * (y1 - y0))
}

/// Joins two neighboring sectors into one by removing the edges between them.
///
/// The void always survives, otherwise the larger sector (by bounding box)
/// absorbs the smaller. Returns the survivor.
pub fn merge_sectors(
    map: &mut AreaMap,
    s1: Option<SectorId>,
    s2: Option<SectorId>,
) -> EditResult<Option<SectorId>> {
    if s1 == s2 {
        return Err(EditError::NotNeighbors);
    }
    let (keep, drop) = match (s1, s2) {
        (None, d) | (d, None) => (None, d),
        (Some(a), Some(b)) => {
            if bbox_area(map, b) > bbox_area(map, a) {
                (Some(b), Some(a))
            } else {
                (Some(a), Some(b))
            }
        }
    };
    let Some(drop) = drop else {
        return Err(EditError::NotNeighbors);
    };
    let drop_edges = map
        .sector(drop)
        .ok_or(EditError::InvalidId { kind: "sector", id: drop.0 })?
        .edges
        .clone();
    let shared: Vec<EdgeId> = drop_edges
        .iter()
        .copied()
        .filter(|&e| map.edge(e).map_or(false, |ed| ed.has_sector(keep)))
        .collect();
    if shared.is_empty() {
        return Err(EditError::NotNeighbors);
    }
    for &e in &shared {
        map.unlink_edge(e);
    }
    for e in drop_edges {
        let Some(edge) = map.edge(e).cloned() else { continue };
        for side in 0..2 {
            if edge.sectors[side] == Some(drop) {
                map.connect_edge_to_sector(e, side, keep)?;
            }
        }
    }
    map.prune_orphans();
    if let Some(k) = keep {
        map.update_sector_bbox(k);
    }
    info!(kept = ?keep, removed = drop.0, shared = shared.len(), "merged sectors");
    Ok(keep)
}

/// Deletes edges; an edge between two different sectors merges them.
pub fn delete_edges(map: &mut AreaMap, edges: &[EdgeId]) -> EditResult<()> {
    map.with_rollback(|map| {
        for &e in edges {
            let Some(edge) = map.edge(e).cloned() else { continue };
            if edge.sectors[0] != edge.sectors[1] {
                merge_sectors(map, edge.sectors[0], edge.sectors[1])?;
            } else {
                map.delete_edge(e)?;
            }
        }
        map.prune_orphans();
        Ok(())
    })
}

/// Result of dropping a dragged vertex somewhere.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveOutcome {
    Moved(VertexId),
    MergedInto(VertexId),
    SplitAndMerged { edge: EdgeId, vertex: VertexId },
}

/// Non-adjacent edges crossing any edge of `v`.
fn crossings_at(map: &AreaMap, v: VertexId) -> Option<(EdgeId, EdgeId)> {
    let own = map.vertex(v)?.edges.clone();
    for &e in &own {
        let Some(edge) = map.edge(e) else { continue };
        let Some((a1, a2)) = map.edge_points(e) else { continue };
        for o in map.edge_ids() {
            if o == e {
                continue;
            }
            let Some(other) = map.edge(o) else { continue };
            if other.has_vertex(edge.vertices[0]) || other.has_vertex(edge.vertices[1]) {
                continue;
            }
            let Some((b1, b2)) = map.edge_points(o) else { continue };
            if segments_intersect(a1, a2, b1, b2).is_some() {
                return Some((e, o));
            }
        }
    }
    None
}

/// Moves `v` to `to`, then merges it with whatever it was dropped on.
///
/// Dropped near another vertex it merges into it; dropped on an edge it
/// splits the edge and merges into the new vertex. A move that leaves an
/// edge of the final vertex crossing another edge is refused and the map
/// is left as it was.
pub fn move_vertex(
    map: &mut AreaMap,
    v: VertexId,
    to: Vec2,
    merge_radius: f32,
    pick_radius: f32,
) -> EditResult<MoveOutcome> {
    if !to.is_finite() {
        return Err(degenerate("target position is not finite"));
    }
    map.with_rollback(|map| {
        let around: Vec<SectorId> = map
            .vertex(v)
            .ok_or(EditError::InvalidId { kind: "vertex", id: v.0 })?
            .edges
            .iter()
            .filter_map(|&e| map.edge(e))
            .flat_map(|ed| ed.sectors.iter().flatten().copied())
            .collect();
        map.set_vertex_pos(v, to);

        let outcome = if let Some(target) = nearest_vertex_except(map, to, merge_radius, Some(v)) {
            merge_vertices(map, v, target)?;
            MoveOutcome::MergedInto(target)
        } else if let Some(e) = first_foreign_edge(map, v, to, pick_radius) {
            let (nv, _) = split_edge(map, e, to)?;
            merge_vertices(map, v, nv)?;
            MoveOutcome::SplitAndMerged { edge: e, vertex: nv }
        } else {
            MoveOutcome::Moved(v)
        };

        let final_v = match outcome {
            MoveOutcome::Moved(x) | MoveOutcome::MergedInto(x) => x,
            MoveOutcome::SplitAndMerged { vertex, .. } => vertex,
        };
        if let Some((a, b)) = crossings_at(map, final_v) {
            debug!(edge_a = a.0, edge_b = b.0, "move refused");
            return Err(EditError::IntersectingMove);
        }
        for s in around {
            map.update_sector_bbox(s);
        }
        Ok(outcome)
    })
}

// First edge under `p` that does not already touch `v`.
fn first_foreign_edge(map: &AreaMap, v: VertexId, p: Vec2, radius: f32) -> Option<EdgeId> {
    let mut after = None;
    while let Some(e) = nearest_edge_under_point(map, p, radius, after) {
        if !map.edge(e).map_or(true, |ed| ed.has_vertex(v)) {
            return Some(e);
        }
        after = Some(e);
    }
    None
}
