//! Turning drawn outlines into sectors: drawing nodes, interactive line
//! checks, sector creation and sector splitting.

use crate::algorithms::boundary::{traverse_for_split, ChainSide};
use crate::algorithms::picking::{
    nearest_edge_under_point, nearest_vertex_within, point_in_sector,
    segments_intersect,
};
use crate::algorithms::topology::split_edge;
use crate::algorithms::winding::{is_counter_clockwise, point_in_segments_evenodd, signed_area};
use crate::error::{degenerate, invalid_split, EditError, EditResult};
use crate::geometry::math::{closest_point_on_segment, dist_point_to_seg_sq};
use crate::geometry::tolerance::{EPS_ON_LINE, EPS_POS, EPS_SECTOR_AREA};
use crate::model::{EdgeId, SectorId, Vec2, VertexId};
use crate::AreaMap;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use tracing::{debug, info};

/// What a drawing node sits on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "on", content = "id", rename_all = "lowercase")]
pub enum Anchor {
    Vertex(VertexId),
    Edge(EdgeId),
    /// Inside a sector, or the void.
    Sector(Option<SectorId>),
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct DrawingNode {
    pub raw: Vec2,
    pub pos: Vec2,
    pub on: Anchor,
}

impl DrawingNode {
    /// Classifies a (snapped) cursor point: vertex first, then edge, then sector.
    pub fn resolve(map: &AreaMap, raw: Vec2, snapped: Vec2, radius: f32) -> DrawingNode {
        if let Some(v) = nearest_vertex_within(map, snapped, radius) {
            if let Some(pos) = map.vertex_pos(v) {
                return DrawingNode { raw, pos, on: Anchor::Vertex(v) };
            }
        }
        if let Some(e) = nearest_edge_under_point(map, snapped, radius, None) {
            if let Some((a, b)) = map.edge_points(e) {
                let (pos, _) = closest_point_on_segment(snapped, a, b);
                return DrawingNode { raw, pos, on: Anchor::Edge(e) };
            }
        }
        DrawingNode {
            raw,
            pos: snapped,
            on: Anchor::Sector(point_in_sector(map, snapped)),
        }
    }

    #[inline]
    pub fn on_geometry(&self) -> bool {
        !matches!(self.on, Anchor::Sector(_))
    }
}

/// Verdict on a tentative drawing line, from the last node to a new one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LineCheck {
    Ok,
    HitEdgeOrVertex,
    AlongEdge,
    CrossesEdges,
    CrossesDrawing,
    WaywardSector,
}

impl fmt::Display for LineCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LineCheck::Ok => "ok",
            LineCheck::HitEdgeOrVertex => "the line passes through an existing vertex",
            LineCheck::AlongEdge => "the line goes along an existing edge",
            LineCheck::CrossesEdges => "the line crosses existing edges",
            LineCheck::CrossesDrawing => "the line crosses the drawing",
            LineCheck::WaywardSector => "the line goes out of the sector it is being drawn on",
        };
        f.write_str(s)
    }
}

/// Every sector slot (void included) around a node.
pub fn sectors_touched(map: &AreaMap, node: &DrawingNode) -> BTreeSet<Option<SectorId>> {
    let mut out = BTreeSet::new();
    match node.on {
        Anchor::Vertex(v) => {
            if let Some(vx) = map.vertex(v) {
                for &e in &vx.edges {
                    if let Some(ed) = map.edge(e) {
                        out.extend(ed.sectors);
                    }
                }
            }
        }
        Anchor::Edge(e) => {
            if let Some(ed) = map.edge(e) {
                out.extend(ed.sectors);
            }
        }
        Anchor::Sector(s) => {
            out.insert(s);
        }
    }
    out
}

/// The existing edge a straight line between two nodes would run along.
pub fn traversed_edge(map: &AreaMap, a: &DrawingNode, b: &DrawingNode) -> Option<EdgeId> {
    match (a.on, b.on) {
        (Anchor::Vertex(x), Anchor::Vertex(y)) => map.edge_between(x, y),
        (Anchor::Vertex(x), Anchor::Edge(e)) | (Anchor::Edge(e), Anchor::Vertex(x)) => {
            map.edge(e).filter(|ed| ed.has_vertex(x)).map(|_| e)
        }
        (Anchor::Edge(e1), Anchor::Edge(e2)) if e1 == e2 => Some(e1),
        _ => None,
    }
}

#[inline]
pub fn nodes_traversable(map: &AreaMap, a: &DrawingNode, b: &DrawingNode) -> bool {
    traversed_edge(map, a, b).is_some()
}

/// Checks the line from the last node of `nodes` to `next`.
///
/// `closing` is set when `next` is the first node coming back around to
/// close a sector outline.
pub fn check_drawing_line(
    map: &AreaMap,
    nodes: &[DrawingNode],
    next: &DrawingNode,
    closing: bool,
) -> LineCheck {
    let Some(prev) = nodes.last() else {
        return LineCheck::Ok;
    };
    // an outline may close along an existing edge
    let along = traversed_edge(map, prev, next);
    if along.is_some() && !closing {
        return LineCheck::AlongEdge;
    }
    let (a, b) = (prev.pos, next.pos);
    let near_end = |p: Vec2| p.dist(a) <= EPS_ON_LINE || p.dist(b) <= EPS_ON_LINE;

    for v in map.vertex_ids() {
        if Anchor::Vertex(v) == prev.on || Anchor::Vertex(v) == next.on {
            continue;
        }
        let Some(p) = map.vertex_pos(v) else { continue };
        if !near_end(p) && dist_point_to_seg_sq(p, a, b) <= EPS_ON_LINE * EPS_ON_LINE {
            return LineCheck::HitEdgeOrVertex;
        }
    }

    for e in map.edge_ids() {
        if Some(e) == along {
            continue;
        }
        let Some((c, d)) = map.edge_points(e) else { continue };
        if let Some(x) = segments_intersect(a, b, c, d) {
            if !near_end(x) {
                return LineCheck::CrossesEdges;
            }
        }
    }

    if !closing {
        let repeats = nodes.iter().any(|n| {
            n.pos.dist(b) <= EPS_POS || (matches!(next.on, Anchor::Vertex(_)) && n.on == next.on)
        });
        if repeats {
            return LineCheck::CrossesDrawing;
        }
    }
    for w in nodes.windows(2) {
        if let Some(x) = segments_intersect(a, b, w[0].pos, w[1].pos) {
            if !(closing && x.dist(b) <= EPS_ON_LINE) {
                return LineCheck::CrossesDrawing;
            }
        }
    }

    let mut common = sectors_touched(map, next);
    for n in nodes {
        let here = sectors_touched(map, n);
        common.retain(|s| here.contains(s));
        if common.is_empty() {
            return LineCheck::WaywardSector;
        }
    }
    LineCheck::Ok
}

fn rightmost_vertex(map: &AreaMap, s: SectorId) -> Option<Vec2> {
    let mut best: Option<Vec2> = None;
    for &e in &map.sector(s)?.edges {
        let Some((a, b)) = map.edge_points(e) else { continue };
        for p in [a, b] {
            let better = best.map_or(true, |q| p.x > q.x || (p.x == q.x && p.y < q.y));
            if better {
                best = Some(p);
            }
        }
    }
    best
}

/// Sector shared by every node. Several candidates are narrowed down by
/// skipping the void, then by taking the sector whose rightmost vertex is
/// furthest left.
pub fn common_sector(map: &AreaMap, nodes: &[DrawingNode]) -> EditResult<Option<SectorId>> {
    let mut iter = nodes.iter();
    let Some(first) = iter.next() else {
        return Err(EditError::AmbiguousParent);
    };
    let mut common = sectors_touched(map, first);
    for n in iter {
        let here = sectors_touched(map, n);
        common.retain(|s| here.contains(s));
    }
    match common.len() {
        0 => Err(EditError::AmbiguousParent),
        1 => Ok(common.into_iter().next().flatten()),
        _ => {
            let mut best: Option<(SectorId, f32)> = None;
            for s in common.into_iter().flatten() {
                let Some(rv) = rightmost_vertex(map, s) else { continue };
                if best.map_or(true, |(_, bx)| rv.x < bx) {
                    best = Some((s, rv.x));
                }
            }
            Ok(best.map(|(s, _)| s))
        }
    }
}

/// The sector a newly drawn outline takes its area from.
pub fn drawing_outer_sector(map: &AreaMap, nodes: &[DrawingNode]) -> EditResult<Option<SectorId>> {
    if let Some(n) = nodes.iter().find(|n| !n.on_geometry()) {
        if let Anchor::Sector(s) = n.on {
            return Ok(s);
        }
    }
    let count = nodes.len();
    for i in 0..count {
        let (a, b) = (&nodes[i], &nodes[(i + 1) % count]);
        if !nodes_traversable(map, a, b) {
            return Ok(point_in_sector(map, a.pos.midpoint(b.pos)));
        }
    }
    common_sector(map, nodes)
}

/// Creates (or finds) a vertex for every node, splitting edges as needed.
fn materialize(map: &mut AreaMap, nodes: &[DrawingNode]) -> EditResult<Vec<VertexId>> {
    let mut nodes = nodes.to_vec();
    let mut out = Vec::with_capacity(nodes.len());
    for i in 0..nodes.len() {
        let node = nodes[i];
        let v = match node.on {
            Anchor::Vertex(v) => {
                if map.vertex(v).is_none() {
                    return Err(EditError::InvalidId { kind: "vertex", id: v.0 });
                }
                v
            }
            Anchor::Edge(e) => {
                let (nv, ne) = split_edge(map, e, node.pos)?;
                // Later nodes on the same edge may now sit on its second half.
                for later in nodes[i + 1..].iter_mut() {
                    if later.on != Anchor::Edge(e) {
                        continue;
                    }
                    let d_old = map.edge_points(e).map(|(a, b)| dist_point_to_seg_sq(later.pos, a, b));
                    let d_new = map.edge_points(ne).map(|(a, b)| dist_point_to_seg_sq(later.pos, a, b));
                    if let (Some(o), Some(n)) = (d_old, d_new) {
                        if n < o {
                            later.on = Anchor::Edge(ne);
                        }
                    }
                }
                nv
            }
            Anchor::Sector(_) => map.add_vertex(node.pos),
        };
        out.push(v);
    }
    Ok(out)
}

fn positions(map: &AreaMap, verts: &[VertexId]) -> EditResult<Vec<Vec2>> {
    verts
        .iter()
        .map(|&v| map.vertex_pos(v).ok_or(EditError::InvalidId { kind: "vertex", id: v.0 }))
        .collect()
}

/// Hands edges of `outer` lying inside `new_sector` over to `new_sector`.
fn reparent_inner_edges(
    map: &mut AreaMap,
    new_sector: SectorId,
    outer: Option<SectorId>,
    boundary: &BTreeSet<EdgeId>,
) -> EditResult<usize> {
    let candidates: Vec<EdgeId> = match outer {
        Some(o) => map.sector(o).map(|s| s.edges.clone()).unwrap_or_default(),
        None => map
            .edge_ids()
            .filter(|&e| map.edge(e).map_or(false, |ed| ed.has_sector(None)))
            .collect(),
    };
    let ring: BTreeSet<VertexId> = boundary
        .iter()
        .filter_map(|&e| map.edge(e))
        .flat_map(|ed| ed.vertices)
        .collect();
    // frozen before any edge moves; the new sector's edge list grows below
    let outline: Vec<(Vec2, Vec2)> = boundary.iter().filter_map(|&e| map.edge_points(e)).collect();
    let within = |p: Vec2| point_in_segments_evenodd(p, outline.iter().copied());
    let mut moved = 0;
    for e in candidates {
        if boundary.contains(&e) {
            continue;
        }
        let Some(edge) = map.edge(e).cloned() else { continue };
        let Some((a, b)) = map.edge_points(e) else { continue };
        let inside = |v: VertexId, p: Vec2| ring.contains(&v) || within(p);
        if !(within(a.midpoint(b))
            && inside(edge.vertices[0], a)
            && inside(edge.vertices[1], b))
        {
            continue;
        }
        for side in 0..2 {
            if edge.sectors[side] == outer {
                map.connect_edge_to_sector(e, side, Some(new_sector))?;
            }
        }
        moved += 1;
    }
    Ok(moved)
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SectorCreation {
    pub sector: SectorId,
    pub outer: Option<SectorId>,
    pub edges: Vec<EdgeId>,
}

/// Builds a new sector from a closed outline of at least three nodes.
///
/// Nothing is changed when this fails.
pub fn create_sector(map: &mut AreaMap, nodes: &[DrawingNode]) -> EditResult<SectorCreation> {
    if nodes.len() < 3 {
        return Err(degenerate("a sector needs at least three points"));
    }
    let drawn: Vec<Vec2> = nodes.iter().map(|n| n.pos).collect();
    if signed_area(&drawn).abs() <= EPS_SECTOR_AREA {
        return Err(degenerate("the shape has no area"));
    }
    map.with_rollback(|map| {
        let outer = drawing_outer_sector(map, nodes)?;
        let verts = materialize(map, nodes)?;
        if verts.iter().collect::<BTreeSet<_>>().len() != verts.len() {
            return Err(degenerate("the shape touches itself"));
        }
        let ccw = is_counter_clockwise(&positions(map, &verts)?);
        let sector = map.add_sector(outer);

        let count = verts.len();
        let mut edges = Vec::with_capacity(count);
        for i in 0..count {
            let (u, w) = (verts[i], verts[(i + 1) % count]);
            let e = match map.edge_between(u, w) {
                Some(e) => e,
                None => {
                    let e = map.add_edge(u, w)?;
                    // new edges start void on both sides; the far side faces the outer sector
                    let far = map.edge(e).map_or(1, |ed| 1 - ed.side_facing(u, ccw));
                    map.connect_edge_to_sector(e, far, outer)?;
                    e
                }
            };
            let inner = map
                .edge(e)
                .map(|ed| ed.side_facing(u, ccw))
                .ok_or(EditError::InvalidId { kind: "edge", id: e.0 })?;
            map.connect_edge_to_sector(e, inner, Some(sector))?;
            edges.push(e);
        }

        map.update_sector_bbox(sector);
        let boundary: BTreeSet<EdgeId> = edges.iter().copied().collect();
        let moved = reparent_inner_edges(map, sector, outer, &boundary)?;
        if let Some(o) = outer {
            map.update_sector_bbox(o);
        }
        info!(sector = sector.0, outer = ?outer, edges = edges.len(), reparented = moved, "created sector");
        Ok(SectorCreation { sector, outer, edges })
    })
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SectorSplit {
    pub new_sector: SectorId,
    pub working: Option<SectorId>,
    pub cut_edges: Vec<EdgeId>,
}

/// Splits the sector a cut runs through. The cut starts and ends on the
/// sector's border; the part enclosed by the cut and one stretch of border
/// becomes a new sector.
///
/// Nothing is changed when this fails.
pub fn split_sector(map: &mut AreaMap, nodes: &[DrawingNode]) -> EditResult<SectorSplit> {
    let count = nodes.len();
    if count < 2 {
        return Err(invalid_split("a cut needs at least two points"));
    }
    if !nodes[0].on_geometry() || !nodes[count - 1].on_geometry() {
        return Err(invalid_split("a cut must start and end on the sector's border"));
    }
    map.with_rollback(|map| {
        let working = point_in_sector(map, nodes[0].pos.midpoint(nodes[1].pos));
        let verts = materialize(map, nodes)?;
        if verts.iter().collect::<BTreeSet<_>>().len() != verts.len() {
            return Err(invalid_split("the cut touches itself"));
        }
        if count == 2 && map.edge_between(verts[0], verts[1]).is_some() {
            return Err(invalid_split("the cut runs along an existing edge"));
        }
        let (begin, checkpoint) = (verts[count - 1], verts[0]);
        let arrival = map
            .vertex_pos(verts[count - 2])
            .ok_or(EditError::InvalidId { kind: "vertex", id: verts[count - 2].0 })?;
        let traversal = traverse_for_split(map, working, begin, checkpoint, arrival);
        let (chain, side) = traversal
            .choose(map, &verts)
            .map_err(EditError::InvalidSplit)?;
        let chain = chain.clone();
        // interior is on the right of the walk for a right-hand chain
        let left = side == ChainSide::Left;
        debug!(working = ?working, chain = chain.edges.len(), ?side, "split chain chosen");

        let new_sector = map.add_sector(working);
        let mut cut_edges = Vec::with_capacity(count - 1);
        for i in 0..count - 1 {
            let (u, w) = (verts[i], verts[i + 1]);
            let e = map.add_edge(u, w)?;
            let inner = map.edge(e).map_or(0, |ed| ed.side_facing(u, left));
            map.connect_edge_to_sector(e, inner, Some(new_sector))?;
            map.connect_edge_to_sector(e, 1 - inner, working)?;
            cut_edges.push(e);
        }
        for (k, &e) in chain.edges.iter().enumerate() {
            let u = chain.vertices[k];
            let inner = map
                .edge(e)
                .map(|ed| ed.side_facing(u, left))
                .ok_or(EditError::InvalidId { kind: "edge", id: e.0 })?;
            map.connect_edge_to_sector(e, inner, Some(new_sector))?;
        }

        map.update_sector_bbox(new_sector);
        let boundary: BTreeSet<EdgeId> = cut_edges.iter().chain(chain.edges.iter()).copied().collect();
        reparent_inner_edges(map, new_sector, working, &boundary)?;
        if let Some(w) = working {
            map.update_sector_bbox(w);
        }
        info!(new_sector = new_sector.0, working = ?working, "split sector");
        Ok(SectorSplit { new_sector, working, cut_edges })
    })
}
