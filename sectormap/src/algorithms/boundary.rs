//! Walking sector boundaries: loop derivation and split-path tracing.

use crate::algorithms::winding::signed_area;
use crate::geometry::math::ccw_diff;
use crate::geometry::tolerance::{EPS_POS, EPS_SECTOR_AREA};
use crate::model::{EdgeId, SectorId, Vec2, VertexId};
use crate::AreaMap;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// Why a sector's edges do not form closed loops.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "defect", rename_all = "snake_case")]
pub enum SectorDefect {
    NoEdges,
    InvalidEdge { edge: EdgeId },
    LoneEdge { edge: EdgeId },
    NotClosed { vertex: VertexId },
    SelfIntersecting { edges: (EdgeId, EdgeId) },
}

impl fmt::Display for SectorDefect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SectorDefect::NoEdges => write!(f, "it has no edges"),
            SectorDefect::InvalidEdge { edge } => write!(f, "{edge} points at a missing vertex"),
            SectorDefect::LoneEdge { edge } => write!(f, "{edge} has the sector on both sides"),
            SectorDefect::NotClosed { vertex } => write!(f, "its border is open at {vertex}"),
            SectorDefect::SelfIntersecting { edges } => {
                write!(f, "its border crosses itself ({} and {})", edges.0, edges.1)
            }
        }
    }
}

/// Picks the edge to follow out of `v`.
///
/// `back` is the direction pointing back where the walk came from. Sweeping
/// counter-clockwise from it, the first edge found is the sharpest right turn
/// and the last one the sharpest left turn. Only edges accepted by `usable`
/// and different from `came_by` are candidates.
pub fn find_trace_edge(
    map: &AreaMap,
    v: VertexId,
    back: f32,
    rightmost: bool,
    came_by: Option<EdgeId>,
    usable: impl Fn(EdgeId) -> bool,
) -> Option<(EdgeId, VertexId)> {
    let pos = map.vertex_pos(v)?;
    let mut best: Option<(EdgeId, VertexId, f32)> = None;
    for &e in &map.vertex(v)?.edges {
        if Some(e) == came_by || !usable(e) {
            continue;
        }
        let Some(edge) = map.edge(e) else { continue };
        let w = edge.other_vertex(v);
        let Some(wpos) = map.vertex_pos(w) else { continue };
        let d = ccw_diff(back, pos.angle_to(wpos));
        let better = match best {
            None => true,
            Some((_, _, bd)) => {
                if rightmost {
                    d < bd
                } else {
                    d > bd
                }
            }
        };
        if better {
            best = Some((e, w, d));
        }
    }
    best.map(|(e, w, _)| (e, w))
}

/// Boundary loops of `s` as vertex rings.
///
/// Loops that touch at a vertex come out as separate rings.
pub fn sector_loops(map: &AreaMap, s: SectorId) -> Result<Vec<Vec<VertexId>>, SectorDefect> {
    let sec = map.sector(s).ok_or(SectorDefect::NoEdges)?;
    if sec.edges.is_empty() {
        return Err(SectorDefect::NoEdges);
    }
    let mut degree: HashMap<VertexId, usize> = HashMap::new();
    for &e in &sec.edges {
        let edge = map.edge(e).ok_or(SectorDefect::InvalidEdge { edge: e })?;
        if !map.is_edge_valid(e) {
            return Err(SectorDefect::InvalidEdge { edge: e });
        }
        if edge.sectors[0] == edge.sectors[1] {
            return Err(SectorDefect::LoneEdge { edge: e });
        }
        for v in edge.vertices {
            *degree.entry(v).or_default() += 1;
        }
    }
    if let Some((&v, _)) = degree.iter().filter(|(_, d)| **d % 2 == 1).min_by_key(|(v, _)| **v) {
        return Err(SectorDefect::NotClosed { vertex: v });
    }

    let owned: BTreeSet<EdgeId> = sec.edges.iter().copied().collect();
    let mut unvisited = owned.clone();
    let mut loops = Vec::new();
    while let Some(&start_edge) = unvisited.iter().next() {
        unvisited.remove(&start_edge);
        let edge = map.edge(start_edge).ok_or(SectorDefect::InvalidEdge { edge: start_edge })?;
        let start = edge.vertices[0];
        let mut ring = vec![start];
        let mut prev = start;
        let mut cur = edge.vertices[1];
        let mut came_by = start_edge;
        let mut steps = 0usize;
        while cur != start {
            steps += 1;
            if steps > owned.len() {
                return Err(SectorDefect::NotClosed { vertex: cur });
            }
            ring.push(cur);
            let (Some(cp), Some(pp)) = (map.vertex_pos(cur), map.vertex_pos(prev)) else {
                return Err(SectorDefect::InvalidEdge { edge: came_by });
            };
            let next = find_trace_edge(map, cur, cp.angle_to(pp), true, Some(came_by), |e| {
                unvisited.contains(&e)
            })
            .ok_or(SectorDefect::NotClosed { vertex: cur })?;
            unvisited.remove(&next.0);
            came_by = next.0;
            prev = cur;
            cur = next.1;
        }
        loops.push(ring);
    }
    Ok(loops)
}

/// A path along a sector boundary, `vertices[0]` being where it started.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TracedChain {
    pub vertices: Vec<VertexId>,
    pub edges: Vec<EdgeId>,
}

/// Both candidate chains from a split cut's end back to its start.
///
/// `rightmost` keeps the part of the sector on the right of the cut, walked
/// with the sharpest right turns; `leftmost` the part on the left. `None`
/// means that walk never reached the checkpoint.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SplitTraversal {
    pub rightmost: Option<TracedChain>,
    pub leftmost: Option<TracedChain>,
}

/// Which chain closes the cut into the new sector's polygon.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChainSide {
    Right,
    Left,
}

impl TracedChain {
    /// Ring made of the cut (start to end) followed by this chain back to the start.
    pub fn ring_with_cut(&self, cut: &[VertexId]) -> Vec<VertexId> {
        let mut ring = cut.to_vec();
        if self.vertices.len() > 2 {
            ring.extend_from_slice(&self.vertices[1..self.vertices.len() - 1]);
        }
        ring
    }
}

impl SplitTraversal {
    /// Chooses the chain whose ring actually encloses the face it traced.
    ///
    /// A right-hand walk encloses its face only when the ring winds clockwise,
    /// a left-hand walk only when it winds counter-clockwise. The other ring
    /// wraps around the outside of the face (an inner sector, or the rest of
    /// the map) and must not become the new sector.
    pub fn choose(&self, map: &AreaMap, cut: &[VertexId]) -> Result<(&TracedChain, ChainSide), String> {
        let right = self
            .rightmost
            .as_ref()
            .ok_or_else(|| "the cut does not reconnect to the sector's border".to_string())?;
        let left = self
            .leftmost
            .as_ref()
            .ok_or_else(|| "the cut does not divide the sector".to_string())?;
        let winds_ccw = |chain: &TracedChain| -> Option<bool> {
            let pts: Option<Vec<Vec2>> =
                chain.ring_with_cut(cut).into_iter().map(|v| map.vertex_pos(v)).collect();
            let area = signed_area(&pts?);
            if area.abs() <= EPS_SECTOR_AREA {
                None
            } else {
                Some(area > 0.0)
            }
        };
        match (winds_ccw(right), winds_ccw(left)) {
            (Some(false), _) => Ok((right, ChainSide::Right)),
            (_, Some(true)) => Ok((left, ChainSide::Left)),
            _ => Err("neither side of the cut forms a proper sector".to_string()),
        }
    }
}

fn trace_chain(
    map: &AreaMap,
    sector: Option<SectorId>,
    begin: VertexId,
    checkpoint: VertexId,
    arrival: Vec2,
    rightmost: bool,
    max_steps: usize,
) -> Option<TracedChain> {
    let mut chain = TracedChain {
        vertices: vec![begin],
        edges: Vec::new(),
    };
    let mut cur = begin;
    let mut back_to = arrival;
    let mut came_by = None;
    for _ in 0..max_steps {
        let cp = map.vertex_pos(cur)?;
        if cp.dist_sq(back_to) <= EPS_POS * EPS_POS {
            return None;
        }
        let (e, next) = find_trace_edge(map, cur, cp.angle_to(back_to), rightmost, came_by, |e| {
            map.edge(e).map_or(false, |ed| ed.has_sector(sector))
        })?;
        chain.edges.push(e);
        chain.vertices.push(next);
        if next == checkpoint {
            return Some(chain);
        }
        if next == begin {
            return None;
        }
        back_to = cp;
        came_by = Some(e);
        cur = next;
    }
    None
}

/// Walks the boundary of `sector` from `begin` to `checkpoint` both ways.
///
/// `arrival` is the point the cut came from before reaching `begin`; the
/// walk turns relative to that incoming direction. Each walk is bounded by
/// the number of edges touching the sector.
pub fn traverse_for_split(
    map: &AreaMap,
    sector: Option<SectorId>,
    begin: VertexId,
    checkpoint: VertexId,
    arrival: Vec2,
) -> SplitTraversal {
    let max_steps = match sector {
        Some(s) => map.sector(s).map_or(0, |sec| sec.edges.len()),
        None => map.edge_ids().filter(|&e| map.edge(e).map_or(false, |ed| ed.has_sector(None))).count(),
    } + 1;
    let rightmost = trace_chain(map, sector, begin, checkpoint, arrival, true, max_steps);
    let leftmost = trace_chain(map, sector, begin, checkpoint, arrival, false, max_steps);
    SplitTraversal { rightmost, leftmost }
}
