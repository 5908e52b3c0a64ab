//! Map problem detection.
//!
//! Checks run in a fixed order and the first problem found is reported. Each
//! check is a standalone function so it can be run on its own.

use crate::algorithms::boundary::{sector_loops, SectorDefect};
use crate::algorithms::picking::{point_in_sector, segments_intersect};
use crate::config::EditorConfig;
use crate::geometry::math::dist_point_to_seg_sq;
use crate::model::{EdgeId, MobCategory, SectorId, SectorType, Vec2, VertexId};
use crate::AreaMap;
use serde::Serialize;
use std::fmt;

/// Two non-adjacent edges crossing each other.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct EdgeIntersection {
    pub edges: (EdgeId, EdgeId),
    pub at: Vec2,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Problem {
    IntersectingEdges(EdgeIntersection),
    OverlappingVertices { a: VertexId, b: VertexId },
    MalformedSector { sector: SectorId, defect: SectorDefect },
    OrphanEdge { edge: EdgeId },
    MissingLeader,
    MobOutOfBounds { mob: u32 },
    MobInsideWall { mob: u32, edge: EdgeId },
    PathStopOutOfBounds { stop: u32 },
    LonePathStop { stop: u32 },
    PathStopsTogether { a: u32, b: u32 },
    DisconnectedGraph { unreached: u32 },
    MissingTexture { sector: SectorId },
}

impl Problem {
    pub fn title(&self) -> &'static str {
        match self {
            Problem::IntersectingEdges(_) => "Two edges cross each other!",
            Problem::OverlappingVertices { .. } => "Overlapping vertexes!",
            Problem::MalformedSector { .. } => "Malformed sector!",
            Problem::OrphanEdge { .. } => "Edge with no sectors!",
            Problem::MissingLeader => "No leader!",
            Problem::MobOutOfBounds { .. } => "Object out of bounds!",
            Problem::MobInsideWall { .. } => "Object stuck in a wall!",
            Problem::PathStopOutOfBounds { .. } => "Path stop out of bounds!",
            Problem::LonePathStop { .. } => "Lone path stop!",
            Problem::PathStopsTogether { .. } => "Two close path stops!",
            Problem::DisconnectedGraph { .. } => "Path split into multiple parts!",
            Problem::MissingTexture { .. } => "Sector with missing texture!",
        }
    }

    pub fn description(&self) -> String {
        match self {
            Problem::IntersectingEdges(i) => format!(
                "{} and {} cross at ({:.1}, {:.1}). Edges should only meet at vertexes.",
                i.edges.0, i.edges.1, i.at.x, i.at.y
            ),
            Problem::OverlappingVertices { a, b } => {
                format!("{a} and {b} are in the same spot. Merge them or move one away.")
            }
            Problem::MalformedSector { sector, defect } => {
                format!("{sector} cannot be turned into a polygon: {defect}.")
            }
            Problem::OrphanEdge { edge } => format!("{edge} has the void on both sides."),
            Problem::MissingLeader => "The area needs a leader object somewhere.".to_string(),
            Problem::MobOutOfBounds { mob } => format!("Object {mob} is not inside any sector."),
            Problem::MobInsideWall { mob, edge } => {
                format!("Object {mob} overlaps {edge}, which acts as a wall for it.")
            }
            Problem::PathStopOutOfBounds { stop } => {
                format!("Path stop {stop} is not inside any sector.")
            }
            Problem::LonePathStop { stop } => format!("Path stop {stop} has no links."),
            Problem::PathStopsTogether { a, b } => {
                format!("Path stops {a} and {b} are too close to each other.")
            }
            Problem::DisconnectedGraph { unreached } => format!(
                "Path stop {unreached} cannot be reached from the rest of the path network."
            ),
            Problem::MissingTexture { sector } => format!("{sector} has no texture."),
        }
    }

    /// World point to center the camera on, when there is one.
    pub fn focus(&self, map: &AreaMap) -> Option<Vec2> {
        let bbox_center = |s: SectorId| {
            map.sector_bbox(s)
                .map(|(x0, y0, x1, y1)| Vec2::new((x0 + x1) * 0.5, (y0 + y1) * 0.5))
        };
        match *self {
            Problem::IntersectingEdges(i) => Some(i.at),
            Problem::OverlappingVertices { a, .. } => map.vertex_pos(a),
            Problem::MalformedSector { sector, .. } | Problem::MissingTexture { sector } => {
                bbox_center(sector)
            }
            Problem::OrphanEdge { edge } => map.edge_points(edge).map(|(a, b)| a.midpoint(b)),
            Problem::MissingLeader => None,
            Problem::MobOutOfBounds { mob } | Problem::MobInsideWall { mob, .. } => {
                map.mobs.get(mob as usize).map(|m| m.pos)
            }
            Problem::PathStopOutOfBounds { stop }
            | Problem::LonePathStop { stop }
            | Problem::DisconnectedGraph { unreached: stop } => {
                map.path_stops.get(stop as usize).map(|s| s.pos)
            }
            Problem::PathStopsTogether { a, b } => {
                match (map.path_stops.get(a as usize), map.path_stops.get(b as usize)) {
                    (Some(pa), Some(pb)) => Some(pa.pos.midpoint(pb.pos)),
                    _ => None,
                }
            }
        }
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.title(), self.description())
    }
}

pub type Check = fn(&AreaMap, &EditorConfig) -> Option<Problem>;

/// Every check, in reporting order.
pub const CHECKS: &[(&str, Check)] = &[
    ("intersecting_edges", check_intersecting_edges),
    ("overlapping_vertices", check_overlapping_vertices),
    ("malformed_sectors", check_malformed_sectors),
    ("orphan_edges", check_orphan_edges),
    ("missing_leader", check_missing_leader),
    ("mobs_out_of_bounds", check_mobs_out_of_bounds),
    ("mobs_inside_walls", check_mobs_inside_walls),
    ("path_stops_out_of_bounds", check_path_stops_out_of_bounds),
    ("lone_path_stops", check_lone_path_stops),
    ("path_stops_together", check_path_stops_together),
    ("path_graph", check_path_graph),
    ("missing_textures", check_missing_textures),
];

/// First problem on the map, if any.
pub fn find_problem(map: &AreaMap, cfg: &EditorConfig) -> Option<Problem> {
    CHECKS.iter().find_map(|(_, check)| check(map, cfg))
}

/// Every crossing between non-adjacent edges, in edge id order.
pub fn intersecting_edges(map: &AreaMap) -> Vec<EdgeIntersection> {
    let edges: Vec<EdgeId> = map.edge_ids().filter(|&e| map.is_edge_valid(e)).collect();
    edge_crossings(map, &edges, usize::MAX)
}

fn edge_crossings(map: &AreaMap, edges: &[EdgeId], limit: usize) -> Vec<EdgeIntersection> {
    let mut out = Vec::new();
    for (i, &e1) in edges.iter().enumerate() {
        let (Some(ed1), Some((a1, a2))) = (map.edge(e1), map.edge_points(e1)) else { continue };
        for &e2 in &edges[i + 1..] {
            let (Some(ed2), Some((b1, b2))) = (map.edge(e2), map.edge_points(e2)) else { continue };
            if ed2.has_vertex(ed1.vertices[0]) || ed2.has_vertex(ed1.vertices[1]) {
                continue;
            }
            if let Some(at) = segments_intersect(a1, a2, b1, b2) {
                out.push(EdgeIntersection { edges: (e1.min(e2), e1.max(e2)), at });
                if out.len() >= limit {
                    return out;
                }
            }
        }
    }
    out
}

pub fn check_intersecting_edges(map: &AreaMap, _: &EditorConfig) -> Option<Problem> {
    let edges: Vec<EdgeId> = map.edge_ids().filter(|&e| map.is_edge_valid(e)).collect();
    edge_crossings(map, &edges, 1)
        .into_iter()
        .next()
        .map(Problem::IntersectingEdges)
}

pub fn check_overlapping_vertices(map: &AreaMap, _: &EditorConfig) -> Option<Problem> {
    let verts: Vec<(VertexId, Vec2)> = map
        .vertex_ids()
        .filter_map(|v| map.vertex_pos(v).map(|p| (v, p)))
        .collect();
    for (i, &(a, pa)) in verts.iter().enumerate() {
        for &(b, pb) in &verts[i + 1..] {
            if pa.x == pb.x && pa.y == pb.y {
                return Some(Problem::OverlappingVertices { a, b });
            }
        }
    }
    None
}

pub fn check_malformed_sectors(map: &AreaMap, _: &EditorConfig) -> Option<Problem> {
    for s in map.sector_ids() {
        if let Err(defect) = sector_loops(map, s) {
            return Some(Problem::MalformedSector { sector: s, defect });
        }
        let edges = map.sector(s).map(|sec| sec.edges.clone()).unwrap_or_default();
        if let Some(x) = edge_crossings(map, &edges, 1).into_iter().next() {
            return Some(Problem::MalformedSector {
                sector: s,
                defect: SectorDefect::SelfIntersecting { edges: x.edges },
            });
        }
    }
    None
}

pub fn check_orphan_edges(map: &AreaMap, _: &EditorConfig) -> Option<Problem> {
    map.edge_ids()
        .find(|&e| map.edge(e).map_or(false, |ed| ed.sectors == [None, None]))
        .map(|edge| Problem::OrphanEdge { edge })
}

pub fn check_missing_leader(map: &AreaMap, _: &EditorConfig) -> Option<Problem> {
    if map.sector_count() == 0 {
        return None;
    }
    let has_leader = map.mobs.iter().any(|m| m.category == MobCategory::Leader);
    (!has_leader).then_some(Problem::MissingLeader)
}

pub fn check_mobs_out_of_bounds(map: &AreaMap, _: &EditorConfig) -> Option<Problem> {
    map.mobs
        .iter()
        .position(|m| point_in_sector(map, m.pos).is_none())
        .map(|i| Problem::MobOutOfBounds { mob: i as u32 })
}

pub fn check_mobs_inside_walls(map: &AreaMap, cfg: &EditorConfig) -> Option<Problem> {
    for (i, mob) in map.mobs.iter().enumerate() {
        if matches!(mob.category, MobCategory::Bridge | MobCategory::Decoration) {
            continue;
        }
        let home = point_in_sector(map, mob.pos);
        let home_z = home.and_then(|s| map.sector(s)).map_or(0.0, |s| s.z);
        for e in map.edge_ids() {
            let (Some(edge), Some((a, b))) = (map.edge(e), map.edge_points(e)) else { continue };
            if dist_point_to_seg_sq(mob.pos, a, b) > mob.radius * mob.radius {
                continue;
            }
            let sides = [
                edge.sectors[0].and_then(|s| map.sector(s)),
                edge.sectors[1].and_then(|s| map.sector(s)),
            ];
            let [Some(s0), Some(s1)] = sides else {
                return Some(Problem::MobInsideWall { mob: i as u32, edge: e });
            };
            if s0.z == s1.z {
                continue;
            }
            let in_wall = !edge.has_sector(home)
                || s0.kind == SectorType::Blocking
                || s1.kind == SectorType::Blocking
                || s0.z > home_z + cfg.step_height
                || s1.z > home_z + cfg.step_height;
            if in_wall {
                return Some(Problem::MobInsideWall { mob: i as u32, edge: e });
            }
        }
    }
    None
}

pub fn check_path_stops_out_of_bounds(map: &AreaMap, _: &EditorConfig) -> Option<Problem> {
    map.path_stops
        .iter()
        .position(|s| point_in_sector(map, s.pos).is_none())
        .map(|i| Problem::PathStopOutOfBounds { stop: i as u32 })
}

pub fn check_lone_path_stops(map: &AreaMap, _: &EditorConfig) -> Option<Problem> {
    let stops = &map.path_stops;
    (0..stops.len())
        .find(|&i| {
            stops[i].links.is_empty() && !stops.iter().any(|o| o.links.contains(&(i as u32)))
        })
        .map(|i| Problem::LonePathStop { stop: i as u32 })
}

pub fn check_path_stops_together(map: &AreaMap, cfg: &EditorConfig) -> Option<Problem> {
    let stops = &map.path_stops;
    let min2 = cfg.path_stop_min_distance * cfg.path_stop_min_distance;
    for i in 0..stops.len() {
        for j in i + 1..stops.len() {
            if stops[i].pos.dist_sq(stops[j].pos) <= min2 {
                return Some(Problem::PathStopsTogether { a: i as u32, b: j as u32 });
            }
        }
    }
    None
}

/// Depth-first walk from the first stop; links count in both directions.
pub fn check_path_graph(map: &AreaMap, _: &EditorConfig) -> Option<Problem> {
    let stops = &map.path_stops;
    if stops.is_empty() {
        return None;
    }
    let mut neighbors: Vec<Vec<usize>> = vec![Vec::new(); stops.len()];
    for (i, s) in stops.iter().enumerate() {
        for &l in &s.links {
            let l = l as usize;
            if l < stops.len() {
                neighbors[i].push(l);
                neighbors[l].push(i);
            }
        }
    }
    let mut seen = vec![false; stops.len()];
    let mut stack = vec![0usize];
    while let Some(i) = stack.pop() {
        if std::mem::replace(&mut seen[i], true) {
            continue;
        }
        stack.extend(neighbors[i].iter().copied().filter(|&n| !seen[n]));
    }
    seen.iter()
        .position(|s| !s)
        .map(|i| Problem::DisconnectedGraph { unreached: i as u32 })
}

pub fn check_missing_textures(map: &AreaMap, _: &EditorConfig) -> Option<Problem> {
    map.sector_ids()
        .find(|&s| {
            map.sector(s).map_or(false, |sec| {
                !sec.is_bottomless_pit && !sec.fade && sec.texture.is_empty()
            })
        })
        .map(|sector| Problem::MissingTexture { sector })
}
