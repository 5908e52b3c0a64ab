use crate::error::{EditError, EditResult};
use crate::geometry::limits;
use crate::model::{
    EdgeId, MobCategory, MobGen, PathStop, SectorId, SectorType, Vec2, VertexId,
};
use crate::AreaMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, warn};

const FORMAT_VERSION: u32 = 1;

fn default_brightness() -> u8 {
    255
}

#[derive(Serialize, Deserialize)]
struct VertexSer {
    x: f32,
    y: f32,
}

#[derive(Serialize, Deserialize)]
struct EdgeSer {
    a: u32,
    b: u32,
    /// Sector index per side, `null` for the void.
    sectors: [Option<u32>; 2],
}

#[derive(Serialize, Deserialize)]
struct SectorSer {
    #[serde(default)]
    z: f32,
    #[serde(default)]
    texture: String,
    #[serde(default)]
    kind: SectorType,
    #[serde(default = "default_brightness")]
    brightness: u8,
    #[serde(default)]
    bottomless_pit: bool,
    #[serde(default)]
    fade: bool,
}

#[derive(Serialize, Deserialize)]
struct MobSer {
    x: f32,
    y: f32,
    #[serde(default)]
    category: MobCategory,
    #[serde(default)]
    radius: f32,
}

#[derive(Serialize, Deserialize)]
struct PathStopSer {
    x: f32,
    y: f32,
    #[serde(default)]
    links: Vec<u32>,
}

#[derive(Serialize, Deserialize)]
struct Doc {
    #[serde(default)]
    version: u32,
    vertices: Vec<VertexSer>,
    edges: Vec<EdgeSer>,
    #[serde(default)]
    sectors: Vec<SectorSer>,
    #[serde(default)]
    mobs: Vec<MobSer>,
    #[serde(default)]
    path_stops: Vec<PathStopSer>,
}

/// Serializes the live entities. Indices are compacted: the document never
/// contains holes left by deleted entities.
pub fn to_json_impl(map: &AreaMap) -> Value {
    let mut vertex_index: HashMap<VertexId, u32> = HashMap::new();
    let mut vertices = Vec::new();
    for v in map.vertex_ids() {
        let Some(p) = map.vertex_pos(v) else { continue };
        vertex_index.insert(v, vertices.len() as u32);
        vertices.push(VertexSer { x: p.x, y: p.y });
    }

    let mut sector_index: HashMap<SectorId, u32> = HashMap::new();
    let mut sectors = Vec::new();
    for s in map.sector_ids() {
        let Some(sec) = map.sector(s) else { continue };
        sector_index.insert(s, sectors.len() as u32);
        sectors.push(SectorSer {
            z: sec.z,
            texture: sec.texture.clone(),
            kind: sec.kind,
            brightness: sec.brightness,
            bottomless_pit: sec.is_bottomless_pit,
            fade: sec.fade,
        });
    }

    let mut edges = Vec::new();
    for e in map.edge_ids() {
        let Some(edge) = map.edge(e) else { continue };
        let (Some(&a), Some(&b)) = (
            vertex_index.get(&edge.vertices[0]),
            vertex_index.get(&edge.vertices[1]),
        ) else {
            continue;
        };
        let side = |s: Option<SectorId>| s.and_then(|s| sector_index.get(&s).copied());
        edges.push(EdgeSer {
            a,
            b,
            sectors: [side(edge.sectors[0]), side(edge.sectors[1])],
        });
    }

    let mobs = map
        .mobs()
        .iter()
        .map(|m| MobSer {
            x: m.pos.x,
            y: m.pos.y,
            category: m.category,
            radius: m.radius,
        })
        .collect();
    let path_stops = map
        .path_stops()
        .iter()
        .map(|p| PathStopSer {
            x: p.pos.x,
            y: p.pos.y,
            links: p.links.clone(),
        })
        .collect();

    serde_json::to_value(Doc {
        version: FORMAT_VERSION,
        vertices,
        edges,
        sectors,
        mobs,
        path_stops,
    })
    .unwrap_or(Value::Null)
}

fn check_point(what: &str, i: usize, x: f32, y: f32) -> EditResult<Vec2> {
    if limits::in_coord_bounds(x) && limits::in_coord_bounds(y) {
        Ok(Vec2::new(x, y))
    } else {
        Err(EditError::Limits(format!("{what} {i} is out of bounds")))
    }
}

/// Builds a map from a document.
///
/// Size caps and coordinate bounds reject the whole document. Dangling
/// references are repaired instead: edges naming missing vertices are
/// dropped, out-of-range sector indices become the void, bad path links are
/// dropped, and entities left with no edge are pruned.
pub fn from_json_impl(v: Value) -> EditResult<AreaMap> {
    let doc: Doc = serde_json::from_value(v)?;
    if doc.version > FORMAT_VERSION {
        return Err(EditError::Limits(format!("unknown format version {}", doc.version)));
    }
    let caps = [
        ("vertices", doc.vertices.len(), limits::MAX_VERTICES),
        ("edges", doc.edges.len(), limits::MAX_EDGES),
        ("sectors", doc.sectors.len(), limits::MAX_SECTORS),
        ("mobs", doc.mobs.len(), limits::MAX_MOBS),
        ("path stops", doc.path_stops.len(), limits::MAX_PATH_STOPS),
    ];
    for (what, n, cap) in caps {
        if n > cap {
            return Err(EditError::Limits(format!("too many {what}: {n} > {cap}")));
        }
    }

    let mut map = AreaMap::new();
    for (i, vs) in doc.vertices.iter().enumerate() {
        map.add_vertex(check_point("vertex", i, vs.x, vs.y)?);
    }

    let mut sector_ids = Vec::with_capacity(doc.sectors.len());
    for (i, ss) in doc.sectors.into_iter().enumerate() {
        if ss.texture.len() > limits::MAX_TEXTURE_NAME {
            return Err(EditError::Limits(format!("sector {i} has an oversized texture name")));
        }
        if !ss.z.is_finite() {
            return Err(EditError::Limits(format!("sector {i} has a non-finite height")));
        }
        let s = map.add_sector(None);
        if let Some(sec) = map.sector_mut(s) {
            sec.z = ss.z;
            sec.texture = ss.texture;
            sec.kind = ss.kind;
            sec.brightness = ss.brightness;
            sec.is_bottomless_pit = ss.bottomless_pit;
            sec.fade = ss.fade;
        }
        sector_ids.push(s);
    }

    let vertex_count = doc.vertices.len() as u32;
    let mut dropped = 0usize;
    for es in &doc.edges {
        if es.a >= vertex_count || es.b >= vertex_count || es.a == es.b {
            dropped += 1;
            continue;
        }
        let (a, b) = (VertexId(es.a), VertexId(es.b));
        if map.edge_between(a, b).is_some() {
            dropped += 1;
            continue;
        }
        let e: EdgeId = map.add_edge(a, b)?;
        for side in 0..2 {
            let s = es.sectors[side].and_then(|i| sector_ids.get(i as usize).copied());
            if s.is_none() && es.sectors[side].is_some() {
                warn!(edge = e.0, side, "sector index out of range, using the void");
            }
            map.connect_edge_to_sector(e, side, s)?;
        }
    }
    if dropped > 0 {
        warn!(dropped, "dropped edges with bad vertex references");
    }

    for (i, ms) in doc.mobs.iter().enumerate() {
        let pos = check_point("mob", i, ms.x, ms.y)?;
        let radius = if ms.radius.is_finite() && ms.radius >= 0.0 { ms.radius } else { 0.0 };
        map.mobs.push(MobGen { pos, category: ms.category, radius });
    }
    let stop_count = doc.path_stops.len() as u32;
    for (i, ps) in doc.path_stops.into_iter().enumerate() {
        let pos = check_point("path stop", i, ps.x, ps.y)?;
        let mut links: Vec<u32> = Vec::with_capacity(ps.links.len());
        for l in ps.links {
            if l < stop_count && l != i as u32 && !links.contains(&l) {
                links.push(l);
            }
        }
        map.path_stops.push(PathStop { pos, links });
    }

    let pruned = map.prune_orphans();
    let live: Vec<SectorId> = map.sector_ids().collect();
    for s in live {
        map.update_sector_bbox(s);
    }
    debug!(
        vertices = map.vertex_count(),
        edges = map.edge_count(),
        sectors = map.sector_count(),
        pruned,
        "map loaded"
    );
    Ok(map)
}
