pub mod config;
pub mod editor;
pub mod error;
pub mod history;
pub mod model;
pub mod validate;
pub mod geometry {
    pub mod intersect;
    pub mod limits;
    pub mod math;
    pub mod tolerance;
}
pub mod algorithms {
    pub mod boundary;
    pub mod drawing;
    pub mod picking;
    pub mod topology;
    pub mod winding;
}
mod json;

pub use error::{EditError, EditResult};
pub use model::{
    Edge, EdgeId, MobCategory, MobGen, PathStop, Sector, SectorId, SectorType, Vec2, Vertex,
    VertexId,
};

use algorithms::boundary::{self, SectorDefect};
use std::path::Path;
use tracing::debug;

/// The geometry store: every vertex, edge and sector of the open map.
///
/// Entities live in `Option` slots and are addressed by their slot index.
/// Freed slots are never reused while the map is loaded, so a stale handle
/// resolves to `None` instead of to some unrelated entity.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AreaMap {
    pub(crate) vertices: Vec<Option<Vertex>>, // id is index
    pub(crate) edges: Vec<Option<Edge>>,      // id is index
    pub(crate) sectors: Vec<Option<Sector>>,  // id is index
    pub(crate) mobs: Vec<MobGen>,
    pub(crate) path_stops: Vec<PathStop>,
    pub(crate) geom_ver: u64,
}

fn remove_id<T: PartialEq>(list: &mut Vec<T>, id: T) {
    list.retain(|x| *x != id);
}

fn push_unique<T: PartialEq>(list: &mut Vec<T>, id: T) {
    if !list.contains(&id) {
        list.push(id);
    }
}

impl AreaMap {
    pub fn new() -> Self {
        AreaMap {
            geom_ver: 1,
            ..Default::default()
        }
    }
    pub fn geom_version(&self) -> u64 {
        self.geom_ver
    }
    pub(crate) fn bump(&mut self) {
        self.geom_ver = self.geom_ver.wrapping_add(1);
    }

    // Vertices
    pub fn add_vertex(&mut self, p: Vec2) -> VertexId {
        let id = VertexId(self.vertices.len() as u32);
        self.vertices.push(Some(Vertex {
            pos: p,
            edges: Vec::new(),
        }));
        self.bump();
        id
    }
    pub fn vertex(&self, id: VertexId) -> Option<&Vertex> {
        self.vertices.get(id.index()).and_then(|v| v.as_ref())
    }
    pub fn vertex_pos(&self, id: VertexId) -> Option<Vec2> {
        self.vertex(id).map(|v| v.pos)
    }
    pub(crate) fn set_vertex_pos(&mut self, id: VertexId, p: Vec2) -> bool {
        match self.vertices.get_mut(id.index()).and_then(|v| v.as_mut()) {
            Some(v) => {
                v.pos = p;
                self.bump();
                true
            }
            None => false,
        }
    }
    pub(crate) fn remove_vertex_slot(&mut self, id: VertexId) {
        if let Some(slot) = self.vertices.get_mut(id.index()) {
            *slot = None;
            self.bump();
        }
    }
    pub fn vertex_count(&self) -> usize {
        self.vertices.iter().filter(|v| v.is_some()).count()
    }
    pub fn vertex_ids(&self) -> impl Iterator<Item = VertexId> + '_ {
        self.vertices
            .iter()
            .enumerate()
            .filter(|(_, v)| v.is_some())
            .map(|(i, _)| VertexId(i as u32))
    }

    // Edges
    pub fn add_edge(&mut self, a: VertexId, b: VertexId) -> EditResult<EdgeId> {
        if a == b {
            return Err(error::degenerate("edge endpoints must differ"));
        }
        if self.vertex(a).is_none() {
            return Err(EditError::InvalidId { kind: "vertex", id: a.0 });
        }
        if self.vertex(b).is_none() {
            return Err(EditError::InvalidId { kind: "vertex", id: b.0 });
        }
        let id = EdgeId(self.edges.len() as u32);
        self.edges.push(Some(Edge {
            vertices: [a, b],
            sectors: [None, None],
        }));
        for v in [a, b] {
            if let Some(Some(vx)) = self.vertices.get_mut(v.index()) {
                push_unique(&mut vx.edges, id);
            }
        }
        self.bump();
        Ok(id)
    }
    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(id.index()).and_then(|e| e.as_ref())
    }
    /// Endpoint positions; `None` when the edge or one of its vertices is gone.
    pub fn edge_points(&self, id: EdgeId) -> Option<(Vec2, Vec2)> {
        let e = self.edge(id)?;
        Some((self.vertex_pos(e.vertices[0])?, self.vertex_pos(e.vertices[1])?))
    }
    pub fn is_edge_valid(&self, id: EdgeId) -> bool {
        self.edge_points(id).is_some()
    }
    pub fn edge_count(&self) -> usize {
        self.edges.iter().filter(|e| e.is_some()).count()
    }
    pub fn edge_ids(&self) -> impl Iterator<Item = EdgeId> + '_ {
        self.edges
            .iter()
            .enumerate()
            .filter(|(_, e)| e.is_some())
            .map(|(i, _)| EdgeId(i as u32))
    }
    pub fn edge_between(&self, a: VertexId, b: VertexId) -> Option<EdgeId> {
        let va = self.vertex(a)?;
        va.edges
            .iter()
            .copied()
            .find(|&e| self.edge(e).map_or(false, |ed| ed.other_vertex(a) == b && ed.has_vertex(a)))
    }

    /// Put `sector` on one side of `e`, keeping sector edge lists in sync.
    pub fn connect_edge_to_sector(
        &mut self,
        e: EdgeId,
        side: usize,
        sector: Option<SectorId>,
    ) -> EditResult<()> {
        if let Some(s) = sector {
            if self.sector(s).is_none() {
                return Err(EditError::InvalidId { kind: "sector", id: s.0 });
            }
        }
        let edge = self
            .edges
            .get_mut(e.index())
            .and_then(|x| x.as_mut())
            .ok_or(EditError::InvalidId { kind: "edge", id: e.0 })?;
        let old = edge.sectors[side];
        if old == sector {
            return Ok(());
        }
        edge.sectors[side] = sector;
        let other = edge.sectors[1 - side];
        if let Some(o) = old {
            if other != Some(o) {
                if let Some(Some(sec)) = self.sectors.get_mut(o.index()) {
                    remove_id(&mut sec.edges, e);
                }
            }
        }
        if let Some(s) = sector {
            if let Some(Some(sec)) = self.sectors.get_mut(s.index()) {
                push_unique(&mut sec.edges, e);
            }
        }
        self.bump();
        Ok(())
    }

    /// Re-point endpoint `end` of `e` at `v`, keeping vertex edge lists in sync.
    pub fn connect_edge_to_vertex(&mut self, e: EdgeId, end: usize, v: VertexId) -> EditResult<()> {
        if self.vertex(v).is_none() {
            return Err(EditError::InvalidId { kind: "vertex", id: v.0 });
        }
        let edge = self
            .edges
            .get_mut(e.index())
            .and_then(|x| x.as_mut())
            .ok_or(EditError::InvalidId { kind: "edge", id: e.0 })?;
        let old = edge.vertices[end];
        if old == v {
            return Ok(());
        }
        edge.vertices[end] = v;
        let other = edge.vertices[1 - end];
        if other != old {
            if let Some(Some(vx)) = self.vertices.get_mut(old.index()) {
                remove_id(&mut vx.edges, e);
            }
        }
        if let Some(Some(vx)) = self.vertices.get_mut(v.index()) {
            push_unique(&mut vx.edges, e);
        }
        self.bump();
        Ok(())
    }

    /// Frees the edge slot and detaches it from its vertices and sectors.
    /// Leaves now-empty vertices and sectors in place.
    pub(crate) fn unlink_edge(&mut self, e: EdgeId) -> Option<Edge> {
        let edge = self.edges.get_mut(e.index())?.take()?;
        for v in edge.vertices {
            if let Some(Some(vx)) = self.vertices.get_mut(v.index()) {
                remove_id(&mut vx.edges, e);
            }
        }
        for s in edge.sectors.into_iter().flatten() {
            if let Some(Some(sec)) = self.sectors.get_mut(s.index()) {
                remove_id(&mut sec.edges, e);
            }
        }
        self.bump();
        Some(edge)
    }

    /// Deletes an edge, then drops its endpoints and sectors if it was their last edge.
    pub fn delete_edge(&mut self, e: EdgeId) -> EditResult<()> {
        let edge = self
            .unlink_edge(e)
            .ok_or(EditError::InvalidId { kind: "edge", id: e.0 })?;
        for v in edge.vertices {
            if self.vertex(v).map_or(false, |vx| vx.edges.is_empty()) {
                self.remove_vertex_slot(v);
            }
        }
        for s in edge.sectors.into_iter().flatten() {
            if self.sector(s).map_or(false, |sec| sec.edges.is_empty()) {
                self.sectors[s.index()] = None;
            } else {
                self.update_sector_bbox(s);
            }
        }
        debug!(edge = e.0, "deleted edge");
        Ok(())
    }

    // Sectors
    /// New empty sector; copies attributes from `template` when given.
    pub fn add_sector(&mut self, template: Option<SectorId>) -> SectorId {
        let sector = template
            .and_then(|t| self.sector(t))
            .map(Sector::blank_copy)
            .unwrap_or_default();
        let id = SectorId(self.sectors.len() as u32);
        self.sectors.push(Some(sector));
        self.bump();
        id
    }
    pub fn sector(&self, id: SectorId) -> Option<&Sector> {
        self.sectors.get(id.index()).and_then(|s| s.as_ref())
    }
    /// Attribute access (z, texture, flags). Boundary edges are managed by the store.
    pub fn sector_mut(&mut self, id: SectorId) -> Option<&mut Sector> {
        self.sectors.get_mut(id.index()).and_then(|s| s.as_mut())
    }
    pub fn sector_count(&self) -> usize {
        self.sectors.iter().filter(|s| s.is_some()).count()
    }
    pub fn sector_ids(&self) -> impl Iterator<Item = SectorId> + '_ {
        self.sectors
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_some())
            .map(|(i, _)| SectorId(i as u32))
    }
    pub fn sector_bbox(&self, id: SectorId) -> Option<(f32, f32, f32, f32)> {
        self.sector(id).and_then(|s| s.bbox)
    }
    pub fn update_sector_bbox(&mut self, id: SectorId) {
        let Some(sec) = self.sector(id) else { return };
        let mut bb: Option<(f32, f32, f32, f32)> = None;
        for &e in &sec.edges {
            if let Some((a, b)) = self.edge_points(e) {
                for p in [a, b] {
                    bb = Some(match bb {
                        None => (p.x, p.y, p.x, p.y),
                        Some((x0, y0, x1, y1)) => (x0.min(p.x), y0.min(p.y), x1.max(p.x), y1.max(p.y)),
                    });
                }
            }
        }
        if let Some(sec) = self.sector_mut(id) {
            sec.bbox = bb;
        }
    }
    /// Boundary loops of a sector, derived from its edges.
    pub fn sector_polygons(&self, id: SectorId) -> Result<Vec<Vec<VertexId>>, SectorDefect> {
        boundary::sector_loops(self, id)
    }

    /// Drops vertices and sectors that no longer have any edge.
    pub fn prune_orphans(&mut self) -> usize {
        let mut removed = 0;
        for slot in self.vertices.iter_mut() {
            if slot.as_ref().map_or(false, |v| v.edges.is_empty()) {
                *slot = None;
                removed += 1;
            }
        }
        for slot in self.sectors.iter_mut() {
            if slot.as_ref().map_or(false, |s| s.edges.is_empty()) {
                *slot = None;
                removed += 1;
            }
        }
        if removed > 0 {
            self.bump();
        }
        removed
    }

    // Placement
    pub fn add_mob(&mut self, pos: Vec2, category: MobCategory, radius: f32) -> u32 {
        self.mobs.push(MobGen { pos, category, radius });
        (self.mobs.len() - 1) as u32
    }
    pub fn mobs(&self) -> &[MobGen] {
        &self.mobs
    }
    pub fn add_path_stop(&mut self, pos: Vec2) -> u32 {
        self.path_stops.push(PathStop { pos, links: Vec::new() });
        (self.path_stops.len() - 1) as u32
    }
    pub fn path_stops(&self) -> &[PathStop] {
        &self.path_stops
    }
    pub fn link_path_stops(&mut self, from: u32, to: u32) -> EditResult<()> {
        if to as usize >= self.path_stops.len() || from == to {
            return Err(EditError::InvalidId { kind: "path stop", id: to });
        }
        let stop = self
            .path_stops
            .get_mut(from as usize)
            .ok_or(EditError::InvalidId { kind: "path stop", id: from })?;
        push_unique(&mut stop.links, to);
        Ok(())
    }

    /// Runs a multi-step mutation; on error the store is restored to its prior state.
    pub fn with_rollback<T>(
        &mut self,
        f: impl FnOnce(&mut AreaMap) -> EditResult<T>,
    ) -> EditResult<T> {
        let saved = self.clone();
        match f(self) {
            Ok(v) => Ok(v),
            Err(e) => {
                debug!(error = %e, "rolled back failed edit");
                *self = saved;
                Err(e)
            }
        }
    }

    pub fn clear(&mut self) {
        self.vertices.clear();
        self.edges.clear();
        self.sectors.clear();
        self.mobs.clear();
        self.path_stops.clear();
        self.bump();
    }

    // Persistence
    pub fn to_json_value(&self) -> serde_json::Value {
        json::to_json_impl(self)
    }
    /// Replaces the whole map. On error `self` is left untouched.
    pub fn from_json_value(&mut self, v: serde_json::Value) -> EditResult<()> {
        let loaded = json::from_json_impl(v)?;
        let ver = self.geom_ver;
        *self = loaded;
        self.geom_ver = ver;
        self.bump();
        Ok(())
    }
    pub fn save_to_path(&self, path: impl AsRef<Path>) -> EditResult<()> {
        let text = serde_json::to_string_pretty(&self.to_json_value())?;
        std::fs::write(path, text)?;
        Ok(())
    }
    pub fn load_from_path(path: impl AsRef<Path>) -> EditResult<AreaMap> {
        let text = std::fs::read_to_string(path)?;
        let v: serde_json::Value = serde_json::from_str(&text)?;
        let mut map = AreaMap::new();
        map.from_json_value(v)?;
        Ok(map)
    }
}
