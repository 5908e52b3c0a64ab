use crate::error;
use crate::interop::{arr_f32, arr_u32, console_warn, new_obj, num, set_kv, to_js, VOID};
use crate::SectorEditor;
use js_sys::{Array, Float32Array, Uint32Array};
use sectormap::algorithms::picking::{nearest_edge_under_point, nearest_vertex_within, point_in_sector};
use sectormap::algorithms::topology::MoveOutcome;
use sectormap::config::EditorConfig;
use sectormap::editor::EditorState;
use sectormap::{AreaMap, EdgeId, EditError, MobCategory, SectorId, SectorType, Vec2, VertexId};
use serde::Deserialize;
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
pub fn set_panic_hook() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

fn finite_point(x: f32, y: f32) -> Result<Vec2, JsValue> {
    if !x.is_finite() {
        return Err(error::non_finite("x"));
    }
    if !y.is_finite() {
        return Err(error::non_finite("y"));
    }
    Ok(Vec2::new(x, y))
}

#[inline]
fn side_id(s: Option<SectorId>) -> u32 {
    s.map_or(VOID, |s| s.0)
}

fn move_outcome(o: MoveOutcome) -> JsValue {
    let obj = new_obj();
    match o {
        MoveOutcome::Moved(v) => {
            set_kv(&obj, "kind", &JsValue::from_str("moved"));
            set_kv(&obj, "vertex", &num(v.0));
        }
        MoveOutcome::MergedInto(v) => {
            set_kv(&obj, "kind", &JsValue::from_str("merged"));
            set_kv(&obj, "vertex", &num(v.0));
        }
        MoveOutcome::SplitAndMerged { edge, vertex } => {
            set_kv(&obj, "kind", &JsValue::from_str("split_and_merged"));
            set_kv(&obj, "vertex", &num(vertex.0));
            set_kv(&obj, "edge", &num(edge.0));
        }
    }
    obj.into()
}

/// Sector attributes as sent from JS; absent fields are left alone.
#[derive(Default, Deserialize)]
#[serde(default)]
struct SectorProps {
    z: Option<f32>,
    texture: Option<String>,
    kind: Option<SectorType>,
    brightness: Option<u8>,
    bottomless_pit: Option<bool>,
    fade: Option<bool>,
}

#[wasm_bindgen]
impl SectorEditor {
    #[wasm_bindgen(constructor)]
    pub fn new() -> SectorEditor {
        SectorEditor::rs_new(EditorConfig::default())
    }
    /// Editor with settings from a plain object; missing keys take defaults.
    pub fn with_config(cfg: JsValue) -> Result<SectorEditor, JsValue> {
        let cfg: EditorConfig = serde_wasm_bindgen::from_value(cfg)
            .map_err(|e| error::err("config", e.to_string(), None))?;
        cfg.validate().map_err(|e| error::from_edit(&e))?;
        Ok(SectorEditor::rs_new(cfg))
    }
    pub fn geom_version(&self) -> u64 {
        self.rs_geom_version()
    }
    pub fn state(&self) -> String {
        match self.inner.state() {
            EditorState::Idle => "idle",
            EditorState::DrawingSector => "drawing_sector",
            EditorState::DrawingCut => "drawing_cut",
        }
        .to_string()
    }
    pub fn status(&self) -> String {
        self.inner.status().to_string()
    }
    pub fn set_zoom_res(&mut self, zoom: f32) -> JsValue {
        error::wrap(self.inner.set_zoom(zoom), |_| JsValue::UNDEFINED)
    }

    // Drawing
    pub fn begin_sector_draw_res(&mut self) -> JsValue {
        error::wrap(self.inner.begin_sector_draw(), |_| JsValue::UNDEFINED)
    }
    pub fn begin_cut_draw_res(&mut self) -> JsValue {
        error::wrap(self.inner.begin_cut_draw(), |_| JsValue::UNDEFINED)
    }
    pub fn add_drawing_node(&mut self, x: f32, y: f32) -> bool {
        self.inner.add_drawing_node(Vec2::new(x, y)).is_ok()
    }
    pub fn add_drawing_node_res(&mut self, x: f32, y: f32) -> JsValue {
        let p = match finite_point(x, y) {
            Ok(p) => p,
            Err(e) => return e,
        };
        error::wrap(self.inner.add_drawing_node(p), |out| to_js(&out))
    }
    /// Positions of the nodes drawn so far, flattened `[x0, y0, x1, y1, ...]`.
    pub fn drawing_positions(&self) -> Float32Array {
        let flat: Vec<f32> = self.inner.drawing().iter().flat_map(|n| [n.pos.x, n.pos.y]).collect();
        arr_f32(&flat)
    }
    pub fn undo_drawing_node_res(&mut self) -> JsValue {
        error::wrap(self.inner.undo_drawing_node(), |_| JsValue::UNDEFINED)
    }
    pub fn cancel_drawing(&mut self) {
        self.inner.cancel_drawing();
    }
    /// Finishes whatever is being drawn. Too-short drawings give `null`.
    pub fn commit_drawing_res(&mut self) -> JsValue {
        match self.inner.state() {
            EditorState::DrawingSector => error::wrap(self.inner.commit_sector_draw(), |c| to_js(&c)),
            EditorState::DrawingCut => error::wrap(self.inner.commit_cut(), |s| to_js(&s)),
            EditorState::Idle => error::from_edit(&EditError::NotDrawing),
        }
    }

    // Vertices and edges
    pub fn move_vertex_res(&mut self, id: u32, x: f32, y: f32) -> JsValue {
        let to = match finite_point(x, y) {
            Ok(p) => p,
            Err(e) => return e,
        };
        if self.inner.map().vertex(VertexId(id)).is_none() {
            return error::invalid_id("vertex", id);
        }
        error::wrap(self.inner.move_vertex(VertexId(id), to), move_outcome)
    }
    pub fn merge_vertex_res(&mut self, id: u32, x: f32, y: f32) -> JsValue {
        let at = match finite_point(x, y) {
            Ok(p) => p,
            Err(e) => return e,
        };
        if self.inner.map().vertex(VertexId(id)).is_none() {
            return error::invalid_id("vertex", id);
        }
        error::wrap(self.inner.merge_under_cursor(VertexId(id), at), |v| num(v.0))
    }
    pub fn split_edge_res(&mut self, x: f32, y: f32) -> JsValue {
        let at = match finite_point(x, y) {
            Ok(p) => p,
            Err(e) => return e,
        };
        error::wrap(self.inner.split_edge_at(at), |v| num(v.0))
    }
    pub fn delete_edges_res(&mut self, ids: &Uint32Array) -> JsValue {
        let ids: Vec<EdgeId> = ids.to_vec().into_iter().map(EdgeId).collect();
        if let Some(bad) = ids.iter().find(|&&e| self.inner.map().edge(e).is_none()) {
            return error::invalid_id("edge", bad.0);
        }
        error::wrap(self.inner.delete_edges(&ids), |_| JsValue::UNDEFINED)
    }

    // Sectors and placement
    pub fn set_sector_props_res(&mut self, id: u32, props: JsValue) -> JsValue {
        let props: SectorProps = match serde_wasm_bindgen::from_value(props) {
            Ok(p) => p,
            Err(e) => return error::err("json_parse", e.to_string(), None),
        };
        if props.z.map_or(false, |z| !z.is_finite()) {
            return error::non_finite("z");
        }
        let res = self.inner.edit_sector(SectorId(id), |s| {
            if let Some(z) = props.z {
                s.z = z;
            }
            if let Some(t) = props.texture {
                s.texture = t;
            }
            if let Some(k) = props.kind {
                s.kind = k;
            }
            if let Some(b) = props.brightness {
                s.brightness = b;
            }
            if let Some(p) = props.bottomless_pit {
                s.is_bottomless_pit = p;
            }
            if let Some(f) = props.fade {
                s.fade = f;
            }
        });
        error::wrap(res, |_| JsValue::UNDEFINED)
    }
    pub fn add_mob_res(&mut self, x: f32, y: f32, category: &str, radius: f32) -> JsValue {
        let p = match finite_point(x, y) {
            Ok(p) => p,
            Err(e) => return e,
        };
        if !radius.is_finite() {
            return error::non_finite("radius");
        }
        let cat: MobCategory = match serde_json::from_value(serde_json::Value::from(category)) {
            Ok(c) => c,
            Err(_) => return error::invalid_category(category),
        };
        error::wrap(self.inner.add_mob(p, cat, radius), |i| num(i))
    }
    pub fn add_path_stop_res(&mut self, x: f32, y: f32) -> JsValue {
        let p = match finite_point(x, y) {
            Ok(p) => p,
            Err(e) => return e,
        };
        error::wrap(self.inner.add_path_stop(p), |i| num(i))
    }
    pub fn link_path_stops_res(&mut self, from: u32, to: u32) -> JsValue {
        error::wrap(self.inner.link_path_stops(from, to), |_| JsValue::UNDEFINED)
    }

    // History
    pub fn undo(&mut self) -> bool {
        self.inner.undo().is_ok()
    }
    pub fn undo_res(&mut self) -> JsValue {
        error::wrap(self.inner.undo(), |_| JsValue::UNDEFINED)
    }
    pub fn undo_depth(&self) -> u32 {
        self.inner.undo_depth() as u32
    }
    pub fn next_undo_name(&self) -> Option<String> {
        self.inner.next_undo_name().map(str::to_string)
    }

    // Validation
    /// The first problem of the map as `{ kind, ..., title, description, focus }`, or `null`.
    pub fn problem(&self) -> JsValue {
        let Some(p) = self.inner.problem() else {
            return JsValue::NULL;
        };
        let obj = to_js(p);
        if let Ok(o) = obj.clone().dyn_into::<js_sys::Object>() {
            set_kv(&o, "title", &JsValue::from_str(p.title()));
            set_kv(&o, "description", &JsValue::from_str(&p.description()));
            let focus = self
                .inner
                .problem_focus()
                .map_or(JsValue::NULL, |f| arr_f32(&[f.x, f.y]).into());
            set_kv(&o, "focus", &focus);
        }
        obj
    }
    pub fn find_problems(&mut self) -> JsValue {
        self.inner.find_problems();
        self.problem()
    }

    // Typed arrays getters
    pub fn get_vertex_data(&self) -> JsValue {
        let map = self.inner.map();
        let mut ids = Vec::new();
        let mut pos = Vec::new();
        for v in map.vertex_ids() {
            let Some(p) = map.vertex_pos(v) else { continue };
            ids.push(v.0);
            pos.extend([p.x, p.y]);
        }
        let obj = new_obj();
        set_kv(&obj, "ids", &arr_u32(&ids).into());
        set_kv(&obj, "positions", &arr_f32(&pos).into());
        obj.into()
    }
    /// Edge ids, endpoint pairs, and sector pairs (left, right). The void is `0xFFFFFFFF`.
    pub fn get_edge_data(&self) -> JsValue {
        let map = self.inner.map();
        let (mut ids, mut endpoints, mut sectors) = (Vec::new(), Vec::new(), Vec::new());
        for e in map.edge_ids() {
            let Some(edge) = map.edge(e) else { continue };
            ids.push(e.0);
            endpoints.extend([edge.vertices[0].0, edge.vertices[1].0]);
            sectors.extend([side_id(edge.sectors[0]), side_id(edge.sectors[1])]);
        }
        let obj = new_obj();
        set_kv(&obj, "ids", &arr_u32(&ids).into());
        set_kv(&obj, "endpoints", &arr_u32(&endpoints).into());
        set_kv(&obj, "sectors", &arr_u32(&sectors).into());
        obj.into()
    }
    pub fn get_sector_data(&self) -> JsValue {
        let map = self.inner.map();
        let (mut ids, mut z, mut bboxes) = (Vec::new(), Vec::new(), Vec::new());
        for s in map.sector_ids() {
            let Some(sec) = map.sector(s) else { continue };
            ids.push(s.0);
            z.push(sec.z);
            let (x0, y0, x1, y1) = sec.bbox.unwrap_or((f32::NAN, f32::NAN, f32::NAN, f32::NAN));
            bboxes.extend([x0, y0, x1, y1]);
        }
        let obj = new_obj();
        set_kv(&obj, "ids", &arr_u32(&ids).into());
        set_kv(&obj, "z", &arr_f32(&z).into());
        set_kv(&obj, "bboxes", &arr_f32(&bboxes).into());
        obj.into()
    }
    /// Boundary rings of a sector, each a flattened `Float32Array`.
    pub fn sector_polygons_res(&self, id: u32) -> JsValue {
        let map = self.inner.map();
        if map.sector(SectorId(id)).is_none() {
            return error::invalid_id("sector", id);
        }
        match map.sector_polygons(SectorId(id)) {
            Ok(rings) => {
                let out = Array::new();
                for ring in rings {
                    let flat: Vec<f32> = ring
                        .iter()
                        .filter_map(|&v| map.vertex_pos(v))
                        .flat_map(|p| [p.x, p.y])
                        .collect();
                    out.push(&arr_f32(&flat).into());
                }
                error::ok(out.into())
            }
            Err(defect) => error::err("malformed_sector", defect.to_string(), Some(to_js(&defect))),
        }
    }
    pub fn get_mobs(&self) -> JsValue {
        to_js(&self.inner.map().mobs())
    }
    pub fn get_path_stops(&self) -> JsValue {
        to_js(&self.inner.map().path_stops())
    }

    // Picking
    /// What lies under a point: `{ kind: 'vertex'|'edge'|'sector'|'void', id? }`.
    pub fn pick(&self, x: f32, y: f32) -> JsValue {
        let map = self.inner.map();
        let p = Vec2::new(x, y);
        let zoom = self.inner.zoom();
        let cfg = self.inner.config();
        let obj = new_obj();
        if let Some(v) = nearest_vertex_within(map, p, cfg.vertex_merge_radius / zoom) {
            set_kv(&obj, "kind", &JsValue::from_str("vertex"));
            set_kv(&obj, "id", &num(v.0));
        } else if let Some(e) = nearest_edge_under_point(map, p, cfg.edge_pick_radius / zoom, None) {
            set_kv(&obj, "kind", &JsValue::from_str("edge"));
            set_kv(&obj, "id", &num(e.0));
        } else if let Some(s) = point_in_sector(map, p) {
            set_kv(&obj, "kind", &JsValue::from_str("sector"));
            set_kv(&obj, "id", &num(s.0));
        } else {
            set_kv(&obj, "kind", &JsValue::from_str("void"));
        }
        obj.into()
    }
    pub fn pick_res(&self, x: f32, y: f32) -> JsValue {
        match finite_point(x, y) {
            Ok(_) => error::ok(self.pick(x, y)),
            Err(e) => e,
        }
    }

    // JSON + backups
    pub fn to_json(&self) -> JsValue {
        to_js(&self.inner.map().to_json_value())
    }
    pub fn from_json_res(&mut self, v: JsValue) -> JsValue {
        let val = match serde_wasm_bindgen::from_value::<serde_json::Value>(v) {
            Ok(val) => val,
            Err(e) => return error::err("json_parse", e.to_string(), None),
        };
        let mut map = AreaMap::new();
        if let Err(e) = map.from_json_value(val) {
            console_warn(&format!("map not loaded: {e}"));
            return error::from_edit(&e);
        }
        error::wrap(self.inner.open(map), |_| JsValue::UNDEFINED)
    }
    /// Periodic housekeeping; `ok(true)` when a backup was taken.
    pub fn tick_res(&mut self) -> JsValue {
        error::wrap(self.inner.tick(), JsValue::from_bool)
    }
    /// The most recent automatic backup, or `null`.
    pub fn last_backup(&self) -> JsValue {
        self.backup.last().map_or(JsValue::NULL, |doc| to_js(&doc))
    }
}

impl Default for SectorEditor {
    fn default() -> Self {
        Self::new()
    }
}
