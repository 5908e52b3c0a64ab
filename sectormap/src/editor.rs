//! The command surface: drawing state, undo bookkeeping, validation and
//! periodic backups around a single [`AreaMap`].
//!
//! Every command runs to completion before the next one. Commands that
//! change the map take a snapshot first and only hand it to the history
//! once the change succeeded, so a refused command leaves both the map and
//! the undo stack as they were.

use crate::algorithms::drawing::{
    check_drawing_line, create_sector, split_sector, DrawingNode, LineCheck, SectorCreation,
    SectorSplit,
};
use crate::algorithms::picking::{nearest_edge_under_point, nearest_vertex_except, snap_point};
use crate::algorithms::topology::{self, MoveOutcome};
use crate::config::EditorConfig;
use crate::error::{degenerate, invalid_split, EditError, EditResult};
use crate::history::{Clock, History, MonotonicClock};
use crate::model::{EdgeId, MobCategory, Sector, SectorId, Vec2, VertexId};
use crate::validate::{find_problem, Problem};
use crate::AreaMap;
use serde::Serialize;
use serde_json::Value;
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditorState {
    Idle,
    DrawingSector,
    DrawingCut,
}

impl EditorState {
    fn label(self) -> &'static str {
        match self {
            EditorState::Idle => "the current operation",
            EditorState::DrawingSector => "the sector drawing",
            EditorState::DrawingCut => "the sector cut",
        }
    }
}

/// Somewhere to put automatic backups.
pub trait BackupSink {
    fn store(&mut self, doc: &Value) -> EditResult<()>;
}

/// Writes backups to a file, through a temporary file next to it.
pub struct FileBackup {
    path: PathBuf,
}

impl FileBackup {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileBackup { path: path.into() }
    }
}

impl BackupSink for FileBackup {
    fn store(&mut self, doc: &Value) -> EditResult<()> {
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, serde_json::to_string(doc)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// Keeps backups in memory. Clones share the same slot.
#[derive(Clone, Default)]
pub struct MemoryBackup {
    slot: Rc<RefCell<(Option<Value>, usize)>>,
}

impl MemoryBackup {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn last(&self) -> Option<Value> {
        self.slot.borrow().0.clone()
    }
    /// How many backups were stored so far.
    pub fn count(&self) -> usize {
        self.slot.borrow().1
    }
}

impl BackupSink for MemoryBackup {
    fn store(&mut self, doc: &Value) -> EditResult<()> {
        let mut slot = self.slot.borrow_mut();
        slot.0 = Some(doc.clone());
        slot.1 += 1;
        Ok(())
    }
}

/// What happened to a node handed to [`Editor::add_drawing_node`].
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DrawOutcome {
    Added { nodes: usize },
    SectorCreated(SectorCreation),
    SectorSplit(SectorSplit),
}

pub struct Editor {
    map: AreaMap,
    config: EditorConfig,
    history: History,
    clock: Box<dyn Clock>,
    backup: Option<Box<dyn BackupSink>>,
    state: EditorState,
    drawing: Vec<DrawingNode>,
    zoom: f32,
    problem: Option<Problem>,
    status: String,
    last_backup: Duration,
}

impl Editor {
    pub fn new(config: EditorConfig) -> Self {
        Self::with_clock(config, Box::new(MonotonicClock::new()))
    }

    pub fn with_clock(config: EditorConfig, clock: Box<dyn Clock>) -> Self {
        let history = History::new(
            config.undo_limit,
            Duration::from_secs_f32(config.undo_debounce_secs.max(0.0)),
        );
        let last_backup = clock.now();
        Editor {
            map: AreaMap::new(),
            config,
            history,
            clock,
            backup: None,
            state: EditorState::Idle,
            drawing: Vec::new(),
            zoom: 1.0,
            problem: None,
            status: String::new(),
            last_backup,
        }
    }

    /// Replaces the open map, dropping the undo history.
    pub fn open(&mut self, map: AreaMap) -> EditResult<()> {
        self.require_idle()?;
        self.map = map;
        self.history.clear();
        self.refresh_problem();
        Ok(())
    }

    pub fn set_backup_sink(&mut self, sink: Box<dyn BackupSink>) {
        self.backup = Some(sink);
    }

    pub fn map(&self) -> &AreaMap {
        &self.map
    }
    pub fn config(&self) -> &EditorConfig {
        &self.config
    }
    pub fn state(&self) -> EditorState {
        self.state
    }
    pub fn drawing(&self) -> &[DrawingNode] {
        &self.drawing
    }
    pub fn status(&self) -> &str {
        &self.status
    }
    pub fn zoom(&self) -> f32 {
        self.zoom
    }
    pub fn undo_depth(&self) -> usize {
        self.history.len()
    }
    pub fn next_undo_name(&self) -> Option<&str> {
        self.history.next_undo_name()
    }

    pub fn set_zoom(&mut self, zoom: f32) -> EditResult<()> {
        if !zoom.is_finite() || zoom <= 0.0 {
            return Err(EditError::Config("zoom must be a positive number".into()));
        }
        self.zoom = zoom;
        Ok(())
    }

    fn merge_radius(&self) -> f32 {
        self.config.vertex_merge_radius / self.zoom
    }
    fn pick_radius(&self) -> f32 {
        self.config.edge_pick_radius / self.zoom
    }

    fn ensure_idle(&self) -> EditResult<()> {
        match self.state {
            EditorState::Idle => Ok(()),
            busy => Err(EditError::OperationInProgress(busy.label())),
        }
    }

    fn refresh_problem(&mut self) {
        self.problem = find_problem(&self.map, &self.config);
    }

    /// Like `ensure_idle`, but a refusal lands in the status line.
    fn require_idle(&mut self) -> EditResult<()> {
        self.ensure_idle().map_err(|e| self.refused(e))
    }

    fn refused(&mut self, e: EditError) -> EditError {
        warn!(error = %e, "command refused");
        self.status = e.to_string();
        e
    }

    /// Records the outcome of a command in the status line.
    fn report<T>(&mut self, res: EditResult<T>, done: impl FnOnce(&T) -> String) -> EditResult<T> {
        match res {
            Ok(v) => {
                self.status = done(&v);
                Ok(v)
            }
            Err(e) => Err(self.refused(e)),
        }
    }

    /// Runs a map change on the live map; on success the snapshot taken
    /// beforehand becomes an undo step called `name`.
    fn apply<T>(
        &mut self,
        name: &str,
        f: impl FnOnce(&mut AreaMap) -> EditResult<T>,
    ) -> EditResult<T> {
        let snapshot = self.map.clone();
        let out = self.map.with_rollback(f)?;
        let now = self.clock.now();
        self.history.commit_prepared(name, snapshot, now);
        self.refresh_problem();
        Ok(out)
    }

    // Drawing

    pub fn begin_sector_draw(&mut self) -> EditResult<()> {
        self.require_idle()?;
        self.state = EditorState::DrawingSector;
        self.drawing.clear();
        self.status = "drawing a sector".into();
        Ok(())
    }

    pub fn begin_cut_draw(&mut self) -> EditResult<()> {
        self.require_idle()?;
        self.state = EditorState::DrawingCut;
        self.drawing.clear();
        self.status = "drawing a cut".into();
        Ok(())
    }

    /// Adds a node at the world-space cursor `raw`.
    ///
    /// Sector outlines close when a node lands on the first one; cuts end on
    /// the first node after the start that lands on a vertex or edge. A node
    /// that fails the line check is refused and the drawing stays as it was.
    pub fn add_drawing_node(&mut self, raw: Vec2) -> EditResult<DrawOutcome> {
        if !raw.is_finite() {
            return Err(degenerate("cursor position is not finite"));
        }
        let radius = self.merge_radius();
        let snapped = snap_point(
            &self.map,
            raw,
            self.config.snap_mode,
            self.config.grid_interval,
            self.config.snap_threshold / self.zoom,
            None,
        );
        let node = DrawingNode::resolve(&self.map, raw, snapped, radius);
        match self.state {
            EditorState::Idle => Err(EditError::NotDrawing),
            EditorState::DrawingSector => {
                let closing = self.drawing.len() >= 3
                    && self.drawing.first().map_or(false, |f| f.pos.dist(node.pos) <= radius);
                if closing {
                    let first = self.drawing[0];
                    self.check_node(&first, true)?;
                    let created = self.commit_sector_draw()?;
                    return created
                        .map(DrawOutcome::SectorCreated)
                        .ok_or_else(|| degenerate("the outline was too short"));
                }
                self.check_node(&node, false)?;
                self.drawing.push(node);
                Ok(DrawOutcome::Added { nodes: self.drawing.len() })
            }
            EditorState::DrawingCut => {
                if self.drawing.is_empty() && !node.on_geometry() {
                    let res = Err(invalid_split("a cut must start on a vertex or an edge"));
                    return self.report(res, |_| String::new());
                }
                self.check_node(&node, false)?;
                self.drawing.push(node);
                if self.drawing.len() >= 2 && node.on_geometry() {
                    let split = self.commit_cut()?;
                    return split
                        .map(DrawOutcome::SectorSplit)
                        .ok_or_else(|| invalid_split("the cut was too short"));
                }
                Ok(DrawOutcome::Added { nodes: self.drawing.len() })
            }
        }
    }

    fn check_node(&mut self, node: &DrawingNode, closing: bool) -> EditResult<()> {
        match check_drawing_line(&self.map, &self.drawing, node, closing) {
            LineCheck::Ok => Ok(()),
            verdict => {
                debug!(%verdict, "drawing node refused");
                self.report(Err(EditError::RejectedNode(verdict)), |_| String::new())
            }
        }
    }

    pub fn undo_drawing_node(&mut self) -> EditResult<()> {
        if self.state == EditorState::Idle {
            return Err(EditError::NotDrawing);
        }
        self.drawing.pop();
        Ok(())
    }

    /// Drops the drawing in progress. The map is never touched.
    pub fn cancel_drawing(&mut self) {
        if self.state != EditorState::Idle {
            debug!(nodes = self.drawing.len(), "drawing cancelled");
        }
        self.drawing.clear();
        self.state = EditorState::Idle;
        self.status.clear();
    }

    /// Turns the current outline into a sector. Outlines of fewer than three
    /// nodes are dropped without complaint.
    pub fn commit_sector_draw(&mut self) -> EditResult<Option<SectorCreation>> {
        if self.state != EditorState::DrawingSector {
            return Err(EditError::NotDrawing);
        }
        let nodes = std::mem::take(&mut self.drawing);
        self.state = EditorState::Idle;
        if nodes.len() < 3 {
            self.status.clear();
            return Ok(None);
        }
        let texture = self.config.new_sector_texture.clone();
        let res = self.apply("new sector", |map| {
            let made = create_sector(map, &nodes)?;
            if made.outer.is_none() {
                if let Some(s) = map.sector_mut(made.sector) {
                    s.texture = texture;
                }
            }
            Ok(made)
        });
        let res = self.report(res, |c| format!("created {}", c.sector));
        if let Ok(c) = &res {
            info!(sector = c.sector.0, "sector drawn");
        }
        res.map(Some)
    }

    /// Splits the sector under the current cut. Cuts of fewer than two nodes
    /// are dropped without complaint.
    pub fn commit_cut(&mut self) -> EditResult<Option<SectorSplit>> {
        if self.state != EditorState::DrawingCut {
            return Err(EditError::NotDrawing);
        }
        let nodes = std::mem::take(&mut self.drawing);
        self.state = EditorState::Idle;
        if nodes.len() < 2 {
            self.status.clear();
            return Ok(None);
        }
        let res = self.apply("sector split", |map| split_sector(map, &nodes));
        self.report(res, |s| format!("split off {}", s.new_sector)).map(Some)
    }

    // Vertices and edges

    /// Drags `v` to `to`, merging it with what it lands on.
    pub fn move_vertex(&mut self, v: VertexId, to: Vec2) -> EditResult<MoveOutcome> {
        self.require_idle()?;
        let (merge_r, pick_r) = (self.merge_radius(), self.pick_radius());
        let res = self.apply("vertex move", |map| {
            topology::move_vertex(map, v, to, merge_r, pick_r)
        });
        self.report(res, |o| match o {
            MoveOutcome::Moved(_) => String::new(),
            MoveOutcome::MergedInto(t) => format!("merged into {t}"),
            MoveOutcome::SplitAndMerged { edge, .. } => format!("merged onto {edge}"),
        })
    }

    /// Folds `v` into the other vertex under `cursor`.
    pub fn merge_under_cursor(&mut self, v: VertexId, cursor: Vec2) -> EditResult<VertexId> {
        self.require_idle()?;
        let radius = self.merge_radius();
        let res = match nearest_vertex_except(&self.map, cursor, radius, Some(v)) {
            Some(target) => self.apply("vertex merge", |map| {
                topology::merge_vertices(map, v, target).map(|_| target)
            }),
            None => Err(degenerate("no other vertex under the cursor")),
        };
        self.report(res, |t| format!("merged into {t}"))
    }

    /// Splits the edge under `cursor`, returning the new vertex.
    pub fn split_edge_at(&mut self, cursor: Vec2) -> EditResult<VertexId> {
        self.require_idle()?;
        let res = match nearest_edge_under_point(&self.map, cursor, self.pick_radius(), None) {
            Some(e) => self.apply("edge split", |map| {
                topology::split_edge(map, e, cursor).map(|(v, _)| v)
            }),
            None => Err(degenerate("no edge under the cursor")),
        };
        self.report(res, |v| format!("added {v}"))
    }

    pub fn delete_edges(&mut self, edges: &[EdgeId]) -> EditResult<()> {
        self.require_idle()?;
        let res = self.apply("edge deletion", |map| topology::delete_edges(map, edges));
        self.report(res, |_| format!("deleted {} edge(s)", edges.len()))
    }

    /// Changes sector attributes. Quick successive edits undo as one step.
    pub fn edit_sector(&mut self, s: SectorId, f: impl FnOnce(&mut Sector)) -> EditResult<()> {
        self.require_idle()?;
        if self.map.sector(s).is_none() {
            return self.report(Err(EditError::InvalidId { kind: "sector", id: s.0 }), |_| String::new());
        }
        let now = self.clock.now();
        self.history.register_change("sector properties", &self.map, now);
        if let Some(sector) = self.map.sector_mut(s) {
            f(sector);
        }
        self.refresh_problem();
        self.report(Ok(()), |_| format!("edited {s}"))
    }

    // Placement

    pub fn add_mob(&mut self, pos: Vec2, category: MobCategory, radius: f32) -> EditResult<u32> {
        self.require_idle()?;
        let res = if !pos.is_finite() || !radius.is_finite() || radius < 0.0 {
            Err(degenerate("object placement is not finite"))
        } else {
            self.apply("new object", |map| Ok(map.add_mob(pos, category, radius)))
        };
        self.report(res, |i| format!("added object {i}"))
    }

    pub fn add_path_stop(&mut self, pos: Vec2) -> EditResult<u32> {
        self.require_idle()?;
        let res = if !pos.is_finite() {
            Err(degenerate("path stop position is not finite"))
        } else {
            self.apply("new path stop", |map| Ok(map.add_path_stop(pos)))
        };
        self.report(res, |i| format!("added path stop {i}"))
    }

    pub fn link_path_stops(&mut self, from: u32, to: u32) -> EditResult<()> {
        self.require_idle()?;
        let res = self.apply("path link", |map| map.link_path_stops(from, to));
        self.report(res, |_| String::new())
    }

    // History

    /// Restores the map as it was before the last change.
    pub fn undo(&mut self) -> EditResult<()> {
        self.require_idle()?;
        let res = self.history.undo();
        let res = self.report(res, |(name, _)| format!("undid {name}"));
        let (name, mut snapshot) = res?;
        snapshot.geom_ver = self.map.geom_ver;
        snapshot.bump();
        self.map = snapshot;
        self.refresh_problem();
        info!(change = %name, "undo");
        Ok(())
    }

    // Validation

    /// Re-runs the validator and returns the first problem, if any.
    pub fn find_problems(&mut self) -> Option<&Problem> {
        self.refresh_problem();
        self.problem.as_ref()
    }

    /// The problem found by the last validator run.
    pub fn problem(&self) -> Option<&Problem> {
        self.problem.as_ref()
    }

    /// Where the camera should look to show the current problem.
    pub fn problem_focus(&self) -> Option<Vec2> {
        self.problem.as_ref().and_then(|p| p.focus(&self.map))
    }

    pub fn ensure_valid(&mut self) -> EditResult<()> {
        match find_problem(&self.map, &self.config) {
            None => Ok(()),
            Some(p) => {
                self.problem = Some(p.clone());
                Err(EditError::ValidatorProblem(p))
            }
        }
    }

    // Files

    pub fn save(&mut self, path: impl AsRef<Path>) -> EditResult<()> {
        self.require_idle()?;
        let res = self.map.save_to_path(path.as_ref());
        self.report(res, |_| "saved".to_string())
    }

    /// Loads a map file. A file that cannot be read leaves the open map alone.
    pub fn load(&mut self, path: impl AsRef<Path>) -> EditResult<()> {
        self.require_idle()?;
        let res = AreaMap::load_from_path(path.as_ref());
        let map = self.report(res, |_| "loaded".to_string())?;
        self.open(map)
    }

    /// Periodic housekeeping. Writes a backup when one is due and nothing is
    /// in progress; a backup due mid-drawing waits for the next idle tick.
    /// Returns whether a backup was written.
    pub fn tick(&mut self) -> EditResult<bool> {
        if self.config.backup_interval_secs <= 0.0 || self.backup.is_none() {
            return Ok(false);
        }
        let now = self.clock.now();
        let interval = Duration::from_secs_f32(self.config.backup_interval_secs);
        if now.saturating_sub(self.last_backup) < interval {
            return Ok(false);
        }
        if self.state != EditorState::Idle {
            debug!(state = ?self.state, "backup deferred");
            return Ok(false);
        }
        let doc = self.map.to_json_value();
        self.last_backup = now;
        let Some(sink) = self.backup.as_mut() else {
            return Ok(false);
        };
        match sink.store(&doc) {
            Ok(()) => {
                debug!("backup written");
                Ok(true)
            }
            Err(e) => {
                warn!(error = %e, "backup failed");
                self.status = e.to_string();
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undo_on_fresh_editor_reports_no_history() {
        let mut ed = Editor::new(EditorConfig::default());
        let before = ed.map().clone();
        assert!(matches!(ed.undo(), Err(EditError::NoHistory)));
        assert_eq!(ed.map(), &before);
        assert_eq!(ed.status(), "nothing to undo");
    }

    #[test]
    fn nodes_need_a_drawing() {
        let mut ed = Editor::new(EditorConfig::default());
        assert!(matches!(
            ed.add_drawing_node(Vec2::new(0.0, 0.0)),
            Err(EditError::NotDrawing)
        ));
    }

    #[test]
    fn refused_edits_show_up_in_the_status_line() {
        let mut ed = Editor::new(EditorConfig::default());

        let err = ed.edit_sector(SectorId(7), |s| s.z = 1.0).unwrap_err();
        assert!(matches!(err, EditError::InvalidId { kind: "sector", id: 7 }));
        assert_eq!(ed.status(), err.to_string());

        let err = ed.add_mob(Vec2::new(f32::NAN, 0.0), MobCategory::Enemy, 8.0).unwrap_err();
        assert_eq!(ed.status(), err.to_string());

        ed.begin_sector_draw().expect("begin");
        let err = ed.add_path_stop(Vec2::new(0.0, 0.0)).unwrap_err();
        assert!(matches!(err, EditError::OperationInProgress(_)));
        assert_eq!(ed.status(), err.to_string());
        assert!(ed.map().path_stops().is_empty());
    }

    #[test]
    fn zoom_must_be_positive() {
        let mut ed = Editor::new(EditorConfig::default());
        assert!(ed.set_zoom(0.0).is_err());
        assert!(ed.set_zoom(2.0).is_ok());
        assert_eq!(ed.zoom(), 2.0);
    }
}
