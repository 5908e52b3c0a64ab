//! Editor settings, loadable from JSON. Missing keys take their defaults.

use crate::algorithms::picking::SnapMode;
use crate::error::{EditError, EditResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

mod defaults {
    pub fn vertex_merge_radius() -> f32 {
        10.0
    }
    pub fn edge_pick_radius() -> f32 {
        8.0
    }
    pub fn snap_threshold() -> f32 {
        80.0
    }
    pub fn grid_interval() -> f32 {
        32.0
    }
    pub fn undo_limit() -> usize {
        20
    }
    pub fn undo_debounce_secs() -> f32 {
        1.0
    }
    pub fn backup_interval_secs() -> f32 {
        120.0
    }
    pub fn step_height() -> f32 {
        50.0
    }
    pub fn path_stop_min_distance() -> f32 {
        3.0
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EditorConfig {
    /// Screen-space radius within which vertices snap onto and merge with each other
    #[serde(default = "defaults::vertex_merge_radius")]
    pub vertex_merge_radius: f32,

    /// Screen-space radius for picking an edge under the cursor
    #[serde(default = "defaults::edge_pick_radius")]
    pub edge_pick_radius: f32,

    #[serde(default)]
    pub snap_mode: SnapMode,

    /// Screen-space reach of vertex/edge snapping
    #[serde(default = "defaults::snap_threshold")]
    pub snap_threshold: f32,

    #[serde(default = "defaults::grid_interval")]
    pub grid_interval: f32,

    /// Undo steps kept (0 disables undo)
    #[serde(default = "defaults::undo_limit")]
    pub undo_limit: usize,

    /// Same-named changes closer together than this collapse into one undo step
    #[serde(default = "defaults::undo_debounce_secs")]
    pub undo_debounce_secs: f32,

    /// Seconds between automatic backups (0 disables them)
    #[serde(default = "defaults::backup_interval_secs")]
    pub backup_interval_secs: f32,

    /// Height difference a mob can still walk up
    #[serde(default = "defaults::step_height")]
    pub step_height: f32,

    #[serde(default = "defaults::path_stop_min_distance")]
    pub path_stop_min_distance: f32,

    /// Texture given to sectors drawn in the void
    #[serde(default)]
    pub new_sector_texture: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            vertex_merge_radius: defaults::vertex_merge_radius(),
            edge_pick_radius: defaults::edge_pick_radius(),
            snap_mode: SnapMode::default(),
            snap_threshold: defaults::snap_threshold(),
            grid_interval: defaults::grid_interval(),
            undo_limit: defaults::undo_limit(),
            undo_debounce_secs: defaults::undo_debounce_secs(),
            backup_interval_secs: defaults::backup_interval_secs(),
            step_height: defaults::step_height(),
            path_stop_min_distance: defaults::path_stop_min_distance(),
            new_sector_texture: String::new(),
        }
    }
}

impl EditorConfig {
    pub fn from_json_str(s: &str) -> EditResult<Self> {
        let cfg: EditorConfig = serde_json::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load(path: impl AsRef<Path>) -> EditResult<Self> {
        Self::from_json_str(&std::fs::read_to_string(path)?)
    }

    pub fn validate(&self) -> EditResult<()> {
        let positive = [
            ("vertex_merge_radius", self.vertex_merge_radius),
            ("edge_pick_radius", self.edge_pick_radius),
        ];
        for (name, v) in positive {
            if !v.is_finite() || v <= 0.0 {
                return Err(EditError::Config(format!("{name} must be a positive number")));
            }
        }
        let non_negative = [
            ("snap_threshold", self.snap_threshold),
            ("grid_interval", self.grid_interval),
            ("undo_debounce_secs", self.undo_debounce_secs),
            ("backup_interval_secs", self.backup_interval_secs),
            ("step_height", self.step_height),
            ("path_stop_min_distance", self.path_stop_min_distance),
        ];
        for (name, v) in non_negative {
            if !v.is_finite() || v < 0.0 {
                return Err(EditError::Config(format!("{name} must not be negative")));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg = EditorConfig::from_json_str(r#"{ "undo_limit": 5, "snap_mode": "vertices" }"#)
            .expect("config");
        assert_eq!(cfg.undo_limit, 5);
        assert_eq!(cfg.snap_mode, SnapMode::Vertices);
        assert_eq!(cfg.vertex_merge_radius, 10.0);
        assert_eq!(cfg.undo_debounce_secs, 1.0);
    }

    #[test]
    fn rejects_bad_radius() {
        let err = EditorConfig::from_json_str(r#"{ "vertex_merge_radius": -1.0 }"#).unwrap_err();
        assert!(matches!(err, EditError::Config(_)));
    }
}
