use sectormap::config::EditorConfig;
use sectormap::editor::{Editor, MemoryBackup};
use sectormap::history::Clock;
use std::time::Duration;
use wasm_bindgen::prelude::*;
mod api;
mod error;
mod interop;

/// Clock backed by `Date.now()`, counted from construction.
struct JsClock {
    origin_ms: f64,
}

impl JsClock {
    fn new() -> Self {
        JsClock { origin_ms: js_sys::Date::now() }
    }
}

impl Clock for JsClock {
    fn now(&self) -> Duration {
        let ms = (js_sys::Date::now() - self.origin_ms).max(0.0);
        Duration::from_secs_f64(ms / 1000.0)
    }
}

#[wasm_bindgen]
pub struct SectorEditor {
    pub(crate) inner: Editor,
    pub(crate) backup: MemoryBackup,
}

impl SectorEditor {
    pub fn rs_new(config: EditorConfig) -> SectorEditor {
        let mut inner = Editor::with_clock(config, Box::new(JsClock::new()));
        let backup = MemoryBackup::new();
        inner.set_backup_sink(Box::new(backup.clone()));
        SectorEditor { inner, backup }
    }
    pub fn rs_geom_version(&self) -> u64 {
        self.inner.map().geom_version()
    }
}
