//! Snapshot undo history.
//!
//! Each entry is a full copy of the map taken before a change, tagged with
//! the change's name. Repeats of the same change inside a short window are
//! folded into the entry already recorded, so a drag or a burst of property
//! tweaks undoes in one step.

use crate::error::{EditError, EditResult};
use crate::AreaMap;
use std::cell::Cell;
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tracing::debug;

/// Time source for debouncing and backups.
pub trait Clock {
    /// Time elapsed since some fixed origin.
    fn now(&self) -> Duration;
}

pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        MonotonicClock { origin: Instant::now() }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Clock that only moves when told to. Shares its time through an `Rc` handle.
#[derive(Clone, Default)]
pub struct ManualClock {
    now: std::rc::Rc<Cell<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
    pub fn set(&self, to: Duration) {
        self.now.set(to);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }
}

struct SaveLock {
    name: String,
    expires: Duration,
}

pub struct History {
    entries: VecDeque<(String, AreaMap)>, // most recent first
    limit: usize,
    debounce: Duration,
    lock: Option<SaveLock>,
}

impl History {
    pub fn new(limit: usize, debounce: Duration) -> Self {
        History {
            entries: VecDeque::new(),
            limit,
            debounce,
            lock: None,
        }
    }

    /// Records `state` as the point to return to before change `name`.
    /// Returns whether a new entry was pushed.
    pub fn register_change(&mut self, name: &str, state: &AreaMap, now: Duration) -> bool {
        self.push_with(name, now, || state.clone())
    }

    /// Same as `register_change`, with a snapshot already taken.
    pub fn commit_prepared(&mut self, name: &str, snapshot: AreaMap, now: Duration) -> bool {
        self.push_with(name, now, move || snapshot)
    }

    fn push_with(&mut self, name: &str, now: Duration, snapshot: impl FnOnce() -> AreaMap) -> bool {
        if self.limit == 0 {
            return false;
        }
        if let Some(lock) = self.lock.as_mut() {
            if lock.name == name && now < lock.expires {
                lock.expires = now + self.debounce;
                debug!(change = name, "coalesced into previous undo step");
                return false;
            }
        }
        self.entries.push_front((name.to_string(), snapshot()));
        self.entries.truncate(self.limit);
        self.lock = Some(SaveLock {
            name: name.to_string(),
            expires: now + self.debounce,
        });
        true
    }

    /// Pops the most recent snapshot.
    pub fn undo(&mut self) -> EditResult<(String, AreaMap)> {
        let entry = self.entries.pop_front().ok_or(EditError::NoHistory)?;
        self.lock = None;
        Ok(entry)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
    /// Name of the change the next undo would revert.
    pub fn next_undo_name(&self) -> Option<&str> {
        self.entries.front().map(|(n, _)| n.as_str())
    }
    pub fn clear(&mut self) {
        self.entries.clear();
        self.lock = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Vec2;

    fn secs(s: f32) -> Duration {
        Duration::from_secs_f32(s)
    }

    #[test]
    fn coalesces_same_name_inside_window() {
        let mut h = History::new(10, secs(1.0));
        let map = AreaMap::new();
        assert!(h.register_change("drag", &map, secs(0.0)));
        assert!(!h.register_change("drag", &map, secs(0.5)));
        // window was extended to 1.5 by the previous call
        assert!(!h.register_change("drag", &map, secs(1.2)));
        assert!(h.register_change("drag", &map, secs(3.0)));
        assert!(h.register_change("texture", &map, secs(3.1)));
        assert_eq!(h.len(), 3);
        assert_eq!(h.next_undo_name(), Some("texture"));
    }

    #[test]
    fn truncates_oldest_and_undo_pops_newest() {
        let mut h = History::new(2, secs(0.0));
        let mut map = AreaMap::new();
        for i in 0..4 {
            map.add_vertex(Vec2::new(i as f32, 0.0));
            h.register_change("add", &map, secs(i as f32));
        }
        assert_eq!(h.len(), 2);
        let (_, snap) = h.undo().expect("entry");
        assert_eq!(snap.vertex_count(), 4);
        let (_, snap) = h.undo().expect("entry");
        assert_eq!(snap.vertex_count(), 3);
        assert!(matches!(h.undo(), Err(EditError::NoHistory)));
    }

    #[test]
    fn zero_limit_disables() {
        let mut h = History::new(0, secs(1.0));
        assert!(!h.register_change("x", &AreaMap::new(), secs(0.0)));
        assert!(h.is_empty());
    }
}
