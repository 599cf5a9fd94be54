//! Process-wide mutable build bookkeeping.
//!
//! All four pieces live behind one mutex so that a drain loop deciding to
//! stop and a timer queueing a path can never interleave.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::task::AbortHandle;

#[derive(Default)]
pub struct BuildState {
    inner: Mutex<BuildStateInner>,
}

#[derive(Default)]
struct BuildStateInner {
    in_progress: HashSet<PathBuf>,
    pending: BTreeSet<PathBuf>,
    draining: bool,
    timers: HashMap<PathBuf, DebounceTimer>,
}

struct DebounceTimer {
    generation: u64,
    handle: Option<AbortHandle>,
}

/// Clears the in-progress mark for a path when dropped.
pub struct InProgressGuard<'a> {
    state: &'a BuildState,
    path: PathBuf,
}

impl Drop for InProgressGuard<'_> {
    fn drop(&mut self) {
        self.state.lock().in_progress.remove(&self.path);
    }
}

impl BuildState {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BuildStateInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Marks `path` as building. `None` if a build is already in flight.
    pub fn try_begin_build(&self, path: &Path) -> Option<InProgressGuard<'_>> {
        let mut inner = self.lock();
        if !inner.in_progress.insert(path.to_path_buf()) {
            return None;
        }
        Some(InProgressGuard {
            state: self,
            path: path.to_path_buf(),
        })
    }

    pub fn is_building(&self, path: &Path) -> bool {
        self.lock().in_progress.contains(path)
    }

    /// Registers a new timer generation for `path`, returning the handle of
    /// the timer it replaces so the caller can abort it.
    pub fn arm_timer(&self, path: &Path, generation: u64) -> Option<AbortHandle> {
        let previous = self.lock().timers.insert(
            path.to_path_buf(),
            DebounceTimer {
                generation,
                handle: None,
            },
        );
        previous.and_then(|t| t.handle)
    }

    /// Attaches the task handle to a timer armed with `arm_timer`. Returns
    /// `false` if that generation already fired or was superseded.
    pub fn attach_timer_handle(&self, path: &Path, generation: u64, handle: AbortHandle) -> bool {
        let mut inner = self.lock();
        match inner.timers.get_mut(path) {
            Some(timer) if timer.generation == generation => {
                timer.handle = Some(handle);
                true
            }
            _ => false,
        }
    }

    /// Moves `path` from its timer into the pending set. Stale generations
    /// (a newer notification re-armed the timer) are ignored.
    pub fn fire_timer(&self, path: &Path, generation: u64) -> bool {
        let mut inner = self.lock();
        if inner.timers.get(path).map(|t| t.generation) != Some(generation) {
            return false;
        }
        inner.timers.remove(path);
        inner.pending.insert(path.to_path_buf());
        true
    }

    /// Drops any timer and pending entry for a removed source.
    pub fn forget(&self, path: &Path) {
        let mut inner = self.lock();
        if let Some(handle) = inner.timers.remove(path).and_then(|t| t.handle) {
            handle.abort();
        }
        inner.pending.remove(path);
    }

    pub fn queue_pending(&self, path: impl Into<PathBuf>) {
        self.lock().pending.insert(path.into());
    }

    /// Claims the single drain slot.
    pub fn begin_drain(&self) -> bool {
        let mut inner = self.lock();
        if inner.draining {
            return false;
        }
        inner.draining = true;
        true
    }

    /// Snapshots and clears the pending set; when it is empty, releases the
    /// drain slot in the same critical section and returns `None`.
    pub fn take_pending_or_finish_drain(&self) -> Option<Vec<PathBuf>> {
        let mut inner = self.lock();
        if inner.pending.is_empty() {
            inner.draining = false;
            return None;
        }
        Some(std::mem::take(&mut inner.pending).into_iter().collect())
    }

    pub fn is_draining(&self) -> bool {
        self.lock().draining
    }

    pub fn pending(&self) -> Vec<PathBuf> {
        self.lock().pending.iter().cloned().collect()
    }

    pub fn armed_timers(&self) -> usize {
        self.lock().timers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_progress_guard_clears_on_drop() {
        let state = BuildState::new();
        let path = Path::new("/m/w.scad");
        {
            let _guard = state.try_begin_build(path).unwrap();
            assert!(state.is_building(path));
            assert!(state.try_begin_build(path).is_none());
        }
        assert!(!state.is_building(path));
        assert!(state.try_begin_build(path).is_some());
    }

    #[test]
    fn superseded_timer_generation_does_not_fire() {
        let state = BuildState::new();
        let path = Path::new("/m/w.scad");
        state.arm_timer(path, 1);
        state.arm_timer(path, 2);

        assert!(!state.fire_timer(path, 1));
        assert!(state.pending().is_empty());
        assert!(state.fire_timer(path, 2));
        assert_eq!(state.pending(), vec![path.to_path_buf()]);
        assert_eq!(state.armed_timers(), 0);
    }

    #[test]
    fn drain_slot_is_exclusive_and_released_when_empty() {
        let state = BuildState::new();
        state.queue_pending("/m/a.scad");

        assert!(state.begin_drain());
        assert!(!state.begin_drain());

        let batch = state.take_pending_or_finish_drain().unwrap();
        assert_eq!(batch, vec![PathBuf::from("/m/a.scad")]);
        assert!(state.is_draining());

        assert!(state.take_pending_or_finish_drain().is_none());
        assert!(!state.is_draining());
        assert!(state.begin_drain());
    }

    #[test]
    fn forget_drops_timer_and_pending_entry() {
        let state = BuildState::new();
        state.arm_timer(Path::new("/m/a.scad"), 7);
        state.queue_pending("/m/a.scad");

        state.forget(Path::new("/m/a.scad"));
        assert_eq!(state.armed_timers(), 0);
        assert!(state.pending().is_empty());
        assert!(!state.fire_timer(Path::new("/m/a.scad"), 7));
    }
}
