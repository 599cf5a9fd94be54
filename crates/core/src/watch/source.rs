//! Filesystem change events, independent of the backend that produced them.

use crate::error::Result;
use async_trait::async_trait;
use notify::event::{ModifyKind, RenameMode};
use notify::{
    Config, Event, EventKind, PollWatcher, RecommendedWatcher, RecursiveMode,
    Watcher as NotifyWatcher,
};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Modified,
    Removed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub path: PathBuf,
    pub kind: ChangeKind,
}

impl ChangeEvent {
    pub fn new(path: impl Into<PathBuf>, kind: ChangeKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

/// Subscription to change events under a root. `None` ends the stream.
#[async_trait]
pub trait ChangeSource: Send {
    async fn next_event(&mut self) -> Option<ChangeEvent>;
}

#[async_trait]
impl ChangeSource for mpsc::UnboundedReceiver<ChangeEvent> {
    async fn next_event(&mut self) -> Option<ChangeEvent> {
        self.recv().await
    }
}

/// Maps one backend event to zero or more change events.
pub fn translate(event: &Event) -> Vec<ChangeEvent> {
    let kind = match event.kind {
        EventKind::Access(_) => return Vec::new(),
        EventKind::Create(_) => ChangeKind::Created,
        EventKind::Remove(_) => ChangeKind::Removed,
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => ChangeKind::Removed,
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => ChangeKind::Created,
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            let mut out = Vec::new();
            if let Some(from) = event.paths.first() {
                out.push(ChangeEvent::new(from, ChangeKind::Removed));
            }
            if let Some(to) = event.paths.get(1) {
                out.push(ChangeEvent::new(to, ChangeKind::Created));
            }
            return out;
        }
        EventKind::Modify(_) | EventKind::Any | EventKind::Other => ChangeKind::Modified,
    };
    event
        .paths
        .iter()
        .map(|p| ChangeEvent::new(p, kind))
        .collect()
}

/// `notify`-backed source: the native recursive watcher, or the polling
/// watcher when the native backend is unavailable or unreliable.
pub struct NotifySource {
    _watcher: Box<dyn NotifyWatcher + Send>,
    rx: mpsc::UnboundedReceiver<notify::Result<Event>>,
    queued: VecDeque<ChangeEvent>,
}

impl NotifySource {
    pub fn native(root: &Path) -> Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut watcher = RecommendedWatcher::new(
            move |res| {
                let _ = tx.send(res);
            },
            Config::default(),
        )?;
        watcher.watch(root, RecursiveMode::Recursive)?;
        Ok(Self::from_parts(Box::new(watcher), rx))
    }

    pub fn polling(root: &Path, interval: Duration) -> Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut watcher = PollWatcher::new(
            move |res| {
                let _ = tx.send(res);
            },
            Config::default().with_poll_interval(interval),
        )?;
        watcher.watch(root, RecursiveMode::Recursive)?;
        Ok(Self::from_parts(Box::new(watcher), rx))
    }

    /// Native unless `force_poll`, falling back to polling on failure.
    pub fn open(root: &Path, poll_interval: Duration, force_poll: bool) -> Result<Self> {
        if !force_poll {
            match Self::native(root) {
                Ok(source) => {
                    tracing::info!("Native file watcher ready for {}", root.display());
                    return Ok(source);
                }
                Err(e) => {
                    tracing::warn!("Native watcher unavailable ({e}), falling back to polling");
                }
            }
        }
        let source = Self::polling(root, poll_interval)?;
        tracing::info!(
            "Polling watcher ready for {} (interval {}ms)",
            root.display(),
            poll_interval.as_millis()
        );
        Ok(source)
    }

    fn from_parts(
        watcher: Box<dyn NotifyWatcher + Send>,
        rx: mpsc::UnboundedReceiver<notify::Result<Event>>,
    ) -> Self {
        Self {
            _watcher: watcher,
            rx,
            queued: VecDeque::new(),
        }
    }
}

#[async_trait]
impl ChangeSource for NotifySource {
    async fn next_event(&mut self) -> Option<ChangeEvent> {
        loop {
            if let Some(event) = self.queued.pop_front() {
                return Some(event);
            }
            match self.rx.recv().await? {
                Ok(event) => self.queued.extend(translate(&event)),
                // A vanished directory or a permission error only affects
                // that subtree; keep listening.
                Err(e) => tracing::warn!("Watch error: {}", e),
            }
        }
    }
}
