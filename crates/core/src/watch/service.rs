use super::debouncer::Debouncer;
use super::source::{ChangeEvent, ChangeKind, ChangeSource};
use crate::discovery::is_relevant_path;
use crate::model::{is_shared_library, is_source_path};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Feeds one change event below `root` into the debouncer. Returns whether it
/// was routed.
pub fn route_event(debouncer: &Arc<Debouncer>, root: &Path, event: ChangeEvent) -> bool {
    if !is_source_path(&event.path) || !is_relevant_path(root, &event.path) {
        return false;
    }
    match event.kind {
        ChangeKind::Removed => {
            debug!("Source removed: {}", event.path.display());
            debouncer.forget(&event.path);
        }
        ChangeKind::Created | ChangeKind::Modified => {
            if is_shared_library(&event.path) {
                debug!("Shared library changed: {}", event.path.display());
                return false;
            }
            info!("File changed: {}", event.path.display());
            debouncer.notify(event.path);
        }
    }
    true
}

pub struct WatchService;

impl WatchService {
    /// Consumes `source` until it ends or `cancel_token` is cancelled.
    /// `root` is the directory `source` watches.
    pub fn spawn<S>(
        mut source: S,
        root: PathBuf,
        debouncer: Arc<Debouncer>,
        cancel_token: CancellationToken,
    ) -> JoinHandle<()>
    where
        S: ChangeSource + 'static,
    {
        tokio::spawn(async move {
            info!("Watching for .scad changes");
            loop {
                tokio::select! {
                    _ = cancel_token.cancelled() => break,
                    event = source.next_event() => match event {
                        Some(event) => {
                            route_event(&debouncer, &root, event);
                        }
                        None => break,
                    },
                }
            }
            info!("File watcher task ended");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::{BatchRunner, BuildState, Summary};
    use crate::model::SourceFile;
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::mpsc;

    #[derive(Default)]
    struct Collect(Mutex<Vec<PathBuf>>);

    #[async_trait]
    impl BatchRunner for Collect {
        async fn run_batch(&self, sources: Vec<SourceFile>) -> Summary {
            self.0.lock().unwrap().extend(sources.into_iter().map(|s| s.path));
            Summary::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn routes_relevant_source_changes_only() {
        let runner = Arc::new(Collect::default());
        let debouncer = Debouncer::new(
            Arc::new(BuildState::new()),
            runner.clone(),
            Duration::from_millis(100),
        );
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let handle = WatchService::spawn(rx, PathBuf::from("/m"), debouncer, cancel.clone());

        let send = |path: &str, kind| tx.send(ChangeEvent::new(path, kind)).unwrap();
        send("/m/a/a.scad", ChangeKind::Modified);
        send("/m/a/a.stl", ChangeKind::Modified);
        send("/m/modules.scad", ChangeKind::Modified);
        send("/m/node_modules/x.scad", ChangeKind::Created);
        send("/m/.cache/c.scad", ChangeKind::Modified);
        send("/other/o.scad", ChangeKind::Modified);
        send("/m/b/b.scad", ChangeKind::Created);
        send("/m/b/b.scad", ChangeKind::Removed);

        tokio::time::sleep(Duration::from_millis(500)).await;
        cancel.cancel();
        handle.await.unwrap();

        let routed = runner.0.lock().unwrap().clone();
        assert_eq!(routed, vec![PathBuf::from("/m/a/a.scad")]);
    }

    #[tokio::test(start_paused = true)]
    async fn ignored_names_above_root_do_not_filter_events() {
        let runner = Arc::new(Collect::default());
        let debouncer = Debouncer::new(
            Arc::new(BuildState::new()),
            runner.clone(),
            Duration::from_millis(100),
        );
        let root = Path::new("/home/u/dist/proj/models");
        let path = root.join("a/a.scad");

        assert!(route_event(
            &debouncer,
            root,
            ChangeEvent::new(path.clone(), ChangeKind::Modified)
        ));
        tokio::time::sleep(Duration::from_millis(500)).await;

        assert_eq!(*runner.0.lock().unwrap(), vec![path]);
    }
}
