// File watcher for incremental updates

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use notify::{Config as NotifyConfig, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::indexer::{IndexOutcome, Indexer};

/// File watcher for automatic re-indexing
pub struct FileWatcher {
    indexer: Arc<Indexer>,
    watch_path: PathBuf,
    config: Config,
}

impl FileWatcher {
    /// Watches the indexer's project root
    pub fn new(indexer: Arc<Indexer>, config: Config) -> Self {
        let watch_path = indexer.root().to_path_buf();
        Self {
            indexer,
            watch_path,
            config,
        }
    }

    /// Start watching for file changes. Runs until the event channel closes.
    pub async fn watch(&self) -> Result<()> {
        info!("Starting file watcher for: {}", self.watch_path.display());

        let (tx, mut rx) = mpsc::channel(256);

        // notify calls back on its own thread, outside the runtime
        let mut watcher = RecommendedWatcher::new(
            move |res: Result<Event, notify::Error>| match res {
                Ok(event) => {
                    if let Err(e) = tx.blocking_send(event) {
                        error!("Failed to send file event: {}", e);
                    }
                }
                Err(e) => error!("File watch error: {}", e),
            },
            NotifyConfig::default(),
        )?;

        watcher.watch(&self.watch_path, RecursiveMode::Recursive)?;

        info!("File watcher started. Monitoring for changes...");

        while let Some(event) = rx.recv().await {
            self.handle_event(event).await;
        }

        Ok(())
    }

    /// Apply one file system event to the index. Failures are logged, never fatal.
    pub async fn handle_event(&self, event: Event) {
        debug!("File event: {:?}", event);

        match event.kind {
            EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_) => {
                for path in &event.paths {
                    if self.is_tracked(path) {
                        self.handle_file_change(path, &event.kind).await;
                    }
                }
            }
            _ => {}
        }
    }

    async fn handle_file_change(&self, path: &Path, kind: &EventKind) {
        let file_key = self.indexer.file_key(path);

        match kind {
            // Renames surface as modifications of a path that no longer exists
            EventKind::Remove(_) => self.remove_file(&file_key),
            EventKind::Modify(_) if !path.exists() => self.remove_file(&file_key),
            EventKind::Create(_) | EventKind::Modify(_) => {
                if path.is_file() {
                    self.index_file(path);
                }
            }
            _ => {}
        }
    }

    /// Extension, include/exclude and parser checks; existence is not required
    fn is_tracked(&self, path: &Path) -> bool {
        let file_key = self.indexer.file_key(path);
        self.config.should_index_file(&file_key) && self.indexer.can_index_file(&file_key)
    }

    fn index_file(&self, path: &Path) {
        match self.indexer.index_path(path) {
            Ok(IndexOutcome::Updated(update)) => {
                info!("Indexed {}: {} symbols", update.file, update.symbols);
            }
            Ok(IndexOutcome::Unchanged) => debug!("Unchanged: {}", path.display()),
            Err(e) => warn!("Failed to index {}: {:#}", path.display(), e),
        }
    }

    fn remove_file(&self, file_path: &str) {
        if self.indexer.remove_file(file_path) {
            info!("File removed: {}", file_path);
        } else {
            debug!("Removed file was not indexed: {}", file_path);
        }
    }
}

/// Keep the index current with changes under the project root until interrupted
pub async fn start_watcher(indexer: Arc<Indexer>, config: Config) -> Result<()> {
    info!("Initializing file watcher for project: {}", indexer.root().display());

    let watcher = FileWatcher::new(indexer, config);
    watcher.watch().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::store::SymbolIndex;
    use notify::event::{CreateKind, ModifyKind, RemoveKind};
    use tempfile::TempDir;

    fn watcher(dir: &TempDir) -> FileWatcher {
        let indexer = Arc::new(Indexer::new(Arc::new(SymbolIndex::default()), dir.path()));
        FileWatcher::new(indexer, Config::default())
    }

    fn symbols(watcher: &FileWatcher, name: &str) -> usize {
        watcher.indexer.index().find_symbols_by_name(name).len()
    }

    #[tokio::test]
    async fn test_create_modify_remove() {
        let dir = TempDir::new().unwrap();
        let watcher = watcher(&dir);
        let path = watcher.watch_path.join("calc.cpp");

        std::fs::write(&path, "int add(int a, int b) { return a + b; }\n").unwrap();
        watcher
            .handle_event(Event::new(EventKind::Create(CreateKind::File)).add_path(path.clone()))
            .await;
        assert_eq!(symbols(&watcher, "add"), 1);
        assert_eq!(watcher.indexer.index().read().files(), vec!["calc.cpp"]);

        std::fs::write(&path, "int sub(int a, int b) { return a - b; }\n").unwrap();
        watcher
            .handle_event(Event::new(EventKind::Modify(ModifyKind::Any)).add_path(path.clone()))
            .await;
        assert_eq!(symbols(&watcher, "add"), 0);
        assert_eq!(symbols(&watcher, "sub"), 1);

        std::fs::remove_file(&path).unwrap();
        watcher
            .handle_event(Event::new(EventKind::Remove(RemoveKind::File)).add_path(path.clone()))
            .await;
        assert_eq!(symbols(&watcher, "sub"), 0);
        assert!(watcher.indexer.index().read().files().is_empty());
    }

    #[tokio::test]
    async fn test_ignores_untracked_files() {
        let dir = TempDir::new().unwrap();
        let watcher = watcher(&dir);

        let notes = watcher.watch_path.join("notes.txt");
        std::fs::write(&notes, "int add();").unwrap();
        watcher
            .handle_event(Event::new(EventKind::Create(CreateKind::File)).add_path(notes))
            .await;

        std::fs::create_dir_all(watcher.watch_path.join("build")).unwrap();
        let generated = watcher.watch_path.join("build/gen.cpp");
        std::fs::write(&generated, "int gen() { return 0; }\n").unwrap();
        watcher
            .handle_event(Event::new(EventKind::Create(CreateKind::File)).add_path(generated))
            .await;

        assert!(watcher.indexer.index().read().files().is_empty());
    }
}
