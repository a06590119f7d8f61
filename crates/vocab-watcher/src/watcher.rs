//! Filesystem watcher implementation

use std::collections::HashSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use vocab_core::{DataPaths, Dataset, DatasetCache};

/// Events emitted by the dataset watcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    Created(PathBuf),
    Modified(PathBuf),
    Removed(PathBuf),
}

impl WatchEvent {
    pub fn path(&self) -> &Path {
        match self {
            WatchEvent::Created(p) | WatchEvent::Modified(p) | WatchEvent::Removed(p) => p,
        }
    }
}

/// Watches the directories holding the dataset files and forwards events
/// for those files only.
pub struct DatasetWatcher {
    watcher: RecommendedWatcher,
    event_rx: mpsc::UnboundedReceiver<WatchEvent>,
    watched_paths: HashSet<PathBuf>,
    directories: Vec<PathBuf>,
}

impl DatasetWatcher {
    pub fn new(paths: &DataPaths) -> Result<Self> {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let names: HashSet<OsString> = Dataset::ALL
            .iter()
            .filter_map(|ds| paths.path(*ds).file_name().map(|n| n.to_os_string()))
            .collect();

        let watcher = notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
            match res {
                Ok(event) => {
                    debug!("File system event: {:?}", event);
                    handle_notify_event(event, &names, &event_tx);
                }
                Err(e) => {
                    error!("File system watch error: {}", e);
                }
            }
        })?;

        let mut directories: Vec<PathBuf> = Dataset::ALL
            .iter()
            .map(|ds| parent_dir(paths.path(*ds)))
            .collect();
        directories.sort();
        directories.dedup();

        Ok(Self {
            watcher,
            event_rx,
            watched_paths: HashSet::new(),
            directories,
        })
    }

    /// Start watching every directory that holds a dataset file.
    pub fn start(&mut self) -> Result<()> {
        for dir in self.directories.clone() {
            self.watch_directory(&dir)?;
        }
        Ok(())
    }

    pub fn watch_directory(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        info!("Watching directory: {:?}", path);

        self.watcher.watch(path, RecursiveMode::NonRecursive)?;
        self.watched_paths.insert(path.to_path_buf());
        Ok(())
    }

    pub fn event_receiver(&mut self) -> &mut mpsc::UnboundedReceiver<WatchEvent> {
        &mut self.event_rx
    }

    pub fn is_watching(&self, path: &Path) -> bool {
        self.watched_paths.contains(path)
    }
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn handle_notify_event(
    event: notify::Event,
    names: &HashSet<OsString>,
    event_tx: &mpsc::UnboundedSender<WatchEvent>,
) {
    let make: fn(PathBuf) -> WatchEvent = match event.kind {
        notify::EventKind::Create(_) => WatchEvent::Created,
        notify::EventKind::Modify(_) => WatchEvent::Modified,
        notify::EventKind::Remove(_) => WatchEvent::Removed,
        _ => return,
    };
    for path in event.paths {
        if !is_dataset_file(&path, names) {
            continue;
        }
        if let Err(e) = event_tx.send(make(path)) {
            warn!("Failed to forward watch event: {}", e);
        }
    }
}

/// True for one of the dataset files. Temporary files written during an
/// atomic save never match.
fn is_dataset_file(path: &Path, names: &HashSet<OsString>) -> bool {
    path.file_name().is_some_and(|n| names.contains(n))
}

/// Drives the watcher and refreshes the cache on every relevant change.
pub struct WatcherService {
    watcher: DatasetWatcher,
    cache: Arc<DatasetCache>,
}

impl WatcherService {
    pub fn new(cache: Arc<DatasetCache>) -> Result<Self> {
        let watcher = DatasetWatcher::new(cache.store().paths())?;
        Ok(Self { watcher, cache })
    }

    pub fn start_watching(&mut self) -> Result<()> {
        self.watcher.start()?;
        info!("Started watching dataset files");
        Ok(())
    }

    /// Refresh the cache for one event.
    pub fn handle_event(&self, event: &WatchEvent) {
        info!("Dataset file changed: {}", event.path().display());
        self.cache.invalidate_and_reload();
    }

    /// Process events until the watcher is dropped. Bursts are coalesced
    /// into a single refresh.
    pub async fn process_events(mut self) -> Result<()> {
        while let Some(event) = self.watcher.event_receiver().recv().await {
            let mut coalesced = 0usize;
            while self.watcher.event_receiver().try_recv().is_ok() {
                coalesced += 1;
            }
            if coalesced > 0 {
                debug!("Coalesced {} further watch events", coalesced);
            }
            self.handle_event(&event);
        }
        Ok(())
    }
}
