//! Filesystem watcher that refreshes the dataset cache

pub mod watcher;

pub use watcher::{DatasetWatcher, WatchEvent, WatcherService};
