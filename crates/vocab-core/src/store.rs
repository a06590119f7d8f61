//! File-backed persistence for the three datasets

use std::fmt;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tempfile::NamedTempFile;

use crate::config::Settings;
use crate::error::{Result, VocabError};

/// The datasets persisted by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dataset {
    Dictionary,
    UserWords,
    SeenWords,
}

impl Dataset {
    pub const ALL: [Dataset; 3] = [Dataset::Dictionary, Dataset::UserWords, Dataset::SeenWords];

    pub(crate) fn index(self) -> usize {
        match self {
            Dataset::Dictionary => 0,
            Dataset::UserWords => 1,
            Dataset::SeenWords => 2,
        }
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Dataset::Dictionary => "dictionary",
            Dataset::UserWords => "user words",
            Dataset::SeenWords => "seen words",
        };
        f.write_str(name)
    }
}

/// Backing file locations for each dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    pub dictionary: PathBuf,
    pub user_words: PathBuf,
    pub seen_words: PathBuf,
}

impl DataPaths {
    /// Default file names inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        DataPaths {
            dictionary: dir.join("ecdict.json"),
            user_words: dir.join("words.json"),
            seen_words: dir.join("seen_words.json"),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        DataPaths {
            dictionary: settings.data_dir.join(&settings.dictionary_file),
            user_words: settings.data_dir.join(&settings.words_file),
            seen_words: settings.data_dir.join(&settings.seen_file),
        }
    }

    pub fn path(&self, dataset: Dataset) -> &Path {
        match dataset {
            Dataset::Dictionary => &self.dictionary,
            Dataset::UserWords => &self.user_words,
            Dataset::SeenWords => &self.seen_words,
        }
    }
}

/// Modification signature of a backing file.
///
/// `generation` counts saves made through this store, so writes from this
/// process change the signature even when the filesystem timestamp does not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    pub modified: Option<SystemTime>,
    pub len: u64,
    pub generation: u64,
}

/// Whole-dataset JSON persistence with per-dataset write locks.
pub struct JsonStore {
    paths: DataPaths,
    generations: [AtomicU64; 3],
    locks: [Mutex<()>; 3],
}

impl JsonStore {
    pub fn new(paths: DataPaths) -> Self {
        JsonStore {
            paths,
            generations: Default::default(),
            locks: Default::default(),
        }
    }

    pub fn paths(&self) -> &DataPaths {
        &self.paths
    }

    pub fn path(&self, dataset: Dataset) -> &Path {
        self.paths.path(dataset)
    }

    /// Load a dataset. Missing, unreadable or unparsable files yield the
    /// empty default.
    pub fn load<T: DeserializeOwned + Default>(&self, dataset: Dataset) -> T {
        match self.load_strict(dataset) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Falling back to empty {}: {}", dataset, e);
                T::default()
            }
        }
    }

    /// Load a dataset for read-modify-write. A missing file is the empty
    /// default; any other failure is reported.
    pub fn load_strict<T: DeserializeOwned + Default>(&self, dataset: Dataset) -> Result<T> {
        let path = self.path(dataset);
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(T::default()),
            Err(e) => return Err(VocabError::storage(path, e)),
        };
        serde_json::from_str(&text).map_err(|e| VocabError::storage(path, e))
    }

    /// Replace a dataset's file with the pretty JSON encoding of `value`.
    pub fn save<T: Serialize + ?Sized>(&self, dataset: Dataset, value: &T) -> Result<()> {
        let path = self.path(dataset);
        write_json_atomic(path, value)?;
        self.generations[dataset.index()].fetch_add(1, Ordering::SeqCst);
        tracing::debug!("Saved {} to {}", dataset, path.display());
        Ok(())
    }

    /// Current signature of a dataset's file, `None` when it does not exist.
    pub fn signature(&self, dataset: Dataset) -> Option<Signature> {
        let path = self.path(dataset);
        match fs::metadata(path) {
            Ok(meta) => Some(Signature {
                modified: meta.modified().ok(),
                len: meta.len(),
                generation: self.generations[dataset.index()].load(Ordering::SeqCst),
            }),
            Err(e) => {
                if e.kind() != ErrorKind::NotFound {
                    tracing::debug!("Cannot stat {}: {}", path.display(), e);
                }
                None
            }
        }
    }

    /// Exclusive write access to one dataset.
    pub fn lock(&self, dataset: Dataset) -> MutexGuard<'_, ()> {
        self.locks[dataset.index()]
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Locked read-modify-write of a whole dataset.
    pub fn update<T, R, F>(&self, dataset: Dataset, f: F) -> Result<R>
    where
        T: DeserializeOwned + Serialize + Default,
        F: FnOnce(&mut T) -> Result<R>,
    {
        let _guard = self.lock(dataset);
        let mut value: T = self.load_strict(dataset)?;
        let out = f(&mut value)?;
        self.save(dataset, &value)?;
        Ok(out)
    }
}

/// Write `value` as pretty JSON to `path` through a temp file and rename.
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let mut text = serde_json::to_string_pretty(value).map_err(|e| VocabError::storage(path, e))?;
    text.push('\n');

    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(|e| VocabError::storage(dir, e))?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| VocabError::storage(path, e))?;
    tmp.write_all(text.as_bytes())
        .and_then(|_| tmp.as_file().sync_all())
        .map_err(|e| VocabError::storage(path, e))?;
    tmp.persist(path).map_err(|e| VocabError::storage(path, e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Dictionary, SeenFrequencies, WordRecord};
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> JsonStore {
        JsonStore::new(DataPaths::in_dir(dir.path()))
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let dict: Dictionary = store.load(Dataset::Dictionary);
        assert!(dict.is_empty());
        let words: Vec<WordRecord> = store.load_strict(Dataset::UserWords).unwrap();
        assert!(words.is_empty());
        assert!(store.signature(Dataset::Dictionary).is_none());
    }

    #[test]
    fn test_corrupt_file_is_soft_on_read_and_loud_on_strict() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::write(store.path(Dataset::SeenWords), "{ not json").unwrap();

        let seen: SeenFrequencies = store.load(Dataset::SeenWords);
        assert!(seen.is_empty());

        let strict: Result<SeenFrequencies> = store.load_strict(Dataset::SeenWords);
        assert!(matches!(strict, Err(VocabError::StorageFailure { .. })));
    }

    #[test]
    fn test_save_is_pretty_sorted_and_utf8() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let mut dict = Dictionary::new();
        dict.insert("zebra".to_string(), "斑馬".to_string());
        dict.insert("apple".to_string(), "蘋果".to_string());
        store.save(Dataset::Dictionary, &dict).unwrap();

        let text = fs::read_to_string(store.path(Dataset::Dictionary)).unwrap();
        assert_eq!(text, "{\n  \"apple\": \"蘋果\",\n  \"zebra\": \"斑馬\"\n}\n");

        let back: Dictionary = store.load(Dataset::Dictionary);
        assert_eq!(back, dict);
    }

    #[test]
    fn test_save_changes_signature() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let mut seen = SeenFrequencies::new();
        seen.insert("x".to_string(), 1);
        store.save(Dataset::SeenWords, &seen).unwrap();
        let first = store.signature(Dataset::SeenWords).unwrap();

        // Same length, likely same timestamp: the generation still moves.
        seen.insert("x".to_string(), 2);
        store.save(Dataset::SeenWords, &seen).unwrap();
        let second = store.signature(Dataset::SeenWords).unwrap();
        assert_ne!(first, second);
        assert_eq!(second.generation, first.generation + 1);
    }

    #[test]
    fn test_save_creates_parent_dirs_and_leaves_no_temp_files() {
        let dir = TempDir::new().unwrap();
        let store = JsonStore::new(DataPaths::in_dir(dir.path().join("nested/data")));
        store.save(Dataset::UserWords, &Vec::<WordRecord>::new()).unwrap();

        let entries: Vec<_> = fs::read_dir(dir.path().join("nested/data"))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("words.json")]);
    }

    #[test]
    fn test_update_does_not_save_on_error() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let res: Result<()> = store.update(Dataset::SeenWords, |_: &mut SeenFrequencies| {
            Err(VocabError::InvalidInput("nope".to_string()))
        });
        assert!(res.is_err());
        assert!(!store.path(Dataset::SeenWords).exists());
    }
}
