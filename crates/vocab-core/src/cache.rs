//! In-memory cache over the datasets, reloaded when a backing file changes

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use crate::model::{Dictionary, SeenFrequencies, UserWords, WordRecord};
use crate::store::{Dataset, JsonStore, Signature};

/// One cached dataset and the signature it was loaded at.
struct CacheSlot<T> {
    data: Arc<T>,
    last_signature: Option<Signature>,
    /// Set by `invalidate`: reload on next access whatever the signature.
    stale: bool,
}

impl<T: Default> CacheSlot<T> {
    fn empty() -> Self {
        CacheSlot {
            data: Arc::new(T::default()),
            last_signature: None,
            stale: false,
        }
    }

    fn is_current(&self, signature: &Option<Signature>) -> bool {
        !self.stale && self.last_signature == *signature
    }
}

/// Staleness-checked cache for the dictionary, the user word store and the
/// seen-word log. Reads hand out `Arc` snapshots; an unchanged file gives
/// back the same snapshot.
pub struct DatasetCache {
    store: Arc<JsonStore>,
    dictionary: RwLock<CacheSlot<Dictionary>>,
    user_words: RwLock<CacheSlot<UserWords>>,
    seen: RwLock<CacheSlot<SeenFrequencies>>,
    reloads: [AtomicU64; 3],
}

impl DatasetCache {
    pub fn new(store: Arc<JsonStore>) -> Self {
        DatasetCache {
            store,
            dictionary: RwLock::new(CacheSlot::empty()),
            user_words: RwLock::new(CacheSlot::empty()),
            seen: RwLock::new(CacheSlot::empty()),
            reloads: Default::default(),
        }
    }

    pub fn store(&self) -> &Arc<JsonStore> {
        &self.store
    }

    /// The reference dictionary.
    pub fn dictionary(&self) -> Arc<Dictionary> {
        self.fetch(Dataset::Dictionary, &self.dictionary, |store| {
            store.load::<Dictionary>(Dataset::Dictionary)
        })
    }

    /// The user word store with its derived definition index.
    pub fn user_words(&self) -> Arc<UserWords> {
        self.fetch(Dataset::UserWords, &self.user_words, |store| {
            UserWords::new(store.load::<Vec<WordRecord>>(Dataset::UserWords))
        })
    }

    /// The seen-word frequencies.
    pub fn seen_frequencies(&self) -> Arc<SeenFrequencies> {
        self.fetch(Dataset::SeenWords, &self.seen, |store| {
            store.load::<SeenFrequencies>(Dataset::SeenWords)
        })
    }

    /// Mark a dataset stale so the next read reloads it.
    pub fn invalidate(&self, dataset: Dataset) {
        match dataset {
            Dataset::Dictionary => mark_stale(&self.dictionary),
            Dataset::UserWords => mark_stale(&self.user_words),
            Dataset::SeenWords => mark_stale(&self.seen),
        }
        tracing::debug!("Invalidated cached {}", dataset);
    }

    /// Check every dataset now and reload those whose file changed.
    pub fn invalidate_and_reload(&self) {
        self.dictionary();
        self.user_words();
        self.seen_frequencies();
    }

    /// How many times a dataset has been loaded from disk.
    pub fn reload_count(&self, dataset: Dataset) -> u64 {
        self.reloads[dataset.index()].load(Ordering::SeqCst)
    }

    fn fetch<T, F>(&self, dataset: Dataset, slot: &RwLock<CacheSlot<T>>, load: F) -> Arc<T>
    where
        T: Default + Len,
        F: FnOnce(&JsonStore) -> T,
    {
        let signature = self.store.signature(dataset);
        {
            let current = slot.read().unwrap_or_else(PoisonError::into_inner);
            if current.is_current(&signature) {
                return Arc::clone(&current.data);
            }
        }

        let mut current = slot.write().unwrap_or_else(PoisonError::into_inner);
        // Another reader may have reloaded while we waited for the lock.
        let signature = self.store.signature(dataset);
        if current.is_current(&signature) {
            return Arc::clone(&current.data);
        }

        let data = Arc::new(match signature {
            Some(_) => load(&self.store),
            None => T::default(),
        });
        current.data = Arc::clone(&data);
        current.last_signature = signature;
        current.stale = false;
        self.reloads[dataset.index()].fetch_add(1, Ordering::SeqCst);
        tracing::info!(
            "[Cache] Reloaded {} from {} ({} entries)",
            dataset,
            self.store.path(dataset).display(),
            data.entry_count()
        );
        data
    }
}

fn mark_stale<T>(slot: &RwLock<CacheSlot<T>>) {
    slot.write().unwrap_or_else(PoisonError::into_inner).stale = true;
}

/// Entry count for reload logging.
trait Len {
    fn entry_count(&self) -> usize;
}

impl<K, V> Len for std::collections::BTreeMap<K, V> {
    fn entry_count(&self) -> usize {
        self.len()
    }
}

impl Len for UserWords {
    fn entry_count(&self) -> usize {
        self.len()
    }
}
