//! Seen-word frequency log

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::cache::DatasetCache;
use crate::error::Result;
use crate::model::{SeenFrequencies, Sighting};
use crate::store::{Dataset, JsonStore};

/// Counts how often words were seen while parsing text or in workflow
/// callbacks. Counts only ever grow.
#[derive(Clone)]
pub struct SeenWordAggregator {
    store: Arc<JsonStore>,
    cache: Arc<DatasetCache>,
}

impl SeenWordAggregator {
    pub fn new(store: Arc<JsonStore>, cache: Arc<DatasetCache>) -> Self {
        SeenWordAggregator { store, cache }
    }

    /// Add one sighting for every distinct word in `sightings`.
    ///
    /// Each call is one logical event: a word listed several times in the
    /// same call still counts once. Returns the number of words credited.
    pub fn record_sightings<I, S>(&self, sightings: I) -> Result<usize>
    where
        I: IntoIterator<Item = S>,
        S: Into<Sighting>,
    {
        let words: BTreeSet<String> = sightings
            .into_iter()
            .filter_map(|s| s.into().word())
            .collect();
        if words.is_empty() {
            return Ok(0);
        }

        self.store
            .update(Dataset::SeenWords, |seen: &mut SeenFrequencies| {
                for word in &words {
                    let n = seen.entry(word.clone()).or_insert(0);
                    *n = n.saturating_add(1);
                }
                Ok(())
            })?;
        self.cache.invalidate(Dataset::SeenWords);

        tracing::debug!("Recorded sightings for {} words", words.len());
        Ok(words.len())
    }
}
