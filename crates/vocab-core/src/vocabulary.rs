//! The data layer as one handle: store, cache and the engines on top

use std::io::Read;
use std::sync::Arc;

use rand::seq::SliceRandom;
use serde_json::Value;

use crate::cache::DatasetCache;
use crate::config::Settings;
use crate::error::{Result, VocabError};
use crate::interchange::{self, ExportFormat};
use crate::merge::MergeEngine;
use crate::model::{
    BatchItem, Dictionary, MergeReport, ResolvedWord, SeenFrequencies, Sighting, UpsertOutcome,
    UserWords, WordRecord, WordStats,
};
use crate::resolver::TranslationResolver;
use crate::seen::SeenWordAggregator;
use crate::store::{DataPaths, Dataset, JsonStore};
use crate::text::extract_vocabulary;

/// Shared entry point for every caller of the data layer.
///
/// Cheap to share behind an `Arc`; all methods take `&self`.
pub struct Vocabulary {
    store: Arc<JsonStore>,
    cache: Arc<DatasetCache>,
    merge: MergeEngine,
    seen: SeenWordAggregator,
    resolver: TranslationResolver,
}

impl Vocabulary {
    pub fn new(paths: DataPaths) -> Self {
        let store = Arc::new(JsonStore::new(paths));
        let cache = Arc::new(DatasetCache::new(Arc::clone(&store)));
        Vocabulary {
            merge: MergeEngine::new(Arc::clone(&store), Arc::clone(&cache)),
            seen: SeenWordAggregator::new(Arc::clone(&store), Arc::clone(&cache)),
            resolver: TranslationResolver::new(Arc::clone(&cache)),
            store,
            cache,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(DataPaths::from_settings(settings))
    }

    pub fn store(&self) -> &Arc<JsonStore> {
        &self.store
    }

    pub fn cache(&self) -> &Arc<DatasetCache> {
        &self.cache
    }

    // Reads

    pub fn get_dictionary(&self) -> Arc<Dictionary> {
        self.cache.dictionary()
    }

    pub fn get_user_words(&self) -> Arc<UserWords> {
        self.cache.user_words()
    }

    pub fn get_seen_frequencies(&self) -> Arc<SeenFrequencies> {
        self.cache.seen_frequencies()
    }

    /// The canonical record sequence.
    pub fn words(&self) -> Vec<WordRecord> {
        self.cache.user_words().records().to_vec()
    }

    pub fn stats(&self) -> WordStats {
        let user = self.cache.user_words();
        let seen = self.cache.seen_frequencies();
        let total_words = user.len();
        let avg_count = if total_words == 0 {
            0.0
        } else {
            let sum: u64 = user.records().iter().map(|r| u64::from(r.count)).sum();
            (sum as f64 / total_words as f64 * 100.0).round() / 100.0
        };
        WordStats {
            total_words,
            total_seen: seen.len(),
            avg_count,
        }
    }

    /// A uniformly random record, or `None` when the store is empty.
    pub fn random_word(&self) -> Option<WordRecord> {
        let user = self.cache.user_words();
        user.records().choose(&mut rand::thread_rng()).cloned()
    }

    /// Check all three backing files now.
    pub fn refresh(&self) {
        self.cache.invalidate_and_reload();
    }

    // Writes

    pub fn upsert_one(&self, word: &str, definition: &str, added_by: &str) -> Result<UpsertOutcome> {
        self.merge.upsert_one(word, definition, added_by)
    }

    pub fn upsert_batch(&self, items: &[BatchItem]) -> Result<MergeReport> {
        self.merge.upsert_batch(items)
    }

    pub fn import_merge(&self, items: &[Value]) -> Result<MergeReport> {
        self.merge.import_merge(items)
    }

    pub fn delete_by_word(&self, word: &str) -> Result<bool> {
        self.merge.delete_by_word(word)
    }

    pub fn record_review(&self, word: &str, remembered: bool) -> Result<u32> {
        self.merge.record_review(word, remembered)
    }

    pub fn record_sightings<I, S>(&self, sightings: I) -> Result<usize>
    where
        I: IntoIterator<Item = S>,
        S: Into<Sighting>,
    {
        self.seen.record_sightings(sightings)
    }

    /// Replace the reference dictionary.
    pub fn install_dictionary(&self, dictionary: &Dictionary) -> Result<()> {
        {
            let _guard = self.store.lock(Dataset::Dictionary);
            self.store.save(Dataset::Dictionary, dictionary)?;
        }
        self.cache.invalidate(Dataset::Dictionary);
        tracing::info!("Installed dictionary with {} entries", dictionary.len());
        Ok(())
    }

    /// Convert an ECDICT-style CSV and install it as the dictionary.
    pub fn convert_dictionary<R: Read>(&self, reader: R) -> Result<usize> {
        let dictionary = interchange::convert_dictionary_csv(reader)?;
        self.install_dictionary(&dictionary)?;
        Ok(dictionary.len())
    }

    // Translation and parsing

    pub fn resolve(&self, word: &str) -> String {
        self.resolver.resolve(word)
    }

    pub fn resolve_all<'a, I>(&self, words: I) -> Vec<ResolvedWord>
    where
        I: IntoIterator<Item = &'a str>,
    {
        self.resolver
            .resolve_all(words)
            .into_iter()
            .map(|(word, zh)| ResolvedWord { word, zh })
            .collect()
    }

    /// Tokenize `text`, log one sighting per distinct word and translate.
    pub fn parse(&self, text: &str) -> Result<Vec<ResolvedWord>> {
        self.refresh();
        let words = extract_vocabulary(text);
        self.seen.record_sightings(words.iter().map(String::as_str))?;
        tracing::info!("Parsed {} distinct words", words.len());
        Ok(self.resolve_all(words.iter().map(String::as_str)))
    }

    // Interchange

    pub fn import_json(&self, payload: &[u8]) -> Result<MergeReport> {
        let items = interchange::parse_json_payload(payload)?;
        self.import_merge(&items)
    }

    pub fn import_csv(&self, payload: &[u8]) -> Result<MergeReport> {
        let items = interchange::parse_csv_payload(payload)?;
        self.import_merge(&items)
    }

    /// Render every record. An empty store has nothing to export.
    pub fn export(&self, format: ExportFormat) -> Result<Vec<u8>> {
        let records = self.words();
        if records.is_empty() {
            return Err(VocabError::NotFound("nothing to export".to_string()));
        }
        match format {
            ExportFormat::Json => interchange::export_json(&records).map(String::into_bytes),
            ExportFormat::Csv => interchange::export_csv(&records),
        }
    }
}
