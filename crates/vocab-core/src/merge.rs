//! Upsert and merge rules for the user word store
//!
//! Three write paths feed the store:
//!
//! - manual add ([`MergeEngine::upsert_one`]) bumps `count` by one,
//! - batch add ([`MergeEngine::upsert_batch`]) adds the word's current
//!   seen-frequency to `count`,
//! - bulk import ([`MergeEngine::import_merge`]) overlays incoming fields on
//!   top of the stored record.
//!
//! Every path ends with one write of the full record set followed by a cache
//! invalidation.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::cache::DatasetCache;
use crate::error::{Result, VocabError};
use crate::model::{
    ADDED_BY_BATCH, ADDED_BY_IMPORT, BatchItem, MergeReport, UpsertOutcome, UpsertStatus,
    WordRecord, normalize_word,
};
use crate::seen::SeenWordAggregator;
use crate::store::{Dataset, JsonStore};

/// The record set keyed by normalized word, in file order.
#[derive(Debug, Default)]
struct WordBook {
    records: Vec<WordRecord>,
    positions: HashMap<String, usize>,
}

impl WordBook {
    /// Re-normalize keys and fold duplicates, first occurrence wins.
    fn from_records(records: Vec<WordRecord>) -> Self {
        let mut book = WordBook::default();
        for mut record in records {
            let Some(word) = normalize_word(&record.word) else {
                tracing::warn!("Dropping stored record with an empty word");
                continue;
            };
            if book.positions.contains_key(&word) {
                tracing::warn!("Folding duplicate stored record for '{}'", word);
                continue;
            }
            record.word = word;
            book.insert(record);
        }
        book
    }

    fn get_mut(&mut self, word: &str) -> Option<&mut WordRecord> {
        let idx = *self.positions.get(word)?;
        self.records.get_mut(idx)
    }

    fn insert(&mut self, record: WordRecord) {
        self.positions.insert(record.word.clone(), self.records.len());
        self.records.push(record);
    }

    fn remove(&mut self, word: &str) -> bool {
        let before = self.records.len();
        self.records.retain(|r| r.word != word);
        if self.records.len() == before {
            return false;
        }
        self.positions = self
            .records
            .iter()
            .enumerate()
            .map(|(i, r)| (r.word.clone(), i))
            .collect();
        true
    }
}

/// Field overlay parsed from one import item. Only `word`, `definition`,
/// `reviewed` and `count` are read; any other field is dropped.
#[derive(Debug, Default, PartialEq)]
struct ImportPatch {
    word: String,
    definition: Option<String>,
    reviewed: Option<u32>,
    count: Option<u32>,
}

impl ImportPatch {
    /// `None` when the item is not an object or has no usable word.
    fn from_value(item: &Value) -> Option<Self> {
        let obj = item.as_object()?;
        let word = match obj.get("word")? {
            Value::String(s) => normalize_word(s)?,
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        Some(ImportPatch {
            word,
            definition: obj.get("definition").and_then(Value::as_str).map(str::to_string),
            reviewed: obj.get("reviewed").and_then(as_counter),
            // Zero would break the positive count invariant.
            count: obj.get("count").and_then(as_counter).filter(|c| *c > 0),
        })
    }

    fn apply(&self, record: &mut WordRecord) {
        if let Some(definition) = &self.definition {
            record.definition = definition.clone();
        }
        if let Some(reviewed) = self.reviewed {
            record.reviewed = reviewed;
        }
        if let Some(count) = self.count {
            record.count = count;
        }
    }

    fn into_record(self) -> WordRecord {
        let mut record = WordRecord::new(self.word.clone(), "", ADDED_BY_IMPORT);
        self.apply(&mut record);
        record
    }
}

/// Non-negative integer from a JSON number or a numeric string.
fn as_counter(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Applies the three write paths to the user word store.
pub struct MergeEngine {
    store: Arc<JsonStore>,
    cache: Arc<DatasetCache>,
    seen: SeenWordAggregator,
}

impl MergeEngine {
    pub fn new(store: Arc<JsonStore>, cache: Arc<DatasetCache>) -> Self {
        let seen = SeenWordAggregator::new(Arc::clone(&store), Arc::clone(&cache));
        MergeEngine { store, cache, seen }
    }

    /// Add or update one word from the manual path.
    pub fn upsert_one(&self, word: &str, definition: &str, added_by: &str) -> Result<UpsertOutcome> {
        let word = normalize_word(word)
            .ok_or_else(|| VocabError::InvalidInput("missing word".to_string()))?;
        let definition = definition.trim();

        self.seen.record_sightings([word.as_str()])?;

        let outcome = self.write(|book| {
            if let Some(existing) = book.get_mut(&word) {
                if !definition.is_empty() {
                    existing.definition = definition.to_string();
                }
                existing.count = existing.count.saturating_add(1);
                Ok(UpsertOutcome {
                    status: UpsertStatus::Updated,
                    count: existing.count,
                })
            } else {
                book.insert(WordRecord::new(word.clone(), definition, added_by));
                Ok(UpsertOutcome {
                    status: UpsertStatus::Created,
                    count: 1,
                })
            }
        })?;

        tracing::info!("Upserted '{}' ({:?}, count {})", word, outcome.status, outcome.count);
        Ok(outcome)
    }

    /// Add many words, crediting each with its current seen-frequency.
    pub fn upsert_batch(&self, items: &[BatchItem]) -> Result<MergeReport> {
        if items.is_empty() {
            return Ok(MergeReport::default());
        }
        let seen = self.cache.seen_frequencies();

        let report = self.write(|book| {
            let mut report = MergeReport::default();
            for item in items {
                let Some(word) = item.word.as_deref().and_then(normalize_word) else {
                    report.skipped += 1;
                    continue;
                };
                let definition = item.translation();
                let credit = seen
                    .get(&word)
                    .map(|n| u32::try_from(*n).unwrap_or(u32::MAX))
                    .unwrap_or(1);

                if let Some(existing) = book.get_mut(&word) {
                    existing.count = existing.count.saturating_add(credit);
                    if !definition.is_empty() {
                        existing.definition = definition;
                    }
                    report.updated += 1;
                } else {
                    let added_by = item.added_by.as_deref().unwrap_or(ADDED_BY_BATCH);
                    let mut record = WordRecord::new(word, definition, added_by);
                    record.count = credit.max(1);
                    book.insert(record);
                    report.added += 1;
                }
            }
            Ok(report)
        })?;

        tracing::info!(
            "Batch add: {} added, {} updated, {} skipped",
            report.added,
            report.updated,
            report.skipped
        );
        Ok(report)
    }

    /// Overlay bulk-imported items onto the store.
    pub fn import_merge(&self, items: &[Value]) -> Result<MergeReport> {
        if items.is_empty() {
            return Err(VocabError::UnprocessableInput { skipped: 0 });
        }

        let patches: Vec<ImportPatch> = items.iter().filter_map(ImportPatch::from_value).collect();
        let skipped = items.len() - patches.len();
        if patches.is_empty() {
            tracing::warn!("Import rejected: all {} items unusable", skipped);
            return Err(VocabError::UnprocessableInput { skipped });
        }

        let report = self.write(|book| {
            let mut report = MergeReport {
                skipped,
                ..Default::default()
            };
            for patch in patches {
                if let Some(existing) = book.get_mut(&patch.word) {
                    patch.apply(existing);
                    report.updated += 1;
                } else {
                    book.insert(patch.into_record());
                    report.added += 1;
                }
            }
            Ok(report)
        })?;

        tracing::info!(
            "Import: {} added, {} updated, {} skipped",
            report.added,
            report.updated,
            report.skipped
        );
        Ok(report)
    }

    /// Remove a word. Returns whether a record was removed.
    pub fn delete_by_word(&self, word: &str) -> Result<bool> {
        let word = normalize_word(word)
            .ok_or_else(|| VocabError::InvalidInput("missing word".to_string()))?;
        let removed = self.write(|book| Ok(book.remove(&word)))?;
        if removed {
            tracing::info!("Deleted '{}'", word);
        }
        Ok(removed)
    }

    /// Record a review result. Returns the new `reviewed` value.
    pub fn record_review(&self, word: &str, remembered: bool) -> Result<u32> {
        let word = normalize_word(word)
            .ok_or_else(|| VocabError::InvalidInput("missing word".to_string()))?;
        self.write(|book| {
            let record = book
                .get_mut(&word)
                .ok_or_else(|| VocabError::NotFound(format!("word '{}'", word)))?;
            if remembered {
                record.reviewed = record.reviewed.saturating_add(1);
            }
            Ok(record.reviewed)
        })
    }

    fn write<R>(&self, f: impl FnOnce(&mut WordBook) -> Result<R>) -> Result<R> {
        let out = self
            .store
            .update(Dataset::UserWords, |records: &mut Vec<WordRecord>| {
                let mut book = WordBook::from_records(std::mem::take(records));
                let out = f(&mut book);
                *records = book.records;
                out
            })?;
        self.cache.invalidate(Dataset::UserWords);
        Ok(out)
    }
}
