//! Core data structures for the vocabulary store

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

/// Reference dictionary: lowercase word -> translation.
pub type Dictionary = BTreeMap<String, String>;

/// Seen-word log: lowercase word -> number of sightings.
pub type SeenFrequencies = BTreeMap<String, u64>;

/// Origin tag for records created through the manual add path.
pub const ADDED_BY_MANUAL: &str = "manual";
/// Origin tag for records created through batch add.
pub const ADDED_BY_BATCH: &str = "batch";
/// Origin tag for records created through bulk import.
pub const ADDED_BY_IMPORT: &str = "import";

/// Trim and lowercase a word. Returns `None` when nothing is left.
pub fn normalize_word(raw: &str) -> Option<String> {
    let word = raw.trim().to_lowercase();
    if word.is_empty() { None } else { Some(word) }
}

/// One vocabulary entry in the user word store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WordRecord {
    pub word: String,
    #[serde(default)]
    pub definition: String,
    /// Successful reviews.
    #[serde(default)]
    pub reviewed: u32,
    /// Occurrence / exposure counter, always positive.
    #[serde(default = "default_count")]
    pub count: u32,
    #[serde(default = "default_added_by")]
    pub added_by: String,
}

fn default_count() -> u32 {
    1
}

fn default_added_by() -> String {
    ADDED_BY_IMPORT.to_string()
}

impl WordRecord {
    pub fn new(word: impl Into<String>, definition: impl Into<String>, added_by: impl Into<String>) -> Self {
        WordRecord {
            word: word.into(),
            definition: definition.into(),
            reviewed: 0,
            count: 1,
            added_by: added_by.into(),
        }
    }
}

/// Cached view of the user word store: the raw record sequence plus a
/// derived `word -> definition` index rebuilt on every reload.
#[derive(Debug, Clone, Default)]
pub struct UserWords {
    records: Vec<WordRecord>,
    definitions: HashMap<String, String>,
}

impl UserWords {
    pub fn new(records: Vec<WordRecord>) -> Self {
        // First occurrence wins, same as the write path's duplicate folding.
        let mut definitions = HashMap::with_capacity(records.len());
        for r in &records {
            if let Some(word) = normalize_word(&r.word) {
                definitions
                    .entry(word)
                    .or_insert_with(|| r.definition.clone());
            }
        }
        UserWords { records, definitions }
    }

    /// The raw record sequence, in file order.
    pub fn records(&self) -> &[WordRecord] {
        &self.records
    }

    /// User definition for a word, if the word is in the store.
    pub fn definition(&self, word: &str) -> Option<&str> {
        self.definitions.get(word).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpsertStatus {
    Created,
    Updated,
}

/// Result of a single-word upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsertOutcome {
    pub status: UpsertStatus,
    pub count: u32,
}

/// Partial-success report for batch add and bulk import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeReport {
    pub added: usize,
    pub updated: usize,
    pub skipped: usize,
}

/// One item of a batch add as producers send it.
///
/// The parsing pipeline names the translation `zh`, manual producers name
/// it `definition`; both spellings are accepted here and folded into one
/// value by [`BatchItem::translation`] before the merge engine sees it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchItem {
    #[serde(default)]
    pub word: Option<String>,
    #[serde(default)]
    pub definition: Option<String>,
    #[serde(default)]
    pub zh: Option<String>,
    #[serde(default)]
    pub added_by: Option<String>,
}

impl BatchItem {
    pub fn new(word: impl Into<String>) -> Self {
        BatchItem {
            word: Some(word.into()),
            ..Default::default()
        }
    }

    pub fn with_definition(mut self, definition: impl Into<String>) -> Self {
        self.definition = Some(definition.into());
        self
    }

    pub fn with_zh(mut self, zh: impl Into<String>) -> Self {
        self.zh = Some(zh.into());
        self
    }

    /// First non-empty of `definition` and `zh`, trimmed.
    pub fn translation(&self) -> String {
        [self.definition.as_deref(), self.zh.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|s| !s.is_empty())
            .unwrap_or_default()
            .to_string()
    }
}

/// A sighting fed to the seen-word aggregator.
///
/// Either a bare word, or a record. Records are `{"word": "impact"}` or the
/// single-key `{"impact": "note"}` shape sent by the workflow callback, in
/// which case the key is the word and the note is ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Sighting {
    Word(String),
    Record(BTreeMap<String, serde_json::Value>),
}

impl Sighting {
    /// The normalized word this sighting refers to.
    pub fn word(&self) -> Option<String> {
        match self {
            Sighting::Word(w) => normalize_word(w),
            Sighting::Record(map) => match map.get("word") {
                Some(serde_json::Value::String(w)) => normalize_word(w),
                Some(_) => None,
                None if map.len() == 1 => map.keys().next().and_then(|k| normalize_word(k)),
                None => None,
            },
        }
    }

    /// The note attached to a single-key record, if any.
    pub fn note(&self) -> Option<&str> {
        match self {
            Sighting::Record(map) if map.len() == 1 && !map.contains_key("word") => {
                map.values().next().and_then(|v| v.as_str())
            }
            _ => None,
        }
    }
}

impl From<&str> for Sighting {
    fn from(word: &str) -> Self {
        Sighting::Word(word.to_string())
    }
}

impl From<String> for Sighting {
    fn from(word: String) -> Self {
        Sighting::Word(word)
    }
}

/// A word paired with its resolved translation (empty when unknown).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedWord {
    pub word: String,
    pub zh: String,
}

/// Summary numbers over the word store and the seen log.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WordStats {
    pub total_words: usize,
    pub total_seen: usize,
    pub avg_count: f64,
}
