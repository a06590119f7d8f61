//! Vocab Core: file-backed datasets, a staleness-checked cache and the merge engine

pub mod error;
pub mod model;
pub mod config;
pub mod store;
pub mod cache;
pub mod merge;
pub mod seen;
pub mod resolver;
pub mod text;
pub mod interchange;
pub mod articles;
pub mod vocabulary;

#[cfg(test)]
pub mod tests;

#[cfg(test)]
pub mod test_utils;

pub use error::{Result, VocabError};
pub use model::{
    ADDED_BY_BATCH, ADDED_BY_IMPORT, ADDED_BY_MANUAL, BatchItem, Dictionary, MergeReport,
    ResolvedWord, SeenFrequencies, Sighting, UpsertOutcome, UpsertStatus, UserWords, WordRecord,
    WordStats, normalize_word,
};
pub use config::Settings;
pub use store::{DataPaths, Dataset, JsonStore, Signature, write_json_atomic};
pub use cache::DatasetCache;
pub use merge::MergeEngine;
pub use seen::SeenWordAggregator;
pub use resolver::TranslationResolver;
pub use text::extract_vocabulary;
pub use interchange::{ExportFormat, convert_dictionary_csv};
pub use articles::{Article, ArticleStore, ArticleSummary, SavedArticle, SOURCE_MANUAL, SOURCE_WORKFLOW};
pub use vocabulary::Vocabulary;
