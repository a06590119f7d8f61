//! Test utilities for vocab-core

use std::fs;

use tempfile::TempDir;

use crate::store::DataPaths;
use crate::vocabulary::Vocabulary;

/// Create a temporary data directory with a small dictionary, a word file
/// and a seen-word log.
pub fn create_test_data_dir() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();

    fs::write(
        root.join("ecdict.json"),
        r#"{
  "apple": "n. 蘋果",
  "company": "n. 公司；陪伴",
  "growth": "n. 成長",
  "impact": "n. 影響"
}
"#,
    )
    .unwrap();

    fs::write(
        root.join("words.json"),
        r#"[
  {
    "word": "apple",
    "definition": "my apple",
    "reviewed": 2,
    "count": 3,
    "added_by": "manual"
  },
  {
    "word": "impact",
    "definition": "",
    "reviewed": 0,
    "count": 1,
    "added_by": "batch"
  }
]
"#,
    )
    .unwrap();

    fs::write(
        root.join("seen_words.json"),
        r#"{
  "growth": 5,
  "impact": 2
}
"#,
    )
    .unwrap();

    temp_dir
}

/// A `Vocabulary` over a directory made by [`create_test_data_dir`].
pub fn seeded_vocabulary() -> (TempDir, Vocabulary) {
    let dir = create_test_data_dir();
    let vocab = Vocabulary::new(DataPaths::in_dir(dir.path()));
    (dir, vocab)
}

/// A `Vocabulary` over an empty directory.
pub fn empty_vocabulary() -> (TempDir, Vocabulary) {
    let dir = TempDir::new().unwrap();
    let vocab = Vocabulary::new(DataPaths::in_dir(dir.path()));
    (dir, vocab)
}
