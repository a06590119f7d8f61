//! End-to-end tests for vocab-core

use std::fs;
use std::sync::Arc;
use std::thread;

use serde_json::json;

use crate::test_utils::{empty_vocabulary, seeded_vocabulary};
use crate::*;

#[test]
fn test_normalization_is_idempotent() {
    let (_dir, vocab) = empty_vocabulary();
    vocab.upsert_one("  Cat ", "", ADDED_BY_MANUAL).unwrap();
    let outcome = vocab.upsert_one("cat", "a feline", ADDED_BY_MANUAL).unwrap();

    assert_eq!(outcome.status, UpsertStatus::Updated);
    let words = vocab.words();
    assert_eq!(words.len(), 1);
    assert_eq!(words[0].word, "cat");
    assert_eq!(words[0].definition, "a feline");
    assert_eq!(words[0].count, 2);
}

#[test]
fn test_batch_add_credits_seen_frequency() {
    let (_dir, vocab) = seeded_vocabulary();
    let batch = [BatchItem::new("growth").with_zh("成長")];

    vocab.upsert_batch(&batch).unwrap();
    let growth = |v: &Vocabulary| v.words().into_iter().find(|r| r.word == "growth").unwrap();
    assert_eq!(growth(&vocab).count, 5);
    assert_eq!(growth(&vocab).definition, "成長");
    assert_eq!(growth(&vocab).added_by, ADDED_BY_BATCH);

    vocab.upsert_batch(&batch).unwrap();
    assert_eq!(growth(&vocab).count, 10);
}

#[test]
fn test_import_overlays_without_resetting() {
    let (_dir, vocab) = empty_vocabulary();
    for _ in 0..7 {
        vocab.upsert_one("dog", "狗", ADDED_BY_MANUAL).unwrap();
    }

    let report = vocab.import_merge(&[json!({"word": "dog", "reviewed": 3})]).unwrap();
    assert_eq!(report.updated, 1);

    let dog = &vocab.words()[0];
    assert_eq!(dog.count, 7);
    assert_eq!(dog.reviewed, 3);
    assert_eq!(dog.definition, "狗");
}

#[test]
fn test_empty_and_garbage_input() {
    let (dir, vocab) = empty_vocabulary();
    assert_eq!(vocab.upsert_batch(&[]).unwrap(), MergeReport::default());
    assert!(!dir.path().join("words.json").exists());

    match vocab.import_merge(&[json!({})]) {
        Err(VocabError::UnprocessableInput { skipped }) => assert_eq!(skipped, 1),
        other => panic!("expected UnprocessableInput, got {:?}", other),
    }
    assert!(matches!(
        vocab.import_json(br#"{"word": "cat"}"#),
        Err(VocabError::BadRequest(_))
    ));
}

#[test]
fn test_cache_serves_same_snapshot_until_file_changes() {
    let (dir, vocab) = seeded_vocabulary();
    let cache = vocab.cache();

    let first = vocab.get_dictionary();
    let second = vocab.get_dictionary();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(cache.reload_count(Dataset::Dictionary), 1);

    fs::write(dir.path().join("ecdict.json"), r#"{"zebra": "n. 斑馬", "apple": "n. 蘋果"}"#)
        .unwrap();
    cache.invalidate(Dataset::Dictionary);
    let third = vocab.get_dictionary();
    assert_eq!(third.get("zebra").map(String::as_str), Some("n. 斑馬"));
    assert_eq!(cache.reload_count(Dataset::Dictionary), 2);
}

#[test]
fn test_own_writes_are_visible_immediately() {
    let (_dir, vocab) = seeded_vocabulary();
    assert_eq!(vocab.get_user_words().len(), 2);

    vocab.upsert_one("company", "", ADDED_BY_MANUAL).unwrap();
    let user = vocab.get_user_words();
    assert_eq!(user.len(), 3);
    assert_eq!(user.definition("company"), Some(""));
    assert_eq!(vocab.resolve("company"), "n. 公司；陪伴");
}

#[test]
fn test_seen_counts_are_monotonic() {
    let (_dir, vocab) = seeded_vocabulary();
    let before = (*vocab.get_seen_frequencies()).clone();

    vocab.record_sightings(["x"]).unwrap();
    vocab.record_sightings(["x"]).unwrap();
    let after = vocab.get_seen_frequencies();

    assert_eq!(after.get("x"), Some(&2));
    for (word, n) in &before {
        assert!(after[word] >= *n);
    }
}

#[test]
fn test_callback_shaped_sightings() {
    let (_dir, vocab) = seeded_vocabulary();
    let words: Vec<Sighting> =
        serde_json::from_value(json!([{"impact": "影響"}, {"company": "公司"}])).unwrap();
    assert_eq!(vocab.record_sightings(words).unwrap(), 2);

    let seen = vocab.get_seen_frequencies();
    assert_eq!(seen.get("impact"), Some(&3));
    assert_eq!(seen.get("company"), Some(&1));
}

#[test]
fn test_resolver_precedence() {
    let (_dir, vocab) = seeded_vocabulary();
    assert_eq!(vocab.resolve("apple"), "my apple");
    assert_eq!(vocab.resolve("impact"), "n. 影響");
    assert_eq!(vocab.resolve("nothing"), "");
}

#[test]
fn test_corrupt_word_file_fails_loudly_on_write() {
    let (dir, vocab) = seeded_vocabulary();
    let path = dir.path().join("words.json");
    fs::write(&path, "[{ broken").unwrap();

    assert!(vocab.get_user_words().is_empty());
    assert!(matches!(
        vocab.upsert_one("cat", "", ADDED_BY_MANUAL),
        Err(VocabError::StorageFailure { .. })
    ));
    assert_eq!(fs::read_to_string(&path).unwrap(), "[{ broken");
}

#[test]
fn test_concurrent_writers_lose_nothing() {
    let (_dir, vocab) = empty_vocabulary();
    let vocab = Arc::new(vocab);

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let vocab = Arc::clone(&vocab);
            thread::spawn(move || {
                for _ in 0..5 {
                    vocab.upsert_one("shared", "", ADDED_BY_MANUAL).unwrap();
                    vocab.record_sightings([format!("word{}", i)]).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let words = vocab.words();
    assert_eq!(words.len(), 1);
    assert_eq!(words[0].count, 20);

    let seen = vocab.get_seen_frequencies();
    assert_eq!(seen.get("shared"), Some(&20));
    for i in 0..4 {
        assert_eq!(seen.get(&format!("word{}", i)), Some(&5));
    }
}

#[test]
fn test_csv_export_reimports_cleanly() {
    let (_dir, vocab) = seeded_vocabulary();
    let csv = vocab.export(ExportFormat::Csv).unwrap();

    let (_other_dir, other) = empty_vocabulary();
    let report = other.import_csv(&csv).unwrap();
    assert_eq!(report.added, 2);

    let fields = |v: &Vocabulary| {
        v.words()
            .into_iter()
            .map(|r| (r.word, r.definition, r.reviewed, r.count))
            .collect::<Vec<_>>()
    };
    assert_eq!(fields(&other), fields(&vocab));
    assert!(other.words().iter().all(|r| r.added_by == ADDED_BY_IMPORT));
}
