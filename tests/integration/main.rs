//! Integration tests for vocab
//!
//! These tests drive the binary and the full router over a real data
//! directory.

use std::fs;
use std::process::Command;
use std::sync::Arc;

use axum::{
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;
use vocab_core::{ArticleStore, DataPaths, Dataset, Vocabulary};
use vocab_server::{ServerState, create_router};

fn vocab_cmd(data_dir: &std::path::Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_vocab"));
    cmd.arg("--data-dir").arg(data_dir);
    cmd
}

/// Test that the CLI can be invoked
#[test]
fn test_cli_invocation() {
    let output = Command::new(env!("CARGO_BIN_EXE_vocab"))
        .arg("--help")
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert!(stdout.contains("Personal vocabulary store and parsing backend"));
    assert!(stdout.contains("convert-dict"));
}

/// Convert a dictionary CSV, then resolve through the library
#[test]
fn test_convert_dict_command() {
    let dir = TempDir::new().unwrap();
    let csv = dir.path().join("ecdict.csv");
    fs::write(
        &csv,
        "word,phonetic,translation\nOtter,,\"n. 水獺\nn. 獺皮\"\nempty,,\n",
    )
    .unwrap();

    let status = vocab_cmd(dir.path())
        .arg("convert-dict")
        .arg(&csv)
        .status()
        .unwrap();
    assert!(status.success());

    let vocab = Vocabulary::new(DataPaths::in_dir(dir.path()));
    assert_eq!(vocab.get_dictionary().len(), 1);
    assert_eq!(vocab.resolve("otter"), "n. 水獺；n. 獺皮");
}

/// Export writes the word store as CSV with a BOM
#[test]
fn test_export_command() {
    let dir = TempDir::new().unwrap();
    let vocab = Vocabulary::new(DataPaths::in_dir(dir.path()));
    vocab.upsert_one("otter", "水獺", "manual").unwrap();

    let out = dir.path().join("words.csv");
    let status = vocab_cmd(dir.path())
        .args(["export", "--format", "csv", "--output"])
        .arg(&out)
        .status()
        .unwrap();
    assert!(status.success());

    let text = fs::read_to_string(&out).unwrap();
    assert_eq!(
        text,
        "\u{feff}word,definition,reviewed,count,added_by\notter,水獺,0,1,manual\n"
    );
}

/// Exporting an empty store fails
#[test]
fn test_export_empty_store_fails() {
    let dir = TempDir::new().unwrap();
    let output = vocab_cmd(dir.path()).arg("export").output().unwrap();
    assert!(!output.status.success());
}

/// Words added over HTTP are visible to another process's view of the files
#[tokio::test]
async fn test_http_writes_reach_disk() {
    let dir = TempDir::new().unwrap();
    let vocab = Arc::new(Vocabulary::new(DataPaths::in_dir(dir.path())));
    let state = ServerState::new(Arc::clone(&vocab), ArticleStore::new(dir.path().join("articles")));
    let app = create_router(Arc::new(state));

    let request = Request::post("/api/words/batch")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!([{"word": "Otter", "zh": "水獺"}, {"word": "badger", "definition": "獾"}]).to_string(),
        ))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let other = Vocabulary::new(DataPaths::in_dir(dir.path()));
    let words = other.words();
    assert_eq!(words.len(), 2);
    assert_eq!(words[0].word, "otter");
    assert_eq!(words[0].added_by, "batch");

    let raw = fs::read_to_string(dir.path().join("words.json")).unwrap();
    assert!(raw.contains("\"definition\": \"水獺\""));
    assert!(raw.ends_with('\n'));
}

/// Another writer replaces a dataset file; the next request sees it
#[tokio::test]
async fn test_external_edit_is_picked_up() {
    let dir = TempDir::new().unwrap();
    let vocab = Arc::new(Vocabulary::new(DataPaths::in_dir(dir.path())));
    let state = ServerState::new(Arc::clone(&vocab), ArticleStore::new(dir.path().join("articles")));
    let app = create_router(Arc::new(state));

    let parse = |text: &str| {
        Request::post("/api/parse")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json!({ "text": text }).to_string()))
            .unwrap()
    };

    let response = app.clone().oneshot(parse("otter")).await.unwrap();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body, json!([{"word": "otter", "zh": ""}]));

    fs::write(dir.path().join("ecdict.json"), r#"{"otter": "n. 水獺"}"#).unwrap();

    let response = app.clone().oneshot(parse("otter")).await.unwrap();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body, json!([{"word": "otter", "zh": "n. 水獺"}]));

    assert_eq!(vocab.get_seen_frequencies().get("otter"), Some(&2));
    assert!(vocab.cache().reload_count(Dataset::Dictionary) >= 1);
}
