//! Axum router setup for the vocabulary server

use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, post},
};
use tower_http::cors::CorsLayer;

use crate::{
    ServerState,
    handlers::{
        add_word, add_words_batch, delete_word, export_words, get_job, health_check, import_words,
        list_articles, list_words, load_article, parse_text, random_word, review_word,
        save_article, trigger_workflow, word_stats, workflow_callback,
    },
};

/// Create the axum router with all routes
pub fn create_router(state: Arc<ServerState>) -> Router {
    Router::new()
        // Word store
        .route("/api/words", get(list_words).post(add_word))
        .route("/api/words/batch", post(add_words_batch))
        .route("/api/words/stats", get(word_stats))
        .route("/api/words/:word", delete(delete_word))
        .route("/api/review/:word", post(review_word))
        .route("/api/random", get(random_word))
        // Parsing and interchange
        .route("/api/parse", post(parse_text))
        .route("/api/export", get(export_words))
        .route("/api/import", post(import_words))
        // Articles
        .route("/api/articles/save", post(save_article))
        .route("/api/articles/list", get(list_articles))
        .route("/api/articles/load/:filename", get(load_article))
        // External workflow
        .route("/api/trigger", post(trigger_workflow))
        .route("/api/n8n_callback", post(workflow_callback))
        .route("/api/job/:job_id", get(get_job))
        .route("/api/health", get(health_check))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
