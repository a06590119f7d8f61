//! REST API handlers for the vocabulary server

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use vocab_core::{
    ADDED_BY_MANUAL, Article, ArticleSummary, BatchItem, ExportFormat, MergeReport, ResolvedWord,
    SOURCE_WORKFLOW, SavedArticle, UpsertStatus, VocabError, WordRecord, WordStats,
};

use crate::ServerState;
use crate::error::{ApiError, ApiResult};
use crate::workflow::{CallbackEnvelope, JobArticle, JobStatus};

/// Run a data-layer call on the blocking pool. File reads, atomic saves and
/// the per-dataset write locks never run on an async worker.
pub async fn blocking<T, F>(f: F) -> ApiResult<T>
where
    F: FnOnce() -> vocab_core::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::Internal(format!("data task failed: {}", e)))?
        .map_err(ApiError::from)
}

/// Body of `POST /api/words`
#[derive(Debug, Deserialize)]
pub struct AddWordRequest {
    #[serde(default)]
    pub word: Option<String>,
    #[serde(default)]
    pub definition: Option<String>,
    #[serde(default)]
    pub added_by: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AddWordResponse {
    pub status: UpsertStatus,
    pub count: u32,
}

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    #[serde(default)]
    pub remembered: bool,
}

#[derive(Debug, Serialize)]
pub struct ReviewResponse {
    pub word: String,
    pub reviewed: u32,
}

#[derive(Debug, Deserialize)]
pub struct ParseRequest {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    pub format: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SaveArticleRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SaveArticleResponse {
    pub status: &'static str,
    #[serde(flatten)]
    pub saved: SavedArticle,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

// Words

pub async fn list_words(State(state): State<Arc<ServerState>>) -> ApiResult<Json<Vec<WordRecord>>> {
    let words = blocking(move || {
        state.vocab.refresh();
        Ok(state.vocab.words())
    })
    .await?;
    Ok(Json(words))
}

pub async fn add_word(
    State(state): State<Arc<ServerState>>,
    Json(req): Json<AddWordRequest>,
) -> ApiResult<Json<AddWordResponse>> {
    let word = req.word.unwrap_or_default();
    let definition = req.definition.unwrap_or_default();
    let added_by = req.added_by.unwrap_or_else(|| ADDED_BY_MANUAL.to_string());

    let outcome = blocking(move || state.vocab.upsert_one(&word, &definition, &added_by)).await?;
    Ok(Json(AddWordResponse {
        status: outcome.status,
        count: outcome.count,
    }))
}

pub async fn delete_word(
    State(state): State<Arc<ServerState>>,
    Path(word): Path<String>,
) -> ApiResult<Json<Value>> {
    let target = word.clone();
    if !blocking(move || state.vocab.delete_by_word(&target)).await? {
        return Err(VocabError::NotFound(format!("word '{}'", word)).into());
    }
    Ok(Json(json!({ "status": "deleted" })))
}

/// Batch add. Items that are not objects count as skipped.
pub async fn add_words_batch(
    State(state): State<Arc<ServerState>>,
    Json(payload): Json<Value>,
) -> ApiResult<Json<MergeReport>> {
    let Value::Array(items) = payload else {
        return Err(ApiError::BadRequest("batch payload must be a list".to_string()));
    };
    let items: Vec<BatchItem> = items
        .into_iter()
        .map(|item| serde_json::from_value(item).unwrap_or_default())
        .collect();
    Ok(Json(blocking(move || state.vocab.upsert_batch(&items)).await?))
}

pub async fn word_stats(State(state): State<Arc<ServerState>>) -> ApiResult<Json<WordStats>> {
    Ok(Json(blocking(move || Ok(state.vocab.stats())).await?))
}

pub async fn review_word(
    State(state): State<Arc<ServerState>>,
    Path(word): Path<String>,
    Json(req): Json<ReviewRequest>,
) -> ApiResult<Json<ReviewResponse>> {
    let target = word.clone();
    let remembered = req.remembered;
    let reviewed = blocking(move || state.vocab.record_review(&target, remembered)).await?;
    Ok(Json(ReviewResponse { word, reviewed }))
}

pub async fn random_word(State(state): State<Arc<ServerState>>) -> ApiResult<Json<WordRecord>> {
    blocking(move || Ok(state.vocab.random_word()))
        .await?
        .map(Json)
        .ok_or_else(|| VocabError::NotFound("no words".to_string()).into())
}

// Parsing

pub async fn parse_text(
    State(state): State<Arc<ServerState>>,
    Json(req): Json<ParseRequest>,
) -> ApiResult<Json<Vec<ResolvedWord>>> {
    Ok(Json(blocking(move || state.vocab.parse(&req.text)).await?))
}

// Import / export

pub async fn export_words(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<ExportQuery>,
) -> ApiResult<Response> {
    let format = match query.format.as_deref() {
        None => ExportFormat::default(),
        Some(name) => ExportFormat::parse(name)
            .ok_or_else(|| ApiError::BadRequest(format!("unknown export format: {}", name)))?,
    };

    let body = blocking(move || {
        state.vocab.refresh();
        state.vocab.export(format)
    })
    .await?;
    let response = match format {
        ExportFormat::Json => ([(header::CONTENT_TYPE, "application/json")], body).into_response(),
        ExportFormat::Csv => (
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
                (header::CONTENT_DISPOSITION, "attachment; filename=\"words.csv\""),
            ],
            body,
        )
            .into_response(),
    };
    Ok(response)
}

/// Bulk import from a JSON array or a CSV body, chosen by content type.
pub async fn import_words(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<MergeReport>> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    let report = if content_type.contains("application/json") {
        blocking(move || state.vocab.import_json(&body)).await?
    } else if content_type.contains("text/csv") {
        blocking(move || state.vocab.import_csv(&body)).await?
    } else {
        return Err(ApiError::BadRequest(format!(
            "unsupported content type: {}",
            if content_type.is_empty() { "none" } else { content_type.as_str() }
        )));
    };
    Ok(Json(report))
}

// Articles

pub async fn save_article(
    State(state): State<Arc<ServerState>>,
    Json(req): Json<SaveArticleRequest>,
) -> ApiResult<Json<SaveArticleResponse>> {
    let saved = blocking(move || {
        state.articles.save(
            req.title.as_deref().unwrap_or_default(),
            req.text.as_deref().unwrap_or_default(),
            req.source.as_deref(),
        )
    })
    .await?;
    Ok(Json(SaveArticleResponse {
        status: "saved",
        saved,
    }))
}

pub async fn list_articles(
    State(state): State<Arc<ServerState>>,
) -> ApiResult<Json<Vec<ArticleSummary>>> {
    Ok(Json(blocking(move || state.articles.list()).await?))
}

pub async fn load_article(
    State(state): State<Arc<ServerState>>,
    Path(filename): Path<String>,
) -> ApiResult<Json<Article>> {
    Ok(Json(blocking(move || state.articles.load(&filename)).await?))
}

// Workflow

pub async fn trigger_workflow(State(state): State<Arc<ServerState>>) -> Response {
    let Some(trigger) = state.trigger.as_ref() else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "error", "detail": "workflow webhook not configured" })),
        )
            .into_response();
    };

    let job_id = uuid::Uuid::new_v4().to_string();
    state.jobs.start(&job_id);
    match trigger.trigger(&job_id).await {
        Ok(()) => Json(json!({ "status": "ok", "job_id": job_id })).into_response(),
        Err(e) => {
            tracing::warn!("Workflow trigger failed for job {}: {:#}", job_id, e);
            state.jobs.forget(&job_id);
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "status": "error", "detail": format!("{:#}", e) })),
            )
                .into_response()
        }
    }
}

pub async fn workflow_callback(
    State(state): State<Arc<ServerState>>,
    Json(envelope): Json<CallbackEnvelope>,
) -> ApiResult<Json<Value>> {
    let data = Arc::clone(&state);
    let (saved, envelope) = blocking(move || {
        let saved = data
            .articles
            .save(&envelope.title, &envelope.content, Some(SOURCE_WORKFLOW))?;
        data.vocab.record_sightings(envelope.sightings())?;
        Ok((saved, envelope))
    })
    .await?;

    let words = envelope.resolved_words();
    tracing::info!(
        "Workflow job {} finished: {} ({} words)",
        envelope.job_id,
        saved.filename,
        words.len()
    );
    let article = JobArticle {
        title: saved.title,
        text: envelope.content.trim().to_string(),
        source: saved.source,
        filename: saved.filename,
    };
    state.jobs.complete(&envelope.job_id, article, words);
    Ok(Json(json!({ "status": "ok" })))
}

pub async fn get_job(
    State(state): State<Arc<ServerState>>,
    Path(job_id): Path<String>,
) -> Json<JobStatus> {
    Json(state.jobs.status(&job_id))
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    let health = HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };
    Json(health)
}
