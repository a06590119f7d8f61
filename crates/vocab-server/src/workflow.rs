//! External article workflow: outbound trigger, inbound callback, job table

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::Context;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use vocab_core::{ResolvedWord, Sighting, normalize_word};

/// Something that can start the external article workflow for a job.
#[async_trait::async_trait]
pub trait WorkflowTrigger: Send + Sync {
    /// Start the workflow. The workflow answers later through the callback.
    async fn trigger(&self, job_id: &str) -> anyhow::Result<()>;
}

/// Starts the workflow by POSTing `{"job_id": ...}` to a webhook.
pub struct WebhookTrigger {
    client: reqwest::Client,
    url: String,
}

impl WebhookTrigger {
    pub fn new(url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build webhook client")?;
        Ok(WebhookTrigger {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait::async_trait]
impl WorkflowTrigger for WebhookTrigger {
    async fn trigger(&self, job_id: &str) -> anyhow::Result<()> {
        tracing::info!("Triggering workflow job {} via {}", job_id, self.url);
        self.client
            .post(&self.url)
            .json(&json!({ "job_id": job_id }))
            .send()
            .await
            .with_context(|| format!("Webhook request to {} failed", self.url))?
            .error_for_status()
            .context("Webhook rejected the job")?;
        Ok(())
    }
}

/// One entry of the callback word list: a single-key `{"word": "note"}`
/// pair, or a bare word. The key is always the word.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum CallbackWord {
    Bare(String),
    Pair(BTreeMap<String, Value>),
}

impl CallbackWord {
    pub fn word(&self) -> Option<String> {
        match self {
            CallbackWord::Bare(w) => normalize_word(w),
            CallbackWord::Pair(map) if map.len() == 1 => {
                map.keys().next().and_then(|k| normalize_word(k))
            }
            CallbackWord::Pair(_) => None,
        }
    }

    pub fn note(&self) -> Option<&str> {
        match self {
            CallbackWord::Pair(map) if map.len() == 1 => map.values().next().and_then(Value::as_str),
            _ => None,
        }
    }
}

/// Payload the workflow posts back when an article is ready.
#[derive(Debug, Clone, Deserialize)]
pub struct CallbackEnvelope {
    pub job_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    /// `[{"word": "note"}, ...]`
    #[serde(default)]
    pub words: Vec<CallbackWord>,
}

impl CallbackEnvelope {
    /// Bare-word sightings for the seen log.
    pub fn sightings(&self) -> Vec<Sighting> {
        self.words
            .iter()
            .filter_map(CallbackWord::word)
            .map(Sighting::Word)
            .collect()
    }

    /// The word list as `{word, zh}` pairs, the note serving as translation.
    pub fn resolved_words(&self) -> Vec<ResolvedWord> {
        self.words
            .iter()
            .filter_map(|w| {
                Some(ResolvedWord {
                    word: w.word()?,
                    zh: w.note().unwrap_or_default().to_string(),
                })
            })
            .collect()
    }
}

/// Article part of a finished job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobArticle {
    pub title: String,
    pub text: String,
    pub source: String,
    pub filename: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Done {
        article: JobArticle,
        words: Vec<ResolvedWord>,
    },
}

/// In-memory job results keyed by job id. Lost on restart.
#[derive(Default)]
pub struct JobTable {
    jobs: DashMap<String, JobStatus>,
}

impl JobTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&self, job_id: &str) {
        self.jobs.insert(job_id.to_string(), JobStatus::Pending);
    }

    pub fn complete(&self, job_id: &str, article: JobArticle, words: Vec<ResolvedWord>) {
        self.jobs
            .insert(job_id.to_string(), JobStatus::Done { article, words });
    }

    /// Drop a job whose trigger failed.
    pub fn forget(&self, job_id: &str) {
        self.jobs.remove(job_id);
    }

    /// Status of a job. Unknown jobs are reported as pending.
    pub fn status(&self, job_id: &str) -> JobStatus {
        self.jobs
            .get(job_id)
            .map(|entry| entry.value().clone())
            .unwrap_or(JobStatus::Pending)
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}
