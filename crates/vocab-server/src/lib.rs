//! HTTP server over the vocabulary data layer

pub mod error;
pub mod handlers;
pub mod router;
pub mod workflow;


use std::sync::Arc;

use tokio::net::TcpListener;
use vocab_core::{ArticleStore, Settings, Vocabulary};

pub use error::{ApiError, ApiResult};
pub use router::create_router;
pub use workflow::{
    CallbackEnvelope, CallbackWord, JobStatus, JobTable, WebhookTrigger, WorkflowTrigger,
};

/// Shared state behind every handler
pub struct ServerState {
    pub vocab: Arc<Vocabulary>,
    pub articles: ArticleStore,
    /// `None` when no webhook is configured.
    pub trigger: Option<Arc<dyn WorkflowTrigger>>,
    pub jobs: JobTable,
}

impl ServerState {
    pub fn new(vocab: Arc<Vocabulary>, articles: ArticleStore) -> Self {
        ServerState {
            vocab,
            articles,
            trigger: None,
            jobs: JobTable::new(),
        }
    }

    pub fn with_trigger(mut self, trigger: Arc<dyn WorkflowTrigger>) -> Self {
        self.trigger = Some(trigger);
        self
    }

    /// State wired from settings. A configured webhook URL enables the
    /// workflow trigger.
    pub fn from_settings(vocab: Arc<Vocabulary>, settings: &Settings) -> anyhow::Result<Self> {
        let state = ServerState::new(vocab, ArticleStore::new(&settings.articles_dir));
        match settings.webhook_url.as_deref().filter(|u| !u.trim().is_empty()) {
            Some(url) => {
                let trigger = WebhookTrigger::new(url, settings.trigger_timeout())?;
                tracing::info!("Workflow trigger enabled: {}", trigger.url());
                Ok(state.with_trigger(Arc::new(trigger)))
            }
            None => {
                tracing::warn!("No workflow webhook configured; /api/trigger is disabled");
                Ok(state)
            }
        }
    }
}

/// Server bind configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

pub struct VocabServer {
    state: Arc<ServerState>,
    config: ServerConfig,
}

impl VocabServer {
    pub fn new(state: ServerState, config: ServerConfig) -> Self {
        VocabServer {
            state: Arc::new(state),
            config,
        }
    }

    pub fn state(&self) -> Arc<ServerState> {
        Arc::clone(&self.state)
    }

    /// Bind and serve until the process is stopped.
    pub async fn start(self) -> anyhow::Result<()> {
        let listener = TcpListener::bind(self.config.addr()).await?;
        tracing::info!("Listening on http://{}", listener.local_addr()?);

        // Warm the cache before the first request.
        self.state.vocab.refresh();

        axum::serve(listener, create_router(self.state)).await?;
        Ok(())
    }
}
