//! Runtime settings: defaults, optional TOML file, environment overrides

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, VocabError};

/// Settings file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "vocab.toml";

pub const ENV_DATA_DIR: &str = "VOCAB_DATA_DIR";
pub const ENV_HOST: &str = "VOCAB_HOST";
pub const ENV_PORT: &str = "VOCAB_PORT";
pub const ENV_WEBHOOK_URL: &str = "N8N_WEBHOOK_URL";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Directory holding the three dataset files.
    pub data_dir: PathBuf,
    pub dictionary_file: String,
    pub words_file: String,
    pub seen_file: String,
    /// Directory for saved articles.
    pub articles_dir: PathBuf,
    pub host: String,
    pub port: u16,
    /// Workflow webhook. Triggering is disabled when unset.
    pub webhook_url: Option<String>,
    /// Seconds to wait for the webhook to answer.
    pub trigger_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            data_dir: PathBuf::from("."),
            dictionary_file: "ecdict.json".to_string(),
            words_file: "words.json".to_string(),
            seen_file: "seen_words.json".to_string(),
            articles_dir: PathBuf::from("data/articles"),
            host: "0.0.0.0".to_string(),
            port: 5000,
            webhook_url: None,
            trigger_timeout_secs: 10,
        }
    }
}

impl Settings {
    /// Load settings: defaults, then the TOML file, then `.env` and process
    /// environment.
    ///
    /// An explicit `path` must exist. Without one, `vocab.toml` is read only
    /// if present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let _ = dotenvy::dotenv();

        let mut settings = match path {
            Some(p) => Self::from_file(p)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Settings::default(),
        };
        settings.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| VocabError::storage(path, e))?;
        let settings = Self::from_toml(&content)?;
        tracing::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| VocabError::Config(format!("parse TOML failed: {}", e)))
    }

    /// Apply environment-style overrides through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(dir) = lookup(ENV_DATA_DIR) {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(host) = lookup(ENV_HOST) {
            self.host = host;
        }
        if let Some(port) = lookup(ENV_PORT) {
            self.port = port
                .trim()
                .parse()
                .map_err(|_| VocabError::Config(format!("{} is not a port: {}", ENV_PORT, port)))?;
        }
        if let Some(url) = lookup(ENV_WEBHOOK_URL) {
            self.webhook_url = Some(url);
        }
        Ok(())
    }

    pub fn trigger_timeout(&self) -> Duration {
        Duration::from_secs(self.trigger_timeout_secs)
    }

    /// Address the HTTP surface binds to.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
