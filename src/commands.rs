//! CLI command implementations

use std::fs::File;
use std::io::{BufReader, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use vocab_core::{DataPaths, Dataset, DatasetCache, ExportFormat, Settings, Vocabulary};
use vocab_server::{ServerConfig, ServerState, VocabServer};
use vocab_watcher::WatcherService;

pub async fn serve(settings: Settings, watch: bool) -> anyhow::Result<()> {
    tracing::info!("Starting vocab server on {}", settings.bind_addr());

    let vocab = Arc::new(Vocabulary::from_settings(&settings));
    let state = ServerState::from_settings(Arc::clone(&vocab), &settings)?;
    let config = ServerConfig {
        host: settings.host.clone(),
        port: settings.port,
    };
    let server = VocabServer::new(state, config);

    if watch {
        let cache = Arc::clone(vocab.cache());
        tokio::spawn(async move {
            if let Err(e) = run_watcher(cache).await {
                tracing::error!("Dataset watcher error: {}", e);
            }
        });
    }

    server.start().await
}

/// Run the dataset watcher until the process exits
async fn run_watcher(cache: Arc<DatasetCache>) -> anyhow::Result<()> {
    let mut watcher = WatcherService::new(cache)?;
    watcher.start_watching()?;
    watcher.process_events().await
}

pub fn convert_dict(
    settings: &Settings,
    input: PathBuf,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let mut paths = DataPaths::from_settings(settings);
    if let Some(output) = output {
        paths.dictionary = output;
    }
    let target = paths.dictionary.clone();

    let file = File::open(&input).with_context(|| format!("Cannot open {}", input.display()))?;
    let vocab = Vocabulary::new(paths);
    let entries = vocab.convert_dictionary(BufReader::new(file))?;

    tracing::info!("Wrote {} entries to {}", entries, target.display());
    Ok(())
}

pub fn export(
    settings: &Settings,
    format: ExportFormat,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let vocab = Vocabulary::from_settings(settings);
    let bytes = vocab.export(format)?;

    match output {
        Some(path) => {
            std::fs::write(&path, &bytes)
                .with_context(|| format!("Cannot write {}", path.display()))?;
            tracing::info!("Exported {} words to {}", vocab.words().len(), path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&bytes)?;
            stdout.flush()?;
        }
    }
    Ok(())
}

pub fn refresh(settings: &Settings) -> anyhow::Result<()> {
    let vocab = Vocabulary::from_settings(settings);
    vocab.refresh();

    let stats = vocab.stats();
    println!("dictionary entries: {}", vocab.get_dictionary().len());
    println!("user words:         {}", stats.total_words);
    println!("seen words:         {}", stats.total_seen);
    println!("average count:      {:.2}", stats.avg_count);

    for dataset in Dataset::ALL {
        if vocab.store().signature(dataset).is_none() {
            tracing::warn!(
                "No {} file at {}",
                dataset,
                vocab.store().path(dataset).display()
            );
        }
    }
    Ok(())
}
