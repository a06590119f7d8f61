//! Vocab CLI entry point

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vocab_core::{ExportFormat, Settings};

mod commands;

#[derive(Parser)]
#[command(name = "vocab")]
#[command(about = "Personal vocabulary store and parsing backend", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Settings file (defaults to ./vocab.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding the dataset files
    #[arg(short, long)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Reload the cache when dataset files change on disk
        #[arg(short, long)]
        watch: bool,
    },
    /// Convert an ECDICT-style CSV into the dictionary file
    ConvertDict {
        /// CSV with `word` and `translation` columns
        input: PathBuf,

        /// Output file (defaults to the configured dictionary file)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Export the word store
    Export {
        #[arg(short, long, value_enum, default_value = "json")]
        format: Format,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Load every dataset and print a summary
    Refresh,
    /// Show version
    Version,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Csv,
}

impl From<Format> for ExportFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Json => ExportFormat::Json,
            Format::Csv => ExportFormat::Csv,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!(
            "vocab={level},vocab_core={level},vocab_server={level},vocab_watcher={level}",
            level = log_level
        )))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(dir) = cli.data_dir {
        settings.data_dir = dir;
    }
    tracing::debug!("Data directory: {}", settings.data_dir.display());

    match cli.command {
        Commands::Serve { port, host, watch } => {
            if let Some(port) = port {
                settings.port = port;
            }
            if let Some(host) = host {
                settings.host = host;
            }
            tracing::info!("Vocab v{}", env!("CARGO_PKG_VERSION"));
            commands::serve(settings, watch).await
        }
        Commands::ConvertDict { input, output } => commands::convert_dict(&settings, input, output),
        Commands::Export { format, output } => commands::export(&settings, format.into(), output),
        Commands::Refresh => commands::refresh(&settings),
        Commands::Version => {
            println!("Vocab v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
