use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use news_xai::{
    cli::{execute_command, Cli},
    config::{Config, LogFormat, PersistMode},
    service::ClassifyService,
    storage::{InsightStore, SqliteStorage},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize logging
    init_logging(&config);

    // A one-shot process would exit before a detached write lands.
    if config.pipeline.persist_mode == PersistMode::Detached {
        info!("PERSIST_MODE=detached ignored by the CLI, writing inline");
        config.pipeline.persist_mode = PersistMode::Inline;
    }

    info!(version = env!("CARGO_PKG_VERSION"), "news-xai starting");

    // Initialize storage
    let storage = match SqliteStorage::new(&config.database).await {
        Ok(s) => {
            info!(path = %config.database.path.display(), "Database initialized");
            Arc::new(s)
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize database");
            return Err(e.into());
        }
    };

    let store: Arc<dyn InsightStore> = storage.clone();
    let service = match ClassifyService::from_config(&config, Some(store)) {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "Failed to build classification service");
            return Err(e.into());
        }
    };

    let result = execute_command(cli.command, &service, storage.as_ref()).await;
    if result.exit_code == 0 {
        println!("{}", result.message);
    } else {
        eprintln!("{}", result.message);
    }
    std::process::exit(result.exit_code);
}

/// Initialize tracing/logging
fn init_logging(config: &Config) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}
