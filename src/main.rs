use std::sync::Arc;

use log::{error, info, warn};

use solana_outflow_listener::{
    config::{load_env_files, QualifierMode},
    logging::{self, QualifiedLog},
    stream::GeyserSource,
    AppConfig,
    AppContext,
    RunOutcome,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Environment files first so RUST_LOG and LOG_DIR apply
    let env_files = load_env_files();

    let config = AppConfig::load_from_env()?;
    logging::init(&config.log)?;
    for path in &env_files {
        info!("Loaded environment from {}", path.display());
    }

    let context = AppContext::new(config)?;
    let config = Arc::clone(&context.config);

    let price_task = match config.qualifier.mode {
        QualifierMode::Pnl => Some(context.price_feed.spawn(context.shutdown.clone())),
        QualifierMode::Stats => None,
    };

    let shutdown = context.shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Ctrl-C received, shutting down");
            shutdown.cancel();
        }
    });

    info!(
        "Watching hot wallet {} via {} ({:?} qualifier)",
        config.stream.hot_wallet, config.stream.endpoint, config.qualifier.mode
    );
    let source = Arc::new(GeyserSource::new(&config.stream));
    let mut subscriber = context.subscriber(source, context.provider());

    let outcome = subscriber.run().await;
    context.shutdown.cancel();
    if let Some(task) = price_task {
        let _ = task.await;
    }

    let outcome = outcome.map_err(|e| {
        error!("Stream stopped: {}", e);
        e
    })?;
    match outcome {
        RunOutcome::Qualified(wallet) => {
            let path = QualifiedLog::new(&config.log.dir).append(&*wallet)?;
            info!(
                "Qualified wallet {} written to {}",
                wallet.candidate.to_address,
                path.display()
            );
        }
        RunOutcome::Cancelled => info!("Stopped before any wallet qualified"),
    }
    Ok(())
}
