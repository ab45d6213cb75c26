use anyhow::{ Context, Result };
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{ layer::SubscriberExt, util::SubscriberInitExt };

use flightreplay::config::{ self, ReplayConfig };
use flightreplay::frame::GeoJsonDirSurface;
use flightreplay::loader::DatasetLoader;
use flightreplay::session::{ self, IntervalScheduler, ReplayOutcome };
use flightreplay::state::ReplayState;

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber
        ::registry()
        .with(
            tracing_subscriber::EnvFilter
                ::try_from_default_env()
                .unwrap_or_else(|_| "flightreplay=debug,info".into())
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting flight replay");

    // Load configuration
    let config = config::load_config()?;
    tracing::info!("Configuration loaded successfully");

    // Ticks are cooperative and never overlap, one thread is all the loop needs
    let runtime = tokio::runtime::Builder
        ::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to create runtime")?;

    runtime.block_on(run(config))
}

async fn run(config: ReplayConfig) -> Result<()> {
    let mut surface = GeoJsonDirSurface::new(&config.output.directory).with_context(||
        format!("Failed to prepare output directory {}", config.output.directory.display())
    )?;
    let loader = DatasetLoader::new(Duration::from_secs(config.data.request_timeout_secs))?;

    let state = ReplayState::new();
    let cancel = CancellationToken::new();

    // Stop on Ctrl-C
    let stopper = cancel.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            return;
        }
        tracing::info!("Ctrl-C received, stopping replay");
        stopper.cancel();
    });

    // Periodic status line
    if config.output.status_interval_secs > 0 {
        let reporter = state.clone();
        let period = Duration::from_secs(config.output.status_interval_secs);
        let done = cancel.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = done.cancelled() => break,
                    _ = interval.tick() => reporter.report(),
                }
            }
        });
    }

    let mut scheduler = IntervalScheduler::new(config.output.frame_interval());
    let outcome = session::replay_source(&config, &loader, state.clone(), &mut scheduler, &mut surface, &cancel)
        .await
        .context("Failed to write empty sources")?;

    // status tasks end with the loop
    cancel.cancel();

    if let ReplayOutcome::Replayed { .. } = outcome {
        state.report();
    }
    Ok(())
}
