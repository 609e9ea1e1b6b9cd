mod classify;
mod config;
mod dispatch;
mod event;
mod gemini;
mod ladder;
mod narrative;
mod paths;
mod pipeline;
mod status;
mod watcher;
mod watchlist;

use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::dispatch::{Dispatcher, HttpBridge};
use crate::event::DaemonEvent;
use crate::gemini::GeminiClient;
use crate::narrative::Narrator;
use crate::pipeline::Processor;

#[tokio::main]
async fn main() {
    // A missing .env is fine; the variables may come from the service manager.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // ── Configuration ─────────────────────────────────────────────────────────
    let config_path = paths::config_file_path(|key| std::env::var(key).ok());
    let tuning = config::load_or_default(&config_path).unwrap_or_else(|e| {
        error!("[config] {e:#}");
        std::process::exit(1);
    });
    let config = config::Config::from_env(tuning).unwrap_or_else(|e| {
        error!("[config] {e}");
        std::process::exit(1);
    });

    info!(
        events_dir = %config.events_dir.display(),
        watchlist = config.watchlist.len(),
        model = %config.generation.model,
        max_concurrent_files = config.max_concurrent_files,
        "ladder-announcer v{} starting",
        env!("CARGO_PKG_VERSION")
    );
    if config.watchlist.is_empty() {
        warn!("[config] LP loss watchlist is empty; LP loss events will all be ignored");
    }

    // ── External capabilities ─────────────────────────────────────────────────
    let generator = Arc::new(GeminiClient::new(
        &config.api_key,
        &config.generation.api_base,
        &config.generation.model,
    ));
    let messenger = Arc::new(HttpBridge::new(&config.gateway_url));
    let processor = Arc::new(Processor::new(
        config.watchlist.clone(),
        Narrator::new(generator),
        Dispatcher::new(messenger, &config.channel_id),
    ));
    let permits = Arc::new(Semaphore::new(config.max_concurrent_files));

    // ── Initial status ────────────────────────────────────────────────────────
    let mut current_status = status::DaemonStatus::new(&config.events_dir);
    status::write_status(&config.status_file, &current_status);

    let (event_tx, mut event_rx) = mpsc::channel::<DaemonEvent>(64);

    // ── Background tasks ──────────────────────────────────────────────────────
    tokio::spawn(watcher::run(
        config.events_dir.clone(),
        config.watcher.clone(),
        event_tx.clone(),
    ));

    // Graceful shutdown on Ctrl+C.
    {
        let tx = event_tx.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                let _ = tx.send(DaemonEvent::Shutdown).await;
            }
        });
    }

    // ── Event loop ────────────────────────────────────────────────────────────
    while let Some(evt) = event_rx.recv().await {
        match evt {
            DaemonEvent::WatcherReady => {
                info!(
                    "Watcher ready; listening for new events in {}",
                    config.events_dir.display()
                );
                current_status.state = status::DaemonState::Watching;
                status::write_status(&config.status_file, &current_status);
            }

            DaemonEvent::FileReady(path) => {
                let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
                info!(file = %name, kind = %classify::classify(name), "New event file detected");
                pipeline::spawn(
                    Arc::clone(&processor),
                    Arc::clone(&permits),
                    path,
                    event_tx.clone(),
                );
            }

            DaemonEvent::WatcherError(message) => {
                error!("[watcher] {message}");
                current_status.error = Some(message);
                status::write_status(&config.status_file, &current_status);
            }

            DaemonEvent::FileProcessed(result) => {
                current_status.record(&result);
                status::write_status(&config.status_file, &current_status);
            }

            DaemonEvent::Shutdown => {
                info!("Interrupt received; shutting down");
                break;
            }
        }
    }

    match processor.dispatcher().close().await {
        Ok(()) => info!("Messaging client released"),
        Err(e) => warn!("Failed to release messaging client: {e}"),
    }

    current_status.state = status::DaemonState::Stopped;
    status::write_status(&config.status_file, &current_status);
}
