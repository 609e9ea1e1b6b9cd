use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

use crate::pipeline::Outcome;

/// Current operational state of the daemon.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "lowercase")]
pub enum DaemonState {
    /// Configuration loaded; the initial directory scan has not finished.
    Starting,
    /// New event files are being picked up.
    Watching,
    /// Shut down cleanly.
    Stopped,
}

/// Runtime status written by the daemon to `announcer-status.toml`.
/// Operators read it to see whether events are flowing and how many poison
/// files are waiting for them.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DaemonStatus {
    /// Daemon binary version (set from Cargo.toml at compile time).
    pub version: String,
    pub state: DaemonState,
    pub events_dir: String,
    /// Files whose message was sent.
    pub dispatched: u64,
    /// Files deleted without a message (watchlist miss or unknown name).
    pub skipped: u64,
    /// Files left on disk after a structural failure.
    pub failed: u64,
    /// RFC 3339 timestamp of the most recent dispatch, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_dispatch_timestamp: Option<String>,
    /// Most recent non-fatal error, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DaemonStatus {
    /// Constructs the initial status on daemon startup.
    pub fn new(events_dir: &Path) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            state: DaemonState::Starting,
            events_dir: events_dir.display().to_string(),
            dispatched: 0,
            skipped: 0,
            failed: 0,
            last_dispatch_timestamp: None,
            error: None,
        }
    }

    /// Folds one finished processing run into the counters.
    pub fn record(&mut self, result: &Result<Outcome, String>) {
        match result {
            Ok(Outcome::Dispatched) => {
                self.dispatched += 1;
                self.last_dispatch_timestamp = Some(chrono::Local::now().to_rfc3339());
            }
            Ok(Outcome::Filtered | Outcome::Ignored) => self.skipped += 1,
            Err(message) => {
                self.failed += 1;
                self.error = Some(message.clone());
            }
        }
    }
}

/// Serializes `status` to TOML and writes it to `path`.
/// Creates the parent directory if it does not exist.
/// Failures are logged, never propagated.
pub fn write_status(path: &Path, status: &DaemonStatus) {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Err(e) = std::fs::create_dir_all(parent) {
            warn!("[status] Failed to create directory {}: {e}", parent.display());
            return;
        }
    }
    match toml::to_string_pretty(status) {
        Ok(content) => {
            if let Err(e) = std::fs::write(path, content) {
                warn!("[status] Failed to write status file: {e}");
            }
        }
        Err(e) => warn!("[status] Failed to serialize status: {e}"),
    }
}
