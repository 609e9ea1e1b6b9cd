/// Per-file lifecycle: classify, filter, parse, narrate, dispatch, delete.
///
/// A file is deleted when its message was sent, when it was filtered out by
/// the watchlist, and when its kind or rank change type is unknown. Read,
/// parse, dispatch and delete failures leave it on disk for an operator to
/// inspect; generation failures never do, because the narrator always falls
/// back to fixed text.
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, error, info};

use crate::classify::{self, ParseError};
use crate::dispatch::{DispatchError, Dispatcher};
use crate::event::DaemonEvent;
use crate::ladder::EventKind;
use crate::narrative::Narrator;
use crate::watchlist::Watchlist;

/// How a file left the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A message was sent and the file deleted.
    Dispatched,
    /// LP loss for a player not on the watchlist; deleted without a message.
    Filtered,
    /// Unrecognised file name or rank change type; deleted without a message.
    Ignored,
}

/// Structural failure. The file stays on disk.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("path has no usable file name: {0}")]
    BadPath(PathBuf),

    #[error("failed to read event file: {0}")]
    Read(#[source] std::io::Error),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("failed to send message: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("failed to delete event file: {0}")]
    Delete(#[source] std::io::Error),
}

/// Drives event files through the pipeline. Cheap to share behind an `Arc`;
/// concurrent calls to [`Processor::process`] are independent.
pub struct Processor {
    watchlist: Watchlist,
    narrator: Narrator,
    dispatcher: Dispatcher,
}

impl Processor {
    pub fn new(watchlist: Watchlist, narrator: Narrator, dispatcher: Dispatcher) -> Self {
        Self {
            watchlist,
            narrator,
            dispatcher,
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Processes one event file end to end.
    pub async fn process(&self, path: &Path) -> Result<Outcome, ProcessError> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ProcessError::BadPath(path.to_path_buf()))?;

        let Some(rule) = classify::rule_for(name) else {
            debug!(file = %name, "unrecognised event file; skipping");
            remove(path).await?;
            return Ok(Outcome::Ignored);
        };
        info!(file = %name, kind = %rule.kind, "processing event file");

        if rule.kind == EventKind::LpLoss {
            let player = classify::lp_loss_player(name);
            if !self.watchlist.contains(&player.normalized) {
                info!(
                    player = %player.raw,
                    "player is not on the LP loss watchlist; event ignored"
                );
                remove(path).await?;
                return Ok(Outcome::Filtered);
            }
            info!(player = %player.raw, "player is on the watchlist");
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(ProcessError::Read)?;
        let event = (rule.parse)(name, &content)?;

        let Some(message) = self.narrator.narrate(&event).await else {
            info!(file = %name, "unrecognised rank change type; nothing to announce");
            remove(path).await?;
            return Ok(Outcome::Ignored);
        };
        self.dispatcher.dispatch(&message).await?;
        info!(file = %name, "message sent");

        remove(path).await?;
        Ok(Outcome::Dispatched)
    }
}

async fn remove(path: &Path) -> Result<(), ProcessError> {
    tokio::fs::remove_file(path)
        .await
        .map_err(ProcessError::Delete)?;
    debug!(file = %path.display(), "event file deleted");
    Ok(())
}

/// Processes `path` in a background task, holding one `permits` slot for the
/// duration, and reports the result to the main loop.
pub fn spawn(
    processor: Arc<Processor>,
    permits: Arc<Semaphore>,
    path: PathBuf,
    tx: mpsc::Sender<DaemonEvent>,
) {
    tokio::spawn(async move {
        // The semaphore is never closed while the daemon runs.
        let Ok(_permit) = permits.acquire_owned().await else {
            return;
        };
        let result = processor.process(&path).await.map_err(|e| {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            error!(file = %name, error = %e, "failed to handle event file; leaving it in place");
            format!("{name}: {e}")
        });
        let _ = tx.send(DaemonEvent::FileProcessed(result)).await;
    });
}
