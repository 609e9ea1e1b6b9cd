use std::path::PathBuf;

use crate::pipeline::Outcome;

pub enum DaemonEvent {
    /// Initial scan of the events directory finished; new files are now reported.
    WatcherReady,
    /// A new event file has been stable for the configured threshold.
    FileReady(PathBuf),
    /// The watcher hit an error it could not handle; it keeps running.
    WatcherError(String),
    /// A processing run finished. `Err` carries the message of a structural
    /// failure that left the file on disk.
    FileProcessed(Result<Outcome, String>),
    /// Ctrl+C received; release the messenger and exit.
    Shutdown,
}
