/// Event-directory watcher with write-stability debouncing.
///
/// The ranking tracker writes files incrementally, so a file is only reported
/// once its size and mtime have stayed unchanged for the configured stability
/// threshold. Each new file is reported exactly once via
/// [`DaemonEvent::FileReady`]. Files already present when the watch starts and
/// names beginning with `.` are never reported.
use notify::{Config as NotifyConfig, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::{HashMap, HashSet};
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::config::WatcherConfig;
use crate::event::DaemonEvent;

/// Delay between attempts to register the watch on an inaccessible directory.
const WATCH_RETRY_INTERVAL: Duration = Duration::from_secs(5);

// ── Stability tracking ─────────────────────────────────────────────────────────

/// The parts of a file's metadata that change while it is being written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileSnapshot {
    pub len: u64,
    pub modified: Option<SystemTime>,
}

impl From<&Metadata> for FileSnapshot {
    fn from(meta: &Metadata) -> Self {
        Self {
            len: meta.len(),
            modified: meta.modified().ok(),
        }
    }
}

struct Pending {
    snapshot: FileSnapshot,
    stable_since: Instant,
}

/// Tracks files that have appeared but are not yet known to be fully written.
///
/// Pure bookkeeping: callers supply the clock and a `stat` function, so the
/// debounce logic is testable without a real filesystem.
pub struct StabilityTracker {
    threshold: Duration,
    pending: HashMap<PathBuf, Pending>,
}

impl StabilityTracker {
    pub fn new(threshold: Duration) -> Self {
        Self {
            threshold,
            pending: HashMap::new(),
        }
    }

    /// Records an observation of `path`. A changed snapshot restarts the
    /// stability window.
    pub fn track(&mut self, path: PathBuf, snapshot: FileSnapshot, now: Instant) {
        match self.pending.get_mut(&path) {
            Some(p) if p.snapshot == snapshot => {}
            Some(p) => {
                p.snapshot = snapshot;
                p.stable_since = now;
            }
            None => {
                self.pending.insert(
                    path,
                    Pending {
                        snapshot,
                        stable_since: now,
                    },
                );
            }
        }
    }

    pub fn forget(&mut self, path: &Path) {
        self.pending.remove(path);
    }

    pub fn is_tracking(&self, path: &Path) -> bool {
        self.pending.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Re-stats every pending file and returns (and stops tracking) those
    /// whose snapshot has been unchanged for at least the threshold.
    /// Files that vanished are dropped silently.
    pub fn poll(
        &mut self,
        now: Instant,
        stat: impl Fn(&Path) -> Option<FileSnapshot>,
    ) -> Vec<PathBuf> {
        let mut ready = Vec::new();
        let threshold = self.threshold;

        self.pending.retain(|path, pending| {
            let Some(current) = stat(path) else {
                return false;
            };
            if current != pending.snapshot {
                pending.snapshot = current;
                pending.stable_since = now;
                return true;
            }
            if now.duration_since(pending.stable_since) >= threshold {
                ready.push(path.clone());
                return false;
            }
            true
        });

        ready.sort();
        ready
    }
}

// ── Filesystem helpers ─────────────────────────────────────────────────────────

/// Hidden files (leading `.`) are never event files.
pub fn is_ignored(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map_or(true, |n| n.starts_with('.'))
}

/// Snapshot of a regular file, or `None` if it is missing or not a file.
fn stat(path: &Path) -> Option<FileSnapshot> {
    std::fs::metadata(path)
        .ok()
        .filter(|m| m.is_file())
        .map(|m| FileSnapshot::from(&m))
}

/// Names of the files present at watch start. These are never reported.
fn initial_scan(dir: &Path) -> std::io::Result<HashSet<PathBuf>> {
    let mut known = HashSet::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if !is_ignored(&path) {
            known.insert(path);
        }
    }
    Ok(known)
}

/// Sends a watcher error to the main loop, which logs it. Returns `false`
/// once the receiver is gone.
async fn report(tx: &mpsc::Sender<DaemonEvent>, message: String) -> bool {
    tx.send(DaemonEvent::WatcherError(message)).await.is_ok()
}

// ── Watch loop ─────────────────────────────────────────────────────────────────

/// Watches `dir` until the receiving side of `tx` is dropped.
///
/// Sends [`DaemonEvent::WatcherReady`] once after the initial scan, then one
/// [`DaemonEvent::FileReady`] per stabilized new file. Errors are sent as
/// [`DaemonEvent::WatcherError`] and do not stop the loop; an inaccessible
/// directory is retried every few seconds.
pub async fn run(dir: PathBuf, config: WatcherConfig, tx: mpsc::Sender<DaemonEvent>) {
    let (fs_tx, mut fs_rx) = mpsc::channel::<notify::Result<notify::Event>>(256);

    let mut watcher = match RecommendedWatcher::new(
        move |res: notify::Result<notify::Event>| {
            let _ = fs_tx.blocking_send(res);
        },
        NotifyConfig::default(),
    ) {
        Ok(w) => w,
        Err(e) => {
            report(&tx, format!("Failed to create file watcher: {e}")).await;
            return;
        }
    };

    let mut retry = interval(WATCH_RETRY_INTERVAL);
    loop {
        retry.tick().await;
        match watcher.watch(&dir, RecursiveMode::NonRecursive) {
            Ok(()) => break,
            Err(e) => {
                let message = format!("Failed to watch {}: {e}", dir.display());
                if !report(&tx, message).await {
                    return;
                }
            }
        }
    }

    // A file created between `watch` and this scan lands in `known`, so its
    // queued create event is dropped and it is treated as pre-existing.
    let mut known = match initial_scan(&dir) {
        Ok(known) => known,
        Err(e) => {
            if !report(&tx, format!("Initial scan of {} failed: {e}", dir.display())).await {
                return;
            }
            HashSet::new()
        }
    };
    debug!(existing = known.len(), "[watcher] initial scan complete");

    info!(dir = %dir.display(), "[watcher] monitoring events directory");
    if tx.send(DaemonEvent::WatcherReady).await.is_err() {
        return;
    }

    let mut tracker = StabilityTracker::new(config.stability_threshold());
    let mut ticker = interval(config.poll_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            res = fs_rx.recv() => {
                let Some(res) = res else { break };
                match res {
                    Ok(event) => handle_fs_event(event, &mut known, &mut tracker),
                    Err(e) => {
                        if !report(&tx, format!("Watcher error: {e}")).await {
                            break;
                        }
                    }
                }
            }
            _ = ticker.tick() => {
                if tracker.len() == 0 {
                    continue;
                }
                for path in tracker.poll(Instant::now(), stat) {
                    known.insert(path.clone());
                    if tx.send(DaemonEvent::FileReady(path)).await.is_err() {
                        return;
                    }
                }
            }
        }
    }
}

/// Updates `known` and `tracker` from one notify event.
fn handle_fs_event(
    event: notify::Event,
    known: &mut HashSet<PathBuf>,
    tracker: &mut StabilityTracker,
) {
    let now = Instant::now();
    match event.kind {
        EventKind::Create(_) | EventKind::Modify(_) => {
            for path in event.paths {
                if is_ignored(&path) {
                    continue;
                }
                match stat(&path) {
                    // Gone again, e.g. renamed away.
                    None => {
                        known.remove(&path);
                        tracker.forget(&path);
                    }
                    // Already reported or present at startup: a change, not an add.
                    Some(_) if known.contains(&path) => {}
                    Some(snapshot) => {
                        if !tracker.is_tracking(&path) {
                            debug!(
                                file = %path.display(),
                                "[watcher] new file, waiting for writes to settle"
                            );
                        }
                        tracker.track(path, snapshot, now);
                    }
                }
            }
        }
        EventKind::Remove(_) => {
            for path in event.paths {
                known.remove(&path);
                tracker.forget(&path);
            }
        }
        _ => {}
    }
}
