//! Progress, cancellation and error reporting for traversals.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use strum::Display;
use tokio::sync::broadcast;

use crate::error::{SyncError, SyncIssue};

/// Capacity of the progress broadcast channel.
pub const PROGRESS_CHANNEL_SIZE: usize = 100;

/// Status of a traversal.
///
/// Ordered by rank: a status only ever moves up within one call tree.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, Serialize, Deserialize,
)]
#[repr(u8)]
pub enum SyncStatus {
    /// Nothing went wrong so far.
    Continue = 0,
    /// At least one node failed; the traversal keeps going.
    Failed = 1,
    /// The traversal was asked to stop.
    Canceled = 2,
}

impl SyncStatus {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Continue,
            1 => Self::Failed,
            _ => Self::Canceled,
        }
    }
}

/// Snapshot of a signal, broadcast on every progress step.
#[derive(Debug, Clone)]
pub struct SyncProgress {
    /// Items processed in the current node.
    pub progress: u64,
    /// Items to process in the current node.
    pub max_progress: u64,
    /// Current status.
    pub status: SyncStatus,
    /// Node currently being processed.
    pub current_path: Option<PathBuf>,
    /// Number of failures recorded so far.
    pub errors_count: u64,
    /// Time elapsed since the signal was created or reset.
    pub elapsed: Duration,
}

impl SyncProgress {
    /// Get the progress as a percentage (0.0 to 100.0).
    pub fn percentage(&self) -> f64 {
        if self.max_progress > 0 {
            (self.progress as f64 / self.max_progress as f64) * 100.0
        } else {
            0.0
        }
    }
}

/// Called with every published snapshot; returning `false` cancels.
pub type StepObserver = Box<dyn Fn(&SyncProgress) -> bool + Send + Sync>;

struct SignalState {
    status: AtomicU8,
    progress: AtomicU64,
    max_progress: AtomicU64,
    errors_count: AtomicU64,
    last_error: Mutex<Option<SyncIssue>>,
    current_path: Mutex<Option<PathBuf>>,
    started: Mutex<Instant>,
    progress_tx: broadcast::Sender<SyncProgress>,
    observer: Option<StepObserver>,
}

impl std::fmt::Debug for SignalState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalState")
            .field("status", &self.status)
            .field("progress", &self.progress)
            .field("max_progress", &self.max_progress)
            .field("errors_count", &self.errors_count)
            .field("observed", &self.observer.is_some())
            .finish_non_exhaustive()
    }
}

/// Cooperative progress/cancel/error channel threaded through a traversal.
///
/// Cloning yields another handle to the same state, so one clone can be
/// handed to another thread to cancel a running traversal.
#[derive(Debug, Clone)]
pub struct SyncSignal {
    inner: Arc<SignalState>,
}

impl SyncSignal {
    /// Create a signal in the `Continue` state.
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Create a signal whose steps are also reported to `observer`, on the
    /// traversal's own thread.
    ///
    /// The observer runs inside every [`bind`](Self::bind); returning `false`
    /// cancels the traversal before its next item.
    pub fn with_observer(observer: impl Fn(&SyncProgress) -> bool + Send + Sync + 'static) -> Self {
        Self::build(Some(Box::new(observer)))
    }

    fn build(observer: Option<StepObserver>) -> Self {
        let (progress_tx, _) = broadcast::channel(PROGRESS_CHANNEL_SIZE);
        Self {
            inner: Arc::new(SignalState {
                status: AtomicU8::new(SyncStatus::Continue as u8),
                progress: AtomicU64::new(0),
                max_progress: AtomicU64::new(0),
                errors_count: AtomicU64::new(0),
                last_error: Mutex::new(None),
                current_path: Mutex::new(None),
                started: Mutex::new(Instant::now()),
                progress_tx,
                observer,
            }),
        }
    }

    /// Subscribe to progress snapshots.
    pub fn subscribe(&self) -> broadcast::Receiver<SyncProgress> {
        self.inner.progress_tx.subscribe()
    }

    /// Current status.
    pub fn status(&self) -> SyncStatus {
        SyncStatus::from_u8(self.inner.status.load(Ordering::Acquire))
    }

    /// Check if the traversal was canceled.
    pub fn is_canceled(&self) -> bool {
        self.status() == SyncStatus::Canceled
    }

    /// Check if any failure was recorded.
    pub fn has_failed(&self) -> bool {
        self.errors_count() > 0
    }

    /// Ask the traversal to stop. Safe to call from any thread.
    pub fn cancel(&self) {
        self.inner
            .status
            .fetch_max(SyncStatus::Canceled as u8, Ordering::AcqRel);
    }

    /// Record a failure. Never lowers the status.
    pub fn fail(&self, issue: SyncIssue) {
        tracing::warn!(path = %issue.path.display(), kind = ?issue.kind, "{}", issue.message);
        self.inner
            .status
            .fetch_max(SyncStatus::Failed as u8, Ordering::AcqRel);
        self.inner.errors_count.fetch_add(1, Ordering::Relaxed);
        *lock(&self.inner.last_error) = Some(issue);
    }

    /// Record an error as a failure.
    pub fn record(&self, error: &SyncError) {
        self.fail(SyncIssue::from(error));
    }

    /// The most recently recorded failure.
    pub fn last_error(&self) -> Option<SyncIssue> {
        lock(&self.inner.last_error).clone()
    }

    /// Number of failures recorded.
    pub fn errors_count(&self) -> u64 {
        self.inner.errors_count.load(Ordering::Relaxed)
    }

    /// Start reporting progress for a node with `max` items.
    pub fn begin(&self, path: Option<&Path>, max: u64) {
        self.set_max_progress(max);
        self.restart(path);
    }

    /// Restart progress against the current maximum.
    pub fn restart(&self, path: Option<&Path>) {
        *lock(&self.inner.current_path) = path.map(Path::to_path_buf);
        self.inner.progress.store(0, Ordering::Relaxed);
    }

    /// Set the maximum progress.
    pub fn set_max_progress(&self, max: u64) {
        self.inner.max_progress.store(max, Ordering::Relaxed);
    }

    /// Maximum progress of the current node.
    pub fn max_progress(&self) -> u64 {
        self.inner.max_progress.load(Ordering::Relaxed)
    }

    /// Progress of the current node.
    pub fn progress(&self) -> u64 {
        self.inner.progress.load(Ordering::Relaxed)
    }

    /// Set the progress of the current node.
    pub fn set_progress(&self, progress: u64) {
        self.inner.progress.store(progress, Ordering::Relaxed);
    }

    /// Advance progress by one item.
    pub fn advance(&self) {
        self.inner.progress.fetch_add(1, Ordering::Relaxed);
    }

    /// Publish a snapshot and report whether work should continue.
    pub fn bind(&self) -> bool {
        let snapshot = self.snapshot();
        if let Some(observer) = &self.inner.observer {
            if !observer(&snapshot) {
                self.cancel();
            }
        }
        // No receivers is not an error.
        let _ = self.inner.progress_tx.send(snapshot);
        !self.is_canceled()
    }

    /// Take a snapshot of the current state.
    pub fn snapshot(&self) -> SyncProgress {
        SyncProgress {
            progress: self.progress(),
            max_progress: self.max_progress(),
            status: self.status(),
            current_path: lock(&self.inner.current_path).clone(),
            errors_count: self.errors_count(),
            elapsed: lock(&self.inner.started).elapsed(),
        }
    }

    /// Return to a fresh `Continue` state before a new call tree.
    pub fn reset(&self) {
        self.inner
            .status
            .store(SyncStatus::Continue as u8, Ordering::Release);
        self.inner.progress.store(0, Ordering::Relaxed);
        self.inner.max_progress.store(0, Ordering::Relaxed);
        self.inner.errors_count.store(0, Ordering::Relaxed);
        *lock(&self.inner.last_error) = None;
        *lock(&self.inner.current_path) = None;
        *lock(&self.inner.started) = Instant::now();
    }
}

impl Default for SyncSignal {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
