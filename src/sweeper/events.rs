use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::common::errors::SweepError;
use crate::common::format;

/// Everything a pass or the scheduler reports to the outside world
#[derive(Debug)]
pub enum SweepEvent {
    /// A recoverable failure (listing, stat, delete, or a panicked pass)
    Error(SweepError),

    /// A file was removed. Fired once, after the unlink took effect.
    Deleted {
        path: PathBuf,
        age_secs: i64,
        threshold_secs: i64,
        bytes: u64,
    },

    /// A timer tick was not turned into a pass
    PassSkipped { reason: SkipReason },

    /// Verbose-only progress detail
    Progress(Progress),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The previous pass had not finished when the tick fired
    PreviousPassRunning,
}

/// Detailed progress, emitted only when the config is verbose
#[derive(Debug, Clone, PartialEq)]
pub enum Progress {
    DirectoryStarted {
        path: PathBuf,
    },
    DirectoryFinished {
        path: PathBuf,
        elapsed: Duration,
    },
    WouldDelete {
        path: PathBuf,
        age_secs: i64,
        threshold_secs: i64,
    },
    Kept {
        path: PathBuf,
        reason: KeepReason,
    },
}

/// Why a file survived a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeepReason {
    /// Rejected by the include/exclude rules
    NotMatched,
    /// Matched, but not strictly older than the threshold
    TooYoung { age_secs: i64, threshold_secs: i64 },
}

/// Flat discriminant of [`SweepEvent`], handy for counting and assertions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ListingFailed,
    StatFailed,
    DeleteFailed,
    PassFailed,
    Deleted,
    PassSkipped,
    DirectoryStarted,
    DirectoryFinished,
    WouldDelete,
    Kept,
}

impl SweepEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            SweepEvent::Error(SweepError::Listing { .. }) => EventKind::ListingFailed,
            SweepEvent::Error(SweepError::Stat { .. }) => EventKind::StatFailed,
            SweepEvent::Error(SweepError::Delete { .. }) => EventKind::DeleteFailed,
            SweepEvent::Error(SweepError::PassPanicked { .. }) => EventKind::PassFailed,
            SweepEvent::Deleted { .. } => EventKind::Deleted,
            SweepEvent::PassSkipped { .. } => EventKind::PassSkipped,
            SweepEvent::Progress(Progress::DirectoryStarted { .. }) => EventKind::DirectoryStarted,
            SweepEvent::Progress(Progress::DirectoryFinished { .. }) => {
                EventKind::DirectoryFinished
            }
            SweepEvent::Progress(Progress::WouldDelete { .. }) => EventKind::WouldDelete,
            SweepEvent::Progress(Progress::Kept { .. }) => EventKind::Kept,
        }
    }

    /// True for events that belong on the error channel
    pub fn is_error(&self) -> bool {
        matches!(self, SweepEvent::Error(_))
    }

    /// The path the event concerns, if any
    pub fn path(&self) -> Option<&Path> {
        match self {
            SweepEvent::Error(err) => err.path(),
            SweepEvent::Deleted { path, .. } => Some(path),
            SweepEvent::PassSkipped { .. } => None,
            SweepEvent::Progress(progress) => Some(progress.path()),
        }
    }
}

impl Progress {
    pub fn path(&self) -> &Path {
        match self {
            Progress::DirectoryStarted { path }
            | Progress::DirectoryFinished { path, .. }
            | Progress::WouldDelete { path, .. }
            | Progress::Kept { path, .. } => path,
        }
    }
}

/// Receiver for sweep events.
///
/// Implemented for closures, so `|event: &SweepEvent| ...` works directly.
/// A sink that ignores `SweepEvent::Error` silently swallows every
/// filesystem failure; [`NullSink`] does exactly that.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &SweepEvent);
}

impl<F> EventSink for F
where
    F: Fn(&SweepEvent) + Send + Sync,
{
    fn emit(&self, event: &SweepEvent) {
        self(event)
    }
}

/// Forwards every event to two sinks, in order
#[derive(Debug, Clone, Default)]
pub struct Tee<A, B>(pub A, pub B);

impl<A: EventSink, B: EventSink> EventSink for Tee<A, B> {
    fn emit(&self, event: &SweepEvent) {
        self.0.emit(event);
        self.1.emit(event);
    }
}

/// Discards every event, errors included
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: &SweepEvent) {}
}

type ErrorCallback = Box<dyn Fn(&SweepError) + Send + Sync>;
type DeleteCallback = Box<dyn Fn(&Path) + Send + Sync>;

/// Sink built from separate `on_error` / `on_delete` callbacks.
///
/// Progress and skip events are dropped; pair it with [`TracingSink`] to
/// keep them.
#[derive(Default)]
pub struct Callbacks {
    on_error: Option<ErrorCallback>,
    on_delete: Option<DeleteCallback>,
}

impl Callbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_error(mut self, f: impl Fn(&SweepError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Box::new(f));
        self
    }

    pub fn on_delete(mut self, f: impl Fn(&Path) + Send + Sync + 'static) -> Self {
        self.on_delete = Some(Box::new(f));
        self
    }
}

impl EventSink for Callbacks {
    fn emit(&self, event: &SweepEvent) {
        match event {
            SweepEvent::Error(err) => {
                if let Some(f) = &self.on_error {
                    f(err);
                }
            }
            SweepEvent::Deleted { path, .. } => {
                if let Some(f) = &self.on_delete {
                    f(path);
                }
            }
            SweepEvent::PassSkipped { .. } | SweepEvent::Progress(_) => {}
        }
    }
}

/// Routes events through `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &SweepEvent) {
        match event {
            SweepEvent::Error(err) => {
                tracing::warn!(path = ?err.path(), "{}", err);
            }
            SweepEvent::Deleted {
                path,
                age_secs,
                threshold_secs,
                bytes,
            } => {
                tracing::info!(
                    path = %path.display(),
                    age_secs,
                    threshold_secs,
                    bytes,
                    "Deleted file ({} > {})",
                    format::format_age(*age_secs),
                    format::format_age(*threshold_secs)
                );
            }
            SweepEvent::PassSkipped { reason } => {
                tracing::warn!(?reason, "Skipping scheduled pass; previous pass still running");
            }
            SweepEvent::Progress(progress) => match progress {
                Progress::DirectoryStarted { path } => {
                    tracing::debug!(path = %path.display(), "Processing directory");
                }
                Progress::DirectoryFinished { path, elapsed } => {
                    tracing::debug!(
                        path = %path.display(),
                        elapsed_ms = elapsed.as_millis() as u64,
                        "Finished processing directory"
                    );
                }
                Progress::WouldDelete {
                    path,
                    age_secs,
                    threshold_secs,
                } => {
                    tracing::debug!(
                        path = %path.display(),
                        age_secs,
                        threshold_secs,
                        "(dry run) Would delete file"
                    );
                }
                Progress::Kept {
                    path,
                    reason: KeepReason::NotMatched,
                } => {
                    tracing::debug!(path = %path.display(), "Keeping file - not matched");
                }
                Progress::Kept {
                    path,
                    reason:
                        KeepReason::TooYoung {
                            age_secs,
                            threshold_secs,
                        },
                } => {
                    tracing::debug!(
                        path = %path.display(),
                        age_secs,
                        threshold_secs,
                        "Keeping file - age {}s <= {}s",
                        age_secs,
                        threshold_secs
                    );
                }
            },
        }
    }
}
