use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Instant, SystemTime};
use walkdir::WalkDir;

use super::events::{EventSink, KeepReason, Progress, SweepEvent};
use super::matcher;
use super::report::PassReport;
use crate::common::config::SweepConfig;
use crate::common::errors::SweepError;

/// Shared flag checked before every entry of a pass
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Runs passes over the configured roots.
///
/// A pass never fails: listing, stat and delete errors are emitted to the
/// sink and the walk moves on to the next entry or root.
pub struct Sweeper {
    config: SweepConfig,
    sink: Arc<dyn EventSink>,
    cancel: CancellationFlag,
}

impl Sweeper {
    pub fn new(config: SweepConfig, sink: impl EventSink + 'static) -> Self {
        Self::with_shared_sink(config, Arc::new(sink))
    }

    pub fn with_shared_sink(config: SweepConfig, sink: Arc<dyn EventSink>) -> Self {
        Self {
            config,
            sink,
            cancel: CancellationFlag::new(),
        }
    }

    /// Use an externally owned cancellation flag
    pub fn with_cancellation(mut self, cancel: CancellationFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &SweepConfig {
        &self.config
    }

    pub fn sink(&self) -> &Arc<dyn EventSink> {
        &self.sink
    }

    /// Run one full pass over every root, in order
    pub fn run_pass(&self) -> PassReport {
        let start = Instant::now();
        let mut report = PassReport::new(self.config.dry_run());

        for root in self.config.directories() {
            if self.cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            self.sweep_root(root, &mut report);
        }

        report.duration_secs = start.elapsed().as_secs_f64();
        report
    }

    fn emit(&self, report: &mut PassReport, event: SweepEvent) {
        if event.is_error() {
            report.errors += 1;
        }
        self.sink.emit(&event);
    }

    fn progress(&self, progress: Progress) {
        if self.config.verbose() {
            self.sink.emit(&SweepEvent::Progress(progress));
        }
    }

    fn sweep_root(&self, root: &Path, report: &mut PassReport) {
        // Listing the root up front reports missing roots, unreadable roots
        // and roots that are not directories with the OS error.
        if let Err(source) = fs::read_dir(root) {
            self.emit(
                report,
                SweepEvent::Error(SweepError::Listing {
                    path: root.to_path_buf(),
                    source,
                }),
            );
            return;
        }

        report.roots_processed += 1;
        let now = SystemTime::now();
        let mut open_dirs: Vec<(PathBuf, Instant)> = vec![(root.to_path_buf(), Instant::now())];
        self.progress(Progress::DirectoryStarted {
            path: root.to_path_buf(),
        });

        let mut walker = WalkDir::new(root).follow_links(false).sort_by_file_name();
        if !self.config.recursive() {
            walker = walker.max_depth(1);
        }

        let mut entries = walker.into_iter();
        while let Some(result) = entries.next() {
            if self.cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }

            let entry = match result {
                Ok(entry) => entry,
                Err(err) => {
                    // A nested directory failed to list; its siblings continue.
                    let path = err.path().unwrap_or(root).to_path_buf();
                    self.emit(
                        report,
                        SweepEvent::Error(SweepError::Listing {
                            path,
                            source: io::Error::from(err),
                        }),
                    );
                    continue;
                }
            };

            if entry.depth() == 0 {
                continue;
            }
            while open_dirs.len() > entry.depth() {
                self.finish_directory(open_dirs.pop());
            }

            let path = entry.path();
            let metadata = match fs::metadata(path) {
                Ok(m) => m,
                Err(source) => {
                    if self.config.recursive() && entry.file_type().is_dir() {
                        entries.skip_current_dir();
                    }
                    self.emit(
                        report,
                        SweepEvent::Error(SweepError::Stat {
                            path: path.to_path_buf(),
                            source,
                        }),
                    );
                    continue;
                }
            };

            if metadata.is_dir() {
                // Symlinked directories are never descended into
                if self.config.recursive() && entry.file_type().is_dir() {
                    self.progress(Progress::DirectoryStarted {
                        path: path.to_path_buf(),
                    });
                    open_dirs.push((path.to_path_buf(), Instant::now()));
                }
                continue;
            }

            let modified = match metadata.modified() {
                Ok(t) => t,
                Err(source) => {
                    self.emit(
                        report,
                        SweepEvent::Error(SweepError::Stat {
                            path: path.to_path_buf(),
                            source,
                        }),
                    );
                    continue;
                }
            };

            report.files_scanned += 1;
            self.evaluate_file(path, age_secs(now, modified), metadata.len(), report);
        }

        while let Some(dir) = open_dirs.pop() {
            self.finish_directory(Some(dir));
        }
    }

    fn finish_directory(&self, dir: Option<(PathBuf, Instant)>) {
        if let Some((path, started)) = dir {
            self.progress(Progress::DirectoryFinished {
                path,
                elapsed: started.elapsed(),
            });
        }
    }

    fn evaluate_file(&self, path: &Path, age: i64, bytes: u64, report: &mut PassReport) {
        let threshold = self.config.age_secs();
        let old_enough = age > threshold;
        let selected = matcher::matches(path, self.config.include(), self.config.exclude());

        if !(old_enough && selected) {
            report.files_kept += 1;
            let reason = if selected {
                KeepReason::TooYoung {
                    age_secs: age,
                    threshold_secs: threshold,
                }
            } else {
                KeepReason::NotMatched
            };
            self.progress(Progress::Kept {
                path: path.to_path_buf(),
                reason,
            });
            return;
        }

        if self.config.dry_run() {
            report.files_would_delete += 1;
            report.bytes_freed += bytes;
            report.deleted_paths.push(path.to_path_buf());
            self.progress(Progress::WouldDelete {
                path: path.to_path_buf(),
                age_secs: age,
                threshold_secs: threshold,
            });
            return;
        }

        match fs::remove_file(path) {
            Ok(()) => {
                report.files_deleted += 1;
                report.bytes_freed += bytes;
                report.deleted_paths.push(path.to_path_buf());
                self.emit(
                    report,
                    SweepEvent::Deleted {
                        path: path.to_path_buf(),
                        age_secs: age,
                        threshold_secs: threshold,
                        bytes,
                    },
                );
            }
            Err(source) => {
                self.emit(
                    report,
                    SweepEvent::Error(SweepError::Delete {
                        path: path.to_path_buf(),
                        source,
                    }),
                );
            }
        }
    }
}

/// Whole seconds between `modified` and `now`, floored.
/// Modification times in the future give a negative age.
pub fn age_secs(now: SystemTime, modified: SystemTime) -> i64 {
    match now.duration_since(modified) {
        Ok(elapsed) => i64::try_from(elapsed.as_secs()).unwrap_or(i64::MAX),
        Err(ahead) => -(ahead.duration().as_secs_f64().ceil() as i64),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_age_secs_floors() {
        let now = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000);
        assert_eq!(age_secs(now, now), 0);
        assert_eq!(age_secs(now, now - Duration::from_millis(1999)), 1);
        assert_eq!(age_secs(now, now - Duration::from_secs(86400)), 86400);
    }

    #[test]
    fn test_age_secs_future_mtime_is_negative() {
        let now = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000);
        assert_eq!(age_secs(now, now + Duration::from_millis(500)), -1);
        assert_eq!(age_secs(now, now + Duration::from_secs(10)), -10);
    }

    #[test]
    fn test_cancellation_flag_is_shared() {
        let flag = CancellationFlag::new();
        let other = flag.clone();
        assert!(!other.is_cancelled());
        flag.cancel();
        assert!(other.is_cancelled());
    }
}
