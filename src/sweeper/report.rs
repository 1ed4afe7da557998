use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;

/// Summary of one pass over all roots
#[derive(Debug, Clone, Serialize)]
pub struct PassReport {
    /// When the pass started
    pub started_at: DateTime<Utc>,

    /// Whether the pass simulated deletions only
    pub dry_run: bool,

    /// Roots that were listed successfully
    pub roots_processed: usize,

    /// Files evaluated (directories excluded)
    pub files_scanned: usize,

    /// Files actually removed
    pub files_deleted: usize,

    /// Files that would have been removed in a dry run
    pub files_would_delete: usize,

    /// Files left in place (too young or not matched)
    pub files_kept: usize,

    /// Bytes removed, or that would be removed in a dry run
    pub bytes_freed: u64,

    /// Paths removed (or that would be removed), in visit order
    pub deleted_paths: Vec<PathBuf>,

    /// Error events emitted during the pass
    pub errors: usize,

    /// The pass stopped early at a cancellation checkpoint
    pub cancelled: bool,

    pub duration_secs: f64,
}

impl PassReport {
    pub fn new(dry_run: bool) -> Self {
        Self {
            started_at: Utc::now(),
            dry_run,
            roots_processed: 0,
            files_scanned: 0,
            files_deleted: 0,
            files_would_delete: 0,
            files_kept: 0,
            bytes_freed: 0,
            deleted_paths: Vec::new(),
            errors: 0,
            cancelled: false,
            duration_secs: 0.0,
        }
    }

    /// Files removed, or selected for removal in a dry run
    pub fn files_selected(&self) -> usize {
        self.files_deleted + self.files_would_delete
    }
}
