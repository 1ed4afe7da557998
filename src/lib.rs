//! # agesweep
//!
//! Periodically deletes files that are older than a threshold from a set of
//! directories. Typical use is bounding disk usage from log or temp-file
//! directories.
//!
//! - **Matcher**: include/exclude rules, literal file names or `/regex/`
//!   patterns, exclusion always wins
//! - **Sweeper**: one pass over every root, optionally recursive, with
//!   per-entry error isolation and dry-run support
//! - **Scheduler**: runs a pass now and every `check_interval` after that,
//!   with an overlap guard and an explicit stop
//!
//! Results are reported as typed [`sweeper::SweepEvent`]s to an
//! [`sweeper::EventSink`]. A sink that ignores `SweepEvent::Error` silently
//! swallows filesystem failures.
//!
//! ```no_run
//! use agesweep::common::config::SweepConfig;
//! use agesweep::sweeper::{Callbacks, Tee, TracingSink};
//!
//! let config = SweepConfig::builder()
//!     .directory("/var/log/myapp")
//!     .age_secs(86400 * 3)
//!     .include(r"/\.log$/")
//!     .exclude("current.log")
//!     .build()?;
//!
//! let sink = Tee(
//!     TracingSink,
//!     Callbacks::new().on_delete(|path| println!("Deleted file: {}", path.display())),
//! );
//!
//! if let Some(handle) = agesweep::scheduler::start(config, sink) {
//!     handle.wait();
//! }
//! # Ok::<(), agesweep::common::errors::ConfigError>(())
//! ```

pub mod cli;
pub mod common;
pub mod scheduler;
pub mod sweeper;
