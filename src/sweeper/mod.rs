pub mod events;
pub mod matcher;
pub mod pass;
pub mod report;

pub use events::{
    Callbacks, EventKind, EventSink, KeepReason, NullSink, Progress, SkipReason, SweepEvent, Tee,
    TracingSink,
};
pub use matcher::{matches, Pattern, PatternSpec};
pub use pass::{age_secs, CancellationFlag, Sweeper};
pub use report::PassReport;
