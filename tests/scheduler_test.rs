use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant, SystemTime};

use filetime::FileTime;
use tempfile::TempDir;

use agesweep::common::config::{OverlapPolicy, SweepConfig};
use agesweep::scheduler::{self, Scheduler};
use agesweep::sweeper::{EventKind, PassReport, SweepEvent};

// ─── Helpers ──────────────────────────────────────────────────────────────────

/// Poll `cond` until it holds or `timeout` elapses
fn wait_for(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(20));
    }
    cond()
}

fn count(events: &Mutex<Vec<EventKind>>, kind: EventKind) -> usize {
    events.lock().unwrap().iter().filter(|k| **k == kind).count()
}

/// Sink that stalls every pass at its first directory for `delay`
fn slow_sink(
    events: Arc<Mutex<Vec<EventKind>>>,
    delay: Duration,
) -> impl Fn(&SweepEvent) + Send + Sync + 'static {
    move |event: &SweepEvent| {
        events.lock().unwrap().push(event.kind());
        if event.kind() == EventKind::DirectoryStarted {
            thread::sleep(delay);
        }
    }
}

// ─── Start ───────────────────────────────────────────────────────────────────

#[test]
fn test_no_directories_never_starts() {
    let calls = Arc::new(AtomicUsize::new(0));
    let config = SweepConfig::builder().check_interval_secs(1).build().unwrap();

    let handle = {
        let calls = calls.clone();
        scheduler::start(config, move |_: &SweepEvent| {
            calls.fetch_add(1, Ordering::SeqCst);
        })
    };

    assert!(handle.is_none());
    thread::sleep(Duration::from_millis(100));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_zero_interval_runs_a_single_pass() {
    let tmp = TempDir::new().unwrap();
    let old = tmp.path().join("old.log");
    fs::write(&old, b"log").unwrap();
    let mtime = FileTime::from_system_time(SystemTime::now() - Duration::from_secs(7200));
    filetime::set_file_mtime(&old, mtime).unwrap();

    let config = SweepConfig::builder()
        .directory(tmp.path())
        .age_secs(3600)
        .check_interval_secs(0)
        .build()
        .unwrap();

    let reports: Arc<Mutex<Vec<PassReport>>> = Arc::new(Mutex::new(Vec::new()));
    let handle = {
        let reports = reports.clone();
        Scheduler::new(config, |_: &SweepEvent| {})
            .on_pass_complete(move |report| reports.lock().unwrap().push(report.clone()))
            .start()
            .expect("schedule should start")
    };
    handle.wait();

    let reports = reports.lock().unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].files_deleted, 1);
    assert!(!old.exists());
}

// ─── Stop ────────────────────────────────────────────────────────────────────

#[test]
fn test_stop_ends_a_long_schedule_promptly() {
    let tmp = TempDir::new().unwrap();
    let config = SweepConfig::builder()
        .directory(tmp.path())
        .check_interval_secs(3600)
        .build()
        .unwrap();

    let passes = Arc::new(AtomicUsize::new(0));
    let handle = {
        let passes = passes.clone();
        Scheduler::new(config, |_: &SweepEvent| {})
            .on_pass_complete(move |_| {
                passes.fetch_add(1, Ordering::SeqCst);
            })
            .start()
            .expect("schedule should start")
    };

    assert!(wait_for(Duration::from_secs(5), || passes.load(Ordering::SeqCst) == 1));
    assert!(!handle.is_finished());

    let started = Instant::now();
    handle.stop();
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(passes.load(Ordering::SeqCst), 1);
}

// ─── Overlap ─────────────────────────────────────────────────────────────────

#[test]
fn test_overlapping_tick_is_skipped_by_default() {
    let tmp = TempDir::new().unwrap();
    let config = SweepConfig::builder()
        .directory(tmp.path())
        .check_interval_secs(1)
        .verbose(true)
        .build()
        .unwrap();
    assert_eq!(config.overlap(), OverlapPolicy::Skip);

    let events = Arc::new(Mutex::new(Vec::new()));
    let handle = scheduler::start(
        config,
        slow_sink(events.clone(), Duration::from_millis(1500)),
    )
    .expect("schedule should start");

    let skipped = wait_for(Duration::from_secs(5), || {
        count(&events, EventKind::PassSkipped) >= 1
    });
    let in_flight = handle.passes_running();
    handle.stop();

    assert!(skipped, "expected a PassSkipped event");
    assert_eq!(in_flight, 1, "the first pass is still sleeping");
    assert_eq!(count(&events, EventKind::DirectoryStarted), 1);
}

#[test]
fn test_allow_overlap_starts_concurrent_passes() {
    let tmp = TempDir::new().unwrap();
    let config = SweepConfig::builder()
        .directory(tmp.path())
        .check_interval_secs(1)
        .verbose(true)
        .overlap(OverlapPolicy::Allow)
        .build()
        .unwrap();

    let events = Arc::new(Mutex::new(Vec::new()));
    let handle = scheduler::start(
        config,
        slow_sink(events.clone(), Duration::from_millis(1500)),
    )
    .expect("schedule should start");

    let overlapped = wait_for(Duration::from_secs(5), || {
        count(&events, EventKind::DirectoryStarted) >= 2
    });
    handle.stop();

    assert!(overlapped, "expected a second pass to start");
    assert_eq!(count(&events, EventKind::PassSkipped), 0);
}

// ─── Failure isolation ───────────────────────────────────────────────────────

#[test]
fn test_panicking_pass_is_reported_and_schedule_continues() {
    let tmp = TempDir::new().unwrap();
    let config = SweepConfig::builder()
        .directory(tmp.path())
        .check_interval_secs(1)
        .verbose(true)
        .build()
        .unwrap();

    let failures = Arc::new(AtomicUsize::new(0));
    let sink = {
        let failures = failures.clone();
        move |event: &SweepEvent| match event.kind() {
            EventKind::PassFailed => {
                failures.fetch_add(1, Ordering::SeqCst);
            }
            EventKind::DirectoryStarted => panic!("sink blew up"),
            _ => {}
        }
    };
    let handle = scheduler::start(config, sink).expect("schedule should start");

    let continued = wait_for(Duration::from_secs(5), || {
        failures.load(Ordering::SeqCst) >= 2
    });
    handle.stop();

    assert!(continued, "timer should keep firing after a failed pass");
}

#[test]
fn test_sink_panicking_on_skip_does_not_stop_the_timer() {
    let tmp = TempDir::new().unwrap();
    let config = SweepConfig::builder()
        .directory(tmp.path())
        .check_interval_secs(1)
        .verbose(true)
        .build()
        .unwrap();

    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = {
        let slow = slow_sink(events.clone(), Duration::from_millis(1500));
        move |event: &SweepEvent| {
            slow(event);
            if event.kind() == EventKind::PassSkipped {
                panic!("sink rejects skipped ticks");
            }
        }
    };
    let handle = scheduler::start(config, sink).expect("schedule should start");

    // First pass stalls past the 1s tick, so that tick is skipped and the
    // sink panics on the timer thread. The tick after must still fire.
    let resumed = wait_for(Duration::from_secs(6), || {
        count(&events, EventKind::DirectoryStarted) >= 2
    });
    handle.stop();

    assert!(count(&events, EventKind::PassSkipped) >= 1);
    assert!(resumed, "timer should survive a sink panic on PassSkipped");
}
