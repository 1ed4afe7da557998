//! Repeating-timer driver for the sweeper.
//!
//! [`Scheduler::start`] runs one pass immediately and then one every
//! `check_interval`, measured between tick starts. Each pass runs on its own
//! worker thread so a slow pass never delays the timer; whether a tick may
//! start while another pass is still running is governed by
//! [`OverlapPolicy`].

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::common::config::{OverlapPolicy, SweepConfig};
use crate::common::errors::SweepError;
use crate::sweeper::{CancellationFlag, EventSink, PassReport, SkipReason, SweepEvent, Sweeper};

type PassCallback = Arc<dyn Fn(&PassReport) + Send + Sync>;

/// Configures and starts a sweep schedule
pub struct Scheduler {
    sweeper: Sweeper,
    on_pass: Option<PassCallback>,
}

impl Scheduler {
    pub fn new(config: SweepConfig, sink: impl EventSink + 'static) -> Self {
        Self {
            sweeper: Sweeper::new(config, sink),
            on_pass: None,
        }
    }

    /// Called with the report of every pass that ran to completion or
    /// cancellation
    pub fn on_pass_complete(mut self, f: impl Fn(&PassReport) + Send + Sync + 'static) -> Self {
        self.on_pass = Some(Arc::new(f));
        self
    }

    /// Start the schedule.
    ///
    /// Returns `None` without running anything when no directories are
    /// configured: no pass, no events, no timer thread. A failure to spawn
    /// the timer thread is logged and also yields `None`.
    pub fn start(self) -> Option<SweepHandle> {
        if self.sweeper.config().directories().is_empty() {
            tracing::debug!("No directories configured; sweep schedule not started");
            return None;
        }

        let cancel = CancellationFlag::new();
        let sweeper = Arc::new(self.sweeper.with_cancellation(cancel.clone()));
        let running = Arc::new(AtomicUsize::new(0));
        let (stop_tx, stop_rx) = mpsc::channel();

        let timer = {
            let running = running.clone();
            let on_pass = self.on_pass;
            match thread::Builder::new()
                .name("agesweep-timer".into())
                .spawn(move || run_timer(sweeper, on_pass, running, stop_rx))
            {
                Ok(timer) => timer,
                Err(err) => {
                    tracing::error!("Failed to spawn timer thread: {}", err);
                    return None;
                }
            }
        };

        Some(SweepHandle {
            stop_tx: Some(stop_tx),
            cancel,
            running,
            timer: Some(timer),
        })
    }
}

/// Shorthand for `Scheduler::new(config, sink).start()`
pub fn start(config: SweepConfig, sink: impl EventSink + 'static) -> Option<SweepHandle> {
    Scheduler::new(config, sink).start()
}

/// Owner of a running schedule. Dropping it stops the schedule.
pub struct SweepHandle {
    stop_tx: Option<Sender<()>>,
    cancel: CancellationFlag,
    running: Arc<AtomicUsize>,
    timer: Option<JoinHandle<()>>,
}

impl SweepHandle {
    /// Number of passes currently in flight
    pub fn passes_running(&self) -> usize {
        self.running.load(Ordering::SeqCst)
    }

    /// Whether the timer thread has exited
    pub fn is_finished(&self) -> bool {
        self.timer.as_ref().map_or(true, |t| t.is_finished())
    }

    /// Cancel the pending timer, ask in-flight passes to stop at their next
    /// entry, and wait for every thread to exit.
    pub fn stop(mut self) {
        self.shutdown();
    }

    /// Block until the schedule ends by itself. With a non-zero interval that
    /// only happens after [`stop`](Self::stop) from another owner, so this
    /// blocks for the life of the process.
    pub fn wait(mut self) {
        if let Some(timer) = self.timer.take() {
            let _ = timer.join();
        }
    }

    fn shutdown(&mut self) {
        self.cancel.cancel();
        // Dropping the sender wakes the timer out of recv_timeout.
        self.stop_tx.take();
        if let Some(timer) = self.timer.take() {
            let _ = timer.join();
        }
    }
}

impl Drop for SweepHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Decrements the in-flight counter even if the pass unwinds
struct RunningGuard(Arc<AtomicUsize>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

fn run_timer(
    sweeper: Arc<Sweeper>,
    on_pass: Option<PassCallback>,
    running: Arc<AtomicUsize>,
    stop_rx: Receiver<()>,
) {
    let interval = sweeper.config().check_interval();
    let mut workers: Vec<JoinHandle<()>> = Vec::new();
    let mut next_tick = Instant::now();

    loop {
        workers.retain(|w| !w.is_finished());
        if let Some(worker) = trigger_pass(&sweeper, &on_pass, &running) {
            workers.push(worker);
        }

        let Some(interval) = interval else { break };
        next_tick += interval;
        let wait = next_tick.saturating_duration_since(Instant::now());
        match stop_rx.recv_timeout(wait) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    for worker in workers {
        let _ = worker.join();
    }
    tracing::debug!("Sweep schedule stopped");
}

fn trigger_pass(
    sweeper: &Arc<Sweeper>,
    on_pass: &Option<PassCallback>,
    running: &Arc<AtomicUsize>,
) -> Option<JoinHandle<()>> {
    match sweeper.config().overlap() {
        OverlapPolicy::Skip => {
            if running
                .compare_exchange(0, 1, Ordering::SeqCst, Ordering::SeqCst)
                .is_err()
            {
                emit_guarded(
                    sweeper.sink().as_ref(),
                    &SweepEvent::PassSkipped {
                        reason: SkipReason::PreviousPassRunning,
                    },
                );
                return None;
            }
        }
        OverlapPolicy::Allow => {
            running.fetch_add(1, Ordering::SeqCst);
        }
    }

    let guard = RunningGuard(running.clone());
    let sweeper = sweeper.clone();
    let on_pass = on_pass.clone();
    let spawned = thread::Builder::new()
        .name("agesweep-pass".into())
        .spawn(move || {
            let _guard = guard;
            run_guarded_pass(&sweeper, on_pass.as_deref());
        });

    match spawned {
        Ok(worker) => Some(worker),
        Err(err) => {
            // The closure (and with it the guard) was dropped, so the
            // counter is already released.
            tracing::error!("Failed to spawn pass thread: {}", err);
            None
        }
    }
}

/// Emit outside a pass. A panicking sink is logged and must not take the
/// timer thread down.
fn emit_guarded(sink: &dyn EventSink, event: &SweepEvent) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| sink.emit(event))) {
        tracing::error!(
            kind = ?event.kind(),
            "Event sink panicked: {}",
            panic_message(payload.as_ref())
        );
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// Run one pass, turning a panic into a `PassPanicked` error event
fn run_guarded_pass(sweeper: &Sweeper, on_pass: Option<&(dyn Fn(&PassReport) + Send + Sync)>) {
    let started = Instant::now();
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| sweeper.run_pass()));

    match outcome {
        Ok(report) => {
            tracing::debug!(
                scanned = report.files_scanned,
                deleted = report.files_deleted,
                would_delete = report.files_would_delete,
                errors = report.errors,
                cancelled = report.cancelled,
                "Pass finished in {:?}",
                Duration::from_secs_f64(report.duration_secs)
            );
            if let Some(f) = on_pass {
                f(&report);
            }
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            tracing::debug!("Pass panicked after {:?}", started.elapsed());
            emit_guarded(
                sweeper.sink().as_ref(),
                &SweepEvent::Error(SweepError::PassPanicked { message }),
            );
        }
    }
}
