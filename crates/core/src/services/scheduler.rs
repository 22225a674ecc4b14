use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::{watch, Mutex, Notify};

/// Drives the reconciliation engine on a cadence.
///
/// A zero interval makes the loop manual-only: it advances only when
/// `trigger` is called. Cycles are serialized through an async mutex — a
/// manual trigger landing while a cycle is in flight enqueues behind it
/// rather than interleaving two merges, which would break the
/// no-regression rule when a slow stale cycle finishes after a fresh one.
pub struct RefreshScheduler {
    interval: Duration,
    busy: AtomicBool,
    cycles_started: AtomicU64,
    cycle_guard: Mutex<()>,
    trigger: Notify,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl RefreshScheduler {
    pub fn new(interval: Duration) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            interval,
            busy: AtomicBool::new(false),
            cycles_started: AtomicU64::new(0),
            cycle_guard: Mutex::new(()),
            trigger: Notify::new(),
            shutdown_tx,
            shutdown_rx,
        }
    }

    /// True only while a cycle's fetch+merge is in flight. Purely a UI
    /// affordance — callers must not gate correctness on it.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Monotonically increasing count of started cycles.
    pub fn cycles_started(&self) -> u64 {
        self.cycles_started.load(Ordering::SeqCst)
    }

    /// Request an immediate cycle, waking a pending `wait_next`.
    pub fn trigger(&self) {
        self.trigger.notify_one();
    }

    /// Cancel any pending wait permanently. In-flight fetches may still
    /// complete; their results are simply discarded by the caller tearing
    /// the engine down.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    pub fn is_shut_down(&self) -> bool {
        *self.shutdown_rx.borrow()
    }

    /// Wait until the next cycle should run: the interval elapsing, a
    /// manual trigger, or shutdown. Returns false on shutdown.
    pub async fn wait_next(&self) -> bool {
        let mut shutdown = self.shutdown_rx.clone();
        if *shutdown.borrow() {
            return false;
        }

        if self.interval.is_zero() {
            tokio::select! {
                _ = self.trigger.notified() => true,
                _ = shutdown.changed() => false,
            }
        } else {
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => true,
                _ = self.trigger.notified() => true,
                _ = shutdown.changed() => false,
            }
        }
    }

    /// Run one cycle, serialized against any other cycle and tracked by
    /// the busy flag and cycle counter.
    pub async fn run_cycle<F, Fut, T>(&self, cycle: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let _guard = self.cycle_guard.lock().await;
        self.cycles_started.fetch_add(1, Ordering::SeqCst);
        self.busy.store(true, Ordering::SeqCst);
        let out = cycle().await;
        self.busy.store(false, Ordering::SeqCst);
        out
    }
}
