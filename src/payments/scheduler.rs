//! Fixed-interval poll scheduler
//!
//! The only source of time-driven transitions in the payment core. A tick
//! callback runs to completion before the next tick is scheduled, so tick
//! executions for one session never overlap.

use std::future::Future;
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

pub struct PollScheduler;

impl PollScheduler {
    /// Fire `on_tick` every `every` until it returns `ControlFlow::Break` or
    /// the returned handle is cancelled. The first tick fires one full
    /// interval after this call.
    pub fn start<F, Fut>(every: Duration, mut on_tick: F) -> TimerHandle
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ControlFlow<()>> + Send,
    {
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancelled);
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // the first interval tick resolves immediately; consume it so the
            // callback only fires after a full period has elapsed
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if flag.load(Ordering::Acquire) {
                    break;
                }
                if on_tick().await.is_break() {
                    break;
                }
            }
        });
        TimerHandle { cancelled, task }
    }
}

/// Cancellation token for a running scheduler.
///
/// Dropping the handle cancels the timer, so a timer can never outlive the
/// session that owns it.
#[derive(Debug)]
pub struct TimerHandle {
    cancelled: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl TimerHandle {
    /// Stop the timer. Idempotent; safe after the timer has already fired its
    /// last tick or been cancelled.
    pub fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::AcqRel) {
            self.task.abort();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}
