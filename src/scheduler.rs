//! Cancellable periodic tasks.
//!
//! Used for the repeated distress status updates while circling. Cancelling
//! stops the next tick from being scheduled at all; the task does not keep
//! running with its output suppressed.

use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::debug;

pub struct PeriodicTask {
    name: &'static str,
    cancel_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl PeriodicTask {
    /// Run `tick` every `period`, first one `period` from now.
    ///
    /// `tick` receives the 1-based tick count.
    pub fn spawn<F>(runtime: &Handle, name: &'static str, period: Duration, mut tick: F) -> Self
    where
        F: FnMut(u32) + Send + 'static,
    {
        let (cancel_tx, mut cancel_rx) = watch::channel(false);
        let handle = runtime.spawn(async move {
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut count = 0u32;
            loop {
                tokio::select! {
                    biased;
                    _ = cancel_rx.changed() => break,
                    _ = interval.tick() => {
                        if *cancel_rx.borrow() {
                            break;
                        }
                        count = count.saturating_add(1);
                        tick(count);
                    }
                }
            }
            debug!(task = name, ticks = count, "periodic task stopped");
        });
        debug!(task = name, period_secs = period.as_secs_f64(), "periodic task started");
        Self {
            name,
            cancel_tx,
            handle,
        }
    }

    pub fn cancel(&self) {
        let _ = self.cancel_tx.send(true);
        self.handle.abort();
        debug!(task = self.name, "periodic task cancelled");
    }

    #[cfg(test)]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for PeriodicTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn counting_task(period: Duration) -> (Arc<AtomicU32>, PeriodicTask) {
        let ticks = Arc::new(AtomicU32::new(0));
        let seen = Arc::clone(&ticks);
        let task = PeriodicTask::spawn(&Handle::current(), "test", period, move |n| {
            seen.store(n, Ordering::SeqCst);
        });
        (ticks, task)
    }

    #[tokio::test(start_paused = true)]
    async fn first_tick_waits_one_period() {
        let (ticks, _task) = counting_task(Duration::from_secs(300));

        time::sleep(Duration::from_secs(299)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 0);

        time::sleep(Duration::from_secs(2)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 1);

        time::sleep(Duration::from_secs(300)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_stops_future_ticks() {
        let (ticks, task) = counting_task(Duration::from_secs(300));

        time::sleep(Duration::from_secs(301)).await;
        task.cancel();
        time::sleep(Duration::from_secs(1500)).await;

        assert_eq!(ticks.load(Ordering::SeqCst), 1);
        assert!(task.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_task_stops_it() {
        let (ticks, task) = counting_task(Duration::from_secs(10));
        drop(task);
        time::sleep(Duration::from_secs(100)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 0);
    }
}
