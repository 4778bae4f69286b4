//! Process-wide recurring-task runner. One scheduler drives one job on a
//! fixed period; runs never overlap — a tick that lands while the previous
//! run is still executing is skipped, not queued.

use std::future::Future;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, info, warn};

pub struct JobScheduler {
    shutdown: watch::Sender<bool>,
    handle: Option<JoinHandle<()>>,
}

impl JobScheduler {
    /// Spawns the scheduler task. The first run fires one full `period`
    /// after start, not immediately.
    pub fn start<F, Fut>(period: Duration, mut job: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send,
    {
        let (shutdown, mut signal) = watch::channel(false);

        let handle = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The interval yields its first tick immediately; consume it so
            // the job starts a full period from now.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        debug!("Scheduler tick, running job");
                        job().await;
                    }
                    _ = signal.changed() => {
                        if *signal.borrow() {
                            break;
                        }
                    }
                }
            }

            debug!("Scheduler task exited");
        });

        info!("Scheduler started with period {:?}", period);

        Self {
            shutdown,
            handle: Some(handle),
        }
    }

    /// Signals shutdown and waits for the scheduler task to finish. An
    /// in-flight run completes before the task exits.
    pub async fn stop(mut self) {
        if self.shutdown.send(true).is_err() {
            warn!("Scheduler task already gone at shutdown");
        }

        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                warn!("Scheduler task join failed: {}", e);
            }
        }

        info!("Scheduler stopped");
    }
}
