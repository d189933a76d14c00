//! Periodic background tasks.
//!
//! A [`PeriodicTask`] runs its job once immediately, then again after each
//! delay given by its [`Cadence`]. Every task listens for a stop signal while
//! it sleeps, so [`Scheduler::shutdown`] ends them cleanly between runs.

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use std::future::Future;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// When a task runs again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    /// Fixed delay after each run.
    Every(Duration),
    /// Next wall-clock multiple of the period, e.g. every full minute.
    Aligned(Duration),
}

impl Cadence {
    pub fn period(&self) -> Duration {
        match *self {
            Cadence::Every(period) | Cadence::Aligned(period) => period,
        }
    }

    /// Delay from `now` until the next run. Sitting exactly on a boundary
    /// waits for the following one.
    pub fn next_delay(&self, now: DateTime<Utc>) -> Duration {
        match *self {
            Cadence::Every(period) => period,
            Cadence::Aligned(period) => {
                let period_ms = period.as_millis() as i64;
                if period_ms == 0 {
                    return Duration::ZERO;
                }
                let into_period = now.timestamp_millis().rem_euclid(period_ms);
                Duration::from_millis((period_ms - into_period) as u64)
            }
        }
    }
}

/// Handle to one spawned periodic job.
pub struct PeriodicTask {
    name: &'static str,
    stop: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl PeriodicTask {
    /// Spawn `job` on the current runtime.
    pub fn spawn<F, Fut>(name: &'static str, cadence: Cadence, mut job: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (stop, mut stopped) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            loop {
                job().await;
                let delay = cadence.next_delay(Utc::now());
                debug!("{}: next run in {:?}", name, delay);
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = &mut stopped => {
                        info!("{} stopped", name);
                        break;
                    }
                }
            }
        });
        info!("Started {} ({:?})", name, cadence);
        Self {
            name,
            stop: Some(stop),
            handle,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Ask the task to stop after its current run.
    pub fn stop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
    }

    /// Stop immediately, even mid-run.
    pub fn cancel(&mut self) {
        self.stop();
        self.handle.abort();
    }

    /// Stop and wait for the task to exit.
    pub async fn join(mut self) {
        self.stop();
        if let Err(e) = self.handle.await {
            if !e.is_cancelled() {
                warn!("{} ended abnormally: {}", self.name, e);
            }
        }
    }
}

/// Owns every periodic task of the process.
#[derive(Default)]
pub struct Scheduler {
    tasks: Vec<PeriodicTask>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn<F, Fut>(&mut self, name: &'static str, cadence: Cadence, job: F)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.tasks.push(PeriodicTask::spawn(name, cadence, job));
    }

    pub fn task_names(&self) -> Vec<&'static str> {
        self.tasks.iter().map(PeriodicTask::name).collect()
    }

    /// Cancel the task called `name`. Returns whether one existed.
    pub fn cancel(&mut self, name: &str) -> bool {
        match self.tasks.iter().position(|task| task.name == name) {
            Some(index) => {
                self.tasks.remove(index).cancel();
                true
            }
            None => false,
        }
    }

    /// Stop all tasks and wait for them to exit.
    pub async fn shutdown(&mut self) {
        for task in self.tasks.drain(..) {
            task.join().await;
        }
    }
}
