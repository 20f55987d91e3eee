//! Recurring job scheduler.
//!
//! Each job is driven by its own interval timer on a separate task. The first
//! firing happens one full interval after start. A job awaits its own run
//! before taking the next tick, so a job never overlaps itself; ticks missed
//! while a run was in progress are delayed, not queued. Distinct jobs may run
//! at the same time.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use metrics::counter;
use tokio::task::JoinSet;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{error, info};

use crate::error::FeedResult;
use crate::shutdown::{wait_for_shutdown, ShutdownRx};

/// Work performed on every tick of a trigger.
#[async_trait]
pub trait Job: Send + Sync + 'static {
    fn name(&self) -> &str;

    async fn run(&self) -> FeedResult<()>;
}

struct Trigger {
    every: Duration,
    job: Arc<dyn Job>,
}

#[derive(Default)]
pub struct Scheduler {
    triggers: Vec<Trigger>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `job` to fire every `every`.
    pub fn add_job(mut self, every: Duration, job: Arc<dyn Job>) -> Self {
        self.triggers.push(Trigger { every, job });
        self
    }

    /// Runs all triggers until `shutdown_rx` reports shutdown.
    ///
    /// Returns after every in-flight job run has finished.
    pub async fn run(self, shutdown_rx: ShutdownRx) {
        info!(jobs = self.triggers.len(), "starting scheduler");

        let mut tasks = JoinSet::new();
        for trigger in self.triggers {
            tasks.spawn(run_trigger(trigger, shutdown_rx.clone()));
        }

        while let Some(result) = tasks.join_next().await {
            if let Err(err) = result {
                error!(%err, "job task terminated abnormally");
            }
        }

        info!("scheduler shutdown complete");
    }
}

async fn run_trigger(trigger: Trigger, mut shutdown_rx: ShutdownRx) {
    let Trigger { every, job } = trigger;
    let mut ticks = interval_at(Instant::now() + every, every);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(job = job.name(), interval_secs = every.as_secs_f64(), "scheduled job");

    loop {
        tokio::select! {
            biased;

            _ = wait_for_shutdown(&mut shutdown_rx) => break,
            _ = ticks.tick() => {
                let start = Instant::now();
                match job.run().await {
                    Ok(()) => {
                        counter!("feeder.job.success", "job" => job.name().to_string()).increment(1);
                    }
                    Err(err) => {
                        counter!("feeder.job.failure", "job" => job.name().to_string()).increment(1);
                        error!(job = job.name(), %err, "job run failed, waiting for next tick");
                    }
                }
                info!(
                    job = job.name(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    "job run finished"
                );
            }
        }
    }

    info!(job = job.name(), "job stopped");
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use super::*;
    use crate::error::FeedError;
    use crate::shutdown::create_shutdown_channel;

    struct CountingJob {
        name: &'static str,
        runs: AtomicUsize,
        running: AtomicBool,
        overlapped: AtomicBool,
        work: Duration,
        fail: bool,
    }

    impl CountingJob {
        fn with_outcome(name: &'static str, work: Duration, fail: bool) -> Arc<Self> {
            Arc::new(Self {
                name,
                runs: AtomicUsize::new(0),
                running: AtomicBool::new(false),
                overlapped: AtomicBool::new(false),
                work,
                fail,
            })
        }

        fn new(name: &'static str, work: Duration) -> Arc<Self> {
            Self::with_outcome(name, work, false)
        }

        fn failing(name: &'static str) -> Arc<Self> {
            Self::with_outcome(name, Duration::ZERO, true)
        }

        fn runs(&self) -> usize {
            self.runs.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Job for CountingJob {
        fn name(&self) -> &str {
            self.name
        }

        async fn run(&self) -> FeedResult<()> {
            if self.running.swap(true, Ordering::SeqCst) {
                self.overlapped.store(true, Ordering::SeqCst);
            }
            self.runs.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.work).await;
            self.running.store(false, Ordering::SeqCst);

            if self.fail {
                return Err(FeedError::Insert("duplicate key".into()));
            }
            Ok(())
        }
    }

    async fn run_for(scheduler: Scheduler, duration: Duration) {
        let (tx, rx) = create_shutdown_channel();
        let handle = tokio::spawn(scheduler.run(rx));

        tokio::time::sleep(duration).await;
        tx.shutdown();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn fires_each_trigger_on_its_own_interval() {
        let customers = CountingJob::new("customers", Duration::from_secs(2));
        let orders = CountingJob::new("orders", Duration::from_secs(1));
        let scheduler = Scheduler::new()
            .add_job(Duration::from_secs(10), customers.clone())
            .add_job(Duration::from_secs(15), orders.clone());

        run_for(scheduler, Duration::from_millis(30_500)).await;

        assert_eq!(customers.runs(), 3);
        assert_eq!(orders.runs(), 2);
        assert!(!customers.overlapped.load(Ordering::SeqCst));
        assert!(!orders.overlapped.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_job_never_overlaps_itself() {
        let slow = CountingJob::new("slow", Duration::from_secs(15));
        let scheduler = Scheduler::new().add_job(Duration::from_secs(10), slow.clone());

        run_for(scheduler, Duration::from_secs(60)).await;

        assert!(!slow.overlapped.load(Ordering::SeqCst));
        assert!(slow.runs() >= 3);
        assert!(slow.runs() < 6);
    }

    #[tokio::test(start_paused = true)]
    async fn failing_job_keeps_firing() {
        let failing = CountingJob::failing("failing");
        let scheduler = Scheduler::new().add_job(Duration::from_secs(10), failing.clone());

        run_for(scheduler, Duration::from_millis(30_500)).await;

        assert_eq!(failing.runs(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn returns_immediately_when_already_shut_down() {
        let job = CountingJob::new("idle", Duration::ZERO);
        let (tx, rx) = create_shutdown_channel();
        tx.shutdown();

        Scheduler::new()
            .add_job(Duration::from_secs(10), job.clone())
            .run(rx)
            .await;

        assert_eq!(job.runs(), 0);
    }
}
