//! Fixed-rate scheduler for sync cycles.
//!
//! A cycle starts every period, the first one immediately. With
//! [`OverlapPolicy::Allow`] a tick starts a new cycle even while the previous
//! one is still running; [`OverlapPolicy::SkipIfRunning`] drops such ticks.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::SchedulerConfig;
use crate::error::ConfigError;

/// Work the scheduler runs once per period.
#[async_trait]
pub trait SyncJob: Send + Sync + 'static {
    async fn run_cycle(&self);
}

/// What to do when a tick fires while a cycle is in flight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OverlapPolicy {
    /// Start another cycle anyway.
    #[default]
    Allow,
    /// Skip the tick.
    SkipIfRunning,
}

impl FromStr for OverlapPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "allow" => Ok(Self::Allow),
            "skip" | "skip-if-running" => Ok(Self::SkipIfRunning),
            _ => Err(ConfigError::Invalid {
                key: "SYNC_OVERLAP_POLICY",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for OverlapPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allow => write!(f, "allow"),
            Self::SkipIfRunning => write!(f, "skip-if-running"),
        }
    }
}

/// Ticks started and skipped over a scheduler's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub started: u64,
    pub skipped: u64,
}

/// Clears the in-flight flag when a cycle ends, including by panic.
struct InFlight(Arc<AtomicBool>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Runs a [`SyncJob`] on a fixed period until cancelled.
#[derive(Debug, Clone)]
pub struct Scheduler {
    interval: Duration,
    overlap: OverlapPolicy,
}

impl Scheduler {
    #[must_use]
    pub fn new(config: &SchedulerConfig) -> Self {
        Self {
            interval: config.interval,
            overlap: config.overlap,
        }
    }

    /// Tick until `cancel` fires, then wait for cycles still in flight.
    pub async fn run<J: SyncJob>(&self, job: Arc<J>, cancel: CancellationToken) -> SchedulerStats {
        info!(
            interval_secs = self.interval.as_secs(),
            overlap = %self.overlap,
            "Scheduler started"
        );

        let mut ticker = tokio::time::interval(self.interval);
        let in_flight = Arc::new(AtomicBool::new(false));
        let mut cycles = JoinSet::new();
        let mut stats = SchedulerStats::default();

        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    while let Some(done) = cycles.try_join_next() {
                        if let Err(e) = done {
                            warn!(error = %e, "Sync cycle panicked");
                        }
                    }

                    let guard = match self.overlap {
                        OverlapPolicy::Allow => None,
                        OverlapPolicy::SkipIfRunning => {
                            if in_flight.swap(true, Ordering::SeqCst) {
                                stats.skipped += 1;
                                warn!("Previous sync cycle still running, skipping tick");
                                continue;
                            }
                            Some(InFlight(Arc::clone(&in_flight)))
                        }
                    };

                    stats.started += 1;
                    debug!(cycle = stats.started, "Starting sync cycle");
                    let job = Arc::clone(&job);
                    cycles.spawn(async move {
                        let _guard = guard;
                        job.run_cycle().await;
                    });
                }
            }
        }

        info!(running = cycles.len(), "Scheduler stopping, waiting for running cycles");
        while let Some(done) = cycles.join_next().await {
            if let Err(e) = done {
                warn!(error = %e, "Sync cycle panicked");
            }
        }

        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    /// Counts cycles and tracks peak concurrency; each cycle sleeps `duration`.
    struct SleepyJob {
        duration: Duration,
        runs: AtomicUsize,
        active: AtomicUsize,
        peak: AtomicUsize,
    }

    impl SleepyJob {
        fn new(duration: Duration) -> Arc<Self> {
            Arc::new(Self {
                duration,
                runs: AtomicUsize::new(0),
                active: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl SyncJob for SleepyJob {
        async fn run_cycle(&self) {
            self.runs.fetch_add(1, Ordering::SeqCst);
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.duration).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
        }
    }

    fn scheduler(overlap: OverlapPolicy) -> Scheduler {
        Scheduler::new(&SchedulerConfig {
            interval: Duration::from_secs(60),
            overlap,
        })
    }

    async fn run_for(scheduler: Scheduler, job: Arc<SleepyJob>, secs: u64) -> SchedulerStats {
        let cancel = CancellationToken::new();
        let handle = {
            let cancel = cancel.clone();
            tokio::spawn(async move { scheduler.run(job, cancel).await })
        };
        tokio::time::sleep(Duration::from_secs(secs)).await;
        cancel.cancel();
        handle.await.unwrap()
    }

    #[test]
    fn test_overlap_policy_parsing() {
        assert_eq!("allow".parse::<OverlapPolicy>().unwrap(), OverlapPolicy::Allow);
        assert_eq!("SKIP".parse::<OverlapPolicy>().unwrap(), OverlapPolicy::SkipIfRunning);
        assert_eq!(
            "skip-if-running".parse::<OverlapPolicy>().unwrap(),
            OverlapPolicy::SkipIfRunning
        );
        assert!("sometimes".parse::<OverlapPolicy>().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fixed_rate_first_tick_immediate() {
        let job = SleepyJob::new(Duration::from_secs(1));
        let stats = run_for(scheduler(OverlapPolicy::Allow), Arc::clone(&job), 150).await;

        // Ticks at 0s, 60s and 120s.
        assert_eq!(stats.started, 3);
        assert_eq!(job.runs.load(Ordering::SeqCst), 3);
        assert_eq!(job.peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_allow_policy_overlaps_slow_cycles() {
        let job = SleepyJob::new(Duration::from_secs(90));
        let stats = run_for(scheduler(OverlapPolicy::Allow), Arc::clone(&job), 150).await;

        assert_eq!(stats.started, 3);
        assert_eq!(stats.skipped, 0);
        assert_eq!(job.peak.load(Ordering::SeqCst), 2);
        // Shutdown waited for the in-flight cycles.
        assert_eq!(job.active.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_skip_policy_drops_tick_while_running() {
        let job = SleepyJob::new(Duration::from_secs(90));
        let stats = run_for(scheduler(OverlapPolicy::SkipIfRunning), Arc::clone(&job), 150).await;

        // 0s starts, 60s is skipped, 120s starts after the first cycle ended at 90s.
        assert_eq!(stats.started, 2);
        assert_eq!(stats.skipped, 1);
        assert_eq!(job.peak.load(Ordering::SeqCst), 1);
    }
}
