// src/schedule/cycle.rs
// =============================================================================
// The sampling cycle and the supervisor around it.
//
// One cycle:
// 1. Enumerate all lines (retried on failure, forever by default)
// 2. Seed a fresh WorkQueue with them
// 3. Drain it with the worker pool into a fresh ResultSet
// 4. Persist the ResultSet through the artifact sink
//
// run_forever() repeats cycles with a long sleep in between (12h by
// default). Any error that escapes a cycle (sink I/O, a crashed worker, an
// exhausted retry ceiling) makes the supervisor log it, wait briefly, and
// start the whole cycle over. Each cycle runs as its own tokio task, so a
// panic inside it (enumeration, the sink) counts as one more failed cycle
// instead of taking the process down.
// =============================================================================

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn, Level};

use crate::sampler::{
    run_pool, LineSource, PoolReport, PoolSettings, ResultSet, StationResolver, WorkQueue,
};
use crate::sink::ArtifactSink;

use super::retry::{retry, RetryPolicy};

/// Timing and retry behaviour of the scheduler.
#[derive(Debug, Clone)]
pub struct CycleSettings {
    /// Retry policy around line enumeration
    pub enumeration_retry: RetryPolicy,
    /// Retry policy around a whole failed cycle
    pub supervisor: RetryPolicy,
    /// Sleep between two successful cycles
    pub interval: Duration,
    pub pool: PoolSettings,
}

impl Default for CycleSettings {
    fn default() -> Self {
        Self {
            enumeration_retry: RetryPolicy::forever(Duration::from_secs(1)),
            supervisor: RetryPolicy::forever(Duration::from_secs(1)).logged_at(Level::ERROR),
            interval: Duration::from_secs(12 * 60 * 60),
            pool: PoolSettings::default(),
        }
    }
}

/// Outcome of one successful cycle.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub lines: usize,
    pub stations: usize,
    pub pool: PoolReport,
    pub elapsed: Duration,
}

#[derive(Clone)]
pub struct Scheduler {
    lines: Arc<dyn LineSource>,
    resolver: Arc<dyn StationResolver>,
    sink: Arc<dyn ArtifactSink>,
    settings: CycleSettings,
}

impl Scheduler {
    pub fn new(
        lines: Arc<dyn LineSource>,
        resolver: Arc<dyn StationResolver>,
        sink: Arc<dyn ArtifactSink>,
        settings: CycleSettings,
    ) -> Self {
        Self {
            lines,
            resolver,
            sink,
            settings,
        }
    }

    /// Runs one enumerate → drain → persist cycle.
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        let started = Instant::now();
        info!("Starting to sample stations");

        let lines = retry(&self.settings.enumeration_retry, "line enumeration", || {
            self.lines.enumerate_lines()
        })
        .await
        .context("could not enumerate lines")?;

        let queue = Arc::new(WorkQueue::seeded(lines));
        let line_count = queue.len();
        let results = Arc::new(ResultSet::new());

        let pool = run_pool(
            queue,
            results.clone(),
            self.resolver.clone(),
            &self.settings.pool,
        )
        .await?;

        if results.is_empty() {
            warn!("No station was sampled this cycle, writing an empty artifact");
        }
        let stations = results.snapshot();
        self.sink
            .persist(&stations)
            .await
            .with_context(|| format!("could not write {}", self.sink.describe()))?;

        let report = CycleReport {
            lines: line_count,
            stations: stations.len(),
            pool,
            elapsed: started.elapsed(),
        };

        info!(
            "Sampled {} stations from {} lines in {:.0?} ({} failed attempts, {} lines given up) -> {}",
            report.stations,
            report.lines,
            report.elapsed,
            report.pool.failed_attempts,
            report.pool.abandoned.len(),
            self.sink.describe()
        );
        Ok(report)
    }

    /// One cycle, restarted by the supervisor policy until it succeeds.
    pub async fn run_once(&self) -> Result<CycleReport> {
        retry(&self.settings.supervisor, "sampling cycle", || {
            let this = self.clone();
            async move {
                tokio::spawn(async move { this.run_cycle().await })
                    .await
                    .context("sampling cycle crashed")
                    .and_then(|cycle| cycle)
            }
        })
        .await
    }

    /// Samples, sleeps, samples again. Only returns if the supervisor's
    /// ceiling is configured and reached.
    pub async fn run_forever(&self) -> Result<()> {
        info!("Starting station sampler");
        loop {
            self.run_once().await?;
            info!(
                "Sleeping for {:?} before sampling stations again",
                self.settings.interval
            );
            tokio::time::sleep(self.settings.interval).await;
        }
    }
}
