// src/sampler/pool.rs
// =============================================================================
// The worker pool that drains a WorkQueue.
//
// Each worker loops:
// 1. Stop if the queue is drained (nothing pending, nothing in flight)
// 2. Pop a line; if none is pending, wait until one is or until drained
// 3. Resolve its terminal station
// 4. Success -> record the station, mark the line complete
//    Failure -> put the line back (or give up on it if a cap is set)
// 5. Sleep a fixed delay before the next attempt
//
// Workers start staggered so the upstream does not see a burst of N
// requests in the same instant. The delay in step 5 is both courtesy and
// the only backoff there is: every kind of failure waits the same.
//
// Workers run as separate tokio tasks in a JoinSet. If one panics, the pool
// returns an error and dropping the JoinSet aborts the rest.
// =============================================================================

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::queue::WorkQueue;
use super::results::ResultSet;
use super::stations::StationResolver;
use super::types::LineId;

/// How the pool behaves.
#[derive(Debug, Clone)]
pub struct PoolSettings {
    /// Number of concurrent workers
    pub concurrency: usize,
    /// Pause after every attempt, successful or not
    pub attempt_delay: Duration,
    /// Start offset between consecutive workers
    pub stagger: Duration,
    /// Failed attempts after which a line is dropped; None = never
    pub max_line_attempts: Option<u32>,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            concurrency: 16,
            attempt_delay: Duration::from_secs(2),
            stagger: Duration::from_millis(500),
            max_line_attempts: None,
        }
    }
}

/// What a pool run achieved.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PoolReport {
    /// Lines that got a station
    pub resolved: usize,
    /// Attempts that failed (a line can fail many times)
    pub failed_attempts: u64,
    /// Lines dropped after hitting max_line_attempts
    pub abandoned: Vec<LineId>,
}

impl PoolReport {
    fn merge(&mut self, other: PoolReport) {
        self.resolved += other.resolved;
        self.failed_attempts += other.failed_attempts;
        self.abandoned.extend(other.abandoned);
    }
}

/// Runs `settings.concurrency` workers until the queue is drained.
pub async fn run_pool(
    queue: Arc<WorkQueue>,
    results: Arc<ResultSet>,
    resolver: Arc<dyn StationResolver>,
    settings: &PoolSettings,
) -> Result<PoolReport> {
    if queue.is_empty() {
        info!("Nothing to sample, no lines queued");
        return Ok(PoolReport::default());
    }

    let concurrency = settings.concurrency.max(1);
    info!(
        "Starting {} workers for {} lines",
        concurrency,
        queue.len()
    );

    let mut workers = JoinSet::new();
    for index in 0..concurrency {
        workers.spawn(worker(
            index,
            queue.clone(),
            results.clone(),
            resolver.clone(),
            settings.clone(),
        ));
    }

    let mut report = PoolReport::default();
    while let Some(joined) = workers.join_next().await {
        report.merge(joined.context("station worker crashed")?);
    }

    Ok(report)
}

async fn worker(
    index: usize,
    queue: Arc<WorkQueue>,
    results: Arc<ResultSet>,
    resolver: Arc<dyn StationResolver>,
    settings: PoolSettings,
) -> PoolReport {
    let mut report = PoolReport::default();
    tokio::time::sleep(start_delay(settings.stagger, index)).await;

    while !queue.is_drained() {
        let Some(line) = queue.pop() else {
            // Someone else holds the last lines; wait for them to finish or fail
            queue.wait_for_work().await;
            continue;
        };

        info!("Lines queue size: {}", queue.len() + queue.in_flight());

        match resolver.resolve_station(&line).await {
            Ok(station) => {
                if results.insert(station) {
                    debug!(
                        "Line {} -> station {} ({} sampled)",
                        line,
                        station,
                        results.len()
                    );
                } else {
                    debug!("Station {} for line {} was already sampled", station, line);
                }
                queue.complete(&line);
                report.resolved += 1;
            }
            Err(e) => {
                report.failed_attempts += 1;
                let failures = queue.failures(&line) + 1;

                match settings.max_line_attempts {
                    Some(max) if failures >= max => {
                        warn!(
                            "Giving up on line {} after {} failed attempts: {}",
                            line, failures, e
                        );
                        queue.abandon(&line);
                        report.abandoned.push(line);
                    }
                    _ => {
                        warn!(
                            "Line {} failed ({}, attempt {}), requeued: {}",
                            line,
                            e.kind(),
                            failures,
                            e
                        );
                        queue.requeue(line);
                    }
                }
            }
        }

        tokio::time::sleep(settings.attempt_delay).await;
    }

    debug!("Worker {} done", index);
    report
}

/// Offset of worker `index`. Saturates instead of overflowing for huge
/// stagger values or worker counts.
fn start_delay(stagger: Duration, index: usize) -> Duration {
    stagger.saturating_mul(u32::try_from(index).unwrap_or(u32::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::FetchError;
    use crate::sampler::types::StationId;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Resolver scripted per line: fail `failures` times, then answer `station`.
    struct ScriptedResolver {
        script: HashMap<String, (u32, Option<u64>)>,
        calls: Mutex<HashMap<String, u32>>,
    }

    impl ScriptedResolver {
        fn new(script: &[(&str, u32, Option<u64>)]) -> Arc<Self> {
            Arc::new(Self {
                script: script
                    .iter()
                    .map(|(line, fails, station)| (line.to_string(), (*fails, *station)))
                    .collect(),
                calls: Mutex::new(HashMap::new()),
            })
        }

        fn calls(&self, line: &str) -> u32 {
            self.calls.lock().unwrap().get(line).copied().unwrap_or(0)
        }
    }

    #[async_trait]
    impl StationResolver for ScriptedResolver {
        async fn resolve_station(&self, line: &LineId) -> Result<StationId, FetchError> {
            let call = {
                let mut calls = self.calls.lock().unwrap();
                let call = calls.entry(line.as_str().to_string()).or_insert(0);
                *call += 1;
                *call
            };

            let (fails, station) = self.script[line.as_str()];
            match station {
                Some(n) if call > fails => Ok(StationId::new(n).unwrap()),
                Some(_) => Err(FetchError::Status {
                    url: format!("line_details/{}", line),
                    status: 503,
                }),
                None => Err(FetchError::NotFound(line.clone())),
            }
        }
    }

    fn fast(concurrency: usize) -> PoolSettings {
        PoolSettings {
            concurrency,
            attempt_delay: Duration::from_millis(1),
            stagger: Duration::ZERO,
            max_line_attempts: None,
        }
    }

    fn seeded(tokens: &[&str]) -> Arc<WorkQueue> {
        Arc::new(WorkQueue::seeded(
            tokens.iter().map(|t| LineId::new(*t).unwrap()),
        ))
    }

    fn ids(results: &ResultSet) -> Vec<u64> {
        results.snapshot().into_iter().map(StationId::get).collect()
    }

    #[tokio::test]
    async fn test_retry_then_success_scenario() {
        let resolver = ScriptedResolver::new(&[("3A", 0, Some(101)), ("3AB", 1, Some(202))]);
        let queue = seeded(&["3A", "3AB"]);
        let results = Arc::new(ResultSet::new());

        let report = run_pool(queue.clone(), results.clone(), resolver.clone(), &fast(16))
            .await
            .unwrap();

        assert_eq!(ids(&results), vec![101, 202]);
        assert!(queue.is_drained());
        assert_eq!(resolver.calls("3A"), 1);
        assert_eq!(resolver.calls("3AB"), 2);
        assert_eq!(report.resolved, 2);
        assert_eq!(report.failed_attempts, 1);
    }

    #[tokio::test]
    async fn test_shared_terminals_collapse() {
        let resolver = ScriptedResolver::new(&[
            ("9A", 2, Some(55)),
            ("9B", 0, Some(55)),
            ("60A", 3, Some(70)),
            ("60B", 1, Some(71)),
        ]);
        let queue = seeded(&["9A", "9B", "60A", "60B"]);
        let results = Arc::new(ResultSet::new());

        let report = run_pool(queue.clone(), results.clone(), resolver, &fast(3))
            .await
            .unwrap();

        assert_eq!(ids(&results), vec![55, 70, 71]);
        assert_eq!(report.resolved, 4);
        assert_eq!(report.failed_attempts, 6);
        assert!(queue.is_drained());
    }

    #[tokio::test]
    async fn test_single_worker_drains() {
        let resolver = ScriptedResolver::new(&[("1A", 2, Some(1)), ("1B", 0, Some(2))]);
        let queue = seeded(&["1A", "1B"]);
        let results = Arc::new(ResultSet::new());

        run_pool(queue.clone(), results.clone(), resolver, &fast(1))
            .await
            .unwrap();
        assert_eq!(ids(&results), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_always_failing_line_keeps_pool_alive() {
        let resolver = ScriptedResolver::new(&[("3A", 0, Some(101)), ("GHOST", 0, None)]);
        let queue = seeded(&["3A", "GHOST"]);
        let results = Arc::new(ResultSet::new());

        let settings = fast(4);
        let run = run_pool(queue.clone(), results.clone(), resolver.clone(), &settings);
        let outcome = tokio::time::timeout(Duration::from_millis(200), run).await;

        assert!(outcome.is_err(), "pool must not finish while a line is outstanding");
        assert_eq!(ids(&results), vec![101]);
        assert!(resolver.calls("GHOST") > 1);
    }

    #[tokio::test]
    async fn test_give_up_cap_abandons_line() {
        let resolver = ScriptedResolver::new(&[("3A", 0, Some(101)), ("GHOST", 0, None)]);
        let queue = seeded(&["3A", "GHOST"]);
        let results = Arc::new(ResultSet::new());
        let settings = PoolSettings {
            max_line_attempts: Some(3),
            ..fast(2)
        };

        let report = run_pool(queue.clone(), results.clone(), resolver.clone(), &settings)
            .await
            .unwrap();

        assert_eq!(ids(&results), vec![101]);
        assert_eq!(resolver.calls("GHOST"), 3);
        assert_eq!(report.abandoned, vec![LineId::new("GHOST").unwrap()]);
        assert!(queue.is_drained());
    }

    #[tokio::test]
    async fn test_empty_queue_finishes_immediately() {
        let resolver = ScriptedResolver::new(&[]);
        let report = run_pool(
            Arc::new(WorkQueue::new()),
            Arc::new(ResultSet::new()),
            resolver,
            &fast(4),
        )
        .await
        .unwrap();
        assert_eq!(report, PoolReport::default());
    }

    #[test]
    fn test_start_delay_staggers_workers() {
        let stagger = Duration::from_millis(500);
        assert_eq!(start_delay(stagger, 0), Duration::ZERO);
        assert_eq!(start_delay(stagger, 3), Duration::from_millis(1500));
    }

    #[test]
    fn test_start_delay_saturates_instead_of_panicking() {
        assert_eq!(start_delay(Duration::MAX, 2), Duration::MAX);
        assert_eq!(
            start_delay(Duration::from_secs(1), usize::MAX),
            Duration::from_secs(u32::MAX as u64)
        );
    }
}
