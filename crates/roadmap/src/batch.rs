//! Batch orchestrator: slice tasks to match eligible keys
//!
//! Each round asks the pool for as many keys as there are remaining
//! tasks, dispatches an equally-sized slice concurrently (one task per
//! key), collects every result or error independently, then pauses
//! before the next slice. Partial failure is expected: a failed task
//! never aborts its batch, and nothing here retries a task.
//!
//! An empty selection means "retry later", so the orchestrator waits and
//! re-selects up to `max_waits` times; past that bound the remaining
//! tasks are failed with `Exhausted` without being dispatched. Every
//! task is attempted at most once.

use std::time::Duration;

use futures_util::future::join_all;
use keypool::KeyPool;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::runner::TaskRunner;

/// Orchestrator pacing knobs.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Pause between consecutive slices, protecting per-key quotas.
    pub batch_pause: Duration,
    /// Wait before re-selecting when no key is eligible.
    pub retry_delay: Duration,
    /// Consecutive empty selections tolerated before giving up.
    pub max_waits: u32,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            batch_pause: Duration::from_secs(1),
            retry_delay: Duration::from_secs(2),
            max_waits: 10,
        }
    }
}

/// Run every task exactly once, in order, batched by key availability.
///
/// The result vector is parallel to `tasks`.
pub async fn run_batches(
    pool: &KeyPool,
    runner: &dyn TaskRunner,
    tasks: &[String],
    opts: &BatchOptions,
) -> Vec<Result<String>> {
    let mut results: Vec<Result<String>> = Vec::with_capacity(tasks.len());
    let mut remaining: &[String] = tasks;
    let mut consecutive_waits = 0u32;

    while !remaining.is_empty() {
        let keys = pool.select_eligible(remaining.len());

        if keys.is_empty() {
            consecutive_waits += 1;
            if consecutive_waits > opts.max_waits {
                warn!(
                    undispatched = remaining.len(),
                    waits = opts.max_waits,
                    "giving up on batch: no key became eligible"
                );
                for _ in remaining {
                    results.push(Err(Error::Exhausted(opts.max_waits)));
                }
                break;
            }
            debug!(
                wait = consecutive_waits,
                delay_ms = opts.retry_delay.as_millis() as u64,
                "no eligible key, retrying selection"
            );
            tokio::time::sleep(opts.retry_delay).await;
            continue;
        }
        consecutive_waits = 0;

        let (slice, rest) = remaining.split_at(keys.len());
        remaining = rest;

        debug!(batch = slice.len(), remaining = rest.len(), "dispatching batch");
        let batch = slice
            .iter()
            .zip(keys.iter())
            .map(|(task, key)| runner.run(*key, task));
        results.extend(join_all(batch).await);

        if !remaining.is_empty() {
            tokio::time::sleep(opts.batch_pause).await;
        }
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::Secret;
    use keypool::{KeyId, PoolConfig};
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Runner that answers every task with `ok:{prompt}`, records which
    /// key carried which prompt, and mirrors the production runner's
    /// pool bookkeeping when given a pool.
    struct RecordingRunner {
        calls: AtomicUsize,
        log: Mutex<Vec<(KeyId, String)>>,
        fail_prompts: Vec<String>,
        pool: Option<Arc<KeyPool>>,
    }

    impl RecordingRunner {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                log: Mutex::new(Vec::new()),
                fail_prompts: Vec::new(),
                pool: None,
            }
        }

        fn failing_on(prompts: &[&str]) -> Self {
            Self {
                fail_prompts: prompts.iter().map(|s| s.to_string()).collect(),
                ..Self::new()
            }
        }

        fn with_pool(pool: Arc<KeyPool>) -> Self {
            Self {
                pool: Some(pool),
                ..Self::new()
            }
        }
    }

    impl TaskRunner for RecordingRunner {
        fn run<'a>(
            &'a self,
            key: KeyId,
            prompt: &'a str,
        ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>> {
            Box::pin(async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                self.log.lock().unwrap().push((key, prompt.to_string()));
                if let Some(pool) = &self.pool {
                    pool.record_usage(key);
                }
                if self.fail_prompts.iter().any(|p| p == prompt) {
                    if let Some(pool) = &self.pool {
                        pool.record_failure(key);
                    }
                    Err(Error::Generation(gemini::Error::EmptyResponse))
                } else {
                    if let Some(pool) = &self.pool {
                        pool.record_success(key);
                    }
                    Ok(format!("ok:{prompt}"))
                }
            })
        }
    }

    fn pool_with(keys: usize, config: PoolConfig) -> KeyPool {
        let secrets = (0..keys).map(|i| Secret::new(format!("sk_{i}"))).collect();
        KeyPool::new(secrets, config).unwrap()
    }

    fn open_config() -> PoolConfig {
        PoolConfig {
            window: Duration::from_secs(60),
            max_calls_per_window: 1000,
            min_spacing: Duration::ZERO,
            failure_threshold: 3,
            cooldown: Duration::from_secs(60),
        }
    }

    fn fast_opts() -> BatchOptions {
        BatchOptions {
            batch_pause: Duration::ZERO,
            retry_delay: Duration::from_millis(1),
            max_waits: 3,
        }
    }

    fn tasks(m: usize) -> Vec<String> {
        (0..m).map(|i| format!("task-{i}")).collect()
    }

    #[tokio::test]
    async fn every_task_dispatched_exactly_once() {
        let pool = pool_with(2, open_config());
        let runner = RecordingRunner::new();
        let tasks = tasks(5);

        let results = run_batches(&pool, &runner, &tasks, &fast_opts()).await;

        assert_eq!(results.len(), 5);
        assert_eq!(runner.calls.load(Ordering::SeqCst), 5);
        // Results line up with tasks, in order
        for (i, result) in results.iter().enumerate() {
            assert_eq!(result.as_ref().unwrap(), &format!("ok:task-{i}"));
        }
        // No task ran twice
        let log = runner.log.lock().unwrap();
        let mut prompts: Vec<_> = log.iter().map(|(_, p)| p.clone()).collect();
        prompts.sort();
        prompts.dedup();
        assert_eq!(prompts.len(), 5);
    }

    #[tokio::test]
    async fn batch_size_is_bounded_by_eligible_keys() {
        let pool = pool_with(2, open_config());
        let runner = RecordingRunner::new();
        let tasks = tasks(5);

        run_batches(&pool, &runner, &tasks, &fast_opts()).await;

        // 2 keys for 5 tasks: slices of 2, 2, 1 — so within each pair of
        // consecutive dispatches in a slice the keys differ.
        let log = runner.log.lock().unwrap();
        assert_eq!(log.len(), 5);
        assert_ne!(log[0].0, log[1].0);
        assert_ne!(log[2].0, log[3].0);
    }

    #[tokio::test]
    async fn failed_task_does_not_abort_the_batch() {
        let pool = pool_with(3, open_config());
        let runner = RecordingRunner::failing_on(&["task-1"]);
        let tasks = tasks(3);

        let results = run_batches(&pool, &runner, &tasks, &fast_opts()).await;

        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(Error::Generation(_))));
        assert!(results[2].is_ok());
        assert_eq!(runner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausted_pool_fails_remaining_tasks_undispatched() {
        // Every key permanently suspended: selection stays empty.
        let config = PoolConfig {
            cooldown: Duration::from_secs(3600),
            ..open_config()
        };
        let pool = pool_with(1, config);
        for _ in 0..3 {
            pool.record_failure(KeyId(0));
        }

        let runner = RecordingRunner::new();
        let tasks = tasks(2);
        let results = run_batches(&pool, &runner, &tasks, &fast_opts()).await;

        assert_eq!(runner.calls.load(Ordering::SeqCst), 0);
        assert_eq!(results.len(), 2);
        for result in &results {
            assert!(matches!(result, Err(Error::Exhausted(3))));
        }
    }

    #[tokio::test]
    async fn recovers_after_transient_exhaustion() {
        // Spacing makes the single key ineligible right after use; the
        // orchestrator must wait it out between single-task slices.
        let config = PoolConfig {
            min_spacing: Duration::from_millis(5),
            ..open_config()
        };
        let pool = Arc::new(pool_with(1, config));
        let runner = RecordingRunner::with_pool(pool.clone());
        let opts = BatchOptions {
            batch_pause: Duration::ZERO,
            retry_delay: Duration::from_millis(5),
            max_waits: 20,
        };

        let results = run_batches(&pool, &runner, &tasks(3), &opts).await;

        assert_eq!(runner.calls.load(Ordering::SeqCst), 3);
        assert!(results.iter().all(|r| r.is_ok()));
    }

    #[tokio::test]
    async fn empty_task_list_is_a_noop() {
        let pool = pool_with(2, open_config());
        let runner = RecordingRunner::new();
        let results = run_batches(&pool, &runner, &[], &fast_opts()).await;
        assert!(results.is_empty());
        assert_eq!(runner.calls.load(Ordering::SeqCst), 0);
    }
}
