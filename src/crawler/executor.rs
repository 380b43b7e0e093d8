//! In-process executor for running a whole job from the CLI
//!
//! The executor owns everything the engine deliberately does not: the task queue, the
//! degree of parallelism, per-task timeouts and result aggregation. Tasks reach it only
//! through a [`ChannelScheduler`], exactly as they would reach an external job queue.

use crate::crawler::engine::CrawlEngine;
use crate::crawler::scheduler::{ChannelScheduler, SchedulerBridge};
use crate::crawler::task::{CrawlResult, CrawlTask};
use crate::output::JobReport;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

/// Executor limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutorOptions {
    /// Maximum number of tasks running at once
    pub concurrency: usize,
    /// Upper bound for one task, rendering included
    pub task_timeout: Duration,
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        Self {
            concurrency: 5,
            task_timeout: Duration::from_secs(60),
        }
    }
}

/// What a finished task hands back to the executor loop
struct TaskOutcome {
    url: String,
    depth: u32,
    outcome: Result<CrawlResult, String>,
}

/// Runs tasks on the local tokio runtime until the job's queue drains
///
/// Failed tasks are recorded in the report and not retried; a retry would find its URL
/// already marked visited and skip anyway.
pub struct LocalExecutor {
    engine: Arc<CrawlEngine>,
    options: ExecutorOptions,
}

impl LocalExecutor {
    pub fn new(engine: CrawlEngine, options: ExecutorOptions) -> Self {
        Self {
            engine: Arc::new(engine),
            options: ExecutorOptions {
                concurrency: options.concurrency.max(1),
                ..options
            },
        }
    }

    /// Runs a job from its seed task to completion
    ///
    /// # Arguments
    ///
    /// * `seed` - The depth-0 task of the job
    ///
    /// # Returns
    ///
    /// The job report, finished, with every task outcome recorded
    pub async fn run(&self, seed: CrawlTask) -> JobReport {
        let mut report = JobReport::new(
            seed.job_id.clone(),
            seed.job_config.ignore_query_parameters,
        );
        let (bridge, mut queue) = ChannelScheduler::channel();
        let bridge = Arc::new(bridge);

        let seed_url = seed.url.clone();
        if let Err(e) = bridge.schedule(seed).await {
            report.record_failure(&seed_url, 0, e.to_string());
            report.finish();
            return report;
        }

        let mut running = JoinSet::new();
        let mut started = 0u64;

        loop {
            // Fill free slots from the queue
            while running.len() < self.options.concurrency {
                let Ok(task) = queue.try_recv() else {
                    break;
                };
                started += 1;
                running.spawn(self.run_task(task, bridge.clone()));
            }

            // Nothing running and nothing queued: no one is left to schedule more work
            let Some(joined) = running.join_next().await else {
                break;
            };

            match joined {
                Ok(TaskOutcome {
                    outcome: Ok(result),
                    ..
                }) => report.record_result(result),
                Ok(TaskOutcome {
                    url,
                    depth,
                    outcome: Err(message),
                }) => {
                    tracing::error!("Task failed for {} (depth {}): {}", url, depth, message);
                    report.record_failure(&url, depth, message);
                }
                Err(e) => {
                    tracing::error!("Task panicked or was cancelled: {}", e);
                    report.record_failure("(unknown)", 0, e.to_string());
                }
            }
        }

        report.finish();
        tracing::info!(
            "Job {} finished: {} tasks run, {} pages processed, {} failures",
            report.job_id,
            started,
            report.pages_processed,
            report.failures.len()
        );
        report
    }

    fn run_task(
        &self,
        task: CrawlTask,
        bridge: Arc<ChannelScheduler>,
    ) -> impl std::future::Future<Output = TaskOutcome> + Send + 'static {
        let engine = self.engine.clone();
        let timeout = self.options.task_timeout;

        async move {
            let url = task.url.clone();
            let depth = task.depth;

            let outcome = match tokio::time::timeout(timeout, engine.handle(task, bridge.as_ref()))
                .await
            {
                Ok(Ok(result)) => Ok(result),
                Ok(Err(e)) => Err(e.to_string()),
                Err(_) => Err(format!("task timed out after {}s", timeout.as_secs())),
            };

            TaskOutcome {
                url,
                depth,
                outcome,
            }
        }
    }
}
