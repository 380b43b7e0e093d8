//! Crawl step engine
//!
//! One invocation processes exactly one URL and terminates. All coordination with other
//! invocations goes through the job's [`JobStateStore`]:
//!
//! 1. Resolve the job configuration (written by the seed task, read by everyone else)
//! 2. Skip if the job was aborted
//! 3. Skip if the normalized URL is already visited
//! 4. Skip if the page budget is spent
//! 5. Mark visited, then increment the page count
//! 6. Render and extract content
//! 7. Classify links and emit child tasks for unvisited pages within the depth limit
//! 8. Download file links when attachments are enabled
//!
//! Steps 3 to 5 are separate store operations with no lock between them. Two tasks for
//! the same URL can both pass step 3, and concurrent tasks can overshoot the page budget
//! by the number of tasks in flight. Consumers of [`CrawlResult`]s must tolerate
//! duplicates.

use crate::crawler::attachments::{AttachmentMetadata, AttachmentRef, AttachmentStore};
use crate::crawler::extract::StrategyTable;
use crate::crawler::fetcher::Renderer;
use crate::crawler::links::partition_links;
use crate::crawler::scheduler::SchedulerBridge;
use crate::crawler::task::{CrawlResult, CrawlTask, JobConfig, JobId, Link};
use crate::state::{SkipReason, StepState};
use crate::storage::{JobStateStore, KvBackend};
use crate::url::{base_domain, normalize_url, PathFilter};
use crate::{ConfigError, Result};
use std::collections::HashSet;
use std::sync::Arc;

/// What one step decided, before anything is scheduled
#[derive(Debug, Clone)]
pub struct StepOutcome {
    /// Terminal state of the step (a skip state or `Processed`)
    pub state: StepState,
    pub result: CrawlResult,
    /// Child tasks to hand to the scheduler bridge
    pub tasks: Vec<CrawlTask>,
}

impl StepOutcome {
    fn skipped(task: &CrawlTask, reason: SkipReason) -> Self {
        Self {
            state: reason.state(),
            result: CrawlResult::skipped(&task.url, task.depth, reason),
            tasks: Vec::new(),
        }
    }
}

/// The per-invocation decision procedure
#[derive(Clone)]
pub struct CrawlEngine {
    backend: Arc<dyn KvBackend>,
    renderer: Arc<dyn Renderer>,
    strategies: StrategyTable,
    attachment_store: Option<Arc<dyn AttachmentStore>>,
}

fn advance(state: &mut StepState, next: StepState, url: &str) {
    debug_assert!(
        state.can_transition_to(next),
        "invalid step transition {} -> {}",
        state,
        next
    );
    tracing::trace!("{}: {} -> {}", url, state, next);
    *state = next;
}

impl CrawlEngine {
    /// Creates an engine with the default (generic) extraction strategy
    pub fn new(backend: Arc<dyn KvBackend>, renderer: Arc<dyn Renderer>) -> Self {
        Self {
            backend,
            renderer,
            strategies: StrategyTable::default(),
            attachment_store: None,
        }
    }

    pub fn with_strategies(mut self, strategies: StrategyTable) -> Self {
        self.strategies = strategies;
        self
    }

    pub fn with_attachment_store(mut self, store: Arc<dyn AttachmentStore>) -> Self {
        self.attachment_store = Some(store);
        self
    }

    /// The namespaced state of one job
    pub fn job_store(&self, job_id: &JobId) -> JobStateStore {
        JobStateStore::new(self.backend.clone(), job_id.clone())
    }

    /// Processes one task and schedules its children
    ///
    /// This is the entry point an executor calls for every task it dequeues.
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlResult)` - The page was processed or skipped
    /// * `Err(FanoutError)` - Rendering or extraction of the task's own URL failed, or the
    ///   store was unreachable; retry policy belongs to the executor
    pub async fn handle(
        &self,
        task: CrawlTask,
        bridge: &dyn SchedulerBridge,
    ) -> Result<CrawlResult> {
        let outcome = self.step(&task).await?;
        let mut state = outcome.state;
        let mut result = outcome.result;

        for child in outcome.tasks {
            let child_url = child.url.clone();
            if let Err(e) = bridge.schedule(child).await {
                tracing::warn!("Failed to schedule {} from {}: {}", child_url, task.url, e);
                result.links_queued = result.links_queued.saturating_sub(1);
            }
        }

        advance(&mut state, StepState::Done, &task.url);
        Ok(result)
    }

    /// Runs the decision procedure for one task without scheduling anything
    pub async fn step(&self, task: &CrawlTask) -> Result<StepOutcome> {
        let store = self.job_store(&task.job_id);
        let mut state = StepState::Start;

        // Step 1: Resolve job configuration
        let config = self.resolve_config(&store, task).await?;
        let filter = config
            .path_filter()
            .map_err(|e| ConfigError::InvalidPattern(e.to_string()))?;
        let normalized = normalize_url(&task.url, config.ignore_query_parameters);
        advance(&mut state, StepState::ConfigResolved, &task.url);

        // Step 2: Cooperative cancellation
        if store.is_aborted().await? {
            tracing::debug!("Job {} aborted, skipping {}", task.job_id, task.url);
            return Ok(StepOutcome::skipped(task, SkipReason::JobAborted));
        }

        // Step 3: Dedup check
        if store.is_visited(&normalized).await? {
            tracing::debug!("Already visited: {}", normalized);
            return Ok(StepOutcome::skipped(task, SkipReason::AlreadyVisited));
        }

        // Step 4: Budget check
        let page_count = store.page_count().await?;
        if page_count >= config.max_pages {
            tracing::debug!(
                "Page budget spent ({}/{}), skipping {}",
                page_count,
                config.max_pages,
                task.url
            );
            return Ok(StepOutcome::skipped(task, SkipReason::MaxPagesReached));
        }

        // Step 5: Mark visited, then count
        store.mark_visited(&normalized).await?;
        store.increment_page_count().await?;

        // Step 6: Render and extract
        tracing::info!(
            "[{}] Depth {}/{}: {}",
            task.job_id,
            task.depth,
            config.max_depth,
            task.url
        );
        let page = self.renderer.navigate(&task.url).await?;
        let extractor = self.strategies.select(&task.url);
        tracing::debug!("Extracting {} with {} strategy", task.url, extractor.name());
        let content = extractor.extract(&page, &config).await?;

        // Step 7: Links
        let raw_links = self.renderer.extract_links(&page);
        let links_found = raw_links.len();
        let partitioned = partition_links(&raw_links, &config);
        let tasks = self
            .plan_children(&store, task, &config, &filter, &partitioned.pages)
            .await;

        // Step 8: Attachments
        let attachments = if config.include_attachments {
            self.collect_attachments(task, &partitioned.files).await
        } else {
            Vec::new()
        };

        advance(&mut state, StepState::Processed, &task.url);
        tracing::info!(
            "Crawled {}: {} links found, {} queued, {} attachments",
            task.url,
            links_found,
            tasks.len(),
            attachments.len()
        );

        Ok(StepOutcome {
            state,
            result: CrawlResult {
                url: task.url.clone(),
                depth: task.depth,
                content: Some(content),
                links_found,
                links_queued: tasks.len(),
                attachments,
                skipped: false,
                skip_reason: None,
            },
            tasks,
        })
    }

    /// Resolves the configuration every task of the job shares
    ///
    /// The seed task writes its configuration unless one is already stored, and then uses
    /// whichever is stored. Descendants read the stored value and fall back to the
    /// configuration they carry when it is missing or unreadable.
    async fn resolve_config(&self, store: &JobStateStore, task: &CrawlTask) -> Result<JobConfig> {
        if task.depth == 0 {
            let resolved = task.job_config.resolved_for_seed(&task.url);
            if store.set_config_if_absent(&resolved).await? {
                tracing::debug!(
                    "Stored configuration for job {} (base domain {})",
                    task.job_id,
                    resolved.base_domain
                );
                return Ok(resolved);
            }

            return Ok(match store.get_config().await? {
                Some(stored) => stored,
                None => resolved,
            });
        }

        let stored = match store.get_config().await {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!("Unreadable configuration for job {}: {}", task.job_id, e);
                None
            }
        };

        match stored {
            Some(config) => Ok(config),
            None => {
                tracing::warn!(
                    "No stored configuration for job {}, using the task's own",
                    task.job_id
                );
                let mut config = task.job_config.clone();
                if config.base_domain.is_empty() {
                    config.base_domain = base_domain(&task.url).unwrap_or_default();
                }
                Ok(config)
            }
        }
    }

    /// Decides which page links become child tasks
    async fn plan_children(
        &self,
        store: &JobStateStore,
        task: &CrawlTask,
        config: &JobConfig,
        filter: &PathFilter,
        pages: &[Link],
    ) -> Vec<CrawlTask> {
        let mut tasks = Vec::new();

        if task.depth + 1 > config.max_depth {
            tracing::debug!(
                "Depth limit reached at {}, not following {} links",
                task.url,
                pages.len()
            );
            return tasks;
        }

        let mut seen = HashSet::new();
        for link in pages {
            if !filter.allows(&link.url) {
                tracing::debug!("Path filter rejects {}", link.url);
                continue;
            }

            let normalized = normalize_url(&link.url, config.ignore_query_parameters);
            if !seen.insert(normalized.clone()) {
                continue;
            }

            // Best-effort pre-filter; the child re-checks authoritatively
            match store.is_visited(&normalized).await {
                Ok(true) => {
                    tracing::debug!("Not queueing visited {}", link.url);
                    continue;
                }
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!("Visited check failed for {}, queueing anyway: {}", link.url, e)
                }
            }

            tasks.push(task.child(link.url.clone(), config.clone()));
        }

        tasks
    }

    /// Downloads and stores file links; failures are logged and skipped
    async fn collect_attachments(&self, task: &CrawlTask, files: &[Link]) -> Vec<AttachmentRef> {
        let mut attachments = Vec::new();
        if files.is_empty() {
            return attachments;
        }

        let Some(store) = &self.attachment_store else {
            tracing::warn!(
                "Attachments enabled but no attachment store configured, dropping {} file links from {}",
                files.len(),
                task.url
            );
            return attachments;
        };

        let mut seen = HashSet::new();
        for link in files {
            if !seen.insert(link.url.as_str()) {
                continue;
            }

            let download = match self.renderer.download(&link.url).await {
                Ok(download) => download,
                Err(e) => {
                    tracing::warn!("Failed to download {}: {}", link.url, e);
                    continue;
                }
            };

            let metadata = AttachmentMetadata {
                job_id: task.job_id.clone(),
                source_url: link.url.clone(),
                content_type: download.content_type.clone(),
            };
            match store.upload(&download.bytes, &metadata).await {
                Ok(reference) => attachments.push(reference),
                Err(e) => tracing::warn!("Failed to store attachment {}: {}", link.url, e),
            }
        }

        attachments
    }
}
