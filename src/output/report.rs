//! Job-level aggregation of crawl results
//!
//! Tasks of a job report back independently and may report the same URL twice (two tasks
//! can pass the visited check concurrently). The report keeps the first processed result
//! per normalized URL and counts the rest as dropped duplicates.

use crate::crawler::{CrawlResult, JobId};
use crate::state::SkipReason;
use crate::url::normalize_url;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to format output: {0}")]
    Format(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for OutputError {
    fn from(e: serde_json::Error) -> Self {
        Self::Format(e.to_string())
    }
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// A task that failed with a task-fatal error
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskFailure {
    pub url: String,
    pub depth: u32,
    pub message: String,
}

/// Aggregated outcome of one job
#[derive(Debug, Clone, Serialize)]
pub struct JobReport {
    pub job_id: JobId,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub config_hash: Option<String>,

    pub pages_processed: u64,
    pub skipped_duplicate: u64,
    pub skipped_over_budget: u64,
    pub skipped_aborted: u64,
    pub duplicates_dropped: u64,

    pub links_found: u64,
    pub links_queued: u64,
    pub attachments: u64,

    /// Processed pages per depth
    pub depth_breakdown: BTreeMap<u32, u64>,

    pub failures: Vec<TaskFailure>,

    #[serde(skip)]
    results: Vec<CrawlResult>,

    #[serde(skip)]
    seen: HashSet<String>,

    #[serde(skip)]
    ignore_query: bool,
}

impl JobReport {
    /// Starts an empty report
    ///
    /// `ignore_query` must match the job's dedup setting so duplicates are detected with
    /// the same keys the visited markers use.
    pub fn new(job_id: JobId, ignore_query: bool) -> Self {
        Self {
            job_id,
            started_at: Utc::now(),
            finished_at: None,
            config_hash: None,
            pages_processed: 0,
            skipped_duplicate: 0,
            skipped_over_budget: 0,
            skipped_aborted: 0,
            duplicates_dropped: 0,
            links_found: 0,
            links_queued: 0,
            attachments: 0,
            depth_breakdown: BTreeMap::new(),
            failures: Vec::new(),
            results: Vec::new(),
            seen: HashSet::new(),
            ignore_query,
        }
    }

    pub fn with_config_hash(mut self, hash: impl Into<String>) -> Self {
        self.config_hash = Some(hash.into());
        self
    }

    /// Records a task that returned a result
    pub fn record_result(&mut self, result: CrawlResult) {
        if result.skipped {
            match result.skip_reason {
                Some(SkipReason::AlreadyVisited) => self.skipped_duplicate += 1,
                Some(SkipReason::MaxPagesReached) => self.skipped_over_budget += 1,
                Some(SkipReason::JobAborted) => self.skipped_aborted += 1,
                None => tracing::warn!("Skipped result without reason for {}", result.url),
            }
            return;
        }

        let key = normalize_url(&result.url, self.ignore_query);
        if !self.seen.insert(key) {
            tracing::debug!("Dropping duplicate result for {}", result.url);
            self.duplicates_dropped += 1;
            return;
        }

        self.pages_processed += 1;
        self.links_found += result.links_found as u64;
        self.links_queued += result.links_queued as u64;
        self.attachments += result.attachments.len() as u64;
        *self.depth_breakdown.entry(result.depth).or_insert(0) += 1;
        self.results.push(result);
    }

    /// Records a task that failed
    pub fn record_failure(&mut self, url: &str, depth: u32, message: impl Into<String>) {
        self.failures.push(TaskFailure {
            url: url.to_string(),
            depth,
            message: message.into(),
        });
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// De-duplicated processed results, in completion order
    pub fn results(&self) -> &[CrawlResult] {
        &self.results
    }

    /// Total number of tasks that reported back
    pub fn tasks_total(&self) -> u64 {
        self.pages_processed
            + self.duplicates_dropped
            + self.skipped_duplicate
            + self.skipped_over_budget
            + self.skipped_aborted
            + self.failures.len() as u64
    }

    /// True when no task failed
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn duration_seconds(&self) -> Option<i64> {
        self.finished_at
            .map(|finished| (finished - self.started_at).num_seconds())
    }

    /// Percentage of attempted pages that were processed
    pub fn success_rate(&self) -> f64 {
        let attempted = self.pages_processed + self.failures.len() as u64;
        if attempted == 0 {
            0.0
        } else {
            (self.pages_processed as f64 / attempted as f64) * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn processed(url: &str, depth: u32) -> CrawlResult {
        CrawlResult {
            url: url.to_string(),
            depth,
            content: None,
            links_found: 3,
            links_queued: 2,
            attachments: Vec::new(),
            skipped: false,
            skip_reason: None,
        }
    }

    #[test]
    fn test_counts_by_outcome() {
        let mut report = JobReport::new(JobId::new("job"), false);
        report.record_result(processed("https://example.com", 0));
        report.record_result(CrawlResult::skipped(
            "https://example.com/a",
            1,
            SkipReason::AlreadyVisited,
        ));
        report.record_result(CrawlResult::skipped(
            "https://example.com/b",
            1,
            SkipReason::MaxPagesReached,
        ));
        report.record_result(CrawlResult::skipped(
            "https://example.com/c",
            1,
            SkipReason::JobAborted,
        ));
        report.record_failure("https://example.com/d", 1, "HTTP 500");

        assert_eq!(report.pages_processed, 1);
        assert_eq!(report.skipped_duplicate, 1);
        assert_eq!(report.skipped_over_budget, 1);
        assert_eq!(report.skipped_aborted, 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.tasks_total(), 5);
        assert!(!report.is_clean());
        assert_eq!(report.links_found, 3);
        assert_eq!(report.links_queued, 2);
    }

    #[test]
    fn test_duplicate_results_are_dropped() {
        let mut report = JobReport::new(JobId::new("job"), false);
        report.record_result(processed("https://example.com/a", 1));
        report.record_result(processed("https://Example.com/a/", 1));

        assert_eq!(report.pages_processed, 1);
        assert_eq!(report.duplicates_dropped, 1);
        assert_eq!(report.results().len(), 1);
        assert_eq!(report.links_found, 3);
    }

    #[test]
    fn test_query_duplicates_follow_job_setting() {
        let mut strict = JobReport::new(JobId::new("job"), false);
        strict.record_result(processed("https://example.com/a?x=1", 1));
        strict.record_result(processed("https://example.com/a?x=2", 1));
        assert_eq!(strict.pages_processed, 2);

        let mut loose = JobReport::new(JobId::new("job"), true);
        loose.record_result(processed("https://example.com/a?x=1", 1));
        loose.record_result(processed("https://example.com/a?x=2", 1));
        assert_eq!(loose.pages_processed, 1);
    }

    #[test]
    fn test_depth_breakdown() {
        let mut report = JobReport::new(JobId::new("job"), false);
        report.record_result(processed("https://example.com", 0));
        report.record_result(processed("https://example.com/a", 1));
        report.record_result(processed("https://example.com/b", 1));

        assert_eq!(report.depth_breakdown.get(&0), Some(&1));
        assert_eq!(report.depth_breakdown.get(&1), Some(&2));
    }

    #[test]
    fn test_success_rate() {
        let mut report = JobReport::new(JobId::new("job"), false);
        assert_eq!(report.success_rate(), 0.0);

        report.record_result(processed("https://example.com", 0));
        report.record_result(processed("https://example.com/a", 1));
        report.record_result(processed("https://example.com/b", 1));
        report.record_failure("https://example.com/c", 1, "boom");

        assert!((report.success_rate() - 75.0).abs() < f64::EPSILON);
        assert!(!report.is_clean());
    }

    #[test]
    fn test_finish_sets_duration() {
        let mut report = JobReport::new(JobId::new("job"), false);
        assert!(report.duration_seconds().is_none());
        report.finish();
        assert!(report.duration_seconds().unwrap() >= 0);
    }
}
