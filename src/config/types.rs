use crate::crawler::{
    ContentExtractor, ExecutorOptions, JobConfig, JobPostingExtractor, SelectorExtractor,
    StrategyTable,
};
use crate::ConfigError;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Main configuration structure for Fanout-Crawler
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub executor: ExecutorConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub store: StoreConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default, rename = "strategy")]
    pub strategies: Vec<StrategyEntry>,
}

/// Job settings handed to the seed task
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Where the job starts; `--url` overrides it
    #[serde(rename = "seed-url", default)]
    pub seed_url: Option<String>,

    /// Maximum link depth from the seed
    #[serde(rename = "max-depth", default = "default_max_depth")]
    pub max_depth: u32,

    /// Page budget for the whole job
    #[serde(rename = "max-pages", default = "default_max_pages")]
    pub max_pages: u64,

    #[serde(rename = "include-external", default)]
    pub include_external: bool,

    #[serde(rename = "include-attachments", default)]
    pub include_attachments: bool,

    #[serde(rename = "allow-subdomains", default)]
    pub allow_subdomains: bool,

    #[serde(rename = "ignore-query-parameters", default)]
    pub ignore_query_parameters: bool,

    #[serde(rename = "child-paths-only", default)]
    pub child_paths_only: bool,

    /// Path regexes a link must match (any); empty means all
    #[serde(rename = "include-paths", default)]
    pub include_paths: Vec<String>,

    /// Path regexes that reject a link
    #[serde(rename = "exclude-paths", default)]
    pub exclude_paths: Vec<String>,

    /// Schema for structured extraction, carried to tasks as JSON
    #[serde(rename = "extraction-schema", default)]
    pub extraction_schema: Option<serde_json::Value>,
}

fn default_max_depth() -> u32 {
    2
}

fn default_max_pages() -> u64 {
    50
}

/// Local executor limits
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutorConfig {
    /// Maximum number of tasks running at once
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,

    /// Upper bound for a single task
    #[serde(rename = "task-timeout-secs", default = "default_task_timeout_secs")]
    pub task_timeout_secs: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            task_timeout_secs: default_task_timeout_secs(),
        }
    }
}

fn default_concurrency() -> u32 {
    5
}

fn default_task_timeout_secs() -> u64 {
    60
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

/// Shared key-value store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Path to the SQLite database holding job state
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// JSON-lines file receiving one processed result per line
    #[serde(rename = "results-path")]
    pub results_path: String,

    /// Path to the markdown summary file
    #[serde(rename = "summary-path")]
    pub summary_path: String,

    /// Directory for downloaded attachments; attachments are dropped when unset
    #[serde(rename = "attachments-dir", default)]
    pub attachments_dir: Option<String>,
}

/// External extraction services
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExtractionConfig {
    /// Endpoint of the schema-extraction service
    #[serde(rename = "schema-endpoint", default)]
    pub schema_endpoint: Option<String>,
}

/// Kind of a URL-routed extraction strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    /// Named CSS selectors
    Selector,
    /// Built-in hosted job-board posting extractor
    JobPosting,
}

/// One `[[strategy]]` entry; entries are tried in file order
#[derive(Debug, Clone, Deserialize)]
pub struct StrategyEntry {
    /// Regex matched against the page URL
    pub pattern: String,

    pub kind: StrategyKind,

    /// Strategy name shown in logs
    #[serde(default)]
    pub name: Option<String>,

    /// CSS selector for the page title
    #[serde(default)]
    pub title: Option<String>,

    /// Field name to CSS selector
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
}

impl Config {
    /// Builds the job configuration for a seed task
    ///
    /// Seed-derived fields (`base_domain`, `base_path`) stay empty here; the seed task
    /// resolves them when it runs.
    pub fn job_config(&self) -> JobConfig {
        let crawler = &self.crawler;
        JobConfig {
            max_depth: crawler.max_depth,
            max_pages: crawler.max_pages,
            include_external: crawler.include_external,
            include_attachments: crawler.include_attachments,
            allow_subdomains: crawler.allow_subdomains,
            ignore_query_parameters: crawler.ignore_query_parameters,
            child_paths_only: crawler.child_paths_only,
            include_paths: crawler.include_paths.clone(),
            exclude_paths: crawler.exclude_paths.clone(),
            extraction_schema: crawler.extraction_schema.clone(),
            ..JobConfig::default()
        }
    }

    pub fn executor_options(&self) -> ExecutorOptions {
        ExecutorOptions {
            concurrency: self.executor.concurrency as usize,
            task_timeout: Duration::from_secs(self.executor.task_timeout_secs),
        }
    }

    /// Builds the strategy table from the `[[strategy]]` entries
    ///
    /// # Arguments
    ///
    /// * `fallback` - Extractor for URLs no entry matches
    pub fn strategy_table(
        &self,
        fallback: Arc<dyn ContentExtractor>,
    ) -> Result<StrategyTable, ConfigError> {
        let mut table = StrategyTable::new(fallback);

        for entry in &self.strategies {
            let extractor: Arc<dyn ContentExtractor> = match entry.kind {
                StrategyKind::JobPosting => Arc::new(
                    JobPostingExtractor::new()
                        .map_err(|e| ConfigError::InvalidPattern(e.to_string()))?,
                ),
                StrategyKind::Selector => {
                    let name = entry.name.clone().unwrap_or_else(|| "selector".to_string());
                    let fields = entry
                        .fields
                        .iter()
                        .map(|(field, selector)| (field.clone(), selector.clone()))
                        .collect();
                    Arc::new(
                        SelectorExtractor::new(name, entry.title.clone(), fields)
                            .map_err(ConfigError::InvalidPattern)?,
                    )
                }
            };

            table = table
                .route(&entry.pattern, extractor)
                .map_err(|e| ConfigError::InvalidPattern(e.to_string()))?;
        }

        Ok(table)
    }
}
