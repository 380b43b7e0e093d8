//! Crawl task, job configuration and per-task result types

use crate::crawler::attachments::AttachmentRef;
use crate::state::SkipReason;
use crate::url::PathFilter;
use crate::UrlError;
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;
use uuid::Uuid;

/// Environment variable holding the execution-context run id
pub const JOB_RUN_ID_ENV: &str = "FANOUT_JOB_RUN_ID";

/// Opaque identifier of one logical crawl run
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a standalone id of the form `local-{uuid}`
    pub fn generate() -> Self {
        Self(format!("local-{}", Uuid::new_v4()))
    }

    /// Uses the execution-context run id when set, else generates one
    pub fn from_env() -> Self {
        match std::env::var(JOB_RUN_ID_ENV) {
            Ok(id) if !id.trim().is_empty() => Self(id.trim().to_string()),
            _ => Self::generate(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn default_max_depth() -> u32 {
    2
}

fn default_max_pages() -> u64 {
    50
}

/// Job-wide settings, resolved by the seed task and shared by all its descendants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobConfig {
    /// Lowercased host of the seed URL
    #[serde(default)]
    pub base_domain: String,

    /// Path of the seed URL, used when `child_paths_only` is set
    #[serde(default)]
    pub base_path: Option<String>,

    #[serde(default = "default_max_depth")]
    pub max_depth: u32,

    #[serde(default = "default_max_pages")]
    pub max_pages: u64,

    #[serde(default)]
    pub include_external: bool,

    #[serde(default)]
    pub include_attachments: bool,

    #[serde(default)]
    pub allow_subdomains: bool,

    #[serde(default)]
    pub ignore_query_parameters: bool,

    #[serde(default)]
    pub child_paths_only: bool,

    #[serde(default)]
    pub include_paths: Vec<String>,

    #[serde(default)]
    pub exclude_paths: Vec<String>,

    /// JSON schema for structured extraction; markdown extraction when absent
    #[serde(default)]
    pub extraction_schema: Option<serde_json::Value>,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            base_domain: String::new(),
            base_path: None,
            max_depth: default_max_depth(),
            max_pages: default_max_pages(),
            include_external: false,
            include_attachments: false,
            allow_subdomains: false,
            ignore_query_parameters: false,
            child_paths_only: false,
            include_paths: Vec::new(),
            exclude_paths: Vec::new(),
            extraction_schema: None,
        }
    }
}

impl JobConfig {
    /// Builds the path filter applied to navigable links
    pub fn path_filter(&self) -> Result<PathFilter, regex::Error> {
        let base_path = if self.child_paths_only {
            self.base_path.as_deref()
        } else {
            None
        };
        PathFilter::new(&self.include_paths, &self.exclude_paths, base_path)
    }

    /// Fills in the seed-derived fields (`base_domain`, `base_path`) from the seed URL
    pub fn resolved_for_seed(&self, seed_url: &str) -> Self {
        let mut resolved = self.clone();
        if let Some(domain) = crate::url::base_domain(seed_url) {
            resolved.base_domain = domain;
        }
        if let Ok(parsed) = Url::parse(seed_url) {
            resolved.base_path = Some(parsed.path().to_string());
        }
        resolved
    }
}

/// The unit of work handed between invocations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlTask {
    pub url: String,
    pub depth: u32,
    pub job_id: JobId,
    pub job_config: JobConfig,
}

impl CrawlTask {
    /// Creates the depth-0 task of a job
    ///
    /// # Arguments
    ///
    /// * `url` - The seed URL, which must be an absolute http(s) URL with a host
    /// * `job_id` - The job this task starts
    /// * `job_config` - The requested configuration; seed-derived fields are filled in
    ///   when the task runs
    pub fn seed(url: &str, job_id: JobId, job_config: JobConfig) -> Result<Self, UrlError> {
        let parsed = Url::parse(url).map_err(|e| UrlError::Parse(e.to_string()))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(UrlError::InvalidScheme(parsed.scheme().to_string()));
        }
        if parsed.host_str().is_none() {
            return Err(UrlError::MissingDomain);
        }

        Ok(Self {
            url: url.to_string(),
            depth: 0,
            job_id,
            job_config,
        })
    }

    /// Creates the task for a link discovered on this task's page
    pub fn child(&self, url: String, job_config: JobConfig) -> Self {
        Self {
            url,
            depth: self.depth + 1,
            job_id: self.job_id.clone(),
            job_config,
        }
    }
}

/// A discovered outbound link, classified against the job's base domain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub url: String,
    pub is_internal: bool,
    pub is_file: bool,
}

/// Extracted content of one page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PageContent {
    Markdown {
        title: Option<String>,
        markdown: String,
        markdown_length: usize,
    },
    Structured {
        title: Option<String>,
        data: serde_json::Value,
    },
}

impl PageContent {
    pub fn markdown(title: Option<String>, markdown: String) -> Self {
        let markdown_length = markdown.chars().count();
        Self::Markdown {
            title,
            markdown,
            markdown_length,
        }
    }

    pub fn title(&self) -> Option<&str> {
        match self {
            Self::Markdown { title, .. } | Self::Structured { title, .. } => title.as_deref(),
        }
    }
}

/// The per-task output returned to the executor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlResult {
    pub url: String,
    pub depth: u32,
    pub content: Option<PageContent>,
    pub links_found: usize,
    pub links_queued: usize,
    pub attachments: Vec<AttachmentRef>,
    pub skipped: bool,
    pub skip_reason: Option<SkipReason>,
}

impl CrawlResult {
    /// A result for a task that ended without processing its URL
    pub fn skipped(url: &str, depth: u32, reason: SkipReason) -> Self {
        Self {
            url: url.to_string(),
            depth,
            content: None,
            links_found: 0,
            links_queued: 0,
            attachments: Vec::new(),
            skipped: true,
            skip_reason: Some(reason),
        }
    }
}
