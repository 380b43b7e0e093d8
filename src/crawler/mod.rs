//! Crawler module for stateless crawl steps
//!
//! This module contains the core crawling logic, including:
//! - The per-URL step engine and the task/result data model
//! - Rendering (HTTP fetching) and HTML link extraction
//! - Content extraction strategies and attachment storage
//! - The scheduler bridge and an in-process executor

mod attachments;
mod engine;
mod executor;
mod extract;
mod fetcher;
mod links;
mod parser;
mod scheduler;
mod task;

pub use attachments::{
    attachment_key, AttachmentMetadata, AttachmentRef, AttachmentStore, FsAttachmentStore,
};
pub use engine::{CrawlEngine, StepOutcome};
pub use executor::{ExecutorOptions, LocalExecutor};
pub use extract::{
    html_to_markdown, validate_selector, ContentExtractor, GenericExtractor,
    HttpSchemaExtractor, JobPostingExtractor, SchemaExtractor, SelectorExtractor,
    StrategyTable, JOB_POSTING_URL_PATTERN,
};
pub use fetcher::{
    build_http_client, user_agent_string, Download, HttpRenderer, RenderedPage, Renderer,
};
pub use links::{classify_link, partition_links, PartitionedLinks};
pub use parser::{extract_links, extract_title, parse_html, ParsedPage};
pub use scheduler::{ChannelScheduler, CollectingScheduler, SchedulerBridge};
pub use task::{
    CrawlResult, CrawlTask, JobConfig, JobId, Link, PageContent, JOB_RUN_ID_ENV,
};
