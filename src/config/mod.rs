//! Configuration module for Fanout-Crawler
//!
//! This module handles loading, parsing, and validating TOML configuration files, and
//! turning them into the job configuration, executor limits and extraction strategies
//! the crawler runs with.
//!
//! # Example
//!
//! ```no_run
//! use fanout_crawler::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("crawl.toml")).unwrap();
//! println!("Crawler will use max depth: {}", config.crawler.max_depth);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, ExecutorConfig, ExtractionConfig, OutputConfig, StoreConfig,
    StrategyEntry, StrategyKind, UserAgentConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
