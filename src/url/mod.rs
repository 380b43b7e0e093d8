//! URL handling module for Fanout-Crawler
//!
//! This module provides URL normalization for dedup keys, domain classification
//! (internal vs. external, page vs. file) and path filtering for discovered links.
//! Everything here is pure: nothing fetches a URL.

mod domain;
mod matcher;
mod normalize;

// Re-export main functions
pub use domain::{base_domain, is_file_url, is_internal};
pub use matcher::PathFilter;
pub use normalize::normalize_url;
