//! Classification of extracted links against a job's configuration

use crate::crawler::task::{JobConfig, Link};
use crate::url::{is_file_url, is_internal};
use url::Url;

/// Classifies one absolute URL
///
/// Returns `None` when the URL cannot be parsed; callers drop such links.
pub fn classify_link(url: &str, config: &JobConfig) -> Option<Link> {
    let parsed = Url::parse(url).ok()?;
    parsed.host_str()?;

    Some(Link {
        url: url.to_string(),
        is_internal: is_internal(url, &config.base_domain, config.allow_subdomains),
        is_file: is_file_url(url),
    })
}

/// Links of one page, split by what the engine does with them
#[derive(Debug, Default)]
pub struct PartitionedLinks {
    /// HTML pages eligible for scheduling
    pub pages: Vec<Link>,
    /// File links eligible for download
    pub files: Vec<Link>,
    /// External links dropped because the job stays on its domain
    pub external_dropped: usize,
    /// Links that could not be classified
    pub unresolved: usize,
}

/// Classifies every link and partitions the result
///
/// External links are kept only when `include_external` is set; this applies to file links
/// too.
pub fn partition_links(urls: &[String], config: &JobConfig) -> PartitionedLinks {
    let mut partitioned = PartitionedLinks::default();

    for url in urls {
        let Some(link) = classify_link(url, config) else {
            tracing::debug!("Dropping unclassifiable link {}", url);
            partitioned.unresolved += 1;
            continue;
        };

        if !link.is_internal && !config.include_external {
            partitioned.external_dropped += 1;
            continue;
        }

        if link.is_file {
            partitioned.files.push(link);
        } else {
            partitioned.pages.push(link);
        }
    }

    partitioned
}
