use regex::Regex;
use url::Url;

/// Path-based filter for navigable links
///
/// The filter combines three rules, evaluated against the URL path:
/// 1. Exclude patterns (highest priority): any match rejects the link
/// 2. Child-path restriction: when a base path is set, only that path and its
///    descendants are accepted (`/docs` accepts `/docs` and `/docs/intro`, not `/docsify`)
/// 3. Include patterns: when non-empty, at least one must match
///
/// # Examples
///
/// ```
/// use fanout_crawler::url::PathFilter;
///
/// let filter = PathFilter::new(&["^/blog".to_string()], &["/drafts/".to_string()], None).unwrap();
/// assert!(filter.allows("https://example.com/blog/post"));
/// assert!(!filter.allows("https://example.com/blog/drafts/wip"));
/// assert!(!filter.allows("https://example.com/about"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct PathFilter {
    include: Vec<Regex>,
    exclude: Vec<Regex>,
    base_path: Option<String>,
}

impl PathFilter {
    /// Compiles a path filter
    ///
    /// # Arguments
    ///
    /// * `include` - Regex patterns, at least one of which must match (if any are given)
    /// * `exclude` - Regex patterns, none of which may match
    /// * `base_path` - Optional path subtree that links must stay within
    ///
    /// # Returns
    ///
    /// * `Ok(PathFilter)` - All patterns compiled
    /// * `Err(regex::Error)` - A pattern is not a valid regex
    pub fn new(
        include: &[String],
        exclude: &[String],
        base_path: Option<&str>,
    ) -> Result<Self, regex::Error> {
        let include = include
            .iter()
            .map(|p| Regex::new(p))
            .collect::<Result<Vec<_>, _>>()?;
        let exclude = exclude
            .iter()
            .map(|p| Regex::new(p))
            .collect::<Result<Vec<_>, _>>()?;

        let base_path = base_path
            .map(|p| p.trim_end_matches('/').to_string())
            .filter(|p| !p.is_empty());

        Ok(Self {
            include,
            exclude,
            base_path,
        })
    }

    /// Returns true if the filter accepts every URL
    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty() && self.base_path.is_none()
    }

    /// Checks whether a URL passes the filter
    ///
    /// Unparseable URLs are rejected.
    pub fn allows(&self, url: &str) -> bool {
        let Ok(parsed) = Url::parse(url) else {
            return false;
        };
        let path = parsed.path();

        if self.exclude.iter().any(|re| re.is_match(path)) {
            return false;
        }

        if let Some(base) = &self.base_path {
            let within = path == base || path.starts_with(&format!("{}/", base));
            if !within {
                return false;
            }
        }

        self.include.is_empty() || self.include.iter().any(|re| re.is_match(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patterns(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_empty_filter_allows_everything() {
        let filter = PathFilter::default();
        assert!(filter.is_empty());
        assert!(filter.allows("https://example.com/anything"));
        assert!(filter.allows("https://example.com/"));
    }

    #[test]
    fn test_include_patterns() {
        let filter = PathFilter::new(&patterns(&["^/products/", "^/blog"]), &[], None).unwrap();
        assert!(filter.allows("https://example.com/products/1"));
        assert!(filter.allows("https://example.com/blog"));
        assert!(!filter.allows("https://example.com/about"));
    }

    #[test]
    fn test_exclude_wins_over_include() {
        let filter =
            PathFilter::new(&patterns(&["^/blog"]), &patterns(&["/private"]), None).unwrap();
        assert!(filter.allows("https://example.com/blog/public"));
        assert!(!filter.allows("https://example.com/blog/private/post"));
    }

    #[test]
    fn test_child_paths_only() {
        let filter = PathFilter::new(&[], &[], Some("/docs/")).unwrap();
        assert!(filter.allows("https://example.com/docs"));
        assert!(filter.allows("https://example.com/docs/getting-started"));
        assert!(!filter.allows("https://example.com/docsify"));
        assert!(!filter.allows("https://example.com/"));
    }

    #[test]
    fn test_root_base_path_is_no_restriction() {
        let filter = PathFilter::new(&[], &[], Some("/")).unwrap();
        assert!(filter.is_empty());
        assert!(filter.allows("https://example.com/anywhere"));
    }

    #[test]
    fn test_query_not_matched() {
        let filter = PathFilter::new(&[], &patterns(&["secret"]), None).unwrap();
        assert!(filter.allows("https://example.com/page?token=secret"));
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(PathFilter::new(&patterns(&["(unclosed"]), &[], None).is_err());
    }

    #[test]
    fn test_unparseable_rejected() {
        let filter = PathFilter::default();
        assert!(!filter.allows("not a url"));
    }
}
