use url::Url;

/// Normalizes a URL into the canonical form used for dedup keys
///
/// # Normalization Steps
///
/// 1. Parse the URL; if it does not parse, return the input unchanged
/// 2. Lowercase the scheme and host
/// 3. Remove the fragment (everything after #)
/// 4. Empty path becomes `/`
/// 5. Remove every trailing slash from the path (except for root `/`), so `/a//` and
///    `/a/` both become `/a`
/// 6. Optionally drop the query string; an empty query (`?`) is always dropped
///
/// The function is total and idempotent: feeding its output back in yields the same string.
///
/// # Arguments
///
/// * `url_str` - The URL string to normalize
/// * `ignore_query` - Whether the query string takes part in the canonical form
///
/// # Examples
///
/// ```
/// use fanout_crawler::url::normalize_url;
///
/// assert_eq!(normalize_url("https://X.com/a/", false), "https://x.com/a");
/// assert_eq!(normalize_url("https://x.com/a?b=1#top", true), "https://x.com/a");
/// assert_eq!(normalize_url("not a url", false), "not a url");
/// ```
pub fn normalize_url(url_str: &str, ignore_query: bool) -> String {
    // Step 1: Parse the URL (scheme and special-scheme hosts are lowercased here)
    let mut url = match Url::parse(url_str) {
        Ok(url) => url,
        Err(_) => return url_str.to_string(),
    };

    // Step 2: Opaque hosts of non-special schemes keep their case after parsing
    if let Some(host) = url.host_str() {
        let lowered = host.to_lowercase();
        if lowered != host {
            if let Err(e) = url.set_host(Some(&lowered)) {
                tracing::debug!("Keeping host case for {}: {}", url_str, e);
            }
        }
    }

    // Step 3: Remove fragment
    url.set_fragment(None);

    // Steps 4 & 5: Normalize path
    if !url.cannot_be_a_base() {
        let normalized_path = normalize_path(url.path());
        if normalized_path != url.path() {
            url.set_path(&normalized_path);
        }
    }

    // Step 6: Query string
    if ignore_query || url.query() == Some("") {
        url.set_query(None);
    }

    url.to_string()
}

/// Collapses an empty path to `/` and strips trailing slashes from any other path
fn normalize_path(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}
