use url::Url;

/// Path extensions that mark a link as a downloadable file rather than an HTML page
const FILE_EXTENSIONS: &[&str] = &[
    ".pdf", ".doc", ".docx", ".xls", ".xlsx", ".ppt", ".pptx", ".csv", ".zip", ".tar", ".gz",
    ".rar", ".7z", ".png", ".jpg", ".jpeg", ".gif", ".svg", ".webp", ".mp3", ".mp4",
];

/// Extracts the lowercase host of a URL
///
/// # Returns
///
/// * `Some(String)` - The lowercase domain/host
/// * `None` - If the URL does not parse or has no host
///
/// # Examples
///
/// ```
/// use fanout_crawler::url::base_domain;
///
/// assert_eq!(base_domain("https://Blog.Example.com/post"), Some("blog.example.com".to_string()));
/// assert_eq!(base_domain("mailto:someone@example.com"), None);
/// ```
pub fn base_domain(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_lowercase()))
}

/// Decides whether a URL belongs to the crawl's own domain
///
/// An exact host match is always internal. With `allow_subdomains`, any host ending in
/// `"." + base_domain` is internal too (`blog.example.com` for `example.com`), but
/// lookalikes such as `myexample.com` never are.
///
/// Returns `false` for URLs without a host.
pub fn is_internal(url: &str, base_domain: &str, allow_subdomains: bool) -> bool {
    let Some(host) = self::base_domain(url) else {
        return false;
    };
    let base = base_domain.to_lowercase();

    if host == base {
        return true;
    }

    allow_subdomains && !base.is_empty() && host.ends_with(&format!(".{}", base))
}

/// Checks whether a URL points to a downloadable file
///
/// Only the path is inspected, so `/report.pdf?download=1` is a file while
/// `/viewer?file=report.pdf` is not. Unparseable URLs are never files.
pub fn is_file_url(url: &str) -> bool {
    match Url::parse(url) {
        Ok(parsed) => {
            let path = parsed.path().to_lowercase();
            FILE_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
        }
        Err(_) => false,
    }
}
