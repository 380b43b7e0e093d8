//! Rendering collaborator and its HTTP implementation
//!
//! This module handles everything the engine needs from "a browser":
//! - Building HTTP clients with proper user agent strings
//! - Navigating to a page and returning its final URL and HTML
//! - Extracting navigational links from a rendered page
//! - Downloading attachment bytes
//! - Error classification into task-fatal `FanoutError`s

use crate::config::UserAgentConfig;
use crate::crawler::parser;
use crate::{FanoutError, Result};
use async_trait::async_trait;
use reqwest::{redirect::Policy, Client};
use std::time::Duration;
use url::Url;

/// A page as seen by the renderer after navigation
#[derive(Debug, Clone)]
pub struct RenderedPage {
    /// The URL that was requested
    pub requested_url: String,
    /// Final URL after redirects; links resolve against this
    pub final_url: String,
    /// HTTP status code
    pub status_code: u16,
    /// Content-Type header value
    pub content_type: String,
    /// Page body content
    pub html: String,
    /// Page title (if any)
    pub title: Option<String>,
}

/// Raw bytes of a downloaded file
#[derive(Debug, Clone)]
pub struct Download {
    pub url: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// The rendering collaborator
///
/// Any automation engine can stand behind this trait. The engine relies on `navigate`
/// failing for pages that cannot be rendered, and on `extract_links` returning absolute,
/// navigational, de-duplicated URLs.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Navigates to `url` and returns the rendered page
    async fn navigate(&self, url: &str) -> Result<RenderedPage>;

    /// Extracts outbound links, resolved against the page's final URL
    fn extract_links(&self, page: &RenderedPage) -> Vec<String> {
        match Url::parse(&page.final_url) {
            Ok(base) => parser::extract_links(&page.html, &base),
            Err(e) => {
                tracing::warn!("Cannot resolve links of {}: {}", page.final_url, e);
                Vec::new()
            }
        }
    }

    /// Downloads a file link
    async fn download(&self, url: &str) -> Result<Download>;
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use fanout_crawler::config::UserAgentConfig;
/// use fanout_crawler::crawler::build_http_client;
///
/// let config = UserAgentConfig {
///     crawler_name: "FanoutCrawler".to_string(),
///     crawler_version: "1.0".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config).unwrap();
/// ```
pub fn build_http_client(config: &UserAgentConfig) -> std::result::Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent_string(config))
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Formats the user agent: `CrawlerName/Version (+ContactURL; ContactEmail)`
pub fn user_agent_string(config: &UserAgentConfig) -> String {
    format!(
        "{}/{} (+{}; {})",
        config.crawler_name, config.crawler_version, config.contact_url, config.contact_email
    )
}

/// Renderer that fetches pages over plain HTTP without executing scripts
#[derive(Debug, Clone)]
pub struct HttpRenderer {
    client: Client,
}

impl HttpRenderer {
    pub fn new(config: &UserAgentConfig) -> Result<Self> {
        Ok(Self {
            client: build_http_client(config)?,
        })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| classify_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FanoutError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response)
    }
}

fn classify_error(url: &str, error: reqwest::Error) -> FanoutError {
    if error.is_timeout() {
        FanoutError::Timeout {
            url: url.to_string(),
        }
    } else {
        FanoutError::Http {
            url: url.to_string(),
            source: error,
        }
    }
}

fn content_type_of(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string())
}

fn is_html(content_type: &str) -> bool {
    let content_type = content_type.to_ascii_lowercase();
    content_type.contains("text/html") || content_type.contains("application/xhtml+xml")
}

#[async_trait]
impl Renderer for HttpRenderer {
    async fn navigate(&self, url: &str) -> Result<RenderedPage> {
        let response = self.get(url).await?;
        let status_code = response.status().as_u16();
        let final_url = response.url().to_string();

        // A missing Content-Type is treated as HTML
        let content_type = content_type_of(&response).unwrap_or_default();
        if !content_type.is_empty() && !is_html(&content_type) {
            return Err(FanoutError::ContentMismatch {
                url: url.to_string(),
                content_type,
            });
        }

        let html = response
            .text()
            .await
            .map_err(|e| classify_error(url, e))?;
        let title = parser::extract_title(&html);

        Ok(RenderedPage {
            requested_url: url.to_string(),
            final_url,
            status_code,
            content_type,
            html,
            title,
        })
    }

    async fn download(&self, url: &str) -> Result<Download> {
        let response = self.get(url).await?;
        let content_type = content_type_of(&response);
        let bytes = response
            .bytes()
            .await
            .map_err(|e| classify_error(url, e))?;

        Ok(Download {
            url: url.to_string(),
            content_type,
            bytes: bytes.to_vec(),
        })
    }
}
