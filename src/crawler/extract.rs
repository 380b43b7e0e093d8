//! Content extraction strategies
//!
//! A [`StrategyTable`] is an ordered list of `(URL regex, extractor)` routes with a
//! catch-all fallback; the first route whose regex matches the task URL wins. Three
//! strategies ship with the crate:
//! - [`GenericExtractor`]: title + markdown, or structured data through a
//!   [`SchemaExtractor`] when the job carries an extraction schema
//! - [`SelectorExtractor`]: named CSS selectors, configured per route
//! - [`JobPostingExtractor`]: the job-board posting preset

use crate::crawler::fetcher::RenderedPage;
use crate::crawler::task::{JobConfig, PageContent};
use crate::{FanoutError, Result};
use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use serde_json::{json, Map, Value};
use std::sync::Arc;

/// Produces the content of one rendered page
#[async_trait]
pub trait ContentExtractor: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    async fn extract(&self, page: &RenderedPage, config: &JobConfig) -> Result<PageContent>;
}

/// External structured-extraction service
#[async_trait]
pub trait SchemaExtractor: Send + Sync {
    /// Extracts data matching `schema` from the page
    async fn extract(&self, page: &RenderedPage, schema: &Value) -> Result<Value>;
}

/// Converts HTML to markdown, dropping non-content tags
pub fn html_to_markdown(html: &str) -> std::result::Result<String, std::io::Error> {
    let converter = htmd::HtmlToMarkdown::builder()
        .skip_tags(vec!["script", "style", "noscript", "head"])
        .build();
    converter.convert(html).map(|md| md.trim().to_string())
}

/// General-purpose extractor
#[derive(Default, Clone)]
pub struct GenericExtractor {
    schema_extractor: Option<Arc<dyn SchemaExtractor>>,
}

impl GenericExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_schema_extractor(mut self, extractor: Arc<dyn SchemaExtractor>) -> Self {
        self.schema_extractor = Some(extractor);
        self
    }

    fn markdown(&self, page: &RenderedPage) -> Result<PageContent> {
        let markdown = html_to_markdown(&page.html).map_err(|e| FanoutError::Extraction {
            url: page.requested_url.clone(),
            message: e.to_string(),
        })?;
        Ok(PageContent::markdown(page.title.clone(), markdown))
    }
}

#[async_trait]
impl ContentExtractor for GenericExtractor {
    fn name(&self) -> &str {
        "generic"
    }

    async fn extract(&self, page: &RenderedPage, config: &JobConfig) -> Result<PageContent> {
        let Some(schema) = &config.extraction_schema else {
            return self.markdown(page);
        };

        match &self.schema_extractor {
            Some(extractor) => {
                let data = extractor.extract(page, schema).await?;
                let title = data
                    .get("title")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .or_else(|| page.title.clone());
                Ok(PageContent::Structured { title, data })
            }
            None => {
                tracing::warn!(
                    "Extraction schema set but no schema extractor configured, using markdown for {}",
                    page.requested_url
                );
                self.markdown(page)
            }
        }
    }
}

/// Schema extraction over an HTTP JSON endpoint
///
/// Posts `{"url", "html", "schema"}` and expects a JSON object back; a top-level `data`
/// member is unwrapped when present.
#[derive(Debug, Clone)]
pub struct HttpSchemaExtractor {
    client: Client,
    endpoint: String,
}

impl HttpSchemaExtractor {
    pub fn new(client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl SchemaExtractor for HttpSchemaExtractor {
    async fn extract(&self, page: &RenderedPage, schema: &Value) -> Result<Value> {
        let failed = |message: String| FanoutError::Extraction {
            url: page.requested_url.clone(),
            message,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&json!({
                "url": page.final_url,
                "html": page.html,
                "schema": schema,
            }))
            .send()
            .await
            .map_err(|e| failed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(failed(format!("schema service returned HTTP {}", status)));
        }

        let body: Value = response.json().await.map_err(|e| failed(e.to_string()))?;
        match body {
            Value::Object(mut map) if map.contains_key("data") => {
                Ok(map.remove("data").unwrap_or(Value::Null))
            }
            other => Ok(other),
        }
    }
}

/// Text of the first element matching `selector`, trimmed; `None` if empty or absent
fn first_text(scope: &ElementRef<'_>, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    scope
        .select(&selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Checks that a CSS selector parses
pub fn validate_selector(selector: &str) -> std::result::Result<(), String> {
    Selector::parse(selector)
        .map(|_| ())
        .map_err(|e| format!("invalid selector {:?}: {:?}", selector, e))
}

/// Extracts named fields with CSS selectors
///
/// Each field holds the trimmed text of the first matching element, or `null`.
#[derive(Debug, Clone)]
pub struct SelectorExtractor {
    name: String,
    title: Option<String>,
    fields: Vec<(String, String)>,
}

impl SelectorExtractor {
    /// Creates a selector extractor, validating every selector
    pub fn new(
        name: impl Into<String>,
        title: Option<String>,
        fields: Vec<(String, String)>,
    ) -> std::result::Result<Self, String> {
        if let Some(title) = &title {
            validate_selector(title)?;
        }
        for (_, selector) in &fields {
            validate_selector(selector)?;
        }

        Ok(Self {
            name: name.into(),
            title,
            fields,
        })
    }

    fn extract_sync(&self, page: &RenderedPage) -> PageContent {
        let document = Html::parse_document(&page.html);
        let root = document.root_element();

        let mut data = Map::new();
        for (name, selector) in &self.fields {
            let value = first_text(&root, selector).map(Value::String);
            data.insert(name.clone(), value.unwrap_or(Value::Null));
        }

        let title = self
            .title
            .as_deref()
            .and_then(|selector| first_text(&root, selector))
            .or_else(|| page.title.clone());

        PageContent::Structured {
            title,
            data: Value::Object(data),
        }
    }
}

#[async_trait]
impl ContentExtractor for SelectorExtractor {
    fn name(&self) -> &str {
        &self.name
    }

    async fn extract(&self, page: &RenderedPage, _config: &JobConfig) -> Result<PageContent> {
        Ok(self.extract_sync(page))
    }
}

/// URL shape of a hosted job-board posting: `jobs.lever.co/{company}/{uuid}`
pub const JOB_POSTING_URL_PATTERN: &str =
    r"^https?://jobs\.lever\.co/([^/]+)/([0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12})";

const UNKNOWN_TITLE: &str = "Unknown Title";

/// Structural extractor for hosted job-board postings
#[derive(Debug, Clone)]
pub struct JobPostingExtractor {
    url_pattern: Regex,
}

impl JobPostingExtractor {
    pub fn new() -> std::result::Result<Self, regex::Error> {
        Ok(Self {
            url_pattern: Regex::new(JOB_POSTING_URL_PATTERN)?,
        })
    }

    /// The regex routing postings to this extractor
    pub fn url_pattern(&self) -> &Regex {
        &self.url_pattern
    }

    /// Company slug taken from the posting URL
    pub fn company(&self, url: &str) -> Option<String> {
        self.url_pattern
            .captures(url)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }

    fn extract_sync(&self, page: &RenderedPage) -> PageContent {
        let document = Html::parse_document(&page.html);
        let root = document.root_element();

        let title =
            first_text(&root, ".posting-headline h2").unwrap_or_else(|| UNKNOWN_TITLE.to_string());

        let category = |class: &str| {
            first_text(&root, &format!(".posting-categories .{}", class))
                .map(Value::String)
                .unwrap_or(Value::Null)
        };

        let mut description = Vec::new();
        if let Some(intro) = first_text(&root, r#"[data-qa="job-description"]"#) {
            description.push(intro);
        }
        if let Ok(sections) = Selector::parse(".section.page-centered") {
            for section in document.select(&sections) {
                if let Some(heading) = first_text(&section, "h3") {
                    description.push(format!("\n**{}**", heading));
                }
                if let Ok(items) = Selector::parse("li") {
                    for item in section.select(&items) {
                        let text = item.text().collect::<String>().trim().to_string();
                        if text.chars().count() > 5 {
                            description.push(format!("• {}", text));
                        }
                    }
                }
            }
        }

        let apply_url = Selector::parse(r#"a.postings-btn[href*="apply"]"#)
            .ok()
            .and_then(|selector| {
                document
                    .select(&selector)
                    .next()
                    .and_then(|el| el.value().attr("href"))
                    .map(str::to_string)
            })
            .unwrap_or_else(|| page.requested_url.clone());

        let description = if description.is_empty() {
            Value::Null
        } else {
            Value::String(description.join("\n"))
        };

        let data = json!({
            "title": title,
            "location": category("location"),
            "department": category("department"),
            "team": category("team"),
            "commitment": category("commitment"),
            "workplace_type": category("workplaceTypes"),
            "description": description,
            "apply_url": apply_url,
            "company": self.company(&page.requested_url),
        });

        PageContent::Structured {
            title: Some(title),
            data,
        }
    }
}

#[async_trait]
impl ContentExtractor for JobPostingExtractor {
    fn name(&self) -> &str {
        "job-posting"
    }

    async fn extract(&self, page: &RenderedPage, _config: &JobConfig) -> Result<PageContent> {
        Ok(self.extract_sync(page))
    }
}

/// Ordered URL-pattern dispatch over extraction strategies
#[derive(Clone)]
pub struct StrategyTable {
    routes: Vec<(Regex, Arc<dyn ContentExtractor>)>,
    fallback: Arc<dyn ContentExtractor>,
}

impl Default for StrategyTable {
    fn default() -> Self {
        Self::new(Arc::new(GenericExtractor::new()))
    }
}

impl StrategyTable {
    pub fn new(fallback: Arc<dyn ContentExtractor>) -> Self {
        Self {
            routes: Vec::new(),
            fallback,
        }
    }

    /// Appends a route; earlier routes take precedence
    pub fn route(
        mut self,
        pattern: &str,
        extractor: Arc<dyn ContentExtractor>,
    ) -> std::result::Result<Self, regex::Error> {
        self.routes.push((Regex::new(pattern)?, extractor));
        Ok(self)
    }

    /// Appends the built-in job-posting route
    pub fn with_job_postings(mut self) -> std::result::Result<Self, regex::Error> {
        let extractor = JobPostingExtractor::new()?;
        self.routes
            .push((extractor.url_pattern().clone(), Arc::new(extractor)));
        Ok(self)
    }

    /// Picks the extractor for a URL
    pub fn select(&self, url: &str) -> &dyn ContentExtractor {
        self.routes
            .iter()
            .find(|(pattern, _)| pattern.is_match(url))
            .map(|(_, extractor)| extractor.as_ref())
            .unwrap_or(self.fallback.as_ref())
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
