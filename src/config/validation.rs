use crate::config::types::{
    Config, CrawlerConfig, ExecutorConfig, ExtractionConfig, OutputConfig, StoreConfig,
    StrategyEntry, StrategyKind, UserAgentConfig,
};
use crate::crawler::validate_selector;
use crate::ConfigError;
use regex::Regex;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_executor_config(&config.executor)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_store_config(&config.store)?;
    validate_output_config(&config.output)?;
    validate_extraction_config(&config.extraction)?;
    validate_strategies(&config.strategies)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if let Some(seed) = &config.seed_url {
        validate_http_url("seed-url", seed)?;
    }

    if config.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max-pages must be >= 1, got {}",
            config.max_pages
        )));
    }

    for pattern in config.include_paths.iter().chain(&config.exclude_paths) {
        validate_regex(pattern)?;
    }

    if let Some(schema) = &config.extraction_schema {
        if !schema.is_object() {
            return Err(ConfigError::Validation(
                "extraction-schema must be a table".to_string(),
            ));
        }
    }

    Ok(())
}

/// Validates executor limits
fn validate_executor_config(config: &ExecutorConfig) -> Result<(), ConfigError> {
    if config.concurrency < 1 || config.concurrency > 100 {
        return Err(ConfigError::Validation(format!(
            "concurrency must be between 1 and 100, got {}",
            config.concurrency
        )));
    }

    if config.task_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "task-timeout-secs must be >= 1, got {}",
            config.task_timeout_secs
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Validate crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler-name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler-name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact-url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

fn validate_store_config(config: &StoreConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.results_path.is_empty() {
        return Err(ConfigError::Validation(
            "results-path cannot be empty".to_string(),
        ));
    }

    if config.summary_path.is_empty() {
        return Err(ConfigError::Validation(
            "summary-path cannot be empty".to_string(),
        ));
    }

    if matches!(&config.attachments_dir, Some(dir) if dir.is_empty()) {
        return Err(ConfigError::Validation(
            "attachments-dir cannot be empty when set".to_string(),
        ));
    }

    Ok(())
}

fn validate_extraction_config(config: &ExtractionConfig) -> Result<(), ConfigError> {
    if let Some(endpoint) = &config.schema_endpoint {
        validate_http_url("schema-endpoint", endpoint)?;
    }
    Ok(())
}

/// Validates `[[strategy]]` entries
fn validate_strategies(entries: &[StrategyEntry]) -> Result<(), ConfigError> {
    for entry in entries {
        validate_regex(&entry.pattern)?;

        if entry.kind == StrategyKind::Selector {
            if entry.fields.is_empty() && entry.title.is_none() {
                return Err(ConfigError::Validation(format!(
                    "Selector strategy '{}' needs a title or at least one field",
                    entry.pattern
                )));
            }

            for selector in entry.title.iter().chain(entry.fields.values()) {
                validate_selector(selector).map_err(ConfigError::InvalidPattern)?;
            }
        }
    }
    Ok(())
}

fn validate_regex(pattern: &str) -> Result<(), ConfigError> {
    Regex::new(pattern)
        .map(|_| ())
        .map_err(|e| ConfigError::InvalidPattern(format!("'{}': {}", pattern, e)))
}

/// Checks that a URL parses and uses http or https
fn validate_http_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", field, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' must use http or https",
            field, value
        )));
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact-email cannot be empty".to_string(),
        ));
    }

    let Some((local, domain)) = email.split_once('@') else {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    };

    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
