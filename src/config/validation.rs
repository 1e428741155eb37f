use crate::config::types::{
    CheckpointConfig, Config, CrawlerConfig, ExtractionConfig, SiteEntry, StorageConfig,
    UserAgentConfig,
};
use crate::url::matches_domain;
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_checkpoint_config(&config.checkpoint)?;
    validate_extraction_config(&config.extraction)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_storage_config(&config.storage)?;
    validate_sites(&config.sites)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.min_delay_ms < 1 {
        return Err(ConfigError::Validation(format!(
            "min_delay_ms must be >= 1ms, got {}ms",
            config.min_delay_ms
        )));
    }

    if config.max_retries > 10 {
        return Err(ConfigError::Validation(format!(
            "max_retries must be <= 10, got {}",
            config.max_retries
        )));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "request_timeout_secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_checkpoint_config(config: &CheckpointConfig) -> Result<(), ConfigError> {
    if config.every_documents < 1 {
        return Err(ConfigError::Validation(
            "checkpoint every_documents must be >= 1".to_string(),
        ));
    }

    if config.interval_minutes < 1 {
        return Err(ConfigError::Validation(
            "checkpoint interval_minutes must be >= 1".to_string(),
        ));
    }

    if config.max_seen < 1 {
        return Err(ConfigError::Validation(
            "checkpoint max_seen must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_extraction_config(config: &ExtractionConfig) -> Result<(), ConfigError> {
    if config.excerpt_length < 20 {
        return Err(ConfigError::Validation(format!(
            "excerpt_length must be >= 20, got {}",
            config.excerpt_length
        )));
    }

    if config.max_content_length <= config.excerpt_length {
        return Err(ConfigError::Validation(format!(
            "max_content_length ({}) must exceed excerpt_length ({})",
            config.max_content_length, config.excerpt_length
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    for (name, path) in [
        ("state_path", &config.state_path),
        ("index_path", &config.index_path),
        ("documents_path", &config.documents_path),
    ] {
        if path.as_os_str().is_empty() {
            return Err(ConfigError::Validation(format!("{} cannot be empty", name)));
        }
    }

    if config.index_path == config.documents_path {
        return Err(ConfigError::Validation(
            "index_path and documents_path must differ".to_string(),
        ));
    }

    Ok(())
}

/// Validates whitelisted sites and their seeds
fn validate_sites(sites: &[SiteEntry]) -> Result<(), ConfigError> {
    if sites.is_empty() {
        return Err(ConfigError::Validation(
            "at least one [[site]] entry is required".to_string(),
        ));
    }

    for entry in sites {
        validate_domain_string(&entry.domain)?;

        for seed in &entry.seeds {
            let url = Url::parse(seed).map_err(|e| {
                ConfigError::InvalidUrl(format!("Invalid seed URL '{}': {}", seed, e))
            })?;

            if url.scheme() != "https" && url.scheme() != "http" {
                return Err(ConfigError::Validation(format!(
                    "Seed URL '{}' must use HTTP or HTTPS",
                    seed
                )));
            }

            let host = url.host_str().unwrap_or_default();
            if !matches_domain(&entry.domain, host) {
                return Err(ConfigError::Validation(format!(
                    "Seed URL '{}' is outside its site domain '{}'",
                    seed, entry.domain
                )));
            }
        }
    }

    Ok(())
}

/// Validates a domain string
fn validate_domain_string(domain: &str) -> Result<(), ConfigError> {
    if domain.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain cannot be empty".to_string(),
        ));
    }

    if domain.starts_with("*.") {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' must not use a wildcard; subdomains are always included",
            domain
        )));
    }

    if !domain
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' contains invalid characters",
            domain
        )));
    }

    if domain.starts_with('.')
        || domain.ends_with('.')
        || domain.starts_with('-')
        || domain.ends_with('-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot start or end with '.' or '-'",
            domain
        )));
    }

    if domain.contains("..") {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot contain consecutive dots",
            domain
        )));
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
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
