use crate::config::types::{
    Config, CrawlConfig, HealthCheckConfig, RenderingConfig, UserAgentConfig,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawl_config(&config.crawl)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_rendering_config(&config.rendering)?;
    validate_health_check_config(&config.health_check)?;
    Ok(())
}

/// Validates crawl configuration
///
/// An empty start URL is accepted here so that it can be supplied on the
/// command line; the coordinator rejects it if it is still missing.
fn validate_crawl_config(config: &CrawlConfig) -> Result<(), ConfigError> {
    if !config.start_url.is_empty() {
        let url = Url::parse(&config.start_url).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid start-url '{}': {}", config.start_url, e))
        })?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::InvalidUrl(format!(
                "start-url '{}' must use HTTP or HTTPS",
                config.start_url
            )));
        }
    }

    if config.max_pages < 1 {
        return Err(ConfigError::Validation(
            "max-pages must be >= 1, got 0".to_string(),
        ));
    }

    if config.concurrency < 1 || config.concurrency > 64 {
        return Err(ConfigError::Validation(format!(
            "concurrency must be between 1 and 64, got {}",
            config.concurrency
        )));
    }

    if config.request_timeout_ms < 100 {
        return Err(ConfigError::Validation(format!(
            "request-timeout-ms must be >= 100ms, got {}ms",
            config.request_timeout_ms
        )));
    }

    if config.max_consecutive_errors < 1 {
        return Err(ConfigError::Validation(
            "max-consecutive-errors must be >= 1".to_string(),
        ));
    }

    if config.max_response_bytes < 1024 {
        return Err(ConfigError::Validation(format!(
            "max-response-bytes must be >= 1024, got {}",
            config.max_response_bytes
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // The crawler name doubles as the robots.txt product token
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler-name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ConfigError::Validation(format!(
            "crawler-name must contain only alphanumeric characters, hyphens and underscores, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact-url: {}", e)))?;

    Ok(())
}

/// Validates rendering pool configuration
fn validate_rendering_config(config: &RenderingConfig) -> Result<(), ConfigError> {
    if config.max_pool_size < 1 || config.max_pool_size > 16 {
        return Err(ConfigError::Validation(format!(
            "rendering max-pool-size must be between 1 and 16, got {}",
            config.max_pool_size
        )));
    }

    if config.acquire_timeout_ms == 0 || config.navigation_timeout_ms == 0 {
        return Err(ConfigError::Validation(
            "rendering timeouts must be greater than zero".to_string(),
        ));
    }

    if config.self_destruct_ms < config.navigation_timeout_ms {
        return Err(ConfigError::Validation(format!(
            "rendering self-destruct-ms ({}) must not be shorter than navigation-timeout-ms ({})",
            config.self_destruct_ms, config.navigation_timeout_ms
        )));
    }

    Ok(())
}

/// Validates health check configuration
fn validate_health_check_config(config: &HealthCheckConfig) -> Result<(), ConfigError> {
    if config.sample_size > 100 {
        return Err(ConfigError::Validation(format!(
            "health-check sample-size must be <= 100, got {}",
            config.sample_size
        )));
    }

    if config.concurrency < 1 {
        return Err(ConfigError::Validation(
            "health-check concurrency must be >= 1".to_string(),
        ));
    }

    Ok(())
}
