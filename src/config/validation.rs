use crate::config::types::{
    Config, CrawlerConfig, OutputConfig, ProxyConfig, SelectorConfig, UserAgentConfig,
};
use crate::url::canonicalize_url;
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_seeds(&config.seeds)?;
    validate_selectors(&config.selectors)?;
    validate_output_config(&config.output)?;
    if let Some(proxy) = &config.proxy {
        validate_proxy_config(proxy)?;
    }
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_concurrency < 1 || config.max_concurrency > 64 {
        return Err(ConfigError::Validation(format!(
            "max_concurrency must be between 1 and 64, got {}",
            config.max_concurrency
        )));
    }

    if config.max_retries > 20 {
        return Err(ConfigError::Validation(format!(
            "max_retries must be <= 20, got {}",
            config.max_retries
        )));
    }

    if config.navigation_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "navigation_timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.wait_timeout_ms == 0 {
        return Err(ConfigError::Validation(
            "wait_timeout_ms must be >= 1".to_string(),
        ));
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

    Ok(())
}

/// Validates seed URLs; every seed must survive canonicalization
fn validate_seeds(seeds: &[String]) -> Result<(), ConfigError> {
    if seeds.is_empty() {
        return Err(ConfigError::Validation(
            "at least one seed URL is required".to_string(),
        ));
    }

    for seed in seeds {
        canonicalize_url(seed).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid seed URL '{}': {}", seed, e))
        })?;
    }

    Ok(())
}

/// Validates that no locator is blank
fn validate_selectors(selectors: &SelectorConfig) -> Result<(), ConfigError> {
    let named = [
        ("cookie-button", &selectors.cookie_button),
        ("item-card", &selectors.item_card),
        ("item-link", &selectors.item_link),
        ("next-page", &selectors.next_page),
        ("title", &selectors.title),
        ("price", &selectors.price),
        ("description", &selectors.description),
        ("location", &selectors.location),
        ("parameters", &selectors.parameters),
        ("seller", &selectors.seller),
        ("phone-button", &selectors.phone_button),
    ];

    for (name, value) in named {
        if value.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "selector '{}' cannot be empty",
                name
            )));
        }
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.records_path.is_empty() {
        return Err(ConfigError::Validation(
            "records_path cannot be empty".to_string(),
        ));
    }

    if config.diagnostics_dir.is_empty() {
        return Err(ConfigError::Validation(
            "diagnostics_dir cannot be empty".to_string(),
        ));
    }

    if config.checkpoint_path.is_empty() {
        return Err(ConfigError::Validation(
            "checkpoint_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates proxy configuration
///
/// A required proxy section without any usable URL is an egress failure: the
/// crawl must not start.
fn validate_proxy_config(config: &ProxyConfig) -> Result<(), ConfigError> {
    for proxy in &config.urls {
        let url = Url::parse(proxy)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid proxy URL '{}': {}", proxy, e)))?;

        if !matches!(url.scheme(), "http" | "https" | "socks5" | "socks5h") {
            return Err(ConfigError::InvalidUrl(format!(
                "Proxy URL '{}' has unsupported scheme '{}'",
                proxy,
                url.scheme()
            )));
        }
    }

    if config.required && config.urls.is_empty() {
        return Err(ConfigError::Egress(
            "proxy is required but no proxy URL is configured".to_string(),
        ));
    }

    Ok(())
}
