use crate::config::types::{Config, CrawlerConfig, FieldSelectors, OutputConfig, SiteConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_site_config(&config.site)?;
    validate_crawler_config(&config.crawler)?;
    validate_field_selectors(&config.fields)?;
    validate_output_config(&config.output)?;
    validate_categories(&config.categories)?;
    Ok(())
}

/// Validates the site root URL and selectors
fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.root_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid root-url: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "root-url must use http or https, got '{}'",
            url.scheme()
        )));
    }

    let selectors = [
        ("search-input", &config.search_input),
        ("search-submit", &config.search_submit),
        ("result-container", &config.result_container),
        ("listing-link", &config.listing_link),
        ("next-control", &config.next_control),
        ("detail-marker", &config.detail_marker),
    ];
    for (name, selector) in selectors {
        validate_selector(name, selector)?;
    }

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_concurrent_details < 1 || config.max_concurrent_details > 64 {
        return Err(ConfigError::Validation(format!(
            "max-concurrent-details must be between 1 and 64, got {}",
            config.max_concurrent_details
        )));
    }

    if config.navigation_timeout < 1000 {
        return Err(ConfigError::Validation(format!(
            "navigation-timeout must be >= 1000ms, got {}ms",
            config.navigation_timeout
        )));
    }

    if config.marker_timeout < 1000 {
        return Err(ConfigError::Validation(format!(
            "marker-timeout must be >= 1000ms, got {}ms",
            config.marker_timeout
        )));
    }

    Ok(())
}

/// Validates per-field extraction selectors
fn validate_field_selectors(fields: &FieldSelectors) -> Result<(), ConfigError> {
    let selectors = [
        ("fields.address", &fields.address),
        ("fields.city", &fields.city),
        ("fields.state", &fields.state),
        ("fields.phone", &fields.phone),
        ("fields.website", &fields.website),
        ("fields.email-link", &fields.email_link),
    ];
    for (name, selector) in selectors {
        validate_selector(name, selector)?;
    }
    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.csv_path.is_empty() {
        return Err(ConfigError::Validation(
            "csv-path cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Validates the category list: non-empty, no blank entries
fn validate_categories(categories: &[String]) -> Result<(), ConfigError> {
    if categories.is_empty() {
        return Err(ConfigError::Validation(
            "categories must contain at least one search term".to_string(),
        ));
    }

    for category in categories {
        if category.trim().is_empty() {
            return Err(ConfigError::Validation(
                "categories cannot contain blank entries".to_string(),
            ));
        }
    }

    Ok(())
}

/// Validates a single selector string
fn validate_selector(name: &str, selector: &str) -> Result<(), ConfigError> {
    if selector.trim().is_empty() {
        return Err(ConfigError::Validation(format!(
            "{} selector cannot be empty",
            name
        )));
    }
    Ok(())
}
