//! Run configuration loaded from environment variables.

use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::HarvestError;
use crate::retry::RetryPolicy;
use crate::security::SessionCredentials;

pub const DEFAULT_LISTING_URL: &str = "https://www.kaggle.com/competitions";

pub const DEFAULT_METADATA_ENDPOINT: &str =
    "https://www.kaggle.com/api/i/kernels.LegacyKernelsService/GetKernelViewModel";

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/138.0.0.0 Safari/537.36";

/// Scroll convergence parameters of the dynamic page loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrollConfig {
    /// Pixels per scroll command
    pub step_px: i64,

    /// Scroll commands issued between two snapshots
    pub scrolls_per_poll: u32,

    /// Pause after each scroll command
    pub pause: Duration,

    /// Upper bound on snapshot comparisons
    pub max_polls: u32,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            step_px: 500,
            scrolls_per_poll: 2,
            pause: Duration::from_millis(500),
            max_polls: 100,
        }
    }
}

/// Endpoint and fixed headers of the metadata API.
#[derive(Debug, Clone)]
pub struct MetadataConfig {
    pub endpoint: String,
    pub origin: String,
    pub referer: String,
    pub user_agent: String,
    pub credentials: SessionCredentials,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_METADATA_ENDPOINT.to_string(),
            origin: "https://www.kaggle.com".to_string(),
            referer: "https://www.kaggle.com/code".to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            credentials: SessionCredentials::default(),
        }
    }
}

/// Everything a harvest run needs besides file paths.
#[derive(Debug, Clone)]
pub struct HarvestConfig {
    /// Listing index URL; the page number is added as `?page=N`
    pub listing_url: String,

    pub scroll: ScrollConfig,

    pub metadata: MetadataConfig,

    pub retry: RetryPolicy,

    /// Processed items between two checkpoint writes
    pub checkpoint_interval: usize,

    /// Rows requested per ranked listing query
    pub page_size: usize,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            listing_url: DEFAULT_LISTING_URL.to_string(),
            scroll: ScrollConfig::default(),
            metadata: MetadataConfig::default(),
            retry: RetryPolicy::default(),
            checkpoint_interval: 250,
            page_size: 5,
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> Result<T, HarvestError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| HarvestError::Config(format!("{} must be a valid number, got {:?}", name, raw))),
        Err(_) => Ok(default),
    }
}

impl HarvestConfig {
    /// Load configuration from environment variables (and `.env` if present).
    pub fn from_env() -> Result<Self, HarvestError> {
        let _ = dotenv();
        let defaults = Self::default();

        let mut credentials = SessionCredentials::new();
        if let Ok(cookie) = env::var("KAGGLE_COOKIE") {
            credentials = credentials.with_cookie(cookie);
        }
        if let Ok(token) = env::var("KAGGLE_XSRF_TOKEN") {
            credentials = credentials.with_xsrf_token(token);
        }
        if let Ok(version) = env::var("KAGGLE_BUILD_VERSION") {
            credentials = credentials.with_build_version(version);
        }

        let metadata = MetadataConfig {
            endpoint: env::var("HARVEST_METADATA_ENDPOINT").unwrap_or(defaults.metadata.endpoint),
            user_agent: env::var("HARVEST_USER_AGENT").unwrap_or(defaults.metadata.user_agent),
            credentials,
            ..defaults.metadata
        };

        let base = env_or("HARVEST_BACKOFF_BASE", defaults.retry.backoff_base)?;
        let retry = RetryPolicy::default()
            .with_max_retries(env_or("HARVEST_MAX_RETRIES", defaults.retry.max_retries)?)
            .with_backoff_base(base)
            .with_timeout(Duration::from_secs(env_or(
                "HARVEST_REQUEST_TIMEOUT_SECS",
                defaults.retry.timeout.as_secs(),
            )?));

        let config = Self {
            listing_url: env::var("HARVEST_LISTING_URL").unwrap_or(defaults.listing_url),
            scroll: defaults.scroll,
            metadata,
            retry,
            checkpoint_interval: env_or("HARVEST_CHECKPOINT_INTERVAL", defaults.checkpoint_interval)?,
            page_size: env_or("HARVEST_PAGE_SIZE", defaults.page_size)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), HarvestError> {
        self.retry.validate()?;
        if self.checkpoint_interval == 0 {
            return Err(HarvestError::Config("checkpoint interval must be positive".into()));
        }
        if self.page_size == 0 {
            return Err(HarvestError::Config("page size must be positive".into()));
        }
        if self.scroll.max_polls == 0 {
            return Err(HarvestError::Config("max scroll polls must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = HarvestConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.checkpoint_interval, 250);
        assert_eq!(config.page_size, 5);
        assert_eq!(config.retry.total_attempts(), 6);
        assert_eq!(config.retry.timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let config = HarvestConfig {
            checkpoint_interval: 0,
            ..HarvestConfig::default()
        };
        assert!(matches!(config.validate(), Err(HarvestError::Config(_))));
    }
}
