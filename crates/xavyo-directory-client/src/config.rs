//! Directory client configuration.
//!
//! The host process owns loading; this type only describes and validates
//! the settings. It deserializes with defaults for every field.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{DirectoryError, DirectoryResult};
use crate::mapper::MappingPolicy;
use crate::retry::RetryPolicy;

/// Default endpoint of the hosted directory service.
pub const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/identitytoolkit/v3/relyingparty";

/// Largest listing page the service serves.
pub const MAX_PAGE_SIZE: u32 = 1000;

/// Configuration for [`crate::DirectoryClient`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
    /// Base URL that endpoint names are appended to.
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// `User-Agent` header sent with each request.
    pub user_agent: String,
    /// Retry policy for reads.
    pub retry: RetryPolicy,
    /// How listings treat records that fail to map.
    pub mapping_policy: MappingPolicy,
    /// Page size used when a listing does not specify one.
    pub default_page_size: u32,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 30,
            user_agent: concat!("xavyo-directory-client/", env!("CARGO_PKG_VERSION")).to_string(),
            retry: RetryPolicy::default(),
            mapping_policy: MappingPolicy::default(),
            default_page_size: MAX_PAGE_SIZE,
        }
    }
}

impl DirectoryConfig {
    #[must_use]
    pub fn builder() -> DirectoryConfigBuilder {
        DirectoryConfigBuilder::default()
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Check that the settings are usable.
    pub fn validate(&self) -> DirectoryResult<()> {
        let url = url::Url::parse(&self.base_url)
            .map_err(|e| DirectoryError::InvalidConfig(format!("invalid base_url: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(DirectoryError::InvalidConfig(format!(
                "unsupported base_url scheme: {}",
                url.scheme()
            )));
        }
        if self.timeout_secs == 0 {
            return Err(DirectoryError::InvalidConfig(
                "timeout_secs must be greater than zero".to_string(),
            ));
        }
        validate_page_size(self.default_page_size)
            .map_err(|e| DirectoryError::InvalidConfig(e.to_string()))?;
        Ok(())
    }
}

/// Page sizes must be within `1..=MAX_PAGE_SIZE`.
pub(crate) fn validate_page_size(page_size: u32) -> DirectoryResult<()> {
    if page_size == 0 || page_size > MAX_PAGE_SIZE {
        return Err(DirectoryError::InvalidArgument(format!(
            "page size must be between 1 and {MAX_PAGE_SIZE}, got {page_size}"
        )));
    }
    Ok(())
}

/// Builder for [`DirectoryConfig`].
#[derive(Debug, Default)]
pub struct DirectoryConfigBuilder {
    config: DirectoryConfig,
}

impl DirectoryConfigBuilder {
    #[must_use]
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = base_url.into();
        self
    }

    #[must_use]
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.timeout_secs = secs;
        self
    }

    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    #[must_use]
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.config.retry = retry;
        self
    }

    #[must_use]
    pub fn mapping_policy(mut self, policy: MappingPolicy) -> Self {
        self.config.mapping_policy = policy;
        self
    }

    #[must_use]
    pub fn default_page_size(mut self, page_size: u32) -> Self {
        self.config.default_page_size = page_size;
        self
    }

    /// Validate and return the configuration.
    pub fn build(self) -> DirectoryResult<DirectoryConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
