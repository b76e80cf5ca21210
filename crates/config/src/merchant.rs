//! Merchant API configuration for the withdrawal dashboard.
//!
//! Provides endpoint locations, polling cadence and the storage key names
//! shared between the monitor and one-shot tools.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default merchant API root, including the merchant route prefix.
pub const DEFAULT_API_BASE: &str = "https://api.mclsm.com/api/merchant";

/// Default PromptPay QR image provider.
pub const DEFAULT_QR_PROVIDER: &str = "https://promptpay.io";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("per_page must be greater than zero")]
    ZeroPerPage,

    #[error("refresh_interval_secs must be greater than zero")]
    ZeroRefreshInterval,
}

/// Merchant API and dashboard configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MerchantConfig {
    /// Merchant API root url
    pub api_base: String,
    /// Path of the paginated withdrawal list, relative to `api_base`
    pub withdrawals_path: String,
    /// Path of the member detail resource, relative to `api_base`
    pub members_path: String,
    /// QR image provider root url
    pub qr_provider: String,
    /// Records requested per refresh (always page 1)
    pub per_page: u32,
    /// Seconds between background refreshes
    pub refresh_interval_secs: u64,
    /// Rows shown per dashboard page on startup
    pub default_page_size: usize,
    /// Storage key holding the merchant auth token
    pub token_key: String,
    /// Storage key holding the persisted scan status map
    pub scan_status_key: String,
}

impl Default for MerchantConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            withdrawals_path: "financial-withdraws".to_string(),
            members_path: "members".to_string(),
            qr_provider: DEFAULT_QR_PROVIDER.to_string(),
            per_page: 100,
            refresh_interval_secs: 60,
            default_page_size: 20,
            token_key: "auth_token.laravelJWT".to_string(),
            scan_status_key: "withdraw_scan_status_v1".to_string(),
        }
    }
}

impl MerchantConfig {
    /// Url of the withdrawal list endpoint.
    pub fn withdrawals_url(&self) -> String {
        join_url(&self.api_base, &self.withdrawals_path)
    }

    /// Url of a single member's detail resource.
    pub fn member_url(&self, member_id: &str) -> String {
        join_url(&join_url(&self.api_base, &self.members_path), member_id)
    }

    /// Check the values that would make the dashboard misbehave at runtime.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_base.trim().is_empty() {
            return Err(ConfigError::Empty("api_base"));
        }
        if self.qr_provider.trim().is_empty() {
            return Err(ConfigError::Empty("qr_provider"));
        }
        if self.token_key.is_empty() {
            return Err(ConfigError::Empty("token_key"));
        }
        if self.scan_status_key.is_empty() {
            return Err(ConfigError::Empty("scan_status_key"));
        }
        if self.per_page == 0 {
            return Err(ConfigError::ZeroPerPage);
        }
        if self.refresh_interval_secs == 0 {
            return Err(ConfigError::ZeroRefreshInterval);
        }
        Ok(())
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Builder for custom merchant configurations.
#[derive(Debug, Clone, Default)]
pub struct MerchantConfigBuilder {
    config: MerchantConfig,
}

impl MerchantConfigBuilder {
    /// Start with the default merchant endpoints.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the merchant API root url.
    pub fn api_base(mut self, url: impl Into<String>) -> Self {
        self.config.api_base = url.into();
        self
    }

    /// Override the QR image provider.
    pub fn qr_provider(mut self, url: impl Into<String>) -> Self {
        self.config.qr_provider = url.into();
        self
    }

    /// Override the number of records fetched per refresh.
    pub const fn per_page(mut self, per_page: u32) -> Self {
        self.config.per_page = per_page;
        self
    }

    /// Override the background refresh interval.
    pub const fn refresh_interval_secs(mut self, secs: u64) -> Self {
        self.config.refresh_interval_secs = secs;
        self
    }

    /// Override the initial dashboard page size.
    pub const fn default_page_size(mut self, size: usize) -> Self {
        self.config.default_page_size = size;
        self
    }

    /// Build the merchant configuration.
    pub fn build(self) -> MerchantConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MerchantConfig::default();
        assert_eq!(config.per_page, 100);
        assert_eq!(config.refresh_interval_secs, 60);
        assert_eq!(config.default_page_size, 20);
        assert_eq!(config.scan_status_key, "withdraw_scan_status_v1");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_urls() {
        let config = MerchantConfigBuilder::new()
            .api_base("http://localhost:9000/api/merchant/")
            .build();

        assert_eq!(
            config.withdrawals_url(),
            "http://localhost:9000/api/merchant/financial-withdraws"
        );
        assert_eq!(
            config.member_url("42"),
            "http://localhost:9000/api/merchant/members/42"
        );
    }

    #[test]
    fn test_custom_config_builder() {
        let config = MerchantConfigBuilder::new()
            .refresh_interval_secs(15)
            .per_page(50)
            .build();

        assert_eq!(config.refresh_interval_secs, 15);
        assert_eq!(config.per_page, 50);
        assert_eq!(config.api_base, DEFAULT_API_BASE);
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let config = MerchantConfigBuilder::new().refresh_interval_secs(0).build();
        assert_eq!(config.validate(), Err(ConfigError::ZeroRefreshInterval));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: MerchantConfig = toml::from_str(r#"api_base = "http://example.test""#).unwrap();
        assert_eq!(config.api_base, "http://example.test");
        assert_eq!(config.per_page, 100);
        assert_eq!(config.token_key, "auth_token.laravelJWT");
    }
}
