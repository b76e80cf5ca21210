//! Configuration types for the withdrawal monitor.
//!
//! This crate provides:
//! - Merchant API endpoints and the QR image provider
//! - Polling and pagination parameters
//! - Durable storage key names

pub mod merchant;

pub use merchant::{
    ConfigError, MerchantConfig, MerchantConfigBuilder, DEFAULT_API_BASE, DEFAULT_QR_PROVIDER,
};
