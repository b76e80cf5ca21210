//! HTTP client for the merchant back office API.
//!
//! Both endpoints are plain authenticated `GET`s returning JSON. Response
//! envelopes are unwrapped here so callers only see record payloads.

use crate::{authorization_value, extract_member, extract_withdrawals, ClientError, MerchantApi};
use config::MerchantConfig;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde_json::Value;
use tracing::debug;

const ACCEPT_VALUE: &str = "application/json, text/plain, */*";

/// A [`MerchantApi`] backed by `reqwest`.
///
/// # Example
///
/// ```ignore
/// let client = MerchantClient::new(&MerchantConfig::default())?;
/// let rows = client.fetch_withdrawals(&token, 1, 100).await?;
/// ```
#[derive(Debug, Clone)]
pub struct MerchantClient {
    client: reqwest::Client,
    withdrawals_url: reqwest::Url,
    config: MerchantConfig,
}

impl MerchantClient {
    /// Creates a new merchant client from configuration.
    pub fn new(config: &MerchantConfig) -> Result<Self, ClientError> {
        Self::with_client(reqwest::Client::new(), config)
    }

    /// Creates a new merchant client with a custom HTTP client.
    pub fn with_client(client: reqwest::Client, config: &MerchantConfig) -> Result<Self, ClientError> {
        let withdrawals_url = parse_url(&config.withdrawals_url())?;

        Ok(Self {
            client,
            withdrawals_url,
            config: config.clone(),
        })
    }

    /// Returns the withdrawal list endpoint.
    pub const fn withdrawals_url(&self) -> &reqwest::Url {
        &self.withdrawals_url
    }

    async fn get_json(
        &self,
        request: reqwest::RequestBuilder,
        token: &str,
    ) -> Result<Value, ClientError> {
        let response = request
            .header(ACCEPT, ACCEPT_VALUE)
            .header(AUTHORIZATION, authorization_value(token))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown".to_string());
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }
}

impl MerchantApi for MerchantClient {
    async fn fetch_withdrawals(
        &self,
        token: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<Value>, ClientError> {
        debug!(url = %self.withdrawals_url, page, per_page, "Fetching withdrawals");

        let request = self
            .client
            .get(self.withdrawals_url.clone())
            .query(&[("page", page), ("per_page", per_page)]);

        let body = self.get_json(request, token).await?;
        let list = extract_withdrawals(body);

        debug!(count = list.len(), "Fetched withdrawals");
        Ok(list)
    }

    async fn fetch_member(&self, token: &str, member_id: &str) -> Result<Value, ClientError> {
        let url = parse_url(&self.config.member_url(member_id))?;
        debug!(%url, member_id, "Fetching member detail");

        let request = self.client.get(url).query(&[("id", member_id)]);
        let body = self.get_json(request, token).await?;

        Ok(extract_member(body))
    }
}

fn parse_url(raw: &str) -> Result<reqwest::Url, ClientError> {
    raw.parse()
        .map_err(|e| ClientError::InvalidUrl(format!("{raw}: {e}")))
}
