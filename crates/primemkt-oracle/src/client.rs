//! HTTP client for the price-oracle quote API.
//!
//! Wraps `reqwest` with typed response deserialization. A provider that has
//! no current quote for a symbol answers with a `null` price, which the
//! client surfaces as `Ok(None)` — only transport-level and shape failures
//! become errors.

use std::time::Duration;

use reqwest::{Client, Url};

use crate::error::OracleError;
use crate::types::QuoteResponse;

/// Client for the price-oracle quote API.
///
/// Manages the HTTP client, optional API key, and base URL. Point
/// `base_url` at a mock server in tests.
pub struct OracleClient {
    client: Client,
    api_key: Option<String>,
    base_url: Url,
}

impl OracleClient {
    /// Creates a new client.
    ///
    /// # Errors
    ///
    /// Returns [`OracleError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`OracleError::InvalidBaseUrl`] if
    /// `base_url` is not a valid URL.
    pub fn new(
        base_url: &str,
        api_key: Option<&str>,
        timeout_secs: u64,
    ) -> Result<Self, OracleError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("primemkt/0.1 (exchange-rates)")
            .build()?;

        // Normalise: ensure the base URL ends with exactly one slash so that
        // joined paths resolve under it rather than replacing the last
        // path segment.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| OracleError::InvalidBaseUrl {
            url: base_url.to_owned(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            api_key: api_key.map(ToOwned::to_owned),
            base_url,
        })
    }

    /// Fetches the USD price for one currency symbol.
    ///
    /// Returns `Ok(None)` when the provider reports no current quote for
    /// the symbol (the documented `null` sentinel).
    ///
    /// # Errors
    ///
    /// - [`OracleError::Http`] on network failure or non-2xx HTTP status.
    /// - [`OracleError::Deserialize`] if the response does not match the
    ///   expected shape.
    pub async fn fetch_usd_price(&self, symbol: &str) -> Result<Option<f64>, OracleError> {
        let url = self.build_url(symbol);

        let mut request = self.client.get(url);
        if let Some(key) = &self.api_key {
            request = request.header("x-api-key", key);
        }

        let body = request
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let quote: QuoteResponse =
            serde_json::from_str(&body).map_err(|e| OracleError::Deserialize {
                context: format!("price(symbol={symbol})"),
                source: e,
            })?;

        Ok(quote.usd)
    }

    fn build_url(&self, symbol: &str) -> Url {
        let mut url = self
            .base_url
            .join("v1/price")
            .expect("static path joins onto a normalised base URL");
        url.query_pairs_mut().append_pair("symbol", symbol);
        url
    }
}
