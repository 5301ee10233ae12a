//! HTTP client for the IPFS pinning gateway.
//!
//! The gateway fetches the referenced media itself and pins it to the
//! content-addressed store, answering with the resulting CID and gateway
//! path. Uploads can be slow for large media, so the request timeout is
//! configured well above the usual API-call range.

use std::time::Duration;

use reqwest::{Client, Url};

use crate::error::PinError;
use crate::types::{PinReceipt, PinResponse};

/// Client for the pinning gateway's HTTP API.
pub struct PinClient {
    client: Client,
    api_key: Option<String>,
    base_url: Url,
}

impl PinClient {
    /// Creates a new client.
    ///
    /// # Errors
    ///
    /// Returns [`PinError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`PinError::InvalidBaseUrl`] if
    /// `base_url` is not a valid URL.
    pub fn new(base_url: &str, api_key: Option<&str>, timeout_secs: u64) -> Result<Self, PinError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("primemkt/0.1 (media-pinning)")
            .build()?;

        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| PinError::InvalidBaseUrl {
            url: base_url.to_owned(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            api_key: api_key.map(ToOwned::to_owned),
            base_url,
        })
    }

    /// Pins the media at `media_url` and returns the resulting receipt.
    ///
    /// # Errors
    ///
    /// - [`PinError::Http`] on network failure or non-2xx HTTP status.
    /// - [`PinError::Deserialize`] if the response does not match the
    ///   expected shape.
    /// - [`PinError::MissingCid`] if the gateway answers without a CID.
    pub async fn pin_url(&self, media_url: &str) -> Result<PinReceipt, PinError> {
        let url = self
            .base_url
            .join("api/v1/pins")
            .expect("static path joins onto a normalised base URL");

        let mut request = self
            .client
            .post(url)
            .json(&serde_json::json!({ "source_url": media_url }));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let body = request
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let response: PinResponse =
            serde_json::from_str(&body).map_err(|e| PinError::Deserialize {
                context: format!("pin(source_url={media_url})"),
                source: e,
            })?;

        let Some(content_id) = response.cid.filter(|cid| !cid.is_empty()) else {
            return Err(PinError::MissingCid {
                url: media_url.to_owned(),
            });
        };

        // Gateways that omit the path serve content at the conventional
        // /ipfs/<cid> location.
        let path = response
            .path
            .unwrap_or_else(|| format!("/ipfs/{content_id}"));

        Ok(PinReceipt { content_id, path })
    }
}
