//! HTTP client for the Shopee Open Platform v2 API.
//!
//! Wraps `reqwest` with request signing, per-shop token lookup, and the
//! Shopee envelope convention: a 2xx response whose `"error"` field is
//! non-empty is surfaced as [`ShopeeError::Api`].

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::ShopeeError;
use crate::signer::Signer;
use crate::tokens::TokenManager;
use crate::types::Envelope;

pub const DEFAULT_HOST: &str = "https://partner.shopeemobile.com";

const DEFAULT_USER_AGENT: &str = "stocklink/0.1 (shopee-sync)";

/// Client for the Shopee Open Platform v2 API.
///
/// Use [`ShopeeClient::new`] for production or
/// [`ShopeeClient::with_base_url`] to point at a mock server in tests.
#[derive(Debug, Clone)]
pub struct ShopeeClient {
    client: Client,
    base_url: Url,
    signer: Signer,
    tokens: TokenManager,
}

impl ShopeeClient {
    /// Creates a client pointed at the production Shopee host.
    ///
    /// # Errors
    ///
    /// Returns [`ShopeeError::Transport`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(
        signer: Signer,
        tokens: TokenManager,
        timeout_secs: u64,
    ) -> Result<Self, ShopeeError> {
        Self::with_base_url(signer, tokens, timeout_secs, DEFAULT_HOST, None)
    }

    /// Creates a client with a custom host (test servers, sandbox).
    ///
    /// # Errors
    ///
    /// - [`ShopeeError::Transport`] if the `reqwest::Client` cannot be built.
    /// - [`ShopeeError::InvalidBaseUrl`] if `base_url` does not parse.
    pub fn with_base_url(
        signer: Signer,
        tokens: TokenManager,
        timeout_secs: u64,
        base_url: &str,
        user_agent: Option<&str>,
    ) -> Result<Self, ShopeeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent.unwrap_or(DEFAULT_USER_AGENT))
            .build()?;

        let base = Url::parse(base_url.trim_end_matches('/')).map_err(|e| {
            ShopeeError::InvalidBaseUrl {
                url: base_url.to_string(),
                reason: e.to_string(),
            }
        })?;
        if base.cannot_be_a_base() {
            return Err(ShopeeError::InvalidBaseUrl {
                url: base_url.to_string(),
                reason: "not a hierarchical URL".to_string(),
            });
        }

        Ok(Self {
            client,
            base_url: base,
            signer,
            tokens,
        })
    }

    #[must_use]
    pub fn signer(&self) -> &Signer {
        &self.signer
    }

    #[must_use]
    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    /// Host URL plus `path` plus query parameters, in order.
    pub(crate) fn build_url(&self, path: &str, params: &[(&str, String)]) -> Url {
        let mut url = self.base_url.clone();
        url.set_path(path);
        if !params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in params {
                pairs.append_pair(k, v);
            }
        }
        url
    }

    /// Common signed query parameters. With `shop_id` the signature covers
    /// the shop's access token; without it the call is partner-level.
    async fn signed_params(
        &self,
        path: &str,
        shop_id: Option<i64>,
    ) -> Result<Vec<(&'static str, String)>, ShopeeError> {
        let timestamp = self.tokens.now().timestamp();
        let mut params = vec![
            ("partner_id", self.signer.partner_id().to_string()),
            ("timestamp", timestamp.to_string()),
        ];
        match shop_id {
            Some(shop_id) => {
                let access_token = self.tokens.access_token(shop_id).await?;
                let shop = shop_id.to_string();
                params.push((
                    "sign",
                    self.signer.sign(path, timestamp, &access_token, &shop),
                ));
                params.push(("access_token", access_token));
                params.push(("shop_id", shop));
            }
            None => params.push(("sign", self.signer.sign(path, timestamp, "", ""))),
        }
        Ok(params)
    }

    /// Signed GET. `extra` query parameters follow the signed ones.
    ///
    /// # Errors
    ///
    /// - [`ShopeeError::Unauthenticated`] if `shop_id` has no valid token.
    /// - [`ShopeeError::Transport`] on network failure.
    /// - [`ShopeeError::Upstream`] on a non-2xx status.
    /// - [`ShopeeError::Decode`] if the body is not JSON.
    /// - [`ShopeeError::Api`] if the envelope reports an error.
    pub async fn signed_get(
        &self,
        path: &str,
        shop_id: Option<i64>,
        extra: &[(&str, String)],
    ) -> Result<Value, ShopeeError> {
        let mut params = self.signed_params(path, shop_id).await?;
        params.extend(extra.iter().map(|(k, v)| (*k, v.clone())));
        let url = self.build_url(path, &params);
        tracing::debug!(path, ?shop_id, "shopee GET");
        let body = self.request_json(self.client.get(url), path).await?;
        Self::check_api_error(&body)?;
        Ok(body)
    }

    /// Signed POST with a JSON body.
    ///
    /// # Errors
    ///
    /// Same as [`ShopeeClient::signed_get`].
    pub async fn signed_post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        shop_id: Option<i64>,
        body: &B,
    ) -> Result<Value, ShopeeError> {
        let params = self.signed_params(path, shop_id).await?;
        let url = self.build_url(path, &params);
        tracing::debug!(path, ?shop_id, "shopee POST");
        let body = self
            .request_json(self.client.post(url).json(body), path)
            .await?;
        Self::check_api_error(&body)?;
        Ok(body)
    }

    /// Sends the request and parses the body as JSON. Non-2xx statuses are
    /// reported with the raw body so Shopee's explanation is not lost.
    async fn request_json(
        &self,
        request: RequestBuilder,
        path: &str,
    ) -> Result<Value, ShopeeError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            tracing::warn!(path, status = status.as_u16(), "shopee returned HTTP error");
            return Err(ShopeeError::Upstream {
                status: status.as_u16(),
                body,
            });
        }
        serde_json::from_str(&body).map_err(|e| ShopeeError::Decode {
            context: path.to_string(),
            source: e,
        })
    }

    /// Fails when the top-level `"error"` field is a non-empty string.
    pub(crate) fn check_api_error(body: &Value) -> Result<(), ShopeeError> {
        let code = body
            .get("error")
            .and_then(Value::as_str)
            .filter(|e| !e.is_empty());
        if let Some(code) = code {
            let message = body
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string();
            return Err(ShopeeError::Api {
                code: code.to_string(),
                message,
            });
        }
        Ok(())
    }

    /// Extracts `response` from a checked envelope.
    pub(crate) fn decode_response<T: DeserializeOwned>(
        body: Value,
        context: impl Into<String>,
    ) -> Result<Option<T>, ShopeeError> {
        let envelope: Envelope<T> =
            serde_json::from_value(body).map_err(|e| ShopeeError::Decode {
                context: context.into(),
                source: e,
            })?;
        Ok(envelope.response)
    }
}
