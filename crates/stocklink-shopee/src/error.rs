use thiserror::Error;

use crate::tokens::TokenStoreError;

/// Errors returned by the Shopee Open Platform client.
#[derive(Debug, Error)]
pub enum ShopeeError {
    /// Network, timeout, or TLS failure from the underlying HTTP client.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Shopee answered with a non-2xx HTTP status.
    #[error("upstream returned HTTP {status}: {body}")]
    Upstream { status: u16, body: String },

    /// Shopee answered 2xx but the envelope carried a non-empty `error`.
    #[error("Shopee API error {code}: {message}")]
    Api { code: String, message: String },

    /// The response body was not the JSON shape we expected.
    #[error("invalid JSON response for {context}: {source}")]
    Decode {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// No usable access token for the shop.
    #[error("shop {shop_id} is not authorized: {reason}")]
    Unauthenticated { shop_id: i64, reason: String },

    /// The token exchange succeeded at HTTP level but returned no token.
    #[error("token exchange for shop {shop_id} returned no access token")]
    MissingToken { shop_id: i64 },

    #[error("item {item_id} not found in shop {shop_id}")]
    ItemNotFound { shop_id: i64, item_id: i64 },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("invalid base URL {url:?}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error(transparent)]
    TokenStore(#[from] TokenStoreError),
}
