//! Shop authorization: partner consent URL and code-for-token exchange.

use reqwest::Url;
use serde::Serialize;
use serde_json::json;

use crate::client::ShopeeClient;
use crate::error::ShopeeError;
use crate::tokens::{ShopCredentials, DEFAULT_TOKEN_TTL_SECS};
use crate::types::TokenResponse;

pub const AUTH_PARTNER_PATH: &str = "/api/v2/shop/auth_partner";
pub const TOKEN_GET_PATH: &str = "/api/v2/auth/token/get";

/// Result of a successful code exchange.
#[derive(Debug, Clone, Serialize)]
pub struct TokenGrant {
    pub shop_id: i64,
    pub expires_in: i64,
    #[serde(skip)]
    pub credentials: ShopCredentials,
}

impl ShopeeClient {
    /// Partner-signed URL the merchant opens to authorize this app.
    #[must_use]
    pub fn auth_partner_url(&self, redirect: &str) -> Url {
        let timestamp = self.tokens().now().timestamp();
        let sign = self.signer().sign(AUTH_PARTNER_PATH, timestamp, "", "");
        self.build_url(
            AUTH_PARTNER_PATH,
            &[
                ("partner_id", self.signer().partner_id().to_string()),
                ("timestamp", timestamp.to_string()),
                ("sign", sign),
                ("redirect", redirect.to_string()),
            ],
        )
    }

    /// Exchanges an authorization `code` for shop tokens and stores them.
    ///
    /// # Errors
    ///
    /// - [`ShopeeError::Api`] if Shopee rejects the code.
    /// - [`ShopeeError::MissingToken`] if the response has no access token.
    /// - [`ShopeeError::Transport`], [`ShopeeError::Upstream`], or
    ///   [`ShopeeError::Decode`] on HTTP-level failures.
    /// - [`ShopeeError::TokenStore`] if the tokens cannot be persisted.
    pub async fn exchange_code(&self, code: &str, shop_id: i64) -> Result<TokenGrant, ShopeeError> {
        let body = json!({
            "code": code,
            "partner_id": self.signer().partner_id(),
            "shop_id": shop_id,
        });
        let response = self.signed_post(TOKEN_GET_PATH, None, &body).await?;
        let token: TokenResponse =
            serde_json::from_value(response).map_err(|e| ShopeeError::Decode {
                context: format!("token/get(shop_id={shop_id})"),
                source: e,
            })?;

        let access_token = token
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or(ShopeeError::MissingToken { shop_id })?;
        let expires_in = token
            .expire_in
            .filter(|s| *s > 0)
            .unwrap_or(DEFAULT_TOKEN_TTL_SECS);

        let credentials = self
            .tokens()
            .set(
                shop_id,
                access_token,
                token.refresh_token.unwrap_or_default(),
                Some(expires_in),
            )
            .await?;

        tracing::info!(shop_id, expires_in, "shop authorized");
        Ok(TokenGrant {
            shop_id,
            expires_in,
            credentials,
        })
    }
}
