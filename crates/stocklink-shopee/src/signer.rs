//! Request signing for the Shopee Open Platform v2 API.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Partner credentials plus the signing routine every v2 call needs.
#[derive(Clone)]
pub struct Signer {
    partner_id: i64,
    partner_key: String,
}

impl std::fmt::Debug for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signer")
            .field("partner_id", &self.partner_id)
            .field("partner_key", &"[redacted]")
            .finish()
    }
}

impl Signer {
    #[must_use]
    pub fn new(partner_id: i64, partner_key: impl Into<String>) -> Self {
        Self {
            partner_id,
            partner_key: partner_key.into(),
        }
    }

    #[must_use]
    pub fn partner_id(&self) -> i64 {
        self.partner_id
    }

    /// Lowercase hex HMAC-SHA256 of
    /// `partner_id || path || timestamp || access_token || shop_id`.
    ///
    /// Partner-level calls pass empty strings for `access_token` and `shop_id`.
    #[must_use]
    pub fn sign(&self, path: &str, timestamp: i64, access_token: &str, shop_id: &str) -> String {
        let base = format!(
            "{}{path}{timestamp}{access_token}{shop_id}",
            self.partner_id
        );
        let mut mac = HmacSha256::new_from_slice(self.partner_key.as_bytes())
            .expect("HMAC accepts any key length");
        mac.update(base.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}
