//! Per-shop OAuth credentials and the store they live in.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::error::ShopeeError;

/// Lifetime applied when Shopee omits `expire_in` (4 hours).
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 14_400;

/// A token this close to expiry is reported as needing refresh.
pub const REFRESH_WINDOW_SECS: i64 = 300;

/// Source of "now"; injectable so expiry logic can be tested.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[must_use]
pub fn system_clock() -> Clock {
    Arc::new(Utc::now)
}

#[derive(Debug, Error)]
#[error("token store unavailable: {0}")]
pub struct TokenStoreError(String);

impl TokenStoreError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Access credentials for one shop.
#[derive(Clone, PartialEq, Eq)]
pub struct ShopCredentials {
    pub shop_id: i64,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl std::fmt::Debug for ShopCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopCredentials")
            .field("shop_id", &self.shop_id)
            .field("access_token", &"[redacted]")
            .field("refresh_token", &"[redacted]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl ShopCredentials {
    #[must_use]
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.access_token.is_empty() && self.expires_at > now
    }

    #[must_use]
    pub fn needs_refresh_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - now <= Duration::seconds(REFRESH_WINDOW_SECS)
    }
}

/// Token state as reported to operators. Never carries token values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenStatus {
    pub shop_id: i64,
    pub has_token: bool,
    pub has_refresh_token: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub expires_in_seconds: i64,
    pub is_valid: bool,
    pub needs_refresh: bool,
}

impl TokenStatus {
    fn absent(shop_id: i64) -> Self {
        Self {
            shop_id,
            has_token: false,
            has_refresh_token: false,
            expires_at: None,
            expires_in_seconds: 0,
            is_valid: false,
            needs_refresh: true,
        }
    }

    fn of(credentials: &ShopCredentials, now: DateTime<Utc>) -> Self {
        Self {
            shop_id: credentials.shop_id,
            has_token: !credentials.access_token.is_empty(),
            has_refresh_token: !credentials.refresh_token.is_empty(),
            expires_at: Some(credentials.expires_at),
            expires_in_seconds: (credentials.expires_at - now).num_seconds().max(0),
            is_valid: credentials.is_valid_at(now),
            needs_refresh: credentials.needs_refresh_at(now),
        }
    }
}

/// Durable home for shop credentials.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn get(&self, shop_id: i64) -> Result<Option<ShopCredentials>, TokenStoreError>;

    /// Inserts or replaces the credentials for `credentials.shop_id`.
    async fn put(&self, credentials: ShopCredentials) -> Result<(), TokenStoreError>;

    async fn list(&self) -> Result<Vec<ShopCredentials>, TokenStoreError>;
}

/// Process-local store. Lost on restart.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    inner: RwLock<HashMap<i64, ShopCredentials>>,
}

impl MemoryTokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn get(&self, shop_id: i64) -> Result<Option<ShopCredentials>, TokenStoreError> {
        Ok(self.inner.read().await.get(&shop_id).cloned())
    }

    async fn put(&self, credentials: ShopCredentials) -> Result<(), TokenStoreError> {
        self.inner
            .write()
            .await
            .insert(credentials.shop_id, credentials);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<ShopCredentials>, TokenStoreError> {
        let mut all: Vec<_> = self.inner.read().await.values().cloned().collect();
        all.sort_by_key(|c| c.shop_id);
        Ok(all)
    }
}

/// Expiry-aware facade over a [`TokenStore`].
#[derive(Clone)]
pub struct TokenManager {
    store: Arc<dyn TokenStore>,
    clock: Clock,
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager").finish_non_exhaustive()
    }
}

impl TokenManager {
    #[must_use]
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        Self::with_clock(store, system_clock())
    }

    #[must_use]
    pub fn with_clock(store: Arc<dyn TokenStore>, clock: Clock) -> Self {
        Self { store, clock }
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    /// Records fresh credentials. `expire_in_secs` falls back to
    /// [`DEFAULT_TOKEN_TTL_SECS`] when absent or non-positive.
    ///
    /// # Errors
    ///
    /// Returns [`ShopeeError::TokenStore`] if the store rejects the write.
    pub async fn set(
        &self,
        shop_id: i64,
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        expire_in_secs: Option<i64>,
    ) -> Result<ShopCredentials, ShopeeError> {
        let ttl = expire_in_secs
            .filter(|s| *s > 0)
            .unwrap_or(DEFAULT_TOKEN_TTL_SECS);
        let credentials = ShopCredentials {
            shop_id,
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            expires_at: self.now() + Duration::seconds(ttl),
        };
        self.store.put(credentials.clone()).await?;
        tracing::info!(shop_id, expires_at = %credentials.expires_at, "shop access token stored");
        Ok(credentials)
    }

    /// # Errors
    ///
    /// Returns [`ShopeeError::TokenStore`] if the store cannot be read.
    pub async fn get(&self, shop_id: i64) -> Result<Option<ShopCredentials>, ShopeeError> {
        Ok(self.store.get(shop_id).await?)
    }

    /// `true` iff a non-empty token exists and has not expired.
    ///
    /// # Errors
    ///
    /// Returns [`ShopeeError::TokenStore`] if the store cannot be read.
    pub async fn is_valid(&self, shop_id: i64) -> Result<bool, ShopeeError> {
        let now = self.now();
        Ok(self
            .get(shop_id)
            .await?
            .is_some_and(|c| c.is_valid_at(now)))
    }

    /// `true` when no token exists or expiry is within
    /// [`REFRESH_WINDOW_SECS`].
    ///
    /// # Errors
    ///
    /// Returns [`ShopeeError::TokenStore`] if the store cannot be read.
    pub async fn needs_refresh(&self, shop_id: i64) -> Result<bool, ShopeeError> {
        let now = self.now();
        Ok(self
            .get(shop_id)
            .await?
            .is_none_or(|c| c.needs_refresh_at(now)))
    }

    /// # Errors
    ///
    /// Returns [`ShopeeError::TokenStore`] if the store cannot be read.
    pub async fn status(&self, shop_id: i64) -> Result<TokenStatus, ShopeeError> {
        let now = self.now();
        Ok(match self.get(shop_id).await? {
            Some(credentials) => TokenStatus::of(&credentials, now),
            None => TokenStatus::absent(shop_id),
        })
    }

    /// Status of every shop that has ever been authorized.
    ///
    /// # Errors
    ///
    /// Returns [`ShopeeError::TokenStore`] if the store cannot be read.
    pub async fn statuses(&self) -> Result<Vec<TokenStatus>, ShopeeError> {
        let now = self.now();
        Ok(self
            .store
            .list()
            .await?
            .iter()
            .map(|c| TokenStatus::of(c, now))
            .collect())
    }

    /// Returns a usable access token or explains why there is none.
    ///
    /// # Errors
    ///
    /// - [`ShopeeError::Unauthenticated`] if the shop has no token or it has
    ///   expired.
    /// - [`ShopeeError::TokenStore`] if the store cannot be read.
    pub async fn access_token(&self, shop_id: i64) -> Result<String, ShopeeError> {
        let now = self.now();
        match self.get(shop_id).await? {
            Some(c) if c.is_valid_at(now) => Ok(c.access_token),
            Some(_) => Err(ShopeeError::Unauthenticated {
                shop_id,
                reason: "access token expired; re-authorize the shop".to_string(),
            }),
            None => Err(ShopeeError::Unauthenticated {
                shop_id,
                reason: "no access token; authorize the shop first".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::TimeZone;

    use super::*;

    fn fixed_clock(start: DateTime<Utc>) -> (Clock, Arc<Mutex<DateTime<Utc>>>) {
        let now = Arc::new(Mutex::new(start));
        let handle = Arc::clone(&now);
        let clock: Clock = Arc::new(move || *handle.lock().unwrap());
        (clock, now)
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap()
    }

    fn manager() -> (TokenManager, Arc<Mutex<DateTime<Utc>>>) {
        let (clock, now) = fixed_clock(t0());
        (
            TokenManager::with_clock(Arc::new(MemoryTokenStore::new()), clock),
            now,
        )
    }

    #[tokio::test]
    async fn unknown_shop_is_invalid_and_needs_refresh() {
        let (tokens, _) = manager();
        assert!(!tokens.is_valid(99).await.unwrap());
        assert!(tokens.needs_refresh(99).await.unwrap());
        let status = tokens.status(99).await.unwrap();
        assert!(!status.has_token);
        assert!(status.expires_at.is_none());
    }

    #[tokio::test]
    async fn set_defaults_ttl_to_four_hours() {
        let (tokens, _) = manager();
        let creds = tokens.set(7, "acc", "ref", None).await.unwrap();
        assert_eq!(creds.expires_at, t0() + Duration::seconds(14_400));

        let creds = tokens.set(7, "acc", "ref", Some(0)).await.unwrap();
        assert_eq!(creds.expires_at, t0() + Duration::seconds(14_400));
    }

    #[tokio::test]
    async fn fresh_token_is_valid_and_not_due_for_refresh() {
        let (tokens, _) = manager();
        tokens.set(7, "acc", "ref", Some(3_600)).await.unwrap();
        assert!(tokens.is_valid(7).await.unwrap());
        assert!(!tokens.needs_refresh(7).await.unwrap());
        assert_eq!(tokens.access_token(7).await.unwrap(), "acc");
    }

    #[tokio::test]
    async fn token_inside_refresh_window_is_still_valid() {
        let (tokens, now) = manager();
        tokens.set(7, "acc", "ref", Some(3_600)).await.unwrap();
        *now.lock().unwrap() = t0() + Duration::seconds(3_600 - 300);
        assert!(tokens.is_valid(7).await.unwrap());
        assert!(tokens.needs_refresh(7).await.unwrap());
    }

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let (tokens, now) = manager();
        tokens.set(7, "acc", "ref", Some(60)).await.unwrap();
        *now.lock().unwrap() = t0() + Duration::seconds(60);
        assert!(!tokens.is_valid(7).await.unwrap());
        assert!(matches!(
            tokens.access_token(7).await,
            Err(ShopeeError::Unauthenticated { shop_id: 7, .. })
        ));
        let status = tokens.status(7).await.unwrap();
        assert!(status.has_token);
        assert_eq!(status.expires_in_seconds, 0);
    }

    #[tokio::test]
    async fn empty_access_token_is_never_valid() {
        let (tokens, _) = manager();
        tokens.set(7, "", "ref", None).await.unwrap();
        assert!(!tokens.is_valid(7).await.unwrap());
    }

    #[tokio::test]
    async fn set_replaces_previous_credentials() {
        let (tokens, _) = manager();
        tokens.set(7, "old", "r1", None).await.unwrap();
        tokens.set(7, "new", "r2", None).await.unwrap();
        assert_eq!(tokens.access_token(7).await.unwrap(), "new");
        assert_eq!(tokens.statuses().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn statuses_are_sorted_by_shop() {
        let (tokens, _) = manager();
        tokens.set(30, "a", "r", None).await.unwrap();
        tokens.set(10, "b", "r", None).await.unwrap();
        let ids: Vec<i64> = tokens
            .statuses()
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.shop_id)
            .collect();
        assert_eq!(ids, vec![10, 30]);
    }

    #[test]
    fn credentials_debug_hides_tokens() {
        let creds = ShopCredentials {
            shop_id: 1,
            access_token: "secret-access".to_string(),
            refresh_token: "secret-refresh".to_string(),
            expires_at: t0(),
        };
        let rendered = format!("{creds:?}");
        assert!(!rendered.contains("secret-access"));
        assert!(!rendered.contains("secret-refresh"));
    }
}
