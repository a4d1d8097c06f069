use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Where per-shop Shopee credentials are kept between calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenBackend {
    /// Process-local map; tokens are lost on restart.
    Memory,
    /// The `shop_tokens` table.
    Database,
}

impl std::fmt::Display for TokenBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenBackend::Memory => write!(f, "memory"),
            TokenBackend::Database => write!(f, "database"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub shopee_host: String,
    pub shopee_partner_id: i64,
    pub shopee_partner_key: String,
    pub shopee_redirect_url: String,
    pub mapping_dir: PathBuf,
    pub token_backend: TokenBackend,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub http_timeout_secs: u64,
    pub user_agent: String,
    pub sync_limit: usize,
    pub sync_delay_ms: u64,
    pub cron_max_products: usize,
    pub cron_delay_ms: u64,
    pub cron_schedule: Option<String>,
    pub cron_shop_ids: Vec<i64>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("database_url", &"[redacted]")
            .field("shopee_host", &self.shopee_host)
            .field("shopee_partner_id", &self.shopee_partner_id)
            .field("shopee_partner_key", &"[redacted]")
            .field("shopee_redirect_url", &self.shopee_redirect_url)
            .field("mapping_dir", &self.mapping_dir)
            .field("token_backend", &self.token_backend)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("sync_limit", &self.sync_limit)
            .field("sync_delay_ms", &self.sync_delay_ms)
            .field("cron_max_products", &self.cron_max_products)
            .field("cron_delay_ms", &self.cron_delay_ms)
            .field("cron_schedule", &self.cron_schedule)
            .field("cron_shop_ids", &self.cron_shop_ids)
            .finish()
    }
}
