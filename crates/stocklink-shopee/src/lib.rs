pub mod auth;
pub mod client;
pub mod error;
pub mod product;
pub mod signer;
pub mod tokens;
pub mod types;

pub use auth::TokenGrant;
pub use client::{ShopeeClient, DEFAULT_HOST};
pub use error::ShopeeError;
pub use product::{DetailedItem, ItemListQuery, ItemListWithDetails, StockHelper};
pub use signer::Signer;
pub use tokens::{
    system_clock, Clock, MemoryTokenStore, ShopCredentials, TokenManager, TokenStatus,
    TokenStore, TokenStoreError, DEFAULT_TOKEN_TTL_SECS, REFRESH_WINDOW_SECS,
};
pub use types::{
    rebuild_stock_list, ItemBaseInfo, ItemList, ItemListEntry, LocationStock, SellerStockGroup,
    SellerStockUpdate, StockInfoV2, StockListEntry, StockSummary, UpdateStockRequest,
};
