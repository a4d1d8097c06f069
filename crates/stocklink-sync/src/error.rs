use stocklink_core::MappingError;
use stocklink_db::DbError;
use stocklink_shopee::ShopeeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Mapping(#[from] MappingError),

    #[error(transparent)]
    Shopee(#[from] ShopeeError),

    #[error(transparent)]
    Db(#[from] DbError),

    #[error("product {product_id} not found")]
    ProductNotFound { product_id: String },

    #[error("product {product_id} has no Shopee item id")]
    MissingItemId { product_id: String },

    #[error("invalid Shopee item id {value:?}")]
    InvalidItemId { value: String },

    #[error("Shopee item {item_id} has no stock locations")]
    NoStockLocations { item_id: i64 },

    #[error("could not build stock update payload for item {item_id}")]
    EmptyPayload { item_id: i64 },
}
