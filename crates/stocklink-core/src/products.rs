use serde::{Deserialize, Serialize};

/// A local product assembled through a shop's [`crate::MappingConfig`],
/// eligible for a stock push to Shopee.
///
/// Every field is read through the mapping's column aliases; none of them
/// are persisted as an entity of their own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncCandidate {
    /// Local primary key rendered as text.
    pub product_id: String,
    pub product_name: Option<String>,
    pub current_stock: i64,
    /// Shopee numeric item id as text; `None`, blank or `"0"` when the
    /// product is not listed on Shopee.
    pub shopee_item_id: Option<String>,
    pub sku: Option<String>,
    /// Last stock update rendered as text, whatever the local column type.
    pub last_updated: Option<String>,
}

impl SyncCandidate {
    /// Returns the trimmed Shopee item id when one is present. Local tables
    /// often store unlisted products as `0`, which counts as absent.
    #[must_use]
    pub fn item_id(&self) -> Option<&str> {
        self.shopee_item_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty() && *s != "0")
    }

    /// Returns `true` when the product carries a usable Shopee item id.
    #[must_use]
    pub fn has_item_id(&self) -> bool {
        self.item_id().is_some()
    }
}

/// Aggregate counts over a mapped product table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStats {
    pub total_products: i64,
    pub has_shopee_id: i64,
    pub in_stock: i64,
}
