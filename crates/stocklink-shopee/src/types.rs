//! Shopee Open Platform v2 request and response types.
//!
//! Every v2 response is wrapped in `{"error": "", "message": "", "request_id":
//! "...", "response": {...}}`; [`Envelope`] captures that pattern. Item types
//! keep unknown fields in `extra` so callers can pass them through untouched.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub request_id: Option<String>,
    pub response: Option<T>,
}

// ---------------------------------------------------------------------------
// auth/token/get
// ---------------------------------------------------------------------------

/// Token exchange responses put the fields at the top level, not under
/// `response`.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expire_in: Option<i64>,
}

// ---------------------------------------------------------------------------
// product/get_item_list
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemList {
    #[serde(default)]
    pub item: Vec<ItemListEntry>,
    #[serde(default)]
    pub total_count: i64,
    #[serde(default)]
    pub has_next_page: bool,
    #[serde(default)]
    pub next_offset: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemListEntry {
    pub item_id: i64,
    #[serde(default)]
    pub item_status: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ---------------------------------------------------------------------------
// product/get_item_base_info
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ItemBaseInfoList {
    #[serde(default)]
    pub item_list: Vec<ItemBaseInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemBaseInfo {
    pub item_id: i64,
    #[serde(default)]
    pub item_name: Option<String>,
    #[serde(default)]
    pub item_sku: Option<String>,
    #[serde(default)]
    pub stock_info_v2: Option<StockInfoV2>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ItemBaseInfo {
    /// Seller-stock groups, empty when the item carries no stock block.
    #[must_use]
    pub fn seller_stock(&self) -> &[SellerStockGroup] {
        self.stock_info_v2
            .as_ref()
            .map(|info| info.seller_stock.as_slice())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StockInfoV2 {
    #[serde(default)]
    pub summary_info: Option<StockSummary>,
    #[serde(default)]
    pub seller_stock: Vec<SellerStockGroup>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockSummary {
    #[serde(default)]
    pub total_reserved_stock: i64,
    #[serde(default)]
    pub total_available_stock: i64,
}

/// One seller-stock group. Groups whose `stock` is not an array carry no
/// location records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SellerStockGroup {
    #[serde(default, deserialize_with = "locations_or_empty")]
    pub stock: Vec<LocationStock>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationStock {
    pub location_id: String,
    #[serde(default)]
    pub stock: i64,
}

fn locations_or_empty<'de, D>(deserializer: D) -> Result<Vec<LocationStock>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::Array(entries) => Ok(entries
            .into_iter()
            .filter_map(|entry| serde_json::from_value(entry).ok())
            .collect()),
        _ => Ok(Vec::new()),
    }
}

// ---------------------------------------------------------------------------
// product/update_stock
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateStockRequest {
    pub item_id: i64,
    pub stock_list: Vec<StockListEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockListEntry {
    #[serde(default)]
    pub model_id: i64,
    pub seller_stock: Vec<SellerStockUpdate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SellerStockUpdate {
    pub location_id: String,
    pub stock: i64,
}

/// Rebuilds an update payload from an item's current seller-stock groups,
/// one `model_id = 0` entry per group that has location records. `stock`
/// decides the quantity written for each location.
pub fn rebuild_stock_list(
    groups: &[SellerStockGroup],
    stock: impl Fn(&LocationStock) -> i64,
) -> Vec<StockListEntry> {
    groups
        .iter()
        .filter(|group| !group.stock.is_empty())
        .map(|group| StockListEntry {
            model_id: 0,
            seller_stock: group
                .stock
                .iter()
                .map(|location| SellerStockUpdate {
                    location_id: location.location_id.clone(),
                    stock: stock(location),
                })
                .collect(),
        })
        .collect()
}
