//! Product and shop endpoints.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;

use crate::client::ShopeeClient;
use crate::error::ShopeeError;
use crate::types::{
    rebuild_stock_list, ItemBaseInfo, ItemBaseInfoList, ItemList, ItemListEntry,
    SellerStockGroup, StockSummary, UpdateStockRequest,
};

pub const ITEM_LIST_PATH: &str = "/api/v2/product/get_item_list";
pub const ITEM_BASE_INFO_PATH: &str = "/api/v2/product/get_item_base_info";
pub const UPDATE_STOCK_PATH: &str = "/api/v2/product/update_stock";
pub const SHOP_INFO_PATH: &str = "/api/v2/shop/get_shop_info";

/// Shopee rejects larger pages.
pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemListQuery {
    pub offset: i64,
    pub page_size: i64,
    pub item_status: String,
}

impl Default for ItemListQuery {
    fn default() -> Self {
        Self {
            offset: 0,
            page_size: 20,
            item_status: "NORMAL".to_string(),
        }
    }
}

impl ItemListQuery {
    fn validate(&self) -> Result<(), ShopeeError> {
        if self.offset < 0 {
            return Err(ShopeeError::InvalidRequest(
                "offset must not be negative".to_string(),
            ));
        }
        if !(1..=MAX_PAGE_SIZE).contains(&self.page_size) {
            return Err(ShopeeError::InvalidRequest(format!(
                "page_size must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }
        if self.item_status.trim().is_empty() {
            return Err(ShopeeError::InvalidRequest(
                "item_status must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    fn params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("offset", self.offset.to_string()),
            ("page_size", self.page_size.to_string()),
            ("item_status", self.item_status.clone()),
        ]
    }
}

/// A list entry merged with its base info.
#[derive(Debug, Clone, Serialize)]
pub struct DetailedItem {
    #[serde(flatten)]
    pub item: ItemListEntry,
    pub details: Option<ItemBaseInfo>,
    pub has_details: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail_error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ItemListWithDetails {
    pub total_count: i64,
    pub has_next_page: bool,
    pub items: Vec<DetailedItem>,
}

/// Current stock of one item plus a ready-to-edit `update_stock` body.
#[derive(Debug, Clone, Serialize)]
pub struct StockHelper {
    pub item_id: i64,
    pub summary: StockSummary,
    pub seller_stock: Vec<SellerStockGroup>,
    pub update_template: UpdateStockRequest,
}

impl ShopeeClient {
    /// # Errors
    ///
    /// - [`ShopeeError::InvalidRequest`] for an out-of-range query.
    /// - Any error from [`ShopeeClient::signed_get`].
    pub async fn get_item_list(
        &self,
        shop_id: i64,
        query: &ItemListQuery,
    ) -> Result<ItemList, ShopeeError> {
        query.validate()?;
        let body = self
            .signed_get(ITEM_LIST_PATH, Some(shop_id), &query.params())
            .await?;
        let list = Self::decode_response::<ItemList>(
            body,
            format!("get_item_list(shop_id={shop_id})"),
        )?;
        Ok(list.unwrap_or_default())
    }

    /// Base info for up to 50 items in one call.
    ///
    /// # Errors
    ///
    /// - [`ShopeeError::InvalidRequest`] if `item_ids` is empty.
    /// - Any error from [`ShopeeClient::signed_get`].
    pub async fn get_item_base_info(
        &self,
        shop_id: i64,
        item_ids: &[i64],
    ) -> Result<Vec<ItemBaseInfo>, ShopeeError> {
        if item_ids.is_empty() {
            return Err(ShopeeError::InvalidRequest(
                "item_ids must contain at least one id".to_string(),
            ));
        }
        let joined = item_ids
            .iter()
            .map(i64::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let body = self
            .signed_get(
                ITEM_BASE_INFO_PATH,
                Some(shop_id),
                &[("item_id_list", joined)],
            )
            .await?;
        let list = Self::decode_response::<ItemBaseInfoList>(
            body,
            format!("get_item_base_info(shop_id={shop_id})"),
        )?;
        Ok(list.map(|l| l.item_list).unwrap_or_default())
    }

    /// Base info for a single item.
    ///
    /// # Errors
    ///
    /// - [`ShopeeError::ItemNotFound`] if Shopee returns no entry for it.
    /// - Any error from [`ShopeeClient::get_item_base_info`].
    pub async fn get_item(&self, shop_id: i64, item_id: i64) -> Result<ItemBaseInfo, ShopeeError> {
        self.get_item_base_info(shop_id, &[item_id])
            .await?
            .into_iter()
            .next()
            .ok_or(ShopeeError::ItemNotFound { shop_id, item_id })
    }

    /// Posts a stock update and returns Shopee's full response body.
    ///
    /// # Errors
    ///
    /// - [`ShopeeError::InvalidRequest`] if `stock_list` is empty.
    /// - Any error from [`ShopeeClient::signed_post`].
    pub async fn update_stock(
        &self,
        shop_id: i64,
        request: &UpdateStockRequest,
    ) -> Result<Value, ShopeeError> {
        if request.stock_list.is_empty() {
            return Err(ShopeeError::InvalidRequest(
                "stock_list must not be empty".to_string(),
            ));
        }
        let body = self
            .signed_post(UPDATE_STOCK_PATH, Some(shop_id), request)
            .await?;
        tracing::info!(shop_id, item_id = request.item_id, "shopee stock updated");
        Ok(body)
    }

    /// # Errors
    ///
    /// Any error from [`ShopeeClient::signed_get`].
    pub async fn get_shop_info(&self, shop_id: i64) -> Result<Value, ShopeeError> {
        self.signed_get(SHOP_INFO_PATH, Some(shop_id), &[]).await
    }

    /// One page of items merged with their base info. If Shopee refuses the
    /// detail call the items are still returned, each tagged with
    /// `detail_error`.
    ///
    /// # Errors
    ///
    /// Any error from the item-list call, or a non-API failure of the detail
    /// call.
    pub async fn item_list_with_details(
        &self,
        shop_id: i64,
        query: &ItemListQuery,
    ) -> Result<ItemListWithDetails, ShopeeError> {
        let list = self.get_item_list(shop_id, query).await?;
        let ids: Vec<i64> = list.item.iter().map(|i| i.item_id).collect();

        let items = if ids.is_empty() {
            Vec::new()
        } else {
            match self.get_item_base_info(shop_id, &ids).await {
                Ok(details) => {
                    let mut by_id: HashMap<i64, ItemBaseInfo> =
                        details.into_iter().map(|d| (d.item_id, d)).collect();
                    list.item
                        .into_iter()
                        .map(|item| {
                            let details = by_id.remove(&item.item_id);
                            DetailedItem {
                                has_details: details.is_some(),
                                details,
                                item,
                                detail_error: None,
                            }
                        })
                        .collect()
                }
                Err(ShopeeError::Api { message, .. }) => {
                    tracing::warn!(shop_id, %message, "item detail lookup refused");
                    list.item
                        .into_iter()
                        .map(|item| DetailedItem {
                            item,
                            details: None,
                            has_details: false,
                            detail_error: Some(format!("failed to fetch details: {message}")),
                        })
                        .collect()
                }
                Err(other) => return Err(other),
            }
        };

        Ok(ItemListWithDetails {
            total_count: list.total_count,
            has_next_page: list.has_next_page,
            items,
        })
    }

    /// Current stock for one item with an `update_stock` template that
    /// re-sends the present quantities.
    ///
    /// # Errors
    ///
    /// - [`ShopeeError::ItemNotFound`] if the item does not exist.
    /// - Any error from [`ShopeeClient::get_item_base_info`].
    pub async fn stock_helper(&self, shop_id: i64, item_id: i64) -> Result<StockHelper, ShopeeError> {
        let item = self.get_item(shop_id, item_id).await?;
        let seller_stock = item.seller_stock().to_vec();
        let summary = item
            .stock_info_v2
            .as_ref()
            .and_then(|info| info.summary_info.clone())
            .unwrap_or_default();
        let update_template = UpdateStockRequest {
            item_id,
            stock_list: rebuild_stock_list(&seller_stock, |location| location.stock),
        };
        Ok(StockHelper {
            item_id,
            summary,
            seller_stock,
            update_template,
        })
    }
}
