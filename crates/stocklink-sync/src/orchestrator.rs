//! Pushes local stock levels to Shopee.
//!
//! Candidates are processed strictly one at a time with a fixed pause after
//! every item that reached the network. A failed item never aborts a batch.

use std::sync::Arc;
use std::time::{Duration, Instant};

use stocklink_core::{FileMappingStore, MappingConfig, NewMapping, SyncCandidate};
use stocklink_db::{NewSyncLog, TableAnalysis};
use stocklink_shopee::{SellerStockGroup, ShopeeClient, ShopeeError, UpdateStockRequest};

use crate::error::SyncError;
use crate::report::{
    CronSummary, MappingInfo, MappingSetup, NextRun, PreviewEntry, PreviewStatus, ScheduledRun,
    SyncDetail, SyncOutcome, SyncPreview, SyncStatusReport, SyncSummary,
};
use crate::store::{ProductStore, SyncLog};

const SYNC_ACTION: &str = "sync_stock";
const SAMPLE_SIZE: usize = 5;

/// Builds the `update_stock` request that sets every known location of an
/// item to `stock`.
///
/// # Errors
///
/// - [`SyncError::NoStockLocations`] if `groups` is empty.
/// - [`SyncError::EmptyPayload`] if no group carries a location record.
pub fn build_stock_payload(
    item_id: i64,
    groups: &[SellerStockGroup],
    stock: i64,
) -> Result<UpdateStockRequest, SyncError> {
    if groups.is_empty() {
        return Err(SyncError::NoStockLocations { item_id });
    }
    let stock_list = stocklink_shopee::rebuild_stock_list(groups, |_| stock);
    if stock_list.is_empty() {
        return Err(SyncError::EmptyPayload { item_id });
    }
    Ok(UpdateStockRequest {
        item_id,
        stock_list,
    })
}

fn parse_item_id(raw: &str) -> Result<i64, SyncError> {
    raw.parse::<i64>().map_err(|_| SyncError::InvalidItemId {
        value: raw.to_string(),
    })
}

/// Upstream errors carry Shopee's own message; everything else its display.
fn upstream_message(context: &str, err: &ShopeeError) -> String {
    match err {
        ShopeeError::Api { message, .. } => format!("{context}: {message}"),
        ShopeeError::ItemNotFound { .. } => "Item not found in Shopee".to_string(),
        other => format!("{context}: {other}"),
    }
}

fn elapsed_ms(started: Instant) -> f64 {
    (started.elapsed().as_secs_f64() * 100_000.0).round() / 100.0
}

#[derive(Clone)]
pub struct SyncOrchestrator {
    client: ShopeeClient,
    mappings: FileMappingStore,
    products: Arc<dyn ProductStore>,
    log: Arc<dyn SyncLog>,
}

impl SyncOrchestrator {
    #[must_use]
    pub fn new(
        client: ShopeeClient,
        mappings: FileMappingStore,
        products: Arc<dyn ProductStore>,
        log: Arc<dyn SyncLog>,
    ) -> Self {
        Self {
            client,
            mappings,
            products,
            log,
        }
    }

    #[must_use]
    pub fn client(&self) -> &ShopeeClient {
        &self.client
    }

    #[must_use]
    pub fn mappings(&self) -> &FileMappingStore {
        &self.mappings
    }

    #[must_use]
    pub fn products(&self) -> &Arc<dyn ProductStore> {
        &self.products
    }

    /// # Errors
    ///
    /// Returns [`SyncError::Mapping`] if the shop has no usable mapping.
    pub fn load_mapping(&self, shop_id: i64) -> Result<MappingConfig, SyncError> {
        Ok(self.mappings.load(shop_id)?)
    }

    async fn require_token(&self, shop_id: i64) -> Result<(), SyncError> {
        self.client.tokens().access_token(shop_id).await?;
        Ok(())
    }

    /// Candidate product tables for mapping setup.
    ///
    /// # Errors
    ///
    /// Returns any error from [`ProductStore::describe_tables`].
    pub async fn analyze(&self) -> Result<Vec<TableAnalysis>, SyncError> {
        self.products.describe_tables().await
    }

    /// Saves a mapping and reports what it selects.
    ///
    /// # Errors
    ///
    /// - [`SyncError::Mapping`] if the mapping is invalid or cannot be written.
    /// - Any error from the product store when sampling.
    pub async fn setup_mapping(&self, input: NewMapping) -> Result<MappingSetup, SyncError> {
        let mapping = self.mappings.save(input)?;
        let sample_mapped_data = self
            .products
            .candidates(&mapping, Some(SAMPLE_SIZE))
            .await?;
        let total_products_found = self.products.count(&mapping).await?;
        tracing::info!(
            shop_id = mapping.shop_id,
            table = %mapping.table_name,
            total_products_found,
            "sync mapping saved"
        );
        Ok(MappingSetup {
            mapping,
            sample_mapped_data,
            total_products_found,
        })
    }

    /// Token state, table statistics, and mapping info for a shop.
    ///
    /// # Errors
    ///
    /// - [`SyncError::Mapping`] if the shop has no usable mapping.
    /// - [`SyncError::Shopee`] if the token store cannot be read.
    /// - Any error from the product store.
    pub async fn status(&self, shop_id: i64) -> Result<SyncStatusReport, SyncError> {
        let mapping = self.load_mapping(shop_id)?;
        let token_status = self.client.tokens().status(shop_id).await?;
        let sync_statistics = self.products.stats(&mapping).await?;
        Ok(SyncStatusReport {
            token_status,
            sync_statistics,
            mapping_config: MappingInfo::from(&mapping),
        })
    }

    /// Reports what a run over the first `limit` candidates would do without
    /// calling Shopee.
    ///
    /// # Errors
    ///
    /// - [`SyncError::Mapping`] if the shop has no usable mapping.
    /// - [`SyncError::Shopee`] with `Unauthenticated` if the shop has no valid token.
    /// - Any error from the product store.
    pub async fn preview(&self, shop_id: i64, limit: usize) -> Result<SyncPreview, SyncError> {
        let mapping = self.load_mapping(shop_id)?;
        self.require_token(shop_id).await?;

        let total_products = self.products.count(&mapping).await?;
        let test_results: Vec<PreviewEntry> = self
            .products
            .candidates(&mapping, Some(limit))
            .await?
            .into_iter()
            .map(PreviewEntry::of)
            .collect();
        let ready_to_sync = test_results
            .iter()
            .filter(|entry| entry.status == PreviewStatus::Ready)
            .count();

        Ok(SyncPreview {
            total_products,
            tested_products: test_results.len(),
            ready_to_sync,
            test_results,
        })
    }

    /// Syncs the first `limit` candidates, pausing `delay` after each one that
    /// reached Shopee.
    ///
    /// # Errors
    ///
    /// - [`SyncError::Mapping`] if the shop has no usable mapping.
    /// - [`SyncError::Shopee`] with `Unauthenticated` if the shop has no valid token.
    /// - Any error from the product store while listing candidates.
    pub async fn run_sync(
        &self,
        shop_id: i64,
        limit: usize,
        delay: Duration,
    ) -> Result<SyncSummary, SyncError> {
        let mapping = self.load_mapping(shop_id)?;
        self.require_token(shop_id).await?;

        let candidates = self.products.candidates(&mapping, Some(limit)).await?;
        let summary = self.run_batch(shop_id, &mapping, &candidates, delay).await;
        tracing::info!(
            shop_id,
            processed = summary.total_processed,
            successful = summary.successful,
            failed = summary.failed,
            skipped = summary.skipped,
            "sync run completed"
        );
        Ok(summary)
    }

    /// Unattended variant of [`Self::run_sync`]. A shop without a valid token
    /// is skipped rather than treated as an error.
    ///
    /// # Errors
    ///
    /// - [`SyncError::Mapping`] if the shop has no usable mapping.
    /// - [`SyncError::Shopee`] if the token store cannot be read.
    /// - Any error from the product store while listing candidates.
    pub async fn run_scheduled(
        &self,
        shop_id: i64,
        max_products: usize,
        delay: Duration,
    ) -> Result<ScheduledRun, SyncError> {
        let mapping = self.load_mapping(shop_id)?;
        if !self.client.tokens().is_valid(shop_id).await? {
            tracing::warn!(shop_id, "no valid token, scheduled sync skipped");
            return Ok(ScheduledRun::NoValidToken);
        }

        let total = self.products.count(&mapping).await?;
        let candidates = self
            .products
            .candidates(&mapping, Some(max_products))
            .await?;
        let summary = CronSummary::from(
            &self
                .run_batch(shop_id, &mapping, &candidates, delay)
                .await,
        );
        let next_run = if usize::try_from(total).unwrap_or(usize::MAX) > max_products {
            NextRun::Immediate
        } else {
            NextRun::NextScheduled
        };
        tracing::info!(
            shop_id,
            processed = summary.processed,
            successful = summary.successful,
            failed = summary.failed,
            skipped = summary.skipped,
            ?next_run,
            "scheduled sync completed"
        );
        Ok(ScheduledRun::Completed { summary, next_run })
    }

    /// Syncs a single product by its local id. The mapping filter is not
    /// applied to the lookup.
    ///
    /// # Errors
    ///
    /// - [`SyncError::Mapping`] if the shop has no usable mapping.
    /// - [`SyncError::Shopee`] with `Unauthenticated` if the shop has no valid token.
    /// - [`SyncError::ProductNotFound`] if no row has that id.
    /// - [`SyncError::MissingItemId`] if the row has no Shopee item id.
    pub async fn sync_product(
        &self,
        shop_id: i64,
        product_id: &str,
    ) -> Result<SyncOutcome, SyncError> {
        let mapping = self.load_mapping(shop_id)?;
        self.require_token(shop_id).await?;

        let candidate = self
            .products
            .candidate(&mapping, product_id)
            .await?
            .ok_or_else(|| SyncError::ProductNotFound {
                product_id: product_id.to_string(),
            })?;
        if !candidate.has_item_id() {
            return Err(SyncError::MissingItemId {
                product_id: product_id.to_string(),
            });
        }
        Ok(self.sync_one(shop_id, &mapping, &candidate).await)
    }

    /// Drives `candidates` in order. Candidates without an item id are
    /// counted as skipped and never reach Shopee.
    pub async fn run_batch(
        &self,
        shop_id: i64,
        mapping: &MappingConfig,
        candidates: &[SyncCandidate],
        delay: Duration,
    ) -> SyncSummary {
        let mut summary = SyncSummary::default();
        for candidate in candidates {
            summary.total_processed += 1;
            if !candidate.has_item_id() {
                summary.skipped += 1;
                summary
                    .details
                    .push(SyncDetail::skipped(&candidate.product_id));
                continue;
            }

            let outcome = self.sync_one(shop_id, mapping, candidate).await;
            if outcome.success {
                summary.successful += 1;
            } else {
                summary.failed += 1;
            }
            summary.details.push(SyncDetail::from(outcome));

            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
        summary
    }

    /// Pushes one candidate's stock to every location Shopee knows for the
    /// item, then records the result locally. Never returns an error: every
    /// failure is folded into the outcome and the sync log.
    pub async fn sync_one(
        &self,
        shop_id: i64,
        mapping: &MappingConfig,
        candidate: &SyncCandidate,
    ) -> SyncOutcome {
        let started = Instant::now();
        let product_id = candidate.product_id.clone();
        let shopee_item_id = candidate.shopee_item_id.clone();

        let Some(raw_item_id) = candidate.item_id() else {
            return SyncOutcome {
                success: false,
                product_id,
                shopee_item_id,
                new_stock: None,
                error: Some(crate::report::NO_ITEM_ID_REASON.to_string()),
                duration_ms: elapsed_ms(started),
            };
        };

        let result = self
            .push_stock(shop_id, mapping, candidate, raw_item_id)
            .await;

        let entry = NewSyncLog {
            shop_id,
            product_id: product_id.clone(),
            shopee_item_id: shopee_item_id.clone(),
            action: SYNC_ACTION.to_string(),
            old_stock: None,
            new_stock: result.is_ok().then_some(candidate.current_stock),
            success: result.is_ok(),
            error_message: result.as_ref().err().cloned(),
        };
        if let Err(e) = self.log.append(entry).await {
            tracing::warn!(shop_id, product_id = %product_id, error = %e, "failed to write sync log");
        }

        match result {
            Ok(()) => {
                tracing::info!(
                    shop_id,
                    product_id = %product_id,
                    item_id = raw_item_id,
                    new_stock = candidate.current_stock,
                    "stock synced"
                );
                SyncOutcome {
                    success: true,
                    product_id,
                    shopee_item_id,
                    new_stock: Some(candidate.current_stock),
                    error: None,
                    duration_ms: elapsed_ms(started),
                }
            }
            Err(message) => {
                tracing::warn!(
                    shop_id,
                    product_id = %product_id,
                    item_id = raw_item_id,
                    error = %message,
                    "stock sync failed"
                );
                SyncOutcome {
                    success: false,
                    product_id,
                    shopee_item_id,
                    new_stock: None,
                    error: Some(message),
                    duration_ms: elapsed_ms(started),
                }
            }
        }
    }

    async fn push_stock(
        &self,
        shop_id: i64,
        mapping: &MappingConfig,
        candidate: &SyncCandidate,
        raw_item_id: &str,
    ) -> Result<(), String> {
        let item_id = parse_item_id(raw_item_id).map_err(|e| e.to_string())?;

        let item = self
            .client
            .get_item(shop_id, item_id)
            .await
            .map_err(|e| upstream_message("Failed to get Shopee item info", &e))?;

        let request = build_stock_payload(item_id, item.seller_stock(), candidate.current_stock)
            .map_err(|e| match e {
                SyncError::NoStockLocations { .. } => "No stock locations found".to_string(),
                SyncError::EmptyPayload { .. } => {
                    "Could not build stock update payload".to_string()
                }
                other => other.to_string(),
            })?;

        self.client
            .update_stock(shop_id, &request)
            .await
            .map_err(|e| upstream_message("Shopee update failed", &e))?;

        self.products
            .record_stock(mapping, &candidate.product_id, candidate.current_stock)
            .await
            .map_err(|e| format!("Local stock update failed: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use stocklink_shopee::LocationStock;

    use super::*;

    fn group(locations: &[&str]) -> SellerStockGroup {
        SellerStockGroup {
            stock: locations
                .iter()
                .map(|id| LocationStock {
                    location_id: (*id).to_string(),
                    stock: 1,
                })
                .collect(),
        }
    }

    #[test]
    fn payload_sets_every_location_to_local_stock() {
        let request = build_stock_payload(999, &[group(&["IDZ", "IDY"])], 42).unwrap();
        assert_eq!(request.item_id, 999);
        assert_eq!(request.stock_list.len(), 1);
        assert_eq!(request.stock_list[0].model_id, 0);
        assert!(request.stock_list[0]
            .seller_stock
            .iter()
            .all(|s| s.stock == 42));
        assert_eq!(request.stock_list[0].seller_stock.len(), 2);
    }

    #[test]
    fn payload_requires_locations() {
        assert!(matches!(
            build_stock_payload(1, &[], 5),
            Err(SyncError::NoStockLocations { item_id: 1 })
        ));
        assert!(matches!(
            build_stock_payload(1, &[group(&[])], 5),
            Err(SyncError::EmptyPayload { item_id: 1 })
        ));
    }

    #[test]
    fn item_id_must_be_numeric() {
        assert_eq!(parse_item_id("123").unwrap(), 123);
        assert!(matches!(
            parse_item_id("12a"),
            Err(SyncError::InvalidItemId { .. })
        ));
    }

    #[test]
    fn upstream_message_prefers_shopee_message() {
        let err = ShopeeError::Api {
            code: "error_param".to_string(),
            message: "item not exist".to_string(),
        };
        assert_eq!(
            upstream_message("Shopee update failed", &err),
            "Shopee update failed: item not exist"
        );
    }
}
