//! Serializable results of sync operations.

use chrono::{DateTime, Utc};
use serde::Serialize;
use stocklink_core::{MappingConfig, SyncCandidate, SyncStats};
use stocklink_shopee::TokenStatus;

pub(crate) const NO_ITEM_ID_REASON: &str = "No Shopee item ID";

/// Result of pushing one product's stock.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncOutcome {
    pub success: bool,
    pub product_id: String,
    pub shopee_item_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_stock: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: f64,
}

/// Per-candidate entry in a batch summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SyncDetail {
    Success {
        product_id: String,
        shopee_item_id: Option<String>,
        new_stock: Option<i64>,
        duration_ms: f64,
    },
    Failed {
        product_id: String,
        shopee_item_id: Option<String>,
        error: Option<String>,
        duration_ms: f64,
    },
    Skipped {
        product_id: String,
        reason: String,
    },
}

impl SyncDetail {
    pub(crate) fn skipped(product_id: &str) -> Self {
        Self::Skipped {
            product_id: product_id.to_string(),
            reason: NO_ITEM_ID_REASON.to_string(),
        }
    }
}

impl From<SyncOutcome> for SyncDetail {
    fn from(outcome: SyncOutcome) -> Self {
        if outcome.success {
            Self::Success {
                product_id: outcome.product_id,
                shopee_item_id: outcome.shopee_item_id,
                new_stock: outcome.new_stock,
                duration_ms: outcome.duration_ms,
            }
        } else {
            Self::Failed {
                product_id: outcome.product_id,
                shopee_item_id: outcome.shopee_item_id,
                error: outcome.error,
                duration_ms: outcome.duration_ms,
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SyncSummary {
    pub total_processed: usize,
    pub successful: usize,
    pub failed: usize,
    pub skipped: usize,
    pub details: Vec<SyncDetail>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PreviewStatus {
    Ready,
    Skip,
}

/// Dry-run view of one candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreviewEntry {
    #[serde(flatten)]
    pub candidate: SyncCandidate,
    pub status: PreviewStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl PreviewEntry {
    #[must_use]
    pub fn of(candidate: SyncCandidate) -> Self {
        if candidate.has_item_id() {
            let action = format!("Would update stock to {}", candidate.current_stock);
            Self {
                candidate,
                status: PreviewStatus::Ready,
                action: Some(action),
                reason: None,
            }
        } else {
            Self {
                candidate,
                status: PreviewStatus::Skip,
                action: None,
                reason: Some(NO_ITEM_ID_REASON.to_string()),
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncPreview {
    pub total_products: i64,
    pub tested_products: usize,
    pub ready_to_sync: usize,
    pub test_results: Vec<PreviewEntry>,
}

/// Counts from a scheduled run; per-item detail goes to the log instead.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CronSummary {
    pub processed: usize,
    pub successful: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl From<&SyncSummary> for CronSummary {
    fn from(summary: &SyncSummary) -> Self {
        Self {
            processed: summary.total_processed,
            successful: summary.successful,
            failed: summary.failed,
            skipped: summary.skipped,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NextRun {
    /// More candidates exist than the run was allowed to process.
    Immediate,
    NextScheduled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduledRun {
    /// The shop has no usable token; nothing was attempted.
    NoValidToken,
    Completed { summary: CronSummary, next_run: NextRun },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MappingInfo {
    pub table_name: String,
    pub configured_at: DateTime<Utc>,
}

impl From<&MappingConfig> for MappingInfo {
    fn from(mapping: &MappingConfig) -> Self {
        Self {
            table_name: mapping.table_name.clone(),
            configured_at: mapping.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncStatusReport {
    pub token_status: TokenStatus,
    pub sync_statistics: SyncStats,
    pub mapping_config: MappingInfo,
}

/// What a mapping save found in the local table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MappingSetup {
    pub mapping: MappingConfig,
    pub sample_mapped_data: Vec<SyncCandidate>,
    pub total_products_found: i64,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn candidate(item: Option<&str>) -> SyncCandidate {
        SyncCandidate {
            product_id: "P1".to_string(),
            product_name: Some("Kopi".to_string()),
            current_stock: 7,
            shopee_item_id: item.map(str::to_string),
            sku: None,
            last_updated: None,
        }
    }

    #[test]
    fn preview_entry_marks_ready_and_skip() {
        let ready = PreviewEntry::of(candidate(Some("999")));
        assert_eq!(ready.status, PreviewStatus::Ready);
        assert_eq!(ready.action.as_deref(), Some("Would update stock to 7"));

        let skip = PreviewEntry::of(candidate(Some("  ")));
        assert_eq!(skip.status, PreviewStatus::Skip);
        assert_eq!(skip.reason.as_deref(), Some(NO_ITEM_ID_REASON));
    }

    #[test]
    fn preview_entry_skips_zero_item_id() {
        let entry = PreviewEntry::of(candidate(Some("0")));
        assert_eq!(entry.status, PreviewStatus::Skip);
        assert!(entry.action.is_none());
        assert_eq!(entry.reason.as_deref(), Some(NO_ITEM_ID_REASON));
    }

    #[test]
    fn preview_entry_flattens_candidate_fields() {
        let value = serde_json::to_value(PreviewEntry::of(candidate(None))).unwrap();
        assert_eq!(value["product_id"], "P1");
        assert_eq!(value["status"], "skip");
        assert!(value.get("action").is_none());
    }

    #[test]
    fn detail_is_tagged_by_status() {
        let value = serde_json::to_value(SyncDetail::skipped("P9")).unwrap();
        assert_eq!(
            value,
            json!({"status": "skipped", "product_id": "P9", "reason": "No Shopee item ID"})
        );

        let failed = SyncDetail::from(SyncOutcome {
            success: false,
            product_id: "P1".to_string(),
            shopee_item_id: Some("1".to_string()),
            new_stock: None,
            error: Some("boom".to_string()),
            duration_ms: 1.5,
        });
        let value = serde_json::to_value(failed).unwrap();
        assert_eq!(value["status"], "failed");
        assert_eq!(value["error"], "boom");
    }

    #[test]
    fn next_run_serializes_snake_case() {
        assert_eq!(
            serde_json::to_value(NextRun::NextScheduled).unwrap(),
            json!("next_scheduled")
        );
    }
}
