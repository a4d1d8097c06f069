//! Per-shop mapping from a local product table onto the canonical product
//! fields used by the sync pipeline.
//!
//! Column and table names end up inside generated SQL, so every identifier is
//! checked against [`is_valid_identifier`] before it is accepted, and the
//! optional row filter is parsed into bound [`Predicate`]s instead of being
//! spliced into query text.

mod filter;
mod store;

use std::path::PathBuf;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use filter::{parse_where_condition, FilterOp, FilterValue, Predicate};
pub use store::FileMappingStore;

static IDENTIFIER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,62}$").expect("valid identifier regex")
});

#[derive(Debug, Error)]
pub enum MappingError {
    #[error("mapping configuration not found for shop {shop_id}")]
    NotFound { shop_id: i64 },

    #[error("invalid mapping configuration for shop {shop_id}: {reason}")]
    Invalid { shop_id: i64, reason: String },

    #[error("{0}")]
    Validation(String),

    #[error("mapping file I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize mapping configuration: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Returns `true` if `name` is a plain SQL identifier: a letter or underscore
/// followed by up to 62 letters, digits, or underscores.
#[must_use]
pub fn is_valid_identifier(name: &str) -> bool {
    IDENTIFIER_RE.is_match(name)
}

/// Canonical field → local column name.
///
/// Missing keys deserialize to empty strings so validation can name the
/// exact field that is absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMappings {
    #[serde(default)]
    pub product_id: String,
    #[serde(default)]
    pub product_name: String,
    #[serde(default)]
    pub stock_quantity: String,
    #[serde(default)]
    pub shopee_item_id: String,
    #[serde(default)]
    pub sku: String,
    #[serde(default)]
    pub last_updated: String,
}

impl ColumnMappings {
    /// `(canonical field, local column)` pairs in declaration order.
    #[must_use]
    pub fn entries(&self) -> [(&'static str, &str); 6] {
        [
            ("product_id", &self.product_id),
            ("product_name", &self.product_name),
            ("stock_quantity", &self.stock_quantity),
            ("shopee_item_id", &self.shopee_item_id),
            ("sku", &self.sku),
            ("last_updated", &self.last_updated),
        ]
    }

    /// Checks that every canonical field maps to a plain identifier.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::Validation`] naming the first missing or
    /// malformed column.
    pub fn validate(&self) -> Result<(), MappingError> {
        for (field, column) in self.entries() {
            let column = column.trim();
            if column.is_empty() {
                return Err(MappingError::Validation(format!(
                    "missing required column mapping: {field}"
                )));
            }
            if !is_valid_identifier(column) {
                return Err(MappingError::Validation(format!(
                    "column mapping {field} = {column:?} is not a valid identifier"
                )));
            }
        }
        Ok(())
    }
}

/// A validated, optionally schema-qualified table name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub schema: Option<String>,
    pub name: String,
}

impl TableRef {
    /// Parses `table` or `schema.table`.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::Validation`] when either part is not a plain
    /// identifier.
    pub fn parse(raw: &str) -> Result<Self, MappingError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(MappingError::Validation(
                "missing required field: table_name".to_string(),
            ));
        }
        let (schema, name) = match raw.split_once('.') {
            Some((schema, name)) => (Some(schema), name),
            None => (None, raw),
        };
        let valid = schema.is_none_or(is_valid_identifier) && is_valid_identifier(name);
        if !valid {
            return Err(MappingError::Validation(format!(
                "table_name {raw:?} is not a valid identifier"
            )));
        }
        Ok(Self {
            schema: schema.map(str::to_string),
            name: name.to_string(),
        })
    }

    /// Double-quoted form suitable for SQL text.
    #[must_use]
    pub fn quoted(&self) -> String {
        match &self.schema {
            Some(schema) => format!("\"{schema}\".\"{}\"", self.name),
            None => format!("\"{}\"", self.name),
        }
    }
}

/// Input to [`FileMappingStore::save`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMapping {
    pub shop_id: i64,
    pub table_name: String,
    pub column_mappings: ColumnMappings,
    #[serde(default)]
    pub where_condition: Option<String>,
}

impl NewMapping {
    /// Runs every check a stored mapping must pass.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::Validation`] describing the first problem.
    pub fn validate(&self) -> Result<(), MappingError> {
        if self.shop_id <= 0 {
            return Err(MappingError::Validation(
                "shop_id must be a positive integer".to_string(),
            ));
        }
        TableRef::parse(&self.table_name)?;
        self.column_mappings.validate()?;
        if let Some(condition) = &self.where_condition {
            parse_where_condition(condition)?;
        }
        Ok(())
    }
}

/// A shop's persisted mapping configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingConfig {
    pub shop_id: i64,
    pub table_name: String,
    pub column_mappings: ColumnMappings,
    #[serde(default)]
    pub where_condition: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MappingConfig {
    /// Validated table reference.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::Validation`] if the stored table name is not a
    /// plain identifier.
    pub fn table_ref(&self) -> Result<TableRef, MappingError> {
        TableRef::parse(&self.table_name)
    }

    /// Parsed row filter; empty when no condition is configured.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::Validation`] if the stored condition does not
    /// fit the accepted grammar.
    pub fn predicates(&self) -> Result<Vec<Predicate>, MappingError> {
        match &self.where_condition {
            Some(condition) => parse_where_condition(condition),
            None => Ok(Vec::new()),
        }
    }
}
