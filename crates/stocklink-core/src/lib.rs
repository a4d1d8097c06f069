pub mod app_config;
pub mod config;
pub mod mapping;
pub mod products;

pub use app_config::{AppConfig, Environment, TokenBackend};
pub use config::{load_app_config, load_app_config_from_env};
pub use mapping::{
    is_valid_identifier, parse_where_condition, ColumnMappings, FileMappingStore, FilterOp,
    FilterValue, MappingConfig, MappingError, NewMapping, Predicate, TableRef,
};
pub use products::{SyncCandidate, SyncStats};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
