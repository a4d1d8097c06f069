use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::Utc;

use super::{MappingConfig, MappingError, NewMapping};

/// Stores one `mapping_{shop_id}.json` file per shop under a directory.
#[derive(Debug, Clone)]
pub struct FileMappingStore {
    dir: PathBuf,
}

impl FileMappingStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn path_for(&self, shop_id: i64) -> PathBuf {
        self.dir.join(format!("mapping_{shop_id}.json"))
    }

    /// Validates and persists a mapping, replacing any previous one for the
    /// same shop. Both timestamps are set to now.
    ///
    /// The file is written to a temporary sibling and renamed into place so
    /// readers never observe a half-written configuration.
    ///
    /// # Errors
    ///
    /// - [`MappingError::Validation`] if the input fails validation.
    /// - [`MappingError::Io`] if the directory or file cannot be written.
    pub fn save(&self, mapping: NewMapping) -> Result<MappingConfig, MappingError> {
        mapping.validate()?;

        let now = Utc::now();
        let config = MappingConfig {
            shop_id: mapping.shop_id,
            table_name: mapping.table_name.trim().to_string(),
            column_mappings: mapping.column_mappings,
            where_condition: mapping
                .where_condition
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty()),
            created_at: now,
            updated_at: now,
        };

        fs::create_dir_all(&self.dir).map_err(|source| MappingError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let path = self.path_for(config.shop_id);
        let tmp = path.with_extension("json.tmp");
        let body = serde_json::to_vec_pretty(&config)?;
        fs::write(&tmp, body).map_err(|source| MappingError::Io {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &path).map_err(|source| MappingError::Io {
            path: path.clone(),
            source,
        })?;

        tracing::info!(
            shop_id = config.shop_id,
            table = %config.table_name,
            path = %path.display(),
            "mapping configuration saved"
        );
        Ok(config)
    }

    /// Loads the mapping for `shop_id`.
    ///
    /// # Errors
    ///
    /// - [`MappingError::NotFound`] if no file exists for the shop.
    /// - [`MappingError::Invalid`] if the file cannot be parsed or names a
    ///   different shop.
    /// - [`MappingError::Io`] for other read failures.
    pub fn load(&self, shop_id: i64) -> Result<MappingConfig, MappingError> {
        let path = self.path_for(shop_id);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(MappingError::NotFound { shop_id });
            }
            Err(source) => return Err(MappingError::Io { path, source }),
        };

        let config: MappingConfig =
            serde_json::from_str(&raw).map_err(|e| MappingError::Invalid {
                shop_id,
                reason: e.to_string(),
            })?;

        if config.shop_id != shop_id {
            return Err(MappingError::Invalid {
                shop_id,
                reason: format!("file belongs to shop {}", config.shop_id),
            });
        }

        Ok(config)
    }
}
