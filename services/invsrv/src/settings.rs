//! Sync settings
//!
//! Loaded from a YAML file with every field optional; unset fields take the
//! defaults below. Validation runs at load time so a bad file fails the
//! service start instead of the first sync.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::cleanup::DEFAULT_CLEANUP_CONCURRENCY;
use crate::error::{Result, StockError};
use crate::model::KeyMode;

const DEFAULT_IDENTIFIER_LABEL: &str = "Item ID";
const DEFAULT_IDENTIFIER_WIDTH_PX: u32 = 160;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    /// Matching strategy, fixed for the service's lifetime
    pub key_mode: KeyMode,
    /// Header label of the identifier column
    pub identifier_label: String,
    /// Pixel width given to a freshly provisioned identifier column
    pub identifier_width_px: u32,
    /// Worker bound for asset cleanup batches
    pub cleanup_concurrency: usize,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            key_mode: KeyMode::Address,
            identifier_label: DEFAULT_IDENTIFIER_LABEL.to_string(),
            identifier_width_px: DEFAULT_IDENTIFIER_WIDTH_PX,
            cleanup_concurrency: DEFAULT_CLEANUP_CONCURRENCY,
        }
    }
}

impl SyncSettings {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let settings: Self = serde_yaml::from_str(&content)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.identifier_label.trim().is_empty() {
            return Err(StockError::InvalidConfig {
                field: "identifier_label".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        if !(20..=500).contains(&self.identifier_width_px) {
            return Err(StockError::InvalidConfig {
                field: "identifier_width_px".to_string(),
                reason: format!("{} is outside 20..=500", self.identifier_width_px),
            });
        }
        if !(1..=64).contains(&self.cleanup_concurrency) {
            return Err(StockError::InvalidConfig {
                field: "cleanup_concurrency".to_string(),
                reason: format!("{} is outside 1..=64", self.cleanup_concurrency),
            });
        }
        Ok(())
    }
}
