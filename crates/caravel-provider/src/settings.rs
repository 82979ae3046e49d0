//! Provider settings — global apply policy.
//!
//! Loaded once per provider process, typically from a TOML file, and
//! validated before any backend mutation.

use serde::{Deserialize, Serialize};
use std::path::Path;

use caravel_manifest::CommitLevels;

use crate::error::{ApplyError, ApplyResult};

/// Global policy carried into every apply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// Public hostname advertised for exposed services.
    pub cluster_public_hostname: String,
    /// Reference to image-pull credentials, attached to every workload
    /// when set.
    pub image_pull_secret: Option<String>,
    /// Per-class overcommit factors.
    #[serde(default)]
    pub commit_levels: CommitLevels,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            cluster_public_hostname: "localhost".to_string(),
            image_pull_secret: None,
            commit_levels: CommitLevels::default(),
        }
    }
}

impl ProviderSettings {
    /// Load settings from a TOML file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let settings: ProviderSettings = toml::from_str(&content)?;
        Ok(settings)
    }

    /// Reject unusable settings before any mutation happens.
    pub fn validate(&self) -> ApplyResult<()> {
        if self.cluster_public_hostname.is_empty() {
            return Err(ApplyError::InvalidSettings(
                "cluster public hostname can not be empty".to_string(),
            ));
        }
        if !self.commit_levels.is_valid() {
            return Err(ApplyError::InvalidSettings(
                "commit levels must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
