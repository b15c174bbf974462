//! Fill Configuration - Tunables for the relation fill engine

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

/// What to do when a payload names a related record by key and that record
/// does not exist
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingRelatedPolicy {
    /// Abort the fill with `FillError::RelatedRecordNotFound`
    #[default]
    Fail,
    /// Create a new related record from the payload instead
    Create,
}

impl FromStr for MissingRelatedPolicy {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fail" => Ok(Self::Fail),
            "create" => Ok(Self::Create),
            other => Err(ModelError::Configuration(format!(
                "Unknown missing related policy '{}', expected 'fail' or 'create'",
                other
            ))),
        }
    }
}

/// Configuration for nested relation filling
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FillConfig {
    /// Key under which many-to-many elements carry join table columns
    pub pivot_key: String,
    /// Policy for keyed payloads whose record cannot be found
    pub missing_related: MissingRelatedPolicy,
}

impl Default for FillConfig {
    fn default() -> Self {
        Self {
            pivot_key: "pivot".to_string(),
            missing_related: MissingRelatedPolicy::Fail,
        }
    }
}

impl FillConfig {
    /// Load configuration from `ELIF_FILL_*` environment variables, falling
    /// back to defaults for unset ones
    pub fn from_env() -> ModelResult<Self> {
        let mut config = Self::default();

        if let Ok(pivot_key) = std::env::var("ELIF_FILL_PIVOT_KEY") {
            config.pivot_key = pivot_key;
        }

        if let Ok(policy) = std::env::var("ELIF_FILL_MISSING_RELATED") {
            config.missing_related = policy.parse()?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Set the pivot sub-map key
    pub fn with_pivot_key(mut self, pivot_key: impl Into<String>) -> Self {
        self.pivot_key = pivot_key.into();
        self
    }

    /// Set the missing related record policy
    pub fn with_missing_related(mut self, policy: MissingRelatedPolicy) -> Self {
        self.missing_related = policy;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> ModelResult<()> {
        if self.pivot_key.is_empty() {
            return Err(ModelError::Configuration(
                "Pivot key cannot be empty".to_string()
            ));
        }

        Ok(())
    }
}
