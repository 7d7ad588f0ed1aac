use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::analyzer::normalizers::NormalizerRules;
use crate::analyzer::sla::SlaThresholds;
use crate::error::AppError;
use crate::parser::columns::Field;
use crate::parser::deserializers::de;
use crate::parser::pipeline::DEFAULT_PROGRESS_STRIDE;

/// Host-supplied settings. Every key is optional; missing keys keep the
/// built-in defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    pub sla_thresholds: SlaThresholds,
    pub progress_stride: usize,
    /// Instant used as "last activity" for tickets still open. `None` means
    /// the wall clock at import time.
    #[serde(
        deserialize_with = "de::flexible_datetime_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub assume_open_as_of: Option<DateTime<Utc>>,
    /// Per-field header alias lists replacing the built-in ones.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aliases: Option<BTreeMap<Field, Vec<String>>>,
    pub rules: NormalizerRules,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            sla_thresholds: SlaThresholds::default(),
            progress_stride: DEFAULT_PROGRESS_STRIDE,
            assume_open_as_of: None,
            aliases: None,
            rules: NormalizerRules::default(),
        }
    }
}

impl AppConfig {
    pub fn from_json(json: &str) -> Result<Self, AppError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self, AppError> {
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_json(&text)?;
        log::info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, AppError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Resolve the "still open" reference instant, reading the wall clock
    /// only when none is configured.
    pub fn assume_open_as_of(&self) -> DateTime<Utc> {
        self.assume_open_as_of.unwrap_or_else(Utc::now)
    }
}
