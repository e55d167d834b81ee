use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Raw configuration as defined in `reelmatch.toml`.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct FileConfig {
    #[serde(default)]
    pub provider: FileProviderConfig,
    #[serde(default)]
    pub storage: FileStorageConfig,
    #[serde(default)]
    pub enrich: FileEnrichConfig,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileProviderConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Human-readable duration, e.g. `"10s"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileStorageConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ledger_path: Option<PathBuf>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileEnrichConfig {
    /// Human-readable duration, e.g. `"250ms"`; `"0s"` disables pacing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_interval: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_reported_errors: Option<usize>,
    #[serde(default)]
    pub thresholds: FileThresholdsConfig,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileThresholdsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strict_similarity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity_floor: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year_tolerance: Option<u16>,
}

/// Environment overrides, read once per load.
#[derive(Debug, Default, Clone)]
pub struct EnvConfig {
    pub config_path: Option<PathBuf>,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub store_path: Option<PathBuf>,
    pub ledger_path: Option<PathBuf>,
    /// Raw value, validated during composition.
    pub request_interval_ms: Option<String>,
}

impl EnvConfig {
    pub fn gather() -> Self {
        Self {
            config_path: path_var("REELMATCH_CONFIG"),
            api_key: non_empty_var("OMDB_API_KEY"),
            base_url: non_empty_var("OMDB_BASE_URL"),
            data_dir: path_var("REELMATCH_DATA_DIR"),
            store_path: path_var("REELMATCH_STORE_PATH"),
            ledger_path: path_var("REELMATCH_LEDGER_PATH"),
            request_interval_ms: non_empty_var("REELMATCH_REQUEST_INTERVAL_MS"),
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().and_then(|raw| {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn path_var(name: &str) -> Option<PathBuf> {
    non_empty_var(name).map(PathBuf::from)
}
