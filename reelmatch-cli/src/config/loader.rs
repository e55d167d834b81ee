use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use once_cell::sync::Lazy;
use reelmatch_core::providers::omdb_api_provider::default_base_url;
use reelmatch_core::{EnrichConfig, MatchThresholds};
use thiserror::Error;
use url::Url;

use super::sources::{EnvConfig, FileConfig, FileEnrichConfig, FileStorageConfig};
use super::{
    Config, ConfigMetadata, ConfigWarnings, ProviderConfig, StorageConfig,
};

static DEFAULT_CONFIG_LOCATIONS: Lazy<Vec<PathBuf>> = Lazy::new(|| {
    vec![
        PathBuf::from("reelmatch.toml"),
        PathBuf::from("config/reelmatch.toml"),
    ]
});

const DEFAULT_DATA_DIR: &str = "data";
const STORE_FILE_NAME: &str = "movies.json";
const LEDGER_FILE_NAME: &str = "failed-matches.json";
const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Default, Clone)]
pub struct ConfigLoaderOptions {
    pub config_path: Option<PathBuf>,
    pub env_file: Option<PathBuf>,
}

#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: ConfigLoaderOptions,
}

#[derive(Debug)]
pub struct ConfigLoad {
    pub config: Config,
    pub warnings: ConfigWarnings,
}

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("configuration file {path} does not exist")]
    MissingConfig { path: PathBuf },
    #[error("failed to read configuration {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid provider base URL '{value}'")]
    InvalidBaseUrl {
        value: String,
        #[source]
        source: url::ParseError,
    },
    #[error("invalid duration '{value}' for {field}")]
    InvalidDuration {
        field: &'static str,
        value: String,
        #[source]
        source: humantime::DurationError,
    },
    #[error("invalid match thresholds: {0}")]
    InvalidThresholds(String),
    #[error(transparent)]
    EnvFile(#[from] dotenvy::Error),
}

impl ConfigLoader {
    pub fn with_options(options: ConfigLoaderOptions) -> Self {
        Self { options }
    }

    pub fn load(&self) -> Result<ConfigLoad, ConfigLoadError> {
        let env_file_loaded = match &self.options.env_file {
            Some(path) => dotenvy::from_path(path).map(|_| true).or_else(
                |err| match err {
                    dotenvy::Error::Io(_) => Ok(false),
                    _ => Err(err),
                },
            )?,
            None => {
                dotenvy::dotenv().map(|_| true).or_else(|err| match err {
                    dotenvy::Error::Io(_) => Ok(false),
                    _ => Err(err),
                })?
            }
        };

        let env = EnvConfig::gather();
        let (file_config, config_path) = self.load_file_config(&env)?;
        let metadata = ConfigMetadata {
            config_path,
            env_file_loaded,
        };

        let (config, warnings) = compose_config(file_config, env, metadata)?;
        Ok(ConfigLoad { config, warnings })
    }

    fn load_file_config(
        &self,
        env: &EnvConfig,
    ) -> Result<(Option<FileConfig>, Option<PathBuf>), ConfigLoadError> {
        let (path, explicit) = match (&self.options.config_path, &env.config_path)
        {
            (Some(path), _) | (None, Some(path)) => (path.clone(), true),
            (None, None) => {
                match DEFAULT_CONFIG_LOCATIONS
                    .iter()
                    .find(|candidate| candidate.exists())
                {
                    Some(path) => (path.clone(), false),
                    None => return Ok((None, None)),
                }
            }
        };

        if !path.exists() {
            if explicit {
                return Err(ConfigLoadError::MissingConfig { path });
            }
            return Ok((None, None));
        }

        let file_config = read_file_config(&path)?;
        Ok((Some(file_config), Some(path)))
    }
}

pub fn read_file_config(path: &Path) -> Result<FileConfig, ConfigLoadError> {
    let contents =
        fs::read_to_string(path).map_err(|err| ConfigLoadError::Io {
            path: path.to_path_buf(),
            source: err,
        })?;
    toml::from_str(&contents).map_err(|err| ConfigLoadError::Parse {
        path: path.to_path_buf(),
        source: err,
    })
}

/// Merges file and environment layers; the environment wins.
pub fn compose_config(
    file_config: Option<FileConfig>,
    env: EnvConfig,
    metadata: ConfigMetadata,
) -> Result<(Config, ConfigWarnings), ConfigLoadError> {
    let mut warnings = ConfigWarnings::default();

    if metadata.config_path.is_none() {
        warnings.push_with_hint(
            "No reelmatch.toml detected; using environment variables and defaults",
            "Create reelmatch.toml or set REELMATCH_CONFIG to point at one",
        );
    }

    let FileConfig {
        provider: file_provider,
        storage: file_storage,
        enrich: file_enrich,
    } = file_config.unwrap_or_default();

    let api_key = env.api_key.clone().or(file_provider.api_key);
    if api_key.is_none() {
        warnings.push_with_hint(
            "OMDB_API_KEY is not set; `enrich` will refuse to run",
            "Request a key at https://www.omdbapi.com/apikey.aspx",
        );
    }

    let base_url = match env.base_url.clone().or(file_provider.base_url) {
        Some(raw) => Url::parse(&raw).map_err(|source| {
            ConfigLoadError::InvalidBaseUrl { value: raw, source }
        })?,
        None => default_base_url(),
    };

    let timeout = match file_provider.timeout {
        Some(raw) => parse_duration("provider.timeout", raw)?,
        None => DEFAULT_PROVIDER_TIMEOUT,
    };

    let provider = ProviderConfig {
        api_key,
        base_url,
        timeout,
    };
    let storage = compose_storage(&env, file_storage);
    let enrich = compose_enrich(&env, file_enrich, &mut warnings)?;

    Ok((
        Config {
            provider,
            storage,
            enrich,
            metadata,
        },
        warnings,
    ))
}

fn compose_storage(env: &EnvConfig, file: FileStorageConfig) -> StorageConfig {
    let data_dir = env
        .data_dir
        .clone()
        .or(file.data_dir)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
    let store_path = env
        .store_path
        .clone()
        .or(file.store_path)
        .unwrap_or_else(|| data_dir.join(STORE_FILE_NAME));
    let ledger_path = env
        .ledger_path
        .clone()
        .or(file.ledger_path)
        .unwrap_or_else(|| data_dir.join(LEDGER_FILE_NAME));

    StorageConfig {
        data_dir,
        store_path,
        ledger_path,
    }
}

fn compose_enrich(
    env: &EnvConfig,
    file: FileEnrichConfig,
    warnings: &mut ConfigWarnings,
) -> Result<EnrichConfig, ConfigLoadError> {
    let mut config = EnrichConfig::default();

    if let Some(raw) = file.request_interval {
        config.request_interval = parse_duration("enrich.request_interval", raw)?;
    }
    if let Some(raw) = &env.request_interval_ms {
        match raw.parse::<u64>() {
            Ok(ms) => config.request_interval = Duration::from_millis(ms),
            Err(_) => warnings.push(format!(
                "Ignoring REELMATCH_REQUEST_INTERVAL_MS='{raw}'; expected milliseconds"
            )),
        }
    }
    if let Some(max) = file.max_reported_errors {
        config = config.with_max_reported_errors(max);
    }

    let defaults = MatchThresholds::default();
    let thresholds = MatchThresholds {
        strict_similarity: file
            .thresholds
            .strict_similarity
            .unwrap_or(defaults.strict_similarity),
        similarity_floor: file
            .thresholds
            .similarity_floor
            .unwrap_or(defaults.similarity_floor),
        year_tolerance: file
            .thresholds
            .year_tolerance
            .unwrap_or(defaults.year_tolerance),
    };
    validate_thresholds(&thresholds)?;

    Ok(config.with_thresholds(thresholds))
}

fn validate_thresholds(
    thresholds: &MatchThresholds,
) -> Result<(), ConfigLoadError> {
    let in_range = |value: f64| (0.0..=1.0).contains(&value);
    if !in_range(thresholds.strict_similarity)
        || !in_range(thresholds.similarity_floor)
    {
        return Err(ConfigLoadError::InvalidThresholds(
            "similarities must be between 0.0 and 1.0".into(),
        ));
    }
    if thresholds.similarity_floor > thresholds.strict_similarity {
        return Err(ConfigLoadError::InvalidThresholds(format!(
            "similarity_floor {} exceeds strict_similarity {}",
            thresholds.similarity_floor, thresholds.strict_similarity
        )));
    }
    Ok(())
}

fn parse_duration(
    field: &'static str,
    value: String,
) -> Result<Duration, ConfigLoadError> {
    humantime::parse_duration(&value).map_err(|source| {
        ConfigLoadError::InvalidDuration {
            field,
            value,
            source,
        }
    })
}
