//! Configuration loading from disk.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::schema::WorkloadConfig;
use crate::config::store::{ConfigStore, ReloadOutcome};
use crate::config::validation::{validate_config, ValidatedConfig, ValidationError};
use crate::observability::metrics;
use crate::workload::memory::AllocationError;

/// Document format, picked from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Toml,
    Json,
}

impl ConfigFormat {
    /// `.toml` and `.json` select their formats; anything else is read as YAML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => ConfigFormat::Toml,
            Some(ext) if ext.eq_ignore_ascii_case("json") => ConfigFormat::Json,
            _ => ConfigFormat::Yaml,
        }
    }
}

/// A document that could not be deserialized.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    Parse(#[from] ParseError),

    #[error("invalid config: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),

    #[error("failed to apply config: {0}")]
    Allocation(#[from] AllocationError),
}

impl ConfigError {
    /// Short label used for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ConfigError::Read { .. } => "read_error",
            ConfigError::Parse(_) => "parse_error",
            ConfigError::Validation(_) => "validation_error",
            ConfigError::Allocation(_) => "allocation_error",
        }
    }
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Deserialize a raw document. Missing fields take their zero value.
pub fn parse_document(raw: &str, format: ConfigFormat) -> Result<WorkloadConfig, ParseError> {
    let config = match format {
        // An empty YAML document is `null`, which serde_yaml refuses for a struct.
        ConfigFormat::Yaml if raw.trim().is_empty() => WorkloadConfig::default(),
        ConfigFormat::Yaml => serde_yaml::from_str(raw)?,
        ConfigFormat::Toml => toml::from_str(raw)?,
        ConfigFormat::Json => serde_json::from_str(raw)?,
    };
    Ok(config)
}

/// Parse and validate a raw document.
pub fn load_document(raw: &str, format: ConfigFormat) -> Result<ValidatedConfig, ConfigError> {
    let config = parse_document(raw, format)?;
    validate_config(config).map_err(ConfigError::Validation)
}

/// Loads the workload document from a fixed path.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    path: PathBuf,
    format: ConfigFormat,
}

impl ConfigLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let format = ConfigFormat::from_path(&path);
        Self { path, format }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> ConfigFormat {
        self.format
    }

    /// Read, parse and validate the current file contents.
    pub fn load(&self) -> Result<ValidatedConfig, ConfigError> {
        let content = fs::read_to_string(&self.path).map_err(|source| ConfigError::Read {
            path: self.path.clone(),
            source,
        })?;
        load_document(&content, self.format)
    }

    /// Load the file and publish it to `store`.
    ///
    /// On error the store keeps its current snapshot.
    pub fn reload(&self, store: &ConfigStore) -> Result<ReloadOutcome, ConfigError> {
        tracing::info!(path = ?self.path, "Reloading config");

        match self
            .load()
            .and_then(|config| store.apply(config).map_err(ConfigError::from))
        {
            Ok(outcome) => {
                metrics::record_reload("success");
                tracing::info!(
                    generation = outcome.generation,
                    memory_reallocated = outcome.buffer_reallocated,
                    config = ?outcome.config,
                    "Config applied"
                );
                Ok(outcome)
            }
            Err(e) => {
                metrics::record_reload(e.kind());
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const YAML: &str = "errorRate: 5\ncpu:\n  minPrimesCalculated: 10\n  maxPrimesCalculated: 20\nmemory:\n  usage: 1024\n";

    #[test]
    fn test_format_from_path() {
        assert_eq!(ConfigFormat::from_path(Path::new("a/config.yaml")), ConfigFormat::Yaml);
        assert_eq!(ConfigFormat::from_path(Path::new("config.yml")), ConfigFormat::Yaml);
        assert_eq!(ConfigFormat::from_path(Path::new("config")), ConfigFormat::Yaml);
        assert_eq!(ConfigFormat::from_path(Path::new("config.TOML")), ConfigFormat::Toml);
        assert_eq!(ConfigFormat::from_path(Path::new("config.json")), ConfigFormat::Json);
    }

    #[test]
    fn test_parse_yaml() {
        let config = parse_document(YAML, ConfigFormat::Yaml).unwrap();
        assert_eq!(config.error_rate, 5);
        assert_eq!(config.cpu.min_primes_calculated, 10);
        assert_eq!(config.cpu.max_primes_calculated, 20);
        assert_eq!(config.memory.usage, 1024);
    }

    #[test]
    fn test_parse_toml_and_json() {
        let toml = "errorRate = 1\n[cpu]\nminPrimesCalculated = 2\nmaxPrimesCalculated = 3\n[memory]\nusage = 4\n";
        let from_toml = parse_document(toml, ConfigFormat::Toml).unwrap();

        let json = r#"{"errorRate":1,"cpu":{"minPrimesCalculated":2,"maxPrimesCalculated":3},"memory":{"usage":4}}"#;
        let from_json = parse_document(json, ConfigFormat::Json).unwrap();

        assert_eq!(from_toml, from_json);
        assert_eq!(from_toml.memory.usage, 4);
    }

    #[test]
    fn test_missing_sections_default_to_zero() {
        let config = parse_document("errorRate: 7\n", ConfigFormat::Yaml).unwrap();
        assert_eq!(config.error_rate, 7);
        assert_eq!(config.memory.usage, 0);
        assert_eq!(config.cpu.max_primes_calculated, 0);

        assert_eq!(parse_document("", ConfigFormat::Yaml).unwrap(), WorkloadConfig::default());
    }

    #[test]
    fn test_malformed_document_is_parse_error() {
        let err = load_document("errorRate: [not, a, number", ConfigFormat::Yaml).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(ParseError::Yaml(_))));
        assert_eq!(err.kind(), "parse_error");

        let err = load_document("errorRate: -3\n", ConfigFormat::Yaml).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_invalid_bounds_is_validation_error() {
        let raw = "cpu:\n  minPrimesCalculated: 20\n  maxPrimesCalculated: 20\n";
        let err = load_document(raw, ConfigFormat::Yaml).unwrap_err();
        match err {
            ConfigError::Validation(errors) => {
                assert_eq!(errors, vec![ValidationError::CpuBounds { min: 20, max: 20 }]);
            }
            other => panic!("expected validation error, got {other}"),
        }
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let loader = ConfigLoader::new(dir.path().join("absent.yaml"));
        let err = loader.load().unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
        assert!(err.to_string().contains("absent.yaml"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(YAML.as_bytes()).unwrap();

        let loader = ConfigLoader::new(file.path());
        assert_eq!(loader.format(), ConfigFormat::Yaml);
        let config = loader.load().unwrap();
        assert_eq!(config.error_rate, 5);
    }

    #[test]
    fn test_reload_failure_keeps_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("workload.yaml");
        std::fs::write(&path, YAML).unwrap();

        let store = ConfigStore::new();
        let loader = ConfigLoader::new(&path);
        let first = loader.reload(&store).unwrap();
        assert_eq!(first.generation, 1);
        assert!(first.buffer_reallocated);

        std::fs::write(&path, "cpu:\n  minPrimesCalculated: 9\n  maxPrimesCalculated: 3\n").unwrap();
        assert!(matches!(loader.reload(&store), Err(ConfigError::Validation(_))));

        std::fs::write(&path, "cpu: {").unwrap();
        assert!(matches!(loader.reload(&store), Err(ConfigError::Parse(_))));

        let snapshot = store.snapshot();
        assert_eq!(snapshot.generation(), 1);
        assert_eq!(snapshot.config().map(|c| c.error_rate), Some(5));
        assert_eq!(snapshot.buffer_len(), 1024);
    }

    #[test]
    fn test_unallocatable_buffer_keeps_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("workload.yaml");
        std::fs::write(&path, YAML).unwrap();

        let store = ConfigStore::new();
        let loader = ConfigLoader::new(&path);
        loader.reload(&store).unwrap();

        let huge = format!(
            "errorRate: 0\ncpu:\n  minPrimesCalculated: 1\n  maxPrimesCalculated: 2\nmemory:\n  usage: {}\n",
            isize::MAX
        );
        std::fs::write(&path, huge).unwrap();

        let err = loader.reload(&store).unwrap_err();
        assert!(matches!(err, ConfigError::Allocation(_)));
        assert_eq!(err.kind(), "allocation_error");

        let snapshot = store.snapshot();
        assert_eq!(snapshot.generation(), 1);
        assert_eq!(snapshot.config().map(|c| c.memory.usage), Some(1024));
        assert_eq!(snapshot.buffer_len(), 1024);
    }
}
