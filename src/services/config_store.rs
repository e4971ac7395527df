// Configuration Storage Service
// Handles config file read/write, version backup and environment overrides

use crate::models::PairingMode;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> ConfigError + '_ {
    move |source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub segmenter: SegmenterConfig,
    #[serde(default)]
    pub classifiers: ClassifiersConfig,
    #[serde(default)]
    pub enrichment: EnrichmentConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub api_keys: HashMap<String, String>,
    pub proxy: Option<ProxyConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ProxyConfig {
    pub enabled: bool,
    pub http: Option<String>,
    pub https: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmenterConfig {
    /// Sentence boundary service; `None` means rule-based only.
    pub url: Option<String>,
    #[serde(default = "default_segmenter_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_language")]
    pub language: String,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout_secs: default_segmenter_timeout(),
            language: default_language(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifierConfig {
    /// `"provider:model"`, e.g. `"hf:roberta-large-mnli"`.
    pub provider: String,
    pub base_url: Option<String>,
    #[serde(default = "default_classifier_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_true")]
    pub quiet: bool,
}

impl ClassifierConfig {
    fn for_model(provider: &str) -> Self {
        Self {
            provider: provider.to_string(),
            ..Self::default()
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            provider: "hf:roberta-large-mnli".to_string(),
            base_url: None,
            timeout_secs: default_classifier_timeout(),
            quiet: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClassifiersConfig {
    pub nli: ClassifierConfig,
    pub logic_nli: ClassifierConfig,
    pub formality: ClassifierConfig,
    pub emotion: ClassifierConfig,
}

impl Default for ClassifiersConfig {
    fn default() -> Self {
        Self {
            nli: ClassifierConfig::for_model("hf:roberta-large-mnli"),
            logic_nli: ClassifierConfig::for_model("hf:microsoft/deberta-large-mnli"),
            formality: ClassifierConfig::for_model("hf:s-nlp/roberta-base-formality-ranker"),
            emotion: ClassifierConfig::for_model("hf:bhadresh-savani/distilbert-base-uncased-emotion"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichmentConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_enrichment_url")]
    pub base_url: String,
    #[serde(default = "default_enrichment_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_limit_per_noun")]
    pub limit_per_noun: usize,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: default_enrichment_url(),
            timeout_secs: default_enrichment_timeout(),
            limit_per_noun: default_limit_per_noun(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisConfig {
    #[serde(default)]
    pub pairing_mode: PairingMode,
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            pairing_mode: PairingMode::Full,
            max_concurrency: default_max_concurrency(),
        }
    }
}

fn default_true() -> bool { true }
fn default_language() -> String { "en".to_string() }
fn default_segmenter_timeout() -> u64 { 10 }
fn default_classifier_timeout() -> u64 { 30 }
fn default_enrichment_url() -> String { "https://api.conceptnet.io".to_string() }
fn default_enrichment_timeout() -> u64 { 3 }
fn default_limit_per_noun() -> usize { 1 }
fn default_max_concurrency() -> usize { 4 }

impl AppConfig {
    /// Apply `RHETORICA_*` environment overrides on top of file values.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("RHETORICA_SEGMENTER_URL").filter(|u| !u.trim().is_empty()) {
            self.segmenter.url = Some(url.trim().to_string());
        }
        if matches!(
            lookup("RHETORICA_DISABLE_ENRICHMENT").as_deref(),
            Some("1") | Some("true") | Some("TRUE")
        ) {
            self.enrichment.enabled = false;
        }
    }
}

pub struct ConfigStore {
    config_dir: PathBuf,
    config_file: PathBuf,
}

impl ConfigStore {
    pub fn new(config_dir: PathBuf) -> Self {
        let config_file = config_dir.join("config.json");
        Self { config_dir, config_file }
    }

    /// Get default config directory
    pub fn default_config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("rhetorica"))
    }

    pub fn config_file(&self) -> &Path {
        &self.config_file
    }

    /// Ensure config directory exists
    pub fn ensure_dir(&self) -> Result<(), ConfigError> {
        fs::create_dir_all(&self.config_dir).map_err(io_err(&self.config_dir))
    }

    /// Load configuration from file; a missing file yields defaults.
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        if !self.config_file.exists() {
            return Ok(AppConfig::default());
        }

        let content = fs::read_to_string(&self.config_file).map_err(io_err(&self.config_file))?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save configuration to file
    pub fn save(&self, config: &AppConfig) -> Result<(), ConfigError> {
        self.ensure_dir()?;

        if self.config_file.exists() {
            self.create_backup()?;
        }

        let content = serde_json::to_string_pretty(config)?;
        fs::write(&self.config_file, content).map_err(io_err(&self.config_file))
    }

    /// Create a backup of current config
    fn create_backup(&self) -> Result<(), ConfigError> {
        let backup_dir = self.config_dir.join("backups");
        fs::create_dir_all(&backup_dir).map_err(io_err(&backup_dir))?;

        let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S%3f");
        let backup_file = backup_dir.join(format!("config_{}.json", timestamp));

        fs::copy(&self.config_file, &backup_file).map_err(io_err(&backup_file))?;

        // Keep only last 10 backups
        self.cleanup_old_backups(&backup_dir, 10)
    }

    /// Remove old backups, keeping only the most recent N
    fn cleanup_old_backups(&self, backup_dir: &Path, keep: usize) -> Result<(), ConfigError> {
        let mut entries: Vec<_> = fs::read_dir(backup_dir)
            .map_err(io_err(backup_dir))?
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().map_or(false, |ext| ext == "json"))
            .collect();

        if entries.len() <= keep {
            return Ok(());
        }

        // Names embed the timestamp, so lexical order is chronological.
        entries.sort_by_key(|e| e.file_name());

        let remove = entries.len() - keep;
        for entry in entries.iter().take(remove) {
            let _ = fs::remove_file(entry.path());
        }

        Ok(())
    }

    /// Get provider API key from config file
    pub fn get_api_key(&self, provider: &str) -> Result<Option<String>, ConfigError> {
        let config = self.load()?;
        Ok(config.api_keys.get(provider).cloned())
    }

    /// Store provider API key in config file
    pub fn set_api_key(&self, provider: &str, key: &str) -> Result<(), ConfigError> {
        let mut config = self.load()?;
        config.api_keys.insert(provider.to_string(), key.to_string());
        self.save(&config)
    }
}

/// Load the config from the default location (or defaults) with env overrides applied.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut config = match path {
        Some(p) => {
            let content = fs::read_to_string(p).map_err(io_err(p))?;
            serde_json::from_str(&content)?
        }
        None => match ConfigStore::default_config_dir() {
            Some(dir) => ConfigStore::new(dir).load()?,
            None => AppConfig::default(),
        },
    };
    config.apply_env_overrides();
    Ok(config)
}
