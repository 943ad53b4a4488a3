use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fs, path::PathBuf};

use crate::{error::ForecastError, provider::ProviderId};

/// Environment variable naming the active provider.
pub const PROVIDER_ENV: &str = "WEATHER_PROVIDER";
/// Environment variable holding the active provider's API key.
pub const API_KEY_ENV: &str = "WEATHER_API_KEY";

/// Configuration for a single provider (e.g., API key).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub api_key: String,
}

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Optional default provider id, e.g. "openweathermap" or "weatherapi".
    pub default_provider: Option<String>,

    /// Example TOML:
    /// [providers.openweathermap]
    /// api_key = "..."
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

impl Config {
    /// Store default provider as string.
    pub fn set_default_provider(&mut self, id: ProviderId) {
        self.default_provider = Some(id.as_str().to_string());
    }

    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(path)
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "weather-task", "weather-cli")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Set/replace a provider API key. The first configured provider becomes the default.
    pub fn upsert_provider_api_key(&mut self, provider_id: ProviderId, api_key: String) {
        self.providers.insert(provider_id.as_str().to_string(), ProviderConfig { api_key });

        if self.default_provider.is_none() {
            self.default_provider = Some(provider_id.to_string());
        }
    }

    /// Returns API key for a provider, if present.
    pub fn provider_api_key(&self, provider_id: ProviderId) -> Option<&str> {
        self.providers.get(provider_id.as_str()).map(|cfg| cfg.api_key.as_str())
    }
}

/// Provider identifier and key as seen by a single request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderSettings {
    pub provider: Option<String>,
    pub api_key: Option<String>,
}

impl ProviderSettings {
    pub fn new(provider: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self { provider: Some(provider.into()), api_key: Some(api_key.into()) }
    }

    /// Read settings through `lookup`, which maps a variable name to its value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        Self { provider: non_empty(PROVIDER_ENV), api_key: non_empty(API_KEY_ENV) }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Fill whatever is missing from the on-disk config.
    pub fn or_file(mut self, config: &Config) -> Self {
        if self.provider.is_none() {
            self.provider = config.default_provider.clone();
        }

        if self.api_key.is_none() {
            self.api_key = self
                .provider
                .as_deref()
                .and_then(|p| ProviderId::try_from(p).ok())
                .and_then(|id| config.provider_api_key(id))
                .map(str::to_owned);
        }

        self
    }

    /// Validate into a usable provider id and key.
    pub fn resolve(&self) -> Result<(ProviderId, String), ForecastError> {
        let (Some(provider), Some(api_key)) = (self.provider.as_deref(), self.api_key.as_deref())
        else {
            return Err(ForecastError::NotConfigured);
        };

        let id = ProviderId::try_from(provider)?;
        Ok((id, api_key.to_owned()))
    }
}

/// Where the endpoint reads provider settings from on each request.
pub trait SettingsSource: Send + Sync {
    fn settings(&self) -> ProviderSettings;
}

impl SettingsSource for ProviderSettings {
    fn settings(&self) -> ProviderSettings {
        self.clone()
    }
}

/// Environment variables, read per call, falling back to a config file snapshot.
#[derive(Debug, Clone, Default)]
pub struct EnvSettings {
    file: Config,
}

impl EnvSettings {
    pub fn new(file: Config) -> Self {
        Self { file }
    }
}

impl SettingsSource for EnvSettings {
    fn settings(&self) -> ProviderSettings {
        ProviderSettings::from_env().or_file(&self.file)
    }
}
