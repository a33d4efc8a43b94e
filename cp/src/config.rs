//! careplan configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::PlanError;

/// Main careplan configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Document analysis and plan structuring provider
    pub openai: OpenAIConfig,

    /// Vision description provider
    pub gemini: GeminiConfig,

    /// Session behaviour
    pub session: SessionConfig,

    /// Storage configuration
    pub storage: StorageConfig,

    /// Prompt template overrides
    pub prompts: PromptsConfig,
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .careplan.yml
        let local_config = PathBuf::from(".careplan.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/careplan/careplan.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("careplan").join("careplan.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

macro_rules! provider_section {
    ($(#[$meta:meta])* $name:ident, $model:expr, $key_env:expr, $base_url:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Serialize, Deserialize)]
        #[serde(default)]
        pub struct $name {
            /// Model identifier
            pub model: String,

            /// Environment variable containing the API key
            #[serde(rename = "api-key-env")]
            pub api_key_env: String,

            /// API base URL
            #[serde(rename = "base-url")]
            pub base_url: String,

            /// Per-request timeout in milliseconds
            #[serde(rename = "timeout-ms")]
            pub timeout_ms: u64,
        }

        impl Default for $name {
            fn default() -> Self {
                Self {
                    model: $model.to_string(),
                    api_key_env: $key_env.to_string(),
                    base_url: $base_url.to_string(),
                    timeout_ms: 120_000,
                }
            }
        }

        impl $name {
            /// Resolve into the provider-agnostic form the clients consume
            pub fn resolve(&self) -> ProviderConfig {
                ProviderConfig {
                    model: self.model.clone(),
                    api_key_env: self.api_key_env.clone(),
                    base_url: self.base_url.trim_end_matches('/').to_string(),
                    timeout_ms: self.timeout_ms,
                }
            }
        }
    };
}

provider_section!(
    /// Document analysis and plan structuring provider section
    OpenAIConfig,
    "gpt-4o",
    "OPENAI_API_KEY",
    "https://api.openai.com"
);

provider_section!(
    /// Vision description provider section
    GeminiConfig,
    "gemini-1.5-flash",
    "GEMINI_API_KEY",
    "https://generativelanguage.googleapis.com"
);

/// Resolved provider settings handed to a client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub model: String,
    pub api_key_env: String,
    pub base_url: String,
    pub timeout_ms: u64,
}

impl ProviderConfig {
    /// Read the API key from the configured environment variable
    ///
    /// A missing or blank variable is a configuration error, never a silent no-op.
    pub fn get_api_key(&self) -> Result<String, PlanError> {
        match std::env::var(&self.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(key.trim().to_string()),
            Ok(_) => Err(PlanError::Configuration(format!(
                "API key variable {} is empty",
                self.api_key_env
            ))),
            Err(_) => Err(PlanError::Configuration(format!(
                "API key not found. Set the {} environment variable.",
                self.api_key_env
            ))),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Session behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Deadline for consuming one analysis run stream, in milliseconds
    #[serde(rename = "stream-timeout-ms")]
    pub stream_timeout_ms: u64,

    /// Email of the user whose records the CLI operates on
    #[serde(rename = "user-email")]
    pub user_email: Option<String>,
}

impl SessionConfig {
    pub fn stream_timeout(&self) -> Duration {
        Duration::from_millis(self.stream_timeout_ms)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            stream_timeout_ms: 300_000,
            user_email: None,
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory for the record store
    #[serde(rename = "store-dir")]
    pub store_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        // Use XDG data directory (~/.local/share/careplan on Linux)
        let store_dir = dirs::data_dir()
            .map(|d| d.join("careplan"))
            .unwrap_or_else(|| PathBuf::from(".careplan"));

        Self { store_dir }
    }
}

/// Prompt template overrides
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptsConfig {
    /// Directory searched for `{name}.pmt` overrides
    pub dir: PathBuf,
}

impl Default for PromptsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(".careplan/prompts"),
        }
    }
}
