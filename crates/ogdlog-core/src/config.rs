//! Configuration types and TOML loading
//!
//! Defines:
//! - `AppConfig` - Static application identity and endpoint settings
//! - `SettingsConfig` - Human-friendly form of [`LogSettings`]
//! - `AnalyticsConfig` - Optional analytics mirror settings

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};
use crate::prelude::*;
use crate::settings::LogSettings;

/// Production OpenGameData logging endpoint
pub const OGD_LOG_ENDPOINT: &str = "https://ogdlogger.fielddaylab.wisc.edu/logger/log.php";

/// Default legacy parameter name the user id is copied into for analytics events
pub const DEFAULT_USER_ID_PARAMETER: &str = "user_code";

/// Static application configuration (`ogdlog.toml`)
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct AppConfig {
    /// Identifier for the app; should match the game's name in the database
    pub app_id: String,

    /// Current version of the app
    pub app_version: String,

    /// Current branch of the app
    #[serde(default)]
    pub app_branch: Option<String>,

    /// Client logging version
    pub log_version: String,

    /// Base URL of the logging endpoint
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default)]
    pub settings: SettingsConfig,

    /// Analytics mirror; disabled when absent
    #[serde(default)]
    pub analytics: Option<AnalyticsConfig>,
}

impl AppConfig {
    pub fn new(
        app_id: impl Into<String>,
        app_version: impl Into<String>,
        log_version: impl Into<String>,
    ) -> Self {
        Self {
            app_id: app_id.into(),
            app_version: app_version.into(),
            app_branch: None,
            log_version: log_version.into(),
            endpoint: default_endpoint(),
            settings: SettingsConfig::default(),
            analytics: None,
        }
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.app_branch = Some(branch.into());
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_settings(mut self, settings: LogSettings) -> Self {
        self.settings = SettingsConfig::from(settings);
        self
    }

    pub fn with_analytics(mut self, analytics: AnalyticsConfig) -> Self {
        self.analytics = Some(analytics);
        self
    }

    /// Settings flags derived from the `[settings]` section
    pub fn log_settings(&self) -> LogSettings {
        LogSettings::from(&self.settings)
    }

    /// Check that the identity fields the endpoint relies on are present
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("app_id", &self.app_id),
            ("app_version", &self.app_version),
            ("log_version", &self.log_version),
            ("endpoint", &self.endpoint),
        ] {
            if value.trim().is_empty() {
                return Err(Error::config_invalid(format!("{} must not be empty", field)));
            }
        }
        Ok(())
    }
}

fn default_endpoint() -> String {
    OGD_LOG_ENDPOINT.to_string()
}

/// `[settings]` section
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SettingsConfig {
    /// Verbose per-batch diagnostics
    #[serde(default)]
    pub debug: bool,

    /// Base64-encode payloads
    #[serde(default = "default_true")]
    pub base64_encode: bool,
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            debug: false,
            base64_encode: true,
        }
    }
}

impl From<&SettingsConfig> for LogSettings {
    fn from(config: &SettingsConfig) -> Self {
        LogSettings::empty()
            .with_debug(config.debug)
            .with_base64_encode(config.base64_encode)
    }
}

impl From<LogSettings> for SettingsConfig {
    fn from(settings: LogSettings) -> Self {
        Self {
            debug: settings.is_debug(),
            base64_encode: settings.base64_encode(),
        }
    }
}

fn default_true() -> bool {
    true
}

/// `[analytics]` section (GA4 Measurement Protocol)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AnalyticsConfig {
    /// GA4 measurement id (`G-XXXXXXX`)
    pub measurement_id: String,

    /// Measurement Protocol API secret
    pub api_secret: String,

    /// Legacy option: copy the user id into this event parameter.
    /// An empty string disables the copy.
    #[serde(default = "default_user_id_parameter")]
    pub copy_user_id_to_parameters: String,
}

impl AnalyticsConfig {
    pub fn new(measurement_id: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            measurement_id: measurement_id.into(),
            api_secret: api_secret.into(),
            copy_user_id_to_parameters: default_user_id_parameter(),
        }
    }

    /// Parameter name the user id is copied into, if enabled
    pub fn user_id_parameter(&self) -> Option<&str> {
        let name = self.copy_user_id_to_parameters.trim();
        (!name.is_empty()).then_some(name)
    }
}

fn default_user_id_parameter() -> String {
    DEFAULT_USER_ID_PARAMETER.to_string()
}

/// Load and validate configuration from a TOML file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        return Err(Error::ConfigNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path)?;
    let config = parse_config(&content)
        .with_context(|| format!("Failed to load config from {}", path.display()))?;

    debug!("Loaded config from {:?}", path);
    Ok(config)
}

/// Parse and validate configuration from TOML text
pub fn parse_config(content: &str) -> Result<AppConfig> {
    let config: AppConfig =
        toml::from_str(content).map_err(|e| Error::config(format!("invalid TOML: {}", e)))?;
    config.validate()?;
    Ok(config)
}
