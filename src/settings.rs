use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::passkey::PasskeySettings;

/// Environment variable naming a directory that holds an overriding `Settings.toml`
pub const CONFIG_DIR_ENV: &str = "PGPASSKEY_CONFIG_DIR";

const SETTINGS_FILE: &str = "Settings.toml";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    pub passkeys: PasskeySettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Errors raised while loading settings
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: basic_toml::Error,
    },
    #[error("invalid settings: {0}")]
    Invalid(String),
}

impl Settings {
    /// Load settings from configuration files and environment variables
    ///
    /// Settings are loaded with the following priority (highest to lowest):
    /// 1. Environment variables
    /// 2. Settings.toml in `PGPASSKEY_CONFIG_DIR` (if specified and exists)
    /// 3. Settings.toml in current directory (if exists)
    /// 4. Default settings
    ///
    /// The logger is initialised from the resulting level; an already
    /// installed logger is left in place.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Settings file cannot be read
    /// - TOML parsing fails
    /// - The passkey settings do not validate
    pub fn load() -> Result<Self, SettingsError> {
        let (mut settings, sources) = Self::load_base_settings()?;
        Self::apply_env_overrides(&mut settings);

        Self::initialize_logging(&settings.logging);
        for source in &sources {
            log::info!("Loaded settings from {}", source.display());
        }

        settings.validate()?;
        Ok(settings)
    }

    /// Read settings from a single TOML file, without environment overrides
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, SettingsError> {
        let content = fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.display().to_string(),
            source,
        })?;
        basic_toml::from_str(&content).map_err(|source| SettingsError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Validate every section
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Invalid`] describing the first invalid value.
    pub fn validate(&self) -> Result<(), SettingsError> {
        self.passkeys.validate().map_err(SettingsError::Invalid)
    }

    fn initialize_logging(logging: &LoggingSettings) {
        let env = env_logger::Env::default().default_filter_or(logging.level.as_str());
        // a logger installed by the host application wins
        let _ = env_logger::Builder::from_env(env).try_init();
    }

    /// Load base settings from TOML file(s) or use defaults
    fn load_base_settings() -> Result<(Self, Vec<PathBuf>), SettingsError> {
        let mut settings = Self::default();
        let mut sources = Vec::new();

        let default_config_path = PathBuf::from(SETTINGS_FILE);
        if default_config_path.exists() {
            settings = Self::from_file(&default_config_path)?;
            sources.push(default_config_path);
        }

        if let Ok(config_dir) = std::env::var(CONFIG_DIR_ENV) {
            let config_path = Path::new(&config_dir).join(SETTINGS_FILE);
            if config_path.exists() {
                settings = Self::from_file(&config_path)?;
                sources.push(config_path);
            }
        }

        Ok((settings, sources))
    }

    /// Apply environment variable overrides to settings
    fn apply_env_overrides(settings: &mut Self) {
        Self::apply_passkey_env_overrides(&mut settings.passkeys);
        Self::apply_logging_env_overrides(&mut settings.logging);
    }

    /// Apply environment overrides for passkey settings
    pub fn apply_passkey_env_overrides(passkeys: &mut PasskeySettings) {
        Self::apply_parsed_env_override("PASSKEY_ENABLED", &mut passkeys.enabled);
        if let Ok(rp_id) = std::env::var("PASSKEY_RP_ID") {
            passkeys.rp_id = rp_id;
        }
        if let Ok(rp_name) = std::env::var("PASSKEY_RP_NAME") {
            passkeys.rp_name = rp_name;
        }
        if let Ok(origins) = std::env::var("PASSKEY_ALLOWED_ORIGINS") {
            passkeys.allowed_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(ToString::to_string)
                .collect();
        }
        Self::apply_parsed_env_override(
            "PASSKEY_CHALLENGE_TIMEOUT_SECONDS",
            &mut passkeys.challenge_timeout_seconds,
        );
        Self::apply_parsed_env_override(
            "PASSKEY_REQUIRE_USER_VERIFICATION",
            &mut passkeys.require_user_verification,
        );
        Self::apply_parsed_env_override(
            "PASSKEY_VALIDATE_SIGN_COUNT",
            &mut passkeys.validate_sign_count,
        );
    }

    /// Apply environment overrides for logging settings
    fn apply_logging_env_overrides(logging_settings: &mut LoggingSettings) {
        if let Ok(log_level) = std::env::var("RUST_LOG") {
            logging_settings.level = log_level;
        }
    }

    /// Overwrite `target` when `env_var` is set and parses; otherwise keep it
    fn apply_parsed_env_override<T: FromStr>(env_var: &str, target: &mut T) {
        if let Ok(value_str) = std::env::var(env_var) {
            if let Ok(value) = value_str.trim().parse::<T>() {
                *target = value;
            }
        }
    }
}
