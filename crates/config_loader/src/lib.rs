//! Loads a `ClientConfig` from TOML or JSON and checks it before a
//! dispatcher is built from it.
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let config = ConfigLoader::load_from_path(Path::new("dispatch.toml")).unwrap();
//! println!("Endpoint: {}", config.endpoint);
//! ```

mod validator;

pub use contracts::ClientConfig;

use contracts::ContractError;
use std::path::Path;

/// On-disk configuration format, picked by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
}

impl ConfigFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Configuration loader
///
/// Provides static methods to load configuration from files or strings.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load and validate configuration from file path
    ///
    /// Automatically detects format from file extension (.toml / .json).
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_path(path: &Path) -> Result<ClientConfig, ContractError> {
        let config = Self::parse_path(path)?;
        validator::validate(&config)?;
        Ok(config)
    }

    /// Parse a configuration file without validating it
    ///
    /// Lets callers apply overrides (CLI flags, env) before calling [`ConfigLoader::validate`].
    pub fn parse_path(path: &Path) -> Result<ClientConfig, ContractError> {
        let format = Self::detect_format(path)?;
        let content = Self::read_file(path)?;
        Self::parse_str(&content, format)
    }

    /// Load configuration from string
    ///
    /// # Errors
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_str(content: &str, format: ConfigFormat) -> Result<ClientConfig, ContractError> {
        let config = Self::parse_str(content, format)?;
        validator::validate(&config)?;
        Ok(config)
    }

    /// Validate an already-built configuration
    pub fn validate(config: &ClientConfig) -> Result<(), ContractError> {
        validator::validate(config)
    }

    /// Serialize ClientConfig to TOML string
    pub fn to_toml(config: &ClientConfig) -> Result<String, ContractError> {
        toml::to_string_pretty(config)
            .map_err(|e| ContractError::config_parse(format!("TOML serialize error: {e}")))
    }

    /// Serialize ClientConfig to JSON string
    pub fn to_json(config: &ClientConfig) -> Result<String, ContractError> {
        serde_json::to_string_pretty(config)
            .map_err(|e| ContractError::config_parse(format!("JSON serialize error: {e}")))
    }
}

impl ConfigLoader {
    /// Infer configuration format from file extension
    fn detect_format(path: &Path) -> Result<ConfigFormat, ContractError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ContractError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext).ok_or_else(|| {
            ContractError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }

    /// Deserialize without validating; missing fields take their serde defaults
    fn parse_str(content: &str, format: ConfigFormat) -> Result<ClientConfig, ContractError> {
        match format {
            ConfigFormat::Toml => toml::from_str(content).map_err(|e| ContractError::ConfigParse {
                message: format!("TOML parse error: {e}"),
                source: Some(Box::new(e)),
            }),
            ConfigFormat::Json => {
                serde_json::from_str(content).map_err(|e| ContractError::ConfigParse {
                    message: format!("JSON parse error: {e}"),
                    source: Some(Box::new(e)),
                })
            }
        }
    }

    fn read_file(path: &Path) -> Result<String, ContractError> {
        Ok(std::fs::read_to_string(path)?)
    }
}
