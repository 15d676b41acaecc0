//! Effective configuration: file, then flag/env overrides, then validation.

use config_loader::ConfigLoader;
use contracts::{ClientConfig, ContractError};
use tracing::debug;

use crate::cli::ConfigArgs;

/// Build and validate the configuration a command runs with
pub fn load_config(args: &ConfigArgs) -> Result<ClientConfig, ContractError> {
    let mut config = match &args.config {
        Some(path) => {
            debug!(config = %path.display(), "Reading configuration file");
            ConfigLoader::parse_path(path)?
        }
        None => ClientConfig::new(""),
    };

    if let Some(write_key) = &args.write_key {
        debug!("Write key taken from flag/environment");
        config.write_key = write_key.clone();
    }
    if let Some(endpoint) = &args.endpoint {
        debug!(endpoint = %endpoint, "Endpoint overridden from flag/environment");
        config.endpoint = endpoint.clone();
    }

    ConfigLoader::validate(&config)?;
    Ok(config)
}

/// Human label for where the configuration came from
pub fn source_label(args: &ConfigArgs) -> String {
    match &args.config {
        Some(path) => path.display().to_string(),
        None => "<defaults>".to_string(),
    }
}

/// Keep the first four characters of a credential
pub fn mask_secret(secret: &str) -> String {
    let visible: String = secret.chars().take(4).collect();
    if visible.len() == secret.len() {
        "*".repeat(secret.chars().count())
    } else {
        format!("{visible}****")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn toml_file(content: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_flags_override_file() {
        let file = toml_file(
            r#"
write_key = "from-file"
endpoint = "https://file.example.com"
max_batch_count = 25
"#,
        );
        let args = ConfigArgs {
            config: Some(file.path().to_path_buf()),
            write_key: Some("from-flag".into()),
            endpoint: None,
        };

        let config = load_config(&args).unwrap();
        assert_eq!(config.write_key, "from-flag");
        assert_eq!(config.endpoint, "https://file.example.com");
        assert_eq!(config.max_batch_count, 25);
    }

    #[test]
    fn test_defaults_need_write_key() {
        let err = load_config(&ConfigArgs::default()).unwrap_err();
        assert!(err.to_string().contains("write_key"), "{err}");

        let args = ConfigArgs {
            write_key: Some("wk".into()),
            ..ConfigArgs::default()
        };
        let config = load_config(&args).unwrap();
        assert_eq!(config.endpoint, contracts::DEFAULT_ENDPOINT);
    }

    #[test]
    fn test_override_is_validated() {
        let args = ConfigArgs {
            write_key: Some("wk".into()),
            endpoint: Some("not a url".into()),
            ..ConfigArgs::default()
        };
        assert!(load_config(&args).is_err());
    }

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret("abcdefgh"), "abcd****");
        assert_eq!(mask_secret("abc"), "***");
        assert_eq!(mask_secret(""), "");
    }
}
