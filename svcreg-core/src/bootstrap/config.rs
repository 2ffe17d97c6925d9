//! Configuration loading

use std::path::Path;
use tracing::info;

use crate::config::{ClientConfig, MasterConfig};
use crate::error::{Error, Result};

/// Environment variable naming the master config file
pub const MASTER_CONFIG_PATH_ENV: &str = "SVCREG_CONFIG_PATH";
/// Environment variable naming the client config file
pub const CLIENT_CONFIG_PATH_ENV: &str = "SVCREG_CLIENT_CONFIG_PATH";

const MASTER_DEFAULT_PATH: &str = "config/master.yaml";
const CLIENT_DEFAULT_PATH: &str = "config/client.yaml";

/// Pick the config file: an explicit path wins and must exist; otherwise the
/// environment variable, then the default location, then none.
fn resolve_path(explicit: Option<&str>, env_var: &str, default_path: &str) -> Result<Option<String>> {
    if let Some(path) = explicit {
        if !Path::new(path).exists() {
            return Err(Error::Config(format!("config file {path} not found")));
        }
        return Ok(Some(path.to_string()));
    }

    if let Ok(path) = std::env::var(env_var) {
        if !Path::new(&path).exists() {
            return Err(Error::Config(format!("config file {path} (from {env_var}) not found")));
        }
        return Ok(Some(path));
    }

    Ok(Path::new(default_path)
        .exists()
        .then(|| default_path.to_string()))
}

fn validation_failure(errors: &[String]) -> Error {
    Error::Config(format!(
        "configuration validation failed with {} error(s): {}",
        errors.len(),
        errors.join("; ")
    ))
}

/// Load and validate the master configuration.
///
/// Runs before logging is installed, so progress goes to stderr.
pub fn load_master_config(explicit: Option<&str>) -> Result<MasterConfig> {
    let path = resolve_path(explicit, MASTER_CONFIG_PATH_ENV, MASTER_DEFAULT_PATH)?;
    match &path {
        Some(path) => eprintln!("Loading config from {path}"),
        None => eprintln!("No config file found, using environment variables and defaults"),
    }

    let config = MasterConfig::load(path.as_deref())
        .map_err(|e| Error::Config(format!("invalid master configuration: {e}")))?;
    config.validate().map_err(|errors| validation_failure(&errors))?;

    info!("Configuration loaded and validated successfully");
    Ok(config)
}

/// Load and validate the client configuration
pub fn load_client_config(explicit: Option<&str>) -> Result<ClientConfig> {
    let path = resolve_path(explicit, CLIENT_CONFIG_PATH_ENV, CLIENT_DEFAULT_PATH)?;

    let config = ClientConfig::load(path.as_deref())
        .map_err(|e| Error::Config(format!("invalid client configuration: {e}")))?;
    config.validate().map_err(|errors| validation_failure(&errors))?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_explicit_missing_path_is_config_error() {
        let err = load_master_config(Some("/nonexistent/master.yaml")).unwrap_err();
        assert!(matches!(err, Error::Config(ref msg) if msg.contains("not found")));
    }

    #[test]
    fn test_invalid_document_is_config_error() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        file.write_all(b"{\"server\": ").unwrap();

        let err = load_master_config(file.path().to_str()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_failed_validation_is_config_error() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(b"server:\n  max_frame_bytes: 1\n").unwrap();

        let err = load_master_config(file.path().to_str()).unwrap_err();
        assert!(matches!(err, Error::Config(ref msg) if msg.contains("max_frame_bytes")));
    }

    #[test]
    fn test_client_config_from_explicit_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(b"master_server:\n  host: 127.0.0.1\n  port: 3100\n").unwrap();

        let config = load_client_config(file.path().to_str()).unwrap();
        assert_eq!(config.master_address(), "127.0.0.1:3100");
    }
}
