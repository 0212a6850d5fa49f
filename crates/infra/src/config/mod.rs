//! Configuration loader
//!
//! Loads register configuration from environment variables or a file.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If incomplete, falls back to loading from a config file
//! 3. Probes the working directory and its parent for config files
//!
//! ## Environment Variables
//! - `TILLPOINT_API_BASE_URL`: Backend API base URL
//! - `TILLPOINT_API_TOKEN`: Bearer token issued at device enrolment
//! - `TILLPOINT_LOCATION_ID`: Numeric id of the store location
//! - `TILLPOINT_DB_PATH`: Path to the register SQLite database

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tillpoint_domain::{PosError, Result};

/// Register configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub api_base_url: String,
    pub api_token: String,
    pub location_id: i64,
    pub db_path: String,
}

/// Load configuration with automatic fallback strategy
///
/// # Errors
/// Returns `PosError::Config` if configuration cannot be loaded from
/// either source.
pub fn load() -> Result<AppConfig> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables
///
/// All required variables must be present.
pub fn load_from_env() -> Result<AppConfig> {
    let api_base_url = env_var("TILLPOINT_API_BASE_URL")?;
    let api_token = env_var("TILLPOINT_API_TOKEN")?;
    let location_id = env_var("TILLPOINT_LOCATION_ID").and_then(|s| {
        s.parse::<i64>().map_err(|e| PosError::Config(format!("Invalid location id: {e}")))
    })?;
    let db_path = env_var("TILLPOINT_DB_PATH")?;

    Ok(AppConfig { api_base_url, api_token, location_id, db_path })
}

/// Load configuration from a file
///
/// If `path` is `None`, probes the standard locations. Supports TOML and
/// JSON, detected by file extension.
pub fn load_from_file(path: Option<PathBuf>) -> Result<AppConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(PosError::Config(format!("Config file not found: {}", p.display())));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            PosError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| PosError::Config(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, &config_path)
}

fn parse_config(contents: &str, path: &Path) -> Result<AppConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| PosError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| PosError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(PosError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe the working directory and its parent for a config file
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend(vec![
            cwd.join("tillpoint.toml"),
            cwd.join("tillpoint.json"),
            cwd.join("config.toml"),
            cwd.join("config.json"),
            cwd.join("../tillpoint.toml"),
            cwd.join("../tillpoint.json"),
        ]);
    }

    candidates.into_iter().find(|path| path.exists())
}

fn env_var(key: &str) -> Result<String> {
    std::env::var(key)
        .map_err(|_| PosError::Config(format!("Missing required environment variable: {key}")))
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Mutex;

    use once_cell::sync::Lazy;
    use tempfile::NamedTempFile;

    use super::*;

    static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

    #[test]
    fn loads_from_env_when_all_vars_set() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");

        std::env::set_var("TILLPOINT_API_BASE_URL", "https://api.example.test/v1");
        std::env::set_var("TILLPOINT_API_TOKEN", "tp_test_token");
        std::env::set_var("TILLPOINT_LOCATION_ID", "3");
        std::env::set_var("TILLPOINT_DB_PATH", "/tmp/register.db");

        let config = load_from_env().expect("config from env");
        assert_eq!(config.api_base_url, "https://api.example.test/v1");
        assert_eq!(config.api_token, "tp_test_token");
        assert_eq!(config.location_id, 3);
        assert_eq!(config.db_path, "/tmp/register.db");

        std::env::remove_var("TILLPOINT_API_BASE_URL");
        std::env::remove_var("TILLPOINT_API_TOKEN");
        std::env::remove_var("TILLPOINT_LOCATION_ID");
        std::env::remove_var("TILLPOINT_DB_PATH");
    }

    #[test]
    fn missing_env_var_is_a_config_error() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");

        std::env::remove_var("TILLPOINT_API_BASE_URL");
        std::env::remove_var("TILLPOINT_API_TOKEN");

        let err = load_from_env().unwrap_err();
        assert!(matches!(err, PosError::Config(_)));
    }

    #[test]
    fn invalid_location_id_is_a_config_error() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");

        std::env::set_var("TILLPOINT_API_BASE_URL", "https://api.example.test/v1");
        std::env::set_var("TILLPOINT_API_TOKEN", "tp_test_token");
        std::env::set_var("TILLPOINT_LOCATION_ID", "not-a-number");

        let err = load_from_env().unwrap_err();
        assert!(matches!(err, PosError::Config(_)));

        std::env::remove_var("TILLPOINT_API_BASE_URL");
        std::env::remove_var("TILLPOINT_API_TOKEN");
        std::env::remove_var("TILLPOINT_LOCATION_ID");
    }

    #[test]
    fn loads_from_toml_file() {
        let toml_content = r#"
api_base_url = "https://api.example.test/v1"
api_token = "tp_file_token"
location_id = 7
db_path = "register.db"
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        let path = temp_file.path().with_extension("toml");
        std::fs::copy(temp_file.path(), &path).unwrap();

        let config = load_from_file(Some(path.clone())).expect("config from toml");
        assert_eq!(config.api_token, "tp_file_token");
        assert_eq!(config.location_id, 7);

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn loads_from_json_file() {
        let json_content = r#"{
            "api_base_url": "https://api.example.test/v1",
            "api_token": "tp_json_token",
            "location_id": 9,
            "db_path": "register.db"
        }"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(json_content.as_bytes()).unwrap();
        let path = temp_file.path().with_extension("json");
        std::fs::copy(temp_file.path(), &path).unwrap();

        let config = load_from_file(Some(path.clone())).expect("config from json");
        assert_eq!(config.api_token, "tp_json_token");
        assert_eq!(config.location_id, 9);

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let result = load_from_file(Some(PathBuf::from("/nonexistent/tillpoint.toml")));
        assert!(matches!(result.unwrap_err(), PosError::Config(_)));
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let result = parse_config("anything", Path::new("config.yaml"));
        assert!(matches!(result.unwrap_err(), PosError::Config(_)));
    }
}
