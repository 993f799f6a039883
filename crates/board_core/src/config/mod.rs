use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_FILE_NAME: &str = "config.json";
const CONFIG_ENV_VAR: &str = "TASKBOARD_CONFIG_PATH";
pub const API_URL_ENV_VAR: &str = "TASKBOARD_API_URL";
pub const AUTH_TOKEN_ENV_VAR: &str = "TASKBOARD_AUTH_TOKEN";

pub const DEFAULT_API_URL: &str = "http://localhost:3000/api";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_NAMESPACE: &str = "taskboard_tasks";

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default)]
    pub auth_token: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub namespace: Option<String>,
}

impl Config {
    pub fn api_url(&self) -> &str {
        self.api_url.as_deref().unwrap_or(DEFAULT_API_URL)
    }

    pub fn auth_token(&self) -> Option<&str> {
        self.auth_token.as_deref()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    pub fn namespace(&self) -> &str {
        self.namespace.as_deref().unwrap_or(DEFAULT_NAMESPACE)
    }
}

#[derive(Debug, Clone)]
pub struct ConfigLoad {
    pub config: Config,
    pub error: Option<AppError>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub api_url: Option<String>,
    pub auth_token: Option<String>,
    pub timeout_secs: Option<u64>,
    pub namespace: Option<String>,
}

pub fn config_dir() -> Result<PathBuf, AppError> {
    if cfg!(windows) {
        let appdata =
            std::env::var("APPDATA").map_err(|_| AppError::invalid_data("APPDATA is not set"))?;
        Ok(PathBuf::from(appdata).join("taskboard"))
    } else {
        let home = std::env::var("HOME").map_err(|_| AppError::invalid_data("HOME is not set"))?;
        Ok(PathBuf::from(home).join(".config").join("taskboard"))
    }
}

pub fn config_path() -> Result<PathBuf, AppError> {
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR)
        && !path.trim().is_empty()
    {
        return Ok(PathBuf::from(path));
    }

    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Loads the config file, falling back to defaults on any error, then applies
/// environment overrides.
pub fn load_config_with_fallback() -> ConfigLoad {
    let mut load = match config_path() {
        Ok(path) => load_config_with_fallback_from_path(&path),
        Err(err) => ConfigLoad {
            config: Config::default(),
            error: Some(err),
        },
    };
    load.config = apply_env(load.config, |key| std::env::var(key).ok());
    load
}

fn load_config_with_fallback_from_path(path: &Path) -> ConfigLoad {
    if !path.exists() {
        return ConfigLoad {
            config: Config::default(),
            error: None,
        };
    }

    match load_config_from_path(path) {
        Ok(config) => ConfigLoad {
            config,
            error: None,
        },
        Err(err) => ConfigLoad {
            config: Config::default(),
            error: Some(err),
        },
    }
}

fn load_config_from_path(path: &Path) -> Result<Config, AppError> {
    let content = std::fs::read_to_string(path)
        .map_err(|err| AppError::io(format!("{}: {}", path.display(), err)))?;
    let config: Config = serde_json::from_str(&content).map_err(|err| {
        AppError::invalid_data(format!("invalid JSON in {}: {}", path.display(), err))
    })?;
    Ok(normalize_config(config))
}

fn normalize_config(mut config: Config) -> Config {
    config.api_url = config.api_url.and_then(|url| normalize_api_url(&url));
    config.auth_token = config.auth_token.and_then(|token| non_blank(&token));
    config.namespace = config.namespace.and_then(|name| non_blank(&name));
    config
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Trims whitespace and trailing slashes so routes can be appended verbatim.
pub fn normalize_api_url(raw: &str) -> Option<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub fn apply_env<F>(mut config: Config, lookup: F) -> Config
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup(API_URL_ENV_VAR).and_then(|url| normalize_api_url(&url)) {
        config.api_url = Some(url);
    }
    if let Some(token) = lookup(AUTH_TOKEN_ENV_VAR).and_then(|token| non_blank(&token)) {
        config.auth_token = Some(token);
    }
    config
}

pub fn merge_overrides(base: &Config, overrides: &ConfigOverrides) -> Config {
    let mut merged = base.clone();
    if let Some(url) = overrides.api_url.as_deref().and_then(normalize_api_url) {
        merged.api_url = Some(url);
    }
    if let Some(token) = overrides.auth_token.as_deref().and_then(non_blank) {
        merged.auth_token = Some(token);
    }
    if let Some(timeout_secs) = overrides.timeout_secs {
        merged.timeout_secs = Some(timeout_secs);
    }
    if let Some(namespace) = overrides.namespace.as_deref().and_then(non_blank) {
        merged.namespace = Some(namespace);
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::{
        API_URL_ENV_VAR, AUTH_TOKEN_ENV_VAR, Config, ConfigOverrides, DEFAULT_API_URL,
        DEFAULT_NAMESPACE, apply_env, load_config_from_path, load_config_with_fallback_from_path,
        merge_overrides, normalize_api_url,
    };
    use std::fs;
    use std::path::PathBuf;
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    fn temp_path(file_name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("taskboard-{nanos}-{file_name}"))
    }

    #[test]
    fn defaults_apply_when_fields_are_missing() {
        let config = Config::default();

        assert_eq!(config.api_url(), DEFAULT_API_URL);
        assert_eq!(config.namespace(), DEFAULT_NAMESPACE);
        assert_eq!(config.timeout(), Duration::from_secs(10));
        assert!(config.auth_token().is_none());
    }

    #[test]
    fn load_config_missing_returns_defaults_without_error() {
        let path = temp_path("missing-config.json");
        let result = load_config_with_fallback_from_path(&path);

        assert_eq!(result.config, Config::default());
        assert!(result.error.is_none());
    }

    #[test]
    fn load_config_invalid_returns_defaults_and_error() {
        let path = temp_path("invalid-config.json");
        fs::write(&path, "{ invalid json ").unwrap();

        let result = load_config_with_fallback_from_path(&path);
        fs::remove_file(&path).ok();

        assert_eq!(result.config, Config::default());
        assert_eq!(result.error.unwrap().code(), "invalid_data");
    }

    #[test]
    fn load_config_reads_and_normalizes_valid_file() {
        let path = temp_path("valid-config.json");
        let content = serde_json::json!({
            "api_url": " https://tasks.example.com/api/ ",
            "auth_token": "   ",
            "timeout_secs": 3,
            "namespace": "team_board"
        });
        fs::write(&path, serde_json::to_string(&content).unwrap()).unwrap();

        let loaded = load_config_from_path(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(loaded.api_url(), "https://tasks.example.com/api");
        assert!(loaded.auth_token.is_none());
        assert_eq!(loaded.timeout(), Duration::from_secs(3));
        assert_eq!(loaded.namespace(), "team_board");
    }

    #[test]
    fn env_overrides_file_values() {
        let base = Config {
            api_url: Some("http://file.example".into()),
            auth_token: Some("file-token".into()),
            ..Config::default()
        };

        let merged = apply_env(base, |key| match key {
            API_URL_ENV_VAR => Some("http://env.example/".into()),
            AUTH_TOKEN_ENV_VAR => Some("env-token".into()),
            _ => None,
        });

        assert_eq!(merged.api_url(), "http://env.example");
        assert_eq!(merged.auth_token(), Some("env-token"));
    }

    #[test]
    fn env_without_values_leaves_config_alone() {
        let base = Config {
            api_url: Some("http://file.example".into()),
            ..Config::default()
        };

        let merged = apply_env(base.clone(), |_| None);
        assert_eq!(merged, base);
    }

    #[test]
    fn merge_overrides_replaces_present_fields_only() {
        let base = Config {
            api_url: Some("http://file.example".into()),
            auth_token: Some("file-token".into()),
            timeout_secs: Some(5),
            namespace: None,
        };
        let overrides = ConfigOverrides {
            api_url: Some("http://cli.example//".into()),
            namespace: Some("scratch".into()),
            ..ConfigOverrides::default()
        };

        let merged = merge_overrides(&base, &overrides);

        assert_eq!(merged.api_url(), "http://cli.example");
        assert_eq!(merged.auth_token(), Some("file-token"));
        assert_eq!(merged.timeout_secs, Some(5));
        assert_eq!(merged.namespace(), "scratch");
        assert_eq!(base.namespace(), DEFAULT_NAMESPACE);
    }

    #[test]
    fn merge_overrides_with_empty_overrides_returns_clone() {
        let base = Config {
            api_url: Some("http://file.example".into()),
            ..Config::default()
        };

        assert_eq!(merge_overrides(&base, &ConfigOverrides::default()), base);
    }

    #[test]
    fn normalize_api_url_rejects_blank_values() {
        assert_eq!(normalize_api_url("  /  "), None);
        assert_eq!(
            normalize_api_url("http://localhost:3000/api/"),
            Some("http://localhost:3000/api".into())
        );
    }
}
