//! Configuration loader with layered merging.
//!
//! # Load Order
//!
//! 1. Default values (compile-time)
//! 2. Config file (`--config` or `TICKETDASH_CONFIG`)
//! 3. Environment variables (`TICKETDASH_*`)
//!
//! Each layer overrides the previous.

use std::path::{Path, PathBuf};

use tracing::debug;

use super::{
    BackendConfig, ConfigError, ENV_API_BASE_URL, ENV_CONFIG_PATH, ENV_LISTEN_ADDR, ENV_LOG,
    ENV_MAX_SESSIONS, ENV_REQUEST_TIMEOUT_SECS, ENV_SESSION_IDLE_SECS,
};

/// Configuration loader with builder pattern.
///
/// ```ignore
/// let config = ConfigLoader::new()
///     .with_file("/etc/ticketdash/config.toml")
///     .skip_env_vars()
///     .load()?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    file: Option<PathBuf>,
    skip_env: bool,
}

impl ConfigLoader {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load this file. A file named explicitly must exist.
    #[must_use]
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Skips environment variable loading, including `TICKETDASH_CONFIG`.
    #[must_use]
    pub fn skip_env_vars(mut self) -> Self {
        self.skip_env = true;
        self
    }

    pub fn load(&self) -> Result<BackendConfig, ConfigError> {
        if self.skip_env {
            self.load_with(|_| None)
        } else {
            self.load_with(|name| std::env::var(name).ok())
        }
    }

    /// Load with an explicit environment lookup.
    pub fn load_with<F>(&self, env: F) -> Result<BackendConfig, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = BackendConfig::default();

        let file = self
            .file
            .clone()
            .or_else(|| env(ENV_CONFIG_PATH).map(PathBuf::from));
        if let Some(path) = file {
            config = load_file(&path)?;
            debug!(path = %path.display(), "Loaded config file");
        }

        apply_env(&mut config, &env)?;
        config.validate()?;
        Ok(config)
    }
}

fn load_file(path: &Path) -> Result<BackendConfig, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&raw).map_err(|source| ConfigError::ParseToml {
        path: path.to_path_buf(),
        source,
    })
}

fn apply_env<F>(config: &mut BackendConfig, env: &F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(raw) = env(ENV_LISTEN_ADDR) {
        config.listen_addr = raw
            .parse()
            .map_err(|_| ConfigError::invalid_env_var(ENV_LISTEN_ADDR, "expected host:port"))?;
    }
    if let Some(raw) = env(ENV_API_BASE_URL) {
        config.api_base_url = raw;
    }
    if let Some(raw) = env(ENV_REQUEST_TIMEOUT_SECS) {
        config.request_timeout_secs = raw.parse().map_err(|_| {
            ConfigError::invalid_env_var(ENV_REQUEST_TIMEOUT_SECS, "expected whole seconds")
        })?;
    }
    if let Some(raw) = env(ENV_SESSION_IDLE_SECS) {
        config.session_idle_secs = raw.parse().map_err(|_| {
            ConfigError::invalid_env_var(ENV_SESSION_IDLE_SECS, "expected whole seconds")
        })?;
    }
    if let Some(raw) = env(ENV_MAX_SESSIONS) {
        config.max_sessions = raw
            .parse()
            .map_err(|_| ConfigError::invalid_env_var(ENV_MAX_SESSIONS, "expected a count"))?;
    }
    if let Some(raw) = env(ENV_LOG) {
        config.log_filter = raw;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    fn config_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn defaults_without_file_or_env() {
        let config = ConfigLoader::new().skip_env_vars().load().unwrap();
        assert_eq!(config, BackendConfig::default());
    }

    #[test]
    fn file_overrides_defaults() {
        let file = config_file(
            r#"
listen_addr = "0.0.0.0:9000"
api_base_url = "https://api.example.com/v1"
token_cookie = "sid"
"#,
        );
        let config = ConfigLoader::new()
            .with_file(file.path())
            .skip_env_vars()
            .load()
            .unwrap();
        assert_eq!(config.listen_addr.port(), 9000);
        assert_eq!(config.api_base_url, "https://api.example.com/v1");
        assert_eq!(config.token_cookie, "sid");
        assert_eq!(config.user_cookie, "userId");
    }

    #[test]
    fn env_overrides_file() {
        let file = config_file(r#"request_timeout_secs = 10"#);
        let config = ConfigLoader::new()
            .with_file(file.path())
            .load_with(env_of(&[
                (ENV_REQUEST_TIMEOUT_SECS, "5"),
                (ENV_LOG, "debug"),
            ]))
            .unwrap();
        assert_eq!(config.request_timeout_secs, 5);
        assert_eq!(config.log_filter, "debug");
    }

    #[test]
    fn session_limits_come_from_env() {
        let config = ConfigLoader::new()
            .load_with(env_of(&[
                (ENV_SESSION_IDLE_SECS, "60"),
                (ENV_MAX_SESSIONS, "250"),
            ]))
            .unwrap();
        assert_eq!(config.session_idle_secs, 60);
        assert_eq!(config.max_sessions, 250);

        let err = ConfigLoader::new()
            .load_with(env_of(&[(ENV_MAX_SESSIONS, "lots")]))
            .unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidEnvVar { ref name, .. } if name == ENV_MAX_SESSIONS)
        );
    }

    #[test]
    fn config_path_can_come_from_env() {
        let file = config_file(r#"user_cookie = "uid""#);
        let path = file.path().to_string_lossy().to_string();
        let config = ConfigLoader::new()
            .load_with(env_of(&[(ENV_CONFIG_PATH, path.as_str())]))
            .unwrap();
        assert_eq!(config.user_cookie, "uid");
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let err = ConfigLoader::new()
            .with_file("/definitely/not/here.toml")
            .skip_env_vars()
            .load()
            .unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }

    #[test]
    fn malformed_file_names_the_path() {
        let file = config_file("listen_addr = [");
        let err = ConfigLoader::new()
            .with_file(file.path())
            .skip_env_vars()
            .load()
            .unwrap_err();
        assert!(matches!(err, ConfigError::ParseToml { .. }));
        assert!(err.to_string().contains(&file.path().display().to_string()));
    }

    #[test]
    fn bad_env_value_is_reported() {
        let err = ConfigLoader::new()
            .load_with(env_of(&[(ENV_LISTEN_ADDR, "not-an-address")]))
            .unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidEnvVar { ref name, .. } if name == ENV_LISTEN_ADDR)
        );
    }

    #[test]
    fn invalid_result_is_rejected_after_merge() {
        let err = ConfigLoader::new()
            .load_with(env_of(&[(ENV_REQUEST_TIMEOUT_SECS, "0")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }
}
