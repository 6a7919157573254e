use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::Result;

/// Retry settings applied by callers that opt into [`crate::retry::RetryPolicy`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
        }
    }
}

/// Client configuration.
///
/// Layered lowest to highest: defaults, YAML file, `NOTEBRIDGE_*` environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Backend root, e.g. `http://localhost:5000`
    pub base_url: String,
    /// Prefix for the notes and RAG resources; `/health` is always rooted
    pub api_prefix: String,
    pub timeout_secs: u64,
    /// `limit` sent with search requests
    pub search_limit: usize,
    pub retry: RetrySettings,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            api_prefix: "/api".to_string(),
            timeout_secs: 30,
            search_limit: 50,
            retry: RetrySettings::default(),
        }
    }
}

impl ClientConfig {
    /// Load from an optional YAML file, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_yaml_file(path)?,
            None => Self::default(),
        };
        Ok(config.with_env_overrides())
    }

    /// Read a YAML file. Missing keys keep their defaults.
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&text)?)
    }

    /// Apply `NOTEBRIDGE_*` environment variables on top of `self`.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup("NOTEBRIDGE_URL").filter(|v| !v.is_empty()) {
            self.base_url = url;
        }
        if let Some(prefix) = lookup("NOTEBRIDGE_API_PREFIX") {
            self.api_prefix = prefix;
        }
        if let Some(secs) = parse_var(&lookup, "NOTEBRIDGE_TIMEOUT_SECS") {
            self.timeout_secs = secs;
        }
        if let Some(attempts) = parse_var(&lookup, "NOTEBRIDGE_RETRY_ATTEMPTS") {
            self.retry.max_attempts = attempts;
        }
        if let Some(delay) = parse_var(&lookup, "NOTEBRIDGE_RETRY_DELAY_MS") {
            self.retry.base_delay_ms = delay;
        }
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Path of a resource under the API prefix, e.g. `notes/7` -> `/api/notes/7`.
    pub fn api_path(&self, resource: &str) -> String {
        let prefix = self.api_prefix.trim_end_matches('/');
        format!("{}/{}", prefix, resource.trim_start_matches('/'))
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "ignoring unparseable environment value");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, "http://localhost:5000");
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.base_delay_ms, 1000);
        assert_eq!(config.search_limit, 50);
    }

    #[test]
    fn test_api_path() {
        let config = ClientConfig::default();
        assert_eq!(config.api_path("notes"), "/api/notes");
        assert_eq!(config.api_path("/notes/7"), "/api/notes/7");

        let bare = ClientConfig {
            api_prefix: String::new(),
            ..ClientConfig::default()
        };
        assert_eq!(bare.api_path("rag/rebuild"), "/rag/rebuild");
    }

    #[test]
    fn test_yaml_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "base_url: http://notes.internal:8080\nretry:\n  max_attempts: 5").unwrap();

        let config = ClientConfig::from_yaml_file(file.path()).unwrap();
        assert_eq!(config.base_url, "http://notes.internal:8080");
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.base_delay_ms, 1000);
        assert_eq!(config.api_prefix, "/api");
    }

    #[test]
    fn test_yaml_missing_file_is_error() {
        assert!(ClientConfig::from_yaml_file(Path::new("/nonexistent/notebridge.yaml")).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("NOTEBRIDGE_URL", "http://10.0.0.2:5000"),
            ("NOTEBRIDGE_TIMEOUT_SECS", "5"),
            ("NOTEBRIDGE_RETRY_ATTEMPTS", "lots"),
        ]
        .into_iter()
        .collect();

        let config = ClientConfig::default()
            .with_overrides_from(|key| vars.get(key).map(|v| v.to_string()));
        assert_eq!(config.base_url, "http://10.0.0.2:5000");
        assert_eq!(config.timeout_secs, 5);
        // Unparseable values keep the previous setting
        assert_eq!(config.retry.max_attempts, 3);
    }

    #[test]
    fn test_serialization() {
        let config = ClientConfig::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: ClientConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, config);
    }
}
