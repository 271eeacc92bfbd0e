//! Configuration Management
//!
//! Endpoint and credential settings for the client. Values are layered as
//! config file, then environment, then CLI flags, and the result is handed to
//! [`PrismClient::new`](crate::PrismClient::new) once. Nothing here is global.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use url::Url;

/// Default Prism API port
pub const DEFAULT_PORT: u16 = 9440;

/// Default API path prefix for relative request URLs
pub const DEFAULT_ABSOLUTE_PATH: &str = "api/nutanix/v3";

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

/// Endpoint and credentials
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Prism Central / Element host name or address
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Skip TLS certificate verification
    pub insecure: bool,
    /// Prefix joined in front of relative request paths
    pub absolute_path: String,
    pub user_agent: String,
    /// Per-request timeout
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: DEFAULT_PORT,
            username: String::new(),
            password: String::new(),
            insecure: false,
            absolute_path: DEFAULT_ABSOLUTE_PATH.to_string(),
            user_agent: format!("prism-client/{}", env!("CARGO_PKG_VERSION")),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

// Security: never print the password
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("insecure", &self.insecure)
            .field("absolute_path", &self.absolute_path)
            .field("user_agent", &self.user_agent)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("prism-client").join("config.json"))
    }

    /// Load configuration from the default path, falling back to defaults
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load configuration from a JSON file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Apply `NUTANIX_*` environment variables
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply environment-style overrides from an arbitrary lookup
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(host) = lookup("NUTANIX_ENDPOINT") {
            self.host = host;
        }
        if let Some(port) = lookup("NUTANIX_PORT") {
            self.port = port
                .parse()
                .with_context(|| format!("NUTANIX_PORT is not a valid port: {port}"))?;
        }
        if let Some(username) = lookup("NUTANIX_USERNAME") {
            self.username = username;
        }
        if let Some(password) = lookup("NUTANIX_PASSWORD") {
            self.password = password;
        }
        if let Some(insecure) = lookup("NUTANIX_INSECURE") {
            self.insecure = parse_bool(&insecure)
                .with_context(|| format!("NUTANIX_INSECURE is not a boolean: {insecure}"))?;
        }
        Ok(())
    }

    /// Reject settings the client cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            bail!("No endpoint configured. Set NUTANIX_ENDPOINT or use --host");
        }
        if self.port == 0 {
            bail!("Port must be non-zero");
        }
        Ok(())
    }

    /// `https://{host}:{port}/`
    pub fn base_url(&self) -> crate::error::Result<Url> {
        let raw = format!("https://{}:{}/", self.host, self.port);
        Url::parse(&raw).map_err(|source| crate::error::Error::InvalidUrl { url: raw, source })
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" | "" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.port, 9440);
        assert!(!config.insecure);
        assert_eq!(config.absolute_path, "api/nutanix/v3");
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config
            .apply_env_from(lookup(&[
                ("NUTANIX_ENDPOINT", "10.0.0.5"),
                ("NUTANIX_PORT", "9441"),
                ("NUTANIX_USERNAME", "admin"),
                ("NUTANIX_PASSWORD", "secret"),
                ("NUTANIX_INSECURE", "true"),
            ]))
            .unwrap();

        assert_eq!(config.host, "10.0.0.5");
        assert_eq!(config.port, 9441);
        assert_eq!(config.username, "admin");
        assert!(config.insecure);
        assert_eq!(
            config.base_url().unwrap().as_str(),
            "https://10.0.0.5:9441/"
        );
    }

    #[test]
    fn test_bad_env_values_are_errors() {
        let mut config = Config::default();
        assert!(config
            .apply_env_from(lookup(&[("NUTANIX_PORT", "not-a-port")]))
            .is_err());
        assert!(config
            .apply_env_from(lookup(&[("NUTANIX_INSECURE", "maybe")]))
            .is_err());
    }

    #[test]
    fn test_validate_requires_host() {
        let mut config = Config::default();
        assert!(config.validate().is_err());
        config.host = "prism.local".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_debug_redacts_password() {
        let config = Config {
            password: "hunter2".to_string(),
            ..Config::default()
        };
        let out = format!("{config:?}");
        assert!(!out.contains("hunter2"));
        assert!(out.contains("<redacted>"));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = serde_json::from_str(r#"{"host": "pc.example.com"}"#).unwrap();
        assert_eq!(config.host, "pc.example.com");
        assert_eq!(config.port, DEFAULT_PORT);
    }
}
