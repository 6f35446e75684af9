//! Configuration management with file persistence

use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Hostpool configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub pool: PoolConfig,
    pub http: HttpConfig,
    pub demo: DemoConfig,
}

/// Backend pool settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    pub hosts: Vec<String>,
    pub min_samples_for_trust: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

/// HTTP transport settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub scheme: String,
    /// Per-request timeout, 0 disables it
    pub timeout_secs: u64,
}

/// Local demo backends
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    pub requests: usize,
    pub backends: usize,
    pub base_port: u16,
    pub latency_step_ms: u64,
    pub startup_wait_ms: u64,
    pub concurrency: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            hosts: vec![
                "127.0.0.1:8081".to_string(),
                "127.0.0.1:8084".to_string(),
                "127.0.0.1:8082".to_string(),
                "127.0.0.1:8083".to_string(),
            ],
            min_samples_for_trust: 5,
            seed: None,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            scheme: "http".to_string(),
            timeout_secs: 30,
        }
    }
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            requests: 1000,
            backends: 4,
            base_port: 8081,
            latency_step_ms: 100,
            startup_wait_ms: 500,
            concurrency: 1,
        }
    }
}

impl HttpConfig {
    /// Per-request timeout, if enabled
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

const VALID_SCHEMES: [&str; 2] = ["http", "https"];

const KEYS: [&str; 11] = [
    "pool.hosts",
    "pool.min_samples_for_trust",
    "pool.seed",
    "http.scheme",
    "http.timeout_secs",
    "demo.requests",
    "demo.backends",
    "demo.base_port",
    "demo.latency_step_ms",
    "demo.startup_wait_ms",
    "demo.concurrency",
];

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> anyhow::Result<PathBuf> {
        let dir = if let Ok(custom_dir) = env::var("HOSTPOOL_CONFIG_DIR") {
            PathBuf::from(custom_dir)
        } else {
            dirs::config_dir()
                .ok_or_else(|| anyhow!("Could not determine config directory"))?
                .join("hostpool")
        };
        Ok(dir)
    }

    /// Get the config file path
    pub fn config_path() -> anyhow::Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from file, or use defaults if it doesn't exist
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            // Return default config without creating file
            return Ok(Config::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to a specific file
    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        self.validate()?;

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        validate_hosts(&self.pool.hosts)?;

        if !VALID_SCHEMES.contains(&self.http.scheme.as_str()) {
            return Err(anyhow!(
                "Invalid scheme: {}. Valid options: {}",
                self.http.scheme,
                VALID_SCHEMES.join(", ")
            ));
        }
        if self.demo.concurrency == 0 {
            return Err(anyhow!("demo.concurrency must be at least 1"));
        }
        Ok(())
    }

    /// Get a configuration value by key
    pub fn get(&self, key: &str) -> anyhow::Result<String> {
        match key {
            // Pool settings
            "pool.hosts" => Ok(self.pool.hosts.join(", ")),
            "pool.min_samples_for_trust" => Ok(self.pool.min_samples_for_trust.to_string()),
            "pool.seed" => Ok(self
                .pool
                .seed
                .map(|s| s.to_string())
                .unwrap_or_else(|| "(not set)".to_string())),

            // HTTP settings
            "http.scheme" => Ok(self.http.scheme.clone()),
            "http.timeout_secs" => Ok(self.http.timeout_secs.to_string()),

            // Demo settings
            "demo.requests" => Ok(self.demo.requests.to_string()),
            "demo.backends" => Ok(self.demo.backends.to_string()),
            "demo.base_port" => Ok(self.demo.base_port.to_string()),
            "demo.latency_step_ms" => Ok(self.demo.latency_step_ms.to_string()),
            "demo.startup_wait_ms" => Ok(self.demo.startup_wait_ms.to_string()),
            "demo.concurrency" => Ok(self.demo.concurrency.to_string()),

            _ => Err(unknown_key(key)),
        }
    }

    /// Set a configuration value by key
    pub fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        match key {
            // Pool settings
            "pool.hosts" => {
                let hosts: Vec<String> = value
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect();
                validate_hosts(&hosts)?;
                self.pool.hosts = hosts;
            }
            "pool.min_samples_for_trust" => {
                self.pool.min_samples_for_trust = parse(key, value)?;
            }
            "pool.seed" => {
                self.pool.seed = match value {
                    "" | "none" => None,
                    v => Some(parse(key, v)?),
                };
            }

            // HTTP settings
            "http.scheme" => {
                if !VALID_SCHEMES.contains(&value) {
                    return Err(anyhow!(
                        "Invalid scheme: {}. Valid options: {}",
                        value,
                        VALID_SCHEMES.join(", ")
                    ));
                }
                self.http.scheme = value.to_string();
            }
            "http.timeout_secs" => {
                self.http.timeout_secs = parse(key, value)?;
            }

            // Demo settings
            "demo.requests" => self.demo.requests = parse(key, value)?,
            "demo.backends" => {
                let backends: usize = parse(key, value)?;
                if backends == 0 {
                    return Err(anyhow!("demo.backends must be at least 1"));
                }
                self.demo.backends = backends;
            }
            "demo.base_port" => self.demo.base_port = parse(key, value)?,
            "demo.latency_step_ms" => self.demo.latency_step_ms = parse(key, value)?,
            "demo.startup_wait_ms" => self.demo.startup_wait_ms = parse(key, value)?,
            "demo.concurrency" => {
                let concurrency: usize = parse(key, value)?;
                if concurrency == 0 {
                    return Err(anyhow!("demo.concurrency must be at least 1"));
                }
                self.demo.concurrency = concurrency;
            }

            _ => return Err(unknown_key(key)),
        }
        Ok(())
    }

    /// List all configuration keys and their values
    pub fn list(&self) -> anyhow::Result<Vec<(String, String)>> {
        KEYS.into_iter()
            .map(|key| {
                let value = self.get(key)?;
                Ok((key.to_string(), value))
            })
            .collect()
    }

    /// Reset configuration to defaults
    pub fn reset() -> anyhow::Result<()> {
        let path = Self::config_path()?;
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to remove config file: {}", path.display()))?;
        }
        Ok(())
    }
}

fn validate_hosts(hosts: &[String]) -> anyhow::Result<()> {
    if hosts.is_empty() {
        return Err(anyhow!("pool.hosts must list at least one host"));
    }
    let mut seen = HashSet::new();
    for host in hosts {
        if !seen.insert(host.as_str()) {
            return Err(anyhow!("Duplicate host in pool.hosts: {}", host));
        }
    }
    Ok(())
}

fn parse<T>(key: &str, value: &str) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .parse()
        .with_context(|| format!("Invalid {} value: {}", key, value))
}

fn unknown_key(key: &str) -> anyhow::Error {
    anyhow!(
        "Unknown configuration key: {}. Use `hostpool config list` to see available keys.",
        key
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.pool.hosts.len(), 4);
        assert_eq!(config.http.timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_set_and_get_hosts() {
        let mut config = Config::default();
        config.set("pool.hosts", "10.0.0.1:80, 10.0.0.2:80,").unwrap();
        assert_eq!(config.pool.hosts, vec!["10.0.0.1:80", "10.0.0.2:80"]);
        assert_eq!(config.get("pool.hosts").unwrap(), "10.0.0.1:80, 10.0.0.2:80");
    }

    #[test]
    fn test_set_rejects_bad_hosts() {
        let mut config = Config::default();
        assert!(config.set("pool.hosts", " , ").is_err());
        assert!(config.set("pool.hosts", "a:1,a:1").is_err());
        assert_eq!(config.pool.hosts, Config::default().pool.hosts);
    }

    #[test]
    fn test_set_validates_values() {
        let mut config = Config::default();
        assert!(config.set("http.scheme", "gopher").is_err());
        assert!(config.set("demo.concurrency", "0").is_err());
        assert!(config.set("demo.requests", "lots").is_err());
        assert!(config.set("nope", "1").is_err());

        config.set("pool.seed", "42").unwrap();
        assert_eq!(config.pool.seed, Some(42));
        config.set("pool.seed", "none").unwrap();
        assert_eq!(config.pool.seed, None);
    }

    #[test]
    fn test_timeout_zero_disables() {
        let mut config = Config::default();
        config.set("http.timeout_secs", "0").unwrap();
        assert_eq!(config.http.timeout(), None);
    }

    #[test]
    fn test_list_covers_every_key() {
        let items = Config::default().list().unwrap();
        assert_eq!(items.len(), KEYS.len());
        assert!(items.iter().any(|(k, v)| k == "pool.seed" && v == "(not set)"));
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.set("pool.hosts", "a:1,b:2").unwrap();
        config.set("pool.seed", "7").unwrap();
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let loaded = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(loaded, Config::default());
    }

    #[test]
    fn test_load_partial_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[pool]\nhosts = [\"x:1\"]\n").unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.pool.hosts, vec!["x:1"]);
        assert_eq!(loaded.demo, DemoConfig::default());
    }
}
