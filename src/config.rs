use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

use crate::http::reader::DEFAULT_READ_TIMEOUT;

/// Names a YAML file to load before applying environment overrides.
pub const CONFIG_ENV: &str = "TIDEWIRE_CONFIG";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub host: String,
    pub port: u16,

    #[serde(rename = "read_timeout_secs", deserialize_with = "deserialize_duration")]
    pub read_timeout: Duration,

    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 42069,
            read_timeout: DEFAULT_READ_TIMEOUT,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Defaults, then the file named by `TIDEWIRE_CONFIG` if any, then the
    /// `TIDEWIRE_HOST`, `TIDEWIRE_PORT`, `TIDEWIRE_READ_TIMEOUT_SECS` and
    /// `TIDEWIRE_LOG` variables.
    pub fn load() -> Self {
        let mut cfg = match std::env::var(CONFIG_ENV) {
            Ok(path) => Self::from_file(&path).unwrap_or_else(|e| {
                tracing::warn!(path = %path, error = %e, "falling back to default config");
                Self::default()
            }),
            Err(_) => Self::default(),
        };

        cfg.apply_env(|key| std::env::var(key).ok());
        cfg
    }

    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content =
            std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path))?;
        Self::from_yaml_str(&content).with_context(|| format!("failed to parse {}", path))
    }

    pub fn from_yaml_str(content: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Overrides fields from `lookup`; unparsable values are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(host) = lookup("TIDEWIRE_HOST") {
            self.host = host;
        }
        if let Some(port) = lookup("TIDEWIRE_PORT").and_then(|v| v.parse().ok()) {
            self.port = port;
        }
        if let Some(timeout) = lookup("TIDEWIRE_READ_TIMEOUT_SECS")
            .and_then(|v| v.parse::<f64>().ok())
            .filter(|secs| *secs > 0.0)
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
        {
            self.read_timeout = timeout;
        }
        if let Some(level) = lookup("TIDEWIRE_LOG") {
            self.log_level = level;
        }
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let secs = f64::deserialize(deserializer)?;
    if !secs.is_finite() || secs <= 0.0 {
        return Err(serde::de::Error::custom("read_timeout_secs must be positive"));
    }
    Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
}
