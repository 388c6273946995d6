//! # Generated instance configuration.
//!
//! An [`InstanceConfig`] is what the manager pushes to the instance layer for
//! one scraped integration: a set of [`ScrapeConfig`]s pointing back at the
//! agent's own HTTP server, plus the WAL/remote-write settings the instance
//! runs with.
//!
//! Field names follow the metrics pipeline's own config keys so a serialized
//! config can be rendered as-is. Durations are serialized in milliseconds;
//! a zero scrape interval/timeout means "pipeline default".

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::relabel::RelabelConfig;

/// Client-side TLS settings mirrored from the agent's server settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TlsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cert_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_name: Option<String>,
    #[serde(default)]
    pub insecure_skip_verify: bool,
}

/// HTTP client settings of a scrape config.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpClientConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_config: Option<TlsConfig>,
}

/// A static, single-source discovery group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticConfig {
    /// Target addresses (`host:port`).
    pub targets: Vec<String>,
    /// Labels attached to every target of the group.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

/// A remote-write destination.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteWriteConfig {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
}

/// One scrape job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeConfig {
    pub job_name: String,
    pub metrics_path: String,
    pub scheme: String,
    pub honor_labels: bool,
    pub honor_timestamps: bool,
    #[serde(with = "duration_millis")]
    pub scrape_interval: Duration,
    #[serde(with = "duration_millis")]
    pub scrape_timeout: Duration,
    pub static_configs: Vec<StaticConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub relabel_configs: Vec<RelabelConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub metric_relabel_configs: Vec<RelabelConfig>,
    #[serde(default)]
    pub http_client_config: HttpClientConfig,
}

/// Configuration of one metrics-pipeline instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceConfig {
    /// Instance name; equals the integration key.
    pub name: String,
    pub scrape_configs: Vec<ScrapeConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub remote_write: Vec<RemoteWriteConfig>,
    #[serde(with = "duration_millis")]
    pub wal_truncate_frequency: Duration,
    #[serde(with = "duration_millis")]
    pub min_wal_time: Duration,
    #[serde(with = "duration_millis")]
    pub max_wal_time: Duration,
    #[serde(with = "duration_millis")]
    pub remote_flush_deadline: Duration,
}

impl Default for InstanceConfig {
    /// Default instance settings:
    ///
    /// - `wal_truncate_frequency = 60m`
    /// - `min_wal_time = 5m`
    /// - `max_wal_time = 4h`
    /// - `remote_flush_deadline = 1m`
    fn default() -> Self {
        Self {
            name: String::new(),
            scrape_configs: Vec::new(),
            remote_write: Vec::new(),
            wal_truncate_frequency: Duration::from_secs(60 * 60),
            min_wal_time: Duration::from_secs(5 * 60),
            max_wal_time: Duration::from_secs(4 * 60 * 60),
            remote_flush_deadline: Duration::from_secs(60),
        }
    }
}

mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        u64::try_from(duration.as_millis())
            .unwrap_or(u64::MAX)
            .serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
