//! # Global integrations configuration.
//!
//! Provides [`ManagerConfig`], the settings shared by every integration plus
//! the list of integration configs itself.
//!
//! A config is immutable for the duration of one apply cycle; the manager
//! replaces it wholesale under its config write lock.
//!
//! ## Sentinel values
//! - `listen_host = ""` → `127.0.0.1` when generating scrape targets

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;
use crate::instance::{RelabelConfig, RemoteWriteConfig, TlsConfig};
use crate::integrations::IntegrationConfigRef;

/// Host used for the scrape target when none is configured.
pub const DEFAULT_LISTEN_HOST: &str = "127.0.0.1";

/// Global configuration of the integrations subsystem.
///
/// ## Field semantics
/// - `scrape_integrations`: default for integrations without their own override
/// - `replace_instance_label`: prepend a rule rewriting `instance` to `<hostname>:<listen_port>`
/// - `use_hostname_label`: add `agent_hostname=<hostname>` to every scrape target
/// - `integration_restart_backoff`: fixed delay before restarting a failed integration
/// - `listen_host` / `listen_port`: where the agent's own HTTP server listens
/// - `server_using_tls`: scrape over `https` with `tls_config` mirrored into the client
#[derive(Clone)]
pub struct ManagerConfig {
    /// Scrape integrations unless they override it.
    pub scrape_integrations: bool,

    /// Replace the instance label with `<hostname>:<listen_port>`.
    pub replace_instance_label: bool,

    /// Add an `agent_hostname` label to every integration target.
    pub use_hostname_label: bool,

    /// Declarative integration configs. Names must be unique.
    pub integrations: Vec<IntegrationConfigRef>,

    /// Extra labels added to every integration target.
    pub labels: BTreeMap<String, String>,

    /// Remote-write destinations for every generated instance.
    pub remote_write: Vec<RemoteWriteConfig>,

    /// Delay before an abnormally exited integration is restarted.
    ///
    /// Read at the time of each failure, so a new value applies to the next
    /// restart of already running integrations.
    pub integration_restart_backoff: Duration,

    /// Host the agent listens on (`""` = loopback).
    pub listen_host: String,

    /// Port the agent listens on.
    pub listen_port: u16,

    /// TLS settings of the agent's server, mirrored into scrape clients.
    pub tls_config: TlsConfig,

    /// Whether the agent's server uses TLS.
    pub server_using_tls: bool,
}

impl ManagerConfig {
    /// Returns the relabel rules prepended to every integration's own rules.
    ///
    /// With `replace_instance_label` set this is a single rule writing
    /// `<hostname>:<listen_port>` into `instance`; otherwise empty.
    pub fn default_relabel_configs(&self, hostname: &str) -> Vec<RelabelConfig> {
        if !self.replace_instance_label {
            return Vec::new();
        }
        vec![RelabelConfig::replace_instance(format!(
            "{hostname}:{}",
            self.listen_port
        ))]
    }

    /// Returns the `host:port` the generated scrape targets point at.
    pub fn listen_addr(&self) -> String {
        let host = if self.listen_host.is_empty() {
            DEFAULT_LISTEN_HOST
        } else {
            self.listen_host.as_str()
        };
        format!("{host}:{}", self.listen_port)
    }

    /// Returns the integrations that are enabled.
    pub fn enabled_integrations(&self) -> impl Iterator<Item = &IntegrationConfigRef> {
        self.integrations.iter().filter(|ic| ic.common().enabled)
    }

    /// Validates the config against the agent's WAL setup.
    ///
    /// If any enabled integration is going to be scraped, a WAL directory
    /// must be configured.
    pub fn apply_defaults(&self, wal_dir: Option<&Path>) -> Result<(), ConfigError> {
        let wal_missing = wal_dir.is_none_or(|dir| dir.as_os_str().is_empty());
        if !wal_missing {
            return Ok(());
        }
        let scraped = self
            .enabled_integrations()
            .any(|ic| ic.common().should_scrape(self.scrape_integrations));
        if scraped {
            return Err(ConfigError::NoWalDirectory);
        }
        Ok(())
    }
}

impl Default for ManagerConfig {
    /// Default configuration:
    ///
    /// - `scrape_integrations = true`
    /// - `replace_instance_label = true`
    /// - `use_hostname_label = true`
    /// - `integration_restart_backoff = 5s`
    /// - `listen_host = ""` (loopback), `listen_port = 12345`
    /// - no TLS, no integrations, no labels, no remote write
    fn default() -> Self {
        Self {
            scrape_integrations: true,
            replace_instance_label: true,
            use_hostname_label: true,
            integrations: Vec::new(),
            labels: BTreeMap::new(),
            remote_write: Vec::new(),
            integration_restart_backoff: Duration::from_secs(5),
            listen_host: String::new(),
            listen_port: 12345,
            tls_config: TlsConfig::default(),
            server_using_tls: false,
        }
    }
}

impl PartialEq for ManagerConfig {
    /// Structural equality; integration configs are compared with
    /// [`IntegrationConfig::same_as`](crate::IntegrationConfig::same_as), in order.
    fn eq(&self, other: &Self) -> bool {
        self.scrape_integrations == other.scrape_integrations
            && self.replace_instance_label == other.replace_instance_label
            && self.use_hostname_label == other.use_hostname_label
            && self.labels == other.labels
            && self.remote_write == other.remote_write
            && self.integration_restart_backoff == other.integration_restart_backoff
            && self.listen_host == other.listen_host
            && self.listen_port == other.listen_port
            && self.tls_config == other.tls_config
            && self.server_using_tls == other.server_using_tls
            && self.integrations.len() == other.integrations.len()
            && self
                .integrations
                .iter()
                .zip(&other.integrations)
                .all(|(a, b)| a.same_as(b.as_ref()))
    }
}

impl fmt::Debug for ManagerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.integrations.iter().map(|ic| ic.name()).collect();
        f.debug_struct("ManagerConfig")
            .field("scrape_integrations", &self.scrape_integrations)
            .field("replace_instance_label", &self.replace_instance_label)
            .field("use_hostname_label", &self.use_hostname_label)
            .field("integrations", &names)
            .field("labels", &self.labels)
            .field("remote_write", &self.remote_write)
            .field(
                "integration_restart_backoff",
                &self.integration_restart_backoff,
            )
            .field("listen_addr", &self.listen_addr())
            .field("server_using_tls", &self.server_using_tls)
            .finish()
    }
}
