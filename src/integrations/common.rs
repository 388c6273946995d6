//! Settings shared by every integration config.

use std::time::Duration;

use crate::instance::RelabelConfig;

/// Settings every integration config carries next to its own fields.
///
/// ## Field semantics
/// - `enabled`: disabled integrations are treated as absent from the config
/// - `scrape_integration`: per-integration override of the global scrape flag
/// - `scrape_interval` / `scrape_timeout`: `Duration::ZERO` = pipeline default
/// - `wal_truncate_frequency`: `Duration::ZERO` = instance default
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommonConfig {
    /// Whether the integration runs at all.
    pub enabled: bool,
    /// Overrides [`ManagerConfig::scrape_integrations`](crate::ManagerConfig::scrape_integrations).
    pub scrape_integration: Option<bool>,
    /// Scrape interval for this integration's jobs.
    pub scrape_interval: Duration,
    /// Scrape timeout for this integration's jobs.
    pub scrape_timeout: Duration,
    /// Relabel rules appended after the global defaults.
    pub relabel_configs: Vec<RelabelConfig>,
    /// Relabel rules applied to scraped samples.
    pub metric_relabel_configs: Vec<RelabelConfig>,
    /// WAL truncate frequency of the generated instance.
    pub wal_truncate_frequency: Duration,
}

impl Default for CommonConfig {
    /// Enabled, no overrides.
    fn default() -> Self {
        Self {
            enabled: true,
            scrape_integration: None,
            scrape_interval: Duration::ZERO,
            scrape_timeout: Duration::ZERO,
            relabel_configs: Vec::new(),
            metric_relabel_configs: Vec::new(),
            wal_truncate_frequency: Duration::ZERO,
        }
    }
}

impl CommonConfig {
    /// Resolves whether the integration is scraped, given the global default.
    #[inline]
    pub fn should_scrape(&self, global: bool) -> bool {
        self.scrape_integration.unwrap_or(global)
    }

    /// Returns the WAL truncate frequency override, if set.
    #[inline]
    pub fn wal_truncate_override(&self) -> Option<Duration> {
        if self.wal_truncate_frequency == Duration::ZERO {
            None
        } else {
            Some(self.wal_truncate_frequency)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_wins_over_global() {
        let mut c = CommonConfig::default();
        assert!(c.should_scrape(true));
        assert!(!c.should_scrape(false));

        c.scrape_integration = Some(false);
        assert!(!c.should_scrape(true));
        c.scrape_integration = Some(true);
        assert!(c.should_scrape(false));
    }

    #[test]
    fn zero_truncate_frequency_is_no_override() {
        let mut c = CommonConfig::default();
        assert_eq!(c.wal_truncate_override(), None);
        c.wal_truncate_frequency = Duration::from_secs(30);
        assert_eq!(c.wal_truncate_override(), Some(Duration::from_secs(30)));
    }
}
