//! # Projection of integrations into instance configs.
//!
//! Pure functions turning an integration's declared [`ScrapeTarget`]s and the
//! global [`ManagerConfig`] into the [`InstanceConfig`] pushed to the instance
//! layer.
//!
//! ## Rules
//! - job name: `integrations/<declared job>`
//! - metrics path: `/integrations/<integration name>/<declared path>` (cleaned)
//! - scheme: `https` iff the agent's server uses TLS (client TLS mirrors the server)
//! - relabel rules: global defaults **first**, then the integration's own rules
//! - discovery: one static target, the agent's own listen address, labeled with
//!   the global labels and optionally `agent_hostname`

use std::collections::BTreeMap;

use super::config::ManagerConfig;
use crate::instance::{HttpClientConfig, InstanceConfig, ScrapeConfig, StaticConfig};
use crate::integrations::{IntegrationConfig, ScrapeTarget, integration_key};

/// Label carrying the agent hostname on every integration target.
pub(crate) const HOSTNAME_LABEL: &str = "agent_hostname";

/// Builds the instance config scraping `targets` of the integration configured by `icfg`.
pub(crate) fn instance_config(
    icfg: &dyn IntegrationConfig,
    targets: &[ScrapeTarget],
    cfg: &ManagerConfig,
    hostname: &str,
) -> InstanceConfig {
    let common = icfg.common();

    let mut relabel_configs = cfg.default_relabel_configs(hostname);
    relabel_configs.extend(common.relabel_configs.iter().cloned());

    let (scheme, http_client_config) = if cfg.server_using_tls {
        let client = HttpClientConfig {
            tls_config: Some(cfg.tls_config.clone()),
        };
        ("https", client)
    } else {
        ("http", HttpClientConfig::default())
    };

    let discovery = static_discovery(cfg, hostname);

    let scrape_configs = targets
        .iter()
        .map(|target| ScrapeConfig {
            job_name: format!("integrations/{}", target.job_name),
            metrics_path: join_path(&["/integrations", icfg.name(), &target.metrics_path]),
            scheme: scheme.to_string(),
            honor_labels: false,
            honor_timestamps: true,
            scrape_interval: common.scrape_interval,
            scrape_timeout: common.scrape_timeout,
            static_configs: vec![discovery.clone()],
            relabel_configs: relabel_configs.clone(),
            metric_relabel_configs: common.metric_relabel_configs.clone(),
            http_client_config: http_client_config.clone(),
        })
        .collect();

    let mut instance = InstanceConfig {
        name: integration_key(icfg.name()),
        scrape_configs,
        remote_write: cfg.remote_write.clone(),
        ..InstanceConfig::default()
    };
    if let Some(freq) = common.wal_truncate_override() {
        instance.wal_truncate_frequency = freq;
    }
    instance
}

/// The single static target pointing at the agent itself.
fn static_discovery(cfg: &ManagerConfig, hostname: &str) -> StaticConfig {
    let mut labels = BTreeMap::new();
    if cfg.use_hostname_label {
        labels.insert(HOSTNAME_LABEL.to_string(), hostname.to_string());
    }
    for (k, v) in &cfg.labels {
        labels.insert(k.clone(), v.clone());
    }
    StaticConfig {
        targets: vec![cfg.listen_addr()],
        labels,
    }
}

/// Joins path segments into one rooted, cleaned path (`.`/`..`/empty segments resolved).
fn join_path(parts: &[&str]) -> String {
    let mut out: Vec<&str> = Vec::new();
    for seg in parts.iter().flat_map(|p| p.split('/')) {
        match seg {
            "" | "." => {}
            ".." => {
                out.pop();
            }
            s => out.push(s),
        }
    }
    format!("/{}", out.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::{RelabelAction, RelabelConfig, RemoteWriteConfig, TlsConfig};
    use crate::testing::TestConfig;
    use std::time::Duration;

    fn project(icfg: &TestConfig, cfg: &ManagerConfig) -> InstanceConfig {
        instance_config(icfg, &icfg.targets, cfg, "host-a")
    }

    #[test]
    fn plain_http_projection() {
        let icfg = TestConfig::new("node");
        let cfg = ManagerConfig::default();
        let inst = project(&icfg, &cfg);

        assert_eq!(inst.name, "integration/node");
        assert_eq!(inst.scrape_configs.len(), 1);
        let sc = &inst.scrape_configs[0];
        assert_eq!(sc.job_name, "integrations/node");
        assert_eq!(sc.metrics_path, "/integrations/node/metrics");
        assert_eq!(sc.scheme, "http");
        assert_eq!(sc.http_client_config.tls_config, None);
        assert!(!sc.honor_labels);
        assert!(sc.honor_timestamps);
        assert_eq!(sc.relabel_configs, vec![RelabelConfig::replace_instance("host-a:12345")]);
        assert_eq!(sc.static_configs[0].targets, vec!["127.0.0.1:12345".to_string()]);
        assert_eq!(
            sc.static_configs[0].labels.get("agent_hostname").map(String::as_str),
            Some("host-a")
        );
        assert_eq!(inst.wal_truncate_frequency, InstanceConfig::default().wal_truncate_frequency);
    }

    #[test]
    fn tls_mirrors_server_settings() {
        let icfg = TestConfig::new("node");
        let tls = TlsConfig {
            ca_file: Some("/etc/agent/ca.pem".into()),
            server_name: Some("agent.local".into()),
            ..TlsConfig::default()
        };
        let cfg = ManagerConfig {
            server_using_tls: true,
            tls_config: tls.clone(),
            ..ManagerConfig::default()
        };
        let sc = &project(&icfg, &cfg).scrape_configs[0];
        assert_eq!(sc.scheme, "https");
        assert_eq!(sc.http_client_config.tls_config, Some(tls));
    }

    #[test]
    fn global_relabel_rule_runs_first() {
        let mut icfg = TestConfig::new("node");
        let own = RelabelConfig {
            source_labels: vec!["instance".into()],
            target_label: "instance".into(),
            replacement: "custom".into(),
            action: RelabelAction::Replace,
            ..RelabelConfig::default()
        };
        icfg.common.relabel_configs = vec![own.clone()];

        let rules = &project(&icfg, &ManagerConfig::default()).scrape_configs[0].relabel_configs;
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].replacement, "host-a:12345");
        assert_eq!(rules[1], own);

        let cfg = ManagerConfig {
            replace_instance_label: false,
            ..ManagerConfig::default()
        };
        assert_eq!(project(&icfg, &cfg).scrape_configs[0].relabel_configs, vec![own]);
    }

    #[test]
    fn labels_merge_and_hostname_label_is_optional() {
        let icfg = TestConfig::new("node");
        let mut cfg = ManagerConfig {
            use_hostname_label: false,
            listen_host: "10.1.2.3".into(),
            listen_port: 8080,
            ..ManagerConfig::default()
        };
        cfg.labels.insert("env".into(), "prod".into());

        let sd = &project(&icfg, &cfg).scrape_configs[0].static_configs[0];
        assert_eq!(sd.targets, vec!["10.1.2.3:8080".to_string()]);
        assert_eq!(sd.labels.len(), 1);
        assert_eq!(sd.labels.get("env").map(String::as_str), Some("prod"));
    }

    #[test]
    fn per_integration_overrides_apply() {
        let mut icfg = TestConfig::new("node");
        icfg.common.scrape_interval = Duration::from_secs(15);
        icfg.common.scrape_timeout = Duration::from_secs(10);
        icfg.common.wal_truncate_frequency = Duration::from_secs(120);
        icfg.targets = vec![
            ScrapeTarget::new("node", "/metrics"),
            ScrapeTarget::new("node_extra", "extra/../other/"),
        ];
        let cfg = ManagerConfig {
            remote_write: vec![RemoteWriteConfig {
                url: "http://cortex:9009/api/prom/push".into(),
                ..RemoteWriteConfig::default()
            }],
            ..ManagerConfig::default()
        };

        let inst = project(&icfg, &cfg);
        assert_eq!(inst.wal_truncate_frequency, Duration::from_secs(120));
        assert_eq!(inst.remote_write, cfg.remote_write);
        assert_eq!(inst.scrape_configs.len(), 2);
        assert_eq!(inst.scrape_configs[1].job_name, "integrations/node_extra");
        assert_eq!(inst.scrape_configs[1].metrics_path, "/integrations/node/other");
        assert!(
            inst.scrape_configs
                .iter()
                .all(|sc| sc.scrape_interval == Duration::from_secs(15)
                    && sc.scrape_timeout == Duration::from_secs(10))
        );
    }

    #[test]
    fn serialized_config_uses_pipeline_field_names() {
        let inst = project(&TestConfig::new("node"), &ManagerConfig::default());
        let json = serde_json::to_value(&inst).unwrap();
        assert_eq!(json["name"], "integration/node");
        assert_eq!(json["scrape_configs"][0]["job_name"], "integrations/node");
        assert_eq!(json["scrape_configs"][0]["metrics_path"], "/integrations/node/metrics");
        assert_eq!(json["scrape_configs"][0]["relabel_configs"][0]["action"], "replace");
        assert_eq!(json["wal_truncate_frequency"], 3_600_000);
    }

    #[test]
    fn join_path_cleans_segments() {
        assert_eq!(join_path(&["/integrations", "a", "/metrics"]), "/integrations/a/metrics");
        assert_eq!(join_path(&["/integrations", "a", "./x//y/"]), "/integrations/a/x/y");
        assert_eq!(join_path(&["/integrations", "a", "../../.."]), "/");
    }
}
