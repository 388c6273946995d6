//! # Manager: reconciles running integrations against a [`ManagerConfig`].
//!
//! The [`Manager`] owns the registry of running [`IntegrationProcess`]es, the
//! current config, the root cancellation token and the task tracker every run
//! loop registers with.
//!
//! ## Apply algorithm
//! ```text
//! apply_config(new)
//!   ├─► cfg.write() + registry.write()      (exclusive; calls serialize)
//!   ├─► stopped?            ─► Err(Stopped)
//!   ├─► new == current?     ─► Ok (no-op)
//!   ├─► for each enabled integration:
//!   │     ├─ same config running ─► keep
//!   │     ├─ else stop old process (if any), then
//!   │     └─ new_integration()
//!   │          ├─ Err ─► log, mark failed, delete_config(key)
//!   │          └─ Ok  ─► child token, tracker.spawn(run loop), register
//!   ├─► sweep: registered keys absent from `new` ─► delete_config, stop, unregister
//!   ├─► for each registered process:
//!   │     ├─ scraped     ─► project ─► validate ─► instances.apply_config
//!   │     └─ not scraped ─► instances.delete_config
//!   └─► store `new`; Err(PartialApply) if anything failed
//! ```
//!
//! ## Rules
//! - Never two live processes under one key: the old one is cancelled and
//!   unregistered before its replacement is built
//! - Every step runs to completion even when earlier steps failed
//! - Stopping a process is asynchronous; only [`Manager::stop`] waits for run loops
//! - Scrape failures never stop an integration

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock, broadcast};
use tokio::task::JoinHandle;
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::{error, warn};

use super::builder::ManagerBuilder;
use super::config::ManagerConfig;
use super::handler_cache::{HandlerCache, Lookup};
use super::metrics::AbnormalExits;
use super::process::{IntegrationProcess, RestartBackoff};
use super::projector;
use crate::{
    error::RuntimeError,
    events::{Bus, Event, EventKind},
    instance::{InstanceManager, Validator},
    integrations::{IntegrationConfigRef, integration_key},
};

/// Supervises the set of running integrations.
pub struct Manager {
    /// Current config; `None` until the first apply.
    pub(super) cfg: Arc<RwLock<Option<ManagerConfig>>>,
    /// Running processes by key.
    pub(super) processes: RwLock<BTreeMap<String, Arc<IntegrationProcess>>>,
    /// Metrics handlers by key.
    pub(super) handlers: HandlerCache,

    pub(super) hostname: String,
    /// Root token; every process token is a child of it.
    pub(super) token: CancellationToken,
    /// Shutdown wait group of all run loops.
    pub(super) tracker: TaskTracker,
    pub(super) grace: Option<Duration>,

    pub(super) instances: Arc<dyn InstanceManager>,
    pub(super) validator: Validator,

    pub(super) bus: Bus,
    pub(super) exits: AbnormalExits,
    /// Fired once the last event of [`stop`](Manager::stop) is published.
    pub(super) events_done: CancellationToken,
    /// Subscriber listener, if subscribers were configured.
    pub(super) listener: Mutex<Option<JoinHandle<()>>>,
}

impl Manager {
    /// Starts building a manager that will apply `cfg` first.
    pub fn builder(cfg: ManagerConfig) -> ManagerBuilder {
        ManagerBuilder::new(cfg)
    }

    /// Applies a new configuration.
    ///
    /// New and changed integrations are (re)started, removed ones are stopped,
    /// and scrape configs are regenerated for every running integration.
    ///
    /// ### Errors
    /// - [`RuntimeError::Stopped`] if [`stop`](Self::stop) was called; nothing changes.
    /// - [`RuntimeError::PartialApply`] if some integrations failed to start or to be
    ///   scraped. Everything else was still applied and `cfg` becomes current.
    pub async fn apply_config(&self, cfg: ManagerConfig) -> Result<(), RuntimeError> {
        let mut current = self.cfg.write().await;
        let mut processes = self.processes.write().await;

        if self.token.is_cancelled() {
            return Err(RuntimeError::Stopped);
        }
        if current.as_ref() == Some(&cfg) {
            return Ok(());
        }

        let mut failed = BTreeSet::new();
        let wanted: Vec<IntegrationConfigRef> = cfg.enabled_integrations().cloned().collect();

        for ic in &wanted {
            let key = integration_key(ic.name());

            if let Some(p) = processes.get(&key) {
                if p.cfg().same_as(ic.as_ref()) {
                    continue;
                }
                p.stop();
                processes.remove(&key);
                self.bus.publish(
                    Event::new(EventKind::IntegrationRemoved)
                        .with_integration(key.as_str())
                        .with_reason("changed"),
                );
            }

            let integration = match ic.new_integration() {
                Ok(i) => i,
                Err(err) => {
                    error!(
                        integration = %ic.name(),
                        err = %err,
                        "failed to initialize integration. it will not run or be scraped"
                    );
                    self.bus.publish(
                        Event::new(EventKind::InitFailed)
                            .with_integration(key.as_str())
                            .with_reason(err.to_string()),
                    );
                    failed.insert(key.clone());
                    // A previous process for this key is gone; so must be its scrape config.
                    self.delete_instance(&key).await;
                    continue;
                }
            };

            let process = Arc::new(IntegrationProcess::new(
                key.clone(),
                Arc::clone(ic),
                integration,
                self.token.child_token(),
            ));
            self.tracker
                .spawn(Arc::clone(&process).run(self.restart_backoff(), self.bus.clone()));
            processes.insert(key.clone(), process);
            self.bus
                .publish(Event::new(EventKind::IntegrationAdded).with_integration(key.as_str()));
        }

        let wanted_keys: HashSet<String> =
            wanted.iter().map(|ic| integration_key(ic.name())).collect();
        let obsolete: Vec<String> = processes
            .keys()
            .filter(|key| !wanted_keys.contains(*key))
            .cloned()
            .collect();
        for key in obsolete {
            self.delete_instance(&key).await;
            if let Some(p) = processes.remove(&key) {
                p.stop();
                self.bus.publish(
                    Event::new(EventKind::IntegrationRemoved)
                        .with_integration(key.as_str())
                        .with_reason("removed"),
                );
            }
        }

        // Generated configs may change even when the integration did not
        // (hostname label, TLS, remote write...), so every process is re-projected.
        for (key, p) in processes.iter() {
            if !p.cfg().common().should_scrape(cfg.scrape_integrations) {
                self.delete_instance(key).await;
                continue;
            }
            if !self.apply_instance(p, &cfg).await {
                failed.insert(key.clone());
            }
        }

        *current = Some(cfg);

        if failed.is_empty() {
            Ok(())
        } else {
            Err(RuntimeError::PartialApply {
                failed: failed.into_iter().collect(),
            })
        }
    }

    /// Stops the manager and every integration, then waits for all run loops to exit.
    ///
    /// With a grace period configured (see [`ManagerBuilder::with_grace`](crate::ManagerBuilder::with_grace)),
    /// waits at most that long and reports the integrations still running.
    /// Subsequent [`apply_config`](Self::apply_config) calls fail with [`RuntimeError::Stopped`].
    pub async fn stop(&self) -> Result<(), RuntimeError> {
        self.bus.publish(Event::new(EventKind::ShutdownRequested));
        self.token.cancel();
        self.tracker.close();

        let res = match self.grace {
            None => {
                self.tracker.wait().await;
                Ok(())
            }
            Some(grace) => match tokio::time::timeout(grace, self.tracker.wait()).await {
                Ok(()) => Ok(()),
                Err(_elapsed) => {
                    let stuck: Vec<String> = self
                        .processes
                        .read()
                        .await
                        .values()
                        .filter(|p| p.is_running())
                        .map(|p| p.key().to_string())
                        .collect();
                    self.bus.publish(Event::new(EventKind::GraceExceeded));
                    Err(RuntimeError::GraceExceeded { grace, stuck })
                }
            },
        };
        if res.is_ok() {
            self.bus.publish(Event::new(EventKind::AllStopped));
        }

        self.processes.write().await.clear();

        self.events_done.cancel();
        if let Some(listener) = self.listener.lock().await.take() {
            let _ = listener.await;
        }
        res
    }

    /// Returns the sorted keys of the running integrations.
    pub async fn keys(&self) -> Vec<String> {
        self.processes.read().await.keys().cloned().collect()
    }

    /// Returns a copy of the current configuration.
    pub async fn config(&self) -> ManagerConfig {
        self.cfg.read().await.clone().unwrap_or_default()
    }

    /// Hostname used for generated labels and relabel rules.
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Number of abnormal exits recorded for the integration named `name`.
    pub fn abnormal_exits(&self, name: &str) -> u64 {
        self.exits.get(name)
    }

    /// Creates a receiver for runtime events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Resolves the metrics handler of the integration named `name`.
    pub(crate) async fn load_handler(&self, name: &str) -> Lookup {
        let key = integration_key(name);
        let processes = self.processes.read().await;
        self.handlers.load(&key, &processes).await
    }

    fn restart_backoff(&self) -> RestartBackoff {
        RestartBackoff::new(Arc::clone(&self.cfg), self.exits.clone(), self.bus.clone())
    }

    /// Projects, validates and applies the scrape config of `p`.
    ///
    /// Returns `false` (after logging) if the config was rejected.
    async fn apply_instance(&self, p: &IntegrationProcess, cfg: &ManagerConfig) -> bool {
        let targets = p.integration().scrape_configs();
        let instance = projector::instance_config(p.cfg().as_ref(), &targets, cfg, &self.hostname);

        let res = match (self.validator)(&instance) {
            Ok(()) => self.instances.apply_config(instance).await.inspect_err(|err| {
                error!(
                    integration = %p.cfg().name(),
                    err = %err,
                    "failed to apply integration. integration will not be scraped"
                );
            }),
            Err(err) => {
                error!(
                    integration = %p.cfg().name(),
                    err = %err,
                    "failed to validate generated scrape config for integration. integration will not be scraped"
                );
                Err(err)
            }
        };

        match res {
            Ok(()) => {
                self.bus
                    .publish(Event::new(EventKind::ScrapeConfigApplied).with_integration(p.key()));
                true
            }
            Err(err) => {
                self.bus.publish(
                    Event::new(EventKind::ScrapeConfigRejected)
                        .with_integration(p.key())
                        .with_reason(err.to_string()),
                );
                false
            }
        }
    }

    /// Deletes the scrape config of `key`; absent configs are fine.
    async fn delete_instance(&self, key: &str) {
        match self.instances.delete_config(key).await {
            Ok(()) => self
                .bus
                .publish(Event::new(EventKind::ScrapeConfigDeleted).with_integration(key)),
            Err(err) => warn!(key = %key, err = %err, "failed to delete scrape config"),
        }
    }
}
