use std::sync::Arc;
use std::time::Duration;

use prometheus::Registry;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::{sync::CancellationToken, task::TaskTracker};

use super::config::ManagerConfig;
use super::handler_cache::HandlerCache;
use super::manager::Manager;
use super::metrics::AbnormalExits;
use crate::{
    error::RuntimeError,
    events::Bus,
    instance::{InstanceManager, Validator},
    subscribers::{Subscribe, SubscriberSet},
};

/// Default capacity of the runtime event bus.
const DEFAULT_BUS_CAPACITY: usize = 1024;

/// Builder for constructing a [`Manager`].
pub struct ManagerBuilder {
    cfg: ManagerConfig,
    hostname: Option<String>,
    subscribers: Vec<Arc<dyn Subscribe>>,
    registry: Option<Registry>,
    grace: Option<Duration>,
    bus_capacity: usize,
}

impl ManagerBuilder {
    /// Creates a builder for a manager that starts with `cfg` applied.
    pub fn new(cfg: ManagerConfig) -> Self {
        Self {
            cfg,
            hostname: None,
            subscribers: Vec::new(),
            registry: None,
            grace: None,
            bus_capacity: DEFAULT_BUS_CAPACITY,
        }
    }

    /// Overrides the hostname used in generated labels.
    ///
    /// Without it, the kernel hostname is used, falling back to `HOSTNAME`
    /// and then `/etc/hostname`.
    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    /// Sets event subscribers.
    ///
    /// Subscribers receive runtime events (integration lifecycle, scrape
    /// config changes, shutdown) through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Registers the abnormal exit counter into `registry`.
    pub fn with_registry(mut self, registry: Registry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Bounds how long [`Manager::stop`] waits for run loops.
    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = Some(grace);
        self
    }

    /// Sets the capacity of the runtime event bus (clamped to at least 1).
    pub fn with_bus_capacity(mut self, capacity: usize) -> Self {
        self.bus_capacity = capacity;
        self
    }

    /// Builds the manager and applies the initial configuration.
    ///
    /// ### Errors
    /// - [`RuntimeError::Hostname`] if no hostname was given and none could be resolved.
    /// - [`RuntimeError::Metrics`] if the counter could not be registered.
    /// - Any error of the initial [`Manager::apply_config`]; whatever was
    ///   started is stopped before returning.
    pub async fn build(
        self,
        instances: Arc<dyn InstanceManager>,
        validator: Validator,
    ) -> Result<Arc<Manager>, RuntimeError> {
        let hostname = match self.hostname {
            Some(h) => h,
            None => resolve_hostname()?,
        };
        let exits = AbnormalExits::new(self.registry.as_ref()).map_err(|e| RuntimeError::Metrics {
            reason: e.to_string(),
        })?;

        let bus = Bus::new(self.bus_capacity);
        let events_done = CancellationToken::new();
        let listener = if self.subscribers.is_empty() {
            None
        } else {
            let set = SubscriberSet::new(self.subscribers, bus.clone());
            Some(subscriber_listener(&bus, set, events_done.clone()))
        };

        let manager = Arc::new(Manager {
            cfg: Arc::new(RwLock::new(None)),
            processes: RwLock::default(),
            handlers: HandlerCache::default(),
            hostname,
            token: CancellationToken::new(),
            tracker: TaskTracker::new(),
            grace: self.grace,
            instances,
            validator,
            bus,
            exits,
            events_done,
            listener: Mutex::new(listener),
        });

        if let Err(err) = manager.apply_config(self.cfg).await {
            // Stop errors are secondary; the apply error is what the caller needs.
            let _ = manager.stop().await;
            return Err(err);
        }
        Ok(manager)
    }
}

/// Forwards bus events to the subscriber set until `done` fires.
///
/// Events already buffered when `done` fires are still delivered, then the
/// subscriber workers are drained.
fn subscriber_listener(bus: &Bus, set: SubscriberSet, done: CancellationToken) -> JoinHandle<()> {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                res = rx.recv() => match res {
                    Ok(ev) => set.emit(&ev),
                    Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => break,
                },
                _ = done.cancelled() => {
                    loop {
                        match rx.try_recv() {
                            Ok(ev) => set.emit(&ev),
                            Err(TryRecvError::Lagged(_)) => continue,
                            Err(_) => break,
                        }
                    }
                    break;
                }
            }
        }
        set.shutdown().await;
    })
}

/// Reads the kernel hostname, falling back to `HOSTNAME` and then `/etc/hostname`.
fn resolve_hostname() -> Result<String, RuntimeError> {
    if let Some(h) = kernel_hostname() {
        return Ok(h);
    }
    if let Ok(h) = std::env::var("HOSTNAME") {
        let h = h.trim();
        if !h.is_empty() {
            return Ok(h.to_string());
        }
    }
    let contents = std::fs::read_to_string("/etc/hostname").map_err(|e| RuntimeError::Hostname {
        reason: e.to_string(),
    })?;
    match contents.trim() {
        "" => Err(RuntimeError::Hostname {
            reason: "/etc/hostname is empty".into(),
        }),
        h => Ok(h.to_string()),
    }
}

/// Hostname reported by the OS, if non-empty valid UTF-8.
fn kernel_hostname() -> Option<String> {
    let name = gethostname::gethostname().into_string().ok()?;
    let name = name.trim();
    (!name.is_empty()).then(|| name.to_string())
}
