//! Test doubles shared by the unit tests.

use std::any::Any;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    extract::Request,
    response::{IntoResponse, Response},
};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::{
    CommonConfig, Event, HandlerRef, InstanceConfig, InstanceError, InstanceManager, Integration,
    IntegrationConfig, IntegrationError, IntegrationRef, MetricsHandler, ScrapeTarget,
    same_config,
};

/// What a [`TestIntegration`] does when run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Behavior {
    /// Wait for cancellation, then return `Canceled`.
    Block,
    /// Fail on the first `n` runs (counted per probe), then return `Ok`.
    FailThenSucceed(usize),
    /// Fail on every run.
    FailForever,
    /// Panic on every run.
    Panic,
    /// Never return, even when cancelled.
    IgnoreCancel,
}

/// Counters shared by every integration built from one [`TestConfig`].
#[derive(Debug, Default)]
pub(crate) struct Probe {
    pub builds: AtomicUsize,
    pub runs: AtomicUsize,
    pub handlers: AtomicUsize,
}

impl Probe {
    /// Waits (in virtual or real time) until at least `n` runs happened.
    pub(crate) async fn wait_runs(&self, n: usize) {
        while self.runs.load(Ordering::SeqCst) < n {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct TestConfig {
    pub name: String,
    pub common: CommonConfig,
    pub revision: u32,
    pub fail_init: bool,
    pub fail_handler: bool,
    pub behavior: Behavior,
    pub targets: Vec<ScrapeTarget>,
    pub probe: Arc<Probe>,
}

impl PartialEq for TestConfig {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.common == other.common
            && self.revision == other.revision
            && self.fail_init == other.fail_init
            && self.fail_handler == other.fail_handler
            && self.behavior == other.behavior
            && self.targets == other.targets
    }
}

impl TestConfig {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            common: CommonConfig::default(),
            revision: 1,
            fail_init: false,
            fail_handler: false,
            behavior: Behavior::Block,
            targets: vec![ScrapeTarget::new(name, "/metrics")],
            probe: Arc::new(Probe::default()),
        }
    }

    pub(crate) fn behave(mut self, behavior: Behavior) -> Self {
        self.behavior = behavior;
        self
    }

    pub(crate) fn build(&self) -> IntegrationRef {
        Arc::new(TestIntegration { cfg: self.clone() })
    }
}

impl IntegrationConfig for TestConfig {
    fn name(&self) -> &str {
        &self.name
    }

    fn common(&self) -> &CommonConfig {
        &self.common
    }

    fn new_integration(&self) -> Result<IntegrationRef, IntegrationError> {
        if self.fail_init {
            return Err(IntegrationError::Init {
                reason: format!("{} is misconfigured", self.name),
            });
        }
        self.probe.builds.fetch_add(1, Ordering::SeqCst);
        Ok(self.build())
    }

    fn same_as(&self, other: &dyn IntegrationConfig) -> bool {
        same_config(self, other)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub(crate) struct TestIntegration {
    cfg: TestConfig,
}

#[async_trait]
impl Integration for TestIntegration {
    async fn run(&self, ctx: CancellationToken) -> Result<(), IntegrationError> {
        let n = self.cfg.probe.runs.fetch_add(1, Ordering::SeqCst) + 1;
        match self.cfg.behavior {
            Behavior::Block => {
                ctx.cancelled().await;
                Err(IntegrationError::Canceled)
            }
            Behavior::FailThenSucceed(k) if n <= k => Err(IntegrationError::fail(format!("failure #{n}"))),
            Behavior::FailThenSucceed(_) => Ok(()),
            Behavior::FailForever => Err(IntegrationError::fail("always failing")),
            Behavior::Panic => panic!("integration exploded"),
            Behavior::IgnoreCancel => std::future::pending().await,
        }
    }

    fn scrape_configs(&self) -> Vec<ScrapeTarget> {
        self.cfg.targets.clone()
    }

    fn metrics_handler(&self) -> Result<HandlerRef, IntegrationError> {
        if self.cfg.fail_handler {
            return Err(IntegrationError::Handler {
                reason: "handler unavailable".into(),
            });
        }
        let id = self.cfg.probe.handlers.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Arc::new(CountingHandler {
            name: self.cfg.name.clone(),
            id,
        }))
    }
}

/// Handler answering `<name> handler #<id>`.
pub(crate) struct CountingHandler {
    name: String,
    id: usize,
}

#[async_trait]
impl MetricsHandler for CountingHandler {
    async fn serve(&self, _req: Request) -> Response {
        format!("{} handler #{}", self.name, self.id).into_response()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    Apply(InstanceConfig),
    Delete(String),
}

/// Instance manager recording every call.
#[derive(Default)]
pub(crate) struct RecordingInstances {
    calls: Mutex<Vec<Call>>,
    reject: Mutex<HashSet<String>>,
}

impl RecordingInstances {
    /// Makes `apply_config` fail for the instance `name`.
    pub(crate) fn reject(&self, name: &str) {
        self.reject.lock().unwrap().insert(name.to_string());
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn applied(&self) -> Vec<InstanceConfig> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Apply(cfg) => Some(cfg),
                Call::Delete(_) => None,
            })
            .collect()
    }

    pub(crate) fn deleted(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Delete(name) => Some(name),
                Call::Apply(_) => None,
            })
            .collect()
    }

    pub(crate) fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }
}

#[async_trait]
impl InstanceManager for RecordingInstances {
    async fn apply_config(&self, cfg: InstanceConfig) -> Result<(), InstanceError> {
        let rejected = self.reject.lock().unwrap().contains(&cfg.name);
        self.calls.lock().unwrap().push(Call::Apply(cfg));
        if rejected {
            return Err(InstanceError::Apply {
                reason: "rejected by test".into(),
            });
        }
        Ok(())
    }

    async fn delete_config(&self, name: &str) -> Result<(), InstanceError> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Delete(name.to_string()));
        Ok(())
    }
}

/// Collects every event currently buffered in `rx`.
pub(crate) fn drain(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
    let mut out = Vec::new();
    while let Ok(ev) = rx.try_recv() {
        out.push(ev);
    }
    out
}
