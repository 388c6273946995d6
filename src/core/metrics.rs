//! Metrics owned by the integrations manager.

use prometheus::{IntCounterVec, Opts, Registry};

/// Counter of abnormal integration exits, labeled by integration name.
#[derive(Clone)]
pub(crate) struct AbnormalExits(IntCounterVec);

impl AbnormalExits {
    /// Identifier of the counter. Labels: `integration_name`.
    pub(crate) const NAME: &'static str = "agent_prometheus_integration_abnormal_exits_total";
    const HELP: &'static str =
        "Total number of times an agent integration exited unexpectedly, causing it to be restarted.";
    const LABEL: &'static str = "integration_name";

    /// Creates the counter and registers it into `registry`, if given.
    pub(crate) fn new(registry: Option<&Registry>) -> Result<Self, prometheus::Error> {
        let counter = IntCounterVec::new(Opts::new(Self::NAME, Self::HELP), &[Self::LABEL])?;
        if let Some(registry) = registry {
            registry.register(Box::new(counter.clone()))?;
        }
        Ok(Self(counter))
    }

    pub(crate) fn inc(&self, integration_name: &str) {
        self.0.with_label_values(&[integration_name]).inc();
    }

    pub(crate) fn get(&self, integration_name: &str) -> u64 {
        self.0.with_label_values(&[integration_name]).get()
    }
}
