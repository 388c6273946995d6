//! # Integration abstraction.
//!
//! An [`Integration`] is a long-running unit that produces metrics. It is run
//! until canceled, declares which of its HTTP endpoints should be scraped, and
//! builds the handler serving those endpoints.
//!
//! The common handle type is [`IntegrationRef`], an `Arc<dyn Integration>`
//! shared between the run loop and the HTTP surface.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::handler::HandlerRef;
use crate::error::IntegrationError;

/// Shared handle to an integration.
pub type IntegrationRef = Arc<dyn Integration>;

/// A metrics endpoint exposed by an integration.
///
/// `metrics_path` is relative to the integration's own route prefix
/// (`/integrations/<name>`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeTarget {
    /// Job name, prefixed with `integrations/` in the generated scrape config.
    pub job_name: String,
    /// Path under the integration's route prefix.
    pub metrics_path: String,
}

impl ScrapeTarget {
    /// Creates a new scrape target.
    pub fn new(job_name: impl Into<String>, metrics_path: impl Into<String>) -> Self {
        Self {
            job_name: job_name.into(),
            metrics_path: metrics_path.into(),
        }
    }
}

/// # Long-running, cancelable metric producer.
///
/// ## Contract
/// - [`run`](Integration::run) blocks until `ctx` is cancelled or the integration
///   cannot continue. It **must** return [`IntegrationError::Canceled`] when the
///   return was caused by cancellation; any other error is an abnormal exit and
///   the integration is restarted after backoff.
/// - `run` may be called again on the same instance after an abnormal exit.
/// - [`metrics_handler`](Integration::metrics_handler) may be expensive; the
///   manager caches the result per running process.
#[async_trait]
pub trait Integration: Send + Sync + 'static {
    /// Runs the integration until cancellation or failure.
    async fn run(&self, ctx: CancellationToken) -> Result<(), IntegrationError>;

    /// Endpoints this integration wants scraped.
    fn scrape_configs(&self) -> Vec<ScrapeTarget>;

    /// Builds an HTTP handler serving this integration's current metrics.
    fn metrics_handler(&self) -> Result<HandlerRef, IntegrationError>;
}
