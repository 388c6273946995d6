//! # Function-backed integration (`IntegrationFn`)
//!
//! [`IntegrationFn`] wraps a closure `F: Fn(CancellationToken) -> Fut`, producing a
//! fresh future per run. Restarts never share hidden state; if state must survive
//! a restart, capture an `Arc<...>` in the closure explicitly.
//!
//! ## Example
//! ```rust
//! use tokio_util::sync::CancellationToken;
//! use integravisor::{IntegrationError, IntegrationFn, IntegrationRef, ScrapeTarget};
//!
//! let i: IntegrationRef = IntegrationFn::new(|ctx: CancellationToken| async move {
//!     ctx.cancelled().await;
//!     Err(IntegrationError::Canceled)
//! })
//! .with_targets(vec![ScrapeTarget::new("worker", "/metrics")])
//! .into_ref();
//!
//! assert_eq!(i.scrape_configs().len(), 1);
//! ```

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::handler::HandlerRef;
use super::integration::{Integration, IntegrationRef, ScrapeTarget};
use crate::error::IntegrationError;

/// Function-backed integration implementation.
pub struct IntegrationFn<F> {
    f: F,
    targets: Vec<ScrapeTarget>,
    handler: Option<HandlerRef>,
}

impl<F, Fut> IntegrationFn<F>
where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), IntegrationError>> + Send + 'static,
{
    /// Creates an integration running `f`, with no targets and no handler.
    pub fn new(f: F) -> Self {
        Self {
            f,
            targets: Vec::new(),
            handler: None,
        }
    }

    /// Sets the declared scrape targets.
    pub fn with_targets(mut self, targets: Vec<ScrapeTarget>) -> Self {
        self.targets = targets;
        self
    }

    /// Sets the handler returned by [`Integration::metrics_handler`].
    pub fn with_handler(mut self, handler: HandlerRef) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Returns the integration as a shared handle.
    pub fn into_ref(self) -> IntegrationRef {
        Arc::new(self)
    }
}

#[async_trait]
impl<F, Fut> Integration for IntegrationFn<F>
where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static, // Fn, not FnMut
    Fut: Future<Output = Result<(), IntegrationError>> + Send + 'static,
{
    async fn run(&self, ctx: CancellationToken) -> Result<(), IntegrationError> {
        (self.f)(ctx).await
    }

    fn scrape_configs(&self) -> Vec<ScrapeTarget> {
        self.targets.clone()
    }

    fn metrics_handler(&self) -> Result<HandlerRef, IntegrationError> {
        self.handler.clone().ok_or_else(|| IntegrationError::Handler {
            reason: "integration exposes no metrics handler".to_string(),
        })
    }
}
