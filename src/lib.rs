//! # integravisor
//!
//! **Integravisor** supervises pluggable telemetry integrations inside a
//! metrics agent.
//!
//! Each integration is a long-running producer of metrics. The crate keeps
//! the running set in line with the latest configuration, restarts
//! integrations that exit abnormally, turns their declared scrape endpoints
//! into scrape configs for the agent's metrics pipeline, and serves each
//! integration's own metrics over HTTP.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   ManagerConfig ──► Manager::apply_config()
//!                         │
//!                         ├─► IntegrationConfig::new_integration()
//!                         │         └─► IntegrationProcess (one per key)
//!                         │                  └─► run loop: run ─► fail ─► backoff ─► run ...
//!                         │
//!                         ├─► projector: ScrapeTarget[] ─► InstanceConfig
//!                         │         └─► Validator ─► InstanceManager::apply_config()
//!                         │
//!                         └─► sweep removed keys ─► InstanceManager::delete_config()
//!
//!   GET /integrations/:name/metrics ─► Manager::router() ─► HandlerCache ─► MetricsHandler
//!
//!   run loops, Manager ── publish(Event) ──► Bus ──► subscriber listener ──► SubscriberSet
//!                                                                   ┌─────────┼─────────┐
//!                                                                   ▼         ▼         ▼
//!                                                                sub1       sub2      subN
//! ```
//!
//! ### Lifecycle of one integration
//! ```text
//! loop {
//!   ├─► exit if cancelled
//!   ├─► publish IntegrationStarting{ attempt }
//!   ├─► run(ctx) (panics contained)
//!   │       ├─ Ok / Canceled ─► publish IntegrationStopped, exit
//!   │       ├─ panic         ─► publish IntegrationPanicked, exit
//!   │       └─ Err           ─► publish IntegrationFailed
//!   │                           ├─ abnormal_exits{integration_name} += 1
//!   │                           ├─ publish BackoffScheduled{ delay }
//!   │                           └─ sleep(restart backoff) (cancellable), continue
//! }
//! ```
//!
//! ## Features
//! | Area              | Description                                                  | Key types / traits                          |
//! |-------------------|--------------------------------------------------------------|---------------------------------------------|
//! | **Supervision**   | Reconcile, restart and stop integrations.                    | [`Manager`], [`ManagerBuilder`]             |
//! | **Integrations**  | Define integrations and their configs.                       | [`Integration`], [`IntegrationConfig`], [`IntegrationFn`] |
//! | **Scraping**      | Generated scrape configs for the metrics pipeline.           | [`InstanceConfig`], [`InstanceManager`]     |
//! | **HTTP**          | Per-integration metrics endpoints.                           | [`MetricsHandler`], [`RegistryHandler`]     |
//! | **Subscriber API**| Hook into runtime events.                                    | [`Subscribe`], [`Event`]                    |
//! | **Errors**        | Typed errors for the manager, integrations and instances.   | [`RuntimeError`], [`IntegrationError`]      |
//!
//! ## Example
//! ```rust
//! use std::any::Any;
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use tokio_util::sync::CancellationToken;
//! use integravisor::{
//!     CommonConfig, InstanceConfig, InstanceError, InstanceManager, IntegrationConfig,
//!     IntegrationError, IntegrationFn, IntegrationRef, Manager, ManagerConfig, ScrapeTarget,
//!     accept_all, same_config,
//! };
//!
//! #[derive(Debug, PartialEq)]
//! struct Heartbeat {
//!     common: CommonConfig,
//! }
//!
//! impl IntegrationConfig for Heartbeat {
//!     fn name(&self) -> &str { "heartbeat" }
//!     fn common(&self) -> &CommonConfig { &self.common }
//!     fn new_integration(&self) -> Result<IntegrationRef, IntegrationError> {
//!         Ok(IntegrationFn::new(|ctx: CancellationToken| async move {
//!             ctx.cancelled().await;
//!             Err(IntegrationError::Canceled)
//!         })
//!         .with_targets(vec![ScrapeTarget::new("heartbeat", "/metrics")])
//!         .into_ref())
//!     }
//!     fn same_as(&self, other: &dyn IntegrationConfig) -> bool { same_config(self, other) }
//!     fn as_any(&self) -> &dyn Any { self }
//! }
//!
//! // Stands in for the agent's metrics pipeline.
//! struct PrintInstances;
//!
//! #[async_trait]
//! impl InstanceManager for PrintInstances {
//!     async fn apply_config(&self, cfg: InstanceConfig) -> Result<(), InstanceError> {
//!         println!("scrape {} at {}", cfg.name, cfg.scrape_configs[0].metrics_path);
//!         Ok(())
//!     }
//!     async fn delete_config(&self, name: &str) -> Result<(), InstanceError> {
//!         println!("unscrape {name}");
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = ManagerConfig {
//!         integrations: vec![Arc::new(Heartbeat { common: CommonConfig::default() })],
//!         ..ManagerConfig::default()
//!     };
//!
//!     let manager = Manager::builder(cfg)
//!         .with_hostname("agent-1")
//!         .build(Arc::new(PrintInstances), accept_all())
//!         .await?;
//!     assert_eq!(manager.keys().await, vec!["integration/heartbeat".to_string()]);
//!
//!     // Serve `manager.router()` from the agent's HTTP server here.
//!
//!     manager.stop().await?;
//!     Ok(())
//! }
//! ```
mod core;
mod error;
mod events;
mod instance;
mod integrations;
mod subscribers;

#[cfg(test)]
mod testing;

// ---- Public re-exports ----

pub use core::{DEFAULT_LISTEN_HOST, Manager, ManagerBuilder, ManagerConfig};
pub use error::{ConfigError, InstanceError, IntegrationError, RuntimeError};
pub use events::{Event, EventKind};
pub use instance::{
    HttpClientConfig, InstanceConfig, InstanceManager, RelabelAction, RelabelConfig,
    RemoteWriteConfig, ScrapeConfig, StaticConfig, TlsConfig, Validator, accept_all,
};
pub use integrations::{
    CommonConfig, HandlerRef, Integration, IntegrationConfig, IntegrationConfigRef, IntegrationFn,
    IntegrationRef, MetricsHandler, RegistryHandler, ScrapeTarget, integration_key, same_config,
};
pub use subscribers::Subscribe;
