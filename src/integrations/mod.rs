//! # Integration abstractions and declarative configs.
//!
//! This module provides the integration-related types:
//! - [`Integration`] - trait for long-running, cancelable metric producers
//! - [`IntegrationRef`] - shared reference to an integration (`Arc<dyn Integration>`)
//! - [`IntegrationFn`] - closure-backed integration implementation
//! - [`IntegrationConfig`] - declarative config that builds an integration
//! - [`CommonConfig`] - settings every integration config carries
//! - [`MetricsHandler`], [`RegistryHandler`] - HTTP handlers serving integration metrics

mod common;
mod config;
mod handler;
mod integration;
mod integration_fn;

pub use common::CommonConfig;
pub use config::{IntegrationConfig, IntegrationConfigRef, integration_key, same_config};
pub use handler::{HandlerRef, MetricsHandler, RegistryHandler};
pub use integration::{Integration, IntegrationRef, ScrapeTarget};
pub use integration_fn::IntegrationFn;
