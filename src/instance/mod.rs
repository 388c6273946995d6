//! # Metrics-pipeline instance layer.
//!
//! The manager projects every scraped integration into an [`InstanceConfig`]
//! and hands it to an external [`InstanceManager`], after checking it with a
//! caller-supplied [`Validator`].
//!
//! ## Contents
//! - [`InstanceConfig`], [`ScrapeConfig`], [`StaticConfig`], [`HttpClientConfig`] generated configs
//! - [`RelabelConfig`], [`RelabelAction`] relabel rules (assembled, never evaluated here)
//! - [`RemoteWriteConfig`] remote-write destinations copied from the global config
//! - [`InstanceManager`], [`Validator`] external collaborators

mod config;
mod manager;
mod relabel;

pub use config::{
    HttpClientConfig, InstanceConfig, RemoteWriteConfig, ScrapeConfig, StaticConfig, TlsConfig,
};
pub use manager::{InstanceManager, Validator, accept_all};
pub use relabel::{RelabelAction, RelabelConfig};
