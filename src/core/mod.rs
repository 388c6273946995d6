//! Runtime core: reconciliation, supervision and shutdown.
//!
//! The public API from this module is [`Manager`] (built through
//! [`ManagerBuilder`]) and its [`ManagerConfig`].
//!
//! Internal modules:
//! - [`manager`]: applies configs, owns the registry, handles shutdown;
//! - [`process`]: runs a single integration with restart backoff;
//! - [`runner`]: executes one run with panic containment and event publishing;
//! - [`projector`]: turns scrape targets into instance configs;
//! - [`handler_cache`]: per-process metrics handler cache;
//! - [`api`]: HTTP routes serving integration metrics.

mod api;
mod builder;
mod config;
mod handler_cache;
mod manager;
mod metrics;
mod process;
mod projector;
mod runner;

pub use builder::ManagerBuilder;
pub use config::{DEFAULT_LISTEN_HOST, ManagerConfig};
pub use manager::Manager;

pub(crate) use runner::panic_message;
