//! # Declarative integration configs.
//!
//! An [`IntegrationConfig`] is a decoded, comparable description of one
//! integration. The manager never knows the concrete type: it only asks for
//! the name, the [`CommonConfig`], structural equality against another config,
//! and a freshly built [`Integration`](crate::Integration).
//!
//! ## Identity
//! The manager keys running integrations by [`integration_key`] of the name.
//! Two configs with the same name in one [`ManagerConfig`](crate::ManagerConfig)
//! are a misconfiguration the caller must reject upstream.

use std::any::Any;
use std::fmt::Debug;
use std::sync::Arc;

use super::common::CommonConfig;
use super::integration::IntegrationRef;
use crate::error::IntegrationError;

/// Shared reference to an integration config.
pub type IntegrationConfigRef = Arc<dyn IntegrationConfig>;

/// # Declarative config of one integration.
///
/// # Example
/// ```
/// use std::any::Any;
/// use tokio_util::sync::CancellationToken;
/// use integravisor::{
///     CommonConfig, IntegrationConfig, IntegrationError, IntegrationFn, IntegrationRef,
///     ScrapeTarget, same_config,
/// };
///
/// #[derive(Debug, PartialEq)]
/// struct Heartbeat {
///     common: CommonConfig,
/// }
///
/// impl IntegrationConfig for Heartbeat {
///     fn name(&self) -> &str { "heartbeat" }
///     fn common(&self) -> &CommonConfig { &self.common }
///     fn new_integration(&self) -> Result<IntegrationRef, IntegrationError> {
///         Ok(IntegrationFn::new(|ctx: CancellationToken| async move {
///             ctx.cancelled().await;
///             Err(IntegrationError::Canceled)
///         })
///         .with_targets(vec![ScrapeTarget::new("heartbeat", "/metrics")])
///         .into_ref())
///     }
///     fn same_as(&self, other: &dyn IntegrationConfig) -> bool { same_config(self, other) }
///     fn as_any(&self) -> &dyn Any { self }
/// }
/// ```
pub trait IntegrationConfig: Debug + Send + Sync + 'static {
    /// Stable integration name; the identity key is derived from it.
    fn name(&self) -> &str;

    /// Settings shared by all integrations.
    fn common(&self) -> &CommonConfig;

    /// Builds a new integration instance. May fail on invalid settings.
    fn new_integration(&self) -> Result<IntegrationRef, IntegrationError>;

    /// Structural equality against another (possibly differently typed) config.
    ///
    /// Implementations usually delegate to [`same_config`].
    fn same_as(&self, other: &dyn IntegrationConfig) -> bool;

    /// Upcast used by [`same_config`] to compare concrete types.
    fn as_any(&self) -> &dyn Any;
}

/// Compares `this` with `other` if both have the same concrete type.
///
/// Configs of different types are never equal.
pub fn same_config<T>(this: &T, other: &dyn IntegrationConfig) -> bool
where
    T: IntegrationConfig + PartialEq,
{
    other
        .as_any()
        .downcast_ref::<T>()
        .is_some_and(|other| other == this)
}

/// Returns the key identifying the integration named `name`.
///
/// Used as the instance name in the instance manager and as the registry key.
///
/// # Example
/// ```
/// assert_eq!(integravisor::integration_key("node_exporter"), "integration/node_exporter");
/// ```
pub fn integration_key(name: &str) -> String {
    format!("integration/{name}")
}
