//! External collaborators that receive generated instance configs.

use std::sync::Arc;

use async_trait::async_trait;

use super::config::InstanceConfig;
use crate::error::InstanceError;

/// # Key-value store of running instance configs.
///
/// The integrations manager is one of possibly many writers. Configs are keyed
/// by [`InstanceConfig::name`].
///
/// ## Contract
/// - `apply_config` creates or replaces the config stored under its name.
/// - `delete_config` removes it; deleting a name that is not stored **must**
///   succeed (the manager calls it speculatively).
#[async_trait]
pub trait InstanceManager: Send + Sync + 'static {
    /// Creates or replaces the instance named `cfg.name`.
    async fn apply_config(&self, cfg: InstanceConfig) -> Result<(), InstanceError>;

    /// Deletes the instance named `name`, if any.
    async fn delete_config(&self, name: &str) -> Result<(), InstanceError>;
}

/// Checks a generated config before it is applied.
pub type Validator = Arc<dyn Fn(&InstanceConfig) -> Result<(), InstanceError> + Send + Sync>;

/// Validator that accepts every config.
pub fn accept_all() -> Validator {
    Arc::new(|_cfg: &InstanceConfig| Ok(()))
}
