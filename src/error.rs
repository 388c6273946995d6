//! Error types used by the integrations manager, integrations and the instance layer.
//!
//! This module defines four enums:
//!
//! - [`RuntimeError`]: errors raised by the manager itself (apply/shutdown).
//! - [`IntegrationError`]: errors raised by individual integrations.
//! - [`InstanceError`]: errors raised while validating or applying generated scrape configs.
//! - [`ConfigError`]: errors raised while validating a [`ManagerConfig`](crate::ManagerConfig).
//!
//! All of them provide `as_label` for logs/metrics.

use std::time::Duration;
use thiserror::Error;

/// # Errors produced by the integrations manager.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    /// The manager was stopped; no further configuration is accepted.
    #[error("manager already stopped")]
    Stopped,

    /// The apply cycle completed, but some integrations did not converge.
    ///
    /// Every other integration was still started, stopped or re-projected.
    #[error("not all integrations were correctly updated: {failed:?}")]
    PartialApply {
        /// Keys of the integrations that failed to initialize or to be scraped (sorted).
        failed: Vec<String>,
    },

    /// Shutdown grace period was exceeded; some run loops did not exit in time.
    #[error("shutdown timeout {grace:?} exceeded; stuck: {stuck:?}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Keys of the integrations whose run loops were still alive.
        stuck: Vec<String>,
    },

    /// The agent hostname could not be determined.
    #[error("failed to resolve hostname: {reason}")]
    Hostname {
        /// Why resolution failed.
        reason: String,
    },

    /// The abnormal exit counter could not be registered.
    #[error("failed to register metrics: {reason}")]
    Metrics {
        /// The underlying registry error.
        reason: String,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use integravisor::RuntimeError;
    ///
    /// let err = RuntimeError::PartialApply { failed: vec!["integration/node".into()] };
    /// assert_eq!(err.as_label(), "runtime_partial_apply");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::Stopped => "runtime_stopped",
            RuntimeError::PartialApply { .. } => "runtime_partial_apply",
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
            RuntimeError::Hostname { .. } => "runtime_hostname",
            RuntimeError::Metrics { .. } => "runtime_metrics",
        }
    }
}

/// # Errors produced by integrations.
///
/// `Canceled` is the distinguished outcome of a cooperative shutdown; every
/// other variant returned from [`Integration::run`](crate::Integration::run)
/// is an abnormal exit and triggers a restart after backoff.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IntegrationError {
    /// Integration returned because its cancellation token fired.
    #[error("context canceled")]
    Canceled,

    /// Integration could not continue; it will be restarted.
    #[error("execution failed: {reason}")]
    Fail {
        /// The underlying error message.
        reason: String,
    },

    /// Integration panicked inside its run method.
    #[error("integration panicked: {info}")]
    Panicked {
        /// Panic payload rendered as text.
        info: String,
    },

    /// Integration could not be constructed from its config.
    #[error("failed to initialize integration: {reason}")]
    Init {
        /// The underlying error message.
        reason: String,
    },

    /// Integration could not produce a metrics handler.
    #[error("failed to create metrics handler: {reason}")]
    Handler {
        /// The underlying error message.
        reason: String,
    },
}

impl IntegrationError {
    /// Shorthand for [`IntegrationError::Fail`].
    pub fn fail(reason: impl Into<String>) -> Self {
        IntegrationError::Fail {
            reason: reason.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            IntegrationError::Canceled => "integration_canceled",
            IntegrationError::Fail { .. } => "integration_failed",
            IntegrationError::Panicked { .. } => "integration_panicked",
            IntegrationError::Init { .. } => "integration_init",
            IntegrationError::Handler { .. } => "integration_handler",
        }
    }

    /// Indicates whether the error is the cooperative-cancellation outcome.
    ///
    /// # Example
    /// ```
    /// use integravisor::IntegrationError;
    ///
    /// assert!(IntegrationError::Canceled.is_canceled());
    /// assert!(!IntegrationError::fail("boom").is_canceled());
    /// ```
    pub fn is_canceled(&self) -> bool {
        matches!(self, IntegrationError::Canceled)
    }
}

/// # Errors produced while handing scrape configs to the instance layer.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InstanceError {
    /// The generated config was rejected by the validator.
    #[error("invalid instance config: {reason}")]
    Invalid {
        /// The underlying error message.
        reason: String,
    },

    /// The instance manager failed to apply or delete a config.
    #[error("instance manager error: {reason}")]
    Apply {
        /// The underlying error message.
        reason: String,
    },
}

impl InstanceError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            InstanceError::Invalid { .. } => "instance_invalid",
            InstanceError::Apply { .. } => "instance_apply",
        }
    }
}

/// # Errors produced while validating a manager config.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// An enabled integration is scraped but no WAL directory is configured.
    #[error("no wal_directory configured")]
    NoWalDirectory,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_stable() {
        assert_eq!(RuntimeError::Stopped.as_label(), "runtime_stopped");
        assert_eq!(
            IntegrationError::Panicked { info: "x".into() }.as_label(),
            "integration_panicked"
        );
        assert_eq!(
            InstanceError::Invalid { reason: "x".into() }.as_label(),
            "instance_invalid"
        );
    }

    #[test]
    fn partial_apply_lists_keys() {
        let err = RuntimeError::PartialApply {
            failed: vec!["integration/a".into(), "integration/b".into()],
        };
        let msg = err.to_string();
        assert!(msg.starts_with("not all integrations were correctly updated"));
        assert!(msg.contains("integration/a"));
    }
}
