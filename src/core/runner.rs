//! # Run a single invocation of an integration.
//!
//! Executes one call of [`Integration::run`] behind a panic boundary and
//! publishes the terminal lifecycle event to the [`Bus`].
//!
//! ## Event flow
//!
//! ```text
//! Clean return / cancellation:
//!   integration.run() → Ok(()) | Err(Canceled) → publish IntegrationStopped
//!
//! Failure:
//!   integration.run() → Err(other) → publish IntegrationFailed
//!
//! Panic:
//!   integration.run() panics → catch_unwind → publish IntegrationPanicked
//!                                            → return Err(Panicked)
//! ```
//!
//! ## Rules
//! - Always publishes **exactly one** terminal event
//! - `Canceled` is a graceful exit and is folded into `Ok(())`
//! - A panic never unwinds past this function

use std::any::Any;

use futures::FutureExt;
use tokio_util::sync::CancellationToken;

use crate::{
    error::IntegrationError,
    events::{Bus, Event, EventKind},
    integrations::Integration,
};

/// Runs `integration` once with `ctx`, converting panics into [`IntegrationError::Panicked`].
///
/// ### Result
/// - `Ok(())`: integration returned cleanly or observed cancellation
/// - `Err(Panicked)`: integration panicked; callers must not restart it
/// - `Err(_)`: abnormal exit; callers restart after backoff
pub(crate) async fn run_once(
    integration: &dyn Integration,
    ctx: CancellationToken,
    key: &str,
    attempt: u32,
    bus: &Bus,
) -> Result<(), IntegrationError> {
    let fut = integration.run(ctx);
    let res = match std::panic::AssertUnwindSafe(fut).catch_unwind().await {
        Ok(res) => res,
        Err(panic) => Err(IntegrationError::Panicked {
            info: panic_message(panic.as_ref()),
        }),
    };

    match res {
        Ok(()) | Err(IntegrationError::Canceled) => {
            bus.publish(
                Event::new(EventKind::IntegrationStopped)
                    .with_integration(key)
                    .with_attempt(attempt),
            );
            Ok(())
        }
        Err(IntegrationError::Panicked { info }) => {
            bus.publish(
                Event::new(EventKind::IntegrationPanicked)
                    .with_integration(key)
                    .with_attempt(attempt)
                    .with_reason(info.as_str()),
            );
            Err(IntegrationError::Panicked { info })
        }
        Err(e) => {
            bus.publish(
                Event::new(EventKind::IntegrationFailed)
                    .with_integration(key)
                    .with_attempt(attempt)
                    .with_reason(e.to_string()),
            );
            Err(e)
        }
    }
}

/// Renders a panic payload as text.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
