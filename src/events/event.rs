//! # Runtime events emitted by the integrations manager and run loops.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Lifecycle events**: integration run flow (starting, stopped, failed, panicked, backoff)
//! - **Registry events**: integrations added to or removed from the registry
//! - **Instance events**: generated scrape configs applied, rejected or deleted
//! - **Runtime events**: shutdown and subscriber health
//!
//! The [`Event`] struct carries metadata such as timestamps, the integration
//! key, reasons, attempts, and backoff delays.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use integravisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::BackoffScheduled)
//!     .with_integration("integration/node")
//!     .with_reason("connection refused")
//!     .with_attempt(3)
//!     .with_delay(Duration::from_secs(5));
//!
//! assert_eq!(ev.kind, EventKind::BackoffScheduled);
//! assert_eq!(ev.integration.as_deref(), Some("integration/node"));
//! assert_eq!(ev.delay_ms, Some(5_000));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `integration`: subscriber name
    /// - `reason`: panic info/message
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `integration`: subscriber name
    /// - `reason`: reason string (e.g., "full", "closed")
    SubscriberOverflow,

    // === Shutdown events ===
    /// Manager stop requested; the root token is about to be cancelled.
    ShutdownRequested,

    /// All run loops exited (within the grace period, if one is set).
    AllStopped,

    /// Grace period exceeded; some run loops did not exit in time.
    GraceExceeded,

    // === Integration lifecycle events ===
    /// Run loop is invoking the integration.
    ///
    /// Sets:
    /// - `integration`: integration key
    /// - `attempt`: attempt number (1-based, per process)
    IntegrationStarting,

    /// Run loop terminated after cancellation (or a clean return).
    ///
    /// Sets:
    /// - `integration`: integration key
    /// - `attempt`: last attempt number
    IntegrationStopped,

    /// Integration exited abnormally; a restart follows after backoff.
    ///
    /// Sets:
    /// - `integration`: integration key
    /// - `attempt`: attempt number
    /// - `reason`: failure message
    IntegrationFailed,

    /// Restart scheduled after an abnormal exit.
    ///
    /// Sets:
    /// - `integration`: integration key
    /// - `attempt`: attempt that failed
    /// - `delay_ms`: delay before the next attempt (ms)
    /// - `reason`: failure message
    BackoffScheduled,

    /// Integration panicked; its run loop terminated without restart.
    ///
    /// Sets:
    /// - `integration`: integration key
    /// - `attempt`: attempt number
    /// - `reason`: panic info
    IntegrationPanicked,

    // === Registry events ===
    /// A new process was started and registered.
    ///
    /// Sets:
    /// - `integration`: integration key
    IntegrationAdded,

    /// A process was cancelled and removed from the registry.
    ///
    /// Sets:
    /// - `integration`: integration key
    /// - `reason`: `"changed"` or `"removed"`
    IntegrationRemoved,

    /// Integration could not be built from its config; it will not run.
    ///
    /// Sets:
    /// - `integration`: integration key
    /// - `reason`: error message
    InitFailed,

    // === Instance events ===
    /// Generated scrape config was applied to the instance manager.
    ///
    /// Sets:
    /// - `integration`: integration key
    ScrapeConfigApplied,

    /// Generated scrape config failed validation or apply.
    ///
    /// Sets:
    /// - `integration`: integration key
    /// - `reason`: error message
    ScrapeConfigRejected,

    /// Scrape config was deleted from the instance manager.
    ///
    /// Sets:
    /// - `integration`: integration key
    ScrapeConfigDeleted,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Integration key (or subscriber name), if applicable.
    pub integration: Option<Arc<str>>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
    /// Backoff delay before next attempt in milliseconds (compact).
    pub delay_ms: Option<u32>,
    /// Attempt count (starting from 1).
    pub attempt: Option<u32>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            integration: None,
            reason: None,
            delay_ms: None,
            attempt: None,
        }
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches an integration key.
    #[inline]
    pub fn with_integration(mut self, key: impl Into<Arc<str>>) -> Self {
        self.integration = Some(key.into());
        self
    }

    /// Attaches a backoff delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.delay_ms = Some(ms);
        self
    }

    /// Attaches an attempt count.
    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_integration(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_integration(subscriber)
            .with_reason(info)
    }

    /// Returns true if this event is about the integration `key`.
    #[inline]
    pub fn is_for(&self, key: &str) -> bool {
        self.integration.as_deref() == Some(key)
    }
}
