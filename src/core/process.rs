//! # IntegrationProcess: one supervised integration instance.
//!
//! A process is created every time the manager (re)starts an integration and
//! lives until it is cancelled. Its run loop keeps the integration running:
//! - restarts after every abnormal exit, after a fixed backoff read from the
//!   current [`ManagerConfig`],
//! - stops on cancellation or on a clean/canceled return,
//! - stops for good when the integration panics.
//!
//! ## Architecture
//! ```text
//! Manager::apply_config ──► IntegrationProcess ──► tracker.spawn(run())
//!
//! loop {
//!   ├─► exit if token cancelled
//!   ├─► attempt += 1, publish IntegrationStarting
//!   ├─► run_once() ─────► integration.run(token)
//!   │       ├─ Ok                ─► log "stopped integration", exit
//!   │       ├─ Err(Panicked)     ─► log bug, exit (no restart)
//!   │       └─ Err(other)        ─► RestartBackoff::wait():
//!   │                                 ├─ abnormal_exits{integration_name} += 1
//!   │                                 ├─ read backoff under config read lock
//!   │                                 ├─ publish BackoffScheduled
//!   │                                 └─ sleep(backoff) (cancellable) ─► continue
//! }
//! ```
//!
//! ## Rules
//! - Invocations run **sequentially** within one process (never parallel)
//! - The backoff duration is sampled once per failure; a concurrent apply does
//!   not change a sleep already in progress
//! - Cancelling a process never affects the manager or its siblings

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::{select, sync::RwLock, time};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::config::ManagerConfig;
use super::metrics::AbnormalExits;
use super::runner::run_once;
use crate::{
    error::IntegrationError,
    events::{Bus, Event, EventKind},
    integrations::{IntegrationConfigRef, IntegrationRef},
};

/// A running integration together with the config it was built from.
pub(crate) struct IntegrationProcess {
    /// Registry key (`integration/<name>`).
    key: String,
    /// Config snapshot this process was built from.
    cfg: IntegrationConfigRef,
    /// Live integration.
    integration: IntegrationRef,
    /// Child of the manager's root token.
    token: CancellationToken,
    /// Set once the run loop has returned.
    exited: AtomicBool,
}

impl IntegrationProcess {
    pub(crate) fn new(
        key: String,
        cfg: IntegrationConfigRef,
        integration: IntegrationRef,
        token: CancellationToken,
    ) -> Self {
        Self {
            key,
            cfg,
            integration,
            token,
            exited: AtomicBool::new(false),
        }
    }

    pub(crate) fn key(&self) -> &str {
        &self.key
    }

    pub(crate) fn cfg(&self) -> &IntegrationConfigRef {
        &self.cfg
    }

    pub(crate) fn integration(&self) -> &IntegrationRef {
        &self.integration
    }

    /// Cancels the process. Returns immediately; the run loop exits asynchronously.
    pub(crate) fn stop(&self) {
        self.token.cancel();
    }

    /// Returns true once [`stop`](Self::stop) (or a parent cancellation) happened.
    #[cfg(test)]
    pub(crate) fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Returns true while the run loop has not returned.
    pub(crate) fn is_running(&self) -> bool {
        !self.exited.load(Ordering::Acquire)
    }

    /// Runs the integration until cancellation, a clean stop or a panic.
    pub(crate) async fn run(self: Arc<Self>, backoff: RestartBackoff, bus: Bus) {
        let name = self.cfg.name().to_string();
        let mut attempt: u32 = 0;

        loop {
            if self.token.is_cancelled() {
                info!(integration = %name, "stopped integration");
                break;
            }

            attempt = attempt.saturating_add(1);
            bus.publish(
                Event::new(EventKind::IntegrationStarting)
                    .with_integration(self.key.as_str())
                    .with_attempt(attempt),
            );

            let res = run_once(
                self.integration.as_ref(),
                self.token.clone(),
                &self.key,
                attempt,
                &bus,
            )
            .await;

            match res {
                Ok(()) => {
                    info!(integration = %name, "stopped integration");
                    break;
                }
                Err(IntegrationError::Panicked { info }) => {
                    error!(integration = %name, err = %info, "integration has panicked. THIS IS A BUG!");
                    break;
                }
                Err(err) => {
                    let keep_going = backoff
                        .wait(&self.key, &name, &err, attempt, &self.token)
                        .await;
                    if !keep_going {
                        info!(integration = %name, "stopped integration");
                        break;
                    }
                }
            }
        }

        self.exited.store(true, Ordering::Release);
    }
}

/// Restart delay shared by every run loop of one manager.
#[derive(Clone)]
pub(crate) struct RestartBackoff {
    cfg: Arc<RwLock<Option<ManagerConfig>>>,
    exits: AbnormalExits,
    bus: Bus,
}

impl RestartBackoff {
    pub(crate) fn new(
        cfg: Arc<RwLock<Option<ManagerConfig>>>,
        exits: AbnormalExits,
        bus: Bus,
    ) -> Self {
        Self { cfg, exits, bus }
    }

    /// Records an abnormal exit and sleeps for the configured backoff.
    ///
    /// Returns `false` if `token` was cancelled during the sleep.
    async fn wait(
        &self,
        key: &str,
        name: &str,
        err: &IntegrationError,
        attempt: u32,
        token: &CancellationToken,
    ) -> bool {
        let delay = {
            let cfg = self.cfg.read().await;
            cfg.as_ref()
                .map(|c| c.integration_restart_backoff)
                .unwrap_or_else(|| ManagerConfig::default().integration_restart_backoff)
        };

        self.exits.inc(name);
        error!(
            integration = %name,
            err = %err,
            backoff = ?delay,
            "integration stopped abnormally, restarting after backoff"
        );
        self.bus.publish(
            Event::new(EventKind::BackoffScheduled)
                .with_integration(key)
                .with_attempt(attempt)
                .with_delay(delay)
                .with_reason(err.to_string()),
        );

        let sleep = time::sleep(delay);
        tokio::pin!(sleep);
        select! {
            _ = &mut sleep => true,
            _ = token.cancelled() => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Behavior, TestConfig, drain};
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    struct Harness {
        process: Arc<IntegrationProcess>,
        backoff: RestartBackoff,
        exits: AbnormalExits,
        bus: Bus,
        cfg: Arc<RwLock<Option<ManagerConfig>>>,
    }

    fn harness(test_cfg: TestConfig, backoff: Duration) -> Harness {
        let cfg = Arc::new(RwLock::new(Some(ManagerConfig {
            integration_restart_backoff: backoff,
            ..ManagerConfig::default()
        })));
        let bus = Bus::new(256);
        let exits = AbnormalExits::new(None).unwrap();
        let integration = test_cfg.build();
        let process = Arc::new(IntegrationProcess::new(
            "integration/a".into(),
            Arc::new(test_cfg),
            integration,
            CancellationToken::new(),
        ));
        Harness {
            backoff: RestartBackoff::new(cfg.clone(), exits.clone(), bus.clone()),
            process,
            exits,
            bus,
            cfg,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn restarts_after_each_failure_until_success() {
        let test_cfg = TestConfig::new("a").behave(Behavior::FailThenSucceed(3));
        let probe = test_cfg.probe.clone();
        let h = harness(test_cfg, Duration::from_secs(5));
        let mut rx = h.bus.subscribe();

        let started = time::Instant::now();
        Arc::clone(&h.process)
            .run(h.backoff.clone(), h.bus.clone())
            .await;

        assert_eq!(probe.runs.load(Ordering::SeqCst), 4);
        assert_eq!(h.exits.get("a"), 3);
        assert!(started.elapsed() >= Duration::from_secs(15));
        assert!(!h.process.is_running());

        let events = drain(&mut rx);
        let backoffs: Vec<_> = events
            .iter()
            .filter(|e| e.kind == EventKind::BackoffScheduled)
            .collect();
        assert_eq!(backoffs.len(), 3);
        assert!(backoffs.iter().all(|e| e.delay_ms == Some(5_000)));
        assert_eq!(events.last().map(|e| e.kind), Some(EventKind::IntegrationStopped));
    }

    #[tokio::test(start_paused = true)]
    async fn canceled_return_stops_without_restart() {
        let test_cfg = TestConfig::new("a");
        let probe = test_cfg.probe.clone();
        let h = harness(test_cfg, Duration::from_secs(5));

        let join = tokio::spawn(Arc::clone(&h.process).run(h.backoff.clone(), h.bus.clone()));
        probe.wait_runs(1).await;
        h.process.stop();
        join.await.unwrap();

        assert_eq!(probe.runs.load(Ordering::SeqCst), 1);
        assert_eq!(h.exits.get("a"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn panic_terminates_loop() {
        let test_cfg = TestConfig::new("a").behave(Behavior::Panic);
        let probe = test_cfg.probe.clone();
        let h = harness(test_cfg, Duration::from_millis(10));

        Arc::clone(&h.process)
            .run(h.backoff.clone(), h.bus.clone())
            .await;

        assert_eq!(probe.runs.load(Ordering::SeqCst), 1);
        assert_eq!(h.exits.get("a"), 0);
        assert!(!h.process.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_backoff_sleep() {
        let test_cfg = TestConfig::new("a").behave(Behavior::FailForever);
        let probe = test_cfg.probe.clone();
        let h = harness(test_cfg, Duration::from_secs(3600));
        let mut rx = h.bus.subscribe();

        let join = tokio::spawn(Arc::clone(&h.process).run(h.backoff.clone(), h.bus.clone()));
        loop {
            let ev = rx.recv().await.unwrap();
            if ev.kind == EventKind::BackoffScheduled {
                break;
            }
        }
        h.process.stop();
        join.await.unwrap();

        assert_eq!(probe.runs.load(Ordering::SeqCst), 1);
        assert_eq!(h.exits.get("a"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_is_read_at_failure_time() {
        let test_cfg = TestConfig::new("a").behave(Behavior::FailThenSucceed(2));
        let h = harness(test_cfg, Duration::from_secs(1));
        let mut rx = h.bus.subscribe();

        h.cfg.write().await.as_mut().unwrap().integration_restart_backoff = Duration::from_secs(7);
        Arc::clone(&h.process)
            .run(h.backoff.clone(), h.bus.clone())
            .await;

        let delays: Vec<_> = drain(&mut rx)
            .into_iter()
            .filter(|e| e.kind == EventKind::BackoffScheduled)
            .map(|e| e.delay_ms)
            .collect();
        assert_eq!(delays, vec![Some(7_000), Some(7_000)]);
    }
}
