//! # Per-process cache of integration metrics handlers.
//!
//! Building a metrics handler may be expensive, so the handler is built once
//! per running [`IntegrationProcess`] and reused for every scrape. A cached
//! entry remembers the exact process it was built for; once the registry holds
//! a different process under the same key (the integration was restarted with a
//! new config), the entry is stale and gets rebuilt.
//!
//! ```text
//! GET /integrations/{name}/metrics
//!   └─► registry.read()
//!         └─► HandlerCache::load(key)            (cache mutex)
//!               ├─ no live process      ─► evict entry, NotFound (404)
//!               ├─ entry.process == live ─► Found(cached)
//!               └─ otherwise             ─► integration.metrics_handler()
//!                                            ├─ Err ─► Failed (500), nothing cached
//!                                            └─ Ok  ─► cache {handler, process}, Found
//! ```
//!
//! Staleness is decided by pointer identity of the process (`Arc::ptr_eq`),
//! never by comparing configs.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::error;

use super::process::IntegrationProcess;
use crate::integrations::HandlerRef;

struct CacheEntry {
    handler: HandlerRef,
    process: Arc<IntegrationProcess>,
}

/// Result of a handler lookup.
pub(crate) enum Lookup {
    /// No live process under the key.
    NotFound,
    /// The live process could not build a handler.
    Failed,
    /// Handler serving the live process.
    Found(HandlerRef),
}

/// Handlers keyed by integration key, guarded by their own lock.
#[derive(Default)]
pub(crate) struct HandlerCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl HandlerCache {
    /// Resolves the handler for `key` against the current registry snapshot.
    ///
    /// Callers hold the registry read lock for the duration of the call.
    pub(crate) async fn load(
        &self,
        key: &str,
        processes: &BTreeMap<String, Arc<IntegrationProcess>>,
    ) -> Lookup {
        let mut entries = self.entries.lock().await;

        let Some(process) = processes.get(key) else {
            entries.remove(key);
            return Lookup::NotFound;
        };

        if let Some(entry) = entries.get(key) {
            if Arc::ptr_eq(&entry.process, process) {
                return Lookup::Found(Arc::clone(&entry.handler));
            }
        }

        match process.integration().metrics_handler() {
            Ok(handler) => {
                entries.insert(
                    key.to_string(),
                    CacheEntry {
                        handler: Arc::clone(&handler),
                        process: Arc::clone(process),
                    },
                );
                Lookup::Found(handler)
            }
            Err(err) => {
                error!(
                    integration = %process.cfg().name(),
                    err = %err,
                    "could not create http handler for integration"
                );
                Lookup::Failed
            }
        }
    }

    #[cfg(test)]
    pub(crate) async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestConfig;
    use std::sync::atomic::Ordering;
    use tokio_util::sync::CancellationToken;

    fn process(cfg: &TestConfig) -> Arc<IntegrationProcess> {
        Arc::new(IntegrationProcess::new(
            format!("integration/{}", cfg.name),
            Arc::new(cfg.clone()),
            cfg.build(),
            CancellationToken::new(),
        ))
    }

    fn found(lookup: Lookup) -> HandlerRef {
        match lookup {
            Lookup::Found(h) => h,
            Lookup::NotFound => panic!("expected handler, got not found"),
            Lookup::Failed => panic!("expected handler, got failure"),
        }
    }

    #[tokio::test]
    async fn reuses_handler_for_same_process() {
        let cfg = TestConfig::new("a");
        let mut procs = BTreeMap::new();
        procs.insert("integration/a".to_string(), process(&cfg));
        let cache = HandlerCache::default();

        let h1 = found(cache.load("integration/a", &procs).await);
        let h2 = found(cache.load("integration/a", &procs).await);
        assert!(Arc::ptr_eq(&h1, &h2));
        assert_eq!(cfg.probe.handlers.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn rebuilds_after_process_replacement() {
        let cfg = TestConfig::new("a");
        let mut procs = BTreeMap::new();
        procs.insert("integration/a".to_string(), process(&cfg));
        let cache = HandlerCache::default();
        let h1 = found(cache.load("integration/a", &procs).await);

        procs.insert("integration/a".to_string(), process(&cfg));
        let h2 = found(cache.load("integration/a", &procs).await);
        assert!(!Arc::ptr_eq(&h1, &h2));
        assert_eq!(cfg.probe.handlers.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn evicts_entry_when_process_is_gone() {
        let cfg = TestConfig::new("a");
        let mut procs = BTreeMap::new();
        procs.insert("integration/a".to_string(), process(&cfg));
        let cache = HandlerCache::default();
        found(cache.load("integration/a", &procs).await);
        assert_eq!(cache.len().await, 1);

        procs.clear();
        assert!(matches!(cache.load("integration/a", &procs).await, Lookup::NotFound));
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn handler_failure_is_not_cached() {
        let mut cfg = TestConfig::new("a");
        cfg.fail_handler = true;
        let mut procs = BTreeMap::new();
        procs.insert("integration/a".to_string(), process(&cfg));
        let cache = HandlerCache::default();

        assert!(matches!(cache.load("integration/a", &procs).await, Lookup::Failed));
        assert_eq!(cache.len().await, 0);
    }
}
