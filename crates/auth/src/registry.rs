//! Origin registry: an eventually-consistent, in-memory snapshot of every
//! known origin.
//!
//! ## Snapshot publication
//!
//! The full origin set is reloaded from an [`OriginSource`] into a brand new
//! [`OriginSnapshot`], which is then published with a single atomic pointer
//! swap (`ArcSwap`). Readers always see either the previous or the next
//! snapshot in full, never a partially populated one. A snapshot is never
//! patched in place.
//!
//! ## Window counters
//!
//! Each origin in a snapshot carries its own request counter. Replacing the
//! snapshot replaces the counters, so the rate-limit window is exactly one
//! refresh cycle.
//!
//! ## Failure policy
//!
//! A failed reload keeps the last good snapshot in service, logs at `error`
//! level on every attempt, is recorded in [`RegistryHealth`] and is retried
//! with exponential backoff (capped at the refresh interval).

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{error, info, instrument};

use originstream_core::Origin;

/// Origin load failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("could not load origins: {0}")]
    Source(String),

    #[error("origin load timed out after {0:?}")]
    Timeout(Duration),
}

/// Durable source of the full origin set.
#[async_trait::async_trait]
pub trait OriginSource: Send + Sync {
    /// Load every origin (full scan, no filtering).
    async fn load_origins(&self) -> Result<Vec<Origin>, RegistryError>;
}

#[async_trait::async_trait]
impl<S> OriginSource for Arc<S>
where
    S: OriginSource + ?Sized,
{
    async fn load_origins(&self) -> Result<Vec<Origin>, RegistryError> {
        (**self).load_origins().await
    }
}

/// An origin together with its request counter for the current window.
#[derive(Debug)]
pub struct SecureOrigin {
    origin: Origin,
    requests_in_window: AtomicU64,
}

impl SecureOrigin {
    pub fn new(origin: Origin) -> Self {
        Self {
            origin,
            requests_in_window: AtomicU64::new(0),
        }
    }

    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    pub fn requests_in_window(&self) -> u64 {
        self.requests_in_window.load(Ordering::Acquire)
    }

    /// Count one request unless the window is already full.
    ///
    /// Returns the new count, or `None` when `max` has been reached. The
    /// increment is a compare-and-swap on this origin's counter only.
    pub(crate) fn try_acquire(&self, max: u64) -> Option<u64> {
        self.requests_in_window
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| (n < max).then_some(n + 1))
            .ok()
            .map(|prev| prev + 1)
    }
}

/// Immutable set of origins published by one reload.
#[derive(Debug, Default)]
pub struct OriginSnapshot {
    origins: HashMap<String, Arc<SecureOrigin>>,
    loaded_at: Option<DateTime<Utc>>,
}

impl OriginSnapshot {
    /// The snapshot served before the first successful load: knows nobody.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_origins(origins: impl IntoIterator<Item = Origin>, loaded_at: DateTime<Utc>) -> Self {
        let origins = origins
            .into_iter()
            .map(|o| (o.id.clone(), Arc::new(SecureOrigin::new(o))))
            .collect();

        Self {
            origins,
            loaded_at: Some(loaded_at),
        }
    }

    pub fn get(&self, id: &str) -> Option<&Arc<SecureOrigin>> {
        self.origins.get(id)
    }

    pub fn len(&self) -> usize {
        self.origins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.origins.is_empty()
    }

    pub fn loaded_at(&self) -> Option<DateTime<Utc>> {
        self.loaded_at
    }
}

/// Observable state of the refresh cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegistryHealth {
    pub origins: usize,
    pub last_refreshed_at: Option<DateTime<Utc>>,
    pub consecutive_failures: u32,
    pub last_error: Option<String>,
}

impl RegistryHealth {
    /// Loaded at least once and the latest attempt succeeded.
    pub fn is_healthy(&self) -> bool {
        self.last_refreshed_at.is_some() && self.consecutive_failures == 0
    }
}

/// Refresh loop timing.
#[derive(Debug, Clone, Copy)]
pub struct ReloadConfig {
    /// Time between successful reloads; also the rate-limit window.
    pub interval: Duration,
    /// Upper bound for a single load from the source.
    pub load_timeout: Duration,
    /// First retry delay after a failure; doubles up to `interval`.
    pub initial_backoff: Duration,
    /// Delay before the loop's first reload. Zero reloads immediately.
    pub first_reload_after: Duration,
}

impl Default for ReloadConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            load_timeout: Duration::from_secs(30),
            initial_backoff: Duration::from_secs(1),
            first_reload_after: Duration::ZERO,
        }
    }
}

/// Registry of known origins.
#[derive(Debug)]
pub struct OriginRegistry {
    snapshot: ArcSwap<OriginSnapshot>,
    health: Mutex<RegistryHealth>,
}

impl Default for OriginRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl OriginRegistry {
    pub fn new() -> Self {
        Self {
            snapshot: ArcSwap::from_pointee(OriginSnapshot::empty()),
            health: Mutex::new(RegistryHealth::default()),
        }
    }

    /// Look up an origin in the currently published snapshot.
    pub fn lookup(&self, id: &str) -> Option<Arc<SecureOrigin>> {
        self.snapshot.load().get(id).cloned()
    }

    /// The currently published snapshot, consistent for as long as it is held.
    pub fn snapshot(&self) -> Arc<OriginSnapshot> {
        self.snapshot.load_full()
    }

    pub fn health(&self) -> RegistryHealth {
        self.health.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Publish a new snapshot built from `origins`, resetting all counters.
    pub fn replace(&self, origins: Vec<Origin>) -> usize {
        let now = Utc::now();
        let snapshot = OriginSnapshot::from_origins(origins, now);
        let count = snapshot.len();
        self.snapshot.store(Arc::new(snapshot));

        let mut health = self.health.lock().unwrap_or_else(|e| e.into_inner());
        health.origins = count;
        health.last_refreshed_at = Some(now);
        health.consecutive_failures = 0;
        health.last_error = None;
        count
    }

    /// Reload every origin from `source` and swap the snapshot.
    ///
    /// On failure the current snapshot stays in service and the failure is
    /// recorded in [`RegistryHealth`].
    #[instrument(skip(self, source), err)]
    pub async fn reload(
        &self,
        source: &dyn OriginSource,
        load_timeout: Duration,
    ) -> Result<usize, RegistryError> {
        let start = Instant::now();

        let loaded = match tokio::time::timeout(load_timeout, source.load_origins()).await {
            Ok(result) => result,
            Err(_) => Err(RegistryError::Timeout(load_timeout)),
        };

        match loaded {
            Ok(origins) => {
                let count = self.replace(origins);
                info!(origins = count, elapsed = ?start.elapsed(), "refreshed origins");
                Ok(count)
            }
            Err(e) => {
                let mut health = self.health.lock().unwrap_or_else(|p| p.into_inner());
                health.consecutive_failures = health.consecutive_failures.saturating_add(1);
                health.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Spawn the background refresh loop.
    ///
    /// The first reload happens after `config.first_reload_after`. Must be
    /// called from within a tokio runtime.
    pub fn spawn_reload_loop(
        self: &Arc<Self>,
        source: Arc<dyn OriginSource>,
        config: ReloadConfig,
    ) -> ReloadHandle {
        let registry = Arc::clone(self);
        let shutdown = Arc::new(Notify::new());
        let stop = shutdown.clone();

        let join = tokio::spawn(async move {
            info!(interval = ?config.interval, "origin refresh loop started");
            let mut backoff = config.initial_backoff;

            if !config.first_reload_after.is_zero() {
                tokio::select! {
                    _ = stop.notified() => {
                        info!("origin refresh loop stopped");
                        return;
                    }
                    _ = tokio::time::sleep(config.first_reload_after) => {}
                }
            }

            loop {
                let outcome = tokio::select! {
                    _ = stop.notified() => break,
                    outcome = registry.reload(source.as_ref(), config.load_timeout) => outcome,
                };

                let delay = match outcome {
                    Ok(_) => {
                        backoff = config.initial_backoff;
                        config.interval
                    }
                    Err(e) => {
                        let health = registry.health();
                        error!(
                            error = %e,
                            consecutive_failures = health.consecutive_failures,
                            last_refreshed_at = ?health.last_refreshed_at,
                            retry_in = ?backoff,
                            "origin refresh failed; authentication is running on the last good snapshot"
                        );
                        let delay = backoff;
                        backoff = (backoff * 2).min(config.interval);
                        delay
                    }
                };

                tokio::select! {
                    _ = stop.notified() => break,
                    _ = tokio::time::sleep(delay) => {}
                }
            }

            info!("origin refresh loop stopped");
        });

        ReloadHandle { shutdown, join }
    }
}

/// Handle to the running refresh loop.
#[derive(Debug)]
pub struct ReloadHandle {
    shutdown: Arc<Notify>,
    join: JoinHandle<()>,
}

impl ReloadHandle {
    /// Stop the loop and wait for it to exit.
    pub async fn shutdown(self) {
        self.shutdown.notify_one();
        if let Err(e) = self.join.await {
            error!(error = %e, "origin refresh loop terminated abnormally");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    /// Scriptable origin source: serves `origins`, failing the next
    /// `fail_next` loads.
    #[derive(Debug, Default)]
    pub(crate) struct ScriptedSource {
        pub origins: Mutex<Vec<Origin>>,
        pub fail_next: AtomicUsize,
        pub loads: AtomicUsize,
    }

    impl ScriptedSource {
        pub fn with(origins: Vec<Origin>) -> Arc<Self> {
            Arc::new(Self {
                origins: Mutex::new(origins),
                ..Default::default()
            })
        }
    }

    #[async_trait::async_trait]
    impl OriginSource for ScriptedSource {
        async fn load_origins(&self) -> Result<Vec<Origin>, RegistryError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            let failing = self
                .fail_next
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if failing {
                return Err(RegistryError::Source("connection refused".to_string()));
            }
            Ok(self.origins.lock().unwrap().clone())
        }
    }

    const TIMEOUT: Duration = Duration::from_secs(5);

    #[tokio::test]
    async fn unknown_before_first_load() {
        let registry = OriginRegistry::new();

        assert!(registry.lookup("a").is_none());
        assert!(registry.snapshot().is_empty());
        assert!(!registry.health().is_healthy());
    }

    #[tokio::test]
    async fn reload_publishes_full_snapshot() {
        let registry = OriginRegistry::new();
        let source = ScriptedSource::with(vec![Origin::open("a"), Origin::new("b", "ff")]);

        let count = registry.reload(source.as_ref(), TIMEOUT).await.unwrap();

        assert_eq!(count, 2);
        assert_eq!(registry.lookup("b").unwrap().origin().credential_hash, "ff");
        let health = registry.health();
        assert!(health.is_healthy());
        assert_eq!(health.origins, 2);
    }

    #[tokio::test]
    async fn reload_resets_counters_and_drops_removed_origins() {
        let registry = OriginRegistry::new();
        let source = ScriptedSource::with(vec![Origin::open("a"), Origin::open("b")]);
        registry.reload(source.as_ref(), TIMEOUT).await.unwrap();

        let a = registry.lookup("a").unwrap();
        a.try_acquire(10);
        a.try_acquire(10);
        assert_eq!(a.requests_in_window(), 2);

        *source.origins.lock().unwrap() = vec![Origin::open("a")];
        registry.reload(source.as_ref(), TIMEOUT).await.unwrap();

        assert_eq!(registry.lookup("a").unwrap().requests_in_window(), 0);
        assert!(registry.lookup("b").is_none());
        // A reader holding the old entry keeps a consistent view.
        assert_eq!(a.requests_in_window(), 2);
    }

    #[tokio::test]
    async fn failed_reload_keeps_last_good_snapshot() {
        let registry = OriginRegistry::new();
        let source = ScriptedSource::with(vec![Origin::open("a")]);
        registry.reload(source.as_ref(), TIMEOUT).await.unwrap();

        source.fail_next.store(1, Ordering::SeqCst);
        let err = registry.reload(source.as_ref(), TIMEOUT).await.unwrap_err();

        assert!(matches!(err, RegistryError::Source(_)));
        assert!(registry.lookup("a").is_some());
        let health = registry.health();
        assert!(!health.is_healthy());
        assert_eq!(health.consecutive_failures, 1);
        assert!(health.last_error.unwrap().contains("connection refused"));
    }

    #[test]
    fn try_acquire_stops_at_max() {
        let origin = SecureOrigin::new(Origin::open("a"));
        assert_eq!(origin.try_acquire(2), Some(1));
        assert_eq!(origin.try_acquire(2), Some(2));
        assert_eq!(origin.try_acquire(2), None);
        assert_eq!(origin.requests_in_window(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn loop_reloads_on_interval_and_stops_on_shutdown() {
        let registry = Arc::new(OriginRegistry::new());
        let source = ScriptedSource::with(vec![Origin::open("a")]);
        let config = ReloadConfig {
            interval: Duration::from_secs(60),
            ..Default::default()
        };

        let handle = registry.spawn_reload_loop(source.clone(), config);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(source.loads.load(Ordering::SeqCst), 1);
        assert!(registry.lookup("a").is_some());

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(source.loads.load(Ordering::SeqCst), 2);

        handle.shutdown().await;
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(source.loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn loop_backs_off_and_recovers() {
        let registry = Arc::new(OriginRegistry::new());
        let source = ScriptedSource::with(vec![Origin::open("a")]);
        source.fail_next.store(2, Ordering::SeqCst);

        let handle = registry.spawn_reload_loop(source.clone(), ReloadConfig::default());

        // t=0 fails, t=1s fails, t=3s succeeds.
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(registry.health().consecutive_failures, 1);
        assert!(registry.lookup("a").is_none());

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(registry.health().consecutive_failures, 2);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(registry.health().is_healthy());
        assert!(registry.lookup("a").is_some());
        assert_eq!(source.loads.load(Ordering::SeqCst), 3);

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn loop_can_defer_its_first_reload() {
        let registry = Arc::new(OriginRegistry::new());
        let source = ScriptedSource::with(vec![Origin::open("a")]);
        registry.reload(source.as_ref(), TIMEOUT).await.unwrap();
        registry.lookup("a").unwrap().try_acquire(10);

        let config = ReloadConfig {
            first_reload_after: Duration::from_secs(60),
            ..Default::default()
        };
        let handle = registry.spawn_reload_loop(source.clone(), config);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(source.loads.load(Ordering::SeqCst), 1);
        assert_eq!(registry.lookup("a").unwrap().requests_in_window(), 1);

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(source.loads.load(Ordering::SeqCst), 2);
        assert_eq!(registry.lookup("a").unwrap().requests_in_window(), 0);

        handle.shutdown().await;
    }
}
