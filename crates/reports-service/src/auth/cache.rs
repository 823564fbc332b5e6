//! Process-wide signing key set cache.
//!
//! The key set is fetched lazily on first use and kept for the life of the
//! process; there is no TTL and no background refresh. A restart picks up
//! rotated keys.
//!
//! Concurrent first-time callers share a single in-flight fetch: the first
//! caller stores a [`Shared`] future in `in_flight`, later callers clone and
//! await it. The fetch itself runs on a spawned task, so it makes progress
//! and hits its timeout even when every caller has gone away. Once the set
//! is stored, reads go through a `OnceLock` and take no lock at all. A failed
//! fetch is never stored, so the next call after the failure starts a new
//! attempt.

use crate::auth::jwks::{KeySetError, KeySource, SigningKeySet, StaticKeySource};
use crate::observability::metrics;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::time::{Duration, Instant};
use tracing::instrument;

/// Default bound on one key set fetch.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

type FetchResult = Result<Arc<SigningKeySet>, KeySetError>;
type SharedFetch = Shared<BoxFuture<'static, FetchResult>>;

#[derive(Clone)]
struct InFlightFetch {
    fetch: SharedFetch,
    // Set by the fetch task before it returns an error.
    failed: Arc<AtomicBool>,
}

/// Lazily filled, never refreshed cache of the signing key set.
pub struct KeySetCache {
    source: Arc<dyn KeySource>,
    fetch_timeout: Duration,
    // Shared with the fetch task, which stores the set on success.
    key_set: Arc<OnceLock<Arc<SigningKeySet>>>,
    // Held only to read or swap the slot, never across an await.
    in_flight: Mutex<Option<InFlightFetch>>,
}

impl KeySetCache {
    /// Create an empty cache that fetches from `source` on first use.
    pub fn new(source: Arc<dyn KeySource>, fetch_timeout: Duration) -> Self {
        Self {
            source,
            fetch_timeout,
            key_set: Arc::new(OnceLock::new()),
            in_flight: Mutex::new(None),
        }
    }

    /// Create a cache that is already filled with `key_set`.
    pub fn with_key_set(key_set: SigningKeySet) -> Self {
        let cache = Self::new(
            Arc::new(StaticKeySource::new(key_set.clone())),
            DEFAULT_FETCH_TIMEOUT,
        );
        // A fresh OnceLock always accepts its first value.
        let _ = cache.key_set.set(Arc::new(key_set));
        cache
    }

    /// Whether a key set has been stored.
    pub fn is_cached(&self) -> bool {
        self.key_set.get().is_some()
    }

    /// Return the cached key set, fetching it if this is the first use.
    ///
    /// # Errors
    ///
    /// Returns the `KeySetError` of the fetch this call started or joined.
    /// Every caller that joined the same fetch receives the same error.
    #[instrument(skip_all)]
    pub async fn get(&self) -> Result<Arc<SigningKeySet>, KeySetError> {
        if let Some(key_set) = self.key_set.get() {
            return Ok(Arc::clone(key_set));
        }

        let fetch = {
            let mut slot = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);

            // Filled while we waited for the lock.
            if let Some(key_set) = self.key_set.get() {
                return Ok(Arc::clone(key_set));
            }

            match slot.as_ref() {
                // A fetch that failed after its callers left is not joined.
                Some(in_flight) if !in_flight.failed.load(Ordering::Acquire) => {
                    tracing::debug!(target: "reports.auth.cache", "Joining in-flight key set fetch");
                    in_flight.fetch.clone()
                }
                _ => {
                    tracing::debug!(target: "reports.auth.cache", "Key set not cached, starting fetch");
                    let in_flight = self.start_fetch();
                    let fetch = in_flight.fetch.clone();
                    *slot = Some(in_flight);
                    fetch
                }
            }
        };

        let result = fetch.clone().await;

        // Clear the slot unless a newer fetch has already replaced it.
        {
            let mut slot = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
            if slot
                .as_ref()
                .is_some_and(|current| current.fetch.ptr_eq(&fetch))
            {
                *slot = None;
            }
        }

        result
    }

    fn start_fetch(&self) -> InFlightFetch {
        let source = Arc::clone(&self.source);
        let cached = Arc::clone(&self.key_set);
        let fetch_timeout = self.fetch_timeout;
        let failed = Arc::new(AtomicBool::new(false));
        let task_failed = Arc::clone(&failed);

        let task = tokio::spawn(async move {
            let started = Instant::now();
            let result = match tokio::time::timeout(fetch_timeout, source.fetch()).await {
                Ok(result) => result,
                Err(_) => Err(KeySetError::Timeout(fetch_timeout)),
            };

            match result {
                Ok(key_set) => {
                    metrics::record_jwks_fetch("success", started.elapsed());
                    let key_set = Arc::new(key_set);
                    if cached.set(Arc::clone(&key_set)).is_ok() {
                        tracing::info!(
                            target: "reports.auth.cache",
                            key_count = key_set.len(),
                            "Signing key set cached"
                        );
                    }
                    Ok(key_set)
                }
                Err(e) => {
                    tracing::error!(
                        target: "reports.auth.cache",
                        error = %e,
                        "Key set fetch failed, nothing cached"
                    );
                    metrics::record_jwks_fetch(e.label(), started.elapsed());
                    task_failed.store(true, Ordering::Release);
                    Err(e)
                }
            }
        });

        let fetch = async move {
            match task.await {
                Ok(result) => result,
                Err(e) => {
                    tracing::error!(
                        target: "reports.auth.cache",
                        error = %e,
                        "Key set fetch task did not complete"
                    );
                    Err(KeySetError::Transport(format!("fetch task failed: {e}")))
                }
            }
        }
        .boxed()
        .shared();

        InFlightFetch { fetch, failed }
    }
}
