//! In-memory key sources
//!
//! Stand-ins for the HTTP key source when a test needs to control what a
//! fetch returns, how long it takes, and how often it was called.

use async_trait::async_trait;
use reports_service::auth::{KeySetError, KeySource, SigningKeySet};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Key source that replays scripted outcomes and counts calls.
///
/// Outcomes are consumed in order; the last one repeats once the script
/// runs out.
pub struct ScriptedKeySource {
    outcomes: Mutex<VecDeque<Result<SigningKeySet, KeySetError>>>,
    last: Result<SigningKeySet, KeySetError>,
    delay: Duration,
    calls: AtomicUsize,
}

impl ScriptedKeySource {
    /// Always succeed with `key_set`.
    pub fn succeeding(key_set: SigningKeySet) -> Self {
        Self::scripted(Vec::new(), Ok(key_set))
    }

    /// Always fail with `error`.
    pub fn failing(error: KeySetError) -> Self {
        Self::scripted(Vec::new(), Err(error))
    }

    /// Fail with `error` once, then succeed with `key_set`.
    pub fn failing_once(error: KeySetError, key_set: SigningKeySet) -> Self {
        Self::scripted(vec![Err(error)], Ok(key_set))
    }

    pub fn scripted(
        outcomes: Vec<Result<SigningKeySet, KeySetError>>,
        last: Result<SigningKeySet, KeySetError>,
    ) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            last,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    /// Sleep for `delay` inside every fetch.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Number of fetches started.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KeySource for ScriptedKeySource {
    async fn fetch(&self) -> Result<SigningKeySet, KeySetError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let outcome = self
            .outcomes
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| self.last.clone());

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        outcome
    }
}
