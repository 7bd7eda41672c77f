//! Chaotic state store wrapper for fault injection testing
//!
//! Storage wrapper that randomly fails operations to test error handling.
//! `update` failures are injected after the caller's closure has run,
//! reproducing a crash between encryption and persistence: the session
//! advanced in memory but the write never landed.

#![allow(clippy::disallowed_types, reason = "Locking simple RNG state")]

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

use super::{StateStore, StorageError};

/// Chaotic state store that randomly injects failures
///
/// Delegates to an underlying store but fails operations with probability
/// `failure_rate`. The RNG is seeded, so a given seed always fails the same
/// operations.
#[derive(Clone)]
pub struct ChaoticStateStore<S: StateStore> {
    inner: S,
    /// Failure rate (0.0 = never fail, 1.0 = always fail)
    failure_rate: f64,
    /// RNG state for deterministic chaos
    rng: Arc<Mutex<ChaoticRng>>,
    /// Operations attempted
    operation_count: Arc<AtomicUsize>,
    /// Operations that were failed on purpose
    injected_count: Arc<AtomicUsize>,
}

/// Simple deterministic RNG for chaos injection
///
/// Linear congruential generator, so chaos tests are reproducible with the
/// same seed.
struct ChaoticRng {
    state: u64,
}

impl ChaoticRng {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Generate next random value [0.0, 1.0)
    fn next(&mut self) -> f64 {
        // LCG constants from Numerical Recipes
        const A: u64 = 1_664_525;
        const C: u64 = 1_013_904_223;
        const M: u64 = 1u64 << 32;

        self.state = (A.wrapping_mul(self.state).wrapping_add(C)) % M;
        (self.state as f64) / (M as f64)
    }
}

impl<S: StateStore> ChaoticStateStore<S> {
    /// Create a new chaotic wrapper with the default seed.
    ///
    /// # Panics
    ///
    /// Panics if `failure_rate` is not in [0.0, 1.0]
    pub fn new(inner: S, failure_rate: f64) -> Self {
        Self::with_seed(inner, failure_rate, 0x1234_5678_9ABC_DEF0)
    }

    /// Create with explicit seed for reproducible chaos.
    ///
    /// # Panics
    ///
    /// Panics if `failure_rate` is not in [0.0, 1.0]
    pub fn with_seed(inner: S, failure_rate: f64, seed: u64) -> Self {
        assert!(
            (0.0..=1.0).contains(&failure_rate),
            "failure_rate must be between 0.0 and 1.0, got {failure_rate}"
        );

        Self {
            inner,
            failure_rate,
            rng: Arc::new(Mutex::new(ChaoticRng::new(seed))),
            operation_count: Arc::new(AtomicUsize::new(0)),
            injected_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Underlying store (for checking invariants after chaos).
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Total number of operations attempted.
    pub fn operation_count(&self) -> usize {
        self.operation_count.load(Ordering::Relaxed)
    }

    /// Number of operations that were failed on purpose.
    pub fn injected_failures(&self) -> usize {
        self.injected_count.load(Ordering::Relaxed)
    }

    /// Count the operation and decide whether to fail it.
    fn should_fail(&self) -> Result<bool, StorageError> {
        self.operation_count.fetch_add(1, Ordering::Relaxed);

        let mut rng =
            self.rng.lock().map_err(|_| StorageError::Io("ChaoticRng mutex poisoned".to_string()))?;
        let fail = rng.next() < self.failure_rate;
        if fail {
            self.injected_count.fetch_add(1, Ordering::Relaxed);
        }
        Ok(fail)
    }
}

fn injected() -> StorageError {
    StorageError::Io("chaotic failure injection".to_string())
}

impl<S: StateStore> StateStore for ChaoticStateStore<S> {
    fn retrieve(&self, identifier: &str) -> Result<Option<Vec<u8>>, StorageError> {
        if self.should_fail()? {
            return Err(injected());
        }
        self.inner.retrieve(identifier)
    }

    fn store(&self, identifier: &str, blob: &[u8]) -> Result<(), StorageError> {
        if self.should_fail()? {
            return Err(injected());
        }
        self.inner.store(identifier, blob)
    }

    fn delete(&self, identifier: &str) -> Result<(), StorageError> {
        if self.should_fail()? {
            return Err(injected());
        }
        self.inner.delete(identifier)
    }

    fn update<T, E, F>(&self, identifier: &str, f: F) -> Result<T, E>
    where
        E: From<StorageError>,
        F: FnOnce(Option<Vec<u8>>) -> Result<(Vec<u8>, T), E>,
    {
        if self.should_fail()? {
            // Run the closure against the real prior value, then drop the
            // write as if the process died before commit.
            let prior = self.inner.retrieve(identifier)?;
            let _ = f(prior)?;
            return Err(injected().into());
        }
        self.inner.update(identifier, f)
    }

    fn count(&self) -> Result<usize, StorageError> {
        self.inner.count()
    }
}
