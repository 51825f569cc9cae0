//! Bounded concurrency limiter
//!
//! Fan-out across platforms is unbounded, but call sites that issue one
//! sub-call per tenant (per-tenant tag or cost fetches) can easily overwhelm
//! rate-limited cloud APIs. This limiter caps the number of simultaneous
//! operations; it is a reusable primitive, not specific to one platform.

use std::future::Future;
use tokio::sync::Semaphore;

/// Default maximum number of simultaneous operations
pub const DEFAULT_MAX_IN_FLIGHT: usize = 5;

/// Caps how many wrapped futures run at once
pub struct ConcurrencyLimiter {
    semaphore: Semaphore,
}

impl ConcurrencyLimiter {
    pub fn new(max_in_flight: usize) -> Self {
        Self {
            semaphore: Semaphore::new(max_in_flight.max(1)),
        }
    }

    /// Number of permits currently available
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Run a future once a permit is available
    pub async fn run<F>(&self, future: F) -> F::Output
    where
        F: Future,
    {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .expect("limiter semaphore closed");
        future.await
    }
}

impl Default for ConcurrencyLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_IN_FLIGHT)
    }
}
