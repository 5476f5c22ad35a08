//! Instance pool and admission control.
//!
//! [`InstancePool`] enforces the concurrency ceiling and recycles instances.
//! Admission works counter first: a slot is reserved with a single
//! compare-and-swap on the in-flight counter before any instance is looked
//! up, so a burst of concurrent callers admits at most `max_concurrency` of
//! them no matter how quickly instances can be produced.
//!
//! ```text
//! try_acquire ──► reserve slot ──► pop idle ──► expired? ──► destroy + new
//!                      │               │                        │
//!                      ▼               ▼                        ▼
//!                   None (429)      empty ──► new          Some(instance)
//!
//! release ──► push idle ──► free slot
//! ```

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info};

use crate::application::ApplicationFactory;
use crate::instance::Instance;
use lambda_sim_common::{SimulatorConfig, SimulatorError};

/// Point-in-time view of the pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    /// Configured concurrency ceiling.
    pub max_concurrency: usize,
    /// Requests currently holding an instance.
    pub in_flight: usize,
    /// Instances waiting in the idle queue.
    pub idle: usize,
    /// Instances constructed since the pool was created.
    pub instances_created: u64,
    /// Idle instances discarded for exceeding their lifetime.
    pub instances_recycled: u64,
    /// Requests admitted.
    pub admitted: u64,
    /// Requests rejected because the ceiling was reached.
    pub throttled: u64,
    /// Whether the pool has been disposed.
    pub disposed: bool,
}

#[derive(Debug, Default)]
struct Counters {
    instances_created: AtomicU64,
    instances_recycled: AtomicU64,
    admitted: AtomicU64,
    throttled: AtomicU64,
}

/// Bounded pool of simulated instances.
///
/// # Thread Safety
///
/// `InstancePool` is meant to be shared behind an `Arc`. The in-flight counter
/// is atomic; the idle queue and the disposed flag are updated together under
/// the queue lock so that nothing is enqueued after a dispose has drained it.
pub struct InstancePool {
    factory: Arc<dyn ApplicationFactory>,
    max_concurrency: usize,
    max_instance_lifetime: Duration,
    cold_start_delay: Duration,
    in_flight: AtomicUsize,
    idle: Mutex<VecDeque<Instance>>,
    disposed: AtomicBool,
    counters: Counters,
}

impl InstancePool {
    /// Create an empty pool.
    ///
    /// # Errors
    ///
    /// Returns [`SimulatorError::InvalidConfig`] if `max_concurrency` is zero.
    pub fn new(
        factory: Arc<dyn ApplicationFactory>,
        config: &SimulatorConfig,
    ) -> Result<Self, SimulatorError> {
        config.validate()?;

        info!(
            max_concurrency = config.max_concurrency,
            max_instance_lifetime_ms = config.max_instance_lifetime_ms,
            cold_start_delay_ms = config.cold_start_delay_ms,
            "Instance pool created"
        );

        Ok(Self {
            factory,
            max_concurrency: config.max_concurrency,
            max_instance_lifetime: config.max_instance_lifetime(),
            cold_start_delay: config.cold_start_delay(),
            in_flight: AtomicUsize::new(0),
            idle: Mutex::new(VecDeque::with_capacity(config.max_concurrency)),
            disposed: AtomicBool::new(false),
            counters: Counters::default(),
        })
    }

    /// Try to check out an instance.
    ///
    /// Returns `Ok(None)` when the concurrency ceiling is reached. Never
    /// blocks.
    ///
    /// # Errors
    ///
    /// Returns [`SimulatorError::Disposed`] once the pool has been disposed.
    pub fn try_acquire(&self) -> Result<Option<Instance>, SimulatorError> {
        if self.is_disposed() {
            return Err(SimulatorError::Disposed);
        }

        let reserved = self
            .in_flight
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                (current < self.max_concurrency).then_some(current + 1)
            });

        let in_flight = match reserved {
            Ok(previous) => previous + 1,
            Err(current) => {
                self.counters.throttled.fetch_add(1, Ordering::Relaxed);
                debug!(in_flight = current, "Request throttled");
                return Ok(None);
            }
        };

        let dequeued = {
            let mut idle = self.idle.lock();
            if self.is_disposed() {
                drop(idle);
                self.in_flight.fetch_sub(1, Ordering::AcqRel);
                return Err(SimulatorError::Disposed);
            }
            idle.pop_front()
        };

        let instance = match dequeued {
            Some(mut instance) if instance.is_expired(self.max_instance_lifetime) => {
                self.counters
                    .instances_recycled
                    .fetch_add(1, Ordering::Relaxed);
                debug!(
                    instance_id = %instance.id(),
                    age_ms = instance.age().as_millis(),
                    "Recycling expired instance"
                );
                instance.destroy();
                self.create_instance()
            }
            Some(instance) => instance,
            None => self.create_instance(),
        };

        self.counters.admitted.fetch_add(1, Ordering::Relaxed);
        debug!(instance_id = %instance.id(), in_flight, "Instance acquired");

        Ok(Some(instance))
    }

    /// Return an instance after use, freeing its slot.
    ///
    /// After disposal the instance is destroyed instead and the in-flight
    /// counter is left alone.
    pub fn release(&self, mut instance: Instance) {
        let mut idle = self.idle.lock();
        if self.is_disposed() {
            drop(idle);
            instance.destroy();
            return;
        }
        debug!(instance_id = %instance.id(), "Instance released");
        idle.push_back(instance);
        drop(idle);

        self.in_flight.fetch_sub(1, Ordering::AcqRel);
    }

    /// Reject all further acquisitions and destroy every idle instance.
    ///
    /// Instances that are checked out are destroyed when released.
    pub fn dispose(&self) {
        let drained: Vec<Instance> = {
            let mut idle = self.idle.lock();
            if self.disposed.swap(true, Ordering::AcqRel) {
                return;
            }
            idle.drain(..).collect()
        };

        let destroyed = drained.len();
        for mut instance in drained {
            instance.destroy();
        }

        info!(
            destroyed,
            in_flight = self.in_flight.load(Ordering::Acquire),
            "Instance pool disposed"
        );
    }

    /// Returns `true` once [`InstancePool::dispose`] has run.
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Configured concurrency ceiling.
    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Number of requests currently holding an instance.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Take a snapshot of the pool counters.
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            max_concurrency: self.max_concurrency,
            in_flight: self.in_flight(),
            idle: self.idle.lock().len(),
            instances_created: self.counters.instances_created.load(Ordering::Relaxed),
            instances_recycled: self.counters.instances_recycled.load(Ordering::Relaxed),
            admitted: self.counters.admitted.load(Ordering::Relaxed),
            throttled: self.counters.throttled.load(Ordering::Relaxed),
            disposed: self.is_disposed(),
        }
    }

    fn create_instance(&self) -> Instance {
        let instance = Instance::new(self.factory.as_ref(), self.cold_start_delay);
        self.counters
            .instances_created
            .fetch_add(1, Ordering::Relaxed);
        debug!(instance_id = %instance.id(), "Instance created");
        instance
    }
}

impl std::fmt::Debug for InstancePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstancePool")
            .field("max_concurrency", &self.max_concurrency)
            .field("in_flight", &self.in_flight())
            .field("disposed", &self.is_disposed())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;

    use axum::Router;

    use crate::Application;

    fn pool(max_concurrency: usize, lifetime_ms: u64) -> InstancePool {
        let config = SimulatorConfig::default()
            .with_max_concurrency(max_concurrency)
            .with_max_instance_lifetime(Duration::from_millis(lifetime_ms))
            .with_cold_start_delay(Duration::ZERO);
        InstancePool::new(
            Arc::new(|| Application::from_router(Router::new())),
            &config,
        )
        .unwrap()
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let config = SimulatorConfig::default().with_max_concurrency(0);
        let result = InstancePool::new(
            Arc::new(|| Application::from_router(Router::new())),
            &config,
        );

        assert!(matches!(result, Err(SimulatorError::InvalidConfig { .. })));
    }

    #[test]
    fn test_acquire_up_to_ceiling() {
        let pool = pool(2, 60_000);

        let a = pool.try_acquire().unwrap();
        let b = pool.try_acquire().unwrap();
        let c = pool.try_acquire().unwrap();

        assert!(a.is_some());
        assert!(b.is_some());
        assert!(c.is_none());
        assert_eq!(pool.in_flight(), 2);

        let stats = pool.stats();
        assert_eq!(stats.admitted, 2);
        assert_eq!(stats.throttled, 1);
        assert_eq!(stats.instances_created, 2);
    }

    #[test]
    fn test_release_frees_slot_and_reuses_instance() {
        let pool = pool(1, 60_000);

        let first = pool.try_acquire().unwrap().unwrap();
        let first_id = first.id().to_string();
        pool.release(first);

        assert_eq!(pool.in_flight(), 0);
        assert_eq!(pool.stats().idle, 1);

        let second = pool.try_acquire().unwrap().unwrap();
        assert_eq!(second.id(), first_id);
        assert_eq!(pool.stats().instances_created, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_instance_is_recycled() {
        let pool = pool(1, 100);

        let first = pool.try_acquire().unwrap().unwrap();
        let first_id = first.id().to_string();
        pool.release(first);

        tokio::time::advance(Duration::from_millis(150)).await;

        let second = pool.try_acquire().unwrap().unwrap();
        assert_ne!(second.id(), first_id);

        let stats = pool.stats();
        assert_eq!(stats.instances_recycled, 1);
        assert_eq!(stats.instances_created, 2);
    }

    #[test]
    fn test_dispose_drains_idle_and_rejects() {
        let pool = pool(2, 60_000);

        let idle = pool.try_acquire().unwrap().unwrap();
        let busy = pool.try_acquire().unwrap().unwrap();
        pool.release(idle);

        pool.dispose();
        pool.dispose();

        assert!(pool.is_disposed());
        assert_eq!(pool.stats().idle, 0);
        assert!(matches!(pool.try_acquire(), Err(SimulatorError::Disposed)));

        // Releasing after disposal destroys the instance and leaves the counter.
        pool.release(busy);
        assert_eq!(pool.stats().idle, 0);
        assert_eq!(pool.in_flight(), 1);
    }

    #[test]
    fn test_disposed_error_even_when_full() {
        let pool = pool(1, 60_000);
        let _held = pool.try_acquire().unwrap().unwrap();

        pool.dispose();

        assert!(pool.try_acquire().unwrap_err().is_disposed());
    }

    #[test]
    fn test_concurrent_admission_never_exceeds_ceiling() {
        const CALLERS: usize = 64;
        const CEILING: usize = 7;

        let pool = Arc::new(pool(CEILING, 60_000));
        let barrier = Arc::new(Barrier::new(CALLERS));

        let handles: Vec<_> = (0..CALLERS)
            .map(|_| {
                let pool = Arc::clone(&pool);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    pool.try_acquire().unwrap()
                })
            })
            .collect();

        let acquired: Vec<Instance> = handles
            .into_iter()
            .filter_map(|h| h.join().unwrap())
            .collect();

        assert_eq!(acquired.len(), CEILING);
        assert_eq!(pool.in_flight(), CEILING);

        let stats = pool.stats();
        assert_eq!(stats.admitted, CEILING as u64);
        assert_eq!(stats.throttled, (CALLERS - CEILING) as u64);
    }
}
