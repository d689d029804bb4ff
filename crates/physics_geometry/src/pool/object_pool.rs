//! Recycling object pool with background growth
//!
//! # Architecture
//!
//! ```text
//! acquire ──► free list (Mutex<Vec<T>>) ──hit──► object
//!                   │ empty
//!                   └──miss──► T::create_pooled()
//!
//! dispose ──► reset_pooled() ──► free list      (pooling on)
//!        └──► drop                              (pooling off)
//!
//! below floor && !growing ──► worker: create objects, push in one batch
//! ```
//!
//! Objects for a growth batch are created outside the free-list lock. A pool
//! cleared while a batch is in flight discards that batch.

use parking_lot::Mutex;
use rayon::ThreadPool;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

/// An object that can be recycled through an [`ObjectPool`]
pub trait Poolable: Send + 'static {
    /// Construct a blank object
    fn create_pooled() -> Self;

    /// Prepare a blank object for a new user
    fn on_acquire(&mut self, owner: &str, name: &str);

    /// Return to the blank state before going back to the free list
    fn reset_pooled(&mut self);
}

/// Pool behavior switches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    /// Recycle disposed objects; when false they are dropped
    pub use_pool: bool,
    /// Free-list size the background growth tops up to
    pub floor_size: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            use_pool: true,
            floor_size: crate::config::DEFAULT_POOL_FLOOR_SIZE,
        }
    }
}

/// Counter snapshot of one pool
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PoolStats {
    /// Objects waiting in the free list
    pub free: usize,
    /// Acquisitions
    pub requests: usize,
    /// Acquisitions served from the free list
    pub hits: usize,
    /// Objects constructed by the pool, including growth
    pub created: usize,
    /// Background growth batches completed
    pub growth_batches: usize,
}

impl PoolStats {
    /// Fraction of acquisitions served from the free list
    pub fn hit_ratio(&self) -> f32 {
        if self.requests == 0 {
            0.0
        } else {
            self.hits as f32 / self.requests as f32
        }
    }
}

/// Free-list pool of `T`
pub struct ObjectPool<T: Poolable> {
    label: &'static str,
    free: Mutex<Vec<T>>,
    config: Mutex<PoolConfig>,
    workers: Option<Arc<ThreadPool>>,
    growing: AtomicBool,
    epoch: AtomicU64,
    requests: AtomicUsize,
    hits: AtomicUsize,
    created: AtomicUsize,
    growth_batches: AtomicUsize,
}

impl<T: Poolable> ObjectPool<T> {
    /// Create an empty pool
    ///
    /// Growth runs on `workers` when given, otherwise on the global rayon pool.
    pub fn new(label: &'static str, config: PoolConfig, workers: Option<Arc<ThreadPool>>) -> Arc<Self> {
        Arc::new(Self {
            label,
            free: Mutex::new(Vec::new()),
            config: Mutex::new(config),
            workers,
            growing: AtomicBool::new(false),
            epoch: AtomicU64::new(0),
            requests: AtomicUsize::new(0),
            hits: AtomicUsize::new(0),
            created: AtomicUsize::new(0),
            growth_batches: AtomicUsize::new(0),
        })
    }

    /// Current configuration
    pub fn config(&self) -> PoolConfig {
        *self.config.lock()
    }

    /// Replace the configuration; disabling pooling drops the free list
    pub fn set_config(&self, config: PoolConfig) {
        *self.config.lock() = config;
        if !config.use_pool {
            self.clear();
        }
    }

    /// Take an object from the free list, or construct one on a miss
    pub fn acquire(self: &Arc<Self>, owner: &str, name: &str) -> T {
        self.requests.fetch_add(1, Ordering::Relaxed);
        let config = self.config();

        let recycled = if config.use_pool { self.free.lock().pop() } else { None };
        let mut object = match recycled {
            Some(object) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                object
            }
            None => {
                self.created.fetch_add(1, Ordering::Relaxed);
                T::create_pooled()
            }
        };
        object.on_acquire(owner, name);

        self.request_growth();
        object
    }

    /// Reset `object` and return it to the free list, or drop it if pooling is off
    pub fn dispose(&self, mut object: T) {
        if !self.config().use_pool {
            return;
        }
        object.reset_pooled();
        self.free.lock().push(object);
    }

    /// Start a background growth batch if below the floor and none is running
    ///
    /// Returns true if a batch was started.
    pub fn request_growth(self: &Arc<Self>) -> bool {
        let config = self.config();
        if !config.use_pool || self.free_count() >= config.floor_size {
            return false;
        }
        if self.growing.swap(true, Ordering::AcqRel) {
            return false;
        }

        let pool = Arc::clone(self);
        let epoch = self.epoch.load(Ordering::Acquire);
        let job = move || pool.grow_to_floor(epoch);
        match &self.workers {
            Some(workers) => workers.spawn(job),
            None => rayon::spawn(job),
        }
        true
    }

    fn grow_to_floor(&self, epoch: u64) {
        let floor = self.config().floor_size;
        let missing = floor.saturating_sub(self.free_count());
        let batch: Vec<T> = (0..missing).map(|_| T::create_pooled()).collect();

        if self.epoch.load(Ordering::Acquire) == epoch && self.config().use_pool {
            self.created.fetch_add(batch.len(), Ordering::Relaxed);
            self.free.lock().extend(batch);
            self.growth_batches.fetch_add(1, Ordering::Relaxed);
            log::debug!("Pool '{}' grew by {missing} toward floor {floor}", self.label);
        }

        self.growing.store(false, Ordering::Release);
    }

    /// Returns true while a growth batch is running
    pub fn is_growing(&self) -> bool {
        self.growing.load(Ordering::Acquire)
    }

    /// Objects waiting in the free list
    pub fn free_count(&self) -> usize {
        self.free.lock().len()
    }

    /// Drop every pooled object; in-flight growth batches are discarded
    pub fn clear(&self) {
        self.epoch.fetch_add(1, Ordering::AcqRel);
        self.free.lock().clear();
    }

    /// Counter snapshot
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            free: self.free_count(),
            requests: self.requests.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            created: self.created.load(Ordering::Relaxed),
            growth_batches: self.growth_batches.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    #[derive(Debug, Default)]
    struct Counter {
        owner: String,
        value: u32,
    }

    impl Poolable for Counter {
        fn create_pooled() -> Self {
            Self::default()
        }

        fn on_acquire(&mut self, owner: &str, _name: &str) {
            self.owner = owner.to_string();
        }

        fn reset_pooled(&mut self) {
            self.owner.clear();
            self.value = 0;
        }
    }

    fn wait_for_growth(pool: &ObjectPool<Counter>) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while pool.is_growing() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    fn no_growth() -> PoolConfig {
        PoolConfig {
            use_pool: true,
            floor_size: 0,
        }
    }

    #[test]
    fn test_dispose_then_acquire_is_a_hit() {
        let pool = ObjectPool::<Counter>::new("counters", no_growth(), None);

        let mut object = pool.acquire("scene", "a");
        assert_eq!(object.owner, "scene");
        object.value = 9;
        pool.dispose(object);

        let recycled = pool.acquire("other", "b");
        assert_eq!(recycled.value, 0);
        assert_eq!(recycled.owner, "other");

        let stats = pool.stats();
        assert_eq!(stats.requests, 2);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.hit_ratio(), 0.5);
    }

    #[test]
    fn test_disabled_pool_drops_objects() {
        let pool = ObjectPool::<Counter>::new(
            "counters",
            PoolConfig {
                use_pool: false,
                floor_size: 8,
            },
            None,
        );

        let object = pool.acquire("scene", "a");
        pool.dispose(object);

        assert_eq!(pool.free_count(), 0);
        assert!(!pool.is_growing());
        assert_eq!(pool.stats().hits, 0);
    }

    #[test]
    fn test_background_growth_reaches_floor() {
        let pool = ObjectPool::<Counter>::new(
            "counters",
            PoolConfig {
                use_pool: true,
                floor_size: 16,
            },
            None,
        );

        assert!(pool.request_growth());
        wait_for_growth(&pool);

        assert_eq!(pool.free_count(), 16);
        assert!(!pool.request_growth());
        assert_eq!(pool.stats().growth_batches, 1);
    }

    #[test]
    fn test_clear_empties_free_list() {
        let pool = ObjectPool::<Counter>::new("counters", no_growth(), None);
        pool.dispose(Counter::default());
        pool.dispose(Counter::default());

        pool.clear();
        assert_eq!(pool.free_count(), 0);
    }
}
