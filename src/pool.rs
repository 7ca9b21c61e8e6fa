//! Thread-safe object pools with RAII release.
//!
//! `acquire` pops a recycled instance or constructs a fresh one; the guard
//! resets and returns the item when dropped, so release cannot be skipped
//! on early-return or error paths. No ordering guarantee on which instance
//! comes back.

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

/// Re-initializes a pooled item before it goes back on the free list.
pub trait Reset {
    fn reset(&mut self);
}

/// An unbounded free list of reusable objects.
///
/// Safe for concurrent acquire/release without caller-side locking. An item
/// taken from the pool is exclusively owned by its guard until drop.
pub struct Pool<T> {
    items: Mutex<Vec<T>>,
    build: fn() -> T,
    allocated: AtomicUsize,
}

impl<T: Reset> Pool<T> {
    pub const fn new(build: fn() -> T) -> Self {
        Self { items: Mutex::new(Vec::new()), build, allocated: AtomicUsize::new(0) }
    }

    /// Take an item from the pool, constructing one if the free list is
    /// empty. Construction must not fail.
    pub fn acquire(&self) -> PoolGuard<'_, T> {
        let recycled = self.items.lock().unwrap_or_else(PoisonError::into_inner).pop();
        let item = recycled.unwrap_or_else(|| {
            self.allocated.fetch_add(1, Ordering::Relaxed);
            (self.build)()
        });
        PoolGuard { pool: self, item: Some(item) }
    }

    fn release(&self, mut item: T) {
        item.reset();
        self.items.lock().unwrap_or_else(PoisonError::into_inner).push(item);
    }

    /// Total instances ever constructed by this pool.
    pub fn allocated(&self) -> usize {
        self.allocated.load(Ordering::Relaxed)
    }

    /// Instances currently sitting on the free list.
    pub fn idle(&self) -> usize {
        self.items.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl<T> std::fmt::Debug for Pool<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pool")
            .field("allocated", &self.allocated.load(Ordering::Relaxed))
            .finish()
    }
}

/// Scoped handle to a pooled item. Resets and releases on drop.
pub struct PoolGuard<'a, T: Reset> {
    pool: &'a Pool<T>,
    item: Option<T>,
}

impl<T: Reset> Deref for PoolGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.item.as_ref().expect("pool guard holds an item until drop")
    }
}

impl<T: Reset> DerefMut for PoolGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.item.as_mut().expect("pool guard holds an item until drop")
    }
}

impl<T: Reset> Drop for PoolGuard<'_, T> {
    fn drop(&mut self) {
        if let Some(item) = self.item.take() {
            self.pool.release(item);
        }
    }
}

impl Reset for bytes::BytesMut {
    fn reset(&mut self) {
        self.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Slot {
        value: u32,
    }

    impl Reset for Slot {
        fn reset(&mut self) {
            self.value = 0;
        }
    }

    static SLOTS: Pool<Slot> = Pool::new(Slot::default);

    #[test]
    fn test_acquire_reuses_released_items() {
        let pool: Pool<Slot> = Pool::new(Slot::default);
        {
            let mut a = pool.acquire();
            a.value = 7;
        }
        assert_eq!(pool.allocated(), 1);
        assert_eq!(pool.idle(), 1);

        let b = pool.acquire();
        assert_eq!(b.value, 0, "recycled item must be reset");
        assert_eq!(pool.allocated(), 1, "no new allocation on reuse");
    }

    #[test]
    fn test_static_pool_grows_under_contention() {
        let a = SLOTS.acquire();
        let b = SLOTS.acquire();
        drop(a);
        drop(b);
        assert!(SLOTS.allocated() >= 2);
        assert_eq!(SLOTS.idle(), SLOTS.allocated());
    }
}
