//! Reuse of readers, writers and other buffers across messages.
//!
//! A [Pool] keeps up to a fixed number of idle items in a lock-free queue
//! ([`crossbeam_queue::ArrayQueue`]). [Pool::get] hands out an idle item (or builds a new one)
//! wrapped in a [Pooled] guard, which recycles the item and returns it to the pool when dropped.
//!
//! # Pool Lifecycle
//!
//! Guards hold a weak reference to the pool. If a guard is dropped after the pool, its item is
//! simply dropped.

use crossbeam_queue::ArrayQueue;
use std::{
    fmt,
    num::NonZeroUsize,
    ops::{Deref, DerefMut},
    sync::{Arc, Weak},
};
use tracing::trace;

/// A type that can be cleared for reuse.
pub trait Recycle {
    /// Resets the item to a state equivalent to a newly built one.
    fn recycle(&mut self);
}

impl Recycle for Vec<u8> {
    fn recycle(&mut self) {
        self.clear();
    }
}

/// A pool of reusable items.
///
/// Cloning a pool yields another handle to the same items.
pub struct Pool<T: Recycle + Default> {
    freelist: Arc<ArrayQueue<T>>,
}

impl<T: Recycle + Default> Clone for Pool<T> {
    fn clone(&self) -> Self {
        Self {
            freelist: self.freelist.clone(),
        }
    }
}

impl<T: Recycle + Default> fmt::Debug for Pool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("idle", &self.freelist.len())
            .field("max_idle", &self.freelist.capacity())
            .finish()
    }
}

impl<T: Recycle + Default> Pool<T> {
    /// Creates a pool that keeps at most `max_idle` items.
    pub fn new(max_idle: NonZeroUsize) -> Self {
        Self {
            freelist: Arc::new(ArrayQueue::new(max_idle.get())),
        }
    }

    /// Returns an idle item, or a new one if none is idle.
    pub fn get(&self) -> Pooled<T> {
        let item = self.freelist.pop().unwrap_or_else(|| {
            trace!("pool empty, building new item");
            T::default()
        });
        Pooled {
            item: Some(item),
            freelist: Arc::downgrade(&self.freelist),
        }
    }

    /// Returns the number of idle items.
    pub fn idle(&self) -> usize {
        self.freelist.len()
    }
}

/// An item borrowed from a [Pool].
pub struct Pooled<T: Recycle> {
    item: Option<T>,
    freelist: Weak<ArrayQueue<T>>,
}

impl<T: Recycle> Pooled<T> {
    /// Takes the item out of the pool for good.
    pub fn detach(mut self) -> T {
        self.item.take().expect("item present until drop")
    }
}

impl<T: Recycle> Deref for Pooled<T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.item.as_ref().expect("item present until drop")
    }
}

impl<T: Recycle> DerefMut for Pooled<T> {
    fn deref_mut(&mut self) -> &mut T {
        self.item.as_mut().expect("item present until drop")
    }
}

impl<T: Recycle> Drop for Pooled<T> {
    fn drop(&mut self) {
        let Some(mut item) = self.item.take() else {
            return;
        };
        let Some(freelist) = self.freelist.upgrade() else {
            return;
        };
        item.recycle();

        // If the freelist is full, the item is dropped
        let _ = freelist.push(item);
    }
}
