// LWLock - process-wide storage guard
// Every call into the stdio layer runs while holding this lock. The lock is
// re-entrant so nested storage calls from the same thread do not deadlock.

use parking_lot::{ReentrantMutex, ReentrantMutexGuard};
use std::cell::Cell;

thread_local! {
    static DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Exclusive-use lock around a shared, non-reentrant subsystem
pub struct StorageLock {
    inner: ReentrantMutex<()>,
}

impl StorageLock {
    pub const fn new() -> Self {
        StorageLock {
            inner: parking_lot::const_reentrant_mutex(()),
        }
    }

    /// Acquires the lock; released when the guard drops
    pub fn acquire(&self) -> StorageGuard<'_> {
        let guard = self.inner.lock();
        DEPTH.with(|depth| depth.set(depth.get() + 1));
        StorageGuard { _inner: guard }
    }

    /// Attempts to acquire the lock without blocking
    pub fn try_acquire(&self) -> Option<StorageGuard<'_>> {
        let guard = self.inner.try_lock()?;
        DEPTH.with(|depth| depth.set(depth.get() + 1));
        Some(StorageGuard { _inner: guard })
    }
}

impl Default for StorageLock {
    fn default() -> Self {
        Self::new()
    }
}

/// Scoped ownership of a `StorageLock`
pub struct StorageGuard<'a> {
    _inner: ReentrantMutexGuard<'a, ()>,
}

impl Drop for StorageGuard<'_> {
    fn drop(&mut self) {
        DEPTH.with(|depth| depth.set(depth.get() - 1));
    }
}

static STORAGE: StorageLock = StorageLock::new();

/// Enter the storage subsystem
pub fn storage_use() -> StorageGuard<'static> {
    STORAGE.acquire()
}

/// How many storage guards the current thread holds
pub fn storage_depth() -> usize {
    DEPTH.with(|depth| depth.get())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[test]
    fn test_storage_guard_nesting() {
        assert_eq!(storage_depth(), 0);
        {
            let _outer = storage_use();
            assert_eq!(storage_depth(), 1);
            {
                let _inner = storage_use();
                assert_eq!(storage_depth(), 2);
            }
            assert_eq!(storage_depth(), 1);
        }
        assert_eq!(storage_depth(), 0);
    }

    #[test]
    fn test_storage_guard_released_on_early_return() {
        fn bail(lock: &StorageLock) -> Option<()> {
            let _guard = lock.acquire();
            let missing: Option<()> = None;
            missing?;
            Some(())
        }

        let lock = StorageLock::new();
        assert!(bail(&lock).is_none());
        // Another thread can only get in if the guard was dropped
        thread::scope(|s| {
            s.spawn(|| assert!(lock.try_acquire().is_some()));
        });
    }

    #[test]
    fn test_storage_lock_excludes_other_threads() {
        let lock = Arc::new(StorageLock::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let max_inside = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let lock = lock.clone();
                let inside = inside.clone();
                let max_inside = max_inside.clone();
                thread::spawn(move || {
                    for _ in 0..1000 {
                        let _guard = lock.acquire();
                        let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                        max_inside.fetch_max(now, Ordering::SeqCst);
                        inside.fetch_sub(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(max_inside.load(Ordering::SeqCst), 1);
    }
}
