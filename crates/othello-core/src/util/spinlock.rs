use std::hint::spin_loop;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use lock_api::GuardSend;
use lock_api::RawMutex;

/// A test-and-test-and-set spin lock.
///
/// Implements `lock_api::RawMutex`, so it can back `lock_api::Mutex`
/// wrappers, but the search uses it raw: critical sections are a few
/// dozen instructions and blocking would cost more than spinning.
pub struct RawSpinLock {
    state: AtomicBool,
}

unsafe impl RawMutex for RawSpinLock {
    #[allow(clippy::declare_interior_mutable_const)]
    const INIT: Self = RawSpinLock {
        state: AtomicBool::new(false),
    };

    type GuardMarker = GuardSend;

    #[inline]
    fn lock(&self) {
        while self
            .state
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            // Spin on the cheaper load until the flag clears.
            while self.state.load(Ordering::Relaxed) {
                spin_loop();
            }
        }
    }

    #[inline]
    unsafe fn unlock(&self) {
        self.state.store(false, Ordering::Release);
    }

    #[inline]
    fn try_lock(&self) -> bool {
        self.state
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    #[inline]
    fn is_locked(&self) -> bool {
        self.state.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_unlock() {
        let lock = RawSpinLock::INIT;
        assert!(!lock.is_locked());
        lock.lock();
        assert!(lock.is_locked());
        assert!(!lock.try_lock());
        unsafe { lock.unlock() };
        assert!(lock.try_lock());
        unsafe { lock.unlock() };
    }

    #[test]
    fn test_mutual_exclusion() {
        use std::sync::Arc;
        use std::sync::atomic::AtomicU64;

        struct Shared {
            lock: RawSpinLock,
            counter: AtomicU64,
        }

        let shared = Arc::new(Shared {
            lock: RawSpinLock::INIT,
            counter: AtomicU64::new(0),
        });

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let shared = shared.clone();
                std::thread::spawn(move || {
                    for _ in 0..10_000 {
                        shared.lock.lock();
                        let v = shared.counter.load(Ordering::Relaxed);
                        shared.counter.store(v + 1, Ordering::Relaxed);
                        unsafe { shared.lock.unlock() };
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(shared.counter.load(Ordering::Relaxed), 40_000);
    }
}
