use std::sync::atomic::{AtomicU64, Ordering};

/// A 64-slot atomic bit set, used to track which threads work on a
/// split point. Updates happen under the split point's lock; reads may
/// race and only need to observe a consistent snapshot.
#[derive(Default)]
pub struct AtomicBitSet {
    data: AtomicU64,
}

impl AtomicBitSet {
    pub fn new() -> AtomicBitSet {
        AtomicBitSet {
            data: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn set(&self, index: usize) {
        self.data.fetch_or(1 << index, Ordering::Relaxed);
    }

    #[inline]
    pub fn reset(&self, index: usize) {
        self.data.fetch_and(!(1 << index), Ordering::Relaxed);
    }

    #[inline]
    pub fn test(&self, index: usize) -> bool {
        self.data.load(Ordering::Relaxed) & (1 << index) != 0
    }

    #[inline]
    pub fn count(&self) -> u32 {
        self.data.load(Ordering::Relaxed).count_ones()
    }

    #[inline]
    pub fn none(&self) -> bool {
        self.data.load(Ordering::Relaxed) == 0
    }

    #[inline]
    pub fn clear(&self) {
        self.data.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_reset() {
        let bs = AtomicBitSet::new();
        assert!(bs.none());

        bs.set(0);
        bs.set(63);
        assert!(bs.test(0));
        assert!(bs.test(63));
        assert!(!bs.test(5));
        assert_eq!(bs.count(), 2);

        bs.reset(0);
        assert!(!bs.test(0));
        assert_eq!(bs.count(), 1);

        bs.clear();
        assert!(bs.none());
    }
}
