//! Allocation counters.
//!
//! With the `memory_tracking` feature a counting global allocator is
//! installed (over mimalloc when the `mimalloc` feature is on, the system
//! allocator otherwise). Without it every counter reads zero.

#[cfg(feature = "memory_tracking")]
mod tracking {
    use std::alloc::{GlobalAlloc, Layout};
    use std::sync::atomic::{AtomicUsize, Ordering};

    pub static ALLOCATED: AtomicUsize = AtomicUsize::new(0);
    pub static PEAK_ALLOCATED: AtomicUsize = AtomicUsize::new(0);

    pub struct CountingAllocator;

    #[cfg(feature = "mimalloc")]
    static UNDERLYING: mimalloc::MiMalloc = mimalloc::MiMalloc;

    #[cfg(not(feature = "mimalloc"))]
    static UNDERLYING: std::alloc::System = std::alloc::System;

    fn record_peak(current: usize) {
        let mut peak = PEAK_ALLOCATED.load(Ordering::Relaxed);
        while current > peak {
            match PEAK_ALLOCATED.compare_exchange_weak(
                peak,
                current,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(p) => peak = p,
            }
        }
    }

    unsafe impl GlobalAlloc for CountingAllocator {
        unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
            let ptr = UNDERLYING.alloc(layout);
            if !ptr.is_null() {
                record_peak(ALLOCATED.fetch_add(layout.size(), Ordering::Relaxed) + layout.size());
            }
            ptr
        }

        unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
            ALLOCATED.fetch_sub(layout.size(), Ordering::Relaxed);
            UNDERLYING.dealloc(ptr, layout)
        }
    }
}

#[cfg(feature = "memory_tracking")]
#[global_allocator]
static GLOBAL: tracking::CountingAllocator = tracking::CountingAllocator;

#[cfg(all(feature = "mimalloc", not(feature = "memory_tracking")))]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// Bytes currently allocated by the process.
#[cfg(feature = "memory_tracking")]
pub fn allocated() -> usize {
    tracking::ALLOCATED.load(std::sync::atomic::Ordering::SeqCst)
}

/// Highest value [`allocated`] reached since start or the last
/// [`reset_peak`].
#[cfg(feature = "memory_tracking")]
pub fn peak_allocated() -> usize {
    tracking::PEAK_ALLOCATED.load(std::sync::atomic::Ordering::SeqCst)
}

/// Reset the peak to the current value; returns `(current, old peak)`.
#[cfg(feature = "memory_tracking")]
pub fn reset_peak() -> (usize, usize) {
    use std::sync::atomic::Ordering;
    let current = tracking::ALLOCATED.load(Ordering::SeqCst);
    let peak = tracking::PEAK_ALLOCATED.swap(current, Ordering::SeqCst);
    (current, peak)
}

#[cfg(not(feature = "memory_tracking"))]
pub fn allocated() -> usize {
    0
}

#[cfg(not(feature = "memory_tracking"))]
pub fn peak_allocated() -> usize {
    0
}

#[cfg(not(feature = "memory_tracking"))]
pub fn reset_peak() -> (usize, usize) {
    (0, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(feature = "memory_tracking")]
    #[test]
    fn test_peak_covers_live_allocation() {
        let block = vec![1u8; 1 << 20];
        assert!(peak_allocated() >= block.len());
        drop(block);
    }

    #[cfg(not(feature = "memory_tracking"))]
    #[test]
    fn test_counters_read_zero_without_tracking() {
        assert_eq!(allocated(), 0);
        assert_eq!(peak_allocated(), 0);
        assert_eq!(reset_peak(), (0, 0));
    }
}
