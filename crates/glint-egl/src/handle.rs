//! Guest-visible object handles.

use std::sync::atomic::{AtomicU32, Ordering};

/// Opaque handle the guest uses to name a host EGL object (display, config,
/// surface, context). 0 is reserved for "no object" and is never allocated.
pub type HostHandle = u32;

/// Monotonic handle source shared by every process on the device. Handles
/// are never reused; the space is wide enough that wraparound is a
/// non-concern for an emulator session, but 0 is skipped anyway.
#[derive(Debug)]
pub struct HandleAllocator {
    next: AtomicU32,
}

impl HandleAllocator {
    pub fn new() -> Self {
        Self { next: AtomicU32::new(1) }
    }

    pub fn alloc(&self) -> HostHandle {
        loop {
            let h = self.next.fetch_add(1, Ordering::Relaxed);
            if h != 0 {
                return h;
            }
        }
    }
}

impl Default for HandleAllocator {
    fn default() -> Self {
        Self::new()
    }
}
