//! Latched framebuffer-resize notification.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// A flag raised by the window layer and consumed by the frame loop.
///
/// Clones share the same flag. Once raised it stays raised until
/// [`ResizeLatch::take`] observes it, so a resize reported while a frame is
/// in flight is seen after that frame is presented.
#[derive(Debug, Clone, Default)]
pub struct ResizeLatch {
    raised: Arc<AtomicBool>,
}

impl ResizeLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the framebuffer as resized. Idempotent.
    pub fn raise(&self) {
        self.raised.store(true, Ordering::Release);
    }

    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::Acquire)
    }

    /// Returns whether the latch was raised and clears it.
    pub fn take(&self) -> bool {
        self.raised.swap(false, Ordering::AcqRel)
    }
}
