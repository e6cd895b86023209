//! Adapter between a user closure and the driver's delivery/release pair.
//!
//! The driver hands the adapter one frame reference per delivery and
//! signals exactly once, at unregistration, that the adapter will never be
//! invoked again. `invoke` wraps each raw handle in an owning [`Frame`]
//! before the closure sees it, so a closure that ignores or drops its
//! argument still releases the underlying reference.

use crate::backend::FrameHandle;
use crate::Frame;

pub(crate) struct FrameCallback {
    on_frame: Box<dyn FnMut(Frame) + Send>,
}

impl FrameCallback {
    pub(crate) fn new(on_frame: impl FnMut(Frame) + Send + 'static) -> Box<Self> {
        Box::new(FrameCallback {
            on_frame: Box::new(on_frame),
        })
    }

    /// Deliver one frame. Ownership of the handle transfers to the closure
    /// via the wrapping `Frame`; panics inside the closure are contained so
    /// a driver delivery thread never unwinds through the adapter.
    pub(crate) fn invoke(&mut self, handle: FrameHandle) {
        let frame = Frame::from_handle(handle);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            (self.on_frame)(frame)
        }));
        if result.is_err() {
            tracing::error!("frame consumer panicked; frame dropped");
        }
    }

    /// Final teardown. Consumes the adapter; the closure and anything it
    /// captured drop here, exactly once.
    pub(crate) fn release(self: Box<Self>) {
        drop(self);
    }
}

impl std::fmt::Debug for FrameCallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameCallback").finish_non_exhaustive()
    }
}
