//! Streaming channel.
//!
//! A [`StreamChannel`] is the handle to one open acquisition session on a
//! subdevice. Clones share the session; the driver-side close happens when
//! the last clone drops, so a callback or a queue wired to the channel can
//! outlive the handle that opened it.
//!
//! `start` registers a consumer for delivered frames. Starting again
//! replaces the previous consumer, which is released at that point. `stop`
//! halts delivery and releases the consumer; the channel can be started
//! again afterwards.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::backend::SessionHandle;
use crate::callback::FrameCallback;
use crate::error::Result;
use crate::queue::FrameQueue;
use crate::types::StreamProfile;
use crate::Frame;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChannelState {
    Idle,
    Streaming,
}

struct ChannelInner {
    session: SessionHandle,
    state: Mutex<ChannelState>,
}

/// Shared handle to one open streaming session.
#[derive(Clone)]
pub struct StreamChannel {
    inner: Arc<ChannelInner>,
}

impl StreamChannel {
    pub(crate) fn new(session: SessionHandle) -> Self {
        StreamChannel {
            inner: Arc::new(ChannelInner {
                session,
                state: Mutex::new(ChannelState::Idle),
            }),
        }
    }

    /// The stream profiles this session was opened with.
    pub fn profiles(&self) -> &[StreamProfile] {
        self.inner.session.profiles()
    }

    /// Begin streaming, delivering each frame to `consumer` on the driver's
    /// delivery thread. The consumer owns each frame it receives; dropping
    /// the frame releases it. A consumer already registered is replaced and
    /// released.
    pub fn start(&self, consumer: impl FnMut(Frame) + Send + 'static) -> Result<()> {
        let mut state = self.inner.state.lock();
        self.inner.session.start(FrameCallback::new(consumer))?;
        *state = ChannelState::Streaming;
        tracing::debug!("streaming started");
        Ok(())
    }

    /// Begin streaming into `queue`. Convenience for the common pull-model
    /// setup; equivalent to `start` with a closure that enqueues.
    pub fn start_to_queue(&self, queue: &FrameQueue) -> Result<()> {
        let queue = queue.clone();
        self.start(move |frame| queue.enqueue(frame))
    }

    /// Stop streaming and release the registered consumer. Stopping an idle
    /// channel is a no-op.
    pub fn stop(&self) -> Result<()> {
        let mut state = self.inner.state.lock();
        self.inner.session.stop()?;
        *state = ChannelState::Idle;
        tracing::debug!("streaming stopped");
        Ok(())
    }

    pub fn is_streaming(&self) -> bool {
        *self.inner.state.lock() == ChannelState::Streaming
    }

    /// Deliver one synthetic frame through the session's registered
    /// consumer, on the calling thread. Frames injected while the channel
    /// is not streaming are released immediately.
    ///
    /// The consumer runs before this returns; a consumer that calls back
    /// into `start` or `stop` on the same channel will deadlock.
    #[cfg(not(feature = "realsense_sdk"))]
    pub fn inject_frame(&self, frame: crate::backend::mock::SyntheticFrame) {
        self.inner.session.deliver(frame);
    }
}

impl std::fmt::Debug for StreamChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamChannel")
            .field("profiles", &self.inner.session.profiles())
            .field("streaming", &self.is_streaming())
            .finish()
    }
}
