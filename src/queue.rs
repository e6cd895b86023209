//! Bounded frame queue.
//!
//! Decouples the driver's delivery thread from a consumer that wants to
//! pull frames at its own pace. The queue holds owned [`Frame`]s; when it
//! is full, the oldest frame is dropped (releasing its driver reference) to
//! make room for the newest, so a slow consumer sees fresh data rather than
//! an ever-growing backlog.
//!
//! Handles are cheap clones of one shared queue, so the producer side (a
//! streaming callback) and the consumer side can live on different threads.

use std::collections::VecDeque;

use parking_lot::{Condvar, Mutex};

use crate::error::{Error, Result};
use crate::Frame;

struct QueueState {
    frames: VecDeque<Frame>,
    capacity: usize,
    /// Bumped by `flush`; a waiter that observes the bump gives up.
    flush_epoch: u64,
}

struct Shared {
    state: Mutex<QueueState>,
    available: Condvar,
}

/// A bounded, thread-safe queue of owned frames.
#[derive(Clone)]
pub struct FrameQueue {
    shared: std::sync::Arc<Shared>,
}

impl Default for FrameQueue {
    fn default() -> Self {
        FrameQueue::with_capacity(1)
    }
}

impl FrameQueue {
    /// A queue holding at most `capacity` frames. A capacity of zero is
    /// treated as one.
    pub fn with_capacity(capacity: usize) -> Self {
        FrameQueue {
            shared: std::sync::Arc::new(Shared {
                state: Mutex::new(QueueState {
                    frames: VecDeque::new(),
                    capacity: capacity.max(1),
                    flush_epoch: 0,
                }),
                available: Condvar::new(),
            }),
        }
    }

    /// Push a frame, evicting the oldest one if the queue is full. Empty
    /// frames are ignored. Never blocks.
    pub fn enqueue(&self, frame: Frame) {
        if !frame.is_valid() {
            return;
        }
        let mut state = self.shared.state.lock();
        if state.frames.len() == state.capacity {
            // Oldest out; its driver reference releases here.
            let evicted = state.frames.pop_front();
            drop(evicted);
            tracing::trace!(capacity = state.capacity, "queue full, dropped oldest frame");
        }
        state.frames.push_back(frame);
        drop(state);
        self.shared.available.notify_one();
    }

    /// Block until a frame is available and return it. Returns a driver
    /// error if the queue is flushed while waiting.
    pub fn wait_for_frame(&self) -> Result<Frame> {
        let mut state = self.shared.state.lock();
        let entry_epoch = state.flush_epoch;
        loop {
            if let Some(frame) = state.frames.pop_front() {
                return Ok(frame);
            }
            if state.flush_epoch != entry_epoch {
                return Err(Error::driver(
                    "rs_wait_for_frame",
                    format!("queue:{:p}", std::sync::Arc::as_ptr(&self.shared)),
                    "frame queue flushed while waiting",
                ));
            }
            self.shared.available.wait(&mut state);
        }
    }

    /// Return a frame if one is available, without blocking.
    pub fn poll_for_frame(&self) -> Option<Frame> {
        self.shared.state.lock().frames.pop_front()
    }

    /// Drop every queued frame and wake all blocked waiters with an error.
    /// Call this before tearing down the consumer side.
    pub fn flush(&self) {
        let mut state = self.shared.state.lock();
        let drained = std::mem::take(&mut state.frames);
        state.flush_epoch += 1;
        drop(state);
        drop(drained);
        self.shared.available.notify_all();
    }

    pub fn len(&self) -> usize {
        self.shared.state.lock().frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.state.lock().frames.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.shared.state.lock().capacity
    }
}

impl std::fmt::Debug for FrameQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("FrameQueue")
            .field("len", &state.frames.len())
            .field("capacity", &state.capacity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mock::{release_probe, SyntheticFrame};
    use crate::types::{PixelFormat, StreamKind, StreamProfile};
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    fn frame(number: u64) -> Frame {
        let profile = StreamProfile {
            stream: StreamKind::Depth,
            width: 4,
            height: 4,
            fps: 30,
            format: PixelFormat::Z16,
        };
        SyntheticFrame::new(&profile, number).into_frame()
    }

    #[test]
    fn fifo_order() {
        let queue = FrameQueue::with_capacity(4);
        for n in 1..=3 {
            queue.enqueue(frame(n));
        }
        for n in 1..=3 {
            assert_eq!(queue.wait_for_frame().unwrap().frame_number().unwrap(), n);
        }
        assert!(queue.poll_for_frame().is_none());
    }

    #[test]
    fn full_queue_drops_oldest() {
        let probe = release_probe();
        let queue = FrameQueue::with_capacity(1);
        let profile = StreamProfile {
            stream: StreamKind::Depth,
            width: 4,
            height: 4,
            fps: 30,
            format: PixelFormat::Z16,
        };
        queue.enqueue(
            SyntheticFrame::new(&profile, 1)
                .with_release_probe(probe.clone())
                .into_frame(),
        );
        queue.enqueue(SyntheticFrame::new(&profile, 2).into_frame());
        // Frame 1 was evicted and released; frame 2 survives.
        assert_eq!(probe.load(Ordering::SeqCst), 1);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.poll_for_frame().unwrap().frame_number().unwrap(), 2);
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let queue = FrameQueue::with_capacity(0);
        assert_eq!(queue.capacity(), 1);
        queue.enqueue(frame(1));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn empty_frames_are_ignored() {
        let queue = FrameQueue::default();
        queue.enqueue(Frame::default());
        assert!(queue.is_empty());
    }

    #[test]
    fn flush_releases_everything() {
        let probe = release_probe();
        let profile = StreamProfile {
            stream: StreamKind::Depth,
            width: 4,
            height: 4,
            fps: 30,
            format: PixelFormat::Z16,
        };
        let queue = FrameQueue::with_capacity(4);
        for n in 1..=3 {
            queue.enqueue(
                SyntheticFrame::new(&profile, n)
                    .with_release_probe(probe.clone())
                    .into_frame(),
            );
        }
        queue.flush();
        assert!(queue.is_empty());
        assert_eq!(probe.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn flush_wakes_blocked_waiter() {
        let queue = FrameQueue::default();
        let waiter = {
            let queue = queue.clone();
            std::thread::spawn(move || queue.wait_for_frame())
        };
        // Give the waiter time to block before flushing.
        std::thread::sleep(Duration::from_millis(50));
        queue.flush();
        let result = waiter.join().unwrap();
        let err = result.unwrap_err();
        assert_eq!(err.failed_function(), Some("rs_wait_for_frame"));
    }

    #[test]
    fn wait_sees_frame_enqueued_after_blocking() {
        let queue = FrameQueue::default();
        let waiter = {
            let queue = queue.clone();
            std::thread::spawn(move || queue.wait_for_frame())
        };
        std::thread::sleep(Duration::from_millis(50));
        queue.enqueue(frame(9));
        let got = waiter.join().unwrap().unwrap();
        assert_eq!(got.frame_number().unwrap(), 9);
    }

    #[test]
    fn poll_and_wait_never_claim_the_same_frame() {
        let queue = FrameQueue::with_capacity(32);
        let waiter = {
            let queue = queue.clone();
            std::thread::spawn(move || {
                let mut got = Vec::new();
                while let Ok(frame) = queue.wait_for_frame() {
                    got.push(frame.frame_number().unwrap());
                }
                got
            })
        };
        let mut polled = Vec::new();
        for n in 1..=20 {
            queue.enqueue(frame(n));
            if let Some(frame) = queue.poll_for_frame() {
                polled.push(frame.frame_number().unwrap());
            }
        }
        while !queue.is_empty() {
            std::thread::sleep(Duration::from_millis(5));
        }
        while !waiter.is_finished() {
            queue.flush();
            std::thread::sleep(Duration::from_millis(5));
        }
        let mut all = waiter.join().unwrap();
        all.extend(polled);
        all.sort_unstable();
        all.dedup();
        // Every frame was dequeued by exactly one consumer.
        assert_eq!(all.len(), 20);
    }

    #[test]
    fn concurrent_consumers_split_frames() {
        let queue = FrameQueue::with_capacity(16);
        let consumers: Vec<_> = (0..2)
            .map(|_| {
                let queue = queue.clone();
                std::thread::spawn(move || {
                    let mut got = Vec::new();
                    while let Ok(frame) = queue.wait_for_frame() {
                        got.push(frame.frame_number().unwrap());
                    }
                    got
                })
            })
            .collect();
        for n in 1..=10 {
            queue.enqueue(frame(n));
        }
        // Let consumers drain, then flush until both observe it and exit.
        while !queue.is_empty() {
            std::thread::sleep(Duration::from_millis(5));
        }
        while !consumers.iter().all(|c| c.is_finished()) {
            queue.flush();
            std::thread::sleep(Duration::from_millis(5));
        }
        let mut all: Vec<u64> = consumers
            .into_iter()
            .flat_map(|c| c.join().unwrap())
            .collect();
        all.sort_unstable();
        assert_eq!(all, (1..=10).collect::<Vec<_>>());
    }
}
