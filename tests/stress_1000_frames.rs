//! Throughput soak: push 1000 frames through a live session from a
//! producer thread while a consumer drains the queue, and verify nothing
//! is duplicated, reordered, or leaked.

mod common;

use std::sync::atomic::Ordering;

use realsense::backend::mock::release_probe;
use realsense::FrameQueue;

use common::{depth_frame, depth_mode, depth_subdevice, FrameTracker};

const FRAME_COUNT: u64 = 1000;

#[test]
fn thousand_frames_through_queue() {
    let channel = depth_subdevice().open(&depth_mode()).expect("open");
    // Queue large enough that nothing is evicted; every frame must arrive.
    let queue = FrameQueue::with_capacity(FRAME_COUNT as usize);
    channel.start_to_queue(&queue).expect("start");

    let probe = release_probe();
    let producer = {
        let channel = channel.clone();
        let probe = probe.clone();
        std::thread::spawn(move || {
            for n in 1..=FRAME_COUNT {
                channel.inject_frame(depth_frame(n).with_release_probe(probe.clone()));
            }
        })
    };

    let mut tracker = FrameTracker::new();
    while (tracker.count() as u64) < FRAME_COUNT {
        let frame = queue.wait_for_frame().expect("frame");
        tracker.record(frame.frame_number().unwrap());
        drop(frame);
    }
    producer.join().expect("producer thread");

    tracker.assert_clean("1000-frame soak");
    assert_eq!(tracker.count() as u64, FRAME_COUNT);
    assert!(queue.poll_for_frame().is_none());
    // Every sample was released exactly once.
    assert_eq!(probe.load(Ordering::SeqCst) as u64, FRAME_COUNT);
}
