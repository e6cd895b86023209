//! End-to-end streaming tests against the mock driver: open a session,
//! wire it to a queue or callback, inject frames, and verify delivery
//! order, consumer replacement, and release discipline.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use realsense::backend::mock::{release_probe, SyntheticFrame};
use realsense::{FrameQueue, PixelFormat, StreamKind, StreamProfile};

use common::{depth_frame, depth_mode, depth_subdevice, FrameTracker};

#[test]
fn depth_pipeline_delivers_in_order() {
    let depth = depth_subdevice();
    let mode = depth_mode();
    assert_eq!(mode.stream, StreamKind::Depth);
    assert_eq!(mode.format, PixelFormat::Z16);

    let queue = FrameQueue::with_capacity(8);
    let channel = depth.open(&mode).expect("open depth session");
    channel.start_to_queue(&queue).expect("start streaming");
    assert!(channel.is_streaming());

    for n in 1..=3 {
        channel.inject_frame(depth_frame(n));
    }

    let mut tracker = FrameTracker::new();
    for _ in 0..3 {
        let frame = queue.wait_for_frame().expect("queued frame");
        assert_eq!(frame.width().unwrap(), mode.width);
        assert_eq!(frame.format().unwrap(), PixelFormat::Z16);
        tracker.record(frame.frame_number().unwrap());
    }
    tracker.assert_clean("depth pipeline");
    assert_eq!(tracker.numbers(), &[1, 2, 3]);

    // No fourth frame was delivered.
    assert!(queue.poll_for_frame().is_none());
}

#[test]
fn callback_consumer_sees_every_frame() {
    let channel = depth_subdevice().open(&depth_mode()).expect("open");
    let seen = Arc::new(AtomicUsize::new(0));
    let seen2 = Arc::clone(&seen);
    channel
        .start(move |frame| {
            assert!(frame.is_valid());
            seen2.fetch_add(1, Ordering::SeqCst);
        })
        .expect("start");

    for n in 1..=5 {
        channel.inject_frame(depth_frame(n));
    }
    assert_eq!(seen.load(Ordering::SeqCst), 5);
}

#[test]
fn restart_replaces_consumer() {
    let channel = depth_subdevice().open(&depth_mode()).expect("open");

    let first = Arc::new(AtomicUsize::new(0));
    let first2 = Arc::clone(&first);
    channel
        .start(move |_| {
            first2.fetch_add(1, Ordering::SeqCst);
        })
        .expect("first start");
    channel.inject_frame(depth_frame(1));

    let second = Arc::new(AtomicUsize::new(0));
    let second2 = Arc::clone(&second);
    channel
        .start(move |_| {
            second2.fetch_add(1, Ordering::SeqCst);
        })
        .expect("second start");
    channel.inject_frame(depth_frame(2));

    // The first consumer stopped receiving once replaced.
    assert_eq!(first.load(Ordering::SeqCst), 1);
    assert_eq!(second.load(Ordering::SeqCst), 1);
}

#[test]
fn replaced_consumer_is_released() {
    let channel = depth_subdevice().open(&depth_mode()).expect("open");

    let dropped = Arc::new(AtomicUsize::new(0));
    struct DropCounter(Arc<AtomicUsize>);
    impl Drop for DropCounter {
        fn drop(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    let counter = DropCounter(Arc::clone(&dropped));
    channel
        .start(move |_| {
            let _ = &counter;
        })
        .expect("start");
    assert_eq!(dropped.load(Ordering::SeqCst), 0);

    channel.start(|_| {}).expect("replace");
    assert_eq!(dropped.load(Ordering::SeqCst), 1);

    // Stop releases the replacement, and only it, exactly once.
    channel.stop().expect("stop");
    assert_eq!(dropped.load(Ordering::SeqCst), 1);
}

#[test]
fn stop_halts_delivery_and_allows_restart() {
    let channel = depth_subdevice().open(&depth_mode()).expect("open");
    let queue = FrameQueue::with_capacity(4);
    channel.start_to_queue(&queue).expect("start");
    channel.inject_frame(depth_frame(1));
    channel.stop().expect("stop");
    assert!(!channel.is_streaming());

    // Frames injected while stopped are released, not queued.
    let probe = release_probe();
    channel.inject_frame(depth_frame(2).with_release_probe(probe.clone()));
    assert_eq!(probe.load(Ordering::SeqCst), 1);
    assert_eq!(queue.len(), 1);

    channel.start_to_queue(&queue).expect("restart");
    channel.inject_frame(depth_frame(3));
    assert_eq!(queue.len(), 2);
}

#[test]
fn stopping_idle_channel_is_a_no_op() {
    let channel = depth_subdevice().open(&depth_mode()).expect("open");
    channel.stop().expect("stop before start");
    channel.start(|_| {}).expect("start");
    channel.stop().expect("first stop");
    channel.stop().expect("second stop");
}

#[test]
fn clones_share_one_session() {
    let channel = depth_subdevice().open(&depth_mode()).expect("open");
    let queue = FrameQueue::with_capacity(4);
    channel.start_to_queue(&queue).expect("start");

    let clone = channel.clone();
    drop(channel);

    // The surviving clone still drives the same session.
    assert!(clone.is_streaming());
    clone.inject_frame(depth_frame(1));
    assert_eq!(queue.len(), 1);
}

#[test]
fn consumer_outlives_channel_teardown() {
    let dropped = Arc::new(AtomicUsize::new(0));
    struct DropCounter(Arc<AtomicUsize>);
    impl Drop for DropCounter {
        fn drop(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    {
        let channel = depth_subdevice().open(&depth_mode()).expect("open");
        let counter = DropCounter(Arc::clone(&dropped));
        channel
            .start(move |_| {
                let _ = &counter;
            })
            .expect("start");
        assert_eq!(dropped.load(Ordering::SeqCst), 0);
    }
    // Last clone dropped; the session released its consumer exactly once.
    assert_eq!(dropped.load(Ordering::SeqCst), 1);
}

#[test]
fn queued_frames_survive_channel_drop() {
    let queue = FrameQueue::with_capacity(4);
    {
        let channel = depth_subdevice().open(&depth_mode()).expect("open");
        channel.start_to_queue(&queue).expect("start");
        channel.inject_frame(depth_frame(1));
        channel.inject_frame(depth_frame(2));
    }
    // Frames already handed off belong to the queue, not the session.
    assert_eq!(queue.wait_for_frame().unwrap().frame_number().unwrap(), 1);
    assert_eq!(queue.wait_for_frame().unwrap().frame_number().unwrap(), 2);
}

#[test]
fn slow_consumer_keeps_freshest_frames() {
    let channel = depth_subdevice().open(&depth_mode()).expect("open");
    let queue = FrameQueue::with_capacity(2);
    channel.start_to_queue(&queue).expect("start");

    for n in 1..=5 {
        channel.inject_frame(depth_frame(n));
    }
    // Capacity 2: only the newest two frames remain.
    assert_eq!(queue.wait_for_frame().unwrap().frame_number().unwrap(), 4);
    assert_eq!(queue.wait_for_frame().unwrap().frame_number().unwrap(), 5);
    assert!(queue.poll_for_frame().is_none());
}

#[test]
fn delivered_frame_carries_metadata_and_timestamp() {
    let channel = depth_subdevice().open(&depth_mode()).expect("open");
    let queue = FrameQueue::with_capacity(1);
    channel.start_to_queue(&queue).expect("start");

    channel.inject_frame(
        depth_frame(10)
            .with_timestamp(333.25)
            .with_metadata(realsense::FrameMetadata::ActualExposure, 33.0),
    );
    let frame = queue.wait_for_frame().expect("frame");
    assert_eq!(frame.timestamp().unwrap(), 333.25);
    assert_eq!(
        frame.metadata(realsense::FrameMetadata::ActualExposure).unwrap(),
        33.0
    );
}

#[test]
fn open_rejects_unsupported_profile() {
    let depth = depth_subdevice();
    let bogus = StreamProfile {
        stream: StreamKind::Depth,
        width: 123,
        height: 45,
        fps: 7,
        format: PixelFormat::Z16,
    };
    let err = depth.open(&bogus).unwrap_err();
    assert_eq!(err.failed_function(), Some("rs_open"));
    assert!(err.failed_args().unwrap().contains("123x45"));
}

#[test]
fn open_many_rejects_mixed_validity() {
    let depth = depth_subdevice();
    let good = depth_mode();
    let bad = StreamProfile {
        width: 1, ..good
    };
    let err = depth.open_many(&[good, bad]).unwrap_err();
    assert_eq!(err.failed_function(), Some("rs_open_many"));
}

#[test]
fn open_many_streams_all_profiles() {
    let depth = depth_subdevice();
    let modes = depth.stream_modes().expect("modes");
    assert!(modes.len() >= 2);
    let channel = depth.open_many(&modes).expect("open many");
    assert_eq!(channel.profiles(), &modes[..]);

    let queue = FrameQueue::with_capacity(4);
    channel.start_to_queue(&queue).expect("start");
    channel.inject_frame(SyntheticFrame::new(&modes[0], 1));
    channel.inject_frame(SyntheticFrame::new(&modes[1], 1));
    assert_eq!(queue.len(), 2);
}
