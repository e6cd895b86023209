//! Shared test utilities for streaming validation tests.
//!
//! This module provides reusable components for testing:
//! - Device/subdevice setup helpers against the mock driver
//! - `FrameTracker`: frame-number ordering and duplicate detection
//! - Release-probe helpers for ownership assertions

#![allow(dead_code)] // Utilities may not all be used in every test file

use std::sync::Once;

use realsense::backend::mock::SyntheticFrame;
use realsense::{Context, Device, StreamProfile, Subdevice};

static TRACING: Once = Once::new();

/// Install a tracing subscriber once per test binary. `RUST_LOG` controls
/// verbosity the usual way.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// The mock context always exposes exactly one device.
pub fn mock_device() -> Device {
    init_tracing();
    let ctx = Context::new().expect("mock context");
    ctx.query_devices()
        .expect("query devices")
        .into_iter()
        .next()
        .expect("one mock device")
}

pub fn depth_subdevice() -> Subdevice {
    mock_device().depth().expect("depth subdevice")
}

/// First advertised depth mode (640x480@30 z16 on the mock device).
pub fn depth_mode() -> StreamProfile {
    depth_subdevice().stream_modes().expect("depth modes")[0]
}

/// A zero-filled synthetic depth frame matching [`depth_mode`].
pub fn depth_frame(number: u64) -> SyntheticFrame {
    SyntheticFrame::new(&depth_mode(), number)
}

/// Tracks frame numbers as they arrive and flags ordering anomalies.
#[derive(Debug, Default)]
pub struct FrameTracker {
    numbers: Vec<u64>,
    duplicates: u64,
    out_of_order: u64,
}

impl FrameTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, number: u64) {
        if let Some(&last) = self.numbers.last() {
            if number == last {
                self.duplicates += 1;
            } else if number < last {
                self.out_of_order += 1;
            }
        }
        self.numbers.push(number);
    }

    pub fn count(&self) -> usize {
        self.numbers.len()
    }

    pub fn numbers(&self) -> &[u64] {
        &self.numbers
    }

    pub fn assert_clean(&self, context: &str) {
        assert_eq!(
            self.duplicates, 0,
            "{}: {} duplicate frame numbers",
            context, self.duplicates
        );
        assert_eq!(
            self.out_of_order, 0,
            "{}: {} out-of-order frames",
            context, self.out_of_order
        );
    }
}
