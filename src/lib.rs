//! Safe wrapper around the librealsense camera SDK.
//!
//! The crate is organized around the handles a capture pipeline touches:
//! - [`Context`]: driver session and device enumeration
//! - [`Device`] / [`Subdevice`]: identity, calibration, modes, options
//! - [`StreamChannel`]: one open streaming session, shared by clones
//! - [`Frame`]: owning wrapper over one driver frame reference
//! - [`FrameQueue`]: bounded, thread-safe handoff between the driver's
//!   delivery thread and a pulling consumer
//!
//! With default features the crate runs against a built-in mock driver, so
//! the full API is usable in tests and on machines without cameras. Enable
//! the `realsense_sdk` feature to bind the real SDK.
//!
//! # Example
//!
//! ```
//! use realsense::{Context, FrameQueue};
//!
//! # fn main() -> realsense::Result<()> {
//! let ctx = Context::new()?;
//! let device = ctx.query_devices()?.into_iter().next().unwrap();
//! let depth = device.depth()?;
//! let mode = depth.stream_modes()?[0];
//!
//! let queue = FrameQueue::with_capacity(8);
//! let channel = depth.open(&mode)?;
//! channel.start_to_queue(&queue)?;
//! // frames now arrive in `queue`; pull with wait_for_frame/poll_for_frame
//! # Ok(())
//! # }
//! ```

pub mod backend;
mod callback;
mod channel;
mod context;
mod error;
mod frame;
mod queue;
pub mod types;

pub use crate::channel::StreamChannel;
pub use crate::context::{Context, Device, Subdevice};
pub use crate::error::{Error, Result};
pub use crate::frame::Frame;
pub use crate::queue::FrameQueue;
pub use crate::types::{
    CameraInfo, Distortion, Extrinsics, FrameMetadata, Intrinsics, OptionId, OptionRange,
    PixelFormat, StreamKind, StreamProfile, Subdev, TimestampDomain,
};
