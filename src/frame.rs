//! Owning frame wrapper.
//!
//! A [`Frame`] owns exactly one driver-side frame reference and releases it
//! on drop. Frames are move-only; the cheap way to hand one off is
//! [`Frame::take`], which leaves an empty frame behind, and the explicit way
//! to share pixel data is [`Frame::try_clone_ref`], which asks the driver
//! for a second reference.
//!
//! An empty frame (default-constructed, or the leftover of a `take`) fails
//! every accessor with a driver-category error naming the call that was
//! attempted; check [`Frame::is_valid`] to branch instead of erroring.

use crate::backend::FrameHandle;
use crate::error::{Error, Result};
use crate::types::{FrameMetadata, PixelFormat, StreamKind, TimestampDomain};

/// One captured frame, or the empty placeholder left behind by a move.
#[derive(Debug, Default)]
pub struct Frame {
    handle: Option<FrameHandle>,
}

impl Frame {
    pub(crate) fn from_handle(handle: FrameHandle) -> Self {
        Frame {
            handle: Some(handle),
        }
    }

    /// Whether this frame currently holds a driver reference.
    pub fn is_valid(&self) -> bool {
        self.handle.is_some()
    }

    /// Move the driver reference out, leaving `self` empty. The returned
    /// frame is the sole owner of the reference.
    pub fn take(&mut self) -> Frame {
        std::mem::take(self)
    }

    fn handle(&self, function: &'static str) -> Result<&FrameHandle> {
        self.handle
            .as_ref()
            .ok_or_else(|| Error::driver(function, "frame", "null frame handle"))
    }

    /// Capture timestamp in milliseconds, in the frame's timestamp domain.
    pub fn timestamp(&self) -> Result<f64> {
        self.handle("rs_get_frame_timestamp")?.timestamp()
    }

    /// Which clock [`Frame::timestamp`] was taken against.
    pub fn timestamp_domain(&self) -> Result<TimestampDomain> {
        self.handle("rs_get_frame_timestamp_domain")?
            .timestamp_domain()
    }

    /// Read one metadata field. Errors if the frame does not carry that
    /// kind; see [`Frame::supports_metadata`].
    pub fn metadata(&self, kind: FrameMetadata) -> Result<f64> {
        self.handle("rs_get_frame_metadata")?.metadata(kind)
    }

    pub fn supports_metadata(&self, kind: FrameMetadata) -> Result<bool> {
        self.handle("rs_supports_frame_metadata")?
            .supports_metadata(kind)
    }

    /// Monotonically increasing capture sequence number.
    pub fn frame_number(&self) -> Result<u64> {
        self.handle("rs_get_frame_number")?.number()
    }

    /// Raw pixel bytes, `stride_in_bytes * height` long. Valid as long as
    /// this frame holds its reference.
    pub fn data(&self) -> Result<&[u8]> {
        self.handle("rs_get_frame_data")?.data()
    }

    pub fn width(&self) -> Result<u32> {
        self.handle("rs_get_frame_width")?.width()
    }

    pub fn height(&self) -> Result<u32> {
        self.handle("rs_get_frame_height")?.height()
    }

    /// Bytes per row, including any padding.
    pub fn stride_in_bytes(&self) -> Result<u32> {
        self.handle("rs_get_frame_stride_in_bytes")?.stride_in_bytes()
    }

    pub fn bits_per_pixel(&self) -> Result<u32> {
        self.handle("rs_get_frame_bits_per_pixel")?.bits_per_pixel()
    }

    /// Whole bytes per pixel. Sub-byte formats round down; use
    /// [`Frame::bits_per_pixel`] for those.
    pub fn bytes_per_pixel(&self) -> Result<u32> {
        Ok(self.bits_per_pixel()? / 8)
    }

    pub fn format(&self) -> Result<PixelFormat> {
        self.handle("rs_get_frame_format")?.format()
    }

    pub fn stream_kind(&self) -> Result<StreamKind> {
        self.handle("rs_get_frame_stream_type")?.stream_kind()
    }

    /// Ask the driver for a second reference to the same frame data.
    /// `Ok(None)` means the driver declined (out of frame buffers); the
    /// original frame is untouched either way.
    pub fn try_clone_ref(&self) -> Result<Option<Frame>> {
        let cloned = self.handle("rs_clone_frame_ref")?.try_clone()?;
        Ok(cloned.map(Frame::from_handle))
    }
}
