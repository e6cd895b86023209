//! Mock driver backend.
//!
//! Stands in for the librealsense SDK so the wrapper can be exercised
//! without hardware: one synthetic device with depth, color, and infrared
//! subdevices, an option store with ranges, stream-mode tables, and a
//! session object that delivers injected frames through the real callback
//! adapter. Driver-reported failures are simulated with the same
//! function/args/message context the FFI backend would translate.
//!
//! Everything here is reachable from tests via [`SyntheticFrame`] and the
//! channel-level injection hook on `StreamChannel`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::callback::FrameCallback;
use crate::error::{Error, Result};
use crate::types::{
    CameraInfo, Distortion, Extrinsics, FrameMetadata, Intrinsics, OptionId, OptionRange,
    PixelFormat, StreamKind, StreamProfile, Subdev, TimestampDomain,
};

/// Counter bumped exactly once when a mock sample is released back to the
/// "driver". Tests attach one to observe ownership-uniqueness.
pub type ReleaseProbe = Arc<AtomicUsize>;

/// Create a fresh release probe.
pub fn release_probe() -> ReleaseProbe {
    Arc::new(AtomicUsize::new(0))
}

// ============================================================================
// Frames
// ============================================================================

/// One captured sample owned by the mock driver. The refcount the real
/// driver keeps per frame is modeled by the `Arc` around this struct; the
/// sample's `Drop` is the moment the last reference is released.
#[derive(Debug)]
pub(crate) struct MockSample {
    stream: StreamKind,
    format: PixelFormat,
    width: u32,
    height: u32,
    stride_in_bytes: u32,
    bits_per_pixel: u32,
    timestamp_ms: f64,
    domain: TimestampDomain,
    number: u64,
    pixels: Vec<u8>,
    metadata: Vec<(FrameMetadata, f64)>,
    release_probe: Option<ReleaseProbe>,
}

impl Drop for MockSample {
    fn drop(&mut self) {
        if let Some(probe) = &self.release_probe {
            probe.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Exclusively-owned reference to one mock sample. Dropping the handle
/// decrements the driver-side refcount; cloning through [`try_clone`]
/// increments it and yields a second independent owner.
///
/// [`try_clone`]: FrameHandle::try_clone
#[derive(Debug)]
pub(crate) struct FrameHandle(Arc<MockSample>);

impl FrameHandle {
    pub(crate) fn timestamp(&self) -> Result<f64> {
        Ok(self.0.timestamp_ms)
    }

    pub(crate) fn timestamp_domain(&self) -> Result<TimestampDomain> {
        Ok(self.0.domain)
    }

    pub(crate) fn metadata(&self, kind: FrameMetadata) -> Result<f64> {
        self.0
            .metadata
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, v)| *v)
            .ok_or_else(|| {
                Error::driver(
                    "rs_get_frame_metadata",
                    format!("frame:{}, metadata:{}", self.0.number, kind),
                    "unsupported metadata kind",
                )
            })
    }

    pub(crate) fn supports_metadata(&self, kind: FrameMetadata) -> Result<bool> {
        Ok(self.0.metadata.iter().any(|(k, _)| *k == kind))
    }

    pub(crate) fn number(&self) -> Result<u64> {
        Ok(self.0.number)
    }

    pub(crate) fn data(&self) -> Result<&[u8]> {
        Ok(&self.0.pixels)
    }

    pub(crate) fn width(&self) -> Result<u32> {
        Ok(self.0.width)
    }

    pub(crate) fn height(&self) -> Result<u32> {
        Ok(self.0.height)
    }

    pub(crate) fn stride_in_bytes(&self) -> Result<u32> {
        Ok(self.0.stride_in_bytes)
    }

    pub(crate) fn bits_per_pixel(&self) -> Result<u32> {
        Ok(self.0.bits_per_pixel)
    }

    pub(crate) fn format(&self) -> Result<PixelFormat> {
        Ok(self.0.format)
    }

    pub(crate) fn stream_kind(&self) -> Result<StreamKind> {
        Ok(self.0.stream)
    }

    /// Driver-side refcount increment. The mock always produces a handle;
    /// the `Option` is the FFI backend's "no handle produced" outcome.
    pub(crate) fn try_clone(&self) -> Result<Option<FrameHandle>> {
        Ok(Some(FrameHandle(Arc::clone(&self.0))))
    }
}

/// A frame description tests hand to the mock driver for delivery.
///
/// `into_frame` turns it directly into an owned [`crate::Frame`];
/// `StreamChannel::inject_frame` routes it through a live session's
/// callback adapter instead, on the calling thread.
#[derive(Debug)]
pub struct SyntheticFrame {
    pub stream: StreamKind,
    pub format: PixelFormat,
    pub width: u32,
    pub height: u32,
    pub timestamp_ms: f64,
    pub domain: TimestampDomain,
    pub number: u64,
    /// Raw pixel bytes; sized `stride * height` by [`SyntheticFrame::new`].
    pub pixels: Vec<u8>,
    pub metadata: Vec<(FrameMetadata, f64)>,
    pub release_probe: Option<ReleaseProbe>,
}

impl SyntheticFrame {
    /// A zero-filled frame matching `profile`, numbered `number`, with a
    /// timestamp derived from the profile's frame rate.
    pub fn new(profile: &StreamProfile, number: u64) -> Self {
        let bpp = profile.format.bits_per_pixel();
        let stride = profile.width * bpp.div_ceil(8);
        Self {
            stream: profile.stream,
            format: profile.format,
            width: profile.width,
            height: profile.height,
            timestamp_ms: number as f64 * 1000.0 / profile.fps.max(1) as f64,
            domain: TimestampDomain::HardwareClock,
            number,
            pixels: vec![0u8; (stride * profile.height) as usize],
            metadata: Vec::new(),
            release_probe: None,
        }
    }

    pub fn with_metadata(mut self, kind: FrameMetadata, value: f64) -> Self {
        self.metadata.push((kind, value));
        self
    }

    pub fn with_timestamp(mut self, timestamp_ms: f64) -> Self {
        self.timestamp_ms = timestamp_ms;
        self
    }

    pub fn with_release_probe(mut self, probe: ReleaseProbe) -> Self {
        self.release_probe = Some(probe);
        self
    }

    /// Build an owned frame without going through a streaming session.
    pub fn into_frame(self) -> crate::Frame {
        crate::Frame::from_handle(self.into_handle())
    }

    pub(crate) fn into_handle(self) -> FrameHandle {
        FrameHandle(Arc::new(self.into_sample()))
    }

    fn into_sample(self) -> MockSample {
        let bpp = self.format.bits_per_pixel();
        MockSample {
            stream: self.stream,
            format: self.format,
            width: self.width,
            height: self.height,
            stride_in_bytes: self.width * bpp.div_ceil(8),
            bits_per_pixel: bpp,
            timestamp_ms: self.timestamp_ms,
            domain: self.domain,
            number: self.number,
            pixels: self.pixels,
            metadata: self.metadata,
            release_probe: self.release_probe,
        }
    }
}

// ============================================================================
// Devices
// ============================================================================

struct MockSubdevice {
    modes: Vec<StreamProfile>,
    ranges: HashMap<OptionId, OptionRange>,
    values: Mutex<HashMap<OptionId, f32>>,
}

impl MockSubdevice {
    fn new(modes: Vec<StreamProfile>, options: &[(OptionId, OptionRange)]) -> Self {
        let ranges: HashMap<_, _> = options.iter().copied().collect();
        let values = options
            .iter()
            .map(|(id, range)| (*id, range.default))
            .collect();
        Self {
            modes,
            ranges,
            values: Mutex::new(values),
        }
    }
}

struct DeviceInner {
    name: String,
    serial: String,
    firmware: String,
    subdevices: [Option<MockSubdevice>; 4],
    depth_scale: f32,
}

/// Shared handle to one mock device; `Device` and every `Subdevice` carved
/// from it hold clones.
#[derive(Clone)]
pub(crate) struct DeviceHandle(Arc<DeviceInner>);

impl DeviceHandle {
    fn subdevice(&self, sub: Subdev, function: &'static str) -> Result<&MockSubdevice> {
        self.0.subdevices[subdev_index(sub)].as_ref().ok_or_else(|| {
            Error::driver(
                function,
                format!("device:{}, subdevice:{}", self.0.serial, sub),
                "subdevice not present on this device",
            )
        })
    }

    pub(crate) fn supports_subdevice(&self, sub: Subdev) -> Result<bool> {
        Ok(self.0.subdevices[subdev_index(sub)].is_some())
    }

    pub(crate) fn supports_camera_info(&self, info: CameraInfo) -> Result<bool> {
        Ok(!matches!(info, CameraInfo::PhysicalPort))
    }

    pub(crate) fn camera_info(&self, info: CameraInfo) -> Result<String> {
        match info {
            CameraInfo::DeviceName => Ok(self.0.name.clone()),
            CameraInfo::SerialNumber => Ok(self.0.serial.clone()),
            CameraInfo::FirmwareVersion => Ok(self.0.firmware.clone()),
            CameraInfo::PhysicalPort => Err(Error::driver(
                "rs_get_camera_info",
                format!("device:{}, info:{}", self.0.serial, info),
                "camera info field is not supported",
            )),
        }
    }

    pub(crate) fn extrinsics(&self, from: Subdev, to: Subdev) -> Result<Extrinsics> {
        self.subdevice(from, "rs_get_device_extrinsics")?;
        self.subdevice(to, "rs_get_device_extrinsics")?;
        // Identity rotation with a fixed baseline between distinct sensors.
        let translation = if from == to { [0.0; 3] } else { [0.025, 0.0, 0.0] };
        Ok(Extrinsics {
            rotation: [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
            translation,
        })
    }

    pub(crate) fn intrinsics(&self, sub: Subdev, profile: &StreamProfile) -> Result<Intrinsics> {
        let subdev = self.subdevice(sub, "rs_get_stream_intrinsics")?;
        if !subdev.modes.contains(profile) {
            return Err(Error::driver(
                "rs_get_stream_intrinsics",
                format!("device:{}, subdevice:{}, profile:{}", self.0.serial, sub, profile),
                "no intrinsics for unsupported stream profile",
            ));
        }
        Ok(Intrinsics {
            width: profile.width,
            height: profile.height,
            ppx: profile.width as f32 / 2.0,
            ppy: profile.height as f32 / 2.0,
            fx: profile.width as f32,
            fy: profile.width as f32,
            model: Distortion::None,
            coeffs: [0.0; 5],
        })
    }

    pub(crate) fn depth_scale(&self) -> Result<f32> {
        Ok(self.0.depth_scale)
    }

    pub(crate) fn stream_modes(&self, sub: Subdev) -> Result<Vec<StreamProfile>> {
        Ok(self.subdevice(sub, "rs_get_stream_modes")?.modes.clone())
    }

    pub(crate) fn supports_option(&self, sub: Subdev, option: OptionId) -> Result<bool> {
        Ok(self
            .subdevice(sub, "rs_supports_subdevice_option")?
            .ranges
            .contains_key(&option))
    }

    pub(crate) fn get_option(&self, sub: Subdev, option: OptionId) -> Result<f32> {
        let subdev = self.subdevice(sub, "rs_get_subdevice_option")?;
        subdev.values.lock().get(&option).copied().ok_or_else(|| {
            Error::driver(
                "rs_get_subdevice_option",
                format!("device:{}, subdevice:{}, option:{}", self.0.serial, sub, option),
                "option is not supported by this subdevice",
            )
        })
    }

    pub(crate) fn set_option(&self, sub: Subdev, option: OptionId, value: f32) -> Result<()> {
        let subdev = self.subdevice(sub, "rs_set_subdevice_option")?;
        let args = format!(
            "device:{}, subdevice:{}, option:{}, value:{}",
            self.0.serial, sub, option, value
        );
        let range = subdev.ranges.get(&option).ok_or_else(|| {
            Error::driver(
                "rs_set_subdevice_option",
                args.clone(),
                "option is not supported by this subdevice",
            )
        })?;
        if value < range.min || value > range.max {
            return Err(Error::driver(
                "rs_set_subdevice_option",
                args,
                format!("value out of range [{}, {}]", range.min, range.max),
            ));
        }
        subdev.values.lock().insert(option, value);
        Ok(())
    }

    pub(crate) fn option_range(&self, sub: Subdev, option: OptionId) -> Result<OptionRange> {
        let subdev = self.subdevice(sub, "rs_get_subdevice_option_range")?;
        subdev.ranges.get(&option).copied().ok_or_else(|| {
            Error::driver(
                "rs_get_subdevice_option_range",
                format!("device:{}, subdevice:{}, option:{}", self.0.serial, sub, option),
                "option is not supported by this subdevice",
            )
        })
    }

    pub(crate) fn option_description(&self, sub: Subdev, option: OptionId) -> Result<String> {
        self.subdevice(sub, "rs_get_subdevice_option_description")?;
        Ok(format!("{} control for the {} subdevice", option, sub))
    }

    pub(crate) fn option_value_description(
        &self,
        sub: Subdev,
        option: OptionId,
        value: f32,
    ) -> Result<String> {
        self.subdevice(sub, "rs_get_subdevice_option_value_description")?;
        Ok(format!("{} = {}", option, value))
    }
}

// ============================================================================
// Context
// ============================================================================

pub(crate) struct ContextHandle;

pub(crate) fn create_context() -> Result<ContextHandle> {
    tracing::debug!("created mock driver context");
    Ok(ContextHandle)
}

pub(crate) fn query_devices(_ctx: &ContextHandle) -> Result<Vec<DeviceHandle>> {
    Ok(vec![default_device()])
}

fn default_device() -> DeviceHandle {
    let depth_modes = vec![
        StreamProfile {
            stream: StreamKind::Depth,
            width: 640,
            height: 480,
            fps: 30,
            format: PixelFormat::Z16,
        },
        StreamProfile {
            stream: StreamKind::Depth,
            width: 480,
            height: 360,
            fps: 60,
            format: PixelFormat::Z16,
        },
    ];
    let color_modes = vec![
        StreamProfile {
            stream: StreamKind::Color,
            width: 640,
            height: 480,
            fps: 30,
            format: PixelFormat::Rgb8,
        },
        StreamProfile {
            stream: StreamKind::Color,
            width: 1920,
            height: 1080,
            fps: 30,
            format: PixelFormat::Yuyv,
        },
    ];
    let infrared_modes = vec![StreamProfile {
        stream: StreamKind::Infrared,
        width: 640,
        height: 480,
        fps: 30,
        format: PixelFormat::Y8,
    }];

    let unit = |default| OptionRange {
        min: 0.0,
        max: 1.0,
        step: 1.0,
        default,
    };
    let depth_options = [
        (
            OptionId::LaserPower,
            OptionRange {
                min: 0.0,
                max: 16.0,
                step: 1.0,
                default: 10.0,
            },
        ),
        (OptionId::EmitterEnabled, unit(1.0)),
        (
            OptionId::ConfidenceThreshold,
            OptionRange {
                min: 0.0,
                max: 15.0,
                step: 1.0,
                default: 6.0,
            },
        ),
    ];
    let byte = |default| OptionRange {
        min: 0.0,
        max: 255.0,
        step: 1.0,
        default,
    };
    let color_options = [
        (OptionId::Brightness, byte(128.0)),
        (OptionId::Contrast, byte(64.0)),
        (
            OptionId::Exposure,
            OptionRange {
                min: 1.0,
                max: 10000.0,
                step: 1.0,
                default: 156.0,
            },
        ),
        (
            OptionId::WhiteBalance,
            OptionRange {
                min: 2000.0,
                max: 8000.0,
                step: 100.0,
                default: 4600.0,
            },
        ),
        (OptionId::EnableAutoExposure, unit(1.0)),
    ];
    let infrared_options = [(OptionId::Gain, byte(32.0))];

    let mut subdevices: [Option<MockSubdevice>; 4] = [None, None, None, None];
    subdevices[subdev_index(Subdev::Depth)] =
        Some(MockSubdevice::new(depth_modes, &depth_options));
    subdevices[subdev_index(Subdev::Color)] =
        Some(MockSubdevice::new(color_modes, &color_options));
    // The mock exposes infrared through the fisheye slot the way small form
    // factor devices do; motion stays unsupported to exercise that path.
    subdevices[subdev_index(Subdev::Fisheye)] =
        Some(MockSubdevice::new(infrared_modes, &infrared_options));

    DeviceHandle(Arc::new(DeviceInner {
        name: "Mock RealSense".to_string(),
        serial: "2481632641".to_string(),
        firmware: "1.0.71.06".to_string(),
        subdevices,
        depth_scale: 0.001,
    }))
}

fn subdev_index(sub: Subdev) -> usize {
    match sub {
        Subdev::Color => 0,
        Subdev::Depth => 1,
        Subdev::Fisheye => 2,
        Subdev::Motion => 3,
    }
}

// ============================================================================
// Streaming sessions
// ============================================================================

/// One open acquisition session. The registered callback adapter lives here
/// for the duration of streaming; replacing or stopping it fires the
/// adapter's release exactly once.
pub(crate) struct SessionHandle {
    subdev: Subdev,
    profiles: Vec<StreamProfile>,
    callback: Mutex<Option<Box<FrameCallback>>>,
    closing: AtomicBool,
}

pub(crate) fn open_session(
    device: &DeviceHandle,
    sub: Subdev,
    profiles: &[StreamProfile],
) -> Result<SessionHandle> {
    let function = if profiles.len() > 1 { "rs_open_many" } else { "rs_open" };
    let subdev = device.subdevice(sub, function)?;
    if profiles.is_empty() {
        return Err(Error::driver(
            function,
            format!("subdevice:{}", sub),
            "no stream profiles requested",
        ));
    }
    // All requested profiles must be valid together; reject the whole open
    // if any one is unsupported.
    for profile in profiles {
        if !subdev.modes.contains(profile) {
            return Err(Error::driver(
                function,
                format!("subdevice:{}, profile:{}", sub, profile),
                "unsupported stream profile",
            ));
        }
    }
    tracing::debug!(subdevice = %sub, profiles = profiles.len(), "opened mock streaming session");
    Ok(SessionHandle {
        subdev: sub,
        profiles: profiles.to_vec(),
        callback: Mutex::new(None),
        closing: AtomicBool::new(false),
    })
}

impl SessionHandle {
    pub(crate) fn start(&self, callback: Box<FrameCallback>) -> Result<()> {
        if self.closing.load(Ordering::SeqCst) {
            return Err(Error::driver(
                "rs_start",
                format!("subdevice:{}", self.subdev),
                "session is tearing down",
            ));
        }
        if let Some(previous) = self.callback.lock().replace(callback) {
            // The driver's contract: a new callback displaces the old one,
            // which is released at that point.
            previous.release();
        }
        Ok(())
    }

    pub(crate) fn stop(&self) -> Result<()> {
        if let Some(callback) = self.callback.lock().take() {
            callback.release();
        }
        Ok(())
    }

    pub(crate) fn profiles(&self) -> &[StreamProfile] {
        &self.profiles
    }

    /// Deliver one synthetic frame through the registered callback, on the
    /// calling thread, the way the driver's delivery thread would. Frames
    /// delivered while no callback is registered are released immediately.
    pub(crate) fn deliver(&self, frame: SyntheticFrame) {
        let handle = FrameHandle(Arc::new(frame.into_sample()));
        let mut guard = self.callback.lock();
        match guard.as_mut() {
            Some(callback) => callback.invoke(handle),
            None => drop(handle),
        }
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.closing.store(true, Ordering::SeqCst);
        if let Some(callback) = self.callback.lock().take() {
            callback.release();
        }
        tracing::debug!(subdevice = %self.subdev, "closed mock streaming session");
    }
}
