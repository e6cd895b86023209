//! librealsense FFI backend.
//!
//! Every fallible C call takes an out-of-band `rs_error` slot. [`check`]
//! translates a non-null slot into [`Error::Driver`] -- message, failed
//! function, stringified args -- and frees the error object exactly once,
//! before any derived computation on the (possibly garbage) return value.

use std::ffi::{c_char, c_void, CStr};
use std::ptr::{self, NonNull};

use parking_lot::Mutex;

use realsense_sys::*;

use crate::callback::FrameCallback;
use crate::error::{Error, Result};
use crate::types::{
    CameraInfo, Distortion, Extrinsics, FrameMetadata, Intrinsics, OptionId, OptionRange,
    PixelFormat, StreamKind, StreamProfile, Subdev, TimestampDomain,
};

/// Translate a driver error slot into `Error::Driver`, freeing the slot.
fn check(err: *mut rs_error) -> Result<()> {
    if err.is_null() {
        return Ok(());
    }
    unsafe {
        // SAFETY: err is a non-null rs_error produced by the call just made;
        // the accessor functions accept it and rs_free_error releases it once.
        let message = cstr_to_string(rs_get_error_message(err));
        let function = cstr_to_string(rs_get_failed_function(err));
        let args = cstr_to_string(rs_get_failed_args(err));
        rs_free_error(err);
        Err(Error::driver(function, args, message))
    }
}

unsafe fn cstr_to_string(ptr: *const c_char) -> String {
    if ptr.is_null() {
        return String::new();
    }
    // SAFETY: caller guarantees ptr is a valid NUL-terminated C string.
    CStr::from_ptr(ptr).to_string_lossy().into_owned()
}

// ============================================================================
// Enum conversions
// ============================================================================

fn to_rs_stream(s: StreamKind) -> rs_stream {
    match s {
        StreamKind::Depth => rs_stream::RS_STREAM_DEPTH,
        StreamKind::Color => rs_stream::RS_STREAM_COLOR,
        StreamKind::Infrared => rs_stream::RS_STREAM_INFRARED,
        StreamKind::Fisheye => rs_stream::RS_STREAM_FISHEYE,
        StreamKind::Motion => rs_stream::RS_STREAM_MOTION,
    }
}

fn from_rs_stream(s: rs_stream) -> Result<StreamKind> {
    match s {
        rs_stream::RS_STREAM_DEPTH => Ok(StreamKind::Depth),
        rs_stream::RS_STREAM_COLOR => Ok(StreamKind::Color),
        rs_stream::RS_STREAM_INFRARED => Ok(StreamKind::Infrared),
        rs_stream::RS_STREAM_FISHEYE => Ok(StreamKind::Fisheye),
        rs_stream::RS_STREAM_MOTION => Ok(StreamKind::Motion),
        other => Err(Error::driver(
            "rs_stream",
            format!("{other:?}"),
            "unrecognized stream kind reported by driver",
        )),
    }
}

fn to_rs_format(f: PixelFormat) -> rs_format {
    match f {
        PixelFormat::Any => rs_format::RS_FORMAT_ANY,
        PixelFormat::Z16 => rs_format::RS_FORMAT_Z16,
        PixelFormat::Yuyv => rs_format::RS_FORMAT_YUYV,
        PixelFormat::Rgb8 => rs_format::RS_FORMAT_RGB8,
        PixelFormat::Bgr8 => rs_format::RS_FORMAT_BGR8,
        PixelFormat::Rgba8 => rs_format::RS_FORMAT_RGBA8,
        PixelFormat::Bgra8 => rs_format::RS_FORMAT_BGRA8,
        PixelFormat::Y8 => rs_format::RS_FORMAT_Y8,
        PixelFormat::Y16 => rs_format::RS_FORMAT_Y16,
        PixelFormat::Raw10 => rs_format::RS_FORMAT_RAW10,
        PixelFormat::MotionData => rs_format::RS_FORMAT_MOTION_DATA,
    }
}

fn from_rs_format(f: rs_format) -> Result<PixelFormat> {
    match f {
        rs_format::RS_FORMAT_ANY => Ok(PixelFormat::Any),
        rs_format::RS_FORMAT_Z16 => Ok(PixelFormat::Z16),
        rs_format::RS_FORMAT_YUYV => Ok(PixelFormat::Yuyv),
        rs_format::RS_FORMAT_RGB8 => Ok(PixelFormat::Rgb8),
        rs_format::RS_FORMAT_BGR8 => Ok(PixelFormat::Bgr8),
        rs_format::RS_FORMAT_RGBA8 => Ok(PixelFormat::Rgba8),
        rs_format::RS_FORMAT_BGRA8 => Ok(PixelFormat::Bgra8),
        rs_format::RS_FORMAT_Y8 => Ok(PixelFormat::Y8),
        rs_format::RS_FORMAT_Y16 => Ok(PixelFormat::Y16),
        rs_format::RS_FORMAT_RAW10 => Ok(PixelFormat::Raw10),
        rs_format::RS_FORMAT_MOTION_DATA => Ok(PixelFormat::MotionData),
        other => Err(Error::driver(
            "rs_format",
            format!("{other:?}"),
            "unrecognized pixel format reported by driver",
        )),
    }
}

fn to_rs_subdevice(s: Subdev) -> rs_subdevice {
    match s {
        Subdev::Color => rs_subdevice::RS_SUBDEVICE_COLOR,
        Subdev::Depth => rs_subdevice::RS_SUBDEVICE_DEPTH,
        Subdev::Fisheye => rs_subdevice::RS_SUBDEVICE_FISHEYE,
        Subdev::Motion => rs_subdevice::RS_SUBDEVICE_MOTION,
    }
}

fn to_rs_option(o: OptionId) -> rs_option {
    match o {
        OptionId::BacklightCompensation => rs_option::RS_OPTION_COLOR_BACKLIGHT_COMPENSATION,
        OptionId::Brightness => rs_option::RS_OPTION_COLOR_BRIGHTNESS,
        OptionId::Contrast => rs_option::RS_OPTION_COLOR_CONTRAST,
        OptionId::Exposure => rs_option::RS_OPTION_COLOR_EXPOSURE,
        OptionId::Gain => rs_option::RS_OPTION_COLOR_GAIN,
        OptionId::Gamma => rs_option::RS_OPTION_COLOR_GAMMA,
        OptionId::Hue => rs_option::RS_OPTION_COLOR_HUE,
        OptionId::Saturation => rs_option::RS_OPTION_COLOR_SATURATION,
        OptionId::Sharpness => rs_option::RS_OPTION_COLOR_SHARPNESS,
        OptionId::WhiteBalance => rs_option::RS_OPTION_COLOR_WHITE_BALANCE,
        OptionId::EnableAutoExposure => rs_option::RS_OPTION_COLOR_ENABLE_AUTO_EXPOSURE,
        OptionId::EnableAutoWhiteBalance => {
            rs_option::RS_OPTION_COLOR_ENABLE_AUTO_WHITE_BALANCE
        }
        OptionId::LaserPower => rs_option::RS_OPTION_F200_LASER_POWER,
        OptionId::EmitterEnabled => rs_option::RS_OPTION_R200_EMITTER_ENABLED,
        OptionId::ConfidenceThreshold => rs_option::RS_OPTION_F200_CONFIDENCE_THRESHOLD,
        OptionId::MotionRange => rs_option::RS_OPTION_F200_MOTION_RANGE,
    }
}

fn to_rs_camera_info(i: CameraInfo) -> rs_camera_info {
    match i {
        CameraInfo::DeviceName => rs_camera_info::RS_CAMERA_INFO_DEVICE_NAME,
        CameraInfo::SerialNumber => rs_camera_info::RS_CAMERA_INFO_DEVICE_SERIAL_NUMBER,
        CameraInfo::FirmwareVersion => rs_camera_info::RS_CAMERA_INFO_CAMERA_FIRMWARE_VERSION,
        CameraInfo::PhysicalPort => rs_camera_info::RS_CAMERA_INFO_DEVICE_LOCATION,
    }
}

fn to_rs_metadata(m: FrameMetadata) -> rs_frame_metadata {
    match m {
        FrameMetadata::ActualExposure => rs_frame_metadata::RS_FRAME_METADATA_ACTUAL_EXPOSURE,
        FrameMetadata::ActualFps => rs_frame_metadata::RS_FRAME_METADATA_ACTUAL_FPS,
        FrameMetadata::GainLevel => rs_frame_metadata::RS_FRAME_METADATA_GAIN_LEVEL,
        FrameMetadata::WhiteBalance => rs_frame_metadata::RS_FRAME_METADATA_WHITE_BALANCE,
        FrameMetadata::TimeOfArrival => rs_frame_metadata::RS_FRAME_METADATA_TIME_OF_ARRIVAL,
    }
}

fn from_rs_timestamp_domain(d: rs_timestamp_domain) -> TimestampDomain {
    match d {
        rs_timestamp_domain::RS_TIMESTAMP_DOMAIN_CAMERA => TimestampDomain::HardwareClock,
        _ => TimestampDomain::SystemTime,
    }
}

fn from_rs_distortion(d: rs_distortion) -> Distortion {
    match d {
        rs_distortion::RS_DISTORTION_MODIFIED_BROWN_CONRADY => Distortion::ModifiedBrownConrady,
        rs_distortion::RS_DISTORTION_INVERSE_BROWN_CONRADY => Distortion::InverseBrownConrady,
        rs_distortion::RS_DISTORTION_FTHETA => Distortion::Ftheta,
        _ => Distortion::None,
    }
}

// ============================================================================
// Frames
// ============================================================================

/// Exclusively-owned reference to one driver frame. Dropping releases the
/// driver-side refcount once.
#[derive(Debug)]
pub(crate) struct FrameHandle(NonNull<rs_frame>);

// SAFETY: the driver documents frame handles as freely movable between
// threads; each handle is an independent refcount owner.
unsafe impl Send for FrameHandle {}
unsafe impl Sync for FrameHandle {}

impl FrameHandle {
    pub(crate) fn timestamp(&self) -> Result<f64> {
        let mut e = ptr::null_mut();
        // SAFETY: handle is non-null and owned; e is a valid out slot.
        let r = unsafe { rs_get_frame_timestamp(self.0.as_ptr(), &mut e) };
        check(e)?;
        Ok(r)
    }

    pub(crate) fn timestamp_domain(&self) -> Result<TimestampDomain> {
        let mut e = ptr::null_mut();
        // SAFETY: as above.
        let r = unsafe { rs_get_frame_timestamp_domain(self.0.as_ptr(), &mut e) };
        check(e)?;
        Ok(from_rs_timestamp_domain(r))
    }

    pub(crate) fn metadata(&self, kind: FrameMetadata) -> Result<f64> {
        let mut e = ptr::null_mut();
        // SAFETY: as above.
        let r = unsafe { rs_get_frame_metadata(self.0.as_ptr(), to_rs_metadata(kind), &mut e) };
        check(e)?;
        Ok(r)
    }

    pub(crate) fn supports_metadata(&self, kind: FrameMetadata) -> Result<bool> {
        let mut e = ptr::null_mut();
        // SAFETY: as above.
        let r =
            unsafe { rs_supports_frame_metadata(self.0.as_ptr(), to_rs_metadata(kind), &mut e) };
        check(e)?;
        Ok(r != 0)
    }

    pub(crate) fn number(&self) -> Result<u64> {
        let mut e = ptr::null_mut();
        // SAFETY: as above.
        let r = unsafe { rs_get_frame_number(self.0.as_ptr(), &mut e) };
        check(e)?;
        Ok(r)
    }

    pub(crate) fn data(&self) -> Result<&[u8]> {
        let len = (self.stride_in_bytes()? * self.height()?) as usize;
        let mut e = ptr::null_mut();
        // SAFETY: as above; the returned pointer stays valid while this
        // handle holds its frame reference.
        let ptr = unsafe { rs_get_frame_data(self.0.as_ptr(), &mut e) };
        check(e)?;
        if ptr.is_null() {
            return Err(Error::driver(
                "rs_get_frame_data",
                "frame",
                "driver returned null frame data",
            ));
        }
        // SAFETY: ptr is non-null and addresses stride*height readable bytes.
        Ok(unsafe { std::slice::from_raw_parts(ptr as *const u8, len) })
    }

    pub(crate) fn width(&self) -> Result<u32> {
        let mut e = ptr::null_mut();
        // SAFETY: as above.
        let r = unsafe { rs_get_frame_width(self.0.as_ptr(), &mut e) };
        check(e)?;
        Ok(r as u32)
    }

    pub(crate) fn height(&self) -> Result<u32> {
        let mut e = ptr::null_mut();
        // SAFETY: as above.
        let r = unsafe { rs_get_frame_height(self.0.as_ptr(), &mut e) };
        check(e)?;
        Ok(r as u32)
    }

    pub(crate) fn stride_in_bytes(&self) -> Result<u32> {
        let mut e = ptr::null_mut();
        // SAFETY: as above.
        let r = unsafe { rs_get_frame_stride_in_bytes(self.0.as_ptr(), &mut e) };
        check(e)?;
        Ok(r as u32)
    }

    pub(crate) fn bits_per_pixel(&self) -> Result<u32> {
        let mut e = ptr::null_mut();
        // SAFETY: as above.
        let r = unsafe { rs_get_frame_bits_per_pixel(self.0.as_ptr(), &mut e) };
        check(e)?;
        Ok(r as u32)
    }

    pub(crate) fn format(&self) -> Result<PixelFormat> {
        let mut e = ptr::null_mut();
        // SAFETY: as above.
        let r = unsafe { rs_get_frame_format(self.0.as_ptr(), &mut e) };
        check(e)?;
        from_rs_format(r)
    }

    pub(crate) fn stream_kind(&self) -> Result<StreamKind> {
        let mut e = ptr::null_mut();
        // SAFETY: as above.
        let r = unsafe { rs_get_frame_stream_type(self.0.as_ptr(), &mut e) };
        check(e)?;
        from_rs_stream(r)
    }

    pub(crate) fn try_clone(&self) -> Result<Option<FrameHandle>> {
        let mut e = ptr::null_mut();
        // SAFETY: as above; a non-null result is a new refcount we own.
        let r = unsafe { rs_clone_frame_ref(self.0.as_ptr(), &mut e) };
        check(e)?;
        Ok(NonNull::new(r).map(FrameHandle))
    }
}

impl Drop for FrameHandle {
    fn drop(&mut self) {
        // SAFETY: this handle owns exactly one frame reference; releasing it
        // here is the single release for that reference.
        unsafe { rs_release_frame(self.0.as_ptr()) };
    }
}

// ============================================================================
// Context and devices
// ============================================================================

pub(crate) struct ContextHandle(NonNull<rs_context>);

// SAFETY: the context handle is only read after creation; the driver allows
// cross-thread use of its opaque handles.
unsafe impl Send for ContextHandle {}
unsafe impl Sync for ContextHandle {}

pub(crate) fn create_context() -> Result<ContextHandle> {
    let mut e = ptr::null_mut();
    // SAFETY: e is a valid out slot; the version constant comes from rs.h.
    let ctx = unsafe { rs_create_context(RS_API_VERSION as i32, &mut e) };
    check(e)?;
    NonNull::new(ctx)
        .map(ContextHandle)
        .ok_or_else(|| Error::driver("rs_create_context", "", "driver returned null context"))
}

impl Drop for ContextHandle {
    fn drop(&mut self) {
        // SAFETY: context was created by rs_create_context and not freed yet.
        unsafe { rs_delete_context(self.0.as_ptr()) };
    }
}

struct DeviceInner(NonNull<rs_device>);

impl Drop for DeviceInner {
    fn drop(&mut self) {
        // SAFETY: device was created by rs_create_device and not freed yet.
        unsafe { rs_delete_device(self.0.as_ptr()) };
    }
}

/// Shared handle to one device; `Device` and every `Subdevice` carved from
/// it hold clones, and the last one to drop deletes the device object.
#[derive(Clone)]
pub(crate) struct DeviceHandle(std::sync::Arc<DeviceInner>);

// SAFETY: device handles may be used from any thread per driver docs; the
// Arc serializes deletion to the last owner.
unsafe impl Send for DeviceHandle {}
unsafe impl Sync for DeviceHandle {}

pub(crate) fn query_devices(ctx: &ContextHandle) -> Result<Vec<DeviceHandle>> {
    let mut e = ptr::null_mut();
    // SAFETY: ctx is a live context; e is a valid out slot.
    let list = unsafe { rs_query_devices(ctx.0.as_ptr(), &mut e) };
    check(e)?;

    let mut e = ptr::null_mut();
    // SAFETY: list came from rs_query_devices above.
    let count = unsafe { rs_get_device_count(list, &mut e) };
    if let Err(err) = check(e) {
        // SAFETY: list is still owned here.
        unsafe { rs_delete_device_list(list) };
        return Err(err);
    }

    let mut devices = Vec::with_capacity(count.max(0) as usize);
    for i in 0..count {
        let mut e = ptr::null_mut();
        // SAFETY: i is within the list's count.
        let dev = unsafe { rs_create_device(list, i, &mut e) };
        let checked = check(e).and_then(|_| {
            NonNull::new(dev)
                .ok_or_else(|| Error::driver("rs_create_device", format!("index:{i}"), "null device"))
        });
        match checked {
            Ok(ptr) => devices.push(DeviceHandle(std::sync::Arc::new(DeviceInner(ptr)))),
            Err(err) => {
                // SAFETY: list is still owned here.
                unsafe { rs_delete_device_list(list) };
                return Err(err);
            }
        }
    }
    // SAFETY: the device list is no longer needed once devices are created.
    unsafe { rs_delete_device_list(list) };
    Ok(devices)
}

impl DeviceHandle {
    fn dev(&self) -> *mut rs_device {
        self.0 .0.as_ptr()
    }

    pub(crate) fn supports_subdevice(&self, sub: Subdev) -> Result<bool> {
        let mut e = ptr::null_mut();
        // SAFETY: dev is live; e is a valid out slot.
        let r = unsafe { rs_is_subdevice_supported(self.dev(), to_rs_subdevice(sub), &mut e) };
        check(e)?;
        Ok(r != 0)
    }

    pub(crate) fn supports_camera_info(&self, info: CameraInfo) -> Result<bool> {
        let mut e = ptr::null_mut();
        // SAFETY: as above.
        let r = unsafe { rs_supports_camera_info(self.dev(), to_rs_camera_info(info), &mut e) };
        check(e)?;
        Ok(r != 0)
    }

    pub(crate) fn camera_info(&self, info: CameraInfo) -> Result<String> {
        let mut e = ptr::null_mut();
        // SAFETY: as above; the returned string is driver-owned.
        let r = unsafe { rs_get_camera_info(self.dev(), to_rs_camera_info(info), &mut e) };
        check(e)?;
        // SAFETY: non-error return is a valid C string.
        Ok(unsafe { cstr_to_string(r) })
    }

    pub(crate) fn extrinsics(&self, from: Subdev, to: Subdev) -> Result<Extrinsics> {
        let mut e = ptr::null_mut();
        let mut raw = rs_extrinsics {
            rotation: [0.0; 9],
            translation: [0.0; 3],
        };
        // SAFETY: raw is a valid out struct; e is a valid out slot.
        unsafe {
            rs_get_device_extrinsics(
                self.dev(),
                to_rs_subdevice(from),
                to_rs_subdevice(to),
                &mut raw,
                &mut e,
            )
        };
        check(e)?;
        Ok(Extrinsics {
            rotation: raw.rotation,
            translation: raw.translation,
        })
    }

    pub(crate) fn intrinsics(&self, sub: Subdev, profile: &StreamProfile) -> Result<Intrinsics> {
        let mut e = ptr::null_mut();
        let mut raw: rs_intrinsics = unsafe { std::mem::zeroed() };
        // SAFETY: raw is POD, zeroed then filled by the driver; e is valid.
        unsafe {
            rs_get_stream_intrinsics(
                self.dev(),
                to_rs_subdevice(sub),
                to_rs_stream(profile.stream),
                profile.width as i32,
                profile.height as i32,
                profile.fps as i32,
                to_rs_format(profile.format),
                &mut raw,
                &mut e,
            )
        };
        check(e)?;
        Ok(Intrinsics {
            width: raw.width as u32,
            height: raw.height as u32,
            ppx: raw.ppx,
            ppy: raw.ppy,
            fx: raw.fx,
            fy: raw.fy,
            model: from_rs_distortion(raw.model),
            coeffs: raw.coeffs,
        })
    }

    pub(crate) fn depth_scale(&self) -> Result<f32> {
        let mut e = ptr::null_mut();
        // SAFETY: as above.
        let r = unsafe { rs_get_device_depth_scale(self.dev(), &mut e) };
        check(e)?;
        Ok(r)
    }

    pub(crate) fn stream_modes(&self, sub: Subdev) -> Result<Vec<StreamProfile>> {
        let mut e = ptr::null_mut();
        // SAFETY: as above; the returned list is owned until deleted below.
        let list = unsafe { rs_get_stream_modes(self.dev(), to_rs_subdevice(sub), &mut e) };
        check(e)?;

        let result = (|| {
            let mut e = ptr::null_mut();
            // SAFETY: list came from rs_get_stream_modes above.
            let count = unsafe { rs_get_modes_count(list, &mut e) };
            check(e)?;

            let mut modes = Vec::with_capacity(count.max(0) as usize);
            for i in 0..count {
                let mut e = ptr::null_mut();
                let mut stream = rs_stream::RS_STREAM_DEPTH;
                let mut format = rs_format::RS_FORMAT_ANY;
                let (mut width, mut height, mut fps) = (0i32, 0i32, 0i32);
                // SAFETY: all outputs are valid out pointers; i is in range.
                unsafe {
                    rs_get_stream_mode(
                        list, i, &mut stream, &mut width, &mut height, &mut fps, &mut format,
                        &mut e,
                    )
                };
                check(e)?;
                modes.push(StreamProfile {
                    stream: from_rs_stream(stream)?,
                    width: width as u32,
                    height: height as u32,
                    fps: fps as u32,
                    format: from_rs_format(format)?,
                });
            }
            Ok(modes)
        })();
        // SAFETY: the modes list is deleted exactly once, on every path.
        unsafe { rs_delete_modes_list(list) };
        result
    }

    pub(crate) fn supports_option(&self, sub: Subdev, option: OptionId) -> Result<bool> {
        let mut e = ptr::null_mut();
        // SAFETY: as above.
        let r = unsafe {
            rs_supports_subdevice_option(self.dev(), to_rs_subdevice(sub), to_rs_option(option), &mut e)
        };
        check(e)?;
        Ok(r > 0)
    }

    pub(crate) fn get_option(&self, sub: Subdev, option: OptionId) -> Result<f32> {
        let mut e = ptr::null_mut();
        // SAFETY: as above.
        let r = unsafe {
            rs_get_subdevice_option(self.dev(), to_rs_subdevice(sub), to_rs_option(option), &mut e)
        };
        check(e)?;
        Ok(r)
    }

    pub(crate) fn set_option(&self, sub: Subdev, option: OptionId, value: f32) -> Result<()> {
        let mut e = ptr::null_mut();
        // SAFETY: as above.
        unsafe {
            rs_set_subdevice_option(
                self.dev(),
                to_rs_subdevice(sub),
                to_rs_option(option),
                value,
                &mut e,
            )
        };
        check(e)
    }

    pub(crate) fn option_range(&self, sub: Subdev, option: OptionId) -> Result<OptionRange> {
        let mut e = ptr::null_mut();
        let (mut min, mut max, mut step, mut default) = (0.0f32, 0.0f32, 0.0f32, 0.0f32);
        // SAFETY: all range fields are valid out pointers.
        unsafe {
            rs_get_subdevice_option_range(
                self.dev(),
                to_rs_subdevice(sub),
                to_rs_option(option),
                &mut min,
                &mut max,
                &mut step,
                &mut default,
                &mut e,
            )
        };
        check(e)?;
        Ok(OptionRange {
            min,
            max,
            step,
            default,
        })
    }

    pub(crate) fn option_description(&self, sub: Subdev, option: OptionId) -> Result<String> {
        let mut e = ptr::null_mut();
        // SAFETY: as above; the returned string is driver-owned.
        let r = unsafe {
            rs_get_subdevice_option_description(
                self.dev(),
                to_rs_subdevice(sub),
                to_rs_option(option),
                &mut e,
            )
        };
        check(e)?;
        // SAFETY: non-error return is a valid C string.
        Ok(unsafe { cstr_to_string(r) })
    }

    pub(crate) fn option_value_description(
        &self,
        sub: Subdev,
        option: OptionId,
        value: f32,
    ) -> Result<String> {
        let mut e = ptr::null_mut();
        // SAFETY: as above.
        let r = unsafe {
            rs_get_subdevice_option_value_description(
                self.dev(),
                to_rs_subdevice(sub),
                to_rs_option(option),
                value,
                &mut e,
            )
        };
        check(e)?;
        // SAFETY: non-error return is a valid C string (or null).
        Ok(unsafe { cstr_to_string(r) })
    }
}

// ============================================================================
// Streaming sessions
// ============================================================================

/// One open acquisition session. The registered callback adapter is kept as
/// a raw box behind a stable address; the driver trampoline borrows it for
/// each delivery, and the wrapper reclaims and releases it exactly once on
/// stop, replace, or teardown.
pub(crate) struct SessionHandle {
    lock: NonNull<rs_streaming_lock>,
    subdev: Subdev,
    profiles: Vec<StreamProfile>,
    callback: Mutex<Option<NonNull<FrameCallback>>>,
}

// SAFETY: the streaming lock is documented thread-safe; callback pointer
// handoff is serialized by the mutex.
unsafe impl Send for SessionHandle {}
unsafe impl Sync for SessionHandle {}

unsafe extern "C" fn on_frame_trampoline(frame: *mut rs_frame, user: *mut c_void) {
    // SAFETY: user is the FrameCallback box registered with rs_start; the
    // driver guarantees no further invocations after rs_stop returns.
    let callback = unsafe { &mut *(user as *mut FrameCallback) };
    if let Some(handle) = NonNull::new(frame) {
        callback.invoke(FrameHandle(handle));
    }
}

pub(crate) fn open_session(
    device: &DeviceHandle,
    sub: Subdev,
    profiles: &[StreamProfile],
) -> Result<SessionHandle> {
    if profiles.is_empty() {
        return Err(Error::driver(
            "rs_open",
            format!("subdevice:{sub}"),
            "no stream profiles requested",
        ));
    }
    let mut e = ptr::null_mut();
    let lock = if profiles.len() == 1 {
        let p = &profiles[0];
        // SAFETY: device is live; e is a valid out slot.
        unsafe {
            rs_open(
                device.dev(),
                to_rs_subdevice(sub),
                to_rs_stream(p.stream),
                p.width as i32,
                p.height as i32,
                p.fps as i32,
                to_rs_format(p.format),
                &mut e,
            )
        }
    } else {
        let streams: Vec<rs_stream> = profiles.iter().map(|p| to_rs_stream(p.stream)).collect();
        let widths: Vec<i32> = profiles.iter().map(|p| p.width as i32).collect();
        let heights: Vec<i32> = profiles.iter().map(|p| p.height as i32).collect();
        let fpss: Vec<i32> = profiles.iter().map(|p| p.fps as i32).collect();
        let formats: Vec<rs_format> = profiles.iter().map(|p| to_rs_format(p.format)).collect();
        // SAFETY: all arrays have profiles.len() elements and outlive the call.
        unsafe {
            rs_open_many(
                device.dev(),
                to_rs_subdevice(sub),
                streams.as_ptr(),
                widths.as_ptr(),
                heights.as_ptr(),
                fpss.as_ptr(),
                formats.as_ptr(),
                profiles.len() as i32,
                &mut e,
            )
        }
    };
    check(e)?;
    let lock = NonNull::new(lock)
        .ok_or_else(|| Error::driver("rs_open", format!("subdevice:{sub}"), "null session"))?;
    tracing::debug!(subdevice = %sub, profiles = profiles.len(), "opened streaming session");
    Ok(SessionHandle {
        lock,
        subdev: sub,
        profiles: profiles.to_vec(),
        callback: Mutex::new(None),
    })
}

impl SessionHandle {
    pub(crate) fn start(&self, callback: Box<FrameCallback>) -> Result<()> {
        let mut guard = self.callback.lock();
        let raw = Box::into_raw(callback);
        let mut e = ptr::null_mut();
        // SAFETY: raw stays valid until reclaimed on stop/replace/drop; the
        // trampoline matches the driver's expected signature.
        unsafe {
            rs_start(
                self.lock.as_ptr(),
                Some(on_frame_trampoline),
                raw as *mut c_void,
                &mut e,
            )
        };
        if let Err(err) = check(e) {
            // SAFETY: the driver rejected the registration, so the box was
            // never shared; reclaim and release it here.
            FrameCallback::release(unsafe { Box::from_raw(raw) });
            return Err(err);
        }
        // A successful start displaces any prior callback; the driver no
        // longer invokes it, so its release fires now.
        if let Some(previous) = guard.replace(NonNull::new(raw).ok_or_else(|| {
            Error::driver("rs_start", format!("subdevice:{}", self.subdev), "null callback")
        })?) {
            // SAFETY: previous was leaked by an earlier start on this session.
            FrameCallback::release(unsafe { Box::from_raw(previous.as_ptr()) });
        }
        Ok(())
    }

    pub(crate) fn stop(&self) -> Result<()> {
        let mut guard = self.callback.lock();
        let mut e = ptr::null_mut();
        // SAFETY: lock is live; rs_stop blocks until deliveries quiesce.
        unsafe { rs_stop(self.lock.as_ptr(), &mut e) };
        check(e)?;
        if let Some(previous) = guard.take() {
            // SAFETY: no further driver invocations after rs_stop returned.
            FrameCallback::release(unsafe { Box::from_raw(previous.as_ptr()) });
        }
        Ok(())
    }

    pub(crate) fn profiles(&self) -> &[StreamProfile] {
        &self.profiles
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        if self.callback.lock().is_some() {
            if let Err(err) = self.stop() {
                tracing::warn!(subdevice = %self.subdev, error = %err, "stop during session teardown failed");
            }
        }
        // SAFETY: lock was returned by rs_open/rs_open_many; closing here is
        // the single close for this session.
        unsafe { rs_close(self.lock.as_ptr()) };
        tracing::debug!(subdevice = %self.subdev, "closed streaming session");
    }
}
