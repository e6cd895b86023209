//! Value types shared across the wrapper.
//!
//! These mirror the driver's public enums and plain-old-data structs. Each
//! enum carries an `as_str` used both for `Display` and for the stringified
//! argument context attached to driver errors.

use std::fmt;

/// Kind of data a stream carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    Depth,
    Color,
    Infrared,
    Fisheye,
    Motion,
}

impl StreamKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamKind::Depth => "depth",
            StreamKind::Color => "color",
            StreamKind::Infrared => "infrared",
            StreamKind::Fisheye => "fisheye",
            StreamKind::Motion => "motion",
        }
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pixel layout of frame data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// Let the driver pick a format.
    Any,
    /// 16-bit depth, one value per pixel.
    Z16,
    Yuyv,
    Rgb8,
    Bgr8,
    Rgba8,
    Bgra8,
    Y8,
    Y16,
    Raw10,
    /// Packed motion-module sample.
    MotionData,
}

impl PixelFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            PixelFormat::Any => "any",
            PixelFormat::Z16 => "z16",
            PixelFormat::Yuyv => "yuyv",
            PixelFormat::Rgb8 => "rgb8",
            PixelFormat::Bgr8 => "bgr8",
            PixelFormat::Rgba8 => "rgba8",
            PixelFormat::Bgra8 => "bgra8",
            PixelFormat::Y8 => "y8",
            PixelFormat::Y16 => "y16",
            PixelFormat::Raw10 => "raw10",
            PixelFormat::MotionData => "motion_data",
        }
    }

    /// Bits per pixel for this format, as the driver reports them.
    pub fn bits_per_pixel(&self) -> u32 {
        match self {
            PixelFormat::Any => 0,
            PixelFormat::Z16 | PixelFormat::Y16 | PixelFormat::Yuyv => 16,
            PixelFormat::Rgb8 | PixelFormat::Bgr8 => 24,
            PixelFormat::Rgba8 | PixelFormat::Bgra8 => 32,
            PixelFormat::Y8 => 8,
            PixelFormat::Raw10 => 10,
            PixelFormat::MotionData => 8,
        }
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One capture mode: stream kind, resolution, rate, and pixel format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamProfile {
    pub stream: StreamKind,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub format: PixelFormat,
}

impl fmt::Display for StreamProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}x{}@{}fps {}",
            self.stream, self.width, self.height, self.fps, self.format
        )
    }
}

/// Independently configurable sensor exposed by a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subdev {
    Color,
    Depth,
    Fisheye,
    Motion,
}

impl Subdev {
    /// All subdevice slots, in driver index order.
    pub const ALL: [Subdev; 4] = [Subdev::Color, Subdev::Depth, Subdev::Fisheye, Subdev::Motion];

    pub fn as_str(&self) -> &'static str {
        match self {
            Subdev::Color => "color",
            Subdev::Depth => "depth",
            Subdev::Fisheye => "fisheye",
            Subdev::Motion => "motion",
        }
    }
}

impl fmt::Display for Subdev {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static camera information fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CameraInfo {
    DeviceName,
    SerialNumber,
    FirmwareVersion,
    PhysicalPort,
}

impl CameraInfo {
    pub fn as_str(&self) -> &'static str {
        match self {
            CameraInfo::DeviceName => "device_name",
            CameraInfo::SerialNumber => "serial_number",
            CameraInfo::FirmwareVersion => "firmware_version",
            CameraInfo::PhysicalPort => "physical_port",
        }
    }
}

impl fmt::Display for CameraInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-subdevice tunable options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionId {
    BacklightCompensation,
    Brightness,
    Contrast,
    Exposure,
    Gain,
    Gamma,
    Hue,
    Saturation,
    Sharpness,
    WhiteBalance,
    EnableAutoExposure,
    EnableAutoWhiteBalance,
    LaserPower,
    EmitterEnabled,
    ConfidenceThreshold,
    MotionRange,
}

impl OptionId {
    pub fn as_str(&self) -> &'static str {
        match self {
            OptionId::BacklightCompensation => "backlight_compensation",
            OptionId::Brightness => "brightness",
            OptionId::Contrast => "contrast",
            OptionId::Exposure => "exposure",
            OptionId::Gain => "gain",
            OptionId::Gamma => "gamma",
            OptionId::Hue => "hue",
            OptionId::Saturation => "saturation",
            OptionId::Sharpness => "sharpness",
            OptionId::WhiteBalance => "white_balance",
            OptionId::EnableAutoExposure => "enable_auto_exposure",
            OptionId::EnableAutoWhiteBalance => "enable_auto_white_balance",
            OptionId::LaserPower => "laser_power",
            OptionId::EmitterEnabled => "emitter_enabled",
            OptionId::ConfidenceThreshold => "confidence_threshold",
            OptionId::MotionRange => "motion_range",
        }
    }
}

impl fmt::Display for OptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Valid range and default for one option.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OptionRange {
    pub min: f32,
    pub max: f32,
    pub step: f32,
    pub default: f32,
}

/// Per-frame metadata kinds. Not every kind is available on every frame;
/// check [`crate::Frame::supports_metadata`] first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameMetadata {
    ActualExposure,
    ActualFps,
    GainLevel,
    WhiteBalance,
    TimeOfArrival,
}

impl FrameMetadata {
    pub fn as_str(&self) -> &'static str {
        match self {
            FrameMetadata::ActualExposure => "actual_exposure",
            FrameMetadata::ActualFps => "actual_fps",
            FrameMetadata::GainLevel => "gain_level",
            FrameMetadata::WhiteBalance => "white_balance",
            FrameMetadata::TimeOfArrival => "time_of_arrival",
        }
    }
}

impl fmt::Display for FrameMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Clock a frame timestamp was taken against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimestampDomain {
    /// The camera's own hardware clock.
    HardwareClock,
    /// The host's system clock, stamped on arrival.
    SystemTime,
}

impl TimestampDomain {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimestampDomain::HardwareClock => "hardware_clock",
            TimestampDomain::SystemTime => "system_time",
        }
    }
}

impl fmt::Display for TimestampDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lens distortion model used by [`Intrinsics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Distortion {
    None,
    ModifiedBrownConrady,
    InverseBrownConrady,
    Ftheta,
}

impl Distortion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Distortion::None => "none",
            Distortion::ModifiedBrownConrady => "modified_brown_conrady",
            Distortion::InverseBrownConrady => "inverse_brown_conrady",
            Distortion::Ftheta => "ftheta",
        }
    }
}

impl fmt::Display for Distortion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Projection parameters of one stream profile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intrinsics {
    pub width: u32,
    pub height: u32,
    /// Principal point, pixels.
    pub ppx: f32,
    pub ppy: f32,
    /// Focal length, pixels.
    pub fx: f32,
    pub fy: f32,
    pub model: Distortion,
    pub coeffs: [f32; 5],
}

/// Rigid transform between two subdevice coordinate frames.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extrinsics {
    /// Column-major 3x3 rotation matrix.
    pub rotation: [f32; 9],
    /// Translation vector, meters.
    pub translation: [f32; 3],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_display_is_readable() {
        let p = StreamProfile {
            stream: StreamKind::Depth,
            width: 640,
            height: 480,
            fps: 30,
            format: PixelFormat::Z16,
        };
        assert_eq!(p.to_string(), "depth 640x480@30fps z16");
    }

    #[test]
    fn format_bit_depths() {
        assert_eq!(PixelFormat::Z16.bits_per_pixel(), 16);
        assert_eq!(PixelFormat::Rgb8.bits_per_pixel(), 24);
        assert_eq!(PixelFormat::Y8.bits_per_pixel(), 8);
    }
}
