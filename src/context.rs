//! Device discovery and per-device access.
//!
//! A [`Context`] owns the driver session and enumerates connected devices.
//! A [`Device`] answers identity and calibration queries and hands out
//! [`Subdevice`] views, which carry the per-sensor surface: stream modes,
//! options, and `open`.

use std::sync::Arc;

use crate::backend::{self, ContextHandle, DeviceHandle};
use crate::channel::StreamChannel;
use crate::error::{Error, Result};
use crate::types::{
    CameraInfo, Extrinsics, Intrinsics, OptionId, OptionRange, StreamProfile, Subdev,
};

/// Owns the driver context; devices are queried through it.
pub struct Context {
    handle: Arc<ContextHandle>,
}

impl Context {
    pub fn new() -> Result<Self> {
        Ok(Context {
            handle: Arc::new(backend::create_context()?),
        })
    }

    /// Enumerate currently connected devices.
    pub fn query_devices(&self) -> Result<Vec<Device>> {
        let devices = backend::query_devices(&self.handle)?;
        tracing::debug!(count = devices.len(), "enumerated devices");
        Ok(devices.into_iter().map(|handle| Device { handle }).collect())
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context").finish_non_exhaustive()
    }
}

/// One connected camera. Cloning shares the underlying device handle.
#[derive(Clone)]
pub struct Device {
    handle: DeviceHandle,
}

impl Device {
    /// Whether this device exposes the given subdevice slot.
    pub fn supports(&self, sub: Subdev) -> Result<bool> {
        self.handle.supports_subdevice(sub)
    }

    /// Access one subdevice. Errors with [`Error::Misuse`] if the device
    /// does not expose that slot; check [`Device::supports`] first.
    pub fn subdevice(&self, sub: Subdev) -> Result<Subdevice> {
        if !self.handle.supports_subdevice(sub)? {
            return Err(Error::misuse(format!(
                "requested subdevice is not supported: {sub}"
            )));
        }
        Ok(Subdevice {
            handle: self.handle.clone(),
            sub,
        })
    }

    pub fn depth(&self) -> Result<Subdevice> {
        self.subdevice(Subdev::Depth)
    }

    pub fn color(&self) -> Result<Subdevice> {
        self.subdevice(Subdev::Color)
    }

    pub fn fisheye(&self) -> Result<Subdevice> {
        self.subdevice(Subdev::Fisheye)
    }

    pub fn motion(&self) -> Result<Subdevice> {
        self.subdevice(Subdev::Motion)
    }

    /// Every subdevice this device exposes, in slot order.
    pub fn subdevices(&self) -> Result<Vec<Subdevice>> {
        let mut result = Vec::new();
        for sub in Subdev::ALL {
            if self.handle.supports_subdevice(sub)? {
                result.push(Subdevice {
                    handle: self.handle.clone(),
                    sub,
                });
            }
        }
        Ok(result)
    }

    /// Whether the given info field is available on this device.
    pub fn supports_info(&self, info: CameraInfo) -> Result<bool> {
        self.handle.supports_camera_info(info)
    }

    /// Read a static info field such as the serial number.
    pub fn camera_info(&self, info: CameraInfo) -> Result<String> {
        self.handle.camera_info(info)
    }

    /// Rigid transform from one subdevice's coordinate frame to another's.
    pub fn extrinsics(&self, from: Subdev, to: Subdev) -> Result<Extrinsics> {
        self.handle.extrinsics(from, to)
    }

    /// Projection parameters for one of a subdevice's stream profiles.
    pub fn intrinsics(&self, sub: Subdev, profile: &StreamProfile) -> Result<Intrinsics> {
        self.handle.intrinsics(sub, profile)
    }

    /// Meters per depth unit for this device's depth stream.
    pub fn depth_scale(&self) -> Result<f32> {
        self.handle.depth_scale()
    }
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut s = f.debug_struct("Device");
        if let Ok(serial) = self.handle.camera_info(CameraInfo::SerialNumber) {
            s.field("serial", &serial);
        }
        s.finish_non_exhaustive()
    }
}

/// One sensor on a device. Carries the per-sensor surface: stream modes,
/// options, and session opening.
#[derive(Clone)]
pub struct Subdevice {
    handle: DeviceHandle,
    sub: Subdev,
}

impl Subdevice {
    pub fn kind(&self) -> Subdev {
        self.sub
    }

    /// Capture modes this subdevice can stream.
    pub fn stream_modes(&self) -> Result<Vec<StreamProfile>> {
        self.handle.stream_modes(self.sub)
    }

    /// Open a streaming session with a single profile. The session stays
    /// open until the last clone of the returned channel drops.
    pub fn open(&self, profile: &StreamProfile) -> Result<StreamChannel> {
        self.open_many(std::slice::from_ref(profile))
    }

    /// Open a streaming session delivering several streams at once. All
    /// profiles must be valid together; the open fails as a whole if any
    /// one is unsupported.
    pub fn open_many(&self, profiles: &[StreamProfile]) -> Result<StreamChannel> {
        let session = backend::open_session(&self.handle, self.sub, profiles)?;
        Ok(StreamChannel::new(session))
    }

    pub fn supports_option(&self, option: OptionId) -> Result<bool> {
        self.handle.supports_option(self.sub, option)
    }

    pub fn get_option(&self, option: OptionId) -> Result<f32> {
        self.handle.get_option(self.sub, option)
    }

    /// Set an option. The driver rejects values outside the option's
    /// [`OptionRange`] with a driver error naming the call and arguments.
    pub fn set_option(&self, option: OptionId, value: f32) -> Result<()> {
        self.handle.set_option(self.sub, option, value)
    }

    pub fn option_range(&self, option: OptionId) -> Result<OptionRange> {
        self.handle.option_range(self.sub, option)
    }

    pub fn option_description(&self, option: OptionId) -> Result<String> {
        self.handle.option_description(self.sub, option)
    }

    pub fn option_value_description(&self, option: OptionId, value: f32) -> Result<String> {
        self.handle.option_value_description(self.sub, option, value)
    }
}

impl std::fmt::Debug for Subdevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subdevice")
            .field("kind", &self.sub)
            .finish_non_exhaustive()
    }
}
