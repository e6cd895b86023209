//! Driver backends.
//!
//! Both backends expose the same crate-private surface: `ContextHandle`,
//! `DeviceHandle`, `SessionHandle`, `FrameHandle`, and the free functions
//! `create_context`, `query_devices`, and `open_session`. The rest of the
//! crate is written against that surface and compiles unchanged either way.
//!
//! The mock backend is the default and needs no hardware or SDK install;
//! enable the `realsense_sdk` feature to talk to real cameras.

#[cfg(feature = "realsense_sdk")]
mod sdk;
#[cfg(feature = "realsense_sdk")]
pub(crate) use sdk::{
    create_context, open_session, query_devices, ContextHandle, DeviceHandle, FrameHandle,
    SessionHandle,
};

#[cfg(not(feature = "realsense_sdk"))]
pub mod mock;
#[cfg(not(feature = "realsense_sdk"))]
pub(crate) use mock::{
    create_context, open_session, query_devices, ContextHandle, DeviceHandle, FrameHandle,
    SessionHandle,
};
