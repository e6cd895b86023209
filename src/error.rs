//! Error types for the wrapper.
//!
//! Every fallible driver call reports failure through an out-of-band error
//! object carrying a message, the name of the failed call, and the
//! stringified arguments it was invoked with. The FFI backend translates
//! that object into [`Error::Driver`] and frees it exactly once at the call
//! site; the mock backend constructs the same shape directly.
//!
//! ## Error Categories
//!
//! - **`Driver`**: the hardware/session/state side reported a failure.
//!   Usually recoverable by the caller (retry an `open`, treat an
//!   unsupported metadata kind as "skip this field"). Host-side guards that
//!   stand in for driver checks (null frame handle, flushed queue) use this
//!   category too, with the wrapper operation as the failed function.
//! - **`Misuse`**: the API was used incorrectly (requesting an unsupported
//!   subdevice, for example). No driver context exists for these; they are
//!   fatal to the calling operation but not to the process.

use thiserror::Error;

/// Convenience alias for results using the wrapper error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Primary error type for the wrapper.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A failure reported by the driver, with call-site context.
    #[error("{message} (in {function}({args}))")]
    Driver {
        /// Name of the driver call that failed.
        function: String,
        /// Stringified arguments the call was made with.
        args: String,
        /// Human-readable failure message.
        message: String,
    },

    /// API misuse detected before reaching the driver.
    #[error("{0}")]
    Misuse(String),
}

impl Error {
    pub(crate) fn driver(
        function: impl Into<String>,
        args: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Error::Driver {
            function: function.into(),
            args: args.into(),
            message: message.into(),
        }
    }

    pub(crate) fn misuse(message: impl Into<String>) -> Self {
        Error::Misuse(message.into())
    }

    /// Name of the driver call that failed, if this is a driver error.
    pub fn failed_function(&self) -> Option<&str> {
        match self {
            Error::Driver { function, .. } => Some(function),
            Error::Misuse(_) => None,
        }
    }

    /// Stringified arguments of the failed call, if this is a driver error.
    pub fn failed_args(&self) -> Option<&str> {
        match self {
            Error::Driver { args, .. } => Some(args),
            Error::Misuse(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn driver_error_round_trips_context() {
        let err = Error::driver("rs_get_frame_timestamp", "frame:0x1", "bad handle");
        assert_eq!(err.failed_function(), Some("rs_get_frame_timestamp"));
        assert_eq!(err.failed_args(), Some("frame:0x1"));
        assert_eq!(
            err.to_string(),
            "bad handle (in rs_get_frame_timestamp(frame:0x1))"
        );
    }

    #[test]
    fn misuse_has_no_driver_context() {
        let err = Error::misuse("requested subdevice is not supported");
        assert_eq!(err.failed_function(), None);
        assert_eq!(err.failed_args(), None);
    }
}
