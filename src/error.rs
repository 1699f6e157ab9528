//! Crate-wide error and result types.
//!
//! Protocol-level command failures are deliberately *not* represented here:
//! a bad serial command is a normal event that produces an error reply on
//! the wire (see [`crate::protocol::CmdError`]) and leaves state untouched.
//! [`Error`] covers the faults that stop the firmware from being wired up
//! at all.

use derive_more::{Display, Error, From};

/// Errors that can occur while setting up or running the controller.
#[derive(Debug, Display, Error, From)]
#[non_exhaustive]
pub enum Error {
    /// A background task could not be spawned.
    #[cfg(not(feature = "host"))]
    #[display("task spawn failed: {_0:?}")]
    #[error(ignore)]
    Spawn(embassy_executor::SpawnError),

    /// The serial transport failed while writing a reply.
    #[cfg(not(feature = "host"))]
    #[display("serial transport failed: {_0:?}")]
    #[error(ignore)]
    Serial(embassy_rp::uart::Error),

    /// A bounded text buffer overflowed while rendering output.
    #[display("formatting overflowed a fixed buffer")]
    #[error(ignore)]
    Format(core::fmt::Error),
}

/// Result type alias using the crate's [`Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

#[cfg(all(test, feature = "host"))]
mod tests {
    use super::Error;

    #[test]
    fn format_error_converts_and_displays() {
        let error = Error::from(core::fmt::Error);
        assert!(matches!(error, Error::Format(_)));
        assert_eq!(
            std::format!("{error}"),
            "formatting overflowed a fixed buffer"
        );
    }
}
