//! Error types for the XWayland window manager

use thiserror::Error;
use x11rb::protocol::xproto::Window;

use crate::shell::ShellError;

pub type Result<T, E = XwmError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum XwmError {
    /// A client sent a message that violates ICCCM/EWMH
    #[error("invalid protocol message for window 0x{window:x}: {message}")]
    InvalidProtocolMessage { window: Window, message: String },

    /// Content was attached to a window that already has a live shell surface
    #[error("content attached more than once to window 0x{window:x}")]
    AlreadyAttached { window: Window },

    #[error("shell error: {0}")]
    Shell(#[from] ShellError),
}

impl XwmError {
    pub(crate) fn protocol(window: Window, message: impl Into<String>) -> Self {
        Self::InvalidProtocolMessage {
            window,
            message: message.into(),
        }
    }

    /// Lifecycle bugs that must not be recovered from
    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, Self::AlreadyAttached { .. })
    }
}

/// Log a lifecycle invariant violation and abort the current thread
macro_rules! fatal_error {
    ($($arg:tt)*) => {{
        tracing::error!($($arg)*);
        panic!($($arg)*);
    }};
}

pub(crate) use fatal_error;
