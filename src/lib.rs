//! Area XWayland
//!
//! The X11 window-manager side of an XWayland bridge. Each top-level X11
//! window gets an adapter that keeps its ICCCM/EWMH state in sync with a
//! compositor shell surface, in both directions.

pub mod config;
pub mod error;
pub mod logging;
pub mod shared;
pub mod shell;
pub mod wm;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{Config, XwaylandConfig};
pub use error::{Result, XwmError};
pub use wm::{XwaylandSurface, XwmContext, XwmEventRouter};
