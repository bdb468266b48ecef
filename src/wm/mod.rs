//! Window Manager Module
//!
//! Per-window adapters between X11 clients (ICCCM/EWMH) and compositor
//! shell surfaces, plus the connection-level routing that feeds them.

pub mod atoms;
pub mod decode;
pub mod dispatch;
pub mod events;
pub mod moveresize;
pub mod observer;
pub mod properties;
pub mod registry;
pub mod requests;
pub mod state;
pub mod surface;
pub mod transport;
pub mod xwm;

use std::sync::Arc;

use tracing::warn;
use x11rb::errors::ConnectionError;
use x11rb::protocol::xproto::{ConfigureWindowAux, StackMode, Window};

use crate::config::XwaylandConfig;
use crate::shared::{Point, Size};
use crate::shell::Shell;

pub use atoms::Atoms;
pub use dispatch::{CompositorQueue, CompositorQueueRunner, compositor_queue};
pub use observer::SurfaceObserver;
pub use registry::WindowRegistry;
pub use surface::XwaylandSurface;
pub use transport::{RustConnectionTransport, X11Transport};
pub use xwm::XwmEventRouter;

/// Everything an adapter needs from the outside world
#[derive(Clone)]
pub struct XwmContext {
    pub connection: Arc<dyn X11Transport>,
    pub shell: Arc<dyn Shell>,
    pub atoms: Arc<Atoms>,
    pub queue: CompositorQueue,
    pub config: Arc<XwaylandConfig>,
}

impl XwmContext {
    pub fn verbose(&self) -> bool {
        self.config.verbose_logging
    }
}

/// Log a failed X request; protocol delivery is best effort
pub(crate) fn log_failure(window: Window, what: &str, result: Result<(), ConnectionError>) {
    if let Err(err) = result {
        warn!("Failed to {} for window 0x{:x}: {}", what, window, err);
    }
}

/// Build a configure request touching only the given fields
pub(crate) fn configure_aux(top_left: Option<Point>, size: Option<Size>, stack_mode: Option<StackMode>) -> ConfigureWindowAux {
    let mut aux = ConfigureWindowAux::new();
    if let Some(top_left) = top_left {
        aux = aux.x(top_left.x).y(top_left.y);
    }
    if let Some(size) = size {
        aux = aux
            .width(u32::try_from(size.width).unwrap_or(0))
            .height(u32::try_from(size.height).unwrap_or(0));
    }
    if let Some(stack_mode) = stack_mode {
        aux = aux.stack_mode(stack_mode);
    }
    aux
}
