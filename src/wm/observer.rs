//! Scene surface observer
//!
//! The shell holds a [`SurfaceObserver`] for every surface it creates on
//! behalf of an X11 window and reports surface-side events through it. Each
//! event is queued onto the compositor context and applied to the window's
//! adapter there. Once the observer is detached nothing further is
//! delivered, including work that was already queued.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use tracing::debug;
use x11rb::protocol::xproto::Window;

use crate::shared::{Point, Size};
use crate::shell::Presentation;
use crate::wm::dispatch::CompositorQueue;
use crate::wm::surface::XwaylandSurface;

pub struct SurfaceObserver {
    window: Window,
    surface: Weak<XwaylandSurface>,
    queue: CompositorQueue,
    detached: Arc<AtomicBool>,
    /// Latest input event time, in nanoseconds
    latest_timestamp: AtomicU64,
}

impl SurfaceObserver {
    pub(crate) fn new(surface: &Arc<XwaylandSurface>, queue: CompositorQueue) -> Arc<Self> {
        Arc::new(Self {
            window: surface.window(),
            surface: Arc::downgrade(surface),
            queue,
            detached: Arc::new(AtomicBool::new(false)),
            latest_timestamp: AtomicU64::new(0),
        })
    }

    pub fn window(&self) -> Window {
        self.window
    }

    pub fn focus_changed(&self, has_focus: bool) {
        self.dispatch(move |surface| surface.scene_surface_focus_set(has_focus));
    }

    pub fn state_changed(&self, presentation: Presentation) {
        self.dispatch(move |surface| surface.scene_surface_state_set(presentation));
    }

    pub fn resized(&self, size: Size) {
        self.dispatch(move |surface| surface.scene_surface_resized(size));
    }

    pub fn moved_to(&self, top_left: Point) {
        self.dispatch(move |surface| surface.scene_surface_moved_to(top_left));
    }

    pub fn close_requested(&self) {
        self.dispatch(|surface| surface.scene_surface_close_requested());
    }

    /// Record the timestamp of an input event delivered to the surface
    pub fn input_event(&self, timestamp: Duration) {
        let nanos = u64::try_from(timestamp.as_nanos()).unwrap_or(u64::MAX);
        self.latest_timestamp.fetch_max(nanos, Ordering::AcqRel);
    }

    pub fn latest_timestamp(&self) -> Duration {
        Duration::from_nanos(self.latest_timestamp.load(Ordering::Acquire))
    }

    pub fn is_detached(&self) -> bool {
        self.detached.load(Ordering::Acquire)
    }

    /// Stop delivering events, including any already queued
    pub(crate) fn detach(&self) {
        self.detached.store(true, Ordering::Release);
    }

    fn dispatch(&self, work: impl FnOnce(&XwaylandSurface) + Send + 'static) {
        if self.is_detached() {
            debug!("Dropping event for detached observer of window 0x{:x}", self.window);
            return;
        }

        // Only the weak surface and the flag go into the queue, never the observer itself
        let surface = self.surface.clone();
        let detached = Arc::clone(&self.detached);
        self.queue.submit(move || {
            if detached.load(Ordering::Acquire) {
                return;
            }
            if let Some(surface) = surface.upgrade() {
                work(&surface);
            }
        });
    }
}

impl std::fmt::Debug for SurfaceObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SurfaceObserver")
            .field("window", &format_args!("0x{:x}", self.window))
            .field("detached", &self.is_detached())
            .field("latest_timestamp", &self.latest_timestamp())
            .finish()
    }
}
