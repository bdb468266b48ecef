//! Window registry
//!
//! Global lookup from X window to its adapter, used for transient-for
//! resolution, and the window-manager-level focus tracker. Adapters are
//! never dropped while a registry lock is held.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::debug;
use x11rb::protocol::xproto::{AtomEnum, Window};

use crate::wm::surface::XwaylandSurface;
use crate::wm::transport::X11Transport;
use crate::wm::{Atoms, XwmContext, log_failure};

pub struct WindowRegistry {
    root: Window,
    connection: Arc<dyn X11Transport>,
    atoms: Arc<Atoms>,
    surfaces: RwLock<HashMap<Window, Arc<XwaylandSurface>>>,
    focused: Mutex<Option<Window>>,
}

impl WindowRegistry {
    pub fn new(root: Window, context: &XwmContext) -> Arc<Self> {
        Arc::new(Self {
            root,
            connection: Arc::clone(&context.connection),
            atoms: Arc::clone(&context.atoms),
            surfaces: RwLock::new(HashMap::new()),
            focused: Mutex::new(None),
        })
    }

    pub fn root(&self) -> Window {
        self.root
    }

    /// Register an adapter; returns the one it replaces, if any
    pub fn insert(&self, surface: Arc<XwaylandSurface>) -> Option<Arc<XwaylandSurface>> {
        let window = surface.window();
        let previous = self.surfaces.write().insert(window, surface);
        if previous.is_some() {
            debug!("Window 0x{:x} registered twice, replacing adapter", window);
        }
        previous
    }

    /// Unregister an adapter; the caller decides when it is dropped
    pub fn remove(&self, window: Window) -> Option<Arc<XwaylandSurface>> {
        let removed = self.surfaces.write().remove(&window);

        {
            let mut focused = self.focused.lock();
            if *focused == Some(window) {
                *focused = None;
            }
        }

        removed
    }

    pub fn get(&self, window: Window) -> Option<Arc<XwaylandSurface>> {
        self.surfaces.read().get(&window).cloned()
    }

    pub fn len(&self) -> usize {
        self.surfaces.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.surfaces.read().is_empty()
    }

    pub fn focused_window(&self) -> Option<Window> {
        *self.focused.lock()
    }

    /// Track focus reported by the shell and hand X input focus to the window
    pub fn set_focus(&self, window: Window, has_focus: bool) {
        let active = {
            let mut focused = self.focused.lock();
            match (has_focus, *focused) {
                (true, current) if current != Some(window) => {
                    *focused = Some(window);
                    Some(window)
                }
                (false, Some(current)) if current == window => {
                    *focused = None;
                    Some(x11rb::NONE)
                }
                _ => None,
            }
        };

        if has_focus {
            if let Some(surface) = self.get(window) {
                surface.take_focus();
            }
        }

        if let Some(active) = active {
            log_failure(
                self.root,
                "set _NET_ACTIVE_WINDOW",
                self.connection
                    .set_property32(self.root, self.atoms.net_active_window, AtomEnum::WINDOW.into(), &[active]),
            );
            log_failure(self.root, "flush", self.connection.flush());
        }
    }

    /// Close and drop every adapter
    pub fn clear(&self) {
        let surfaces: Vec<_> = self.surfaces.write().drain().map(|(_, surface)| surface).collect();
        *self.focused.lock() = None;
        for surface in surfaces {
            surface.close();
        }
    }
}
