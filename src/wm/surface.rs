//! Per-window adapter
//!
//! An [`XwaylandSurface`] exists for every top-level X11 window. It caches
//! what the X side last told us, accumulates pending shell modifications
//! from property reads, and owns the lifecycle of the shell surface created
//! once the client attaches renderable content.
//!
//! Locking: all cached state sits behind one mutex. Anything that reads the
//! cache and then talks to the X server or the shell takes a snapshot under
//! the lock and performs the call after releasing it.

use std::collections::HashSet;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, info, warn};
use x11rb::protocol::xproto::{Atom, AtomEnum, CreateNotifyEvent, EventMask, StackMode, Window};

use crate::error::{Result, XwmError, fatal_error};
use crate::shared::{Point, Size};
use crate::shell::{Presentation, SceneSurface, Session, SurfaceCreationParameters, SurfaceKind, SurfaceSpecification};
use crate::wm::decode::{AtomList, TransientFor, WmClass};
use crate::wm::observer::SurfaceObserver;
use crate::wm::properties::{PropertyHandlers, PropertyTarget};
use crate::wm::registry::WindowRegistry;
use crate::wm::state::WindowState;
use crate::wm::transport::X11Transport;
use crate::wm::{Atoms, XwmContext, configure_aux, log_failure};

/// What the X side last told us about the window
#[derive(Debug, Clone, Default)]
pub(crate) struct CachedWindow {
    pub override_redirect: bool,
    pub top_left: Point,
    pub size: Size,
    pub state: WindowState,
    pub supported_wm_protocols: HashSet<Atom>,
}

#[derive(Default)]
pub(crate) struct SurfaceState {
    pub cached: CachedWindow,
    pending_spec: Option<SurfaceSpecification>,
    pub scene_surface: Option<Weak<dyn SceneSurface>>,
    pub session: Option<Weak<Session>>,
    pub observer: Option<Arc<SurfaceObserver>>,
}

impl SurfaceState {
    /// Pending modifications, created on first use
    pub fn pending_spec(&mut self) -> &mut SurfaceSpecification {
        self.pending_spec.get_or_insert_with(SurfaceSpecification::default)
    }

    pub fn consume_pending_spec(&mut self) -> Option<SurfaceSpecification> {
        self.pending_spec.take()
    }

    pub fn scene_surface(&self) -> Option<Arc<dyn SceneSurface>> {
        self.scene_surface.as_ref()?.upgrade()
    }

    fn session_alive(&self) -> bool {
        self.session.as_ref().is_some_and(|session| session.strong_count() > 0)
    }
}

pub struct XwaylandSurface {
    window: Window,
    pub(crate) context: XwmContext,
    pub(crate) registry: Weak<WindowRegistry>,
    handlers: PropertyHandlers<XwaylandSurface>,
    pub(crate) inner: Mutex<SurfaceState>,
}

impl XwaylandSurface {
    /// Adapter for a newly created X window; subscribes to its property and focus changes
    pub fn new(context: XwmContext, registry: &Arc<WindowRegistry>, event: &CreateNotifyEvent) -> Arc<Self> {
        let window = event.window;
        let handlers = Self::property_handlers(&context.atoms);

        let cached = CachedWindow {
            override_redirect: event.override_redirect,
            top_left: Point::new(event.x.into(), event.y.into()),
            size: Size::new(event.width.into(), event.height.into()),
            ..Default::default()
        };

        let surface = Arc::new(Self {
            window,
            context,
            registry: Arc::downgrade(registry),
            handlers,
            inner: Mutex::new(SurfaceState {
                cached,
                ..Default::default()
            }),
        });

        log_failure(
            window,
            "select input",
            surface
                .context
                .connection
                .select_input(window, EventMask::PROPERTY_CHANGE | EventMask::FOCUS_CHANGE),
        );

        debug!(
            "Created adapter for window 0x{:x} at {:?} ({}x{}{})",
            window,
            (event.x, event.y),
            event.width,
            event.height,
            if event.override_redirect { ", override-redirect" } else { "" }
        );

        surface
    }

    fn property_handlers(atoms: &Atoms) -> PropertyHandlers<Self> {
        let mut handlers = PropertyHandlers::<Self>::new();
        handlers.register::<WmClass>(atoms.wm_class, |surface, class| {
            surface.inner.lock().pending_spec().application_id = Some(class.application_id().to_string());
        });
        handlers.register::<String>(atoms.wm_name, |surface, name| {
            surface.inner.lock().pending_spec().name = Some(name);
        });
        // Interned after the predefined atoms, so applied after WM_NAME and preferred over it
        handlers.register::<String>(atoms.net_wm_name, |surface, name| {
            surface.inner.lock().pending_spec().name = Some(name);
        });
        handlers.register_with_absence::<TransientFor>(
            atoms.wm_transient_for,
            |surface, TransientFor(owner)| surface.is_transient_for(owner),
            |surface| surface.is_transient_for(x11rb::NONE),
        );
        handlers.register_with_absence::<AtomList>(
            atoms.wm_protocols,
            |surface, AtomList(protocols)| {
                surface.inner.lock().cached.supported_wm_protocols = protocols.into_iter().collect();
            },
            |surface| surface.inner.lock().cached.supported_wm_protocols.clear(),
        );
        handlers
    }

    pub fn window(&self) -> Window {
        self.window
    }

    pub(crate) fn atoms(&self) -> &Atoms {
        &self.context.atoms
    }

    pub(crate) fn handlers(&self) -> &PropertyHandlers<Self> {
        &self.handlers
    }

    pub fn state(&self) -> WindowState {
        self.inner.lock().cached.state
    }

    pub fn supports_protocol(&self, protocol: Atom) -> bool {
        self.inner.lock().cached.supported_wm_protocols.contains(&protocol)
    }

    /// Live shell surface, if content is attached and the surface still exists
    pub fn scene_surface(&self) -> Option<Arc<dyn SceneSurface>> {
        self.inner.lock().scene_surface()
    }

    /// Handle a map request
    pub fn map(&self) {
        let mut state = self.inner.lock().cached.state;
        let conn = &self.context.connection;

        log_failure(
            self.window,
            "set _NET_WM_DESKTOP",
            conn.set_property32(
                self.window,
                self.atoms().net_wm_desktop,
                AtomEnum::CARDINAL.into(),
                &[self.context.config.workspace],
            ),
        );

        state.withdrawn = false;
        self.inform_client_of_window_state(state);
        self.request_scene_surface_state(state.presentation());

        log_failure(self.window, "map window", conn.map_window(self.window));
        log_failure(self.window, "flush", conn.flush());
    }

    /// Withdraw the window and tear down its shell surface; safe to call repeatedly
    pub fn close(&self) {
        let (mut state, scene_surface, observer) = {
            let mut inner = self.inner.lock();
            let scene_surface = inner.scene_surface();
            inner.scene_surface = None;
            inner.session = None;
            (inner.cached.state, scene_surface, inner.observer.take())
        };

        let conn = &self.context.connection;
        log_failure(
            self.window,
            "delete _NET_WM_DESKTOP",
            conn.delete_property(self.window, self.atoms().net_wm_desktop),
        );

        state.withdrawn = true;
        self.inform_client_of_window_state(state);

        log_failure(self.window, "unmap window", conn.unmap_window(self.window));
        log_failure(self.window, "flush", conn.flush());

        if let (Some(scene_surface), Some(observer)) = (&scene_surface, &observer) {
            scene_surface.remove_observer(observer);
        }
        if let Some(observer) = &observer {
            observer.detach();
        }

        if let Some(scene_surface) = scene_surface {
            self.context
                .shell
                .destroy_surface(scene_surface.session().upgrade(), &scene_surface);
            // Other holders may keep the surface alive; we only drop our reference
        }

        if let Some(observer) = observer {
            let weak_observer = Arc::downgrade(&observer);
            drop(observer);
            if let Some(alive) = weak_observer.upgrade() {
                fatal_error!(
                    "surface observer of window 0x{:x} should have been deleted, but was not (use count {})",
                    self.window,
                    Arc::strong_count(&alive) - 1
                );
            }
        }
    }

    /// Give the window X input focus, offering `WM_TAKE_FOCUS` first when it is understood
    pub fn take_focus(&self) {
        let supports_take_focus = {
            let inner = self.inner.lock();
            if inner.cached.override_redirect {
                return;
            }
            inner.cached.supported_wm_protocols.contains(&self.atoms().wm_take_focus)
        };

        let conn = &self.context.connection;
        if supports_take_focus && self.context.config.honor_take_focus {
            log_failure(
                self.window,
                "send WM_TAKE_FOCUS",
                conn.send_client_message(
                    self.window,
                    EventMask::SUBSTRUCTURE_REDIRECT,
                    self.atoms().wm_protocols,
                    [self.atoms().wm_take_focus, x11rb::CURRENT_TIME, 0, 0, 0],
                ),
            );
        }

        log_failure(self.window, "set input focus", conn.set_input_focus(self.window));
        log_failure(self.window, "flush", conn.flush());
    }

    /// Create the shell surface for content bound to this window
    ///
    /// Every watched property is read before the surface is created so the
    /// initial specification is complete. Fails if content was already attached.
    pub fn attach_wl_surface(self: &Arc<Self>, session: Arc<Session>) -> Result<()> {
        if self.context.verbose() {
            debug!("Attaching content of session {} to window 0x{:x}...", session.name, self.window);
        }

        let observer = SurfaceObserver::new(self, self.context.queue.clone());

        let (state, mut params) = {
            let mut inner = self.inner.lock();

            if inner.observer.is_some() || inner.session_alive() || inner.scene_surface().is_some() {
                return Err(XwmError::AlreadyAttached { window: self.window });
            }

            inner.observer = Some(Arc::clone(&observer));
            inner.session = Some(Arc::downgrade(&session));

            let mut state = inner.cached.state;
            state.withdrawn = false;

            let mut params = SurfaceCreationParameters::new(inner.cached.top_left, inner.cached.size);
            params.kind = SurfaceKind::Freestyle;
            params.state = state.presentation();
            params.server_side_decorated = !inner.cached.override_redirect;
            (state, params)
        };

        // Issue every read, then wait for all of them
        let this: &Self = self;
        let completions = self.handlers.read_all(this);
        for completion in completions {
            completion(this);
        }

        if let Some(spec) = self.inner.lock().consume_pending_spec() {
            params.update_from(spec);
        }

        let scene_surface = match self
            .context
            .shell
            .create_surface(&session, params, Arc::clone(&observer))
        {
            Ok(scene_surface) => scene_surface,
            Err(err) => {
                warn!("Failed to create shell surface for window 0x{:x}: {}", self.window, err);
                {
                    let mut inner = self.inner.lock();
                    inner.observer = None;
                    inner.session = None;
                }
                observer.detach();
                return Err(err.into());
            }
        };
        drop(observer);

        self.inform_client_of_window_state(state);

        let conn = &self.context.connection;
        let aux = configure_aux(
            Some(scene_surface.top_left() + scene_surface.content_offset()),
            Some(scene_surface.content_size()),
            Some(StackMode::ABOVE),
        );
        log_failure(self.window, "configure window", conn.configure_window(self.window, &aux));
        log_failure(self.window, "flush", conn.flush());

        self.inner.lock().scene_surface = Some(Arc::downgrade(&scene_surface));

        info!(
            "Window 0x{:x} attached as surface {:?} ({:?})",
            self.window,
            scene_surface.id(),
            scene_surface.name()
        );
        Ok(())
    }

    /// The client's renderable content went away
    pub fn wl_surface_destroyed(&self) {
        if self.context.verbose() {
            debug!("Content of window 0x{:x} destroyed", self.window);
        }
        self.close();
    }

    /// Publish `new_state` as `WM_STATE` and `_NET_WM_STATE`; no-op when unchanged
    pub fn inform_client_of_window_state(&self, new_state: WindowState) {
        {
            let mut inner = self.inner.lock();
            if inner.cached.state == new_state {
                return;
            }
            inner.cached.state = new_state;
        }

        if self.context.verbose() {
            debug!("Window 0x{:x} state set to {:?}", self.window, new_state);
        }

        let conn = &self.context.connection;
        let atoms = self.atoms();

        log_failure(
            self.window,
            "set WM_STATE",
            conn.set_property32(
                self.window,
                atoms.wm_state,
                atoms.wm_state,
                &[new_state.wm_state() as u32, x11rb::NONE],
            ),
        );

        let net_wm_state = match new_state.net_wm_state_atoms(atoms) {
            Some(states) => conn.set_property32(self.window, atoms.net_wm_state, AtomEnum::ATOM.into(), &states),
            None => conn.delete_property(self.window, atoms.net_wm_state),
        };
        log_failure(self.window, "update _NET_WM_STATE", net_wm_state);
        log_failure(self.window, "flush", conn.flush());
    }

    /// Ask the shell for `presentation` if the surface is not already in it
    pub fn request_scene_surface_state(&self, presentation: Presentation) {
        let Some(scene_surface) = self.scene_surface() else {
            return;
        };

        if scene_surface.state() != presentation {
            let spec = SurfaceSpecification {
                state: Some(presentation),
                ..Default::default()
            };
            self.context
                .shell
                .modify_surface(scene_surface.session().upgrade(), &scene_surface, spec);
        }
    }

    /// Timestamp of the latest input event on the shell surface
    pub fn latest_input_timestamp(&self) -> Duration {
        match &self.inner.lock().observer {
            Some(observer) => observer.latest_timestamp(),
            None => {
                warn!("Can not get timestamp of window 0x{:x}, no surface observer", self.window);
                Duration::ZERO
            }
        }
    }
}

impl PropertyTarget for XwaylandSurface {
    fn transport(&self) -> &dyn X11Transport {
        self.context.connection.as_ref()
    }

    fn window(&self) -> Window {
        self.window
    }
}

impl Drop for XwaylandSurface {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for XwaylandSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XwaylandSurface")
            .field("window", &format_args!("0x{:x}", self.window))
            .finish_non_exhaustive()
    }
}
