//! Request handlers (X client → shell)
//!
//! Configure requests, state-change client messages, move/resize requests
//! and property changes coming from the X connection, translated into
//! shell surface modifications.

use std::sync::{Arc, Weak};

use tracing::{debug, info, warn};
use x11rb::protocol::xproto::{Atom, ConfigWindow, ConfigureNotifyEvent, ConfigureRequestEvent, Window};

use crate::error::{Result, XwmError};
use crate::shared::{Point, Rectangle, Size};
use crate::shell::{PlacementGravity, PlacementHints, SceneSurface, SurfaceSpecification, same_surface};
use crate::wm::moveresize::MoveResize;
use crate::wm::state::{NetWmStateAction, WmState};
use crate::wm::surface::XwaylandSurface;
use crate::wm::{configure_aux, log_failure};

fn has_flag(mask: ConfigWindow, flag: ConfigWindow) -> bool {
    u16::from(mask) & u16::from(flag) != 0
}

/// Place `spec` at `top_left` (global, including decorations), relative to
/// `parent` when there is one
pub(crate) fn set_position(parent: Option<&Arc<dyn SceneSurface>>, top_left: Point, spec: &mut SurfaceSpecification) {
    match parent {
        Some(parent) => {
            let local_top_left = top_left - parent.top_left().as_displacement() - parent.content_offset();
            spec.aux_rect = Some(Rectangle::new(local_top_left, Size::default()));
            spec.placement_hints = Some(PlacementHints::empty());
            spec.surface_placement_gravity = Some(PlacementGravity::NorthWest);
            spec.aux_rect_placement_gravity = Some(PlacementGravity::NorthWest);
        }
        None => spec.top_left = Some(top_left),
    }
}

impl XwaylandSurface {
    pub fn configure_request(&self, event: &ConfigureRequestEvent) {
        let mask = event.value_mask;
        let requested_x = has_flag(mask, ConfigWindow::X).then_some(i32::from(event.x));
        let requested_y = has_flag(mask, ConfigWindow::Y).then_some(i32::from(event.y));
        let requested_width = has_flag(mask, ConfigWindow::WIDTH).then_some(i32::from(event.width));
        let requested_height = has_flag(mask, ConfigWindow::HEIGHT).then_some(i32::from(event.height));

        let (scene_surface, cached_top_left, cached_size) = {
            let inner = self.inner.lock();
            (inner.scene_surface(), inner.cached.top_left, inner.cached.size)
        };

        let Some(scene_surface) = scene_surface else {
            // Nothing to negotiate with yet, grant the request as made
            let top_left = Point::new(
                requested_x.unwrap_or(cached_top_left.x),
                requested_y.unwrap_or(cached_top_left.y),
            );
            let size = Size::new(
                requested_width.unwrap_or(cached_size.width),
                requested_height.unwrap_or(cached_size.height),
            );
            let conn = &self.context.connection;
            log_failure(
                self.window(),
                "configure window",
                conn.configure_window(self.window(), &configure_aux(Some(top_left), Some(size), None)),
            );
            log_failure(self.window(), "flush", conn.flush());
            return;
        };

        let content_offset = scene_surface.content_offset();
        let old_position = scene_surface.top_left() + content_offset;
        let new_position = Point::new(
            requested_x.unwrap_or(old_position.x),
            requested_y.unwrap_or(old_position.y),
        );

        let old_size = scene_surface.content_size();
        let new_size = Size::new(
            requested_width.unwrap_or(old_size.width),
            requested_height.unwrap_or(old_size.height),
        );

        let mut spec = SurfaceSpecification::default();
        if old_position != new_position {
            set_position(scene_surface.parent().as_ref(), new_position - content_offset, &mut spec);
        }
        if old_size != new_size {
            // The shell only honours a size when both dimensions are given
            spec.width = Some(new_size.width);
            spec.height = Some(new_size.height);
        }

        if !spec.is_empty() {
            self.context
                .shell
                .modify_surface(scene_surface.session().upgrade(), &scene_surface, spec);
        }
    }

    pub fn configure_notify(&self, event: &ConfigureNotifyEvent) {
        let mut inner = self.inner.lock();
        inner.cached.override_redirect = event.override_redirect;
        inner.cached.top_left = Point::new(event.x.into(), event.y.into());
        inner.cached.size = Size::new(event.width.into(), event.height.into());
    }

    /// `_NET_WM_STATE` client message: `[action, first, second, source, 0]`
    pub fn net_wm_state_client_message(&self, data: [u32; 5]) -> Result<()> {
        let action = NetWmStateAction::from_raw(data[0]).ok_or_else(|| {
            XwmError::protocol(self.window(), format!("_NET_WM_STATE sent invalid action {}", data[0]))
        })?;

        let new_state = {
            let inner = self.inner.lock();
            let mut state = inner.cached.state;
            state.apply_net_wm_state(action, [data[1], data[2]], self.atoms());
            state
        };

        self.inform_client_of_window_state(new_state);
        self.request_scene_surface_state(new_state.presentation());
        Ok(())
    }

    /// ICCCM `WM_CHANGE_STATE` client message
    pub fn wm_change_state_client_message(&self, data: [u32; 5]) -> Result<()> {
        let new_state = {
            let inner = self.inner.lock();
            let mut state = inner.cached.state;
            match WmState::from_raw(data[0]) {
                Some(WmState::Normal) => state.minimized = false,
                Some(WmState::Iconic) => state.minimized = true,
                _ => {
                    return Err(XwmError::protocol(
                        self.window(),
                        format!("WM_CHANGE_STATE sent invalid state {}", data[0]),
                    ));
                }
            }
            state
        };

        self.inform_client_of_window_state(new_state);
        self.request_scene_surface_state(new_state.presentation());
        Ok(())
    }

    /// Re-read a changed property and push the result to the live surface
    pub fn property_notify(&self, atom: Atom) {
        let Some(completion) = self.handlers().read(self, atom) else {
            return;
        };
        completion(self);

        let (scene_surface, spec) = {
            let mut inner = self.inner.lock();
            (inner.scene_surface(), inner.consume_pending_spec())
        };

        let (Some(scene_surface), Some(mut spec)) = (scene_surface, spec) else {
            return;
        };

        // Drop what the surface already shows, or applying it would trigger another round trip
        if spec.application_id.as_deref() == Some(scene_surface.application_id().as_str()) {
            spec.application_id = None;
        }
        if spec.name.as_deref() == Some(scene_surface.name().as_str()) {
            spec.name = None;
        }
        if let Some(parent) = &spec.parent {
            let requested = parent.as_ref().and_then(Weak::upgrade);
            if same_surface(requested.as_ref(), scene_surface.parent().as_ref()) {
                spec.parent = None;
            }
        }

        if !spec.is_empty() {
            self.context
                .shell
                .modify_surface(scene_surface.session().upgrade(), &scene_surface, spec);
        }
    }

    /// Resolve the owner of a transient window into a parent surface
    ///
    /// Falls back to the focused window when the owner has no live surface.
    pub(crate) fn is_transient_for(&self, transient_for: Window) {
        let verbose = self.context.verbose();
        let mut parent = None;

        if transient_for != x11rb::NONE {
            parent = self.scene_surface_of(transient_for);

            if parent.is_none() {
                let focused = self.registry.upgrade().and_then(|registry| registry.focused_window());
                match focused {
                    Some(focused) if focused != self.window() => {
                        if verbose {
                            debug!("Falling back to the currently focused window (0x{:x})", focused);
                        }
                        parent = self.scene_surface_of(focused);
                    }
                    _ => {
                        if verbose {
                            debug!("There is no focused window to fall back to");
                        }
                    }
                }
            }

            if parent.is_none() && verbose {
                debug!("Failed to find a window for 0x{:x} to be transient for", self.window());
            }
        } else if verbose {
            debug!("Window 0x{:x} is not transient", self.window());
        }

        let mut inner = self.inner.lock();
        let top_left = inner.cached.top_left;
        let spec = inner.pending_spec();
        spec.parent = Some(parent.as_ref().map(Arc::downgrade));
        set_position(parent.as_ref(), top_left, spec);
    }

    /// Live surface of another managed window
    fn scene_surface_of(&self, window: Window) -> Option<Arc<dyn SceneSurface>> {
        let verbose = self.context.verbose();
        let Some(other) = self.registry.upgrade().and_then(|registry| registry.get(window)) else {
            if verbose {
                debug!(
                    "0x{:x} can not be transient for 0x{:x}, the latter is not managed",
                    self.window(),
                    window
                );
            }
            return None;
        };

        let scene_surface = other.scene_surface();
        if verbose {
            match &scene_surface {
                Some(_) => debug!("0x{:x} set as transient for 0x{:x}", self.window(), window),
                None => debug!(
                    "0x{:x} can not be transient for 0x{:x}, the latter has no surface",
                    self.window(),
                    window
                ),
            }
        }
        scene_surface
    }

    /// `_NET_WM_MOVERESIZE` direction
    pub fn move_resize(&self, detail: u32) {
        let Some(action) = MoveResize::from_detail(detail) else {
            warn!("Move/resize of window 0x{:x} with unknown detail {}", self.window(), detail);
            return;
        };
        if !action.is_forwarded() {
            info!("Ignoring {:?} move/resize of window 0x{:x}", action, self.window());
            return;
        }
        let Some(scene_surface) = self.scene_surface() else {
            return;
        };

        let timestamp = self.latest_input_timestamp();
        let session = scene_surface.session().upgrade();
        match action {
            MoveResize::Move => self.context.shell.request_move(session, &scene_surface, timestamp),
            MoveResize::Resize(edge) => {
                self.context
                    .shell
                    .request_resize(session, &scene_surface, timestamp, edge)
            }
            _ => {}
        }
    }
}
