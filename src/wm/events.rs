//! Event handlers (shell → X client)
//!
//! Called on the compositor context when the shell reports a change to a
//! surface. Each handler reflects the change back as X properties, configure
//! requests or protocol messages.

use tracing::debug;
use x11rb::protocol::xproto::{EventMask, StackMode};

use crate::shared::{Displacement, Point, Size};
use crate::shell::Presentation;
use crate::wm::surface::XwaylandSurface;
use crate::wm::{configure_aux, log_failure};

impl XwaylandSurface {
    pub fn scene_surface_focus_set(&self, has_focus: bool) {
        if let Some(registry) = self.registry.upgrade() {
            registry.set_focus(self.window(), has_focus);
        }

        // Focus does not imply top of stack, but the real stacking order is not known here
        if self.context.config.raise_on_focus {
            self.restack(StackMode::ABOVE);
        }
    }

    pub fn scene_surface_state_set(&self, presentation: Presentation) {
        let state = self.inner.lock().cached.state.updated_from(presentation);
        self.inform_client_of_window_state(state);

        if matches!(presentation, Presentation::Minimized | Presentation::Hidden) {
            self.restack(StackMode::BELOW);
        }
    }

    pub fn scene_surface_resized(&self, size: Size) {
        let conn = &self.context.connection;
        log_failure(
            self.window(),
            "configure window",
            conn.configure_window(self.window(), &configure_aux(None, Some(size), None)),
        );
        log_failure(self.window(), "flush", conn.flush());
    }

    pub fn scene_surface_moved_to(&self, top_left: Point) {
        let content_offset = self
            .scene_surface()
            .map(|surface| surface.content_offset())
            .unwrap_or(Displacement::default());

        let conn = &self.context.connection;
        log_failure(
            self.window(),
            "configure window",
            conn.configure_window(self.window(), &configure_aux(Some(top_left + content_offset), None, None)),
        );
        log_failure(self.window(), "flush", conn.flush());
    }

    /// Ask the client to close, or disconnect it if it does not understand `WM_DELETE_WINDOW`
    pub fn scene_surface_close_requested(&self) {
        let atoms = self.atoms();
        let delete_window = self.supports_protocol(atoms.wm_delete_window);
        let conn = &self.context.connection;

        if delete_window {
            if self.context.verbose() {
                debug!("Sending WM_DELETE_WINDOW request to 0x{:x}", self.window());
            }
            log_failure(
                self.window(),
                "send WM_DELETE_WINDOW",
                conn.send_client_message(
                    self.window(),
                    EventMask::NO_EVENT,
                    atoms.wm_protocols,
                    [atoms.wm_delete_window, x11rb::CURRENT_TIME, 0, 0, 0],
                ),
            );
        } else {
            if self.context.verbose() {
                debug!("Killing 0x{:x} because it does not support WM_DELETE_WINDOW", self.window());
            }
            log_failure(self.window(), "kill client", conn.kill_client(self.window()));
        }
        log_failure(self.window(), "flush", conn.flush());
    }

    fn restack(&self, stack_mode: StackMode) {
        let conn = &self.context.connection;
        log_failure(
            self.window(),
            "restack window",
            conn.configure_window(self.window(), &configure_aux(None, None, Some(stack_mode))),
        );
        log_failure(self.window(), "flush", conn.flush());
    }
}
