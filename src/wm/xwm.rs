//! Connection-level event routing
//!
//! Feeds X events into the adapter of the window they concern. Errors from a
//! single window are logged and processing continues with the next event.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, error, info, warn};
use x11rb::connection::Connection;
use x11rb::protocol::Event;
use x11rb::protocol::xproto::{ClientMessageEvent, EventMask, Window};
use x11rb::rust_connection::RustConnection;

use crate::config::XwaylandConfig;
use crate::error::{XwmError, fatal_error};
use crate::shell::{Session, Shell};
use crate::wm::dispatch::CompositorQueue;
use crate::wm::registry::WindowRegistry;
use crate::wm::surface::XwaylandSurface;
use crate::wm::transport::{RustConnectionTransport, X11Transport};
use crate::wm::{Atoms, XwmContext};

pub struct XwmEventRouter {
    context: XwmContext,
    registry: Arc<WindowRegistry>,
}

impl XwmEventRouter {
    pub fn new(context: XwmContext, root: Window) -> Self {
        let registry = WindowRegistry::new(root, &context);
        Self { context, registry }
    }

    /// Connect to the X server, intern atoms and take over the root window
    pub fn connect(
        display: Option<&str>,
        shell: Arc<dyn Shell>,
        queue: CompositorQueue,
        config: XwaylandConfig,
    ) -> Result<(Self, Arc<RustConnection>)> {
        let (conn, screen_num) = x11rb::connect(display).context("Failed to connect to X server")?;
        let conn = Arc::new(conn);
        let root = conn
            .setup()
            .roots
            .get(screen_num)
            .map(|screen| screen.root)
            .context("X server reported an invalid default screen")?;
        info!("Connected to X server, screen {} root 0x{:x}", screen_num, root);

        let atoms = Atoms::new(conn.as_ref()).context("Failed to intern atoms")?;
        let transport = RustConnectionTransport::new(Arc::clone(&conn));
        transport
            .select_input(root, EventMask::SUBSTRUCTURE_REDIRECT | EventMask::SUBSTRUCTURE_NOTIFY)
            .context("Failed to select root window events")?;
        transport.flush().context("Failed to flush X connection")?;

        let context = XwmContext {
            connection: Arc::new(transport),
            shell,
            atoms: Arc::new(atoms),
            queue,
            config: Arc::new(config),
        };
        Ok((Self::new(context, root), conn))
    }

    pub fn registry(&self) -> &Arc<WindowRegistry> {
        &self.registry
    }

    pub fn context(&self) -> &XwmContext {
        &self.context
    }

    /// Process events until the connection fails
    pub fn run(&self, conn: &RustConnection) -> Result<()> {
        loop {
            let event = conn.wait_for_event().context("Failed to read X event")?;
            self.handle_event(&event);
        }
    }

    pub fn handle_event(&self, event: &Event) {
        if let Err(err) = self.dispatch(event) {
            if err.is_invariant_violation() {
                error!("{}", err);
            } else {
                warn!("{}", err);
            }
        }
    }

    /// Client content was bound to `window`
    pub fn attach_content(&self, window: Window, session: Arc<Session>) -> crate::error::Result<()> {
        match self.registry.get(window) {
            Some(surface) => match surface.attach_wl_surface(session) {
                Err(err) if err.is_invariant_violation() => {
                    if cfg!(debug_assertions) {
                        fatal_error!("{}", err);
                    }
                    error!("{}", err);
                    Err(err)
                }
                result => result,
            },
            None => {
                warn!("Content attached to unmanaged window 0x{:x}", window);
                Ok(())
            }
        }
    }

    /// Client content bound to `window` was destroyed
    pub fn content_destroyed(&self, window: Window) {
        if let Some(surface) = self.registry.get(window) {
            surface.wl_surface_destroyed();
        }
    }

    fn dispatch(&self, event: &Event) -> crate::error::Result<()> {
        match event {
            Event::CreateNotify(event) => {
                let surface = XwaylandSurface::new(self.context.clone(), &self.registry, event);
                if let Some(previous) = self.registry.insert(surface) {
                    previous.close();
                }
            }
            Event::DestroyNotify(event) => {
                if let Some(surface) = self.registry.remove(event.window) {
                    surface.close();
                }
            }
            Event::MapRequest(event) => {
                if let Some(surface) = self.registry.get(event.window) {
                    surface.map();
                }
            }
            Event::ConfigureRequest(event) => {
                if let Some(surface) = self.registry.get(event.window) {
                    surface.configure_request(event);
                }
            }
            Event::ConfigureNotify(event) => {
                if let Some(surface) = self.registry.get(event.window) {
                    surface.configure_notify(event);
                }
            }
            Event::PropertyNotify(event) => {
                if let Some(surface) = self.registry.get(event.window) {
                    surface.property_notify(event.atom);
                }
            }
            Event::ClientMessage(event) => self.client_message(event)?,
            Event::Error(err) => debug!("X error: {:?}", err),
            _ => {}
        }
        Ok(())
    }

    fn client_message(&self, event: &ClientMessageEvent) -> crate::error::Result<()> {
        let Some(surface) = self.registry.get(event.window) else {
            return Ok(());
        };

        if event.format != 32 {
            return Err(XwmError::protocol(
                event.window,
                format!("client message with format {}", event.format),
            ));
        }

        let atoms = &self.context.atoms;
        let data = event.data.as_data32();
        if event.type_ == atoms.net_wm_state {
            surface.net_wm_state_client_message(data)
        } else if event.type_ == atoms.wm_change_state {
            surface.wm_change_state_client_message(data)
        } else if event.type_ == atoms.net_wm_moveresize {
            // [x_root, y_root, direction, button, source]
            surface.move_resize(data[2]);
            Ok(())
        } else {
            debug!(
                "Unhandled client message {} for window 0x{:x}",
                atoms.name_of(event.type_),
                event.window
            );
            Ok(())
        }
    }
}
