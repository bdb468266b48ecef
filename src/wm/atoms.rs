//! Interned ICCCM/EWMH atoms used by the XWayland window manager

use anyhow::{Context, Result};
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{Atom, AtomEnum, ConnectionExt as _};

/// Holds all interned atoms
#[derive(Debug, Clone)]
pub struct Atoms {
    // ICCCM, predefined by the core protocol
    pub wm_name: Atom,
    pub wm_class: Atom,
    pub wm_transient_for: Atom,
    // ICCCM
    pub wm_protocols: Atom,
    pub wm_delete_window: Atom,
    pub wm_take_focus: Atom,
    pub wm_state: Atom,
    pub wm_change_state: Atom,
    // EWMH
    pub net_wm_name: Atom,
    pub net_wm_desktop: Atom,
    pub net_active_window: Atom,
    pub net_wm_moveresize: Atom,
    pub net_wm_state: Atom,
    pub net_wm_state_hidden: Atom,
    pub net_wm_state_maximized_horz: Atom,
    pub net_wm_state_maximized_vert: Atom,
    pub net_wm_state_fullscreen: Atom,
    pub utf8_string: Atom,
}

impl Atoms {
    /// Intern all required atoms
    pub fn new<C: Connection>(conn: &C) -> Result<Self> {
        Self::intern_with(|name| {
            let reply = conn
                .intern_atom(false, name.as_bytes())?
                .reply()
                .with_context(|| format!("Failed to intern atom {}", name))?;
            Ok(reply.atom)
        })
    }

    /// Build the table from any name -> atom resolver
    pub fn intern_with(mut intern: impl FnMut(&str) -> Result<Atom>) -> Result<Self> {
        Ok(Self {
            wm_name: AtomEnum::WM_NAME.into(),
            wm_class: AtomEnum::WM_CLASS.into(),
            wm_transient_for: AtomEnum::WM_TRANSIENT_FOR.into(),
            wm_protocols: intern("WM_PROTOCOLS")?,
            wm_delete_window: intern("WM_DELETE_WINDOW")?,
            wm_take_focus: intern("WM_TAKE_FOCUS")?,
            wm_state: intern("WM_STATE")?,
            wm_change_state: intern("WM_CHANGE_STATE")?,
            net_wm_name: intern("_NET_WM_NAME")?,
            net_wm_desktop: intern("_NET_WM_DESKTOP")?,
            net_active_window: intern("_NET_ACTIVE_WINDOW")?,
            net_wm_moveresize: intern("_NET_WM_MOVERESIZE")?,
            net_wm_state: intern("_NET_WM_STATE")?,
            net_wm_state_hidden: intern("_NET_WM_STATE_HIDDEN")?,
            net_wm_state_maximized_horz: intern("_NET_WM_STATE_MAXIMIZED_HORZ")?,
            net_wm_state_maximized_vert: intern("_NET_WM_STATE_MAXIMIZED_VERT")?,
            net_wm_state_fullscreen: intern("_NET_WM_STATE_FULLSCREEN")?,
            utf8_string: intern("UTF8_STRING")?,
        })
    }

    /// Human readable name for diagnostics
    pub fn name_of(&self, atom: Atom) -> String {
        let known = [
            (self.wm_name, "WM_NAME"),
            (self.wm_class, "WM_CLASS"),
            (self.wm_transient_for, "WM_TRANSIENT_FOR"),
            (self.wm_protocols, "WM_PROTOCOLS"),
            (self.wm_delete_window, "WM_DELETE_WINDOW"),
            (self.wm_take_focus, "WM_TAKE_FOCUS"),
            (self.wm_state, "WM_STATE"),
            (self.wm_change_state, "WM_CHANGE_STATE"),
            (self.net_wm_name, "_NET_WM_NAME"),
            (self.net_wm_desktop, "_NET_WM_DESKTOP"),
            (self.net_active_window, "_NET_ACTIVE_WINDOW"),
            (self.net_wm_moveresize, "_NET_WM_MOVERESIZE"),
            (self.net_wm_state, "_NET_WM_STATE"),
            (self.net_wm_state_hidden, "_NET_WM_STATE_HIDDEN"),
            (self.net_wm_state_maximized_horz, "_NET_WM_STATE_MAXIMIZED_HORZ"),
            (self.net_wm_state_maximized_vert, "_NET_WM_STATE_MAXIMIZED_VERT"),
            (self.net_wm_state_fullscreen, "_NET_WM_STATE_FULLSCREEN"),
            (self.utf8_string, "UTF8_STRING"),
        ];

        known
            .iter()
            .find(|(value, _)| *value == atom)
            .map(|(_, name)| (*name).to_string())
            .unwrap_or_else(|| format!("atom {}", atom))
    }
}
