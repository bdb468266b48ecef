//! X11 property transport
//!
//! The window manager never talks to the X server directly. Everything goes
//! through [`X11Transport`], which exposes the request/completion split of
//! the X protocol: `read_property` only issues the request, and the returned
//! [`PropertyCompletion`] blocks for the reply when it is finally invoked.
//! This lets callers fan out many reads before waiting on any of them.

use std::sync::Arc;

use x11rb::CURRENT_TIME;
use x11rb::connection::{Connection, DiscardMode, RequestConnection, RequestKind, SequenceNumber};
use x11rb::cookie::Cookie;
use x11rb::errors::{ConnectionError, ReplyError};
use x11rb::protocol::xproto::{
    Atom, AtomEnum, ChangeWindowAttributesAux, ClientMessageEvent, ConfigureWindowAux, ConnectionExt as _,
    EventMask, GetPropertyReply, InputFocus, PropMode, Window,
};
use x11rb::rust_connection::RustConnection;
use x11rb::wrapper::ConnectionExt as _;
use x11rb::x11_utils::TryParse;

/// Maximum property length read in one request (in 32-bit units)
pub const PROPERTY_READ_LENGTH: u32 = 2048;

/// Second half of an asynchronous property read
pub type PropertyCompletion = Box<dyn FnOnce() -> Result<GetPropertyReply, ReplyError> + Send>;

/// Operations the window manager needs from the X connection
pub trait X11Transport: Send + Sync {
    /// Issue a read of `property` on `window`; the reply is collected by the completion
    fn read_property(&self, window: Window, property: Atom) -> Result<PropertyCompletion, ConnectionError>;

    fn set_property32(&self, window: Window, property: Atom, type_: Atom, data: &[u32]) -> Result<(), ConnectionError>;

    fn delete_property(&self, window: Window, property: Atom) -> Result<(), ConnectionError>;

    /// Send a format-32 client message of `message_type` to `window`
    fn send_client_message(
        &self,
        window: Window,
        event_mask: EventMask,
        message_type: Atom,
        data: [u32; 5],
    ) -> Result<(), ConnectionError>;

    fn configure_window(&self, window: Window, aux: &ConfigureWindowAux) -> Result<(), ConnectionError>;

    fn select_input(&self, window: Window, event_mask: EventMask) -> Result<(), ConnectionError>;

    fn map_window(&self, window: Window) -> Result<(), ConnectionError>;

    fn unmap_window(&self, window: Window) -> Result<(), ConnectionError>;

    fn kill_client(&self, window: Window) -> Result<(), ConnectionError>;

    fn set_input_focus(&self, window: Window) -> Result<(), ConnectionError>;

    fn flush(&self) -> Result<(), ConnectionError>;
}

/// [`X11Transport`] over an x11rb [`RustConnection`]
pub struct RustConnectionTransport {
    conn: Arc<RustConnection>,
}

impl RustConnectionTransport {
    pub fn new(conn: Arc<RustConnection>) -> Self {
        Self { conn }
    }
}

/// Outstanding `GetProperty` request. The reply is discarded if it is never waited on.
struct PendingPropertyReply {
    conn: Arc<RustConnection>,
    sequence: Option<SequenceNumber>,
}

impl PendingPropertyReply {
    fn wait(mut self) -> Result<GetPropertyReply, ReplyError> {
        let Some(sequence) = self.sequence.take() else {
            return Err(ConnectionError::UnknownError.into());
        };
        let buf = self.conn.wait_for_reply_or_error(sequence)?;
        let (reply, _) = GetPropertyReply::try_parse(&buf[..]).map_err(ConnectionError::from)?;
        Ok(reply)
    }
}

impl Drop for PendingPropertyReply {
    fn drop(&mut self) {
        if let Some(sequence) = self.sequence.take() {
            self.conn
                .discard_reply(sequence, RequestKind::HasResponse, DiscardMode::DiscardReplyAndError);
        }
    }
}

/// Detach a cookie from its borrow of the connection
fn into_sequence<R: TryParse>(cookie: Cookie<'_, RustConnection, R>) -> SequenceNumber {
    let sequence = cookie.sequence_number();
    // The pending reply takes over responsibility for discarding
    std::mem::forget(cookie);
    sequence
}

impl X11Transport for RustConnectionTransport {
    fn read_property(&self, window: Window, property: Atom) -> Result<PropertyCompletion, ConnectionError> {
        let cookie = self
            .conn
            .as_ref()
            .get_property(false, window, property, AtomEnum::ANY, 0, PROPERTY_READ_LENGTH)?;
        let pending = PendingPropertyReply {
            conn: Arc::clone(&self.conn),
            sequence: Some(into_sequence(cookie)),
        };
        Ok(Box::new(move || pending.wait()))
    }

    fn set_property32(&self, window: Window, property: Atom, type_: Atom, data: &[u32]) -> Result<(), ConnectionError> {
        self.conn
            .change_property32(PropMode::REPLACE, window, property, type_, data)?;
        Ok(())
    }

    fn delete_property(&self, window: Window, property: Atom) -> Result<(), ConnectionError> {
        self.conn.delete_property(window, property)?;
        Ok(())
    }

    fn send_client_message(
        &self,
        window: Window,
        event_mask: EventMask,
        message_type: Atom,
        data: [u32; 5],
    ) -> Result<(), ConnectionError> {
        let event = ClientMessageEvent::new(32, window, message_type, data);
        self.conn.send_event(false, window, event_mask, event)?;
        Ok(())
    }

    fn configure_window(&self, window: Window, aux: &ConfigureWindowAux) -> Result<(), ConnectionError> {
        self.conn.configure_window(window, aux)?;
        Ok(())
    }

    fn select_input(&self, window: Window, event_mask: EventMask) -> Result<(), ConnectionError> {
        self.conn
            .change_window_attributes(window, &ChangeWindowAttributesAux::new().event_mask(event_mask))?;
        Ok(())
    }

    fn map_window(&self, window: Window) -> Result<(), ConnectionError> {
        self.conn.map_window(window)?;
        Ok(())
    }

    fn unmap_window(&self, window: Window) -> Result<(), ConnectionError> {
        self.conn.unmap_window(window)?;
        Ok(())
    }

    fn kill_client(&self, window: Window) -> Result<(), ConnectionError> {
        self.conn.kill_client(window)?;
        Ok(())
    }

    fn set_input_focus(&self, window: Window) -> Result<(), ConnectionError> {
        self.conn
            .set_input_focus(InputFocus::POINTER_ROOT, window, CURRENT_TIME)?;
        Ok(())
    }

    fn flush(&self) -> Result<(), ConnectionError> {
        Connection::flush(self.conn.as_ref())
    }
}
