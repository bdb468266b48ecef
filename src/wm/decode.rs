//! Typed decoding of property replies
//!
//! Every read ends in one of three outcomes: the property exists and decodes
//! to the expected type, it exists but cannot be decoded (wrong type or
//! format, or the read itself failed), or it does not exist at all.

use x11rb::errors::ReplyError;
use x11rb::protocol::xproto::{Atom, AtomEnum, GetPropertyReply, Window};

/// Outcome of reading a property
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue<T> {
    Present(T),
    Unreadable(String),
    Absent,
}

impl<T: DecodeProperty> PropertyValue<T> {
    /// Decode the result of a property read
    pub fn from_reply(reply: Result<GetPropertyReply, ReplyError>) -> Self {
        match reply {
            Err(err) => PropertyValue::Unreadable(err.to_string()),
            Ok(reply) if reply.type_ == x11rb::NONE => PropertyValue::Absent,
            Ok(reply) => match T::decode(&reply) {
                Some(value) => PropertyValue::Present(value),
                None => PropertyValue::Unreadable(format!(
                    "unexpected format {} ({} bytes) for type {}",
                    reply.format,
                    reply.value.len(),
                    reply.type_
                )),
            },
        }
    }
}

/// Conversion from a raw property reply
pub trait DecodeProperty: Sized {
    fn decode(reply: &GetPropertyReply) -> Option<Self>;
}

/// Text of a property of type `type_`. `STRING` is ISO-8859-1, anything else is taken as UTF-8.
fn decode_text(type_: Atom, bytes: &[u8]) -> String {
    if type_ == u32::from(AtomEnum::STRING) {
        bytes.iter().map(|&b| char::from(b)).collect()
    } else {
        String::from_utf8_lossy(bytes).into_owned()
    }
}

/// `STRING` / `UTF8_STRING` text, trailing NULs stripped
impl DecodeProperty for String {
    fn decode(reply: &GetPropertyReply) -> Option<Self> {
        if reply.format != 8 {
            return None;
        }
        let text = decode_text(reply.type_, &reply.value);
        Some(text.trim_end_matches('\0').to_string())
    }
}

/// `WM_CLASS`: `instance\0class\0`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WmClass {
    pub instance: String,
    pub class: String,
}

impl WmClass {
    /// Application identity; falls back to the instance name when no class is given
    pub fn application_id(&self) -> &str {
        if self.class.is_empty() { &self.instance } else { &self.class }
    }
}

impl DecodeProperty for WmClass {
    fn decode(reply: &GetPropertyReply) -> Option<Self> {
        if reply.format != 8 {
            return None;
        }
        let mut parts = reply.value.split(|&b| b == 0);
        let instance = decode_text(reply.type_, parts.next().unwrap_or_default());
        let class = decode_text(reply.type_, parts.next().unwrap_or_default());
        Some(Self { instance, class })
    }
}

/// `WM_TRANSIENT_FOR`: a single window id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransientFor(pub Window);

impl DecodeProperty for TransientFor {
    fn decode(reply: &GetPropertyReply) -> Option<Self> {
        reply.value32()?.next().map(TransientFor)
    }
}

/// Any list of atoms (`WM_PROTOCOLS`, `_NET_WM_STATE`)
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AtomList(pub Vec<Atom>);

impl DecodeProperty for AtomList {
    fn decode(reply: &GetPropertyReply) -> Option<Self> {
        Some(AtomList(reply.value32()?.collect()))
    }
}
