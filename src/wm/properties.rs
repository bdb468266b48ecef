//! Property handler registry
//!
//! Maps each watched property atom to a reader and an absence handler.
//! Reading is split in two phases: `read` issues the request and returns a
//! [`Completion`], which decodes the reply and applies it when invoked. Many
//! reads can be issued before any completion runs.

use std::collections::BTreeMap;

use tracing::{debug, warn};
use x11rb::protocol::xproto::{Atom, Window};

use crate::wm::decode::{DecodeProperty, PropertyValue};
use crate::wm::transport::X11Transport;

/// Second phase of a property read, applied to the target it was issued for
pub type Completion<S> = Box<dyn FnOnce(&S) + Send>;

type Reader<S> = Box<dyn Fn(&S) -> Completion<S> + Send + Sync>;

/// Something that owns a window and can read its properties
pub trait PropertyTarget {
    fn transport(&self) -> &dyn X11Transport;
    fn window(&self) -> Window;
}

pub struct PropertyHandlers<S> {
    // Ordered by atom so that reads are applied in a stable order
    handlers: BTreeMap<Atom, Reader<S>>,
}

impl<S> Default for PropertyHandlers<S> {
    fn default() -> Self {
        Self {
            handlers: BTreeMap::new(),
        }
    }
}

impl<S: PropertyTarget + 'static> PropertyHandlers<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Watch `atom`, decoding it as `T`
    pub fn register<T>(&mut self, atom: Atom, on_value: fn(&S, T))
    where
        T: DecodeProperty + Send + 'static,
    {
        self.insert::<T>(atom, on_value, None);
    }

    /// Watch `atom`; `on_absent` runs when the property does not exist or cannot be decoded
    pub fn register_with_absence<T>(&mut self, atom: Atom, on_value: fn(&S, T), on_absent: fn(&S))
    where
        T: DecodeProperty + Send + 'static,
    {
        self.insert::<T>(atom, on_value, Some(on_absent));
    }

    fn insert<T>(&mut self, atom: Atom, on_value: fn(&S, T), on_absent: Option<fn(&S)>)
    where
        T: DecodeProperty + Send + 'static,
    {
        let reader = move |target: &S| -> Completion<S> {
            let window = target.window();
            match target.transport().read_property(window, atom) {
                Ok(pending) => Box::new(move |target: &S| match PropertyValue::<T>::from_reply(pending()) {
                    PropertyValue::Present(value) => on_value(target, value),
                    PropertyValue::Absent => {
                        if let Some(on_absent) = on_absent {
                            on_absent(target);
                        }
                    }
                    PropertyValue::Unreadable(reason) => {
                        warn!("Failed to read property {} of window 0x{:x}: {}", atom, window, reason);
                        if let Some(on_absent) = on_absent {
                            on_absent(target);
                        }
                    }
                }),
                Err(err) => {
                    warn!("Failed to request property {} of window 0x{:x}: {}", atom, window, err);
                    Box::new(|_: &S| {})
                }
            }
        };

        if self.handlers.insert(atom, Box::new(reader)).is_some() {
            debug!("Replaced property handler for atom {}", atom);
        }
    }

    pub fn is_watched(&self, atom: Atom) -> bool {
        self.handlers.contains_key(&atom)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Issue a read of `atom`, if it is watched
    pub fn read(&self, target: &S, atom: Atom) -> Option<Completion<S>> {
        self.handlers.get(&atom).map(|reader| reader(target))
    }

    /// Issue reads of every watched property
    pub fn read_all(&self, target: &S) -> Vec<Completion<S>> {
        self.handlers.values().map(|reader| reader(target)).collect()
    }
}
