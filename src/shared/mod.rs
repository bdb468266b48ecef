//! Types shared between the X11 side and the compositor side of the bridge.

pub mod geometry;

pub use geometry::{Displacement, Point, Rectangle, Size};
