//! MoveResize Module
//!
//! Decodes the direction carried by `_NET_WM_MOVERESIZE` client messages.
//! Only pointer-driven moves and the eight edge resizes are forwarded to the
//! shell; keyboard-driven variants and cancel are recognised but dropped.

use crate::shell::ResizeEdge;

/// `_NET_WM_MOVERESIZE` direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveResize {
    /// Resizing window (with direction)
    Resize(ResizeEdge),
    /// Moving window
    Move,
    SizeKeyboard,
    MoveKeyboard,
    Cancel,
}

impl MoveResize {
    pub const SIZE_TOPLEFT: u32 = 0;
    pub const SIZE_TOP: u32 = 1;
    pub const SIZE_TOPRIGHT: u32 = 2;
    pub const SIZE_RIGHT: u32 = 3;
    pub const SIZE_BOTTOMRIGHT: u32 = 4;
    pub const SIZE_BOTTOM: u32 = 5;
    pub const SIZE_BOTTOMLEFT: u32 = 6;
    pub const SIZE_LEFT: u32 = 7;
    pub const MOVE: u32 = 8;
    pub const SIZE_KEYBOARD: u32 = 9;
    pub const MOVE_KEYBOARD: u32 = 10;
    pub const CANCEL: u32 = 11;

    /// Decode the direction field of the message; `None` for values outside the protocol
    pub fn from_detail(detail: u32) -> Option<Self> {
        let action = match detail {
            Self::SIZE_TOPLEFT => Self::Resize(ResizeEdge::NorthWest),
            Self::SIZE_TOP => Self::Resize(ResizeEdge::North),
            Self::SIZE_TOPRIGHT => Self::Resize(ResizeEdge::NorthEast),
            Self::SIZE_RIGHT => Self::Resize(ResizeEdge::East),
            Self::SIZE_BOTTOMRIGHT => Self::Resize(ResizeEdge::SouthEast),
            Self::SIZE_BOTTOM => Self::Resize(ResizeEdge::South),
            Self::SIZE_BOTTOMLEFT => Self::Resize(ResizeEdge::SouthWest),
            Self::SIZE_LEFT => Self::Resize(ResizeEdge::West),
            Self::MOVE => Self::Move,
            Self::SIZE_KEYBOARD => Self::SizeKeyboard,
            Self::MOVE_KEYBOARD => Self::MoveKeyboard,
            Self::CANCEL => Self::Cancel,
            _ => return None,
        };
        Some(action)
    }

    /// Whether the shell is asked to perform this operation
    pub fn is_forwarded(self) -> bool {
        matches!(self, Self::Move | Self::Resize(_))
    }
}
