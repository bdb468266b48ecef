//! Surface specifications
//!
//! A `SurfaceSpecification` is a sparse set of modifications: every `None`
//! field is left alone by the shell. `SurfaceCreationParameters` is the
//! complete description a new surface is built from.

use std::sync::{Arc, Weak};

use bitflags::bitflags;

use super::{Presentation, SceneSurface};
use crate::shared::{Point, Rectangle, Size};

bitflags! {
    /// How the shell may adjust a child placement that does not fit
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct PlacementHints: u32 {
        const FLIP_X    = 1 << 0;
        const FLIP_Y    = 1 << 1;
        const SLIDE_X   = 1 << 2;
        const SLIDE_Y   = 1 << 3;
        const RESIZE_X  = 1 << 4;
        const RESIZE_Y  = 1 << 5;
        const ANTIPODES = 1 << 6;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlacementGravity {
    Center,
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceKind {
    Normal,
    /// Placement and decoration are driven by the client (X11 windows)
    Freestyle,
}

/// Pending modification of a shell surface
#[derive(Clone, Default)]
pub struct SurfaceSpecification {
    pub name: Option<String>,
    pub application_id: Option<String>,
    /// `Some(None)` explicitly clears the parent
    pub parent: Option<Option<Weak<dyn SceneSurface>>>,
    pub top_left: Option<Point>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub aux_rect: Option<Rectangle>,
    pub placement_hints: Option<PlacementHints>,
    pub surface_placement_gravity: Option<PlacementGravity>,
    pub aux_rect_placement_gravity: Option<PlacementGravity>,
    pub state: Option<Presentation>,
}

impl SurfaceSpecification {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.application_id.is_none()
            && self.parent.is_none()
            && self.top_left.is_none()
            && self.width.is_none()
            && self.height.is_none()
            && self.aux_rect.is_none()
            && self.placement_hints.is_none()
            && self.surface_placement_gravity.is_none()
            && self.aux_rect_placement_gravity.is_none()
            && self.state.is_none()
    }

    /// Resolved parent, if one is set and still alive
    pub fn parent_surface(&self) -> Option<Arc<dyn SceneSurface>> {
        self.parent.as_ref()?.as_ref()?.upgrade()
    }
}

impl std::fmt::Debug for SurfaceSpecification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SurfaceSpecification")
            .field("name", &self.name)
            .field("application_id", &self.application_id)
            .field("parent", &self.parent.as_ref().map(|_| self.parent_surface().map(|p| p.id())))
            .field("top_left", &self.top_left)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("aux_rect", &self.aux_rect)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// Full description of a surface to be created
#[derive(Clone)]
pub struct SurfaceCreationParameters {
    pub name: String,
    pub application_id: String,
    pub parent: Option<Weak<dyn SceneSurface>>,
    pub top_left: Point,
    pub size: Size,
    pub aux_rect: Option<Rectangle>,
    pub placement_hints: Option<PlacementHints>,
    pub surface_placement_gravity: Option<PlacementGravity>,
    pub aux_rect_placement_gravity: Option<PlacementGravity>,
    pub kind: SurfaceKind,
    pub state: Presentation,
    pub server_side_decorated: bool,
}

impl SurfaceCreationParameters {
    pub fn new(top_left: Point, size: Size) -> Self {
        Self {
            name: String::new(),
            application_id: String::new(),
            parent: None,
            top_left,
            size,
            aux_rect: None,
            placement_hints: None,
            surface_placement_gravity: None,
            aux_rect_placement_gravity: None,
            kind: SurfaceKind::Normal,
            state: Presentation::Restored,
            server_side_decorated: true,
        }
    }

    /// Apply every field set in `spec`
    pub fn update_from(&mut self, spec: SurfaceSpecification) {
        if let Some(name) = spec.name {
            self.name = name;
        }
        if let Some(application_id) = spec.application_id {
            self.application_id = application_id;
        }
        if let Some(parent) = spec.parent {
            self.parent = parent;
        }
        if let Some(top_left) = spec.top_left {
            self.top_left = top_left;
        }
        if let Some(width) = spec.width {
            self.size.width = width;
        }
        if let Some(height) = spec.height {
            self.size.height = height;
        }
        if spec.aux_rect.is_some() {
            self.aux_rect = spec.aux_rect;
        }
        if spec.placement_hints.is_some() {
            self.placement_hints = spec.placement_hints;
        }
        if spec.surface_placement_gravity.is_some() {
            self.surface_placement_gravity = spec.surface_placement_gravity;
        }
        if spec.aux_rect_placement_gravity.is_some() {
            self.aux_rect_placement_gravity = spec.aux_rect_placement_gravity;
        }
        if let Some(state) = spec.state {
            self.state = state;
        }
    }

    pub fn parent_surface(&self) -> Option<Arc<dyn SceneSurface>> {
        self.parent.as_ref()?.upgrade()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_specification() {
        let mut spec = SurfaceSpecification::default();
        assert!(spec.is_empty());

        spec.parent = Some(None);
        assert!(!spec.is_empty());
        assert!(spec.parent_surface().is_none());
    }

    #[test]
    fn test_update_from_only_touches_set_fields() {
        let mut params = SurfaceCreationParameters::new(Point::new(10, 20), Size::new(640, 480));
        params.name = "xterm".into();

        params.update_from(SurfaceSpecification {
            application_id: Some("XTerm".into()),
            width: Some(800),
            ..Default::default()
        });

        assert_eq!(params.name, "xterm");
        assert_eq!(params.application_id, "XTerm");
        assert_eq!(params.size, Size::new(800, 480));
        assert_eq!(params.top_left, Point::new(10, 20));
    }
}
