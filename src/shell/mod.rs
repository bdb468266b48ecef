//! Compositor shell contract
//!
//! The compositor side of the bridge: scene surfaces, the sessions that own
//! them, and the shell that creates, modifies and destroys them. The window
//! manager only ever talks to the compositor through these traits.

pub mod specification;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use thiserror::Error;

use crate::shared::{Displacement, Point, Size};
use crate::wm::observer::SurfaceObserver;

pub use specification::{PlacementGravity, PlacementHints, SurfaceCreationParameters, SurfaceKind, SurfaceSpecification};

/// Identity of a scene surface, stable for its lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(pub u64);

impl SurfaceId {
    /// Allocate a process-unique id
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Effective presentation of a shell surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Presentation {
    Unknown,
    Restored,
    Minimized,
    Maximized,
    VertMaximized,
    HorizMaximized,
    Fullscreen,
    Attached,
    Hidden,
}

/// Edge or corner grabbed by an interactive resize
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResizeEdge {
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
}

/// Client connection owning a set of surfaces
#[derive(Debug)]
pub struct Session {
    pub name: String,
    pub pid: Option<u32>,
}

impl Session {
    pub fn new(name: impl Into<String>, pid: Option<u32>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            pid,
        })
    }
}

#[derive(Debug, Error)]
pub enum ShellError {
    #[error("session {0} is no longer alive")]
    SessionGone(String),
    #[error("surface creation rejected: {0}")]
    Rejected(String),
}

/// A live compositor surface. Lifetime is controlled by the shell; the window
/// manager only ever holds it weakly between uses.
pub trait SceneSurface: Send + Sync {
    fn id(&self) -> SurfaceId;
    fn name(&self) -> String;
    fn application_id(&self) -> String;
    fn top_left(&self) -> Point;
    /// Offset from the surface's top-left to its client content (decorations)
    fn content_offset(&self) -> Displacement;
    fn content_size(&self) -> Size;
    fn parent(&self) -> Option<Arc<dyn SceneSurface>>;
    fn state(&self) -> Presentation;
    fn session(&self) -> Weak<Session>;
    /// Stop delivering events to `observer`; the surface must drop its reference
    fn remove_observer(&self, observer: &Arc<SurfaceObserver>);
}

/// Surface management of the compositor
pub trait Shell: Send + Sync {
    /// Create a surface; `observer` is attached before the surface is returned
    fn create_surface(
        &self,
        session: &Arc<Session>,
        params: SurfaceCreationParameters,
        observer: Arc<SurfaceObserver>,
    ) -> Result<Arc<dyn SceneSurface>, ShellError>;

    fn modify_surface(
        &self,
        session: Option<Arc<Session>>,
        surface: &Arc<dyn SceneSurface>,
        spec: SurfaceSpecification,
    );

    fn destroy_surface(&self, session: Option<Arc<Session>>, surface: &Arc<dyn SceneSurface>);

    fn request_move(&self, session: Option<Arc<Session>>, surface: &Arc<dyn SceneSurface>, timestamp: Duration);

    fn request_resize(
        &self,
        session: Option<Arc<Session>>,
        surface: &Arc<dyn SceneSurface>,
        timestamp: Duration,
        edge: ResizeEdge,
    );
}

/// True when both sides refer to the same scene surface (or both to none)
pub fn same_surface(a: Option<&Arc<dyn SceneSurface>>, b: Option<&Arc<dyn SceneSurface>>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.id() == b.id(),
        (None, None) => true,
        _ => false,
    }
}
