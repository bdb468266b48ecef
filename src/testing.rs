//! In-memory collaborators for unit tests
//!
//! `RecordingTransport` stands in for the X connection: it keeps a property
//! store and records every request. `FakeShell` stands in for the compositor
//! and records every surface operation.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use x11rb::errors::{ConnectionError, ReplyError};
use x11rb::protocol::xproto::{
    Atom, AtomEnum, ConfigWindow, ConfigureNotifyEvent, ConfigureRequestEvent, ConfigureWindowAux,
    CreateNotifyEvent, EventMask, GetPropertyReply, StackMode, Window,
};

use crate::config::XwaylandConfig;
use crate::shared::{Displacement, Point, Size};
use crate::shell::{
    Presentation, ResizeEdge, SceneSurface, Session, Shell, ShellError, SurfaceCreationParameters, SurfaceId,
    SurfaceSpecification,
};
use crate::wm::dispatch::{CompositorQueueRunner, compositor_queue};
use crate::wm::observer::SurfaceObserver;
use crate::wm::registry::WindowRegistry;
use crate::wm::surface::XwaylandSurface;
use crate::wm::transport::{PropertyCompletion, X11Transport};
use crate::wm::{Atoms, XwmContext};

pub const ROOT: Window = 0x1;

/// Atom table with interned atoms numbered from 100
pub fn test_atoms() -> Atoms {
    let mut next = 100;
    Atoms::intern_with(|_| {
        next += 1;
        Ok(next)
    })
    .expect("interning never fails")
}

pub fn property_reply(type_: Atom, format: u8, value: Vec<u8>) -> GetPropertyReply {
    let value_len = match format {
        8 | 16 | 32 => (value.len() / usize::from(format / 8)) as u32,
        _ => 0,
    };
    GetPropertyReply {
        format,
        sequence: 0,
        length: 0,
        type_,
        bytes_after: 0,
        value_len,
        value,
    }
}

pub fn create_notify(window: Window, x: i16, y: i16, width: u16, height: u16, override_redirect: bool) -> CreateNotifyEvent {
    CreateNotifyEvent {
        response_type: 16,
        sequence: 0,
        parent: ROOT,
        window,
        x,
        y,
        width,
        height,
        border_width: 0,
        override_redirect,
    }
}

pub fn configure_request(
    window: Window,
    value_mask: ConfigWindow,
    x: i16,
    y: i16,
    width: u16,
    height: u16,
) -> ConfigureRequestEvent {
    ConfigureRequestEvent {
        response_type: 23,
        stack_mode: StackMode::ABOVE,
        sequence: 0,
        parent: ROOT,
        window,
        sibling: x11rb::NONE,
        x,
        y,
        width,
        height,
        border_width: 0,
        value_mask,
    }
}

pub fn configure_notify(
    window: Window,
    x: i16,
    y: i16,
    width: u16,
    height: u16,
    override_redirect: bool,
) -> ConfigureNotifyEvent {
    ConfigureNotifyEvent {
        response_type: 22,
        sequence: 0,
        event: window,
        window,
        above_sibling: x11rb::NONE,
        x,
        y,
        width,
        height,
        border_width: 0,
        override_redirect,
    }
}

/// A request sent to the X server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XRequest {
    SetProperty {
        window: Window,
        property: Atom,
        data: Vec<u32>,
    },
    DeleteProperty {
        window: Window,
        property: Atom,
    },
    ClientMessage {
        window: Window,
        event_mask: EventMask,
        message_type: Atom,
        data: [u32; 5],
    },
    Configure {
        window: Window,
        x: Option<i32>,
        y: Option<i32>,
        width: Option<u32>,
        height: Option<u32>,
        stack_mode: Option<StackMode>,
    },
    SelectInput {
        window: Window,
        event_mask: EventMask,
    },
    Map(Window),
    Unmap(Window),
    Kill(Window),
    SetInputFocus(Window),
    Flush,
}

#[derive(Debug, Clone)]
struct StoredProperty {
    type_: Atom,
    format: u8,
    value: Vec<u8>,
}

#[derive(Default)]
pub struct RecordingTransport {
    requests: Mutex<Vec<XRequest>>,
    reads: Mutex<Vec<(Window, Atom)>>,
    properties: Mutex<HashMap<(Window, Atom), StoredProperty>>,
    failing: Mutex<HashSet<Atom>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requests(&self) -> Vec<XRequest> {
        self.requests.lock().clone()
    }

    pub fn take_requests(&self) -> Vec<XRequest> {
        std::mem::take(&mut *self.requests.lock())
    }

    pub fn reads(&self) -> Vec<(Window, Atom)> {
        self.reads.lock().clone()
    }

    fn store(&self, window: Window, property: Atom, type_: Atom, format: u8, value: Vec<u8>) {
        self.properties
            .lock()
            .insert((window, property), StoredProperty { type_, format, value });
    }

    /// Client-side write of a text property
    pub fn set_string(&self, window: Window, property: Atom, value: &str) {
        self.store(window, property, AtomEnum::STRING.into(), 8, value.as_bytes().to_vec());
    }

    pub fn set_atoms(&self, window: Window, property: Atom, atoms: &[Atom]) {
        let value = atoms.iter().flat_map(|atom| atom.to_ne_bytes()).collect();
        self.store(window, property, AtomEnum::ATOM.into(), 32, value);
    }

    pub fn set_window(&self, window: Window, property: Atom, value: Window) {
        self.store(window, property, AtomEnum::WINDOW.into(), 32, value.to_ne_bytes().to_vec());
    }

    pub fn remove_property(&self, window: Window, property: Atom) {
        self.properties.lock().remove(&(window, property));
    }

    /// Make every later read of `property` fail
    pub fn fail_reads_of(&self, property: Atom) {
        self.failing.lock().insert(property);
    }

    pub fn property32(&self, window: Window, property: Atom) -> Option<Vec<u32>> {
        let properties = self.properties.lock();
        let stored = properties.get(&(window, property))?;
        if stored.format != 32 {
            return None;
        }
        Some(
            stored
                .value
                .chunks_exact(4)
                .map(|chunk| u32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
                .collect(),
        )
    }

    fn record(&self, request: XRequest) -> Result<(), ConnectionError> {
        self.requests.lock().push(request);
        Ok(())
    }
}

impl X11Transport for RecordingTransport {
    fn read_property(&self, window: Window, property: Atom) -> Result<PropertyCompletion, ConnectionError> {
        self.reads.lock().push((window, property));

        let reply: Result<GetPropertyReply, ReplyError> = if self.failing.lock().contains(&property) {
            Err(ConnectionError::UnknownError.into())
        } else {
            Ok(match self.properties.lock().get(&(window, property)) {
                Some(stored) => property_reply(stored.type_, stored.format, stored.value.clone()),
                None => property_reply(x11rb::NONE, 0, Vec::new()),
            })
        };
        Ok(Box::new(move || reply))
    }

    fn set_property32(&self, window: Window, property: Atom, type_: Atom, data: &[u32]) -> Result<(), ConnectionError> {
        let value = data.iter().flat_map(|v| v.to_ne_bytes()).collect();
        self.store(window, property, type_, 32, value);
        self.record(XRequest::SetProperty {
            window,
            property,
            data: data.to_vec(),
        })
    }

    fn delete_property(&self, window: Window, property: Atom) -> Result<(), ConnectionError> {
        self.remove_property(window, property);
        self.record(XRequest::DeleteProperty { window, property })
    }

    fn send_client_message(
        &self,
        window: Window,
        event_mask: EventMask,
        message_type: Atom,
        data: [u32; 5],
    ) -> Result<(), ConnectionError> {
        self.record(XRequest::ClientMessage {
            window,
            event_mask,
            message_type,
            data,
        })
    }

    fn configure_window(&self, window: Window, aux: &ConfigureWindowAux) -> Result<(), ConnectionError> {
        self.record(XRequest::Configure {
            window,
            x: aux.x,
            y: aux.y,
            width: aux.width,
            height: aux.height,
            stack_mode: aux.stack_mode,
        })
    }

    fn select_input(&self, window: Window, event_mask: EventMask) -> Result<(), ConnectionError> {
        self.record(XRequest::SelectInput { window, event_mask })
    }

    fn map_window(&self, window: Window) -> Result<(), ConnectionError> {
        self.record(XRequest::Map(window))
    }

    fn unmap_window(&self, window: Window) -> Result<(), ConnectionError> {
        self.record(XRequest::Unmap(window))
    }

    fn kill_client(&self, window: Window) -> Result<(), ConnectionError> {
        self.record(XRequest::Kill(window))
    }

    fn set_input_focus(&self, window: Window) -> Result<(), ConnectionError> {
        self.record(XRequest::SetInputFocus(window))
    }

    fn flush(&self) -> Result<(), ConnectionError> {
        self.record(XRequest::Flush)
    }
}

/// A surface operation requested from the shell
#[derive(Debug, Clone)]
pub enum ShellCall {
    Create {
        name: String,
        application_id: String,
        parent: Option<SurfaceId>,
        top_left: Point,
        size: Size,
        state: Presentation,
    },
    Modify {
        surface: SurfaceId,
        spec: SurfaceSpecification,
    },
    Destroy(SurfaceId),
    Move {
        surface: SurfaceId,
        timestamp: Duration,
    },
    Resize {
        surface: SurfaceId,
        timestamp: Duration,
        edge: ResizeEdge,
    },
}

struct FakeSurfaceState {
    name: String,
    application_id: String,
    top_left: Point,
    content_offset: Displacement,
    size: Size,
    state: Presentation,
}

pub struct FakeSceneSurface {
    id: SurfaceId,
    session: Weak<Session>,
    parent: Option<Arc<dyn SceneSurface>>,
    state: Mutex<FakeSurfaceState>,
    observers: Mutex<Vec<Arc<SurfaceObserver>>>,
}

impl FakeSceneSurface {
    pub fn observers(&self) -> Vec<Arc<SurfaceObserver>> {
        self.observers.lock().clone()
    }

    pub fn set_content_offset(&self, dx: i32, dy: i32) {
        self.state.lock().content_offset = Displacement::new(dx, dy);
    }

    fn apply(&self, spec: &SurfaceSpecification) {
        let mut state = self.state.lock();
        if let Some(name) = &spec.name {
            state.name = name.clone();
        }
        if let Some(application_id) = &spec.application_id {
            state.application_id = application_id.clone();
        }
        if let Some(top_left) = spec.top_left {
            state.top_left = top_left;
        }
        if let Some(width) = spec.width {
            state.size.width = width;
        }
        if let Some(height) = spec.height {
            state.size.height = height;
        }
        if let Some(presentation) = spec.state {
            state.state = presentation;
        }
    }
}

impl SceneSurface for FakeSceneSurface {
    fn id(&self) -> SurfaceId {
        self.id
    }

    fn name(&self) -> String {
        self.state.lock().name.clone()
    }

    fn application_id(&self) -> String {
        self.state.lock().application_id.clone()
    }

    fn top_left(&self) -> Point {
        self.state.lock().top_left
    }

    fn content_offset(&self) -> Displacement {
        self.state.lock().content_offset
    }

    fn content_size(&self) -> Size {
        self.state.lock().size
    }

    fn parent(&self) -> Option<Arc<dyn SceneSurface>> {
        self.parent.clone()
    }

    fn state(&self) -> Presentation {
        self.state.lock().state
    }

    fn session(&self) -> Weak<Session> {
        self.session.clone()
    }

    fn remove_observer(&self, observer: &Arc<SurfaceObserver>) {
        self.observers.lock().retain(|held| !Arc::ptr_eq(held, observer));
    }
}

#[derive(Default)]
pub struct FakeShell {
    calls: Mutex<Vec<ShellCall>>,
    params: Mutex<Vec<SurfaceCreationParameters>>,
    surfaces: Mutex<Vec<Arc<FakeSceneSurface>>>,
    leaked: Mutex<Vec<Arc<SurfaceObserver>>>,
}

impl FakeShell {
    pub fn calls(&self) -> Vec<ShellCall> {
        self.calls.lock().clone()
    }

    pub fn last_params(&self) -> SurfaceCreationParameters {
        self.params.lock().last().cloned().expect("no surface created")
    }

    pub fn last_surface(&self) -> Arc<FakeSceneSurface> {
        self.surfaces.lock().last().cloned().expect("no surface created")
    }

    /// Hold on to every current observer forever
    pub fn leak_observers(&self) {
        let observers: Vec<_> = self.surfaces.lock().iter().flat_map(|s| s.observers()).collect();
        self.leaked.lock().extend(observers);
    }

    fn find(&self, id: SurfaceId) -> Option<Arc<FakeSceneSurface>> {
        self.surfaces.lock().iter().find(|s| s.id == id).cloned()
    }
}

impl Shell for FakeShell {
    fn create_surface(
        &self,
        session: &Arc<Session>,
        params: SurfaceCreationParameters,
        observer: Arc<SurfaceObserver>,
    ) -> Result<Arc<dyn SceneSurface>, ShellError> {
        let parent = params.parent_surface();
        let fake = Arc::new(FakeSceneSurface {
            id: SurfaceId::next(),
            session: Arc::downgrade(session),
            parent: parent.clone(),
            state: Mutex::new(FakeSurfaceState {
                name: params.name.clone(),
                application_id: params.application_id.clone(),
                top_left: params.top_left,
                content_offset: Displacement::default(),
                size: params.size,
                state: params.state,
            }),
            observers: Mutex::new(vec![observer]),
        });

        self.calls.lock().push(ShellCall::Create {
            name: params.name.clone(),
            application_id: params.application_id.clone(),
            parent: parent.map(|p| p.id()),
            top_left: params.top_left,
            size: params.size,
            state: params.state,
        });
        self.params.lock().push(params);
        self.surfaces.lock().push(Arc::clone(&fake));

        let surface: Arc<dyn SceneSurface> = fake;
        Ok(surface)
    }

    fn modify_surface(&self, _session: Option<Arc<Session>>, surface: &Arc<dyn SceneSurface>, spec: SurfaceSpecification) {
        if let Some(fake) = self.find(surface.id()) {
            fake.apply(&spec);
        }
        self.calls.lock().push(ShellCall::Modify {
            surface: surface.id(),
            spec,
        });
    }

    fn destroy_surface(&self, _session: Option<Arc<Session>>, surface: &Arc<dyn SceneSurface>) {
        self.calls.lock().push(ShellCall::Destroy(surface.id()));
    }

    fn request_move(&self, _session: Option<Arc<Session>>, surface: &Arc<dyn SceneSurface>, timestamp: Duration) {
        self.calls.lock().push(ShellCall::Move {
            surface: surface.id(),
            timestamp,
        });
    }

    fn request_resize(
        &self,
        _session: Option<Arc<Session>>,
        surface: &Arc<dyn SceneSurface>,
        timestamp: Duration,
        edge: ResizeEdge,
    ) {
        self.calls.lock().push(ShellCall::Resize {
            surface: surface.id(),
            timestamp,
            edge,
        });
    }
}

/// Adapter environment wired to the fakes
pub struct Harness {
    pub transport: Arc<RecordingTransport>,
    pub shell: Arc<FakeShell>,
    pub atoms: Arc<Atoms>,
    pub context: XwmContext,
    pub registry: Arc<WindowRegistry>,
    pub runner: CompositorQueueRunner,
    pub session: Arc<Session>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(XwaylandConfig::default())
    }

    pub fn with_config(config: XwaylandConfig) -> Self {
        let transport = Arc::new(RecordingTransport::new());
        let shell = Arc::new(FakeShell::default());
        let atoms = Arc::new(test_atoms());
        let (queue, runner) = compositor_queue();

        let context = XwmContext {
            connection: transport.clone(),
            shell: shell.clone(),
            atoms: Arc::clone(&atoms),
            queue,
            config: Arc::new(config),
        };
        let registry = WindowRegistry::new(ROOT, &context);

        Self {
            transport,
            shell,
            atoms,
            context,
            registry,
            runner,
            session: Session::new("test-client", Some(4242)),
        }
    }

    /// Create and register an adapter
    pub fn create_window(&self, window: Window, x: i16, y: i16, width: u16, height: u16) -> Arc<XwaylandSurface> {
        self.create(create_notify(window, x, y, width, height, false))
    }

    pub fn create_override_redirect(&self, window: Window, x: i16, y: i16, width: u16, height: u16) -> Arc<XwaylandSurface> {
        self.create(create_notify(window, x, y, width, height, true))
    }

    fn create(&self, event: CreateNotifyEvent) -> Arc<XwaylandSurface> {
        let surface = XwaylandSurface::new(self.context.clone(), &self.registry, &event);
        self.registry.insert(Arc::clone(&surface));
        surface
    }

    /// Attach content and return the shell surface created for it
    pub fn attach(&self, surface: &Arc<XwaylandSurface>) -> Arc<FakeSceneSurface> {
        surface
            .attach_wl_surface(Arc::clone(&self.session))
            .expect("attach should succeed");
        self.shell.last_surface()
    }
}
