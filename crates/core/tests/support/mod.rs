//! In-memory collaborators that record every call.
#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use async_trait::async_trait;
use tabcast::{
	CaptureBackend, CaptureError, ConnectionManager, ConnectionState, ConnectionStatus, Error,
	HostSurfaces, PanelConfig, PanelEvent, Result, SessionController, Source, SourceCatalog,
	SourceId, StreamResponse, Surface, SurfaceStatus,
};
use tokio::sync::broadcast;

pub const ENDPOINT: &str = "ws://127.0.0.1:19988/stream";

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
	ListSources,
	CatalogSelect(SourceId),
	Connect,
	Disconnect,
	Foreground,
	Surface(SourceId),
	Focus(SourceId),
	Settle(Duration),
	RequestHandle(SourceId),
	StartStreaming(u32, SourceId),
	StopStreaming(SourceId),
}

impl Call {
	pub fn is_backend(&self) -> bool {
		matches!(
			self,
			Call::RequestHandle(_) | Call::StartStreaming(..) | Call::StopStreaming(_)
		)
	}
}

pub type CallLog = Rc<RefCell<Vec<Call>>>;

pub struct FakeCatalog {
	log: CallLog,
	pub sources: RefCell<Vec<Source>>,
	pub selected: Cell<Option<SourceId>>,
}

#[async_trait(?Send)]
impl SourceCatalog for FakeCatalog {
	async fn list_sources(&self) -> Result<Vec<Source>> {
		self.log.borrow_mut().push(Call::ListSources);
		Ok(self.sources.borrow().clone())
	}

	fn select_source(&self, id: SourceId) {
		self.log.borrow_mut().push(Call::CatalogSelect(id));
		self.selected.set(Some(id));
	}

	fn selected_source(&self) -> Option<Source> {
		let id = self.selected.get()?;
		self.sources.borrow().iter().find(|s| s.id == id).cloned()
	}
}

pub struct FakeLink {
	log: CallLog,
	pub state: RefCell<ConnectionState>,
	pub connect_error: RefCell<Option<String>>,
}

#[async_trait(?Send)]
impl ConnectionManager for FakeLink {
	async fn connect(&self) -> Result<ConnectionState> {
		self.log.borrow_mut().push(Call::Connect);
		tokio::time::sleep(Duration::from_millis(10)).await;
		if let Some(message) = self.connect_error.borrow().clone() {
			*self.state.borrow_mut() = ConnectionState::disconnected(ENDPOINT);
			return Err(Error::Connection(message));
		}
		let state = ConnectionState::new(ConnectionStatus::Connected, ENDPOINT);
		*self.state.borrow_mut() = state.clone();
		Ok(state)
	}

	async fn disconnect(&self) {
		self.log.borrow_mut().push(Call::Disconnect);
		*self.state.borrow_mut() = ConnectionState::disconnected(ENDPOINT);
	}

	fn connection_state(&self) -> ConnectionState {
		self.state.borrow().clone()
	}
}

pub struct FakeCapture {
	log: CallLog,
	next_handle: Cell<u32>,
	pub deny: RefCell<Option<String>>,
	pub start_error: RefCell<Option<String>>,
	pub stop_error: RefCell<Option<String>>,
}

#[async_trait(?Send)]
impl CaptureBackend for FakeCapture {
	type Handle = u32;

	async fn request_media_handle(
		&self,
		source: SourceId,
	) -> std::result::Result<u32, CaptureError> {
		self.log.borrow_mut().push(Call::RequestHandle(source));
		if let Some(message) = self.deny.borrow().clone() {
			return Err(CaptureError::Denied(message));
		}
		let handle = self.next_handle.get();
		self.next_handle.set(handle + 1);
		Ok(handle)
	}

	async fn start_streaming(&self, handle: u32, source: SourceId) -> StreamResponse {
		self.log
			.borrow_mut()
			.push(Call::StartStreaming(handle, source));
		match self.start_error.borrow().clone() {
			Some(message) => StreamResponse::failed(message),
			None => StreamResponse::ok(),
		}
	}

	async fn stop_streaming(&self, source: SourceId) -> StreamResponse {
		self.log.borrow_mut().push(Call::StopStreaming(source));
		match self.stop_error.borrow().clone() {
			Some(message) => StreamResponse::failed(message),
			None => StreamResponse::ok(),
		}
	}
}

pub struct FakeHost {
	log: CallLog,
	pub surfaces: RefCell<HashMap<SourceId, Surface>>,
	pub foreground: Cell<Option<SourceId>>,
	pub focus_error: RefCell<Option<String>>,
}

impl FakeHost {
	pub fn set_url(&self, id: i32, url: &str) {
		if let Some(surface) = self.surfaces.borrow_mut().get_mut(&SourceId(id)) {
			surface.url = Some(url.to_string());
		}
	}

	pub fn set_status(&self, id: i32, status: SurfaceStatus) {
		if let Some(surface) = self.surfaces.borrow_mut().get_mut(&SourceId(id)) {
			surface.status = status;
		}
	}
}

#[async_trait(?Send)]
impl HostSurfaces for FakeHost {
	async fn foreground_surface(&self) -> Result<Option<Surface>> {
		self.log.borrow_mut().push(Call::Foreground);
		Ok(self
			.foreground
			.get()
			.and_then(|id| self.surfaces.borrow().get(&id).cloned()))
	}

	async fn surface(&self, id: SourceId) -> Result<Surface> {
		self.log.borrow_mut().push(Call::Surface(id));
		self.surfaces
			.borrow()
			.get(&id)
			.cloned()
			.ok_or_else(|| Error::Host(format!("No tab with id: {id}.")))
	}

	async fn bring_to_foreground(&self, id: SourceId) -> Result<()> {
		self.log.borrow_mut().push(Call::Focus(id));
		if let Some(message) = self.focus_error.borrow().clone() {
			return Err(Error::Host(message));
		}
		self.foreground.set(Some(id));
		Ok(())
	}

	async fn settle(&self, delay: Duration) {
		self.log.borrow_mut().push(Call::Settle(delay));
		tokio::time::sleep(delay).await;
	}
}

pub type TestController = SessionController<FakeCatalog, FakeLink, FakeCapture, FakeHost>;

/// Tabs 1..=9 at `https://siteN.example`, all loaded, tab 1 in the foreground.
pub fn surfaces() -> HashMap<SourceId, Surface> {
	(1..=9)
		.map(|n| {
			(
				SourceId(n),
				Surface {
					id: SourceId(n),
					url: Some(format!("https://site{n}.example/")),
					status: SurfaceStatus::Complete,
				},
			)
		})
		.collect()
}

pub fn harness_with(connection: ConnectionStatus) -> (TestController, CallLog) {
	let log: CallLog = Rc::new(RefCell::new(Vec::new()));
	let controller = SessionController::new(
		PanelConfig::default(),
		FakeCatalog {
			log: log.clone(),
			sources: RefCell::new(Vec::new()),
			selected: Cell::new(None),
		},
		FakeLink {
			log: log.clone(),
			state: RefCell::new(ConnectionState::new(connection, ENDPOINT)),
			connect_error: RefCell::new(None),
		},
		FakeCapture {
			log: log.clone(),
			next_handle: Cell::new(100),
			deny: RefCell::new(None),
			start_error: RefCell::new(None),
			stop_error: RefCell::new(None),
		},
		FakeHost {
			log: log.clone(),
			surfaces: RefCell::new(surfaces()),
			foreground: Cell::new(Some(SourceId(1))),
			focus_error: RefCell::new(None),
		},
	);
	(controller, log)
}

pub fn connected_harness() -> (TestController, CallLog) {
	harness_with(ConnectionStatus::Connected)
}

pub fn disconnected_harness() -> (TestController, CallLog) {
	harness_with(ConnectionStatus::Disconnected)
}

pub fn backend_calls(log: &CallLog) -> Vec<Call> {
	log.borrow().iter().filter(|c| c.is_backend()).cloned().collect()
}

pub fn drain(rx: &mut broadcast::Receiver<PanelEvent>) -> Vec<PanelEvent> {
	let mut events = Vec::new();
	while let Ok(event) = rx.try_recv() {
		events.push(event);
	}
	events
}

pub fn notices(events: &[PanelEvent]) -> Vec<String> {
	events
		.iter()
		.filter_map(|e| match e {
			PanelEvent::Notice(notice) => Some(notice.message.clone()),
			_ => None,
		})
		.collect()
}
