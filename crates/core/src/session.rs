//! The session controller.
//!
//! [`SessionController`] is the only component that calls
//! [`CaptureBackend`] start/stop and [`ConnectionManager`] connect/disconnect.
//! It owns the [`SessionState`] and folds every collaborator result back into
//! it, emitting a [`PanelEvent`] for each observable change.
//!
//! Operations take `&self`. State lives in a [`RefCell`] that is never
//! borrowed across an await, so a presentation layer sharing the controller
//! (e.g. through an `Rc`) can deliver a `select_source` while `start` is
//! suspended on a collaborator call. That selection is judged against the
//! `Starting` phase, which is entered before the first await.

use std::cell::RefCell;

use serde::Serialize;
use tabcast_protocol::{
	ConnectionState, ConnectionStatus, Source, SourceFilter, SourceId, StreamPhase, ViewEntry,
};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::collab::{CaptureBackend, ConnectionManager, HostSurfaces, SourceCatalog};
use crate::config::PanelConfig;
use crate::error::{CaptureError, Error, Result, StreamOp};
use crate::events::{EventBus, Notice, PanelEvent};
use crate::filter::source_count_label;
use crate::guard::ensure_capturable;
use crate::state::SessionState;

const SWITCHING_NOTICE: &str = "Switching to the selected tab (required for audio capture)...";

/// Everything the presentation layer needs to render the panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
	pub connection: ConnectionState,
	pub selection: Option<SourceId>,
	pub filter: SourceFilter,
	pub show_all: bool,
	pub phase: StreamPhase,
	pub bound_source: Option<SourceId>,
	/// Title of the bound source, if it is still in the catalog.
	pub bound_title: Option<String>,
	pub can_start: bool,
	pub hint: Option<String>,
	pub view: Vec<ViewEntry>,
	pub count_label: String,
}

/// Mediates connection, selection and streaming for one panel.
pub struct SessionController<K, C, B, H> {
	config: PanelConfig,
	catalog: K,
	connection: C,
	backend: B,
	host: H,
	state: RefCell<SessionState>,
	events: EventBus,
}

impl<K, C, B, H> SessionController<K, C, B, H>
where
	K: SourceCatalog,
	C: ConnectionManager,
	B: CaptureBackend,
	H: HostSurfaces,
{
	/// Creates a controller in the `Idle` phase, caching the manager's current link state.
	pub fn new(config: PanelConfig, catalog: K, connection: C, backend: B, host: H) -> Self {
		let state = SessionState::new(connection.connection_state(), config.show_all_sources);
		Self {
			config,
			catalog,
			connection,
			backend,
			host,
			state: RefCell::new(state),
			events: EventBus::new(),
		}
	}

	pub fn config(&self) -> &PanelConfig {
		&self.config
	}

	pub fn catalog(&self) -> &K {
		&self.catalog
	}

	pub fn connection(&self) -> &C {
		&self.connection
	}

	pub fn backend(&self) -> &B {
		&self.backend
	}

	pub fn host(&self) -> &H {
		&self.host
	}

	/// Subscribes to state-change notifications.
	pub fn subscribe(&self) -> broadcast::Receiver<PanelEvent> {
		self.events.subscribe()
	}

	/// Copy of the current state.
	pub fn state(&self) -> SessionState {
		self.state.borrow().clone()
	}

	pub fn phase(&self) -> StreamPhase {
		self.state.borrow().phase()
	}

	pub fn selection(&self) -> Option<SourceId> {
		self.state.borrow().selection()
	}

	pub fn bound_source(&self) -> Option<SourceId> {
		self.state.borrow().bound_source()
	}

	pub fn can_start(&self) -> bool {
		self.state.borrow().can_start()
	}

	/// Annotated view of the latest catalog snapshot.
	pub fn view(&self) -> Vec<ViewEntry> {
		self.state.borrow().view(&self.config.audio_source_domains)
	}

	pub fn snapshot(&self) -> SessionSnapshot {
		let state = self.state.borrow();
		let view = state.view(&self.config.audio_source_domains);
		let bound_source = state.bound_source();
		let bound_title = bound_source.and_then(|id| {
			state
				.catalog()
				.iter()
				.find(|s| s.id == id)
				.map(|s| s.display_title().to_string())
		});
		SessionSnapshot {
			connection: state.connection().clone(),
			selection: state.selection(),
			filter: state.filter(),
			show_all: state.show_all(),
			phase: state.phase(),
			bound_source,
			bound_title,
			can_start: state.can_start(),
			hint: state.status_hint().map(str::to_owned),
			count_label: source_count_label(view.len()),
			view,
		}
	}

	/// Selects `id` as the source for the next session.
	///
	/// # Errors
	///
	/// [`StateError::SessionBusy`](crate::StateError::SessionBusy) if a session
	/// is starting, active or stopping on another source. The selection is
	/// left unchanged and an error notice is emitted.
	pub fn select_source(&self, id: SourceId) -> Result<()> {
		let outcome = self.state.borrow_mut().select(id);
		match outcome {
			Ok(changed) => {
				self.catalog.select_source(id);
				if changed {
					info!(source = %id, "source selected");
					self.emit_selection();
					self.emit_view();
				}
				Ok(())
			}
			Err(err) => {
				warn!(source = %id, error = %err, "selection refused");
				self.events.notice(Notice::error(err.to_string()));
				Err(err.into())
			}
		}
	}

	/// Connects when disconnected, disconnects when connected.
	///
	/// A toggle issued while a previous one is still connecting or
	/// disconnecting is ignored. Connection failures fall back to
	/// `disconnected` and are not retried here.
	pub async fn toggle_connection(&self) -> Result<ConnectionState> {
		let cached = self.state.borrow().connection().clone();
		if cached.status.is_transitional() {
			debug!(status = %cached.status, "connection toggle ignored while in flight");
			return Ok(cached);
		}

		let current = self.connection.connection_state();
		if current.is_connected() {
			info!(endpoint = %current.endpoint, "disconnecting from relay");
			self.adopt_connection(current.with_status(ConnectionStatus::Disconnecting));
			self.connection.disconnect().await;
			let after = self.connection.connection_state();
			self.adopt_connection(after.clone());
			return Ok(after);
		}

		info!(endpoint = %current.endpoint, "connecting to relay");
		self.adopt_connection(current.with_status(ConnectionStatus::Connecting));
		match self.connection.connect().await {
			Ok(state) => {
				info!(status = %state.status, "relay link established");
				self.adopt_connection(state.clone());
				Ok(state)
			}
			Err(err) => {
				warn!(endpoint = %current.endpoint, error = %err, "relay connection failed");
				self.adopt_connection(ConnectionState::disconnected(current.endpoint.clone()));
				self.events.notice(Notice::error(err.to_string()));
				Err(err)
			}
		}
	}

	/// Adopts a link state reported by the connection manager.
	///
	/// A running streaming session is not affected.
	pub fn connection_state_changed(&self, state: ConnectionState) {
		debug!(status = %state.status, "connection state changed");
		self.adopt_connection(state);
	}

	/// The single streaming control: starts from `Idle`, stops from `Active`,
	/// and does nothing while a start or stop is in flight.
	pub async fn toggle_streaming(&self) -> Result<StreamPhase> {
		let phase = self.phase();
		match phase {
			StreamPhase::Idle => self.start().await,
			StreamPhase::Active => self.stop().await,
			StreamPhase::Starting | StreamPhase::Stopping => {
				debug!(%phase, "streaming toggle ignored while in flight");
				Ok(phase)
			}
		}
	}

	/// Starts a capture session on the selected source.
	///
	/// A no-op when nothing is selected or a session already exists. On any
	/// failure the phase reverts to `Idle`, the error is returned, and a
	/// `Failed to start streaming` notice is emitted.
	///
	/// # Errors
	///
	/// - [`StateError::NotConnected`](crate::StateError::NotConnected) when the relay link is down
	/// - [`CaptureError::Restricted`] when the foreground or selected address is on the denylist
	/// - [`CaptureError::NotReady`] when the selected source is still loading
	/// - [`CaptureError::Denied`] when the host refuses a media handle
	/// - [`Error::Backend`] when the backend fails to start relaying
	/// - [`Error::Host`] when a surface query or foreground switch fails
	pub async fn start(&self) -> Result<StreamPhase> {
		let begun = self.state.borrow_mut().begin_start();
		let source = match begun {
			Ok(Some(source)) => source,
			Ok(None) => return Ok(self.phase()),
			Err(err) => {
				warn!(error = %err, "start refused");
				self.events.notice(Notice::error(err.to_string()));
				return Err(err.into());
			}
		};

		info!(source = %source, "starting capture session");
		self.emit_streaming();

		match self.establish(source).await {
			Ok(()) => {
				self.state.borrow_mut().complete_start();
				info!(source = %source, "capture session active");
				self.emit_streaming();
				self.emit_view();
				self.events.notice(Notice::info("Streaming active"));
				Ok(StreamPhase::Active)
			}
			Err(err) => {
				self.state.borrow_mut().abort_start();
				warn!(source = %source, error = %err, "capture session failed to start");
				self.emit_streaming();
				self.events
					.notice(Notice::error(format!("Failed to start streaming: {err}")));
				Err(err)
			}
		}
	}

	/// Runs the collaborator sequence for `start` while in `Starting`.
	async fn establish(&self, source: SourceId) -> Result<()> {
		let prefixes = &self.config.restricted_prefixes;

		let foreground = self.host.foreground_surface().await?;
		if let Some(surface) = &foreground {
			ensure_capturable(surface.url.as_deref(), prefixes)?;
		}

		let target = self.host.surface(source).await?;
		ensure_capturable(target.url.as_deref(), prefixes)?;
		if !target.is_ready() {
			return Err(CaptureError::NotReady { tab: source }.into());
		}

		if foreground.as_ref().map(|s| s.id) != Some(source) {
			self.events.notice(Notice::info(SWITCHING_NOTICE));
			debug!(source = %source, delay_ms = self.config.settle_delay_ms, "bringing source to foreground");
			self.host.bring_to_foreground(source).await?;
			self.host.settle(self.config.settle_delay()).await;
		}

		debug!(source = %source, "requesting media handle");
		let handle = self.backend.request_media_handle(source).await?;

		self.backend
			.start_streaming(handle, source)
			.await
			.into_result()
			.map_err(|message| Error::Backend {
				operation: StreamOp::Start,
				message,
			})
	}

	/// Stops the active session.
	///
	/// A no-op unless `Active`. When the backend fails the session stays
	/// `Active` on the same source.
	///
	/// # Errors
	///
	/// [`Error::Backend`] with the backend's message.
	pub async fn stop(&self) -> Result<StreamPhase> {
		let stopping = self.state.borrow_mut().begin_stop();
		let Some(source) = stopping else {
			return Ok(self.phase());
		};

		info!(source = %source, "stopping capture session");
		self.emit_streaming();

		let response = self.backend.stop_streaming(source).await;
		match response.into_result() {
			Ok(()) => {
				self.state.borrow_mut().complete_stop();
				info!(source = %source, "capture session stopped");
				self.emit_streaming();
				self.emit_view();
				self.events.notice(Notice::info("Streaming stopped"));
				Ok(StreamPhase::Idle)
			}
			Err(message) => {
				self.state.borrow_mut().abort_stop();
				warn!(source = %source, error = %message, "capture session failed to stop");
				self.emit_streaming();
				self.events
					.notice(Notice::error(format!("Failed to stop streaming: {message}")));
				Err(Error::Backend {
					operation: StreamOp::Stop,
					message,
				})
			}
		}
	}

	/// Reports that the capture of `source` ended without a stop request
	/// (the tab closed, the host revoked the stream).
	///
	/// Returns true if this destroyed the active session.
	pub fn capture_ended(&self, source: SourceId) -> bool {
		let ended = self.state.borrow_mut().end_session(source);
		if ended {
			warn!(source = %source, "capture ended unexpectedly");
			self.emit_streaming();
			self.emit_view();
			self.events
				.notice(Notice::error("Streaming stopped: the captured source is gone"));
		}
		ended
	}

	pub fn set_filter(&self, filter: SourceFilter) {
		self.state.borrow_mut().set_filter(filter);
		debug!(%filter, "filter changed");
		self.emit_view();
	}

	pub fn set_show_all(&self, show_all: bool) {
		self.state.borrow_mut().set_show_all(show_all);
		debug!(show_all, "visibility changed");
		self.emit_view();
	}

	/// Adopts a `sources-changed` snapshot.
	pub fn update_catalog(&self, sources: Vec<Source>) {
		debug!(count = sources.len(), "catalog updated");
		self.state.borrow_mut().set_catalog(sources);
		self.emit_view();
	}

	/// Queries the catalog collaborator and adopts the result.
	pub async fn refresh_catalog(&self) -> Result<()> {
		let sources = self.catalog.list_sources().await.inspect_err(|err| {
			warn!(error = %err, "catalog query failed");
		})?;
		self.update_catalog(sources);
		Ok(())
	}

	fn adopt_connection(&self, connection: ConnectionState) {
		let changed = self.state.borrow_mut().set_connection(connection);
		if changed {
			let (state, can_start) = {
				let state = self.state.borrow();
				(state.connection().clone(), state.can_start())
			};
			self.events.emit(PanelEvent::Connection { state, can_start });
		}
	}

	fn emit_selection(&self) {
		let (source, can_start) = {
			let state = self.state.borrow();
			(state.selection(), state.can_start())
		};
		self.events.emit(PanelEvent::Selection { source, can_start });
	}

	fn emit_streaming(&self) {
		let session = self.state.borrow().session();
		let bound = if session.is_active() {
			session.source
		} else {
			None
		};
		self.events.emit(PanelEvent::Streaming {
			phase: session.phase,
			bound,
		});
	}

	fn emit_view(&self) {
		let (filter, entries) = {
			let state = self.state.borrow();
			(state.filter(), state.view(&self.config.audio_source_domains))
		};
		self.events.emit(PanelEvent::View { filter, entries });
	}
}
