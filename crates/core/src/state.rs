//! Session state value and its synchronous transitions.
//!
//! [`SessionState`] holds every mutable field of the panel. The transition
//! methods here are pure: they validate and apply a change, and never call a
//! collaborator. [`SessionController`](crate::SessionController) wraps them
//! around the awaited collaborator calls.

use serde::Serialize;
use tabcast_protocol::{ConnectionState, Source, SourceFilter, SourceId, StreamPhase, ViewEntry};

use crate::error::StateError;
use crate::filter::{ViewOptions, filtered_view};

/// The capture session: phase plus the source it is bound to.
///
/// `source` is `Some` in every phase except `Idle`. While `Starting` it holds
/// the pending source; from `Active` on it is the frozen bound source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamingSession {
	pub phase: StreamPhase,
	pub source: Option<SourceId>,
}

impl StreamingSession {
	pub fn is_active(&self) -> bool {
		self.phase.is_streaming()
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
	connection: ConnectionState,
	selection: Option<SourceId>,
	filter: SourceFilter,
	show_all: bool,
	catalog: Vec<Source>,
	session: StreamingSession,
}

impl SessionState {
	pub fn new(connection: ConnectionState, show_all: bool) -> Self {
		Self {
			connection,
			selection: None,
			filter: SourceFilter::All,
			show_all,
			catalog: Vec::new(),
			session: StreamingSession::default(),
		}
	}

	pub fn connection(&self) -> &ConnectionState {
		&self.connection
	}

	pub fn selection(&self) -> Option<SourceId> {
		self.selection
	}

	pub fn filter(&self) -> SourceFilter {
		self.filter
	}

	pub fn show_all(&self) -> bool {
		self.show_all
	}

	pub fn catalog(&self) -> &[Source] {
		&self.catalog
	}

	pub fn session(&self) -> StreamingSession {
		self.session
	}

	pub fn phase(&self) -> StreamPhase {
		self.session.phase
	}

	/// Source of an established session (`Active` or `Stopping`).
	pub fn bound_source(&self) -> Option<SourceId> {
		if self.session.is_active() {
			self.session.source
		} else {
			None
		}
	}

	/// True iff the link is connected and a source is selected.
	pub fn can_start(&self) -> bool {
		self.connection.is_connected() && self.selection.is_some()
	}

	/// Hint explaining why streaming cannot start, if it cannot.
	pub fn status_hint(&self) -> Option<&'static str> {
		if self.can_start() {
			None
		} else if self.selection.is_some() {
			Some("Connect to start streaming")
		} else {
			Some("Select a source and connect to start streaming")
		}
	}

	/// Applies a user pick.
	///
	/// Refused with [`StateError::SessionBusy`] while any session (starting,
	/// active or stopping) targets a different source. Returns whether the
	/// selection changed.
	pub fn select(&mut self, id: SourceId) -> Result<bool, StateError> {
		if let Some(bound) = self.session.source {
			if bound != id {
				return Err(StateError::SessionBusy { bound });
			}
		}
		let changed = self.selection != Some(id);
		self.selection = Some(id);
		Ok(changed)
	}

	/// Replaces the cached connection state. Returns whether it changed.
	pub fn set_connection(&mut self, connection: ConnectionState) -> bool {
		if self.connection == connection {
			return false;
		}
		self.connection = connection;
		true
	}

	pub fn set_filter(&mut self, filter: SourceFilter) {
		self.filter = filter;
	}

	pub fn set_show_all(&mut self, show_all: bool) {
		self.show_all = show_all;
	}

	/// Adopts a catalog snapshot. The selection is kept even if its source vanished.
	pub fn set_catalog(&mut self, catalog: Vec<Source>) {
		self.catalog = catalog;
	}

	/// `Idle → Starting`.
	///
	/// Returns the source to capture, or `None` when the call is a no-op
	/// (nothing selected, or a session is already in progress).
	pub fn begin_start(&mut self) -> Result<Option<SourceId>, StateError> {
		if self.session.phase != StreamPhase::Idle {
			return Ok(None);
		}
		let Some(selection) = self.selection else {
			return Ok(None);
		};
		if !self.connection.is_connected() {
			return Err(StateError::NotConnected);
		}
		self.session = StreamingSession {
			phase: StreamPhase::Starting,
			source: Some(selection),
		};
		Ok(Some(selection))
	}

	/// `Starting → Active`, freezing the bound source.
	pub fn complete_start(&mut self) {
		debug_assert_eq!(self.session.phase, StreamPhase::Starting);
		debug_assert!(self.session.source.is_some());
		self.session.phase = StreamPhase::Active;
	}

	/// `Starting → Idle` after a failed start.
	pub fn abort_start(&mut self) {
		debug_assert_eq!(self.session.phase, StreamPhase::Starting);
		self.session = StreamingSession::default();
	}

	/// `Active → Stopping`. Returns the bound source, or `None` when not active.
	pub fn begin_stop(&mut self) -> Option<SourceId> {
		if self.session.phase != StreamPhase::Active {
			return None;
		}
		self.session.phase = StreamPhase::Stopping;
		self.session.source
	}

	/// `Stopping → Idle`.
	pub fn complete_stop(&mut self) {
		debug_assert_eq!(self.session.phase, StreamPhase::Stopping);
		self.session = StreamingSession::default();
	}

	/// `Stopping → Active` after a failed stop; the bound source is unchanged.
	pub fn abort_stop(&mut self) {
		debug_assert_eq!(self.session.phase, StreamPhase::Stopping);
		self.session.phase = StreamPhase::Active;
	}

	/// Drops an `Active` session whose capture ended underneath it.
	///
	/// Returns false if no active session is bound to `source`.
	pub fn end_session(&mut self, source: SourceId) -> bool {
		if self.session.phase != StreamPhase::Active || self.session.source != Some(source) {
			return false;
		}
		self.session = StreamingSession::default();
		true
	}

	/// Annotated view of the current catalog.
	pub fn view(&self, allow_domains: &[String]) -> Vec<ViewEntry> {
		filtered_view(
			&self.catalog,
			&ViewOptions {
				filter: self.filter,
				show_all: self.show_all,
				allow_domains,
				selection: self.selection,
				bound: self.bound_source(),
			},
		)
	}
}
