//! Collaborator contracts consumed by the [`SessionController`](crate::SessionController).
//!
//! Host APIs that deliver results through callbacks are modeled as awaited
//! calls with typed results. All traits are `?Send`: the controller runs on a
//! single cooperative thread (the extension event loop, or a current-thread
//! runtime in tests).

use std::time::Duration;

use async_trait::async_trait;
use tabcast_protocol::{ConnectionState, Source, SourceId, StreamResponse, Surface};

use crate::error::{CaptureError, Result};

/// Enumerates candidate sources.
///
/// Change notifications (`sources-changed`) are pushed into the controller
/// with [`SessionController::update_catalog`](crate::SessionController::update_catalog).
#[async_trait(?Send)]
pub trait SourceCatalog {
	/// Queries the host for the current candidates.
	async fn list_sources(&self) -> Result<Vec<Source>>;

	/// Updates the catalog's own "selected" bookkeeping.
	///
	/// This is a secondary cache; the controller's selection is authoritative.
	fn select_source(&self, id: SourceId);

	fn selected_source(&self) -> Option<Source>;
}

/// Owns the relay link lifecycle.
///
/// State changes the manager observes on its own (socket closed by the
/// remote, retries) are pushed into the controller with
/// [`SessionController::connection_state_changed`](crate::SessionController::connection_state_changed).
#[async_trait(?Send)]
pub trait ConnectionManager {
	/// Establishes the link and returns the resulting state.
	async fn connect(&self) -> Result<ConnectionState>;

	async fn disconnect(&self);

	fn connection_state(&self) -> ConnectionState;
}

/// Turns a source into a media handle and relays it.
#[async_trait(?Send)]
pub trait CaptureBackend {
	/// Raw media handle produced by the host.
	type Handle;

	/// Requests a capture of the (foregrounded) source.
	async fn request_media_handle(
		&self,
		source: SourceId,
	) -> std::result::Result<Self::Handle, CaptureError>;

	/// Starts relaying `handle`. Ownership of the handle moves to the backend.
	async fn start_streaming(&self, handle: Self::Handle, source: SourceId) -> StreamResponse;

	async fn stop_streaming(&self, source: SourceId) -> StreamResponse;
}

/// Host window/tab queries.
#[async_trait(?Send)]
pub trait HostSurfaces {
	/// The surface currently in the foreground, if any.
	async fn foreground_surface(&self) -> Result<Option<Surface>>;

	/// Looks up a surface by id.
	async fn surface(&self, id: SourceId) -> Result<Surface>;

	/// Brings the surface to the foreground.
	async fn bring_to_foreground(&self, id: SourceId) -> Result<()>;

	/// Waits for a freshly foregrounded surface to settle.
	///
	/// Always waits the full `delay`; hosts without a tokio timer override this.
	async fn settle(&self, delay: Duration) {
		tokio::time::sleep(delay).await;
	}
}
