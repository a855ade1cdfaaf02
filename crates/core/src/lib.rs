//! Session state machine for a tab capture control panel.
//!
//! An operator picks one source (a browser tab) from a live catalog, connects
//! to a relay endpoint, and toggles a capture session bound to that source.
//! [`SessionController`] reconciles the three independent state axes
//! (connectivity, selection, capture) and is the only component allowed to
//! drive the collaborators in [`collab`].
//!
//! # Example
//!
//! ```ignore
//! let controller = SessionController::new(config, catalog, link, capture, host);
//! let mut events = controller.subscribe();
//!
//! controller.refresh_catalog().await?;
//! controller.select_source(SourceId(12))?;
//! controller.toggle_connection().await?;
//! controller.toggle_streaming().await?; // Idle -> Active
//! ```

pub mod collab;
pub mod config;
pub mod error;
pub mod events;
pub mod filter;
pub mod guard;
pub mod session;
pub mod state;

pub use collab::{CaptureBackend, ConnectionManager, HostSurfaces, SourceCatalog};
pub use config::PanelConfig;
pub use error::{CaptureError, Error, Result, StateError, StreamOp};
pub use events::{Notice, NoticeLevel, PanelEvent};
pub use filter::{ViewOptions, filtered_view, source_count_label};
pub use session::{SessionController, SessionSnapshot};
pub use state::{SessionState, StreamingSession};
pub use tabcast_protocol as protocol;
pub use tabcast_protocol::{
	ConnectionState, ConnectionStatus, Source, SourceFilter, SourceId, StreamPhase,
	StreamResponse, Surface, SurfaceStatus, ViewEntry,
};
