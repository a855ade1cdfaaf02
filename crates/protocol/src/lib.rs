//! Shared data model for tabcast.
//!
//! Types in this crate cross every boundary in the workspace: the session
//! controller keeps them as state, the wasm panel hands them to JavaScript,
//! and the relay endpoint reads the wire messages. Everything serializes with
//! camelCase field names.
//!
//! # Main Types
//!
//! - [`Source`] / [`SourceId`] - a capturable candidate reported by the host
//! - [`SourceFilter`] / [`ViewEntry`] - the presentation view over the catalog
//! - [`ConnectionState`] - relay link status plus endpoint identity
//! - [`StreamPhase`] / [`StreamResponse`] - capture session status and backend replies
//! - [`PanelMessage`] / [`RelayMessage`] - panel/relay socket protocol

pub mod connection;
pub mod relay;
pub mod source;
pub mod stream;

pub use connection::{ConnectionState, ConnectionStatus};
pub use relay::{PROTOCOL_VERSION, PanelMessage, RelayMessage};
pub use source::{Source, SourceFilter, SourceId, Surface, SurfaceStatus, ViewEntry};
pub use stream::{StreamPhase, StreamResponse};
