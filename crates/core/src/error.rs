//! Error types for the session controller.
//!
//! Every error here is recoverable: the controller reverts to the state it
//! had before the failed transition and reports the error to the caller as
//! well as through a [`Notice`](crate::events::Notice).

use tabcast_protocol::SourceId;
use thiserror::Error;

/// Result type alias for controller operations.
pub type Result<T> = std::result::Result<T, Error>;

/// An intent was refused because of the current session state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
	/// A session is bound to another source.
	#[error("Please stop the current stream before selecting a new source")]
	SessionBusy {
		/// Source the running (or starting) session is bound to.
		bound: SourceId,
	},

	/// Streaming requires a connected relay link.
	#[error("Connect to start streaming")]
	NotConnected,
}

/// The host refused or could not provide a capture of the selected source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
	/// The address matches the host security denylist.
	#[error(
		"This page cannot be captured due to browser security restrictions. Please select a different tab."
	)]
	Restricted {
		/// Offending address.
		url: String,
	},

	/// The source has not finished loading.
	#[error("Please wait for the tab to finish loading before capturing audio.")]
	NotReady { tab: SourceId },

	/// The host declined to grant a media handle.
	#[error("{0}")]
	Denied(String),
}

/// Which backend streaming call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOp {
	Start,
	Stop,
}

impl std::fmt::Display for StreamOp {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			StreamOp::Start => f.write_str("start"),
			StreamOp::Stop => f.write_str("stop"),
		}
	}
}

/// Errors surfaced by [`SessionController`](crate::SessionController).
#[derive(Debug, Error)]
pub enum Error {
	#[error(transparent)]
	State(#[from] StateError),

	#[error(transparent)]
	Capture(#[from] CaptureError),

	/// The capture backend reported a failed start or stop.
	#[error("{message}")]
	Backend { operation: StreamOp, message: String },

	/// The connection manager failed to establish the relay link.
	#[error("Connection failed: {0}")]
	Connection(String),

	/// A host surface query or foreground switch failed.
	#[error("{0}")]
	Host(String),

	/// Configuration values are out of range.
	#[error("Invalid configuration: {0}")]
	Config(String),

	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),
}

impl Error {
	/// Returns true for the `SessionBusy` selection refusal.
	pub fn is_session_busy(&self) -> bool {
		matches!(self, Error::State(StateError::SessionBusy { .. }))
	}

	/// Returns true if the host security denylist blocked the capture.
	pub fn is_restricted(&self) -> bool {
		matches!(self, Error::Capture(CaptureError::Restricted { .. }))
	}

	/// Returns the capture error, if this is one.
	pub fn as_capture(&self) -> Option<&CaptureError> {
		match self {
			Error::Capture(err) => Some(err),
			_ => None,
		}
	}
}
