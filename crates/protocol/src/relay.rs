//! WebSocket message format between the side panel and the relay endpoint.
//!
//! The protocol is deliberately small:
//!
//! 1. Panel connects and sends [`PanelMessage::Hello`]
//! 2. Relay responds with [`RelayMessage::Welcome`]
//! 3. Panel announces a capture with [`PanelMessage::StreamStarted`]
//! 4. Media chunks follow as binary frames, opaque to both sides
//! 5. Panel ends the capture with [`PanelMessage::StreamStopped`]
//!
//! Any message the relay cannot handle is answered with [`RelayMessage::Error`].

use serde::{Deserialize, Serialize};

use crate::source::SourceId;

/// Wire protocol version exchanged in the handshake.
pub const PROTOCOL_VERSION: u32 = 1;

/// Message sent from the side panel to the relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PanelMessage {
	/// First message after the socket opens.
	Hello {
		/// Panel protocol version, see [`PROTOCOL_VERSION`].
		version: u32,
	},
	/// A capture session began; binary frames that follow belong to it.
	#[serde(rename_all = "camelCase")]
	StreamStarted {
		source_id: SourceId,
		/// Title of the captured source, for logging on the relay side.
		#[serde(default)]
		title: String,
	},
	/// The capture session for `source_id` ended.
	#[serde(rename_all = "camelCase")]
	StreamStopped { source_id: SourceId },
}

/// Message sent from the relay to the side panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RelayMessage {
	/// Handshake accepted.
	Welcome {
		/// Relay protocol version.
		version: u32,
	},
	/// The relay could not process the last message.
	Error {
		/// Human-readable error description.
		message: String,
	},
}

impl PanelMessage {
	pub fn hello() -> Self {
		PanelMessage::Hello {
			version: PROTOCOL_VERSION,
		}
	}

	pub fn to_json(&self) -> serde_json::Result<String> {
		serde_json::to_string(self)
	}
}

impl RelayMessage {
	pub fn to_json(&self) -> serde_json::Result<String> {
		serde_json::to_string(self)
	}
}
