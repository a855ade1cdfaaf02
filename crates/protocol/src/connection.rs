//! Relay link status.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
	#[default]
	Disconnected,
	Connecting,
	Connected,
	Disconnecting,
}

impl ConnectionStatus {
	pub fn as_str(&self) -> &'static str {
		match self {
			ConnectionStatus::Disconnected => "disconnected",
			ConnectionStatus::Connecting => "connecting",
			ConnectionStatus::Connected => "connected",
			ConnectionStatus::Disconnecting => "disconnecting",
		}
	}

	/// True while a connect or disconnect is in flight.
	pub fn is_transitional(&self) -> bool {
		matches!(
			self,
			ConnectionStatus::Connecting | ConnectionStatus::Disconnecting
		)
	}
}

impl fmt::Display for ConnectionStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Link status together with the endpoint it refers to.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionState {
	pub status: ConnectionStatus,
	pub endpoint: String,
}

impl ConnectionState {
	pub fn new(status: ConnectionStatus, endpoint: impl Into<String>) -> Self {
		Self {
			status,
			endpoint: endpoint.into(),
		}
	}

	pub fn disconnected(endpoint: impl Into<String>) -> Self {
		Self::new(ConnectionStatus::Disconnected, endpoint)
	}

	/// Same endpoint, different status.
	pub fn with_status(&self, status: ConnectionStatus) -> Self {
		Self {
			status,
			endpoint: self.endpoint.clone(),
		}
	}

	pub fn is_connected(&self) -> bool {
		self.status == ConnectionStatus::Connected
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn with_status_keeps_endpoint() {
		let state = ConnectionState::disconnected("ws://127.0.0.1:19988/stream");
		let next = state.with_status(ConnectionStatus::Connecting);

		assert_eq!(next.endpoint, "ws://127.0.0.1:19988/stream");
		assert!(next.status.is_transitional());
		assert!(!next.is_connected());
	}

	#[test]
	fn status_serializes_lowercase() {
		let state = ConnectionState::new(ConnectionStatus::Connected, "ws://relay");
		let json = serde_json::to_value(&state).unwrap();
		assert_eq!(json["status"], "connected");
		assert_eq!(json["endpoint"], "ws://relay");
	}
}
