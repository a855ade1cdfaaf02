//! Capture session status and backend replies.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Phase of the streaming state machine.
///
/// Cycles `Idle → Starting → Active → Stopping → Idle`; a failed start falls
/// back from `Starting` to `Idle`, a failed stop from `Stopping` to `Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamPhase {
	#[default]
	Idle,
	Starting,
	Active,
	Stopping,
}

impl StreamPhase {
	pub fn as_str(&self) -> &'static str {
		match self {
			StreamPhase::Idle => "idle",
			StreamPhase::Starting => "starting",
			StreamPhase::Active => "active",
			StreamPhase::Stopping => "stopping",
		}
	}

	/// True once a session has been established and until it is torn down.
	pub fn is_streaming(&self) -> bool {
		matches!(self, StreamPhase::Active | StreamPhase::Stopping)
	}
}

impl fmt::Display for StreamPhase {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Reply of a capture backend to a start or stop request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamResponse {
	pub success: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
}

impl StreamResponse {
	pub fn ok() -> Self {
		Self {
			success: true,
			error: None,
		}
	}

	pub fn failed(error: impl Into<String>) -> Self {
		Self {
			success: false,
			error: Some(error.into()),
		}
	}

	/// Converts into a `Result`, using a generic message when the backend gave none.
	pub fn into_result(self) -> Result<(), String> {
		if self.success {
			Ok(())
		} else {
			Err(self
				.error
				.unwrap_or_else(|| "backend reported failure without a message".to_string()))
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn failed_response_without_message_still_errors() {
		let response: StreamResponse = serde_json::from_str(r#"{"success": false}"#).unwrap();
		assert!(response.into_result().is_err());
		assert_eq!(StreamResponse::ok().into_result(), Ok(()));
	}

	#[test]
	fn streaming_phases() {
		assert!(!StreamPhase::Idle.is_streaming());
		assert!(!StreamPhase::Starting.is_streaming());
		assert!(StreamPhase::Active.is_streaming());
		assert!(StreamPhase::Stopping.is_streaming());
	}
}
