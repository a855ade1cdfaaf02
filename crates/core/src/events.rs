//! State-change notifications for the presentation layer.

use serde::Serialize;
use tabcast_protocol::{ConnectionState, SourceFilter, SourceId, StreamPhase, ViewEntry};
use tokio::sync::broadcast;

/// Capacity of the event channel; slow receivers observe `Lagged`.
pub const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
	Info,
	Error,
}

/// Human-readable status line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
	pub level: NoticeLevel,
	pub message: String,
}

impl Notice {
	pub fn info(message: impl Into<String>) -> Self {
		Self {
			level: NoticeLevel::Info,
			message: message.into(),
		}
	}

	pub fn error(message: impl Into<String>) -> Self {
		Self {
			level: NoticeLevel::Error,
			message: message.into(),
		}
	}
}

/// One state change emitted by the controller.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PanelEvent {
	Connection {
		state: ConnectionState,
		can_start: bool,
	},
	Selection {
		source: Option<SourceId>,
		can_start: bool,
	},
	Streaming {
		phase: StreamPhase,
		bound: Option<SourceId>,
	},
	View {
		filter: SourceFilter,
		entries: Vec<ViewEntry>,
	},
	Notice(Notice),
}

/// Sending half shared by the controller. Sends never fail when nobody listens.
#[derive(Debug, Clone)]
pub(crate) struct EventBus {
	tx: broadcast::Sender<PanelEvent>,
}

impl EventBus {
	pub(crate) fn new() -> Self {
		let (tx, _) = broadcast::channel(EVENT_CAPACITY);
		Self { tx }
	}

	pub(crate) fn subscribe(&self) -> broadcast::Receiver<PanelEvent> {
		self.tx.subscribe()
	}

	pub(crate) fn emit(&self, event: PanelEvent) {
		let _ = self.tx.send(event);
	}

	pub(crate) fn notice(&self, notice: Notice) {
		match notice.level {
			NoticeLevel::Info => tracing::debug!(message = %notice.message, "notice"),
			NoticeLevel::Error => tracing::warn!(message = %notice.message, "notice"),
		}
		self.emit(PanelEvent::Notice(notice));
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn emit_without_subscribers_is_silent() {
		let bus = EventBus::new();
		bus.notice(Notice::info("Streaming stopped"));
	}

	#[test]
	fn subscriber_receives_in_order() {
		let bus = EventBus::new();
		let mut rx = bus.subscribe();

		bus.notice(Notice::info("first"));
		bus.emit(PanelEvent::Streaming {
			phase: StreamPhase::Idle,
			bound: None,
		});

		assert_eq!(rx.try_recv().unwrap(), PanelEvent::Notice(Notice::info("first")));
		assert!(matches!(
			rx.try_recv().unwrap(),
			PanelEvent::Streaming { phase: StreamPhase::Idle, .. }
		));
	}

	#[test]
	fn notice_serializes_for_the_panel() {
		let value = serde_json::to_value(PanelEvent::Notice(Notice::error("boom"))).unwrap();
		assert_eq!(value["type"], "notice");
		assert_eq!(value["level"], "error");
		assert_eq!(value["message"], "boom");
	}
}
