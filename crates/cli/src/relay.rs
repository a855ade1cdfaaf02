use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::routing::get;
use futures::{SinkExt, StreamExt};
use tabcast_protocol::{PROTOCOL_VERSION, PanelMessage, RelayMessage, SourceId};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tokio::sync::{Mutex, mpsc};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, info, warn};

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 19988;

#[derive(Debug, Clone)]
pub struct RelayOptions {
	pub host: String,
	pub port: u16,
	/// Directory receiving one file per stream. Chunks are only counted when unset.
	pub record_dir: Option<PathBuf>,
}

struct RelayState {
	panel: Option<(u64, mpsc::UnboundedSender<Message>)>,
	next_panel_id: u64,
	record_dir: Option<PathBuf>,
}

impl RelayState {
	fn new(record_dir: Option<PathBuf>) -> Self {
		Self {
			panel: None,
			next_panel_id: 0,
			record_dir,
		}
	}

	fn attach_panel(&mut self, tx: mpsc::UnboundedSender<Message>) -> u64 {
		self.next_panel_id += 1;
		let id = self.next_panel_id;
		if let Some((previous, previous_tx)) = self.panel.replace((id, tx)) {
			warn!(target = "tabcast", previous, "Replacing existing panel connection");
			let _ = previous_tx.send(Message::Close(None));
		}
		id
	}

	fn detach_panel(&mut self, id: u64) {
		if matches!(self.panel, Some((current, _)) if current == id) {
			self.panel = None;
		}
	}
}

type SharedState = Arc<Mutex<RelayState>>;

pub async fn run_relay_server(options: RelayOptions) -> Result<()> {
	let RelayOptions {
		host,
		port,
		record_dir,
	} = options;

	if let Some(dir) = &record_dir {
		tokio::fs::create_dir_all(dir)
			.await
			.with_context(|| format!("Failed to create record directory {}", dir.display()))?;
	}

	let state = Arc::new(Mutex::new(RelayState::new(record_dir)));

	let app = Router::new()
		.route("/", get(|| async { "OK" }))
		.route(
			"/stream",
			get(
				|ws: WebSocketUpgrade, State(state): State<SharedState>| async move {
					ws.on_upgrade(|socket| handle_panel_socket(socket, state))
				},
			),
		)
		.with_state(state);

	let addr: SocketAddr = format!("{host}:{port}")
		.parse()
		.with_context(|| format!("Invalid host/port combination: {host}:{port}"))?;

	let listener = TcpListener::bind(addr)
		.await
		.with_context(|| format!("Failed to bind relay server to {addr}"))?;

	info!(target = "tabcast", %addr, "relay listening on ws://{addr}/stream");

	axum::serve(listener, app.into_make_service())
		.await
		.context("Relay server error")
}

async fn handle_panel_socket(socket: WebSocket, state: SharedState) {
	let (tx, rx) = mpsc::unbounded_channel();
	let (panel_id, record_dir) = {
		let mut state = state.lock().await;
		(state.attach_panel(tx.clone()), state.record_dir.clone())
	};
	info!(target = "tabcast", panel_id, "Panel connected");

	let mut rx_stream = UnboundedReceiverStream::new(rx);
	let (mut ws_tx, mut ws_rx) = socket.split();

	let send_task = tokio::spawn(async move {
		while let Some(msg) = rx_stream.next().await {
			let closing = matches!(msg, Message::Close(_));
			if ws_tx.send(msg).await.is_err() || closing {
				break;
			}
		}
	});

	let mut session = PanelSession::new(record_dir);
	while let Some(msg) = ws_rx.next().await {
		let reply = match msg {
			Ok(Message::Text(text)) => session.handle_text(text.as_str()).await,
			Ok(Message::Binary(data)) => session.handle_binary(&data).await,
			Ok(Message::Close(_)) => break,
			Ok(_) => None,
			Err(err) => {
				warn!(target = "tabcast", panel_id, error = %err, "Panel websocket error");
				break;
			}
		};
		if let Some(reply) = reply {
			send_reply(&tx, &reply);
		}
	}

	if let Some(summary) = session.finish().await {
		warn!(
			target = "tabcast",
			panel_id,
			source = %summary.source_id,
			"Panel disconnected mid-stream"
		);
	}
	state.lock().await.detach_panel(panel_id);
	send_task.abort();
	info!(target = "tabcast", panel_id, "Panel disconnected");
}

fn send_reply(tx: &mpsc::UnboundedSender<Message>, reply: &RelayMessage) {
	match reply.to_json() {
		Ok(json) => {
			let _ = tx.send(Message::Text(json.into()));
		}
		Err(err) => warn!(target = "tabcast", error = %err, "Failed to encode relay reply"),
	}
}

fn error_reply(message: impl Into<String>) -> RelayMessage {
	RelayMessage::Error {
		message: message.into(),
	}
}

/// Totals for one finished stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamSummary {
	pub source_id: SourceId,
	pub title: String,
	pub chunks: u64,
	pub bytes: u64,
	pub recording: Option<PathBuf>,
}

struct Recording {
	path: PathBuf,
	file: File,
}

impl Recording {
	async fn create(dir: &Path, source_id: SourceId, sequence: u64) -> Result<Self> {
		let millis = SystemTime::now()
			.duration_since(UNIX_EPOCH)
			.map(|d| d.as_millis())
			.unwrap_or_default();
		let path = dir.join(format!("stream-{source_id}-{millis}-{sequence}.webm"));
		let file = File::create(&path)
			.await
			.with_context(|| format!("Failed to create recording {}", path.display()))?;
		Ok(Self { path, file })
	}
}

struct ActiveStream {
	source_id: SourceId,
	title: String,
	chunks: u64,
	bytes: u64,
	recording: Option<Recording>,
}

/// Message handling for one panel connection.
///
/// Holds at most one active stream. Bad input is answered with an error reply
/// and never ends the connection.
pub struct PanelSession {
	record_dir: Option<PathBuf>,
	active: Option<ActiveStream>,
	sequence: u64,
}

impl PanelSession {
	pub fn new(record_dir: Option<PathBuf>) -> Self {
		Self {
			record_dir,
			active: None,
			sequence: 0,
		}
	}

	pub fn active_source(&self) -> Option<SourceId> {
		self.active.as_ref().map(|s| s.source_id)
	}

	pub async fn handle_text(&mut self, raw: &str) -> Option<RelayMessage> {
		let message: PanelMessage = match serde_json::from_str(raw) {
			Ok(message) => message,
			Err(err) => {
				warn!(target = "tabcast", error = %err, "Unreadable panel message");
				return Some(error_reply(format!("Invalid message: {err}")));
			}
		};

		match message {
			PanelMessage::Hello { version } => {
				if version != PROTOCOL_VERSION {
					warn!(
						target = "tabcast",
						panel = version,
						relay = PROTOCOL_VERSION,
						"Protocol version mismatch"
					);
				}
				debug!(target = "tabcast", version, "Panel handshake");
				Some(RelayMessage::Welcome {
					version: PROTOCOL_VERSION,
				})
			}
			PanelMessage::StreamStarted { source_id, title } => {
				match self.start(source_id, title).await {
					Ok(()) => None,
					Err(err) => {
						warn!(target = "tabcast", source = %source_id, error = %err, "Failed to open stream");
						Some(error_reply(format!("{err:#}")))
					}
				}
			}
			PanelMessage::StreamStopped { source_id } => {
				if self.active_source() == Some(source_id) {
					self.finish().await;
					None
				} else {
					warn!(target = "tabcast", source = %source_id, "Stop for a stream that is not active");
					Some(error_reply(format!("No active stream for source {source_id}")))
				}
			}
		}
	}

	async fn start(&mut self, source_id: SourceId, title: String) -> Result<()> {
		if let Some(previous) = self.finish().await {
			warn!(
				target = "tabcast",
				previous = %previous.source_id,
				"New stream started before the previous one stopped"
			);
		}

		self.sequence += 1;
		let recording = match &self.record_dir {
			Some(dir) => Some(Recording::create(dir, source_id, self.sequence).await?),
			None => None,
		};

		info!(
			target = "tabcast",
			source = %source_id,
			title = %title,
			recording = ?recording.as_ref().map(|r| r.path.display().to_string()),
			"Stream started"
		);
		self.active = Some(ActiveStream {
			source_id,
			title,
			chunks: 0,
			bytes: 0,
			recording,
		});
		Ok(())
	}

	pub async fn handle_binary(&mut self, data: &[u8]) -> Option<RelayMessage> {
		let Some(stream) = self.active.as_mut() else {
			warn!(target = "tabcast", bytes = data.len(), "Media chunk without an active stream");
			return Some(error_reply("Received media without an active stream"));
		};

		stream.chunks += 1;
		stream.bytes += data.len() as u64;
		debug!(
			target = "tabcast",
			source = %stream.source_id,
			chunk = stream.chunks,
			bytes = data.len(),
			"Media chunk"
		);

		if let Some(recording) = stream.recording.as_mut() {
			if let Err(err) = recording.file.write_all(data).await {
				warn!(
					target = "tabcast",
					path = %recording.path.display(),
					error = %err,
					"Recording write failed; continuing without recording"
				);
				stream.recording = None;
				return Some(error_reply(format!("Recording failed: {err}")));
			}
		}
		None
	}

	/// Closes the active stream, if any, and returns its totals.
	pub async fn finish(&mut self) -> Option<StreamSummary> {
		let stream = self.active.take()?;

		let recording = match stream.recording {
			Some(mut recording) => {
				if let Err(err) = recording.file.flush().await {
					warn!(target = "tabcast", path = %recording.path.display(), error = %err, "Failed to flush recording");
				}
				Some(recording.path)
			}
			None => None,
		};

		info!(
			target = "tabcast",
			source = %stream.source_id,
			chunks = stream.chunks,
			bytes = stream.bytes,
			"Stream stopped"
		);

		Some(StreamSummary {
			source_id: stream.source_id,
			title: stream.title,
			chunks: stream.chunks,
			bytes: stream.bytes,
			recording,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::TempDir;

	fn started(id: i32) -> String {
		PanelMessage::StreamStarted {
			source_id: SourceId(id),
			title: format!("Tab {id}"),
		}
		.to_json()
		.unwrap()
	}

	fn stopped(id: i32) -> String {
		PanelMessage::StreamStopped {
			source_id: SourceId(id),
		}
		.to_json()
		.unwrap()
	}

	fn recordings(dir: &TempDir) -> Vec<PathBuf> {
		let mut paths: Vec<PathBuf> = std::fs::read_dir(dir.path())
			.unwrap()
			.map(|entry| entry.unwrap().path())
			.collect();
		paths.sort();
		paths
	}

	#[tokio::test]
	async fn hello_is_welcomed() {
		let mut session = PanelSession::new(None);
		let reply = session
			.handle_text(&PanelMessage::hello().to_json().unwrap())
			.await;
		assert_eq!(
			reply,
			Some(RelayMessage::Welcome {
				version: PROTOCOL_VERSION
			})
		);
	}

	#[tokio::test]
	async fn newer_panel_is_still_welcomed() {
		let mut session = PanelSession::new(None);
		let reply = session.handle_text(r#"{"type":"hello","version":99}"#).await;
		assert!(matches!(reply, Some(RelayMessage::Welcome { version: 1 })));
	}

	#[tokio::test]
	async fn malformed_and_unknown_messages_get_error_replies() {
		let mut session = PanelSession::new(None);

		for raw in ["not json", r#"{"type":"rewind"}"#, r#"{"version":1}"#] {
			let reply = session.handle_text(raw).await;
			match reply {
				Some(RelayMessage::Error { message }) => {
					assert!(message.starts_with("Invalid message"), "{message}")
				}
				other => panic!("expected error reply for {raw}, got {other:?}"),
			}
		}

		assert_eq!(session.handle_text(&started(3)).await, None);
		assert_eq!(session.active_source(), Some(SourceId(3)));
	}

	#[tokio::test]
	async fn chunks_are_counted_without_record_dir() {
		let mut session = PanelSession::new(None);
		session.handle_text(&started(4)).await;

		assert_eq!(session.handle_binary(&[1, 2, 3]).await, None);
		assert_eq!(session.handle_binary(&[4, 5]).await, None);

		let summary = session.finish().await.unwrap();
		assert_eq!(summary.source_id, SourceId(4));
		assert_eq!(summary.title, "Tab 4");
		assert_eq!(summary.chunks, 2);
		assert_eq!(summary.bytes, 5);
		assert_eq!(summary.recording, None);
		assert_eq!(session.active_source(), None);
	}

	#[tokio::test]
	async fn stream_is_recorded_to_disk() {
		let dir = TempDir::new().unwrap();
		let mut session = PanelSession::new(Some(dir.path().to_path_buf()));

		session.handle_text(&started(7)).await;
		session.handle_binary(b"abc").await;
		session.handle_binary(b"def").await;
		assert_eq!(session.handle_text(&stopped(7)).await, None);

		let files = recordings(&dir);
		assert_eq!(files.len(), 1);
		let name = files[0].file_name().unwrap().to_string_lossy().to_string();
		assert!(name.starts_with("stream-7-"), "{name}");
		assert_eq!(std::fs::read(&files[0]).unwrap(), b"abcdef");
	}

	#[tokio::test]
	async fn media_before_start_is_rejected() {
		let mut session = PanelSession::new(None);
		let reply = session.handle_binary(&[0u8; 16]).await;
		assert!(matches!(reply, Some(RelayMessage::Error { .. })));
		assert!(session.finish().await.is_none());
	}

	#[tokio::test]
	async fn stop_for_another_source_keeps_the_stream() {
		let mut session = PanelSession::new(None);
		session.handle_text(&started(1)).await;

		let reply = session.handle_text(&stopped(2)).await;
		assert_eq!(
			reply,
			Some(RelayMessage::Error {
				message: "No active stream for source 2".to_string()
			})
		);
		assert_eq!(session.active_source(), Some(SourceId(1)));
	}

	#[tokio::test]
	async fn restart_closes_the_previous_stream() {
		let dir = TempDir::new().unwrap();
		let mut session = PanelSession::new(Some(dir.path().to_path_buf()));

		session.handle_text(&started(1)).await;
		session.handle_binary(b"one").await;
		session.handle_text(&started(2)).await;
		session.handle_binary(b"two").await;
		session.finish().await;

		let files = recordings(&dir);
		assert_eq!(files.len(), 2);
		let mut contents: Vec<Vec<u8>> = files.iter().map(|p| std::fs::read(p).unwrap()).collect();
		contents.sort();
		assert_eq!(contents, vec![b"one".to_vec(), b"two".to_vec()]);
		assert_eq!(session.active_source(), None);
	}

	#[test]
	fn new_panel_replaces_the_previous_one() {
		let mut state = RelayState::new(None);
		let (first_tx, mut first_rx) = mpsc::unbounded_channel();
		let (second_tx, _second_rx) = mpsc::unbounded_channel();

		let first = state.attach_panel(first_tx);
		let second = state.attach_panel(second_tx);
		assert_ne!(first, second);
		assert!(matches!(first_rx.try_recv(), Ok(Message::Close(None))));

		// A late detach from the replaced panel leaves the new one attached.
		state.detach_panel(first);
		assert!(matches!(state.panel, Some((id, _)) if id == second));
		state.detach_panel(second);
		assert!(state.panel.is_none());
	}
}
