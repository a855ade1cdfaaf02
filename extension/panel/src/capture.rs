//! Tab audio capture with `chrome.tabCapture`, relayed as `MediaRecorder` chunks.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use async_trait::async_trait;
use js_sys::Promise;
use serde_json::json;
use tabcast::protocol::PanelMessage;
use tabcast::{CaptureBackend, CaptureError, SourceId, StreamResponse};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{BlobEvent, Event, MediaRecorder, MediaStream, MediaStreamTrack, RecordingState};

use crate::chrome::{self, last_error, stringify_js_error};
use crate::link::{open_socket, SocketSlot};
use crate::push_log;

/// Recorder timeslice; each slice becomes one binary frame.
const CHUNK_MS: i32 = 250;

const NO_STREAM: &str = "Failed to capture tab audio. Please ensure you have granted the necessary permissions and the tab is active.";

type EndedObserver = Rc<RefCell<Option<Box<dyn Fn(SourceId)>>>>;

struct ActiveCapture {
    source: SourceId,
    title: String,
    stream: MediaStream,
    recorder: MediaRecorder,
    _on_data: Closure<dyn FnMut(BlobEvent)>,
    _on_ended: Closure<dyn FnMut(Event)>,
}

pub struct TabCapture {
    socket: SocketSlot,
    active: Rc<RefCell<Option<ActiveCapture>>>,
    observer: EndedObserver,
}

impl TabCapture {
    pub fn new(socket: SocketSlot) -> Self {
        Self {
            socket,
            active: Rc::default(),
            observer: Rc::default(),
        }
    }

    /// Registers the callback for captures the host ended on its own.
    pub fn observe(&self, observer: impl Fn(SourceId) + 'static) {
        *self.observer.borrow_mut() = Some(Box::new(observer));
    }

    /// Re-announces the running capture on a freshly connected link.
    ///
    /// The relay tracks streams per connection, so a new link must see
    /// `stream_started` before the chunks that follow.
    pub fn announce(&self) {
        let message = self.active.borrow().as_ref().map(started_message);
        if let Some(message) = message {
            push_log("re-announcing capture on the new relay link");
            send_message(&self.socket, &message);
        }
    }
}

fn started_message(capture: &ActiveCapture) -> PanelMessage {
    stream_started(capture.source, &capture.title)
}

fn stream_started(source: SourceId, title: &str) -> PanelMessage {
    PanelMessage::StreamStarted {
        source_id: source,
        title: title.to_string(),
    }
}

fn tracks(stream: &MediaStream) -> Vec<MediaStreamTrack> {
    stream
        .get_tracks()
        .iter()
        .filter_map(|track| track.dyn_into::<MediaStreamTrack>().ok())
        .collect()
}

fn send_message(socket: &SocketSlot, message: &PanelMessage) {
    let Some(ws) = open_socket(socket) else {
        return;
    };
    match message.to_json() {
        Ok(text) => {
            if let Err(err) = ws.send_with_str(&text) {
                push_log(&format!("relay send failed: {}", stringify_js_error(err)));
            }
        }
        Err(err) => push_log(&format!("encode failed: {err}")),
    }
}

/// Stops recorder and tracks, then tells the relay the stream is over.
///
/// Waits for the recorder's final chunk so it is sent before `stream_stopped`.
async fn finish_capture(capture: ActiveCapture, socket: &SocketSlot) {
    for track in tracks(&capture.stream) {
        track.set_onended(None);
    }

    if capture.recorder.state() != RecordingState::Inactive {
        let recorder = capture.recorder.clone();
        let stopped = Promise::new(&mut |resolve, _reject| {
            let on_stop = Closure::once_into_js(move || {
                let _ = resolve.call0(&JsValue::NULL);
            });
            recorder.set_onstop(Some(on_stop.unchecked_ref()));
        });
        match capture.recorder.stop() {
            Ok(()) => {
                let _ = JsFuture::from(stopped).await;
            }
            Err(err) => push_log(&format!("recorder stop failed: {}", stringify_js_error(err))),
        }
    }

    for track in tracks(&capture.stream) {
        track.stop();
    }
    capture.recorder.set_ondataavailable(None);
    capture.recorder.set_onstop(None);

    send_message(
        socket,
        &PanelMessage::StreamStopped {
            source_id: capture.source,
        },
    );
}

#[async_trait(?Send)]
impl CaptureBackend for TabCapture {
    type Handle = MediaStream;

    async fn request_media_handle(
        &self,
        source: SourceId,
    ) -> Result<MediaStream, CaptureError> {
        let options = chrome::to_js(&json!({
            "audio": true,
            "video": false,
            "audioConstraints": { "mandatory": { "chromeMediaSource": "tab" } }
        }))
        .map_err(|err| CaptureError::Denied(stringify_js_error(err)))?;

        let captured = Promise::new(&mut |resolve, reject| {
            let callback = Closure::once_into_js(move |stream: JsValue| {
                if let Some(message) = last_error() {
                    let _ = reject.call1(&JsValue::NULL, &JsValue::from_str(&message));
                } else if stream.is_null() || stream.is_undefined() {
                    let _ = reject.call1(&JsValue::NULL, &JsValue::from_str(NO_STREAM));
                } else {
                    let _ = resolve.call1(&JsValue::NULL, &stream);
                }
            });
            chrome::tab_capture_capture(&options, &callback);
        });

        let stream = JsFuture::from(captured)
            .await
            .map_err(|err| CaptureError::Denied(stringify_js_error(err)))?;
        push_log(&format!("captured tab {source}"));
        Ok(stream.unchecked_into())
    }

    async fn start_streaming(&self, handle: MediaStream, source: SourceId) -> StreamResponse {
        if open_socket(&self.socket).is_none() {
            for track in tracks(&handle) {
                track.stop();
            }
            return StreamResponse::failed("Not connected to the relay");
        }

        let previous = self.active.borrow_mut().take();
        if let Some(previous) = previous {
            push_log(&format!("replacing capture of tab {}", previous.source));
            finish_capture(previous, &self.socket).await;
        }

        let recorder = match MediaRecorder::new_with_media_stream(&handle) {
            Ok(recorder) => recorder,
            Err(err) => {
                for track in tracks(&handle) {
                    track.stop();
                }
                return StreamResponse::failed(stringify_js_error(err));
            }
        };

        let title = chrome::get_tab(source)
            .await
            .ok()
            .and_then(|tab| tab.title)
            .unwrap_or_default();
        send_message(&self.socket, &stream_started(source, &title));

        let socket = self.socket.clone();
        let on_data = Closure::<dyn FnMut(BlobEvent)>::new(move |event: BlobEvent| {
            let Some(blob) = event.data() else {
                return;
            };
            if blob.size() <= 0.0 {
                return;
            }
            if let Some(ws) = open_socket(&socket) {
                if let Err(err) = ws.send_with_blob(&blob) {
                    push_log(&format!("chunk send failed: {}", stringify_js_error(err)));
                }
            }
        });
        recorder.set_ondataavailable(Some(on_data.as_ref().unchecked_ref()));

        let on_ended = {
            let active: Weak<RefCell<Option<ActiveCapture>>> = Rc::downgrade(&self.active);
            let socket = self.socket.clone();
            let observer = self.observer.clone();
            Closure::<dyn FnMut(Event)>::new(move |_event: Event| {
                let active = active.clone();
                let socket = socket.clone();
                let observer = observer.clone();
                // Deferred: tearing down drops this closure.
                wasm_bindgen_futures::spawn_local(async move {
                    let Some(active) = active.upgrade() else {
                        return;
                    };
                    let ended = active.borrow_mut().take_if(|c| c.source == source);
                    if let Some(capture) = ended {
                        push_log(&format!("capture of tab {source} ended"));
                        finish_capture(capture, &socket).await;
                        if let Some(observer) = observer.borrow().as_ref() {
                            observer(source);
                        }
                    }
                });
            })
        };
        for track in tracks(&handle) {
            track.set_onended(Some(on_ended.as_ref().unchecked_ref()));
        }

        if let Err(err) = recorder.start_with_time_slice(CHUNK_MS) {
            recorder.set_ondataavailable(None);
            for track in tracks(&handle) {
                track.set_onended(None);
                track.stop();
            }
            send_message(&self.socket, &PanelMessage::StreamStopped { source_id: source });
            return StreamResponse::failed(stringify_js_error(err));
        }

        *self.active.borrow_mut() = Some(ActiveCapture {
            source,
            title,
            stream: handle,
            recorder,
            _on_data: on_data,
            _on_ended: on_ended,
        });
        push_log(&format!("streaming tab {source}"));
        StreamResponse::ok()
    }

    async fn stop_streaming(&self, source: SourceId) -> StreamResponse {
        let capture = self.active.borrow_mut().take_if(|c| c.source == source);
        match capture {
            Some(capture) => {
                finish_capture(capture, &self.socket).await;
                push_log(&format!("stopped tab {source}"));
                StreamResponse::ok()
            }
            None => StreamResponse::failed(format!("No active capture for tab {source}")),
        }
    }
}
