//! Relay link over a browser `WebSocket`.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use async_trait::async_trait;
use js_sys::Promise;
use tabcast::protocol::{PanelMessage, RelayMessage};
use tabcast::{ConnectionManager, ConnectionState, ConnectionStatus, Error, Result};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{BinaryType, CloseEvent, ErrorEvent, Event, MessageEvent, WebSocket};

use crate::chrome::stringify_js_error;
use crate::push_log;

/// Socket shared between the link (which owns its lifecycle) and the capture
/// backend (which sends media over it).
pub type SocketSlot = Rc<RefCell<Option<Rc<WebSocket>>>>;

type StateObserver = Rc<RefCell<Option<Box<dyn Fn(ConnectionState)>>>>;

/// The socket currently in the slot, if it is open.
///
/// Senders look this up per frame so a reconnect takes effect immediately.
pub fn open_socket(slot: &SocketSlot) -> Option<Rc<WebSocket>> {
    current_open(slot, |ws| ws.ready_state() == WebSocket::OPEN)
}

fn current_open<S: Clone>(slot: &RefCell<Option<S>>, is_open: impl Fn(&S) -> bool) -> Option<S> {
    slot.borrow().clone().filter(|socket| is_open(socket))
}

pub struct RelayLink {
    url: String,
    socket: SocketSlot,
    state: Rc<RefCell<ConnectionState>>,
    observer: StateObserver,
    on_connected: RefCell<Option<Box<dyn Fn()>>>,
    /// Bumped per socket so a stale `close` cannot tear down a newer link.
    generation: Rc<Cell<u64>>,
}

impl RelayLink {
    pub fn new(url: impl Into<String>, socket: SocketSlot) -> Self {
        let url = url.into();
        Self {
            state: Rc::new(RefCell::new(ConnectionState::disconnected(url.clone()))),
            url,
            socket,
            observer: Rc::default(),
            on_connected: RefCell::new(None),
            generation: Rc::default(),
        }
    }

    /// Registers the callback for state changes the link observes by itself.
    pub fn observe(&self, observer: impl Fn(ConnectionState) + 'static) {
        *self.observer.borrow_mut() = Some(Box::new(observer));
    }

    /// Registers the callback run after each successful connect, once the
    /// new socket is in the slot.
    pub fn on_connected(&self, callback: impl Fn() + 'static) {
        *self.on_connected.borrow_mut() = Some(Box::new(callback));
    }

    fn set_state(&self, status: ConnectionStatus) -> ConnectionState {
        let state = ConnectionState::new(status, self.url.clone());
        *self.state.borrow_mut() = state.clone();
        state
    }

    /// Resolves once the socket opens, rejects on error or close.
    async fn wait_open(ws: &WebSocket) -> std::result::Result<(), JsValue> {
        let opened = Promise::new(&mut |resolve, reject| {
            let on_open = Closure::once_into_js(move || {
                let _ = resolve.call0(&JsValue::NULL);
            });
            let reject_close = reject.clone();
            let on_error = Closure::once_into_js(move |_event: Event| {
                let _ = reject.call1(&JsValue::NULL, &JsValue::from_str("socket error"));
            });
            let on_close = Closure::once_into_js(move |event: CloseEvent| {
                let reason = format!("closed with code {}", event.code());
                let _ = reject_close.call1(&JsValue::NULL, &JsValue::from_str(&reason));
            });
            ws.set_onopen(Some(on_open.unchecked_ref()));
            ws.set_onerror(Some(on_error.unchecked_ref()));
            ws.set_onclose(Some(on_close.unchecked_ref()));
        });
        JsFuture::from(opened).await.map(|_| ())
    }

    fn install_handlers(&self, ws: &WebSocket, generation: u64) {
        ws.set_onopen(None);

        let on_message = Closure::<dyn FnMut(MessageEvent)>::new(|event: MessageEvent| {
            let Some(text) = event.data().as_string() else {
                return;
            };
            match serde_json::from_str::<RelayMessage>(&text) {
                Ok(RelayMessage::Welcome { version }) => {
                    push_log(&format!("relay welcome (protocol {version})"));
                }
                Ok(RelayMessage::Error { message }) => push_log(&format!("relay error: {message}")),
                Err(err) => push_log(&format!("unreadable relay message: {err}")),
            }
        });
        ws.set_onmessage(Some(on_message.as_ref().unchecked_ref()));
        on_message.forget();

        let on_error = Closure::<dyn FnMut(ErrorEvent)>::new(|e: ErrorEvent| {
            push_log(&format!("relay socket error: {}", e.message()));
        });
        ws.set_onerror(Some(on_error.as_ref().unchecked_ref()));
        on_error.forget();

        let on_close = {
            let socket = self.socket.clone();
            let state = self.state.clone();
            let observer = self.observer.clone();
            let current = self.generation.clone();
            let url = self.url.clone();
            Closure::<dyn FnMut(CloseEvent)>::new(move |event: CloseEvent| {
                if current.get() != generation {
                    return;
                }
                push_log(&format!("relay closed (code {})", event.code()));
                socket.borrow_mut().take();
                let disconnected = ConnectionState::disconnected(url.clone());
                *state.borrow_mut() = disconnected.clone();
                if let Some(observer) = observer.borrow().as_ref() {
                    observer(disconnected);
                }
            })
        };
        ws.set_onclose(Some(on_close.as_ref().unchecked_ref()));
        on_close.forget();
    }
}

#[async_trait(?Send)]
impl ConnectionManager for RelayLink {
    async fn connect(&self) -> Result<ConnectionState> {
        self.set_state(ConnectionStatus::Connecting);
        let generation = self.generation.get() + 1;
        self.generation.set(generation);

        let ws = WebSocket::new(&self.url).map_err(|err| {
            self.set_state(ConnectionStatus::Disconnected);
            Error::Connection(stringify_js_error(err))
        })?;
        ws.set_binary_type(BinaryType::Arraybuffer);

        if let Err(err) = Self::wait_open(&ws).await {
            ws.set_onopen(None);
            ws.set_onerror(None);
            ws.set_onclose(None);
            self.set_state(ConnectionStatus::Disconnected);
            return Err(Error::Connection(format!(
                "Could not reach relay at {} ({})",
                self.url,
                stringify_js_error(err)
            )));
        }

        self.install_handlers(&ws, generation);
        let hello = PanelMessage::hello().to_json()?;
        if let Err(err) = ws.send_with_str(&hello) {
            push_log(&format!("failed to send hello: {}", stringify_js_error(err)));
        }

        *self.socket.borrow_mut() = Some(Rc::new(ws));
        push_log(&format!("connected to {}", self.url));
        let state = self.set_state(ConnectionStatus::Connected);
        if let Some(callback) = self.on_connected.borrow().as_ref() {
            callback();
        }
        Ok(state)
    }

    async fn disconnect(&self) {
        self.set_state(ConnectionStatus::Disconnecting);
        self.generation.set(self.generation.get() + 1);
        let socket = self.socket.borrow_mut().take();
        if let Some(ws) = socket {
            if let Err(err) = ws.close() {
                push_log(&format!("close failed: {}", stringify_js_error(err)));
            }
        }
        self.set_state(ConnectionStatus::Disconnected);
        push_log("disconnected");
    }

    fn connection_state(&self) -> ConnectionState {
        self.state.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct FakeSocket {
        id: u32,
        open: bool,
    }

    fn is_open(socket: &FakeSocket) -> bool {
        socket.open
    }

    #[test]
    fn sender_follows_the_slot_across_reconnects() {
        let slot = RefCell::new(Some(FakeSocket { id: 1, open: true }));
        assert_eq!(current_open(&slot, is_open).map(|s| s.id), Some(1));

        // Disconnect closes and clears the first link.
        slot.borrow_mut().take();
        assert_eq!(current_open(&slot, is_open), None);

        *slot.borrow_mut() = Some(FakeSocket { id: 2, open: true });
        assert_eq!(current_open(&slot, is_open).map(|s| s.id), Some(2));
    }

    #[test]
    fn closed_socket_in_the_slot_is_skipped() {
        let slot = RefCell::new(Some(FakeSocket { id: 3, open: false }));
        assert_eq!(current_open(&slot, is_open), None);
    }
}
