//! Side panel binding: exports [`Panel`] to the extension's JS.

mod capture;
mod chrome;
mod link;
mod tabs;

use std::cell::RefCell;
use std::rc::Rc;

use js_sys::{Array, Function, Object, Promise, Reflect};
use tabcast::{
    Error, NoticeLevel, PanelConfig, PanelEvent, SessionController, SourceFilter, SourceId,
};
use tokio::sync::broadcast::error::RecvError;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;

use crate::capture::TabCapture;
use crate::chrome::to_js;
use crate::link::{RelayLink, SocketSlot};
use crate::tabs::{watch_tabs, ChromeTabs};

const LOG_LIMIT: usize = 40;

thread_local! {
    static LOG: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
}

pub(crate) type Controller = SessionController<ChromeTabs, RelayLink, TabCapture, ChromeTabs>;

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
}

fn js_error(err: Error) -> JsValue {
    js_sys::Error::new(&err.to_string()).into()
}

/// Controller handle for the panel UI.
///
/// Async intents return Promises. State changes are pushed to every
/// `onChange` callback as plain event objects.
#[wasm_bindgen]
pub struct Panel {
    controller: Rc<Controller>,
    listeners: Rc<RefCell<Vec<Function>>>,
}

#[wasm_bindgen]
impl Panel {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Panel {
        let config = PanelConfig::default();
        let socket: SocketSlot = Rc::default();
        let tabs = ChromeTabs::new();
        let link = RelayLink::new(config.relay_url.clone(), socket.clone());
        let capture = TabCapture::new(socket);
        let controller = Rc::new(SessionController::new(
            config,
            tabs.clone(),
            link,
            capture,
            tabs,
        ));

        let weak = Rc::downgrade(&controller);
        controller.connection().observe(move |state| {
            if let Some(controller) = weak.upgrade() {
                controller.connection_state_changed(state);
            }
        });
        let weak = Rc::downgrade(&controller);
        controller.backend().observe(move |source| {
            if let Some(controller) = weak.upgrade() {
                controller.capture_ended(source);
            }
        });
        let weak = Rc::downgrade(&controller);
        controller.connection().on_connected(move || {
            if let Some(controller) = weak.upgrade() {
                controller.backend().announce();
            }
        });
        watch_tabs(Rc::downgrade(&controller));

        let listeners: Rc<RefCell<Vec<Function>>> = Rc::default();
        forward_events(&controller, listeners.clone());

        let initial = controller.clone();
        wasm_bindgen_futures::spawn_local(async move {
            if let Err(err) = initial.refresh_catalog().await {
                push_log(&format!("initial tab query failed: {err}"));
            }
        });

        push_log("panel ready");
        Panel {
            controller,
            listeners,
        }
    }

    #[wasm_bindgen(js_name = selectSource)]
    pub fn select_source(&self, id: i32) -> Result<(), JsValue> {
        self.controller
            .select_source(SourceId(id))
            .map_err(js_error)
    }

    /// Resolves to the new connection state.
    #[wasm_bindgen(js_name = toggleConnection)]
    pub fn toggle_connection(&self) -> Promise {
        let controller = self.controller.clone();
        future_to_promise(async move {
            let state = controller.toggle_connection().await.map_err(js_error)?;
            to_js(&state)
        })
    }

    /// Resolves to the resulting phase name.
    #[wasm_bindgen(js_name = toggleStreaming)]
    pub fn toggle_streaming(&self) -> Promise {
        let controller = self.controller.clone();
        future_to_promise(async move {
            let phase = controller.toggle_streaming().await.map_err(js_error)?;
            Ok(JsValue::from_str(phase.as_str()))
        })
    }

    /// Accepts `all`, `with-audio` or `without-audio`.
    #[wasm_bindgen(js_name = setFilter)]
    pub fn set_filter(&self, name: &str) -> Result<(), JsValue> {
        let filter: SourceFilter = name.parse().map_err(|e: String| JsValue::from_str(&e))?;
        self.controller.set_filter(filter);
        Ok(())
    }

    #[wasm_bindgen(js_name = setShowAll)]
    pub fn set_show_all(&self, show_all: bool) {
        self.controller.set_show_all(show_all);
    }

    #[wasm_bindgen(js_name = refreshSources)]
    pub fn refresh_sources(&self) -> Promise {
        let controller = self.controller.clone();
        future_to_promise(async move {
            controller.refresh_catalog().await.map_err(js_error)?;
            Ok(JsValue::UNDEFINED)
        })
    }

    pub fn snapshot(&self) -> Result<JsValue, JsValue> {
        to_js(&self.controller.snapshot())
    }

    #[wasm_bindgen(js_name = onChange)]
    pub fn on_change(&self, callback: Function) {
        self.listeners.borrow_mut().push(callback);
    }
}

impl Default for Panel {
    fn default() -> Self {
        Self::new()
    }
}

/// Pumps controller events to the registered JS callbacks until the
/// controller is dropped.
fn forward_events(controller: &Controller, listeners: Rc<RefCell<Vec<Function>>>) {
    let mut events = controller.subscribe();
    wasm_bindgen_futures::spawn_local(async move {
        loop {
            let event = match events.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    push_log(&format!("dropped {skipped} panel events"));
                    continue;
                }
                Err(RecvError::Closed) => break,
            };

            if let PanelEvent::Notice(notice) = &event {
                let prefix = match notice.level {
                    NoticeLevel::Info => "",
                    NoticeLevel::Error => "error: ",
                };
                push_log(&format!("{prefix}{}", notice.message));
            }

            let value = match to_js(&event) {
                Ok(value) => value,
                Err(err) => {
                    push_log(&format!("event encode failed: {}", chrome::stringify_js_error(err)));
                    continue;
                }
            };
            let callbacks = listeners.borrow().clone();
            for callback in callbacks {
                if let Err(err) = callback.call1(&JsValue::NULL, &value) {
                    web_sys::console::error_1(&err);
                }
            }
        }
    });
}

pub(crate) fn push_log(line: &str) {
    web_sys::console::log_1(&JsValue::from_str(line));
    LOG.with(|log| {
        let mut vec = log.borrow_mut();
        vec.push(line.to_string());
        if vec.len() > LOG_LIMIT {
            let excess = vec.len() - LOG_LIMIT;
            vec.drain(0..excess);
        }
        persist_log(&vec);
    });
}

fn persist_log(lines: &[String]) {
    let array = Array::new();
    for line in lines {
        array.push(&JsValue::from_str(line));
    }
    let obj = Object::new();
    let _ = Reflect::set(&obj, &JsValue::from_str("tabcast_panel_log"), &array);
    let _ = chrome::storage_local_set(&obj);
}
