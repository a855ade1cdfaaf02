//! Catalog and host surfaces over `chrome.tabs`.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tabcast::{Error, HostSurfaces, Result, Source, SourceCatalog, SourceId, Surface};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;

use crate::chrome::{self, stringify_js_error};
use crate::{push_log, Controller};

#[derive(Default)]
struct TabsState {
    sources: RefCell<Vec<Source>>,
    selected: Cell<Option<SourceId>>,
}

/// Shared handle: the controller takes one clone as catalog and one as host.
#[derive(Clone, Default)]
pub struct ChromeTabs {
    state: Rc<TabsState>,
}

impl ChromeTabs {
    pub fn new() -> Self {
        Self::default()
    }
}

fn host_error(err: JsValue) -> Error {
    Error::Host(stringify_js_error(err))
}

#[async_trait(?Send)]
impl SourceCatalog for ChromeTabs {
    async fn list_sources(&self) -> Result<Vec<Source>> {
        let tabs = chrome::query_tabs(json!({})).await.map_err(host_error)?;
        let sources: Vec<Source> = tabs.iter().filter_map(|tab| tab.to_source()).collect();
        *self.state.sources.borrow_mut() = sources.clone();
        Ok(sources)
    }

    fn select_source(&self, id: SourceId) {
        self.state.selected.set(Some(id));
    }

    fn selected_source(&self) -> Option<Source> {
        let id = self.state.selected.get()?;
        self.state
            .sources
            .borrow()
            .iter()
            .find(|source| source.id == id)
            .cloned()
    }
}

#[async_trait(?Send)]
impl HostSurfaces for ChromeTabs {
    async fn foreground_surface(&self) -> Result<Option<Surface>> {
        let tabs = chrome::query_tabs(json!({ "active": true, "currentWindow": true }))
            .await
            .map_err(host_error)?;
        Ok(tabs.first().and_then(|tab| tab.to_surface()))
    }

    async fn surface(&self, id: SourceId) -> Result<Surface> {
        let tab = chrome::get_tab(id).await.map_err(host_error)?;
        tab.to_surface()
            .ok_or_else(|| Error::Host(format!("No tab with id: {id}.")))
    }

    async fn bring_to_foreground(&self, id: SourceId) -> Result<()> {
        let props = chrome::to_js(&json!({ "active": true })).map_err(host_error)?;
        JsFuture::from(chrome::tabs_update(id.0, &props))
            .await
            .map_err(|err| {
                push_log(&format!("failed to activate tab {id}: {}", stringify_js_error(err)));
                Error::Host("Failed to activate the selected tab. Please try again.".to_string())
            })?;
        Ok(())
    }

    async fn settle(&self, delay: Duration) {
        chrome::sleep(delay).await;
    }
}

/// Refreshes the catalog whenever a tab is created, updated or removed.
pub fn watch_tabs(controller: Weak<Controller>) {
    let refresh = Rc::new(move || {
        let Some(controller) = controller.upgrade() else {
            return;
        };
        wasm_bindgen_futures::spawn_local(async move {
            if let Err(err) = controller.refresh_catalog().await {
                push_log(&format!("tab refresh failed: {err}"));
            }
        });
    });

    let on_created = {
        let refresh = refresh.clone();
        Closure::<dyn FnMut(JsValue)>::new(move |_tab: JsValue| refresh())
    };
    chrome::tabs_on_created_add_listener(&on_created);
    on_created.forget();

    let on_updated = {
        let refresh = refresh.clone();
        Closure::<dyn FnMut(JsValue, JsValue, JsValue)>::new(
            move |_id: JsValue, _change: JsValue, _tab: JsValue| refresh(),
        )
    };
    chrome::tabs_on_updated_add_listener(&on_updated);
    on_updated.forget();

    let on_removed = Closure::<dyn FnMut(JsValue, JsValue)>::new(
        move |_id: JsValue, _info: JsValue| refresh(),
    );
    chrome::tabs_on_removed_add_listener(&on_removed);
    on_removed.forget();
}
