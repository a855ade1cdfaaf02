//! Bindings to the `chrome.*` extension APIs and small JS helpers.

use std::time::Duration;

use js_sys::{Function, Promise, Reflect};
use serde::{Deserialize, Serialize};
use tabcast::{Source, SourceId, Surface, SurfaceStatus};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = ["chrome", "tabs"], js_name = query)]
    pub fn tabs_query(query: &JsValue) -> Promise;

    #[wasm_bindgen(js_namespace = ["chrome", "tabs"], js_name = get)]
    pub fn tabs_get(tab_id: i32) -> Promise;

    #[wasm_bindgen(js_namespace = ["chrome", "tabs"], js_name = update)]
    pub fn tabs_update(tab_id: i32, props: &JsValue) -> Promise;

    #[wasm_bindgen(js_namespace = ["chrome", "tabs", "onCreated"], js_name = addListener)]
    pub fn tabs_on_created_add_listener(cb: &Closure<dyn FnMut(JsValue)>);

    #[wasm_bindgen(js_namespace = ["chrome", "tabs", "onUpdated"], js_name = addListener)]
    pub fn tabs_on_updated_add_listener(cb: &Closure<dyn FnMut(JsValue, JsValue, JsValue)>);

    #[wasm_bindgen(js_namespace = ["chrome", "tabs", "onRemoved"], js_name = addListener)]
    pub fn tabs_on_removed_add_listener(cb: &Closure<dyn FnMut(JsValue, JsValue)>);

    #[wasm_bindgen(js_namespace = ["chrome", "tabCapture"], js_name = capture)]
    pub fn tab_capture_capture(options: &JsValue, callback: &JsValue);

    #[wasm_bindgen(js_namespace = ["chrome", "storage", "local"], js_name = set)]
    pub fn storage_local_set(items: &JsValue) -> Promise;

    #[wasm_bindgen(js_name = setTimeout)]
    fn set_timeout(handler: &Function, millis: i32) -> JsValue;
}

/// `chrome.tabs.Tab`, reduced to the fields the panel reads.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tab {
    pub id: Option<i32>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub audible: Option<bool>,
    #[serde(default)]
    pub fav_icon_url: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl Tab {
    /// Tabs without an id (devtools windows, some prerenders) are skipped.
    pub fn to_source(&self) -> Option<Source> {
        Some(Source {
            id: SourceId(self.id?),
            title: self.title.clone().unwrap_or_default(),
            url: self.url.clone(),
            audible: self.audible.unwrap_or(false),
            fav_icon_url: self.fav_icon_url.clone(),
        })
    }

    pub fn to_surface(&self) -> Option<Surface> {
        Some(Surface {
            id: SourceId(self.id?),
            url: self.url.clone(),
            status: match self.status.as_deref() {
                Some("complete") => SurfaceStatus::Complete,
                _ => SurfaceStatus::Loading,
            },
        })
    }
}

pub async fn query_tabs(query: serde_json::Value) -> Result<Vec<Tab>, JsValue> {
    let value = JsFuture::from(tabs_query(&to_js(&query)?)).await?;
    Ok(serde_wasm_bindgen::from_value(value)?)
}

pub async fn get_tab(id: SourceId) -> Result<Tab, JsValue> {
    let value = JsFuture::from(tabs_get(id.0)).await?;
    Ok(serde_wasm_bindgen::from_value(value)?)
}

/// Resolves after `delay` on the page's timer.
pub async fn sleep(delay: Duration) {
    let millis = i32::try_from(delay.as_millis()).unwrap_or(i32::MAX);
    let promise = Promise::new(&mut |resolve, _reject| {
        set_timeout(&resolve, millis);
    });
    let _ = JsFuture::from(promise).await;
}

/// Message of `chrome.runtime.lastError`, if set.
pub fn last_error() -> Option<String> {
    let chrome = Reflect::get(&js_sys::global(), &JsValue::from_str("chrome")).ok()?;
    let runtime = Reflect::get(&chrome, &JsValue::from_str("runtime")).ok()?;
    let error = Reflect::get(&runtime, &JsValue::from_str("lastError")).ok()?;
    if error.is_undefined() || error.is_null() {
        return None;
    }
    Some(
        Reflect::get(&error, &JsValue::from_str("message"))
            .ok()
            .and_then(|m| m.as_string())
            .unwrap_or_else(|| "Unknown error".to_string()),
    )
}

/// Serializes to plain JS objects rather than `Map`s.
pub fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, JsValue> {
    Ok(value.serialize(&serde_wasm_bindgen::Serializer::json_compatible())?)
}

pub fn stringify_js_error(err: JsValue) -> String {
    if let Some(message) = err.dyn_ref::<js_sys::Error>().map(|e| String::from(e.message())) {
        return message;
    }
    err.as_string()
        .or_else(|| js_sys::JSON::stringify(&err).ok()?.as_string())
        .unwrap_or_else(|| format!("{:?}", err))
}
