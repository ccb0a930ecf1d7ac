use js_sys::Promise;
use serde::Serialize;
use serde_wasm_bindgen::{from_value, Serializer};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{spawn_local, JsFuture};

use super::*;

#[wasm_bindgen(inline_js = r#"
let database = null;
const listeners = new Map();
let nextListenerId = 1;

function requireDatabase() {
  if (!database) {
    throw new Error('realtime database is not initialized');
  }
  return database;
}

export function jsRuntimeBackendConfig() {
  const config = globalThis.firebaseConfig;
  return config && typeof config === 'object' ? config : null;
}

export function jsRealtimeInit(config) {
  try {
    if (typeof firebase === 'undefined' || typeof firebase.initializeApp !== 'function') {
      return 'Firebase SDK is not loaded on this page';
    }
    const app = firebase.apps && firebase.apps.length
      ? firebase.app()
      : firebase.initializeApp(config);
    database = app.database();
    return null;
  } catch (err) {
    return String((err && err.message) || err);
  }
}

export function jsRealtimeSubscribe(path, orderByChild, limit, callback) {
  let query = requireDatabase().ref(path);
  if (orderByChild != null) {
    query = query.orderByChild(orderByChild);
  }
  if (limit != null) {
    query = query.limitToLast(limit);
  }
  const id = nextListenerId++;
  const handler = (snapshot) => {
    const value = snapshot.val();
    queueMicrotask(() => {
      if (listeners.has(id)) {
        callback(value);
      }
    });
  };
  const onError = (err) => console.error(`realtime listener on '${path}' failed`, err);
  query.on('value', handler, onError);
  listeners.set(id, () => query.off('value', handler));
  return id;
}

export function jsRealtimeUnsubscribe(id) {
  const off = listeners.get(id);
  if (off) {
    listeners.delete(id);
    off();
  }
}

export function jsRealtimeGet(path) {
  return requireDatabase().ref(path).get().then((snapshot) => snapshot.val());
}

export function jsRealtimeSet(path, value) {
  return requireDatabase().ref(path).set(value);
}

export function jsRealtimePush(path, value) {
  const child = requireDatabase().ref(path).push();
  return { key: child.key, done: child.set(value) };
}

export function jsRealtimeRemove(path) {
  return requireDatabase().ref(path).remove();
}

export function jsRealtimeRemoveOnDisconnect(path) {
  return requireDatabase().ref(path).onDisconnect().remove();
}
"#)]
extern "C" {
    #[wasm_bindgen(js_name = jsRuntimeBackendConfig)]
    fn js_runtime_backend_config() -> JsValue;
    #[wasm_bindgen(js_name = jsRealtimeInit)]
    fn js_realtime_init(config: JsValue) -> Option<String>;
    #[wasm_bindgen(catch, js_name = jsRealtimeSubscribe)]
    fn js_realtime_subscribe(
        path: &str,
        order_by_child: Option<String>,
        limit: Option<u32>,
        callback: &Closure<dyn Fn(JsValue)>,
    ) -> Result<u32, JsValue>;
    #[wasm_bindgen(js_name = jsRealtimeUnsubscribe)]
    fn js_realtime_unsubscribe(id: u32);
    #[wasm_bindgen(catch, js_name = jsRealtimeGet)]
    fn js_realtime_get(path: &str) -> Result<Promise, JsValue>;
    #[wasm_bindgen(catch, js_name = jsRealtimeSet)]
    fn js_realtime_set(path: &str, value: JsValue) -> Result<Promise, JsValue>;
    #[wasm_bindgen(catch, js_name = jsRealtimePush)]
    fn js_realtime_push(path: &str, value: JsValue) -> Result<JsValue, JsValue>;
    #[wasm_bindgen(catch, js_name = jsRealtimeRemove)]
    fn js_realtime_remove(path: &str) -> Result<Promise, JsValue>;
    #[wasm_bindgen(catch, js_name = jsRealtimeRemoveOnDisconnect)]
    fn js_realtime_remove_on_disconnect(path: &str) -> Result<Promise, JsValue>;
}

fn js_error_to_string(err: JsValue) -> String {
    if let Some(s) = err.as_string() {
        return s;
    }
    if let Ok(message) = js_sys::Reflect::get(&err, &JsValue::from_str("message")) {
        if let Some(s) = message.as_string() {
            return s;
        }
    }
    format!("{err:?}")
}

fn json_to_js(value: &Value) -> Result<JsValue, String> {
    value
        .serialize(&Serializer::json_compatible())
        .map_err(|e| e.to_string())
}

fn js_to_json(value: JsValue) -> Option<Value> {
    if value.is_null() || value.is_undefined() {
        return None;
    }
    match from_value(value) {
        Ok(value) => Some(value),
        Err(err) => {
            web_sys::console::warn_1(&JsValue::from_str(&format!(
                "realtime snapshot could not be decoded: {err}"
            )));
            None
        }
    }
}

fn settle_in_background(what: &'static str, path: &str, promise: Promise) {
    let path = path.to_string();
    spawn_local(async move {
        if let Err(err) = JsFuture::from(promise).await {
            web_sys::console::warn_1(&JsValue::from_str(&format!(
                "realtime {what} at '{path}' failed: {}",
                js_error_to_string(err)
            )));
        }
    });
}

pub fn runtime_backend_config() -> Option<Value> {
    js_to_json(js_runtime_backend_config())
}

pub fn realtime_init(config: &Value) -> Result<(), String> {
    match js_realtime_init(json_to_js(config)?) {
        None => Ok(()),
        Some(reason) => Err(reason),
    }
}

pub fn realtime_subscribe(
    path: &str,
    query: Option<&RealtimeQuery>,
    callback: RealtimeCallback,
) -> Result<RealtimeSubscription, String> {
    let closure = Closure::<dyn Fn(JsValue)>::new(move |value: JsValue| {
        callback(js_to_json(value));
    });
    let order_by_child = query.map(|query| query.order_by_child.clone());
    let limit = query.map(|query| u32::try_from(query.limit_to_last).unwrap_or(u32::MAX));
    let id = js_realtime_subscribe(path, order_by_child, limit, &closure)
        .map_err(js_error_to_string)?;
    Ok(RealtimeSubscription::new(move || {
        js_realtime_unsubscribe(id);
        drop(closure);
    }))
}

pub async fn realtime_get(path: &str) -> Result<Option<Value>, String> {
    let promise = js_realtime_get(path).map_err(js_error_to_string)?;
    let value = JsFuture::from(promise)
        .await
        .map_err(js_error_to_string)?;
    Ok(js_to_json(value))
}

pub fn realtime_set(path: &str, value: &Value) -> Result<(), String> {
    let promise = js_realtime_set(path, json_to_js(value)?).map_err(js_error_to_string)?;
    settle_in_background("write", path, promise);
    Ok(())
}

pub fn realtime_push(path: &str, value: &Value) -> Result<String, String> {
    let handle = js_realtime_push(path, json_to_js(value)?).map_err(js_error_to_string)?;
    let key = js_sys::Reflect::get(&handle, &JsValue::from_str("key"))
        .map_err(js_error_to_string)?
        .as_string()
        .ok_or_else(|| "realtime push returned no key".to_string())?;
    let done = js_sys::Reflect::get(&handle, &JsValue::from_str("done"))
        .map_err(js_error_to_string)?;
    settle_in_background("push", path, Promise::resolve(&done));
    Ok(key)
}

pub fn realtime_remove(path: &str) -> Result<(), String> {
    let promise = js_realtime_remove(path).map_err(js_error_to_string)?;
    settle_in_background("remove", path, promise);
    Ok(())
}

pub fn realtime_remove_on_disconnect(path: &str) -> Result<(), String> {
    let promise = js_realtime_remove_on_disconnect(path).map_err(js_error_to_string)?;
    settle_in_background("onDisconnect registration", path, promise);
    Ok(())
}
