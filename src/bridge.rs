//! JS entry points.
//!
//! The host extension calls these from its node lifecycle hooks. One
//! `AssistantCore` lives per page in a thread-local; every export forwards to
//! it and converts errors into `JsValue` at this boundary only.

use js_sys::{Array, Function, Promise};
use serde::Serialize;
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;

use crate::assistant::AssistantCore;
use crate::config::Config;
use crate::error::{AssistantError, Result};
use crate::host::js::{JsHostGraph, JsHostNode};
use crate::host::{HostGraph, HostNode};
use crate::instance::AssistantInstance;
use crate::models::{FeatureId, MountState, RenderMode};
use crate::operation::{CancelToken, Progress};
use crate::providers::{ExpandProvider, LocalFuture, TranslateProvider, TranslateRequest};

thread_local! {
    static CORE: RefCell<Option<Rc<AssistantCore>>> = const { RefCell::new(None) };
}

fn core() -> std::result::Result<Rc<AssistantCore>, JsValue> {
    CORE.with(|core| core.borrow().clone())
        .ok_or_else(|| JsValue::from_str("prompt assistant is not initialised; call initAssistant() first"))
}

fn keys_array(instances: &[Rc<AssistantInstance>]) -> Array {
    instances
        .iter()
        .map(|i| JsValue::from_str(i.key().as_str()))
        .collect()
}

#[wasm_bindgen(start)]
pub fn start() -> std::result::Result<(), JsValue> {
    console_error_panic_hook::set_once();
    Ok(())
}

/// Create the engine, or refresh its config when it already exists.
#[wasm_bindgen(js_name = initAssistant)]
pub fn init(config: JsValue) -> std::result::Result<(), JsValue> {
    let config = Config::from_js(&config)?;
    if let Ok(core) = core() {
        core.update_config(config);
        return Ok(());
    }
    let core = AssistantCore::new(config);
    if core.config().enabled {
        core.start_consistency_timer();
    }
    CORE.with(|slot| *slot.borrow_mut() = Some(core));
    crate::info_log!("initialised");
    Ok(())
}

#[wasm_bindgen(js_name = updateConfig)]
pub fn update_config(config: JsValue) -> std::result::Result<(), JsValue> {
    let config = Config::from_js(&config)?;
    core()?.update_config(config);
    Ok(())
}

/// Mount toolbars on a node's eligible inputs; returns their keys.
#[wasm_bindgen(js_name = scanNode)]
pub fn scan_node(node: JsValue) -> std::result::Result<Array, JsValue> {
    let node: Rc<dyn HostNode> = Rc::new(JsHostNode::new(node));
    Ok(keys_array(&core()?.scan_node(node)))
}

#[wasm_bindgen(js_name = scanGraph)]
pub fn scan_graph(graph: JsValue) -> std::result::Result<Array, JsValue> {
    let graph: Rc<dyn HostGraph> = Rc::new(JsHostGraph::new(graph));
    Ok(keys_array(&core()?.scan_graph(graph)))
}

/// Tear down one node's toolbars, or every toolbar when `node_id` is absent.
/// Without `graph_id` the node id is matched in every graph.
#[wasm_bindgen]
pub fn cleanup(node_id: Option<String>, silent: Option<bool>, graph_id: Option<String>) -> std::result::Result<u32, JsValue> {
    let removed = core()?.cleanup_in_graph(graph_id.as_deref(), node_id.as_deref(), silent.unwrap_or(false));
    Ok(removed as u32)
}

/// Tear down the toolbars of a removed host node object.
#[wasm_bindgen(js_name = cleanupNode)]
pub fn cleanup_node(node: JsValue, silent: Option<bool>) -> std::result::Result<u32, JsValue> {
    let removed = core()?.cleanup_node(&JsHostNode::new(node), silent.unwrap_or(false));
    Ok(removed as u32)
}

#[wasm_bindgen(js_name = cleanupElement)]
pub fn cleanup_element(element: web_sys::Element) -> std::result::Result<bool, JsValue> {
    Ok(core()?.cleanup_element(&element))
}

#[wasm_bindgen(js_name = hasInstance)]
pub fn has_instance(key: &str) -> std::result::Result<bool, JsValue> {
    Ok(core()?.has_instance(key))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InstanceSnapshot {
    key: String,
    node_id: String,
    input_id: String,
    state: MountState,
    render_mode: Option<RenderMode>,
    busy: bool,
    can_undo: bool,
    can_redo: bool,
}

/// Plain-object view of one instance, `undefined` when unknown.
#[wasm_bindgen(js_name = getInstance)]
pub fn get_instance(key: &str) -> std::result::Result<JsValue, JsValue> {
    let core = core()?;
    let Some(instance) = core.get_instance(key) else {
        return Ok(JsValue::UNDEFINED);
    };
    let history = core.history_store();
    let snapshot = InstanceSnapshot {
        key: instance.key().to_string(),
        node_id: instance.node_id().to_string(),
        input_id: instance.input_id().to_string(),
        state: instance.state(),
        render_mode: instance.render_mode(),
        busy: instance.is_busy(),
        can_undo: history.can_undo(instance.history_key()),
        can_redo: history.can_redo(instance.history_key()),
    };
    Ok(serde_wasm_bindgen::to_value(&snapshot).map_err(AssistantError::from)?)
}

#[wasm_bindgen(js_name = instanceKeys)]
pub fn instance_keys() -> std::result::Result<Array, JsValue> {
    Ok(core()?.instance_keys().into_iter().map(JsValue::from).collect())
}

#[wasm_bindgen(js_name = onSelectionChanged)]
pub fn on_selection_changed(graph: JsValue, node_ids: Array) -> std::result::Result<(), JsValue> {
    let ids: Vec<String> = node_ids
        .iter()
        .filter_map(|id| id.as_string().or_else(|| id.as_f64().map(|n| format!("{}", n as i64))))
        .collect();
    core()?.on_selection_changed(Rc::new(JsHostGraph::new(graph)), &ids);
    Ok(())
}

#[wasm_bindgen(js_name = checkConsistency)]
pub fn check_consistency() -> std::result::Result<u32, JsValue> {
    Ok(core()?.check_consistency() as u32)
}

/// Same as clicking the toolbar button, for keyboard shortcuts and menus.
#[wasm_bindgen(js_name = triggerFeature)]
pub fn trigger_feature(key: &str, feature: &str) -> std::result::Result<bool, JsValue> {
    let core = core()?;
    let Some(feature) = FeatureId::parse(feature) else {
        return Err(JsValue::from_str(&format!("unknown feature {}", feature)));
    };
    match core.get_instance(key) {
        Some(instance) => {
            core.dispatch_feature(&instance, feature);
            Ok(true)
        }
        None => Ok(false),
    }
}

fn provider_error(err: JsValue) -> AssistantError {
    match AssistantError::from(err) {
        AssistantError::Dom(message) => AssistantError::OperationFailed(message),
        other => other,
    }
}

/// Await `value` when the provider handed back a promise.
async fn settle(value: JsValue) -> Result<JsValue> {
    match value.dyn_into::<Promise>() {
        Ok(promise) => JsFuture::from(promise).await.map_err(provider_error),
        Err(plain) => Ok(plain),
    }
}

/// `(text, from, to) => string | Promise<string>`
struct JsTranslateProvider {
    callback: Function,
}

impl TranslateProvider for JsTranslateProvider {
    fn translate(&self, request: TranslateRequest) -> LocalFuture<Result<String>> {
        let callback = self.callback.clone();
        Box::pin(async move {
            let value = callback
                .call3(
                    &JsValue::NULL,
                    &JsValue::from_str(&request.text),
                    &JsValue::from_str(&request.from),
                    &JsValue::from_str(&request.to),
                )
                .map_err(provider_error)?;
            settle(value)
                .await?
                .as_string()
                .ok_or_else(|| AssistantError::OperationFailed("translation provider returned no text".into()))
        })
    }
}

/// `(text, onChunk) => Promise<string>`; `onChunk(partial)` may be called any
/// number of times before the promise settles.
struct JsExpandProvider {
    callback: Function,
}

impl ExpandProvider for JsExpandProvider {
    fn expand(&self, text: String, progress: Progress, token: CancelToken) -> LocalFuture<Result<String>> {
        let callback = self.callback.clone();
        Box::pin(async move {
            let on_chunk = Closure::wrap(Box::new(move |chunk: JsValue| {
                if let Some(partial) = chunk.as_string() {
                    progress.report(&partial);
                }
            }) as Box<dyn FnMut(JsValue)>);
            let value = callback
                .call2(&JsValue::NULL, &JsValue::from_str(&text), on_chunk.as_ref())
                .map_err(provider_error)?;
            let result = settle(value).await;
            // Late chunks after this point hit a dropped closure; the provider
            // must stop calling it once its promise settled.
            drop(on_chunk);
            if token.is_cancelled() {
                return Err(AssistantError::OperationCancelled);
            }
            result?
                .as_string()
                .ok_or_else(|| AssistantError::OperationFailed("expand provider returned no text".into()))
        })
    }
}

#[wasm_bindgen(js_name = setTranslateProvider)]
pub fn set_translate_provider(callback: Function) -> std::result::Result<(), JsValue> {
    core()?.set_translate_provider(Rc::new(JsTranslateProvider { callback }));
    Ok(())
}

#[wasm_bindgen(js_name = setExpandProvider)]
pub fn set_expand_provider(callback: Function) -> std::result::Result<(), JsValue> {
    core()?.set_expand_provider(Rc::new(JsExpandProvider { callback }));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    async fn js_translate_provider_awaits_promises() {
        let callback = Function::new_with_args("text, from, to", "return Promise.resolve(to + ':' + text);");
        let provider = JsTranslateProvider { callback };
        let result = provider
            .translate(TranslateRequest {
                text: "hello".into(),
                from: "en".into(),
                to: "zh".into(),
            })
            .await;
        assert_eq!(result, Ok("zh:hello".to_string()));
    }

    #[wasm_bindgen_test]
    async fn rejected_promise_becomes_operation_failure() {
        let callback = Function::new_with_args("text", "return Promise.reject(new Error('quota'));");
        let provider = JsTranslateProvider { callback };
        let result = provider
            .translate(TranslateRequest {
                text: "x".into(),
                from: "auto".into(),
                to: "zh".into(),
            })
            .await;
        assert_eq!(result, Err(AssistantError::OperationFailed("quota".into())));
    }

    #[wasm_bindgen_test]
    fn exports_require_init() {
        CORE.with(|slot| slot.borrow_mut().take());
        assert!(has_instance("root:1:text").is_err());
        init(JsValue::UNDEFINED).unwrap();
        assert_eq!(has_instance("root:1:text").unwrap(), false);
        assert!(get_instance("root:1:text").unwrap().is_undefined());
        assert_eq!(instance_keys().unwrap().length(), 0);
    }
}
