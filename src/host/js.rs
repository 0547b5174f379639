//! Adapters from LiteGraph-style JS objects to the host traits.
//!
//! This is the only place that inspects host objects by property name. Any
//! shape the host has shipped over time is folded into `WidgetInfo` here.

use js_sys::{Array, Reflect};
use std::rc::Rc;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Element, HtmlElement};

use super::{HostGraph, HostNode, WidgetInfo, WidgetKind};
use crate::constants::ATTR_NODE_ID;
use crate::dom_utils::{attr_selector, document};

fn prop(target: &JsValue, name: &str) -> Option<JsValue> {
    if !target.is_object() {
        return None;
    }
    Reflect::get(target, &JsValue::from_str(name))
        .ok()
        .filter(|v| !v.is_undefined() && !v.is_null())
}

/// Numeric ids become their integer form, strings pass through.
fn id_string(value: &JsValue) -> Option<String> {
    if let Some(s) = value.as_string() {
        return Some(s);
    }
    value.as_f64().map(|n| {
        if n.fract() == 0.0 {
            format!("{}", n as i64)
        } else {
            n.to_string()
        }
    })
}

fn widget_kind(widget: &JsValue) -> WidgetKind {
    let ty = prop(widget, "type")
        .and_then(|t| t.as_string())
        .unwrap_or_default()
        .to_ascii_lowercase();
    let multiline = prop(widget, "options")
        .and_then(|o| prop(&o, "multiline"))
        .and_then(|m| m.as_bool())
        .unwrap_or(false);
    match ty.as_str() {
        "customtext" | "textarea" => WidgetKind::MultilineText,
        "markdown" | "note" => WidgetKind::Document,
        "text" | "string" if multiline => WidgetKind::MultilineText,
        "text" | "string" => WidgetKind::Text,
        _ => WidgetKind::Other,
    }
}

fn widget_element(widget: &JsValue) -> Option<HtmlElement> {
    ["inputEl", "element"]
        .iter()
        .filter_map(|name| prop(widget, name))
        .find_map(|v| v.dyn_into::<HtmlElement>().ok())
}

pub struct JsHostNode {
    raw: JsValue,
}

impl JsHostNode {
    pub fn new(raw: JsValue) -> Self {
        Self { raw }
    }
}

impl HostNode for JsHostNode {
    fn id(&self) -> String {
        prop(&self.raw, "id")
            .and_then(|v| id_string(&v))
            .unwrap_or_default()
    }

    fn graph_id(&self) -> String {
        prop(&self.raw, "graph")
            .and_then(|g| prop(&g, "id"))
            .and_then(|v| id_string(&v))
            .unwrap_or_else(|| "root".to_string())
    }

    fn type_name(&self) -> String {
        prop(&self.raw, "type")
            .or_else(|| prop(&self.raw, "comfyClass"))
            .and_then(|v| v.as_string())
            .unwrap_or_default()
    }

    fn widgets(&self) -> Vec<WidgetInfo> {
        let Some(list) = prop(&self.raw, "widgets") else {
            return Vec::new();
        };
        if !Array::is_array(&list) {
            return Vec::new();
        }
        Array::from(&list)
            .iter()
            .enumerate()
            .map(|(index, widget)| WidgetInfo {
                name: prop(&widget, "name")
                    .and_then(|n| n.as_string())
                    .unwrap_or_else(|| format!("widget{}", index)),
                index: Some(index),
                kind: widget_kind(&widget),
                element: widget_element(&widget),
            })
            .collect()
    }

    fn dom_root(&self) -> Option<Element> {
        let id = self.id();
        if id.is_empty() {
            return None;
        }
        document()
            .ok()?
            .query_selector(&attr_selector(ATTR_NODE_ID, &id))
            .ok()
            .flatten()
    }

    fn subgraph(&self) -> Option<Rc<dyn HostGraph>> {
        prop(&self.raw, "subgraph").map(|g| Rc::new(JsHostGraph::new(g)) as Rc<dyn HostGraph>)
    }

    fn is_alive(&self) -> bool {
        prop(&self.raw, "graph").is_some()
    }
}

pub struct JsHostGraph {
    raw: JsValue,
}

impl JsHostGraph {
    pub fn new(raw: JsValue) -> Self {
        Self { raw }
    }
}

impl HostGraph for JsHostGraph {
    fn id(&self) -> String {
        prop(&self.raw, "id")
            .and_then(|v| id_string(&v))
            .unwrap_or_else(|| "root".to_string())
    }

    fn nodes(&self) -> Vec<Rc<dyn HostNode>> {
        let list = prop(&self.raw, "_nodes").or_else(|| prop(&self.raw, "nodes"));
        match list {
            Some(list) if Array::is_array(&list) => Array::from(&list)
                .iter()
                .map(|n| Rc::new(JsHostNode::new(n)) as Rc<dyn HostNode>)
                .collect(),
            _ => Vec::new(),
        }
    }
}
