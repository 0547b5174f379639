//! dom_utils.rs – thin helper layer for repetitive DOM operations used by
//! the mount and binding code.

use wasm_bindgen::JsCast;
use web_sys::{Document, Element, Event, EventInit, HtmlElement, HtmlInputElement, HtmlTextAreaElement};

use crate::error::{AssistantError, Result};

pub fn document() -> Result<Document> {
    web_sys::window()
        .and_then(|w| w.document())
        .ok_or_else(|| AssistantError::Dom("no document available".into()))
}

/// `[name="value"]` with the value escaped for a quoted CSS string.
pub fn attr_selector(name: &str, value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("[{}=\"{}\"]", name, escaped)
}

pub fn is_text_surface(el: &Element) -> bool {
    if el.is_instance_of::<HtmlTextAreaElement>() {
        return true;
    }
    if let Some(input) = el.dyn_ref::<HtmlInputElement>() {
        return input.type_() == "text";
    }
    el.dyn_ref::<HtmlElement>()
        .is_some_and(|h| h.is_content_editable())
}

/// Current text of an input, textarea or editable surface.
pub fn read_content(el: &HtmlElement) -> String {
    if let Some(area) = el.dyn_ref::<HtmlTextAreaElement>() {
        area.value()
    } else if let Some(input) = el.dyn_ref::<HtmlInputElement>() {
        input.value()
    } else {
        el.inner_text()
    }
}

/// Replace the text and notify the host with a bubbling `input` event so its
/// own model picks the change up.
pub fn write_content(el: &HtmlElement, text: &str) -> Result<()> {
    if let Some(area) = el.dyn_ref::<HtmlTextAreaElement>() {
        area.set_value(text);
    } else if let Some(input) = el.dyn_ref::<HtmlInputElement>() {
        input.set_value(text);
    } else {
        el.set_inner_text(text);
    }
    let init = EventInit::new();
    init.set_bubbles(true);
    let event = Event::new_with_event_init_dict("input", &init)?;
    el.dispatch_event(&event)?;
    Ok(())
}

/// Give a statically positioned container `position: relative` so the
/// absolutely positioned toolbar anchors to it.
pub fn ensure_positioned(container: &HtmlElement) -> Result<()> {
    let window = web_sys::window().ok_or_else(|| AssistantError::Dom("no window".into()))?;
    let position = window
        .get_computed_style(container)?
        .map(|style| style.get_property_value("position"))
        .transpose()?
        .unwrap_or_default();
    if position.is_empty() || position == "static" {
        container.style().set_property("position", "relative")?;
    }
    Ok(())
}
