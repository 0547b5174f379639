//! Toolbar DOM: one root per instance, one button per feature.

use std::collections::HashMap;
use std::rc::Rc;
use wasm_bindgen::{closure::Closure, JsCast};
use web_sys::{Document, Event, HtmlButtonElement, HtmlElement};

use crate::constants::*;
use crate::error::Result;
use crate::history::HistoryStore;
use crate::instance::{AssistantInstance, Cleanup};
use crate::binding::listen;
use crate::layout;
use crate::models::{FeatureId, LayoutDirection};

pub struct Toolbar {
    pub root: HtmlElement,
    pub buttons: HashMap<FeatureId, HtmlElement>,
    pub cleanups: Vec<Cleanup>,
}

/// Build the toolbar for `instance`. Nothing is attached to the document yet;
/// `on_feature` runs on every button click.
pub fn build(
    document: &Document,
    instance: &AssistantInstance,
    direction: LayoutDirection,
    on_feature: Rc<dyn Fn(FeatureId)>,
) -> Result<Toolbar> {
    let root: HtmlElement = document.create_element("div")?.unchecked_into();
    root.set_class_name(CSS_ROOT);
    root.set_attribute(ATTR_INSTANCE, instance.key().as_str())?;
    root.style().set_property("position", "absolute")?;
    root.style().set_property("right", &format!("{}px", TOOLBAR_EDGE_OFFSET_PX))?;
    root.style().set_property("bottom", &format!("{}px", TOOLBAR_EDGE_OFFSET_PX))?;
    layout::apply_direction(&root, direction);

    let mut buttons = HashMap::new();
    let mut cleanups: Vec<Cleanup> = Vec::new();
    for feature in FeatureId::ALL {
        let button: HtmlElement = document.create_element("button")?.unchecked_into();
        button.set_attribute("type", "button")?;
        button.set_class_name(CSS_BUTTON);
        button.set_attribute(ATTR_FEATURE, feature.as_str())?;
        button.set_title(feature.title());
        button.set_attribute("aria-label", feature.title())?;
        button.set_text_content(Some(feature.label()));

        // Keep focus in the input: a blur here would record a snapshot.
        let keep_focus = Closure::wrap(Box::new(|e: Event| e.prevent_default()) as Box<dyn FnMut(Event)>);
        cleanups.push(listen(button.as_ref(), "mousedown", keep_focus)?);

        let on_feature = on_feature.clone();
        let on_click = Closure::wrap(Box::new(move |e: Event| {
            e.stop_propagation();
            on_feature(feature);
        }) as Box<dyn FnMut(Event)>);
        cleanups.push(listen(button.as_ref(), "click", on_click)?);

        root.append_child(&button)?;
        buttons.insert(feature, button);
    }

    Ok(Toolbar {
        root,
        buttons,
        cleanups,
    })
}

/// Reflect undo/redo availability on the buttons.
pub fn sync_history_buttons(instance: &AssistantInstance, history: &HistoryStore) {
    let key = instance.history_key();
    for (feature, enabled) in [
        (FeatureId::Undo, history.can_undo(key)),
        (FeatureId::Redo, history.can_redo(key)),
    ] {
        if let Some(button) = instance
            .button(feature)
            .and_then(|b| b.dyn_into::<HtmlButtonElement>().ok())
        {
            button.set_disabled(!enabled);
        }
    }
}

/// Inject the toolbar stylesheet once per document.
pub fn ensure_styles(document: &Document) -> Result<()> {
    if document.get_element_by_id(STYLE_ELEMENT_ID).is_some() {
        return Ok(());
    }

    let css = "
.prompt-assistant{display:flex;gap:2px;z-index:10;padding:2px;border-radius:4px;background:rgba(30,30,30,.75);font-family:Arial,Helvetica,sans-serif;pointer-events:auto}
.prompt-assistant.pa-vertical{flex-direction:column}
.pa-button{border:none;background:transparent;color:#ddd;cursor:pointer;font-size:12px;min-width:20px;height:20px;padding:0 4px;border-radius:3px}
.pa-button:hover:not(:disabled){background:rgba(255,255,255,.15)}
.pa-button:disabled{opacity:.35;cursor:default}
.pa-button.pa-processing{animation:pa-pulse 1s ease-in-out infinite}
.pa-status-tip{position:absolute;bottom:100%;margin-bottom:4px;white-space:nowrap;padding:4px 8px;border-radius:4px;color:#fff;font-size:11px;box-shadow:0 2px 4px rgba(0,0,0,.2)}
.pa-tip-error{background:#dc2626}
.pa-tip-info{background:#2563eb}
.pa-tip-success{background:#16a34a}
@keyframes pa-pulse{50%{opacity:.4}}
";

    let style = document.create_element("style")?;
    style.set_id(STYLE_ELEMENT_ID);
    style.set_text_content(Some(css));
    match document.head() {
        Some(head) => head.append_child(&style)?,
        None => document
            .body()
            .ok_or_else(|| crate::error::AssistantError::Dom("no body".into()))?
            .append_child(&style)?,
    };
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom_utils::document;
    use crate::models::InstanceKey;
    use std::cell::RefCell;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn builds_one_button_per_feature() {
        let doc = document().unwrap();
        let inst = AssistantInstance::new(InstanceKey::new("root", "5", "text", None));
        let clicked = Rc::new(RefCell::new(Vec::new()));
        let sink = clicked.clone();
        let toolbar = build(
            &doc,
            &inst,
            LayoutDirection::Vertical,
            Rc::new(move |f| sink.borrow_mut().push(f)),
        )
        .unwrap();

        assert_eq!(toolbar.buttons.len(), 4);
        assert_eq!(toolbar.cleanups.len(), 8);
        assert_eq!(toolbar.root.get_attribute(ATTR_INSTANCE).as_deref(), Some("root:5:text"));
        assert!(toolbar.root.class_list().contains(CSS_LAYOUT_VERTICAL));

        toolbar.buttons[&FeatureId::Translate].click();
        toolbar.buttons[&FeatureId::Undo].click();
        assert_eq!(*clicked.borrow(), vec![FeatureId::Translate, FeatureId::Undo]);

        for cleanup in toolbar.cleanups {
            cleanup();
        }
        toolbar.buttons[&FeatureId::Expand].click();
        assert_eq!(clicked.borrow().len(), 2);
    }

    #[wasm_bindgen_test]
    fn styles_are_injected_once() {
        let doc = document().unwrap();
        ensure_styles(&doc).unwrap();
        ensure_styles(&doc).unwrap();
        let count = doc
            .query_selector_all(&format!("#{}", STYLE_ELEMENT_ID))
            .unwrap()
            .length();
        assert_eq!(count, 1);
    }
}
