//! Transient status tips anchored to a toolbar control.
//! One tip per anchor; a new one replaces the old. Tips remove themselves
//! after `duration_ms`.

use gloo_timers::callback::Timeout;
use wasm_bindgen::JsCast;
use web_sys::{Element, HtmlElement};

use crate::constants::CSS_TIP;
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TipKind {
    Error,
    Info,
    Success,
}

impl TipKind {
    fn class(self) -> &'static str {
        match self {
            TipKind::Error => "pa-tip-error",
            TipKind::Info => "pa-tip-info",
            TipKind::Success => "pa-tip-success",
        }
    }
}

/// Show `message` beside `anchor`. The tip is placed in the anchor's parent
/// (the toolbar root) so it goes away with the toolbar.
pub fn show_tip(anchor: &HtmlElement, message: &str, kind: TipKind, duration_ms: u32) {
    if let Err(e) = try_show(anchor, message, kind, duration_ms) {
        crate::debug_log!("status tip not shown: {}", e);
    }
}

fn try_show(anchor: &HtmlElement, message: &str, kind: TipKind, duration_ms: u32) -> Result<()> {
    let Some(host) = anchor.parent_element() else {
        return Ok(());
    };
    let document = crate::dom_utils::document()?;

    if let Some(old) = existing_tip(&host)? {
        old.remove();
    }

    let tip = document.create_element("div")?;
    tip.set_class_name(CSS_TIP);
    tip.class_list().add_1(kind.class())?;
    tip.set_attribute("role", "status")?;
    tip.set_text_content(Some(message));
    let tip: HtmlElement = tip.unchecked_into();
    tip.style()
        .set_property("left", &format!("{}px", anchor.offset_left()))?;
    host.append_child(&tip)?;

    Timeout::new(duration_ms, move || tip.remove()).forget();
    Ok(())
}

fn existing_tip(host: &Element) -> Result<Option<Element>> {
    Ok(host.query_selector(&format!(":scope > .{}", CSS_TIP))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom_utils::document;
    use gloo_timers::future::TimeoutFuture;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    fn toolbar_with_button() -> (Element, HtmlElement) {
        let doc = document().unwrap();
        let root = doc.create_element("div").unwrap();
        let button: HtmlElement = doc.create_element("button").unwrap().unchecked_into();
        root.append_child(&button).unwrap();
        doc.body().unwrap().append_child(&root).unwrap();
        (root, button)
    }

    #[wasm_bindgen_test]
    async fn tip_replaces_previous_and_expires() {
        let (root, button) = toolbar_with_button();
        show_tip(&button, "first", TipKind::Info, 30);
        show_tip(&button, "second", TipKind::Error, 30);

        let tips = root.query_selector_all(".pa-status-tip").unwrap();
        assert_eq!(tips.length(), 1);
        let tip = root.query_selector(".pa-status-tip").unwrap().unwrap();
        assert_eq!(tip.text_content().as_deref(), Some("second"));
        assert!(tip.class_list().contains("pa-tip-error"));

        TimeoutFuture::new(60).await;
        assert!(root.query_selector(".pa-status-tip").unwrap().is_none());
        root.remove();
    }

    #[wasm_bindgen_test]
    fn detached_anchor_is_ignored() {
        let doc = document().unwrap();
        let button: HtmlElement = doc.create_element("button").unwrap().unchecked_into();
        show_tip(&button, "nowhere", TipKind::Error, 10);
    }
}
