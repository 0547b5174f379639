//! Toolbar placement relative to its input.

use std::rc::{Rc, Weak};
use wasm_bindgen::{closure::Closure, JsCast};
use web_sys::HtmlElement;

use crate::constants::{CSS_LAYOUT_HORIZONTAL, CSS_LAYOUT_VERTICAL, TOOLBAR_EDGE_OFFSET_PX};
use crate::instance::AssistantInstance;
use crate::models::{LayoutDirection, MountState};

pub fn apply_direction(root: &HtmlElement, direction: LayoutDirection) {
    let classes = root.class_list();
    let (add, remove) = match direction {
        LayoutDirection::Horizontal => (CSS_LAYOUT_HORIZONTAL, CSS_LAYOUT_VERTICAL),
        LayoutDirection::Vertical => (CSS_LAYOUT_VERTICAL, CSS_LAYOUT_HORIZONTAL),
    };
    let _ = classes.remove_1(remove);
    let _ = classes.add_1(add);
}

/// Width taken by a vertical scrollbar, 0 when none is shown.
fn scrollbar_width(input: &HtmlElement) -> i32 {
    if input.scroll_height() > input.client_height() {
        (input.offset_width() - input.client_width()).max(0)
    } else {
        0
    }
}

/// Keep the toolbar clear of the input's scrollbar. Only touches the DOM when
/// scrollbar presence changed since the last pass; returns whether it did.
pub fn adjust_gutter(instance: &AssistantInstance) -> bool {
    let (Some(input), Some(root)) = (instance.input_element(), instance.root()) else {
        return false;
    };
    let gutter = scrollbar_width(&input);
    let visible = gutter > 0;
    if instance.scrollbar_visible() == Some(visible) {
        return false;
    }
    instance.set_scrollbar_visible(visible);
    let right = format!("{}px", TOOLBAR_EDGE_OFFSET_PX + gutter);
    root.style().set_property("right", &right).is_ok()
}

/// Run `adjust_gutter` after the host's next layout.
pub fn schedule_gutter_pass(instance: &Rc<AssistantInstance>) {
    let Some(window) = web_sys::window() else {
        return;
    };
    let weak: Weak<AssistantInstance> = Rc::downgrade(instance);
    let cb = Closure::once_into_js(move || {
        if let Some(instance) = weak.upgrade() {
            if instance.state() == MountState::Mounted {
                adjust_gutter(&instance);
            }
        }
    });
    let _ = window.request_animation_frame(cb.unchecked_ref());
}
