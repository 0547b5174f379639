//! Event wiring between a host input and its toolbar.
//!
//! Every listener registered here hands back a cleanup closure that is pushed
//! onto the owning instance, so `dispose` can undo all of it in one sweep.
//! Handlers hold the instance weakly: the instance owns the closures, not the
//! other way round.

use gloo_timers::callback::Timeout;
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use wasm_bindgen::{closure::Closure, JsCast, JsValue};
use web_sys::{Event, EventTarget, HtmlElement, ResizeObserver};

use crate::config::Config;
use crate::constants::ATTR_BOUND;
use crate::dom_utils::read_content;
use crate::error::Result;
use crate::history::HistoryStore;
use crate::instance::{AssistantInstance, Cleanup};
use crate::layout;
use crate::models::MountState;
use crate::toolbar;

/// Add `handler` for `event` on `target`; the returned cleanup removes it and
/// frees the closure.
pub fn listen(target: &EventTarget, event: &'static str, handler: Closure<dyn FnMut(Event)>) -> Result<Cleanup> {
    target.add_event_listener_with_callback(event, handler.as_ref().unchecked_ref())?;
    let target = target.clone();
    Ok(Box::new(move || {
        let _ = target.remove_event_listener_with_callback(event, handler.as_ref().unchecked_ref());
        drop(handler);
    }))
}

fn live(weak: &Weak<AssistantInstance>) -> Option<Rc<AssistantInstance>> {
    weak.upgrade().filter(|i| i.state() == MountState::Mounted)
}

fn resize_observer_supported() -> bool {
    web_sys::window()
        .map(|w| js_sys::Reflect::has(&w, &JsValue::from_str("ResizeObserver")).unwrap_or(false))
        .unwrap_or(false)
}

/// Attach input, blur and resize handling to `element` for `instance`.
/// Returns `Ok(false)` when the element is already bound.
pub fn bind(
    element: &HtmlElement,
    instance: &Rc<AssistantInstance>,
    history: Rc<RefCell<HistoryStore>>,
    config: &Config,
) -> Result<bool> {
    if element.has_attribute(ATTR_BOUND) {
        crate::debug_log!("{}: element already bound", instance.key());
        return Ok(false);
    }
    element.set_attribute(ATTR_BOUND, instance.key().as_str())?;

    let target: &EventTarget = element.as_ref();

    let weak = Rc::downgrade(instance);
    let on_input = Closure::wrap(Box::new(move |_: Event| {
        if let Some(instance) = live(&weak) {
            layout::adjust_gutter(&instance);
        }
    }) as Box<dyn FnMut(Event)>);
    instance.push_cleanup(listen(target, "input", on_input)?);

    let weak = Rc::downgrade(instance);
    let on_blur = Closure::wrap(Box::new(move |_: Event| {
        let Some(instance) = live(&weak) else {
            return;
        };
        let Some(el) = instance.input_element() else {
            return;
        };
        let text = read_content(&el);
        let mut history = history.borrow_mut();
        if history.record_input(instance.history_key(), &text) {
            crate::debug_log!("{}: recorded blur snapshot", instance.key());
        }
        toolbar::sync_history_buttons(&instance, &history);
    }) as Box<dyn FnMut(Event)>);
    instance.push_cleanup(listen(target, "blur", on_blur)?);

    let cleanup = if resize_observer_supported() {
        observe_resize(element, instance)?
    } else {
        let weak = Rc::downgrade(instance);
        debounced_window_resize(config.resize_debounce_ms, move || {
            if let Some(instance) = live(&weak) {
                layout::adjust_gutter(&instance);
            }
        })?
    };
    instance.push_cleanup(cleanup);
    Ok(true)
}

fn observe_resize(element: &HtmlElement, instance: &Rc<AssistantInstance>) -> Result<Cleanup> {
    let weak = Rc::downgrade(instance);
    let callback = Closure::wrap(Box::new(move || {
        if let Some(instance) = live(&weak) {
            layout::adjust_gutter(&instance);
        }
    }) as Box<dyn FnMut()>);
    let observer = ResizeObserver::new(callback.as_ref().unchecked_ref())?;
    observer.observe(element);
    Ok(Box::new(move || {
        observer.disconnect();
        drop(callback);
    }))
}

/// Run `on_settle` once a burst of window `resize` events has been quiet for
/// `debounce_ms`.
fn debounced_window_resize(debounce_ms: u32, on_settle: impl Fn() + 'static) -> Result<Cleanup> {
    let window = web_sys::window().ok_or_else(|| crate::error::AssistantError::Dom("no window".into()))?;
    let pending: Rc<RefCell<Option<Timeout>>> = Rc::new(RefCell::new(None));
    let on_settle = Rc::new(on_settle);
    let slot = pending.clone();
    let on_resize = Closure::wrap(Box::new(move |_: Event| {
        let on_settle = on_settle.clone();
        // Replacing the timeout drops, and so cancels, the previous one.
        *slot.borrow_mut() = Some(Timeout::new(debounce_ms, move || on_settle()));
    }) as Box<dyn FnMut(Event)>);
    let remove = listen(window.as_ref(), "resize", on_resize)?;
    Ok(Box::new(move || {
        pending.borrow_mut().take();
        remove();
    }))
}

/// Run every cleanup the instance collected, newest first, and release the
/// bound guard if this instance set it.
pub fn unbind(instance: &AssistantInstance) {
    let cleanups = instance.take_cleanups();
    let count = cleanups.len();
    for cleanup in cleanups.into_iter().rev() {
        cleanup();
    }
    if let Some(el) = instance.input_element() {
        if el.get_attribute(ATTR_BOUND).as_deref() == Some(instance.key().as_str()) {
            let _ = el.remove_attribute(ATTR_BOUND);
        }
    }
    if count > 0 {
        crate::debug_log!("{}: ran {} cleanups", instance.key(), count);
    }
}
