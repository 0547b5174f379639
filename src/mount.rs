//! Mount coordination: find the host input for a candidate instance, claim
//! it, attach the toolbar and bind listeners, retrying while the host has not
//! rendered the input yet.
//!
//! The first attempt runs synchronously inside the scan. Later attempts run
//! on a `spawn_local` task with capped exponential backoff and re-validate
//! everything they depend on, since the node, the feature switch or the whole
//! workflow may be gone by the time the timer fires.

use gloo_timers::future::TimeoutFuture;
use std::rc::Rc;
use wasm_bindgen::JsCast;
use web_sys::{Element, HtmlElement};

use crate::assistant::AssistantCore;
use crate::binding;
use crate::constants::{ATTR_BOUND, ATTR_MOUNT, ATTR_WIDGET_NAME, TEXT_SURFACE_SELECTOR};
use crate::dom_utils::{self, attr_selector, is_text_surface, read_content};
use crate::error::{AssistantError, Result};
use crate::host::{classify_render_mode, HostNode, WidgetInfo};
use crate::instance::AssistantInstance;
use crate::layout;
use crate::models::{FeatureId, MountState, RenderMode};
use crate::toolbar;

pub struct MountTarget {
    pub container: HtmlElement,
    pub input: HtmlElement,
    pub mode: RenderMode,
}

fn as_surface(el: Element) -> Option<HtmlElement> {
    if is_text_surface(&el) {
        return el.dyn_into::<HtmlElement>().ok();
    }
    el.query_selector(TEXT_SURFACE_SELECTOR)
        .ok()
        .flatten()
        .and_then(|inner| inner.dyn_into::<HtmlElement>().ok())
}

fn retained_input(root: &Element, widget: &WidgetInfo, text_position: usize, eligible: usize) -> Option<HtmlElement> {
    let by_name = root
        .query_selector(&attr_selector(ATTR_WIDGET_NAME, &widget.name))
        .ok()
        .flatten()
        .and_then(as_surface);
    if by_name.is_some() {
        return by_name;
    }

    let surfaces = root.query_selector_all(TEXT_SURFACE_SELECTOR).ok()?;
    // Positions only line up when the node rendered every eligible input.
    if surfaces.length() as usize >= eligible {
        if let Some(el) = surfaces.item(text_position as u32) {
            return el.dyn_into::<HtmlElement>().ok();
        }
    }
    if eligible == 1 {
        return surfaces.item(0).and_then(|el| el.dyn_into::<HtmlElement>().ok());
    }
    None
}

/// Locate the text surface for `widget` and the element the toolbar goes in.
/// `None` means the host has not rendered it (yet).
pub fn find_target(node: &dyn HostNode, widget: &WidgetInfo, text_position: usize, eligible: usize) -> Option<MountTarget> {
    let mode = classify_render_mode(node);
    let input = match mode {
        RenderMode::Retained => retained_input(&node.dom_root()?, widget, text_position, eligible)?,
        RenderMode::Legacy => widget.element.clone()?,
    };
    if !input.is_connected() {
        return None;
    }
    let container = input.parent_element()?.dyn_into::<HtmlElement>().ok()?;
    Some(MountTarget { container, input, mode })
}

/// Put `key`'s mount marker on `input`. A marker from another key wins while
/// that key is live or mounting; a marker nobody answers for is taken over.
pub fn claim(input: &HtmlElement, key: &str, is_claimed: impl Fn(&str) -> bool) -> Result<()> {
    if let Some(owner) = input.get_attribute(ATTR_MOUNT) {
        if owner != key {
            if is_claimed(&owner) {
                return Err(AssistantError::DuplicateClaim { owner });
            }
            crate::debug_log!("{}: taking over stale claim from {}", key, owner);
            let _ = input.remove_attribute(ATTR_BOUND);
        }
    }
    input.set_attribute(ATTR_MOUNT, key)?;
    Ok(())
}

pub fn release_claim(input: &HtmlElement, key: &str) {
    if input.get_attribute(ATTR_MOUNT).as_deref() == Some(key) {
        let _ = input.remove_attribute(ATTR_MOUNT);
    }
}

pub struct MountJob {
    pub instance: Rc<AssistantInstance>,
    pub node: Rc<dyn HostNode>,
    pub widget: WidgetInfo,
    /// Index among the node's eligible inputs.
    pub text_position: usize,
    pub eligible: usize,
}

/// One try. `MountNotReady` means try again later; any other error means
/// stop for good.
fn attempt(core: &Rc<AssistantCore>, job: &MountJob, generation: u64, attempt_no: u32) -> Result<()> {
    let instance = &job.instance;
    let key = instance.key().clone();
    if instance.state() != MountState::Mounting {
        return Err(AssistantError::StaleReference(key.to_string()));
    }
    if !core.registry().borrow().is_current_mount(key.as_str(), generation) {
        return Err(AssistantError::StaleReference(key.to_string()));
    }
    if !job.node.is_alive() || !core.config().enabled {
        return Err(AssistantError::StaleReference(key.to_string()));
    }

    let target = find_target(job.node.as_ref(), &job.widget, job.text_position, job.eligible).ok_or(
        AssistantError::MountNotReady {
            key: key.to_string(),
            attempts: attempt_no,
        },
    )?;

    claim(&target.input, key.as_str(), |owner| core.registry().borrow().is_claimed_key(owner))?;
    if let Err(e) = mount_into(core, instance, &target) {
        release_claim(&target.input, key.as_str());
        return Err(e);
    }

    let mut registry = core.registry().borrow_mut();
    registry.finish_mount(&key, generation);
    registry.add(instance.clone())
}

fn mount_into(core: &Rc<AssistantCore>, instance: &Rc<AssistantInstance>, target: &MountTarget) -> Result<()> {
    let config = core.config();
    let document = dom_utils::document()?;
    toolbar::ensure_styles(&document)?;
    dom_utils::ensure_positioned(&target.container)?;

    let on_feature = {
        let core = Rc::downgrade(core);
        let instance = Rc::downgrade(instance);
        Rc::new(move |feature: FeatureId| {
            if let (Some(core), Some(instance)) = (core.upgrade(), instance.upgrade()) {
                core.dispatch_feature(&instance, feature);
            }
        })
    };
    let toolbar = toolbar::build(&document, instance, config.layout, on_feature)?;
    target.container.append_child(&toolbar.root)?;
    instance.attach(target.mode, target.input.clone(), toolbar.root.clone(), toolbar.buttons);
    for cleanup in toolbar.cleanups {
        instance.push_cleanup(cleanup);
    }

    let history = core.history();
    if let Err(e) = binding::bind(&target.input, instance, history.clone(), &config) {
        binding::unbind(instance);
        toolbar.root.remove();
        return Err(e);
    }
    {
        let mut history = history.borrow_mut();
        history.record_input(instance.history_key(), &read_content(&target.input));
        toolbar::sync_history_buttons(instance, &history);
    }
    instance.transition(MountState::Mounted)?;
    layout::schedule_gutter_pass(instance);
    crate::debug_log!("{}: mounted ({:?})", instance.key(), target.mode);
    Ok(())
}

fn give_up(core: &AssistantCore, job: &MountJob, generation: u64, err: AssistantError) {
    let instance = &job.instance;
    core.registry().borrow_mut().finish_mount(instance.key(), generation);
    match err {
        AssistantError::MountNotReady { .. } => {
            let _ = instance.transition(MountState::Unmounted);
            crate::warn_log!("{}", err);
        }
        err => {
            instance.dispose();
            if err.is_silent() {
                crate::debug_log!("{}: mount aborted: {}", instance.key(), err);
            } else {
                crate::warn_log!("{}: mount failed: {}", instance.key(), err);
            }
        }
    }
}

/// Mount `job.instance`. Returns it while it is mounted or still retrying;
/// `None` when the key was already taken or the mount gave up immediately.
pub fn start(core: &Rc<AssistantCore>, job: MountJob) -> Option<Rc<AssistantInstance>> {
    let key = job.instance.key().clone();
    let begun = core.registry().borrow_mut().begin_mount(&key);
    let Some(generation) = begun else {
        return core.registry().borrow().get(key.as_str());
    };
    if let Err(e) = job.instance.transition(MountState::Mounting) {
        core.registry().borrow_mut().finish_mount(&key, generation);
        crate::warn_log!("{}: {}", key, e);
        return None;
    }

    let max_attempts = core.config().mount.max_attempts;
    match attempt(core, &job, generation, 1) {
        Ok(()) => return Some(job.instance),
        Err(AssistantError::MountNotReady { .. }) if max_attempts > 1 => {
            crate::debug_log!("{}: input not rendered yet, retrying", key);
        }
        Err(e) => {
            give_up(core, &job, generation, e);
            return None;
        }
    }

    let instance = job.instance.clone();
    let core = Rc::clone(core);
    wasm_bindgen_futures::spawn_local(async move {
        let mut retry = 0;
        loop {
            // Re-read on every round; the limits may have been updated.
            let mount = core.config().mount.clone();
            let attempt_no = retry + 2;
            TimeoutFuture::new(mount.backoff_ms(retry)).await;
            match attempt(&core, &job, generation, attempt_no) {
                Ok(()) => return,
                Err(AssistantError::MountNotReady { .. }) if attempt_no < mount.max_attempts => {
                    retry += 1;
                }
                Err(e) => {
                    give_up(&core, &job, generation, e);
                    return;
                }
            }
        }
    });
    Some(instance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, MountRetry};
    use crate::dom_utils::document;
    use crate::host::WidgetKind;
    use crate::storage::MemoryStorage;
    use crate::test_support::{DomGuard, MockNode};
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    fn textarea() -> HtmlElement {
        document().unwrap().create_element("textarea").unwrap().unchecked_into()
    }

    fn quick_core() -> Rc<AssistantCore> {
        let config = Config {
            mount: MountRetry {
                max_attempts: 4,
                initial_backoff_ms: 10,
                max_backoff_ms: 20,
            },
            ..Config::default()
        };
        AssistantCore::with_storage(config, Rc::new(MemoryStorage::new()))
    }

    #[wasm_bindgen_test]
    fn retained_lookup_prefers_widget_name() {
        let guard = DomGuard::new();
        let node = MockNode::new("30").with_dom_root();
        let root = node.root_element().unwrap();
        guard.attach(&root);
        let first = textarea();
        let named = document().unwrap().create_element("div").unwrap();
        named.set_attribute(ATTR_WIDGET_NAME, "negative").unwrap();
        let second = textarea();
        named.append_child(&second).unwrap();
        root.append_child(&first).unwrap();
        root.append_child(&named).unwrap();

        let widget = WidgetInfo::new("negative", Some(0), WidgetKind::MultilineText);
        let target = find_target(&node, &widget, 0, 2).unwrap();
        assert_eq!(target.mode, RenderMode::Retained);
        assert_eq!(target.input, second);

        let other = WidgetInfo::new("positive", Some(1), WidgetKind::MultilineText);
        assert_eq!(find_target(&node, &other, 0, 2).unwrap().input, first);
    }

    #[wasm_bindgen_test]
    fn legacy_lookup_needs_connected_element() {
        let guard = DomGuard::new();
        let input = textarea();
        let widget = WidgetInfo::new("text", Some(0), WidgetKind::MultilineText).with_element(input.clone());
        let node = MockNode::new("31").widget(widget.clone());
        assert!(find_target(&node, &widget, 0, 1).is_none());

        let wrapper = guard.container();
        wrapper.append_child(&input).unwrap();
        let target = find_target(&node, &widget, 0, 1).unwrap();
        assert_eq!(target.mode, RenderMode::Legacy);
        assert_eq!(target.container, wrapper);
    }

    #[wasm_bindgen_test]
    fn first_claim_wins_and_stale_claims_are_taken_over() {
        let input = textarea();
        claim(&input, "g:1:a", |_| false).unwrap();
        assert_eq!(
            claim(&input, "g:1:b", |owner| owner == "g:1:a"),
            Err(AssistantError::DuplicateClaim { owner: "g:1:a".into() })
        );
        claim(&input, "g:1:b", |_| false).unwrap();
        assert_eq!(input.get_attribute(ATTR_MOUNT).as_deref(), Some("g:1:b"));

        release_claim(&input, "g:1:a");
        assert!(input.has_attribute(ATTR_MOUNT));
        release_claim(&input, "g:1:b");
        assert!(!input.has_attribute(ATTR_MOUNT));
    }

    #[wasm_bindgen_test]
    async fn abandoned_retry_never_finishes_a_newer_mount() {
        let guard = DomGuard::new();
        let core = quick_core();
        let input = textarea();
        let widget = WidgetInfo::new("text", Some(0), WidgetKind::MultilineText).with_element(input.clone());
        let node: Rc<dyn HostNode> = Rc::new(MockNode::new("40").widget(widget));

        let abandoned = core.scan_node(node.clone()).remove(0);
        assert_eq!(abandoned.state(), MountState::Mounting);
        core.cleanup(Some("40"), true);

        let current = core.scan_node(node).remove(0);
        assert!(!Rc::ptr_eq(&abandoned, &current));
        guard.container().append_child(&input).unwrap();

        TimeoutFuture::new(120).await;
        let registered = core.get_instance("root:40:text").unwrap();
        assert!(Rc::ptr_eq(&registered, &current));
        assert_eq!(current.state(), MountState::Mounted);
        assert_eq!(abandoned.state(), MountState::Destroyed);
        assert_eq!(guard.container().query_selector_all(".prompt-assistant").unwrap().length(), 1);
    }

    #[wasm_bindgen_test]
    async fn retries_stop_once_node_is_removed() {
        let guard = DomGuard::new();
        let core = quick_core();
        let node = MockNode::new("41")
            .widget(WidgetInfo::new("text", Some(0), WidgetKind::MultilineText))
            .with_dom_root();
        let root = node.root_element().unwrap();
        let alive = node.alive_flag();
        let node: Rc<dyn HostNode> = Rc::new(node);

        let pending = core.scan_node(node).remove(0);
        assert_eq!(pending.state(), MountState::Mounting);
        alive.set(false);
        guard.attach(&root);
        root.append_child(&textarea()).unwrap();

        TimeoutFuture::new(80).await;
        assert_eq!(pending.state(), MountState::Destroyed);
        assert!(!core.has_instance("root:41:text"));
        assert!(root.query_selector(".prompt-assistant").unwrap().is_none());
    }
}
