//! One assistant toolbar attached to one host text input.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use web_sys::HtmlElement;

use crate::constants::ATTR_MOUNT;
use crate::error::{AssistantError, Result};
use crate::models::{FeatureId, HistoryKey, InstanceKey, MountState, RenderMode};
use crate::operation::OperationHandle;

pub type Cleanup = Box<dyn FnOnce()>;

pub struct AssistantInstance {
    key: InstanceKey,
    history_key: HistoryKey,
    mount_state: Cell<MountState>,
    render_mode: Cell<Option<RenderMode>>,
    // Observed, never owned: the host may discard and recreate it.
    input_element: RefCell<Option<HtmlElement>>,
    root: RefCell<Option<HtmlElement>>,
    buttons: RefCell<HashMap<FeatureId, HtmlElement>>,
    event_cleanups: RefCell<Vec<Cleanup>>,
    active_operation: RefCell<Option<OperationHandle>>,
    scrollbar_visible: Cell<Option<bool>>,
}

impl AssistantInstance {
    pub fn new(key: InstanceKey) -> Rc<Self> {
        Rc::new(Self {
            history_key: key.history_key(),
            key,
            mount_state: Cell::new(MountState::Unmounted),
            render_mode: Cell::new(None),
            input_element: RefCell::new(None),
            root: RefCell::new(None),
            buttons: RefCell::new(HashMap::new()),
            event_cleanups: RefCell::new(Vec::new()),
            active_operation: RefCell::new(None),
            scrollbar_visible: Cell::new(None),
        })
    }

    pub fn key(&self) -> &InstanceKey {
        &self.key
    }

    pub fn node_id(&self) -> &str {
        self.key.node_id()
    }

    pub fn input_id(&self) -> &str {
        self.key.input_id()
    }

    pub fn history_key(&self) -> &HistoryKey {
        &self.history_key
    }

    pub fn state(&self) -> MountState {
        self.mount_state.get()
    }

    pub fn transition(&self, next: MountState) -> Result<()> {
        let current = self.mount_state.get();
        if !current.can_transition_to(next) {
            return Err(AssistantError::InvalidTransition { from: current, to: next });
        }
        crate::debug_log!("{}: {:?} -> {:?}", self.key, current, next);
        self.mount_state.set(next);
        Ok(())
    }

    pub fn render_mode(&self) -> Option<RenderMode> {
        self.render_mode.get()
    }

    pub fn input_element(&self) -> Option<HtmlElement> {
        self.input_element.borrow().clone()
    }

    pub fn root(&self) -> Option<HtmlElement> {
        self.root.borrow().clone()
    }

    pub fn button(&self, feature: FeatureId) -> Option<HtmlElement> {
        self.buttons.borrow().get(&feature).cloned()
    }

    /// Store the DOM handles found by a successful mount. Buttons are rebuilt
    /// on every mount, so the previous set is replaced wholesale.
    pub(crate) fn attach(
        &self,
        mode: RenderMode,
        input: HtmlElement,
        root: HtmlElement,
        buttons: HashMap<FeatureId, HtmlElement>,
    ) {
        self.render_mode.set(Some(mode));
        *self.input_element.borrow_mut() = Some(input);
        *self.root.borrow_mut() = Some(root);
        *self.buttons.borrow_mut() = buttons;
        self.scrollbar_visible.set(None);
    }

    pub(crate) fn push_cleanup(&self, cleanup: Cleanup) {
        self.event_cleanups.borrow_mut().push(cleanup);
    }

    pub(crate) fn take_cleanups(&self) -> Vec<Cleanup> {
        std::mem::take(&mut *self.event_cleanups.borrow_mut())
    }

    pub fn cleanup_count(&self) -> usize {
        self.event_cleanups.borrow().len()
    }

    pub fn active_operation(&self) -> Option<OperationHandle> {
        self.active_operation.borrow().clone()
    }

    pub(crate) fn replace_active_operation(&self, handle: Option<OperationHandle>) -> Option<OperationHandle> {
        std::mem::replace(&mut *self.active_operation.borrow_mut(), handle)
    }

    /// Clear the active operation only if it is still `id`.
    pub(crate) fn finish_operation(&self, id: u64) -> bool {
        let mut active = self.active_operation.borrow_mut();
        if active.as_ref().is_some_and(|op| op.id() == id) {
            *active = None;
            true
        } else {
            false
        }
    }

    pub fn is_busy(&self) -> bool {
        self.active_operation.borrow().is_some()
    }

    pub(crate) fn scrollbar_visible(&self) -> Option<bool> {
        self.scrollbar_visible.get()
    }

    pub(crate) fn set_scrollbar_visible(&self, visible: bool) {
        self.scrollbar_visible.set(Some(visible));
    }

    /// Mounted, but the input left the document while nothing is in flight.
    pub fn is_orphaned(&self) -> bool {
        if self.state() != MountState::Mounted || self.is_busy() {
            return false;
        }
        !self
            .input_element
            .borrow()
            .as_ref()
            .is_some_and(|el| el.is_connected())
    }

    /// Tear the instance down: cancel any operation, run every registered
    /// cleanup, detach the toolbar, release the mount marker and drop every
    /// DOM handle. Safe to call more than once.
    pub fn dispose(&self) {
        if self.state() == MountState::Destroyed {
            return;
        }
        if let Some(op) = self.replace_active_operation(None) {
            op.cancel();
        }
        crate::binding::unbind(self);

        if let Some(root) = self.root.borrow_mut().take() {
            root.remove();
        }
        if let Some(input) = self.input_element.borrow_mut().take() {
            if input.get_attribute(ATTR_MOUNT).as_deref() == Some(self.key.as_str()) {
                let _ = input.remove_attribute(ATTR_MOUNT);
            }
        }
        self.buttons.borrow_mut().clear();
        self.mount_state.set(MountState::Destroyed);
        crate::debug_log!("{} disposed", self.key);
    }
}
