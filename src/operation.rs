//! Single-flight, cancellable operations per toolbar.
//!
//! Starting a run on an instance cancels whatever that instance was already
//! running, regardless of feature. Cancellation is cooperative: the old future
//! keeps going until its provider call settles, but every side effect is
//! guarded by the token, so nothing it produces reaches the input, the
//! history or the cache.

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::rc::{Rc, Weak};

use crate::constants::CSS_PROCESSING;
use crate::dom_utils::write_content;
use crate::error::{AssistantError, Result};
use crate::history::HistoryStore;
use crate::instance::AssistantInstance;
use crate::models::{FeatureId, MountState};
use crate::status::{self, TipKind};
use crate::toolbar;

#[derive(Debug, Clone, Default)]
pub struct CancelToken(Rc<Cell<bool>>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.set(true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.get()
    }
}

thread_local! {
    static NEXT_OPERATION_ID: Cell<u64> = const { Cell::new(1) };
}

#[derive(Debug, Clone)]
pub struct OperationHandle {
    id: u64,
    feature: FeatureId,
    token: CancelToken,
}

impl OperationHandle {
    pub fn new(feature: FeatureId) -> Self {
        let id = NEXT_OPERATION_ID.with(|next| {
            let id = next.get();
            next.set(id + 1);
            id
        });
        Self {
            id,
            feature,
            token: CancelToken::new(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn feature(&self) -> FeatureId {
        self.feature
    }

    pub fn token(&self) -> CancelToken {
        self.token.clone()
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationOutcome {
    Completed(String),
    Cancelled,
    Failed(String),
    /// Nothing to do (empty input, no provider, not mounted).
    Skipped,
}

/// Streaming sink handed to `work`. Partial text goes to the input only; it
/// is never recorded in history.
#[derive(Clone)]
pub struct Progress {
    instance: Weak<AssistantInstance>,
    token: CancelToken,
}

impl Progress {
    /// `false` once the operation has been superseded; the chunk is dropped.
    pub fn report(&self, partial: &str) -> bool {
        if self.token.is_cancelled() {
            return false;
        }
        let Some(instance) = self.instance.upgrade() else {
            return false;
        };
        if instance.state() != MountState::Mounted {
            return false;
        }
        match instance.input_element() {
            Some(el) => write_content(&el, partial).is_ok(),
            None => false,
        }
    }
}

/// Shared stores an operation writes to on success.
#[derive(Clone)]
pub struct OperationContext {
    pub history: Rc<RefCell<HistoryStore>>,
    pub status_tip_ms: u32,
}

fn set_processing(instance: &AssistantInstance, feature: FeatureId, on: bool) {
    if let Some(button) = instance.button(feature) {
        let classes = button.class_list();
        let _ = if on {
            classes.add_1(CSS_PROCESSING)
        } else {
            classes.remove_1(CSS_PROCESSING)
        };
        let _ = button.set_attribute("aria-busy", if on { "true" } else { "false" });
    }
}

/// Cancel whatever the instance is running and clear its processing UI.
pub fn cancel_active(instance: &AssistantInstance) -> bool {
    match instance.replace_active_operation(None) {
        Some(op) => {
            op.cancel();
            set_processing(instance, op.feature(), false);
            true
        }
        None => false,
    }
}

/// Run `work` as the instance's only active operation.
pub async fn run<W, F>(
    instance: &Rc<AssistantInstance>,
    feature: FeatureId,
    ctx: OperationContext,
    work: W,
) -> OperationOutcome
where
    W: FnOnce(Progress, CancelToken) -> F,
    F: Future<Output = Result<String>>,
{
    if instance.state() != MountState::Mounted {
        return OperationOutcome::Skipped;
    }

    let handle = OperationHandle::new(feature);
    if let Some(previous) = instance.replace_active_operation(Some(handle.clone())) {
        crate::debug_log!(
            "{}: {} supersedes {}",
            instance.key(),
            feature.as_str(),
            previous.feature().as_str()
        );
        previous.cancel();
        set_processing(instance, previous.feature(), false);
    }
    set_processing(instance, feature, true);

    let progress = Progress {
        instance: Rc::downgrade(instance),
        token: handle.token(),
    };
    let result = work(progress, handle.token()).await;

    // Anything may have happened while suspended.
    if handle.is_cancelled() || instance.state() != MountState::Mounted {
        return OperationOutcome::Cancelled;
    }
    instance.finish_operation(handle.id());
    set_processing(instance, feature, false);

    match result {
        Ok(text) => {
            let Some(el) = instance.input_element() else {
                return OperationOutcome::Cancelled;
            };
            if let Err(e) = write_content(&el, &text) {
                crate::warn_log!("{}: could not write result: {}", instance.key(), e);
                return OperationOutcome::Failed(e.to_string());
            }
            {
                let mut history = ctx.history.borrow_mut();
                history.record_input(instance.history_key(), &text);
                toolbar::sync_history_buttons(instance, &history);
            }
            OperationOutcome::Completed(text)
        }
        Err(AssistantError::OperationCancelled) => OperationOutcome::Cancelled,
        Err(e) => {
            crate::warn_log!("{}: {} failed: {}", instance.key(), feature.as_str(), e);
            if let Some(button) = instance.button(feature) {
                status::show_tip(&button, &e.to_string(), TipKind::Error, ctx.status_tip_ms);
            }
            OperationOutcome::Failed(e.to_string())
        }
    }
}
