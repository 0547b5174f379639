//! Error taxonomy for the assistant engine.
//!
//! None of these are fatal. Mount and registry errors are logged and healed by
//! the next host scan; operation errors become a status tip next to the
//! control that triggered them.

use thiserror::Error;
use wasm_bindgen::{JsCast, JsValue};

use crate::models::MountState;

pub type Result<T, E = AssistantError> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AssistantError {
    /// No container or input element appeared within the retry budget.
    #[error("no mount container for {key} after {attempts} attempts")]
    MountNotReady { key: String, attempts: u32 },

    /// The input element already carries another instance's mount marker.
    #[error("element is already claimed by {owner}")]
    DuplicateClaim { owner: String },

    #[error("instance {0} is already registered")]
    DuplicateKey(String),

    #[error("invalid mount transition {from:?} -> {to:?}")]
    InvalidTransition { from: MountState, to: MountState },

    /// Provider call rejected or produced an unusable result.
    #[error("{0}")]
    OperationFailed(String),

    /// Superseded by a newer operation on the same instance.
    #[error("operation superseded")]
    OperationCancelled,

    /// The bound element (or its node) left the document.
    #[error("{0} no longer refers to a live element")]
    StaleReference(String),

    #[error("nothing to undo")]
    NothingToUndo,

    #[error("nothing to redo")]
    NothingToRedo,

    #[error("DOM error: {0}")]
    Dom(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl AssistantError {
    /// Errors that must never reach the user, not even as a status tip.
    pub fn is_silent(&self) -> bool {
        matches!(
            self,
            AssistantError::OperationCancelled
                | AssistantError::MountNotReady { .. }
                | AssistantError::DuplicateClaim { .. }
                | AssistantError::StaleReference(_)
        )
    }
}

impl From<JsValue> for AssistantError {
    fn from(value: JsValue) -> Self {
        let message = value
            .as_string()
            .or_else(|| {
                value
                    .dyn_ref::<js_sys::Error>()
                    .map(|err| String::from(err.message()))
            })
            .unwrap_or_else(|| format!("{:?}", value));
        AssistantError::Dom(message)
    }
}

impl From<AssistantError> for JsValue {
    fn from(err: AssistantError) -> Self {
        JsValue::from_str(&err.to_string())
    }
}

impl From<serde_json::Error> for AssistantError {
    fn from(err: serde_json::Error) -> Self {
        AssistantError::Serialization(err.to_string())
    }
}

impl From<serde_wasm_bindgen::Error> for AssistantError {
    fn from(err: serde_wasm_bindgen::Error) -> Self {
        AssistantError::Serialization(err.to_string())
    }
}
