//! Prompt assistant toolbar for node-graph text inputs.
//!
//! The crate keeps one small toolbar next to every eligible text input of a
//! host node graph, and keeps it alive across host re-renders. `bridge` is the
//! JS surface; `assistant::AssistantCore` is the engine behind it.

#[macro_use]
mod macros;

pub mod log;
pub mod error;
pub mod constants;
pub mod models;
pub mod config;
pub mod storage;
pub mod history;
pub mod cache;
pub mod lang;
pub mod host;
pub mod dom_utils;
pub mod instance;
pub mod registry;
pub mod operation;
pub mod providers;
pub mod status;
pub mod layout;
pub mod toolbar;
pub mod binding;
pub mod mount;
pub mod assistant;
pub mod bridge;

#[cfg(test)]
mod test_support;
