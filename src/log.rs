//! Console log level shared by the logging macros.

use serde::{Deserialize, Serialize};
use std::cell::Cell;

/// Ordered from least to most verbose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    #[default]
    Warn,
    Info,
    Debug,
}

thread_local! {
    static LEVEL: Cell<LogLevel> = const { Cell::new(LogLevel::Warn) };
}

pub fn set_level(level: LogLevel) {
    LEVEL.with(|cell| cell.set(level));
}

pub fn level() -> LogLevel {
    LEVEL.with(|cell| cell.get())
}

/// `true` when messages at `level` should reach the console.
pub fn enabled(level: LogLevel) -> bool {
    level <= self::level()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn level_gates_more_verbose_messages() {
        set_level(LogLevel::Info);
        assert!(enabled(LogLevel::Error));
        assert!(enabled(LogLevel::Info));
        assert!(!enabled(LogLevel::Debug));
        set_level(LogLevel::Warn);
    }
}
