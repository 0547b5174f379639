//! Small crate-wide logging macros.
//!
//! All of them route to the browser console through `web_sys::console` and
//! are gated by the level stored in [`crate::log`], which the engine refreshes
//! whenever a new [`crate::config::Config`] snapshot is applied.
//!
//! ```rust,ignore
//! debug_log!("mount attempt {} for {}", attempt, key);
//! warn_log!("storage unavailable, history will not persist");
//! ```

/// Verbose tracing of mount / bind decisions. Off unless `logLevel` is
/// `"debug"`.
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        if $crate::log::enabled($crate::log::LogLevel::Debug) {
            web_sys::console::debug_1(&format!("[prompt-assistant] {}", format!($($arg)*)).into());
        }
    };
}

#[macro_export]
macro_rules! info_log {
    ($($arg:tt)*) => {
        if $crate::log::enabled($crate::log::LogLevel::Info) {
            web_sys::console::log_1(&format!("[prompt-assistant] {}", format!($($arg)*)).into());
        }
    };
}

#[macro_export]
macro_rules! warn_log {
    ($($arg:tt)*) => {
        if $crate::log::enabled($crate::log::LogLevel::Warn) {
            web_sys::console::warn_1(&format!("[prompt-assistant] {}", format!($($arg)*)).into());
        }
    };
}

#[macro_export]
macro_rules! error_log {
    ($($arg:tt)*) => {
        if $crate::log::enabled($crate::log::LogLevel::Error) {
            web_sys::console::error_1(&format!("[prompt-assistant] {}", format!($($arg)*)).into());
        }
    };
}
