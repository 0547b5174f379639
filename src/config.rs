//! Immutable configuration snapshot.
//!
//! The settings layer owns the user-facing toggles; the engine only ever sees
//! a `Config` value handed to it through `AssistantCore::update_config`. Scans
//! and operations capture the `Rc<Config>` current at call time and re-read it
//! after every suspension point.

use serde::{Deserialize, Serialize};
use wasm_bindgen::JsValue;

use crate::constants::*;
use crate::error::Result;
use crate::log::LogLevel;
use crate::models::{CreationMode, LayoutDirection};

/// Capped exponential backoff used while waiting for the host to render an
/// input element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MountRetry {
    /// Total attempts including the synchronous first one.
    pub max_attempts: u32,
    pub initial_backoff_ms: u32,
    pub max_backoff_ms: u32,
}

impl Default for MountRetry {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MOUNT_ATTEMPTS,
            initial_backoff_ms: DEFAULT_MOUNT_INITIAL_BACKOFF_MS,
            max_backoff_ms: DEFAULT_MOUNT_MAX_BACKOFF_MS,
        }
    }
}

impl MountRetry {
    /// Delay before retry number `retry` (0-based).
    pub fn backoff_ms(&self, retry: u32) -> u32 {
        let delay = self
            .initial_backoff_ms
            .saturating_mul(2_u32.pow(retry.min(10))); // Prevent overflow with min(10)
        delay.min(self.max_backoff_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Global feature switch. Turning it off tears down every instance.
    pub enabled: bool,
    pub creation_mode: CreationMode,
    pub log_level: LogLevel,
    pub history_limit: usize,
    /// Inputs with their own history before the least recently used is dropped.
    pub history_max_entries: usize,
    pub cache_limit: usize,
    /// Whether translations of mixed-language input are cached.
    pub cache_mixed_language: bool,
    /// Longer inputs are translated in several provider requests.
    pub translate_chunk_chars: usize,
    pub mount: MountRetry,
    pub consistency_check_ms: u32,
    pub resize_debounce_ms: u32,
    pub status_tip_ms: u32,
    pub layout: LayoutDirection,
    pub storage_prefix: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enabled: true,
            creation_mode: CreationMode::Always,
            log_level: LogLevel::Warn,
            history_limit: DEFAULT_HISTORY_LIMIT,
            history_max_entries: DEFAULT_HISTORY_MAX_ENTRIES,
            cache_limit: DEFAULT_CACHE_LIMIT,
            cache_mixed_language: false,
            translate_chunk_chars: DEFAULT_TRANSLATE_CHUNK_CHARS,
            mount: MountRetry::default(),
            consistency_check_ms: DEFAULT_CONSISTENCY_CHECK_MS,
            resize_debounce_ms: DEFAULT_RESIZE_DEBOUNCE_MS,
            status_tip_ms: DEFAULT_STATUS_TIP_MS,
            layout: LayoutDirection::Horizontal,
            storage_prefix: DEFAULT_STORAGE_PREFIX.to_string(),
        }
    }
}

impl Config {
    /// Parse a partial settings object coming from JS. Missing fields keep
    /// their defaults; `undefined`/`null` yields the default config.
    pub fn from_js(value: &JsValue) -> Result<Self> {
        if value.is_undefined() || value.is_null() {
            return Ok(Self::default());
        }
        let config: Config = serde_wasm_bindgen::from_value(value.clone())?;
        Ok(config.normalized())
    }

    /// Clamp values that would break invariants downstream.
    pub fn normalized(mut self) -> Self {
        self.history_limit = self.history_limit.max(1);
        self.history_max_entries = self.history_max_entries.max(1);
        self.cache_limit = self.cache_limit.max(1);
        self.translate_chunk_chars = self.translate_chunk_chars.max(1);
        self.mount.max_attempts = self.mount.max_attempts.max(1);
        self.mount.max_backoff_ms = self.mount.max_backoff_ms.max(self.mount.initial_backoff_ms);
        if self.storage_prefix.is_empty() {
            self.storage_prefix = DEFAULT_STORAGE_PREFIX.to_string();
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn backoff_doubles_then_caps() {
        let retry = MountRetry::default();
        assert_eq!(retry.backoff_ms(0), 100);
        assert_eq!(retry.backoff_ms(1), 200);
        assert_eq!(retry.backoff_ms(3), 800);
        assert_eq!(retry.backoff_ms(4), 1600);
        assert_eq!(retry.backoff_ms(30), 1600);
    }

    #[wasm_bindgen_test]
    fn partial_js_object_keeps_defaults() {
        let raw = js_sys::JSON::parse(
            r#"{"enabled":false,"creationMode":"onSelection","mount":{"maxAttempts":2}}"#,
        )
        .unwrap();
        let config = Config::from_js(&raw).unwrap();
        assert!(!config.enabled);
        assert_eq!(config.creation_mode, CreationMode::OnSelection);
        assert_eq!(config.mount.max_attempts, 2);
        assert_eq!(config.mount.initial_backoff_ms, DEFAULT_MOUNT_INITIAL_BACKOFF_MS);
        assert_eq!(config.history_limit, DEFAULT_HISTORY_LIMIT);
    }

    #[wasm_bindgen_test]
    fn undefined_yields_default() {
        assert_eq!(Config::from_js(&JsValue::UNDEFINED).unwrap(), Config::default());
    }

    #[wasm_bindgen_test]
    fn normalization_clamps_zero_limits() {
        let config = Config {
            history_limit: 0,
            mount: MountRetry {
                max_attempts: 0,
                initial_backoff_ms: 500,
                max_backoff_ms: 10,
            },
            ..Config::default()
        }
        .normalized();
        assert_eq!(config.history_limit, 1);
        assert_eq!(config.mount.max_attempts, 1);
        assert_eq!(config.mount.max_backoff_ms, 500);
    }
}
