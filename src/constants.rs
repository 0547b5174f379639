// DOM attributes written onto host elements
pub const ATTR_MOUNT: &str = "data-pa-mount"; // claimed by instance key
pub const ATTR_BOUND: &str = "data-pa-bound"; // listeners attached
pub const ATTR_UID: &str = "data-pa-uid"; // per-element generated id
pub const ATTR_FEATURE: &str = "data-feature";
pub const ATTR_INSTANCE: &str = "data-pa-instance";

// DOM attributes read from the retained-mode host tree
pub const ATTR_NODE_ID: &str = "data-node-id";
pub const ATTR_WIDGET_NAME: &str = "data-widget-name";

/// Anything the host renders as an editable text surface.
pub const TEXT_SURFACE_SELECTOR: &str =
    "textarea, input[type='text'], [contenteditable='true'], [contenteditable='plaintext-only']";

// CSS classes
pub const CSS_ROOT: &str = "prompt-assistant";
pub const CSS_BUTTON: &str = "pa-button";
pub const CSS_PROCESSING: &str = "pa-processing";
pub const CSS_TIP: &str = "pa-status-tip";
pub const CSS_LAYOUT_HORIZONTAL: &str = "pa-horizontal";
pub const CSS_LAYOUT_VERTICAL: &str = "pa-vertical";
pub const STYLE_ELEMENT_ID: &str = "prompt-assistant-styles";

// Defaults for `Config`
pub const DEFAULT_HISTORY_LIMIT: usize = 50;
pub const DEFAULT_HISTORY_MAX_ENTRIES: usize = 200;
pub const DEFAULT_CACHE_LIMIT: usize = 500;
pub const DEFAULT_MOUNT_ATTEMPTS: u32 = 6;
pub const DEFAULT_MOUNT_INITIAL_BACKOFF_MS: u32 = 100;
pub const DEFAULT_MOUNT_MAX_BACKOFF_MS: u32 = 1600;
pub const DEFAULT_CONSISTENCY_CHECK_MS: u32 = 3000;
pub const DEFAULT_RESIZE_DEBOUNCE_MS: u32 = 150;
pub const DEFAULT_STATUS_TIP_MS: u32 = 2500;
pub const DEFAULT_TRANSLATE_CHUNK_CHARS: usize = 4500;
pub const DEFAULT_STORAGE_PREFIX: &str = "prompt_assistant.";

// Storage entry names under the prefix
pub const STORAGE_HISTORY: &str = "history";
pub const STORAGE_TRANSLATE_CACHE: &str = "translate_cache";

// Toolbar placement
pub const TOOLBAR_EDGE_OFFSET_PX: i32 = 4;

/// Share of the minority script below which text still counts as
/// single-language.
pub const MIXED_LANGUAGE_MINORITY_SHARE: f64 = 0.1;
