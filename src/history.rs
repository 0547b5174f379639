//! Per-input undo/redo stacks.
//!
//! Each `(node, input)` pair owns a bounded list of text snapshots and a
//! cursor pointing at the snapshot currently shown. Undo and redo only move
//! the cursor; recording a new snapshot drops anything ahead of the cursor.
//! Nothing here touches the network or the DOM.
//!
//! The number of pairs is bounded too. Nodes come and go with workflows while
//! the store outlives them, so once `max_entries` is exceeded the pair that
//! was recorded into least recently is dropped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

use crate::constants::{DEFAULT_HISTORY_MAX_ENTRIES, STORAGE_HISTORY};
use crate::error::{AssistantError, Result};
use crate::models::HistoryKey;
use crate::storage::StorageScope;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub text: String,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    snapshots: VecDeque<Snapshot>,
    cursor: usize,
    // Store-wide recording order.
    #[serde(default)]
    seq: u64,
}

impl HistoryEntry {
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Snapshot under the cursor.
    pub fn current(&self) -> Option<&str> {
        self.snapshots.get(self.cursor).map(|s| s.text.as_str())
    }

    pub fn can_undo(&self) -> bool {
        !self.snapshots.is_empty() && self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.snapshots.len()
    }

    /// Returns `false` when `text` equals the snapshot under the cursor; the
    /// entry is left untouched in that case.
    fn record(&mut self, text: &str, limit: usize) -> bool {
        if self.current() == Some(text) {
            return false;
        }
        if !self.snapshots.is_empty() {
            self.snapshots.truncate(self.cursor + 1);
        }
        self.snapshots.push_back(Snapshot {
            text: text.to_string(),
            recorded_at: Utc::now(),
        });
        while self.snapshots.len() > limit.max(1) {
            self.snapshots.pop_front();
        }
        self.cursor = self.snapshots.len() - 1;
        true
    }

    fn undo(&mut self) -> Result<String> {
        if !self.can_undo() {
            return Err(AssistantError::NothingToUndo);
        }
        self.cursor -= 1;
        Ok(self.snapshots[self.cursor].text.clone())
    }

    fn redo(&mut self) -> Result<String> {
        if !self.can_redo() {
            return Err(AssistantError::NothingToRedo);
        }
        self.cursor += 1;
        Ok(self.snapshots[self.cursor].text.clone())
    }

    /// Repair entries loaded from storage (or shrunk by a new limit).
    fn normalize(&mut self, limit: usize) {
        while self.snapshots.len() > limit.max(1) {
            self.snapshots.pop_front();
            self.cursor = self.cursor.saturating_sub(1);
        }
        if self.snapshots.is_empty() {
            self.cursor = 0;
        } else if self.cursor >= self.snapshots.len() {
            self.cursor = self.snapshots.len() - 1;
        }
    }
}

pub struct HistoryStore {
    entries: HashMap<String, HistoryEntry>,
    limit: usize,
    max_entries: usize,
    next_seq: u64,
    scope: Option<StorageScope>,
}

impl HistoryStore {
    /// In-memory store.
    pub fn new(limit: usize) -> Self {
        Self {
            entries: HashMap::new(),
            limit: limit.max(1),
            max_entries: DEFAULT_HISTORY_MAX_ENTRIES,
            next_seq: 1,
            scope: None,
        }
    }

    /// Store persisted under `scope`, loading whatever was saved before.
    pub fn with_storage(limit: usize, scope: StorageScope) -> Self {
        let mut entries: HashMap<String, HistoryEntry> =
            scope.load(STORAGE_HISTORY).unwrap_or_default();
        for entry in entries.values_mut() {
            entry.normalize(limit);
        }
        entries.retain(|_, entry| !entry.is_empty());
        let next_seq = entries.values().map(|e| e.seq).max().unwrap_or(0) + 1;
        Self {
            entries,
            limit: limit.max(1),
            max_entries: DEFAULT_HISTORY_MAX_ENTRIES,
            next_seq,
            scope: Some(scope),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn set_limit(&mut self, limit: usize) {
        let limit = limit.max(1);
        if limit == self.limit {
            return;
        }
        self.limit = limit;
        for entry in self.entries.values_mut() {
            entry.normalize(limit);
        }
        self.persist();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn set_max_entries(&mut self, max_entries: usize) {
        self.max_entries = max_entries.max(1);
        if self.evict_entries(None) {
            self.persist();
        }
    }

    pub fn entry(&self, key: &HistoryKey) -> Option<&HistoryEntry> {
        self.entries.get(&key.to_string())
    }

    /// Append `text` as the newest snapshot for `key` and point the cursor at
    /// it. A no-op when the snapshot under the cursor is already `text`.
    pub fn record_input(&mut self, key: &HistoryKey, text: &str) -> bool {
        let limit = self.limit;
        let name = key.to_string();
        let entry = self.entries.entry(name.clone()).or_default();
        let changed = entry.record(text, limit);
        if changed {
            entry.seq = self.next_seq;
            self.next_seq += 1;
            self.evict_entries(Some(&name));
            self.persist();
        }
        changed
    }

    /// Drop least recently recorded entries beyond `max_entries`, never `keep`.
    fn evict_entries(&mut self, keep: Option<&str>) -> bool {
        let mut evicted = false;
        while self.entries.len() > self.max_entries {
            let oldest = self
                .entries
                .iter()
                .filter(|(name, _)| Some(name.as_str()) != keep)
                .min_by_key(|(_, entry)| entry.seq)
                .map(|(name, _)| name.clone());
            let Some(oldest) = oldest else {
                break;
            };
            crate::debug_log!("history for {} evicted", oldest);
            self.entries.remove(&oldest);
            evicted = true;
        }
        evicted
    }

    pub fn undo(&mut self, key: &HistoryKey) -> Result<String> {
        let text = self
            .entries
            .get_mut(&key.to_string())
            .ok_or(AssistantError::NothingToUndo)?
            .undo()?;
        self.persist();
        Ok(text)
    }

    pub fn redo(&mut self, key: &HistoryKey) -> Result<String> {
        let text = self
            .entries
            .get_mut(&key.to_string())
            .ok_or(AssistantError::NothingToRedo)?
            .redo()?;
        self.persist();
        Ok(text)
    }

    pub fn can_undo(&self, key: &HistoryKey) -> bool {
        self.entry(key).is_some_and(HistoryEntry::can_undo)
    }

    pub fn can_redo(&self, key: &HistoryKey) -> bool {
        self.entry(key).is_some_and(HistoryEntry::can_redo)
    }

    pub fn current(&self, key: &HistoryKey) -> Option<&str> {
        self.entry(key).and_then(HistoryEntry::current)
    }

    pub fn clear(&mut self, key: &HistoryKey) {
        if self.entries.remove(&key.to_string()).is_some() {
            self.persist();
        }
    }

    /// Drop every stack belonging to `node_id`.
    pub fn clear_node(&mut self, node_id: &str) {
        let prefix = format!("{}:", node_id);
        let before = self.entries.len();
        self.entries.retain(|k, _| !k.starts_with(&prefix));
        if self.entries.len() != before {
            self.persist();
        }
    }

    fn persist(&self) {
        if let Some(scope) = &self.scope {
            if let Err(e) = scope.save(STORAGE_HISTORY, &self.entries) {
                crate::warn_log!("failed to persist history: {}", e);
            }
        }
    }
}
