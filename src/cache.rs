//! Content-addressed translation cache.
//!
//! Keys are the exact text. Every entry is reachable from both sides: looking
//! up the source yields the translation, looking up the translation yields the
//! source, which is what makes the translate button toggle back and forth
//! without a second provider call.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

use crate::constants::STORAGE_TRANSLATE_CACHE;
use crate::storage::StorageScope;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheHitKind {
    /// The query was a cached source text.
    Source,
    /// The query was a previously produced translation.
    Translated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheHit {
    pub kind: CacheHitKind,
    pub counterpart: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheRecord {
    source: String,
    translated: String,
}

pub struct ContentCache {
    forward: HashMap<String, String>,
    reverse: HashMap<String, String>,
    // Sources in insertion order, oldest first.
    order: VecDeque<String>,
    limit: usize,
    scope: Option<StorageScope>,
}

impl ContentCache {
    pub fn new(limit: usize) -> Self {
        Self {
            forward: HashMap::new(),
            reverse: HashMap::new(),
            order: VecDeque::new(),
            limit: limit.max(1),
            scope: None,
        }
    }

    pub fn with_storage(limit: usize, scope: StorageScope) -> Self {
        let records: Vec<CacheRecord> = scope.load(STORAGE_TRANSLATE_CACHE).unwrap_or_default();
        let mut cache = Self::new(limit);
        for record in records {
            cache.insert(record.source, record.translated);
        }
        cache.scope = Some(scope);
        cache
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    pub fn set_limit(&mut self, limit: usize) {
        self.limit = limit.max(1);
        if self.evict() {
            self.persist();
        }
    }

    /// Exact-match lookup, source side first.
    pub fn lookup(&self, text: &str) -> Option<CacheHit> {
        if let Some(translated) = self.forward.get(text) {
            return Some(CacheHit {
                kind: CacheHitKind::Source,
                counterpart: translated.clone(),
            });
        }
        self.reverse.get(text).map(|source| CacheHit {
            kind: CacheHitKind::Translated,
            counterpart: source.clone(),
        })
    }

    /// Record a provider-served translation. A newer translation of the same
    /// source replaces the old one in both directions.
    pub fn add_translate_cache(&mut self, source: &str, translated: &str) {
        if source.trim().is_empty() || translated.trim().is_empty() || source == translated {
            return;
        }
        self.insert(source.to_string(), translated.to_string());
        self.persist();
    }

    pub fn clear(&mut self) {
        self.forward.clear();
        self.reverse.clear();
        self.order.clear();
        if let Some(scope) = &self.scope {
            if let Err(e) = scope.remove(STORAGE_TRANSLATE_CACHE) {
                crate::warn_log!("failed to clear translate cache: {}", e);
            }
        }
    }

    fn insert(&mut self, source: String, translated: String) {
        if let Some(previous) = self.forward.remove(&source) {
            self.drop_reverse(&previous, &source);
            self.order.retain(|s| s != &source);
        }
        self.reverse.insert(translated.clone(), source.clone());
        self.forward.insert(source.clone(), translated);
        self.order.push_back(source);
        self.evict();
    }

    /// Forget `translated -> source`. When another live source shares the same
    /// translation, the newest of them takes the inverse over.
    fn drop_reverse(&mut self, translated: &str, source: &str) {
        if !self.reverse.get(translated).is_some_and(|s| s == source) {
            return;
        }
        self.reverse.remove(translated);
        let heir = self
            .order
            .iter()
            .rev()
            .find(|s| s.as_str() != source && self.forward.get(s.as_str()).is_some_and(|t| t == translated))
            .cloned();
        if let Some(heir) = heir {
            self.reverse.insert(translated.to_string(), heir);
        }
    }

    fn evict(&mut self) -> bool {
        let mut evicted = false;
        while self.forward.len() > self.limit {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            if let Some(translated) = self.forward.remove(&oldest) {
                self.drop_reverse(&translated, &oldest);
                evicted = true;
            }
        }
        evicted
    }

    fn persist(&self) {
        let Some(scope) = &self.scope else {
            return;
        };
        let records: Vec<CacheRecord> = self
            .order
            .iter()
            .filter_map(|source| {
                self.forward.get(source).map(|translated| CacheRecord {
                    source: source.clone(),
                    translated: translated.clone(),
                })
            })
            .collect();
        if let Err(e) = scope.save(STORAGE_TRANSLATE_CACHE, &records) {
            crate::warn_log!("failed to persist translate cache: {}", e);
        }
    }
}
