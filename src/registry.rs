//! Authoritative key -> instance map.
//!
//! Besides the instances themselves the registry tracks two pieces of
//! cross-instance state: the keys whose mount is still in flight (so a
//! re-entrant scan skips them) and the reverse map from an element's
//! generated uid to the key that owns it.
//!
//! Every in-flight mount carries a generation number. A retry task that was
//! abandoned by `cancel_pending` keeps its old generation and can never finish
//! a mount that a later scan started for the same key.

use std::collections::HashMap;
use std::rc::Rc;
use web_sys::Element;

use crate::constants::ATTR_UID;
use crate::error::{AssistantError, Result};
use crate::host::{HostNode, WidgetInfo};
use crate::instance::AssistantInstance;
use crate::models::InstanceKey;

/// Generated id stored on the element itself. Computed once, read back on
/// every later call.
pub fn element_uid(el: &Element) -> String {
    if let Some(uid) = el.get_attribute(ATTR_UID) {
        return uid;
    }
    let uid = uuid::Uuid::new_v4().simple().to_string();
    if let Err(e) = el.set_attribute(ATTR_UID, &uid) {
        crate::warn_log!("could not tag element with uid: {:?}", e);
    }
    uid
}

/// Key for `widget` on `node`. `siblings` are the node's eligible inputs;
/// inputs sharing a name are told apart by widget index, or by the element
/// uid when the host gives no index.
pub fn resolve_key(node: &dyn HostNode, widget: &WidgetInfo, siblings: &[WidgetInfo]) -> InstanceKey {
    let same_name = siblings.iter().filter(|w| w.name == widget.name).count();
    let disambiguator = if same_name <= 1 {
        None
    } else if let Some(index) = widget.index {
        Some(index.to_string())
    } else if let Some(el) = &widget.element {
        Some(element_uid(el))
    } else {
        crate::debug_log!(
            "node {} has {} inputs named {} and no way to tell them apart",
            node.id(),
            same_name,
            widget.name
        );
        None
    };
    InstanceKey::new(&node.graph_id(), &node.id(), &widget.name, disambiguator.as_deref())
}

fn node_matches(key: &InstanceKey, graph_id: Option<&str>, node_id: &str) -> bool {
    key.node_id() == node_id && graph_id.map_or(true, |g| key.graph_id() == g)
}

#[derive(Default)]
pub struct InstanceRegistry {
    instances: HashMap<InstanceKey, Rc<AssistantInstance>>,
    owners: HashMap<String, InstanceKey>,
    pending: HashMap<InstanceKey, u64>,
    next_generation: u64,
}

impl InstanceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Rc<AssistantInstance>> {
        self.instances.get(key).cloned()
    }

    pub fn has(&self, key: &str) -> bool {
        self.instances.contains_key(key)
    }

    /// Register a mounted instance. Never overwrites: an existing entry for
    /// the key has to be removed first.
    pub fn add(&mut self, instance: Rc<AssistantInstance>) -> Result<()> {
        let key = instance.key().clone();
        if self.instances.contains_key(&key) {
            return Err(AssistantError::DuplicateKey(key.to_string()));
        }
        if let Some(input) = instance.input_element() {
            self.owners.insert(element_uid(&input), key.clone());
        }
        self.instances.insert(key, instance);
        Ok(())
    }

    pub fn remove(&mut self, key: &str) -> Option<Rc<AssistantInstance>> {
        let instance = self.instances.remove(key)?;
        self.owners.retain(|_, owner| owner.as_str() != key);
        Some(instance)
    }

    /// Key of the instance bound to `el`, if any.
    pub fn owner_of(&self, el: &Element) -> Option<InstanceKey> {
        let uid = el.get_attribute(ATTR_UID)?;
        self.owners.get(&uid).cloned()
    }

    pub fn keys(&self) -> Vec<InstanceKey> {
        let mut keys: Vec<_> = self.instances.keys().cloned().collect();
        keys.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        keys
    }

    /// Keys of `node_id`, limited to `graph_id` when given. Node ids are only
    /// unique within one graph.
    pub fn keys_for_node(&self, graph_id: Option<&str>, node_id: &str) -> Vec<InstanceKey> {
        self.keys()
            .into_iter()
            .filter(|k| node_matches(k, graph_id, node_id))
            .collect()
    }

    pub fn instances(&self) -> Vec<Rc<AssistantInstance>> {
        self.instances.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Mark `key` as mounting and return the generation of this mount.
    /// `None` when it is already mounting or live, in which case the caller
    /// must not start any DOM work.
    pub fn begin_mount(&mut self, key: &InstanceKey) -> Option<u64> {
        if self.instances.contains_key(key) || self.pending.contains_key(key) {
            return None;
        }
        self.next_generation += 1;
        self.pending.insert(key.clone(), self.next_generation);
        Some(self.next_generation)
    }

    /// Clear the pending mark, but only if it still belongs to `generation`.
    pub fn finish_mount(&mut self, key: &InstanceKey, generation: u64) -> bool {
        if self.is_current_mount(key.as_str(), generation) {
            self.pending.remove(key);
            true
        } else {
            false
        }
    }

    pub fn is_mounting(&self, key: &str) -> bool {
        self.pending.contains_key(key)
    }

    pub fn is_current_mount(&self, key: &str, generation: u64) -> bool {
        self.pending.get(key) == Some(&generation)
    }

    /// Abandon in-flight mounts for one node, or all of them.
    pub fn cancel_pending(&mut self, node: Option<(Option<&str>, &str)>) -> usize {
        let before = self.pending.len();
        match node {
            Some((graph_id, node_id)) => self.pending.retain(|k, _| !node_matches(k, graph_id, node_id)),
            None => self.pending.clear(),
        }
        before - self.pending.len()
    }

    /// Live or still mounting.
    pub fn is_claimed_key(&self, key: &str) -> bool {
        self.has(key) || self.is_mounting(key)
    }
}
