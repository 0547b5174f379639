use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Which host DOM topology a node currently uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    /// Canvas-drawn node with widget elements overlaid on top of it.
    Legacy,
    /// Component tree with a DOM subtree per node.
    Retained,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeKind {
    Standard,
    /// Node whose text surface is a document/markdown editor.
    TextDocument,
    /// Node wrapping an inner graph; never mounted directly.
    CompositeGraph,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MountState {
    Unmounted,
    Mounting,
    Mounted,
    Destroyed,
}

impl MountState {
    /// Transitions only move forward, except a failed mount falling back to
    /// `Unmounted`. `Destroyed` is absorbing.
    pub fn can_transition_to(self, next: MountState) -> bool {
        use MountState::*;
        matches!(
            (self, next),
            (Unmounted, Mounting)
                | (Unmounted, Destroyed)
                | (Mounting, Mounted)
                | (Mounting, Unmounted)
                | (Mounting, Destroyed)
                | (Mounted, Destroyed)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum CreationMode {
    /// Attach to every eligible input as soon as the node is scanned.
    #[default]
    Always,
    /// Attach only while the node is selected.
    OnSelection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LayoutDirection {
    #[default]
    Horizontal,
    Vertical,
}

/// Toolbar controls. Undo/redo are local; translate/expand run through the
/// operation controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureId {
    Undo,
    Redo,
    Translate,
    Expand,
}

impl FeatureId {
    pub const ALL: [FeatureId; 4] = [
        FeatureId::Undo,
        FeatureId::Redo,
        FeatureId::Translate,
        FeatureId::Expand,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FeatureId::Undo => "undo",
            FeatureId::Redo => "redo",
            FeatureId::Translate => "translate",
            FeatureId::Expand => "expand",
        }
    }

    pub fn parse(value: &str) -> Option<FeatureId> {
        FeatureId::ALL.into_iter().find(|f| f.as_str() == value)
    }

    pub fn label(self) -> &'static str {
        match self {
            FeatureId::Undo => "\u{21b6}",
            FeatureId::Redo => "\u{21b7}",
            FeatureId::Translate => "\u{6587}/A",
            FeatureId::Expand => "\u{2728}",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            FeatureId::Undo => "Undo",
            FeatureId::Redo => "Redo",
            FeatureId::Translate => "Translate",
            FeatureId::Expand => "Expand prompt",
        }
    }
}

/// Identity of one toolbar: `graph:node:input[#disambiguator]`.
///
/// Equality and hashing only look at the rendered form so the registry can be
/// queried with a plain `&str` coming from JS.
#[derive(Debug, Clone)]
pub struct InstanceKey {
    rendered: String,
    graph_id: String,
    node_id: String,
    input_id: String,
}

impl InstanceKey {
    pub fn new(graph_id: &str, node_id: &str, input_name: &str, disambiguator: Option<&str>) -> Self {
        let input_id = match disambiguator {
            Some(d) => format!("{}#{}", input_name, d),
            None => input_name.to_string(),
        };
        Self {
            rendered: format!("{}:{}:{}", graph_id, node_id, input_id),
            graph_id: graph_id.to_string(),
            node_id: node_id.to_string(),
            input_id,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.rendered
    }

    pub fn graph_id(&self) -> &str {
        &self.graph_id
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    /// Input name plus disambiguator, unique within the node.
    pub fn input_id(&self) -> &str {
        &self.input_id
    }

    pub fn history_key(&self) -> HistoryKey {
        HistoryKey::new(&self.node_id, &self.input_id)
    }
}

impl PartialEq for InstanceKey {
    fn eq(&self, other: &Self) -> bool {
        self.rendered == other.rendered
    }
}

impl Eq for InstanceKey {}

impl Hash for InstanceKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rendered.hash(state);
    }
}

impl Borrow<str> for InstanceKey {
    fn borrow(&self) -> &str {
        &self.rendered
    }
}

impl fmt::Display for InstanceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.rendered)
    }
}

/// `(node, input)` pair addressing a history stack.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HistoryKey {
    pub node_id: String,
    pub input_id: String,
}

impl HistoryKey {
    pub fn new(node_id: &str, input_id: &str) -> Self {
        Self {
            node_id: node_id.to_string(),
            input_id: input_id.to_string(),
        }
    }
}

impl fmt::Display for HistoryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.node_id, self.input_id)
    }
}
