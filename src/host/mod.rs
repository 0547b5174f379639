//! Contracts the host node graph has to satisfy.
//!
//! The engine never inspects host objects directly. Everything it needs is
//! expressed through `HostNode` / `HostGraph`, and the two classifiers below
//! turn a node into tagged `RenderMode` and `NodeKind` values that the rest of
//! the crate switches on. `js` adapts real JS graph objects to these traits.

pub mod js;

use std::rc::Rc;
use web_sys::{Element, HtmlElement};

use crate::models::{NodeKind, RenderMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetKind {
    MultilineText,
    Text,
    /// Markdown / note style document editor.
    Document,
    Other,
}

#[derive(Debug, Clone)]
pub struct WidgetInfo {
    pub name: String,
    /// Position in the node's widget list, when the host exposes one.
    pub index: Option<usize>,
    pub kind: WidgetKind,
    /// Legacy-mode overlay element (`element` / `inputEl`).
    pub element: Option<HtmlElement>,
}

impl WidgetInfo {
    pub fn new(name: &str, index: Option<usize>, kind: WidgetKind) -> Self {
        Self {
            name: name.to_string(),
            index,
            kind,
            element: None,
        }
    }

    pub fn with_element(mut self, element: HtmlElement) -> Self {
        self.element = Some(element);
        self
    }
}

pub trait HostNode {
    fn id(&self) -> String;
    fn graph_id(&self) -> String;
    fn type_name(&self) -> String;
    fn widgets(&self) -> Vec<WidgetInfo>;
    /// Root of the node's DOM subtree in retained mode.
    fn dom_root(&self) -> Option<Element>;
    /// Inner graph of a composite node.
    fn subgraph(&self) -> Option<Rc<dyn HostGraph>>;
    /// `false` once the node has been removed from its graph.
    fn is_alive(&self) -> bool;
}

pub trait HostGraph {
    fn id(&self) -> String;
    fn nodes(&self) -> Vec<Rc<dyn HostNode>>;

    fn node(&self, node_id: &str) -> Option<Rc<dyn HostNode>> {
        self.nodes().into_iter().find(|n| n.id() == node_id)
    }
}

pub fn classify_render_mode(node: &dyn HostNode) -> RenderMode {
    if node.dom_root().is_some() {
        RenderMode::Retained
    } else {
        RenderMode::Legacy
    }
}

pub fn classify_node_kind(node: &dyn HostNode) -> NodeKind {
    if node.subgraph().is_some() {
        NodeKind::CompositeGraph
    } else if node.widgets().iter().any(|w| w.kind == WidgetKind::Document) {
        NodeKind::TextDocument
    } else {
        NodeKind::Standard
    }
}

/// Widgets that get a toolbar, in widget order.
pub fn eligible_inputs(widgets: &[WidgetInfo], kind: NodeKind) -> Vec<WidgetInfo> {
    widgets
        .iter()
        .filter(|w| match kind {
            NodeKind::Standard => w.kind == WidgetKind::MultilineText,
            NodeKind::TextDocument => {
                matches!(w.kind, WidgetKind::Document | WidgetKind::MultilineText)
            }
            NodeKind::CompositeGraph => false,
        })
        .cloned()
        .collect()
}
