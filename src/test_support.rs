//! Host mocks and DOM fixtures shared by the unit tests.

use std::cell::Cell;
use std::rc::Rc;
use wasm_bindgen::JsCast;
use web_sys::{Element, HtmlElement};

use crate::constants::ATTR_NODE_ID;
use crate::dom_utils::document;
use crate::host::{HostGraph, HostNode, WidgetInfo};
use crate::instance::AssistantInstance;
use crate::models::{FeatureId, InstanceKey, LayoutDirection, MountState, RenderMode};
use crate::toolbar;

pub struct MockNode {
    id: String,
    graph_id: String,
    widgets: Vec<WidgetInfo>,
    root: Option<Element>,
    subgraph: Option<Rc<MockGraph>>,
    alive: Rc<Cell<bool>>,
}

impl MockNode {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            graph_id: "root".to_string(),
            widgets: Vec::new(),
            root: None,
            subgraph: None,
            alive: Rc::new(Cell::new(true)),
        }
    }

    pub fn graph(mut self, graph_id: &str) -> Self {
        self.graph_id = graph_id.to_string();
        self
    }

    pub fn widget(mut self, widget: WidgetInfo) -> Self {
        self.widgets.push(widget);
        self
    }

    /// Give the node a detached `div[data-node-id]` as its retained root.
    pub fn with_dom_root(mut self) -> Self {
        let root = document().unwrap().create_element("div").unwrap();
        root.set_attribute(ATTR_NODE_ID, &self.id).unwrap();
        self.root = Some(root);
        self
    }

    pub fn with_subgraph(mut self, nodes: Vec<Rc<dyn HostNode>>) -> Self {
        self.subgraph = Some(Rc::new(MockGraph::new(&format!("{}-inner", self.id), nodes)));
        self
    }

    pub fn root_element(&self) -> Option<Element> {
        self.root.clone()
    }

    /// Shared switch; flipping it to `false` removes the node from its graph.
    pub fn alive_flag(&self) -> Rc<Cell<bool>> {
        self.alive.clone()
    }
}

impl HostNode for MockNode {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn graph_id(&self) -> String {
        self.graph_id.clone()
    }

    fn type_name(&self) -> String {
        "MockNode".to_string()
    }

    fn widgets(&self) -> Vec<WidgetInfo> {
        self.widgets.clone()
    }

    fn dom_root(&self) -> Option<Element> {
        self.root.clone()
    }

    fn subgraph(&self) -> Option<Rc<dyn HostGraph>> {
        self.subgraph.clone().map(|g| g as Rc<dyn HostGraph>)
    }

    fn is_alive(&self) -> bool {
        self.alive.get()
    }
}

pub struct MockGraph {
    id: String,
    nodes: Vec<Rc<dyn HostNode>>,
}

impl MockGraph {
    pub fn new(id: &str, nodes: Vec<Rc<dyn HostNode>>) -> Self {
        Self {
            id: id.to_string(),
            nodes,
        }
    }
}

impl HostGraph for MockGraph {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn nodes(&self) -> Vec<Rc<dyn HostNode>> {
        self.nodes.clone()
    }
}

/// A container attached to `<body>` for the duration of a test.
pub struct DomGuard {
    container: HtmlElement,
}

impl DomGuard {
    pub fn new() -> Self {
        let doc = document().unwrap();
        let container: HtmlElement = doc.create_element("div").unwrap().unchecked_into();
        doc.body().unwrap().append_child(&container).unwrap();
        Self { container }
    }

    pub fn container(&self) -> HtmlElement {
        self.container.clone()
    }

    pub fn attach(&self, el: &Element) {
        self.container.append_child(el).unwrap();
    }
}

impl Drop for DomGuard {
    fn drop(&mut self) {
        self.container.remove();
    }
}

/// A mounted instance over a fresh textarea, toolbar included, listeners not
/// bound.
pub fn mounted_instance(node_id: &str) -> (Rc<AssistantInstance>, HtmlElement, DomGuard) {
    let guard = DomGuard::new();
    let doc = document().unwrap();
    let input: HtmlElement = doc.create_element("textarea").unwrap().unchecked_into();
    guard.attach(&input);

    let instance = AssistantInstance::new(InstanceKey::new("root", node_id, "text", None));
    instance.transition(MountState::Mounting).unwrap();
    let toolbar = toolbar::build(&doc, &instance, LayoutDirection::Horizontal, Rc::new(|_: FeatureId| {})).unwrap();
    guard.attach(&toolbar.root);
    instance.attach(RenderMode::Legacy, input.clone(), toolbar.root.clone(), toolbar.buttons);
    for cleanup in toolbar.cleanups {
        instance.push_cleanup(cleanup);
    }
    instance.transition(MountState::Mounted).unwrap();
    (instance, input, guard)
}
