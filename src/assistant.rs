//! Engine facade the host glue talks to.
//!
//! `AssistantCore` owns the registry, the history and translation stores, the
//! providers and the current `Config`. Everything is single-threaded and
//! shared through `Rc`; async work holds an `Rc<AssistantCore>` and never
//! keeps a `RefCell` borrow across an `.await`.

use gloo_timers::callback::Interval;
use std::cell::RefCell;
use std::collections::HashSet;
use std::future::Future;
use std::rc::Rc;
use web_sys::Element;

use crate::cache::ContentCache;
use crate::config::Config;
use crate::dom_utils::{read_content, write_content};
use crate::error::{AssistantError, Result};
use crate::history::HistoryStore;
use crate::host::{classify_node_kind, eligible_inputs, HostGraph, HostNode};
use crate::instance::AssistantInstance;
use crate::lang::{detect_language, translation_target, Language};
use crate::layout;
use crate::models::{CreationMode, FeatureId, MountState, NodeKind};
use crate::mount::{self, MountJob};
use crate::operation::{self, CancelToken, OperationContext, OperationOutcome, Progress};
use crate::providers::{split_paragraphs, ExpandProvider, TranslateProvider, TranslateRequest};
use crate::registry::{resolve_key, InstanceRegistry};
use crate::status::{self, TipKind};
use crate::storage::{default_storage, KvStorage, StorageScope};
use crate::toolbar;

pub struct AssistantCore {
    config: RefCell<Rc<Config>>,
    registry: RefCell<InstanceRegistry>,
    history: Rc<RefCell<HistoryStore>>,
    cache: RefCell<ContentCache>,
    translate_provider: RefCell<Option<Rc<dyn TranslateProvider>>>,
    expand_provider: RefCell<Option<Rc<dyn ExpandProvider>>>,
    selection: RefCell<HashSet<String>>,
    consistency_timer: RefCell<Option<Interval>>,
}

impl AssistantCore {
    /// Core persisting to `localStorage` (in memory when it is unavailable).
    pub fn new(config: Config) -> Rc<Self> {
        Self::with_storage(config, default_storage())
    }

    pub fn with_storage(config: Config, storage: Rc<dyn KvStorage>) -> Rc<Self> {
        let config = config.normalized();
        crate::log::set_level(config.log_level);
        let mut history = HistoryStore::with_storage(
            config.history_limit,
            StorageScope::new(storage.clone(), &config.storage_prefix),
        );
        history.set_max_entries(config.history_max_entries);
        let cache = ContentCache::with_storage(
            config.cache_limit,
            StorageScope::new(storage, &config.storage_prefix),
        );
        Rc::new(Self {
            config: RefCell::new(Rc::new(config)),
            registry: RefCell::new(InstanceRegistry::new()),
            history: Rc::new(RefCell::new(history)),
            cache: RefCell::new(cache),
            translate_provider: RefCell::new(None),
            expand_provider: RefCell::new(None),
            selection: RefCell::new(HashSet::new()),
            consistency_timer: RefCell::new(None),
        })
    }

    pub fn config(&self) -> Rc<Config> {
        self.config.borrow().clone()
    }

    pub(crate) fn registry(&self) -> &RefCell<InstanceRegistry> {
        &self.registry
    }

    pub(crate) fn history(&self) -> Rc<RefCell<HistoryStore>> {
        self.history.clone()
    }

    pub fn history_store(&self) -> std::cell::Ref<'_, HistoryStore> {
        self.history.borrow()
    }

    pub fn cache(&self) -> std::cell::Ref<'_, ContentCache> {
        self.cache.borrow()
    }

    pub fn set_translate_provider(&self, provider: Rc<dyn TranslateProvider>) {
        *self.translate_provider.borrow_mut() = Some(provider);
    }

    pub fn set_expand_provider(&self, provider: Rc<dyn ExpandProvider>) {
        *self.expand_provider.borrow_mut() = Some(provider);
    }

    /// Swap in a new settings snapshot. Turning the feature off destroys every
    /// instance; layout changes are pushed to live toolbars.
    pub fn update_config(self: &Rc<Self>, config: Config) {
        let config = config.normalized();
        crate::log::set_level(config.log_level);
        let previous = std::mem::replace(&mut *self.config.borrow_mut(), Rc::new(config.clone()));

        {
            let mut history = self.history.borrow_mut();
            history.set_limit(config.history_limit);
            history.set_max_entries(config.history_max_entries);
        }
        self.cache.borrow_mut().set_limit(config.cache_limit);

        if !config.enabled {
            self.stop_consistency_timer();
            let removed = self.cleanup(None, true);
            crate::info_log!("assistant disabled, {} instances removed", removed);
            return;
        }

        if config.layout != previous.layout {
            for instance in self.registry.borrow().instances() {
                if let Some(root) = instance.root() {
                    layout::apply_direction(&root, config.layout);
                }
            }
        }
        if config.creation_mode == CreationMode::OnSelection && previous.creation_mode != CreationMode::OnSelection {
            self.drop_unselected();
        }
        let timer_running = self.consistency_timer.borrow().is_some();
        if !previous.enabled || (timer_running && config.consistency_check_ms != previous.consistency_check_ms) {
            self.start_consistency_timer();
        }
    }

    /// Create instances for every eligible input of `node`. Already mounted
    /// or mounting keys are left alone, so scanning twice is harmless.
    pub fn scan_node(self: &Rc<Self>, node: Rc<dyn HostNode>) -> Vec<Rc<AssistantInstance>> {
        let config = self.config();
        if !config.enabled || !node.is_alive() {
            return Vec::new();
        }

        let kind = classify_node_kind(node.as_ref());
        if kind == NodeKind::CompositeGraph {
            return match node.subgraph() {
                Some(inner) => self.scan_graph(inner),
                None => Vec::new(),
            };
        }
        if config.creation_mode == CreationMode::OnSelection && !self.selection.borrow().contains(&node.id()) {
            return Vec::new();
        }

        let eligible = eligible_inputs(&node.widgets(), kind);
        let mut instances = Vec::new();
        for (position, widget) in eligible.iter().enumerate() {
            let key = resolve_key(node.as_ref(), widget, &eligible);

            let existing = self.registry.borrow().get(key.as_str());
            if let Some(existing) = existing {
                if !existing.is_orphaned() {
                    instances.push(existing);
                    continue;
                }
                // Host re-rendered the input; start over on the new element.
                self.destroy(key.as_str());
            }
            if self.registry.borrow().is_mounting(key.as_str()) {
                continue;
            }

            let job = MountJob {
                instance: AssistantInstance::new(key),
                node: node.clone(),
                widget: widget.clone(),
                text_position: position,
                eligible: eligible.len(),
            };
            if let Some(instance) = mount::start(self, job) {
                instances.push(instance);
            }
        }
        instances
    }

    /// Scan every node of `graph`, descending into composite nodes.
    pub fn scan_graph(self: &Rc<Self>, graph: Rc<dyn HostGraph>) -> Vec<Rc<AssistantInstance>> {
        graph
            .nodes()
            .into_iter()
            .flat_map(|node| self.scan_node(node))
            .collect()
    }

    /// Track the host selection. In on-selection mode, toolbars follow it:
    /// selected nodes are scanned, idle toolbars on other nodes are removed.
    pub fn on_selection_changed(self: &Rc<Self>, graph: Rc<dyn HostGraph>, node_ids: &[String]) {
        *self.selection.borrow_mut() = node_ids.iter().cloned().collect();
        if self.config().creation_mode != CreationMode::OnSelection {
            return;
        }
        self.drop_unselected();
        for id in node_ids {
            if let Some(node) = graph.node(id) {
                self.scan_node(node);
            }
        }
    }

    fn drop_unselected(&self) {
        let selection = self.selection.borrow().clone();
        let stale: Vec<String> = self
            .registry
            .borrow()
            .instances()
            .into_iter()
            .filter(|i| !selection.contains(i.node_id()) && !i.is_busy())
            .map(|i| i.key().to_string())
            .collect();
        for key in stale {
            self.destroy(&key);
        }
    }

    fn destroy(&self, key: &str) -> bool {
        let removed = self.registry.borrow_mut().remove(key);
        match removed {
            Some(instance) => {
                instance.dispose();
                true
            }
            None => false,
        }
    }

    /// Destroy the instances of one node, or all of them, and abandon any
    /// mount still retrying for them. History is kept. A bare node id matches
    /// that id in every graph; use `cleanup_node` or `cleanup_in_graph` for
    /// nodes inside subgraphs.
    pub fn cleanup(&self, node_id: Option<&str>, silent: bool) -> usize {
        self.cleanup_in_graph(None, node_id, silent)
    }

    /// Like `cleanup` for one host node, scoped to the graph it lives in.
    pub fn cleanup_node(&self, node: &dyn HostNode, silent: bool) -> usize {
        let (graph_id, node_id) = (node.graph_id(), node.id());
        self.cleanup_in_graph(Some(graph_id.as_str()), Some(node_id.as_str()), silent)
    }

    pub fn cleanup_in_graph(&self, graph_id: Option<&str>, node_id: Option<&str>, silent: bool) -> usize {
        let keys = {
            let mut registry = self.registry.borrow_mut();
            match node_id {
                Some(id) => {
                    registry.cancel_pending(Some((graph_id, id)));
                    registry.keys_for_node(graph_id, id)
                }
                None => {
                    registry.cancel_pending(None);
                    registry.keys()
                }
            }
        };
        let removed = keys.iter().filter(|k| self.destroy(k.as_str())).count();
        if !silent && removed > 0 {
            crate::info_log!("cleaned up {} instances ({})", removed, node_id.unwrap_or("all"));
        }
        removed
    }

    /// Destroy the instance bound to `el`, for hosts that report removed
    /// widgets by element rather than by node.
    pub fn cleanup_element(&self, el: &Element) -> bool {
        let owner = self.registry.borrow().owner_of(el);
        match owner {
            Some(key) => {
                crate::debug_log!("{}: element removed by host", key);
                self.destroy(key.as_str())
            }
            None => false,
        }
    }

    pub fn get_instance(&self, key: &str) -> Option<Rc<AssistantInstance>> {
        self.registry.borrow().get(key)
    }

    pub fn has_instance(&self, key: &str) -> bool {
        self.registry.borrow().has(key)
    }

    pub fn instance_keys(&self) -> Vec<String> {
        self.registry.borrow().keys().into_iter().map(|k| k.to_string()).collect()
    }

    /// Destroy mounted instances whose input left the document.
    pub fn check_consistency(&self) -> usize {
        let orphaned: Vec<String> = self
            .registry
            .borrow()
            .instances()
            .into_iter()
            .filter(|i| i.is_orphaned())
            .map(|i| i.key().to_string())
            .collect();
        for key in &orphaned {
            crate::debug_log!("{}", AssistantError::StaleReference(key.clone()));
            self.destroy(key);
        }
        orphaned.len()
    }

    pub fn start_consistency_timer(self: &Rc<Self>) {
        let period = self.config().consistency_check_ms;
        if period == 0 {
            self.stop_consistency_timer();
            return;
        }
        let weak = Rc::downgrade(self);
        let interval = Interval::new(period, move || {
            if let Some(core) = weak.upgrade() {
                core.check_consistency();
            }
        });
        // Dropping the previous interval cancels it.
        *self.consistency_timer.borrow_mut() = Some(interval);
    }

    pub fn stop_consistency_timer(&self) {
        self.consistency_timer.borrow_mut().take();
    }

    fn operation_context(&self) -> OperationContext {
        OperationContext {
            history: self.history.clone(),
            status_tip_ms: self.config().status_tip_ms,
        }
    }

    /// Toolbar click entry point.
    pub fn dispatch_feature(self: &Rc<Self>, instance: &Rc<AssistantInstance>, feature: FeatureId) {
        match feature {
            FeatureId::Undo | FeatureId::Redo => {
                let result = if feature == FeatureId::Undo {
                    self.undo_instance(instance)
                } else {
                    self.redo_instance(instance)
                };
                if let Err(e) = result {
                    crate::debug_log!("{}: {}", instance.key(), e);
                }
            }
            FeatureId::Translate => {
                let core = self.clone();
                let instance = instance.clone();
                wasm_bindgen_futures::spawn_local(async move {
                    core.translate_instance(&instance).await;
                });
            }
            FeatureId::Expand => {
                let core = self.clone();
                let instance = instance.clone();
                wasm_bindgen_futures::spawn_local(async move {
                    core.expand_instance(&instance).await;
                });
            }
        }
    }

    fn step_history(&self, instance: &AssistantInstance, forward: bool) -> Result<String> {
        if instance.state() != MountState::Mounted {
            return Err(AssistantError::StaleReference(instance.key().to_string()));
        }
        let input = instance
            .input_element()
            .ok_or_else(|| AssistantError::StaleReference(instance.key().to_string()))?;
        // A late result must not overwrite the restored text.
        operation::cancel_active(instance);

        let text = {
            let mut history = self.history.borrow_mut();
            if forward {
                history.redo(instance.history_key())?
            } else {
                history.undo(instance.history_key())?
            }
        };
        write_content(&input, &text)?;
        toolbar::sync_history_buttons(instance, &self.history.borrow());
        Ok(text)
    }

    pub fn undo_instance(&self, instance: &AssistantInstance) -> Result<String> {
        self.step_history(instance, false)
    }

    pub fn redo_instance(&self, instance: &AssistantInstance) -> Result<String> {
        self.step_history(instance, true)
    }

    /// Run `work` as the instance's single in-flight operation.
    pub async fn run<W, F>(&self, instance: &Rc<AssistantInstance>, feature: FeatureId, work: W) -> OperationOutcome
    where
        W: FnOnce(Progress, CancelToken) -> F,
        F: Future<Output = Result<String>>,
    {
        operation::run(instance, feature, self.operation_context(), work).await
    }

    fn current_text(instance: &AssistantInstance) -> Option<String> {
        if instance.state() != MountState::Mounted {
            return None;
        }
        let text = read_content(&instance.input_element()?);
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }

    fn missing_provider(&self, instance: &AssistantInstance, feature: FeatureId) -> OperationOutcome {
        if let Some(button) = instance.button(feature) {
            status::show_tip(&button, "No provider configured", TipKind::Info, self.config().status_tip_ms);
        }
        crate::warn_log!("{}: no {} provider registered", instance.key(), feature.as_str());
        OperationOutcome::Skipped
    }

    /// Translate the input, toggling through the cache when the text (or its
    /// translation) was seen before.
    pub async fn translate_instance(self: &Rc<Self>, instance: &Rc<AssistantInstance>) -> OperationOutcome {
        let Some(text) = Self::current_text(instance) else {
            return OperationOutcome::Skipped;
        };

        let hit = self.cache.borrow().lookup(&text);
        if let Some(hit) = hit {
            crate::debug_log!("{}: translation cache hit ({:?})", instance.key(), hit.kind);
            let counterpart = hit.counterpart;
            return self
                .run(instance, FeatureId::Translate, move |_, _| async move { Ok(counterpart) })
                .await;
        }

        let provider = self.translate_provider.borrow().clone();
        let Some(provider) = provider else {
            return self.missing_provider(instance, FeatureId::Translate);
        };
        let language = detect_language(&text);
        let from = language.code();
        let to = translation_target(language);
        let chunks = split_paragraphs(&text, self.config().translate_chunk_chars);
        let outcome = self
            .run(instance, FeatureId::Translate, move |_, token| async move {
                let mut parts = Vec::with_capacity(chunks.len());
                for chunk in chunks {
                    // Checked between requests so a superseded run stops early.
                    if token.is_cancelled() {
                        return Err(AssistantError::OperationCancelled);
                    }
                    let request = TranslateRequest {
                        text: chunk,
                        from: from.to_string(),
                        to: to.to_string(),
                    };
                    parts.push(provider.translate(request).await?);
                }
                if token.is_cancelled() {
                    return Err(AssistantError::OperationCancelled);
                }
                let translated = parts.join("\n");
                if translated.trim().is_empty() {
                    return Err(AssistantError::OperationFailed("empty translation".into()));
                }
                Ok(translated)
            })
            .await;

        if let OperationOutcome::Completed(translated) = &outcome {
            if language != Language::Mixed || self.config().cache_mixed_language {
                self.cache.borrow_mut().add_translate_cache(&text, translated);
            }
        }
        outcome
    }

    /// Stream an expanded prompt into the input.
    pub async fn expand_instance(self: &Rc<Self>, instance: &Rc<AssistantInstance>) -> OperationOutcome {
        let Some(text) = Self::current_text(instance) else {
            return OperationOutcome::Skipped;
        };
        let provider = self.expand_provider.borrow().clone();
        let Some(provider) = provider else {
            return self.missing_provider(instance, FeatureId::Expand);
        };
        self.run(instance, FeatureId::Expand, move |progress, token| provider.expand(text, progress, token))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{WidgetInfo, WidgetKind};
    use crate::providers::LocalFuture;
    use crate::storage::MemoryStorage;
    use crate::test_support::{DomGuard, MockGraph, MockNode};
    use std::cell::Cell;
    use wasm_bindgen::JsCast;
    use wasm_bindgen_test::*;
    use web_sys::HtmlElement;

    wasm_bindgen_test_configure!(run_in_browser);

    fn core_with(config: Config) -> Rc<AssistantCore> {
        AssistantCore::with_storage(config, Rc::new(MemoryStorage::new()))
    }

    fn legacy_node(guard: &DomGuard, id: &str, text: &str) -> (Rc<MockNode>, HtmlElement) {
        let doc = crate::dom_utils::document().unwrap();
        let input: HtmlElement = doc.create_element("textarea").unwrap().unchecked_into();
        let wrapper = doc.create_element("div").unwrap();
        wrapper.append_child(&input).unwrap();
        guard.attach(&wrapper);
        write_content(&input, text).unwrap();
        let node = MockNode::new(id)
            .widget(WidgetInfo::new("text", Some(0), WidgetKind::MultilineText).with_element(input.clone()));
        (Rc::new(node), input)
    }

    struct CountingTranslator {
        calls: Rc<Cell<u32>>,
    }

    struct FailingTranslator;

    impl TranslateProvider for FailingTranslator {
        fn translate(&self, _: TranslateRequest) -> LocalFuture<Result<String>> {
            Box::pin(async { Err(AssistantError::OperationFailed("quota exceeded".into())) })
        }
    }

    impl TranslateProvider for CountingTranslator {
        fn translate(&self, request: TranslateRequest) -> LocalFuture<Result<String>> {
            self.calls.set(self.calls.get() + 1);
            Box::pin(async move { Ok(format!("[{}] {}", request.to, request.text)) })
        }
    }

    #[wasm_bindgen_test]
    fn scan_is_idempotent() {
        let guard = DomGuard::new();
        let core = core_with(Config::default());
        let (node, _input) = legacy_node(&guard, "1", "a cat");
        let first = core.scan_node(node.clone());
        let second = core.scan_node(node);
        assert_eq!(first.len(), 1);
        assert!(Rc::ptr_eq(&first[0], &second[0]));
        assert_eq!(core.instance_keys(), vec!["root:1:text".to_string()]);
        assert_eq!(
            guard.container().query_selector_all(".prompt-assistant").unwrap().length(),
            1
        );
    }

    #[wasm_bindgen_test]
    fn composite_nodes_are_descended_into() {
        let guard = DomGuard::new();
        let core = core_with(Config::default());
        let (inner, _input) = legacy_node(&guard, "7", "inner prompt");
        let composite = Rc::new(MockNode::new("6").with_subgraph(vec![inner as Rc<dyn HostNode>]));
        let graph = Rc::new(MockGraph::new("root", vec![composite as Rc<dyn HostNode>]));
        let instances = core.scan_graph(graph);
        assert_eq!(instances.len(), 1);
        assert_eq!(instances[0].node_id(), "7");
    }

    #[wasm_bindgen_test]
    fn cleanup_and_disable_tear_down() {
        let guard = DomGuard::new();
        let core = core_with(Config::default());
        let (a, input_a) = legacy_node(&guard, "1", "x");
        let (b, _) = legacy_node(&guard, "2", "y");
        core.scan_node(a);
        core.scan_node(b);
        assert_eq!(core.cleanup(Some("1"), false), 1);
        assert!(!input_a.has_attribute(crate::constants::ATTR_MOUNT));
        assert_eq!(core.instance_keys(), vec!["root:2:text".to_string()]);

        core.update_config(Config {
            enabled: false,
            ..Config::default()
        });
        assert!(core.instance_keys().is_empty());
        assert!(guard.container().query_selector(".prompt-assistant").unwrap().is_none());
    }

    #[wasm_bindgen_test]
    fn orphaned_instances_are_collected() {
        let guard = DomGuard::new();
        let core = core_with(Config::default());
        let (node, input) = legacy_node(&guard, "3", "x");
        core.scan_node(node);
        assert_eq!(core.check_consistency(), 0);
        input.remove();
        assert_eq!(core.check_consistency(), 1);
        assert!(!core.has_instance("root:3:text"));
    }

    #[wasm_bindgen_test]
    fn on_selection_mode_follows_selection() {
        let guard = DomGuard::new();
        let core = core_with(Config {
            creation_mode: CreationMode::OnSelection,
            ..Config::default()
        });
        let (a, _) = legacy_node(&guard, "1", "x");
        let (b, _) = legacy_node(&guard, "2", "y");
        let graph: Rc<dyn HostGraph> = Rc::new(MockGraph::new(
            "root",
            vec![a.clone() as Rc<dyn HostNode>, b as Rc<dyn HostNode>],
        ));
        assert!(core.scan_node(a).is_empty());

        core.on_selection_changed(graph.clone(), &["1".to_string()]);
        assert_eq!(core.instance_keys(), vec!["root:1:text".to_string()]);
        core.on_selection_changed(graph, &["2".to_string()]);
        assert_eq!(core.instance_keys(), vec!["root:2:text".to_string()]);
    }

    #[wasm_bindgen_test]
    fn undo_redo_restore_text() {
        let guard = DomGuard::new();
        let core = core_with(Config::default());
        let (node, input) = legacy_node(&guard, "4", "first");
        let instance = core.scan_node(node).remove(0);

        write_content(&input, "second").unwrap();
        input.dispatch_event(&web_sys::Event::new("blur").unwrap()).unwrap();

        assert_eq!(core.undo_instance(&instance).unwrap(), "first");
        assert_eq!(read_content(&input), "first");
        assert_eq!(core.undo_instance(&instance), Err(AssistantError::NothingToUndo));
        assert_eq!(core.redo_instance(&instance).unwrap(), "second");
        assert_eq!(core.redo_instance(&instance), Err(AssistantError::NothingToRedo));
    }

    #[wasm_bindgen_test]
    async fn translate_toggles_through_cache() {
        let guard = DomGuard::new();
        let core = core_with(Config::default());
        let calls = Rc::new(Cell::new(0));
        core.set_translate_provider(Rc::new(CountingTranslator { calls: calls.clone() }));
        let (node, input) = legacy_node(&guard, "5", "a cat on the sofa");
        let instance = core.scan_node(node).remove(0);

        let first = core.translate_instance(&instance).await;
        assert_eq!(first, OperationOutcome::Completed("[zh] a cat on the sofa".into()));
        assert_eq!(calls.get(), 1);

        let back = core.translate_instance(&instance).await;
        assert_eq!(back, OperationOutcome::Completed("a cat on the sofa".into()));
        assert_eq!(read_content(&input), "a cat on the sofa");
        assert_eq!(calls.get(), 1, "second toggle is served from the cache");
        assert!(core.history_store().can_undo(instance.history_key()));
    }

    #[wasm_bindgen_test]
    async fn missing_provider_skips() {
        let guard = DomGuard::new();
        let core = core_with(Config::default());
        let (node, input) = legacy_node(&guard, "8", "hello");
        let instance = core.scan_node(node).remove(0);
        assert_eq!(core.expand_instance(&instance).await, OperationOutcome::Skipped);
        assert_eq!(read_content(&input), "hello");

        write_content(&input, "   ").unwrap();
        assert_eq!(core.translate_instance(&instance).await, OperationOutcome::Skipped);
    }

    const MIXED: &str = "masterpiece, 一个女孩, best quality, 森林";

    #[wasm_bindgen_test]
    async fn mixed_language_results_are_not_cached_by_default() {
        let guard = DomGuard::new();
        let core = core_with(Config::default());
        let calls = Rc::new(Cell::new(0));
        core.set_translate_provider(Rc::new(CountingTranslator { calls: calls.clone() }));
        let (node, _input) = legacy_node(&guard, "10", MIXED);
        let instance = core.scan_node(node).remove(0);

        let outcome = core.translate_instance(&instance).await;
        assert!(matches!(outcome, OperationOutcome::Completed(_)));
        assert!(core.cache().is_empty());
        assert_eq!(core.cache().lookup(MIXED), None);
    }

    #[wasm_bindgen_test]
    async fn mixed_language_results_are_cached_when_enabled() {
        let guard = DomGuard::new();
        let core = core_with(Config {
            cache_mixed_language: true,
            ..Config::default()
        });
        core.set_translate_provider(Rc::new(CountingTranslator { calls: Rc::new(Cell::new(0)) }));
        let (node, _input) = legacy_node(&guard, "11", MIXED);
        let instance = core.scan_node(node).remove(0);

        let outcome = core.translate_instance(&instance).await;
        let OperationOutcome::Completed(translated) = outcome else {
            panic!("translation did not complete: {:?}", outcome);
        };
        assert_eq!(core.cache().len(), 1);
        assert_eq!(core.cache().lookup(&translated).unwrap().counterpart, MIXED);
    }

    #[wasm_bindgen_test]
    async fn failed_translation_leaves_cache_and_input_alone() {
        let guard = DomGuard::new();
        let core = core_with(Config::default());
        core.set_translate_provider(Rc::new(FailingTranslator));
        let (node, input) = legacy_node(&guard, "12", "a red fox");
        let instance = core.scan_node(node).remove(0);

        let outcome = core.translate_instance(&instance).await;
        assert_eq!(outcome, OperationOutcome::Failed("quota exceeded".into()));
        assert!(core.cache().is_empty());
        assert_eq!(read_content(&input), "a red fox");
        assert!(!core.history_store().can_undo(instance.history_key()));
    }

    #[wasm_bindgen_test]
    fn layout_change_reaches_live_toolbars() {
        let guard = DomGuard::new();
        let core = core_with(Config::default());
        let (node, _input) = legacy_node(&guard, "13", "x");
        let instance = core.scan_node(node).remove(0);
        let root = instance.root().unwrap();
        assert!(root.class_list().contains(crate::constants::CSS_LAYOUT_HORIZONTAL));

        core.update_config(Config {
            layout: crate::models::LayoutDirection::Vertical,
            ..Config::default()
        });
        assert!(root.class_list().contains(crate::constants::CSS_LAYOUT_VERTICAL));
        assert!(!root.class_list().contains(crate::constants::CSS_LAYOUT_HORIZONTAL));
        assert_eq!(instance.state(), MountState::Mounted);
    }

    #[wasm_bindgen_test]
    fn node_cleanup_is_scoped_to_its_graph() {
        let guard = DomGuard::new();
        let core = core_with(Config::default());
        let (top, _) = legacy_node(&guard, "5", "x");
        let doc = crate::dom_utils::document().unwrap();
        let inner_input: HtmlElement = doc.create_element("textarea").unwrap().unchecked_into();
        let wrapper = doc.create_element("div").unwrap();
        wrapper.append_child(&inner_input).unwrap();
        guard.attach(&wrapper);
        let inner = Rc::new(
            MockNode::new("5")
                .graph("sub")
                .widget(WidgetInfo::new("text", Some(0), WidgetKind::MultilineText).with_element(inner_input)),
        );
        core.scan_node(top.clone());
        core.scan_node(inner);
        assert_eq!(core.instance_keys().len(), 2);

        assert_eq!(core.cleanup_node(top.as_ref(), true), 1);
        assert_eq!(core.instance_keys(), vec!["sub:5:text".to_string()]);
        assert_eq!(core.cleanup_in_graph(Some("root"), Some("5"), true), 0);
        assert_eq!(core.cleanup(Some("5"), true), 1);
    }

    #[wasm_bindgen_test]
    fn element_cleanup_finds_owner() {
        let guard = DomGuard::new();
        let core = core_with(Config::default());
        let (node, input) = legacy_node(&guard, "14", "x");
        core.scan_node(node);
        assert!(core.has_instance("root:14:text"));

        assert!(core.cleanup_element(&input));
        assert!(!core.has_instance("root:14:text"));
        assert!(!input.has_attribute(crate::constants::ATTR_MOUNT));
        assert!(!core.cleanup_element(&input));
    }

    #[wasm_bindgen_test]
    async fn long_input_is_translated_in_chunks() {
        let guard = DomGuard::new();
        let core = core_with(Config {
            translate_chunk_chars: 8,
            ..Config::default()
        });
        let calls = Rc::new(Cell::new(0));
        core.set_translate_provider(Rc::new(CountingTranslator { calls: calls.clone() }));
        let (node, input) = legacy_node(&guard, "15", "red fox\nblue sky");
        let instance = core.scan_node(node).remove(0);

        let outcome = core.translate_instance(&instance).await;
        assert_eq!(outcome, OperationOutcome::Completed("[zh] red fox\n[zh] blue sky".into()));
        assert_eq!(calls.get(), 2);
        assert_eq!(read_content(&input), "[zh] red fox\n[zh] blue sky");
        assert_eq!(core.cache().lookup("red fox\nblue sky").unwrap().counterpart, "[zh] red fox\n[zh] blue sky");
    }
}
