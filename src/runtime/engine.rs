use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::actions::FunctionHandler;
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::nodes::function::FunctionNodeDefinition;
use crate::runtime::action::ActionDefinition;
use crate::runtime::asset::{ActionListAsset, ListRef, NodeIndex};
use crate::runtime::cursor::{Cursor, CursorId, Env};
use crate::runtime::graph::{ActionGraph, ActionRegistry};
use crate::runtime::invocation::{Bindings, Invocation, resolve_bindings, substitute};
use crate::runtime::library::AssetLibrary;
use crate::runtime::presenter::{LogPresenter, Presenter};
use crate::runtime::registry::RunRegistry;
use crate::runtime::snapshot::CursorSnapshot;
use crate::runtime::storage::{InMemoryStateStore, StateStore};
use crate::runtime::syscall::{PendingSyscalls, Request};

/// A scene list: its template plus the one working graph it keeps between
/// runs. The graph is lent to the cursor while the list runs.
struct SceneSlot {
    template: Arc<ActionListAsset>,
    graph: Option<ActionGraph>,
}

/// Tick-driven scheduler for the action lists of one scene.
pub struct Engine {
    // Shared asset lists (copied per invocation)
    library: Arc<AssetLibrary>,
    // Registry for node factories
    definitions: ActionRegistry,
    // Scene lists (one persistent working graph each)
    scenes: HashMap<String, SceneSlot>,

    registry: RunRegistry,
    store: Box<dyn StateStore>,
    presenter: Box<dyn Presenter>,

    clock: f64,
    config: EngineConfig,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        Self::with_library(Arc::new(AssetLibrary::new()), EngineConfig::default())
    }

    pub fn with_library(library: Arc<AssetLibrary>, config: EngineConfig) -> Self {
        Self {
            library,
            definitions: ActionRegistry::new(),
            scenes: HashMap::new(),
            registry: RunRegistry::new(),
            store: Box::new(InMemoryStateStore::new()),
            presenter: Box::new(LogPresenter),
            clock: 0.0,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn set_presenter(&mut self, presenter: Box<dyn Presenter>) {
        self.presenter = presenter;
    }

    pub fn set_store(&mut self, store: Box<dyn StateStore>) {
        self.store = store;
    }

    pub fn register_action(&mut self, definition: Box<dyn ActionDefinition>) {
        self.definitions.insert(definition.name().to_string(), definition);
    }

    pub fn register_function(&mut self, handler: Arc<dyn FunctionHandler>) {
        let def = FunctionNodeDefinition { handler };
        self.register_action(Box::new(def));
    }

    pub fn has_action(&self, kind: &str) -> bool {
        self.definitions.contains_key(kind)
    }

    pub fn library(&self) -> &Arc<AssetLibrary> {
        &self.library
    }

    pub fn register_asset(&self, asset: ActionListAsset) -> Option<Arc<ActionListAsset>> {
        self.library.register(asset)
    }

    /// Checks every node of `asset` against the registered action kinds, with
    /// parameter defaults substituted.
    pub fn validate_asset(&self, asset: &ActionListAsset) -> EngineResult<()> {
        let defaults = resolve_bindings(&asset.parameters, &Bindings::new());
        for (index, template) in asset.nodes.iter().enumerate() {
            let def = self
                .definitions
                .get(&template.kind)
                .ok_or_else(|| EngineError::UnknownAction {
                    list: asset.id.clone(),
                    index,
                    kind: template.kind.clone(),
                })?;
            def.validate(&substitute(&template.params, &defaults))
                .map_err(|e| EngineError::InvalidParams {
                    list: asset.id.clone(),
                    index,
                    kind: template.kind.clone(),
                    reason: format!("{:#}", e),
                })?;
        }
        Ok(())
    }

    /// Makes `asset` resident as a scene list, replacing (and stopping) any
    /// scene list with the same id.
    pub fn load_scene_list(&mut self, asset: ActionListAsset) -> EngineResult<()> {
        let graph = ActionGraph::prepare(&asset, &Bindings::new(), &self.definitions)?;
        let list = ListRef::scene(asset.id.clone());
        for id in self.registry.ids_for_list(&list) {
            self.kill(id);
        }
        info!(list = %list, nodes = graph.len(), "scene list loaded");
        self.scenes.insert(
            asset.id.clone(),
            SceneSlot {
                template: Arc::new(asset),
                graph: Some(graph),
            },
        );
        Ok(())
    }

    pub fn start(&mut self, list: ListRef, entry: NodeIndex) -> EngineResult<CursorId> {
        self.invoke(Invocation::new(list).at(entry))
    }

    /// Starts a list and steps it right away, up to its first suspension.
    pub fn invoke(&mut self, invocation: Invocation) -> EngineResult<CursorId> {
        let id = Uuid::new_v4();
        self.spawn(id, invocation)?;
        self.drive(id);
        self.reap();
        Ok(id)
    }

    /// Advances the clock by `dt` seconds and steps every cursor present when
    /// the tick began. Cursors started during the tick first run on the next.
    pub fn tick(&mut self, dt: f64) {
        self.clock += dt.max(0.0);
        for id in self.registry.ids() {
            self.drive(id);
        }
        self.reap();
    }

    /// Fast-forwards one cursor. Returns false when it is unknown, finished or
    /// not skippable.
    pub fn skip(&mut self, id: CursorId) -> bool {
        let Some(cursor) = self.registry.get_mut(id) else {
            return false;
        };
        if !cursor.is_skippable() || !cursor.begin_skip() {
            return false;
        }
        self.drive(id);
        self.reap();
        true
    }

    /// Skips every skippable pausing list, repeating while new blocking lists
    /// appear, for at most `force_skip_passes` passes. Returns the passes made.
    pub fn force_skip_all(&mut self) -> usize {
        let limit = self.config.force_skip_passes;
        let mut passes = 0;
        while passes < limit && self.registry.is_gameplay_blocked() {
            let targets: Vec<CursorId> = self
                .registry
                .iter()
                .filter(|c| c.is_blocking() && c.is_skippable())
                .map(Cursor::id)
                .collect();
            if targets.is_empty() {
                break;
            }
            passes += 1;
            debug!(pass = passes, cursors = targets.len(), "force skip pass");
            for id in targets {
                self.skip(id);
            }
            self.reap();
        }
        if self.registry.is_gameplay_blocked() {
            warn!(passes, "gameplay still blocked after force skip");
        }
        passes
    }

    /// Terminates a cursor without running any more of its nodes.
    pub fn kill(&mut self, id: CursorId) -> bool {
        let Some(mut cursor) = self.registry.unregister(id, self.presenter.as_mut()) else {
            return false;
        };
        cursor.kill();
        self.retire(cursor);
        true
    }

    pub fn kill_list(&mut self, list: &ListRef) -> usize {
        let ids = self.registry.ids_for_list(list);
        ids.into_iter().filter(|id| self.kill(*id)).count()
    }

    /// Drops every cursor. Pending conversation resumes are discarded.
    pub fn kill_all(&mut self) {
        let cursors = self.registry.drain_all();
        if !cursors.is_empty() {
            info!(cursors = cursors.len(), "killing all lists");
        }
        for mut cursor in cursors {
            cursor.kill();
            self.retire(cursor);
        }
    }

    pub fn is_gameplay_blocked(&self) -> bool {
        self.registry.is_gameplay_blocked()
    }

    pub fn is_running(&self, id: CursorId) -> bool {
        self.registry.is_running(id)
    }

    pub fn is_list_running(&self, list: &ListRef) -> bool {
        self.registry.is_list_running(list)
    }

    pub fn active_count(&self) -> usize {
        self.registry.iter().filter(|c| c.is_active()).count()
    }

    pub fn cursor(&self, id: CursorId) -> Option<&Cursor> {
        self.registry.get(id)
    }

    pub fn cursors(&self) -> impl Iterator<Item = &Cursor> {
        self.registry.iter()
    }

    pub fn snapshot(&self, id: CursorId) -> Option<CursorSnapshot> {
        let cursor = self.registry.get(id)?;
        Some(CursorSnapshot {
            id,
            list: cursor.list().clone(),
            bindings: cursor.bindings().clone(),
            entry_index: cursor.entry(),
            next_index: cursor.next_index(),
            is_skipping: cursor.is_skipping(),
            resume_conversation: self.registry.resumption(id).map(str::to_string),
            nodes: cursor.graph().states(),
        })
    }

    pub fn snapshot_all(&self) -> Vec<CursorSnapshot> {
        self.registry
            .iter()
            .filter(|c| c.is_active())
            .filter_map(|c| self.snapshot(c.id()))
            .collect()
    }

    /// Rebuilds a cursor from a snapshot. It keeps its saved id, replaces any
    /// cursor already registered under that id and first steps on the next tick.
    pub fn restore(&mut self, snapshot: CursorSnapshot) -> EngineResult<CursorId> {
        let CursorSnapshot {
            id,
            list,
            bindings,
            entry_index,
            next_index,
            is_skipping,
            resume_conversation,
            nodes,
        } = snapshot;

        if let Some(existing) = self.registry.discard(id) {
            self.retire(existing);
        }
        if let ListRef::Scene(_) = &list {
            for other in self.registry.ids_for_list(&list) {
                if let Some(existing) = self.registry.discard(other) {
                    self.retire(existing);
                }
            }
        }

        let (template, mut graph) = self.working_graph(&list, &bindings)?;
        if graph.len() != nodes.len() {
            let err = EngineError::SnapshotMismatch {
                list: list.clone(),
                expected: graph.len(),
                found: nodes.len(),
            };
            self.return_scene_graph(&list, graph);
            return Err(err);
        }
        graph.apply_states(&nodes);

        let mut cursor = Cursor::new(id, list.clone(), &template, graph, bindings);
        cursor.seed(entry_index, next_index, is_skipping);
        self.registry.register(cursor, resume_conversation);
        info!(cursor = %id, list = %list, next = ?next_index, skipping = is_skipping, "cursor restored");
        Ok(id)
    }

    pub fn get_var(&self, key: &str) -> Option<Value> {
        self.store.get_var(key).ok().flatten()
    }

    pub fn set_var(&mut self, key: &str, value: Value) {
        if let Err(e) = self.store.set_var(key, value) {
            warn!(key, error = %e, "failed to write variable");
        }
    }

    pub fn init_vars(&mut self, vars: HashMap<String, Value>) {
        if let Err(e) = self.store.init(vars) {
            warn!(error = %e, "failed to initialise variables");
        }
    }

    /// Engine clock in seconds.
    pub fn now(&self) -> f64 {
        self.clock
    }

    /// Working graph of a scene list, whether resident or lent to its cursor.
    pub fn scene_graph(&self, id: &str) -> Option<&ActionGraph> {
        let slot = self.scenes.get(id)?;
        if let Some(graph) = &slot.graph {
            return Some(graph);
        }
        let list = ListRef::scene(id);
        self.registry
            .iter()
            .find(|c| c.list() == &list)
            .map(Cursor::graph)
    }

    /// Toggles a node in the scene graph of `list`, or in the working copies
    /// of running asset cursors. Templates are left alone.
    pub fn set_node_enabled(&mut self, list: &ListRef, index: NodeIndex, enabled: bool) -> bool {
        let mut changed = false;
        if let ListRef::Scene(id) = list {
            if let Some(graph) = self.scenes.get_mut(id).and_then(|s| s.graph.as_mut()) {
                changed |= graph.set_enabled(index, enabled);
            }
        }
        for id in self.registry.ids_for_list(list) {
            if let Some(cursor) = self.registry.get_mut(id) {
                changed |= cursor.graph_mut().set_enabled(index, enabled);
            }
        }
        changed
    }

    fn spawn(&mut self, id: CursorId, invocation: Invocation) -> EngineResult<CursorId> {
        let Invocation {
            list,
            bindings,
            entry,
            resume_conversation,
        } = invocation;

        let (template, graph) = match &list {
            ListRef::Scene(scene) => {
                let template = self.scene_template(&list)?;
                // Built before the running instance is stopped so a bad binding leaves it alone.
                let rebuilt = self.rebuild(&template, &bindings)?;
                // A scene list runs once at a time; starting it again restarts it.
                let restarted = self.kill_list(&list);
                if restarted > 0 {
                    debug!(list = %list, "restarting scene list");
                }
                let graph = self.take_scene_graph(scene, &template, rebuilt)?;
                (template, graph)
            }
            ListRef::Asset(_) => self.working_graph(&list, &bindings)?,
        };

        let mut cursor = Cursor::new(id, list.clone(), &template, graph, bindings);
        cursor.start(entry);
        self.registry.register(cursor, resume_conversation);
        info!(cursor = %id, list = %list, entry, "list started");
        Ok(id)
    }

    /// Scene lists lend out their resident graph (rebuilt when bindings are
    /// given, keeping its enabled flags). Asset lists get a fresh copy.
    fn working_graph(
        &mut self,
        list: &ListRef,
        bindings: &Bindings,
    ) -> EngineResult<(Arc<ActionListAsset>, ActionGraph)> {
        match list {
            ListRef::Asset(id) => {
                let template = self
                    .library
                    .get(id)
                    .ok_or_else(|| EngineError::UnknownList(list.clone()))?;
                let graph = ActionGraph::prepare(&template, bindings, &self.definitions)?;
                Ok((template, graph))
            }
            ListRef::Scene(id) => {
                let template = self.scene_template(list)?;
                let rebuilt = self.rebuild(&template, bindings)?;
                let graph = self.take_scene_graph(id, &template, rebuilt)?;
                Ok((template, graph))
            }
        }
    }

    fn scene_template(&self, list: &ListRef) -> EngineResult<Arc<ActionListAsset>> {
        match list {
            ListRef::Scene(id) => self
                .scenes
                .get(id)
                .map(|slot| slot.template.clone())
                .ok_or_else(|| EngineError::UnknownList(list.clone())),
            ListRef::Asset(_) => Err(EngineError::UnknownList(list.clone())),
        }
    }

    // Fresh graph for a scene list invoked with bindings.
    fn rebuild(&self, template: &ActionListAsset, bindings: &Bindings) -> EngineResult<Option<ActionGraph>> {
        if bindings.is_empty() {
            return Ok(None);
        }
        ActionGraph::prepare(template, bindings, &self.definitions).map(Some)
    }

    fn take_scene_graph(
        &mut self,
        id: &str,
        template: &ActionListAsset,
        rebuilt: Option<ActionGraph>,
    ) -> EngineResult<ActionGraph> {
        let resident = self.scenes.get_mut(id).and_then(|slot| slot.graph.take());
        match (resident, rebuilt) {
            (Some(resident), None) => Ok(resident),
            (resident, Some(mut graph)) => {
                if let Some(resident) = resident {
                    for (index, node) in resident.nodes().iter().enumerate() {
                        graph.set_enabled(index, node.enabled());
                    }
                }
                Ok(graph)
            }
            (None, None) => ActionGraph::prepare(template, &Bindings::new(), &self.definitions),
        }
    }

    fn drive(&mut self, id: CursorId) {
        let gate_open = match self.registry.get(id).and_then(Cursor::waiting_on) {
            Some(gate) => self.registry.gate_open(gate),
            None => false,
        };

        let mut pending = PendingSyscalls::default();
        let Some(cursor) = self.registry.get_mut(id) else {
            return;
        };
        let mut env = Env {
            now: self.clock,
            store: self.store.as_mut(),
            presenter: self.presenter.as_mut(),
            syscall: &mut pending,
        };
        cursor.advance(&mut env, gate_open, self.config.max_steps_per_tick);

        self.flush(pending.into_requests());
    }

    // Applies what nodes asked for during a step.
    fn flush(&mut self, requests: Vec<Request>) {
        for request in requests {
            match request {
                Request::Run { id, invocation } => {
                    let list = invocation.list.clone();
                    let conversation = invocation.resume_conversation.clone();
                    if let Err(e) = self.spawn(id, invocation) {
                        warn!(cursor = %id, list = %list, error = %e, "could not start list, skipping");
                        // The list will never end, so its conversation resumes now.
                        if let Some(conversation) = conversation {
                            self.presenter.resume_conversation(&conversation);
                        }
                    }
                }
                Request::Stop(list) => {
                    let killed = self.kill_list(&list);
                    debug!(list = %list, killed, "stop list");
                }
            }
        }
    }

    fn reap(&mut self) {
        for id in self.registry.terminated_ids() {
            if let Some(cursor) = self.registry.unregister(id, self.presenter.as_mut()) {
                self.retire(cursor);
            }
        }
    }

    fn retire(&mut self, cursor: Cursor) {
        let list = cursor.list().clone();
        self.return_scene_graph(&list, cursor.into_graph());
    }

    fn return_scene_graph(&mut self, list: &ListRef, graph: ActionGraph) {
        if let ListRef::Scene(id) = list {
            if let Some(slot) = self.scenes.get_mut(id) {
                slot.graph = Some(graph);
            }
        }
    }
}
