use tracing::{debug, trace, warn};
use uuid::Uuid;

use crate::runtime::action::{Gate, Progress};
use crate::runtime::asset::{ActionListAsset, ListMode, ListRef, NodeIndex};
use crate::runtime::branch::{self, Resolution};
use crate::runtime::context::ActionContext;
use crate::runtime::graph::ActionGraph;
use crate::runtime::invocation::{Bindings, Invocation};
use crate::runtime::presenter::{Presenter, Visit};
use crate::runtime::storage::StateStore;
use crate::runtime::syscall::Syscall;

pub type CursorId = Uuid;

#[derive(Debug, Clone, PartialEq)]
pub enum Wake {
    /// Engine time in seconds.
    At(f64),
    Gate(Gate),
}

#[derive(Debug, Clone, PartialEq)]
pub enum CursorState {
    Idle,
    Running(NodeIndex),
    Suspended { index: NodeIndex, wake: Wake },
    Terminated,
}

/// Collaborators a cursor needs while it steps.
pub(crate) struct Env<'a> {
    pub now: f64,
    pub store: &'a mut dyn StateStore,
    pub presenter: &'a mut dyn Presenter,
    pub syscall: &'a mut dyn Syscall,
}

/// One traversal of an action graph.
#[derive(Debug)]
pub struct Cursor {
    id: CursorId,
    list: ListRef,
    mode: ListMode,
    skippable: bool,
    graph: ActionGraph,
    entry: NodeIndex,
    state: CursorState,
    skipping: bool,
    bindings: Bindings,
}

impl Cursor {
    pub fn new(
        id: CursorId,
        list: ListRef,
        asset: &ActionListAsset,
        graph: ActionGraph,
        bindings: Bindings,
    ) -> Self {
        Self {
            id,
            list,
            mode: asset.mode,
            skippable: asset.skippable,
            graph,
            entry: 0,
            state: CursorState::Idle,
            skipping: false,
            bindings,
        }
    }

    pub fn id(&self) -> CursorId {
        self.id
    }

    pub fn list(&self) -> &ListRef {
        &self.list
    }

    pub fn mode(&self) -> ListMode {
        self.mode
    }

    pub fn is_skippable(&self) -> bool {
        self.skippable
    }

    pub fn is_skipping(&self) -> bool {
        self.skipping
    }

    pub fn entry(&self) -> NodeIndex {
        self.entry
    }

    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    pub fn state(&self) -> &CursorState {
        &self.state
    }

    pub fn graph(&self) -> &ActionGraph {
        &self.graph
    }

    pub(crate) fn graph_mut(&mut self) -> &mut ActionGraph {
        &mut self.graph
    }

    pub(crate) fn into_graph(self) -> ActionGraph {
        self.graph
    }

    /// Index of the node the cursor will run next, `None` once it has ended.
    pub fn next_index(&self) -> Option<NodeIndex> {
        match &self.state {
            CursorState::Running(index) | CursorState::Suspended { index, .. } => Some(*index),
            CursorState::Idle | CursorState::Terminated => None,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, CursorState::Running(_) | CursorState::Suspended { .. })
    }

    pub fn is_terminated(&self) -> bool {
        matches!(self.state, CursorState::Terminated)
    }

    /// Active and holding up gameplay.
    pub fn is_blocking(&self) -> bool {
        self.is_active() && self.mode == ListMode::Pausing
    }

    pub fn waiting_on(&self) -> Option<&Gate> {
        match &self.state {
            CursorState::Suspended { wake: Wake::Gate(gate), .. } => Some(gate),
            _ => None,
        }
    }

    pub fn start(&mut self, entry: NodeIndex) {
        self.graph.reset();
        self.entry = entry;
        self.skipping = false;
        self.state = if self.graph.is_empty() {
            CursorState::Terminated
        } else {
            CursorState::Running(entry)
        };
        debug!(cursor = %self.id, list = %self.list, entry, "cursor started");
    }

    /// Restarts from the first node in skip mode, whatever index the cursor
    /// was started at. Outcomes cached by the run being skipped are kept so
    /// branches replay the same exits.
    pub fn begin_skip(&mut self) -> bool {
        if !self.is_active() {
            return false;
        }
        self.skipping = true;
        self.entry = 0;
        self.graph.clear_running();
        self.state = CursorState::Running(0);
        debug!(cursor = %self.id, list = %self.list, "skipping");
        true
    }

    pub fn kill(&mut self) {
        if !self.is_terminated() {
            debug!(cursor = %self.id, list = %self.list, "cursor killed");
        }
        self.state = CursorState::Terminated;
    }

    /// Re-seeds position and skip mode, as saved by a snapshot.
    pub(crate) fn seed(&mut self, entry: NodeIndex, next: Option<NodeIndex>, skipping: bool) {
        self.entry = entry;
        self.skipping = skipping;
        self.state = match next {
            Some(index) => CursorState::Running(index),
            None => CursorState::Terminated,
        };
    }

    /// Steps nodes until the cursor suspends, ends or uses up `budget` steps.
    /// `gate_open` answers for the gate the cursor waits on when called; a gate
    /// reached during this call is first checked on the next one.
    pub(crate) fn advance(&mut self, env: &mut Env<'_>, gate_open: bool, budget: usize) -> usize {
        let mut gate_open = gate_open;
        let mut steps = 0;
        loop {
            let index = match &self.state {
                CursorState::Idle | CursorState::Terminated => return steps,
                CursorState::Running(index) => *index,
                CursorState::Suspended { index, wake } => {
                    let ready = match wake {
                        Wake::At(time) => env.now >= *time,
                        Wake::Gate(_) => std::mem::take(&mut gate_open),
                    };
                    if !ready {
                        return steps;
                    }
                    *index
                }
            };

            if steps >= budget {
                warn!(cursor = %self.id, list = %self.list, index, budget, "step budget used up, resuming next tick");
                return steps;
            }
            steps += 1;

            match self.graph.first_enabled_from(index) {
                Some(index) => self.step(index, env),
                None => self.finish(Resolution::terminal(), env),
            }
        }
    }

    fn step(&mut self, index: NodeIndex, env: &mut Env<'_>) {
        let len = self.graph.len();
        let Some(node) = self.graph.node_mut(index) else {
            self.finish(Resolution::terminal(), env);
            return;
        };

        let resumed = node.running;
        if !resumed {
            env.presenter.node_started(&Visit {
                cursor: self.id,
                list: self.list.clone(),
                index,
                label: node.label.clone(),
                skipping: self.skipping,
            });
        }
        node.running = true;

        let shape = node.action.shape();
        let mut ctx = ActionContext::new(
            self.id,
            &self.list,
            index,
            env.now,
            resumed,
            self.skipping,
            &mut *env.store,
            &mut *env.presenter,
            &mut *env.syscall,
        );

        let exit = if self.skipping {
            match node.last_outcome {
                Some(cached) if shape.is_branch() => {
                    trace!(cursor = %self.id, index, exit = cached, "replaying cached outcome");
                    Some(cached)
                }
                _ => branch::select_exit(shape, node.action.skip(&mut ctx)),
            }
        } else {
            match node.action.run(&mut ctx) {
                Progress::Done(outcome) => branch::select_exit(shape, outcome),
                Progress::Wait(delay) => {
                    self.state = CursorState::Suspended {
                        index,
                        wake: Wake::At(env.now + delay.max(0.0)),
                    };
                    return;
                }
                Progress::Until(gate) => {
                    self.state = CursorState::Suspended {
                        index,
                        wake: Wake::Gate(gate),
                    };
                    return;
                }
            }
        };

        node.running = false;
        let resolution = match exit {
            Some(exit) => {
                node.last_outcome = Some(exit);
                branch::resolve(&node.exits, exit, index, len)
            }
            None => {
                debug!(cursor = %self.id, list = %self.list, index, "no exit selected, stopping");
                Resolution::terminal()
            }
        };

        trace!(cursor = %self.id, index, next = ?resolution.next, "node finished");
        match resolution.next {
            Some(next) => self.state = CursorState::Running(next),
            None => self.finish(resolution, env),
        }
    }

    fn finish(&mut self, resolution: Resolution, env: &mut Env<'_>) {
        self.state = CursorState::Terminated;
        if let Some(list) = resolution.spawn {
            debug!(cursor = %self.id, list = %self.list, next_list = %list, "ending into another list");
            env.syscall.run_list(Invocation::new(list));
        }
        debug!(cursor = %self.id, list = %self.list, "cursor finished");
    }
}
