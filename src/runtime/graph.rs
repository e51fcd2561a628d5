use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use crate::error::{EngineError, EngineResult};
use crate::runtime::action::{Action, ActionDefinition, Shape};
use crate::runtime::asset::{ActionListAsset, Exit, NodeIndex};
use crate::runtime::invocation::{Bindings, resolve_bindings, substitute};

/// Registered node factories, keyed by kind name.
pub type ActionRegistry = HashMap<String, Box<dyn ActionDefinition>>;

/// Per-node fields an external serializer needs to restore a cursor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeState {
    pub last_outcome: Option<usize>,
    pub enabled: bool,
    pub running: bool,
}

#[derive(Debug)]
pub struct ActionNode {
    pub(crate) label: String,
    pub(crate) kind: String,
    pub(crate) action: Box<dyn Action>,
    pub(crate) exits: Vec<Exit>,
    pub(crate) enabled: bool,
    pub(crate) last_outcome: Option<usize>,
    pub(crate) running: bool,
}

impl ActionNode {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn shape(&self) -> Shape {
        self.action.shape()
    }

    pub fn exits(&self) -> &[Exit] {
        &self.exits
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Exit index chosen the last time this node finished, if it has since
    /// the list last started.
    pub fn last_outcome(&self) -> Option<usize> {
        self.last_outcome
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    fn state(&self) -> NodeState {
        NodeState {
            last_outcome: self.last_outcome,
            enabled: self.enabled,
            running: self.running,
        }
    }
}

/// Working copy of a list: live node instances plus their runtime fields.
#[derive(Debug)]
pub struct ActionGraph {
    list_id: String,
    nodes: Vec<ActionNode>,
}

impl ActionGraph {
    /// Builds fresh node instances from the template, with `bindings` applied
    /// to the copied parameters. The template itself is never touched.
    pub fn prepare(
        asset: &ActionListAsset,
        bindings: &Bindings,
        registry: &ActionRegistry,
    ) -> EngineResult<Self> {
        let resolved = resolve_bindings(&asset.parameters, bindings);

        let mut nodes = Vec::with_capacity(asset.nodes.len());
        for (index, template) in asset.nodes.iter().enumerate() {
            let def = registry
                .get(&template.kind)
                .ok_or_else(|| EngineError::UnknownAction {
                    list: asset.id.clone(),
                    index,
                    kind: template.kind.clone(),
                })?;

            let params = if resolved.is_empty() {
                template.params.clone()
            } else {
                substitute(&template.params, &resolved)
            };

            let action = def.prepare(&params).map_err(|e| EngineError::InvalidParams {
                list: asset.id.clone(),
                index,
                kind: template.kind.clone(),
                reason: format!("{:#}", e),
            })?;

            nodes.push(ActionNode {
                label: template.label.clone(),
                kind: template.kind.clone(),
                action,
                exits: template.exits.clone(),
                enabled: template.enabled,
                last_outcome: None,
                running: false,
            });
        }

        debug!(list = %asset.id, nodes = nodes.len(), "prepared working graph");
        Ok(Self {
            list_id: asset.id.clone(),
            nodes,
        })
    }

    pub fn list_id(&self) -> &str {
        &self.list_id
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, index: NodeIndex) -> Option<&ActionNode> {
        self.nodes.get(index)
    }

    pub fn nodes(&self) -> &[ActionNode] {
        &self.nodes
    }

    pub(crate) fn node_mut(&mut self, index: NodeIndex) -> Option<&mut ActionNode> {
        self.nodes.get_mut(index)
    }

    pub fn set_enabled(&mut self, index: NodeIndex, enabled: bool) -> bool {
        match self.nodes.get_mut(index) {
            Some(node) => {
                node.enabled = enabled;
                true
            }
            None => false,
        }
    }

    /// First enabled node at or after `index`.
    pub fn first_enabled_from(&self, index: NodeIndex) -> Option<NodeIndex> {
        (index..self.nodes.len()).find(|&i| self.nodes[i].enabled)
    }

    /// Clears the skip-replay trail and per-run node state.
    pub(crate) fn reset(&mut self) {
        for node in &mut self.nodes {
            node.last_outcome = None;
            node.running = false;
            node.action.reset();
        }
    }

    pub(crate) fn clear_running(&mut self) {
        for node in &mut self.nodes {
            node.running = false;
        }
    }

    pub fn states(&self) -> Vec<NodeState> {
        self.nodes.iter().map(ActionNode::state).collect()
    }

    pub(crate) fn apply_states(&mut self, states: &[NodeState]) {
        for (node, state) in self.nodes.iter_mut().zip(states) {
            node.last_outcome = state.last_outcome;
            node.enabled = state.enabled;
            node.running = state.running;
            if state.running || state.last_outcome.is_some() {
                node.action.restored();
            }
        }
    }
}
