use anyhow::{Result, anyhow, bail};
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::dsl::{ActionDef, ActionListDef, ExitAction, ExitDef};
use crate::runtime::asset::{ActionListAsset, Exit, NodeIndex, NodeTemplate};

/// Lowers an authored list to its index-addressed form.
///
/// Graph-shape problems are not rejected here: dangling jump targets become
/// `Stop` with a warning, and raw jump indices are left for the runtime to
/// check. Only structural errors (duplicate or empty ids) fail compilation.
#[derive(Debug, Default)]
pub struct Compiler {
    id_map: HashMap<String, NodeIndex>,
}

impl Compiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn compile(&mut self, def: ActionListDef) -> Result<ActionListAsset> {
        self.id_map.clear();

        // 1. Pass 1: Indexing
        for (idx, action) in def.actions.iter().enumerate() {
            if action.id.is_empty() {
                bail!("Action {} of list '{}' has an empty id", idx, def.id);
            }
            if self.id_map.insert(action.id.clone(), idx).is_some() {
                return Err(anyhow!("Duplicate action ID: {}", action.id));
            }
        }

        // 2. Pass 2: Transform
        let mut nodes = Vec::with_capacity(def.actions.len());
        for action in &def.actions {
            nodes.push(self.transform_action(&def.id, action)?);
        }

        debug!(list = %def.id, nodes = nodes.len(), "compiled action list");
        Ok(ActionListAsset {
            name: if def.name.is_empty() { def.id.clone() } else { def.name },
            id: def.id,
            mode: def.mode,
            skippable: def.skippable,
            parameters: def.parameters,
            nodes,
        })
    }

    fn transform_action(&self, list_id: &str, action: &ActionDef) -> Result<NodeTemplate> {
        if action.kind.is_empty() {
            bail!("Action '{}' of list '{}' has no kind", action.id, list_id);
        }

        let params = serde_json::to_value(&action.params)?;
        let exits = action
            .exits
            .iter()
            .map(|exit| self.transform_exit(list_id, &action.id, exit))
            .collect();

        Ok(NodeTemplate {
            label: action.id.clone(),
            kind: action.kind.clone(),
            params,
            enabled: action.enabled,
            exits,
        })
    }

    fn transform_exit(&self, list_id: &str, action_id: &str, exit: &ExitDef) -> Exit {
        match exit.action {
            ExitAction::Continue => Exit::Continue,
            ExitAction::Stop => Exit::Stop,
            ExitAction::Jump => match (&exit.target, exit.index) {
                (Some(target), _) => match self.resolve_target(target) {
                    Some(index) => Exit::Jump(index as i64),
                    None => {
                        warn!(list = list_id, action = action_id, target = %target, "jump to unknown action, stopping instead");
                        Exit::Stop
                    }
                },
                (None, Some(index)) => Exit::Jump(index),
                (None, None) => {
                    warn!(list = list_id, action = action_id, "jump without target, stopping instead");
                    Exit::Stop
                }
            },
            ExitAction::Run => match &exit.list {
                Some(list) => Exit::Run(list.clone()),
                None => {
                    warn!(list = list_id, action = action_id, "run exit without list, stopping instead");
                    Exit::Stop
                }
            },
        }
    }

    fn resolve_target(&self, target_id: &str) -> Option<NodeIndex> {
        self.id_map.get(target_id).copied()
    }
}
