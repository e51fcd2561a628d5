use serde::{Deserialize, Serialize};

use crate::runtime::asset::{ListRef, NodeIndex};
use crate::runtime::cursor::CursorId;
use crate::runtime::graph::NodeState;
use crate::runtime::invocation::Bindings;

/// Everything needed to rebuild a running cursor after a save/load.
///
/// Node instances are rebuilt from the list template, so only the per-node
/// runtime fields are carried.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CursorSnapshot {
    pub id: CursorId,
    pub list: ListRef,
    #[serde(default)]
    pub bindings: Bindings,
    #[serde(default)]
    pub entry_index: NodeIndex,
    pub next_index: Option<NodeIndex>,
    #[serde(default)]
    pub is_skipping: bool,
    #[serde(default)]
    pub resume_conversation: Option<String>,
    pub nodes: Vec<NodeState>,
}
