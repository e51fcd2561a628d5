use thiserror::Error;

use crate::runtime::asset::{ListRef, NodeIndex};

/// Setup failures surfaced to whoever tried to start, invoke or restore a list.
///
/// Problems with the shape of a graph (bad jump targets, missing exits) are not
/// errors; the cursor falls back to stopping instead.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("action list not found: {0}")]
    UnknownList(ListRef),

    #[error("node {index} of list '{list}' uses unregistered action kind '{kind}'")]
    UnknownAction {
        list: String,
        index: NodeIndex,
        kind: String,
    },

    #[error("node {index} ({kind}) of list '{list}' has invalid parameters: {reason}")]
    InvalidParams {
        list: String,
        index: NodeIndex,
        kind: String,
        reason: String,
    },

    #[error("snapshot of {list} holds {found} nodes but the list has {expected}")]
    SnapshotMismatch {
        list: ListRef,
        expected: usize,
        found: usize,
    },
}

pub type EngineResult<T> = Result<T, EngineError>;
