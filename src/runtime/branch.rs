//! Turns a node's outcome into the index the cursor moves to next.
//!
//! Inconsistent graphs never fault here: jump targets outside the node array
//! stop the list, and exits a node selects but the graph does not define
//! behave as `Continue`.

use tracing::warn;

use crate::runtime::action::{Outcome, Shape};
use crate::runtime::asset::{Exit, ListRef, NodeIndex};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// `None` terminates the cursor.
    pub next: Option<NodeIndex>,
    /// List to start as the cursor ends.
    pub spawn: Option<ListRef>,
}

impl Resolution {
    pub fn terminal() -> Self {
        Self { next: None, spawn: None }
    }

    fn to(next: NodeIndex) -> Self {
        Self { next: Some(next), spawn: None }
    }
}

/// Maps an outcome to an exit index, or `None` when no exit applies.
pub fn select_exit(shape: Shape, outcome: Outcome) -> Option<usize> {
    match (shape, outcome) {
        (_, Outcome::Failed) => None,
        (Shape::Single, _) => Some(0),
        (Shape::Binary, Outcome::Complete) => Some(0),
        (Shape::Binary, Outcome::Check(passed)) => Some(if passed { 0 } else { 1 }),
        (Shape::Binary, Outcome::Select(i)) => usize::try_from(i).ok().filter(|&i| i < 2),
        (Shape::Multi(n), Outcome::Select(i)) => usize::try_from(i).ok().filter(|&i| i < n),
        (Shape::Multi(n), Outcome::Check(passed)) => {
            let i = if passed { 0 } else { 1 };
            (i < n).then_some(i)
        }
        (Shape::Multi(n), Outcome::Complete) => (n > 0).then_some(0),
    }
}

/// Follows exit `exit` of the node at `current` in a graph of `len` nodes.
pub fn resolve(exits: &[Exit], exit: usize, current: NodeIndex, len: usize) -> Resolution {
    match exits.get(exit).unwrap_or(&Exit::Continue) {
        Exit::Stop => Resolution::terminal(),
        Exit::Continue => {
            let next = current + 1;
            if next < len { Resolution::to(next) } else { Resolution::terminal() }
        }
        Exit::Jump(target) => match usize::try_from(*target) {
            Ok(target) if target < len => Resolution::to(target),
            _ => {
                warn!(node = current, exit, target, len, "jump target outside the list, stopping");
                Resolution::terminal()
            }
        },
        Exit::Run(list) => Resolution {
            next: None,
            spawn: Some(list.clone()),
        },
    }
}
