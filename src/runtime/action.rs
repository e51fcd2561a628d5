use anyhow::Result;
use serde_json::Value;
use std::fmt::Debug;

use crate::runtime::context::ActionContext;
use crate::runtime::cursor::CursorId;
use crate::runtime::asset::ListRef;

/// How many exits a node declares, which decides how its outcome is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Single,
    Binary,
    Multi(usize),
}

impl Shape {
    pub fn exit_count(self) -> usize {
        match self {
            Shape::Single => 1,
            Shape::Binary => 2,
            Shape::Multi(n) => n,
        }
    }

    /// Binary and multi-way nodes replay their cached outcome while skipping.
    pub fn is_branch(self) -> bool {
        !matches!(self, Shape::Single)
    }
}

/// Exit selector produced by a finished node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Complete,
    Check(bool),
    Select(i64),
    Failed,
}

/// Condition a suspended node waits on before it is polled again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gate {
    /// Open once the cursor is no longer running.
    Cursor(CursorId),
    /// Open once no cursor runs the list.
    List(ListRef),
}

/// Result of running a node once.
#[derive(Debug, Clone, PartialEq)]
pub enum Progress {
    Done(Outcome),
    /// Not finished; poll again after this many seconds.
    Wait(f64),
    /// Not finished; poll again once the gate opens.
    Until(Gate),
}

impl Progress {
    pub fn complete() -> Self {
        Progress::Done(Outcome::Complete)
    }
}

/// Runtime node interface.
pub trait Action: Send + Debug {
    fn shape(&self) -> Shape {
        Shape::Single
    }

    fn run(&mut self, ctx: &mut ActionContext<'_>) -> Progress;

    /// Jumps straight to the node's end state. The default runs the node once
    /// and treats an unfinished node as finished.
    fn skip(&mut self, ctx: &mut ActionContext<'_>) -> Outcome {
        match self.run(ctx) {
            Progress::Done(outcome) => outcome,
            Progress::Wait(_) | Progress::Until(_) => Outcome::Complete,
        }
    }

    /// Drops per-run state before the owning list starts again.
    fn reset(&mut self) {}

    /// Called on a node rebuilt from a snapshot that had already been entered
    /// (finished or still running) when the snapshot was taken.
    fn restored(&mut self) {}
}

/// Node factory, registered under the kind name used in list files.
pub trait ActionDefinition: Send + Sync {
    fn name(&self) -> &str;

    fn validate(&self, params: &Value) -> Result<()> {
        self.prepare(params).map(|_| ())
    }

    fn prepare(&self, params: &Value) -> Result<Box<dyn Action>>;
}
