use anyhow::Result;
use serde_json::Value;
use std::fmt::Debug;

use crate::runtime::context::ActionContext;

pub mod builtin;

/// Plugin interface for linear effect nodes. A handler runs to completion in
/// one step; the node wrapping it stores the result in `output` when given.
pub trait FunctionHandler: Send + Sync + Debug {
    fn name(&self) -> &str;
    fn validate(&self, params: &Value) -> Result<()>;
    fn execute(&self, params: &Value, ctx: &mut ActionContext<'_>) -> Result<Value>;
}
