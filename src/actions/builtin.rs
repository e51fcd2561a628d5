use anyhow::{Result, anyhow};
use serde_json::Value;
use tracing::{error, info};

use crate::actions::FunctionHandler;
use crate::expr;
use crate::runtime::context::ActionContext;

#[derive(Debug)]
pub struct LogAction;

impl FunctionHandler for LogAction {
    fn name(&self) -> &str {
        "log"
    }

    fn validate(&self, _params: &Value) -> Result<()> {
        Ok(())
    }

    fn execute(&self, params: &Value, ctx: &mut ActionContext<'_>) -> Result<Value> {
        if let Some(msg) = params.get("msg").and_then(|v| v.as_str()) {
            info!(list = %ctx.list(), index = ctx.index(), "[LOG] {}", msg);
        } else {
            info!(list = %ctx.list(), index = ctx.index(), "[LOG] {:?}", params);
        }
        Ok(Value::Null)
    }
}

/// Writes variables. Accepts any mix of:
/// - `assignments: [{key, value}]`
/// - `expression: "target = rhs"` (or a bare expression whose result is returned)
/// - `value`, returned as the node's result
#[derive(Debug)]
pub struct AssignAction;

impl FunctionHandler for AssignAction {
    fn name(&self) -> &str {
        "assign"
    }

    fn validate(&self, params: &Value) -> Result<()> {
        if let Some(list) = params.get("assignments") {
            let items = list.as_array().ok_or(anyhow!("assignments must be a list"))?;
            for item in items {
                item.get("key")
                    .and_then(|k| k.as_str())
                    .ok_or(anyhow!("assignment without key: {}", item))?;
            }
        }
        if let Some(expression) = params.get("expression") {
            let expression = expression.as_str().ok_or(anyhow!("expression must be a string"))?;
            let (_, rhs) = split_assignment(expression);
            expr::compile(rhs)?;
        }
        Ok(())
    }

    fn execute(&self, params: &Value, ctx: &mut ActionContext<'_>) -> Result<Value> {
        // 1. Handle "assignments" list
        if let Some(list) = params.get("assignments").and_then(|v| v.as_array()) {
            for item in list {
                if let (Some(k), Some(v)) = (item.get("key").and_then(|s| s.as_str()), item.get("value")) {
                    ctx.set_var(k, v.clone());
                }
            }
        }

        // 2. Handle "expression"
        if let Some(expression) = params.get("expression").and_then(|v| v.as_str()) {
            let (target_var, rhs) = split_assignment(expression);

            let eval_ctx = expr::context_from(&ctx.all_vars());
            match expr::compile(rhs).and_then(|tree| Ok(tree.eval_with_context(&eval_ctx)?)) {
                Ok(result) => {
                    if let Some(jv) = expr::to_json(result) {
                        match target_var {
                            Some(var_name) => ctx.set_var(var_name, jv),
                            None if params.get("value").is_none() => return Ok(jv),
                            None => {}
                        }
                    }
                }
                Err(e) => error!(list = %ctx.list(), index = ctx.index(), "Expression evaluation failed: {} -> {}", rhs, e),
            }
        }

        // 3. Handle "value"
        Ok(params.get("value").cloned().unwrap_or(Value::Null))
    }
}

/// Splits `var = expr` into its target and right-hand side. Comparisons such
/// as `a == b` or `a <= b` are not assignments.
fn split_assignment(expression: &str) -> (Option<&str>, &str) {
    match expression.split_once('=') {
        Some((left, right)) if !right.starts_with('=') && !left.ends_with(['!', '<', '>']) => {
            (Some(left.trim()), right.trim())
        }
        _ => (None, expression.trim()),
    }
}
