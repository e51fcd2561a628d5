use anyhow::Result;
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

use crate::actions::FunctionHandler;
use crate::runtime::action::{Action, ActionDefinition, Progress};
use crate::runtime::context::ActionContext;

/// Wraps a `FunctionHandler` as a single-exit node.
#[derive(Debug)]
pub struct FunctionNode {
    handler: Arc<dyn FunctionHandler>,
    params: Value,
    output: Option<String>,
}

impl FunctionNode {
    // Whole-string `${var}` params read the variable store at run time.
    fn resolve_params(&self, ctx: &ActionContext<'_>) -> Value {
        let mut resolved = self.params.clone();
        if let Some(obj) = resolved.as_object_mut() {
            for (_, v) in obj.iter_mut() {
                if let Some(s) = v.as_str() {
                    if s.starts_with("${") && s.ends_with('}') {
                        let var_name = &s[2..s.len() - 1];
                        if let Some(val) = ctx.get_var(var_name) {
                            *v = val;
                        }
                    }
                }
            }
        }
        resolved
    }
}

impl Action for FunctionNode {
    fn run(&mut self, ctx: &mut ActionContext<'_>) -> Progress {
        let params = self.resolve_params(ctx);
        match self.handler.execute(&params, ctx) {
            Ok(result) => {
                if let Some(out_key) = &self.output {
                    ctx.set_var(out_key, result);
                }
            }
            Err(e) => {
                warn!(
                    cursor = %ctx.cursor_id(),
                    list = %ctx.list(),
                    index = ctx.index(),
                    handler = self.handler.name(),
                    error = %e,
                    "function failed, continuing"
                );
            }
        }
        Progress::complete()
    }
}

pub struct FunctionNodeDefinition {
    pub handler: Arc<dyn FunctionHandler>,
}

impl ActionDefinition for FunctionNodeDefinition {
    fn name(&self) -> &str {
        self.handler.name()
    }

    fn validate(&self, params: &Value) -> Result<()> {
        self.handler.validate(params)
    }

    fn prepare(&self, params: &Value) -> Result<Box<dyn Action>> {
        self.handler.validate(params)?;
        let output = params.get("output").and_then(|v| v.as_str()).map(|s| s.to_string());

        Ok(Box::new(FunctionNode {
            handler: self.handler.clone(),
            params: params.clone(),
            output,
        }))
    }
}
