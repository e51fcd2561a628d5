use anyhow::{Result, anyhow, bail};
use serde_json::Value;

use crate::runtime::action::{Action, ActionDefinition, Gate, Outcome, Progress};
use crate::runtime::asset::ListRef;
use crate::runtime::context::ActionContext;
use crate::runtime::invocation::{Bindings, Invocation};

/// Reads a list handle: either `{scope, id}` or a `scene:<id>` / `asset:<id>`
/// string. A bare id names an asset list.
pub fn parse_list_ref(value: &Value) -> Result<ListRef> {
    match value {
        Value::String(s) => Ok(match s.split_once(':') {
            Some(("scene", id)) => ListRef::scene(id),
            Some(("asset", id)) => ListRef::asset(id),
            _ => ListRef::asset(s.as_str()),
        }),
        Value::Object(_) => Ok(serde_json::from_value(value.clone())?),
        other => bail!("expected a list reference, got {}", other),
    }
}

fn required_list(params: &Value) -> Result<ListRef> {
    let value = params.get("list").ok_or(anyhow!("Missing list"))?;
    parse_list_ref(value)
}

// --- RUN LIST NODE ---

#[derive(Debug)]
pub struct RunListNode {
    list: ListRef,
    bindings: Bindings,
    entry: usize,
    wait: bool,
    resume_conversation: Option<String>,
    spawned: bool,
    waiting: bool,
}

impl RunListNode {
    fn invocation(&self) -> Invocation {
        let mut invocation = Invocation::new(self.list.clone())
            .with_bindings(self.bindings.clone())
            .at(self.entry);
        invocation.resume_conversation = self.resume_conversation.clone();
        invocation
    }
}

pub struct RunListDefinition;

impl ActionDefinition for RunListDefinition {
    fn name(&self) -> &str {
        "run_list"
    }

    fn prepare(&self, params: &Value) -> Result<Box<dyn Action>> {
        let list = required_list(params)?;
        let bindings = match params.get("bindings") {
            None | Some(Value::Null) => Bindings::new(),
            Some(Value::Object(map)) => map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            Some(other) => bail!("bindings must be a map, got {}", other),
        };
        let entry = params.get("entry").and_then(|v| v.as_u64()).unwrap_or(0) as usize;
        let wait = params.get("wait").and_then(|v| v.as_bool()).unwrap_or(false);
        let resume_conversation = params
            .get("resume_conversation")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());

        Ok(Box::new(RunListNode {
            list,
            bindings,
            entry,
            wait,
            resume_conversation,
            spawned: false,
            waiting: false,
        }))
    }
}

impl Action for RunListNode {
    fn run(&mut self, ctx: &mut ActionContext<'_>) -> Progress {
        if ctx.resumed() {
            if self.waiting || !self.wait {
                self.waiting = false;
                return Progress::complete();
            }
            // Rebuilt from a snapshot: the cursor id is gone, wait on the list.
            self.waiting = true;
            return Progress::Until(Gate::List(self.list.clone()));
        }

        let id = ctx.syscall().run_list(self.invocation());
        self.spawned = true;
        if self.wait {
            self.waiting = true;
            Progress::Until(Gate::Cursor(id))
        } else {
            Progress::complete()
        }
    }

    fn skip(&mut self, ctx: &mut ActionContext<'_>) -> Outcome {
        self.waiting = false;
        if !self.spawned {
            ctx.syscall().run_list(self.invocation());
            self.spawned = true;
        }
        Outcome::Complete
    }

    fn reset(&mut self) {
        self.spawned = false;
        self.waiting = false;
    }

    // The list was started before the snapshot and may still be running.
    fn restored(&mut self) {
        self.spawned = true;
    }
}

// --- STOP LIST NODE ---

#[derive(Debug)]
pub struct StopListNode {
    list: ListRef,
}

pub struct StopListDefinition;

impl ActionDefinition for StopListDefinition {
    fn name(&self) -> &str {
        "stop_list"
    }

    fn prepare(&self, params: &Value) -> Result<Box<dyn Action>> {
        Ok(Box::new(StopListNode {
            list: required_list(params)?,
        }))
    }
}

impl Action for StopListNode {
    fn run(&mut self, ctx: &mut ActionContext<'_>) -> Progress {
        ctx.syscall().stop_list(self.list.clone());
        Progress::complete()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn list_refs_parse_from_strings_and_maps() {
        assert_eq!(parse_list_ref(&json!("scene:intro")).unwrap(), ListRef::scene("intro"));
        assert_eq!(parse_list_ref(&json!("outro")).unwrap(), ListRef::asset("outro"));
        assert_eq!(
            parse_list_ref(&json!({ "scope": "asset", "id": "shop" })).unwrap(),
            ListRef::asset("shop")
        );
        assert!(parse_list_ref(&json!(3)).is_err());
    }
}
