use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tracing::warn;

use crate::runtime::asset::{ListRef, NodeIndex, ParameterSpec};

pub type Bindings = HashMap<String, Value>;

/// Request to run an action list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invocation {
    pub list: ListRef,
    #[serde(default)]
    pub bindings: Bindings,
    #[serde(default)]
    pub entry: NodeIndex,
    /// Conversation to hand control back to once the invoked list ends.
    #[serde(default)]
    pub resume_conversation: Option<String>,
}

impl Invocation {
    pub fn new(list: ListRef) -> Self {
        Self {
            list,
            bindings: Bindings::new(),
            entry: 0,
            resume_conversation: None,
        }
    }

    pub fn bind(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.bindings.insert(name.into(), value.into());
        self
    }

    pub fn with_bindings(mut self, bindings: Bindings) -> Self {
        self.bindings = bindings;
        self
    }

    pub fn at(mut self, entry: NodeIndex) -> Self {
        self.entry = entry;
        self
    }

    pub fn resume_conversation(mut self, conversation: impl Into<String>) -> Self {
        self.resume_conversation = Some(conversation.into());
        self
    }
}

/// Merges declared defaults with caller bindings. Undeclared bindings are kept
/// so scene lists without a parameter table can still be parameterised.
pub fn resolve_bindings(parameters: &[ParameterSpec], bindings: &Bindings) -> Bindings {
    let mut resolved: Bindings = parameters
        .iter()
        .map(|p| (p.name.clone(), p.default.clone()))
        .collect();
    for (name, value) in bindings {
        resolved.insert(name.clone(), value.clone());
    }
    resolved
}

/// Returns a copy of `params` with `${name}` placeholders replaced.
///
/// A string that is exactly one placeholder takes the bound value with its
/// type; placeholders inside longer strings are interpolated as text.
pub fn substitute(params: &Value, bindings: &Bindings) -> Value {
    match params {
        Value::String(s) => substitute_str(s, bindings),
        Value::Array(items) => Value::Array(items.iter().map(|v| substitute(v, bindings)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), substitute(v, bindings)))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn substitute_str(s: &str, bindings: &Bindings) -> Value {
    if s.starts_with("${") && s.ends_with('}') && s.matches("${").count() == 1 {
        let name = &s[2..s.len() - 1];
        return match bindings.get(name) {
            Some(value) => value.clone(),
            None => {
                warn!(parameter = name, "unbound parameter left in place");
                Value::String(s.to_string())
            }
        };
    }

    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        let Some(len) = rest[start..].find('}') else {
            break;
        };
        let name = &rest[start + 2..start + len];
        out.push_str(&rest[..start]);
        match bindings.get(name) {
            Some(Value::String(text)) => out.push_str(text),
            Some(value) => out.push_str(&value.to_string()),
            None => out.push_str(&rest[start..start + len + 1]),
        }
        rest = &rest[start + len + 1..];
    }
    out.push_str(rest);
    Value::String(out)
}
