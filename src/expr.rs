//! Expression support for condition and assignment nodes, backed by `evalexpr`.
//!
//! Variables are plain identifiers; `${name}` is accepted too and stripped
//! before parsing.

use anyhow::Result;
use evalexpr::{
    build_operator_tree, ContextWithMutableVariables, DefaultNumericTypes, HashMapContext,
    Node as EvalNode,
};
use serde_json::{Value, json};
use std::collections::HashMap;

pub type Expression = EvalNode<DefaultNumericTypes>;

pub fn compile(source: &str) -> Result<Expression> {
    Ok(build_operator_tree::<DefaultNumericTypes>(&strip_placeholders(source))?)
}

/// Rewrites `${name}` to `name`. Anything else, braces in string literals
/// included, is left as written.
fn strip_placeholders(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut rest = source;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let tail = &rest[start + 2..];
        match tail.find('}') {
            Some(end) if is_identifier(&tail[..end]) => {
                out.push_str(&tail[..end]);
                rest = &tail[end + 1..];
            }
            _ => {
                out.push_str("${");
                rest = tail;
            }
        }
    }
    out.push_str(rest);
    out
}

fn is_identifier(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '.')
}

/// Builds an evaluation context from store variables. Values with no
/// expression counterpart (arrays, objects, null) are left out.
pub fn context_from(vars: &HashMap<String, Value>) -> HashMapContext<DefaultNumericTypes> {
    let mut eval_ctx = HashMapContext::<DefaultNumericTypes>::new();
    for (k, v) in vars {
        if let Some(ev) = to_eval(v) {
            let _ = eval_ctx.set_value(k.clone(), ev);
        }
    }
    eval_ctx
}

pub fn to_eval(value: &Value) -> Option<evalexpr::Value<DefaultNumericTypes>> {
    match value {
        Value::String(s) => Some(evalexpr::Value::String(s.clone())),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(evalexpr::Value::Int(i))
            } else {
                n.as_f64().map(evalexpr::Value::Float)
            }
        }
        Value::Bool(b) => Some(evalexpr::Value::Boolean(*b)),
        _ => None,
    }
}

pub fn to_json(value: evalexpr::Value<DefaultNumericTypes>) -> Option<Value> {
    match value {
        evalexpr::Value::String(s) => Some(Value::String(s)),
        evalexpr::Value::Int(i) => Some(json!(i)),
        evalexpr::Value::Float(f) => Some(json!(f)),
        evalexpr::Value::Boolean(b) => Some(Value::Bool(b)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholders_are_plain_variables() {
        let expr = compile("${gold} >= 10 && has_key").unwrap();
        let vars = HashMap::from([
            ("gold".to_string(), json!(12)),
            ("has_key".to_string(), json!(true)),
        ]);
        assert!(expr.eval_boolean_with_context(&context_from(&vars)).unwrap());
    }

    #[test]
    fn braces_in_string_literals_survive() {
        assert_eq!(strip_placeholders(r#"${name} == "a}""#), r#"name == "a}""#);
        assert_eq!(strip_placeholders("${} + ${a b}"), "${} + ${a b}");

        let expr = compile(r#"${name} == "a}""#).unwrap();
        let vars = HashMap::from([("name".to_string(), json!("a}"))]);
        assert!(expr.eval_boolean_with_context(&context_from(&vars)).unwrap());
    }

    #[test]
    fn missing_variables_fail_evaluation() {
        let expr = compile("unknown > 1").unwrap();
        assert!(expr.eval_boolean_with_context(&context_from(&HashMap::new())).is_err());
    }
}
