pub mod builder;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::runtime::asset::{ListMode, ListRef, ParameterSpec};

/// Authored action list, as written in YAML. Nodes are addressed by id and
/// compiled to an index-addressed `ActionListAsset`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActionListDef {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub mode: ListMode,
    #[serde(default = "default_true")]
    pub skippable: bool,
    #[serde(default)]
    pub parameters: Vec<ParameterSpec>,
    /// Initial variables a driver seeds the store with before running the list.
    #[serde(default)]
    pub variables: HashMap<String, Value>,
    pub actions: Vec<ActionDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActionDef {
    pub id: String,
    pub kind: String,
    #[serde(default)]
    pub params: HashMap<String, Value>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// One entry per exit, in exit order. Missing entries continue.
    #[serde(default)]
    pub exits: Vec<ExitDef>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExitAction {
    #[default]
    Continue,
    Stop,
    Jump,
    Run,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ExitDef {
    #[serde(default)]
    pub action: ExitAction,
    /// Jump target by action id.
    #[serde(default)]
    pub target: Option<String>,
    /// Jump target by raw index, checked only when the exit is taken.
    #[serde(default)]
    pub index: Option<i64>,
    /// List started by a `run` exit.
    #[serde(default)]
    pub list: Option<ListRef>,
}

impl ExitDef {
    pub fn stop() -> Self {
        Self { action: ExitAction::Stop, ..Self::default() }
    }

    pub fn next() -> Self {
        Self::default()
    }

    pub fn jump(target: &str) -> Self {
        Self {
            action: ExitAction::Jump,
            target: Some(target.to_string()),
            ..Self::default()
        }
    }

    pub fn jump_index(index: i64) -> Self {
        Self {
            action: ExitAction::Jump,
            index: Some(index),
            ..Self::default()
        }
    }

    pub fn run(list: ListRef) -> Self {
        Self {
            action: ExitAction::Run,
            list: Some(list),
            ..Self::default()
        }
    }
}

fn default_true() -> bool {
    true
}
