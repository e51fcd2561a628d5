use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

pub type NodeIndex = usize;

/// Handle to an action list, resolved by the engine at invocation time.
///
/// Scene lists are resident in one engine and keep a single working graph.
/// Asset lists live in the shared library and are copied per invocation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "scope", content = "id", rename_all = "snake_case")]
pub enum ListRef {
    Scene(String),
    Asset(String),
}

impl ListRef {
    pub fn scene(id: impl Into<String>) -> Self {
        ListRef::Scene(id.into())
    }

    pub fn asset(id: impl Into<String>) -> Self {
        ListRef::Asset(id.into())
    }

    pub fn id(&self) -> &str {
        match self {
            ListRef::Scene(id) | ListRef::Asset(id) => id,
        }
    }
}

impl fmt::Display for ListRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListRef::Scene(id) => write!(f, "scene:{}", id),
            ListRef::Asset(id) => write!(f, "asset:{}", id),
        }
    }
}

/// Whether a running list holds up gameplay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListMode {
    #[default]
    Pausing,
    Background,
}

/// One outgoing edge of a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Exit {
    Stop,
    Continue,
    /// Raw target index. Validated when the exit is taken, never at load time.
    Jump(i64),
    /// End this list and start another one without waiting for it.
    Run(ListRef),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,
    #[serde(default)]
    pub default: Value,
}

/// Compiled node template. `params` may contain `${name}` placeholders that
/// are substituted when a working graph is prepared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeTemplate {
    pub label: String,
    pub kind: String,
    #[serde(default)]
    pub params: Value,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub exits: Vec<Exit>,
}

impl NodeTemplate {
    pub fn new(label: impl Into<String>, kind: impl Into<String>, params: Value) -> Self {
        Self {
            label: label.into(),
            kind: kind.into(),
            params,
            enabled: true,
            exits: Vec::new(),
        }
    }

    pub fn with_exits(mut self, exits: Vec<Exit>) -> Self {
        self.exits = exits;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// Compiled, index-addressed action list (serializable intermediate form).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionListAsset {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub mode: ListMode,
    #[serde(default = "default_true")]
    pub skippable: bool,
    #[serde(default)]
    pub parameters: Vec<ParameterSpec>,
    pub nodes: Vec<NodeTemplate>,
}

impl ActionListAsset {
    pub fn new(id: impl Into<String>, nodes: Vec<NodeTemplate>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            mode: ListMode::Pausing,
            skippable: true,
            parameters: Vec::new(),
            nodes,
        }
    }

    pub fn with_mode(mut self, mode: ListMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_skippable(mut self, skippable: bool) -> Self {
        self.skippable = skippable;
        self
    }

    pub fn with_parameter(mut self, name: impl Into<String>, default: Value) -> Self {
        self.parameters.push(ParameterSpec {
            name: name.into(),
            default,
        });
        self
    }
}

fn default_true() -> bool {
    true
}
