use serde_json::Value;
use std::collections::HashMap;

use crate::dsl::{ActionDef, ActionListDef, ExitDef};
use crate::runtime::asset::{ListMode, ListRef, ParameterSpec};

pub struct ActionListBuilder {
    id: String,
    name: String,
    mode: ListMode,
    skippable: bool,
    parameters: Vec<ParameterSpec>,
    variables: HashMap<String, Value>,
    pub actions: Vec<ActionDef>, // Public so tests can tweak actions directly
}

impl ActionListBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: id.to_string(),
            mode: ListMode::Pausing,
            skippable: true,
            parameters: Vec::new(),
            variables: HashMap::new(),
            actions: Vec::new(),
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn background(mut self) -> Self {
        self.mode = ListMode::Background;
        self
    }

    pub fn skippable(mut self, skippable: bool) -> Self {
        self.skippable = skippable;
        self
    }

    pub fn parameter(mut self, name: &str, default: impl Into<Value>) -> Self {
        self.parameters.push(ParameterSpec {
            name: name.to_string(),
            default: default.into(),
        });
        self
    }

    pub fn var(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.variables.insert(key.to_string(), value.into());
        self
    }

    pub fn action(self, id: &str, kind: &str) -> ActionBuilder {
        ActionBuilder {
            list_builder: self,
            def: ActionDef {
                id: id.to_string(),
                kind: kind.to_string(),
                params: HashMap::new(),
                enabled: true,
                exits: Vec::new(),
            },
        }
    }

    pub fn build(self) -> ActionListDef {
        ActionListDef {
            id: self.id,
            name: self.name,
            mode: self.mode,
            skippable: self.skippable,
            parameters: self.parameters,
            variables: self.variables,
            actions: self.actions,
        }
    }
}

pub struct ActionBuilder {
    list_builder: ActionListBuilder,
    def: ActionDef,
}

impl ActionBuilder {
    pub fn param(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.def.params.insert(key.to_string(), value.into());
        self
    }

    pub fn disabled(mut self) -> Self {
        self.def.enabled = false;
        self
    }

    pub fn exit(mut self, exit: ExitDef) -> Self {
        self.def.exits.push(exit);
        self
    }

    pub fn exit_continue(self) -> Self {
        self.exit(ExitDef::next())
    }

    pub fn exit_stop(self) -> Self {
        self.exit(ExitDef::stop())
    }

    pub fn exit_jump(self, target: &str) -> Self {
        self.exit(ExitDef::jump(target))
    }

    pub fn exit_jump_index(self, index: i64) -> Self {
        self.exit(ExitDef::jump_index(index))
    }

    pub fn exit_run(self, list: ListRef) -> Self {
        self.exit(ExitDef::run(list))
    }

    pub fn build(mut self) -> ActionListBuilder {
        self.list_builder.actions.push(self.def);
        self.list_builder
    }
}
