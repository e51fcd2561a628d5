use anyhow::Result;
use serde_json::Value;
use std::collections::HashMap;

/// Variable store shared by every list running in one engine.
pub trait StateStore: Send {
    fn get_var(&self, key: &str) -> Result<Option<Value>>;
    fn set_var(&mut self, key: &str, value: Value) -> Result<()>;
    /// Used to build expression contexts; remote stores may find this expensive.
    fn all_vars(&self) -> Result<HashMap<String, Value>>;
    fn init(&mut self, vars: HashMap<String, Value>) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct InMemoryStateStore {
    vars: HashMap<String, Value>,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for InMemoryStateStore {
    fn get_var(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.vars.get(key).cloned())
    }

    fn set_var(&mut self, key: &str, value: Value) -> Result<()> {
        self.vars.insert(key.to_string(), value);
        Ok(())
    }

    fn all_vars(&self) -> Result<HashMap<String, Value>> {
        Ok(self.vars.clone())
    }

    fn init(&mut self, vars: HashMap<String, Value>) -> Result<()> {
        self.vars.extend(vars);
        Ok(())
    }
}
