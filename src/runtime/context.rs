use serde_json::Value;
use std::collections::HashMap;
use tracing::warn;

use crate::runtime::asset::{ListRef, NodeIndex};
use crate::runtime::cursor::CursorId;
use crate::runtime::presenter::{Effect, Presenter};
use crate::runtime::storage::StateStore;
use crate::runtime::syscall::Syscall;

/// What a node sees while it runs: its position, the clock, shared variables,
/// the presentation layer and the syscall channel.
pub struct ActionContext<'a> {
    cursor: CursorId,
    list: &'a ListRef,
    index: NodeIndex,
    now: f64,
    resumed: bool,
    skipping: bool,
    store: &'a mut dyn StateStore,
    presenter: &'a mut dyn Presenter,
    syscall: &'a mut dyn Syscall,
}

impl<'a> ActionContext<'a> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        cursor: CursorId,
        list: &'a ListRef,
        index: NodeIndex,
        now: f64,
        resumed: bool,
        skipping: bool,
        store: &'a mut dyn StateStore,
        presenter: &'a mut dyn Presenter,
        syscall: &'a mut dyn Syscall,
    ) -> Self {
        Self {
            cursor,
            list,
            index,
            now,
            resumed,
            skipping,
            store,
            presenter,
            syscall,
        }
    }

    pub fn cursor_id(&self) -> CursorId {
        self.cursor
    }

    pub fn list(&self) -> &ListRef {
        self.list
    }

    pub fn index(&self) -> NodeIndex {
        self.index
    }

    /// Engine clock in seconds.
    pub fn now(&self) -> f64 {
        self.now
    }

    /// True when the node is being polled again after reporting it was not done.
    pub fn resumed(&self) -> bool {
        self.resumed
    }

    pub fn is_skipping(&self) -> bool {
        self.skipping
    }

    pub fn get_var(&self, key: &str) -> Option<Value> {
        match self.store.get_var(key) {
            Ok(v) => v,
            Err(e) => {
                warn!(key, error = %e, "failed to read variable");
                None
            }
        }
    }

    pub fn set_var(&mut self, key: &str, value: Value) {
        if let Err(e) = self.store.set_var(key, value) {
            warn!(key, error = %e, "failed to write variable");
        }
    }

    pub fn all_vars(&self) -> HashMap<String, Value> {
        self.store.all_vars().unwrap_or_else(|e| {
            warn!(error = %e, "failed to read variables");
            HashMap::new()
        })
    }

    pub fn present(&mut self, name: &str, params: Value, skipped: bool) {
        let effect = Effect {
            cursor: self.cursor,
            list: self.list.clone(),
            name: name.to_string(),
            params,
            skipped,
        };
        self.presenter.present(&effect);
    }

    pub fn syscall(&mut self) -> &mut dyn Syscall {
        &mut *self.syscall
    }
}
