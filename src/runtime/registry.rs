use indexmap::IndexMap;
use std::collections::HashMap;
use tracing::debug;

use crate::runtime::action::Gate;
use crate::runtime::asset::ListRef;
use crate::runtime::cursor::{Cursor, CursorId};
use crate::runtime::presenter::Presenter;

/// Cursors known to one engine, in the order they were started, together with
/// the conversations owed a resume once they end.
#[derive(Debug, Default)]
pub struct RunRegistry {
    cursors: IndexMap<CursorId, Cursor>,
    resumptions: HashMap<CursorId, String>,
}

impl RunRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a cursor. Registering an id that is already present is a no-op
    /// and returns false.
    pub fn register(&mut self, cursor: Cursor, resume_conversation: Option<String>) -> bool {
        let id = cursor.id();
        if self.cursors.contains_key(&id) {
            return false;
        }
        debug!(cursor = %id, list = %cursor.list(), "registered");
        if let Some(conversation) = resume_conversation {
            self.resumptions.insert(id, conversation);
        }
        self.cursors.insert(id, cursor);
        true
    }

    /// Removes a cursor. A pending conversation resume fires exactly once, on
    /// the first removal.
    pub fn unregister(&mut self, id: CursorId, presenter: &mut dyn Presenter) -> Option<Cursor> {
        let cursor = self.cursors.shift_remove(&id)?;
        if let Some(conversation) = self.resumptions.remove(&id) {
            debug!(cursor = %id, conversation = %conversation, "resuming conversation");
            presenter.resume_conversation(&conversation);
        }
        debug!(cursor = %id, list = %cursor.list(), "unregistered");
        Some(cursor)
    }

    /// Removes a cursor and drops its pending resume without firing it.
    pub fn discard(&mut self, id: CursorId) -> Option<Cursor> {
        self.resumptions.remove(&id);
        self.cursors.shift_remove(&id)
    }

    pub fn get(&self, id: CursorId) -> Option<&Cursor> {
        self.cursors.get(&id)
    }

    pub fn get_mut(&mut self, id: CursorId) -> Option<&mut Cursor> {
        self.cursors.get_mut(&id)
    }

    pub fn resumption(&self, id: CursorId) -> Option<&str> {
        self.resumptions.get(&id).map(String::as_str)
    }

    /// Registered and not yet terminated.
    pub fn is_running(&self, id: CursorId) -> bool {
        self.cursors.get(&id).is_some_and(|c| !c.is_terminated())
    }

    pub fn is_list_running(&self, list: &ListRef) -> bool {
        self.cursors
            .values()
            .any(|c| c.list() == list && !c.is_terminated())
    }

    pub fn gate_open(&self, gate: &Gate) -> bool {
        match gate {
            Gate::Cursor(id) => !self.is_running(*id),
            Gate::List(list) => !self.is_list_running(list),
        }
    }

    /// True while any active cursor runs a pausing list.
    pub fn is_gameplay_blocked(&self) -> bool {
        self.cursors.values().any(Cursor::is_blocking)
    }

    pub fn ids(&self) -> Vec<CursorId> {
        self.cursors.keys().copied().collect()
    }

    pub fn ids_for_list(&self, list: &ListRef) -> Vec<CursorId> {
        self.cursors
            .values()
            .filter(|c| c.list() == list)
            .map(Cursor::id)
            .collect()
    }

    pub fn terminated_ids(&self) -> Vec<CursorId> {
        self.cursors
            .values()
            .filter(|c| c.is_terminated())
            .map(Cursor::id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.cursors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cursors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cursor> {
        self.cursors.values()
    }

    /// Empties the registry without firing any pending resumes.
    pub fn drain_all(&mut self) -> Vec<Cursor> {
        self.resumptions.clear();
        self.cursors.drain(..).map(|(_, cursor)| cursor).collect()
    }
}
