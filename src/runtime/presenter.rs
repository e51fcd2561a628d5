use serde::Serialize;
use serde_json::Value;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info};

use crate::runtime::asset::{ListRef, NodeIndex};
use crate::runtime::cursor::CursorId;

/// Something a node asks the presentation layer to show or play.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Effect {
    pub cursor: CursorId,
    pub list: ListRef,
    pub name: String,
    pub params: Value,
    /// Set when the effect is the end state delivered during a skip.
    pub skipped: bool,
}

/// A node being entered by a cursor (not reported again when it is re-polled).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Visit {
    pub cursor: CursorId,
    pub list: ListRef,
    pub index: NodeIndex,
    pub label: String,
    pub skipping: bool,
}

/// Presentation layer seam: dialogue UI, cameras, characters, editor highlights.
pub trait Presenter: Send {
    fn present(&mut self, effect: &Effect);

    /// Called once when a list that was started from a conversation option ends.
    fn resume_conversation(&mut self, conversation: &str);

    fn node_started(&mut self, _visit: &Visit) {}
}

/// Writes every effect to the log.
#[derive(Debug, Default)]
pub struct LogPresenter;

impl Presenter for LogPresenter {
    fn present(&mut self, effect: &Effect) {
        info!(
            cursor = %effect.cursor,
            list = %effect.list,
            effect = %effect.name,
            skipped = effect.skipped,
            "[EFFECT] {}",
            effect.params
        );
    }

    fn resume_conversation(&mut self, conversation: &str) {
        info!(conversation, "resuming conversation");
    }

    fn node_started(&mut self, visit: &Visit) {
        debug!(
            cursor = %visit.cursor,
            list = %visit.list,
            index = visit.index,
            label = %visit.label,
            skipping = visit.skipping,
            "node started"
        );
    }
}

#[derive(Debug, Default, Clone)]
pub struct Journal {
    pub effects: Vec<Effect>,
    pub visits: Vec<Visit>,
    pub resumed: Vec<String>,
}

/// Keeps everything it is told in a journal that clones of it share.
#[derive(Debug, Default, Clone)]
pub struct RecordingPresenter {
    journal: Arc<Mutex<Journal>>,
}

impl RecordingPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn journal(&self) -> Journal {
        self.journal
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Labels of the nodes a cursor entered, in order.
    pub fn visited_labels(&self, cursor: CursorId) -> Vec<String> {
        self.journal()
            .visits
            .into_iter()
            .filter(|visit| visit.cursor == cursor)
            .map(|visit| visit.label)
            .collect()
    }

    pub fn clear(&self) {
        let mut journal = self.journal.lock().unwrap_or_else(PoisonError::into_inner);
        *journal = Journal::default();
    }

    fn record(&self, apply: impl FnOnce(&mut Journal)) {
        let mut journal = self.journal.lock().unwrap_or_else(PoisonError::into_inner);
        apply(&mut journal);
    }
}

impl Presenter for RecordingPresenter {
    fn present(&mut self, effect: &Effect) {
        self.record(|journal| journal.effects.push(effect.clone()));
    }

    fn resume_conversation(&mut self, conversation: &str) {
        self.record(|journal| journal.resumed.push(conversation.to_string()));
    }

    fn node_started(&mut self, visit: &Visit) {
        self.record(|journal| journal.visits.push(visit.clone()));
    }
}
