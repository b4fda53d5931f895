//! Change notifications, batched per adapter run.

use std::sync::{Mutex, PoisonError};

use event_emitter_rs::EventEmitter;
use serde::{Deserialize, Serialize};

use crate::reference::Identity;

const CHANGE_EVENT: &str = "change";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeKind {
    Created,
    Updated,
    Unloaded,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    pub identity: Identity,
    pub kind: ChangeKind,
}

/// Every change made by one adapter run (or one bare push), in order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeBatch {
    pub changes: Vec<Change>,
}

#[derive(Default)]
struct QueueState {
    depth: usize,
    pending: Vec<Change>,
}

/// Collects changes while a run is open and emits them once it closes.
pub(crate) struct ChangeQueue {
    state: Mutex<QueueState>,
    emitter: Mutex<EventEmitter>,
}

impl ChangeQueue {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            emitter: Mutex::new(EventEmitter::new()),
        }
    }

    pub fn subscribe<F>(&self, listener: F) -> String
    where
        F: Fn(ChangeBatch) + Send + Sync + 'static,
    {
        self.emitter
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .on(CHANGE_EVENT, listener)
    }

    pub fn unsubscribe(&self, listener_id: &str) -> bool {
        self.emitter
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove_listener(listener_id)
            .is_some()
    }

    /// Open a run. Changes are held until the returned scope drops.
    pub fn begin(&self) -> RunScope<'_> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .depth += 1;
        RunScope { queue: self }
    }

    pub fn record(&self, identity: Identity, kind: ChangeKind) {
        let ready = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.pending.push(Change { identity, kind });
            if state.depth == 0 {
                std::mem::take(&mut state.pending)
            } else {
                Vec::new()
            }
        };
        self.emit(ready);
    }

    fn end(&self) {
        let ready = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.depth = state.depth.saturating_sub(1);
            if state.depth == 0 {
                std::mem::take(&mut state.pending)
            } else {
                Vec::new()
            }
        };
        self.emit(ready);
    }

    fn emit(&self, changes: Vec<Change>) {
        if changes.is_empty() {
            return;
        }
        tracing::trace!(count = changes.len(), "emitting change batch");
        self.emitter
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .emit(CHANGE_EVENT, ChangeBatch { changes });
    }
}

/// Closes its run on drop, so changes are flushed on every exit path.
pub(crate) struct RunScope<'a> {
    queue: &'a ChangeQueue,
}

impl Drop for RunScope<'_> {
    fn drop(&mut self) {
        self.queue.end();
    }
}
