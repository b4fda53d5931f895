//! Test adapter: answers each request shape from a script.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::channel::oneshot;
use futures::future::{self, FutureExt};
use serde_json::Value;
use sourced_fetch::{
    Adapter, AdapterFuture, ChangeBatch, FetchError, RecordArray, Relationship, RequestKind,
    Snapshot, Store, TypeSchema,
};

enum Script {
    Respond(Result<Value, FetchError>),
    Gate(oneshot::Receiver<Result<Value, FetchError>>),
}

/// Adapter whose answers are queued per request kind.
///
/// Unscripted requests reject. A gated request stays pending until the test
/// sends its outcome through the returned sender.
pub struct ScriptedAdapter {
    scripts: Mutex<HashMap<RequestKind, VecDeque<Script>>>,
    calls: Mutex<Vec<RequestKind>>,
    batches: bool,
}

impl ScriptedAdapter {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            batches: true,
        }
    }

    /// An adapter that produces nothing at all for `find_many`.
    pub fn without_find_many() -> Self {
        Self {
            batches: false,
            ..Self::new()
        }
    }

    pub fn respond(&self, kind: RequestKind, outcome: Result<Value, FetchError>) {
        self.push(kind, Script::Respond(outcome));
    }

    pub fn gate(&self, kind: RequestKind) -> oneshot::Sender<Result<Value, FetchError>> {
        let (sender, receiver) = oneshot::channel();
        self.push(kind, Script::Gate(receiver));
        sender
    }

    pub fn calls(&self) -> Vec<RequestKind> {
        self.calls.lock().unwrap().clone()
    }

    fn push(&self, kind: RequestKind, script: Script) {
        self.scripts
            .lock()
            .unwrap()
            .entry(kind)
            .or_default()
            .push_back(script);
    }

    fn answer(&self, kind: RequestKind) -> AdapterFuture {
        self.calls.lock().unwrap().push(kind);
        let script = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&kind)
            .and_then(VecDeque::pop_front);
        match script {
            Some(Script::Respond(outcome)) => future::ready(outcome).boxed(),
            Some(Script::Gate(receiver)) => receiver
                .map(|outcome| {
                    outcome.unwrap_or_else(|_| Err(FetchError::rejected(None, "gate dropped")))
                })
                .boxed(),
            None => future::ready(Err(FetchError::rejected(
                None,
                format!("unscripted {}", kind),
            )))
            .boxed(),
        }
    }
}

impl Adapter for ScriptedAdapter {
    fn key(&self) -> &str {
        "scripted"
    }

    fn find(&self, _: &Store, _: &str, _: &str, _: Snapshot) -> AdapterFuture {
        self.answer(RequestKind::Find)
    }

    fn find_many(
        &self,
        _: &Store,
        _: &str,
        _: &[String],
        _: Vec<Snapshot>,
    ) -> Option<AdapterFuture> {
        if !self.batches {
            return None;
        }
        Some(self.answer(RequestKind::FindMany))
    }

    fn find_has_many(&self, _: &Store, _: Snapshot, _: &str, _: &Relationship) -> AdapterFuture {
        self.answer(RequestKind::FindHasMany)
    }

    fn find_belongs_to(&self, _: &Store, _: Snapshot, _: &str, _: &Relationship) -> AdapterFuture {
        self.answer(RequestKind::FindBelongsTo)
    }

    fn find_all(&self, _: &Store, _: &str, _: Option<&str>) -> AdapterFuture {
        self.answer(RequestKind::FindAll)
    }

    fn find_query(&self, _: &Store, _: &str, _: &Value, _: &RecordArray) -> AdapterFuture {
        self.answer(RequestKind::FindQuery)
    }
}

/// A scripted adapter, plus the same adapter as the finders take it.
pub fn scripted(adapter: ScriptedAdapter) -> (Arc<ScriptedAdapter>, Arc<dyn Adapter>) {
    let adapter = Arc::new(adapter);
    let shared: Arc<dyn Adapter> = adapter.clone();
    (adapter, shared)
}

/// Store with the blog schema used throughout these tests.
pub fn blog_store() -> Store {
    Store::new()
        .with_schema(
            TypeSchema::new("post")
                .has_many("comments", "comment")
                .belongs_to("author", "person"),
        )
        .with_schema(TypeSchema::new("comment").belongs_to("post", "post"))
}

pub fn post_relationship(store: &Store, key: &str) -> Relationship {
    store.schema_for("post").get(key).cloned().unwrap()
}

/// Collect every change batch the store emits.
pub fn record_changes(store: &Store) -> Arc<Mutex<Vec<ChangeBatch>>> {
    let batches = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&batches);
    store.on_change(move |batch: ChangeBatch| sink.lock().unwrap().push(batch));
    batches
}

/// Listeners run on their own threads; give them time to land.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

/// True if `pending` is still unresolved after a generous wait.
pub async fn stays_pending<F: std::future::Future>(pending: F) -> bool {
    tokio::time::timeout(Duration::from_millis(50), pending)
        .await
        .is_err()
}
