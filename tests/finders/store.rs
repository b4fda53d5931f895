use std::sync::Arc;

use serde_json::json;
use sourced_fetch::{
    Adapter, FetchError, InMemoryAdapter, RecordState, RequestKind, Store, StoreConfig,
};

use crate::support::{blog_store, scripted, stays_pending, ScriptedAdapter};

fn blog(fixtures: InMemoryAdapter) -> (Store, Arc<InMemoryAdapter>) {
    let fixtures = Arc::new(fixtures);
    let adapter: Arc<dyn Adapter> = fixtures.clone();
    (blog_store().with_adapter(adapter), fixtures)
}

#[tokio::test]
async fn find_then_follow_relationships() {
    let (store, _) = blog(
        InMemoryAdapter::new()
            .with_record(
                "post",
                "1",
                json!({
                    "title": "hello",
                    "links": {
                        "comments": "/posts/1/comments",
                        "author": "/posts/1/author"
                    }
                }),
            )
            .with_link(
                "/posts/1/comments",
                json!({"comments": [{"id": "c1", "body": "nice"}]}),
            )
            .with_link("/posts/1/author", json!({"person": {"id": "p1"}})),
    );

    let post = store.find("post", "1").await.unwrap();
    let record = post.record().unwrap();

    let comments = store.find_has_many(&record, "comments").await.unwrap();
    let author = store.find_belongs_to(&record, "author").await.unwrap();

    assert_eq!(comments[0].attribute("body"), Some(json!("nice")));
    assert_eq!(record.related_ids("comments"), vec!["c1"]);
    assert_eq!(author.map(|a| a.id().to_string()), Some("p1".to_string()));
    assert_eq!(record.related_ids("author"), vec!["p1"]);
}

#[tokio::test]
async fn find_for_missing_record_leaves_no_trace() {
    let (store, _) = blog(InMemoryAdapter::new());

    let err = store.find("post", "404").await.unwrap_err();

    assert_eq!(err, FetchError::rejected(Some(404), "post 404 not found"));
    assert!(store.peek_record("post", "404").is_none());
}

#[tokio::test]
async fn find_many_through_the_store() {
    let (store, fixtures) = blog(
        InMemoryAdapter::new()
            .with_record("post", "1", json!({}))
            .with_record("post", "2", json!({})),
    );

    let posts = store.find_many("post", &["1", "2"]).unwrap().await.unwrap();

    assert_eq!(posts.len(), 2);
    assert!(posts.iter().all(|p| p.is_loaded()));
    assert_eq!(fixtures.requests().len(), 1);
}

#[tokio::test]
async fn reload_marks_missing_record_not_found() {
    let (store, fixtures) = blog(InMemoryAdapter::new().with_record("post", "1", json!({"v": 1})));
    let post = store.find("post", "1").await.unwrap().record().unwrap();
    fixtures.remove("post", "1");

    let err = store.reload(&post).await.unwrap_err();

    assert!(matches!(err, FetchError::Adapter { status: Some(404), .. }));
    assert_eq!(post.state(), RecordState::NotFound);
    assert!(store.has_record_for_id("post", "1"));
}

#[tokio::test]
async fn destroyed_store_never_answers() {
    let (script, adapter) = scripted(ScriptedAdapter::new());
    let gate = script.gate(RequestKind::Find);
    let store = blog_store().with_adapter(adapter);

    let pending = store.find("post", "1");
    store.destroy();
    gate.send(Ok(json!({"post": {"id": "1"}}))).unwrap();

    assert!(stays_pending(pending).await);
}

#[tokio::test]
async fn json_configured_store_reads_bare_payloads() {
    let config = StoreConfig::from_json(r#"{"serializer": "json", "primary_key": "_id"}"#).unwrap();
    let (script, adapter) = scripted(ScriptedAdapter::new());
    script.respond(
        RequestKind::FindAll,
        Ok(json!([{"_id": "a"}, {"_id": "b"}])),
    );
    let store = Store::with_config(config).with_adapter(adapter);

    let widgets = store.find_all("widget").await.unwrap();

    assert_eq!(widgets.ids(), vec!["a", "b"]);
}
