use std::sync::Arc;

use serde_json::json;
use sourced_fetch::{
    fetch_many, fetch_one, ChangeKind, Identity, JsonSerializer, RequestKind, Serializer,
};

use crate::support::{blog_store, record_changes, scripted, settle, ScriptedAdapter};

#[tokio::test]
async fn one_fetch_notifies_observers_once() {
    let store = blog_store();
    let changes = record_changes(&store);
    let (script, adapter) = scripted(ScriptedAdapter::new());
    script.respond(
        RequestKind::FindMany,
        Ok(json!({"posts": [{"id": "1"}, {"id": "2"}, {"id": "3"}]})),
    );
    let ids: Vec<String> = ["1", "2", "3"].iter().map(|id| id.to_string()).collect();

    fetch_many(&adapter, &store, "post", &ids, &[])
        .unwrap()
        .await
        .unwrap();
    settle().await;

    let batches = changes.lock().unwrap();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].changes.len(), 3);
    assert!(batches[0]
        .changes
        .iter()
        .all(|change| change.kind == ChangeKind::Created));
}

#[tokio::test]
async fn sideloaded_records_share_the_batch() {
    let store = blog_store();
    let changes = record_changes(&store);
    let (script, adapter) = scripted(ScriptedAdapter::new());
    script.respond(
        RequestKind::Find,
        Ok(json!({
            "post": {"id": "1", "comments": ["c1", "c2"]},
            "comments": [{"id": "c1"}, {"id": "c2"}],
            "meta": {"total": 1}
        })),
    );
    let record = store.record_for_id("post", "1");

    let post = fetch_one(&adapter, &store, "post", "1", &record)
        .await
        .unwrap();
    settle().await;

    assert_eq!(record.related_ids("comments"), vec!["c1", "c2"]);
    assert!(store.has_record_for_id("comment", "c2"));
    assert_eq!(store.metadata_for("post").meta["total"], json!(1));
    assert_eq!(post.id(), "1");

    let batches = changes.lock().unwrap();
    assert_eq!(batches.len(), 1);
    let identities: Vec<&Identity> = batches[0].changes.iter().map(|c| &c.identity).collect();
    assert!(identities.contains(&&Identity::new("comment", "c1")));
    assert!(identities.contains(&&Identity::new("post", "1")));
}

#[tokio::test]
async fn serializer_is_resolved_per_adapter_and_type() {
    let json_for_widgets: Arc<dyn Serializer> = Arc::new(JsonSerializer::new("_id"));
    let store = blog_store().with_serializer(Some("scripted"), Some("widget"), json_for_widgets);
    let (script, adapter) = scripted(ScriptedAdapter::new());
    script.respond(RequestKind::Find, Ok(json!({"_id": "7", "name": "bare"})));
    script.respond(RequestKind::Find, Ok(json!({"post": {"id": "1"}})));

    let widget = fetch_one(&adapter, &store, "widget", "7", &store.record_for_id("widget", "7"))
        .await
        .unwrap();
    let post = fetch_one(&adapter, &store, "post", "1", &store.record_for_id("post", "1"))
        .await
        .unwrap();

    assert_eq!(widget.attribute("name"), Some(json!("bare")));
    assert!(widget.attribute("_id").is_none());
    assert!(post.is_loaded());
}
