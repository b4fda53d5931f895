use serde_json::json;
use sourced_fetch::{fetch_query, FetchError, RequestKind, Store};

use crate::support::{scripted, ScriptedAdapter};

#[tokio::test]
async fn replaces_target_content_wholesale() {
    let store = Store::new();
    let (script, adapter) = scripted(ScriptedAdapter::new());
    script.respond(
        RequestKind::FindQuery,
        Ok(json!({"widgets": [{"id": "1"}, {"id": "2"}]})),
    );
    let query = json!({"color": "red"});
    let target = store.record_array_for_query("widget", query.clone());
    target.load(vec![store.reference_for("widget", "9")]);

    let loaded = fetch_query(&adapter, &store, "widget", &query, &target)
        .await
        .unwrap();

    assert!(loaded.ptr_eq(&target));
    assert_eq!(target.ids(), vec!["1", "2"]);
    assert!(!target.contains("9"));
}

#[tokio::test]
async fn malformed_payload_leaves_target_untouched() {
    let store = Store::new();
    let (script, adapter) = scripted(ScriptedAdapter::new());
    script.respond(RequestKind::FindQuery, Ok(json!("nope")));
    let query = json!({});
    let target = store.record_array_for_query("widget", query.clone());
    target.load(vec![store.reference_for("widget", "9")]);

    let err = fetch_query(&adapter, &store, "widget", &query, &target)
        .await
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "malformed findQuery response: the response from a findQuery must be an array, not a string"
    );
    assert_eq!(target.ids(), vec!["9"]);
}

#[tokio::test]
async fn query_results_also_join_the_live_collection() {
    let store = Store::new();
    let (script, adapter) = scripted(ScriptedAdapter::new());
    script.respond(RequestKind::FindQuery, Ok(json!([{"id": "4", "size": 2}])));
    let store = store.with_adapter(adapter);

    let results = store.find_query("widget", json!({"size": 2})).await.unwrap();

    assert_eq!(results.ids(), vec!["4"]);
    assert!(results.is_loaded());
    assert!(!results.is_updating());
    assert!(store.all("widget").contains("4"));
}

#[tokio::test]
async fn rejection_passes_through() {
    let store = Store::new();
    let (script, adapter) = scripted(ScriptedAdapter::new());
    script.respond(
        RequestKind::FindQuery,
        Err(FetchError::rejected(Some(400), "bad query")),
    );
    let query = json!({"bad": true});
    let target = store.record_array_for_query("widget", query.clone());

    let err = fetch_query(&adapter, &store, "widget", &query, &target)
        .await
        .unwrap_err();

    assert_eq!(err, FetchError::rejected(Some(400), "bad query"));
    assert!(!target.is_loaded());
}
