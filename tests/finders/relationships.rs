use serde_json::{json, Value};
use sourced_fetch::{fetch_belongs_to, fetch_has_many, FetchError, RequestKind};

use crate::support::{blog_store, post_relationship, scripted, ScriptedAdapter};

#[tokio::test]
async fn has_many_pushes_related_records() {
    let store = blog_store();
    let (script, adapter) = scripted(ScriptedAdapter::new());
    script.respond(
        RequestKind::FindHasMany,
        Ok(json!({"comments": [{"id": "c1", "body": "first"}, {"id": "c2", "body": "second"}]})),
    );
    let post = store.push("post", json!({"id": "1"})).unwrap();

    let comments = fetch_has_many(
        &adapter,
        &store,
        &post,
        "/posts/1/comments",
        &post_relationship(&store, "comments"),
    )
    .await
    .unwrap();

    let got: Vec<&str> = comments.iter().map(|r| r.id()).collect();
    assert_eq!(got, vec!["c1", "c2"]);
    assert_eq!(comments[1].attribute("body"), Some(json!("second")));
    assert_eq!(comments[0].type_key(), "comment");
}

#[tokio::test]
async fn has_many_rejects_non_array() {
    let store = blog_store();
    let (script, adapter) = scripted(ScriptedAdapter::new());
    script.respond(
        RequestKind::FindHasMany,
        Ok(json!({"comment": {"id": "c1"}})),
    );
    let post = store.push("post", json!({"id": "1"})).unwrap();

    let err = fetch_has_many(
        &adapter,
        &store,
        &post,
        "/posts/1/comments",
        &post_relationship(&store, "comments"),
    )
    .await
    .unwrap_err();

    assert!(matches!(
        err,
        FetchError::MalformedResponse {
            operation: RequestKind::FindHasMany,
            ..
        }
    ));
    assert!(!store.has_record_for_id("comment", "c1"));
}

#[tokio::test]
async fn belongs_to_resolves_the_related_record() {
    let store = blog_store();
    let (script, adapter) = scripted(ScriptedAdapter::new());
    script.respond(
        RequestKind::FindBelongsTo,
        Ok(json!({"person": {"id": "p1", "name": "Ann"}})),
    );
    let post = store.push("post", json!({"id": "1"})).unwrap();

    let author = fetch_belongs_to(
        &adapter,
        &store,
        &post,
        "/posts/1/author",
        &post_relationship(&store, "author"),
    )
    .await
    .unwrap()
    .unwrap();

    assert_eq!(author.id(), "p1");
    assert_eq!(author.attribute("name"), Some(json!("Ann")));
}

#[tokio::test]
async fn belongs_to_with_no_data_resolves_none() {
    for payload in [Value::Null, json!({"person": null})] {
        let store = blog_store();
        let (script, adapter) = scripted(ScriptedAdapter::new());
        script.respond(RequestKind::FindBelongsTo, Ok(payload));
        let post = store.push("post", json!({"id": "1"})).unwrap();

        let author = fetch_belongs_to(
            &adapter,
            &store,
            &post,
            "/posts/1/author",
            &post_relationship(&store, "author"),
        )
        .await
        .unwrap();

        assert!(author.is_none());
        assert!(store.all("person").is_empty());
    }
}

#[tokio::test]
async fn belongs_to_with_invalid_sideload_merges_nothing() {
    let store = blog_store();
    let (script, adapter) = scripted(ScriptedAdapter::new());
    script.respond(
        RequestKind::FindBelongsTo,
        Ok(json!({"person": {"id": "p1"}, "comments": [{"body": "no id"}]})),
    );
    let post = store.push("post", json!({"id": "1"})).unwrap();

    let err = fetch_belongs_to(
        &adapter,
        &store,
        &post,
        "/posts/1/author",
        &post_relationship(&store, "author"),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, FetchError::InvalidRecord { .. }));
    assert!(!store.has_record_for_id("person", "p1"));
}

#[tokio::test]
async fn relationship_rejections_pass_through() {
    let store = blog_store();
    let (script, adapter) = scripted(ScriptedAdapter::new());
    script.respond(
        RequestKind::FindBelongsTo,
        Err(FetchError::rejected(Some(403), "forbidden")),
    );
    let post = store.push("post", json!({"id": "1", "title": "t"})).unwrap();

    let err = fetch_belongs_to(
        &adapter,
        &store,
        &post,
        "/posts/1/author",
        &post_relationship(&store, "author"),
    )
    .await
    .unwrap_err();

    assert_eq!(err, FetchError::rejected(Some(403), "forbidden"));
    assert!(store.has_record_for_id("post", "1"));
    assert_eq!(post.attribute("title"), Some(json!("t")));
}
