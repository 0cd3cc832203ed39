mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

use todo_api_rust::store::TodoItem;

async fn create_todo(
    server: &common::TestServer,
    client: &reqwest::Client,
    key: &str,
    sub: &str,
    body: Value,
) -> Result<(StatusCode, Value)> {
    let res = client
        .post(format!("{}/todos", server.base_url))
        .header("x-api-key", key)
        .header("authorization", common::bearer(sub))
        .body(body.to_string())
        .send()
        .await?;
    let status = res.status();
    let body = res.json::<Value>().await?;
    Ok((status, body))
}

#[tokio::test]
async fn create_then_get_round_trips() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let (status, body) = create_todo(
        server,
        &client,
        "crud-key",
        "user-crud",
        json!({"title": "buy milk", "content": "two liters"}),
    )
    .await?;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);

    let created: TodoItem = serde_json::from_value(body["data"].clone())?;
    assert_eq!(created.owner_id, "user-crud");
    assert_eq!(created.title, "buy milk");
    assert_eq!(created.content, "two liters");
    assert!(!created.done);
    assert_eq!(created.created_at, created.updated_at);

    let res = client
        .get(format!("{}/todos/{}", server.base_url, created.id))
        .header("x-api-key", "crud-key")
        .header("authorization", common::bearer("user-crud"))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let body = res.json::<Value>().await?;
    let fetched: TodoItem = serde_json::from_value(body["data"].clone())?;
    assert_eq!(fetched, created);
    Ok(())
}

#[tokio::test]
async fn partial_update_changes_only_named_fields() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let (_, body) = create_todo(
        server,
        &client,
        "patch-key",
        "user-patch",
        json!({"title": "write report", "content": "quarterly"}),
    )
    .await?;
    let created: TodoItem = serde_json::from_value(body["data"].clone())?;

    let res = client
        .put(format!("{}/todos/{}", server.base_url, created.id))
        .header("x-api-key", "patch-key")
        .header("authorization", common::bearer("user-patch"))
        .body(json!({"done": true}).to_string())
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let body = res.json::<Value>().await?;
    let updated: TodoItem = serde_json::from_value(body["data"].clone())?;
    assert!(updated.done);
    assert_eq!(updated.title, "write report");
    assert_eq!(updated.content, "quarterly");
    assert_eq!(updated.created_at, created.created_at);
    assert!(updated.updated_at > created.updated_at);
    Ok(())
}

#[tokio::test]
async fn delete_is_not_repeatable() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let (_, body) = create_todo(
        server,
        &client,
        "del-key",
        "user-del",
        json!({"title": "ephemeral"}),
    )
    .await?;
    let created: TodoItem = serde_json::from_value(body["data"].clone())?;

    let url = format!("{}/todos/{}", server.base_url, created.id);
    let res = client
        .delete(&url)
        .header("x-api-key", "del-key")
        .header("authorization", common::bearer("user-del"))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.json::<Value>().await?;
    assert_eq!(body["data"]["message"], "deleted");

    let res = client
        .delete(&url)
        .header("x-api-key", "del-key")
        .header("authorization", common::bearer("user-del"))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client
        .get(&url)
        .header("x-api-key", "del-key")
        .header("authorization", common::bearer("user-del"))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn owners_cannot_see_or_mutate_each_others_items() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let (_, body) = create_todo(
        server,
        &client,
        "iso-key",
        "user-iso-a",
        json!({"title": "private to a"}),
    )
    .await?;
    let item: TodoItem = serde_json::from_value(body["data"].clone())?;
    let url = format!("{}/todos/{}", server.base_url, item.id);

    // Another authenticated owner gets NotFound, never the item
    let res = client
        .get(&url)
        .header("x-api-key", "iso-key")
        .header("authorization", common::bearer("user-iso-b"))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body = res.json::<Value>().await?;
    assert_eq!(body["code"], "NOT_FOUND");

    let res = client
        .put(&url)
        .header("x-api-key", "iso-key")
        .header("authorization", common::bearer("user-iso-b"))
        .body(json!({"done": true}).to_string())
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client
        .delete(&url)
        .header("x-api-key", "iso-key")
        .header("authorization", common::bearer("user-iso-b"))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    // The real owner still sees the item, unmutated
    let res = client
        .get(&url)
        .header("x-api-key", "iso-key")
        .header("authorization", common::bearer("user-iso-a"))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.json::<Value>().await?;
    let fetched: TodoItem = serde_json::from_value(body["data"].clone())?;
    assert_eq!(fetched, item);
    Ok(())
}

#[tokio::test]
async fn list_is_owner_scoped_and_capped() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    for i in 0..3 {
        create_todo(
            server,
            &client,
            "list-key",
            "user-list-a",
            json!({"title": format!("item {i}")}),
        )
        .await?;
    }
    create_todo(
        server,
        &client,
        "list-key",
        "user-list-b",
        json!({"title": "not yours"}),
    )
    .await?;

    let res = client
        .get(format!("{}/todos", server.base_url))
        .header("x-api-key", "list-key")
        .header("authorization", common::bearer("user-list-a"))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.json::<Value>().await?;
    let items: Vec<TodoItem> = serde_json::from_value(body["data"].clone())?;
    assert_eq!(items.len(), 3);
    assert!(items.iter().all(|t| t.owner_id == "user-list-a"));

    let res = client
        .get(format!("{}/todos?limit=2", server.base_url))
        .header("x-api-key", "list-key")
        .header("authorization", common::bearer("user-list-a"))
        .send()
        .await?;
    let body = res.json::<Value>().await?;
    assert_eq!(body["data"].as_array().map(|a| a.len()), Some(2));
    Ok(())
}

#[tokio::test]
async fn malformed_bodies_are_bad_requests() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    // Missing title
    let (status, body) = create_todo(server, &client, "misc-key", "user-misc", json!({})).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    // Blank title
    let (status, _) = create_todo(
        server,
        &client,
        "misc-key",
        "user-misc",
        json!({"title": "   "}),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Not JSON at all
    let res = client
        .post(format!("{}/todos", server.base_url))
        .header("x-api-key", "misc-key")
        .header("authorization", common::bearer("user-misc"))
        .body("{not json")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = res.json::<Value>().await?;
    assert_eq!(body["code"], "INVALID_JSON");

    // Wrong field type on update
    let (_, body) = create_todo(
        server,
        &client,
        "misc-key",
        "user-misc",
        json!({"title": "typed"}),
    )
    .await?;
    let item: TodoItem = serde_json::from_value(body["data"].clone())?;
    let res = client
        .put(format!("{}/todos/{}", server.base_url, item.id))
        .header("x-api-key", "misc-key")
        .header("authorization", common::bearer("user-misc"))
        .body(json!({"done": "yes"}).to_string())
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    Ok(())
}
