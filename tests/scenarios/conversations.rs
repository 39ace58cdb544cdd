//! Conversation lifecycle scenario tests

use crate::harness::TestServer;

#[tokio::test]
async fn test_create_and_fetch() {
    let server = TestServer::start().await.expect("Failed to start server");

    let id = server.create_conversation().await.expect("create failed");

    let resp = server
        .get(&format!("/api/conversations/{}", id))
        .await
        .expect("fetch failed");
    assert_eq!(resp.status(), 200);

    let body: serde_json::Value = resp.json().await.expect("Failed to parse JSON");
    assert_eq!(body["id"], id.as_str());
    assert_eq!(body["messages"].as_array().unwrap().len(), 0);
    assert!(body["createdAt"].is_string());
}

#[tokio::test]
async fn test_conversation_ids_are_unique() {
    let server = TestServer::start().await.expect("Failed to start server");

    let a = server.create_conversation().await.unwrap();
    let b = server.create_conversation().await.unwrap();
    assert_ne!(a, b);
}

#[tokio::test]
async fn test_list_conversations() {
    let server = TestServer::start().await.expect("Failed to start server");

    let a = server.create_conversation().await.unwrap();
    let b = server.create_conversation().await.unwrap();

    let resp = server.get("/api/conversations").await.unwrap();
    assert_eq!(resp.status(), 200);
    let list: Vec<serde_json::Value> = resp.json().await.unwrap();

    let ids: Vec<&str> = list.iter().filter_map(|c| c["id"].as_str()).collect();
    assert!(ids.contains(&a.as_str()));
    assert!(ids.contains(&b.as_str()));
}

#[tokio::test]
async fn test_fetch_unknown_returns_not_found() {
    let server = TestServer::start().await.expect("Failed to start server");

    let resp = server.get("/api/conversations/no-such-id").await.unwrap();
    assert_eq!(resp.status(), 404);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_delete_unknown_returns_not_found() {
    let server = TestServer::start().await.expect("Failed to start server");

    let resp = server.delete("/api/conversations/no-such-id").await.unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_delete_then_fetch_returns_not_found() {
    let server = TestServer::start().await.expect("Failed to start server");

    let id = server.create_conversation().await.unwrap();

    let resp = server
        .delete(&format!("/api/conversations/{}", id))
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["deleted"], true);

    let resp = server
        .get(&format!("/api/conversations/{}", id))
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}
