//! Streaming chat scenario tests
//!
//! Drives the SSE endpoint with scripted model replies and checks the event
//! contract: ordering, accumulation, finalize semantics, and failure
//! behavior.

use std::sync::Arc;

use mused::gemini::{Fragment, MockModel, ModelError};
use serde_json::json;

use crate::harness::{collect_stream, TestServer};

fn image(data: &[u8]) -> Fragment {
    Fragment::Image {
        data: data.to_vec(),
        mime_type: "image/png".to_string(),
    }
}

#[tokio::test]
async fn test_hello_round_trip() {
    let model = MockModel::new().with_fragments(vec![
        Fragment::Text("Hi ".to_string()),
        Fragment::Text("there!".to_string()),
    ]);
    let server = TestServer::start_with_model(Arc::new(model))
        .await
        .expect("Failed to start server");

    let id = server.create_conversation().await.unwrap();
    let log = collect_stream(
        &server,
        &format!("/api/conversations/{}/chat/stream", id),
        &json!({"content": "Hello"}),
    )
    .await
    .expect("stream failed");

    assert!(log.done, "stream must end with the [DONE] sentinel");

    // user_message, assistant_message_start, text chunks, complete - in order
    assert_eq!(log.events[0]["type"], "user_message");
    assert_eq!(log.events[0]["data"]["content"], "Hello");
    assert_eq!(log.events[1]["type"], "assistant_message_start");
    assert_eq!(log.events[1]["data"]["content"], "");

    let chunks = log.data_of("text_chunk");
    assert_eq!(chunks.len(), 2);
    let concatenated: String = chunks
        .iter()
        .map(|c| c["content"].as_str().unwrap())
        .collect();

    let complete = log.single("complete");
    assert_eq!(complete["data"]["content"], concatenated.as_str());
    assert_eq!(complete["data"]["content"], "Hi there!");
    assert!(
        complete["data"].get("images").is_none(),
        "text-only reply must omit the images field"
    );

    // conversation now holds exactly user + assistant
    let messages = server.messages(&id).await.unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["role"], "user");
    assert_eq!(messages[1]["role"], "assistant");
    assert_eq!(messages[1]["content"], "Hi there!");
}

#[tokio::test]
async fn test_text_chunks_carry_running_accumulator() {
    let model = MockModel::new().with_fragments(vec![
        Fragment::Text("a".to_string()),
        Fragment::Text("b".to_string()),
        Fragment::Text("c".to_string()),
    ]);
    let server = TestServer::start_with_model(Arc::new(model)).await.unwrap();

    let id = server.create_conversation().await.unwrap();
    let log = collect_stream(
        &server,
        &format!("/api/conversations/{}/chat/stream", id),
        &json!({"content": "go"}),
    )
    .await
    .unwrap();

    let chunks = log.data_of("text_chunk");
    assert_eq!(chunks[0]["fullText"], "a");
    assert_eq!(chunks[1]["fullText"], "ab");
    assert_eq!(chunks[2]["fullText"], "abc");
}

#[tokio::test]
async fn test_two_images_and_no_text() {
    let model = MockModel::new().with_fragments(vec![image(b"first"), image(b"second")]);
    let server = TestServer::start_with_model(Arc::new(model)).await.unwrap();

    let id = server.create_conversation().await.unwrap();
    let log = collect_stream(
        &server,
        &format!("/api/conversations/{}/chat/stream", id),
        &json!({"content": "draw two things"}),
    )
    .await
    .unwrap();

    let chunks = log.data_of("image_chunk");
    assert_eq!(chunks.len(), 2);
    let first = chunks[0]["image"].as_str().unwrap().to_string();
    let second = chunks[1]["image"].as_str().unwrap().to_string();
    assert_eq!(chunks[1]["allImages"][0], first.as_str());
    assert_eq!(chunks[1]["allImages"][1], second.as_str());

    let complete = log.single("complete");
    assert_eq!(
        complete["data"]["content"],
        "I've generated 2 images for you:"
    );
    let images = complete["data"]["images"].as_array().unwrap();
    assert_eq!(images.len(), 2);
    assert_eq!(images[0], first.as_str());
    assert_eq!(images[1], second.as_str());

    // both references serve real bytes
    let resp = server.get(&format!("/images/{}", first)).await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.bytes().await.unwrap().as_ref(), b"first");
}

#[tokio::test]
async fn test_interleaved_text_and_images_keep_order() {
    let model = MockModel::new().with_fragments(vec![
        Fragment::Text("Here is one:".to_string()),
        image(b"img1"),
        Fragment::Text(" and another:".to_string()),
        image(b"img2"),
    ]);
    let server = TestServer::start_with_model(Arc::new(model)).await.unwrap();

    let id = server.create_conversation().await.unwrap();
    let log = collect_stream(
        &server,
        &format!("/api/conversations/{}/chat/stream", id),
        &json!({"content": "two please"}),
    )
    .await
    .unwrap();

    let kinds: Vec<&str> = log
        .events
        .iter()
        .map(|e| e["type"].as_str().unwrap())
        .collect();
    assert_eq!(
        kinds,
        vec![
            "user_message",
            "assistant_message_start",
            "text_chunk",
            "image_chunk",
            "text_chunk",
            "image_chunk",
            "complete",
        ]
    );

    let complete = log.single("complete");
    assert_eq!(complete["data"]["content"], "Here is one: and another:");
    assert_eq!(complete["data"]["images"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_failure_emits_error_and_preserves_conversation() {
    let model = MockModel::new().with_failure(ModelError::QuotaExceeded("spent".to_string()));
    let server = TestServer::start_with_model(Arc::new(model)).await.unwrap();

    let id = server.create_conversation().await.unwrap();
    let log = collect_stream(
        &server,
        &format!("/api/conversations/{}/chat/stream", id),
        &json!({"content": "Hello"}),
    )
    .await
    .unwrap();

    assert!(log.done);
    let error = log.single("error");
    assert_eq!(
        error["data"]["message"],
        "The API quota has been exhausted. Please try again later."
    );
    assert!(log.of_type("complete").is_empty());

    // the user message was appended before the invocation; no assistant
    // message joins it
    let messages = server.messages(&id).await.unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["role"], "user");
}

#[tokio::test]
async fn test_mid_stream_failure_discards_partial_text() {
    let model = MockModel::new().with_interrupted(
        vec![Fragment::Text("partial answer".to_string())],
        ModelError::Unclassified("connection reset".to_string()),
    );
    let server = TestServer::start_with_model(Arc::new(model)).await.unwrap();

    let id = server.create_conversation().await.unwrap();
    let log = collect_stream(
        &server,
        &format!("/api/conversations/{}/chat/stream", id),
        &json!({"content": "Hello"}),
    )
    .await
    .unwrap();

    // the delta was forwarded live, but nothing was persisted
    assert_eq!(log.of_type("text_chunk").len(), 1);
    assert_eq!(log.of_type("error").len(), 1);
    assert!(log.of_type("complete").is_empty());

    let messages = server.messages(&id).await.unwrap();
    assert_eq!(messages.len(), 1);
}

#[tokio::test]
async fn test_stream_to_unknown_conversation() {
    let server = TestServer::start().await.unwrap();

    let resp = server
        .post(
            "/api/conversations/no-such-id/chat/stream",
            &json!({"content": "Hello"}),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_concurrent_streams_on_distinct_conversations() {
    let model = MockModel::new()
        .with_text("reply one")
        .with_text("reply two");
    let server = Arc::new(TestServer::start_with_model(Arc::new(model)).await.unwrap());

    let a = server.create_conversation().await.unwrap();
    let b = server.create_conversation().await.unwrap();

    let path_a = format!("/api/conversations/{}/chat/stream", a);
    let path_b = format!("/api/conversations/{}/chat/stream", b);
    let body_a = json!({"content": "one"});
    let body_b = json!({"content": "two"});
    let (ra, rb) = tokio::join!(
        collect_stream(&server, &path_a, &body_a),
        collect_stream(&server, &path_b, &body_b),
    );

    assert!(ra.unwrap().done);
    assert!(rb.unwrap().done);

    assert_eq!(server.messages(&a).await.unwrap().len(), 2);
    assert_eq!(server.messages(&b).await.unwrap().len(), 2);
}
