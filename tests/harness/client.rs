//! SSE test client
//!
//! Posts to a chat stream endpoint and decodes the SSE frames into a log of
//! JSON events for assertions.

#![allow(dead_code)]

use anyhow::{bail, Result};
use futures_util::StreamExt;
use serde_json::Value;

use super::server::TestServer;

/// Decoded SSE stream: every event in arrival order
pub struct EventLog {
    pub events: Vec<Value>,
    /// Whether the `[DONE]` sentinel arrived
    pub done: bool,
}

impl EventLog {
    /// All events of the given type, in order
    pub fn of_type(&self, kind: &str) -> Vec<&Value> {
        self.events
            .iter()
            .filter(|e| e["type"] == kind)
            .collect()
    }

    /// The single event of the given type; panics if absent or repeated
    pub fn single(&self, kind: &str) -> &Value {
        let matching = self.of_type(kind);
        assert_eq!(
            matching.len(),
            1,
            "expected exactly one '{}' event, got {} in {:?}",
            kind,
            matching.len(),
            self.events
        );
        matching[0]
    }

    /// The data payloads of every event of the given type
    pub fn data_of(&self, kind: &str) -> Vec<&Value> {
        self.of_type(kind).into_iter().map(|e| &e["data"]).collect()
    }
}

/// POST a chat request and collect the whole SSE stream
pub async fn collect_stream(server: &TestServer, path: &str, body: &Value) -> Result<EventLog> {
    let resp = server
        .client
        .post(format!("{}{}", server.base_url(), path))
        .json(body)
        .send()
        .await?;

    if !resp.status().is_success() {
        bail!("stream request failed: {}", resp.status());
    }
    let content_type = resp
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    if !content_type.starts_with("text/event-stream") {
        bail!("unexpected content type: {}", content_type);
    }

    let mut stream = resp.bytes_stream();
    let mut buffer: Vec<u8> = Vec::new();
    let mut events = Vec::new();
    let mut done = false;

    'outer: while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        buffer.extend_from_slice(&chunk);
        while let Some(pos) = buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim_end_matches(['\r', '\n']);
            if let Some(data) = line.strip_prefix("data:") {
                let data = data.trim_start();
                if data == "[DONE]" {
                    done = true;
                    break 'outer;
                }
                if !data.is_empty() {
                    events.push(serde_json::from_str(data)?);
                }
            }
        }
    }

    Ok(EventLog { events, done })
}
