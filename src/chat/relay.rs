//! Streaming relay
//!
//! Drives one model invocation to completion: consumes fragments strictly in
//! arrival order, persists generated images, forwards normalized events, and
//! finalizes exactly one assistant message. Per invocation the event order is
//! `assistant_message_start`, then any number of `text_chunk`/`image_chunk`,
//! then either `complete` or `error`.
//!
//! A failed event send means the client is gone; the relay stops, dropping
//! the fragment stream (which cancels the upstream call) without appending
//! anything to the conversation. A failed invocation likewise leaves the
//! conversation exactly as it was.

use futures_util::StreamExt;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::gemini::{Fragment, ModelClient, ModelError};
use crate::images::ArtifactStore;

use super::events::{ErrorEvent, ImageChunk, TextChunk};
use super::{ChatEvent, ConversationStore, Message, Prompt};

/// Drive one streaming invocation, emitting events on `events`
pub async fn stream_reply(
    model: &dyn ModelClient,
    conversations: &ConversationStore,
    artifacts: &ArtifactStore,
    conversation_id: &str,
    prompt: Prompt,
    events: &mpsc::Sender<ChatEvent>,
) {
    let message_id = uuid::Uuid::new_v4().to_string();

    // Announce the placeholder before any model output exists
    let placeholder = Message::assistant(message_id.clone(), String::new(), vec![]);
    if events
        .send(ChatEvent::AssistantMessageStart(placeholder))
        .await
        .is_err()
    {
        return;
    }

    let mut stream = match model.generate(prompt).await {
        Ok(stream) => stream,
        Err(e) => {
            warn!("model call failed for conversation {}: {}", conversation_id, e);
            send_error(events, &e).await;
            return;
        }
    };

    let mut full_text = String::new();
    let mut images: Vec<String> = Vec::new();

    while let Some(fragment) = stream.next().await {
        match fragment {
            Ok(Fragment::Text(delta)) => {
                full_text.push_str(&delta);
                let chunk = ChatEvent::TextChunk(TextChunk {
                    id: message_id.clone(),
                    content: delta,
                    full_text: full_text.clone(),
                });
                if events.send(chunk).await.is_err() {
                    debug!(
                        "client disconnected from conversation {}, aborting generation",
                        conversation_id
                    );
                    return;
                }
            }
            Ok(Fragment::Image { data, mime_type }) => {
                let reference = match artifacts.store(&data, &mime_type).await {
                    Ok(reference) => reference,
                    Err(e) => {
                        warn!(
                            "failed to store generated image for conversation {}: {}",
                            conversation_id, e
                        );
                        let error = ModelError::Unclassified(e.to_string());
                        send_error(events, &error).await;
                        return;
                    }
                };
                images.push(reference.clone());
                let chunk = ChatEvent::ImageChunk(ImageChunk {
                    id: message_id.clone(),
                    image: reference,
                    all_images: images.clone(),
                });
                if events.send(chunk).await.is_err() {
                    debug!(
                        "client disconnected from conversation {}, aborting generation",
                        conversation_id
                    );
                    return;
                }
            }
            Err(e) => {
                warn!("generation failed for conversation {}: {}", conversation_id, e);
                send_error(events, &e).await;
                return;
            }
        }
    }

    let message = finalize(message_id, full_text, images);
    if !conversations.append_message(conversation_id, message.clone()) {
        warn!("conversation {} deleted during generation", conversation_id);
        let _ = events
            .send(ChatEvent::Error(ErrorEvent {
                message: "Conversation not found".to_string(),
            }))
            .await;
        return;
    }
    let _ = events.send(ChatEvent::Complete(message)).await;
}

/// Non-streaming variant: waits for the model to finish, then performs the
/// same finalize step and returns the assistant message directly
pub async fn generate_reply(
    model: &dyn ModelClient,
    conversations: &ConversationStore,
    artifacts: &ArtifactStore,
    conversation_id: &str,
    prompt: Prompt,
) -> Result<Message, ModelError> {
    let mut stream = model.generate(prompt).await?;

    let mut full_text = String::new();
    let mut images: Vec<String> = Vec::new();

    while let Some(fragment) = stream.next().await {
        match fragment? {
            Fragment::Text(delta) => full_text.push_str(&delta),
            Fragment::Image { data, mime_type } => {
                let reference = artifacts.store(&data, &mime_type).await.map_err(|e| {
                    ModelError::Unclassified(format!("failed to store generated image: {}", e))
                })?;
                images.push(reference);
            }
        }
    }

    let message = finalize(uuid::Uuid::new_v4().to_string(), full_text, images);
    if !conversations.append_message(conversation_id, message.clone()) {
        return Err(ModelError::Unclassified(
            "conversation deleted during generation".to_string(),
        ));
    }
    Ok(message)
}

async fn send_error(events: &mpsc::Sender<ChatEvent>, error: &ModelError) {
    let _ = events
        .send(ChatEvent::Error(ErrorEvent {
            message: error.user_message().to_string(),
        }))
        .await;
}

/// Construct the finalized assistant message from the accumulators.
///
/// An all-image response gets a default caption; the image field is omitted
/// entirely when no images were generated.
fn finalize(id: String, mut content: String, images: Vec<String>) -> Message {
    if content.is_empty() && !images.is_empty() {
        content = default_image_caption(images.len());
    }
    Message::assistant(id, content, images)
}

fn default_image_caption(count: usize) -> String {
    if count == 1 {
        "I've generated 1 image for you:".to_string()
    } else {
        format!("I've generated {} images for you:", count)
    }
}
