//! Prompt assembly from conversation history
//!
//! Earlier turns are rendered into a plain-text transcript; images from the
//! recent turns are re-attached as bytes so the model can keep working with
//! them.

use tracing::{debug, warn};

use crate::images::{mime_for, ArtifactStore};

use super::Message;

/// How many trailing messages contribute image attachments
const ATTACHMENT_WINDOW: usize = 3;

/// An image attached to a prompt
#[derive(Debug, Clone)]
pub struct Attachment {
    pub data: Vec<u8>,
    pub mime_type: String,
}

/// A prompt ready to send to the model
#[derive(Debug, Clone, Default)]
pub struct Prompt {
    pub text: String,
    pub attachments: Vec<Attachment>,
}

/// Render the conversation into a single prompt text.
///
/// Every message except the last becomes a transcript line; messages that
/// carried images are annotated without including the image content itself.
/// The final message's content is appended as the current request.
pub fn render_transcript(messages: &[Message]) -> String {
    let Some((current, history)) = messages.split_last() else {
        return String::new();
    };
    if history.is_empty() {
        return current.content.clone();
    }

    let mut lines = Vec::new();
    for message in history {
        let role = message.role.display_name();
        lines.push(format!("{}: {}", role, message.content));
        if message.image.is_some() {
            lines.push(format!("{} also shared an image.", role));
        }
        let generated = message.image_refs().len();
        if generated > 0 {
            lines.push(format!("{} generated {} image(s).", role, generated));
        }
    }

    format!(
        "Previous conversation:\n{}\n\n{}",
        lines.join("\n"),
        current.content
    )
}

/// Build the model prompt for a conversation.
///
/// Attaches the current message's input image plus any input/output images
/// from the last `ATTACHMENT_WINDOW` messages, deduplicated by reference.
/// References that no longer resolve are skipped.
pub async fn build_prompt(messages: &[Message], artifacts: &ArtifactStore) -> Prompt {
    let text = render_transcript(messages);

    let mut references: Vec<&str> = Vec::new();
    if let Some((current, _)) = messages.split_last() {
        if let Some(image) = &current.image {
            references.push(image);
        }
    }
    let window_start = messages.len().saturating_sub(ATTACHMENT_WINDOW);
    for message in &messages[window_start..] {
        if let Some(image) = &message.image {
            if !references.contains(&image.as_str()) {
                references.push(image);
            }
        }
        for reference in message.image_refs() {
            if !references.contains(&reference.as_str()) {
                references.push(reference);
            }
        }
    }

    let mut attachments = Vec::new();
    for reference in references {
        match artifacts.resolve(reference).await {
            Ok(Some(data)) => attachments.push(Attachment {
                data,
                mime_type: mime_for(reference).to_string(),
            }),
            Ok(None) => debug!("skipping missing attachment {}", reference),
            Err(e) => warn!("failed to read attachment {}: {}", reference, e),
        }
    }

    Prompt { text, attachments }
}
