//! Scripted mock model client
//!
//! Deterministic stand-in for the Gemini API: each `generate` call pops the
//! next scripted outcome. Used by the integration harness so tests exercise
//! the full relay without network access.

use std::collections::VecDeque;

use futures_util::stream;
use parking_lot::Mutex;

use crate::chat::Prompt;

use super::{Fragment, FragmentStream, ModelClient, ModelError};

enum Script {
    /// Stream these items in order
    Reply(Vec<Result<Fragment, ModelError>>),
    /// Fail before any fragment is produced
    Refuse(ModelError),
}

/// Scripted model client
#[derive(Default)]
pub struct MockModel {
    scripts: Mutex<VecDeque<Script>>,
}

impl MockModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply of one text fragment
    pub fn with_text(self, text: &str) -> Self {
        self.with_fragments(vec![Fragment::Text(text.to_string())])
    }

    /// Queue a reply streaming the given fragments
    pub fn with_fragments(self, fragments: Vec<Fragment>) -> Self {
        self.scripts
            .lock()
            .push_back(Script::Reply(fragments.into_iter().map(Ok).collect()));
        self
    }

    /// Queue a call that fails before producing anything
    pub fn with_failure(self, error: ModelError) -> Self {
        self.scripts.lock().push_back(Script::Refuse(error));
        self
    }

    /// Queue a reply that streams some fragments, then fails
    pub fn with_interrupted(self, fragments: Vec<Fragment>, error: ModelError) -> Self {
        let mut items: Vec<Result<Fragment, ModelError>> =
            fragments.into_iter().map(Ok).collect();
        items.push(Err(error));
        self.scripts.lock().push_back(Script::Reply(items));
        self
    }
}

#[async_trait::async_trait]
impl ModelClient for MockModel {
    async fn generate(&self, _prompt: Prompt) -> Result<FragmentStream, ModelError> {
        let script = self
            .scripts
            .lock()
            .pop_front()
            .ok_or_else(|| ModelError::Unclassified("no scripted response left".to_string()))?;
        match script {
            Script::Reply(items) => Ok(Box::pin(stream::iter(items))),
            Script::Refuse(error) => Err(error),
        }
    }
}
