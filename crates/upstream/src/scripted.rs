use std::collections::VecDeque;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use parking_lot::Mutex;

use crate::gemini::build_generate_body;
use crate::{ContentGenerator, GenerateRequest};

#[derive(Debug, Clone)]
enum ScriptedReply {
    Text(String),
    Failure(String),
}

/// In-process upstream that answers from a queue and records every call.
///
/// With echo enabled an empty queue answers with the JSON body the Gemini
/// client would have sent, which is what the CLI's dry-run mode prints.
#[derive(Debug, Clone, Default)]
pub struct ScriptedGenerator {
    replies: Arc<Mutex<VecDeque<ScriptedReply>>>,
    calls: Arc<Mutex<Vec<GenerateRequest>>>,
    echo: bool,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn echo() -> Self {
        Self {
            echo: true,
            ..Self::default()
        }
    }

    pub fn with_reply(self, text: impl Into<String>) -> Self {
        self.push_reply(text);
        self
    }

    pub fn with_failure(self, message: impl Into<String>) -> Self {
        self.push_failure(message);
        self
    }

    pub fn push_reply(&self, text: impl Into<String>) {
        self.replies
            .lock()
            .push_back(ScriptedReply::Text(text.into()));
    }

    pub fn push_failure(&self, message: impl Into<String>) {
        self.replies
            .lock()
            .push_back(ScriptedReply::Failure(message.into()));
    }

    pub fn calls(&self) -> Vec<GenerateRequest> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

impl ContentGenerator for ScriptedGenerator {
    async fn generate(&self, request: &GenerateRequest) -> Result<String> {
        self.calls.lock().push(request.clone());

        let next = self.replies.lock().pop_front();
        match next {
            Some(ScriptedReply::Text(text)) => Ok(text),
            Some(ScriptedReply::Failure(message)) => Err(anyhow!(message)),
            None if self.echo => Ok(build_generate_body(request).to_string()),
            None => Err(anyhow!("scripted generator has no reply queued")),
        }
    }
}
