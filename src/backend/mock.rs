use crate::{
    backend::{GeneratedMedia, ModelBackend},
    error::{GenFillError, Result},
    flows::Instruction,
};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

#[derive(Debug, Clone)]
pub(crate) enum RecordedCall {
    Structured {
        model: String,
        instruction: Instruction,
    },
    Media {
        model: String,
        prompt: String,
    },
}

#[derive(Debug, Clone)]
enum Reply {
    Structured(Option<Value>),
    Media(GeneratedMedia),
    Fail(String),
}

/// Scripted backend that records every call it receives.
pub(crate) struct MockBackend {
    reply: Reply,
    gate: Option<Arc<Notify>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockBackend {
    fn with_reply(reply: Reply) -> Self {
        Self {
            reply,
            gate: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn returning(output: Value) -> Self {
        Self::with_reply(Reply::Structured(Some(output)))
    }

    pub(crate) fn without_output() -> Self {
        Self::with_reply(Reply::Structured(None))
    }

    pub(crate) fn returning_media(url: Option<&str>) -> Self {
        Self::with_reply(Reply::Media(GeneratedMedia {
            url: url.map(String::from),
            content_type: None,
        }))
    }

    pub(crate) fn failing(message: &str) -> Self {
        Self::with_reply(Reply::Fail(message.to_string()))
    }

    /// Holds every call until `gate` is notified.
    pub(crate) fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub(crate) fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn last_instruction(&self) -> Option<Instruction> {
        self.calls().into_iter().rev().find_map(|call| match call {
            RecordedCall::Structured { instruction, .. } => Some(instruction),
            RecordedCall::Media { .. } => None,
        })
    }

    async fn wait_for_gate(&self) {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
    }
}

#[async_trait]
impl ModelBackend for MockBackend {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn generate_structured(
        &self,
        model: &str,
        instruction: &Instruction,
        _output_schema: &Value,
    ) -> Result<Option<Value>> {
        self.calls.lock().unwrap().push(RecordedCall::Structured {
            model: model.to_string(),
            instruction: instruction.clone(),
        });
        self.wait_for_gate().await;

        match &self.reply {
            Reply::Structured(output) => Ok(output.clone()),
            Reply::Media(_) => Ok(None),
            Reply::Fail(message) => Err(GenFillError::HttpError(message.clone())),
        }
    }

    async fn generate_media(&self, model: &str, prompt: &str) -> Result<GeneratedMedia> {
        self.calls.lock().unwrap().push(RecordedCall::Media {
            model: model.to_string(),
            prompt: prompt.to_string(),
        });
        self.wait_for_gate().await;

        match &self.reply {
            Reply::Media(media) => Ok(media.clone()),
            Reply::Structured(_) => Ok(GeneratedMedia::default()),
            Reply::Fail(message) => Err(GenFillError::HttpError(message.clone())),
        }
    }
}
