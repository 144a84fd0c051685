pub mod bedrock;
pub mod googleai;

#[cfg(test)]
pub(crate) mod mock;

use crate::{
    config::{BackendKind, Config},
    error::Result,
    flows::Instruction,
};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

pub use bedrock::BedrockBackend;
pub use googleai::GoogleAiBackend;

/// Media produced by an image-generation model.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratedMedia {
    /// Reference to the media, usually a data URI. `None` when the model
    /// answered without producing anything.
    pub url: Option<String>,
    pub content_type: Option<String>,
}

/// A hosted generative model service.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Sends one instruction and asks for a JSON object shaped by
    /// `output_schema`. Returns `Ok(None)` when the model produced no
    /// structured output at all.
    async fn generate_structured(
        &self,
        model: &str,
        instruction: &Instruction,
        output_schema: &Value,
    ) -> Result<Option<Value>>;

    async fn generate_media(&self, model: &str, prompt: &str) -> Result<GeneratedMedia>;
}

pub async fn connect(config: &Config) -> Result<Arc<dyn ModelBackend>> {
    let backend: Arc<dyn ModelBackend> = match config.backend {
        BackendKind::GoogleAi => Arc::new(GoogleAiBackend::new(&config.google)?),
        BackendKind::Bedrock => Arc::new(BedrockBackend::new(&config.bedrock).await?),
    };
    log::info!("Connected model backend: {}", backend.name());
    Ok(backend)
}

/// Pulls the JSON object out of a free-text model reply, tolerating code
/// fences and surrounding prose.
pub(crate) fn extract_json_object(text: &str) -> Option<Value> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    match serde_json::from_str::<Value>(&text[start..=end]) {
        Ok(value) if value.is_object() => Some(value),
        _ => None,
    }
}
