use crate::{
    backend::{extract_json_object, GeneratedMedia, ModelBackend},
    config::BedrockConfig,
    error::{GenFillError, Result},
    flows::{Instruction, Part},
    models::DataUri,
};
use async_trait::async_trait;
use aws_sdk_bedrockruntime::{error::ProvideErrorMetadata, primitives::Blob, Client};
use serde::Deserialize;
use serde_json::{json, Value};

const DEFAULT_REGION: &str = "us-east-1";
const ANTHROPIC_VERSION: &str = "bedrock-2023-05-31";
const MAX_TOKENS: u32 = 4096;
const TITAN_IMAGE_SIZE: u32 = 1024;

#[derive(Clone)]
pub struct BedrockBackend {
    client: Client,
}

impl BedrockBackend {
    pub async fn new(config: &BedrockConfig) -> Result<Self> {
        let aws_config = if let (Some(access_key), Some(secret_key)) =
            (&config.access_key, &config.secret_key)
        {
            aws_config::from_env()
                .credentials_provider(aws_sdk_bedrockruntime::config::Credentials::new(
                    access_key,
                    secret_key,
                    None,
                    None,
                    "genfill",
                ))
                .region(aws_sdk_bedrockruntime::config::Region::new(
                    config
                        .region
                        .clone()
                        .unwrap_or_else(|| DEFAULT_REGION.to_string()),
                ))
                .load()
                .await
        } else {
            aws_config::load_from_env().await
        };

        Ok(Self::from_client(Client::new(&aws_config)))
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    async fn invoke(&self, model: &str, payload: &Value) -> Result<Value> {
        let request_json = serde_json::to_string(payload)
            .map_err(|e| GenFillError::SerializationError(e.to_string()))?;

        log::info!("Invoking model: {}", model);

        let response = self
            .client
            .invoke_model()
            .model_id(model)
            .content_type("application/json")
            .accept("application/json")
            .body(Blob::new(request_json.into_bytes()))
            .send()
            .await
            .map_err(|e| {
                if let Some(service_error) = e.as_service_error() {
                    log::error!("Service error code: {:?}", service_error.code());
                    GenFillError::AwsServiceError(format!(
                        "Bedrock service error: {} - {}",
                        service_error.code().unwrap_or("unknown"),
                        service_error.message().unwrap_or("no message")
                    ))
                } else {
                    log::error!("AWS SDK error details: {:?}", e);
                    GenFillError::AwsError(format!("AWS SDK error: {}", e))
                }
            })?;

        serde_json::from_slice(&response.body.into_inner())
            .map_err(|e| GenFillError::ResponseError(e.to_string()))
    }
}

#[async_trait]
impl ModelBackend for BedrockBackend {
    fn name(&self) -> &'static str {
        "bedrock"
    }

    async fn generate_structured(
        &self,
        model: &str,
        instruction: &Instruction,
        output_schema: &Value,
    ) -> Result<Option<Value>> {
        let payload = messages_payload(instruction, output_schema)?;
        let reply = self.invoke(model, &payload).await?;
        Ok(structured_output(&reply))
    }

    async fn generate_media(&self, model: &str, prompt: &str) -> Result<GeneratedMedia> {
        if !model.starts_with("amazon.titan-image") {
            return Err(GenFillError::RequestError(format!(
                "Unsupported image model: {}",
                model
            )));
        }
        let reply = self.invoke(model, &titan_payload(prompt)).await?;
        let titan: TitanImageResponse = serde_json::from_value(reply)
            .map_err(|e| GenFillError::ResponseError(e.to_string()))?;
        Ok(titan.into_media())
    }
}

/// Anthropic messages body. Bedrock cannot fetch remote media, so every media
/// part has to be a data URI.
fn messages_payload(instruction: &Instruction, output_schema: &Value) -> Result<Value> {
    let mut content = Vec::with_capacity(instruction.parts().len());
    for part in instruction.parts() {
        match part {
            Part::Text { text } => content.push(json!({ "type": "text", "text": text })),
            Part::Media { url } => {
                let uri = DataUri::parse(url)?;
                content.push(json!({
                    "type": "image",
                    "source": {
                        "type": "base64",
                        "media_type": uri.mime_type,
                        "data": uri.data
                    }
                }));
            }
        }
    }

    Ok(json!({
        "anthropic_version": ANTHROPIC_VERSION,
        "max_tokens": MAX_TOKENS,
        "system": format!(
            "Reply with a single JSON object that conforms to this JSON schema and nothing else: {}",
            output_schema
        ),
        "messages": [{ "role": "user", "content": content }]
    }))
}

fn structured_output(reply: &Value) -> Option<Value> {
    let text: String = reply["content"]
        .as_array()?
        .iter()
        .filter(|block| block["type"] == "text")
        .filter_map(|block| block["text"].as_str())
        .collect();
    extract_json_object(&text)
}

fn titan_payload(prompt: &str) -> Value {
    json!({
        "taskType": "TEXT_IMAGE",
        "textToImageParams": { "text": prompt },
        "imageGenerationConfig": {
            "numberOfImages": 1,
            "width": TITAN_IMAGE_SIZE,
            "height": TITAN_IMAGE_SIZE,
            "quality": "standard",
            "cfgScale": 8.0
        }
    })
}

#[derive(Deserialize)]
struct TitanImageResponse {
    #[serde(default)]
    images: Vec<String>,
}

impl TitanImageResponse {
    fn into_media(self) -> GeneratedMedia {
        match self.images.into_iter().next() {
            Some(image) => GeneratedMedia {
                url: Some(
                    DataUri {
                        mime_type: "image/png".into(),
                        data: image,
                    }
                    .to_string(),
                ),
                content_type: Some("image/png".into()),
            },
            None => GeneratedMedia::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flows::PromptTemplate;

    #[test]
    fn test_messages_payload_blocks() {
        let instruction = PromptTemplate::new()
            .line("Prompt: a lion")
            .media("data:image/png;base64,iVBORw0KGgo=")
            .line("Return the updated image as a data URI.")
            .render();
        let schema = json!({"type": "object", "required": ["updatedImageDataUri"]});
        let payload = messages_payload(&instruction, &schema).unwrap();

        let content = payload["messages"][0]["content"].as_array().unwrap();
        assert_eq!(content.len(), 3);
        assert_eq!(content[0]["text"], "Prompt: a lion");
        assert_eq!(content[1]["source"]["media_type"], "image/png");
        assert_eq!(content[1]["source"]["data"], "iVBORw0KGgo=");
        assert_eq!(payload["anthropic_version"], ANTHROPIC_VERSION);
        assert!(payload["system"]
            .as_str()
            .unwrap()
            .contains("updatedImageDataUri"));
    }

    #[test]
    fn test_messages_payload_requires_data_uri_media() {
        let instruction = PromptTemplate::new()
            .media("https://example.com/cat.png")
            .render();
        assert!(messages_payload(&instruction, &json!({})).is_err());
    }

    #[test]
    fn test_structured_output_from_reply() {
        let reply = json!({
            "content": [
                { "type": "text", "text": "```json\n{\"generatedImage\": \"data:image/png;base64,AAAA\"}\n```" }
            ],
            "stop_reason": "end_turn"
        });
        assert_eq!(
            structured_output(&reply),
            Some(json!({"generatedImage": "data:image/png;base64,AAAA"}))
        );
        assert_eq!(structured_output(&json!({"content": []})), None);
    }

    #[test]
    fn test_titan_response_to_media() {
        let response: TitanImageResponse =
            serde_json::from_value(json!({"images": ["iVBORw0KGgo="]})).unwrap();
        assert_eq!(
            response.into_media().url.as_deref(),
            Some("data:image/png;base64,iVBORw0KGgo=")
        );

        let empty: TitanImageResponse = serde_json::from_value(json!({"images": []})).unwrap();
        assert_eq!(empty.into_media(), GeneratedMedia::default());
        assert_eq!(titan_payload("a fox")["textToImageParams"]["text"], "a fox");
    }
}
