//! Google AI (Gemini / Imagen) backend over the public REST API.

use crate::{
    backend::{extract_json_object, GeneratedMedia, ModelBackend},
    config::GoogleAiConfig,
    error::{GenFillError, Result},
    flows::{Instruction, Part},
    models::DataUri,
};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_IMAGE_MIME: &str = "image/png";

pub struct GoogleAiBackend {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GoogleAiBackend {
    /// Falls back to `GOOGLE_API_KEY` when the config carries no key.
    pub fn new(config: &GoogleAiConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("GOOGLE_API_KEY").ok())
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                GenFillError::ConfigError("GOOGLE_API_KEY not set and no API key provided".into())
            })?;

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        })
    }

    fn endpoint(&self, model: &str, method: &str) -> String {
        format!(
            "{}/models/{}:{}",
            self.base_url.trim_end_matches('/'),
            model,
            method
        )
    }

    async fn post<B: Serialize, R: DeserializeOwned>(&self, url: &str, body: &B) -> Result<R> {
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| GenFillError::HttpError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            log::error!("Google AI request failed with status {}", status.as_u16());
            log::debug!("Google AI error body: {}", message);
            return Err(GenFillError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<R>()
            .await
            .map_err(|e| GenFillError::ResponseError(e.to_string()))
    }

    async fn predict_image(&self, model: &str, prompt: &str) -> Result<GeneratedMedia> {
        let body = json!({
            "instances": [{ "prompt": prompt }],
            "parameters": { "sampleCount": 1 }
        });
        let response: PredictResponse = self.post(&self.endpoint(model, "predict"), &body).await?;
        Ok(response.into_media())
    }

    async fn generate_content_image(&self, model: &str, prompt: &str) -> Result<GeneratedMedia> {
        let body = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![RequestPart::Text {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                response_modalities: Some(vec!["TEXT", "IMAGE"]),
                ..Default::default()
            },
        };
        let response: GenerateContentResponse = self
            .post(&self.endpoint(model, "generateContent"), &body)
            .await?;
        response.into_media()
    }
}

#[async_trait]
impl ModelBackend for GoogleAiBackend {
    fn name(&self) -> &'static str {
        "googleai"
    }

    async fn generate_structured(
        &self,
        model: &str,
        instruction: &Instruction,
        output_schema: &Value,
    ) -> Result<Option<Value>> {
        let body = GenerateContentRequest::structured(instruction, output_schema);
        log::debug!(
            "Gemini structured request: {} part(s) to {}",
            body.contents[0].parts.len(),
            model
        );

        let response: GenerateContentResponse = self
            .post(&self.endpoint(model, "generateContent"), &body)
            .await?;

        match response.into_text()? {
            Some(text) => parse_structured_text(&text),
            None => Ok(None),
        }
    }

    async fn generate_media(&self, model: &str, prompt: &str) -> Result<GeneratedMedia> {
        if model.starts_with("imagen") {
            self.predict_image(model, prompt).await
        } else {
            self.generate_content_image(model, prompt).await
        }
    }
}

fn parse_structured_text(text: &str) -> Result<Option<Value>> {
    let value = match serde_json::from_str::<Value>(text) {
        Ok(value) => value,
        Err(e) => extract_json_object(text).ok_or_else(|| {
            GenFillError::ResponseError(format!("model output is not JSON: {}", e))
        })?,
    };
    Ok(if value.is_null() { None } else { Some(value) })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content>,
    generation_config: GenerationConfig<'a>,
}

impl<'a> GenerateContentRequest<'a> {
    fn structured(instruction: &Instruction, output_schema: &'a Value) -> Self {
        let parts = instruction.parts().iter().map(RequestPart::from).collect();
        Self {
            contents: vec![Content { role: "user", parts }],
            generation_config: GenerationConfig {
                response_mime_type: Some("application/json"),
                response_schema: Some(output_schema),
                response_modalities: None,
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RequestPart {
    Text {
        text: String,
    },
    #[serde(rename_all = "camelCase")]
    InlineData { inline_data: Blob },
    #[serde(rename_all = "camelCase")]
    FileData { file_data: FileData },
}

impl From<&Part> for RequestPart {
    fn from(part: &Part) -> Self {
        match part {
            Part::Text { text } => RequestPart::Text { text: text.clone() },
            // Anything that is not a data URI goes out by reference and the
            // service decides whether it is usable.
            Part::Media { url } => match DataUri::parse(url) {
                Ok(uri) => RequestPart::InlineData {
                    inline_data: Blob {
                        mime_type: uri.mime_type,
                        data: uri.data,
                    },
                },
                Err(_) => RequestPart::FileData {
                    file_data: FileData {
                        file_uri: url.clone(),
                    },
                },
            },
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Blob {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FileData {
    file_uri: String,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_modalities: Option<Vec<&'static str>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

impl GenerateContentResponse {
    fn check_blocked(&self) -> Result<()> {
        if let Some(reason) = self
            .prompt_feedback
            .as_ref()
            .and_then(|feedback| feedback.block_reason.as_deref())
        {
            return Err(GenFillError::ResponseError(format!(
                "prompt blocked: {}",
                reason
            )));
        }
        Ok(())
    }

    fn first_parts(self) -> Vec<ResponsePart> {
        self.candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| content.parts)
            .unwrap_or_default()
    }

    fn into_text(self) -> Result<Option<String>> {
        self.check_blocked()?;
        let text: String = self
            .first_parts()
            .into_iter()
            .filter_map(|part| part.text)
            .collect();
        Ok(if text.trim().is_empty() { None } else { Some(text) })
    }

    fn into_media(self) -> Result<GeneratedMedia> {
        self.check_blocked()?;
        let blob = self
            .first_parts()
            .into_iter()
            .find_map(|part| part.inline_data);

        Ok(match blob {
            Some(blob) => GeneratedMedia {
                url: Some(
                    DataUri {
                        mime_type: blob.mime_type.clone(),
                        data: blob.data,
                    }
                    .to_string(),
                ),
                content_type: Some(blob.mime_type),
            },
            None => GeneratedMedia::default(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    inline_data: Option<Blob>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Prediction {
    #[serde(default)]
    bytes_base64_encoded: Option<String>,
    #[serde(default)]
    mime_type: Option<String>,
}

impl PredictResponse {
    fn into_media(self) -> GeneratedMedia {
        self.predictions
            .into_iter()
            .find_map(|prediction| {
                let data = prediction.bytes_base64_encoded?;
                let mime_type = prediction
                    .mime_type
                    .unwrap_or_else(|| DEFAULT_IMAGE_MIME.to_string());
                Some(GeneratedMedia {
                    url: Some(
                        DataUri {
                            mime_type: mime_type.clone(),
                            data,
                        }
                        .to_string(),
                    ),
                    content_type: Some(mime_type),
                })
            })
            .unwrap_or_default()
    }
}
