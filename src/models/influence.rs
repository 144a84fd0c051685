use crate::validate::{require_non_empty, Validate, ValidationError};
use serde::{Deserialize, Serialize};

/// Unlike [`FillRequest`](super::FillRequest), the reference image is mandatory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InfluenceRequest {
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub reference_image_data_uri: String,
}

impl InfluenceRequest {
    pub fn new(prompt: impl Into<String>, reference_image_data_uri: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            reference_image_data_uri: reference_image_data_uri.into(),
        }
    }
}

impl Validate for InfluenceRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        require_non_empty("prompt", &self.prompt)?;
        require_non_empty("referenceImageDataUri", &self.reference_image_data_uri)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InfluenceResponse {
    pub updated_image_data_uri: String,
}
