use crate::validate::{require_non_empty, Validate, ValidationError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptGenRequest {
    #[serde(default)]
    pub prompt: String,
}

impl PromptGenRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
        }
    }
}

impl Validate for PromptGenRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        require_non_empty("prompt", &self.prompt)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptGenResponse {
    pub image_data_uri: String,
}
