use crate::validate::{require_non_empty, Validate, ValidationError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FillRequest {
    #[serde(default)]
    pub prompt: String,
    /// Hex color such as `#1E90FF`. Passed through without parsing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreground_color: Option<String>,
    /// Data URI of the reference image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_image: Option<String>,
    /// JSON-encoded rectangle, opaque at this layer.
    pub selection_area: String,
}

impl FillRequest {
    pub fn new(prompt: impl Into<String>, selection_area: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            foreground_color: None,
            reference_image: None,
            selection_area: selection_area.into(),
        }
    }

    pub fn with_foreground_color(mut self, color: impl Into<String>) -> Self {
        self.foreground_color = Some(color.into());
        self
    }

    pub fn with_reference_image(mut self, data_uri: impl Into<String>) -> Self {
        self.reference_image = Some(data_uri.into());
        self
    }
}

impl Validate for FillRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        require_non_empty("prompt", &self.prompt)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FillResponse {
    pub generated_image: String,
}
