use crate::{
    flows::{string_output_schema, Flow, Instruction, PromptTemplate},
    models::{InfluenceRequest, InfluenceResponse},
};
use serde_json::Value;

pub struct ReferenceImageInfluence;

impl Flow for ReferenceImageInfluence {
    type Input = InfluenceRequest;
    type Output = InfluenceResponse;

    const NAME: &'static str = "referenceImageInfluence";
    const OUTPUT_FIELD: &'static str = "updatedImageDataUri";

    fn output_schema() -> Value {
        string_output_schema(
            Self::OUTPUT_FIELD,
            "The updated image data URI with the generative fill applied, as a data URI that must include a MIME type and use Base64 encoding. Expected format: 'data:<mimetype>;base64,<encoded_data>'.",
        )
    }

    fn render(input: &InfluenceRequest) -> Instruction {
        PromptTemplate::new()
            .line("Apply generative fill to an image based on the following prompt and reference image.")
            .line(format!("Prompt: {}", input.prompt))
            .line("Reference Image:")
            .media(input.reference_image_data_uri.as_str())
            .line("Return the updated image as a data URI.")
            .render()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        backend::mock::MockBackend,
        error::GenFillError,
        flows::{test_models, FlowClient, Part},
    };
    use serde_json::json;
    use std::sync::Arc;

    const REFERENCE: &str = "data:image/jpeg;base64,/9j/4AAQ";

    #[test]
    fn test_render_always_embeds_prompt_and_media() {
        let instruction =
            ReferenceImageInfluence::render(&InfluenceRequest::new("in watercolor", REFERENCE));

        assert_eq!(instruction.parts().len(), 3);
        assert_eq!(
            instruction.parts()[1],
            Part::Media {
                url: REFERENCE.into()
            }
        );
        assert!(instruction.text().contains("Prompt: in watercolor"));
    }

    #[tokio::test]
    async fn test_missing_reference_rejected_before_remote_call() {
        let mock = Arc::new(MockBackend::returning(json!({"updatedImageDataUri": REFERENCE})));
        let client = FlowClient::new(mock.clone(), test_models());

        let err = client
            .reference_image_influence(&InfluenceRequest::new("in watercolor", ""))
            .await
            .unwrap_err();

        assert_eq!(err.field(), Some("referenceImageDataUri"));
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_influence_round_trip() {
        let mock = Arc::new(MockBackend::returning(json!({"updatedImageDataUri": REFERENCE})));
        let client = FlowClient::new(mock.clone(), test_models());

        let response = client
            .reference_image_influence(&InfluenceRequest::new("in watercolor", REFERENCE))
            .await
            .unwrap();
        assert_eq!(response.updated_image_data_uri, REFERENCE);

        let instruction = mock.last_instruction().unwrap();
        assert_eq!(instruction.media().collect::<Vec<_>>(), vec![REFERENCE]);
    }

    #[tokio::test]
    async fn test_response_without_updated_image_fails() {
        let client = FlowClient::new(
            Arc::new(MockBackend::returning(json!({"generatedImage": REFERENCE}))),
            test_models(),
        );
        let err = client
            .reference_image_influence(&InfluenceRequest::new("in watercolor", REFERENCE))
            .await
            .unwrap_err();
        assert!(matches!(err, GenFillError::MissingOutput("updatedImageDataUri")));
    }
}
