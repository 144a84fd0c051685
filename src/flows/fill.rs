use crate::{
    flows::{string_output_schema, Flow, Instruction, PromptTemplate},
    models::{FillRequest, FillResponse},
};
use serde_json::Value;

pub struct ColorAwareGenerativeFill;

impl Flow for ColorAwareGenerativeFill {
    type Input = FillRequest;
    type Output = FillResponse;

    const NAME: &'static str = "colorAwareGenerativeFill";
    const OUTPUT_FIELD: &'static str = "generatedImage";

    fn output_schema() -> Value {
        string_output_schema(
            Self::OUTPUT_FIELD,
            "The generated image, as a data URI that must include a MIME type and use Base64 encoding. Expected format: 'data:<mimetype>;base64,<encoded_data>'.",
        )
    }

    fn render(input: &FillRequest) -> Instruction {
        // Empty optional strings count as absent.
        let color = input.foreground_color.as_deref().filter(|c| !c.is_empty());
        let reference = input.reference_image.as_deref().filter(|r| !r.is_empty());

        PromptTemplate::new()
            .line("You are an AI assistant that performs generative fills for Photoshop documents.")
            .line(format!(
                "The user has provided the following prompt: {}",
                input.prompt
            ))
            .when(color, |t, color| {
                t.line(format!(
                    "The current foreground color of the Photoshop document is {}.",
                    color
                ))
                .line("Please generate an image that seamlessly integrates with this color palette.")
            })
            .when(reference, |t, image| {
                t.line("Here is a reference image to influence the generative fill:")
                    .media(image)
            })
            .line(format!(
                "The selected area in the Photoshop document is: {}",
                input.selection_area
            ))
            .line("Generate an image that satisfies the prompt and integrates with the existing color palette and reference image if provided.")
            .line("Return the generated image as a data URI.")
            .render()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        backend::mock::{MockBackend, RecordedCall},
        error::GenFillError,
        flows::{test_models, FlowClient},
    };
    use serde_json::json;
    use std::sync::Arc;

    const SELECTION: &str = r#"{"x":50,"y":50,"width":400,"height":300,"unit":"pixels"}"#;
    const COLOR_CLAUSE: &str = "The current foreground color of the Photoshop document is";
    const REFERENCE: &str = "data:image/png;base64,iVBORw0KGgo=";

    #[test]
    fn test_color_clause_only_when_color_present() {
        let with_color = ColorAwareGenerativeFill::render(
            &FillRequest::new("a red bicycle", SELECTION).with_foreground_color("#FF0000"),
        );
        assert!(with_color
            .text()
            .contains("The current foreground color of the Photoshop document is #FF0000."));
        assert!(with_color.text().contains("seamlessly integrates"));

        let without = ColorAwareGenerativeFill::render(&FillRequest::new("a red bicycle", SELECTION));
        assert!(!without.text().contains(COLOR_CLAUSE));
        assert!(!without.text().contains("seamlessly integrates"));

        let empty_color = ColorAwareGenerativeFill::render(
            &FillRequest::new("a red bicycle", SELECTION).with_foreground_color(""),
        );
        assert!(!empty_color.text().contains(COLOR_CLAUSE));
    }

    #[test]
    fn test_reference_media_only_when_present() {
        let with_reference = ColorAwareGenerativeFill::render(
            &FillRequest::new("a lion", SELECTION).with_reference_image(REFERENCE),
        );
        assert_eq!(with_reference.media().collect::<Vec<_>>(), vec![REFERENCE]);
        assert!(with_reference
            .text()
            .contains("Here is a reference image to influence the generative fill:"));

        let without = ColorAwareGenerativeFill::render(&FillRequest::new("a lion", SELECTION));
        assert_eq!(without.media().count(), 0);
        assert!(!without.text().contains("reference image to influence"));
    }

    #[test]
    fn test_selection_area_embedded_verbatim() {
        for selection in [SELECTION, "{}", "", r#"not json at all "}{""#] {
            let instruction = ColorAwareGenerativeFill::render(&FillRequest::new("a lion", selection));
            assert!(instruction.text().contains(&format!(
                "The selected area in the Photoshop document is: {}",
                selection
            )));
        }
    }

    #[test]
    fn test_prompt_is_embedded() {
        let instruction = ColorAwareGenerativeFill::render(&FillRequest::new("a majestic lion", "{}"));
        assert!(instruction
            .text()
            .contains("The user has provided the following prompt: a majestic lion"));
        assert!(instruction
            .text()
            .ends_with("Return the generated image as a data URI."));
    }

    #[tokio::test]
    async fn test_empty_prompt_rejected_before_remote_call() {
        let mock = Arc::new(MockBackend::returning(json!({"generatedImage": REFERENCE})));
        let client = FlowClient::new(mock.clone(), test_models());

        let err = client
            .color_aware_generative_fill(&FillRequest::new("", SELECTION))
            .await
            .unwrap_err();

        assert!(err.is_validation());
        assert_eq!(err.field(), Some("prompt"));
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_successful_fill() {
        let mock = Arc::new(MockBackend::returning(json!({"generatedImage": REFERENCE})));
        let client = FlowClient::new(mock.clone(), test_models());

        let response = client
            .color_aware_generative_fill(&FillRequest::new("a lion", SELECTION))
            .await
            .unwrap();

        assert_eq!(response.generated_image, REFERENCE);
        let calls = mock.calls();
        assert_eq!(calls.len(), 1);
        assert!(matches!(&calls[0], RecordedCall::Structured { model, .. } if model == "fill-model"));
    }

    #[tokio::test]
    async fn test_missing_generated_image_is_a_failure() {
        for mock in [
            MockBackend::without_output(),
            MockBackend::returning(json!({})),
            MockBackend::returning(json!({"generatedImage": null})),
        ] {
            let client = FlowClient::new(Arc::new(mock), test_models());
            let err = client
                .color_aware_generative_fill(&FillRequest::new("a lion", SELECTION))
                .await
                .unwrap_err();
            assert!(matches!(err, GenFillError::MissingOutput("generatedImage")));
        }
    }

    #[tokio::test]
    async fn test_remote_failure_propagates_without_retry() {
        let mock = Arc::new(MockBackend::failing("connection reset"));
        let client = FlowClient::new(mock.clone(), test_models());

        let err = client
            .color_aware_generative_fill(&FillRequest::new("a lion", SELECTION))
            .await
            .unwrap_err();

        assert!(matches!(err, GenFillError::HttpError(_)));
        assert_eq!(mock.calls().len(), 1);
    }
}
