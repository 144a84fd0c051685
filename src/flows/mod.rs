//! The validate → render → invoke → validate pipeline shared by every
//! templated flow, and [`FlowClient`], which binds the flows to a backend.

pub mod fill;
pub mod image;
pub mod influence;
pub mod prompt;

use crate::{
    backend::{self, ModelBackend},
    config::{Config, ResolvedModels},
    error::{GenFillError, Result},
    logger,
    models::{
        FillRequest, FillResponse, InfluenceRequest, InfluenceResponse, PromptGenRequest,
        PromptGenResponse,
    },
    validate::Validate,
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::sync::Arc;

pub use fill::ColorAwareGenerativeFill;
pub use influence::ReferenceImageInfluence;
pub use prompt::{Instruction, Part, PromptTemplate};

/// A one-shot templated call to a structured-output model.
pub trait Flow {
    type Input: Validate + Sync;
    type Output: DeserializeOwned;

    const NAME: &'static str;
    /// The single required string field of the output object.
    const OUTPUT_FIELD: &'static str;

    fn output_schema() -> Value;
    fn render(input: &Self::Input) -> Instruction;
}

pub async fn run_flow<F: Flow>(
    backend: &dyn ModelBackend,
    model: &str,
    input: &F::Input,
) -> Result<F::Output> {
    input.validate()?;
    let instruction = F::render(input);

    let timer = logger::timer(F::NAME);
    log::info!(
        "[req:{}] {} via {} model {} ({} media part(s))",
        timer.request_id(),
        F::NAME,
        backend.name(),
        model,
        instruction.media().count()
    );

    let output = backend
        .generate_structured(model, &instruction, &F::output_schema())
        .await
        .and_then(|output| require_output_field(output, F::OUTPUT_FIELD))
        .map_err(|e| {
            log::error!("[req:{}] {} failed: {}", timer.request_id(), F::NAME, e);
            e
        })?;

    serde_json::from_value(output).map_err(|e| GenFillError::ResponseError(e.to_string()))
}

fn require_output_field(output: Option<Value>, field: &'static str) -> Result<Value> {
    match output {
        Some(value)
            if value
                .get(field)
                .and_then(Value::as_str)
                .map_or(false, |s| !s.is_empty()) =>
        {
            Ok(value)
        }
        _ => Err(GenFillError::MissingOutput(field)),
    }
}

/// Schema for an object with one required string property.
pub(crate) fn string_output_schema(field: &str, description: &str) -> Value {
    let mut property = Map::new();
    property.insert("type".into(), Value::from("string"));
    property.insert("description".into(), Value::from(description));

    let mut properties = Map::new();
    properties.insert(field.to_string(), Value::Object(property));

    let mut schema = Map::new();
    schema.insert("type".into(), Value::from("object"));
    schema.insert("properties".into(), Value::Object(properties));
    schema.insert("required".into(), Value::from(vec![field]));
    Value::Object(schema)
}

#[derive(Clone)]
pub struct FlowClient {
    backend: Arc<dyn ModelBackend>,
    models: ResolvedModels,
}

impl FlowClient {
    pub fn new(backend: Arc<dyn ModelBackend>, models: ResolvedModels) -> Self {
        Self { backend, models }
    }

    pub async fn connect(config: &Config) -> Result<Self> {
        let backend = backend::connect(config).await?;
        Ok(Self::new(backend, config.resolved_models()))
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn models(&self) -> &ResolvedModels {
        &self.models
    }

    pub async fn color_aware_generative_fill(&self, request: &FillRequest) -> Result<FillResponse> {
        run_flow::<ColorAwareGenerativeFill>(self.backend.as_ref(), &self.models.fill, request)
            .await
    }

    pub async fn generate_image_from_prompt(
        &self,
        request: &PromptGenRequest,
    ) -> Result<PromptGenResponse> {
        image::generate_image_from_prompt(self.backend.as_ref(), &self.models.image, request).await
    }

    pub async fn reference_image_influence(
        &self,
        request: &InfluenceRequest,
    ) -> Result<InfluenceResponse> {
        run_flow::<ReferenceImageInfluence>(
            self.backend.as_ref(),
            &self.models.influence,
            request,
        )
        .await
    }
}

#[cfg(test)]
pub(crate) fn test_models() -> ResolvedModels {
    ResolvedModels {
        fill: "fill-model".into(),
        influence: "influence-model".into(),
        image: "image-model".into(),
    }
}
