//! HTTP surface over the flows and a single shared form instance.

use crate::{
    config::Config,
    error::GenFillError,
    flows::FlowClient,
    form::{Attachment, FormController, FormError, FormValues, DEFAULT_COLOR},
    models::{FillRequest, InfluenceRequest, PromptGenRequest},
};
use actix_web::{
    error, get, http::StatusCode, post, web, App, HttpRequest, HttpResponse, HttpServer,
    Responder, ResponseError,
};
use base64::Engine;
use serde::Deserialize;
use serde_json::json;

/// Reference images travel inline as base64, so allow generous bodies.
const MAX_JSON_PAYLOAD: usize = 32 * 1024 * 1024;

pub struct AppState {
    flows: FlowClient,
    form: FormController,
}

impl AppState {
    pub fn new(flows: FlowClient) -> Self {
        Self {
            form: FormController::new(flows.clone()),
            flows,
        }
    }
}

impl ResponseError for GenFillError {
    fn status_code(&self) -> StatusCode {
        match self {
            GenFillError::ValidationError { .. } => StatusCode::BAD_REQUEST,
            GenFillError::ConfigError(_) | GenFillError::SerializationError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            _ => StatusCode::BAD_GATEWAY,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({
            "error": self.to_string(),
            "field": self.field(),
        }))
    }
}

impl ResponseError for FormError {
    fn status_code(&self) -> StatusCode {
        match self {
            FormError::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
            FormError::InFlight => StatusCode::CONFLICT,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            FormError::Invalid(fields) => json!({
                "error": self.to_string(),
                "fields": fields
                    .iter()
                    .map(|f| json!({ "field": f.field, "message": f.message }))
                    .collect::<Vec<_>>(),
            }),
            FormError::InFlight => json!({ "error": self.to_string() }),
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}

fn json_error_handler(err: error::JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    log::warn!("Rejected JSON payload: {}", err);
    let response = HttpResponse::BadRequest().json(json!({ "error": err.to_string() }));
    error::InternalError::from_response(err, response).into()
}

/// Wire shape of a form submission. The reference image, when present, is
/// carried inline as base64.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FormSubmission {
    pub prompt: String,
    pub use_color: bool,
    pub color: Option<String>,
    pub reference_image: Option<InlineFile>,
    pub use_selection: bool,
}

impl Default for FormSubmission {
    fn default() -> Self {
        Self {
            prompt: String::new(),
            use_color: false,
            color: None,
            reference_image: None,
            use_selection: true,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineFile {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub base64: String,
}

impl FormSubmission {
    fn into_values(self) -> Result<FormValues, GenFillError> {
        let reference_image = match self.reference_image {
            Some(file) => Some(Attachment::Inline {
                bytes: base64::engine::general_purpose::STANDARD
                    .decode(file.base64.as_bytes())
                    .map_err(|_| GenFillError::ValidationError {
                        field: "referenceImage",
                        message: "attachment is not valid base64".into(),
                    })?,
                file_name: file.file_name,
                content_type: file.content_type,
            }),
            None => None,
        };

        Ok(FormValues {
            prompt: self.prompt,
            use_color: self.use_color,
            color: self.color.unwrap_or_else(|| DEFAULT_COLOR.to_string()),
            reference_image,
            use_selection: self.use_selection,
        })
    }
}

#[get("/health")]
async fn health(data: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "backend": data.flows.backend_name(),
    }))
}

#[post("/api/flows/color-aware-generative-fill")]
async fn color_aware_generative_fill(
    body: web::Json<FillRequest>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, GenFillError> {
    let response = data.flows.color_aware_generative_fill(&body).await?;
    Ok(HttpResponse::Ok().json(response))
}

#[post("/api/flows/prompt-based-image-generation")]
async fn prompt_based_image_generation(
    body: web::Json<PromptGenRequest>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, GenFillError> {
    let response = data.flows.generate_image_from_prompt(&body).await?;
    Ok(HttpResponse::Ok().json(response))
}

#[post("/api/flows/reference-image-influence")]
async fn reference_image_influence(
    body: web::Json<InfluenceRequest>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, GenFillError> {
    let response = data.flows.reference_image_influence(&body).await?;
    Ok(HttpResponse::Ok().json(response))
}

#[get("/api/form")]
async fn form_state(data: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(data.form.state())
}

#[post("/api/form/submit")]
async fn submit_form(
    body: web::Json<FormSubmission>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, actix_web::Error> {
    let values = body.into_inner().into_values()?;
    let submission = data.form.submit(values).await?;
    Ok(HttpResponse::Ok().json(submission))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .limit(MAX_JSON_PAYLOAD)
            .error_handler(json_error_handler),
    )
    .service(health)
    .service(color_aware_generative_fill)
    .service(prompt_based_image_generation)
    .service(reference_image_influence)
    .service(form_state)
    .service(submit_form);
}

pub async fn run(config: &Config, flows: FlowClient) -> std::io::Result<()> {
    let data = web::Data::new(AppState::new(flows));

    log::info!("🌐 Listening on http://{}:{}", config.host, config.port);

    HttpServer::new(move || App::new().app_data(data.clone()).configure(configure))
        .bind((config.host.as_str(), config.port))?
        .run()
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{backend::mock::MockBackend, flows::test_models};
    use actix_web::test as actix_test;
    use serde_json::Value;
    use std::sync::Arc;

    const GENERATED: &str = "data:image/png;base64,iVBORw0KGgo=";

    fn state(mock: MockBackend) -> web::Data<AppState> {
        web::Data::new(AppState::new(FlowClient::new(Arc::new(mock), test_models())))
    }

    #[actix_web::test]
    async fn test_fill_endpoint() {
        let app = actix_test::init_service(
            App::new()
                .app_data(state(MockBackend::returning(json!({ "generatedImage": GENERATED }))))
                .configure(configure),
        )
        .await;

        let req = actix_test::TestRequest::post()
            .uri("/api/flows/color-aware-generative-fill")
            .set_json(json!({ "prompt": "a red bicycle", "selectionArea": "{}" }))
            .to_request();
        let body: Value = actix_test::call_and_read_body_json(&app, req).await;
        assert_eq!(body, json!({ "generatedImage": GENERATED }));
    }

    #[actix_web::test]
    async fn test_fill_endpoint_status_mapping() {
        let app = actix_test::init_service(
            App::new()
                .app_data(state(MockBackend::without_output()))
                .configure(configure),
        )
        .await;

        let req = actix_test::TestRequest::post()
            .uri("/api/flows/color-aware-generative-fill")
            .set_json(json!({ "prompt": "", "selectionArea": "{}" }))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = actix_test::read_body_json(resp).await;
        assert_eq!(body["field"], "prompt");

        let req = actix_test::TestRequest::post()
            .uri("/api/flows/color-aware-generative-fill")
            .set_json(json!({ "prompt": "a lion", "selectionArea": "{}" }))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    }

    #[actix_web::test]
    async fn test_influence_endpoint_requires_reference() {
        let app = actix_test::init_service(
            App::new()
                .app_data(state(MockBackend::returning(json!({ "updatedImageDataUri": GENERATED }))))
                .configure(configure),
        )
        .await;

        let req = actix_test::TestRequest::post()
            .uri("/api/flows/reference-image-influence")
            .set_json(json!({ "prompt": "in watercolor" }))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = actix_test::read_body_json(resp).await;
        assert_eq!(body["field"], "referenceImageDataUri");
    }

    #[actix_web::test]
    async fn test_image_generation_endpoint() {
        let app = actix_test::init_service(
            App::new()
                .app_data(state(MockBackend::returning_media(Some(GENERATED))))
                .configure(configure),
        )
        .await;

        let req = actix_test::TestRequest::post()
            .uri("/api/flows/prompt-based-image-generation")
            .set_json(json!({ "prompt": "a golden retriever" }))
            .to_request();
        let body: Value = actix_test::call_and_read_body_json(&app, req).await;
        assert_eq!(body, json!({ "imageDataUri": GENERATED }));
    }

    #[actix_web::test]
    async fn test_form_submission_flow() {
        let app = actix_test::init_service(
            App::new()
                .app_data(state(MockBackend::returning(json!({ "generatedImage": GENERATED }))))
                .configure(configure),
        )
        .await;

        let req = actix_test::TestRequest::post()
            .uri("/api/form/submit")
            .set_json(json!({ "prompt": "" }))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body: Value = actix_test::read_body_json(resp).await;
        assert_eq!(body["fields"][0]["message"], "Please enter a prompt.");

        let req = actix_test::TestRequest::post()
            .uri("/api/form/submit")
            .set_json(json!({
                "prompt": "a red bicycle",
                "useColor": true,
                "color": "#FF0000",
                "referenceImage": { "fileName": "ref.png", "base64": "aGVsbG8=" }
            }))
            .to_request();
        let body: Value = actix_test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["notification"]["title"], "Success!");
        assert_eq!(body["generatedImage"], GENERATED);

        let req = actix_test::TestRequest::get().uri("/api/form").to_request();
        let body: Value = actix_test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "succeeded");
    }

    #[actix_web::test]
    async fn test_form_failure_is_a_notification() {
        let app = actix_test::init_service(
            App::new()
                .app_data(state(MockBackend::failing("network unreachable")))
                .configure(configure),
        )
        .await;

        let req = actix_test::TestRequest::post()
            .uri("/api/form/submit")
            .set_json(json!({ "prompt": "a red bicycle" }))
            .to_request();
        let body: Value = actix_test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["notification"]["variant"], "destructive");
        assert_eq!(body["generatedImage"], Value::Null);
    }

    #[test]
    fn test_form_submission_defaults() {
        let submission: FormSubmission =
            serde_json::from_value(json!({ "prompt": "a red bicycle" })).unwrap();
        let values = submission.into_values().unwrap();
        assert!(values.use_selection);
        assert!(!values.use_color);
        assert_eq!(values.color, DEFAULT_COLOR);

        let bad: FormSubmission = serde_json::from_value(json!({
            "prompt": "x",
            "referenceImage": { "base64": "***" }
        }))
        .unwrap();
        assert!(bad.into_values().unwrap_err().is_validation());
    }
}
