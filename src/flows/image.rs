use crate::{
    backend::ModelBackend,
    error::{GenFillError, Result},
    logger,
    models::{PromptGenRequest, PromptGenResponse},
    validate::Validate,
};

const NAME: &str = "generateImageFromPrompt";

/// Sends the prompt untouched to an image model and returns the media URL.
pub async fn generate_image_from_prompt(
    backend: &dyn ModelBackend,
    model: &str,
    request: &PromptGenRequest,
) -> Result<PromptGenResponse> {
    request.validate()?;

    let timer = logger::timer(NAME);
    log::info!(
        "[req:{}] {} via {} model {}",
        timer.request_id(),
        NAME,
        backend.name(),
        model
    );

    let media = backend
        .generate_media(model, &request.prompt)
        .await
        .map_err(|e| {
            log::error!("[req:{}] {} failed: {}", timer.request_id(), NAME, e);
            e
        })?;

    let image_data_uri = media
        .url
        .filter(|url| !url.is_empty())
        .ok_or(GenFillError::MissingOutput("imageDataUri"))?;

    Ok(PromptGenResponse { image_data_uri })
}
