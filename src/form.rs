//! Form controller for the generative-fill page.
//!
//! Holds the submission state of one form instance. A submission moves the
//! state to [`SubmissionState::Submitting`]; the remote outcome moves it to
//! `Succeeded` or `Failed`. While `Submitting`, further submissions are
//! rejected with [`FormError::InFlight`].

use crate::{
    error::{GenFillError, Result},
    flows::FlowClient,
    models::{infer_mime_type, DataUri, FillRequest},
    validate::ValidationError,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

pub const DEFAULT_COLOR: &str = "#1E90FF";
pub const PROMPT_REQUIRED: &str = "Please enter a prompt.";
/// Sent as the selection area when the selection switch is off.
pub const NO_SELECTION: &str = "{}";

/// The canned rectangle standing in for a document selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SelectionArea {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub unit: &'static str,
}

pub const CANNED_SELECTION: SelectionArea = SelectionArea {
    x: 50,
    y: 50,
    width: 400,
    height: 300,
    unit: "pixels",
};

pub fn selection_area_json(use_selection: bool) -> Result<String> {
    if !use_selection {
        return Ok(NO_SELECTION.to_string());
    }
    serde_json::to_string(&CANNED_SELECTION)
        .map_err(|e| GenFillError::SerializationError(e.to_string()))
}

/// A reference image picked by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attachment {
    /// Read from disk at submission time.
    Path(PathBuf),
    Inline {
        file_name: Option<String>,
        content_type: Option<String>,
        bytes: Vec<u8>,
    },
}

impl Attachment {
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Attachment::Path(path.into())
    }

    /// Encodes the file as a data URI. The file type is never checked.
    pub async fn read_data_uri(&self) -> Result<String> {
        match self {
            Attachment::Path(path) => {
                let bytes = tokio::fs::read(path).await.map_err(|e| {
                    GenFillError::IoError(format!("failed to read {}: {}", path.display(), e))
                })?;
                let mime_type = infer_mime_type(file_name(path), &bytes);
                Ok(DataUri::from_bytes(&mime_type, &bytes).to_string())
            }
            Attachment::Inline {
                file_name,
                content_type,
                bytes,
            } => {
                let mime_type = content_type
                    .clone()
                    .filter(|t| !t.is_empty())
                    .unwrap_or_else(|| infer_mime_type(file_name.as_deref(), bytes));
                Ok(DataUri::from_bytes(&mime_type, bytes).to_string())
            }
        }
    }
}

fn file_name(path: &Path) -> Option<&str> {
    path.file_name().and_then(|name| name.to_str())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormValues {
    pub prompt: String,
    pub use_color: bool,
    /// Only sent when `use_color` is set.
    pub color: String,
    pub reference_image: Option<Attachment>,
    pub use_selection: bool,
}

impl Default for FormValues {
    fn default() -> Self {
        Self {
            prompt: String::new(),
            use_color: false,
            color: DEFAULT_COLOR.to_string(),
            reference_image: None,
            use_selection: true,
        }
    }
}

impl FormValues {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.use_color = true;
        self.color = color.into();
        self
    }

    pub fn with_reference_image(mut self, attachment: Attachment) -> Self {
        self.reference_image = Some(attachment);
        self
    }

    pub fn with_selection(mut self, use_selection: bool) -> Self {
        self.use_selection = use_selection;
        self
    }

    /// Reports every invalid field at once.
    pub fn validate(&self) -> std::result::Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        if self.prompt.is_empty() {
            errors.push(ValidationError::new("prompt", PROMPT_REQUIRED));
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Maps form values to the outbound fill request.
pub fn build_fill_request(values: &FormValues, reference_image: Option<String>) -> Result<FillRequest> {
    Ok(FillRequest {
        prompt: values.prompt.clone(),
        foreground_color: values.use_color.then(|| values.color.clone()),
        reference_image,
        selection_area: selection_area_json(values.use_selection)?,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationVariant {
    Default,
    Destructive,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub variant: NotificationVariant,
    pub title: &'static str,
    pub description: &'static str,
}

impl Notification {
    pub fn success() -> Self {
        Self {
            variant: NotificationVariant::Default,
            title: "Success!",
            description: "Your image has been generated and placed.",
        }
    }

    pub fn failure() -> Self {
        Self {
            variant: NotificationVariant::Destructive,
            title: "Generation Failed",
            description: "An error occurred while generating the image. Please try again.",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum SubmissionState {
    #[default]
    Idle,
    Submitting,
    #[serde(rename_all = "camelCase")]
    Succeeded {
        generated_image: String,
    },
    Failed,
}

impl SubmissionState {
    pub fn is_in_flight(&self) -> bool {
        matches!(self, SubmissionState::Submitting)
    }

    pub fn generated_image(&self) -> Option<&str> {
        match self {
            SubmissionState::Succeeded { generated_image } => Some(generated_image),
            _ => None,
        }
    }

    /// Submit-start. Clears the previous image.
    fn begin(&mut self) -> std::result::Result<(), FormError> {
        if self.is_in_flight() {
            return Err(FormError::InFlight);
        }
        *self = SubmissionState::Submitting;
        Ok(())
    }

    fn succeed(&mut self, generated_image: String) {
        *self = SubmissionState::Succeeded { generated_image };
    }

    fn fail(&mut self) {
        *self = SubmissionState::Failed;
    }
}

/// Rejections that happen before a submission starts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormError {
    #[error("{} invalid field(s)", .0.len())]
    Invalid(Vec<ValidationError>),
    #[error("a submission is already in flight")]
    InFlight,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub notification: Notification,
    pub generated_image: Option<String>,
}

pub struct FormController {
    client: FlowClient,
    state: Mutex<SubmissionState>,
}

impl FormController {
    pub fn new(client: FlowClient) -> Self {
        Self {
            client,
            state: Mutex::new(SubmissionState::Idle),
        }
    }

    pub fn state(&self) -> SubmissionState {
        self.lock_state().clone()
    }

    pub fn is_in_flight(&self) -> bool {
        self.lock_state().is_in_flight()
    }

    pub fn generated_image(&self) -> Option<String> {
        self.lock_state().generated_image().map(String::from)
    }

    /// Validates, then makes exactly one fill call. Remote failures are not
    /// errors here: they come back as a destructive notification and leave
    /// the form ready for another attempt.
    pub async fn submit(&self, values: FormValues) -> std::result::Result<Submission, FormError> {
        values.validate().map_err(FormError::Invalid)?;

        let mut guard = InFlightGuard::begin(&self.state)?;
        match self.generate(&values).await {
            Ok(generated_image) => {
                guard.succeed(generated_image.clone());
                Ok(Submission {
                    notification: Notification::success(),
                    generated_image: Some(generated_image),
                })
            }
            Err(e) => {
                log::error!("Generative fill submission failed: {}", e);
                guard.fail();
                Ok(Submission {
                    notification: Notification::failure(),
                    generated_image: None,
                })
            }
        }
    }

    async fn generate(&self, values: &FormValues) -> Result<String> {
        let reference_image = match &values.reference_image {
            Some(attachment) => Some(attachment.read_data_uri().await?),
            None => None,
        };
        let request = build_fill_request(values, reference_image)?;
        let response = self.client.color_aware_generative_fill(&request).await?;
        Ok(response.generated_image)
    }

    fn lock_state(&self) -> MutexGuard<'_, SubmissionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Clears the in-flight state even when the submitting future is dropped
/// before the remote call resolves.
struct InFlightGuard<'a> {
    state: &'a Mutex<SubmissionState>,
    resolved: bool,
}

impl<'a> InFlightGuard<'a> {
    fn begin(state: &'a Mutex<SubmissionState>) -> std::result::Result<Self, FormError> {
        lock(state).begin()?;
        Ok(Self {
            state,
            resolved: false,
        })
    }

    fn succeed(&mut self, generated_image: String) {
        lock(self.state).succeed(generated_image);
        self.resolved = true;
    }

    fn fail(&mut self) {
        lock(self.state).fail();
        self.resolved = true;
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if !self.resolved {
            lock(self.state).fail();
        }
    }
}

fn lock(state: &Mutex<SubmissionState>) -> MutexGuard<'_, SubmissionState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}
