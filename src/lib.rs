//! Generative fill over hosted image models.
//!
//! Three templated flows (color-aware generative fill, reference-image
//! influence, and prompt-only image generation) share one pipeline:
//! validate the input, render an instruction, call the model once, and
//! validate the output. [`form::FormController`] drives the fill flow from
//! form values and tracks the in-flight submission.
//!
//! ```no_run
//! use genfill::{Config, FillRequest, FlowClient};
//!
//! # async fn run() -> genfill::Result<()> {
//! let config = Config::from_env()?;
//! let client = FlowClient::connect(&config).await?;
//! let request = FillRequest::new("a majestic lion wearing a crown", "{}")
//!     .with_foreground_color("#1E90FF");
//! let response = client.color_aware_generative_fill(&request).await?;
//! println!("{}", response.generated_image);
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod flows;
pub mod form;
pub mod logger;
pub mod models;
#[cfg(feature = "server")]
pub mod server;
pub mod validate;

pub use backend::{BedrockBackend, GeneratedMedia, GoogleAiBackend, ModelBackend};
pub use config::{BackendKind, BedrockConfig, Config, GoogleAiConfig, ModelConfig};
pub use error::{GenFillError, Result};
pub use flows::{Flow, FlowClient, Instruction, PromptTemplate};
pub use form::{Attachment, FormController, FormError, FormValues, Notification};
pub use models::*;
pub use validate::{Validate, ValidationError};
