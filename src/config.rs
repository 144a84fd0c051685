use crate::error::{GenFillError, Result};
use std::env;
use std::str::FromStr;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_HOST: &str = "127.0.0.1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendKind {
    #[default]
    GoogleAi,
    Bedrock,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::GoogleAi => "googleai",
            BackendKind::Bedrock => "bedrock",
        }
    }

    /// Model used by the templated flows when nothing is configured.
    pub fn default_structured_model(&self) -> &'static str {
        match self {
            BackendKind::GoogleAi => "gemini-2.5-flash",
            BackendKind::Bedrock => "anthropic.claude-3-haiku-20240307-v1:0",
        }
    }

    pub fn default_image_model(&self) -> &'static str {
        match self {
            BackendKind::GoogleAi => "imagen-4.0-fast-generate-001",
            BackendKind::Bedrock => "amazon.titan-image-generator-v1",
        }
    }
}

impl FromStr for BackendKind {
    type Err = GenFillError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "googleai" | "google" | "gemini" => Ok(BackendKind::GoogleAi),
            "bedrock" | "aws" => Ok(BackendKind::Bedrock),
            other => Err(GenFillError::ConfigError(format!(
                "unknown backend '{}', expected 'googleai' or 'bedrock'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct GoogleAiConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
}

impl GoogleAiConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let api_key = env::var("GOOGLE_API_KEY")
            .or_else(|_| env::var("GEMINI_API_KEY"))
            .ok();
        let base_url = env::var("GOOGLE_AI_BASE_URL").ok();

        GoogleAiConfig { api_key, base_url }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct BedrockConfig {
    pub region: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
}

impl BedrockConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let region = env::var("AWS_REGION")
            .or_else(|_| env::var("AWS_DEFAULT_REGION"))
            .ok();
        let access_key = env::var("AWS_ACCESS_KEY_ID").ok();
        let secret_key = env::var("AWS_SECRET_ACCESS_KEY").ok();

        BedrockConfig {
            region,
            access_key,
            secret_key,
        }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_credentials(
        mut self,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        self.access_key = Some(access_key.into());
        self.secret_key = Some(secret_key.into());
        self
    }
}

/// Per-flow model overrides. Unset entries fall back to the backend defaults.
#[derive(Debug, Clone, Default)]
pub struct ModelConfig {
    pub fill_model: Option<String>,
    pub influence_model: Option<String>,
    pub image_model: Option<String>,
}

/// Model identifiers after defaults have been applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedModels {
    pub fill: String,
    pub influence: String,
    pub image: String,
}

impl ModelConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        ModelConfig {
            fill_model: env::var("GENFILL_FILL_MODEL").ok(),
            influence_model: env::var("GENFILL_INFLUENCE_MODEL").ok(),
            image_model: env::var("GENFILL_IMAGE_MODEL").ok(),
        }
    }

    pub fn with_fill_model(mut self, model: impl Into<String>) -> Self {
        self.fill_model = Some(model.into());
        self
    }

    pub fn with_influence_model(mut self, model: impl Into<String>) -> Self {
        self.influence_model = Some(model.into());
        self
    }

    pub fn with_image_model(mut self, model: impl Into<String>) -> Self {
        self.image_model = Some(model.into());
        self
    }

    pub fn resolve(&self, backend: BackendKind) -> ResolvedModels {
        let structured = backend.default_structured_model();
        ResolvedModels {
            fill: self
                .fill_model
                .clone()
                .unwrap_or_else(|| structured.to_string()),
            influence: self
                .influence_model
                .clone()
                .unwrap_or_else(|| structured.to_string()),
            image: self
                .image_model
                .clone()
                .unwrap_or_else(|| backend.default_image_model().to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub backend: BackendKind,
    pub host: String,
    pub port: u16,
    pub models: ModelConfig,
    pub google: GoogleAiConfig,
    pub bedrock: BedrockConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            backend: BackendKind::default(),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            models: ModelConfig::default(),
            google: GoogleAiConfig::default(),
            bedrock: BedrockConfig::default(),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Result<Self> {
        let backend = match env::var("GENFILL_BACKEND") {
            Ok(value) => value.parse()?,
            Err(_) => BackendKind::default(),
        };
        let host = env::var("HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());
        let port = match env::var("PORT") {
            Ok(value) => value
                .parse()
                .map_err(|_| GenFillError::ConfigError(format!("invalid PORT '{}'", value)))?,
            Err(_) => DEFAULT_PORT,
        };

        Ok(Config {
            backend,
            host,
            port,
            models: ModelConfig::from_env(),
            google: GoogleAiConfig::from_env(),
            bedrock: BedrockConfig::from_env(),
        })
    }

    pub fn with_backend(mut self, backend: BackendKind) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_models(mut self, models: ModelConfig) -> Self {
        self.models = models;
        self
    }

    pub fn with_google(mut self, config: GoogleAiConfig) -> Self {
        self.google = config;
        self
    }

    pub fn with_bedrock(mut self, config: BedrockConfig) -> Self {
        self.bedrock = config;
        self
    }

    pub fn resolved_models(&self) -> ResolvedModels {
        self.models.resolve(self.backend)
    }
}
