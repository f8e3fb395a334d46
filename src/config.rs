//! Configuration and client construction.
//!
//! All capability clients are built through [`ClientFactory`] so that the
//! project id, credential file and HTTP/token plumbing are resolved in one
//! place. Configuration problems surface as [`ReelError::Config`] before any
//! network call is made.

use crate::auth::TokenProvider;
use crate::error::{ReelError, Result};
use crate::image::{GeminiImageClient, ImagenClient};
use crate::video::VeoClient;
use std::path::PathBuf;
use std::sync::Arc;

/// Env var carrying the Google Cloud project id.
pub const PROJECT_ID_VAR: &str = "VERTEX_AI_PROJECT_ID";
/// Env var carrying the path to the service-account JSON key.
pub const CREDENTIALS_VAR: &str = "VERTEX_AI_SERVICE_ACCOUNT_JSON";

/// Settings for talking to Vertex AI.
#[derive(Debug, Clone)]
pub struct VertexConfig {
    /// Google Cloud project id.
    pub project_id: String,
    /// Path to the service-account JSON key file.
    pub credentials_path: PathBuf,
    /// Location for image models. The Gemini image model is only served from
    /// the global endpoint.
    pub image_location: String,
    /// Location for video models.
    pub video_location: String,
}

impl VertexConfig {
    /// Creates a config with the default locations.
    pub fn new(project_id: impl Into<String>, credentials_path: impl Into<PathBuf>) -> Self {
        Self {
            project_id: project_id.into(),
            credentials_path: credentials_path.into(),
            image_location: "global".to_string(),
            video_location: "us-central1".to_string(),
        }
    }

    /// Reads configuration from `VERTEX_AI_PROJECT_ID` and
    /// `VERTEX_AI_SERVICE_ACCOUNT_JSON`.
    pub fn from_env() -> Result<Self> {
        let project_id = std::env::var(PROJECT_ID_VAR)
            .map_err(|_| ReelError::Config(format!("{PROJECT_ID_VAR} not set")))?;
        let credentials = std::env::var(CREDENTIALS_VAR)
            .map_err(|_| ReelError::Config(format!("{CREDENTIALS_VAR} not set")))?;
        Ok(Self::new(project_id, credentials))
    }

    /// Sets the image model location.
    pub fn with_image_location(mut self, location: impl Into<String>) -> Self {
        self.image_location = location.into();
        self
    }

    /// Sets the video model location.
    pub fn with_video_location(mut self, location: impl Into<String>) -> Self {
        self.video_location = location.into();
        self
    }

    /// Checks the config without touching the network: non-empty project id
    /// and an existing credential file.
    pub fn validate(&self) -> Result<()> {
        if self.project_id.trim().is_empty() {
            return Err(ReelError::Config("project id is empty".into()));
        }
        if !self.credentials_path.exists() {
            return Err(ReelError::Config(format!(
                "service account file not found: {}",
                self.credentials_path.display()
            )));
        }
        Ok(())
    }

    /// Returns the regional (or global) Vertex AI base URL for a location.
    pub fn endpoint(location: &str) -> String {
        if location == "global" {
            "https://aiplatform.googleapis.com".to_string()
        } else {
            format!("https://{location}-aiplatform.googleapis.com")
        }
    }
}

/// Builds capability clients that share one HTTP client and token provider.
pub struct ClientFactory {
    config: VertexConfig,
    http: reqwest::Client,
    tokens: Arc<TokenProvider>,
}

impl ClientFactory {
    /// Validates the config, loads the credential file and prepares shared
    /// plumbing. Fails fast with a `Config` error on bad setup.
    pub fn new(config: VertexConfig) -> Result<Self> {
        config.validate()?;
        let http = reqwest::Client::new();
        let tokens = Arc::new(TokenProvider::from_file(
            &config.credentials_path,
            http.clone(),
        )?);
        Ok(Self {
            config,
            http,
            tokens,
        })
    }

    /// The validated configuration.
    pub fn config(&self) -> &VertexConfig {
        &self.config
    }

    /// Client for the Gemini image model (keyframe composition with
    /// reference parts).
    pub fn gemini_client(&self) -> GeminiImageClient {
        GeminiImageClient::new(
            self.http.clone(),
            Arc::clone(&self.tokens),
            self.config.project_id.clone(),
            self.config.image_location.clone(),
        )
    }

    /// Client for the Imagen models (text-to-image and subject-reference
    /// editing).
    pub fn imagen_client(&self) -> ImagenClient {
        ImagenClient::new(
            self.http.clone(),
            Arc::clone(&self.tokens),
            self.config.project_id.clone(),
            self.config.video_location.clone(),
        )
    }

    /// Client for the Veo video model.
    pub fn veo_client(&self) -> VeoClient {
        VeoClient::new(
            self.http.clone(),
            Arc::clone(&self.tokens),
            self.config.project_id.clone(),
            self.config.video_location.clone(),
        )
    }
}
