//! Veo client: first/last-frame-bounded clip generation on Vertex AI.
//!
//! Generation is asynchronous on the service side: `:predictLongRunning`
//! returns an operation name, and `:fetchPredictOperation` reports its
//! progress. This client only wraps the two HTTP calls; the poll cadence
//! belongs to the caller.

use crate::auth::TokenProvider;
use crate::config::VertexConfig;
use crate::error::{ReelError, Result};
use crate::video::generator::ClipGenerator;
use crate::video::types::{
    ClipMetadata, ClipOperation, ClipOutput, ClipRequest, ClipStatus, GeneratedClip,
};
use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Veo model variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VeoModel {
    /// Veo 3.1 with first/last frame support.
    #[default]
    Veo31,
}

impl VeoModel {
    /// Returns the API model identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Veo31 => "veo-3.1-generate-001",
        }
    }
}

/// Client for the Veo video model.
pub struct VeoClient {
    client: reqwest::Client,
    tokens: Arc<TokenProvider>,
    project: String,
    location: String,
    model: VeoModel,
}

impl VeoClient {
    /// Creates a client. Normally obtained through
    /// [`ClientFactory`](crate::config::ClientFactory).
    pub fn new(
        client: reqwest::Client,
        tokens: Arc<TokenProvider>,
        project: String,
        location: String,
    ) -> Self {
        Self {
            client,
            tokens,
            project,
            location,
            model: VeoModel::default(),
        }
    }

    /// Overrides the model variant.
    pub fn with_model(mut self, model: VeoModel) -> Self {
        self.model = model;
        self
    }

    fn model_url(&self, verb: &str) -> String {
        format!(
            "{}/v1/projects/{}/locations/{}/publishers/google/models/{}:{}",
            VertexConfig::endpoint(&self.location),
            self.project,
            self.location,
            self.model.as_str(),
            verb,
        )
    }

    async fn post_json<B: Serialize>(&self, url: &str, body: &B) -> Result<reqwest::Response> {
        let token = self.tokens.token().await?;
        let response = self
            .client
            .post(url)
            .bearer_auth(&token)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            if status.as_u16() == 401 || status.as_u16() == 403 {
                return Err(ReelError::Auth(text));
            }
            if status.as_u16() == 429 {
                return Err(ReelError::RateLimited { retry_after: None });
            }
            return Err(ReelError::Api {
                status: status.as_u16(),
                message: text,
            });
        }
        Ok(response)
    }

    fn clip_from_videos(&self, op: &VeoOperationResponse) -> Result<ClipStatus> {
        let inner = op
            .response
            .as_ref()
            .ok_or_else(|| ReelError::EmptyResult("done operation carries no response".into()))?;

        let video = inner
            .videos
            .first()
            .ok_or_else(|| ReelError::EmptyResult("no videos in operation response".into()))?;

        let output = if let Some(ref b64) = video.bytes_base64_encoded {
            let data = base64::engine::general_purpose::STANDARD
                .decode(b64)
                .map_err(|e| ReelError::Decode(e.to_string()))?;
            ClipOutput::Bytes(data)
        } else if let Some(uri) = video.gcs_uri.as_ref().or(video.uri.as_ref()) {
            ClipOutput::Remote(uri.clone())
        } else {
            return Err(ReelError::EmptyResult(
                "video carries neither inline bytes nor a storage pointer".into(),
            ));
        };

        Ok(ClipStatus::Complete(GeneratedClip {
            output,
            mime_type: video
                .mime_type
                .clone()
                .unwrap_or_else(|| "video/mp4".to_string()),
            metadata: ClipMetadata {
                model: Some(self.model.as_str().to_string()),
                duration_secs: None,
                resolution: None,
            },
        }))
    }
}

#[async_trait]
impl ClipGenerator for VeoClient {
    async fn submit(&self, request: &ClipRequest) -> Result<ClipOperation> {
        request.validate()?;
        let body = VertexRequest::from_clip_request(request);

        tracing::debug!(model = self.model.as_str(), "submitting clip generation");
        let response = self
            .post_json(&self.model_url("predictLongRunning"), &body)
            .await?;

        let submit: VertexSubmitResponse = response.json().await?;
        if submit.name.is_empty() {
            return Err(ReelError::EmptyResult(
                "service returned no operation name".into(),
            ));
        }
        Ok(ClipOperation { name: submit.name })
    }

    async fn poll(&self, operation: &ClipOperation) -> Result<ClipStatus> {
        let body = VertexFetchOperationRequest {
            operation_name: operation.name.clone(),
        };
        let response = self
            .post_json(&self.model_url("fetchPredictOperation"), &body)
            .await?;

        let op: VeoOperationResponse = response.json().await?;
        if !op.done {
            return Ok(ClipStatus::Pending);
        }
        if let Some(error) = op.error {
            return Ok(ClipStatus::Failed(error.message));
        }
        self.clip_from_videos(&op)
    }

    fn name(&self) -> &str {
        "veo"
    }
}

// Wire format

#[derive(Debug, Serialize)]
struct VertexRequest {
    instances: Vec<VertexInstance>,
    parameters: VertexParameters,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VertexInstance {
    prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<VertexMedia>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VertexMedia {
    bytes_base64_encoded: String,
    mime_type: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VertexParameters {
    sample_count: u32,
    duration_seconds: u32,
    aspect_ratio: String,
    resolution: String,
    generate_audio: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_frame: Option<VertexMedia>,
    #[serde(skip_serializing_if = "Option::is_none")]
    storage_uri: Option<String>,
}

impl VertexRequest {
    fn from_clip_request(req: &ClipRequest) -> Self {
        let encode = |frame: &crate::video::types::FrameRef| VertexMedia {
            bytes_base64_encoded: base64::engine::general_purpose::STANDARD.encode(&frame.data),
            mime_type: frame.mime_type.clone(),
        };

        Self {
            instances: vec![VertexInstance {
                prompt: req.prompt.clone(),
                image: req.first_frame.as_ref().map(encode),
            }],
            parameters: VertexParameters {
                sample_count: 1,
                duration_seconds: req.duration_secs,
                aspect_ratio: req.aspect_ratio.as_str().to_string(),
                resolution: req.resolution.clone(),
                generate_audio: req.generate_audio,
                last_frame: req.last_frame.as_ref().map(encode),
                storage_uri: req.storage_uri.clone(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VertexFetchOperationRequest {
    operation_name: String,
}

#[derive(Debug, Deserialize)]
struct VertexSubmitResponse {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct VeoOperationResponse {
    #[serde(default)]
    #[allow(dead_code)]
    name: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    response: Option<VeoInnerResponse>,
    #[serde(default)]
    error: Option<VeoOperationError>,
}

#[derive(Debug, Deserialize)]
struct VeoInnerResponse {
    #[serde(default)]
    videos: Vec<VeoVideo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VeoVideo {
    #[serde(default)]
    bytes_base64_encoded: Option<String>,
    #[serde(default)]
    gcs_uri: Option<String>,
    #[serde(default)]
    uri: Option<String>,
    #[serde(default)]
    mime_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VeoOperationError {
    #[serde(default)]
    message: String,
}
