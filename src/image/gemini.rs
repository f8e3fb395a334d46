//! Gemini image client: keyframe composition with reference parts.
//!
//! Uses `generateContent` on the Vertex publisher-model endpoint. Reference
//! assets come first in the part list, then the prior keyframe, then the
//! prompt text, matching the order the model weighs them.

use crate::auth::TokenProvider;
use crate::config::VertexConfig;
use crate::error::{ReelError, Result};
use crate::image::generator::KeyframeGenerator;
use crate::image::types::{GeneratedImage, ImageMetadata, KeyframeRequest};
use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// Gemini image model variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GeminiImageModel {
    /// Gemini 3 Pro Image — the reference-composition model.
    #[default]
    Gemini3ProImage,
}

impl GeminiImageModel {
    /// Returns the API model identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gemini3ProImage => "gemini-3-pro-image-preview",
        }
    }
}

/// Client for the Gemini image model.
pub struct GeminiImageClient {
    client: reqwest::Client,
    tokens: Arc<TokenProvider>,
    project: String,
    location: String,
    model: GeminiImageModel,
}

impl GeminiImageClient {
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
            model: GeminiImageModel::default(),
        }
    }

    /// Overrides the model variant.
    pub fn with_model(mut self, model: GeminiImageModel) -> Self {
        self.model = model;
        self
    }

    fn url(&self) -> String {
        format!(
            "{}/v1/projects/{}/locations/{}/publishers/google/models/{}:generateContent",
            VertexConfig::endpoint(&self.location),
            self.project,
            self.location,
            self.model.as_str(),
        )
    }

    async fn generate_impl(&self, request: &KeyframeRequest) -> Result<GeneratedImage> {
        request.validate()?;
        let start = Instant::now();

        let body = GeminiRequest::from_keyframe_request(request);
        let token = self.tokens.token().await?;

        let response = self
            .client
            .post(self.url())
            .bearer_auth(&token)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(parse_error(status.as_u16(), &text));
        }

        let gemini_response: GeminiResponse = response.json().await?;

        // Blocked prompts come back as HTTP 200 with feedback.
        if let Some(ref feedback) = gemini_response.prompt_feedback {
            if let Some(ref reason) = feedback.block_reason {
                let msg = feedback
                    .block_reason_message
                    .clone()
                    .unwrap_or_else(|| format!("prompt blocked: {reason}"));
                return Err(ReelError::ContentBlocked(msg));
            }
        }

        let candidate = gemini_response
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| ReelError::EmptyResult("no candidates in response".into()))?;

        if let Some(ref finish_reason) = candidate.finish_reason {
            match finish_reason.as_str() {
                "SAFETY" | "IMAGE_SAFETY" | "PROHIBITED_CONTENT" | "RECITATION" | "BLOCKLIST" => {
                    return Err(ReelError::ContentBlocked(format!(
                        "blocked by safety filter: {finish_reason}"
                    )));
                }
                _ => {}
            }
        }

        let inline_data = candidate
            .content
            .map(|c| c.parts)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|p| p.inline_data)
            .find(|d| d.mime_type.starts_with("image/"))
            .ok_or_else(|| ReelError::EmptyResult("no image data in response".into()))?;

        let data = base64::engine::general_purpose::STANDARD
            .decode(&inline_data.data)
            .map_err(|e| ReelError::Decode(e.to_string()))?;

        let metadata = ImageMetadata {
            model: Some(self.model.as_str().to_string()),
            duration_ms: Some(start.elapsed().as_millis() as u64),
        };
        GeneratedImage::from_bytes(data, request.aspect_ratio, metadata)
    }
}

#[async_trait]
impl KeyframeGenerator for GeminiImageClient {
    async fn generate(&self, request: &KeyframeRequest) -> Result<GeneratedImage> {
        self.generate_impl(request).await
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

fn parse_error(status: u16, text: &str) -> ReelError {
    if status == 401 || status == 403 {
        return ReelError::Auth(text.to_string());
    }
    let lower = text.to_lowercase();
    if lower.contains("safety") || lower.contains("blocked") || lower.contains("prohibited") {
        return ReelError::ContentBlocked(text.to_string());
    }
    ReelError::Api {
        status,
        message: text.to_string(),
    }
}

// Wire format

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    generation_config: GeminiConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    role: &'static str,
    parts: Vec<GeminiRequestPart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum GeminiRequestPart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: GeminiInlineData,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiInlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiConfig {
    response_modalities: Vec<String>,
    image_config: GeminiImageConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiImageConfig {
    aspect_ratio: String,
}

impl GeminiRequest {
    fn from_keyframe_request(req: &KeyframeRequest) -> Self {
        let mut parts = Vec::new();

        for asset in &req.reference_assets {
            parts.push(GeminiRequestPart::InlineData {
                inline_data: GeminiInlineData {
                    mime_type: asset.mime_type.clone(),
                    data: base64::engine::general_purpose::STANDARD.encode(&asset.data),
                },
            });
        }

        if let Some(ref prior) = req.prior_frame {
            parts.push(GeminiRequestPart::InlineData {
                inline_data: GeminiInlineData {
                    mime_type: crate::image::ImageFormat::mime_or(prior, "image/png"),
                    data: base64::engine::general_purpose::STANDARD.encode(prior),
                },
            });
        }

        parts.push(GeminiRequestPart::Text {
            text: req.prompt.clone(),
        });

        Self {
            contents: vec![GeminiContent { role: "user", parts }],
            generation_config: GeminiConfig {
                response_modalities: vec!["IMAGE".to_string()],
                image_config: GeminiImageConfig {
                    aspect_ratio: req.aspect_ratio.as_str().to_string(),
                },
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContentResponse>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
    #[serde(default)]
    block_reason_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiContentResponse {
    #[serde(default)]
    parts: Vec<GeminiPartResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPartResponse {
    #[serde(default)]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}
