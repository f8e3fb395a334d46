//! Imagen client: text-to-image and subject-reference editing.
//!
//! Both operations go through `:predict` on the Vertex publisher-model
//! endpoint. The edit path conditions on a subject reference image that the
//! prompt must address by its `[1]` label.

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

/// Imagen model variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ImagenModel {
    /// Imagen 3 text-to-image.
    #[default]
    Generate,
    /// Imagen 3 capability model (reference-conditioned editing).
    Capability,
}

impl ImagenModel {
    /// Returns the API model identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Generate => "imagen-3.0-generate-002",
            Self::Capability => "imagen-3.0-capability-001",
        }
    }
}

/// Client for the Imagen models.
#[derive(Clone)]
pub struct ImagenClient {
    client: reqwest::Client,
    tokens: Arc<TokenProvider>,
    project: String,
    location: String,
}

impl ImagenClient {
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
        }
    }

    fn url(&self, model: ImagenModel) -> String {
        format!(
            "{}/v1/projects/{}/locations/{}/publishers/google/models/{}:predict",
            VertexConfig::endpoint(&self.location),
            self.project,
            self.location,
            model.as_str(),
        )
    }

    /// Plain text-to-image generation. The prior frame and reference assets
    /// on the request are ignored; this is the unconditioned path.
    pub async fn generate(&self, request: &KeyframeRequest) -> Result<GeneratedImage> {
        request.validate()?;
        let body = ImagenPredictRequest::generate(request);
        self.predict(ImagenModel::Generate, &body, request).await
    }

    /// Reference-conditioned edit using the prior frame as the subject
    /// reference. Fails with `InvalidRequest` when the request carries no
    /// prior frame or subject descriptor.
    pub async fn edit_with_subject(&self, request: &KeyframeRequest) -> Result<GeneratedImage> {
        request.validate()?;
        let body = ImagenPredictRequest::edit(request)?;
        self.predict(ImagenModel::Capability, &body, request).await
    }

    async fn predict(
        &self,
        model: ImagenModel,
        body: &ImagenPredictRequest,
        request: &KeyframeRequest,
    ) -> Result<GeneratedImage> {
        let start = Instant::now();
        let token = self.tokens.token().await?;

        let response = self
            .client
            .post(self.url(model))
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
            return Err(ReelError::Api {
                status: status.as_u16(),
                message: text,
            });
        }

        let predict_response: ImagenPredictResponse = response.json().await?;
        let prediction = predict_response
            .predictions
            .into_iter()
            .next()
            .ok_or_else(|| ReelError::EmptyResult("no predictions in response".into()))?;

        let b64 = prediction
            .bytes_base64_encoded
            .ok_or_else(|| ReelError::EmptyResult("prediction carries no image bytes".into()))?;
        let data = base64::engine::general_purpose::STANDARD
            .decode(&b64)
            .map_err(|e| ReelError::Decode(e.to_string()))?;

        let metadata = ImageMetadata {
            model: Some(model.as_str().to_string()),
            duration_ms: Some(start.elapsed().as_millis() as u64),
        };
        GeneratedImage::from_bytes(data, request.aspect_ratio, metadata)
    }
}

/// [`KeyframeGenerator`] adapter for the unconditioned text-to-image path.
#[derive(Clone)]
pub struct ImagenTextToImage(pub ImagenClient);

#[async_trait]
impl KeyframeGenerator for ImagenTextToImage {
    async fn generate(&self, request: &KeyframeRequest) -> Result<GeneratedImage> {
        self.0.generate(request).await
    }

    fn name(&self) -> &str {
        "imagen-generate"
    }
}

/// [`KeyframeGenerator`] adapter for the subject-reference edit path.
#[derive(Clone)]
pub struct ImagenSubjectEdit(pub ImagenClient);

#[async_trait]
impl KeyframeGenerator for ImagenSubjectEdit {
    async fn generate(&self, request: &KeyframeRequest) -> Result<GeneratedImage> {
        self.0.edit_with_subject(request).await
    }

    fn name(&self) -> &str {
        "imagen-edit"
    }
}

// Wire format

#[derive(Debug, Serialize)]
struct ImagenPredictRequest {
    instances: Vec<ImagenInstance>,
    parameters: ImagenParameters,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImagenInstance {
    prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    reference_images: Option<Vec<ImagenReferenceImage>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImagenReferenceImage {
    reference_type: &'static str,
    reference_id: u32,
    reference_image: ImagenImage,
    subject_image_config: ImagenSubjectConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImagenImage {
    bytes_base64_encoded: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImagenSubjectConfig {
    subject_description: String,
    subject_type: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImagenParameters {
    sample_count: u32,
    aspect_ratio: String,
    person_generation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    edit_mode: Option<&'static str>,
}

impl ImagenPredictRequest {
    fn generate(req: &KeyframeRequest) -> Self {
        Self {
            instances: vec![ImagenInstance {
                prompt: req.prompt.clone(),
                reference_images: None,
            }],
            parameters: ImagenParameters {
                sample_count: 1,
                aspect_ratio: req.aspect_ratio.as_str().to_string(),
                person_generation: req.person_generation.as_str().to_string(),
                edit_mode: None,
            },
        }
    }

    fn edit(req: &KeyframeRequest) -> Result<Self> {
        let prior = req.prior_frame.as_ref().ok_or_else(|| {
            ReelError::InvalidRequest("subject edit requires a prior frame".into())
        })?;
        let subject = req.subject.as_ref().ok_or_else(|| {
            ReelError::InvalidRequest("subject edit requires a subject descriptor".into())
        })?;

        Ok(Self {
            instances: vec![ImagenInstance {
                prompt: req.prompt.clone(),
                reference_images: Some(vec![ImagenReferenceImage {
                    reference_type: "REFERENCE_TYPE_SUBJECT",
                    reference_id: 1,
                    reference_image: ImagenImage {
                        bytes_base64_encoded: base64::engine::general_purpose::STANDARD
                            .encode(prior),
                    },
                    subject_image_config: ImagenSubjectConfig {
                        subject_description: subject.description.clone(),
                        subject_type: subject.subject_type.as_str(),
                    },
                }]),
            }],
            parameters: ImagenParameters {
                sample_count: 1,
                aspect_ratio: req.aspect_ratio.as_str().to_string(),
                person_generation: req.person_generation.as_str().to_string(),
                edit_mode: Some("EDIT_MODE_DEFAULT"),
            },
        })
    }
}

#[derive(Debug, Deserialize)]
struct ImagenPredictResponse {
    #[serde(default)]
    predictions: Vec<ImagenPrediction>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImagenPrediction {
    #[serde(default)]
    bytes_base64_encoded: Option<String>,
    #[serde(default)]
    #[allow(dead_code)]
    mime_type: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::types::{SubjectDescriptor, SubjectType};

    const PNG_MAGIC: [u8; 12] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

    #[test]
    fn test_model_identifiers() {
        assert_eq!(ImagenModel::Generate.as_str(), "imagen-3.0-generate-002");
        assert_eq!(
            ImagenModel::Capability.as_str(),
            "imagen-3.0-capability-001"
        );
    }

    #[test]
    fn test_generate_wire_format() {
        let req = KeyframeRequest::new("person at a desk");
        let wire = ImagenPredictRequest::generate(&req);
        let json = serde_json::to_value(&wire).unwrap();

        assert_eq!(json["instances"][0]["prompt"], "person at a desk");
        assert!(json["instances"][0].get("referenceImages").is_none());
        assert_eq!(json["parameters"]["sampleCount"], 1);
        assert_eq!(json["parameters"]["aspectRatio"], "16:9");
        assert_eq!(json["parameters"]["personGeneration"], "ALLOW_ADULT");
        assert!(json["parameters"].get("editMode").is_none());
    }

    #[test]
    fn test_edit_wire_format() {
        let req = KeyframeRequest::new("the same person [1] now standing")
            .with_prior_frame(PNG_MAGIC.to_vec())
            .with_subject(SubjectDescriptor {
                description: "a person with short dark hair".into(),
                subject_type: SubjectType::Person,
            });
        let wire = ImagenPredictRequest::edit(&req).unwrap();
        let json = serde_json::to_value(&wire).unwrap();

        let reference = &json["instances"][0]["referenceImages"][0];
        assert_eq!(reference["referenceType"], "REFERENCE_TYPE_SUBJECT");
        assert_eq!(reference["referenceId"], 1);
        assert!(reference["referenceImage"]["bytesBase64Encoded"].is_string());
        assert_eq!(
            reference["subjectImageConfig"]["subjectDescription"],
            "a person with short dark hair"
        );
        assert_eq!(
            reference["subjectImageConfig"]["subjectType"],
            "SUBJECT_TYPE_PERSON"
        );
        assert_eq!(json["parameters"]["editMode"], "EDIT_MODE_DEFAULT");
    }

    #[test]
    fn test_edit_requires_prior_frame_and_subject() {
        let bare = KeyframeRequest::new("standing");
        assert!(matches!(
            ImagenPredictRequest::edit(&bare).unwrap_err(),
            ReelError::InvalidRequest(_)
        ));

        let no_subject = KeyframeRequest::new("standing").with_prior_frame(PNG_MAGIC.to_vec());
        assert!(matches!(
            ImagenPredictRequest::edit(&no_subject).unwrap_err(),
            ReelError::InvalidRequest(_)
        ));
    }

    #[test]
    fn test_response_deserialization() {
        let json = r#"{
            "predictions": [
                {"bytesBase64Encoded": "AQID", "mimeType": "image/png"}
            ]
        }"#;
        let resp: ImagenPredictResponse = serde_json::from_str(json).unwrap();
        assert_eq!(
            resp.predictions[0].bytes_base64_encoded.as_deref(),
            Some("AQID")
        );
    }

    #[test]
    fn test_empty_predictions_deserializes() {
        let resp: ImagenPredictResponse = serde_json::from_str("{}").unwrap();
        assert!(resp.predictions.is_empty());
    }
}
