//! Text-to-image generation.
//!
//! Backends implement [`ImageGenerator`]; `AppState` carries an [`ImageGenerators`]
//! registry that resolves a request's model name to a backend.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::RequestBuilder;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::errors::AppError;
use crate::media::{MediaArea, MediaStore};

pub mod dalle;
pub mod handlers;
pub mod prompts;
pub mod records;
pub mod stable_diffusion;

pub use dalle::DalleGenerator;
pub use stable_diffusion::StableDiffusionGenerator;

/// Longest prompt either backend accepts; longer prompts are cut.
pub const MAX_PROMPT_CHARS: usize = 4000;
const MAX_RETRIES: u32 = 3;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid image payload: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("Image API returned no image")]
    EmptyResult,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageModel {
    #[default]
    Dalle,
    StableDiffusion,
}

impl ImageModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageModel::Dalle => "dalle",
            ImageModel::StableDiffusion => "stable_diffusion",
        }
    }
}

impl fmt::Display for ImageModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageModel {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "dalle" => Ok(ImageModel::Dalle),
            "stable_diffusion" => Ok(ImageModel::StableDiffusion),
            other => Err(AppError::Validation(format!("Unsupported model: {other}"))),
        }
    }
}

/// A generated image, ready to be stored.
#[derive(Debug, Clone)]
pub struct GeneratedImage {
    pub bytes: Bytes,
    pub content_type: &'static str,
}

#[async_trait]
pub trait ImageGenerator: Send + Sync {
    fn model(&self) -> ImageModel;

    async fn generate(&self, prompt: &str) -> Result<GeneratedImage, ImageError>;
}

/// Resolves model names to generator backends.
#[derive(Clone)]
pub struct ImageGenerators {
    default_model: ImageModel,
    dalle: Arc<dyn ImageGenerator>,
    stable_diffusion: Option<Arc<dyn ImageGenerator>>,
}

impl ImageGenerators {
    pub fn new(
        default_model: ImageModel,
        dalle: Arc<dyn ImageGenerator>,
        stable_diffusion: Option<Arc<dyn ImageGenerator>>,
    ) -> Self {
        Self {
            default_model,
            dalle,
            stable_diffusion,
        }
    }

    pub fn default_model(&self) -> ImageModel {
        self.default_model
    }

    /// Returns the generator for `model`, or the default generator when `None`.
    pub fn get(&self, model: Option<&str>) -> Result<Arc<dyn ImageGenerator>, AppError> {
        let model = match model {
            Some(name) => name.parse::<ImageModel>()?,
            None => self.default_model,
        };
        self.for_model(model)
    }

    pub fn for_model(&self, model: ImageModel) -> Result<Arc<dyn ImageGenerator>, AppError> {
        match model {
            ImageModel::Dalle => Ok(self.dalle.clone()),
            ImageModel::StableDiffusion => self.stable_diffusion.clone().ok_or_else(|| {
                AppError::Validation(
                    "Stable Diffusion is not configured (set STABILITY_API_KEY)".to_string(),
                )
            }),
        }
    }

    pub fn default_generator(&self) -> Result<Arc<dyn ImageGenerator>, AppError> {
        self.for_model(self.default_model)
    }
}

/// Generates an image for `prompt` and stores it as `{file_stem}.png` under `area`.
/// Returns the bucket key.
pub async fn generate_and_store(
    generator: &dyn ImageGenerator,
    media: &MediaStore,
    area: MediaArea,
    file_stem: &str,
    prompt: &str,
) -> Result<String, AppError> {
    let image = generator.generate(prompt).await.map_err(|e| {
        AppError::ImageGeneration(format!("{} generation failed: {e}", generator.model()))
    })?;
    media
        .put_image(area, &format!("{file_stem}.png"), image.bytes, image.content_type)
        .await
}

/// Cuts a prompt to [`MAX_PROMPT_CHARS`] characters, on a char boundary.
pub fn truncate_prompt(prompt: &str) -> &str {
    match prompt.char_indices().nth(MAX_PROMPT_CHARS) {
        Some((idx, _)) => {
            warn!(
                "Prompt exceeds {MAX_PROMPT_CHARS} characters ({} chars). Truncating.",
                prompt.chars().count()
            );
            &prompt[..idx]
        }
        None => prompt,
    }
}

/// Sends a request built by `build`, retrying 429 and 5xx responses with
/// exponential backoff. Other non-success statuses are returned as `ImageError::Api`.
async fn send_with_retry(
    build: impl Fn() -> RequestBuilder,
    max_retries: u32,
) -> Result<reqwest::Response, ImageError> {
    let mut last_error: Option<ImageError> = None;

    for attempt in 0..max_retries.max(1) {
        if attempt > 0 {
            let delay = Duration::from_millis(1000 * (1 << (attempt - 1)));
            warn!(
                "Image API attempt {} failed, retrying after {}ms...",
                attempt,
                delay.as_millis()
            );
            tokio::time::sleep(delay).await;
        }

        let response = match build().send().await {
            Ok(r) => r,
            Err(e) => {
                last_error = Some(ImageError::Http(e));
                continue;
            }
        };

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let error = ImageError::Api {
            status: status.as_u16(),
            message: api_error_message(&body),
        };
        if status.as_u16() == 429 || status.is_server_error() {
            warn!("Image API returned {}: {}", status, body);
            last_error = Some(error);
            continue;
        }
        return Err(error);
    }

    Err(last_error.unwrap_or(ImageError::EmptyResult))
}

/// Pulls a human-readable message out of an image API error body.
fn api_error_message(body: &str) -> String {
    let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();
    parsed
        .as_ref()
        .and_then(|v| {
            v.pointer("/error/message")
                .or_else(|| v.get("message"))
                .and_then(|m| m.as_str())
        })
        .map(String::from)
        .unwrap_or_else(|| body.to_string())
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingGenerator;
    use super::*;

    fn registry(with_sd: bool) -> ImageGenerators {
        let sd: Option<Arc<dyn ImageGenerator>> = if with_sd {
            Some(Arc::new(RecordingGenerator::new(ImageModel::StableDiffusion)))
        } else {
            None
        };
        ImageGenerators::new(
            ImageModel::Dalle,
            Arc::new(RecordingGenerator::new(ImageModel::Dalle)),
            sd,
        )
    }

    #[test]
    fn test_model_names_round_trip_through_from_str() {
        assert_eq!("dalle".parse::<ImageModel>().unwrap(), ImageModel::Dalle);
        assert_eq!(
            "stable_diffusion".parse::<ImageModel>().unwrap(),
            ImageModel::StableDiffusion
        );
        assert_eq!(ImageModel::StableDiffusion.to_string(), "stable_diffusion");
    }

    #[test]
    fn test_unknown_model_is_validation_error() {
        let err = "midjourney".parse::<ImageModel>().unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg.contains("midjourney")));
    }

    #[test]
    fn test_registry_defaults_when_model_missing() {
        let generators = registry(true);
        assert_eq!(generators.get(None).unwrap().model(), ImageModel::Dalle);
        assert_eq!(
            generators.get(Some("stable_diffusion")).unwrap().model(),
            ImageModel::StableDiffusion
        );
    }

    #[test]
    fn test_registry_rejects_unconfigured_stable_diffusion() {
        let generators = registry(false);
        assert!(matches!(
            generators.get(Some("stable_diffusion")),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_truncate_prompt_limits_chars() {
        let long = "é".repeat(MAX_PROMPT_CHARS + 10);
        assert_eq!(truncate_prompt(&long).chars().count(), MAX_PROMPT_CHARS);
        assert_eq!(truncate_prompt("short"), "short");
    }

    #[test]
    fn test_api_error_message_extraction() {
        assert_eq!(
            api_error_message(r#"{"error": {"message": "content policy"}}"#),
            "content policy"
        );
        assert_eq!(
            api_error_message(r#"{"name": "bad_request", "message": "invalid engine"}"#),
            "invalid engine"
        );
        assert_eq!(api_error_message("plain failure"), "plain failure");
    }
}
