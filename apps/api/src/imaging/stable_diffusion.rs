//! Stable Diffusion backend over the Stability AI REST API.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{
    send_with_retry, truncate_prompt, GeneratedImage, ImageError, ImageGenerator, ImageModel,
    MAX_RETRIES,
};

const INFERENCE_STEPS: u32 = 50;
const GUIDANCE_SCALE: f32 = 7.5;
const IMAGE_EDGE: u32 = 1024;

#[derive(Debug, Serialize)]
struct TextToImageRequest<'a> {
    text_prompts: Vec<TextPrompt<'a>>,
    cfg_scale: f32,
    steps: u32,
    width: u32,
    height: u32,
    samples: u32,
}

#[derive(Debug, Serialize)]
struct TextPrompt<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct TextToImageResponse {
    artifacts: Vec<Artifact>,
}

#[derive(Debug, Deserialize)]
struct Artifact {
    base64: String,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

pub struct StableDiffusionGenerator {
    client: Client,
    api_key: String,
    base_url: String,
    engine: String,
    max_retries: u32,
}

impl StableDiffusionGenerator {
    pub fn new(api_key: String, base_url: &str, engine: &str) -> Result<Self, ImageError> {
        Ok(Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(180))
                .build()?,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            engine: engine.to_string(),
            max_retries: MAX_RETRIES,
        })
    }
}

#[async_trait]
impl ImageGenerator for StableDiffusionGenerator {
    fn model(&self) -> ImageModel {
        ImageModel::StableDiffusion
    }

    async fn generate(&self, prompt: &str) -> Result<GeneratedImage, ImageError> {
        let prompt = truncate_prompt(prompt);
        info!(
            "Generating Stable Diffusion image with engine {} ({} chars)",
            self.engine,
            prompt.len()
        );

        let body = TextToImageRequest {
            text_prompts: vec![TextPrompt { text: prompt }],
            cfg_scale: GUIDANCE_SCALE,
            steps: INFERENCE_STEPS,
            width: IMAGE_EDGE,
            height: IMAGE_EDGE,
            samples: 1,
        };
        let url = format!(
            "{}/v1/generation/{}/text-to-image",
            self.base_url, self.engine
        );

        let response = send_with_retry(
            || {
                self.client
                    .post(&url)
                    .bearer_auth(&self.api_key)
                    .header("accept", "application/json")
                    .json(&body)
            },
            self.max_retries,
        )
        .await?;

        let parsed: TextToImageResponse = response.json().await?;
        let artifact = parsed
            .artifacts
            .into_iter()
            .find(|a| a.finish_reason.as_deref() != Some("ERROR"))
            .ok_or(ImageError::EmptyResult)?;

        Ok(GeneratedImage {
            bytes: Bytes::from(STANDARD.decode(artifact.base64)?),
            content_type: "image/png",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_generate_posts_engine_path_and_decodes_artifact() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/generation/sdxl-test/text-to-image"))
            .and(body_partial_json(json!({
                "text_prompts": [{"text": "a foggy harbour"}],
                "steps": 50,
                "samples": 1
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "artifacts": [{"base64": STANDARD.encode(b"sd-bytes"), "finishReason": "SUCCESS", "seed": 1}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let generator =
            StableDiffusionGenerator::new("sk-stab".into(), &server.uri(), "sdxl-test").unwrap();
        let image = generator.generate("a foggy harbour").await.unwrap();
        assert_eq!(&image.bytes[..], b"sd-bytes");
    }

    #[tokio::test]
    async fn test_errored_artifacts_are_skipped() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/generation/sdxl-test/text-to-image"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "artifacts": [{"base64": "", "finishReason": "ERROR"}]
            })))
            .mount(&server)
            .await;

        let generator =
            StableDiffusionGenerator::new("sk-stab".into(), &server.uri(), "sdxl-test").unwrap();
        assert!(matches!(
            generator.generate("x").await,
            Err(ImageError::EmptyResult)
        ));
    }
}
