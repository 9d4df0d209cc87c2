//! DALL-E 3 backend over the OpenAI images API.

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

const DALLE_MODEL: &str = "dall-e-3";
const IMAGE_SIZE: &str = "1024x1024";

#[derive(Debug, Serialize)]
struct ImagesRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u32,
    size: &'a str,
    quality: &'a str,
    response_format: &'a str,
}

#[derive(Debug, Deserialize)]
struct ImagesResponse {
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    b64_json: Option<String>,
}

pub struct DalleGenerator {
    client: Client,
    api_key: String,
    base_url: String,
    max_retries: u32,
}

impl DalleGenerator {
    pub fn new(api_key: String, base_url: &str) -> Result<Self, ImageError> {
        Ok(Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .build()?,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_retries: MAX_RETRIES,
        })
    }
}

#[async_trait]
impl ImageGenerator for DalleGenerator {
    fn model(&self) -> ImageModel {
        ImageModel::Dalle
    }

    async fn generate(&self, prompt: &str) -> Result<GeneratedImage, ImageError> {
        let prompt = truncate_prompt(prompt);
        info!("Generating DALL-E image ({} chars)", prompt.len());

        let body = ImagesRequest {
            model: DALLE_MODEL,
            prompt,
            n: 1,
            size: IMAGE_SIZE,
            quality: "standard",
            response_format: "b64_json",
        };
        let url = format!("{}/images/generations", self.base_url);

        let response = send_with_retry(
            || {
                self.client
                    .post(&url)
                    .bearer_auth(&self.api_key)
                    .json(&body)
            },
            self.max_retries,
        )
        .await?;

        let parsed: ImagesResponse = response.json().await?;
        let encoded = parsed
            .data
            .into_iter()
            .find_map(|d| d.b64_json)
            .ok_or(ImageError::EmptyResult)?;

        Ok(GeneratedImage {
            bytes: Bytes::from(STANDARD.decode(encoded)?),
            content_type: "image/png",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_generate_decodes_b64_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/images/generations"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({
                "model": "dall-e-3",
                "prompt": "a lighthouse at dusk",
                "n": 1,
                "size": "1024x1024",
                "response_format": "b64_json"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"b64_json": STANDARD.encode(b"png-bytes")}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let generator = DalleGenerator::new("sk-test".into(), &server.uri()).unwrap();
        let image = generator.generate("a lighthouse at dusk").await.unwrap();
        assert_eq!(&image.bytes[..], b"png-bytes");
        assert_eq!(image.content_type, "image/png");
    }

    #[tokio::test]
    async fn test_content_policy_rejection_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/images/generations"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {"message": "Your request was rejected by the safety system."}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let generator = DalleGenerator::new("sk-test".into(), &server.uri()).unwrap();
        let err = generator.generate("anything").await.unwrap_err();
        assert!(matches!(
            err,
            ImageError::Api { status: 400, ref message } if message.contains("safety")
        ));
    }

    #[tokio::test]
    async fn test_missing_image_data_is_empty_result() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/images/generations"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
            .mount(&server)
            .await;

        let generator = DalleGenerator::new("sk-test".into(), &server.uri()).unwrap();
        assert!(matches!(
            generator.generate("x").await,
            Err(ImageError::EmptyResult)
        ));
    }
}
