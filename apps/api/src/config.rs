use anyhow::{Context, Result};

use crate::imaging::ImageModel;

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_STABILITY_BASE_URL: &str = "https://api.stability.ai";
const DEFAULT_STABLE_DIFFUSION_ENGINE: &str = "stable-diffusion-xl-1024-v1-0";
const DEFAULT_CORS_ORIGINS: &str =
    "http://localhost:3000,http://127.0.0.1:3000,http://localhost:8000,http://127.0.0.1:8000";

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub aws_region: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub default_image_model: ImageModel,
    pub stability_api_key: Option<String>,
    pub stability_base_url: String,
    pub stable_diffusion_engine: String,
    pub cors_allowed_origins: Vec<String>,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let default_image_model = optional_env("DEFAULT_IMAGE_MODEL")
            .map(|m| m.parse::<ImageModel>())
            .transpose()
            .context("DEFAULT_IMAGE_MODEL must be 'dalle' or 'stable_diffusion'")?
            .unwrap_or_default();

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            s3_bucket: require_env("S3_BUCKET")?,
            s3_endpoint: require_env("S3_ENDPOINT")?,
            aws_region: optional_env("AWS_REGION").unwrap_or_else(|| "us-east-1".to_string()),
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            openai_api_key: require_env("OPENAI_API_KEY")?,
            openai_base_url: optional_env("OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            default_image_model,
            stability_api_key: optional_env("STABILITY_API_KEY"),
            stability_base_url: optional_env("STABILITY_BASE_URL")
                .unwrap_or_else(|| DEFAULT_STABILITY_BASE_URL.to_string()),
            stable_diffusion_engine: optional_env("STABLE_DIFFUSION_ENGINE")
                .unwrap_or_else(|| DEFAULT_STABLE_DIFFUSION_ENGINE.to_string()),
            cors_allowed_origins: parse_origins(
                &optional_env("CORS_ALLOWED_ORIGINS")
                    .unwrap_or_else(|| DEFAULT_CORS_ORIGINS.to_string()),
            ),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Database location safe for logs: credentials are stripped.
    pub fn database_host(&self) -> &str {
        redact_url(&self.database_url)
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(String::from)
        .collect()
}

/// Returns the host part of a connection URL when it carries credentials,
/// or the URL unchanged otherwise.
fn redact_url(url: &str) -> &str {
    match url.rsplit_once('@') {
        Some((_, host)) => host.split('/').next().unwrap_or(host),
        None => url,
    }
}
