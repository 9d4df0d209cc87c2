mod actors;
mod config;
mod db;
mod errors;
mod feedback;
mod film_school;
mod imaging;
mod llm_client;
mod media;
mod models;
mod projects;
mod realtime;
mod routes;
mod script;
mod state;
#[cfg(test)]
mod testing;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use axum::http::{HeaderValue, Method};
use tower_http::{
    cors::{AllowHeaders, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::imaging::{
    DalleGenerator, ImageGenerator, ImageGenerators, ImageModel, StableDiffusionGenerator,
};
use crate::llm_client::LlmClient;
use crate::media::MediaStore;
use crate::realtime::Broadcaster;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting StoryboardAI API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    info!("Database: {}", config.database_host());
    let db = create_pool(&config.database_url).await?;

    // Initialize S3 / MinIO
    let s3 = build_s3_client(&config).await;
    let media = MediaStore::new(s3, config.s3_bucket.clone());
    info!("S3 client initialized (bucket: {})", config.s3_bucket);

    // Initialize LLM client
    let llm = LlmClient::new(config.openai_api_key.clone(), &config.openai_base_url)
        .context("Failed to build LLM client")?;
    info!("LLM client initialized");

    // Initialize image backends
    let images = build_image_generators(&config)?;
    info!("Image generation default model: {}", images.default_model());

    let state = AppState {
        db,
        media,
        llm,
        images,
        broadcaster: Broadcaster::new(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(build_cors(&config.cors_allowed_origins));

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "storyboard-static",
    );

    let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new(config.aws_region.clone()))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    // MinIO serves buckets by path, not by subdomain
    let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
        .force_path_style(true)
        .build();

    aws_sdk_s3::Client::from_conf(s3_config)
}

/// DALL-E is always available; Stable Diffusion only with a Stability key.
fn build_image_generators(config: &Config) -> Result<ImageGenerators> {
    let dalle: Arc<dyn ImageGenerator> = Arc::new(
        DalleGenerator::new(config.openai_api_key.clone(), &config.openai_base_url)
            .context("Failed to build DALL-E client")?,
    );

    let stable_diffusion: Option<Arc<dyn ImageGenerator>> = match &config.stability_api_key {
        Some(key) => Some(Arc::new(
            StableDiffusionGenerator::new(
                key.clone(),
                &config.stability_base_url,
                &config.stable_diffusion_engine,
            )
            .context("Failed to build Stable Diffusion client")?,
        )),
        None => {
            info!("STABILITY_API_KEY not set, Stable Diffusion disabled");
            None
        }
    };

    if stable_diffusion.is_none()
        && config.default_image_model == ImageModel::StableDiffusion
    {
        warn!("DEFAULT_IMAGE_MODEL is stable_diffusion but it is not configured");
    }

    Ok(ImageGenerators::new(
        config.default_image_model,
        dalle,
        stable_diffusion,
    ))
}

fn build_cors(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {origin}");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}
