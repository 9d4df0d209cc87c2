use sqlx::PgPool;

use crate::imaging::ImageGenerators;
use crate::llm_client::LlmClient;
use crate::media::MediaStore;
use crate::realtime::Broadcaster;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// Bucket holding generated images, actor photos and exports.
    pub media: MediaStore,
    pub llm: LlmClient,
    /// Image backends keyed by model; the default comes from `DEFAULT_IMAGE_MODEL`.
    pub images: ImageGenerators,
    pub broadcaster: Broadcaster,
}
