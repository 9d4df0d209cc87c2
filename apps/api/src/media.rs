//! Object storage for generated images, actor photos and exports.
//!
//! Every stored image lives under an area prefix in the bucket and is served
//! back by the API under the matching public route.

use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use axum::{
    body::Body,
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaArea {
    /// Images from the `/api/images` endpoints.
    Generated,
    Actor,
    /// Project frames and feedback revisions.
    Frame,
}

impl MediaArea {
    pub fn prefix(&self) -> &'static str {
        match self {
            MediaArea::Generated => "generated_images",
            MediaArea::Actor => "actor_images",
            MediaArea::Frame => "frame_images",
        }
    }

    pub fn route(&self) -> &'static str {
        match self {
            MediaArea::Generated => "/images",
            MediaArea::Actor => "/actor-images",
            MediaArea::Frame => "/frame-images",
        }
    }

    pub fn key(&self, file_name: &str) -> String {
        format!("{}/{}", self.prefix(), file_name)
    }

    pub fn public_url(&self, file_name: &str) -> String {
        format!("{}/{}", self.route(), file_name)
    }

    /// Maps a bucket key back to its public URL, if it lives in a known area.
    pub fn url_for_key(key: &str) -> Option<String> {
        let (prefix, file_name) = key.split_once('/')?;
        [MediaArea::Generated, MediaArea::Actor, MediaArea::Frame]
            .into_iter()
            .find(|area| area.prefix() == prefix)
            .map(|area| area.public_url(file_name))
    }

    /// Maps a public URL back to its bucket key.
    pub fn key_for_url(url: &str) -> Option<String> {
        [MediaArea::Generated, MediaArea::Actor, MediaArea::Frame]
            .into_iter()
            .find_map(|area| {
                url.strip_prefix(area.route())
                    .and_then(|rest| rest.strip_prefix('/'))
                    .filter(|file| is_safe_file_name(file))
                    .map(|file| area.key(file))
            })
    }
}

/// A stored object with its content type.
#[derive(Debug)]
pub struct StoredObject {
    pub bytes: Bytes,
    pub content_type: String,
}

/// Thin wrapper over the S3 client bound to the application bucket.
#[derive(Clone)]
pub struct MediaStore {
    client: S3Client,
    bucket: String,
}

impl MediaStore {
    pub fn new(client: S3Client, bucket: String) -> Self {
        Self { client, bucket }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Stores an image under `area`, returning its bucket key.
    pub async fn put_image(
        &self,
        area: MediaArea,
        file_name: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<String, AppError> {
        let key = area.key(file_name);
        self.put(&key, bytes, content_type).await?;
        Ok(key)
    }

    pub async fn put_text(
        &self,
        key: &str,
        body: String,
        content_type: &str,
    ) -> Result<(), AppError> {
        self.put(key, Bytes::from(body), content_type).await
    }

    pub async fn put(&self, key: &str, bytes: Bytes, content_type: &str) -> Result<(), AppError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| {
                AppError::Storage(format!("Failed to upload {key}: {}", DisplayErrorContext(e)))
            })?;

        info!("Uploaded s3://{}/{}", self.bucket, key);
        Ok(())
    }

    /// Fetches an object; `None` when the key does not exist.
    pub async fn get(&self, key: &str) -> Result<Option<StoredObject>, AppError> {
        let output = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(output) => output,
            Err(e) => {
                if e.as_service_error().is_some_and(|se| se.is_no_such_key()) {
                    return Ok(None);
                }
                return Err(AppError::Storage(format!(
                    "Failed to fetch {key}: {}",
                    DisplayErrorContext(e)
                )));
            }
        };

        let content_type = output
            .content_type()
            .map(String::from)
            .unwrap_or_else(|| content_type_for(key).to_string());
        let bytes = output
            .body
            .collect()
            .await
            .map_err(|e| AppError::Storage(format!("Failed to read {key}: {e}")))?
            .into_bytes();

        Ok(Some(StoredObject {
            bytes,
            content_type,
        }))
    }

    pub async fn exists(&self, key: &str) -> Result<bool, AppError> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if e.as_service_error().is_some_and(|se| se.is_not_found()) => Ok(false),
            Err(e) => Err(AppError::Storage(format!(
                "Failed to stat {key}: {}",
                DisplayErrorContext(e)
            ))),
        }
    }

    pub async fn copy(&self, source_key: &str, target_key: &str) -> Result<(), AppError> {
        self.client
            .copy_object()
            .bucket(&self.bucket)
            .copy_source(format!("{}/{}", self.bucket, source_key))
            .key(target_key)
            .send()
            .await
            .map_err(|e| {
                AppError::Storage(format!(
                    "Failed to copy {source_key} to {target_key}: {}",
                    DisplayErrorContext(e)
                ))
            })?;
        Ok(())
    }

    pub async fn delete(&self, key: &str) -> Result<(), AppError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                AppError::Storage(format!("Failed to delete {key}: {}", DisplayErrorContext(e)))
            })?;
        info!("Deleted s3://{}/{}", self.bucket, key);
        Ok(())
    }

    /// Creates the bucket when it does not exist. Returns `true` when it was created.
    pub async fn ensure_bucket(&self) -> Result<bool, AppError> {
        if self
            .client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .is_ok()
        {
            return Ok(false);
        }

        self.client
            .create_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(|e| {
                AppError::Storage(format!(
                    "Failed to create bucket {}: {}",
                    self.bucket,
                    DisplayErrorContext(e)
                ))
            })?;
        info!("Created bucket {}", self.bucket);
        Ok(true)
    }
}

/// Rejects names that could escape the area prefix.
fn is_safe_file_name(name: &str) -> bool {
    !name.is_empty() && !name.contains('/') && !name.contains('\\') && !name.contains("..")
}

/// Guesses a content type from a file extension.
pub fn content_type_for(name: &str) -> &'static str {
    let ext = name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "html" => "text/html; charset=utf-8",
        _ => "application/octet-stream",
    }
}

/// File extension for an uploaded image content type.
pub fn extension_for(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/png" => Some("png"),
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

// ────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────

async fn serve(state: &AppState, area: MediaArea, file_name: &str) -> Result<Response, AppError> {
    if !is_safe_file_name(file_name) {
        return Err(AppError::Validation(format!("Invalid file name: {file_name}")));
    }
    let object = state
        .media
        .get(&area.key(file_name))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Image '{file_name}' not found")))?;

    Ok((
        [(header::CONTENT_TYPE, object.content_type)],
        Body::from(object.bytes),
    )
        .into_response())
}

/// GET /images/:file
pub async fn handle_generated_image(
    State(state): State<AppState>,
    Path(file): Path<String>,
) -> Result<Response, AppError> {
    serve(&state, MediaArea::Generated, &file).await
}

/// GET /actor-images/:file
pub async fn handle_actor_image(
    State(state): State<AppState>,
    Path(file): Path<String>,
) -> Result<Response, AppError> {
    serve(&state, MediaArea::Actor, &file).await
}

/// GET /frame-images/:file
pub async fn handle_frame_image(
    State(state): State<AppState>,
    Path(file): Path<String>,
) -> Result<Response, AppError> {
    serve(&state, MediaArea::Frame, &file).await
}

#[derive(Debug, Deserialize)]
pub struct InitializeRequest {
    #[serde(default = "default_true")]
    pub ensure_directories: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Serialize)]
pub struct InitializeResponse {
    pub status: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<bool>,
}

/// POST /initialize and POST /api/initialize
pub async fn handle_initialize(
    State(state): State<AppState>,
    body: Option<Json<InitializeRequest>>,
) -> Result<Json<InitializeResponse>, AppError> {
    let ensure = body.map(|Json(b)| b.ensure_directories).unwrap_or(true);
    if !ensure {
        return Ok(Json(InitializeResponse {
            status: "ok",
            message: "Initialization skipped".to_string(),
            created: None,
        }));
    }

    match state.media.ensure_bucket().await {
        Ok(created) => Ok(Json(InitializeResponse {
            status: "ok",
            message: format!("Storage bucket '{}' is ready", state.media.bucket()),
            created: Some(created),
        })),
        Err(e) => {
            warn!("Initialization failed: {e}");
            Err(e)
        }
    }
}
