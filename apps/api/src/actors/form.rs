//! Multipart form parsing for actor create and update requests.

use axum::extract::multipart::{Field, Multipart, MultipartError};
use bytes::Bytes;

use crate::errors::AppError;
use crate::media::extension_for;

/// An uploaded image with its file extension.
#[derive(Debug)]
pub struct UploadedImage {
    pub bytes: Bytes,
    pub content_type: String,
    pub extension: &'static str,
}

#[derive(Debug, Default)]
pub struct ActorCreateForm {
    pub name: String,
    pub description: String,
    pub auto_generate_image: bool,
    pub images: Vec<UploadedImage>,
}

#[derive(Debug, Default)]
pub struct ActorUpdateForm {
    pub description: Option<String>,
    pub prompt_hint: Option<String>,
    pub feedback_notes: Option<String>,
    pub new_image: Option<UploadedImage>,
}

fn bad_form(e: MultipartError) -> AppError {
    AppError::Validation(format!("Invalid multipart form: {e}"))
}

async fn read_text(field: Field<'_>) -> Result<String, AppError> {
    field.text().await.map_err(bad_form)
}

/// Reads an image field; empty parts (no file chosen) yield `None`.
async fn read_image(field: Field<'_>) -> Result<Option<UploadedImage>, AppError> {
    let content_type = field.content_type().unwrap_or_default().to_string();
    let file_name = field.file_name().unwrap_or_default().to_string();
    let bytes = field.bytes().await.map_err(bad_form)?;
    if bytes.is_empty() {
        return Ok(None);
    }
    let extension = extension_for(&content_type).ok_or_else(|| {
        AppError::Validation(format!(
            "File '{file_name}' is not a supported image ({content_type})"
        ))
    })?;
    Ok(Some(UploadedImage {
        bytes,
        content_type,
        extension,
    }))
}

pub async fn parse_create_form(mut multipart: Multipart) -> Result<ActorCreateForm, AppError> {
    let mut form = ActorCreateForm::default();

    while let Some(field) = multipart.next_field().await.map_err(bad_form)? {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "name" => form.name = read_text(field).await?.trim().to_string(),
            "description" => form.description = read_text(field).await?,
            "auto_generate_image" => {
                form.auto_generate_image = read_text(field).await?.trim() == "true"
            }
            "images" | "images[]" => {
                if let Some(image) = read_image(field).await? {
                    form.images.push(image);
                }
            }
            _ => {}
        }
    }

    if form.name.is_empty() {
        return Err(AppError::Validation("name is required".to_string()));
    }
    Ok(form)
}

pub async fn parse_update_form(mut multipart: Multipart) -> Result<ActorUpdateForm, AppError> {
    let mut form = ActorUpdateForm::default();

    while let Some(field) = multipart.next_field().await.map_err(bad_form)? {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "description" => form.description = Some(read_text(field).await?),
            "prompt_hint" => form.prompt_hint = Some(read_text(field).await?),
            "feedback_notes" => form.feedback_notes = Some(read_text(field).await?),
            "new_image" => form.new_image = read_image(field).await?,
            _ => {}
        }
    }
    Ok(form)
}
