//! Metadata rows for generated images.

use sqlx::PgPool;

use crate::errors::AppError;
use crate::models::image::{FrameImageRow, StoryboardFrameRow};

/// Fields of a new `frame_images` row.
#[derive(Debug, Default)]
pub struct NewFrameImage<'a> {
    pub image_id: &'a str,
    pub project_id: Option<&'a str>,
    pub prompt: &'a str,
    pub description: Option<&'a str>,
    pub actors: &'a [String],
    pub background: Option<&'a str>,
    pub model: &'a str,
    pub original_frame_id: Option<&'a str>,
    pub s3_key: &'a str,
}

pub async fn insert_image(
    db: &PgPool,
    image_id: &str,
    prompt: &str,
    model: &str,
    s3_key: &str,
) -> Result<(), AppError> {
    sqlx::query("INSERT INTO images (image_id, prompt, model, s3_key) VALUES ($1, $2, $3, $4)")
        .bind(image_id)
        .bind(prompt)
        .bind(model)
        .bind(s3_key)
        .execute(db)
        .await?;
    Ok(())
}

pub async fn insert_character_variant(
    db: &PgPool,
    image_id: &str,
    prompt: &str,
    actor_name: &str,
    variant_aspect: &str,
    model: &str,
    s3_key: &str,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO character_variants (image_id, prompt, actor_name, variant_aspect, model, s3_key)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(image_id)
    .bind(prompt)
    .bind(actor_name)
    .bind(variant_aspect)
    .bind(model)
    .bind(s3_key)
    .execute(db)
    .await?;
    Ok(())
}

/// Inserts a frame image, replacing any previous row with the same id.
pub async fn upsert_frame_image(db: &PgPool, frame: &NewFrameImage<'_>) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO frame_images
            (image_id, project_id, prompt, description, actors, background,
             model, original_frame_id, s3_key)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        ON CONFLICT (image_id) DO UPDATE SET
            project_id = EXCLUDED.project_id,
            prompt = EXCLUDED.prompt,
            description = EXCLUDED.description,
            actors = EXCLUDED.actors,
            background = EXCLUDED.background,
            model = EXCLUDED.model,
            original_frame_id = EXCLUDED.original_frame_id,
            s3_key = EXCLUDED.s3_key,
            created_at = now()
        "#,
    )
    .bind(frame.image_id)
    .bind(frame.project_id)
    .bind(frame.prompt)
    .bind(frame.description)
    .bind(frame.actors)
    .bind(frame.background)
    .bind(frame.model)
    .bind(frame.original_frame_id)
    .bind(frame.s3_key)
    .execute(db)
    .await?;
    Ok(())
}

pub async fn find_frame_image(
    db: &PgPool,
    image_id: &str,
) -> Result<Option<FrameImageRow>, AppError> {
    let row = sqlx::query_as::<_, FrameImageRow>("SELECT * FROM frame_images WHERE image_id = $1")
        .bind(image_id)
        .fetch_optional(db)
        .await?;
    Ok(row)
}

pub async fn insert_storyboard_frame(
    db: &PgPool,
    image_id: &str,
    prompt: &str,
    model: &str,
    frame_number: i32,
    storyboard_id: &str,
    s3_key: &str,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO storyboard_frames (image_id, prompt, model, frame_number, storyboard_id, s3_key)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(image_id)
    .bind(prompt)
    .bind(model)
    .bind(frame_number)
    .bind(storyboard_id)
    .bind(s3_key)
    .execute(db)
    .await?;
    Ok(())
}

pub async fn find_storyboard_frame(
    db: &PgPool,
    image_id: &str,
) -> Result<Option<StoryboardFrameRow>, AppError> {
    let row = sqlx::query_as::<_, StoryboardFrameRow>(
        "SELECT * FROM storyboard_frames WHERE image_id = $1",
    )
    .bind(image_id)
    .fetch_optional(db)
    .await?;
    Ok(row)
}
