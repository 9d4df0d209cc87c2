//! Drawing project frames.

use sqlx::PgPool;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::imaging::records::{upsert_frame_image, NewFrameImage};
use crate::imaging::{generate_and_store, ImageGenerator};
use crate::media::{MediaArea, MediaStore};
use crate::models::project::Frame;
use crate::projects::store::set_frame_image_url;

/// What to draw for one frame.
pub struct FrameDrawing<'a> {
    pub project_id: &'a str,
    pub prompt: &'a str,
    pub actors: &'a [String],
}

/// Generates the image for `frame`, stores it as `frame_images/{frame_id}.png`,
/// records it in `frame_images` and points the frame's `image_url` at it, both
/// on `frame` and on the matching frame of the stored project.
pub async fn draw_frame(
    db: &PgPool,
    media: &MediaStore,
    generator: &dyn ImageGenerator,
    frame: &mut Frame,
    drawing: FrameDrawing<'_>,
) -> Result<(), AppError> {
    let key = generate_and_store(
        generator,
        media,
        MediaArea::Frame,
        &frame.frame_id,
        drawing.prompt,
    )
    .await?;

    upsert_frame_image(
        db,
        &NewFrameImage {
            image_id: &frame.frame_id,
            project_id: Some(drawing.project_id),
            prompt: drawing.prompt,
            description: Some(&frame.description),
            actors: drawing.actors,
            model: generator.model().as_str(),
            s3_key: &key,
            ..Default::default()
        },
    )
    .await?;

    let image_url = MediaArea::Frame.public_url(&format!("{}.png", frame.frame_id));
    if !set_frame_image_url(db, drawing.project_id, &frame.frame_id, &image_url).await? {
        warn!(
            "Frame {} left project {} while its image was drawn",
            frame.frame_id, drawing.project_id
        );
    }
    frame.image_url = Some(image_url);
    info!("Generated image for frame {}", frame.frame_id);
    Ok(())
}
