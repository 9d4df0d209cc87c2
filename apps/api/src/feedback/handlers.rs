use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use super::{feedback_targets_actor, revise_description, revised_frame_id};
use crate::actors::append_feedback_to_hint;
use crate::errors::AppError;
use crate::imaging::prompts::frame_prompt_with_actors;
use crate::imaging::records::{
    find_frame_image, find_storyboard_frame, upsert_frame_image, NewFrameImage,
};
use crate::imaging::{generate_and_store, ImageModel};
use crate::media::MediaArea;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct FeedbackInput {
    pub feedback_text: String,
    pub actor_names: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct FeedbackResponse {
    pub frame_id: String,
    pub new_image_url: String,
    pub revised_description: String,
    pub feedback_text: String,
}

/// The parts of a stored frame that feedback needs.
struct SourceFrame {
    prompt: String,
    actors: Vec<String>,
    model: String,
    project_id: Option<String>,
}

async fn load_source_frame(state: &AppState, frame_id: &str) -> Result<SourceFrame, AppError> {
    if let Some(frame) = find_frame_image(&state.db, frame_id).await? {
        return Ok(SourceFrame {
            prompt: frame.prompt,
            actors: frame.actors,
            model: frame.model,
            project_id: frame.project_id,
        });
    }
    if let Some(frame) = find_storyboard_frame(&state.db, frame_id).await? {
        return Ok(SourceFrame {
            prompt: frame.prompt,
            actors: Vec::new(),
            model: frame.model,
            project_id: None,
        });
    }
    Err(AppError::NotFound(format!("Frame with ID {frame_id} not found")))
}

/// POST /api/feedback/frames/:frame_id
pub async fn handle_frame_feedback(
    State(state): State<AppState>,
    Path(frame_id): Path<String>,
    Json(input): Json<FeedbackInput>,
) -> Result<Json<FeedbackResponse>, AppError> {
    if input.feedback_text.trim().is_empty() {
        return Err(AppError::Validation("feedback_text must not be empty".to_string()));
    }
    let frame = load_source_frame(&state, &frame_id).await?;
    let revised = revise_description(&frame.prompt, &input.feedback_text);
    let actors = input
        .actor_names
        .filter(|names| !names.is_empty())
        .unwrap_or(frame.actors);

    for actor in actors
        .iter()
        .filter(|a| feedback_targets_actor(a, &input.feedback_text))
    {
        match append_feedback_to_hint(&state.db, actor, &input.feedback_text).await {
            Ok(true) => info!("Updated actor '{actor}' prompt hint with feedback"),
            Ok(false) => warn!("Actor '{actor}' mentioned in feedback not found in database"),
            Err(e) => warn!("Error updating actor '{actor}' from feedback: {e}"),
        }
    }

    let model = frame
        .model
        .parse::<ImageModel>()
        .unwrap_or_else(|_| state.images.default_model());
    let generator = state.images.for_model(model)?;
    let prompt = frame_prompt_with_actors(&revised, &actors);

    let new_frame_id = revised_frame_id(&frame_id);
    let key = generate_and_store(
        generator.as_ref(),
        &state.media,
        MediaArea::Generated,
        &new_frame_id,
        &prompt,
    )
    .await?;

    sqlx::query(
        r#"
        INSERT INTO feedback
            (id, original_frame_id, new_frame_id, feedback_text,
             original_description, revised_description, actors)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&frame_id)
    .bind(&new_frame_id)
    .bind(&input.feedback_text)
    .bind(&frame.prompt)
    .bind(&revised)
    .bind(&actors)
    .execute(&state.db)
    .await?;

    upsert_frame_image(
        &state.db,
        &NewFrameImage {
            image_id: &new_frame_id,
            project_id: frame.project_id.as_deref(),
            prompt: &revised,
            actors: &actors,
            model: model.as_str(),
            original_frame_id: Some(&frame_id),
            s3_key: &key,
            ..Default::default()
        },
    )
    .await?;

    info!("Regenerated frame {frame_id} as {new_frame_id}");
    Ok(Json(FeedbackResponse {
        new_image_url: MediaArea::Generated.public_url(&format!("{new_frame_id}.png")),
        frame_id: new_frame_id,
        revised_description: revised,
        feedback_text: input.feedback_text,
    }))
}
