use axum::{extract::State, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::actors::{file_stem, find_actor};
use crate::errors::AppError;
use crate::imaging::prompts::{character_variant_prompt, scene_prompt};
use crate::imaging::records::{
    insert_character_variant, insert_image, insert_storyboard_frame, upsert_frame_image,
    NewFrameImage,
};
use crate::imaging::generate_and_store;
use crate::media::MediaArea;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ImageGenerationRequest {
    pub prompt: String,
    pub model: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CharacterVariantRequest {
    pub actor_name: String,
    pub scene_description: String,
    #[serde(default = "default_variant_count")]
    pub num_variants: usize,
}

fn default_variant_count() -> usize {
    5
}

#[derive(Debug, Deserialize)]
pub struct FrameGenerationRequest {
    pub description: String,
    #[serde(default)]
    pub actor_names: Vec<String>,
    pub background_description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ImageResponse {
    pub image_url: String,
    pub image_id: String,
    pub prompt: String,
}

#[derive(Debug, Serialize)]
pub struct VariantResponse {
    pub variants: Vec<ImageResponse>,
}

/// Most variants a single request may ask for.
const MAX_VARIANTS: usize = 10;

fn timestamp() -> String {
    Utc::now().format("%Y%m%d_%H%M%S").to_string()
}

/// `image_{first 30 chars of the prompt, spaces as underscores, lowercased}_{timestamp}`,
/// keeping only characters that are safe in an object key.
fn prompt_image_id(prompt: &str, timestamp: &str) -> String {
    let short: String = prompt
        .replace(' ', "_")
        .chars()
        .take(30)
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-')
        .collect();
    format!("image_{short}_{timestamp}")
}

fn variant_image_id(actor_name: &str, index: usize, timestamp: &str) -> String {
    let clean_name = file_stem(actor_name).to_lowercase();
    format!("{clean_name}_variant_{}_{timestamp}", index + 1)
}

fn storyboard_image_id(index: usize, storyboard_id: &str) -> String {
    format!("storyboard_frame_{:02}_{storyboard_id}", index + 1)
}

/// POST /api/images/generate
pub async fn handle_generate(
    State(state): State<AppState>,
    Json(req): Json<ImageGenerationRequest>,
) -> Result<Json<ImageResponse>, AppError> {
    if req.prompt.trim().is_empty() {
        return Err(AppError::Validation("prompt must not be empty".to_string()));
    }
    let generator = state.images.get(req.model.as_deref())?;

    let image_id = prompt_image_id(&req.prompt, &timestamp());
    let key = generate_and_store(
        generator.as_ref(),
        &state.media,
        MediaArea::Generated,
        &image_id,
        &req.prompt,
    )
    .await?;
    insert_image(&state.db, &image_id, &req.prompt, generator.model().as_str(), &key).await?;

    info!("Saved generated image: {key}");
    Ok(Json(ImageResponse {
        image_url: MediaArea::Generated.public_url(&format!("{image_id}.png")),
        image_id,
        prompt: req.prompt,
    }))
}

/// POST /api/images/generate-character-variants
pub async fn handle_generate_character_variants(
    State(state): State<AppState>,
    Json(req): Json<CharacterVariantRequest>,
) -> Result<Json<VariantResponse>, AppError> {
    if req.num_variants == 0 || req.num_variants > MAX_VARIANTS {
        return Err(AppError::Validation(format!(
            "num_variants must be between 1 and {MAX_VARIANTS}"
        )));
    }
    let actor = find_actor(&state.db, &req.actor_name)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Actor '{}' not found", req.actor_name)))?;
    let generator = state.images.default_generator()?;
    let ts = timestamp();

    let mut variants = Vec::with_capacity(req.num_variants);
    for i in 0..req.num_variants {
        let (prompt, aspect) =
            character_variant_prompt(&actor.name, &actor.prompt_hint, &req.scene_description, i);
        let image_id = variant_image_id(&actor.name, i, &ts);

        let key = generate_and_store(
            generator.as_ref(),
            &state.media,
            MediaArea::Generated,
            &image_id,
            &prompt,
        )
        .await?;
        insert_character_variant(
            &state.db,
            &image_id,
            &prompt,
            &actor.name,
            aspect,
            generator.model().as_str(),
            &key,
        )
        .await?;
        info!("Saved character variant image: {key}");

        variants.push(ImageResponse {
            image_url: MediaArea::Generated.public_url(&format!("{image_id}.png")),
            image_id,
            prompt,
        });
    }

    Ok(Json(VariantResponse { variants }))
}

/// POST /api/images/generate-frame
pub async fn handle_generate_frame(
    State(state): State<AppState>,
    Json(req): Json<FrameGenerationRequest>,
) -> Result<Json<ImageResponse>, AppError> {
    if req.description.trim().is_empty() {
        return Err(AppError::Validation("description must not be empty".to_string()));
    }
    let generator = state.images.default_generator()?;
    let background = req.background_description.as_deref();
    let prompt = scene_prompt(&req.description, &req.actor_names, background);
    let image_id = if req.actor_names.is_empty() {
        format!("scene_{}", Uuid::new_v4())
    } else {
        format!("scene_with_actors_{}", Uuid::new_v4())
    };

    let key = generate_and_store(
        generator.as_ref(),
        &state.media,
        MediaArea::Generated,
        &image_id,
        &prompt,
    )
    .await?;
    upsert_frame_image(
        &state.db,
        &NewFrameImage {
            image_id: &image_id,
            prompt: &prompt,
            description: Some(&req.description),
            actors: &req.actor_names,
            background,
            model: generator.model().as_str(),
            s3_key: &key,
            ..Default::default()
        },
    )
    .await?;

    Ok(Json(ImageResponse {
        image_url: MediaArea::Generated.public_url(&format!("{image_id}.png")),
        image_id,
        prompt,
    }))
}

/// POST /api/images/generate-storyboard
pub async fn handle_generate_storyboard(
    State(state): State<AppState>,
    Json(descriptions): Json<Vec<String>>,
) -> Result<Json<Vec<ImageResponse>>, AppError> {
    if descriptions.is_empty() {
        return Err(AppError::Validation(
            "At least one frame description is required".to_string(),
        ));
    }
    let generator = state.images.default_generator()?;
    let storyboard_id = timestamp();

    let mut results = Vec::with_capacity(descriptions.len());
    for (i, description) in descriptions.into_iter().enumerate() {
        let image_id = storyboard_image_id(i, &storyboard_id);
        let key = generate_and_store(
            generator.as_ref(),
            &state.media,
            MediaArea::Generated,
            &image_id,
            &description,
        )
        .await?;
        insert_storyboard_frame(
            &state.db,
            &image_id,
            &description,
            generator.model().as_str(),
            (i + 1) as i32,
            &storyboard_id,
            &key,
        )
        .await?;
        info!("Saved storyboard frame {}: {key}", i + 1);

        results.push(ImageResponse {
            image_url: MediaArea::Generated.public_url(&format!("{image_id}.png")),
            image_id,
            prompt: description,
        });
    }

    Ok(Json(results))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_image_id_shortens_and_cleans() {
        let id = prompt_image_id("A Knight's Tale at the Castle Gate, night", "20240101_120000");
        assert_eq!(id, "image_a_knights_tale_at_the_castle__20240101_120000");
    }

    #[test]
    fn test_variant_and_storyboard_ids() {
        assert_eq!(
            variant_image_id("Elara Voss", 0, "20240101_120000"),
            "elara_voss_variant_1_20240101_120000"
        );
        assert_eq!(
            variant_image_id("AC/DC", 1, "20240101_120000"),
            "ac_dc_variant_2_20240101_120000"
        );
        assert_eq!(
            storyboard_image_id(8, "20240101_120000"),
            "storyboard_frame_09_20240101_120000"
        );
    }

    #[test]
    fn test_variant_request_defaults_to_five() {
        let req: CharacterVariantRequest =
            serde_json::from_str(r#"{"actor_name": "Elara", "scene_description": "rain"}"#)
                .unwrap();
        assert_eq!(req.num_variants, 5);
    }
}
