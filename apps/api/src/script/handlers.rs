use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use sqlx::types::Json as SqlJson;
use tracing::info;
use uuid::Uuid;

use super::{extract_key_frames, FrameDescription};
use crate::errors::AppError;
use crate::state::AppState;

const MAX_FRAME_COUNT: usize = 100;

#[derive(Debug, Deserialize)]
pub struct ScriptInput {
    pub script_text: String,
    #[serde(default = "default_frame_count")]
    pub frame_count: usize,
}

fn default_frame_count() -> usize {
    6
}

#[derive(Debug, Serialize)]
pub struct FrameAnalysisResponse {
    pub frames: Vec<FrameDescription>,
}

/// POST /api/script/analyze
pub async fn handle_analyze(
    State(state): State<AppState>,
    Json(input): Json<ScriptInput>,
) -> Result<Json<FrameAnalysisResponse>, AppError> {
    if input.script_text.trim().is_empty() {
        return Err(AppError::Validation("script_text must not be empty".to_string()));
    }
    if input.frame_count == 0 || input.frame_count > MAX_FRAME_COUNT {
        return Err(AppError::Validation(format!(
            "frame_count must be between 1 and {MAX_FRAME_COUNT}"
        )));
    }

    let extracted = extract_key_frames(&input.script_text, input.frame_count, &state.llm).await?;
    let frames: Vec<FrameDescription> = extracted
        .into_iter()
        .enumerate()
        .map(|(index, f)| FrameDescription {
            index,
            description: f.description,
        })
        .collect();

    let analysis_id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO script_analyses (id, script_text, frame_count, frames) VALUES ($1, $2, $3, $4)",
    )
    .bind(analysis_id)
    .bind(&input.script_text)
    .bind(input.frame_count as i32)
    .bind(SqlJson(&frames))
    .execute(&state.db)
    .await?;

    info!("Stored script analysis {analysis_id} with {} frames", frames.len());
    Ok(Json(FrameAnalysisResponse { frames }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_input_defaults_to_six_frames() {
        let input: ScriptInput = serde_json::from_str(r#"{"script_text": "FADE IN."}"#).unwrap();
        assert_eq!(input.frame_count, 6);
    }
}
