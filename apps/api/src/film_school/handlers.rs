use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use super::agent::{generate_questions, suggest_answer};
use super::pipeline::{process_answers, resolve_consultation, save_initial_questions};
use super::{Answer, Evaluation, Question, Stage};
use crate::errors::AppError;
use crate::projects::store::find_project;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateConsultationRequest {
    pub initial_concept: String,
    pub project_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct QuestionResponse {
    pub current_stage: Stage,
    pub questions: Vec<Question>,
}

#[derive(Debug, Serialize)]
pub struct EvaluationResponse {
    pub evaluation: Evaluation,
    pub next_questions: Option<Vec<Question>>,
    pub next_stage: Option<Stage>,
}

#[derive(Debug, Deserialize)]
pub struct SuggestionRequest {
    pub question: String,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub context: Value,
}

#[derive(Debug, Serialize)]
pub struct SuggestionResponse {
    pub suggestion: String,
}

fn consultation_id(project_id: Option<&str>) -> String {
    project_id
        .map(str::to_string)
        .unwrap_or_else(|| format!("fs_{}", Utc::now().format("%Y%m%d%H%M%S")))
}

/// POST /api/film-school/projects
pub async fn handle_create_consultation(
    State(state): State<AppState>,
    Json(req): Json<CreateConsultationRequest>,
) -> Result<Json<QuestionResponse>, AppError> {
    if req.initial_concept.trim().is_empty() {
        return Err(AppError::Validation("initial_concept must not be empty".to_string()));
    }
    let linked_id = req.project_id.as_deref().filter(|id| !id.is_empty());

    // A linked storyboard project gives richer context than the concept alone.
    let mut context = req.initial_concept.clone();
    if let Some(id) = linked_id {
        match find_project(&state.db, id).await {
            Ok(Some(project)) => {
                info!("Linked to storyboard project: {id}");
                context = serde_json::to_string(&project).unwrap_or(context);
            }
            Ok(None) => {}
            Err(e) => warn!("Failed to get linked project {id}: {e}"),
        }
    }
    let questions = generate_questions(&state.llm, &context, Stage::Initial).await?;

    let id = consultation_id(linked_id);
    save_initial_questions(&state.db, &id, &req.initial_concept, linked_id, &questions).await?;

    Ok(Json(QuestionResponse {
        current_stage: Stage::Initial,
        questions,
    }))
}

/// GET /api/film-school/projects/:id/questions
pub async fn handle_get_questions(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<QuestionResponse>, AppError> {
    let row = resolve_consultation(&state.db, &id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Film school project for '{id}' not found")))?;

    let stage = row.stage();
    let questions = row
        .questions_for(stage)
        .ok_or_else(|| {
            AppError::NotFound(format!("No questions found for stage '{}'", stage.as_str()))
        })?
        .to_vec();
    info!(
        "Retrieved {} questions for project {id} at stage {}",
        questions.len(),
        stage.as_str()
    );

    Ok(Json(QuestionResponse {
        current_stage: stage,
        questions,
    }))
}

/// Answer texts ordered by question id.
fn ordered_answers(mut answers: Vec<Answer>) -> Vec<String> {
    answers.sort_by_key(|a| a.question_id);
    answers.into_iter().map(|a| a.answer).collect()
}

/// POST /api/film-school/projects/:id/answers
pub async fn handle_submit_answers(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(answers): Json<Vec<Answer>>,
) -> Result<Json<EvaluationResponse>, AppError> {
    let row = resolve_consultation(&state.db, &id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Project with ID {id} not found")))?;

    let questions = row
        .questions_for(row.stage())
        .ok_or_else(|| AppError::Validation("No questions found for current stage".to_string()))?
        .to_vec();
    if answers.len() != questions.len() {
        return Err(AppError::Validation(format!(
            "Expected {} answers, got {}",
            questions.len(),
            answers.len()
        )));
    }

    let outcome =
        process_answers(&state.db, &state.llm, row, questions, ordered_answers(answers)).await?;
    info!("Successfully processed answers for project {id}");

    Ok(Json(EvaluationResponse {
        evaluation: outcome.evaluation,
        next_questions: outcome.next_questions,
        next_stage: outcome.next_stage,
    }))
}

/// GET /api/film-school/projects/:id/characters
pub async fn handle_get_characters(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let project = find_project(&state.db, &id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Project with ID {id} not found")))?;
    Ok(Json(json!({ "characters": project.characters.0 })))
}

/// GET /api/film-school/projects/:id/scenes
pub async fn handle_get_scenes(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let project = find_project(&state.db, &id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Project with ID {id} not found")))?;
    Ok(Json(json!({ "scenes": project.scenes.0 })))
}

/// POST /api/film-school/generate-suggestion
pub async fn handle_generate_suggestion(
    State(state): State<AppState>,
    Json(req): Json<SuggestionRequest>,
) -> Result<Json<SuggestionResponse>, AppError> {
    let suggestion =
        suggest_answer(&state.llm, &req.question, &req.explanation, &req.context).await?;
    Ok(Json(SuggestionResponse { suggestion }))
}
