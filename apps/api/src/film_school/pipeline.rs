//! Consultation storage and stage progression.

use std::collections::BTreeMap;

use chrono::Utc;
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::info;

use super::agent::{evaluate_answers, generate_questions};
use super::{Evaluation, Question, Stage};
use crate::errors::AppError;
use crate::llm_client::LlmClient;
use crate::models::film_school::{FeedbackEntry, FilmSchoolProjectRow, StageData};

pub async fn find_consultation(
    db: &PgPool,
    project_id: &str,
) -> Result<Option<FilmSchoolProjectRow>, AppError> {
    let row = sqlx::query_as::<_, FilmSchoolProjectRow>(
        "SELECT * FROM film_school_projects WHERE project_id = $1",
    )
    .bind(project_id)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

/// The consultation linked to a storyboard project, oldest first.
pub async fn find_linked_consultation(
    db: &PgPool,
    linked_project_id: &str,
) -> Result<Option<FilmSchoolProjectRow>, AppError> {
    let row = sqlx::query_as::<_, FilmSchoolProjectRow>(
        r#"
        SELECT * FROM film_school_projects
        WHERE linked_project_id = $1
        ORDER BY created_at
        LIMIT 1
        "#,
    )
    .bind(linked_project_id)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

/// Looks a consultation up by its own id, then by linked storyboard project id.
pub async fn resolve_consultation(
    db: &PgPool,
    id: &str,
) -> Result<Option<FilmSchoolProjectRow>, AppError> {
    match find_consultation(db, id).await? {
        Some(row) => Ok(Some(row)),
        None => find_linked_consultation(db, id).await,
    }
}

/// Creates a consultation at the initial stage, or replaces the initial
/// questions of an existing one.
pub async fn save_initial_questions(
    db: &PgPool,
    consultation_id: &str,
    initial_concept: &str,
    linked_project_id: Option<&str>,
    questions: &[Question],
) -> Result<(), AppError> {
    if let Some(existing) = find_consultation(db, consultation_id).await? {
        let mut stage_data = existing.stage_data.0;
        stage_data
            .entry(Stage::Initial.as_str().to_string())
            .or_default()
            .questions = questions.to_vec();

        sqlx::query(
            r#"
            UPDATE film_school_projects
            SET stage_data = $1, updated_at = now()
            WHERE project_id = $2
            "#,
        )
        .bind(Json(&stage_data))
        .bind(consultation_id)
        .execute(db)
        .await?;
        info!("Updated existing film school project: {consultation_id}");
        return Ok(());
    }

    let stage_data = BTreeMap::from([(
        Stage::Initial.as_str().to_string(),
        StageData {
            questions: questions.to_vec(),
            answers: Vec::new(),
        },
    )]);
    sqlx::query(
        r#"
        INSERT INTO film_school_projects
            (project_id, initial_concept, linked_project_id, current_stage, stage_data)
        VALUES ($1, $2, $3, 0, $4)
        "#,
    )
    .bind(consultation_id)
    .bind(initial_concept)
    .bind(linked_project_id)
    .bind(Json(&stage_data))
    .execute(db)
    .await?;
    info!("Created new film school project: {consultation_id}");
    Ok(())
}

#[derive(Debug)]
pub struct StageOutcome {
    pub evaluation: Evaluation,
    pub next_stage: Option<Stage>,
    pub next_questions: Option<Vec<Question>>,
}

/// Records the answers for the current stage and their evaluation.
pub fn record_stage(
    row: &mut FilmSchoolProjectRow,
    questions: Vec<Question>,
    answers: Vec<String>,
    evaluation: &Evaluation,
) {
    let stage = row.stage();
    row.stage_data
        .0
        .insert(stage.as_str().to_string(), StageData { questions, answers });
    row.feedback_history.0.push(FeedbackEntry {
        stage,
        evaluation: evaluation.clone(),
        timestamp: Utc::now(),
    });
    row.updated_at = Utc::now();
}

/// Evaluates the current stage's answers and moves the consultation forward.
///
/// Answers and the evaluation are stored first. When a next stage exists its
/// questions are generated from the whole serialized consultation and stored
/// together with the new stage index, so the stage only advances once its
/// questions exist.
pub async fn process_answers(
    db: &PgPool,
    llm: &LlmClient,
    mut row: FilmSchoolProjectRow,
    questions: Vec<Question>,
    answers: Vec<String>,
) -> Result<StageOutcome, AppError> {
    let evaluation = evaluate_answers(llm, &questions, &answers).await?;
    record_stage(&mut row, questions, answers, &evaluation);

    sqlx::query(
        r#"
        UPDATE film_school_projects
        SET stage_data = $1, feedback_history = $2, updated_at = now()
        WHERE project_id = $3
        "#,
    )
    .bind(&row.stage_data)
    .bind(&row.feedback_history)
    .bind(&row.project_id)
    .execute(db)
    .await?;

    let Some(next_stage) = row.stage().next() else {
        info!("Film school project {} completed its final stage", row.project_id);
        return Ok(StageOutcome {
            evaluation,
            next_stage: None,
            next_questions: None,
        });
    };

    let context = serde_json::to_string(&row)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize consultation: {e}")))?;
    let next_questions = generate_questions(llm, &context, next_stage).await?;

    row.stage_data.0.insert(
        next_stage.as_str().to_string(),
        StageData {
            questions: next_questions.clone(),
            answers: Vec::new(),
        },
    );
    sqlx::query(
        r#"
        UPDATE film_school_projects
        SET current_stage = $1, stage_data = $2, updated_at = now()
        WHERE project_id = $3
        "#,
    )
    .bind(next_stage.index())
    .bind(&row.stage_data)
    .bind(&row.project_id)
    .execute(db)
    .await?;
    info!("Film school project {} advanced to {}", row.project_id, next_stage.as_str());

    Ok(StageOutcome {
        evaluation,
        next_stage: Some(next_stage),
        next_questions: Some(next_questions),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::film_school::default_ratings;

    fn row(stage: i32) -> FilmSchoolProjectRow {
        FilmSchoolProjectRow {
            project_id: "fs_1".into(),
            initial_concept: "A heist on Mars".into(),
            linked_project_id: None,
            current_stage: stage,
            stage_data: Json(BTreeMap::new()),
            feedback_history: Json(Vec::new()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_record_stage_stores_answers_and_feedback() {
        let mut row = row(1);
        let evaluation = Evaluation {
            ratings: default_ratings(),
            strengths: vec!["Bold".into()],
            improvements: vec![],
        };
        let questions = vec![Question {
            question: "Who?".into(),
            explanation: String::new(),
        }];
        record_stage(&mut row, questions, vec!["Her".into()], &evaluation);

        let data = &row.stage_data.0["character_development"];
        assert_eq!(data.answers, vec!["Her"]);
        assert_eq!(row.feedback_history.0.len(), 1);
        assert_eq!(row.feedback_history.0[0].stage, Stage::CharacterDevelopment);
    }

    #[test]
    fn test_questions_for_skips_empty_stage() {
        let mut row = row(0);
        assert!(row.questions_for(Stage::Initial).is_none());
        row.stage_data
            .0
            .insert("initial".into(), StageData::default());
        assert!(row.questions_for(Stage::Initial).is_none());
    }

    #[test]
    fn test_serialized_row_is_plain_json() {
        let value = serde_json::to_value(row(0)).unwrap();
        assert_eq!(value["initial_concept"], "A heist on Mars");
        assert!(value["stage_data"].is_object());
    }
}
