use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

use crate::film_school::{Evaluation, Question, Stage};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FilmSchoolProjectRow {
    pub project_id: String,
    pub initial_concept: String,
    pub linked_project_id: Option<String>,
    pub current_stage: i32,
    /// Keyed by stage name.
    pub stage_data: Json<BTreeMap<String, StageData>>,
    pub feedback_history: Json<Vec<FeedbackEntry>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FilmSchoolProjectRow {
    /// The current stage; out-of-range indices clamp to the last stage.
    pub fn stage(&self) -> Stage {
        Stage::from_index(self.current_stage)
    }

    pub fn questions_for(&self, stage: Stage) -> Option<&[Question]> {
        self.stage_data
            .get(stage.as_str())
            .map(|data| data.questions.as_slice())
            .filter(|questions| !questions.is_empty())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StageData {
    #[serde(default)]
    pub questions: Vec<Question>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub answers: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackEntry {
    pub stage: Stage,
    pub evaluation: Evaluation,
    pub timestamp: DateTime<Utc>,
}
