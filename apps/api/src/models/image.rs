use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A single generated frame: ad-hoc scenes, project frames and feedback revisions.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FrameImageRow {
    pub image_id: String,
    pub project_id: Option<String>,
    pub prompt: String,
    pub description: Option<String>,
    pub actors: Vec<String>,
    pub background: Option<String>,
    pub model: String,
    pub original_frame_id: Option<String>,
    pub s3_key: String,
    pub created_at: DateTime<Utc>,
}

/// One frame of a batch generated through `/api/images/generate-storyboard`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StoryboardFrameRow {
    pub image_id: String,
    pub prompt: String,
    pub model: String,
    pub frame_number: i32,
    pub storyboard_id: String,
    pub s3_key: String,
    pub created_at: DateTime<Utc>,
}
