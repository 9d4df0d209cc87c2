use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Project {
    pub project_id: String,
    pub title: String,
    pub description: Option<String>,
    pub script: Option<String>,
    pub frames: Json<Vec<Frame>>,
    pub characters: Json<BTreeMap<String, CharacterProfile>>,
    pub scenes: Json<Vec<serde_json::Value>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A storyboard frame embedded in a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub frame_id: String,
    pub description: String,
    pub sequence: usize,
    #[serde(default = "first")]
    pub page: u32,
    #[serde(default = "first")]
    pub frame_on_page: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

fn first() -> u32 {
    1
}

/// Character notes attached to a project, rendered into export reports.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CharacterProfile {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub traits: Vec<String>,
    #[serde(default)]
    pub motivation: Option<String>,
    #[serde(default)]
    pub arc: Option<String>,
}
