use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::media::MediaArea;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ActorRow {
    pub name: String,
    pub description: String,
    pub prompt_hint: String,
    pub image_keys: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Actor profile as returned by the API; images are public URLs.
#[derive(Debug, Clone, Serialize)]
pub struct ActorProfile {
    pub name: String,
    pub description: String,
    pub prompt_hint: String,
    pub images: Vec<String>,
}

impl From<ActorRow> for ActorProfile {
    fn from(row: ActorRow) -> Self {
        let images = row
            .image_keys
            .iter()
            .filter_map(|key| MediaArea::url_for_key(key))
            .collect();
        Self {
            name: row.name,
            description: row.description,
            prompt_hint: row.prompt_hint,
            images,
        }
    }
}
