use axum::Json;
use serde_json::{json, Value};

/// GET /
pub async fn root_handler() -> Json<Value> {
    Json(json!({ "message": "Welcome to the StoryboardAI API" }))
}

/// GET /health and GET /api/health
pub async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "message": "API is healthy"
    }))
}
