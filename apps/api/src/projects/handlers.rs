use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{error, info};
use uuid::Uuid;

use super::export::export_project;
use super::generation::{draw_frame, FrameDrawing};
use super::store::{delete_project, insert_project, list_projects, require_project, update_project};
use super::{
    frames_for_new_project, frames_on_page, page_info, rebuild_frames, PageInfo, MAX_PROJECT_FRAMES,
};
use crate::actors::actors_with_images;
use crate::errors::AppError;
use crate::imaging::prompts::{frame_prompt_with_actors, storyboard_frame_prompt};
use crate::imaging::ImageModel;
use crate::models::project::{Frame, Project};
use crate::script::extract_key_frames;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ProjectRequest {
    pub title: String,
    pub description: Option<String>,
    pub script: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FramesQuery {
    pub page: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct GenerateFrameRequest {
    #[serde(default)]
    pub actors: Vec<String>,
    pub style_prompt: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ExportResponse {
    pub project_id: String,
    pub export_path: String,
}

fn validate_title(title: &str) -> Result<(), AppError> {
    if title.trim().is_empty() {
        return Err(AppError::Validation("title must not be empty".to_string()));
    }
    Ok(())
}

/// POST /api/projects
pub async fn handle_create_project(
    State(state): State<AppState>,
    Json(req): Json<ProjectRequest>,
) -> Result<Json<Project>, AppError> {
    validate_title(&req.title)?;
    let project_id = Uuid::new_v4().to_string();

    let frames = match req.script.as_deref().filter(|s| !s.trim().is_empty()) {
        Some(script) => {
            info!("Processing script for project {project_id}");
            let extracted = extract_key_frames(script, MAX_PROJECT_FRAMES, &state.llm).await?;
            frames_for_new_project(&project_id, extracted)
        }
        None => Vec::new(),
    };

    let project = insert_project(
        &state.db,
        &project_id,
        &req.title,
        req.description.as_deref(),
        req.script.as_deref(),
        &frames,
    )
    .await?;
    info!("Created project {project_id} with {} frames", frames.len());
    Ok(Json(project))
}

/// GET /api/projects
pub async fn handle_list_projects(
    State(state): State<AppState>,
) -> Result<Json<Vec<Project>>, AppError> {
    Ok(Json(list_projects(&state.db).await?))
}

/// GET /api/projects/:id
pub async fn handle_get_project(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> Result<Json<Project>, AppError> {
    Ok(Json(require_project(&state.db, &project_id).await?))
}

/// PUT /api/projects/:id
pub async fn handle_update_project(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    Json(req): Json<ProjectRequest>,
) -> Result<Json<Project>, AppError> {
    validate_title(&req.title)?;
    let mut project = require_project(&state.db, &project_id).await?;

    project.title = req.title;
    if req.description.is_some() {
        project.description = req.description;
    }
    if let Some(script) = req.script {
        if project.script.as_deref() != Some(script.as_str()) {
            info!("Script has changed for project {project_id}, rebuilding frames");
            project.frames.0 = rebuild_frames(&script, &state.llm).await;
        }
        project.script = Some(script);
    }

    Ok(Json(update_project(&state.db, &project).await?))
}

/// DELETE /api/projects/:id
pub async fn handle_delete_project(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    if !delete_project(&state.db, &project_id).await? {
        return Err(AppError::NotFound(format!(
            "Project with ID {project_id} not found"
        )));
    }
    Ok(Json(json!({
        "message": format!("Project {project_id} deleted successfully")
    })))
}

/// GET /api/projects/:id/frames
pub async fn handle_get_frames(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    Query(query): Query<FramesQuery>,
) -> Result<Json<Vec<Frame>>, AppError> {
    let project = require_project(&state.db, &project_id).await?;
    Ok(Json(frames_on_page(&project.frames.0, query.page)))
}

/// GET /api/projects/:id/pages
pub async fn handle_get_pages(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> Result<Json<PageInfo>, AppError> {
    let project = require_project(&state.db, &project_id).await?;
    Ok(Json(page_info(&project.frames.0)))
}

/// POST /api/projects/:id/frames/:frame_id/generate
pub async fn handle_generate_frame(
    State(state): State<AppState>,
    Path((project_id, frame_id)): Path<(String, String)>,
    body: Option<Json<GenerateFrameRequest>>,
) -> Result<Json<Frame>, AppError> {
    let req = body.map(|Json(r)| r).unwrap_or_default();
    let mut project = require_project(&state.db, &project_id).await?;
    let frame = project
        .frames
        .0
        .iter_mut()
        .find(|f| f.frame_id == frame_id)
        .ok_or_else(|| AppError::NotFound(format!("Frame with ID {frame_id} not found")))?;

    let reference_actors = actors_with_images(&state.db, &req.actors).await?;
    let prompt = storyboard_frame_prompt(
        &frame.description,
        req.style_prompt.as_deref(),
        !reference_actors.is_empty(),
    );
    let generator = state.images.for_model(ImageModel::Dalle)?;

    draw_frame(
        &state.db,
        &state.media,
        generator.as_ref(),
        frame,
        FrameDrawing {
            project_id: &project_id,
            prompt: &prompt,
            actors: &req.actors,
        },
    )
    .await?;

    Ok(Json(frame.clone()))
}

/// POST /api/projects/:id/generate-all
pub async fn handle_generate_all(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> Result<Json<Vec<Frame>>, AppError> {
    let mut project = require_project(&state.db, &project_id).await?;
    if project.frames.0.is_empty() {
        return Err(AppError::Validation(
            "Project has no frames to generate images for".to_string(),
        ));
    }
    let generator = state.images.default_generator()?;

    for frame in project.frames.0.iter_mut() {
        let prompt = frame_prompt_with_actors(&frame.description, &[]);
        let result = draw_frame(
            &state.db,
            &state.media,
            generator.as_ref(),
            frame,
            FrameDrawing {
                project_id: &project_id,
                prompt: &prompt,
                actors: &[],
            },
        )
        .await;
        if let Err(e) = result {
            error!("Error generating image for frame {}: {e}", frame.frame_id);
        }
    }

    // Re-read so frames changed by a concurrent edit are reported as stored.
    let project = require_project(&state.db, &project_id).await?;
    Ok(Json(project.frames.0))
}

/// POST /api/projects/:id/export
pub async fn handle_export(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> Result<Json<ExportResponse>, AppError> {
    let project = require_project(&state.db, &project_id).await?;
    let export_path = export_project(&state.media, &project).await?;
    Ok(Json(ExportResponse {
        project_id,
        export_path,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::http::StatusCode;
    use wiremock::matchers::{method, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::imaging::testing::RecordingGenerator;
    use crate::routes::build_router;
    use crate::testing::{
        app_state, dalle_only, database, empty_request, json_request, send, UNREACHABLE,
    };

    fn frame_ids(project: &Value) -> Vec<String> {
        project["frames"]
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["frame_id"].as_str().unwrap().to_string())
            .collect()
    }

    fn descriptions(project: &Value) -> Vec<String> {
        project["frames"]
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["description"].as_str().unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_generate_frame_request_defaults() {
        let req: GenerateFrameRequest = serde_json::from_str("{}").unwrap();
        assert!(req.actors.is_empty());
        assert!(req.style_prompt.is_none());
    }

    #[test]
    fn test_validate_title() {
        assert!(validate_title("Dust").is_ok());
        assert!(matches!(validate_title("  "), Err(AppError::Validation(_))));
    }

    #[tokio::test]
    #[ignore]
    async fn test_generate_all_continues_past_failing_frame() {
        let s3 = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path_regex("^/storyboard-test/frame_images/"))
            .respond_with(ResponseTemplate::new(200))
            .expect(2)
            .mount(&s3)
            .await;

        let generator = Arc::new(RecordingGenerator::failing_on(ImageModel::Dalle, "Storm"));
        let app = build_router(app_state(
            database().await,
            &s3.uri(),
            UNREACHABLE,
            dalle_only(generator.clone()),
        ));
        let script = "Frame 1: Harbour at dawn\nFrame 2: Storm breaks\nFrame 3: Lighthouse goes dark";

        let (status, project) = send(
            app.clone(),
            json_request("POST", "/api/projects", json!({"title": "Dust", "script": script})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let id = project["project_id"].as_str().unwrap().to_string();

        let (status, body) = send(
            app.clone(),
            empty_request("POST", &format!("/api/projects/{id}/generate-all")),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(generator.recorded().len(), 3);

        let expected = vec![
            Some(format!("/frame-images/{id}_frame_0.png")),
            None,
            Some(format!("/frame-images/{id}_frame_2.png")),
        ];
        let urls: Vec<Option<String>> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["image_url"].as_str().map(String::from))
            .collect();
        assert_eq!(urls, expected);

        let (_, stored) = send(app, empty_request("GET", &format!("/api/projects/{id}"))).await;
        let stored_urls: Vec<Option<String>> = stored["frames"]
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["image_url"].as_str().map(String::from))
            .collect();
        assert_eq!(stored_urls, expected);
    }

    #[tokio::test]
    #[ignore]
    async fn test_script_change_rebuilds_frames() {
        let app = build_router(app_state(
            database().await,
            UNREACHABLE,
            UNREACHABLE,
            dalle_only(Arc::new(RecordingGenerator::new(ImageModel::Dalle))),
        ));
        let script = "Frame 1: Harbour at dawn\nFrame 2: Storm breaks";

        let (_, created) = send(
            app.clone(),
            json_request("POST", "/api/projects", json!({"title": "Dust", "script": script})),
        )
        .await;
        let id = created["project_id"].as_str().unwrap().to_string();
        let uri = format!("/api/projects/{id}");

        let (status, same) = send(
            app.clone(),
            json_request("PUT", &uri, json!({"title": "Dust (cut 2)", "script": script})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(same["title"], "Dust (cut 2)");
        assert_eq!(frame_ids(&same), frame_ids(&created));

        let (status, rebuilt) = send(
            app,
            json_request(
                "PUT",
                &uri,
                json!({
                    "title": "Dust (cut 2)",
                    "script": "Frame 1: Empty street\nFrame 2: Rain on glass\nFrame 3: Door opens"
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            descriptions(&rebuilt),
            vec!["Empty street", "Rain on glass", "Door opens"]
        );
        let old_ids = frame_ids(&created);
        assert!(frame_ids(&rebuilt).iter().all(|fid| !old_ids.contains(fid)));
    }
}
