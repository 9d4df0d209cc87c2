use axum::{
    extract::{FromRequest, Multipart, Path, Request, State},
    http::header::CONTENT_TYPE,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info, warn};
use uuid::Uuid;

use super::form::{parse_create_form, parse_update_form, ActorCreateForm, ActorUpdateForm};
use super::{file_stem, find_actor, merge_prompt_hint};
use crate::errors::AppError;
use crate::imaging::prompts::actor_portrait_prompt;
use crate::imaging::{generate_and_store, ImageModel};
use crate::media::MediaArea;
use crate::models::actor::{ActorProfile, ActorRow};
use crate::state::AppState;

/// JSON body accepted by `PUT /api/actors/:name`.
#[derive(Debug, Default, Deserialize)]
pub struct ActorUpdateRequest {
    pub description: Option<String>,
    pub prompt_hint: Option<String>,
    pub feedback_notes: Option<String>,
}

/// Generates a DALL-E portrait for a new actor. Failures are logged and the
/// actor is created without an image.
async fn generate_portrait(state: &AppState, form: &ActorCreateForm) -> Option<String> {
    info!("Generating image for actor: {}", form.name);
    let generator = match state.images.for_model(ImageModel::Dalle) {
        Ok(g) => g,
        Err(e) => {
            error!("Portrait generation unavailable: {e}");
            return None;
        }
    };
    let prompt = actor_portrait_prompt(&form.name, &form.description);
    let stem = format!("{}_generated", file_stem(&form.name));

    match generate_and_store(generator.as_ref(), &state.media, MediaArea::Actor, &stem, &prompt)
        .await
    {
        Ok(key) => Some(key),
        Err(e) => {
            error!("Error generating image for actor '{}': {e}", form.name);
            None
        }
    }
}

/// POST /api/actors
pub async fn handle_create_actor(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ActorProfile>, AppError> {
    let form = parse_create_form(multipart).await?;

    if find_actor(&state.db, &form.name).await?.is_some() {
        return Err(AppError::Conflict(format!("Actor '{}' already exists", form.name)));
    }

    let mut image_keys = Vec::new();
    if form.auto_generate_image {
        image_keys.extend(generate_portrait(&state, &form).await);
    } else {
        let stem = file_stem(&form.name);
        for (i, image) in form.images.iter().enumerate() {
            let key = state
                .media
                .put_image(
                    MediaArea::Actor,
                    &format!("{stem}_{i}.{}", image.extension),
                    image.bytes.clone(),
                    &image.content_type,
                )
                .await?;
            image_keys.push(key);
        }
    }

    let row = sqlx::query_as::<_, ActorRow>(
        r#"
        INSERT INTO actors (name, description, prompt_hint, image_keys)
        VALUES ($1, $2, '', $3)
        ON CONFLICT (name) DO NOTHING
        RETURNING *
        "#,
    )
    .bind(&form.name)
    .bind(&form.description)
    .bind(&image_keys)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::Conflict(format!("Actor '{}' already exists", form.name)))?;

    info!("Created actor '{}' with {} images", row.name, row.image_keys.len());
    Ok(Json(row.into()))
}

/// GET /api/actors
pub async fn handle_list_actors(
    State(state): State<AppState>,
) -> Result<Json<Vec<ActorProfile>>, AppError> {
    let rows = sqlx::query_as::<_, ActorRow>("SELECT * FROM actors ORDER BY created_at, name")
        .fetch_all(&state.db)
        .await?;
    Ok(Json(rows.into_iter().map(ActorProfile::from).collect()))
}

/// GET /api/actors/:name
pub async fn handle_get_actor(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ActorProfile>, AppError> {
    let actor = find_actor(&state.db, &name)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Actor '{name}' not found")))?;
    Ok(Json(actor.into()))
}

fn is_multipart(request: &Request) -> bool {
    request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("multipart/form-data"))
}

/// PUT /api/actors/:name
/// Accepts a JSON body or a multipart form with an optional `new_image`.
pub async fn handle_update_actor(
    State(state): State<AppState>,
    Path(name): Path<String>,
    request: Request,
) -> Result<Json<ActorProfile>, AppError> {
    let update = if is_multipart(&request) {
        let multipart = Multipart::from_request(request, &state)
            .await
            .map_err(|e| AppError::Validation(e.body_text()))?;
        parse_update_form(multipart).await?
    } else {
        let Json(body) = Json::<ActorUpdateRequest>::from_request(request, &state)
            .await
            .map_err(|e| AppError::Validation(e.body_text()))?;
        ActorUpdateForm {
            description: body.description,
            prompt_hint: body.prompt_hint,
            feedback_notes: body.feedback_notes,
            new_image: None,
        }
    };

    let actor = find_actor(&state.db, &name)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Actor '{name}' not found")))?;

    let mut image_keys = actor.image_keys;
    if let Some(image) = update.new_image {
        let file_name = format!("{}_{}.{}", file_stem(&name), Uuid::new_v4(), image.extension);
        let key = state
            .media
            .put_image(MediaArea::Actor, &file_name, image.bytes, &image.content_type)
            .await?;
        image_keys.push(key);
    }

    let description = update.description.unwrap_or(actor.description);
    let mut prompt_hint = update.prompt_hint.unwrap_or(actor.prompt_hint);
    if let Some(notes) = update.feedback_notes {
        prompt_hint = merge_prompt_hint(&prompt_hint, &notes);
    }

    let row = sqlx::query_as::<_, ActorRow>(
        r#"
        UPDATE actors
        SET description = $1, prompt_hint = $2, image_keys = $3, updated_at = now()
        WHERE name = $4
        RETURNING *
        "#,
    )
    .bind(&description)
    .bind(&prompt_hint)
    .bind(&image_keys)
    .bind(&name)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Actor '{name}' not found")))?;

    info!("Updated actor '{name}'");
    Ok(Json(row.into()))
}

/// DELETE /api/actors/:name
pub async fn handle_delete_actor(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Value>, AppError> {
    let actor = sqlx::query_as::<_, ActorRow>("DELETE FROM actors WHERE name = $1 RETURNING *")
        .bind(&name)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Actor '{name}' not found")))?;

    for key in &actor.image_keys {
        if let Err(e) = state.media.delete(key).await {
            warn!("Failed to delete image {key} of actor '{name}': {e}");
        }
    }

    Ok(Json(json!({ "message": format!("Actor '{name}' deleted successfully") })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::StatusCode;
    use wiremock::matchers::{method, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::imaging::testing::RecordingGenerator;
    use crate::routes::build_router;
    use crate::testing::{
        app_state, dalle_only, database, empty_request, multipart_request, send, unique,
        UNREACHABLE,
    };

    #[test]
    fn test_update_request_fields_are_optional() {
        let req: ActorUpdateRequest =
            serde_json::from_str(r#"{"feedback_notes": "older"}"#).unwrap();
        assert_eq!(req.feedback_notes.as_deref(), Some("older"));
        assert!(req.description.is_none());
    }

    #[test]
    fn test_multipart_detection() {
        let multipart = Request::builder()
            .header(CONTENT_TYPE, "multipart/form-data; boundary=X")
            .body(Body::empty())
            .unwrap();
        let json = Request::builder()
            .header(CONTENT_TYPE, "application/json")
            .body(Body::empty())
            .unwrap();
        assert!(is_multipart(&multipart));
        assert!(!is_multipart(&json));
    }

    #[tokio::test]
    #[ignore]
    async fn test_actor_is_created_when_portrait_generation_fails() {
        let generator = Arc::new(RecordingGenerator::failing(ImageModel::Dalle));
        let state = app_state(
            database().await,
            UNREACHABLE,
            UNREACHABLE,
            dalle_only(generator.clone()),
        );
        let name = unique("Elara");

        let (status, body) = send(
            build_router(state),
            multipart_request(
                "POST",
                "/api/actors",
                &[
                    ("name", name.as_str()),
                    ("description", "a cartographer with ink-stained hands"),
                    ("auto_generate_image", "true"),
                ],
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], name.as_str());
        assert_eq!(body["images"], json!([]));
        assert_eq!(generator.recorded().len(), 1);
    }

    #[tokio::test]
    #[ignore]
    async fn test_duplicate_actor_is_conflict() {
        let state = app_state(
            database().await,
            UNREACHABLE,
            UNREACHABLE,
            dalle_only(Arc::new(RecordingGenerator::new(ImageModel::Dalle))),
        );
        let app = build_router(state);
        let name = unique("Bruno");
        let form = [("name", name.as_str()), ("description", "a boxer")];

        let (status, _) = send(app.clone(), multipart_request("POST", "/api/actors", &form)).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(app, multipart_request("POST", "/api/actors", &form)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "CONFLICT");
    }

    #[tokio::test]
    #[ignore]
    async fn test_delete_actor_succeeds_when_image_delete_fails() {
        let s3 = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path_regex("^/storyboard-test/actor_images/"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&s3)
            .await;

        let db = database().await;
        let name = unique("Ines");
        sqlx::query("INSERT INTO actors (name, description, image_keys) VALUES ($1, 'a pilot', $2)")
            .bind(&name)
            .bind(vec![format!("actor_images/{name}_0.png")])
            .execute(&db)
            .await
            .unwrap();

        let app = build_router(app_state(
            db,
            &s3.uri(),
            UNREACHABLE,
            dalle_only(Arc::new(RecordingGenerator::new(ImageModel::Dalle))),
        ));
        let uri = format!("/api/actors/{name}");

        let (status, body) = send(app.clone(), empty_request("DELETE", &uri)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["message"],
            format!("Actor '{name}' deleted successfully")
        );

        let (status, _) = send(app, empty_request("GET", &uri)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
