pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;
use crate::{actors, feedback, film_school, imaging, media, projects, realtime, script};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health::root_handler))
        .route("/health", get(health::health_handler))
        .route("/api/health", get(health::health_handler))
        .route("/initialize", post(media::handle_initialize))
        .route("/api/initialize", post(media::handle_initialize))
        // Stored media
        .route("/images/:file", get(media::handle_generated_image))
        .route("/actor-images/:file", get(media::handle_actor_image))
        .route("/frame-images/:file", get(media::handle_frame_image))
        // Script analysis
        .route("/api/script/analyze", post(script::handlers::handle_analyze))
        // Image generation
        .route("/api/images/generate", post(imaging::handlers::handle_generate))
        .route(
            "/api/images/generate-character-variants",
            post(imaging::handlers::handle_generate_character_variants),
        )
        .route(
            "/api/images/generate-frame",
            post(imaging::handlers::handle_generate_frame),
        )
        .route(
            "/api/images/generate-storyboard",
            post(imaging::handlers::handle_generate_storyboard),
        )
        // Actors
        .route(
            "/api/actors",
            get(actors::handlers::handle_list_actors).post(actors::handlers::handle_create_actor),
        )
        .route(
            "/api/actors/:name",
            get(actors::handlers::handle_get_actor)
                .put(actors::handlers::handle_update_actor)
                .delete(actors::handlers::handle_delete_actor),
        )
        // Feedback
        .route(
            "/api/feedback/frames/:frame_id",
            post(feedback::handlers::handle_frame_feedback),
        )
        // Projects
        .route(
            "/api/projects",
            get(projects::handlers::handle_list_projects)
                .post(projects::handlers::handle_create_project),
        )
        .route(
            "/api/projects/:id",
            get(projects::handlers::handle_get_project)
                .put(projects::handlers::handle_update_project)
                .delete(projects::handlers::handle_delete_project),
        )
        .route(
            "/api/projects/:id/frames",
            get(projects::handlers::handle_get_frames),
        )
        .route("/api/projects/:id/pages", get(projects::handlers::handle_get_pages))
        .route(
            "/api/projects/:id/frames/:frame_id/generate",
            post(projects::handlers::handle_generate_frame),
        )
        .route(
            "/api/projects/:id/generate-all",
            post(projects::handlers::handle_generate_all),
        )
        .route("/api/projects/:id/export", post(projects::handlers::handle_export))
        // Film school consultation
        .route(
            "/api/film-school/projects",
            post(film_school::handlers::handle_create_consultation),
        )
        .route(
            "/api/film-school/projects/:id/questions",
            get(film_school::handlers::handle_get_questions),
        )
        .route(
            "/api/film-school/projects/:id/answers",
            post(film_school::handlers::handle_submit_answers),
        )
        .route(
            "/api/film-school/projects/:id/characters",
            get(film_school::handlers::handle_get_characters),
        )
        .route(
            "/api/film-school/projects/:id/scenes",
            get(film_school::handlers::handle_get_scenes),
        )
        .route(
            "/api/film-school/generate-suggestion",
            post(film_school::handlers::handle_generate_suggestion),
        )
        // Realtime
        .route("/ws", get(realtime::handle_ws))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::json;
    use tower::ServiceExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::testing::{empty_request, json_request, offline_state, send, UNREACHABLE};

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        json_request("POST", uri, body)
    }

    #[tokio::test]
    async fn test_health_routes() {
        for uri in ["/health", "/api/health"] {
            let app = build_router(offline_state(UNREACHABLE));
            let (status, body) = send(app, empty_request("GET", uri)).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body, json!({"status": "ok", "message": "API is healthy"}));
        }
    }

    #[tokio::test]
    async fn test_root_welcome() {
        let app = build_router(offline_state(UNREACHABLE));
        let (status, body) = send(app, empty_request("GET", "/")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["message"].as_str().unwrap().contains("StoryboardAI"));
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let app = build_router(offline_state(UNREACHABLE));
        let response = app
            .oneshot(empty_request("GET", "/api/nope"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unknown_image_model_is_rejected() {
        let app = build_router(offline_state(UNREACHABLE));
        let (status, body) = send(
            app,
            post_json("/api/images/generate", json!({"prompt": "a fox", "model": "midjourney"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_unconfigured_stable_diffusion_is_rejected() {
        let app = build_router(offline_state(UNREACHABLE));
        let (status, _) = send(
            app,
            post_json(
                "/api/images/generate",
                json!({"prompt": "a fox", "model": "stable_diffusion"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_script_analyze_validates_frame_count() {
        let app = build_router(offline_state(UNREACHABLE));
        let (status, _) = send(
            app,
            post_json("/api/script/analyze", json!({"script_text": "Rain.", "frame_count": 0})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_generate_suggestion_round_trip() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "Use long takes."}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let app = build_router(offline_state(&server.uri()));
        let (status, body) = send(
            app,
            post_json(
                "/api/film-school/generate-suggestion",
                json!({
                    "question": "How will you shoot the chase?",
                    "explanation": "Pacing",
                    "context": {"projectTitle": "Dust"}
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"suggestion": "Use long takes."}));
    }

    #[tokio::test]
    async fn test_media_rejects_traversal_names() {
        let app = build_router(offline_state(UNREACHABLE));
        let (status, _) = send(app, empty_request("GET", "/images/..")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
