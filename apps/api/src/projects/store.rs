//! Project persistence. Frames, characters and scenes are JSONB columns on the
//! project row.

use sqlx::types::Json;
use sqlx::PgPool;

use crate::errors::AppError;
use crate::models::project::{Frame, Project};

pub async fn find_project(db: &PgPool, project_id: &str) -> Result<Option<Project>, AppError> {
    let project = sqlx::query_as::<_, Project>("SELECT * FROM projects WHERE project_id = $1")
        .bind(project_id)
        .fetch_optional(db)
        .await?;
    Ok(project)
}

/// Like [`find_project`], but missing projects are a 404.
pub async fn require_project(db: &PgPool, project_id: &str) -> Result<Project, AppError> {
    find_project(db, project_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Project with ID {project_id} not found")))
}

pub async fn list_projects(db: &PgPool) -> Result<Vec<Project>, AppError> {
    let projects = sqlx::query_as::<_, Project>("SELECT * FROM projects ORDER BY created_at DESC")
        .fetch_all(db)
        .await?;
    Ok(projects)
}

pub async fn insert_project(
    db: &PgPool,
    project_id: &str,
    title: &str,
    description: Option<&str>,
    script: Option<&str>,
    frames: &[Frame],
) -> Result<Project, AppError> {
    let project = sqlx::query_as::<_, Project>(
        r#"
        INSERT INTO projects (project_id, title, description, script, frames)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(project_id)
    .bind(title)
    .bind(description)
    .bind(script)
    .bind(Json(frames))
    .fetch_one(db)
    .await?;
    Ok(project)
}

/// Writes the editable fields of `project` back to its row.
pub async fn update_project(db: &PgPool, project: &Project) -> Result<Project, AppError> {
    let updated = sqlx::query_as::<_, Project>(
        r#"
        UPDATE projects
        SET title = $1, description = $2, script = $3, frames = $4, updated_at = now()
        WHERE project_id = $5
        RETURNING *
        "#,
    )
    .bind(&project.title)
    .bind(&project.description)
    .bind(&project.script)
    .bind(&project.frames)
    .bind(&project.project_id)
    .fetch_optional(db)
    .await?
    .ok_or_else(|| AppError::NotFound("Project not found after update".to_string()))?;
    Ok(updated)
}

/// Points one embedded frame's `image_url` at `image_url`, leaving the other
/// frames as they are in the row. Returns `false` when the project no longer
/// holds a frame with that id.
pub async fn set_frame_image_url(
    db: &PgPool,
    project_id: &str,
    frame_id: &str,
    image_url: &str,
) -> Result<bool, AppError> {
    let result = sqlx::query(
        r#"
        UPDATE projects
        SET frames = (
                SELECT jsonb_agg(
                    CASE WHEN f ->> 'frame_id' = $2
                        THEN jsonb_set(f, '{image_url}', to_jsonb($3::text))
                        ELSE f
                    END
                    ORDER BY ord
                )
                FROM jsonb_array_elements(frames) WITH ORDINALITY AS t(f, ord)
            ),
            updated_at = now()
        WHERE project_id = $1
          AND frames @> jsonb_build_array(jsonb_build_object('frame_id', $2::text))
        "#,
    )
    .bind(project_id)
    .bind(frame_id)
    .bind(image_url)
    .execute(db)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Returns `false` when no project had the id.
pub async fn delete_project(db: &PgPool, project_id: &str) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM projects WHERE project_id = $1")
        .bind(project_id)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{database, unique};

    fn frame(project_id: &str, index: usize, description: &str) -> Frame {
        Frame {
            frame_id: format!("{project_id}_frame_{index}"),
            description: description.to_string(),
            sequence: index,
            page: 1,
            frame_on_page: index as u32 + 1,
            image_url: None,
        }
    }

    #[tokio::test]
    #[ignore]
    async fn test_set_frame_image_url_updates_one_frame() {
        let db = database().await;
        let id = unique("project");
        let frames = vec![frame(&id, 0, "Harbour"), frame(&id, 1, "Storm")];
        insert_project(&db, &id, "Dust", None, None, &frames)
            .await
            .unwrap();

        let url = format!("/frame-images/{id}_frame_1.png");
        assert!(set_frame_image_url(&db, &id, &frames[1].frame_id, &url)
            .await
            .unwrap());

        let stored = require_project(&db, &id).await.unwrap().frames.0;
        assert_eq!(stored[0], frames[0]);
        assert_eq!(stored[1].description, "Storm");
        assert_eq!(stored[1].image_url.as_deref(), Some(url.as_str()));
    }

    #[tokio::test]
    #[ignore]
    async fn test_set_frame_image_url_keeps_frames_from_a_later_edit() {
        let db = database().await;
        let id = unique("project");
        let original = vec![frame(&id, 0, "Harbour")];
        let script = Some("Frame 1: Harbour");
        let mut project = insert_project(&db, &id, "Dust", None, script, &original)
            .await
            .unwrap();

        // The script is edited while the original frame is being drawn.
        let rebuilt = vec![frame(&id, 7, "Rain on glass")];
        project.frames.0 = rebuilt.clone();
        update_project(&db, &project).await.unwrap();

        let url = format!("/frame-images/{id}_frame_0.png");
        assert!(!set_frame_image_url(&db, &id, &original[0].frame_id, &url)
            .await
            .unwrap());
        assert_eq!(require_project(&db, &id).await.unwrap().frames.0, rebuilt);
    }
}
