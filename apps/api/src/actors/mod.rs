//! Actor character profiles. An actor's `prompt_hint` is folded into image
//! prompts and grows from feedback notes.

use sqlx::PgPool;

use crate::errors::AppError;
use crate::models::actor::ActorRow;

pub mod form;
pub mod handlers;

pub async fn find_actor(db: &PgPool, name: &str) -> Result<Option<ActorRow>, AppError> {
    let row = sqlx::query_as::<_, ActorRow>("SELECT * FROM actors WHERE name = $1")
        .bind(name)
        .fetch_optional(db)
        .await?;
    Ok(row)
}

/// Names of the given actors that have at least one stored image.
pub async fn actors_with_images(db: &PgPool, names: &[String]) -> Result<Vec<String>, AppError> {
    if names.is_empty() {
        return Ok(Vec::new());
    }
    let rows: Vec<(String,)> = sqlx::query_as(
        "SELECT name FROM actors WHERE name = ANY($1) AND cardinality(image_keys) > 0",
    )
    .bind(names)
    .fetch_all(db)
    .await?;
    Ok(rows.into_iter().map(|(name,)| name).collect())
}

/// Folds feedback notes into an existing prompt hint.
pub fn merge_prompt_hint(current: &str, notes: &str) -> String {
    let current = current.trim();
    let notes = notes.trim();
    match (current.is_empty(), notes.is_empty()) {
        (_, true) => current.to_string(),
        (true, false) => notes.to_string(),
        (false, false) => format!("{current}. {notes}"),
    }
}

/// Appends feedback notes to an actor's prompt hint. Returns `false` when the
/// actor does not exist.
pub async fn append_feedback_to_hint(
    db: &PgPool,
    name: &str,
    notes: &str,
) -> Result<bool, AppError> {
    let Some(actor) = find_actor(db, name).await? else {
        return Ok(false);
    };
    let hint = merge_prompt_hint(&actor.prompt_hint, notes);
    sqlx::query("UPDATE actors SET prompt_hint = $1, updated_at = now() WHERE name = $2")
        .bind(&hint)
        .bind(name)
        .execute(db)
        .await?;
    Ok(true)
}

/// File-name stem for an actor's stored images. Anything other than
/// alphanumerics, `_` and `-` becomes `_`, so the stem stays one path segment.
pub fn file_stem(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
