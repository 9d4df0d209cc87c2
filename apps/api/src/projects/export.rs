//! Static HTML export of a project: a storyboard page with copied frame
//! images plus one report per character, written under
//! `exports/project_{id}/` in the bucket.

use std::collections::BTreeSet;

use tracing::{info, warn};

use crate::errors::AppError;
use crate::media::{MediaArea, MediaStore};
use crate::models::project::{CharacterProfile, Frame, Project};

const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";
const NOT_SPECIFIED: &str = "Not specified";

pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

pub fn export_dir(project_id: &str) -> String {
    format!("exports/project_{project_id}")
}

/// `Jane Doe` -> `Jane_Doe.html`. Path separators are replaced as well.
pub fn report_file_name(character_name: &str) -> String {
    let stem: String = character_name
        .chars()
        .map(|c| if matches!(c, ' ' | '/' | '\\') { '_' } else { c })
        .collect();
    format!("{stem}.html")
}

fn or_not_specified(value: Option<&str>) -> String {
    escape_html(value.filter(|v| !v.trim().is_empty()).unwrap_or(NOT_SPECIFIED))
}

pub fn character_report_html(name: &str, profile: &CharacterProfile) -> String {
    let name = escape_html(name);
    let traits = if profile.traits.is_empty() {
        NOT_SPECIFIED.to_string()
    } else {
        escape_html(&profile.traits.join(", "))
    };
    let role = or_not_specified(profile.role.as_deref());
    let motivation = or_not_specified(profile.motivation.as_deref());
    let arc = or_not_specified(profile.arc.as_deref());

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>Character Analysis: {name}</title>
    <style>
        body {{ font-family: Arial, sans-serif; line-height: 1.6; max-width: 800px; margin: 0 auto; padding: 20px; }}
        h1 {{ color: #333; border-bottom: 2px solid #ccc; padding-bottom: 10px; }}
        h2 {{ color: #444; margin-top: 30px; }}
        .section {{ margin-bottom: 40px; }}
    </style>
</head>
<body>
    <h1>{name} - Character Analysis</h1>
    <div class="section">
        <h2>Character Overview</h2>
        <p>Role: {role}</p>
        <p>Traits: {traits}</p>
        <p>Motivation: {motivation}</p>
        <p>Character Arc: {arc}</p>
    </div>
</body>
</html>
"#
    )
}

/// Relative path of frame `index` inside the export directory.
fn frame_image_path(index: usize) -> String {
    format!("images/frame_{index}.png")
}

/// Frames whose index is not in `with_images` are rendered without an `<img>`.
pub fn storyboard_html(
    project: &Project,
    frames: &[Frame],
    with_images: &BTreeSet<usize>,
) -> String {
    let title = escape_html(&project.title);
    let description = escape_html(project.description.as_deref().unwrap_or_default());

    let character_links: String = project
        .characters
        .0
        .keys()
        .map(|name| {
            format!(
                "            <a href=\"character_reports/{}\" class=\"character-link\">{}</a>\n",
                escape_html(&report_file_name(name)),
                escape_html(name)
            )
        })
        .collect();

    let mut html = format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>Storyboard: {title}</title>
    <style>
        body {{ font-family: Arial, sans-serif; line-height: 1.6; max-width: 1200px; margin: 0 auto; padding: 20px; }}
        h1 {{ color: #333; border-bottom: 2px solid #ccc; padding-bottom: 10px; }}
        .frame {{ border: 1px solid #ddd; padding: 15px; margin-bottom: 30px; }}
        .frame-image {{ max-width: 100%; }}
        .frame-description {{ margin-top: 10px; }}
        .character-link {{ margin-right: 10px; }}
    </style>
</head>
<body>
    <h1>Storyboard: {title}</h1>
    <p>{description}</p>
    <div class="frames">
"#
    );

    for (i, frame) in frames.iter().enumerate() {
        let number = i + 1;
        let text = if frame.description.trim().is_empty() {
            "No description".to_string()
        } else {
            escape_html(&frame.description)
        };
        let image = if with_images.contains(&i) {
            format!(
                "        <img src=\"{}\" class=\"frame-image\" alt=\"Frame {number}\">\n",
                frame_image_path(i)
            )
        } else {
            String::new()
        };
        html.push_str(&format!(
            r#"    <div class="frame">
        <h2>Frame {number}</h2>
{image}        <div class="frame-description">
            <p>{text}</p>
        </div>
        <div class="character-links">
            <h3>Characters:</h3>
{character_links}        </div>
    </div>
"#
        ));
    }

    html.push_str("    </div>\n</body>\n</html>\n");
    html
}

/// Bucket key of a frame's current image.
fn frame_image_key(frame: &Frame) -> String {
    frame
        .image_url
        .as_deref()
        .and_then(MediaArea::key_for_url)
        .unwrap_or_else(|| MediaArea::Frame.key(&format!("{}.png", frame.frame_id)))
}

/// Writes the export and returns its directory. Frames without a stored
/// image are exported without one.
pub async fn export_project(media: &MediaStore, project: &Project) -> Result<String, AppError> {
    let dir = export_dir(&project.project_id);

    for (name, profile) in &project.characters.0 {
        let key = format!("{dir}/character_reports/{}", report_file_name(name));
        media
            .put_text(&key, character_report_html(name, profile), HTML_CONTENT_TYPE)
            .await?;
    }

    let frames = &project.frames.0;
    let mut with_images = BTreeSet::new();
    for (i, frame) in frames.iter().enumerate() {
        let source = frame_image_key(frame);
        if media.exists(&source).await? {
            media
                .copy(&source, &format!("{dir}/{}", frame_image_path(i)))
                .await?;
            with_images.insert(i);
        } else {
            warn!("No image stored for frame {}, exporting without it", frame.frame_id);
        }
    }

    media
        .put_text(
            &format!("{dir}/storyboard.html"),
            storyboard_html(project, frames, &with_images),
            HTML_CONTENT_TYPE,
        )
        .await?;

    info!("Exported project {} to {dir}", project.project_id);
    Ok(dir)
}
