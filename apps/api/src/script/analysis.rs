//! Key frame extraction from a film script.

use tracing::{error, info};

use super::parser::{has_frame_markers, parse_frames_response};
use super::prompts::{segment_prompt, whole_script_prompt};
use super::segmentation::{num_sets, split_segments, word_count};
use super::ExtractedFrame;
use crate::errors::AppError;
use crate::llm_client::prompts::STORYBOARD_ASSISTANT_SYSTEM;
use crate::llm_client::{ChatOptions, LlmClient, FAST_MODEL};

/// Most frames read from a pre-formatted script.
const MAX_PREFORMATTED_FRAMES: usize = 100;

const EXTRACTION_OPTIONS: ChatOptions = ChatOptions::new(FAST_MODEL)
    .max_tokens(1000)
    .temperature(0.7);

/// Extracts up to `frame_count` frames per page from `script`.
///
/// Scripts that already carry `Frame N:` markers are parsed directly. Long
/// scripts are split into segments, one page per segment; a segment whose
/// extraction fails is skipped.
pub async fn extract_key_frames(
    script: &str,
    frame_count: usize,
    llm: &LlmClient,
) -> Result<Vec<ExtractedFrame>, AppError> {
    let words = word_count(script);
    info!("Script analysis - word count: {words}");

    if has_frame_markers(script) {
        info!("Detected pre-formatted script with Frame markers - bypassing LLM analysis");
        return Ok(on_page(parse_frames_response(script, MAX_PREFORMATTED_FRAMES), 1));
    }

    let sets = num_sets(words, frame_count);
    info!("Extracting {sets} sets of {frame_count} frames from script with {words} words");

    if sets == 1 {
        let reply = llm
            .call_text(
                &whole_script_prompt(frame_count, script),
                STORYBOARD_ASSISTANT_SYSTEM,
                EXTRACTION_OPTIONS,
            )
            .await
            .map_err(|e| AppError::Llm(format!("Key frame extraction failed: {e}")))?;
        return Ok(on_page(parse_frames_response(&reply, frame_count), 1));
    }

    let segments = split_segments(script, sets);
    let total = segments.len();
    let mut frames = Vec::new();

    for (i, segment) in segments.iter().enumerate() {
        let prompt = segment_prompt(frame_count, i + 1, total, segment);
        match llm
            .call_text(&prompt, STORYBOARD_ASSISTANT_SYSTEM, EXTRACTION_OPTIONS)
            .await
        {
            Ok(reply) => {
                let page = (i + 1) as u32;
                frames.extend(on_page(parse_frames_response(&reply, frame_count), page));
            }
            Err(e) => error!("Error extracting frames for segment {}: {e}", i + 1),
        }
    }

    Ok(frames)
}

fn on_page(descriptions: Vec<String>, page: u32) -> Vec<ExtractedFrame> {
    descriptions
        .into_iter()
        .enumerate()
        .map(|(i, description)| ExtractedFrame {
            description,
            page,
            frame_on_page: (i + 1) as u32,
        })
        .collect()
}
