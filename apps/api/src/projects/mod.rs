//! Storyboard projects: a script, the frames drawn from it, and exports.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::{error, info};
use uuid::Uuid;

use crate::llm_client::LlmClient;
use crate::models::project::Frame;
use crate::script::{extract_key_frames, order_by_page, parse_manual_frames, ExtractedFrame};

pub mod export;
pub mod generation;
pub mod handlers;
pub mod store;

/// Frames requested per page when a script is reanalysed.
pub const FRAMES_PER_PAGE: usize = 6;
/// Most frames pulled from the script of a new project.
pub const MAX_PROJECT_FRAMES: usize = 100;

/// Frames for a new project, with ids derived from the project id.
pub fn frames_for_new_project(project_id: &str, extracted: Vec<ExtractedFrame>) -> Vec<Frame> {
    extracted
        .into_iter()
        .enumerate()
        .map(|(i, f)| Frame {
            frame_id: format!("{project_id}_frame_{i}"),
            description: f.description,
            sequence: i,
            page: f.page,
            frame_on_page: f.frame_on_page,
            image_url: None,
        })
        .collect()
}

/// Orders frames by page and gives them fresh ids and sequence numbers.
pub fn renumber_frames(mut extracted: Vec<ExtractedFrame>) -> Vec<Frame> {
    order_by_page(&mut extracted);
    extracted
        .into_iter()
        .enumerate()
        .map(|(sequence, f)| Frame {
            frame_id: Uuid::new_v4().to_string(),
            description: f.description,
            sequence,
            page: f.page,
            frame_on_page: f.frame_on_page,
            image_url: None,
        })
        .collect()
}

/// Rebuilds frames after a script edit. Hand-written `Frame N` blocks are
/// used when present; otherwise the script is analysed, and an analysis
/// failure leaves the project without frames.
pub async fn rebuild_frames(script: &str, llm: &LlmClient) -> Vec<Frame> {
    let manual: Vec<ExtractedFrame> = parse_manual_frames(script)
        .into_iter()
        .map(|f| ExtractedFrame {
            description: f.description,
            page: f.page,
            frame_on_page: f.frame_on_page,
        })
        .collect();
    if !manual.is_empty() {
        info!("Parsed {} frames from frame markers", manual.len());
        return renumber_frames(manual);
    }

    info!("No frames found with manual parser, using script analysis");
    match extract_key_frames(script, FRAMES_PER_PAGE, llm).await {
        Ok(extracted) => renumber_frames(extracted),
        Err(e) => {
            error!("Error in script analysis: {e}");
            Vec::new()
        }
    }
}

/// Frames sorted by sequence, optionally only those on `page`.
pub fn frames_on_page(frames: &[Frame], page: Option<u32>) -> Vec<Frame> {
    let mut selected: Vec<Frame> = frames
        .iter()
        .filter(|f| page.map_or(true, |p| f.page == p))
        .cloned()
        .collect();
    selected.sort_by_key(|f| f.sequence);
    selected
}

#[derive(Debug, Serialize, PartialEq)]
pub struct PageInfo {
    pub total_pages: usize,
    pub frames_per_page: usize,
    pub total_frames: usize,
}

/// `total_pages` counts distinct pages that hold a frame.
pub fn page_info(frames: &[Frame]) -> PageInfo {
    let pages: BTreeSet<u32> = frames.iter().map(|f| f.page).collect();
    PageInfo {
        total_pages: pages.len(),
        frames_per_page: FRAMES_PER_PAGE,
        total_frames: frames.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::MockServer;

    fn extracted(description: &str, page: u32, frame_on_page: u32) -> ExtractedFrame {
        ExtractedFrame {
            description: description.to_string(),
            page,
            frame_on_page,
        }
    }

    fn frame(sequence: usize, page: u32) -> Frame {
        Frame {
            frame_id: format!("f{sequence}"),
            description: String::new(),
            sequence,
            page,
            frame_on_page: 1,
            image_url: None,
        }
    }

    #[test]
    fn test_new_project_frame_ids() {
        let frames = frames_for_new_project("p1", vec![extracted("a", 1, 1), extracted("b", 2, 1)]);
        assert_eq!(frames[0].frame_id, "p1_frame_0");
        assert_eq!(frames[1].frame_id, "p1_frame_1");
        assert_eq!((frames[1].sequence, frames[1].page), (1, 2));
    }

    #[test]
    fn test_renumber_orders_by_page_then_position() {
        let frames = renumber_frames(vec![
            extracted("c", 2, 1),
            extracted("b", 1, 2),
            extracted("a", 1, 1),
        ]);
        let order: Vec<_> = frames.iter().map(|f| (f.description.as_str(), f.sequence)).collect();
        assert_eq!(order, vec![("a", 0), ("b", 1), ("c", 2)]);
        assert_ne!(frames[0].frame_id, frames[1].frame_id);
    }

    #[tokio::test]
    async fn test_rebuild_uses_frame_markers_without_llm() {
        // No mocks mounted: any LLM call would fail the rebuild.
        let server = MockServer::start().await;
        let llm = LlmClient::new("k".into(), &server.uri()).unwrap().with_max_retries(1);

        let frames = rebuild_frames("Frame 2: Later\nNight.\nFrame 1: Early\nDawn.", &llm).await;
        let descriptions: Vec<_> = frames.iter().map(|f| f.description.as_str()).collect();
        assert_eq!(descriptions, vec!["Early\nDawn.", "Later\nNight."]);
    }

    #[tokio::test]
    async fn test_rebuild_leaves_frames_empty_when_analysis_fails() {
        let server = MockServer::start().await;
        let llm = LlmClient::new("k".into(), &server.uri()).unwrap().with_max_retries(1);

        assert!(rebuild_frames("She waits by the door.", &llm).await.is_empty());
    }

    #[test]
    fn test_frames_on_page_filters_and_sorts() {
        let frames = vec![frame(2, 1), frame(0, 1), frame(1, 2)];
        let all: Vec<_> = frames_on_page(&frames, None).iter().map(|f| f.sequence).collect();
        assert_eq!(all, vec![0, 1, 2]);
        let first: Vec<_> = frames_on_page(&frames, Some(1)).iter().map(|f| f.sequence).collect();
        assert_eq!(first, vec![0, 2]);
    }

    #[test]
    fn test_page_info_counts_distinct_pages() {
        let frames = vec![frame(0, 1), frame(1, 1), frame(2, 3)];
        assert_eq!(
            page_info(&frames),
            PageInfo {
                total_pages: 2,
                frames_per_page: 6,
                total_frames: 3,
            }
        );
        assert_eq!(page_info(&[]).total_pages, 0);
    }
}
