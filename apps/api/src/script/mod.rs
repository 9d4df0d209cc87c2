//! Script analysis: splitting a film script into storyboard frames.

use serde::{Deserialize, Serialize};

pub mod analysis;
pub mod handlers;
pub mod parser;
pub mod prompts;
pub mod segmentation;

pub use analysis::extract_key_frames;
pub use parser::{order_by_page, parse_manual_frames};

/// A frame description as returned by `/api/script/analyze`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameDescription {
    pub index: usize,
    pub description: String,
}

/// A frame extracted from a script, placed on a page.
/// `page` and `frame_on_page` are 1-based.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedFrame {
    pub description: String,
    pub page: u32,
    pub frame_on_page: u32,
}
