//! Parsers that turn model replies and hand-written scripts into frame descriptions.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::info;

use super::ExtractedFrame;

/// `Frame 3: Title` at the start of a line.
static FRAME_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:Frame|FRAME)\s+(\d+):\s*(.*)$").expect("frame marker regex should be valid")
});

/// `Frame 3`, `frame 3:`, `FRAME 3. Title`, case-insensitive.
static MANUAL_FRAME_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^frame\s+(\d+)(?:[:.\s]|$)(.*)$")
        .expect("manual frame marker regex should be valid")
});

/// `Part 2` page marker.
static PART_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^part\s+(\d+)").expect("part marker regex should be valid"));

/// `3. text` or `3) text` list item.
static NUMBERED_ITEM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d+[.)](?:\s+(.*))?$").expect("numbered item regex should be valid")
});

/// `3.` at the start of a line inside a frame.
static NUMBERED_CONTINUATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+\.").expect("numbered continuation regex should be valid"));

/// True when text uses explicit `Frame N:` markers.
pub fn has_frame_markers(text: &str) -> bool {
    text.contains("Frame ") && text.contains(':')
}

/// Parses frame descriptions out of `text`, returning at most `frame_count`.
///
/// Text with `Frame N:` markers is read marker by marker. Anything else is read
/// as a numbered list; text before the first number becomes its own entry, which
/// keeps the first frame of replies to prompts that end in `1.`. When nothing
/// is found the text is split into sentences.
pub fn parse_frames_response(text: &str, frame_count: usize) -> Vec<String> {
    let mut frames = if has_frame_markers(text) {
        let frames = parse_marked_frames(text);
        info!("Found {} frames from pre-formatted script", frames.len());
        frames
    } else {
        parse_numbered_frames(text)
    };

    frames.truncate(frame_count);

    if frames.is_empty() {
        frames = split_sentences(text).into_iter().take(frame_count).collect();
    }
    frames
}

fn parse_marked_frames(text: &str) -> Vec<String> {
    let mut frames: Vec<String> = Vec::new();
    let mut current: Option<String> = None;

    for line in text.lines().map(str::trim) {
        if let Some(caps) = FRAME_MARKER.captures(line) {
            if let Some(done) = current.take().filter(|c| !c.is_empty()) {
                frames.push(done);
            }
            current = Some(caps.get(2).map_or("", |m| m.as_str()).trim().to_string());
            continue;
        }

        let Some(content) = current.as_mut() else {
            continue;
        };
        if NUMBERED_CONTINUATION.is_match(line) && !frames.is_empty() {
            let finished = std::mem::take(content);
            if !finished.is_empty() {
                frames.push(finished);
            }
            *content = line
                .split_once('.')
                .map_or("", |(_, rest)| rest)
                .trim()
                .to_string();
        } else if !line.is_empty() {
            if !content.is_empty() {
                content.push('\n');
            }
            content.push_str(line);
        }
    }

    if let Some(done) = current.filter(|c| !c.is_empty()) {
        frames.push(done);
    }
    frames
}

fn parse_numbered_frames(text: &str) -> Vec<String> {
    let mut frames = Vec::new();
    let mut current = String::new();

    for line in text.lines().map(str::trim) {
        if let Some(caps) = NUMBERED_ITEM.captures(line) {
            if !current.trim().is_empty() {
                frames.push(current.trim().to_string());
            }
            current = caps.get(1).map_or("", |m| m.as_str()).trim().to_string();
        } else if !line.is_empty() {
            if !current.is_empty() {
                current.push('\n');
            }
            current.push_str(line);
        }
    }

    if !current.trim().is_empty() {
        frames.push(current.trim().to_string());
    }
    frames
}

/// Splits after `.`, `!` or `?` followed by whitespace.
fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((_, c)) = chars.next() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }
        if let Some(&(next_idx, next)) = chars.peek() {
            if next.is_whitespace() {
                sentences.push(text[start..next_idx].trim().to_string());
                start = next_idx;
            }
        }
    }
    sentences.push(text[start..].trim().to_string());
    sentences.retain(|s| !s.is_empty());
    sentences
}

/// A frame read from a hand-written script.
#[derive(Debug, Clone, PartialEq)]
pub struct ManualFrame {
    pub description: String,
    pub page: u32,
    pub frame_on_page: u32,
}

struct OpenFrame {
    page: u32,
    frame_on_page: u32,
    lines: Vec<String>,
}

impl OpenFrame {
    fn finish(self) -> Option<ManualFrame> {
        let description = self.lines.join("\n").trim().to_string();
        (!description.is_empty()).then_some(ManualFrame {
            description,
            page: self.page,
            frame_on_page: self.frame_on_page,
        })
    }
}

/// Reads `Frame N` blocks from a hand-written script. `Part N` lines set the
/// page of the open frame. Frames without content are dropped; lines before
/// the first marker are ignored.
pub fn parse_manual_frames(script: &str) -> Vec<ManualFrame> {
    let mut frames = Vec::new();
    let mut open: Option<OpenFrame> = None;

    for line in script.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if let Some(caps) = MANUAL_FRAME_MARKER.captures(line) {
            if let Some(frame) = open.take().and_then(OpenFrame::finish) {
                frames.push(frame);
            }
            let frame_on_page = caps
                .get(1)
                .and_then(|m| m.as_str().parse().ok())
                .unwrap_or(frames.len() as u32 + 1);
            let title = caps.get(2).map_or("", |m| m.as_str()).trim();
            let lines = if title.is_empty() {
                Vec::new()
            } else {
                vec![title.to_string()]
            };
            open = Some(OpenFrame {
                page: 1,
                frame_on_page,
                lines,
            });
        } else if let Some(caps) = PART_MARKER.captures(line) {
            if let (Some(frame), Some(page)) = (
                open.as_mut(),
                caps.get(1).and_then(|m| m.as_str().parse().ok()),
            ) {
                frame.page = page;
            }
        } else if let Some(frame) = open.as_mut() {
            frame.lines.push(line.to_string());
        }
    }

    if let Some(frame) = open.and_then(OpenFrame::finish) {
        frames.push(frame);
    }
    frames
}

/// Orders frames by page, then by position within the page. Stable for ties.
pub fn order_by_page(frames: &mut [ExtractedFrame]) {
    frames.sort_by_key(|f| (f.page, f.frame_on_page));
}
