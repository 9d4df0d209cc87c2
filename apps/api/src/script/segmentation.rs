//! Splits long scripts into segments that are storyboarded separately.

use once_cell::sync::Lazy;
use regex::Regex;

/// Roughly one frame per this many words of script.
const WORDS_PER_FRAME: usize = 175;
/// Scripts shorter than this are always storyboarded in one pass.
const SINGLE_SET_WORD_LIMIT: usize = 1000;
pub const MAX_SETS: usize = 50;

/// Scene headings such as `INT. COFFEE SHOP - DAY`.
static SCENE_HEADING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:INT/EXT\.|INT\.|EXT\.|I/E\.)[ \t]+[\w \t-]+")
        .expect("scene heading regex should be valid")
});

pub fn word_count(script: &str) -> usize {
    script.split_whitespace().count()
}

/// Number of frame sets (pages) to extract for a script of `word_count` words.
pub fn num_sets(word_count: usize, frame_count: usize) -> usize {
    if word_count < SINGLE_SET_WORD_LIMIT {
        return 1;
    }
    let frame_count = frame_count.max(1);
    let estimated_total = frame_count.max(word_count / WORDS_PER_FRAME);
    (estimated_total / frame_count).clamp(1, MAX_SETS)
}

/// Splits `script` into at most `num_sets` segments, preferring scene headings
/// as boundaries and falling back to blank-line paragraphs.
pub fn split_segments(script: &str, num_sets: usize) -> Vec<String> {
    let num_sets = num_sets.max(1);
    let headings: Vec<usize> = SCENE_HEADING.find_iter(script).map(|m| m.start()).collect();

    let mut segments = if headings.len() >= num_sets {
        split_on_headings(script, &headings, num_sets)
    } else {
        split_on_paragraphs(script, num_sets)
    };
    segments.truncate(num_sets);
    segments
}

fn split_on_headings(script: &str, headings: &[usize], num_sets: usize) -> Vec<String> {
    let per_segment = (headings.len() / num_sets).max(1);

    let mut boundaries = vec![0];
    boundaries.extend(headings.iter().step_by(per_segment).copied());
    boundaries.push(script.len());
    boundaries.dedup();

    boundaries
        .windows(2)
        .map(|w| script[w[0]..w[1]].trim())
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn split_on_paragraphs(script: &str, num_sets: usize) -> Vec<String> {
    let paragraphs: Vec<&str> = script
        .split("\n\n")
        .filter(|p| !p.trim().is_empty())
        .collect();
    let per_segment = (paragraphs.len() / num_sets).max(1);

    paragraphs
        .chunks(per_segment)
        .map(|chunk| chunk.join("\n\n"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_scripts_use_one_set() {
        assert_eq!(num_sets(999, 6), 1);
        assert_eq!(num_sets(0, 6), 1);
    }

    #[test]
    fn test_long_scripts_scale_and_cap() {
        // 2100 words -> 12 frames -> 2 sets of 6
        assert_eq!(num_sets(2100, 6), 2);
        assert_eq!(num_sets(1_000_000, 6), MAX_SETS);
        // frame_count larger than the estimate still yields one set
        assert_eq!(num_sets(5000, 100), 1);
    }

    #[test]
    fn test_split_on_scene_headings() {
        let script = "INT. HOUSE - DAY\nAnna wakes.\n\nEXT. ROAD - NIGHT\nA car passes.\n\n\
                      INT. CAR - NIGHT\nBen drives.\n\nEXT. FIELD - DAY\nThey stop.";
        let segments = split_segments(script, 2);
        assert_eq!(segments.len(), 2);
        assert!(segments[0].starts_with("INT. HOUSE"));
        assert!(segments[0].contains("A car passes."));
        assert!(segments[1].starts_with("INT. CAR"));
        assert!(segments[1].ends_with("They stop."));
    }

    #[test]
    fn test_headings_are_case_insensitive_and_keep_preamble() {
        let script = "FADE IN:\n\nint. attic - night\nDust.\n\next. roof - night\nWind.";
        let segments = split_segments(script, 2);
        assert_eq!(segments, vec!["FADE IN:", "int. attic - night\nDust."]);
    }

    #[test]
    fn test_paragraph_fallback_groups_paragraphs() {
        let script = "one\n\ntwo\n\nthree\n\nfour";
        assert_eq!(split_segments(script, 2), vec!["one\n\ntwo", "three\n\nfour"]);
    }

    #[test]
    fn test_paragraph_fallback_truncates_to_set_count() {
        let script = "a\n\nb\n\nc";
        assert_eq!(split_segments(script, 2), vec!["a", "b"]);
    }
}
