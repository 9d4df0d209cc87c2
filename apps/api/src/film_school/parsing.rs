//! Readers for consultation replies. JSON is tried first by the agent; these
//! functions cover replies the model wrote as plain text.

use std::collections::BTreeMap;

use serde::Deserialize;

use super::{default_ratings, Evaluation, Question};

const PLACEHOLDER_STRENGTHS: [&str; 3] = [
    "Strong creative potential",
    "Good conceptual foundation",
    "Interesting premise",
];
const PLACEHOLDER_IMPROVEMENTS: [&str; 3] = [
    "Develop character motivations further",
    "Clarify narrative structure",
    "Enhance visual storytelling elements",
];
const MAX_LISTED: usize = 3;
const NOT_SPECIFIED: &str = "Not specified";

#[derive(Debug, Deserialize)]
pub struct QuestionsReply {
    #[serde(default)]
    pub questions: Vec<Question>,
}

/// Evaluation as the model returns it; absent fields take defaults.
#[derive(Debug, Deserialize)]
pub struct EvaluationReply {
    ratings: Option<BTreeMap<String, i64>>,
    strengths: Option<Vec<String>>,
    improvements: Option<Vec<String>>,
}

impl From<EvaluationReply> for Evaluation {
    fn from(reply: EvaluationReply) -> Self {
        let not_specified = || vec![NOT_SPECIFIED.to_string()];
        Evaluation {
            ratings: reply.ratings.unwrap_or_else(default_ratings),
            strengths: reply.strengths.unwrap_or_else(not_specified),
            improvements: reply.improvements.unwrap_or_else(not_specified),
        }
    }
}

/// Value after the first `:`, or empty.
fn after_colon(line: &str) -> String {
    line.split_once(':')
        .map(|(_, rest)| rest.trim().to_string())
        .unwrap_or_default()
}

/// Reads `Question N: ...` / `Explanation: ...` text. Lines starting with `Q`
/// open a question, lines starting with `E` set its explanation, and other
/// lines extend the explanation. Questions with no text are dropped.
pub fn parse_questions_text(text: &str) -> Vec<Question> {
    let mut questions = Vec::new();
    let mut current: Option<Question> = None;

    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if line.starts_with('Q') {
            if let Some(q) = current.take().filter(|q| !q.question.is_empty()) {
                questions.push(q);
            }
            current = Some(Question {
                question: after_colon(line),
                explanation: String::new(),
            });
        } else if line.starts_with('E') {
            if let (Some(q), Some((_, rest))) = (current.as_mut(), line.split_once(':')) {
                q.explanation = rest.trim().to_string();
            }
        } else if let Some(q) = current.as_mut().filter(|q| !q.question.is_empty()) {
            if !q.explanation.is_empty() {
                q.explanation.push(' ');
            }
            q.explanation.push_str(line);
        }
    }

    if let Some(q) = current.filter(|q| !q.question.is_empty()) {
        questions.push(q);
    }
    questions
}

#[derive(Clone, Copy, PartialEq)]
enum Section {
    Strengths,
    Improvements,
}

/// Which rating a line reports, if any.
fn rating_key(lower: &str) -> Option<&'static str> {
    if lower.contains("creative") && lower.contains("strength") {
        Some("creative")
    } else if lower.contains("technical") && lower.contains("quality") {
        Some("technical")
    } else if lower.contains("character") && lower.contains("depth") {
        Some("character")
    } else if lower.contains("visual") && lower.contains("potential") {
        Some("visual")
    } else {
        None
    }
}

/// Rating from the last two characters of a line, e.g. `... : 8` or `... 10`.
fn trailing_rating(line: &str) -> Option<i64> {
    let chars: Vec<char> = line.chars().collect();
    let tail: String = chars[chars.len().saturating_sub(2)..].iter().collect();
    tail.trim().parse().ok()
}

/// Drops a leading list marker such as `1.` or `- `.
fn strip_list_marker(line: &str) -> &str {
    let starts_with_marker = line
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_digit() || matches!(c, '•' | '-' | '*'));
    if !starts_with_marker {
        return line;
    }
    line.char_indices()
        .nth(2)
        .map_or("", |(idx, _)| &line[idx..])
        .trim()
}

/// Reads a plain-text evaluation. Rating lines set ratings; `...strength...:`
/// and `...improvement...:` / `...area...:` headers open list sections.
/// Each list keeps at most three entries and falls back to placeholders.
pub fn parse_evaluation_text(text: &str) -> Evaluation {
    let mut ratings = default_ratings();
    let mut strengths = Vec::new();
    let mut improvements = Vec::new();
    let mut section: Option<Section> = None;

    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let lower = line.to_lowercase();

        if let Some(key) = rating_key(&lower) {
            if let Some(value) = trailing_rating(line) {
                ratings.insert(key.to_string(), value);
            }
            continue;
        }

        if lower.contains("strength") && line.contains(':') {
            section = Some(Section::Strengths);
            continue;
        }
        if (lower.contains("improvement") || lower.contains("area")) && line.contains(':') {
            section = Some(Section::Improvements);
            continue;
        }

        let item = strip_list_marker(line);
        if item.is_empty() {
            continue;
        }
        match section {
            Some(Section::Strengths) => strengths.push(item.to_string()),
            Some(Section::Improvements) => improvements.push(item.to_string()),
            None => {}
        }
    }

    strengths.truncate(MAX_LISTED);
    improvements.truncate(MAX_LISTED);
    if strengths.is_empty() {
        strengths = PLACEHOLDER_STRENGTHS.iter().map(|s| s.to_string()).collect();
    }
    if improvements.is_empty() {
        improvements = PLACEHOLDER_IMPROVEMENTS.iter().map(|s| s.to_string()).collect();
    }

    Evaluation {
        ratings,
        strengths,
        improvements,
    }
}
