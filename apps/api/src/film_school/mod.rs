//! Film school consultation: four stages of questions, evaluation of the
//! user's answers, and suggested answers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub mod agent;
pub mod handlers;
pub mod parsing;
pub mod pipeline;
pub mod prompts;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Initial,
    CharacterDevelopment,
    PlotStructure,
    VisualStyle,
}

impl Stage {
    pub const ALL: [Stage; 4] = [
        Stage::Initial,
        Stage::CharacterDevelopment,
        Stage::PlotStructure,
        Stage::VisualStyle,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Initial => "initial",
            Stage::CharacterDevelopment => "character_development",
            Stage::PlotStructure => "plot_structure",
            Stage::VisualStyle => "visual_style",
        }
    }

    pub fn index(&self) -> i32 {
        match self {
            Stage::Initial => 0,
            Stage::CharacterDevelopment => 1,
            Stage::PlotStructure => 2,
            Stage::VisualStyle => 3,
        }
    }

    /// Stage at `index`, clamped into range.
    pub fn from_index(index: i32) -> Stage {
        Stage::ALL[index.clamp(0, 3) as usize]
    }

    pub fn next(&self) -> Option<Stage> {
        Stage::ALL.get(self.index() as usize + 1).copied()
    }

    /// Topics the stage's questions cover.
    pub fn categories(&self) -> [&'static str; 4] {
        match self {
            Stage::Initial => [
                "genre and inspiration",
                "thematic elements",
                "core conflict",
                "audience and purpose",
            ],
            Stage::CharacterDevelopment => [
                "protagonist motivation",
                "character arcs",
                "internal vs external conflicts",
                "relationship dynamics",
            ],
            Stage::PlotStructure => [
                "narrative architecture",
                "pacing and tension",
                "subplot integration",
                "climax construction",
            ],
            Stage::VisualStyle => [
                "visual motifs",
                "color palette and symbolism",
                "camera techniques",
                "editing rhythm",
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub question: String,
    #[serde(default)]
    pub explanation: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Answer {
    pub question_id: i64,
    pub answer: String,
}

pub const RATING_KEYS: [&str; 4] = ["creative", "technical", "character", "visual"];
pub const DEFAULT_RATING: i64 = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub ratings: BTreeMap<String, i64>,
    pub strengths: Vec<String>,
    pub improvements: Vec<String>,
}

pub fn default_ratings() -> BTreeMap<String, i64> {
    RATING_KEYS
        .iter()
        .map(|k| (k.to_string(), DEFAULT_RATING))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_order_and_clamping() {
        assert_eq!(Stage::Initial.next(), Some(Stage::CharacterDevelopment));
        assert_eq!(Stage::VisualStyle.next(), None);
        assert_eq!(Stage::from_index(7), Stage::VisualStyle);
        assert_eq!(Stage::from_index(-1), Stage::Initial);
        for stage in Stage::ALL {
            assert_eq!(Stage::from_index(stage.index()), stage);
        }
    }

    #[test]
    fn test_stage_serde_names() {
        assert_eq!(
            serde_json::to_string(&Stage::CharacterDevelopment).unwrap(),
            "\"character_development\""
        );
        assert_eq!(Stage::PlotStructure.as_str(), "plot_structure");
    }
}
