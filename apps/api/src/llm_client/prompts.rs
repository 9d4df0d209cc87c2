// Shared prompt constants.
// Each service that needs LLM calls defines its own prompts.rs alongside it.
// This file contains cross-cutting prompt fragments.

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Persona shared by every storyboard-facing prompt.
pub const STORYBOARD_ASSISTANT_SYSTEM: &str = "You are a film storyboard assistant. \
    You read scripts and describe distinct, visually concrete moments \
    that an illustrator can draw as individual storyboard frames.";
