use serde_json::Value;

use super::{Question, Stage};

pub const PROFESSOR_SYSTEM: &str = "You are a USC Film School professor conducting a \
    creative consultation with a filmmaker.";

pub const EVALUATOR_SYSTEM: &str = "You are a film professor evaluating a filmmaker's \
    answers to screenwriting questions.";

pub const SUGGESTION_SYSTEM: &str = "You are an experienced filmmaker assisting with a \
    film school consultation.";

pub fn questions_prompt(project_context: &str, stage: Stage) -> String {
    let categories = stage.categories().join(", ");
    format!(
        r#"Project Context: {project_context}

Generate 5 thoughtful, probing questions about {categories} that will:
1. Challenge the filmmaker to think deeply about their creative choices
2. Guide them toward professional-grade storytelling
3. Help refine their narrative and visual approach
4. Draw on established film theory and industry best practices

Format each question with a brief explanation of why it's important to consider.

Return the questions in the following JSON format:
{{
    "questions": [
        {{
            "question": "What is your question here?",
            "explanation": "Why this question is important to consider..."
        }}
    ]
}}"#
    )
}

pub fn evaluation_prompt(questions: &[Question], answers: &[String]) -> String {
    let mut prompt =
        String::from("As a film professor, evaluate these answers to screenwriting questions:\n\n");
    for (q, a) in questions.iter().zip(answers) {
        prompt.push_str(&format!("Question: {}\nAnswer: {a}\n\n", q.question));
    }
    prompt.push_str(
        r#"Provide an assessment with:
1. Overall creative strength (1-10)
2. Technical storytelling quality (1-10)
3. Character development depth (1-10)
4. Visual storytelling potential (1-10)
5. Three specific strengths
6. Three areas for improvement with professional guidance

Return the evaluation in the following JSON format:
{
    "ratings": {
        "creative": 7,
        "technical": 6,
        "character": 8,
        "visual": 7
    },
    "strengths": ["Strength 1", "Strength 2", "Strength 3"],
    "improvements": ["Improvement area 1", "Improvement area 2", "Improvement area 3"]
}"#,
    );
    prompt
}

/// Context fields are read loosely: missing or mistyped entries become empty.
pub fn suggestion_prompt(question: &str, explanation: &str, context: &Value) -> String {
    let text = |key: &str, default: &'static str| {
        context
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or(default)
            .to_string()
    };
    let title = text("projectTitle", "");
    let description = text("projectDescription", "");
    let stage = text("currentStage", "initial");

    let mut previous = String::new();
    if let Some(answers) = context
        .get("previousAnswers")
        .and_then(Value::as_array)
        .filter(|a| !a.is_empty())
    {
        previous.push_str("Previous answers in this consultation:\n");
        for qa in answers {
            let field = |k| qa.get(k).and_then(Value::as_str).unwrap_or("");
            previous.push_str(&format!("Q: {}\nA: {}\n\n", field("question"), field("answer")));
        }
    }

    format!(
        r#"Project Title: {title}
Project Description: {description}
Current Stage: {stage}

{previous}
The following question has been asked:
Question: {question}
Context: {explanation}

Generate a thoughtful, professional response to this question that demonstrates:
1. Deep understanding of filmmaking principles
2. Creative and original thinking
3. Practical knowledge of film production
4. Awareness of storytelling techniques

The response should be 3-5 sentences and showcase what a skilled filmmaker would answer."#
    )
}
