//! LLM calls behind the consultation: stage questions, answer evaluation and
//! suggested answers.

use serde_json::Value;
use tracing::{info, warn};

use super::parsing::{parse_evaluation_text, parse_questions_text, EvaluationReply, QuestionsReply};
use super::prompts::{
    evaluation_prompt, questions_prompt, suggestion_prompt, EVALUATOR_SYSTEM, PROFESSOR_SYSTEM,
    SUGGESTION_SYSTEM,
};
use super::{Evaluation, Question, Stage};
use crate::errors::AppError;
use crate::llm_client::{parse_json_reply, ChatOptions, LlmClient, FAST_MODEL, REASONING_MODEL};

const QUESTION_OPTIONS: ChatOptions = ChatOptions::new(REASONING_MODEL)
    .max_tokens(1500)
    .temperature(0.7);

const EVALUATION_OPTIONS: ChatOptions = ChatOptions::new(REASONING_MODEL);

const SUGGESTION_OPTIONS: ChatOptions = ChatOptions::new(FAST_MODEL)
    .max_tokens(300)
    .temperature(0.7);

/// Asks for five questions on the stage's topics about `project_context`.
pub async fn generate_questions(
    llm: &LlmClient,
    project_context: &str,
    stage: Stage,
) -> Result<Vec<Question>, AppError> {
    let reply = llm
        .call_text(
            &questions_prompt(project_context, stage),
            PROFESSOR_SYSTEM,
            QUESTION_OPTIONS,
        )
        .await
        .map_err(|e| AppError::Llm(format!("Question generation failed: {e}")))?;

    let questions = match parse_json_reply::<QuestionsReply>(&reply) {
        Ok(parsed) => parsed.questions,
        Err(e) => {
            warn!("Questions reply was not JSON ({e}), reading it as text");
            parse_questions_text(&reply)
        }
    };
    if questions.is_empty() {
        return Err(AppError::Llm(format!(
            "No questions generated for stage {}",
            stage.as_str()
        )));
    }
    info!("Generated {} questions for stage {}", questions.len(), stage.as_str());
    Ok(questions)
}

/// Rates the answers and lists strengths and improvements.
pub async fn evaluate_answers(
    llm: &LlmClient,
    questions: &[Question],
    answers: &[String],
) -> Result<Evaluation, AppError> {
    let reply = llm
        .call_text(
            &evaluation_prompt(questions, answers),
            EVALUATOR_SYSTEM,
            EVALUATION_OPTIONS,
        )
        .await
        .map_err(|e| AppError::Llm(format!("Answer evaluation failed: {e}")))?;

    Ok(match parse_json_reply::<EvaluationReply>(&reply) {
        Ok(parsed) => parsed.into(),
        Err(e) => {
            warn!("Evaluation reply was not JSON ({e}), reading it as text");
            parse_evaluation_text(&reply)
        }
    })
}

pub async fn suggest_answer(
    llm: &LlmClient,
    question: &str,
    explanation: &str,
    context: &Value,
) -> Result<String, AppError> {
    llm.call_text(
        &suggestion_prompt(question, explanation, context),
        SUGGESTION_SYSTEM,
        SUGGESTION_OPTIONS,
    )
    .await
    .map_err(|e| AppError::Llm(format!("Answer suggestion failed: {e}")))
}
