//! Prompts for LLM-based question structuring.
//!
//! Keeping prompts here means the wording can change without touching the
//! HTTP client, and tests can inspect them directly.
//!
//! Callers can override the system prompt via
//! [`crate::config::PipelineConfig::system_prompt`]; the constant here is
//! used only when no override is provided.

/// Default system instruction for turning exam text into question records.
///
/// The JSON keys listed here must match [`crate::output::Question`].
pub const QUESTION_EXTRACTION_PROMPT: &str = r#"You read text extracted from math exam papers and pull out the individual questions.

For every question in the text, identify:
1. question_text: the complete wording of the question
2. answer: the answer, if the text provides one (otherwise an empty string)
3. topic: the mathematical topic, e.g. Integration, Differentiation, Probability
4. difficulty: one of Easy, Medium, Hard
5. question_type: MC for multiple choice, LQ for long question

Respond with a JSON array only, where each element is an object with exactly these keys:
[{"question_text": "...", "answer": "...", "topic": "...", "difficulty": "...", "question_type": "..."}]

Include only genuine math questions. Skip page headers, instructions, mark allocations and other non-question text."#;

/// Build the user message carrying the extracted text.
pub fn user_message(text: &str) -> String {
    format!("Extract math questions from this text:\n\n{text}")
}
