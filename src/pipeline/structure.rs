//! Question structuring: extracted text → `Vec<Question>` via the LLM.
//!
//! Every failure (transport, HTTP status, empty choices, malformed JSON) is
//! logged and turned into an empty list. The orchestrator then reports
//! "No questions found in text", which is the only signal the upload form
//! needs.

use crate::config::PipelineConfig;
use crate::error::{PipelineError, StructureError};
use crate::output::Question;
use crate::pipeline::llm::{ChatClient, ChatMessage};
use crate::pipeline::postprocess::clean_llm_response;
use crate::prompts::{user_message, QUESTION_EXTRACTION_PROMPT};
use tracing::{debug, info, warn};

/// Asks the LLM to split exam text into [`Question`]s.
#[derive(Debug, Clone)]
pub struct QuestionStructurer {
    client: ChatClient,
    system_prompt: String,
}

impl QuestionStructurer {
    pub fn new(client: ChatClient, system_prompt: impl Into<String>) -> Self {
        Self {
            client,
            system_prompt: system_prompt.into(),
        }
    }

    /// Build from the LLM section of `config`.
    ///
    /// # Errors
    /// [`PipelineError::InvalidConfig`] when no API key is configured.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, PipelineError> {
        let api_key = config
            .llm_api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| PipelineError::InvalidConfig("missing LLM API key".into()))?;

        let client = ChatClient::new(
            &config.llm_api_base,
            api_key,
            config.model.clone(),
            config.llm_timeout_secs,
        )?
        .with_sampling(config.temperature, config.max_tokens);

        let prompt = config
            .system_prompt
            .clone()
            .unwrap_or_else(|| QUESTION_EXTRACTION_PROMPT.to_string());

        Ok(Self::new(client, prompt))
    }

    /// Structure `text` into questions. Never fails; see the module docs.
    pub async fn structure(&self, text: &str) -> Vec<Question> {
        match self.try_structure(text).await {
            Ok(questions) => {
                info!("LLM identified {} questions", questions.len());
                questions
            }
            Err(e) => {
                warn!("Question structuring failed: {}", e);
                Vec::new()
            }
        }
    }

    async fn try_structure(&self, text: &str) -> Result<Vec<Question>, StructureError> {
        let messages = [
            ChatMessage::system(self.system_prompt.as_str()),
            ChatMessage::user(user_message(text)),
        ];
        let completion = self.client.complete(&messages).await?;
        parse_questions(&completion.content)
    }
}

/// Parse a chat response into questions.
///
/// The content is cleaned first, then read as a JSON array. Items without a
/// non-empty `question_text` are dropped.
pub fn parse_questions(content: &str) -> Result<Vec<Question>, StructureError> {
    let cleaned = clean_llm_response(content);
    let parsed: Vec<Question> =
        serde_json::from_str(&cleaned).map_err(|e| StructureError::Parse(e.to_string()))?;

    let total = parsed.len();
    let questions: Vec<Question> = parsed
        .into_iter()
        .filter(|q| !q.question_text.trim().is_empty())
        .collect();

    if questions.len() < total {
        warn!(
            "Dropped {} items without question text",
            total - questions.len()
        );
    }
    debug!("Parsed {} questions", questions.len());
    Ok(questions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn parses_fenced_array() {
        let content = "```json\n[{\"question_text\": \"Differentiate x^3\", \"answer\": \"3x^2\", \
                       \"topic\": \"Differentiation\", \"difficulty\": \"Easy\", \"question_type\": \"LQ\"}]\n```";
        let questions = parse_questions(content).unwrap();
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].answer, "3x^2");
        assert_eq!(questions[0].question_type, "LQ");
    }

    #[test]
    fn drops_items_without_question_text() {
        let content = r#"[{"question_text": ""}, {"answer": "4"}, {"question_text": "2+2?"}]"#;
        let questions = parse_questions(content).unwrap();
        assert_eq!(questions, vec![Question::new("2+2?")]);
    }

    #[test]
    fn numeric_answer_keeps_every_question() {
        let content = r#"[{"question_text":"What is 2+2?","answer":4},{"question_text":"Integrate 2x","answer":"x^2 + C"}]"#;
        let questions = parse_questions(content).unwrap();
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].answer, "4");
        assert_eq!(questions[1].answer, "x^2 + C");
    }

    #[test]
    fn non_json_is_parse_error() {
        let err = parse_questions("I could not find any questions.").unwrap_err();
        assert!(matches!(err, StructureError::Parse(_)));
    }

    #[test]
    fn free_form_values_are_kept() {
        let content = r#"[{"question_text": "q", "difficulty": "Very Hard", "question_type": "Short"}]"#;
        let questions = parse_questions(content).unwrap();
        assert_eq!(questions[0].difficulty, "Very Hard");
        assert_eq!(questions[0].question_type, "Short");
    }

    #[test]
    fn from_config_requires_key() {
        let config = PipelineConfig::default();
        assert!(QuestionStructurer::from_config(&config).is_err());
    }

    #[tokio::test]
    async fn invalid_llm_output_yields_empty_list() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": "not json at all"}}]
            })))
            .mount(&server)
            .await;

        let config = PipelineConfig::builder()
            .llm_api_base(server.uri())
            .llm_api_key("sk-test")
            .build()
            .unwrap();
        let structurer = QuestionStructurer::from_config(&config).unwrap();

        assert!(structurer.structure("1. Solve x").await.is_empty());
    }

    #[tokio::test]
    async fn server_error_yields_empty_list() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        let config = PipelineConfig::builder()
            .llm_api_base(server.uri())
            .llm_api_key("sk-test")
            .build()
            .unwrap();
        let structurer = QuestionStructurer::from_config(&config).unwrap();

        assert!(structurer.structure("1. Solve x").await.is_empty());
    }
}
