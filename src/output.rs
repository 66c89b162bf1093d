//! Data model shared by the pipeline stages and returned to callers.

use serde::{Deserialize, Deserializer, Serialize};

// ── Question ─────────────────────────────────────────────────────────────

/// One exam question as identified by the structurer.
///
/// Created from a single item of the LLM's JSON array and consumed once by
/// the uploader. Every field except `question_text` may be empty. Values are
/// not validated: a JSON `null` is read as `""`, numbers and booleans as
/// their JSON text (`"answer": 4` becomes `"4"`). Items that deserialize with an empty
/// `question_text` are dropped by the structurer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    #[serde(default, deserialize_with = "scalar_as_string")]
    pub question_text: String,
    #[serde(default, deserialize_with = "scalar_as_string")]
    pub answer: String,
    #[serde(default, deserialize_with = "scalar_as_string")]
    pub topic: String,
    /// Free-form; the prompt asks for Easy / Medium / Hard.
    #[serde(default, deserialize_with = "scalar_as_string")]
    pub difficulty: String,
    /// Free-form; the prompt asks for MC / LQ.
    #[serde(default, deserialize_with = "scalar_as_string")]
    pub question_type: String,
}

impl Question {
    pub fn new(question_text: impl Into<String>) -> Self {
        Self {
            question_text: question_text.into(),
            answer: String::new(),
            topic: String::new(),
            difficulty: String::new(),
            question_type: String::new(),
        }
    }
}

fn scalar_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    })
}

// ── Extraction ───────────────────────────────────────────────────────────

/// Outcome of text extraction.
///
/// Success and the two OCR failure modes are distinct variants so callers
/// never have to inspect the text to learn what happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    /// Text came from the PDF's embedded text layer.
    NativeText(String),
    /// The text layer was empty; text came from OCR.
    OcrText(String),
    /// The text layer was empty and OCR could not run.
    OcrUnavailable { reason: String },
    /// The text layer was empty and OCR failed on every page.
    OcrFailed { reason: String },
}

/// Discriminant of [`Extraction`] for logging and assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExtractionKind {
    NativeTextFound,
    OcrTextFound,
    OcrUnavailable,
    OcrFailed,
}

impl Extraction {
    pub fn kind(&self) -> ExtractionKind {
        match self {
            Extraction::NativeText(_) => ExtractionKind::NativeTextFound,
            Extraction::OcrText(_) => ExtractionKind::OcrTextFound,
            Extraction::OcrUnavailable { .. } => ExtractionKind::OcrUnavailable,
            Extraction::OcrFailed { .. } => ExtractionKind::OcrFailed,
        }
    }

    /// The extracted text; empty for the failure variants.
    pub fn text(&self) -> &str {
        match self {
            Extraction::NativeText(t) | Extraction::OcrText(t) => t,
            Extraction::OcrUnavailable { .. } | Extraction::OcrFailed { .. } => "",
        }
    }
}

// ── Upload summary ───────────────────────────────────────────────────────

/// What the record uploader managed to store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadSummary {
    /// Records Airtable reported as created.
    pub uploaded: usize,
    /// Batches attempted.
    pub total_batches: usize,
    /// Batches that failed in transit or were rejected.
    pub failed_batches: usize,
}

// ── Pipeline result ──────────────────────────────────────────────────────

/// Final outcome of one pipeline run. This is the JSON body returned by
/// `POST /upload`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineResult {
    pub success: bool,
    pub message: String,
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub questions_count: Option<usize>,
}

impl PipelineResult {
    pub fn success(message: impl Into<String>, questions_count: usize) -> Self {
        Self {
            success: true,
            message: message.into(),
            error: String::new(),
            questions_count: Some(questions_count),
        }
    }

    pub fn failure(error: impl std::fmt::Display) -> Self {
        Self {
            success: false,
            message: String::new(),
            error: error.to_string(),
            questions_count: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineFailure;

    #[test]
    fn question_tolerates_missing_and_null_fields() {
        let q: Question = serde_json::from_str(
            r#"{"question_text": "Integrate x^2", "answer": null, "topic": "Integration"}"#,
        )
        .unwrap();
        assert_eq!(q.question_text, "Integrate x^2");
        assert_eq!(q.answer, "");
        assert_eq!(q.topic, "Integration");
        assert_eq!(q.difficulty, "");
        assert_eq!(q.question_type, "");
    }

    #[test]
    fn question_stringifies_numbers_and_bools() {
        let q: Question = serde_json::from_str(
            r#"{"question_text": "Is 7 prime?", "answer": true, "topic": 3.5, "difficulty": 2}"#,
        )
        .unwrap();
        assert_eq!(q.answer, "true");
        assert_eq!(q.topic, "3.5");
        assert_eq!(q.difficulty, "2");
    }

    #[test]
    fn extraction_kind_and_text() {
        let native = Extraction::NativeText("hello\n".into());
        assert_eq!(native.kind(), ExtractionKind::NativeTextFound);
        assert_eq!(native.text(), "hello\n");

        let failed = Extraction::OcrFailed { reason: "boom".into() };
        assert_eq!(failed.kind(), ExtractionKind::OcrFailed);
        assert_eq!(failed.text(), "");
    }

    #[test]
    fn failure_result_serialises_without_count() {
        let r = PipelineResult::failure(PipelineFailure::NoTextExtracted);
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "No text found in PDF");
        assert_eq!(json["message"], "");
        assert!(json.get("questions_count").is_none());
    }

    #[test]
    fn success_result_carries_count() {
        let r = PipelineResult::success("Successfully uploaded 3 questions to Airtable", 3);
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["questions_count"], 3);
        assert_eq!(json["error"], "");
    }
}
