//! Record upload: push questions (or raw text) to an Airtable table.
//!
//! ## Batching
//!
//! Airtable's create-records endpoint accepts at most 10 records per call.
//! Records are sent in consecutive batches of `batch_size`, strictly one at a
//! time. A batch that fails in transit or is rejected is logged and skipped;
//! the remaining batches are still attempted. Nothing is retried, so a
//! resubmission may duplicate the batches that did succeed.
//!
//! ## Counting
//!
//! A successful batch counts the records echoed back in the response's
//! `records` array. If the API answers 2xx without that array, the batch is
//! assumed to have been stored in full.

use crate::config::{AirtableCredentials, PipelineConfig};
use crate::error::{BatchError, PipelineError};
use crate::output::{Question, UploadSummary};
use crate::progress::{NoopProgressCallback, ProgressCallback};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

// ── Wire format ──────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct Record<T> {
    fields: T,
}

#[derive(Debug, Serialize)]
struct CreateRecords<'a, T> {
    records: &'a [Record<T>],
}

#[derive(Debug, Deserialize)]
struct CreateRecordsResponse {
    #[serde(default)]
    records: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Clone, Serialize)]
struct QuestionFields<'a> {
    #[serde(rename = "Question Text")]
    question_text: &'a str,
    #[serde(rename = "Answer")]
    answer: &'a str,
    #[serde(rename = "Topic")]
    topic: &'a str,
    #[serde(rename = "Difficulty")]
    difficulty: &'a str,
    #[serde(rename = "Type")]
    question_type: &'a str,
    #[serde(rename = "Source")]
    source: &'a str,
    #[serde(rename = "Created")]
    created: &'a str,
}

#[derive(Debug, Clone, Serialize)]
struct RawTextFields<'a> {
    #[serde(rename = "Raw Text")]
    raw_text: &'a str,
    #[serde(rename = "Source")]
    source: &'a str,
    #[serde(rename = "Created")]
    created: &'a str,
}

// ── Uploader ─────────────────────────────────────────────────────────────

/// Client for one Airtable table.
#[derive(Clone)]
pub struct AirtableUploader {
    http: reqwest::Client,
    endpoint: Url,
    api_key: String,
    batch_size: usize,
    source: String,
    progress: ProgressCallback,
}

impl AirtableUploader {
    /// Target `{api_base}/v0/{base_id}/{table}`.
    pub fn new(
        api_base: &str,
        credentials: &AirtableCredentials,
        table: &str,
        timeout_secs: u64,
    ) -> Result<Self, PipelineError> {
        let mut endpoint = Url::parse(api_base).map_err(|e| {
            PipelineError::InvalidConfig(format!("Airtable base URL '{api_base}': {e}"))
        })?;
        endpoint
            .path_segments_mut()
            .map_err(|_| {
                PipelineError::InvalidConfig(format!(
                    "Airtable base URL '{api_base}' cannot carry a path"
                ))
            })?
            .pop_if_empty()
            .extend(["v0", credentials.base_id.trim(), table]);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| PipelineError::HttpClient(e.to_string()))?;

        Ok(Self {
            http,
            endpoint,
            api_key: credentials.api_key.trim().to_string(),
            batch_size: crate::config::AIRTABLE_MAX_BATCH,
            source: "PDF Upload".to_string(),
            progress: Arc::new(NoopProgressCallback),
        })
    }

    /// Build from the Airtable section of `config`.
    pub fn from_config(
        config: &PipelineConfig,
        credentials: &AirtableCredentials,
    ) -> Result<Self, PipelineError> {
        let mut uploader = Self::new(
            &config.airtable_api_base,
            credentials,
            &config.airtable_table,
            config.upload_timeout_secs,
        )?
        .with_batch_size(config.batch_size)
        .with_source(config.record_source.clone());
        if let Some(cb) = &config.progress_callback {
            uploader.progress = Arc::clone(cb);
        }
        Ok(uploader)
    }

    pub fn with_batch_size(mut self, n: usize) -> Self {
        self.batch_size = n.clamp(1, crate::config::AIRTABLE_MAX_BATCH);
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn with_progress(mut self, cb: ProgressCallback) -> Self {
        self.progress = cb;
        self
    }

    /// The fully resolved create-records URL.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Upload one record per question.
    pub async fn upload_questions(&self, questions: &[Question]) -> UploadSummary {
        let created = today();
        let records: Vec<Record<QuestionFields<'_>>> = questions
            .iter()
            .filter(|q| !q.question_text.trim().is_empty())
            .map(|q| Record {
                fields: QuestionFields {
                    question_text: &q.question_text,
                    answer: &q.answer,
                    topic: &q.topic,
                    difficulty: &q.difficulty,
                    question_type: &q.question_type,
                    source: &self.source,
                    created: &created,
                },
            })
            .collect();
        self.upload_records(&records).await
    }

    /// Upload `text` as a single record.
    pub async fn upload_raw_text(&self, text: &str) -> UploadSummary {
        let created = today();
        let records = [Record {
            fields: RawTextFields {
                raw_text: text,
                source: &self.source,
                created: &created,
            },
        }];
        self.upload_records(&records).await
    }

    async fn upload_records<T: Serialize>(&self, records: &[Record<T>]) -> UploadSummary {
        let total_batches = records.len().div_ceil(self.batch_size);
        let mut summary = UploadSummary {
            total_batches,
            ..UploadSummary::default()
        };

        for (idx, batch) in records.chunks(self.batch_size).enumerate() {
            let batch_num = idx + 1;
            match self.send_batch(batch_num, batch).await {
                Ok(n) => {
                    debug!("Batch {}/{}: {} records created", batch_num, total_batches, n);
                    summary.uploaded += n;
                    self.progress.on_batch_complete(batch_num, total_batches, n);
                }
                Err(e) => {
                    warn!("{}", e);
                    summary.failed_batches += 1;
                    self.progress
                        .on_batch_error(batch_num, total_batches, &e.to_string());
                }
            }
        }

        info!(
            "Uploaded {} of {} records ({} of {} batches failed)",
            summary.uploaded,
            records.len(),
            summary.failed_batches,
            total_batches
        );
        summary
    }

    async fn send_batch<T: Serialize>(
        &self,
        batch_num: usize,
        batch: &[Record<T>],
    ) -> Result<usize, BatchError> {
        let response = self
            .http
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(&CreateRecords { records: batch })
            .send()
            .await
            .map_err(|e| BatchError::Transport {
                batch: batch_num,
                detail: e.to_string(),
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| BatchError::Transport {
            batch: batch_num,
            detail: e.to_string(),
        })?;

        if !status.is_success() {
            return Err(BatchError::Rejected {
                batch: batch_num,
                status: status.as_u16(),
                body,
            });
        }

        let created = serde_json::from_str::<CreateRecordsResponse>(&body)
            .ok()
            .and_then(|r| r.records)
            .map_or(batch.len(), |r| r.len());
        Ok(created)
    }
}

impl std::fmt::Debug for AirtableUploader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AirtableUploader")
            .field("endpoint", &self.endpoint.as_str())
            .field("api_key", &"<redacted>")
            .field("batch_size", &self.batch_size)
            .field("source", &self.source)
            .finish()
    }
}

fn today() -> String {
    chrono::Local::now().format("%Y-%m-%d").to_string()
}
