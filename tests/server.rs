//! HTTP tests for the upload server, driven through `tower::ServiceExt`
//! without binding a socket.

#![cfg(feature = "server")]

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use image::DynamicImage;
use pdf_question_extractor::server::{router, AppState, ServerConfig};
use pdf_question_extractor::{
    AirtableCredentials, OcrEngine, OcrError, PageRasterizer, PipelineConfig, PipelineError,
    QuestionPipeline, TextLayerReader,
};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use tower::ServiceExt;
use wiremock::matchers::{header as header_eq, method, path};
use wiremock::{Mock, MockServer, Request as MockRequest, ResponseTemplate};

const BOUNDARY: &str = "----pdfq-test-boundary";
const STUB_PDF: &[u8] = b"%PDF-1.4\n% stub\n";

// ── Fakes ────────────────────────────────────────────────────────────────────

struct FixedTextLayer(&'static str);

impl TextLayerReader for FixedTextLayer {
    fn page_texts(&self, _path: &Path) -> Result<Vec<Option<String>>, PipelineError> {
        Ok(vec![Some(self.0.to_string())])
    }
}

struct NoPages;

impl PageRasterizer for NoPages {
    fn render_pages(&self, _path: &Path) -> Result<Vec<DynamicImage>, OcrError> {
        Ok(Vec::new())
    }
}

struct NoOcr;

impl OcrEngine for NoOcr {
    fn check_available(&self) -> Result<(), OcrError> {
        Err(OcrError::Unavailable("disabled in tests".into()))
    }
    fn recognize(&self, _page_num: usize, _image: &DynamicImage) -> Result<String, OcrError> {
        Err(OcrError::Unavailable("disabled in tests".into()))
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

struct TestApp {
    router: Router,
    upload_dir: tempfile::TempDir,
}

fn app(llm_uri: &str, airtable_uri: &str, defaults: Option<AirtableCredentials>) -> TestApp {
    app_with(
        llm_uri,
        airtable_uri,
        ServerConfig {
            default_credentials: defaults,
            ..ServerConfig::default()
        },
    )
}

/// `server_config.upload_dir` is replaced by a fresh temp dir.
fn app_with(llm_uri: &str, airtable_uri: &str, server_config: ServerConfig) -> TestApp {
    let config = PipelineConfig::builder()
        .llm_api_base(llm_uri)
        .llm_api_key("sk-test")
        .llm_timeout_secs(5)
        .airtable_api_base(airtable_uri)
        .upload_timeout_secs(5)
        .text_layer(Arc::new(FixedTextLayer("1. Differentiate x^2.\n2. Integrate 2x.")))
        .rasterizer(Arc::new(NoPages))
        .ocr_engine(Arc::new(NoOcr))
        .build()
        .unwrap();
    let pipeline = QuestionPipeline::new(config).unwrap();

    let upload_dir = tempfile::tempdir().unwrap();
    let server_config = ServerConfig {
        upload_dir: upload_dir.path().to_path_buf(),
        ..server_config
    };

    TestApp {
        router: router(AppState::new(pipeline, server_config)),
        upload_dir,
    }
}

/// Router whose pipeline never reaches the network.
fn offline_app() -> TestApp {
    app("http://127.0.0.1:9", "http://127.0.0.1:9", None)
}

enum Part<'a> {
    Text(&'a str, &'a str),
    File(&'a str, &'a str, &'a [u8]),
}

fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                        .as_bytes(),
                );
            }
            Part::File(name, file_name, bytes) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n\
                         Content-Type: application/pdf\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
                body.extend_from_slice(b"\r\n");
            }
        }
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn upload_request(parts: &[Part<'_>]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn completion(content: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "choices": [{ "message": { "role": "assistant", "content": content } }]
    }))
}

fn echo_records(req: &MockRequest) -> ResponseTemplate {
    let body: Value = serde_json::from_slice(&req.body).unwrap();
    let n = body["records"].as_array().map_or(0, Vec::len);
    let records: Vec<Value> = (0..n).map(|i| json!({ "id": format!("rec{i}") })).collect();
    ResponseTemplate::new(200).set_body_json(json!({ "records": records }))
}

const TWO_QUESTIONS: &str = r#"[
  {"question_text": "Differentiate x^2.", "answer": "2x", "topic": "Calculus", "difficulty": "Easy", "question_type": "Short Answer"},
  {"question_text": "Integrate 2x.", "answer": "x^2 + C", "topic": "Calculus", "difficulty": "Easy", "question_type": "Short Answer"}
]"#;

// ── Routes ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn index_serves_the_upload_form() {
    let app = offline_app();
    let response = app
        .router
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/html"));

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let html = String::from_utf8_lossy(&bytes);
    for field in ["airtableKey", "airtableBase", "pdfFile"] {
        assert!(html.contains(field), "form is missing {field}");
    }
}

#[tokio::test]
async fn unknown_route_is_json_404() {
    let app = offline_app();
    let response = app
        .router
        .oneshot(Request::get("/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = json_body(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Not Found");
}

#[tokio::test]
async fn wrong_method_is_json_405() {
    let app = offline_app();
    let response = app
        .router
        .oneshot(Request::get("/upload").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    let body = json_body(response).await;
    assert_eq!(body["success"], false);
    assert!(!body["error"].as_str().unwrap().is_empty());
}

// ── POST /upload ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn upload_without_file_is_rejected() {
    let app = offline_app();
    let response = app
        .router
        .oneshot(upload_request(&[
            Part::Text("airtableKey", "pat-form"),
            Part::Text("airtableBase", "appFORM"),
        ]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "No PDF file uploaded.");
    assert_eq!(body["message"], "");
}

#[tokio::test]
async fn upload_with_empty_filename_is_rejected() {
    let app = offline_app();
    let response = app
        .router
        .oneshot(upload_request(&[Part::File("pdfFile", "", b"")]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"], "No PDF file uploaded.");
}

#[tokio::test]
async fn non_multipart_body_gets_json_error() {
    let app = offline_app();
    let response = app
        .router
        .oneshot(
            Request::post("/upload")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(response.status().is_client_error());
    let body = json_body(response).await;
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn oversized_upload_is_json_413() {
    let app = app_with(
        "http://127.0.0.1:9",
        "http://127.0.0.1:9",
        ServerConfig {
            max_upload_bytes: 1024,
            ..ServerConfig::default()
        },
    );
    let mut big = STUB_PDF.to_vec();
    big.resize(4096, b'0');

    let response = app
        .router
        .oneshot(upload_request(&[Part::File("pdfFile", "big.pdf", &big)]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let body = json_body(response).await;
    assert_eq!(body["success"], false);
    assert!(!body["error"].as_str().unwrap().is_empty());
    assert_eq!(std::fs::read_dir(app.upload_dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn pipeline_failure_is_200_with_error() {
    let app = offline_app();
    let response = app
        .router
        .oneshot(upload_request(&[
            Part::Text("airtableKey", "pat-form"),
            Part::Text("airtableBase", "appFORM"),
            Part::File("pdfFile", "notes.pdf", b"plain text, not a pdf"),
        ]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["success"], false);
    assert!(!body["error"].as_str().unwrap().is_empty());
    assert!(body.get("questions_count").is_none());
    assert_eq!(std::fs::read_dir(app.upload_dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn successful_upload_returns_count_and_cleans_up() {
    let llm = MockServer::start().await;
    let airtable = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(completion(TWO_QUESTIONS))
        .expect(1)
        .mount(&llm)
        .await;
    Mock::given(method("POST"))
        .and(path("/v0/appFORM/Questions"))
        .and(header_eq("authorization", "Bearer pat-form"))
        .respond_with(echo_records)
        .expect(1)
        .mount(&airtable)
        .await;

    let app = app(&llm.uri(), &airtable.uri(), None);
    let upload_dir = app.upload_dir;
    let response = app
        .router
        .oneshot(upload_request(&[
            Part::Text("airtableKey", "pat-form"),
            Part::Text("airtableBase", "appFORM"),
            Part::File("pdfFile", "calculus exam.pdf", STUB_PDF),
        ]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Successfully uploaded 2 questions to Airtable");
    assert_eq!(body["error"], "");
    assert_eq!(body["questions_count"], 2);
    assert_eq!(std::fs::read_dir(upload_dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn empty_form_credentials_fall_back_to_server_defaults() {
    let llm = MockServer::start().await;
    let airtable = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(completion(TWO_QUESTIONS))
        .mount(&llm)
        .await;
    Mock::given(method("POST"))
        .and(path("/v0/appDEFAULT/Questions"))
        .and(header_eq("authorization", "Bearer pat-default"))
        .respond_with(echo_records)
        .expect(1)
        .mount(&airtable)
        .await;

    let defaults = AirtableCredentials::new("pat-default", "appDEFAULT");
    let app = app(&llm.uri(), &airtable.uri(), Some(defaults));
    let response = app
        .router
        .oneshot(upload_request(&[
            Part::Text("airtableKey", ""),
            Part::Text("airtableBase", ""),
            Part::File("pdfFile", "exam.pdf", STUB_PDF),
        ]))
        .await
        .unwrap();

    let body = json_body(response).await;
    assert_eq!(body["success"], true, "error: {}", body["error"]);
}
