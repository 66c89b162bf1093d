//! Pipeline stages for PDF question extraction.
//!
//! Each submodule implements exactly one step. Keeping stages separate makes
//! each independently testable and lets callers swap a backend (PDF engine,
//! OCR engine) without touching the others.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──────────────▶ structure ──▶ upload
//! (stage)   (render → encode → ocr)  (llm → postprocess)  (Airtable)
//! ```
//!
//! 1. [`input`]     — validate the PDF and stage uploaded bytes to a temp file
//! 2. [`render`]    — pdfium text layer and page rasterisation (blocking)
//! 3. [`encode`]    — PNG-encode page images for the OCR engine
//! 4. [`ocr`]       — tesseract CLI behind the [`ocr::OcrEngine`] trait
//! 5. [`extract`]   — native text first, OCR fallback; runs in `spawn_blocking`
//! 6. [`llm`]       — OpenAI-compatible chat-completion client
//! 7. [`postprocess`] — strip fences and chatter around the JSON answer
//! 8. [`structure`] — text → questions; swallows every failure into `[]`
//! 9. [`upload`]    — batched Airtable record creation

pub mod encode;
pub mod extract;
pub mod input;
pub mod llm;
pub mod ocr;
pub mod postprocess;
pub mod render;
pub mod structure;
pub mod upload;
