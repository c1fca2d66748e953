//! Structures and helpers for ONNX Runtime inference.
//!
//! This module holds the ONNX Runtime engine that backs the recognition
//! path in production, plus a helper for opening bare sessions.

pub mod ort_infer;
pub mod session;

pub use ort_infer::OrtInfer;
pub use session::load_session;
