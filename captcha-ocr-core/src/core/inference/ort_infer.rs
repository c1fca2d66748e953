//! Core ONNX Runtime inference engine with a pool of sessions.

use crate::core::errors::OCRError;
use crate::processors::ModelInputSize;
use ort::{session::Session, value::ValueType};
use std::sync::Mutex;

#[path = "ort_infer_builders.rs"]
mod ort_infer_builders;
#[path = "ort_infer_execution.rs"]
mod ort_infer_execution;
#[cfg(test)]
#[path = "ort_infer_tests.rs"]
mod ort_infer_tests;

/// ONNX Runtime engine for CTC recognition graphs.
///
/// `Session::run` needs exclusive access, so every session sits behind a
/// `Mutex` and calls are spread round-robin across the pool. A pool of one is
/// a single global execution slot.
pub struct OrtInfer {
    pub(super) sessions: Vec<Mutex<Session>>,
    pub(super) next_idx: std::sync::atomic::AtomicUsize,
    pub(super) input_name: String,
    pub(super) output_name: Option<String>,
    pub(super) model_path: std::path::PathBuf,
    pub(super) model_name: String,
}

impl std::fmt::Debug for OrtInfer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrtInfer")
            .field("sessions", &self.sessions.len())
            .field("input_name", &self.input_name)
            .field("output_name", &self.output_name)
            .field("model_path", &self.model_path)
            .field("model_name", &self.model_name)
            .finish()
    }
}

impl OrtInfer {
    /// Attempts to retrieve the primary input tensor shape from the first session.
    ///
    /// Returns a vector of dimensions if available. Dynamic dimensions (e.g., -1) are returned as-is.
    pub fn primary_input_shape(&self) -> Option<Vec<i64>> {
        let session_mutex = self.sessions.first()?;
        let session_guard = session_mutex.lock().ok()?;
        let input = session_guard
            .inputs
            .iter()
            .find(|i| i.name == self.input_name)
            .or_else(|| session_guard.inputs.first())?;
        match &input.input_type {
            ValueType::Tensor { shape, .. } => Some(shape.iter().copied().collect()),
            _ => None,
        }
    }

    /// Attempts to retrieve the primary output tensor shape from the first session.
    pub fn primary_output_shape(&self) -> Option<Vec<i64>> {
        let session_mutex = self.sessions.first()?;
        let session_guard = session_mutex.lock().ok()?;
        let output = match &self.output_name {
            Some(name) => session_guard.outputs.iter().find(|o| &o.name == name),
            None => session_guard.outputs.first(),
        }?;
        match &output.output_type {
            ValueType::Tensor { shape, .. } => Some(shape.iter().copied().collect()),
            _ => None,
        }
    }

    /// Spatial input size declared by the graph, read as NHWC.
    pub fn input_size(&self) -> ModelInputSize {
        self.primary_input_shape()
            .map(|shape| ModelInputSize::from_nhwc_shape(&shape))
            .unwrap_or(ModelInputSize::Dynamic)
    }

    /// Number of output classes declared by the graph, if static.
    pub fn output_classes(&self) -> Option<usize> {
        match self.primary_output_shape()?.as_slice() {
            [_, _, classes] if *classes > 0 => Some(*classes as usize),
            _ => None,
        }
    }

    /// Returns the number of sessions in the pool.
    pub fn pool_size(&self) -> usize {
        self.sessions.len()
    }

    pub(super) fn lock_error(&self, idx: usize) -> OCRError {
        OCRError::inference_error(
            &self.model_name,
            &format!(
                "Failed to acquire session lock for session {}/{}",
                idx,
                self.sessions.len()
            ),
            crate::core::errors::SimpleError::new("Session lock acquisition failed"),
        )
    }
}
