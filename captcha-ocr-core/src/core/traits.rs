//! Traits at the seam between the recognition path and a numeric runtime.
//!
//! The predictor only needs one capability from a runtime: run a forward pass
//! over a prepared tensor and hand back the per-time-step class scores. Any
//! engine that can do that, ONNX Runtime or a test double, plugs in through
//! [`InferenceEngine`].
//!
//! ```text
//! ┌────────────┐    ┌──────────────────┐    ┌──────────────┐
//! │ prepare    │───▶│ InferenceEngine  │───▶│ CTCLabelDecode│
//! │ (1,H,W,3)  │    │ infer            │    │ text          │
//! └────────────┘    │ signature        │    └──────────────┘
//!                   └──────────────────┘
//! ```

use crate::core::OCRError;
use crate::processors::ModelInputSize;
use std::fmt::Debug;

/// Static facts an engine can report about the loaded graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelSignature {
    /// Spatial input size, or dynamic when the graph does not fix it.
    pub input_size: ModelInputSize,
    /// Number of output classes (vocabulary plus blank), when statically known.
    pub output_classes: Option<usize>,
}

impl ModelSignature {
    /// A signature with nothing statically known.
    pub fn dynamic() -> Self {
        Self {
            input_size: ModelInputSize::Dynamic,
            output_classes: None,
        }
    }
}

/// Trait for inference engine operations.
///
/// Implementations must be safe to call concurrently through a shared
/// reference; engines that cannot run concurrently serialize internally.
pub trait InferenceEngine: Send + Sync + Debug {
    /// Input type for inference (typically a tensor)
    type Input: Send + Sync + Debug;

    /// Output type from inference (typically a tensor)
    type Output: Send + Sync + Debug;

    /// Perform inference on preprocessed input.
    fn infer(&self, input: &Self::Input) -> Result<Self::Output, OCRError>;

    /// Get information about the inference engine.
    fn engine_info(&self) -> String;

    /// Report the statically known input size and output class count.
    fn signature(&self) -> ModelSignature {
        ModelSignature::dynamic()
    }
}
