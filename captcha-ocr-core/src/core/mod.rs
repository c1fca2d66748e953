//! The core module of the recognition path.
//!
//! This module contains the fundamental components shared by every caller:
//! - Configuration management
//! - Constants used throughout the crate
//! - Error handling
//! - ONNX Runtime inference
//! - The inference engine trait
//!
//! It also re-exports the commonly used types for convenience.

pub mod config;
pub mod constants;
pub mod errors;
pub mod inference;
pub mod traits;

pub use config::{
    ConfigError, ConfigValidator, ConfigValidatorExt, ModelInferenceConfig, OrtExecutionProvider,
    OrtGraphOptimizationLevel, OrtSessionConfig,
};
pub use constants::*;
pub use errors::{OCRError, OcrResult, ProcessingStage, SimpleError};
pub use inference::{OrtInfer, load_session};
pub use traits::{InferenceEngine, ModelSignature};

/// Model input tensor laid out as (batch, height, width, channels).
pub type Tensor4D = ndarray::Array4<f32>;

/// Model output tensor laid out as (batch, time steps, classes).
pub type Tensor3D = ndarray::Array3<f32>;

/// Initializes the tracing subscriber for logging.
///
/// This function sets up the tracing subscriber with environment filter and formatting layer.
/// It's typically called at the start of an application to enable logging.
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();
}
