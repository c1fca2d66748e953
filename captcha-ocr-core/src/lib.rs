//! # Captcha OCR Core
//!
//! Core types and the recognition path for the captcha-ocr service.
//!
//! This crate provides:
//! - Error handling types
//! - Configuration for ONNX Runtime sessions
//! - A pooled ONNX Runtime inference engine
//! - Image preparation and CTC decoding
//!
//! ## Modules
//!
//! * [`core`] - Core traits, configuration, error handling and inference
//! * [`processors`] - Image preparation, vocabulary and CTC decoding
//! * [`utils`] - Image loading and evaluation metrics

pub mod core;
pub mod processors;
pub mod utils;

pub use core::init_tracing;

/// Prelude module for convenient imports.
pub mod prelude {
    // Error Handling
    pub use crate::core::{OCRError, OcrResult};

    // Inference
    pub use crate::core::{
        InferenceEngine, ModelInferenceConfig, ModelSignature, OrtInfer, OrtSessionConfig,
        Tensor3D, Tensor4D,
    };

    // Processing
    pub use crate::processors::{
        CTCLabelDecode, CaptchaPreprocessor, ChannelOrder, ModelInputSize, Vocabulary,
    };

    // Image Utilities
    pub use crate::utils::{load_image, load_image_from_memory};
}
