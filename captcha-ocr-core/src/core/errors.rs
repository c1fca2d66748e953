//! Error types for the captcha recognition path.
//!
//! This module defines the errors that can occur while loading a model
//! artifact, preparing an input image, running inference, and decoding the
//! output. It also provides helper constructors that attach the context a
//! caller needs to act on the failure.

use thiserror::Error;

/// Stage of processing in which an error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingStage {
    /// Error occurred during tensor operations.
    TensorOperation,
}

impl std::fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessingStage::TensorOperation => write!(f, "tensor operation"),
        }
    }
}

/// Errors that can occur in the recognition path.
#[derive(Error, Debug)]
pub enum OCRError {
    /// Error occurred while decoding or loading an image.
    #[error("image load")]
    ImageLoad(#[source] image::ImageError),

    /// Error occurred during processing.
    #[error("{kind} failed: {context}")]
    Processing {
        /// The stage of processing where the error occurred.
        kind: ProcessingStage,
        /// Additional context about the error.
        context: String,
        /// The underlying error that caused this error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Error occurred while running a model.
    #[error("inference failed for model '{model_name}': {context}")]
    Inference {
        /// Name of the model that failed.
        model_name: String,
        /// Additional context about the failure.
        context: String,
        /// The underlying runtime error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Error occurred while loading a model artifact.
    #[error("failed to load model '{model_path}': {reason}{suggestion}")]
    ModelLoad {
        /// Path of the artifact that failed to load.
        model_path: String,
        /// Short description of what went wrong.
        reason: String,
        /// Formatted suggestion, empty when none is available.
        suggestion: String,
        /// The underlying error, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Error indicating invalid input.
    #[error("invalid input: {message}")]
    InvalidInput {
        /// A message describing the invalid input.
        message: String,
    },

    /// Error indicating a configuration problem.
    #[error("configuration: {message}")]
    ConfigError {
        /// A message describing the configuration error.
        message: String,
    },

    /// Error from the ONNX Runtime session.
    #[error(transparent)]
    Session(#[from] ort::Error),

    /// Error from tensor shape operations.
    #[error("tensor operation")]
    Tensor(#[from] ndarray::ShapeError),

    /// IO error.
    #[error("io")]
    Io(#[from] std::io::Error),
}

/// Convenient result alias for recognition operations.
pub type OcrResult<T> = Result<T, OCRError>;

/// A plain message error, used as a `source` when no underlying error exists.
#[derive(Debug, Clone)]
pub struct SimpleError(String);

impl SimpleError {
    /// Creates a new error carrying the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl std::fmt::Display for SimpleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for SimpleError {}

impl OCRError {
    /// Creates an OCRError for tensor operations.
    pub fn tensor_operation(
        context: &str,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Processing {
            kind: ProcessingStage::TensorOperation,
            context: context.to_string(),
            source: Box::new(error),
        }
    }

    /// Creates an OCRError for inference operations with model context.
    ///
    /// # Arguments
    ///
    /// * `model_name` - The name of the model where inference failed.
    /// * `context` - Additional context about the error.
    /// * `error` - The underlying error that caused this error.
    pub fn inference_error(
        model_name: &str,
        context: &str,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Inference {
            model_name: model_name.to_string(),
            context: context.to_string(),
            source: Box::new(error),
        }
    }

    /// Creates an OCRError for model load failures with contextual suggestions.
    ///
    /// # Arguments
    /// * `model_path` - Path to the model file or run directory
    /// * `reason` - Short reason description
    /// * `suggestion` - Optional suggestion message (without punctuation)
    /// * `source` - Optional underlying error
    pub fn model_load_error(
        model_path: impl AsRef<std::path::Path>,
        reason: impl Into<String>,
        suggestion: Option<&str>,
        source: Option<impl std::error::Error + Send + Sync + 'static>,
    ) -> Self {
        let suggestion = suggestion
            .map(|s| format!("; suggested fix: {}", s))
            .unwrap_or_default();
        Self::ModelLoad {
            model_path: model_path.as_ref().display().to_string(),
            reason: reason.into(),
            suggestion,
            source: source.map(|e| Box::new(e) as _),
        }
    }

    /// Creates an OCRError for invalid input.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Creates an OCRError for configuration errors.
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Returns true when the error was raised while loading an artifact.
    pub fn is_load_error(&self) -> bool {
        matches!(
            self,
            Self::ModelLoad { .. } | Self::ConfigError { .. } | Self::Session(_)
        )
    }
}

impl From<image::ImageError> for OCRError {
    fn from(error: image::ImageError) -> Self {
        Self::ImageLoad(error)
    }
}

impl From<crate::core::config::ConfigError> for OCRError {
    fn from(error: crate::core::config::ConfigError) -> Self {
        Self::ConfigError {
            message: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_load_error_formats_suggestion() {
        let err = OCRError::model_load_error(
            "runs/2024/model.onnx",
            "failed to create ONNX session",
            Some("verify the model file"),
            None::<SimpleError>,
        );
        let message = err.to_string();
        assert!(message.contains("runs/2024/model.onnx"));
        assert!(message.contains("suggested fix: verify the model file"));
        assert!(err.is_load_error());
    }

    #[test]
    fn test_inference_error_keeps_source() {
        let err = OCRError::inference_error("captcha", "forward pass", SimpleError::new("oom"));
        assert!(err.to_string().contains("captcha"));
        let source = std::error::Error::source(&err).map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("oom"));
        assert!(!err.is_load_error());
    }

    #[test]
    fn test_tensor_operation_names_stage() {
        let err = OCRError::tensor_operation("viewing output", SimpleError::new("bad shape"));
        assert!(matches!(
            err,
            OCRError::Processing {
                kind: ProcessingStage::TensorOperation,
                ..
            }
        ));
        assert!(err.to_string().contains("tensor operation"));
    }
}
