//! Configuration management for model loading and inference.
//!
//! This module provides configuration types and validation traits shared by
//! the inference engine and the artifact loader.

pub mod errors;
pub mod onnx;

pub use errors::{ConfigError, ConfigValidator, ConfigValidatorExt};
pub use onnx::*;

use crate::core::constants::DEFAULT_MODEL_NAME;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings that control how a model is instantiated for inference.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelInferenceConfig {
    /// Name used in logs and error messages; defaults to the model file stem.
    pub model_name: Option<String>,
    /// Number of sessions to create; each session serves one call at a time.
    pub session_pool_size: Option<usize>,
    /// ONNX Runtime session options.
    pub ort_session: Option<OrtSessionConfig>,
}

impl ModelInferenceConfig {
    /// Creates a configuration with a single session and default ORT options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the model name.
    pub fn model_name(mut self, name: impl Into<String>) -> Self {
        self.model_name = Some(name.into());
        self
    }

    /// Sets the session pool size.
    pub fn session_pool_size(mut self, size: usize) -> Self {
        self.session_pool_size = Some(size);
        self
    }

    /// Sets the ONNX Runtime session options.
    pub fn ort_session(mut self, config: OrtSessionConfig) -> Self {
        self.ort_session = Some(config);
        self
    }

    /// Returns the effective pool size (at least one).
    pub fn effective_pool_size(&self) -> usize {
        self.session_pool_size.unwrap_or(1).max(1)
    }

    /// Name for the model at `path`: the configured name, else the file stem,
    /// else [`DEFAULT_MODEL_NAME`].
    pub fn resolved_model_name(&self, path: &Path) -> String {
        self.model_name
            .clone()
            .or_else(|| {
                path.file_stem()
                    .and_then(|s| s.to_str())
                    .map(|s| s.to_string())
            })
            .unwrap_or_else(|| DEFAULT_MODEL_NAME.to_string())
    }
}

impl ConfigValidator for ModelInferenceConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(size) = self.session_pool_size {
            self.validate_positive_usize(size, "session_pool_size")?;
        }
        if let Some(ort) = &self.ort_session {
            ort.validate()?;
        }
        Ok(())
    }

    fn get_defaults() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_pool_size() {
        assert_eq!(ModelInferenceConfig::new().effective_pool_size(), 1);
        assert_eq!(
            ModelInferenceConfig::new()
                .session_pool_size(4)
                .effective_pool_size(),
            4
        );
    }

    #[test]
    fn test_validate_rejects_zero_pool() {
        let config = ModelInferenceConfig::new().session_pool_size(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_checks_nested_session_config() {
        let config = ModelInferenceConfig::new()
            .model_name("captcha")
            .ort_session(OrtSessionConfig::new().with_inter_threads(0));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_resolved_model_name_fallbacks() {
        let path = Path::new("Results/202212211205/model.onnx");
        assert_eq!(ModelInferenceConfig::new().resolved_model_name(path), "model");
        assert_eq!(
            ModelInferenceConfig::new()
                .model_name("solver")
                .resolved_model_name(path),
            "solver"
        );
        assert_eq!(
            ModelInferenceConfig::new().resolved_model_name(Path::new("/")),
            DEFAULT_MODEL_NAME
        );
    }
}
