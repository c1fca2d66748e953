//! Run configuration stored next to the exported graph as `configs.yaml`.
//!
//! The training pipeline dumps its whole configuration object, so the file
//! carries many keys (batch size, learning rate, ...) that inference never
//! reads. Only the keys below are deserialized; everything else is ignored.

use captcha_ocr_core::core::{ConfigError, ConfigValidator, OCRError, OcrResult};
use captcha_ocr_core::processors::{ChannelOrder, ModelInputSize, Vocabulary};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Inference-relevant subset of a training run's `configs.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactConfig {
    /// Characters the model emits, in class order.
    pub vocab: String,
    /// Image height the model was trained at.
    #[serde(default)]
    pub height: Option<u32>,
    /// Image width the model was trained at.
    #[serde(default)]
    pub width: Option<u32>,
    /// Longest label seen during training.
    #[serde(default)]
    pub max_text_length: Option<usize>,
    /// Where training wrote the run; informational only.
    #[serde(default)]
    pub model_path: Option<String>,
    /// Channel order the model expects.
    #[serde(default)]
    pub channel_order: ChannelOrder,
    /// Input tensor name override; the graph's first input otherwise.
    #[serde(default)]
    pub input_name: Option<String>,
    /// Output tensor name override; the graph's first output otherwise.
    #[serde(default)]
    pub output_name: Option<String>,
}

impl ArtifactConfig {
    /// Minimal configuration with only a vocabulary.
    pub fn new(vocab: impl Into<String>) -> Self {
        Self {
            vocab: vocab.into(),
            height: None,
            width: None,
            max_text_length: None,
            model_path: None,
            channel_order: ChannelOrder::default(),
            input_name: None,
            output_name: None,
        }
    }

    /// Sets the trained image size.
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    /// Sets the channel order.
    pub fn with_channel_order(mut self, order: ChannelOrder) -> Self {
        self.channel_order = order;
        self
    }

    /// Parses a configuration from YAML text.
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(|e| ConfigError::InvalidConfig {
            message: format!("invalid run configuration: {e}"),
        })
    }

    /// Reads and parses `configs.yaml` from disk.
    ///
    /// # Errors
    ///
    /// A missing file is a model-load error naming the path; unreadable or
    /// malformed content is a configuration error.
    pub fn from_file(path: &Path) -> OcrResult<Self> {
        if !path.is_file() {
            return Err(OCRError::model_load_error(
                path,
                "run configuration not found",
                Some("export the run with its configs.yaml next to model.onnx"),
                None::<std::io::Error>,
            ));
        }
        let content = std::fs::read_to_string(path).map_err(|e| {
            OCRError::model_load_error(path, "failed to read run configuration", None, Some(e))
        })?;
        serde_yaml::from_str(&content).map_err(|e| {
            ConfigError::ParseFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }
            .into()
        })
    }

    /// Builds the vocabulary declared by this run.
    pub fn vocabulary(&self) -> OcrResult<Vocabulary> {
        Vocabulary::new(&self.vocab)
    }

    /// Trained image size, when both dimensions are declared.
    pub fn declared_input_size(&self) -> Option<ModelInputSize> {
        match (self.width, self.height) {
            (Some(width), Some(height)) => Some(ModelInputSize::fixed(width, height)),
            _ => None,
        }
    }
}

impl ConfigValidator for ArtifactConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.vocab.is_empty() {
            return Err(ConfigError::InvalidConfig {
                message: "vocab must not be empty".to_string(),
            });
        }
        match (self.width, self.height) {
            (Some(width), Some(height)) => self.validate_image_dimensions(width, height)?,
            (Some(width), None) => self.validate_positive_usize(width as usize, "width")?,
            (None, Some(height)) => self.validate_positive_usize(height as usize, "height")?,
            (None, None) => {}
        }
        if let Some(max_len) = self.max_text_length {
            self.validate_positive_usize(max_len, "max_text_length")?;
        }
        Ok(())
    }

    fn get_defaults() -> Self {
        Self::new("0123456789")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRAINING_DUMP: &str = r#"
batch_size: 16
height: 50
learning_rate: 0.001
max_text_length: 5
model_path: Models/02_captcha_to_text/202212211205
train_epochs: 1000
train_workers: 20
vocab: 2345678bcdefgmnpwxy
width: 200
"#;

    #[test]
    fn test_parses_training_dump_and_ignores_extra_keys() {
        let cfg = ArtifactConfig::from_yaml_str(TRAINING_DUMP).unwrap();
        assert_eq!(cfg.vocab, "2345678bcdefgmnpwxy");
        assert_eq!(cfg.declared_input_size(), Some(ModelInputSize::fixed(200, 50)));
        assert_eq!(cfg.max_text_length, Some(5));
        assert_eq!(cfg.channel_order, ChannelOrder::Bgr);
        assert_eq!(cfg.vocabulary().unwrap().class_count(), 20);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_channel_order_override() {
        let cfg = ArtifactConfig::from_yaml_str("vocab: ab\nchannel_order: rgb\n").unwrap();
        assert_eq!(cfg.channel_order, ChannelOrder::Rgb);
        assert_eq!(cfg.declared_input_size(), None);
    }

    #[test]
    fn test_missing_vocab_is_rejected() {
        assert!(ArtifactConfig::from_yaml_str("height: 50\nwidth: 200\n").is_err());
    }

    #[test]
    fn test_validate_rejects_empty_vocab_and_zero_size() {
        assert!(ArtifactConfig::new("").validate().is_err());
        assert!(ArtifactConfig::new("ab").with_size(0, 32).validate().is_err());
    }

    #[test]
    fn test_from_file_missing_is_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ArtifactConfig::from_file(&dir.path().join("configs.yaml")).unwrap_err();
        assert!(matches!(err, OCRError::ModelLoad { .. }));
    }

    #[test]
    fn test_from_file_malformed_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("configs.yaml");
        std::fs::write(&path, "vocab: [unterminated").unwrap();
        let err = ArtifactConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, OCRError::ConfigError { .. }));
        assert!(err.is_load_error());
    }
}
