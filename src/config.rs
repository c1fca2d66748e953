//! Service configuration and model run resolution.
//!
//! Configuration can come from a JSON or YAML file, with `MODEL_RUN_PATH`
//! from the environment taking precedence over the file.

use captcha_ocr_core::core::constants::{DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_MODEL_FILE};
use captcha_ocr_core::core::{ConfigError, ConfigValidator, ModelInferenceConfig, OCRError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming the run directory to serve.
pub const MODEL_RUN_PATH_ENV: &str = "MODEL_RUN_PATH";

/// Default directory holding one sub-directory per training run.
pub const DEFAULT_RESULTS_DIR: &str = "captcha-solver/Results";

/// Configuration file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// JSON format
    Json,
    /// YAML format
    Yaml,
}

impl ConfigFormat {
    /// Detect format from file extension
    pub fn from_extension(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "json" => Some(Self::Json),
            "yaml" | "yml" => Some(Self::Yaml),
            _ => None,
        }
    }
}

/// Settings for the prediction service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Directory relative paths are resolved against.
    pub base_dir: PathBuf,
    /// Directory scanned for training runs when no run path is given.
    pub results_dir: PathBuf,
    /// Explicit run directory to serve.
    pub model_run_path: Option<PathBuf>,
    /// Largest accepted upload, in bytes.
    pub max_upload_bytes: usize,
    /// Session settings for the model.
    pub inference: ModelInferenceConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("."),
            results_dir: PathBuf::from(DEFAULT_RESULTS_DIR),
            model_run_path: None,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            inference: ModelInferenceConfig::default(),
        }
    }
}

impl ServiceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = dir.into();
        self
    }

    pub fn with_results_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.results_dir = dir.into();
        self
    }

    pub fn with_model_run_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.model_run_path = Some(path.into());
        self
    }

    pub fn with_max_upload_bytes(mut self, limit: usize) -> Self {
        self.max_upload_bytes = limit;
        self
    }

    pub fn with_inference(mut self, inference: ModelInferenceConfig) -> Self {
        self.inference = inference;
        self
    }

    /// Load configuration from a file, auto-detecting the format from the extension
    pub fn load_from_file(path: &Path) -> Result<Self, OCRError> {
        let format = ConfigFormat::from_extension(path).ok_or_else(|| OCRError::ConfigError {
            message: format!("Unsupported config file extension: {:?}", path.extension()),
        })?;

        let content = std::fs::read_to_string(path).map_err(|e| OCRError::ConfigError {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        Self::load_from_string(&content, format)
    }

    /// Load configuration from a string with specified format
    pub fn load_from_string(content: &str, format: ConfigFormat) -> Result<Self, OCRError> {
        let config: Self = match format {
            ConfigFormat::Json => {
                serde_json::from_str(content).map_err(|e| OCRError::ConfigError {
                    message: format!("Failed to parse JSON config: {}", e),
                })?
            }
            ConfigFormat::Yaml => {
                serde_yaml::from_str(content).map_err(|e| OCRError::ConfigError {
                    message: format!("Failed to parse YAML config: {}", e),
                })?
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Applies `MODEL_RUN_PATH` from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Applies overrides from an arbitrary variable lookup.
    ///
    /// Empty values are ignored.
    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(path) = lookup(MODEL_RUN_PATH_ENV).filter(|v| !v.is_empty()) {
            self.model_run_path = Some(PathBuf::from(path));
        }
        self
    }

    /// Results directory resolved against the base directory.
    pub fn results_path(&self) -> PathBuf {
        self.base_dir.join(&self.results_dir)
    }

    /// Picks the run directory to serve.
    ///
    /// In order: the explicit run path if it is a directory (as given, then
    /// relative to the base directory); the newest run under the results
    /// directory that holds a `model.onnx`; the newest run of any kind, whose
    /// load then reports the missing model. Runs are ordered by name, which
    /// for timestamped run names is chronological.
    ///
    /// # Errors
    ///
    /// `OCRError::ConfigError` when no candidate directory exists.
    pub fn resolve_model_run_path(&self) -> Result<PathBuf, OCRError> {
        if let Some(explicit) = &self.model_run_path {
            if explicit.is_dir() {
                return Ok(explicit.clone());
            }
            let relative = self.base_dir.join(explicit);
            if relative.is_dir() {
                return Ok(relative);
            }
            tracing::warn!(
                "Model run path {} is not a directory; falling back to the latest run",
                explicit.display()
            );
        }

        let results = self.results_path();
        let mut runs: Vec<PathBuf> = match std::fs::read_dir(&results) {
            Ok(entries) => entries
                .filter_map(Result::ok)
                .map(|entry| entry.path())
                .filter(|path| path.is_dir())
                .collect(),
            Err(_) => Vec::new(),
        };
        runs.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

        if let Some(run) = runs
            .iter()
            .rev()
            .find(|run| run.join(DEFAULT_MODEL_FILE).exists())
        {
            return Ok(run.clone());
        }
        if let Some(run) = runs.last() {
            tracing::warn!(
                "No run under {} contains {}; using {}",
                results.display(),
                DEFAULT_MODEL_FILE,
                run.display()
            );
            return Ok(run.clone());
        }

        Err(OCRError::config_error(format!(
            "No model run directory found. Ensure {} contains a <run>/ with {}",
            results.display(),
            DEFAULT_MODEL_FILE
        )))
    }
}

impl ConfigValidator for ServiceConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.validate_positive_usize(self.max_upload_bytes, "max_upload_bytes")?;
        self.inference.validate()
    }

    fn get_defaults() -> Self {
        Self::default()
    }
}
