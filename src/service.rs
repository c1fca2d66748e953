//! The request boundary: lifecycle of the loaded model, `predict` and `health`.
//!
//! [`CaptchaService`] owns a write-once slot for the predictor. The slot starts
//! empty, is filled exactly once by a successful or failed load, and is then
//! only read. Requests validate their input before looking at the slot, so a
//! bad upload is reported as such whether or not a model is loaded.
//!
//! Every failure leaving this module is a [`ServiceError`], which carries an
//! HTTP-compatible status code and a serializable [`ErrorBody`] for whatever
//! transport sits in front of it.

use crate::artifact::ModelArtifact;
use crate::config::ServiceConfig;
use crate::predictor::{CaptchaPredictor, Prediction};
use captcha_ocr_core::core::constants::SUPPORTED_MEDIA_TYPES;
use captcha_ocr_core::core::{InferenceEngine, OCRError, OrtInfer, Tensor3D, Tensor4D};
use captcha_ocr_core::utils::load_image_from_memory;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure category reported at the request boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Input,
    NotReady,
    Load,
    Inference,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Input => "input",
            ErrorKind::NotReady => "not_ready",
            ErrorKind::Load => "load",
            ErrorKind::Inference => "inference",
        }
    }
}

/// Errors returned by [`CaptchaService`].
#[derive(Error, Debug)]
pub enum ServiceError {
    /// The upload is not PNG or JPEG.
    #[error("Unsupported media type")]
    UnsupportedMediaType { content_type: Option<String> },

    /// The upload could not be decoded as an image.
    #[error("Invalid image")]
    InvalidImage {
        #[source]
        source: OCRError,
    },

    /// The upload exceeds the configured size limit.
    #[error("Payload too large: {size} bytes exceeds the {limit} byte limit")]
    PayloadTooLarge { size: usize, limit: usize },

    /// No model has been loaded yet.
    #[error("Model not ready")]
    NotReady,

    /// The model failed to load; predictions stay refused.
    #[error("Model failed to load: {message}")]
    Load { message: String },

    /// The recognition pipeline failed for this request.
    #[error("Inference failed: {source}")]
    Inference {
        #[source]
        source: OCRError,
    },
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::UnsupportedMediaType { .. }
            | ServiceError::InvalidImage { .. }
            | ServiceError::PayloadTooLarge { .. } => ErrorKind::Input,
            ServiceError::NotReady => ErrorKind::NotReady,
            ServiceError::Load { .. } => ErrorKind::Load,
            ServiceError::Inference { .. } => ErrorKind::Inference,
        }
    }

    /// HTTP status code a transport should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            ServiceError::UnsupportedMediaType { .. } => 415,
            ServiceError::InvalidImage { .. } => 400,
            ServiceError::PayloadTooLarge { .. } => 413,
            ServiceError::NotReady | ServiceError::Load { .. } => 503,
            ServiceError::Inference { .. } => 500,
        }
    }

    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            detail: self.to_string(),
        }
    }
}

/// Structured failure body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

/// Read-only service status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub model_loaded: bool,
    pub model_run_path: Option<String>,
}

/// Serves predictions from a model loaded once at startup.
#[derive(Debug)]
pub struct CaptchaService<E = OrtInfer> {
    config: ServiceConfig,
    model: OnceCell<Result<CaptchaPredictor<E>, String>>,
}

impl<E> CaptchaService<E>
where
    E: InferenceEngine<Input = Tensor4D, Output = Tensor3D>,
{
    /// Creates a service with an empty model slot.
    pub fn new(config: ServiceConfig) -> Self {
        Self {
            config,
            model: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Fills the model slot with a ready predictor.
    ///
    /// # Errors
    ///
    /// `ServiceError::Load` when the slot was already filled.
    pub fn install(&self, predictor: CaptchaPredictor<E>) -> Result<(), ServiceError> {
        self.model.set(Ok(predictor)).map_err(|_| ServiceError::Load {
            message: "a model has already been installed".to_string(),
        })
    }

    /// Builds a predictor from an artifact and installs it.
    pub fn install_artifact(&self, artifact: ModelArtifact<E>) -> Result<(), ServiceError> {
        self.install(CaptchaPredictor::new(artifact))
    }

    /// Records a failed load so later requests are refused with it.
    pub fn fail_load(&self, error: &OCRError) {
        tracing::error!("Model load failed: {}", error);
        if self.model.set(Err(error.to_string())).is_err() {
            tracing::warn!("Ignoring load failure; the model slot is already filled");
        }
    }

    /// True once a model has loaded successfully.
    pub fn is_ready(&self) -> bool {
        matches!(self.model.get(), Some(Ok(_)))
    }

    /// The loaded predictor, if any.
    pub fn predictor(&self) -> Option<&CaptchaPredictor<E>> {
        self.model.get().and_then(|slot| slot.as_ref().ok())
    }

    pub fn health(&self) -> HealthStatus {
        let predictor = self.predictor();
        HealthStatus {
            status: "ok".to_string(),
            model_loaded: predictor.is_some(),
            model_run_path: predictor
                .map(|p| p.artifact().run_path().display().to_string()),
        }
    }

    /// Decodes the text in an uploaded image.
    ///
    /// Checks run in a fixed order: media type, size, image decoding, model
    /// readiness; only then does the recognition pipeline run.
    pub fn predict(
        &self,
        content_type: Option<&str>,
        bytes: &[u8],
    ) -> Result<Prediction, ServiceError> {
        let result = self.predict_inner(content_type, bytes);
        if let Err(err) = &result {
            match err.kind() {
                ErrorKind::Inference => tracing::error!("Prediction failed: {}", err),
                _ => tracing::warn!("Prediction rejected ({}): {}", err.kind().as_str(), err),
            }
        }
        result
    }

    fn predict_inner(
        &self,
        content_type: Option<&str>,
        bytes: &[u8],
    ) -> Result<Prediction, ServiceError> {
        if !is_supported_media_type(content_type) {
            return Err(ServiceError::UnsupportedMediaType {
                content_type: content_type.map(str::to_string),
            });
        }
        if bytes.len() > self.config.max_upload_bytes {
            return Err(ServiceError::PayloadTooLarge {
                size: bytes.len(),
                limit: self.config.max_upload_bytes,
            });
        }

        let image =
            load_image_from_memory(bytes).map_err(|source| ServiceError::InvalidImage { source })?;

        let predictor = match self.model.get() {
            Some(Ok(predictor)) => predictor,
            Some(Err(message)) => {
                return Err(ServiceError::Load {
                    message: message.clone(),
                });
            }
            None => return Err(ServiceError::NotReady),
        };

        predictor
            .predict_timed(&image)
            .map_err(|source| match source {
                OCRError::InvalidInput { .. } => ServiceError::InvalidImage { source },
                source => ServiceError::Inference { source },
            })
    }
}

impl CaptchaService<OrtInfer> {
    /// Resolves the run directory, loads it and fills the model slot.
    ///
    /// A failure is recorded in the slot, so `health` keeps answering and
    /// `predict` reports the load error.
    pub fn load(&self) -> Result<(), ServiceError> {
        let loaded = self.config.resolve_model_run_path().and_then(|run_path| {
            tracing::info!("Loading model run from {}", run_path.display());
            ModelArtifact::load(&run_path, &self.config.inference)
        });

        match loaded {
            Ok(artifact) => self.install_artifact(artifact),
            Err(err) => {
                self.fail_load(&err);
                Err(ServiceError::Load {
                    message: err.to_string(),
                })
            }
        }
    }
}

/// Accepts `image/png` and `image/jpeg`, ignoring case and parameters.
fn is_supported_media_type(content_type: Option<&str>) -> bool {
    let Some(content_type) = content_type else {
        return false;
    };
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    SUPPORTED_MEDIA_TYPES.contains(&essence.as_str())
}
