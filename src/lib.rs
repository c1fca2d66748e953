//! # Captcha OCR
//!
//! Serves a trained CTC text-recognition model for solving text CAPTCHAs.
//!
//! ## Features
//!
//! - Loads a training run (`model.onnx` + `configs.yaml`) and checks that the
//!   vocabulary matches the graph
//! - Bilinear resize to the graph's input size, raw 0–255 NHWC tensors
//! - Greedy CTC decoding with the blank as the last class
//! - A request boundary with typed errors and HTTP-compatible status codes
//! - Accuracy and CER evaluation over labelled sample directories or a run's
//!   `val.csv` split
//!
//! ## Modules
//!
//! * [`artifact`] - Run configuration and model loading
//! * [`predictor`] - The prepare → infer → decode path
//! * [`service`] - Model lifecycle, `predict` and `health`
//! * [`config`] - Service configuration and run directory resolution
//! * [`evaluation`] - Accuracy over labelled samples and validation splits
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use captcha_ocr::prelude::*;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! captcha_ocr::init_tracing();
//!
//! let service: CaptchaService = CaptchaService::new(ServiceConfig::new().with_env_overrides());
//! service.load()?;
//!
//! let bytes = std::fs::read("3c5ab.png")?;
//! let prediction = service.predict(Some("image/png"), &bytes)?;
//! println!("{} ({} ms)", prediction.text, prediction.timing_ms);
//! # Ok(())
//! # }
//! ```

pub mod artifact;
pub mod config;
pub mod evaluation;
pub mod predictor;
pub mod service;

pub use captcha_ocr_core::{core, init_tracing, processors, utils};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::artifact::{ArtifactConfig, ModelArtifact};
    pub use crate::config::ServiceConfig;
    pub use crate::evaluation::{
        EvaluationOptions, EvaluationReport, LabelledSample, evaluate_dir, evaluate_run_csv,
    };
    pub use crate::predictor::{CaptchaPredictor, Prediction};
    pub use crate::service::{CaptchaService, ErrorBody, HealthStatus, ServiceError};

    // Error Handling
    pub use captcha_ocr_core::core::{OCRError, OcrResult};

    // Image Utility
    pub use captcha_ocr_core::utils::load_image;
}
