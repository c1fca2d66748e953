//! Captcha predictor: prepare → infer → decode.
//!
//! The predictor owns one loaded [`ModelArtifact`] and is shared read-only
//! between concurrent callers. It keeps no per-request state.

use crate::artifact::ModelArtifact;
use captcha_ocr_core::core::errors::SimpleError;
use captcha_ocr_core::core::{InferenceEngine, OCRError, OcrResult, OrtInfer, Tensor3D, Tensor4D};
use image::RgbImage;
use ndarray::Axis;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Text decoded from one image, with the time the pipeline took.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prediction {
    pub text: String,
    /// Whole milliseconds spent in prepare, inference and decode.
    pub timing_ms: u64,
}

/// Runs the recognition path for a loaded model.
#[derive(Debug)]
pub struct CaptchaPredictor<E = OrtInfer> {
    artifact: ModelArtifact<E>,
}

impl<E> CaptchaPredictor<E>
where
    E: InferenceEngine<Input = Tensor4D, Output = Tensor3D>,
{
    pub fn new(artifact: ModelArtifact<E>) -> Self {
        Self { artifact }
    }

    pub fn artifact(&self) -> &ModelArtifact<E> {
        &self.artifact
    }

    /// Decodes the text in `image`.
    ///
    /// # Errors
    ///
    /// `OCRError::InvalidInput` for an image with a zero dimension; engine
    /// failures and malformed model outputs surface as inference errors.
    pub fn predict(&self, image: &RgbImage) -> OcrResult<String> {
        if image.width() == 0 || image.height() == 0 {
            return Err(OCRError::invalid_input(format!(
                "image has zero-sized dimensions {}x{}",
                image.width(),
                image.height()
            )));
        }

        let input = self.artifact.preprocessor().prepare(image);
        let output = self.artifact.engine().infer(&input)?;
        self.check_output(&output)?;

        let text = self
            .artifact
            .decoder()
            .decode(output.index_axis(Axis(0), 0));
        tracing::debug!(
            "Decoded {} time steps into {} chars",
            output.shape()[1],
            text.chars().count()
        );
        Ok(text)
    }

    /// Same as [`predict`](Self::predict), also reporting elapsed time.
    pub fn predict_timed(&self, image: &RgbImage) -> OcrResult<Prediction> {
        let started = Instant::now();
        let text = self.predict(image)?;
        Ok(Prediction {
            text,
            timing_ms: started.elapsed().as_millis() as u64,
        })
    }

    fn check_output(&self, output: &Tensor3D) -> OcrResult<()> {
        let shape = output.shape();
        let expected = self.artifact.vocabulary().class_count();
        let reason = if shape[0] == 0 {
            "model returned an empty batch".to_string()
        } else if shape[2] != expected {
            format!(
                "model returned {} classes per time step but the vocabulary needs {}",
                shape[2], expected
            )
        } else {
            return Ok(());
        };

        Err(OCRError::inference_error(
            &self.artifact.engine().engine_info(),
            &format!("unexpected output shape {:?}", shape),
            SimpleError::new(reason),
        ))
    }
}
