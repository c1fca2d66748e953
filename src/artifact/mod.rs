//! Loading and validating a trained model run.
//!
//! A run directory holds the exported graph (`model.onnx`) and the run
//! configuration (`configs.yaml`). Loading reads both, checks that the
//! vocabulary and the graph agree on the number of output classes, and fixes
//! the input size images are prepared at. The result never changes after load.

mod config;

pub use config::ArtifactConfig;

use captcha_ocr_core::core::constants::{DEFAULT_CONFIG_FILE, DEFAULT_MODEL_FILE};
use captcha_ocr_core::core::{
    ConfigValidatorExt, InferenceEngine, ModelInferenceConfig, ModelSignature, OCRError,
    OcrResult, OrtInfer, Tensor3D, Tensor4D,
};
use captcha_ocr_core::processors::{
    CTCLabelDecode, CaptchaPreprocessor, ModelInputSize, Vocabulary,
};
use std::path::{Path, PathBuf};

/// A loaded model run: engine, decoder and preprocessing settings.
#[derive(Debug)]
pub struct ModelArtifact<E = OrtInfer> {
    engine: E,
    decoder: CTCLabelDecode,
    preprocessor: CaptchaPreprocessor,
    signature: ModelSignature,
    config: ArtifactConfig,
    run_path: PathBuf,
}

impl ModelArtifact<OrtInfer> {
    /// Loads `configs.yaml` and `model.onnx` from a run directory.
    ///
    /// # Errors
    ///
    /// Fails with a load or configuration error when either file is missing
    /// or corrupt, or when the vocabulary does not match the graph.
    pub fn load(run_dir: impl AsRef<Path>, inference: &ModelInferenceConfig) -> OcrResult<Self> {
        let run_dir = run_dir.as_ref();
        if !run_dir.is_dir() {
            return Err(OCRError::model_load_error(
                run_dir,
                "run directory not found",
                Some("point MODEL_RUN_PATH at a run directory"),
                None::<std::io::Error>,
            ));
        }

        let config = ArtifactConfig::from_file(&run_dir.join(DEFAULT_CONFIG_FILE))?;
        let inference = inference.clone().validate_and_wrap_ocr_error()?;
        let engine = OrtInfer::from_config(
            &inference,
            run_dir.join(DEFAULT_MODEL_FILE),
            config.input_name.as_deref(),
            config.output_name.as_deref(),
        )?;

        Self::from_parts(engine, config, run_dir)
    }
}

impl<E> ModelArtifact<E>
where
    E: InferenceEngine<Input = Tensor4D, Output = Tensor3D>,
{
    /// Assembles an artifact from an already constructed engine.
    ///
    /// Validates the configuration and, when the engine reports a static
    /// class count, that it equals the vocabulary size plus the blank.
    pub fn from_parts(
        engine: E,
        config: ArtifactConfig,
        run_path: impl Into<PathBuf>,
    ) -> OcrResult<Self> {
        let config = config.validate_and_wrap_ocr_error()?;
        let vocabulary = config.vocabulary()?;
        let signature = engine.signature();

        match signature.output_classes {
            Some(classes) => vocabulary.ensure_class_count(classes)?,
            None => tracing::debug!(
                "Output class count is dynamic; checking it against {} classes at inference",
                vocabulary.class_count()
            ),
        }

        if let (ModelInputSize::Fixed { width, height }, Some(declared)) =
            (signature.input_size, config.declared_input_size())
            && declared != signature.input_size
        {
            tracing::warn!(
                "configs.yaml declares {:?} but the graph expects {}x{}; using the graph size",
                declared,
                width,
                height
            );
        }

        let run_path = run_path.into();
        tracing::info!(
            "Loaded model run {}: engine={}, input={:?}, vocabulary={} chars, channels={}",
            run_path.display(),
            engine.engine_info(),
            signature.input_size,
            vocabulary.len(),
            config.channel_order
        );

        Ok(Self {
            preprocessor: CaptchaPreprocessor::new(signature.input_size, config.channel_order),
            decoder: CTCLabelDecode::new(vocabulary),
            engine,
            signature,
            config,
            run_path,
        })
    }
}

impl<E> ModelArtifact<E> {
    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn decoder(&self) -> &CTCLabelDecode {
        &self.decoder
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        self.decoder.vocabulary()
    }

    pub fn preprocessor(&self) -> &CaptchaPreprocessor {
        &self.preprocessor
    }

    /// Size images are prepared at, or dynamic for pass-through.
    pub fn input_size(&self) -> ModelInputSize {
        self.signature.input_size
    }

    pub fn signature(&self) -> ModelSignature {
        self.signature
    }

    pub fn config(&self) -> &ArtifactConfig {
        &self.config
    }

    /// Directory the artifact was loaded from.
    pub fn run_path(&self) -> &Path {
        &self.run_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct StaticEngine(ModelSignature);

    impl InferenceEngine for StaticEngine {
        type Input = Tensor4D;
        type Output = Tensor3D;

        fn infer(&self, _input: &Tensor4D) -> OcrResult<Tensor3D> {
            Ok(Tensor3D::zeros((1, 1, 1)))
        }

        fn engine_info(&self) -> String {
            "static".to_string()
        }

        fn signature(&self) -> ModelSignature {
            self.0
        }
    }

    fn signature(classes: Option<usize>) -> ModelSignature {
        ModelSignature {
            input_size: ModelInputSize::fixed(128, 32),
            output_classes: classes,
        }
    }

    #[test]
    fn test_matching_class_count_loads() {
        let artifact = ModelArtifact::from_parts(
            StaticEngine(signature(Some(4))),
            ArtifactConfig::new("abc"),
            "runs/1",
        )
        .unwrap();
        assert_eq!(artifact.vocabulary().len(), 3);
        assert_eq!(artifact.input_size(), ModelInputSize::fixed(128, 32));
        assert_eq!(artifact.run_path(), Path::new("runs/1"));
    }

    #[test]
    fn test_class_count_mismatch_is_config_error() {
        let err = ModelArtifact::from_parts(
            StaticEngine(signature(Some(5))),
            ArtifactConfig::new("abc"),
            "runs/1",
        )
        .unwrap_err();
        assert!(matches!(err, OCRError::ConfigError { .. }));
        assert!(err.is_load_error());
    }

    #[test]
    fn test_dynamic_class_count_defers_check() {
        assert!(
            ModelArtifact::from_parts(
                StaticEngine(signature(None)),
                ArtifactConfig::new("abc"),
                "runs/1",
            )
            .is_ok()
        );
    }

    #[test]
    fn test_empty_vocab_is_rejected() {
        let err = ModelArtifact::from_parts(
            StaticEngine(signature(None)),
            ArtifactConfig::new(""),
            "runs/1",
        )
        .unwrap_err();
        assert!(err.is_load_error());
    }

    #[test]
    fn test_load_missing_run_dir() {
        let dir = tempfile::tempdir().unwrap();
        let err = ModelArtifact::load(dir.path().join("nope"), &ModelInferenceConfig::new())
            .unwrap_err();
        assert!(matches!(err, OCRError::ModelLoad { .. }));
    }

    #[test]
    fn test_load_missing_model_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(DEFAULT_CONFIG_FILE), "vocab: abc\n").unwrap();
        let err = ModelArtifact::load(dir.path(), &ModelInferenceConfig::new()).unwrap_err();
        match err {
            OCRError::ModelLoad { model_path, .. } => assert!(model_path.ends_with("model.onnx")),
            other => panic!("unexpected error: {other}"),
        }
    }
}
