//! End-to-end behaviour of the request boundary with a stand-in engine.

use captcha_ocr::artifact::{ArtifactConfig, ModelArtifact};
use captcha_ocr::config::ServiceConfig;
use captcha_ocr::evaluation::{EvaluationOptions, evaluate_dir, evaluate_run_csv};
use captcha_ocr::predictor::CaptchaPredictor;
use captcha_ocr::service::{CaptchaService, ErrorKind, ServiceError};
use captcha_ocr_core::core::errors::SimpleError;
use captcha_ocr_core::core::{InferenceEngine, ModelSignature, OCRError, OcrResult, Tensor3D, Tensor4D};
use captcha_ocr_core::processors::ModelInputSize;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

const VOCAB: &str = "ab";

/// Emits a fixed best path and counts its calls.
#[derive(Debug)]
struct FakeEngine {
    input_size: ModelInputSize,
    path: Vec<usize>,
    fail: bool,
    calls: AtomicUsize,
    last_shape: std::sync::Mutex<Vec<usize>>,
}

impl FakeEngine {
    fn new(path: Vec<usize>) -> Self {
        Self {
            input_size: ModelInputSize::fixed(128, 32),
            path,
            fail: false,
            calls: AtomicUsize::new(0),
            last_shape: std::sync::Mutex::new(Vec::new()),
        }
    }

    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(vec![2])
        }
    }
}

impl InferenceEngine for FakeEngine {
    type Input = Tensor4D;
    type Output = Tensor3D;

    fn infer(&self, input: &Tensor4D) -> OcrResult<Tensor3D> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_shape.lock().unwrap() = input.shape().to_vec();
        if self.fail {
            return Err(OCRError::inference_error(
                "fake",
                "forward pass",
                SimpleError::new("runtime exploded"),
            ));
        }
        let classes = VOCAB.chars().count() + 1;
        let mut out = Tensor3D::from_elem((1, self.path.len(), classes), 0.05);
        for (t, &idx) in self.path.iter().enumerate() {
            out[[0, t, idx]] = 0.9;
        }
        Ok(out)
    }

    fn engine_info(&self) -> String {
        "fake".to_string()
    }

    fn signature(&self) -> ModelSignature {
        ModelSignature {
            input_size: self.input_size,
            output_classes: Some(VOCAB.chars().count() + 1),
        }
    }
}

fn encode(image: RgbImage, format: ImageFormat) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(image).write_to(&mut buf, format).unwrap();
    buf.into_inner()
}

fn png(width: u32, height: u32) -> Vec<u8> {
    let image = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    });
    encode(image, ImageFormat::Png)
}

fn ready_service(engine: FakeEngine) -> CaptchaService<FakeEngine> {
    let service = CaptchaService::new(ServiceConfig::new());
    let artifact =
        ModelArtifact::from_parts(engine, ArtifactConfig::new(VOCAB), "Results/202212211205")
            .unwrap();
    service.install_artifact(artifact).unwrap();
    service
}

fn calls(service: &CaptchaService<FakeEngine>) -> usize {
    service
        .predictor()
        .unwrap()
        .artifact()
        .engine()
        .calls
        .load(Ordering::SeqCst)
}

#[test]
fn unsupported_media_type_is_rejected_before_decoding() {
    let service = ready_service(FakeEngine::new(vec![0, 2, 1]));

    let err = service.predict(Some("image/gif"), &png(20, 10)).unwrap_err();
    assert!(matches!(err, ServiceError::UnsupportedMediaType { .. }));
    assert_eq!(err.kind(), ErrorKind::Input);
    assert_eq!(err.status_code(), 415);
    assert_eq!(err.to_body().detail, "Unsupported media type");
    assert_eq!(calls(&service), 0);

    // Even garbage bytes report the media type first.
    let err = service.predict(Some("image/gif"), b"GIF89a").unwrap_err();
    assert_eq!(err.status_code(), 415);
}

#[test]
fn predict_before_load_is_not_ready_and_health_reports_it() {
    let service: CaptchaService<FakeEngine> = CaptchaService::new(ServiceConfig::new());

    let err = service.predict(Some("image/png"), &png(20, 10)).unwrap_err();
    assert!(matches!(err, ServiceError::NotReady));
    assert_eq!(err.status_code(), 503);

    let health = serde_json::to_value(service.health()).unwrap();
    assert_eq!(
        health,
        serde_json::json!({ "status": "ok", "model_loaded": false, "model_run_path": null })
    );
}

#[test]
fn invalid_image_is_reported_even_without_a_model() {
    let service: CaptchaService<FakeEngine> = CaptchaService::new(ServiceConfig::new());

    let err = service.predict(Some("image/png"), b"not a png").unwrap_err();
    assert!(matches!(err, ServiceError::InvalidImage { .. }));
    assert_eq!(err.to_body().detail, "Invalid image");

    let err = service.predict(Some("image/jpeg"), &[]).unwrap_err();
    assert_eq!(err.status_code(), 400);
}

#[test]
fn oversized_upload_is_rejected() {
    let service = CaptchaService::new(ServiceConfig::new().with_max_upload_bytes(64));
    let artifact =
        ModelArtifact::from_parts(FakeEngine::new(vec![0]), ArtifactConfig::new(VOCAB), "run")
            .unwrap();
    service.install_artifact(artifact).unwrap();

    let err = service.predict(Some("image/png"), &png(200, 80)).unwrap_err();
    assert!(matches!(err, ServiceError::PayloadTooLarge { limit: 64, .. }));
    assert_eq!(err.status_code(), 413);
}

#[test]
fn resizes_to_model_input_and_decodes_deterministically() {
    let service = ready_service(FakeEngine::new(vec![0, 0, 2, 1, 1, 1, 2]));
    let bytes = png(200, 80);

    let first = service.predict(Some("image/png"), &bytes).unwrap();
    let second = service.predict(Some("image/png"), &bytes).unwrap();
    assert_eq!(first.text, "ab");
    assert_eq!(first.text, second.text);

    let engine = service.predictor().unwrap().artifact().engine();
    assert_eq!(*engine.last_shape.lock().unwrap(), vec![1, 32, 128, 3]);

    let body = serde_json::to_value(&first).unwrap();
    assert_eq!(body["text"], "ab");
    assert!(body["timing_ms"].is_u64());
}

#[test]
fn jpeg_uploads_are_accepted() {
    let service = ready_service(FakeEngine::new(vec![1, 2, 0]));
    let jpeg = encode(RgbImage::from_pixel(60, 20, Rgb([240, 240, 240])), ImageFormat::Jpeg);
    assert_eq!(service.predict(Some("image/jpeg"), &jpeg).unwrap().text, "ba");
}

#[test]
fn all_blank_output_is_an_empty_prediction() {
    let service = ready_service(FakeEngine::new(vec![2; 8]));
    let prediction = service.predict(Some("image/png"), &png(50, 20)).unwrap();
    assert_eq!(prediction.text, "");
}

#[test]
fn inference_failure_keeps_the_model_loaded() {
    let service = ready_service(FakeEngine::failing());

    let err = service.predict(Some("image/png"), &png(10, 10)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Inference);
    assert_eq!(err.status_code(), 500);
    assert!(err.to_body().detail.starts_with("Inference failed"));

    assert!(service.is_ready());
    assert!(service.predict(Some("image/png"), &png(10, 10)).is_err());
    assert_eq!(calls(&service), 2);
}

#[test]
fn failed_load_refuses_predictions_but_health_answers() {
    let service: CaptchaService<FakeEngine> = CaptchaService::new(ServiceConfig::new());
    service.fail_load(&OCRError::config_error("vocabulary mismatch"));

    let err = service.predict(Some("image/png"), &png(10, 10)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Load);
    assert!(err.to_string().contains("vocabulary mismatch"));
    assert!(!service.health().model_loaded);

    let artifact =
        ModelArtifact::from_parts(FakeEngine::new(vec![0]), ArtifactConfig::new(VOCAB), "run")
            .unwrap();
    assert!(service.install_artifact(artifact).is_err());
}

#[test]
fn health_reports_loaded_run_path() {
    let service = ready_service(FakeEngine::new(vec![0]));
    let health = service.health();
    assert_eq!(health.status, "ok");
    assert!(health.model_loaded);
    assert_eq!(health.model_run_path.as_deref(), Some("Results/202212211205"));
}

#[test]
fn concurrent_predictions_share_one_model() {
    let service = Arc::new(ready_service(FakeEngine::new(vec![0, 2, 1])));
    let bytes = Arc::new(png(120, 40));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let service = Arc::clone(&service);
            let bytes = Arc::clone(&bytes);
            std::thread::spawn(move || service.predict(Some("image/png"), &bytes).unwrap().text)
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), "ab");
    }
    assert_eq!(calls(&service), 8);
}

#[test]
fn evaluation_scores_labelled_samples() {
    let dir = tempfile::tempdir().unwrap();
    for label in ["AB", "ba", "aab", "b", "abab", "bab"] {
        let image = RgbImage::from_pixel(30, 10, Rgb([128, 128, 128]));
        image.save(dir.path().join(format!("{label}.png"))).unwrap();
    }

    let artifact =
        ModelArtifact::from_parts(FakeEngine::new(vec![0, 2, 1]), ArtifactConfig::new(VOCAB), "run")
            .unwrap();
    let predictor = CaptchaPredictor::new(artifact);

    let report = evaluate_dir(&predictor, dir.path(), EvaluationOptions::default()).unwrap();
    assert_eq!(report.total(), 6);
    assert_eq!(report.exact_matches, 1);
    assert!(report.samples.iter().all(|s| s.prediction == "ab"));

    let limited = evaluate_dir(
        &predictor,
        dir.path(),
        EvaluationOptions::default()
            .with_limit(2)
            .with_parallel_threshold(100),
    )
    .unwrap();
    assert_eq!(limited.total(), 2);
}

#[test]
fn evaluation_reads_run_validation_split() {
    let base = tempfile::tempdir().unwrap();
    let images = base.path().join("Datasets").join("captcha_images_v2");
    let run = base.path().join("Results").join("202212211205");
    std::fs::create_dir_all(&images).unwrap();
    std::fs::create_dir_all(&run).unwrap();
    for name in ["first", "second"] {
        let image = RgbImage::from_pixel(30, 10, Rgb([128, 128, 128]));
        image.save(images.join(format!("{name}.png"))).unwrap();
    }
    // Written on Windows: backslash separators, pandas header row.
    std::fs::write(
        run.join("val.csv"),
        "0,1\nDatasets\\captcha_images_v2\\first.png,ab\nDatasets\\captcha_images_v2\\second.png,ba\n",
    )
    .unwrap();

    let artifact =
        ModelArtifact::from_parts(FakeEngine::new(vec![0, 2, 1]), ArtifactConfig::new(VOCAB), &run)
            .unwrap();
    let predictor = CaptchaPredictor::new(artifact);

    let report =
        evaluate_run_csv(&predictor, &run, base.path(), EvaluationOptions::default()).unwrap();
    assert_eq!(report.total(), 2);
    assert_eq!(report.exact_matches, 1);
    assert_eq!(report.samples[0].path, images.join("first.png"));
    assert_eq!(report.samples[1].label, "ba");
    assert_eq!(report.samples[1].cer, 1.0);
    assert_eq!(report.mean_cer, 0.5);

    let err = evaluate_run_csv(&predictor, base.path(), base.path(), EvaluationOptions::default())
        .unwrap_err();
    assert!(matches!(err, OCRError::InvalidInput { .. }));
}
