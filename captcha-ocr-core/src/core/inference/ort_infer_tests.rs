use super::*;
use crate::core::config::{ModelInferenceConfig, OrtSessionConfig};

#[test]
fn test_new_fails_for_missing_model() {
    let result = OrtInfer::new("dummy_path.onnx", None);
    assert!(matches!(result, Err(OCRError::ModelLoad { .. })));
}

#[test]
fn test_from_config_respects_session_pool_size() {
    let config = ModelInferenceConfig::new()
        .session_pool_size(3)
        .ort_session(OrtSessionConfig::new().with_intra_threads(1));
    let result = OrtInfer::from_config(&config, "dummy_path.onnx", None, None);
    assert!(result.is_err());
}

#[test]
fn test_from_config_reports_corrupt_model() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.onnx");
    std::fs::write(&path, b"not an onnx graph").unwrap();

    let err = OrtInfer::new(&path, None).unwrap_err();
    assert!(err.is_load_error());
}
