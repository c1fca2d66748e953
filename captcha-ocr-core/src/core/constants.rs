//! Constants used throughout the recognition path.

/// File name of the exported ONNX graph inside a run directory.
pub const DEFAULT_MODEL_FILE: &str = "model.onnx";

/// File name of the run configuration declaring the vocabulary.
pub const DEFAULT_CONFIG_FILE: &str = "configs.yaml";

/// Input tensor name used when the session does not report one.
pub const DEFAULT_INPUT_NAME: &str = "input";

/// Model name used in logs when none is configured.
pub const DEFAULT_MODEL_NAME: &str = "captcha_ctc";

/// Number of color channels the artifacts are trained on.
pub const INPUT_CHANNELS: usize = 3;

/// Largest accepted upload, in bytes.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 2 * 1024 * 1024;

/// Media types accepted for prediction uploads.
pub const SUPPORTED_MEDIA_TYPES: [&str; 2] = ["image/png", "image/jpeg"];

/// Minimum number of items before batch work switches to parallel iteration.
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 4;
