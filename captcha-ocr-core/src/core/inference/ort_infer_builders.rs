use super::*;
use crate::core::config::{
    ModelInferenceConfig, OrtExecutionProvider, OrtGraphOptimizationLevel, OrtSessionConfig,
};
use crate::core::constants::DEFAULT_INPUT_NAME;
use crate::core::inference::session::load_session_with;
use ort::execution_providers::ExecutionProviderDispatch;
use ort::logging::LogLevel;
use ort::session::builder::SessionBuilder;
use std::path::Path;

impl OrtInfer {
    /// Creates a new OrtInfer instance with default ONNX Runtime settings and a single session.
    ///
    /// When `input_name` is `None` the first input declared by the graph is used.
    pub fn new(model_path: impl AsRef<Path>, input_name: Option<&str>) -> Result<Self, OCRError> {
        Self::from_config(&ModelInferenceConfig::new(), model_path, input_name, None)
    }

    /// Creates a new OrtInfer instance from a ModelInferenceConfig, applying ORT session
    /// configuration and constructing a session pool for concurrent predictions.
    pub fn from_config(
        config: &ModelInferenceConfig,
        model_path: impl AsRef<Path>,
        input_name: Option<&str>,
        output_name: Option<&str>,
    ) -> Result<Self, OCRError> {
        let path = model_path.as_ref();
        let pool_size = config.effective_pool_size();
        let mut sessions = Vec::with_capacity(pool_size);
        for _ in 0..pool_size {
            let session = load_session_with(
                path,
                |builder| match &config.ort_session {
                    Some(cfg) => Self::apply_ort_config(builder, cfg),
                    // Keep ORT quiet unless asked otherwise
                    None => builder.with_log_level(LogLevel::Error),
                },
                Some("check device/EP configuration and model file"),
            )?;
            sessions.push(Mutex::new(session));
        }

        let input_name = match input_name {
            Some(name) => name.to_string(),
            None => Self::discover_input_name(&sessions),
        };

        let model_name = config.resolved_model_name(path);

        tracing::debug!(
            "Created ONNX session pool: model={}, sessions={}, input={}",
            model_name,
            sessions.len(),
            input_name
        );

        Ok(OrtInfer {
            sessions,
            next_idx: std::sync::atomic::AtomicUsize::new(0),
            input_name,
            output_name: output_name.map(|s| s.to_string()),
            model_path: path.to_path_buf(),
            model_name,
        })
    }

    fn discover_input_name(sessions: &[Mutex<Session>]) -> String {
        sessions
            .first()
            .and_then(|s| s.lock().ok())
            .and_then(|s| s.inputs.first().map(|i| i.name.clone()))
            .unwrap_or_else(|| DEFAULT_INPUT_NAME.to_string())
    }

    fn apply_ort_config(
        mut builder: SessionBuilder,
        cfg: &OrtSessionConfig,
    ) -> Result<SessionBuilder, ort::Error> {
        if let Some(intra) = cfg.intra_threads {
            builder = builder.with_intra_threads(intra)?;
        }
        if let Some(inter) = cfg.inter_threads {
            builder = builder.with_inter_threads(inter)?;
        }
        if let Some(par) = cfg.parallel_execution {
            builder = builder.with_parallel_execution(par)?;
        }
        if let Some(level) = cfg.optimization_level {
            use ort::session::builder::GraphOptimizationLevel as GOL;
            let mapped = match level {
                OrtGraphOptimizationLevel::DisableAll => GOL::Disable,
                OrtGraphOptimizationLevel::Level1 => GOL::Level1,
                OrtGraphOptimizationLevel::Level2 => GOL::Level2,
                OrtGraphOptimizationLevel::Level3 | OrtGraphOptimizationLevel::All => GOL::Level3,
            };
            builder = builder.with_optimization_level(mapped)?;
        }
        let log_level = match cfg.log_severity_level {
            Some(0) => LogLevel::Verbose,
            Some(1) => LogLevel::Info,
            Some(2) => LogLevel::Warning,
            Some(4) => LogLevel::Fatal,
            _ => LogLevel::Error,
        };
        builder = builder.with_log_level(log_level)?;
        if let Some(eps) = &cfg.execution_providers {
            let providers = Self::build_execution_providers(eps)?;
            if !providers.is_empty() {
                builder = builder.with_execution_providers(providers)?;
            }
        }
        Ok(builder)
    }

    fn build_execution_providers(
        eps: &[OrtExecutionProvider],
    ) -> Result<Vec<ExecutionProviderDispatch>, ort::Error> {
        let mut providers = Vec::new();

        for ep in eps {
            match ep {
                OrtExecutionProvider::CPU => {
                    providers
                        .push(ort::execution_providers::CPUExecutionProvider::default().build());
                }
                #[cfg(feature = "cuda")]
                OrtExecutionProvider::CUDA { device_id } => {
                    let mut cuda_provider =
                        ort::execution_providers::CUDAExecutionProvider::default();
                    if let Some(id) = device_id {
                        cuda_provider = cuda_provider.with_device_id(*id);
                    }
                    providers.push(cuda_provider.build());
                }
                #[cfg(not(feature = "cuda"))]
                OrtExecutionProvider::CUDA { .. } => {
                    return Err(ort::Error::new(
                        "CUDA execution provider requested but cuda feature is not enabled",
                    ));
                }
            }
        }

        Ok(providers)
    }
}
