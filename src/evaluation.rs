//! Accuracy evaluation over labelled samples.
//!
//! Samples come from one of two places:
//!
//! * a directory of images named after their label, e.g. `3c5ab.png`
//! * a training run's `val.csv`, one `image_path,label` row per sample
//!
//! The predictor runs on every sample and the report aggregates character
//! error rate and case-insensitive exact matches.

use crate::predictor::CaptchaPredictor;
use captcha_ocr_core::core::constants::DEFAULT_PARALLEL_THRESHOLD;
use captcha_ocr_core::core::{InferenceEngine, OCRError, OcrResult, Tensor3D, Tensor4D};
use captcha_ocr_core::processors::Vocabulary;
use captcha_ocr_core::utils::{character_error_rate, load_image};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const SAMPLE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Validation split written by training next to the exported graph.
pub const VALIDATION_CSV_FILE: &str = "val.csv";

/// Options controlling an evaluation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvaluationOptions {
    /// Evaluate at most this many samples, taken in listing order.
    pub limit: Option<usize>,
    /// Sample count above which predictions run in parallel.
    pub parallel_threshold: usize,
}

impl Default for EvaluationOptions {
    fn default() -> Self {
        Self {
            limit: None,
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
        }
    }
}

impl EvaluationOptions {
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold;
        self
    }
}

/// An image and the text it shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelledSample {
    pub path: PathBuf,
    pub label: String,
}

impl LabelledSample {
    pub fn new(path: impl Into<PathBuf>, label: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            label: label.into(),
        }
    }

    /// Takes the label from the file stem.
    pub fn from_file_name(path: &Path) -> OcrResult<Self> {
        let label = label_for(path).ok_or_else(|| {
            OCRError::invalid_input(format!("cannot read label from {}", path.display()))
        })?;
        Ok(Self::new(path, label))
    }
}

/// Outcome for one sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleResult {
    pub path: PathBuf,
    pub label: String,
    pub prediction: String,
    pub cer: f64,
    pub exact_match: bool,
}

/// Aggregated evaluation results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationReport {
    pub samples: Vec<SampleResult>,
    pub mean_cer: f64,
    pub exact_matches: usize,
}

impl EvaluationReport {
    fn from_samples(samples: Vec<SampleResult>) -> Self {
        let exact_matches = samples.iter().filter(|s| s.exact_match).count();
        let mean_cer = if samples.is_empty() {
            0.0
        } else {
            samples.iter().map(|s| s.cer).sum::<f64>() / samples.len() as f64
        };
        Self {
            samples,
            mean_cer,
            exact_matches,
        }
    }

    pub fn total(&self) -> usize {
        self.samples.len()
    }

    /// Fraction of exact matches; 0.0 for an empty report.
    pub fn accuracy(&self) -> f64 {
        if self.samples.is_empty() {
            0.0
        } else {
            self.exact_matches as f64 / self.samples.len() as f64
        }
    }
}

/// Lists the sample images in `dir`, sorted by file name.
pub fn collect_samples(dir: &Path) -> OcrResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(OCRError::invalid_input(format!(
            "samples directory not found: {}",
            dir.display()
        )));
    }
    let mut samples: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_sample_image(path))
        .collect();
    samples.sort();
    Ok(samples)
}

fn is_sample_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| SAMPLE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Label encoded in a sample's file stem.
pub fn label_for(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .map(str::to_string)
}

/// Positional `image_path,label` row; the header names are not used.
#[derive(Debug, Deserialize)]
struct CsvRow(String, String);

/// Reads labelled samples from a split CSV in file order.
///
/// The first row is a header. Backslashes in image paths are read as path
/// separators, and relative paths are resolved against `base_dir`.
///
/// # Errors
///
/// A missing file or a row without two columns is an invalid-input error.
pub fn collect_samples_from_csv(csv_path: &Path, base_dir: &Path) -> OcrResult<Vec<LabelledSample>> {
    if !csv_path.is_file() {
        return Err(OCRError::invalid_input(format!(
            "samples file not found: {}",
            csv_path.display()
        )));
    }
    let malformed =
        |e: csv::Error| OCRError::invalid_input(format!("malformed {}: {e}", csv_path.display()));

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(csv_path)
        .map_err(malformed)?;

    reader
        .deserialize::<CsvRow>()
        .map(|row| {
            let CsvRow(image_path, label) = row.map_err(malformed)?;
            let path = PathBuf::from(image_path.replace('\\', "/"));
            let path = if path.is_relative() {
                base_dir.join(path)
            } else {
                path
            };
            Ok(LabelledSample::new(path, label))
        })
        .collect()
}

/// Characters of `label` that `vocabulary` cannot emit, in order of appearance.
pub fn out_of_vocabulary(label: &str, vocabulary: &Vocabulary) -> Vec<char> {
    let mut missing: Vec<char> = Vec::new();
    for c in label.chars() {
        if vocabulary.index_of(c).is_none() && !missing.contains(&c) {
            missing.push(c);
        }
    }
    missing
}

/// Matches ignore case; an empty prediction never matches.
pub fn is_exact_match(prediction: &str, label: &str) -> bool {
    !prediction.is_empty() && prediction.to_lowercase() == label.to_lowercase()
}

/// Evaluates every sample image in `dir`.
pub fn evaluate_dir<E>(
    predictor: &CaptchaPredictor<E>,
    dir: &Path,
    options: EvaluationOptions,
) -> OcrResult<EvaluationReport>
where
    E: InferenceEngine<Input = Tensor4D, Output = Tensor3D>,
{
    let mut paths = collect_samples(dir)?;
    if let Some(limit) = options.limit {
        paths.truncate(limit);
    }
    let samples = paths
        .iter()
        .map(|path| LabelledSample::from_file_name(path))
        .collect::<OcrResult<Vec<_>>>()?;
    evaluate_samples(predictor, &samples, options.parallel_threshold)
}

/// Evaluates the validation split of a training run, `<run_dir>/val.csv`.
///
/// Image paths in the file are resolved against `base_dir`, the directory
/// training ran from.
pub fn evaluate_run_csv<E>(
    predictor: &CaptchaPredictor<E>,
    run_dir: &Path,
    base_dir: &Path,
    options: EvaluationOptions,
) -> OcrResult<EvaluationReport>
where
    E: InferenceEngine<Input = Tensor4D, Output = Tensor3D>,
{
    let csv_path = run_dir.join(VALIDATION_CSV_FILE);
    let mut samples = collect_samples_from_csv(&csv_path, base_dir)?;
    tracing::debug!("Read {} samples from {}", samples.len(), csv_path.display());
    if let Some(limit) = options.limit {
        samples.truncate(limit);
    }
    evaluate_samples(predictor, &samples, options.parallel_threshold)
}

/// Evaluates the given samples against their labels.
///
/// # Errors
///
/// The first sample that cannot be read or predicted aborts the run.
pub fn evaluate_samples<E>(
    predictor: &CaptchaPredictor<E>,
    samples: &[LabelledSample],
    parallel_threshold: usize,
) -> OcrResult<EvaluationReport>
where
    E: InferenceEngine<Input = Tensor4D, Output = Tensor3D>,
{
    let results: Vec<SampleResult> = if samples.len() > parallel_threshold {
        use rayon::prelude::*;
        samples
            .par_iter()
            .map(|sample| evaluate_one(predictor, sample))
            .collect::<OcrResult<_>>()?
    } else {
        samples
            .iter()
            .map(|sample| evaluate_one(predictor, sample))
            .collect::<OcrResult<_>>()?
    };

    let report = EvaluationReport::from_samples(results);
    tracing::info!(
        "Evaluated {} samples: exact matches {}/{}, mean CER {:.4}",
        report.total(),
        report.exact_matches,
        report.total(),
        report.mean_cer
    );
    Ok(report)
}

fn evaluate_one<E>(predictor: &CaptchaPredictor<E>, sample: &LabelledSample) -> OcrResult<SampleResult>
where
    E: InferenceEngine<Input = Tensor4D, Output = Tensor3D>,
{
    let LabelledSample { path, label } = sample;
    let missing = out_of_vocabulary(label, predictor.artifact().vocabulary());
    if !missing.is_empty() {
        tracing::warn!(
            "{}: label {:?} has characters outside the vocabulary: {:?}",
            path.display(),
            label,
            missing
        );
    }

    let image = load_image(path)?;
    let prediction = predictor.predict(&image)?;
    let cer = character_error_rate(&prediction, label);
    tracing::debug!(
        "{}: label={}, prediction={}, cer={:.4}",
        path.display(),
        label,
        prediction,
        cer
    );
    Ok(SampleResult {
        path: path.clone(),
        exact_match: is_exact_match(&prediction, label),
        label: label.clone(),
        prediction,
        cer,
    })
}
