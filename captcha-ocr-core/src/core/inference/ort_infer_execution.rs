use super::*;
use crate::core::errors::SimpleError;
use crate::core::traits::{InferenceEngine, ModelSignature};
use crate::core::{Tensor3D, Tensor4D};
use ndarray::ArrayView3;
use ort::value::TensorRef;

impl OrtInfer {
    /// Returns the configured or discovered output tensor name.
    fn get_output_name(&self) -> Result<String, OCRError> {
        if let Some(ref name) = self.output_name {
            Ok(name.clone())
        } else {
            let session = self.sessions[0].lock().map_err(|_| self.lock_error(0))?;
            if let Some(output) = session.outputs.first() {
                Ok(output.name.clone())
            } else {
                Err(OCRError::InvalidInput {
                    message: "No outputs available in session - model may be invalid or corrupted"
                        .to_string(),
                })
            }
        }
    }

    /// Returns the model path associated with this inference engine.
    pub fn model_path(&self) -> &std::path::Path {
        &self.model_path
    }

    /// Returns the model name associated with this inference engine.
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Returns the input tensor name fed on every call.
    pub fn input_name(&self) -> &str {
        &self.input_name
    }

    /// Runs one forward pass and returns the (batch, time steps, classes) scores.
    pub fn infer_3d(&self, x: &Tensor4D) -> Result<Tensor3D, OCRError> {
        let input_shape = x.shape().to_vec();

        let output_name = self.get_output_name().map_err(|e| {
            OCRError::inference_error(
                &self.model_name,
                &format!(
                    "Failed to get output name for model at '{}'",
                    self.model_path.display()
                ),
                e,
            )
        })?;

        let input_tensor = TensorRef::from_array_view(x.view()).map_err(|e| {
            OCRError::inference_error(
                &self.model_name,
                &format!("Failed to convert input tensor with shape {:?}", input_shape),
                e,
            )
        })?;

        let inputs = ort::inputs![self.input_name.as_str() => input_tensor];

        let idx = self
            .next_idx
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed)
            % self.sessions.len();
        let mut session_guard = self.sessions[idx]
            .lock()
            .map_err(|_| self.lock_error(idx))?;

        let outputs = session_guard.run(inputs).map_err(|e| {
            OCRError::inference_error(
                &self.model_name,
                &format!(
                    "ONNX Runtime forward pass failed with input '{}' {:?} -> output '{}'",
                    self.input_name, input_shape, output_name
                ),
                e,
            )
        })?;

        let (output_shape, output_data) = outputs[output_name.as_str()]
            .try_extract_tensor::<f32>()
            .map_err(|e| {
                OCRError::inference_error(
                    &self.model_name,
                    &format!("Failed to extract output tensor '{}' as f32", output_name),
                    e,
                )
            })?;

        if output_shape.len() != 3 {
            return Err(OCRError::inference_error(
                &self.model_name,
                &format!(
                    "expected 3D output tensor (batch, time, classes), got {}D with shape {:?}",
                    output_shape.len(),
                    output_shape
                ),
                SimpleError::new("Invalid output tensor dimensions"),
            ));
        }

        let batch_size_out = output_shape[0] as usize;
        let seq_len = output_shape[1] as usize;
        let num_classes = output_shape[2] as usize;
        let expected_len = batch_size_out * seq_len * num_classes;

        if output_data.len() != expected_len {
            return Err(OCRError::inference_error(
                &self.model_name,
                &format!(
                    "Output data size mismatch: expected {}, got {}",
                    expected_len,
                    output_data.len()
                ),
                SimpleError::new("Output tensor data size mismatch"),
            ));
        }

        let array_view =
            ArrayView3::from_shape((batch_size_out, seq_len, num_classes), output_data)
                .map_err(|e| {
                    OCRError::tensor_operation("Failed to view output as (batch, time, classes)", e)
                })?;
        Ok(array_view.to_owned())
    }
}

impl InferenceEngine for OrtInfer {
    type Input = Tensor4D;
    type Output = Tensor3D;

    fn infer(&self, input: &Self::Input) -> Result<Self::Output, OCRError> {
        self.infer_3d(input)
    }

    fn engine_info(&self) -> String {
        format!("ONNXRuntime-CTC ({})", self.model_name)
    }

    fn signature(&self) -> ModelSignature {
        ModelSignature {
            input_size: self.input_size(),
            output_classes: self.output_classes(),
        }
    }
}
