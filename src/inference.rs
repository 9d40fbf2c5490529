//! ONNX model loading and execution on tract (pure Rust).

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;
use tracing::info;

/// Errors raised by model loading and inference.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Weight file missing on disk
    #[error("model not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("failed to load model {}: {reason}", path.display())]
    Load { path: PathBuf, reason: String },

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("invalid input shape: expected {expected}, got {got}")]
    InvalidInputShape { expected: String, got: String },

    #[error("invalid model output: expected {expected}, got {got}")]
    InvalidOutput { expected: String, got: String },
}

pub type ModelResult<T> = Result<T, ModelError>;

type Plan = tract_onnx::prelude::SimplePlan<
    tract_onnx::prelude::TypedFact,
    Box<dyn tract_onnx::prelude::TypedOp>,
    tract_onnx::prelude::Graph<
        tract_onnx::prelude::TypedFact,
        Box<dyn tract_onnx::prelude::TypedOp>,
    >,
>;

/// First output of a model run, flattened in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelOutput {
    pub shape: Vec<usize>,
    pub values: Vec<f32>,
}

/// An optimized ONNX graph with one fixed-shape f32 input.
///
/// Runs are serialized through a mutex; loading happens once at startup and the
/// plan is never mutated afterwards.
pub struct OnnxModel {
    path: PathBuf,
    input_shape: Vec<usize>,
    plan: Mutex<Plan>,
}

impl std::fmt::Debug for OnnxModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxModel")
            .field("path", &self.path)
            .field("input_shape", &self.input_shape)
            .finish()
    }
}

impl OnnxModel {
    pub fn load<P: AsRef<Path>>(path: P, input_shape: &[usize]) -> ModelResult<Self> {
        use tract_onnx::prelude::*;

        let path = path.as_ref();
        if !path.is_file() {
            return Err(ModelError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let load_error = |err: anyhow::Error| ModelError::Load {
            path: path.to_path_buf(),
            reason: format!("{err:#}"),
        };

        let plan = tract_onnx::onnx()
            .model_for_path(path)
            .map_err(load_error)?
            .with_input_fact(0, f32::fact(input_shape.to_vec()).into())
            .map_err(load_error)?
            .into_optimized()
            .map_err(load_error)?
            .into_runnable()
            .map_err(load_error)?;

        info!(path = %path.display(), ?input_shape, "loaded ONNX model");

        Ok(Self {
            path: path.to_path_buf(),
            input_shape: input_shape.to_vec(),
            plan: Mutex::new(plan),
        })
    }

    /// Run the model on `input`, laid out row-major in the load-time input shape.
    pub fn run(&self, input: &[f32]) -> ModelResult<ModelOutput> {
        use tract_onnx::prelude::*;

        let expected: usize = self.input_shape.iter().product();
        if input.len() != expected {
            return Err(ModelError::InvalidInputShape {
                expected: format!("{:?} ({} values)", self.input_shape, expected),
                got: format!("{} values", input.len()),
            });
        }

        let tensor = Tensor::from_shape(&self.input_shape, input)
            .map_err(|e| ModelError::Inference(e.to_string()))?;

        let outputs = {
            let plan = self
                .plan
                .lock()
                .map_err(|_| ModelError::Inference("model lock poisoned".into()))?;
            plan.run(tvec!(tensor.into()))
                .map_err(|e| ModelError::Inference(format!("{e:#}")))?
        };

        let output = outputs.first().ok_or_else(|| ModelError::InvalidOutput {
            expected: "at least one output tensor".into(),
            got: "none".into(),
        })?;
        let values = output
            .as_slice::<f32>()
            .map_err(|e| ModelError::InvalidOutput {
                expected: "f32 tensor".into(),
                got: e.to_string(),
            })?
            .to_vec();

        Ok(ModelOutput {
            shape: output.shape().to_vec(),
            values,
        })
    }
}
