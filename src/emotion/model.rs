use std::path::Path;

use ndarray::Array4;

use super::tensor::InputShape;
use crate::inference::{ModelError, ModelResult, OnnxModel};

/// Number of emotion categories the classifier distinguishes.
pub const EMOTION_CLASSES: usize = 8;

/// A classifier mapping an NHWC MFCC "image" to one score per emotion.
pub trait EmotionModel: Send + Sync {
    fn input_shape(&self) -> InputShape;

    /// Raw scores in [`crate::types::Emotion::ALL`] order.
    fn predict(&self, input: &Array4<f32>) -> ModelResult<Vec<f32>>;
}

/// Emotion CNN exported to ONNX.
#[derive(Debug)]
pub struct OnnxEmotionModel {
    model: OnnxModel,
    shape: InputShape,
}

impl OnnxEmotionModel {
    pub fn load<P: AsRef<Path>>(path: P, shape: InputShape) -> ModelResult<Self> {
        let model = OnnxModel::load(path, &shape.nhwc())?;
        Ok(Self { model, shape })
    }
}

impl EmotionModel for OnnxEmotionModel {
    fn input_shape(&self) -> InputShape {
        self.shape
    }

    fn predict(&self, input: &Array4<f32>) -> ModelResult<Vec<f32>> {
        if input.shape() != self.shape.nhwc() {
            return Err(ModelError::InvalidInputShape {
                expected: format!("{:?}", self.shape.nhwc()),
                got: format!("{:?}", input.shape()),
            });
        }
        let flat: Vec<f32> = input.iter().copied().collect();
        let output = self.model.run(&flat)?;
        if output.values.len() != EMOTION_CLASSES {
            return Err(ModelError::InvalidOutput {
                expected: format!("{EMOTION_CLASSES} class scores"),
                got: format!("shape {:?}", output.shape),
            });
        }
        Ok(output.values)
    }
}
