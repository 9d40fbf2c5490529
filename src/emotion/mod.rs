//! Emotion classification from normalized MFCC "images".

mod model;
mod tensor;

use std::sync::Arc;

use anyhow::{bail, ensure, Context, Result};
use tracing::{debug, warn};

use crate::features::FeatureExtractor;
use crate::types::{AudioData, Emotion, EmotionOutcome};

pub use model::{EmotionModel, OnnxEmotionModel, EMOTION_CLASSES};
pub use tensor::{mfcc_to_input, InputShape};

/// Tolerance when deciding whether scores already form a distribution.
const DISTRIBUTION_TOLERANCE: f32 = 1e-3;

/// Classifies a clip into one of the eight emotions. Failures never escape:
/// they turn into [`EmotionOutcome::Degraded`].
#[derive(Clone)]
pub struct EmotionClassifier {
    model: Arc<dyn EmotionModel>,
    extractor: FeatureExtractor,
}

impl EmotionClassifier {
    pub fn new(model: Arc<dyn EmotionModel>) -> Self {
        Self {
            model,
            extractor: FeatureExtractor::new(),
        }
    }

    pub fn classify(&self, audio: &AudioData) -> EmotionOutcome {
        match self.try_classify(audio) {
            Ok((emotion, confidence)) => {
                debug!(label = emotion.label(), confidence, "emotion classified");
                EmotionOutcome::Detected {
                    emotion,
                    confidence,
                }
            }
            Err(err) => {
                warn!(error = %format!("{err:#}"), "emotion prediction failed");
                EmotionOutcome::Degraded {
                    reason: format!("{err:#}"),
                }
            }
        }
    }

    fn try_classify(&self, audio: &AudioData) -> Result<(Emotion, f32)> {
        ensure!(!audio.samples.is_empty(), "cannot classify an empty clip");
        ensure!(audio.sample_rate > 0, "sample rate must be positive");

        let mfcc = self
            .extractor
            .mfcc(audio)
            .context("MFCC extraction failed")?;
        let input = mfcc_to_input(&mfcc, self.model.input_shape());
        let scores = self.model.predict(&input).context("emotion model failed")?;
        let probabilities = to_distribution(&scores)?;

        let (index, confidence) = probabilities
            .iter()
            .copied()
            .enumerate()
            .fold((0, f32::NEG_INFINITY), |best, (idx, p)| {
                if p > best.1 {
                    (idx, p)
                } else {
                    best
                }
            });
        let emotion = Emotion::from_index(index)
            .with_context(|| format!("class index {index} has no emotion label"))?;
        Ok((emotion, confidence.clamp(0.0, 1.0)))
    }
}

/// Interpret model scores as probabilities, applying softmax when they are
/// logits rather than a distribution.
fn to_distribution(scores: &[f32]) -> Result<Vec<f32>> {
    if scores.len() != EMOTION_CLASSES {
        bail!(
            "expected {} class scores, model produced {}",
            EMOTION_CLASSES,
            scores.len()
        );
    }
    if scores.iter().any(|s| !s.is_finite()) {
        bail!("model produced non-finite scores");
    }

    let sum: f32 = scores.iter().sum();
    let is_distribution = scores.iter().all(|s| (0.0..=1.0).contains(s))
        && (sum - 1.0).abs() <= DISTRIBUTION_TOLERANCE;
    if is_distribution {
        return Ok(scores.to_vec());
    }

    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = scores.iter().map(|s| (s - max).exp()).collect();
    let total: f32 = exps.iter().sum();
    Ok(exps.into_iter().map(|e| e / total).collect())
}
