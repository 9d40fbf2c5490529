use aus::analysis;

use super::model::{PitchEstimate, PitchModel, PITCH_SAMPLE_RATE};
use crate::inference::ModelResult;

const FREQ_MIN: f64 = 55.0;
const FREQ_MAX: f64 = 1760.0;
const FRAME_LENGTH: usize = 1024;

/// Probabilistic YIN, whose HMM already smooths the trajectory.
#[derive(Debug, Default, Clone, Copy)]
pub struct PyinModel;

impl PyinModel {
    pub fn new() -> Self {
        Self
    }
}

impl PitchModel for PyinModel {
    fn name(&self) -> &'static str {
        "pyin"
    }

    fn estimate(&self, samples: &[f32]) -> ModelResult<PitchEstimate> {
        let mut audio: Vec<f64> = samples.iter().map(|&s| s as f64).collect();
        if audio.len() < FRAME_LENGTH {
            audio.resize(FRAME_LENGTH, 0.0);
        }

        let (timestamps, pitches, voiced_flags, confidence) = analysis::pyin_pitch_estimator(
            &audio,
            PITCH_SAMPLE_RATE,
            FREQ_MIN,
            FREQ_MAX,
            FRAME_LENGTH,
        );

        let frequencies = pitches
            .iter()
            .zip(voiced_flags.iter())
            .map(|(&pitch, &voiced)| {
                if voiced && pitch.is_finite() && pitch > 0.0 {
                    pitch as f32
                } else {
                    0.0
                }
            })
            .collect();

        // Timestamps mark frame starts; shift them to frame centres.
        let half_frame = (FRAME_LENGTH / 2) as f32 / PITCH_SAMPLE_RATE as f32;
        Ok(PitchEstimate {
            times: timestamps
                .iter()
                .map(|&t| t as f32 + half_frame)
                .collect(),
            frequencies,
            confidences: confidence
                .iter()
                .map(|&c| {
                    let c = c as f32;
                    if c.is_finite() {
                        c.clamp(0.0, 1.0)
                    } else {
                        0.0
                    }
                })
                .collect(),
        })
    }
}
