use std::fmt::{Display, Formatter};

use clap::ValueEnum;

use crate::inference::{ModelError, ModelResult};

/// Sample rate every pitch backend runs at.
pub const PITCH_SAMPLE_RATE: u32 = 16_000;

/// Per-frame output of a pitch backend. All three vectors have one entry per frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PitchEstimate {
    /// Frame centres in seconds
    pub times: Vec<f32>,
    /// Hz, 0.0 where the backend found no pitch
    pub frequencies: Vec<f32>,
    pub confidences: Vec<f32>,
}

impl PitchEstimate {
    pub fn len(&self) -> usize {
        self.frequencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }

    pub fn validate(&self) -> ModelResult<()> {
        let (t, f, c) = (self.times.len(), self.frequencies.len(), self.confidences.len());
        if t != f || f != c {
            return Err(ModelError::InvalidOutput {
                expected: "equal-length time, frequency and confidence tracks".into(),
                got: format!("{t} times, {f} frequencies, {c} confidences"),
            });
        }
        Ok(())
    }
}

/// A frame-wise fundamental frequency estimator over 16 kHz mono audio.
pub trait PitchModel: Send + Sync {
    fn name(&self) -> &'static str;

    fn estimate(&self, samples: &[f32]) -> ModelResult<PitchEstimate>;
}

/// Which pitch estimator the server loads at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PitchBackend {
    /// Neural CREPE network (ONNX weights) with Viterbi smoothing
    Crepe,
    /// Probabilistic YIN; needs no weight file
    Pyin,
}

impl Display for PitchBackend {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            PitchBackend::Crepe => write!(f, "crepe"),
            PitchBackend::Pyin => write!(f, "pyin"),
        }
    }
}
