//! Frame-wise pitch tracking and note naming.

mod crepe;
mod model;
pub mod notes;
mod pyin;
mod viterbi;

use std::sync::Arc;

use anyhow::{ensure, Context, Result};
use tracing::{debug, warn};

use crate::audio::resample;
use crate::types::{AudioData, PitchFrame, PitchOutcome, PitchTrack};

pub use crepe::CrepeModel;
pub use model::{PitchBackend, PitchEstimate, PitchModel, PITCH_SAMPLE_RATE};
pub use notes::{frequency_to_note, most_common_note};
pub use pyin::PyinModel;

/// Frames quieter than this RMS (-60 dBFS) are reported as silence.
const SILENCE_RMS: f32 = 1e-3;
/// Samples around each frame centre used by the silence gate.
const GATE_WINDOW: usize = 1024;

/// Runs a pitch backend over a clip and names every frame. Failures never
/// escape: they turn into [`PitchOutcome::Degraded`].
#[derive(Clone)]
pub struct PitchTracker {
    model: Arc<dyn PitchModel>,
}

impl PitchTracker {
    pub fn new(model: Arc<dyn PitchModel>) -> Self {
        Self { model }
    }

    pub fn backend_name(&self) -> &'static str {
        self.model.name()
    }

    pub fn detect(&self, audio: &AudioData) -> PitchOutcome {
        match self.track(audio) {
            Ok(track) => {
                debug!(
                    frames = track.frames.len(),
                    most_common = %track.most_common_note,
                    backend = self.model.name(),
                    "pitch tracked"
                );
                PitchOutcome::Tracked(track)
            }
            Err(err) => {
                warn!(error = %format!("{err:#}"), backend = self.model.name(), "pitch detection failed");
                PitchOutcome::Degraded {
                    reason: format!("{err:#}"),
                }
            }
        }
    }

    fn track(&self, audio: &AudioData) -> Result<PitchTrack> {
        ensure!(!audio.samples.is_empty(), "cannot track pitch of an empty clip");
        ensure!(audio.sample_rate > 0, "sample rate must be positive");

        let samples = if audio.sample_rate == PITCH_SAMPLE_RATE {
            audio.samples.clone()
        } else {
            resample(&audio.samples, audio.sample_rate, PITCH_SAMPLE_RATE).with_context(|| {
                format!(
                    "failed to resample audio from {} Hz to {} Hz",
                    audio.sample_rate, PITCH_SAMPLE_RATE
                )
            })?
        };

        let estimate = self
            .model
            .estimate(&samples)
            .with_context(|| format!("{} pitch model failed", self.model.name()))?;
        estimate.validate()?;
        ensure!(!estimate.is_empty(), "pitch model produced no frames");

        let frames: Vec<PitchFrame> = (0..estimate.len())
            .map(|i| {
                let time = estimate.times[i];
                let (frequency, confidence) = if is_silent(&samples, time) {
                    (0.0, 0.0)
                } else {
                    (
                        sanitize_frequency(estimate.frequencies[i]),
                        sanitize_confidence(estimate.confidences[i]),
                    )
                };
                PitchFrame {
                    time,
                    frequency,
                    confidence,
                    note: frequency_to_note(frequency),
                }
            })
            .collect();

        let notes: Vec<&str> = frames.iter().map(|frame| frame.note.as_str()).collect();
        let most_common_note =
            most_common_note(&notes).context("no notes to rank")?;

        Ok(PitchTrack {
            frames,
            most_common_note,
        })
    }
}

/// `time` is a frame centre in seconds.
fn is_silent(samples: &[f32], time: f32) -> bool {
    let centre = (time.max(0.0) * PITCH_SAMPLE_RATE as f32).round() as usize;
    let start = centre.saturating_sub(GATE_WINDOW / 2).min(samples.len());
    let end = (centre + GATE_WINDOW / 2).min(samples.len());
    if start >= end {
        return true;
    }
    let window = &samples[start..end];
    let energy = window.iter().map(|s| s * s).sum::<f32>() / window.len() as f32;
    energy.sqrt() < SILENCE_RMS
}

fn sanitize_frequency(frequency: f32) -> f32 {
    if frequency.is_finite() && frequency > 0.0 {
        frequency
    } else {
        0.0
    }
}

fn sanitize_confidence(confidence: f32) -> f32 {
    if confidence.is_finite() {
        confidence.clamp(0.0, 1.0)
    } else {
        0.0
    }
}
