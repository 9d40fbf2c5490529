//! Frame-level spectral features: MFCC, chroma and a global tempo estimate.

mod chroma;
mod spectrum;
mod statistics;
mod tempo;

use anyhow::{Context, Result};
use aus::analysis;
use ndarray::{Array2, Axis};
use tracing::debug;

use crate::types::AudioData;
use spectrum::compute_spectrograms;

pub use chroma::PITCH_CLASSES;
pub use statistics::normalize_global;

/// STFT and filterbank settings shared by every feature.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureConfig {
    pub n_fft: usize,
    pub hop_length: usize,
    pub mel_bands: usize,
    pub n_mfcc: usize,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            n_fft: 2048,
            hop_length: 512,
            mel_bands: 128,
            n_mfcc: 40,
        }
    }
}

/// Everything the orchestrator extracts from a clip in one STFT pass.
#[derive(Debug, Clone)]
pub struct FeatureBundle {
    /// `n_mfcc × frames`
    pub mfcc: Array2<f32>,
    /// `12 × frames`, pitch classes C..B
    pub chroma: Array2<f32>,
    pub tempo_bpm: f32,
    pub frame_count: usize,
}

impl FeatureBundle {
    /// Index of the pitch class with the most energy across the clip.
    pub fn dominant_pitch_class(&self) -> Option<usize> {
        let mean = self.chroma.mean_axis(Axis(1))?;
        mean.iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(idx, _)| idx)
    }
}

/// Responsible for preparing spectral features from decoded audio.
#[derive(Debug, Default, Clone)]
pub struct FeatureExtractor {
    config: FeatureConfig,
}

impl FeatureExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// MFCC matrix (`n_mfcc × frames`).
    pub fn mfcc(&self, audio: &AudioData) -> Result<Array2<f32>> {
        let spectra =
            compute_spectrograms(audio, &self.config).context("failed to compute spectrogram")?;
        Ok(self.mfcc_from_mel(&spectra.mel))
    }

    pub fn extract(&self, audio: &AudioData) -> Result<FeatureBundle> {
        let spectra =
            compute_spectrograms(audio, &self.config).context("failed to compute spectrogram")?;

        let mfcc = self.mfcc_from_mel(&spectra.mel);
        let chroma = chroma::chroma_from_power(&spectra.power, &spectra.freqs, audio.sample_rate);

        let frame_rate = audio.sample_rate as f64 / self.config.hop_length as f64;
        let envelope = tempo::onset_envelope(&spectra.mel);
        let tempo_bpm = tempo::estimate_tempo(&envelope, frame_rate) as f32;

        let frame_count = spectra.power.len();
        debug!(
            frame_count,
            tempo_bpm,
            sample_rate = audio.sample_rate,
            "extracted spectral features"
        );

        Ok(FeatureBundle {
            mfcc,
            chroma,
            tempo_bpm,
            frame_count,
        })
    }

    fn mfcc_from_mel(&self, mel: &[Vec<f64>]) -> Array2<f32> {
        let frames = analysis::mel::mfcc_spectrogram(mel, self.config.n_mfcc, None);
        statistics::coefficient_matrix(&frames)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(frequency: f32, sample_rate: u32, seconds: f32) -> AudioData {
        let total = (sample_rate as f32 * seconds) as usize;
        let samples = (0..total)
            .map(|i| 0.5 * (2.0 * std::f32::consts::PI * frequency * i as f32 / sample_rate as f32).sin())
            .collect();
        AudioData::new(samples, sample_rate)
    }

    #[test]
    fn mfcc_shape_is_stable_for_fixed_length_input() {
        let extractor = FeatureExtractor::new();
        let audio = tone(330.0, 22_050, 1.0);
        let first = extractor.mfcc(&audio).unwrap();
        let second = extractor.mfcc(&audio).unwrap();
        assert_eq!(first.dim(), second.dim());
        assert_eq!(first.len_of(Axis(0)), 40);
        assert!(first.len_of(Axis(1)) > 0);
        assert_eq!(first, second);
    }

    #[test]
    fn bundle_reports_tone_pitch_class_and_tempo() {
        let bundle = FeatureExtractor::new()
            .extract(&tone(440.0, 16_000, 1.0))
            .unwrap();
        assert_eq!(bundle.chroma.len_of(Axis(0)), PITCH_CLASSES);
        assert_eq!(bundle.chroma.len_of(Axis(1)), bundle.frame_count);
        assert_eq!(bundle.dominant_pitch_class(), Some(9));
        assert!(bundle.tempo_bpm >= 0.0);
    }

    #[test]
    fn empty_clip_is_an_error() {
        assert!(FeatureExtractor::new()
            .extract(&AudioData::new(Vec::new(), 16_000))
            .is_err());
    }
}
