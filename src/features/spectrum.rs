use anyhow::{ensure, Result};
use aus::analysis;
use aus::analysis::mel::MelFilterbank;
use aus::spectrum;
use aus::WindowType;

use super::FeatureConfig;
use crate::types::AudioData;

const MIN_FREQ: f64 = 0.0;

/// Power and mel spectrograms of one clip, frame-major (`[frame][bin]`).
pub(crate) struct SpectrogramBundle {
    pub power: Vec<Vec<f64>>,
    pub mel: Vec<Vec<f64>>,
    pub freqs: Vec<f64>,
}

pub(crate) fn compute_spectrograms(
    audio: &AudioData,
    config: &FeatureConfig,
) -> Result<SpectrogramBundle> {
    ensure!(audio.sample_rate > 0, "sample rate must be positive");
    ensure!(!audio.samples.is_empty(), "cannot analyse an empty clip");
    ensure!(
        config.n_fft > 0 && config.hop_length > 0,
        "FFT and hop sizes must be positive"
    );

    let padded = centre_pad(&audio.samples, config.n_fft);

    let stft = spectrum::rstft(&padded, config.n_fft, config.hop_length, WindowType::Hanning);
    let (magnitude, _) = spectrum::complex_to_polar_rstft(&stft);
    let power = analysis::make_power_spectrogram(&magnitude);
    ensure!(!power.is_empty(), "STFT produced no frames");

    let freqs = spectrum::rfftfreq(config.n_fft, audio.sample_rate);
    let filterbank = MelFilterbank::new(
        MIN_FREQ,
        (audio.sample_rate as f64) / 2.0,
        config.mel_bands,
        &freqs,
        true,
    );
    let mel = analysis::mel::make_mel_spectrogram(&power, &filterbank);

    Ok(SpectrogramBundle { power, mel, freqs })
}

/// Pad half a window of silence on each side so the first frame is centred on
/// sample zero and clips shorter than one window still yield a frame.
fn centre_pad(samples: &[f32], n_fft: usize) -> Vec<f64> {
    let pad = n_fft / 2;
    let mut padded = Vec::with_capacity(samples.len() + 2 * pad);
    padded.resize(pad, 0.0);
    padded.extend(samples.iter().map(|&s| s as f64));
    padded.resize(padded.len() + pad, 0.0);
    padded
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_clip_still_produces_frames() {
        let audio = AudioData::new(vec![0.1; 100], 22_050);
        let bundle = compute_spectrograms(&audio, &FeatureConfig::default()).unwrap();
        assert!(!bundle.power.is_empty());
        assert_eq!(bundle.mel[0].len(), FeatureConfig::default().mel_bands);
    }

    #[test]
    fn centre_padding_adds_half_window_each_side() {
        let padded = centre_pad(&[1.0, 1.0], 8);
        assert_eq!(padded, vec![0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 0.0, 0.0]);
    }
}
