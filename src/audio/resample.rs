use std::f64::consts::PI;

use anyhow::{ensure, Result};
use dasp::interpolate::sinc::Sinc;
use dasp::{ring_buffer, signal, Signal};

/// Half-width of the windowed-sinc kernel, in source frames. The kernel
/// buffer below holds twice this many frames.
const SINC_DEPTH: usize = 32;
/// Anti-alias cutoff as a fraction of the target Nyquist frequency.
const CUTOFF_RATIO: f64 = 0.9;
/// Half-width of the anti-alias filter, in target-rate periods.
const FILTER_ZERO_CROSSINGS: f64 = 16.0;

/// Resample `samples` from `source_rate` to `target_rate`.
///
/// When downsampling, content above the target Nyquist frequency is removed
/// with a Blackman-windowed sinc low-pass before interpolation, so it cannot
/// fold back into the audible band.
pub fn resample(samples: &[f32], source_rate: u32, target_rate: u32) -> Result<Vec<f32>> {
    ensure!(source_rate > 0, "source sample rate must be positive");
    ensure!(target_rate > 0, "target sample rate must be positive");
    if samples.is_empty() || source_rate == target_rate {
        return Ok(samples.to_vec());
    }

    let ratio = target_rate as f64 / source_rate as f64;
    let output_len = ((samples.len() as f64) * ratio).ceil().max(1.0) as usize;

    let filtered;
    let input = if target_rate < source_rate {
        filtered = low_pass(samples, CUTOFF_RATIO * ratio / 2.0, FILTER_ZERO_CROSSINGS / ratio);
        filtered.as_slice()
    } else {
        samples
    };

    let source = signal::from_iter(input.iter().map(|&s| [s]));
    let sinc = Sinc::new(ring_buffer::Fixed::from([[0.0_f32; 1]; SINC_DEPTH * 2]));
    let converted = source.from_hz_to_hz(sinc, source_rate as f64, target_rate as f64);

    // The kernel centre trails the newest source frame by SINC_DEPTH frames.
    let latency = (SINC_DEPTH as f64 * ratio).round() as usize;

    Ok(converted
        .take(latency + output_len)
        .skip(latency)
        .map(|[sample]| sample.clamp(-1.0, 1.0))
        .collect())
}

/// Zero-phase FIR low-pass. `cutoff` is in cycles per sample (0..0.5),
/// `half_width` in samples; the taps are normalized to unity DC gain.
fn low_pass(samples: &[f32], cutoff: f64, half_width: f64) -> Vec<f32> {
    let half = half_width.ceil().max(1.0) as usize;
    let span = (2 * half) as f64;
    let mut taps: Vec<f64> = (0..=2 * half)
        .map(|k| {
            let n = k as f64 - half as f64;
            let ideal = if n == 0.0 {
                2.0 * cutoff
            } else {
                (2.0 * PI * cutoff * n).sin() / (PI * n)
            };
            let phase = 2.0 * PI * k as f64 / span;
            let window = 0.42 - 0.5 * phase.cos() + 0.08 * (2.0 * phase).cos();
            ideal * window
        })
        .collect();
    let gain: f64 = taps.iter().sum();
    taps.iter_mut().for_each(|tap| *tap /= gain);

    (0..samples.len())
        .map(|i| {
            let acc: f64 = taps
                .iter()
                .enumerate()
                .filter_map(|(k, tap)| {
                    (i + k)
                        .checked_sub(half)
                        .and_then(|idx| samples.get(idx))
                        .map(|&s| tap * s as f64)
                })
                .sum();
            acc as f32
        })
        .collect()
}
