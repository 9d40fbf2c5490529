//! CREPE: a convolutional network over 1024-sample frames producing a
//! 360-bin pitch salience, decoded with Viterbi smoothing.

use std::path::Path;

use tracing::debug;

use super::model::{PitchEstimate, PitchModel, PITCH_SAMPLE_RATE};
use super::viterbi;
use crate::inference::{ModelError, ModelOutput, ModelResult, OnnxModel};

pub const FRAME_LENGTH: usize = 1024;
/// 10 ms at 16 kHz
pub const HOP_LENGTH: usize = 160;
pub const PITCH_BINS: usize = 360;
/// Frames per inference call; the graph is optimized for this fixed batch.
const BATCH_SIZE: usize = 64;
/// Bins each side of the decoded bin used for the weighted cents average.
const LOCAL_RADIUS: usize = 4;
/// Cents (relative to 10 Hz) of bin zero; bins are 20 cents apart.
const CENTS_OFFSET: f64 = 1997.379_408_437_619_1;
const CENTS_PER_BIN: f64 = 20.0;
const STD_FLOOR: f32 = 1e-8;

#[derive(Debug)]
pub struct CrepeModel {
    model: OnnxModel,
}

impl CrepeModel {
    pub fn load<P: AsRef<Path>>(path: P) -> ModelResult<Self> {
        let model = OnnxModel::load(path, &[BATCH_SIZE, FRAME_LENGTH])?;
        Ok(Self { model })
    }

}

impl PitchModel for CrepeModel {
    fn name(&self) -> &'static str {
        "crepe"
    }

    fn estimate(&self, samples: &[f32]) -> ModelResult<PitchEstimate> {
        let frames = frame_audio(samples);
        let salience = batched_salience(&frames, |input| self.model.run(input))?;
        debug!(frames = frames.len(), "crepe salience computed");
        Ok(decode_salience(&salience))
    }
}

/// Centre-padded, per-frame standardized analysis frames at a 10 ms hop.
pub(crate) fn frame_audio(samples: &[f32]) -> Vec<Vec<f32>> {
    let pad = FRAME_LENGTH / 2;
    let mut padded = vec![0.0_f32; samples.len() + 2 * pad];
    padded[pad..pad + samples.len()].copy_from_slice(samples);

    let frame_count = 1 + samples.len() / HOP_LENGTH;
    (0..frame_count)
        .map(|index| {
            let start = index * HOP_LENGTH;
            let mut frame = padded[start..start + FRAME_LENGTH].to_vec();
            let mean = frame.iter().sum::<f32>() / FRAME_LENGTH as f32;
            let variance =
                frame.iter().map(|s| (s - mean).powi(2)).sum::<f32>() / FRAME_LENGTH as f32;
            let std_dev = variance.sqrt().max(STD_FLOOR);
            frame.iter_mut().for_each(|s| *s = (*s - mean) / std_dev);
            frame
        })
        .collect()
}

/// Run `frames` through `run` in fixed `[BATCH_SIZE, FRAME_LENGTH]` batches.
/// The last batch is zero-padded and its padding rows are dropped.
pub(crate) fn batched_salience<F>(frames: &[Vec<f32>], mut run: F) -> ModelResult<Vec<Vec<f32>>>
where
    F: FnMut(&[f32]) -> ModelResult<ModelOutput>,
{
    let mut salience = Vec::with_capacity(frames.len());
    for batch in frames.chunks(BATCH_SIZE) {
        let mut input = vec![0.0_f32; BATCH_SIZE * FRAME_LENGTH];
        for (slot, frame) in input.chunks_mut(FRAME_LENGTH).zip(batch) {
            slot.copy_from_slice(frame);
        }
        let output = run(&input)?;
        if output.values.len() != BATCH_SIZE * PITCH_BINS {
            return Err(ModelError::InvalidOutput {
                expected: format!("[{BATCH_SIZE}, {PITCH_BINS}] activations"),
                got: format!("shape {:?}", output.shape),
            });
        }
        salience.extend(
            output
                .values
                .chunks(PITCH_BINS)
                .take(batch.len())
                .map(<[f32]>::to_vec),
        );
    }
    Ok(salience)
}

/// Viterbi path through the argmax bins, refined by a local weighted average.
pub(crate) fn decode_salience(salience: &[Vec<f32>]) -> PitchEstimate {
    let observations: Vec<usize> = salience.iter().map(|row| argmax(row)).collect();
    let path = viterbi::decode(&observations, PITCH_BINS);

    let frame_seconds = HOP_LENGTH as f32 / PITCH_SAMPLE_RATE as f32;
    let mut estimate = PitchEstimate::default();
    for (index, (row, &bin)) in salience.iter().zip(path.iter()).enumerate() {
        let cents = local_average_cents(row, bin);
        estimate.times.push(index as f32 * frame_seconds);
        estimate.frequencies.push(cents_to_hz(cents) as f32);
        estimate
            .confidences
            .push(row.iter().copied().fold(0.0_f32, f32::max));
    }
    estimate
}

fn argmax(row: &[f32]) -> usize {
    row.iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(idx, _)| idx)
        .unwrap_or(0)
}

fn bin_to_cents(bin: usize) -> f64 {
    CENTS_PER_BIN * bin as f64 + CENTS_OFFSET
}

pub(crate) fn cents_to_hz(cents: f64) -> f64 {
    10.0 * 2f64.powf(cents / 1200.0)
}

fn local_average_cents(row: &[f32], bin: usize) -> f64 {
    let lo = bin.saturating_sub(LOCAL_RADIUS);
    let hi = (bin + LOCAL_RADIUS + 1).min(row.len());
    let (weighted, total) = (lo..hi).fold((0.0, 0.0), |(weighted, total), idx| {
        let weight = row[idx] as f64;
        (weighted + weight * bin_to_cents(idx), total + weight)
    });
    if total > 0.0 {
        weighted / total
    } else {
        bin_to_cents(bin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn bin_for_hz(hz: f64) -> usize {
        let cents = 1200.0 * (hz / 10.0).log2();
        ((cents - CENTS_OFFSET) / CENTS_PER_BIN).round() as usize
    }

    fn peaked_row(centre: usize) -> Vec<f32> {
        let mut row = vec![0.0; PITCH_BINS];
        row[centre] = 0.9;
        row[centre - 1] = 0.3;
        row[centre + 1] = 0.3;
        row
    }

    #[test]
    fn frames_at_ten_millisecond_hop() {
        let frames = frame_audio(&vec![0.25; 16_000]);
        assert_eq!(frames.len(), 101);
        assert!(frames.iter().all(|f| f.len() == FRAME_LENGTH));
    }

    #[test]
    fn silent_frames_do_not_divide_by_zero() {
        let frames = frame_audio(&vec![0.0; 1_600]);
        assert!(frames.iter().flatten().all(|s| *s == 0.0));
    }

    #[test]
    fn decodes_symmetric_peak_to_bin_frequency() {
        let bin = bin_for_hz(440.0);
        let estimate = decode_salience(&vec![peaked_row(bin); 10]);
        assert_eq!(estimate.len(), 10);
        estimate.validate().unwrap();
        let expected = cents_to_hz(bin_to_cents(bin)) as f32;
        for frequency in &estimate.frequencies {
            assert_abs_diff_eq!(*frequency, expected, epsilon = 0.01);
        }
        assert!((expected - 440.0).abs() < 5.0);
        assert_abs_diff_eq!(estimate.confidences[3], 0.9);
        assert_abs_diff_eq!(estimate.times[2], 0.02);
    }

    /// Echoes the first sample of each input row into bin 0 of its output row.
    fn echo_first_sample(input: &[f32]) -> ModelResult<ModelOutput> {
        let mut values = vec![0.0; BATCH_SIZE * PITCH_BINS];
        for (row, frame) in values
            .chunks_mut(PITCH_BINS)
            .zip(input.chunks(FRAME_LENGTH))
        {
            row[0] = frame[0];
            row[1] = 1.0;
        }
        Ok(ModelOutput {
            shape: vec![BATCH_SIZE, PITCH_BINS],
            values,
        })
    }

    #[test]
    fn batches_frames_and_drops_padding_rows() {
        let frames: Vec<Vec<f32>> = (0..65).map(|i| vec![i as f32; FRAME_LENGTH]).collect();
        let mut calls = 0;
        let mut padded_rows = 0;
        let salience = batched_salience(&frames, |input| {
            assert_eq!(input.len(), BATCH_SIZE * FRAME_LENGTH);
            calls += 1;
            if calls == 2 {
                padded_rows = input[FRAME_LENGTH..].iter().filter(|s| **s != 0.0).count();
            }
            echo_first_sample(input)
        })
        .unwrap();

        assert_eq!(calls, 2);
        assert_eq!(padded_rows, 0);
        assert_eq!(salience.len(), 65);
        for (index, row) in salience.iter().enumerate() {
            assert_eq!(row.len(), PITCH_BINS);
            assert_eq!(row[0], index as f32);
        }
    }

    #[test]
    fn rejects_wrongly_sized_activations() {
        let frames = vec![vec![0.5; FRAME_LENGTH]; 3];
        let err = batched_salience(&frames, |_| {
            Ok(ModelOutput {
                shape: vec![1, PITCH_BINS],
                values: vec![0.0; PITCH_BINS],
            })
        })
        .unwrap_err();
        assert!(matches!(err, ModelError::InvalidOutput { .. }));
    }

    #[test]
    fn bin_zero_is_about_32_hz() {
        assert_abs_diff_eq!(cents_to_hz(bin_to_cents(0)), 31.7, epsilon = 0.1);
    }
}
