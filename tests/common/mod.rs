#![allow(dead_code)]

use std::io::Cursor;

use hound::{SampleFormat, WavSpec, WavWriter};
use ndarray::Array4;
use raagalyzer::emotion::{EmotionModel, InputShape};
use raagalyzer::inference::ModelResult;
use raagalyzer::pitch::{PitchEstimate, PitchModel};

/// Emotion model that always returns the same scores.
pub struct FixedEmotion(pub Vec<f32>);

impl FixedEmotion {
    /// All mass on class `index`.
    pub fn one_hot(index: usize) -> Self {
        let mut scores = vec![0.0; 8];
        scores[index] = 1.0;
        Self(scores)
    }
}

impl EmotionModel for FixedEmotion {
    fn input_shape(&self) -> InputShape {
        InputShape::new(40, 64)
    }

    fn predict(&self, _input: &Array4<f32>) -> ModelResult<Vec<f32>> {
        Ok(self.0.clone())
    }
}

/// Pitch model reporting one frequency on every 10 ms frame.
pub struct ConstantPitch(pub f32);

impl PitchModel for ConstantPitch {
    fn name(&self) -> &'static str {
        "constant"
    }

    fn estimate(&self, samples: &[f32]) -> ModelResult<PitchEstimate> {
        let frames = 1 + samples.len() / 160;
        Ok(PitchEstimate {
            times: (0..frames).map(|i| i as f32 * 0.01).collect(),
            frequencies: vec![self.0; frames],
            confidences: vec![0.9; frames],
        })
    }
}

pub fn sine(frequency: f32, sample_rate: u32, seconds: f32) -> Vec<f32> {
    let total = (sample_rate as f32 * seconds) as usize;
    (0..total)
        .map(|i| {
            0.5 * (2.0 * std::f32::consts::PI * frequency * i as f32 / sample_rate as f32).sin()
        })
        .collect()
}

/// 16-bit PCM WAV file bytes; every channel carries the same signal.
pub fn wav_bytes(samples: &[f32], sample_rate: u32, channels: u16) -> Vec<u8> {
    let spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut cursor, spec).expect("wav writer");
        for &sample in samples {
            let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
            for _ in 0..channels {
                writer.write_sample(value).expect("write sample");
            }
        }
        writer.finalize().expect("finalize wav");
    }
    cursor.into_inner()
}
