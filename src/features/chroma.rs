use ndarray::Array2;

use crate::pitch::notes::semitones_from_c0;

/// Lowest frequency folded into a pitch class (A0).
const MIN_FREQ: f64 = 27.5;
pub const PITCH_CLASSES: usize = 12;

/// Fold a power spectrogram onto the 12 pitch classes (C..B).
///
/// Output is `12 × frames`; each frame is scaled so its strongest class is 1.
pub(crate) fn chroma_from_power(power: &[Vec<f64>], freqs: &[f64], sample_rate: u32) -> Array2<f32> {
    let nyquist = sample_rate as f64 / 2.0;
    let classes: Vec<Option<usize>> = freqs
        .iter()
        .map(|&freq| {
            (freq >= MIN_FREQ && freq < nyquist)
                .then(|| semitones_from_c0(freq).rem_euclid(PITCH_CLASSES as i64) as usize)
        })
        .collect();

    let mut chroma = Array2::<f32>::zeros((PITCH_CLASSES, power.len()));
    for (frame_idx, frame) in power.iter().enumerate() {
        for (bin, &energy) in frame.iter().enumerate() {
            if let Some(Some(class)) = classes.get(bin) {
                chroma[[*class, frame_idx]] += energy as f32;
            }
        }
        let mut column = chroma.column_mut(frame_idx);
        let peak = column.iter().copied().fold(0.0_f32, f32::max);
        if peak > 0.0 {
            column.mapv_inplace(|v| v / peak);
        }
    }
    chroma
}
