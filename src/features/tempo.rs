//! Global tempo from the autocorrelation of a spectral-flux onset envelope.

const MIN_BPM: f64 = 30.0;
const MAX_BPM: f64 = 300.0;
const PRIOR_CENTRE_BPM: f64 = 120.0;
/// Width of the log-normal tempo prior, in octaves.
const PRIOR_SPREAD_OCTAVES: f64 = 1.0;
/// Dynamic range kept below the loudest mel cell.
const TOP_DB: f64 = 80.0;
const POWER_FLOOR: f64 = 1e-10;

/// Onset strength per frame: mean positive log-mel increase over the previous frame.
pub(crate) fn onset_envelope(mel: &[Vec<f64>]) -> Vec<f64> {
    let log_mel: Vec<Vec<f64>> = mel
        .iter()
        .map(|frame| {
            frame
                .iter()
                .map(|&p| 10.0 * p.max(POWER_FLOOR).log10())
                .collect()
        })
        .collect();
    let ceiling = log_mel
        .iter()
        .flatten()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);
    let floor = ceiling - TOP_DB;

    let mut envelope = Vec::with_capacity(log_mel.len());
    envelope.extend(log_mel.first().map(|_| 0.0));
    for pair in log_mel.windows(2) {
        let (previous, current) = (&pair[0], &pair[1]);
        let bands = current.len().max(1) as f64;
        let rise: f64 = current
            .iter()
            .zip(previous.iter())
            .map(|(&c, &p)| (c.max(floor) - p.max(floor)).max(0.0))
            .sum();
        envelope.push(rise / bands);
    }
    envelope
}

/// Estimated tempo in BPM, or 0.0 when the envelope has no periodic energy.
pub(crate) fn estimate_tempo(envelope: &[f64], frame_rate: f64) -> f64 {
    if envelope.len() < 3 || frame_rate.is_nan() || frame_rate <= 0.0 {
        return 0.0;
    }
    let min_lag = ((60.0 * frame_rate / MAX_BPM).ceil() as usize).max(1);
    let max_lag = ((60.0 * frame_rate / MIN_BPM).floor() as usize).min(envelope.len() - 2);
    if min_lag + 1 > max_lag {
        return 0.0;
    }

    let autocorr: Vec<f64> = (0..=max_lag + 1)
        .map(|lag| autocorrelation(envelope, lag))
        .collect();
    // Onsets rarely land on the same frame offset each beat; pool neighbouring lags.
    let pooled: Vec<f64> = (0..autocorr.len())
        .map(|lag| {
            let lo = lag.saturating_sub(1);
            let hi = (lag + 1).min(autocorr.len() - 1);
            autocorr[lo..=hi].iter().sum::<f64>()
        })
        .collect();

    let best = (min_lag..=max_lag)
        .map(|lag| (lag, pooled[lag] * tempo_prior(lag_to_bpm(lag as f64, frame_rate))))
        .filter(|(_, score)| score.is_finite() && *score > 0.0)
        .max_by(|a, b| a.1.total_cmp(&b.1));

    match best {
        Some((lag, _)) => {
            lag_to_bpm(refine_peak(&pooled, lag), frame_rate).clamp(MIN_BPM, MAX_BPM)
        }
        None => 0.0,
    }
}

fn autocorrelation(envelope: &[f64], lag: usize) -> f64 {
    envelope
        .iter()
        .zip(envelope.iter().skip(lag))
        .map(|(a, b)| a * b)
        .sum()
}

fn lag_to_bpm(lag: f64, frame_rate: f64) -> f64 {
    60.0 * frame_rate / lag
}

fn tempo_prior(bpm: f64) -> f64 {
    let octaves = (bpm / PRIOR_CENTRE_BPM).log2() / PRIOR_SPREAD_OCTAVES;
    (-0.5 * octaves * octaves).exp()
}

/// Parabolic interpolation of a peak at `lag` for sub-frame resolution.
fn refine_peak(values: &[f64], lag: usize) -> f64 {
    if lag == 0 || lag + 1 >= values.len() {
        return lag as f64;
    }
    let (left, centre, right) = (values[lag - 1], values[lag], values[lag + 1]);
    let curvature = left - 2.0 * centre + right;
    if curvature >= 0.0 {
        return lag as f64;
    }
    let offset = 0.5 * (left - right) / curvature;
    lag as f64 + offset.clamp(-0.5, 0.5)
}
