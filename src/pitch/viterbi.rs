//! Viterbi decoding of CREPE's per-frame argmax bins into a smooth bin path.

/// Half-width of the allowed jump between consecutive frames, in bins.
const MAX_JUMP: usize = 12;
/// Probability that a frame's observed argmax equals the true state.
const SELF_EMISSION: f64 = 0.1;

/// Most likely state sequence for `observations` (argmax bin per frame)
/// over `states` pitch bins.
///
/// Uniform start distribution; transition weight `max(MAX_JUMP - |i - j|, 0)`
/// normalized per source row; emission `SELF_EMISSION` on the observed bin
/// plus `(1 - SELF_EMISSION) / states` everywhere.
pub(crate) fn decode(observations: &[usize], states: usize) -> Vec<usize> {
    if observations.is_empty() || states == 0 {
        return Vec::new();
    }

    let log_transition_norm: Vec<f64> = (0..states)
        .map(|from| {
            let lo = from.saturating_sub(MAX_JUMP - 1);
            let hi = (from + MAX_JUMP - 1).min(states - 1);
            (lo..=hi)
                .map(|to| transition_weight(from, to))
                .sum::<f64>()
                .ln()
        })
        .collect();
    let log_transition = |from: usize, to: usize| -> f64 {
        transition_weight(from, to).ln() - log_transition_norm[from]
    };

    let background = ((1.0 - SELF_EMISSION) / states as f64).ln();
    let matched = (SELF_EMISSION + (1.0 - SELF_EMISSION) / states as f64).ln();
    let log_emission = |state: usize, observed: usize| {
        if state == observed {
            matched
        } else {
            background
        }
    };

    let start = -(states as f64).ln();
    let mut score: Vec<f64> = (0..states)
        .map(|s| start + log_emission(s, observations[0]))
        .collect();
    let mut backpointers: Vec<Vec<u16>> = Vec::with_capacity(observations.len());
    backpointers.push(vec![0; states]);

    let mut next = vec![f64::NEG_INFINITY; states];
    for &observed in &observations[1..] {
        let mut pointers = vec![0u16; states];
        for (to, slot) in next.iter_mut().enumerate() {
            let lo = to.saturating_sub(MAX_JUMP - 1);
            let hi = (to + MAX_JUMP - 1).min(states - 1);
            let (best_from, best_score) = (lo..=hi)
                .map(|from| (from, score[from] + log_transition(from, to)))
                .fold((lo, f64::NEG_INFINITY), |best, candidate| {
                    if candidate.1 > best.1 {
                        candidate
                    } else {
                        best
                    }
                });
            *slot = best_score + log_emission(to, observed);
            pointers[to] = best_from as u16;
        }
        std::mem::swap(&mut score, &mut next);
        backpointers.push(pointers);
    }

    let mut state = score
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(idx, _)| idx)
        .unwrap_or(0);
    let mut path = vec![0; observations.len()];
    for t in (0..observations.len()).rev() {
        path[t] = state;
        state = backpointers[t][state] as usize;
    }
    path
}

fn transition_weight(from: usize, to: usize) -> f64 {
    MAX_JUMP.saturating_sub(from.abs_diff(to)) as f64
}
