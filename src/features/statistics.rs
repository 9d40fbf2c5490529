use ndarray::Array2;

const EPSILON: f32 = 1e-12;

/// Transpose frame-major rows (`[frame][coefficient]`) into a
/// `coefficients × frames` matrix.
pub(crate) fn coefficient_matrix(frames: &[Vec<f64>]) -> Array2<f32> {
    let rows = frames.first().map_or(0, Vec::len);
    let cols = frames.len();
    Array2::from_shape_fn((rows, cols), |(row, col)| {
        frames[col].get(row).copied().unwrap_or(0.0) as f32
    })
}

/// Standardise the whole matrix with one global mean and standard deviation.
///
/// A constant (or non-finite) matrix carries no information to scale; it maps
/// to all zeros rather than dividing by zero.
pub fn normalize_global(input: &Array2<f32>) -> Array2<f32> {
    if input.is_empty() {
        return input.clone();
    }
    let mean = input.mean().unwrap_or(0.0);
    let variance = input.mapv(|v| (v - mean).powi(2)).sum() / input.len() as f32;
    let std_dev = variance.sqrt();
    if !mean.is_finite() || !std_dev.is_finite() || std_dev < EPSILON {
        return Array2::zeros(input.raw_dim());
    }
    input.mapv(|v| (v - mean) / std_dev)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn transposes_frames_into_coefficient_rows() {
        let frames = vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]];
        let matrix = coefficient_matrix(&frames);
        assert_eq!(matrix.dim(), (3, 2));
        assert_eq!(matrix[[0, 1]], 4.0);
        assert_eq!(matrix[[2, 0]], 3.0);
    }

    #[test]
    fn normalized_matrix_has_zero_mean_unit_variance() {
        let input = array![[1.0_f32, 2.0, 3.0], [4.0, 5.0, 6.0]];
        let normalized = normalize_global(&input);
        let mean = normalized.mean().unwrap();
        let variance = normalized.mapv(|v| (v - mean).powi(2)).mean().unwrap();
        assert_abs_diff_eq!(mean, 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(variance, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn constant_matrix_normalizes_to_zeros() {
        let input = Array2::from_elem((4, 3), 7.5_f32);
        let normalized = normalize_global(&input);
        assert!(normalized.iter().all(|&v| v == 0.0));
    }
}
