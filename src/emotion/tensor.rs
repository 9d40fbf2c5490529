use std::fmt::{Display, Formatter};
use std::str::FromStr;

use anyhow::{anyhow, ensure, Context};
use ndarray::{Array2, Array4, Axis};

use crate::features::normalize_global;

/// Height × width of the "image" the emotion model expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputShape {
    pub height: usize,
    pub width: usize,
}

impl InputShape {
    pub const fn new(height: usize, width: usize) -> Self {
        Self { height, width }
    }

    /// Full NHWC tensor shape with a batch of one and a single channel.
    pub fn nhwc(&self) -> [usize; 4] {
        [1, self.height, self.width, 1]
    }
}

impl Default for InputShape {
    fn default() -> Self {
        Self::new(128, 128)
    }
}

impl Display for InputShape {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.height, self.width)
    }
}

impl FromStr for InputShape {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let (height, width) = raw
            .split_once(['x', 'X'])
            .ok_or_else(|| anyhow!("expected HEIGHTxWIDTH, got '{raw}'"))?;
        let height: usize = height.trim().parse().context("invalid height")?;
        let width: usize = width.trim().parse().context("invalid width")?;
        ensure!(height > 0 && width > 0, "input dimensions must be positive");
        Ok(Self::new(height, width))
    }
}

/// Normalize an MFCC matrix (`coefficients × frames`) and lay it into the
/// model's NHWC input.
///
/// The matrix is anchored at the top-left of a zero canvas: surplus
/// coefficients or frames are cropped, missing ones stay zero, which is the
/// normalized mean.
pub fn mfcc_to_input(mfcc: &Array2<f32>, shape: InputShape) -> Array4<f32> {
    let normalized = normalize_global(mfcc);
    let rows = normalized.len_of(Axis(0)).min(shape.height);
    let cols = normalized.len_of(Axis(1)).min(shape.width);

    let mut input = Array4::<f32>::zeros(shape.nhwc());
    for row in 0..rows {
        for col in 0..cols {
            input[[0, row, col, 0]] = normalized[[row, col]];
        }
    }
    input
}
