// ============================================================
// Layer 3 - Patch Domain Type
// ============================================================
// A preprocessed image: `channels x height x width` floats in
// CHW (planar) order, the layout convolution layers expect.
//
// Index of pixel (c, y, x) = c * height * width + y * width + x
//
// Reference: Rust Book §8 (Vectors)

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patch {
    pub channels: usize,
    pub height:   usize,
    pub width:    usize,
    pub data:     Vec<f32>,
}

impl Patch {
    /// Build a patch, checking that the buffer matches the shape.
    pub fn new(channels: usize, height: usize, width: usize, data: Vec<f32>) -> Result<Self> {
        ensure!(
            data.len() == channels * height * width,
            "patch buffer has {} values, expected {}x{}x{} = {}",
            data.len(),
            channels,
            height,
            width,
            channels * height * width
        );
        Ok(Self { channels, height, width, data })
    }

    /// `[channels, height, width]`
    pub fn shape(&self) -> [usize; 3] {
        [self.channels, self.height, self.width]
    }

    pub fn get(&self, c: usize, y: usize, x: usize) -> f32 {
        self.data[(c * self.height + y) * self.width + x]
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_wrong_buffer_length() {
        assert!(Patch::new(3, 2, 2, vec![0.0; 11]).is_err());
    }

    #[test]
    fn test_chw_indexing() {
        // 2 channels of 2x3
        let data: Vec<f32> = (0..12).map(|v| v as f32).collect();
        let p = Patch::new(2, 2, 3, data).unwrap();
        assert_eq!(p.get(0, 0, 0), 0.0);
        assert_eq!(p.get(0, 1, 2), 5.0);
        assert_eq!(p.get(1, 0, 0), 6.0);
        assert_eq!(p.get(1, 1, 2), 11.0);
    }
}
