// ============================================================
// Layer 2 - Preview Use Case
// ============================================================
// Loads one pair of the dataset (by position in sorted id order),
// preprocesses it exactly as training would and writes a preview
// strip so the data can be checked before a long run.

use anyhow::{Context, Result};
use std::path::Path;

use crate::application::data_config::DataConfig;
use crate::domain::traits::PairSource;
use crate::infra::preview::save_pair_preview;

pub struct PreviewUseCase {
    data: DataConfig,
}

impl PreviewUseCase {
    pub fn new(data: DataConfig) -> Self {
        Self { data }
    }

    /// Write a preview of pair `index`; returns its id.
    pub fn execute(&self, index: usize, output: impl AsRef<Path>) -> Result<String> {
        let pairs = self.data.loader().load_pairs()?;
        let pair = pairs.get(index).with_context(|| {
            format!("Pair index {index} out of range, dataset has {} pairs", pairs.len())
        })?;

        let sample = self.data.preprocessor()?.load_pair(pair)?;
        save_pair_preview(&sample.input, &sample.target, output)?;
        Ok(sample.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use std::fs;

    #[test]
    fn test_preview_by_index() {
        let root = tempfile::tempdir().unwrap();
        for sub in ["normal", "hazy"] {
            fs::create_dir_all(root.path().join(sub)).unwrap();
            for id in ["a", "b"] {
                RgbImage::from_pixel(6, 4, Rgb([10, 20, 30]))
                    .save(root.path().join(sub).join(format!("{id}.png")))
                    .unwrap();
            }
        }

        let mut data = DataConfig::default();
        data.data_dir = root.path().to_string_lossy().into_owned();
        let use_case = PreviewUseCase::new(data);

        let out = root.path().join("preview.png");
        assert_eq!(use_case.execute(1, &out).unwrap(), "b");
        assert!(out.exists());
        assert!(use_case.execute(5, &out).is_err());
    }
}
