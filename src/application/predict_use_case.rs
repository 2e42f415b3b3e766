// ============================================================
// Layer 2 - Predict Use Case
// ============================================================
// Loads the training config and latest checkpoint, dehazes one
// image with the same preprocessing scale used in training and
// writes the result as an image file.

use anyhow::{Context, Result};
use burn::{
    backend::{ndarray::NdArrayDevice, wgpu::WgpuDevice, NdArray, Wgpu},
    prelude::Backend,
};
use std::path::Path;

use crate::application::train_use_case::BackendKind;
use crate::domain::patch::Patch;
use crate::infra::{checkpoint::CheckpointManager, image_io::save_patch};
use crate::ml::inferencer::Dehazer;

pub struct PredictUseCase {
    ckpt_manager: CheckpointManager,
    /// Overrides the backend recorded in the training config
    backend:      Option<BackendKind>,
}

impl PredictUseCase {
    pub fn new(checkpoint_dir: impl AsRef<Path>, backend: Option<BackendKind>) -> Result<Self> {
        Ok(Self { ckpt_manager: CheckpointManager::new(checkpoint_dir)?, backend })
    }

    /// Dehaze `input` and write the prediction to `output`.
    pub fn execute(&self, input: impl AsRef<Path>, output: impl AsRef<Path>) -> Result<Patch> {
        let input = input.as_ref();
        let cfg = self.ckpt_manager.load_config()?;

        let img = image::open(input)
            .with_context(|| format!("Cannot open input image '{}'", input.display()))?;
        let patch = cfg.data.preprocessor()?.preprocess(&img)?;
        tracing::info!(
            "Dehazing '{}' at {}x{}",
            input.display(),
            patch.width,
            patch.height
        );

        let prediction = match self.backend.unwrap_or(cfg.backend) {
            BackendKind::Wgpu => self.predict_on::<Wgpu>(&patch, WgpuDevice::default())?,
            BackendKind::NdArray => self.predict_on::<NdArray>(&patch, NdArrayDevice::Cpu)?,
        };

        save_patch(&prediction, output)?;
        Ok(prediction)
    }

    fn predict_on<B: Backend>(&self, patch: &Patch, device: B::Device) -> Result<Patch> {
        Dehazer::<B>::from_checkpoint(&self.ckpt_manager, device)?.predict(patch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    use crate::application::train_use_case::TrainConfig;
    use crate::ml::model::UNet;

    #[test]
    fn test_predict_writes_image() {
        let dir = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path()).unwrap();

        let mut cfg = TrainConfig::default();
        cfg.num_filters = vec![2, 4];
        cfg.data.scale = 0.5;
        cfg.backend = BackendKind::NdArray;
        ckpt.save_config(&cfg).unwrap();

        let device = NdArrayDevice::Cpu;
        let model: UNet<NdArray> = cfg.model_config().init(&device);
        ckpt.save_model(&model, 1).unwrap();

        let input = dir.path().join("hazy.png");
        RgbImage::from_pixel(16, 12, Rgb([200, 200, 210])).save(&input).unwrap();
        let output = dir.path().join("out").join("clean.png");

        let prediction = PredictUseCase::new(dir.path(), None)
            .unwrap()
            .execute(&input, &output)
            .unwrap();

        assert_eq!(prediction.shape(), [3, 6, 8]);
        let written = image::open(&output).unwrap();
        assert_eq!((written.width(), written.height()), (8, 6));
    }

    #[test]
    fn test_predict_without_training_fails() {
        let dir = tempfile::tempdir().unwrap();
        let use_case = PredictUseCase::new(dir.path(), None).unwrap();
        assert!(use_case.execute(dir.path().join("x.png"), dir.path().join("y.png")).is_err());
    }
}
