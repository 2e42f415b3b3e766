// ============================================================
// Layer 5 - Dehazer (Inference)
// ============================================================
use anyhow::{anyhow, ensure, Result};
use burn::prelude::*;

use crate::data::batcher::stack_patches;
use crate::domain::patch::Patch;
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::model::UNet;

pub struct Dehazer<B: Backend> {
    model:          UNet<B>,
    input_channels: usize,
    device:         B::Device,
}

impl<B: Backend> Dehazer<B> {
    pub fn new(model: UNet<B>, input_channels: usize, device: B::Device) -> Self {
        Self { model, input_channels, device }
    }

    /// Rebuild the model from the saved config and load the latest weights.
    pub fn from_checkpoint(ckpt_manager: &CheckpointManager, device: B::Device) -> Result<Self> {
        let cfg       = ckpt_manager.load_config()?;
        let model_cfg = cfg.model_config();
        model_cfg.validate()?;

        let model = ckpt_manager.load_model(model_cfg.init::<B>(&device), &device)?;
        tracing::info!("Model loaded from checkpoint");
        Ok(Self::new(model, cfg.input_channels, device))
    }

    /// Run one hazy patch through the network; output clamped to [0, 1].
    pub fn predict(&self, patch: &Patch) -> Result<Patch> {
        ensure!(
            patch.channels == self.input_channels,
            "model expects {} input channels, image has {}",
            self.input_channels,
            patch.channels
        );

        let x = stack_patches::<B>(std::iter::once(patch), &self.device);
        let y = self.model.forward(x).clamp(0.0, 1.0);

        let [_, c, h, w] = y.dims();
        let data = y
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| anyhow!("Cannot read prediction: {e:?}"))?;

        tracing::debug!("Predicted {}x{}x{} patch", c, h, w);
        Patch::new(c, h, w, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    use crate::ml::model::UNetConfig;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_prediction_is_clamped_and_shaped() {
        let device = Default::default();
        let model = UNetConfig::new(3, 3, vec![2, 4]).init::<TestBackend>(&device);
        let dehazer = Dehazer::new(model, 3, device);

        let patch = Patch::new(3, 6, 10, vec![0.7; 180]).unwrap();
        let out = dehazer.predict(&patch).unwrap();
        assert_eq!(out.shape(), [3, 6, 10]);
        assert!(out.data.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn test_channel_mismatch() {
        let device = Default::default();
        let model = UNetConfig::new(3, 3, vec![2]).init::<TestBackend>(&device);
        let dehazer = Dehazer::new(model, 3, device);
        let gray = Patch::new(1, 4, 4, vec![0.0; 16]).unwrap();
        assert!(dehazer.predict(&gray).is_err());
    }
}
