// ============================================================
// Layer 6 - Checkpoint Manager
// ============================================================
// Saves and restores U-Net weights using Burn's CompactRecorder.
//
// What gets saved:
//   1. Model weights (.mpk.gz file) per epoch
//   2. latest_epoch.json  - which epoch was last saved
//   3. train_config.json  - data and model settings of the run
//
// The config is needed to rebuild a model with the same number
// of levels and filters before the weights can be loaded into it.
//
// File naming convention:
//   checkpoints/
//     model_epoch_1.mpk.gz
//     model_epoch_2.mpk.gz
//     ...
//     latest_epoch.json
//     train_config.json
//     metrics.csv          (written by MetricsLogger)
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{Context, Result};
use std::{fs, path::{Path, PathBuf}};
use burn::{
    prelude::*,
    record::{CompactRecorder, Recorder},
};

use crate::application::train_use_case::TrainConfig;
use crate::ml::model::UNet;

/// Manages saving and loading of model checkpoints.
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Create a new CheckpointManager, creating the directory if needed.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create checkpoint directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    /// Save model weights for a given epoch and mark it as the latest.
    pub fn save_model<B: Backend>(&self, model: &UNet<B>, epoch: usize) -> Result<()> {
        // The recorder appends its own extension
        let path = self.dir.join(format!("model_epoch_{epoch}"));

        CompactRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| {
                format!("Failed to save checkpoint to '{}'", path.display())
            })?;

        let latest_path = self.dir.join("latest_epoch.json");
        fs::write(&latest_path, serde_json::to_string(&epoch)?)
            .with_context(|| "Failed to write latest_epoch.json")?;

        tracing::debug!("Saved checkpoint: epoch {}", epoch);
        Ok(())
    }

    /// Load the latest saved weights into `model`.
    ///
    /// The model must have the architecture the checkpoint was saved with.
    pub fn load_model<B: Backend>(&self, model: UNet<B>, device: &B::Device) -> Result<UNet<B>> {
        let epoch = self.latest_epoch()?;
        let path  = self.dir.join(format!("model_epoch_{epoch}"));

        tracing::info!("Loading checkpoint from epoch {}", epoch);

        let record = CompactRecorder::new()
            .load(path.clone(), device)
            .with_context(|| {
                format!("Cannot load checkpoint '{}'. Have you trained the model first?",
                    path.display())
            })?;

        Ok(model.load_record(record))
    }

    /// Save the training configuration to JSON.
    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        let path = self.dir.join("train_config.json");
        let json = serde_json::to_string_pretty(cfg)?;

        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;

        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }

    /// Load the training configuration from JSON.
    pub fn load_config(&self) -> Result<TrainConfig> {
        let path = self.dir.join("train_config.json");

        let json = fs::read_to_string(&path).with_context(|| {
            format!(
                "Cannot read config from '{}'. \
                 Make sure you have run 'train' before 'predict'.",
                path.display()
            )
        })?;

        serde_json::from_str(&json)
            .with_context(|| format!("Malformed config '{}'", path.display()))
    }

    /// Epoch number stored in latest_epoch.json.
    pub fn latest_epoch(&self) -> Result<usize> {
        let path = self.dir.join("latest_epoch.json");

        let s = fs::read_to_string(&path).with_context(|| {
            "Cannot find 'latest_epoch.json'. Have you run 'train' first?"
        })?;

        Ok(serde_json::from_str::<usize>(&s)?)
    }
}
