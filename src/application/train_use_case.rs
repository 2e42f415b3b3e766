// ============================================================
// Layer 2 - TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Find image pairs          (Layer 4 - data)
//   Step 2: Load + preprocess pairs   (Layer 4 - data)
//   Step 3: Check channel counts      (Layer 5 - ml config)
//   Step 4: Split train/test          (Layer 4 - data)
//   Step 5: Save config               (Layer 6 - infra)
//   Step 6: Run training loop         (Layer 5 - ml)
//
// Reference: Burn Book §5 (Training)

use anyhow::{bail, ensure, Result};
use serde::{Deserialize, Serialize};

use crate::application::data_config::DataConfig;
use crate::data::{dataset::PairDataset, splitter::split_train_test};
use crate::domain::traits::PairSource;
use crate::infra::{checkpoint::CheckpointManager, metrics::MetricsLogger};
use crate::ml::model::UNetConfig;
use crate::ml::trainer::{run_training, TrainSummary};

/// Compute backend used for training and inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Wgpu,
    NdArray,
}

// ─── Training Configuration ──────────────────────────────────────────────────
// All settings of a training run. Saved next to the checkpoints
// so `predict` can rebuild the same model and preprocessing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub data:            DataConfig,
    pub checkpoint_dir:  String,
    pub test_fraction:   f64,
    pub batch_size:      usize,
    pub test_batch_size: usize,
    pub epochs:          usize,
    pub lr:              f64,
    pub weight_decay:    f32,
    pub reg_weight:      f64,
    pub num_filters:     Vec<usize>,
    pub input_channels:  usize,
    pub num_classes:     usize,
    pub padding:         bool,
    pub bilinear:        bool,
    pub seed:            u64,
    pub num_workers:     usize,
    pub backend:         BackendKind,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            data:            DataConfig::default(),
            checkpoint_dir:  "checkpoints".to_string(),
            test_fraction:   0.1,
            batch_size:      5,
            test_batch_size: 1,
            epochs:          10,
            lr:              1e-4,
            weight_decay:    0.0,
            reg_weight:      1e-5,
            num_filters:     vec![32, 64, 128, 192],
            input_channels:  3,
            num_classes:     3,
            padding:         true,
            bilinear:        true,
            seed:            42,
            num_workers:     1,
            backend:         BackendKind::Wgpu,
        }
    }
}

impl TrainConfig {
    pub fn model_config(&self) -> UNetConfig {
        UNetConfig::new(self.input_channels, self.num_classes, self.num_filters.clone())
            .with_padding(self.padding)
            .with_bilinear(self.bilinear)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(self.batch_size > 0, "batch_size must be positive");
        ensure!(self.test_batch_size > 0, "test_batch_size must be positive");
        ensure!(self.epochs > 0, "epochs must be positive");
        ensure!(
            (0.0..1.0).contains(&self.test_fraction),
            "test_fraction must lie in [0, 1), got {}",
            self.test_fraction
        );
        self.data.preprocessor()?;
        self.model_config().validate()
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Execute the full training pipeline end to end
    pub fn execute(&self) -> Result<TrainSummary> {
        let cfg = &self.config;
        cfg.validate()?;

        // ── Step 1: Find image pairs ──────────────────────────────────────────
        let pairs = cfg.data.loader().load_pairs()?;
        ensure!(
            !pairs.is_empty(),
            "No image pairs found under '{}'",
            cfg.data.data_dir
        );

        // ── Step 2: Load and preprocess ───────────────────────────────────────
        let preprocessor = cfg.data.preprocessor()?;
        let dataset = PairDataset::from_pairs(&pairs, &preprocessor)?;
        tracing::info!(
            "Loaded {} pairs at scale {} (input {:?}, target {:?})",
            dataset.sample_count(),
            preprocessor.scale(),
            dataset.input_shape(),
            dataset.target_shape()
        );

        // ── Step 3: Channels must match the model ─────────────────────────────
        check_channels(cfg, &dataset)?;

        // ── Step 4: Train / test split ────────────────────────────────────────
        let (train_samples, test_samples) =
            split_train_test(dataset.into_samples(), cfg.test_fraction, cfg.seed);
        ensure!(!train_samples.is_empty(), "Training split is empty");
        println!(
            "Number of training/test patches: ({}, {})",
            train_samples.len(),
            test_samples.len()
        );

        let train_dataset = PairDataset::new(train_samples);
        let test_dataset  = PairDataset::new(test_samples);

        // ── Step 5: Save config for inference ─────────────────────────────────
        let ckpt_manager = CheckpointManager::new(&cfg.checkpoint_dir)?;
        ckpt_manager.save_config(cfg)?;
        let metrics = MetricsLogger::new(&cfg.checkpoint_dir)?;

        // ── Step 6: Run training loop (Layer 5) ───────────────────────────────
        run_training(cfg, train_dataset, test_dataset, &ckpt_manager, &metrics)
    }
}

fn check_channels(cfg: &TrainConfig, dataset: &PairDataset) -> Result<()> {
    if let Some([c, _, _]) = dataset.input_shape() {
        if c != cfg.input_channels {
            bail!("hazy images have {c} channels, model expects {}", cfg.input_channels);
        }
    }
    if let Some([c, _, _]) = dataset.target_shape() {
        if c != cfg.num_classes {
            bail!("clean images have {c} channels, model outputs {}", cfg.num_classes);
        }
    }
    Ok(())
}
