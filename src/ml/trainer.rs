// ============================================================
// Layer 5 - Training Loop
// ============================================================
// Train + evaluation loop using Burn's DataLoader and AdamW.
//
// Loss per batch:
//   loss = MSE(unet(hazy), clean) + reg_weight * Σ ||W||₂
//
// Key points:
//   - Training runs on an AutodiffBackend for gradients
//   - model.valid() drops autodiff for the evaluation pass,
//     so the test batcher targets B::InnerBackend
//   - Valid (unpadded) convolutions shrink the output; the
//     target is centre-cropped to the prediction before the loss
//
// Reference: Burn Book §5, Loshchilov & Hutter (2019) AdamW

use anyhow::Result;
use burn::{
    backend::{ndarray::NdArrayDevice, wgpu::WgpuDevice, Autodiff, NdArray, Wgpu},
    data::dataloader::DataLoaderBuilder,
    module::AutodiffModule,
    nn::loss::{MseLoss, Reduction},
    optim::{AdamWConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Instant;

use crate::application::train_use_case::{BackendKind, TrainConfig};
use crate::data::{batcher::PairBatcher, dataset::PairDataset};
use crate::infra::checkpoint::CheckpointManager;
use crate::infra::metrics::{EpochMetrics, MetricsLogger};
use crate::ml::model::{center_crop, UNet};

/// Per-epoch metrics of a finished run.
#[derive(Debug, Clone)]
pub struct TrainSummary {
    pub epochs: Vec<EpochMetrics>,
}

impl TrainSummary {
    pub fn last(&self) -> Option<&EpochMetrics> {
        self.epochs.last()
    }

    /// Epoch with the lowest test loss; unevaluated (NaN) epochs never win.
    pub fn best(&self) -> Option<&EpochMetrics> {
        let mut best: Option<&EpochMetrics> = None;
        for m in self.epochs.iter().filter(|m| !m.test_loss.is_nan()) {
            if best.map_or(true, |b| m.is_improvement(b.test_loss)) {
                best = Some(m);
            }
        }
        best
    }
}

pub fn run_training(
    cfg:           &TrainConfig,
    train_dataset: PairDataset,
    test_dataset:  PairDataset,
    ckpt_manager:  &CheckpointManager,
    metrics:       &MetricsLogger,
) -> Result<TrainSummary> {
    match cfg.backend {
        BackendKind::Wgpu => {
            let device = WgpuDevice::default();
            tracing::info!("Using WGPU device: {:?}", device);
            train_loop::<Autodiff<Wgpu>>(cfg, train_dataset, test_dataset, ckpt_manager, metrics, device)
        }
        BackendKind::NdArray => {
            let device = NdArrayDevice::Cpu;
            tracing::info!("Using NdArray device: {:?}", device);
            train_loop::<Autodiff<NdArray>>(cfg, train_dataset, test_dataset, ckpt_manager, metrics, device)
        }
    }
}

/// Reconstruction MSE between a prediction and its (cropped) target.
fn reconstruction_loss<B: Backend>(prediction: Tensor<B, 4>, target: Tensor<B, 4>) -> Tensor<B, 1> {
    let [_, _, h, w] = prediction.dims();
    let target = center_crop(target, h, w);
    MseLoss::new().forward(prediction, target, Reduction::Mean)
}

pub fn train_loop<B: AutodiffBackend>(
    cfg:           &TrainConfig,
    train_dataset: PairDataset,
    test_dataset:  PairDataset,
    ckpt_manager:  &CheckpointManager,
    metrics:       &MetricsLogger,
    device:        B::Device,
) -> Result<TrainSummary> {
    B::seed(cfg.seed);

    // ── Build model ───────────────────────────────────────────────────────────
    let model_cfg = cfg.model_config();
    model_cfg.validate()?;
    let mut model: UNet<B> = model_cfg.init(&device);
    tracing::info!(
        "Model ready: {} levels, filters={:?}, {} parameters",
        model.depth(),
        cfg.num_filters,
        model.num_params()
    );

    // ── AdamW optimiser ───────────────────────────────────────────────────────
    let mut optim = AdamWConfig::new()
        .with_weight_decay(cfg.weight_decay)
        .init();

    // ── Data loaders ──────────────────────────────────────────────────────────
    let train_batches = train_dataset.sample_count().div_ceil(cfg.batch_size.max(1));
    let evaluate = test_dataset.sample_count() > 0;
    if !evaluate {
        tracing::warn!("No test samples; test loss and PSNR are not computed");
    }
    let train_loader = DataLoaderBuilder::<B, _, _>::new(PairBatcher::new())
        .batch_size(cfg.batch_size)
        .shuffle(cfg.seed)
        .num_workers(cfg.num_workers)
        .set_device(device.clone())
        .build(train_dataset);

    // Evaluation runs without autodiff overhead
    let test_loader = DataLoaderBuilder::<B::InnerBackend, _, _>::new(PairBatcher::new())
        .batch_size(cfg.test_batch_size)
        .num_workers(cfg.num_workers)
        .set_device(device.clone())
        .build(test_dataset);

    let style = ProgressStyle::with_template(
        "{elapsed_precise} | ETA {eta_precise} [{bar:40.cyan/blue}] {pos}/{len} | loss={msg}",
    )?
    .progress_chars("=> ");

    let mut summary = TrainSummary { epochs: Vec::with_capacity(cfg.epochs) };

    // ── Epoch loop ────────────────────────────────────────────────────────────
    for epoch in 1..=cfg.epochs {
        let pb = ProgressBar::new(train_batches as u64);
        pb.set_style(style.clone());
        let start_time = Instant::now();

        // ── Training phase ────────────────────────────────────────────────────
        let mut train_loss_sum = 0.0f64;
        let mut train_steps    = 0usize;

        for batch in train_loader.iter() {
            let prediction = model.forward(batch.inputs);
            let mse = reconstruction_loss(prediction, batch.targets);
            let loss = mse + model.l2_regularization().mul_scalar(cfg.reg_weight);

            let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();
            train_loss_sum += loss_val;
            train_steps    += 1;

            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(cfg.lr, model, grads);

            pb.set_message(format!("{:.4}", train_loss_sum / train_steps as f64));
            pb.inc(1);
        }
        pb.finish_and_clear();

        let avg_train_loss = if train_steps > 0 {
            train_loss_sum / train_steps as f64
        } else { f64::NAN };

        // ── Evaluation phase ──────────────────────────────────────────────────
        let mut test_loss_sum = 0.0f64;
        let mut test_steps    = 0usize;

        if evaluate {
            let model_valid = model.valid();
            for batch in test_loader.iter() {
                let prediction = model_valid.forward(batch.inputs);
                let mse: f64 = reconstruction_loss(prediction, batch.targets)
                    .into_scalar()
                    .elem::<f64>();
                test_loss_sum += mse;
                test_steps    += 1;
            }
        }

        let avg_test_loss = if test_steps > 0 {
            test_loss_sum / test_steps as f64
        } else { f64::NAN };

        let m = EpochMetrics::new(epoch, avg_train_loss, avg_test_loss);
        println!(
            "Epoch {:>3}/{} | train_loss={:.5} | test_loss={:.5} | psnr={:.2}dB | time={:.2?}",
            epoch, cfg.epochs, m.train_loss, m.test_loss, m.test_psnr,
            start_time.elapsed(),
        );

        metrics.log(&m)?;
        ckpt_manager.save_model(&model, epoch)?;
        tracing::info!("Checkpoint saved for epoch {}", epoch);
        summary.epochs.push(m);
    }

    tracing::info!("Training complete! Metrics in '{}'", metrics.csv_path().display());
    Ok(summary)
}
