// ============================================================
// Layer 5 - ML / Model Layer (Burn)
// ============================================================
// All Burn model code lives here.
//
//   init.rs       - Kaiming weights, truncated-normal biases
//
//   model.rs      - The U-Net:
//                   • contracting path of pool + 3x(conv, ReLU)
//                   • expansive path of upsample + skip concat
//                   • final 1x1 convolution
//
//   trainer.rs    - Forward pass, MSE + L2 loss, backward pass,
//                   AdamW step, evaluation and checkpointing
//
//   inferencer.rs - Loads a checkpoint and dehazes one image
//
// Reference: Burn Book §3 (Building Blocks), §5 (Training)
//            Ronneberger et al. (2015) U-Net

/// Weight initialisation helpers
pub mod init;

/// U-Net architecture
pub mod model;

/// Training loop with evaluation and checkpointing
pub mod trainer;

/// Inference engine
pub mod inferencer;
