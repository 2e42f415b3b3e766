// ============================================================
// Layer 2 - Application / Use Cases
// ============================================================
// Orchestrates the other layers to accomplish one goal each:
//   - train:   pairs on disk → trained checkpoint
//   - predict: checkpoint + hazy image → dehazed image
//   - preview: one dataset pair → side-by-side preview image
//
// Rules for this layer:
//   - No model or tensor code here
//   - No clap types here (the CLI converts them first)
//   - Only workflow coordination
//
// Reference: Rust Book §7 (Module System)

// Where pairs live on disk and how they are preprocessed
pub mod data_config;

// The training workflow
pub mod train_use_case;

// Dehazing a single image with a trained checkpoint
pub mod predict_use_case;

// Writing a preview of one dataset pair
pub mod preview_use_case;
