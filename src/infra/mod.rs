// ============================================================
// Layer 6 - Infrastructure Layer
// ============================================================
// Cross-cutting concerns used by several layers:
//
//   checkpoint.rs - Saving and loading model weights with Burn's
//                   CompactRecorder, plus the run config as JSON
//                   so inference can rebuild the model.
//
//   metrics.rs    - Per-epoch loss and PSNR appended to a CSV.
//
//   image_io.rs   - Patch → 8-bit image conversion and saving.
//
//   preview.rs    - Side-by-side input/target preview strips.
//
// Reference: Rust Book §7 (Modules)
//            Burn Book §5 (Checkpointing)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Training metrics CSV logger
pub mod metrics;

/// Writing patches as image files
pub mod image_io;

/// Input/target preview strips
pub mod preview;
