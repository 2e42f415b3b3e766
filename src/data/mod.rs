// ============================================================
// Layer 4 - Data Pipeline
// ============================================================
// Everything from image files on disk to tensor batches.
//
//   hazy/*.png + normal/*.png
//       │
//       ▼
//   PairedDirLoader   → matches files by stem
//       │
//       ▼
//   Preprocessor      → scale, CHW, [0, 1]
//       │
//       ▼
//   PairDataset       → implements Burn's Dataset trait
//       │
//       ▼
//   split_train_test  → seeded 90/10 split
//       │
//       ▼
//   PairBatcher       → stacks samples into [N, C, H, W]
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Finds hazy/clean image pairs in two directories
pub mod loader;

/// Resizes and normalises images into CHW patches
pub mod preprocessor;

/// Implements Burn's Dataset trait for preprocessed pairs
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;

/// Seeded train/test split
pub mod splitter;
